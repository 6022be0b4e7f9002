// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use aspect_weaver::{
    Aspect, AspectDeclaration, AspectInstance, AspectOptions, JoinpointKind, Order, PointcutPhase,
    Value, Weaver, WovenClass,
};
use test_log::test;

mod common;

use common::Log;

fn job(weaver: &Weaver, log: &Log) -> Arc<WovenClass> {
    let scheduled = weaver
        .annotations("test")
        .create(aspect_weaver::AnnotationKind::Class, "Scheduled")
        .unwrap();
    let log = log.clone();

    weaver
        .class("Job")
        .annotate_class(scheduled.bare())
        .method("run", move |_, _| {
            log.push("original");
            Ok(Value::from("done"))
        })
        .build()
        .unwrap()
}

/// Logs `<name>.before` and `<name>.after` around `run`.
struct Nesting {
    name: &'static str,
    log: Log,
}

impl Aspect for Nesting {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.around("nest", "method run", |aspect, ctxt| {
            aspect.log.push(format!("{}.before", aspect.name));
            let value = ctxt.proceed()?;
            aspect.log.push(format!("{}.after", aspect.name));
            Ok(Some(value))
        });
    }
}

fn nesting(name: &'static str, log: &Log, order: i64) -> AspectInstance {
    AspectInstance::from(Arc::new(Nesting {
        name,
        log: log.clone(),
    }))
    .with_id(name)
    .with_order(order)
}

#[test]
fn around_advices_nest_in_reverse_precedence() {
    for registration in [["A", "B"], ["B", "A"]] {
        let weaver = Weaver::new();
        let log = Log::default();
        let job = job(&weaver, &log);

        for name in registration {
            let order = if name == "A" { 10 } else { 9 };
            weaver.enable(nesting(name, &log, order)).unwrap();
        }

        let instance = job.instantiate(vec![]).unwrap();
        assert_eq!(instance.call("run", &[]).unwrap(), Value::from("done"));
        assert_eq!(
            log.entries(),
            vec!["A.before", "B.before", "original", "B.after", "A.after"],
            "registration order {registration:?}"
        );
    }
}

/// Wraps `run` and also observes it from a before advice.
struct Wrapping {
    name: &'static str,
    log: Log,
}

impl Aspect for Wrapping {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.around("wrap", "method run", |aspect, ctxt| {
            aspect.log.push(format!("{}.enter", aspect.name));
            let value = ctxt.proceed()?;
            aspect.log.push(format!("{}.exit", aspect.name));
            Ok(Some(value))
        });
        d.before("observe", "method run", |aspect, _| {
            aspect.log.push(format!("{}.before", aspect.name));
            Ok(None)
        });
    }
}

#[test]
fn before_advices_keep_precedence_order_inside_nested_arounds() {
    let weaver = Weaver::new();
    let log = Log::default();
    let job = job(&weaver, &log);

    let wrapping = |name, order: i64| {
        AspectInstance::from(Arc::new(Wrapping {
            name,
            log: log.clone(),
        }))
        .with_order(order)
    };
    weaver
        .enable_all([wrapping("A", 10), wrapping("B", 9)])
        .unwrap();

    job.instantiate(vec![]).unwrap().call("run", &[]).unwrap();
    assert_eq!(
        log.entries(),
        vec!["A.enter", "B.enter", "B.before", "A.before", "original", "B.exit", "A.exit"]
    );
}

struct Tagging {
    tag: &'static str,
    log: Log,
}

impl Aspect for Tagging {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.before("tag", "method run", |aspect, _| {
            aspect.log.push(aspect.tag);
            Ok(None)
        });
    }
}

#[test]
fn ordered_aspects_precede_unordered_ones() {
    for highest_first in [true, false] {
        let weaver = Weaver::new();
        let log = Log::default();
        let job = job(&weaver, &log);

        let highest = AspectInstance::from(Arc::new(Tagging {
            tag: "highest",
            log: log.clone(),
        }))
        .with_order(Order::Highest);
        let unordered = AspectInstance::from(Arc::new(Tagging {
            tag: "unordered",
            log: log.clone(),
        }));

        let aspects = if highest_first {
            vec![highest, unordered]
        } else {
            vec![unordered, highest]
        };
        weaver.enable_all(aspects).unwrap();

        job.instantiate(vec![]).unwrap().call("run", &[]).unwrap();
        assert_eq!(log.entries(), vec!["highest", "unordered", "original"]);
    }
}

#[test]
fn unordered_aspects_keep_registration_order() {
    let weaver = Weaver::new();
    let log = Log::default();
    let job = job(&weaver, &log);

    for tag in ["first", "second", "third"] {
        weaver
            .enable(Arc::new(Tagging {
                tag,
                log: log.clone(),
            }))
            .unwrap();
    }

    job.instantiate(vec![]).unwrap().call("run", &[]).unwrap();
    assert_eq!(log.entries(), vec!["first", "second", "third", "original"]);
}

struct ClassHook {
    tag: &'static str,
    log: Log,
}

impl Aspect for ClassHook {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.before("hook", "@test:Scheduled class *", |aspect, _| {
            aspect.log.push(aspect.tag);
            Ok(None)
        });
    }
}

#[test]
fn class_advices_follow_aspect_order() {
    let weaver = Weaver::new();
    let log = Log::default();
    let job = job(&weaver, &log);

    let a = AspectInstance::from(Arc::new(ClassHook {
        tag: "A",
        log: log.clone(),
    }))
    .with_order(10);
    let b = AspectInstance::from(Arc::new(ClassHook {
        tag: "B",
        log: log.clone(),
    }))
    .with_order(9);
    weaver.enable_all([a, b]).unwrap();

    job.instantiate(vec![]).unwrap();
    assert_eq!(log.entries(), vec!["B", "A"]);
}

struct Layered;

impl Aspect for Layered {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new().id("layered"));

        d.before("unordered", "method run", |_, _| Ok(None));
        d.before("late", "method run", |_, _| Ok(None)).order(5);
        d.before("first", "any *", |_, _| Ok(None)).order(Order::Highest);
        d.before("early", "method *", |_, _| Ok(None)).order(-1);
    }
}

#[test]
fn advices_of_one_aspect_follow_their_own_order() {
    let weaver = Weaver::new();
    let job = job(&weaver, &Log::default());
    weaver.enable(AspectInstance::new(Layered)).unwrap();

    let plan = job.execution_plan(JoinpointKind::Call, "run").unwrap();
    let names: Vec<_> = plan
        .advices(PointcutPhase::Before)
        .iter()
        .map(|advice| advice.name().to_string())
        .collect();

    assert_eq!(names, vec!["first", "early", "late", "unordered"]);
}
