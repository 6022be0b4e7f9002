// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use aspect_weaver::{
    AdviceError, Aspect, AspectDeclaration, AspectError, AspectInstance, AspectOptions,
    ExecutionError, JoinpointKind, PointcutPhase, Symbol, Value, Weaver, WeavingError,
};
use test_log::test;

mod common;

use common::{Annotations, Log, Overdrawn, account};

struct Tracer {
    log: Log,
}

impl Aspect for Tracer {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new().id("tracer"));

        d.before("enter", "@test:Traced method *", |tracer, ctxt| {
            tracer.log.push(format!("before {}", ctxt.target.name));
            Ok(None)
        });
        d.around("wrap", "@test:Traced method *", |tracer, ctxt| {
            tracer.log.push("around:in");
            let value = ctxt.proceed()?;
            tracer.log.push(format!("around:out {value:?}"));
            Ok(None)
        });
        d.after_return("result", "@test:Traced method *", |tracer, ctxt| {
            tracer.log.push(format!("return {:?}", ctxt.value));
            Ok(None)
        });
        d.after("exit", "@test:Traced method *", |tracer, ctxt| {
            let outcome = match ctxt.error() {
                Some(error) => format!("failed: {error}"),
                None => "succeeded".to_string(),
            };
            tracer.log.push(format!("after {outcome}"));
            Ok(None)
        });
    }
}

#[test]
fn phases_compose_around_the_original() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    let log = Log::default();
    weaver.enable(Arc::new(Tracer { log: log.clone() })).unwrap();

    let instance = account.instantiate(vec![Value::from(10)]).unwrap();
    assert_eq!(instance.call("deposit", &[Value::from(5)]).unwrap(), Value::from(15));

    insta::assert_debug_snapshot!(log.entries(), @r#"
    [
        "around:in",
        "before deposit",
        "return 15",
        "around:out 15",
        "after succeeded",
    ]
    "#);

    log.clear();
    assert_eq!(instance.call("describe", &[]).unwrap(), Value::from("account with 15"));
    assert!(log.entries().is_empty());
}

#[test]
fn errors_pass_through_without_after_throw_advices() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    let log = Log::default();
    weaver.enable(Arc::new(Tracer { log: log.clone() })).unwrap();

    let instance = account.instantiate(vec![Value::from(10)]).unwrap();
    let err = instance.call("withdraw", &[Value::from(100)]).unwrap_err();

    assert_eq!(err.downcast_thrown::<Overdrawn>(), Some(&Overdrawn(100)));
    assert_eq!(
        log.entries().last().map(String::as_str),
        Some("after failed: insufficient funds to withdraw 100")
    );
}

struct Recovering;

impl Aspect for Recovering {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.after_throw("refuse", "@test:Traced method withdraw", |_, ctxt| {
            assert!(ctxt.value.is_null());
            match ctxt.error().and_then(ExecutionError::downcast_thrown::<Overdrawn>) {
                Some(Overdrawn(requested)) => Ok(Some(Value::from(-requested))),
                None => Ok(None),
            }
        });
    }
}

#[test]
fn after_throw_substitutes_a_value() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    weaver.enable(AspectInstance::new(Recovering)).unwrap();

    let instance = account.instantiate(vec![Value::from(10)]).unwrap();
    assert_eq!(instance.call("withdraw", &[Value::from(100)]).unwrap(), Value::from(-100));
    assert_eq!(instance.call("withdraw", &[Value::from(4)]).unwrap(), Value::from(6));
}

struct Rethrowing;

impl Aspect for Rethrowing {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.after_throw("wrap", "@test:Traced method *", |_, ctxt| {
            Err(AspectError::new(&ctxt.target.label, "withdrawal refused").into())
        });
    }
}

#[test]
fn after_throw_can_rethrow() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    weaver.enable(AspectInstance::new(Rethrowing)).unwrap();

    let instance = account.instantiate(vec![]).unwrap();
    let err = instance.call("withdraw", &[Value::from(1)]).unwrap_err();
    assert_eq!(err.to_string(), "withdrawal refused (on method Account.withdraw)");
}

struct Doubling;

impl Aspect for Doubling {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.around("double", "@test:Traced method deposit", |_, ctxt| {
            let doubled = ctxt.arg(0).and_then(Value::as_i64).unwrap_or_default() * 2;
            ctxt.proceed_with(vec![Value::from(doubled)])?;
            Ok(None)
        });
        d.around("freeze", "@test:Traced method withdraw", |_, _| {
            Ok(Some(Value::from("frozen")))
        });
    }
}

#[test]
fn around_advices_control_the_original() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    weaver.enable(AspectInstance::new(Doubling)).unwrap();

    let instance = account.instantiate(vec![Value::from(10)]).unwrap();
    assert_eq!(instance.call("deposit", &[Value::from(5)]).unwrap(), Value::from(20));
    assert_eq!(instance.call("withdraw", &[Value::from(5)]).unwrap(), Value::from("frozen"));
    assert_eq!(instance.get("balance").unwrap(), Value::from(20));
}

struct Validation;

impl Aspect for Validation {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.before("positive", "@test:Positive parameter *", |_, ctxt| {
            let positive = "@test:Positive".parse().unwrap();
            for annotation in ctxt.annotations_of(&positive) {
                let index = annotation.target.parameter_index.unwrap_or_default();
                if ctxt.arg(index).and_then(Value::as_i64).unwrap_or_default() <= 0 {
                    return Err(AspectError::new(&annotation.target.label, "must be positive").into());
                }
            }
            Ok(None)
        });
    }
}

#[test]
fn parameter_pointcuts_weave_the_owning_method() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    weaver.enable(AspectInstance::new(Validation)).unwrap();

    let instance = account.instantiate(vec![Value::from(10)]).unwrap();
    let err = instance.call("deposit", &[Value::from(-5)]).unwrap_err();
    assert_eq!(err.to_string(), "must be positive (on parameter Account.deposit(#0))");
    assert_eq!(instance.get("balance").unwrap(), Value::from(10));

    // No parameter of withdraw is annotated
    assert_eq!(instance.call("withdraw", &[Value::from(-5)]).unwrap(), Value::from(15));
}

struct Uppercase {
    log: Log,
}

impl Aspect for Uppercase {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.around("shout", "@test:Tracked get property *", |_, ctxt| {
            let value = ctxt.proceed()?;
            Ok(value.as_str().map(|owner| Value::from(owner.to_uppercase())))
        });
        d.before("record", "@test:Tracked set property *", |aspect, ctxt| {
            aspect.log.push(format!("set {:?}", ctxt.arg(0)));
            Ok(None)
        });
    }
}

#[test]
fn property_accessors_are_woven_separately() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    let log = Log::default();
    weaver.enable(Arc::new(Uppercase { log: log.clone() })).unwrap();

    let instance = account.instantiate(vec![]).unwrap();
    instance.set("owner", "ada").unwrap();

    assert_eq!(instance.get("owner").unwrap(), Value::from("ADA"));
    assert_eq!(instance.field("owner"), Some(Value::from("ada")));
    assert_eq!(log.entries(), vec![r#"set Some("ada")"#]);

    let getter = account.execution_plan(JoinpointKind::Get, "owner").unwrap();
    let setter = account.execution_plan(JoinpointKind::Set, "owner").unwrap();
    assert_eq!(getter.advices(PointcutPhase::Around).len(), 1);
    assert!(getter.advices(PointcutPhase::Before).is_empty());
    assert_eq!(setter.advices(PointcutPhase::Before).len(), 1);
    assert!(setter.advices(PointcutPhase::Around).is_empty());
}

struct SetterOverride;

impl Aspect for SetterOverride {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.after_return("override", "set property owner", |_, _| Ok(Some(Value::from("eve"))));
    }
}

#[test]
fn setters_cannot_substitute_values() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    weaver.enable(AspectInstance::new(SetterOverride)).unwrap();

    let instance = account.instantiate(vec![]).unwrap();
    let err = instance.set("owner", "ada").unwrap_err();

    assert!(matches!(err, ExecutionError::Advice(AdviceError::SetterSubstitution { .. })));
    assert_eq!(
        err.to_string(),
        "Advice `afterReturn(set property owner)=>override` tried to substitute the value of a setter (property Account.owner)"
    );
}

struct Sneaky;

impl Aspect for Sneaky {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.before("sneak", "method describe", |_, _| Ok(Some(Value::from("sneaky"))));
    }
}

#[test]
fn before_advices_cannot_return_values() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    weaver.enable(AspectInstance::new(Sneaky)).unwrap();

    let instance = account.instantiate(vec![]).unwrap();
    let err = instance.call("describe", &[]).unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::Advice(AdviceError::UnexpectedReturn { phase: "before", .. })
    ));
}

struct Auditing {
    log: Log,
}

impl Aspect for Auditing {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.before("constructing", "@test:Audited class *", |aspect, ctxt| {
            aspect.log.push(format!("new {:?}", ctxt.args));
            Ok(None)
        });
        d.after_return("constructed", "@test:Audited class *", |aspect, ctxt| {
            let instance = ctxt.value.as_instance().unwrap();
            aspect.log.push(format!("balance {:?}", instance.field("balance")));
            Ok(None)
        });
    }
}

#[test]
fn construction_is_woven() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    let log = Log::default();
    weaver.enable(Arc::new(Auditing { log: log.clone() })).unwrap();

    let instance = account.instantiate(vec![Value::from(7)]).unwrap();
    assert_eq!(instance.class_name(), "Account");
    assert!(instance.is_instance_of(account.id()));
    assert_eq!(log.entries(), vec!["new [7]", "balance Some(7)"]);
}

struct NotAnInstance;

impl Aspect for NotAnInstance {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.around("replace", "class Account", |_, _| Ok(Some(Value::from(1))));
    }
}

#[test]
fn construction_must_produce_an_instance() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    weaver.enable(AspectInstance::new(NotAnInstance)).unwrap();

    let err = account.instantiate(vec![]).unwrap_err();
    assert!(matches!(err, ExecutionError::Advice(AdviceError::NotAnInstance { .. })));
}

struct Generating {
    compilations: AtomicUsize,
}

impl Aspect for Generating {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.compile("greet", "@test:Generated method *", |aspect, ctxt| {
            aspect.compilations.fetch_add(1, Ordering::SeqCst);
            assert!(ctxt.symbol.is_none());
            Ok(Some(Symbol::method(|_, args| {
                let name = args.first().and_then(Value::as_str).unwrap_or("stranger");
                Ok(Value::from(format!("hello {name}")))
            })))
        });
    }
}

#[test]
fn compile_advices_run_once_per_plan() {
    let weaver = Weaver::new();
    let generated = weaver
        .annotations("test")
        .create(aspect_weaver::AnnotationKind::Method, "Generated")
        .unwrap();
    let greeter = weaver
        .class("Greeter")
        .abstract_method("greet")
        .annotate_method("greet", generated.bare())
        .build()
        .unwrap();
    let instance = greeter.instantiate(vec![]).unwrap();

    let err = instance.call("greet", &[]).unwrap_err();
    assert!(matches!(err, ExecutionError::Weaving(WeavingError::MissingSymbol { .. })));

    let aspect = Arc::new(Generating {
        compilations: AtomicUsize::new(0),
    });
    weaver.enable(aspect.clone()).unwrap();

    assert_eq!(instance.call("greet", &[Value::from("ada")]).unwrap(), Value::from("hello ada"));
    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("hello stranger"));
    assert_eq!(aspect.compilations.load(Ordering::SeqCst), 1);
    assert!(
        greeter
            .execution_plan(JoinpointKind::Call, "greet")
            .unwrap()
            .is_compiled()
    );
}

struct Mismatched;

impl Aspect for Mismatched {
    fn declare(d: &mut AspectDeclaration<Self>) {
        d.aspect(AspectOptions::new());

        d.compile("ctor", "method describe", |_, _| {
            Ok(Some(Symbol::constructor(|_, _| Ok(()))))
        });
    }
}

#[test]
fn compile_advices_must_return_compatible_symbols() {
    let weaver = Weaver::new();
    let annotations = Annotations::new(&weaver);
    let account = account(&weaver, &annotations);
    weaver.enable(AspectInstance::new(Mismatched)).unwrap();

    let instance = account.instantiate(vec![]).unwrap();
    let err = instance.call("describe", &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Compile advice `compile(method describe)=>ctor` returned a constructor for method Account.describe, expected a method"
    );
}
