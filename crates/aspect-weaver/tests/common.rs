// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

#![allow(dead_code)]

use std::sync::Arc;

use aspect_weaver::{Annotation, AnnotationKind, ExecutionError, Value, Weaver, WovenClass};
use parking_lot::Mutex;

/// Entries pushed by advices and bodies, in execution order.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("insufficient funds to withdraw {0}")]
pub struct Overdrawn(pub i64);

pub struct Annotations {
    pub audited: Annotation,
    pub traced: Annotation,
    pub tracked: Annotation,
    pub positive: Annotation,
}

impl Annotations {
    pub fn new(weaver: &Weaver) -> Self {
        let factory = weaver.annotations("test");
        Self {
            audited: factory.create(AnnotationKind::Class, "Audited").unwrap(),
            traced: factory.create(AnnotationKind::Method, "Traced").unwrap(),
            tracked: factory.create(AnnotationKind::Property, "Tracked").unwrap(),
            positive: factory.create(AnnotationKind::Parameter, "Positive").unwrap(),
        }
    }
}

pub fn amount(args: &[Value]) -> i64 {
    args.first().and_then(Value::as_i64).unwrap_or_default()
}

/// `@Audited class Account` with a traced `deposit(@Positive amount)` and `withdraw(amount)`, an
/// untraced `describe()`, a plain `balance` and a `@Tracked owner`.
pub fn account(weaver: &Weaver, annotations: &Annotations) -> Arc<WovenClass> {
    weaver
        .class("Account")
        .annotate_class(annotations.audited.bare())
        .constructor(|this, args| {
            this.set_field("balance", amount(args));
            Ok(())
        })
        .property("balance")
        .property("owner")
        .annotate_property("owner", annotations.tracked.bare())
        .method("deposit", |this, args| {
            let balance = this.get("balance")?.as_i64().unwrap_or_default() + amount(args);
            this.set("balance", balance)?;
            Ok(Value::from(balance))
        })
        .annotate_method("deposit", annotations.traced.bare())
        .annotate_parameter("deposit", 0, annotations.positive.bare())
        .method("withdraw", |this, args| {
            let balance = this.get("balance")?.as_i64().unwrap_or_default();
            let requested = amount(args);
            if requested > balance {
                return Err(ExecutionError::thrown(Overdrawn(requested)));
            }
            this.set("balance", balance - requested)?;
            Ok(Value::from(balance - requested))
        })
        .annotate_method("withdraw", annotations.traced.bare())
        .method("describe", |this, _| {
            let balance = this.get("balance")?.as_i64().unwrap_or_default();
            Ok(Value::from(format!("account with {balance}")))
        })
        .build()
        .unwrap()
}
