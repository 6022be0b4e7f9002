// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Declaring aspects.
//!
//! ```ignore
//! struct Logging { calls: AtomicUsize }
//!
//! impl Aspect for Logging {
//!     fn declare(d: &mut AspectDeclaration<Self>) {
//!         d.aspect(AspectOptions::new().id("logging").order(Order::Highest));
//!         d.before("count", "@demo:Log method *", |logging, _ctxt| {
//!             logging.calls.fetch_add(1, Ordering::Relaxed);
//!             Ok(None)
//!         });
//!     }
//! }
//!
//! weaver.enable(AspectInstance::new(Logging::default()))?;
//! ```

use std::{any::Any, sync::Arc};

use aspect_model::{error::ExecutionError, symbol::Symbol, value::Value};
use aspect_pointcut::PointcutPhase;

use crate::{
    advice::{AdviceBody, CompileFn, RuntimeFn},
    context::{AdviceContext, CompileContext},
    order::Order,
};

pub trait Aspect: Send + Sync + 'static {
    /// Mark the type as an aspect (`d.aspect(..)`) and declare its advices.
    fn declare(declaration: &mut AspectDeclaration<Self>)
    where
        Self: Sized;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AspectOptions {
    pub id: Option<String>,
    pub order: Option<Order>,
}

impl AspectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn order(mut self, order: impl Into<Order>) -> Self {
        self.order = Some(order.into());
        self
    }
}

impl From<&str> for AspectOptions {
    fn from(id: &str) -> Self {
        AspectOptions::new().id(id)
    }
}

impl From<Order> for AspectOptions {
    fn from(order: Order) -> Self {
        AspectOptions::new().order(order)
    }
}

type DeclaredCompileFn<S> =
    Arc<dyn Fn(&S, &mut CompileContext) -> Result<Option<Symbol>, ExecutionError> + Send + Sync>;
type DeclaredRuntimeFn<S> =
    Arc<dyn Fn(&S, &mut AdviceContext) -> Result<Option<Value>, ExecutionError> + Send + Sync>;

enum DeclaredBody<S> {
    Compile(DeclaredCompileFn<S>),
    Runtime(DeclaredRuntimeFn<S>),
}

pub struct AdviceDeclaration<S> {
    name: String,
    phase: PointcutPhase,
    expression: String,
    order: Option<Order>,
    body: DeclaredBody<S>,
}

impl<S> AdviceDeclaration<S> {
    pub fn order(&mut self, order: impl Into<Order>) -> &mut Self {
        self.order = Some(order.into());
        self
    }
}

impl<S: Send + Sync + 'static> AdviceDeclaration<S> {
    fn bind(self, aspect: &Arc<S>) -> AdviceDefinition {
        let body = match self.body {
            DeclaredBody::Compile(body) => {
                let aspect = aspect.clone();
                let bound: CompileFn =
                    Arc::new(move |ctxt: &mut CompileContext| body(&*aspect, ctxt));
                AdviceBody::Compile(bound)
            }
            DeclaredBody::Runtime(body) => {
                let aspect = aspect.clone();
                let bound: RuntimeFn =
                    Arc::new(move |ctxt: &mut AdviceContext| body(&*aspect, ctxt));
                AdviceBody::Runtime(bound)
            }
        };

        AdviceDefinition {
            name: self.name,
            phase: self.phase,
            expression: self.expression,
            order: self.order,
            body,
        }
    }
}

/// Collects what an [`Aspect`] declares about itself.
pub struct AspectDeclaration<S> {
    options: Option<AspectOptions>,
    advices: Vec<AdviceDeclaration<S>>,
}

impl<S> AspectDeclaration<S> {
    fn new() -> Self {
        Self {
            options: None,
            advices: vec![],
        }
    }

    pub fn aspect(&mut self, options: impl Into<AspectOptions>) {
        self.options = Some(options.into());
    }

    pub fn compile(
        &mut self,
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&S, &mut CompileContext) -> Result<Option<Symbol>, ExecutionError>
        + Send
        + Sync
        + 'static,
    ) -> &mut AdviceDeclaration<S> {
        self.push(
            name,
            PointcutPhase::Compile,
            pointcut,
            DeclaredBody::Compile(Arc::new(body)),
        )
    }

    /// Runs before the original. Must not return a value.
    pub fn before(
        &mut self,
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&S, &mut AdviceContext) -> Result<Option<Value>, ExecutionError>
        + Send
        + Sync
        + 'static,
    ) -> &mut AdviceDeclaration<S> {
        self.runtime(name, PointcutPhase::Before, pointcut, body)
    }

    /// Wraps everything nested inside it; `ctxt.proceed()` runs it. Returning `None` keeps
    /// `ctxt.value`.
    pub fn around(
        &mut self,
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&S, &mut AdviceContext) -> Result<Option<Value>, ExecutionError>
        + Send
        + Sync
        + 'static,
    ) -> &mut AdviceDeclaration<S> {
        self.runtime(name, PointcutPhase::Around, pointcut, body)
    }

    /// Runs once the original returned; `Some` replaces the returned value.
    pub fn after_return(
        &mut self,
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&S, &mut AdviceContext) -> Result<Option<Value>, ExecutionError>
        + Send
        + Sync
        + 'static,
    ) -> &mut AdviceDeclaration<S> {
        self.runtime(name, PointcutPhase::AfterReturn, pointcut, body)
    }

    /// Runs when the original failed (`ctxt.error()`). The error is considered handled: the caller
    /// receives the last value returned by an after-throw advice, or null. Returning `Err` rethrows.
    pub fn after_throw(
        &mut self,
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&S, &mut AdviceContext) -> Result<Option<Value>, ExecutionError>
        + Send
        + Sync
        + 'static,
    ) -> &mut AdviceDeclaration<S> {
        self.runtime(name, PointcutPhase::AfterThrow, pointcut, body)
    }

    /// Runs once per invocation whatever its outcome. Must not return a value.
    pub fn after(
        &mut self,
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&S, &mut AdviceContext) -> Result<Option<Value>, ExecutionError>
        + Send
        + Sync
        + 'static,
    ) -> &mut AdviceDeclaration<S> {
        self.runtime(name, PointcutPhase::After, pointcut, body)
    }

    fn runtime(
        &mut self,
        name: impl Into<String>,
        phase: PointcutPhase,
        pointcut: impl Into<String>,
        body: impl Fn(&S, &mut AdviceContext) -> Result<Option<Value>, ExecutionError>
        + Send
        + Sync
        + 'static,
    ) -> &mut AdviceDeclaration<S> {
        self.push(name, phase, pointcut, DeclaredBody::Runtime(Arc::new(body)))
    }

    fn push(
        &mut self,
        name: impl Into<String>,
        phase: PointcutPhase,
        pointcut: impl Into<String>,
        body: DeclaredBody<S>,
    ) -> &mut AdviceDeclaration<S> {
        self.advices.push(AdviceDeclaration {
            name: name.into(),
            phase,
            expression: pointcut.into(),
            order: None,
            body,
        });
        let last = self.advices.len() - 1;
        &mut self.advices[last]
    }
}

/// An advice declaration bound to one aspect instance, with its pointcut not parsed yet.
pub(crate) struct AdviceDefinition {
    pub name: String,
    pub phase: PointcutPhase,
    pub expression: String,
    pub order: Option<Order>,
    pub body: AdviceBody,
}

/// A type-erased aspect instance, ready to be enabled.
pub struct AspectInstance {
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
    pub(crate) options: Option<AspectOptions>,
    pub(crate) advices: Vec<AdviceDefinition>,
}

impl AspectInstance {
    pub fn new<A: Aspect>(aspect: A) -> Self {
        Self::from(Arc::new(aspect))
    }

    /// Override the id the aspect type declares. No effect on types that are not aspects.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        if let Some(options) = self.options.as_mut() {
            options.id = Some(id.into());
        }
        self
    }

    /// Override the order the aspect type declares. No effect on types that are not aspects.
    pub fn with_order(mut self, order: impl Into<Order>) -> Self {
        if let Some(options) = self.options.as_mut() {
            options.order = Some(order.into());
        }
        self
    }

    /// Short name of the aspect type (without its module path).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast<A: Aspect>(&self) -> Option<Arc<A>> {
        self.instance.clone().downcast::<A>().ok()
    }
}

impl<A: Aspect> From<Arc<A>> for AspectInstance {
    fn from(aspect: Arc<A>) -> Self {
        let mut declaration = AspectDeclaration::<A>::new();
        A::declare(&mut declaration);

        let advices = declaration
            .advices
            .into_iter()
            .map(|advice| advice.bind(&aspect))
            .collect();

        AspectInstance {
            type_name: short_type_name(std::any::type_name::<A>()),
            instance: aspect,
            options: declaration.options,
            advices,
        }
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
