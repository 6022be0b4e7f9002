// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! What advice bodies get to see and act on.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use aspect_model::{
    annotation::{AnnotationContext, AnnotationRef},
    error::{AdviceError, ExecutionError},
    symbol::Symbol,
    target::AnnotationTarget,
    value::{Instance, Value},
};

pub(crate) type JoinpointFn =
    Arc<dyn Fn(&mut AdviceContext) -> Result<Value, ExecutionError> + Send + Sync>;

/// Everything nested inside the around advice currently running.
#[derive(Clone)]
pub struct Joinpoint(JoinpointFn);

impl Joinpoint {
    pub(crate) fn new(
        next: impl Fn(&mut AdviceContext) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        Joinpoint(Arc::new(next))
    }
}

impl fmt::Debug for Joinpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Joinpoint")
    }
}

/// State of one invocation (construction, call or property access), shared by all the advices
/// that run for it.
pub struct AdviceContext {
    pub target: Arc<AnnotationTarget>,
    /// Annotations of the target (including those of a method's parameters), child class first.
    pub annotations: Vec<Arc<AnnotationContext>>,
    /// `this`. For constructions, the freshly allocated instance.
    pub instance: Option<Instance>,
    pub args: Vec<Value>,
    /// The value returned so far.
    pub value: Value,
    /// Free-form storage shared by the advices of this invocation.
    pub data: IndexMap<String, Value>,
    pub(crate) error: Option<ExecutionError>,
    pub(crate) joinpoint: Option<Joinpoint>,
}

impl AdviceContext {
    pub(crate) fn new(
        target: Arc<AnnotationTarget>,
        annotations: Vec<Arc<AnnotationContext>>,
        instance: Option<Instance>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            target,
            annotations,
            instance,
            args,
            value: Value::null(),
            data: IndexMap::new(),
            error: None,
            joinpoint: None,
        }
    }

    /// The error being handled, in after-throw advices (and in after advices of a failed
    /// invocation).
    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    pub fn joinpoint(&self) -> Option<&Joinpoint> {
        self.joinpoint.as_ref()
    }

    /// Run what the current around advice wraps, with the current arguments.
    pub fn proceed(&mut self) -> Result<Value, ExecutionError> {
        let joinpoint = self
            .joinpoint
            .clone()
            .ok_or_else(|| AdviceError::JoinpointUnavailable {
                label: self.target.label.clone(),
            })?;

        let value = (joinpoint.0)(self);
        // Nested around advices swapped in their own joinpoints
        self.joinpoint = Some(joinpoint);
        value
    }

    /// Run what the current around advice wraps, with replaced arguments.
    pub fn proceed_with(&mut self, args: Vec<Value>) -> Result<Value, ExecutionError> {
        self.args = args;
        self.proceed()
    }

    pub fn annotation(&self, reference: &AnnotationRef) -> Option<&Arc<AnnotationContext>> {
        self.annotations
            .iter()
            .find(|context| context.reference() == reference)
    }

    pub fn annotations_of<'a>(
        &'a self,
        reference: &'a AnnotationRef,
    ) -> impl Iterator<Item = &'a Arc<AnnotationContext>> + 'a {
        self.annotations
            .iter()
            .filter(move |context| context.reference() == reference)
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }
}

/// What compile advices see: the element being woven and the symbol compiled so far.
pub struct CompileContext {
    pub target: Arc<AnnotationTarget>,
    pub annotations: Vec<Arc<AnnotationContext>>,
    /// The natural symbol, or the replacement of a previous compile advice.
    pub symbol: Option<Symbol>,
}
