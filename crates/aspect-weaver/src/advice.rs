// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt, sync::Arc};

use aspect_model::{error::ExecutionError, symbol::Symbol, value::Value};
use aspect_pointcut::{Pointcut, PointcutPhase};
use tracing::trace;

use crate::{
    context::{AdviceContext, CompileContext},
    order::Precedence,
};

pub(crate) type CompileFn =
    Arc<dyn Fn(&mut CompileContext) -> Result<Option<Symbol>, ExecutionError> + Send + Sync>;
pub(crate) type RuntimeFn =
    Arc<dyn Fn(&mut AdviceContext) -> Result<Option<Value>, ExecutionError> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum AdviceBody {
    Compile(CompileFn),
    Runtime(RuntimeFn),
}

/// An advice of an enabled aspect, bound to that aspect's instance.
pub struct Advice {
    name: String,
    pointcut: Pointcut,
    aspect_id: String,
    precedence: Precedence,
    body: AdviceBody,
}

impl Advice {
    pub(crate) fn new(
        name: String,
        pointcut: Pointcut,
        aspect_id: String,
        precedence: Precedence,
        body: AdviceBody,
    ) -> Self {
        Self {
            name,
            pointcut,
            aspect_id,
            precedence,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    pub fn phase(&self) -> PointcutPhase {
        self.pointcut.phase()
    }

    pub fn aspect_id(&self) -> &str {
        &self.aspect_id
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    /// `before(@demo:Log method *)=>log`
    pub fn key(&self) -> String {
        format!("{}=>{}", self.pointcut.reference(), self.name)
    }

    pub(crate) fn call(&self, ctxt: &mut AdviceContext) -> Result<Option<Value>, ExecutionError> {
        trace!(advice = %self.key(), aspect = %self.aspect_id, element = %ctxt.target.label, "calling advice");
        match &self.body {
            AdviceBody::Runtime(body) => body(ctxt),
            AdviceBody::Compile(_) => Ok(None),
        }
    }

    pub(crate) fn compile(
        &self,
        ctxt: &mut CompileContext,
    ) -> Result<Option<Symbol>, ExecutionError> {
        trace!(advice = %self.key(), aspect = %self.aspect_id, element = %ctxt.target.label, "calling compile advice");
        match &self.body {
            AdviceBody::Compile(body) => body(ctxt),
            AdviceBody::Runtime(_) => Ok(None),
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advice")
            .field("key", &self.key())
            .field("aspect", &self.aspect_id)
            .field("precedence", &self.precedence)
            .finish()
    }
}
