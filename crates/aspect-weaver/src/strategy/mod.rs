// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! What differs between weaving a constructor, a method and a property accessor.
//!
//! Parameters have no strategy of their own: parameter annotations make the owning method woven,
//! and the method strategy accepts parameter pointcuts.

mod class;
mod method;
mod property;

pub use class::ClassWeavingStrategy;
pub use method::MethodWeavingStrategy;
pub use property::{PropertyGetWeavingStrategy, PropertySetWeavingStrategy};

use std::sync::Arc;

use aspect_model::{
    class::{ClassArena, ClassId},
    error::{AdviceError, ExecutionError, WeavingError},
    symbol::Symbol,
    target::AnnotationTarget,
    value::{Instance, Value},
};
use aspect_pointcut::{PointcutPhase, PointcutType};

use crate::{advice::Advice, context::AdviceContext};

/// The kind of invocation an execution plan intercepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinpointKind {
    Construction,
    Call,
    Get,
    Set,
}

impl JoinpointKind {
    /// The pointcut type of the element itself.
    pub fn pointcut_type(self) -> PointcutType {
        match self {
            JoinpointKind::Construction => PointcutType::Class,
            JoinpointKind::Call => PointcutType::Method,
            JoinpointKind::Get => PointcutType::GetProperty,
            JoinpointKind::Set => PointcutType::SetProperty,
        }
    }

    /// Every pointcut type (besides `any`) whose advices may apply.
    pub fn pointcut_types(self) -> &'static [PointcutType] {
        match self {
            JoinpointKind::Construction => &[PointcutType::Class],
            JoinpointKind::Call => &[PointcutType::Method, PointcutType::Parameter],
            JoinpointKind::Get => &[PointcutType::GetProperty],
            JoinpointKind::Set => &[PointcutType::SetProperty],
        }
    }
}

/// The compiled element, ready to run against an advice context.
pub type Original = Arc<dyn Fn(&mut AdviceContext) -> Result<Value, ExecutionError> + Send + Sync>;

pub trait WeavingStrategy: Send + Sync {
    fn kind(&self) -> JoinpointKind;

    /// The symbol the class hierarchy provides for the element, before any compile advice.
    fn natural_symbol(&self, classes: &ClassArena, class: ClassId, name: &str) -> Option<Symbol>;

    /// Name of the symbol kind this strategy compiles, for error messages.
    fn symbol_kind(&self) -> &'static str;

    fn accepts(&self, symbol: &Symbol) -> bool;

    /// Turn the compiled symbol into the callable the innermost joinpoint runs.
    fn link(&self, symbol: Symbol, target: &AnnotationTarget) -> Result<Original, WeavingError>;

    /// Validate a value an advice returned in `phase`.
    fn check_value(
        &self,
        _phase: PointcutPhase,
        _advice: &Advice,
        _value: &Value,
        _target: &AnnotationTarget,
    ) -> Result<(), AdviceError> {
        Ok(())
    }
}

fn this(ctxt: &AdviceContext) -> Result<Instance, WeavingError> {
    ctxt.instance
        .clone()
        .ok_or_else(|| WeavingError::MissingInstance {
            label: ctxt.target.label.clone(),
        })
}
