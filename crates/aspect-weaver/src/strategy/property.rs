// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Properties are woven as two independent elements, the getter and the setter. Both compile from
//! the same declared descriptor, each with its own plan.

use std::sync::Arc;

use aspect_model::{
    class::{ClassArena, ClassId},
    error::{AdviceError, WeavingError},
    symbol::Symbol,
    target::AnnotationTarget,
    value::Value,
};
use aspect_pointcut::PointcutPhase;

use super::{JoinpointKind, Original, WeavingStrategy, this};
use crate::{advice::Advice, context::AdviceContext};

fn declared_descriptor(classes: &ClassArena, class: ClassId, name: &str) -> Option<Symbol> {
    classes
        .find_property(class, name)
        .map(|(_, property)| Symbol::Property(property.descriptor.clone()))
}

pub struct PropertyGetWeavingStrategy;

impl WeavingStrategy for PropertyGetWeavingStrategy {
    fn kind(&self) -> JoinpointKind {
        JoinpointKind::Get
    }

    fn natural_symbol(&self, classes: &ClassArena, class: ClassId, name: &str) -> Option<Symbol> {
        declared_descriptor(classes, class, name)
    }

    fn symbol_kind(&self) -> &'static str {
        "property descriptor"
    }

    fn accepts(&self, symbol: &Symbol) -> bool {
        matches!(symbol, Symbol::Property(_))
    }

    fn link(&self, symbol: Symbol, target: &AnnotationTarget) -> Result<Original, WeavingError> {
        let getter = match symbol {
            Symbol::Property(descriptor) => descriptor.get,
            _ => None,
        }
        .ok_or_else(|| WeavingError::MissingAccessor {
            label: target.label.clone(),
            accessor: "getter",
        })?;

        Ok(Arc::new(move |ctxt: &mut AdviceContext| {
            let instance = this(ctxt)?;
            getter(&instance)
        }))
    }
}

pub struct PropertySetWeavingStrategy;

impl WeavingStrategy for PropertySetWeavingStrategy {
    fn kind(&self) -> JoinpointKind {
        JoinpointKind::Set
    }

    fn natural_symbol(&self, classes: &ClassArena, class: ClassId, name: &str) -> Option<Symbol> {
        declared_descriptor(classes, class, name)
    }

    fn symbol_kind(&self) -> &'static str {
        "property descriptor"
    }

    fn accepts(&self, symbol: &Symbol) -> bool {
        matches!(symbol, Symbol::Property(_))
    }

    /// The value being set is the first argument.
    fn link(&self, symbol: Symbol, target: &AnnotationTarget) -> Result<Original, WeavingError> {
        let setter = match symbol {
            Symbol::Property(descriptor) => descriptor.set,
            _ => None,
        }
        .ok_or_else(|| WeavingError::MissingAccessor {
            label: target.label.clone(),
            accessor: "setter",
        })?;

        Ok(Arc::new(move |ctxt: &mut AdviceContext| {
            let instance = this(ctxt)?;
            let value = ctxt.args.first().cloned().unwrap_or_else(Value::null);
            setter(&instance, value)?;
            Ok(Value::null())
        }))
    }

    fn check_value(
        &self,
        phase: PointcutPhase,
        advice: &Advice,
        _value: &Value,
        target: &AnnotationTarget,
    ) -> Result<(), AdviceError> {
        match phase {
            PointcutPhase::AfterReturn | PointcutPhase::AfterThrow => {
                Err(AdviceError::SetterSubstitution {
                    advice: advice.key(),
                    label: target.label.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
