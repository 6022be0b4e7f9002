// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use aspect_model::{
    class::{ClassArena, ClassId},
    error::{AdviceError, WeavingError},
    symbol::{ConstructorFn, Symbol},
    target::AnnotationTarget,
    value::{Instance, Value},
};
use aspect_pointcut::PointcutPhase;

use super::{JoinpointKind, Original, WeavingStrategy, this};
use crate::{advice::Advice, context::AdviceContext};

/// Weaves construction. The instance is allocated before any advice runs; the constructor only
/// initializes it.
pub struct ClassWeavingStrategy;

impl WeavingStrategy for ClassWeavingStrategy {
    fn kind(&self) -> JoinpointKind {
        JoinpointKind::Construction
    }

    /// The constructors of the hierarchy, root first, all called with the same arguments.
    fn natural_symbol(&self, classes: &ClassArena, class: ClassId, _name: &str) -> Option<Symbol> {
        let mut ancestry = classes.ancestry(class);
        ancestry.reverse();

        let constructors: Vec<ConstructorFn> = ancestry
            .into_iter()
            .filter_map(|ancestor| {
                classes
                    .get(ancestor)
                    .ok()
                    .and_then(|descriptor| descriptor.constructor.clone())
            })
            .collect();

        Some(Symbol::constructor(move |instance: &Instance, args: &[Value]| {
            constructors
                .iter()
                .try_for_each(|constructor| constructor(instance, args))
        }))
    }

    fn symbol_kind(&self) -> &'static str {
        "constructor"
    }

    fn accepts(&self, symbol: &Symbol) -> bool {
        matches!(symbol, Symbol::Constructor(_))
    }

    fn link(&self, symbol: Symbol, target: &AnnotationTarget) -> Result<Original, WeavingError> {
        let Symbol::Constructor(constructor) = symbol else {
            return Err(WeavingError::MissingSymbol {
                label: target.label.clone(),
            });
        };

        Ok(Arc::new(move |ctxt: &mut AdviceContext| {
            let instance = this(ctxt)?;
            constructor(&instance, &ctxt.args)?;
            Ok(Value::Instance(instance))
        }))
    }

    fn check_value(
        &self,
        phase: PointcutPhase,
        advice: &Advice,
        value: &Value,
        target: &AnnotationTarget,
    ) -> Result<(), AdviceError> {
        match (phase, value) {
            (PointcutPhase::Around | PointcutPhase::AfterReturn | PointcutPhase::AfterThrow, value)
                if value.as_instance().is_none() =>
            {
                Err(AdviceError::NotAnInstance {
                    advice: advice.key(),
                    label: target.label.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
