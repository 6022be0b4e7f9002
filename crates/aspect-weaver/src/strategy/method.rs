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
    error::WeavingError,
    symbol::Symbol,
    target::AnnotationTarget,
};

use super::{JoinpointKind, Original, WeavingStrategy, this};
use crate::context::AdviceContext;

pub struct MethodWeavingStrategy;

impl WeavingStrategy for MethodWeavingStrategy {
    fn kind(&self) -> JoinpointKind {
        JoinpointKind::Call
    }

    /// The nearest body up the hierarchy; abstract methods have none.
    fn natural_symbol(&self, classes: &ClassArena, class: ClassId, name: &str) -> Option<Symbol> {
        classes
            .find_method(class, name)
            .and_then(|(_, method)| method.body.clone())
            .map(Symbol::Method)
    }

    fn symbol_kind(&self) -> &'static str {
        "method"
    }

    fn accepts(&self, symbol: &Symbol) -> bool {
        matches!(symbol, Symbol::Method(_))
    }

    fn link(&self, symbol: Symbol, target: &AnnotationTarget) -> Result<Original, WeavingError> {
        let Symbol::Method(body) = symbol else {
            return Err(WeavingError::MissingSymbol {
                label: target.label.clone(),
            });
        };

        Ok(Arc::new(move |ctxt: &mut AdviceContext| {
            let instance = this(ctxt)?;
            body(&instance, &ctxt.args)
        }))
    }
}
