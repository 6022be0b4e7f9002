// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Pointcuts: which elements (by kind, annotations and name) an advice applies to, and in which
//! phase.
//!
//! An expression reads `@group:Name|@group:Other <kind> <name pattern>`, for example
//! `@demo:Log method *` or `set property user*`.

mod expression;
mod pointcut;

pub use expression::{PointcutExpression, PointcutType};
pub use pointcut::{Pointcut, PointcutPhase};

use aspect_model::annotation::InvalidAnnotationRef;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PointcutError {
    #[error("Empty pointcut expression")]
    Empty,

    #[error(transparent)]
    InvalidAnnotation(#[from] InvalidAnnotationRef),

    #[error("Unknown element kind `{0}` in pointcut expression, expected one of: class, method, property, get property, set property, parameter, any")]
    UnknownType(String),

    #[error("Unexpected `{token}` at the end of pointcut expression `{expression}`")]
    TrailingInput { token: String, expression: String },
}
