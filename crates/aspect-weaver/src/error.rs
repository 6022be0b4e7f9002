// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use aspect_model::error::AspectError;
use aspect_pointcut::PointcutError;
use thiserror::Error;

/// Why an aspect could not be enabled.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error(transparent)]
    NotAnAspect(#[from] AspectError),

    #[error("Invalid pointcut `{expression}` for advice `{advice}` of aspect `{aspect}`: {source}")]
    Pointcut {
        aspect: String,
        advice: String,
        expression: String,
        #[source]
        source: PointcutError,
    },

    #[error("An aspect with id `{0}` is already enabled")]
    DuplicateId(String),
}
