// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

use crate::annotation::{AnnotationKind, AnnotationRef};

/// An inconsistency inside the engine itself.
///
/// These are fatal: after-throw advices never see them and they always reach the caller.
#[derive(Error, Debug)]
pub enum WeavingError {
    #[error("Unknown class `{0}`")]
    UnknownClass(String),

    #[error("Class `{class}` has no member `{member}`")]
    UnknownMember { class: String, member: String },

    #[error("Member `{member}` is declared twice on class `{class}`")]
    DuplicateMember { class: String, member: String },

    #[error("No compile advice nor original definition is available for {label}")]
    MissingSymbol { label: String },

    #[error("{label} has no {accessor}")]
    MissingAccessor {
        label: String,
        accessor: &'static str,
    },

    #[error("Annotation {annotation} applies to {expected} targets only, not to {label}")]
    InvalidAnnotationTarget {
        annotation: AnnotationRef,
        expected: AnnotationKind,
        label: String,
    },

    #[error("Annotation {annotation} is already declared as a {existing} annotation")]
    AnnotationKindConflict {
        annotation: AnnotationRef,
        existing: AnnotationKind,
    },

    #[error("{0} is not a constructor nor instance")]
    NotAConstructorNorInstance(String),

    #[error("{label} was invoked without an instance")]
    MissingInstance { label: String },

    #[error("The weaving context of class `{0}` has been dropped")]
    ContextDropped(String),
}

/// An advice broke the contract of the phase it was declared for.
///
/// Raised at the point of violation. Like [`WeavingError`], other advices cannot recover from it.
#[derive(Error, Debug)]
pub enum AdviceError {
    #[error("{phase} advice `{advice}` returned a value for {label}; {phase} advices must not return values")]
    UnexpectedReturn {
        phase: &'static str,
        advice: String,
        label: String,
    },

    #[error("Advice `{advice}` tried to substitute the value of a setter ({label})")]
    SetterSubstitution { advice: String, label: String },

    #[error("Advice `{advice}` replaced the instance of {label} with a value that is not an instance")]
    NotAnInstance { advice: String, label: String },

    #[error("Compile advice `{advice}` returned a {found} for {label}, expected a {expected}")]
    IncompatibleSymbol {
        advice: String,
        label: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Joinpoint of {label} can only be invoked from an around advice")]
    JoinpointUnavailable { label: String },
}

/// Descriptive error raised by an aspect (for example when a required annotation is missing).
#[derive(Error, Debug)]
#[error("{message} (on {label})")]
pub struct AspectError {
    pub label: String,
    pub message: String,
}

impl AspectError {
    pub fn new(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            message: message.into(),
        }
    }
}

/// The error type of every woven invocation (construction, call, property access).
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Weaving(#[from] WeavingError),

    #[error(transparent)]
    Advice(#[from] AdviceError),

    #[error(transparent)]
    Aspect(#[from] AspectError),

    /// Raised by the original code or by an advice body.
    #[error("{0}")]
    Thrown(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ExecutionError {
    pub fn thrown(error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        ExecutionError::Thrown(error.into())
    }

    /// Fatal errors bypass the after-throw machinery.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutionError::Weaving(_) | ExecutionError::Advice(_))
    }

    pub fn downcast_thrown<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            ExecutionError::Thrown(error) => error.downcast_ref::<E>(),
            _ => None,
        }
    }
}
