// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Weaves aspects into classes declared through a [`Weaver`].
//!
//! Aspects declare advices with pointcut expressions. Every constructor, method and property
//! accessor of a woven class runs through an execution plan made of the advices whose pointcuts
//! select it.

mod advice;
mod advice_registry;
mod aspect;
mod aspect_registry;
mod class_builder;
mod context;
mod error;
mod execution_plan;
mod order;
mod plan_factory;
mod strategy;
mod weaver;
mod weaving_context;
mod woven;

pub use advice::Advice;
pub use aspect::{AdviceDeclaration, Aspect, AspectDeclaration, AspectInstance, AspectOptions};
pub use aspect_registry::RegisteredAspect;
pub use class_builder::ClassBuilder;
pub use context::{AdviceContext, CompileContext, Joinpoint};
pub use error::RegistrationError;
pub use execution_plan::ExecutionPlan;
pub use order::{Order, Precedence};
pub use strategy::JoinpointKind;
pub use weaver::Weaver;
pub use woven::WovenClass;

pub use aspect_common::WeaverConfig;
pub use aspect_model::{
    annotation::{Annotation, AnnotationContext, AnnotationKind, AnnotationRef},
    error::{AdviceError, AspectError, ExecutionError, WeavingError},
    symbol::{PropertyDescriptor, Symbol},
    target::{AnnotationTarget, DecoratorArgs},
    value::{Instance, Value},
};
pub use aspect_pointcut::{Pointcut, PointcutPhase, PointcutType};
