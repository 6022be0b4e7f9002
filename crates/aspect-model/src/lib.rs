// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Reflective model of annotated classes: class descriptors, annotations and the targets and
//! locations they are applied to.

pub mod annotation;
pub mod bundle;
pub mod class;
pub mod error;
pub mod location;
pub mod mapped_arena;
pub mod symbol;
pub mod target;
pub mod value;

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use annotation::{AnnotationApplication, AnnotationCatalog, AnnotationContext, AnnotationFactory};
use bundle::{AnnotationBundle, AnnotationRegistry};
use class::{ClassArena, ClassDefinition, ClassId};
use error::{ExecutionError, WeavingError};
use location::{ClassLocation, LocationFactory};
use target::{AnnotationTarget, DecoratorArgs, TargetFactory};
use value::Value;

/// Classes and the annotations applied to them, for one weaving context.
#[derive(Default)]
pub struct Reflection {
    classes: RwLock<ClassArena>,
    catalog: Arc<AnnotationCatalog>,
    targets: TargetFactory,
    locations: LocationFactory,
    annotations: AnnotationRegistry,
}

impl Reflection {
    pub fn annotation_factory(&self, group_id: impl Into<String>) -> AnnotationFactory {
        self.catalog.factory(group_id)
    }

    pub fn catalog(&self) -> &Arc<AnnotationCatalog> {
        &self.catalog
    }

    pub fn register_class(&self, definition: ClassDefinition) -> Result<ClassId, WeavingError> {
        let id = self.classes.write().register(definition)?;
        debug!(class = ?id, "registered class");
        Ok(id)
    }

    /// Undo [`Reflection::register_class`] for a class that has no subclass and no recorded
    /// annotation.
    pub fn discard_class(&self, class: ClassId) {
        let discarded = self.classes.write().discard(class);
        self.targets.forget(class);
        self.locations.forget(class);

        if let Some(descriptor) = discarded {
            debug!(class = %descriptor.reference, "discarded class");
        }
    }

    pub fn classes(&self) -> RwLockReadGuard<'_, ClassArena> {
        self.classes.read()
    }

    pub fn resolve(&self, args: &DecoratorArgs) -> Result<Arc<AnnotationTarget>, WeavingError> {
        let classes = self.classes.read();
        self.targets.resolve(&classes, &self.locations, args)
    }

    pub fn locate(&self, value: &Value) -> Result<ClassLocation, WeavingError> {
        let classes = self.classes.read();
        self.locations.locate(&classes, value)
    }

    pub fn bundle(&self, class: ClassId) -> AnnotationBundle {
        let classes = self.classes.read();
        self.annotations.bundle(&classes, class)
    }

    pub fn annotations(&self) -> &AnnotationRegistry {
        &self.annotations
    }

    /// Apply an annotation to the element described by `args`.
    ///
    /// The annotation's stub (if any) runs before the application is recorded and may reject it.
    pub fn decorate(
        &self,
        args: &DecoratorArgs,
        application: AnnotationApplication,
    ) -> Result<Arc<AnnotationContext>, ExecutionError> {
        let context = self.check(args, application)?;
        Ok(self.record(context))
    }

    /// Validate an application without recording it: the element must exist and be of the
    /// annotation's kind, and the stub must accept it.
    pub fn check(
        &self,
        args: &DecoratorArgs,
        application: AnnotationApplication,
    ) -> Result<AnnotationContext, ExecutionError> {
        let target = self.resolve(args)?;
        let annotation = application.annotation;

        if annotation.kind() != target.kind {
            return Err(WeavingError::InvalidAnnotationTarget {
                annotation: annotation.reference().clone(),
                expected: annotation.kind(),
                label: target.label.clone(),
            }
            .into());
        }

        if let Some(stub) = annotation.stub() {
            stub(&target, &application.args)?;
        }

        Ok(AnnotationContext {
            annotation,
            target,
            args: application.args,
        })
    }

    pub fn record(&self, context: AnnotationContext) -> Arc<AnnotationContext> {
        debug!(
            annotation = %context.annotation.reference(),
            element = %context.target.label,
            "decorated"
        );
        self.annotations.register(context)
    }
}
