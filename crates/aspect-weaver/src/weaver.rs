// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use aspect_common::{EnvError, Environment, WeaverConfig};
use aspect_model::{
    Reflection,
    annotation::{AnnotationApplication, AnnotationContext, AnnotationFactory},
    class::ClassId,
    error::ExecutionError,
    target::DecoratorArgs,
};
use tracing::{info, instrument};

use crate::{
    advice::Advice,
    aspect::AspectInstance,
    aspect_registry::RegisteredAspect,
    class_builder::ClassBuilder,
    error::RegistrationError,
    weaving_context::WeavingContext,
    woven::WovenClass,
};

/// Entry point: declares classes, weaves them and enables or disables aspects.
///
/// Cloning is cheap; clones share the same registries.
#[derive(Clone)]
pub struct Weaver {
    context: Arc<WeavingContext>,
}

impl Default for Weaver {
    fn default() -> Self {
        Self::with_config(WeaverConfig::default())
    }
}

impl Weaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WeaverConfig) -> Self {
        Self {
            context: Arc::new(WeavingContext::new(config)),
        }
    }

    pub fn from_env(env: &dyn Environment) -> Result<Self, EnvError> {
        Ok(Self::with_config(WeaverConfig::from_env(env)?))
    }

    pub fn config(&self) -> &WeaverConfig {
        &self.context.config
    }

    pub fn reflection(&self) -> &Reflection {
        &self.context.reflection
    }

    /// Creates annotations in `group_id`.
    pub fn annotations(&self, group_id: impl Into<String>) -> AnnotationFactory {
        self.context.reflection.annotation_factory(group_id)
    }

    pub fn class(&self, name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(self.context.clone(), name)
    }

    /// Annotate an element of an already declared class.
    pub fn decorate(
        &self,
        args: &DecoratorArgs,
        application: AnnotationApplication,
    ) -> Result<Arc<AnnotationContext>, ExecutionError> {
        let context = self.context.reflection.decorate(args, application)?;
        self.context.plans.invalidate();
        Ok(context)
    }

    /// Weave a class registered through [`Weaver::reflection`]. Weaving twice returns the same
    /// woven class.
    pub fn weave(&self, class: ClassId) -> Result<Arc<WovenClass>, ExecutionError> {
        self.context.weave(class)
    }

    pub fn woven(&self, class: ClassId) -> Option<Arc<WovenClass>> {
        self.context.woven(class)
    }

    #[instrument(skip_all)]
    pub fn enable(
        &self,
        aspect: impl Into<AspectInstance>,
    ) -> Result<Arc<RegisteredAspect>, RegistrationError> {
        let registration = self
            .context
            .aspects
            .register(aspect.into(), self.context.config.strict_aspect_ids)?;
        let aspect = registration.aspect;

        if registration.replaced {
            self.context.advices.unregister_aspect(aspect.id());
        }

        let count = registration.advices.len();
        for advice in registration.advices {
            self.context.advices.register(Arc::new(advice));
        }
        self.context.plans.invalidate();

        info!(aspect = aspect.id(), advices = count, "enabled aspect");
        Ok(aspect)
    }

    /// Enable each aspect in turn, stopping at the first failure.
    pub fn enable_all(
        &self,
        aspects: impl IntoIterator<Item = AspectInstance>,
    ) -> Result<Vec<Arc<RegisteredAspect>>, RegistrationError> {
        aspects
            .into_iter()
            .map(|aspect| self.enable(aspect))
            .collect()
    }

    /// Returns whether an aspect with this id was enabled.
    #[instrument(skip(self))]
    pub fn disable(&self, id: &str) -> bool {
        let removed = self.context.aspects.remove(id).is_some();
        let advices = self.context.advices.unregister_aspect(id);

        if removed {
            self.context.plans.invalidate();
            info!(advices, "disabled aspect");
        }
        removed
    }

    /// Drop every execution plan. Enabled aspects stay enabled; plans are rebuilt on next use.
    #[instrument(skip_all)]
    pub fn reset(&self) {
        self.context.plans.clear();
        info!("cleared execution plans");
    }

    pub fn aspect(&self, id: &str) -> Option<Arc<RegisteredAspect>> {
        self.context.aspects.get(id)
    }

    pub fn aspect_ids(&self) -> Vec<String> {
        self.context.aspects.ids()
    }

    pub fn advices_by_aspect(&self, id: &str) -> Vec<Arc<Advice>> {
        self.context.advices.advices_by_aspect(id)
    }
}
