// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashMap, sync::Arc};

use aspect_common::WeaverConfig;
use aspect_model::{
    Reflection,
    class::ClassId,
    error::{ExecutionError, WeavingError},
    symbol::Symbol,
    target::DecoratorArgs,
    value::{Instance, Value},
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::{
    advice_registry::AdviceRegistry,
    aspect_registry::AspectRegistry,
    context::AdviceContext,
    execution_plan::ExecutionPlan,
    plan_factory::PlanFactory,
    strategy::{
        ClassWeavingStrategy, MethodWeavingStrategy, PropertyGetWeavingStrategy,
        PropertySetWeavingStrategy, WeavingStrategy,
    },
    woven::{WovenClass, WovenSlot},
};

struct Strategies {
    class: Arc<dyn WeavingStrategy>,
    method: Arc<dyn WeavingStrategy>,
    get: Arc<dyn WeavingStrategy>,
    set: Arc<dyn WeavingStrategy>,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            class: Arc::new(ClassWeavingStrategy),
            method: Arc::new(MethodWeavingStrategy),
            get: Arc::new(PropertyGetWeavingStrategy),
            set: Arc::new(PropertySetWeavingStrategy),
        }
    }
}

/// Every registry of one weaver. Independent contexts share nothing.
pub struct WeavingContext {
    pub(crate) config: WeaverConfig,
    pub(crate) reflection: Reflection,
    pub(crate) aspects: AspectRegistry,
    pub(crate) advices: AdviceRegistry,
    pub(crate) plans: PlanFactory,
    strategies: Strategies,
    woven: RwLock<HashMap<ClassId, Arc<WovenClass>>>,
}

/// What a class declares, captured under the class arena lock.
struct ClassShape {
    name: String,
    reference: String,
    ancestry: Vec<ClassId>,
    constructor: Option<Symbol>,
    methods: Vec<(String, Option<Symbol>)>,
    properties: Vec<(String, Option<Symbol>)>,
}

impl WeavingContext {
    pub(crate) fn new(config: WeaverConfig) -> Self {
        Self {
            plans: PlanFactory::new(config.plan_cache),
            config,
            reflection: Reflection::default(),
            aspects: AspectRegistry::default(),
            advices: AdviceRegistry::default(),
            strategies: Strategies::default(),
            woven: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn plan(&self, slot: &WovenSlot) -> Arc<ExecutionPlan> {
        self.plans
            .create(&self.reflection, &self.advices, &slot.target, &slot.strategy)
    }

    pub(crate) fn execute(
        &self,
        slot: &WovenSlot,
        instance: Option<Instance>,
        args: Vec<Value>,
    ) -> Result<Value, ExecutionError> {
        if !self.config.enabled {
            let symbol = slot
                .natural
                .clone()
                .ok_or_else(|| WeavingError::MissingSymbol {
                    label: slot.target.label.clone(),
                })?;
            let original = slot.strategy.link(symbol, &slot.target)?;
            let mut ctxt = AdviceContext::new(slot.target.clone(), vec![], instance, args);
            return original(&mut ctxt);
        }

        self.plan(slot).execute(&slot.natural, instance, args)
    }

    pub(crate) fn woven(&self, class: ClassId) -> Option<Arc<WovenClass>> {
        self.woven.read().get(&class).cloned()
    }

    #[instrument(skip_all, fields(class = class.arr_idx()))]
    pub(crate) fn weave(self: &Arc<Self>, class: ClassId) -> Result<Arc<WovenClass>, ExecutionError> {
        if let Some(woven) = self.woven(class) {
            return Ok(woven);
        }

        let shape = self.shape(class)?;

        let constructor = WovenSlot {
            target: self.reflection.resolve(&DecoratorArgs::class(class))?,
            strategy: self.strategies.class.clone(),
            natural: shape.constructor,
        };

        let mut methods = IndexMap::new();
        for (name, natural) in shape.methods {
            let slot = WovenSlot {
                target: self.reflection.resolve(&DecoratorArgs::member(class, &name))?,
                strategy: self.strategies.method.clone(),
                natural,
            };
            methods.insert(name, slot);
        }

        let mut getters = IndexMap::new();
        let mut setters = IndexMap::new();
        for (name, natural) in shape.properties {
            let target = self.reflection.resolve(&DecoratorArgs::member(class, &name))?;
            getters.insert(
                name.clone(),
                WovenSlot {
                    target: target.clone(),
                    strategy: self.strategies.get.clone(),
                    natural: natural.clone(),
                },
            );
            setters.insert(
                name,
                WovenSlot {
                    target,
                    strategy: self.strategies.set.clone(),
                    natural,
                },
            );
        }

        debug!(
            class = %shape.reference,
            methods = methods.len(),
            properties = getters.len(),
            "woven class"
        );

        let woven = Arc::new(WovenClass {
            id: class,
            name: shape.name,
            reference: shape.reference,
            ancestry: shape.ancestry,
            context: Arc::downgrade(self),
            constructor,
            methods,
            getters,
            setters,
        });

        Ok(self.woven.write().entry(class).or_insert(woven).clone())
    }

    fn shape(&self, class: ClassId) -> Result<ClassShape, WeavingError> {
        let classes = self.reflection.classes();
        let descriptor = classes.get(class)?;
        let (method_names, property_names) = classes.member_names(class);

        let natural = |strategy: &Arc<dyn WeavingStrategy>, name: &str| {
            strategy.natural_symbol(&classes, class, name)
        };

        Ok(ClassShape {
            name: descriptor.name.clone(),
            reference: descriptor.reference.clone(),
            ancestry: classes.ancestry(class),
            constructor: natural(&self.strategies.class, &descriptor.name),
            methods: method_names
                .into_iter()
                .map(|name| {
                    let symbol = natural(&self.strategies.method, &name);
                    (name, symbol)
                })
                .collect(),
            properties: property_names
                .into_iter()
                .map(|name| {
                    let symbol = natural(&self.strategies.get, &name);
                    (name, symbol)
                })
                .collect(),
        })
    }
}
