// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use aspect_model::{
    class::ClassId,
    error::{AdviceError, ExecutionError, WeavingError},
    symbol::Symbol,
    target::AnnotationTarget,
    value::{Instance, InstanceDispatch, Value},
};
use indexmap::IndexMap;

use crate::{
    execution_plan::ExecutionPlan,
    strategy::{JoinpointKind, WeavingStrategy},
    weaving_context::WeavingContext,
};

/// One intercepted entry of a woven class.
pub(crate) struct WovenSlot {
    pub target: Arc<AnnotationTarget>,
    pub strategy: Arc<dyn WeavingStrategy>,
    /// What the class hierarchy declares for the element.
    pub natural: Option<Symbol>,
}

/// A class whose constructor, methods and property accessors all run through execution plans.
///
/// Immutable once woven. Instances created by [`WovenClass::instantiate`] dispatch through it.
pub struct WovenClass {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    pub(crate) reference: String,
    pub(crate) ancestry: Vec<ClassId>,
    pub(crate) context: Weak<WeavingContext>,
    pub(crate) constructor: WovenSlot,
    pub(crate) methods: IndexMap<String, WovenSlot>,
    pub(crate) getters: IndexMap<String, WovenSlot>,
    pub(crate) setters: IndexMap<String, WovenSlot>,
}

impl WovenClass {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The class as a value, for instance to hand it to an advice.
    pub fn as_value(&self) -> Value {
        Value::Class(self.id)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.getters.keys().map(String::as_str)
    }

    pub fn target(&self) -> &Arc<AnnotationTarget> {
        &self.constructor.target
    }

    /// Allocate an instance and run the construction plan over it.
    pub fn instantiate(self: &Arc<Self>, args: Vec<Value>) -> Result<Instance, ExecutionError> {
        let context = self.context()?;
        let instance = Instance::new(self.clone());

        let value = context.execute(&self.constructor, Some(instance), args)?;

        match value {
            Value::Instance(instance) => Ok(instance),
            _ => Err(AdviceError::NotAnInstance {
                advice: "construction".to_string(),
                label: self.constructor.target.label.clone(),
            }
            .into()),
        }
    }

    /// The current plan of an element (`member` is ignored for constructions).
    pub fn execution_plan(
        &self,
        kind: JoinpointKind,
        member: &str,
    ) -> Result<Arc<ExecutionPlan>, ExecutionError> {
        let slot = match kind {
            JoinpointKind::Construction => Some(&self.constructor),
            JoinpointKind::Call => self.methods.get(member),
            JoinpointKind::Get => self.getters.get(member),
            JoinpointKind::Set => self.setters.get(member),
        }
        .ok_or_else(|| self.unknown_member(member))?;

        Ok(self.context()?.plan(slot))
    }

    fn context(&self) -> Result<Arc<WeavingContext>, WeavingError> {
        self.context
            .upgrade()
            .ok_or_else(|| WeavingError::ContextDropped(self.reference.clone()))
    }

    fn unknown_member(&self, member: &str) -> WeavingError {
        WeavingError::UnknownMember {
            class: self.reference.clone(),
            member: member.to_string(),
        }
    }
}

impl InstanceDispatch for WovenClass {
    fn class_id(&self) -> ClassId {
        self.id
    }

    fn class_name(&self) -> &str {
        &self.name
    }

    fn is_instance_of(&self, class: ClassId) -> bool {
        self.ancestry.contains(&class)
    }

    fn call(
        &self,
        instance: &Instance,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ExecutionError> {
        let slot = self
            .methods
            .get(method)
            .ok_or_else(|| self.unknown_member(method))?;

        self.context()?
            .execute(slot, Some(instance.clone()), args.to_vec())
    }

    /// Undeclared properties read the raw field.
    fn get(&self, instance: &Instance, property: &str) -> Result<Value, ExecutionError> {
        match self.getters.get(property) {
            Some(slot) => self.context()?.execute(slot, Some(instance.clone()), vec![]),
            None => Ok(instance.field(property).unwrap_or_else(Value::null)),
        }
    }

    fn set(&self, instance: &Instance, property: &str, value: Value) -> Result<(), ExecutionError> {
        match self.setters.get(property) {
            Some(slot) => self
                .context()?
                .execute(slot, Some(instance.clone()), vec![value])
                .map(|_| ()),
            None => {
                instance.set_field(property, value);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for WovenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WovenClass")
            .field("reference", &self.reference)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("properties", &self.getters.keys().collect::<Vec<_>>())
            .finish()
    }
}
