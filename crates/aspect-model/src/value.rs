// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Values flowing through woven code: arguments, return values, property values and instances.

use std::{any::Any, fmt, sync::Arc};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{class::ClassId, error::ExecutionError};

#[derive(Clone)]
pub enum Value {
    Json(serde_json::Value),
    Instance(Instance),
    Class(ClassId),
    /// A value the engine passes along without looking into it (a future, a handle, ...).
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn null() -> Self {
        Value::Json(serde_json::Value::Null)
    }

    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Arc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Json(serde_json::Value::Null))
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            Value::Class(class) => Some(*class),
            _ => None,
        }
    }

    pub fn as_opaque<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Opaque(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_json().and_then(serde_json::Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_json().and_then(serde_json::Value::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(serde_json::Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_json().and_then(serde_json::Value::as_bool)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Json(value) => write!(f, "{value}"),
            Value::Instance(instance) => write!(f, "<instance {}>", instance.class_name()),
            Value::Class(class) => write!(f, "<class {}>", class.arr_idx()),
            Value::Opaque(_) => write!(f, "<opaque>"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Instance(instance)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Json(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Json(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Json(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Json(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Json(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Json(value.into())
    }
}

/// How an instance reaches the (woven) members of its class.
///
/// Implemented by the weaver's woven classes. Instances only know this seam, so the model does not
/// depend on how weaving is performed.
pub trait InstanceDispatch: Send + Sync {
    fn class_id(&self) -> ClassId;

    fn class_name(&self) -> &str;

    fn is_instance_of(&self, class: ClassId) -> bool;

    fn call(
        &self,
        instance: &Instance,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ExecutionError>;

    fn get(&self, instance: &Instance, property: &str) -> Result<Value, ExecutionError>;

    fn set(&self, instance: &Instance, property: &str, value: Value)
    -> Result<(), ExecutionError>;
}

/// A reference to an object. Cloning shares the object; identity is pointer identity.
#[derive(Clone)]
pub struct Instance(Arc<InstanceInner>);

struct InstanceInner {
    dispatch: Arc<dyn InstanceDispatch>,
    fields: RwLock<IndexMap<String, Value>>,
}

impl Instance {
    pub fn new(dispatch: Arc<dyn InstanceDispatch>) -> Self {
        Instance(Arc::new(InstanceInner {
            dispatch,
            fields: RwLock::new(IndexMap::new()),
        }))
    }

    pub fn class_id(&self) -> ClassId {
        self.0.dispatch.class_id()
    }

    pub fn class_name(&self) -> &str {
        self.0.dispatch.class_name()
    }

    pub fn is_instance_of(&self, class: ClassId) -> bool {
        self.0.dispatch.is_instance_of(class)
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Invoke a method through the woven class.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, ExecutionError> {
        self.0.dispatch.call(self, method, args)
    }

    /// Read a property through the woven class.
    pub fn get(&self, property: &str) -> Result<Value, ExecutionError> {
        self.0.dispatch.get(self, property)
    }

    /// Write a property through the woven class.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<(), ExecutionError> {
        self.0.dispatch.set(self, property, value.into())
    }

    /// Raw field storage, bypassing any accessor.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.0.fields.read().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: impl Into<Value>) {
        self.0.fields.write().insert(name.to_string(), value.into());
    }

    pub fn field_names(&self) -> Vec<String> {
        self.0.fields.read().keys().cloned().collect()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.class_name());
        for (name, value) in self.0.fields.read().iter() {
            s.field(name, value);
        }
        s.finish()
    }
}
