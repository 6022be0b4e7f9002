// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Executable definitions of class members ("symbols").
//!
//! A symbol is what a compile advice may replace and what the linked joinpoint eventually runs.

use std::sync::Arc;

use crate::{
    error::ExecutionError,
    value::{Instance, Value},
};

/// Initializes a freshly allocated instance.
pub type ConstructorFn =
    Arc<dyn Fn(&Instance, &[Value]) -> Result<(), ExecutionError> + Send + Sync>;

pub type MethodFn =
    Arc<dyn Fn(&Instance, &[Value]) -> Result<Value, ExecutionError> + Send + Sync>;

pub type GetterFn = Arc<dyn Fn(&Instance) -> Result<Value, ExecutionError> + Send + Sync>;

pub type SetterFn = Arc<dyn Fn(&Instance, Value) -> Result<(), ExecutionError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct PropertyDescriptor {
    pub get: Option<GetterFn>,
    pub set: Option<SetterFn>,
}

impl PropertyDescriptor {
    /// Accessors reading and writing the instance field of the same name.
    pub fn field(name: &str) -> Self {
        let get_name = name.to_string();
        let set_name = name.to_string();

        PropertyDescriptor {
            get: Some(Arc::new(move |instance: &Instance| {
                Ok(instance.field(&get_name).unwrap_or_else(Value::null))
            })),
            set: Some(Arc::new(move |instance: &Instance, value: Value| {
                instance.set_field(&set_name, value);
                Ok(())
            })),
        }
    }

    pub fn with_getter(
        mut self,
        get: impl Fn(&Instance) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        self.get = Some(Arc::new(get));
        self
    }

    pub fn with_setter(
        mut self,
        set: impl Fn(&Instance, Value) -> Result<(), ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        self.set = Some(Arc::new(set));
        self
    }
}

#[derive(Clone)]
pub enum Symbol {
    Constructor(ConstructorFn),
    Method(MethodFn),
    Property(PropertyDescriptor),
}

impl Symbol {
    pub fn constructor(
        body: impl Fn(&Instance, &[Value]) -> Result<(), ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        Symbol::Constructor(Arc::new(body))
    }

    pub fn method(
        body: impl Fn(&Instance, &[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        Symbol::Method(Arc::new(body))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Constructor(_) => "constructor",
            Symbol::Method(_) => "method",
            Symbol::Property(_) => "property descriptor",
        }
    }
}
