// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use aspect_model::{
    annotation::AnnotationApplication,
    class::{ClassDefinition, ClassId, MethodDeclaration, PropertyDeclaration},
    error::{ExecutionError, WeavingError},
    symbol::{ConstructorFn, MethodFn, PropertyDescriptor},
    target::DecoratorArgs,
    value::{Instance, Value},
};
use indexmap::IndexMap;

use crate::{weaving_context::WeavingContext, woven::WovenClass};

enum Element {
    Class,
    Member(String),
    Parameter(String, usize),
}

/// Declares a class, its members and their annotations, then weaves it.
///
/// Annotations are applied in declaration order once the class is registered, so that annotation
/// stubs see the complete class. When any application is rejected, the class is discarded and
/// none of its annotations are recorded.
pub struct ClassBuilder {
    context: Arc<WeavingContext>,
    name: String,
    parent: Option<ClassId>,
    constructor: Option<ConstructorFn>,
    methods: IndexMap<String, MethodDeclaration>,
    properties: IndexMap<String, PropertyDeclaration>,
    duplicate: Option<String>,
    annotations: Vec<(Element, AnnotationApplication)>,
}

impl ClassBuilder {
    pub(crate) fn new(context: Arc<WeavingContext>, name: impl Into<String>) -> Self {
        Self {
            context,
            name: name.into(),
            parent: None,
            constructor: None,
            methods: IndexMap::new(),
            properties: IndexMap::new(),
            duplicate: None,
            annotations: vec![],
        }
    }

    pub fn extends(mut self, parent: &WovenClass) -> Self {
        self.parent = Some(parent.id());
        self
    }

    /// Initializes the instance. Parent constructors run first, with the same arguments.
    pub fn constructor(
        mut self,
        body: impl Fn(&Instance, &[Value]) -> Result<(), ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        self.constructor = Some(Arc::new(body));
        self
    }

    pub fn method(
        self,
        name: impl Into<String>,
        body: impl Fn(&Instance, &[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        self.declare_method(name.into(), Some(Arc::new(body)))
    }

    /// A method without a body; some compile advice has to provide one.
    pub fn abstract_method(self, name: impl Into<String>) -> Self {
        self.declare_method(name.into(), None)
    }

    /// A property stored in the instance field of the same name.
    pub fn property(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let descriptor = PropertyDescriptor::field(&name);
        self.property_with(name, descriptor)
    }

    pub fn property_with(mut self, name: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        let name = name.into();
        self.check_duplicate(&name);
        self.properties.insert(
            name.clone(),
            PropertyDeclaration { name, descriptor },
        );
        self
    }

    pub fn annotate_class(mut self, application: AnnotationApplication) -> Self {
        self.annotations.push((Element::Class, application));
        self
    }

    pub fn annotate_method(
        mut self,
        method: impl Into<String>,
        application: AnnotationApplication,
    ) -> Self {
        self.annotations
            .push((Element::Member(method.into()), application));
        self
    }

    pub fn annotate_property(
        mut self,
        property: impl Into<String>,
        application: AnnotationApplication,
    ) -> Self {
        self.annotations
            .push((Element::Member(property.into()), application));
        self
    }

    pub fn annotate_parameter(
        mut self,
        method: impl Into<String>,
        index: usize,
        application: AnnotationApplication,
    ) -> Self {
        self.annotations
            .push((Element::Parameter(method.into(), index), application));
        self
    }

    pub fn build(self) -> Result<Arc<WovenClass>, ExecutionError> {
        if let Some(member) = self.duplicate {
            return Err(WeavingError::DuplicateMember {
                class: self.name,
                member,
            }
            .into());
        }

        let reflection = &self.context.reflection;
        let class = reflection.register_class(ClassDefinition {
            name: self.name,
            parent: self.parent,
            constructor: self.constructor,
            methods: self.methods,
            properties: self.properties,
        })?;

        let checked: Result<Vec<_>, ExecutionError> = self
            .annotations
            .into_iter()
            .map(|(element, application)| {
                let args = match element {
                    Element::Class => DecoratorArgs::class(class),
                    Element::Member(name) => DecoratorArgs::member(class, name),
                    Element::Parameter(method, index) => {
                        DecoratorArgs::parameter(class, method, index)
                    }
                };
                reflection.check(&args, application)
            })
            .collect();

        let contexts = match checked {
            Ok(contexts) => contexts,
            Err(error) => {
                reflection.discard_class(class);
                return Err(error);
            }
        };

        for context in contexts {
            reflection.record(context);
        }

        self.context.weave(class)
    }

    fn declare_method(mut self, name: String, body: Option<MethodFn>) -> Self {
        self.check_duplicate(&name);
        self.methods
            .insert(name.clone(), MethodDeclaration { name, body });
        self
    }

    fn check_duplicate(&mut self, name: &str) {
        if self.duplicate.is_none()
            && (self.methods.contains_key(name) || self.properties.contains_key(name))
        {
            self.duplicate = Some(name.to_string());
        }
    }
}
