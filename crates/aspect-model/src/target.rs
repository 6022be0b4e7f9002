// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
    annotation::AnnotationKind,
    class::{ClassArena, ClassId},
    error::WeavingError,
    location::{AnnotationLocation, LocationFactory},
};

/// The shape of a decorated element, as a decorator would see it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoratorArgs {
    pub class: ClassId,
    pub property_key: Option<String>,
    pub parameter_index: Option<usize>,
}

impl DecoratorArgs {
    pub fn class(class: ClassId) -> Self {
        Self {
            class,
            property_key: None,
            parameter_index: None,
        }
    }

    /// A method or a property, depending on what `key` names on the class.
    pub fn member(class: ClassId, key: impl Into<String>) -> Self {
        Self {
            class,
            property_key: Some(key.into()),
            parameter_index: None,
        }
    }

    pub fn parameter(class: ClassId, method: impl Into<String>, index: usize) -> Self {
        Self {
            class,
            property_key: Some(method.into()),
            parameter_index: Some(index),
        }
    }
}

/// Canonical identity of a decorated element.
pub struct AnnotationTarget {
    pub kind: AnnotationKind,
    pub class: ClassId,
    pub name: String,
    pub label: String,
    pub reference: String,
    pub property_key: Option<String>,
    pub parameter_index: Option<usize>,
    /// The class target of the class declaring the member; `None` on class targets.
    declaring: Option<Arc<AnnotationTarget>>,
    /// Class target for members, method target for parameters.
    pub parent: Option<Arc<AnnotationTarget>>,
    pub parent_class: Option<Arc<AnnotationTarget>>,
    pub location: AnnotationLocation,
}

impl AnnotationTarget {
    /// A class target is its own declaring class.
    pub fn declaring_class(self: &Arc<Self>) -> Arc<AnnotationTarget> {
        self.declaring.clone().unwrap_or_else(|| self.clone())
    }

    /// Class the member is resolved on; for parameters, the class of the method.
    pub fn class_name(&self) -> &str {
        match &self.parent {
            Some(parent) if self.kind != AnnotationKind::Class => parent.class_name(),
            _ => &self.name,
        }
    }
}

impl fmt::Debug for AnnotationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reference, self.kind)
    }
}

impl fmt::Display for AnnotationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Produces annotation targets, memoized per class under their reference string.
#[derive(Default)]
pub struct TargetFactory {
    targets: Mutex<HashMap<ClassId, HashMap<String, Arc<AnnotationTarget>>>>,
}

impl TargetFactory {
    pub fn resolve(
        &self,
        classes: &ClassArena,
        locations: &LocationFactory,
        args: &DecoratorArgs,
    ) -> Result<Arc<AnnotationTarget>, WeavingError> {
        let descriptor = classes.get(args.class)?;

        let kind = match (&args.property_key, args.parameter_index) {
            (None, None) => AnnotationKind::Class,
            (None, Some(_)) => {
                return Err(WeavingError::UnknownMember {
                    class: descriptor.reference.clone(),
                    member: "constructor".to_string(),
                });
            }
            (Some(key), index) => {
                let is_method = classes.find_method(args.class, key).is_some();
                let is_property = classes.find_property(args.class, key).is_some();
                match (is_method, index) {
                    (true, Some(_)) => AnnotationKind::Parameter,
                    (true, None) => AnnotationKind::Method,
                    (false, None) if is_property => AnnotationKind::Property,
                    (false, _) => {
                        return Err(WeavingError::UnknownMember {
                            class: descriptor.reference.clone(),
                            member: key.clone(),
                        });
                    }
                }
            }
        };

        let reference = Self::reference_of(&descriptor.reference, kind, args);

        if let Some(existing) = self.lookup(args.class, &reference) {
            return Ok(existing);
        }

        let location = locations.ensure(
            classes,
            args.class,
            kind,
            args.property_key.as_deref(),
            args.parameter_index,
        )?;

        let target = match kind {
            AnnotationKind::Class => {
                let parent_class = descriptor
                    .parent
                    .map(|parent| self.resolve(classes, locations, &DecoratorArgs::class(parent)))
                    .transpose()?;

                AnnotationTarget {
                    kind,
                    class: args.class,
                    name: descriptor.name.clone(),
                    label: format!("class {}", descriptor.name),
                    reference: reference.clone(),
                    property_key: None,
                    parameter_index: None,
                    declaring: None,
                    parent: None,
                    parent_class,
                    location,
                }
            }
            AnnotationKind::Method | AnnotationKind::Property => {
                let key = args.property_key.clone().unwrap_or_default();
                let class_target = self.resolve(classes, locations, &DecoratorArgs::class(args.class))?;
                let declaring_class = classes.declaring_class(args.class, &key).unwrap_or(args.class);
                let declaring = if declaring_class == args.class {
                    class_target.clone()
                } else {
                    self.resolve(classes, locations, &DecoratorArgs::class(declaring_class))?
                };

                let label = match kind {
                    AnnotationKind::Method => format!("method {}.{key}", descriptor.name),
                    _ => format!("property {}.{key}", descriptor.name),
                };

                AnnotationTarget {
                    kind,
                    class: args.class,
                    name: key.clone(),
                    label,
                    reference: reference.clone(),
                    property_key: Some(key),
                    parameter_index: None,
                    declaring: Some(declaring),
                    parent_class: class_target.parent_class.clone(),
                    parent: Some(class_target),
                    location,
                }
            }
            AnnotationKind::Parameter => {
                let key = args.property_key.clone().unwrap_or_default();
                let index = args.parameter_index.unwrap_or_default();
                let method_target = self.resolve(
                    classes,
                    locations,
                    &DecoratorArgs::member(args.class, key.clone()),
                )?;

                AnnotationTarget {
                    kind,
                    class: args.class,
                    name: key.clone(),
                    label: format!("parameter {}.{key}(#{index})", descriptor.name),
                    reference: reference.clone(),
                    property_key: Some(key),
                    parameter_index: Some(index),
                    declaring: method_target.declaring.clone(),
                    parent_class: method_target.parent_class.clone(),
                    parent: Some(method_target),
                    location,
                }
            }
        };

        let mut targets = self.targets.lock();
        let target = targets
            .entry(args.class)
            .or_default()
            .entry(reference)
            .or_insert_with(|| Arc::new(target))
            .clone();

        Ok(target)
    }

    /// A previously resolved target, by class and reference string.
    pub fn forget(&self, class: ClassId) {
        self.targets.lock().remove(&class);
    }

    pub fn lookup(&self, class: ClassId, reference: &str) -> Option<Arc<AnnotationTarget>> {
        self.targets
            .lock()
            .get(&class)
            .and_then(|targets| targets.get(reference))
            .cloned()
    }

    fn reference_of(class_reference: &str, kind: AnnotationKind, args: &DecoratorArgs) -> String {
        let key = args.property_key.as_deref().unwrap_or_default();
        match kind {
            AnnotationKind::Class => format!("c[{class_reference}]"),
            AnnotationKind::Method => format!("c[{class_reference}].m[{key}]"),
            AnnotationKind::Property => format!("c[{class_reference}].p[{key}]"),
            AnnotationKind::Parameter => format!(
                "c[{class_reference}].m[{key}].a[{}]",
                args.parameter_index.unwrap_or_default()
            ),
        }
    }
}
