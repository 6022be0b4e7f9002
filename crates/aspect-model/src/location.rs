// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Addressable locations of annotations.
//!
//! Each class gets one location tree mirroring its shape:
//!
//! ```text
//! class Account
//! ├── balance            (property)
//! └── deposit            (method)
//!     └── args: [#0, #1] (parameters)
//! ```
//!
//! Trees are built lazily, the first time a target of the class is resolved, and grow as more
//! members get decorated. An [`AnnotationLocation`] is the key the annotation registry is indexed
//! by.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{
    annotation::AnnotationKind,
    class::{ClassArena, ClassId},
    error::WeavingError,
    value::Value,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationLocation {
    Class(ClassId),
    Method(ClassId, String),
    Property(ClassId, String),
    Parameter(ClassId, String, usize),
}

impl AnnotationLocation {
    pub fn class(&self) -> ClassId {
        match self {
            AnnotationLocation::Class(class)
            | AnnotationLocation::Method(class, _)
            | AnnotationLocation::Property(class, _)
            | AnnotationLocation::Parameter(class, _, _) => *class,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationLocation::Class(_) => AnnotationKind::Class,
            AnnotationLocation::Method(..) => AnnotationKind::Method,
            AnnotationLocation::Property(..) => AnnotationKind::Property,
            AnnotationLocation::Parameter(..) => AnnotationKind::Parameter,
        }
    }

    /// Name of the member this location belongs to (the method, for parameters).
    pub fn member(&self) -> Option<&str> {
        match self {
            AnnotationLocation::Class(_) => None,
            AnnotationLocation::Method(_, name)
            | AnnotationLocation::Property(_, name)
            | AnnotationLocation::Parameter(_, name, _) => Some(name),
        }
    }

    /// The location of the same shape on another class of the hierarchy.
    pub fn rebase(&self, class: ClassId) -> AnnotationLocation {
        match self {
            AnnotationLocation::Class(_) => AnnotationLocation::Class(class),
            AnnotationLocation::Method(_, name) => AnnotationLocation::Method(class, name.clone()),
            AnnotationLocation::Property(_, name) => {
                AnnotationLocation::Property(class, name.clone())
            }
            AnnotationLocation::Parameter(_, name, index) => {
                AnnotationLocation::Parameter(class, name.clone(), *index)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClassLocation {
    pub location: AnnotationLocation,
    pub parent: Option<ClassId>,
    members: IndexMap<String, MemberLocation>,
}

impl ClassLocation {
    /// Members located on this class itself.
    pub fn members(&self) -> impl Iterator<Item = &MemberLocation> {
        self.members.values()
    }

    pub fn member(&self, name: &str) -> Option<&MemberLocation> {
        self.members.get(name)
    }
}

#[derive(Clone, Debug)]
pub struct MemberLocation {
    pub location: AnnotationLocation,
    args: Option<Vec<AnnotationLocation>>,
}

impl MemberLocation {
    /// Parameter locations; empty for properties.
    pub fn args(&self) -> &[AnnotationLocation] {
        self.args.as_deref().unwrap_or_default()
    }

    pub fn is_method(&self) -> bool {
        self.args.is_some()
    }
}

#[derive(Default)]
pub struct LocationFactory {
    trees: Mutex<HashMap<ClassId, ClassLocation>>,
}

impl LocationFactory {
    /// Ensure the location of the given element exists (with every enclosing location) and
    /// return its key.
    pub fn ensure(
        &self,
        classes: &ClassArena,
        class: ClassId,
        kind: AnnotationKind,
        member: Option<&str>,
        parameter_index: Option<usize>,
    ) -> Result<AnnotationLocation, WeavingError> {
        let descriptor = classes.get(class)?;
        let mut trees = self.trees.lock();

        let tree = trees.entry(class).or_insert_with(|| ClassLocation {
            location: AnnotationLocation::Class(class),
            parent: descriptor.parent,
            members: IndexMap::new(),
        });

        let Some(name) = member else {
            return Ok(tree.location.clone());
        };

        let member_location = tree
            .members
            .entry(name.to_string())
            .or_insert_with(|| match kind {
                AnnotationKind::Property => MemberLocation {
                    location: AnnotationLocation::Property(class, name.to_string()),
                    args: None,
                },
                _ => MemberLocation {
                    location: AnnotationLocation::Method(class, name.to_string()),
                    args: Some(vec![]),
                },
            });

        match (kind, parameter_index) {
            (AnnotationKind::Parameter, Some(index)) => {
                let args = member_location.args.get_or_insert_with(Vec::new);
                while args.len() <= index {
                    let position = args.len();
                    args.push(AnnotationLocation::Parameter(
                        class,
                        name.to_string(),
                        position,
                    ));
                }
                Ok(args[index].clone())
            }
            _ => Ok(member_location.location.clone()),
        }
    }

    pub fn forget(&self, class: ClassId) {
        self.trees.lock().remove(&class);
    }

    /// The location tree of a class (created if needed).
    pub fn of_class(&self, classes: &ClassArena, class: ClassId) -> Result<ClassLocation, WeavingError> {
        self.ensure(classes, class, AnnotationKind::Class, None, None)?;
        let trees = self.trees.lock();
        trees
            .get(&class)
            .cloned()
            .ok_or_else(|| WeavingError::UnknownClass(format!("#{}", class.arr_idx())))
    }

    /// Look `name` up on the class, falling through to the ancestors' trees.
    pub fn member(&self, classes: &ClassArena, class: ClassId, name: &str) -> Option<MemberLocation> {
        let trees = self.trees.lock();
        classes
            .ancestry(class)
            .into_iter()
            .find_map(|ancestor| trees.get(&ancestor).and_then(|tree| tree.member(name)).cloned())
    }

    /// The location tree of the class of a value: a class value or an instance.
    pub fn locate(&self, classes: &ClassArena, value: &Value) -> Result<ClassLocation, WeavingError> {
        match value {
            Value::Class(class) => self.of_class(classes, *class),
            Value::Instance(instance) => self.of_class(classes, instance.class_id()),
            other => Err(WeavingError::NotAConstructorNorInstance(format!("{other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::json;
    use test_log::test;

    use super::*;
    use crate::class::{ClassDefinition, MethodDeclaration};

    fn arena() -> (ClassArena, ClassId, ClassId) {
        let mut arena = ClassArena::default();
        let method = |name: &str| {
            (
                name.to_string(),
                MethodDeclaration {
                    name: name.to_string(),
                    body: None,
                },
            )
        };
        let base = arena
            .register(ClassDefinition {
                name: "Base".to_string(),
                parent: None,
                constructor: None,
                methods: IndexMap::from([method("deposit")]),
                properties: IndexMap::new(),
            })
            .unwrap();
        let child = arena
            .register(ClassDefinition {
                name: "Child".to_string(),
                parent: Some(base),
                constructor: None,
                methods: IndexMap::new(),
                properties: IndexMap::new(),
            })
            .unwrap();
        (arena, base, child)
    }

    #[test]
    fn parameter_location_creates_enclosing_locations() {
        let (classes, base, _) = arena();
        let locations = LocationFactory::default();

        let location = locations
            .ensure(&classes, base, AnnotationKind::Parameter, Some("deposit"), Some(1))
            .unwrap();
        assert_eq!(
            location,
            AnnotationLocation::Parameter(base, "deposit".to_string(), 1)
        );

        let tree = locations.of_class(&classes, base).unwrap();
        let deposit = tree.member("deposit").unwrap();
        assert!(deposit.is_method());
        assert_eq!(deposit.args().len(), 2);
        assert_eq!(deposit.location, AnnotationLocation::Method(base, "deposit".to_string()));
    }

    #[test]
    fn members_are_inherited_through_the_hierarchy() {
        let (classes, base, child) = arena();
        let locations = LocationFactory::default();

        locations
            .ensure(&classes, base, AnnotationKind::Method, Some("deposit"), None)
            .unwrap();

        let inherited = locations.member(&classes, child, "deposit").unwrap();
        assert_eq!(inherited.location.class(), base);
        assert!(locations.member(&classes, child, "withdraw").is_none());
    }

    #[test]
    fn only_classes_and_instances_can_be_located() {
        let (classes, base, _) = arena();
        let locations = LocationFactory::default();

        assert!(locations.locate(&classes, &Value::Class(base)).is_ok());

        let err = locations
            .locate(&classes, &Value::from(json!(42)))
            .unwrap_err();
        assert_eq!(err.to_string(), "42 is not a constructor nor instance");
    }
}
