// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Class descriptors and the arena holding them.
//!
//! A class has an explicit, finite parent link. Walking a hierarchy is a loop over
//! [`ClassArena::ancestry`] that ends at the root class (the one without a parent).

use std::{collections::HashMap, fmt};

use indexmap::IndexMap;

use crate::{
    error::WeavingError,
    mapped_arena::{MappedArena, SlabIndex},
    symbol::{ConstructorFn, MethodFn, PropertyDescriptor},
};

pub type ClassId = SlabIndex<ClassDescriptor>;

pub struct ClassDescriptor {
    /// The name the class was declared with.
    pub name: String,
    /// Unique reference name (`Name`, then `Name#1`, `Name#2`, ... for homonyms).
    pub reference: String,
    pub parent: Option<ClassId>,
    pub constructor: Option<ConstructorFn>,
    pub methods: IndexMap<String, MethodDeclaration>,
    pub properties: IndexMap<String, PropertyDeclaration>,
}

/// A method declared by a class. Abstract methods have no body; a compile advice must supply one.
#[derive(Clone)]
pub struct MethodDeclaration {
    pub name: String,
    pub body: Option<MethodFn>,
}

#[derive(Clone)]
pub struct PropertyDeclaration {
    pub name: String,
    pub descriptor: PropertyDescriptor,
}

impl ClassDescriptor {
    pub fn declares(&self, member: &str) -> bool {
        self.methods.contains_key(member) || self.properties.contains_key(member)
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("reference", &self.reference)
            .field("parent", &self.parent.map(|p| p.arr_idx()))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything needed to register a class; see [`ClassArena::register`].
pub struct ClassDefinition {
    pub name: String,
    pub parent: Option<ClassId>,
    pub constructor: Option<ConstructorFn>,
    pub methods: IndexMap<String, MethodDeclaration>,
    pub properties: IndexMap<String, PropertyDeclaration>,
}

#[derive(Default)]
pub struct ClassArena {
    classes: MappedArena<ClassDescriptor>,
    // How many classes were registered per declared name, for reference disambiguation
    homonyms: HashMap<String, usize>,
}

impl ClassArena {
    pub fn register(&mut self, definition: ClassDefinition) -> Result<ClassId, WeavingError> {
        if let Some(parent) = definition.parent {
            self.get(parent)?;
        }

        let base_name = if definition.name.is_empty() {
            "anonymous".to_string()
        } else {
            definition.name.clone()
        };

        let count = self.homonyms.entry(base_name.clone()).or_insert(0);
        let reference = if *count == 0 {
            base_name
        } else {
            format!("{base_name}#{count}")
        };
        *count += 1;

        Ok(self.classes.add(
            &reference.clone(),
            ClassDescriptor {
                name: definition.name,
                reference,
                parent: definition.parent,
                constructor: definition.constructor,
                methods: definition.methods,
                properties: definition.properties,
            },
        ))
    }

    /// Forget a class nothing refers to yet. Its reference name is released when it is the most
    /// recent one for its declared name.
    pub fn discard(&mut self, id: ClassId) -> Option<ClassDescriptor> {
        let reference = self.classes.get(id)?.reference.clone();
        let descriptor = self.classes.remove(&reference)?;

        let base_name = if descriptor.name.is_empty() {
            "anonymous"
        } else {
            descriptor.name.as_str()
        };
        if let Some(count) = self.homonyms.get_mut(base_name) {
            let latest = match *count {
                0 => None,
                1 => Some(base_name.to_string()),
                n => Some(format!("{base_name}#{}", n - 1)),
            };
            if latest.as_deref() == Some(reference.as_str()) {
                *count -= 1;
            }
        }

        Some(descriptor)
    }

    pub fn get(&self, id: ClassId) -> Result<&ClassDescriptor, WeavingError> {
        self.classes
            .get(id)
            .ok_or_else(|| WeavingError::UnknownClass(format!("#{}", id.arr_idx())))
    }

    pub fn get_by_reference(&self, reference: &str) -> Option<(ClassId, &ClassDescriptor)> {
        self.classes
            .get_id(reference)
            .map(|id| (id, &self.classes[id]))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The class itself followed by its ancestors, root last.
    pub fn ancestry(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = vec![];
        let mut current = Some(id);

        while let Some(class) = current {
            match self.classes.get(class) {
                Some(descriptor) => {
                    chain.push(class);
                    current = descriptor.parent;
                }
                None => break,
            }
        }

        chain
    }

    pub fn is_subclass_of(&self, id: ClassId, ancestor: ClassId) -> bool {
        self.ancestry(id).contains(&ancestor)
    }

    /// The nearest class, starting from `id`, that declares `member`.
    pub fn declaring_class(&self, id: ClassId, member: &str) -> Option<ClassId> {
        self.ancestry(id)
            .into_iter()
            .find(|class| self.classes[*class].declares(member))
    }

    pub fn find_method(&self, id: ClassId, name: &str) -> Option<(ClassId, &MethodDeclaration)> {
        self.ancestry(id).into_iter().find_map(|class| {
            self.classes[class]
                .methods
                .get(name)
                .map(|method| (class, method))
        })
    }

    pub fn find_property(
        &self,
        id: ClassId,
        name: &str,
    ) -> Option<(ClassId, &PropertyDeclaration)> {
        self.ancestry(id).into_iter().find_map(|class| {
            self.classes[class]
                .properties
                .get(name)
                .map(|property| (class, property))
        })
    }

    /// Member names visible on `id` (own first, then inherited ones not redeclared).
    pub fn member_names(&self, id: ClassId) -> (Vec<String>, Vec<String>) {
        let mut methods: Vec<String> = vec![];
        let mut properties: Vec<String> = vec![];

        for class in self.ancestry(id) {
            let descriptor = &self.classes[class];
            for name in descriptor.methods.keys() {
                if !methods.contains(name) && !properties.contains(name) {
                    methods.push(name.clone());
                }
            }
            for name in descriptor.properties.keys() {
                if !methods.contains(name) && !properties.contains(name) {
                    properties.push(name.clone());
                }
            }
        }

        (methods, properties)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn definition(name: &str, parent: Option<ClassId>, methods: &[&str]) -> ClassDefinition {
        ClassDefinition {
            name: name.to_string(),
            parent,
            constructor: None,
            methods: methods
                .iter()
                .map(|m| {
                    (
                        m.to_string(),
                        MethodDeclaration {
                            name: m.to_string(),
                            body: None,
                        },
                    )
                })
                .collect(),
            properties: IndexMap::new(),
        }
    }

    #[test]
    fn homonyms_get_disambiguated() {
        let mut arena = ClassArena::default();
        let first = arena.register(definition("Foo", None, &[])).unwrap();
        let second = arena.register(definition("Foo", None, &[])).unwrap();
        let anonymous = arena.register(definition("", None, &[])).unwrap();

        assert_eq!(arena.get(first).unwrap().reference, "Foo");
        assert_eq!(arena.get(second).unwrap().reference, "Foo#1");
        assert_eq!(arena.get(anonymous).unwrap().reference, "anonymous");
        assert_eq!(arena.get(second).unwrap().name, "Foo");
    }

    #[test]
    fn discarding_the_latest_homonym_releases_its_reference() {
        let mut arena = ClassArena::default();
        let first = arena.register(definition("Foo", None, &[])).unwrap();
        let second = arena.register(definition("Foo", None, &[])).unwrap();

        assert_eq!(arena.discard(second).map(|d| d.reference), Some("Foo#1".to_string()));
        assert!(arena.get(second).is_err());
        assert!(arena.discard(second).is_none());

        let again = arena.register(definition("Foo", None, &[])).unwrap();
        assert_eq!(arena.get(again).unwrap().reference, "Foo#1");

        // Older homonyms keep the counter where it is
        arena.discard(first);
        let third = arena.register(definition("Foo", None, &[])).unwrap();
        assert_eq!(arena.get(third).unwrap().reference, "Foo#2");
        assert!(arena.get_by_reference("Foo").is_none());
    }

    #[test]
    fn hierarchy_walks() {
        let mut arena = ClassArena::default();
        let base = arena.register(definition("Base", None, &["run", "stop"])).unwrap();
        let child = arena
            .register(definition("Child", Some(base), &["run"]))
            .unwrap();

        assert_eq!(arena.ancestry(child), vec![child, base]);
        assert!(arena.is_subclass_of(child, base));
        assert!(!arena.is_subclass_of(base, child));
        assert_eq!(arena.declaring_class(child, "run"), Some(child));
        assert_eq!(arena.declaring_class(child, "stop"), Some(base));
        assert_eq!(arena.declaring_class(child, "missing"), None);

        let (methods, properties) = arena.member_names(child);
        assert_eq!(methods, vec!["run".to_string(), "stop".to_string()]);
        assert!(properties.is_empty());
    }
}
