// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An append-only `typed_generational_arena::Arena` with lookup by name.
//!
//! Class descriptors and annotation declarations are registered once and never removed, so an
//! arena index is a stable identity for them (the "type id" the hierarchy walks over). The side
//! map gives us the reverse lookup from a reference name (such as `Account` or `Account#1`) without
//! a linear search.

use std::{collections::HashMap, ops};

use typed_generational_arena::{Arena, IgnoreGeneration, Index};

pub type Slab<T> = Arena<T, usize, IgnoreGeneration>;
pub type SlabIndex<T> = Index<T, usize, IgnoreGeneration>;

pub struct MappedArena<V> {
    values: Slab<V>,
    map: HashMap<String, SlabIndex<V>>,
}

impl<V> MappedArena<V> {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn get_id(&self, key: &str) -> Option<SlabIndex<V>> {
        self.map.get(key).copied()
    }

    pub fn get_by_key(&self, key: &str) -> Option<&V> {
        self.get_id(key).map(|id| &self[id])
    }

    pub fn get(&self, id: SlabIndex<V>) -> Option<&V> {
        self.values.get(id)
    }

    /// Insert `value` under `key`, or return the id already registered under that key.
    pub fn add(&mut self, key: &str, value: V) -> SlabIndex<V> {
        if let Some(existing) = self.get_id(key) {
            return existing;
        }

        let id = self.values.insert(value);
        self.map.insert(key.to_string(), id);
        id
    }

    /// Remove the value registered under `key`. Its id may be handed out again.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let id = self.map.remove(key)?;
        self.values.remove(id)
    }

    pub fn iter(&self) -> typed_generational_arena::Iter<'_, V, usize, IgnoreGeneration> {
        self.values.iter()
    }
}

impl<V> Default for MappedArena<V> {
    fn default() -> Self {
        MappedArena {
            values: Slab::new(),
            map: HashMap::default(),
        }
    }
}

impl<V> ops::Index<SlabIndex<V>> for MappedArena<V> {
    type Output = V;

    #[inline]
    fn index(&self, id: SlabIndex<V>) -> &V {
        &self.values[id]
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn add_is_idempotent_per_key() {
        let mut arena = MappedArena::default();
        let first = arena.add("Account", 1);
        let again = arena.add("Account", 2);
        let other = arena.add("Account#1", 3);

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(arena[first], 1);
        assert_eq!(arena.get_by_key("Account#1"), Some(&3));
        assert_eq!(arena.len(), 2);
    }
}
