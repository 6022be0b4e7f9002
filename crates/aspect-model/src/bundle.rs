// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Storage of annotation applications and hierarchical queries over them.
//!
//! The registry is indexed twice: per class (then per location, in declaration order) and per
//! annotation identity. Queries go through an [`AnnotationBundle`], a snapshot of the class and its
//! ancestors taken when the bundle is created.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{
    annotation::{AnnotationContext, AnnotationKind, AnnotationRef},
    class::{ClassArena, ClassId},
    location::AnnotationLocation,
};

type Layer = IndexMap<AnnotationLocation, Vec<Arc<AnnotationContext>>>;

#[derive(Default)]
pub struct AnnotationRegistry {
    by_class: RwLock<HashMap<ClassId, Layer>>,
    by_annotation: RwLock<HashMap<AnnotationRef, Vec<Arc<AnnotationContext>>>>,
}

impl AnnotationRegistry {
    pub fn register(&self, context: AnnotationContext) -> Arc<AnnotationContext> {
        let context = Arc::new(context);

        self.by_class
            .write()
            .entry(context.target.class)
            .or_default()
            .entry(context.target.location.clone())
            .or_default()
            .push(context.clone());

        self.by_annotation
            .write()
            .entry(context.reference().clone())
            .or_default()
            .push(context.clone());

        context
    }

    /// Every application of any of the given annotations, across all classes.
    pub fn find(&self, annotations: &[AnnotationRef]) -> Vec<Arc<AnnotationContext>> {
        let by_annotation = self.by_annotation.read();
        annotations
            .iter()
            .filter_map(|annotation| by_annotation.get(annotation))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn bundle(&self, classes: &ClassArena, class: ClassId) -> AnnotationBundle {
        let by_class = self.by_class.read();

        let layers = classes
            .ancestry(class)
            .into_iter()
            .map(|ancestor| {
                let declared = classes
                    .get(ancestor)
                    .map(|descriptor| {
                        descriptor
                            .methods
                            .keys()
                            .chain(descriptor.properties.keys())
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();

                BundleLayer {
                    class: ancestor,
                    declared,
                    annotations: by_class.get(&ancestor).cloned().unwrap_or_default(),
                }
            })
            .collect();

        AnnotationBundle { layers }
    }
}

struct BundleLayer {
    class: ClassId,
    declared: HashSet<String>,
    annotations: Layer,
}

/// Annotations of one class hierarchy, child first.
///
/// Class annotations accumulate along the hierarchy. Member annotations (and the annotations of a
/// method's parameters) are taken from the class up to the nearest class that declares the member:
/// a member redeclared by a child shadows whatever its ancestors had on it.
pub struct AnnotationBundle {
    layers: Vec<BundleLayer>,
}

impl AnnotationBundle {
    pub fn class(&self) -> Option<ClassId> {
        self.layers.first().map(|layer| layer.class)
    }

    fn visible(&self, layer_index: usize, location: &AnnotationLocation) -> bool {
        match location.member() {
            None => true,
            Some(member) => !self.layers[..layer_index]
                .iter()
                .any(|layer| layer.declared.contains(member)),
        }
    }

    /// Every visible annotation of the hierarchy.
    pub fn all(&self) -> Vec<Arc<AnnotationContext>> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(index, layer)| {
                layer
                    .annotations
                    .iter()
                    .filter(move |(location, _)| self.visible(index, location))
                    .flat_map(|(_, contexts)| contexts.iter().cloned())
            })
            .collect()
    }

    /// Annotations at a location (which may belong to any class of the hierarchy).
    ///
    /// With `search_parents` unset, only the class the bundle was created for is looked at.
    pub fn all_at(
        &self,
        location: &AnnotationLocation,
        search_parents: bool,
    ) -> Vec<Arc<AnnotationContext>> {
        let depth = if search_parents { self.layers.len() } else { 1 };

        self.layers
            .iter()
            .take(depth)
            .enumerate()
            .filter_map(|(index, layer)| {
                let rebased = location.rebase(layer.class);
                if !self.visible(index, &rebased) {
                    return None;
                }
                layer.annotations.get(&rebased)
            })
            .flatten()
            .cloned()
            .collect()
    }

    pub fn on_class(&self, annotation: Option<&AnnotationRef>) -> Vec<Arc<AnnotationContext>> {
        self.of_kind(AnnotationKind::Class, annotation)
    }

    pub fn on_method(&self, annotation: Option<&AnnotationRef>) -> Vec<Arc<AnnotationContext>> {
        self.of_kind(AnnotationKind::Method, annotation)
    }

    pub fn on_property(&self, annotation: Option<&AnnotationRef>) -> Vec<Arc<AnnotationContext>> {
        self.of_kind(AnnotationKind::Property, annotation)
    }

    pub fn on_parameter(&self, annotation: Option<&AnnotationRef>) -> Vec<Arc<AnnotationContext>> {
        self.of_kind(AnnotationKind::Parameter, annotation)
    }

    fn of_kind(
        &self,
        kind: AnnotationKind,
        annotation: Option<&AnnotationRef>,
    ) -> Vec<Arc<AnnotationContext>> {
        self.all()
            .into_iter()
            .filter(|context| context.target.kind == kind)
            .filter(|context| annotation.is_none_or(|reference| context.reference() == reference))
            .collect()
    }
}
