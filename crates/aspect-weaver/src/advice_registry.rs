// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Index of the advices of enabled aspects: phase, then pointcut type, then annotation.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use aspect_model::annotation::AnnotationRef;
use aspect_pointcut::{PointcutPhase, PointcutType};
use parking_lot::RwLock;

use crate::advice::Advice;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum AnnotationKey {
    /// Pointcuts without annotations.
    Any,
    Annotation(AnnotationRef),
}

type ByAnnotation = HashMap<AnnotationKey, Vec<Arc<Advice>>>;
type ByType = HashMap<PointcutType, ByAnnotation>;

#[derive(Default)]
pub struct AdviceRegistry {
    index: RwLock<HashMap<PointcutPhase, ByType>>,
    by_aspect: RwLock<HashMap<String, Vec<Arc<Advice>>>>,
}

impl AdviceRegistry {
    pub fn register(&self, advice: Arc<Advice>) {
        let expression = advice.pointcut().expression();
        let keys: Vec<AnnotationKey> = if expression.annotations().is_empty() {
            vec![AnnotationKey::Any]
        } else {
            expression
                .annotations()
                .iter()
                .cloned()
                .map(AnnotationKey::Annotation)
                .collect()
        };

        {
            let mut index = self.index.write();
            let by_annotation = index
                .entry(advice.phase())
                .or_default()
                .entry(expression.pointcut_type())
                .or_default();
            for key in keys {
                by_annotation.entry(key).or_default().push(advice.clone());
            }
        }

        self.by_aspect
            .write()
            .entry(advice.aspect_id().to_string())
            .or_default()
            .push(advice);
    }

    /// Drop every advice of the aspect; returns how many there were.
    pub fn unregister_aspect(&self, aspect_id: &str) -> usize {
        let Some(removed) = self.by_aspect.write().remove(aspect_id) else {
            return 0;
        };

        let mut index = self.index.write();
        for by_type in index.values_mut() {
            for by_annotation in by_type.values_mut() {
                for advices in by_annotation.values_mut() {
                    advices.retain(|advice| advice.aspect_id() != aspect_id);
                }
                by_annotation.retain(|_, advices| !advices.is_empty());
            }
        }

        removed.len()
    }

    /// The advices declared by an aspect, in declaration order.
    pub fn advices_by_aspect(&self, aspect_id: &str) -> Vec<Arc<Advice>> {
        self.by_aspect
            .read()
            .get(aspect_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Advices of `phase` whose pointcut could apply to an element of one of `types` carrying
    /// some of `annotations`. Unordered; each advice appears once.
    pub fn candidates(
        &self,
        phase: PointcutPhase,
        types: &[PointcutType],
        annotations: &[&AnnotationRef],
    ) -> Vec<Arc<Advice>> {
        let index = self.index.read();
        let Some(by_type) = index.get(&phase) else {
            return vec![];
        };

        let keys: Vec<AnnotationKey> = std::iter::once(AnnotationKey::Any)
            .chain(
                annotations
                    .iter()
                    .map(|annotation| AnnotationKey::Annotation((*annotation).clone())),
            )
            .collect();

        let mut seen = HashSet::new();
        types
            .iter()
            .chain(std::iter::once(&PointcutType::Any))
            .filter_map(|pointcut_type| by_type.get(pointcut_type))
            .flat_map(|by_annotation| keys.iter().filter_map(move |key| by_annotation.get(key)))
            .flatten()
            .filter(|advice| seen.insert(Arc::as_ptr(*advice)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use aspect_pointcut::Pointcut;
    use test_log::test;

    use super::*;
    use crate::{
        advice::AdviceBody,
        context::AdviceContext,
        order::{Order, Precedence},
    };

    fn advice(aspect: &str, name: &str, phase: PointcutPhase, expression: &str, seq: u64) -> Arc<Advice> {
        Arc::new(Advice::new(
            name.to_string(),
            Pointcut::parse(phase, expression).unwrap(),
            aspect.to_string(),
            Precedence {
                aspect_order: Order::Lowest,
                aspect_seq: 0,
                advice_order: Order::Lowest,
                advice_seq: seq,
            },
            AdviceBody::Runtime(Arc::new(|_: &mut AdviceContext| Ok(None))),
        ))
    }

    fn names(advices: &[Arc<Advice>]) -> Vec<String> {
        let mut names: Vec<_> = advices.iter().map(|advice| advice.key()).collect();
        names.sort();
        names
    }

    #[test]
    fn candidates_by_phase_type_and_annotation() {
        let registry = AdviceRegistry::default();
        registry.register(advice("a", "log", PointcutPhase::Before, "@demo:Log|@demo:Trace method *", 0));
        registry.register(advice("a", "all", PointcutPhase::Before, "method *", 1));
        registry.register(advice("b", "any", PointcutPhase::Before, "@demo:Log any *", 2));
        registry.register(advice("b", "get", PointcutPhase::Before, "@demo:Log get property *", 3));
        registry.register(advice("b", "late", PointcutPhase::After, "@demo:Log method *", 4));

        let log = AnnotationRef::new("demo", "Log");
        let trace = AnnotationRef::new("demo", "Trace");

        let candidates = registry.candidates(PointcutPhase::Before, &[PointcutType::Method], &[&log, &trace]);
        insta::assert_debug_snapshot!(names(&candidates), @r#"
        [
            "before(@demo:Log any *)=>any",
            "before(@demo:Log|@demo:Trace method *)=>log",
            "before(method *)=>all",
        ]
        "#);

        let unannotated = registry.candidates(PointcutPhase::Before, &[PointcutType::Method], &[]);
        assert_eq!(names(&unannotated), vec!["before(method *)=>all"]);
    }

    #[test]
    fn advices_are_tracked_per_aspect() {
        let registry = AdviceRegistry::default();
        registry.register(advice("a", "first", PointcutPhase::Before, "method *", 0));
        registry.register(advice("a", "second", PointcutPhase::Around, "method *", 1));
        registry.register(advice("b", "other", PointcutPhase::Before, "method *", 2));

        assert_eq!(
            registry
                .advices_by_aspect("a")
                .iter()
                .map(|advice| advice.name().to_string())
                .collect::<Vec<_>>(),
            vec!["first", "second"]
        );

        assert_eq!(registry.unregister_aspect("a"), 2);
        assert_eq!(registry.unregister_aspect("a"), 0);
        assert_eq!(
            names(&registry.candidates(PointcutPhase::Before, &[PointcutType::Method], &[])),
            vec!["before(method *)=>other"]
        );
        assert!(registry
            .candidates(PointcutPhase::Around, &[PointcutType::Method], &[])
            .is_empty());
    }
}
