// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use aspect_model::{
    Reflection,
    annotation::{AnnotationContext, AnnotationRef},
    target::AnnotationTarget,
};
use aspect_pointcut::{PointcutPhase, PointcutType};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    advice::Advice,
    advice_registry::AdviceRegistry,
    execution_plan::ExecutionPlan,
    strategy::{JoinpointKind, WeavingStrategy},
};

type PlanKey = (String, JoinpointKind);

/// Builds execution plans and memoizes them per target and joinpoint kind.
///
/// The memo is only valid for the set of enabled aspects it was built with. Enabling or disabling
/// an aspect marks it dirty; the next lookup starts from an empty memo.
pub struct PlanFactory {
    plans: Mutex<HashMap<PlanKey, Arc<ExecutionPlan>>>,
    dirty: AtomicBool,
    cache: bool,
}

impl PlanFactory {
    pub fn new(cache: bool) -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
            dirty: AtomicBool::new(false),
            cache,
        }
    }

    /// Force the next lookup to rebuild its plan.
    pub fn invalidate(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.plans.lock().clear();
        self.dirty.store(false, Ordering::Release);
    }

    pub fn create(
        &self,
        reflection: &Reflection,
        advices: &AdviceRegistry,
        target: &Arc<AnnotationTarget>,
        strategy: &Arc<dyn WeavingStrategy>,
    ) -> Arc<ExecutionPlan> {
        let key = (target.reference.clone(), strategy.kind());

        if self.dirty.swap(false, Ordering::AcqRel) {
            self.plans.lock().clear();
        } else if let Some(plan) = self.plans.lock().get(&key) {
            return plan.clone();
        }

        let plan = Arc::new(build_plan(reflection, advices, target, strategy));

        if !self.cache {
            return plan;
        }

        self.plans.lock().entry(key).or_insert(plan).clone()
    }
}

fn build_plan(
    reflection: &Reflection,
    advices: &AdviceRegistry,
    target: &Arc<AnnotationTarget>,
    strategy: &Arc<dyn WeavingStrategy>,
) -> ExecutionPlan {
    let kind = strategy.kind();
    let bundle = reflection.bundle(target.class);

    let element = bundle.all_at(&target.location, true);
    let parameters: Vec<Arc<AnnotationContext>> = match kind {
        JoinpointKind::Call => bundle
            .on_parameter(None)
            .into_iter()
            .filter(|context| context.target.name == target.name)
            .collect(),
        _ => vec![],
    };

    let element_refs: Vec<&AnnotationRef> = element.iter().map(|c| c.reference()).collect();
    let parameter_refs: Vec<&AnnotationRef> = parameters.iter().map(|c| c.reference()).collect();
    let all_refs: Vec<&AnnotationRef> = element_refs
        .iter()
        .chain(parameter_refs.iter())
        .copied()
        .collect();

    let selected = |advice: &Arc<Advice>| {
        let expression = advice.pointcut().expression();
        match expression.pointcut_type() {
            PointcutType::Parameter => {
                kind == JoinpointKind::Call
                    && !parameter_refs.is_empty()
                    && expression.matches(
                        PointcutType::Parameter,
                        &target.name,
                        parameter_refs.iter().copied(),
                    )
            }
            PointcutType::Any => {
                expression.matches(kind.pointcut_type(), &target.name, all_refs.iter().copied())
            }
            pointcut_type => {
                pointcut_type == kind.pointcut_type()
                    && expression.matches(pointcut_type, &target.name, element_refs.iter().copied())
            }
        }
    };

    let mut selected_advices: Vec<Arc<Advice>> = PointcutPhase::ALL
        .iter()
        .flat_map(|phase| advices.candidates(*phase, kind.pointcut_types(), &all_refs))
        .filter(|advice| selected(advice))
        .collect();
    selected_advices.sort_by_key(|advice| advice.precedence());

    debug!(
        element = %target.label,
        ?kind,
        advices = selected_advices.len(),
        "built execution plan"
    );

    let annotations = element.into_iter().chain(parameters).collect();
    ExecutionPlan::new(target.clone(), strategy.clone(), annotations, selected_advices)
}
