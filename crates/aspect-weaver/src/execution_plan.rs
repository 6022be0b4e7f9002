// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The advices applying to one woven element, grouped by phase and sorted by precedence.
//!
//! An invocation runs as nested layers:
//!
//! ```text
//! after*                       (once, whatever the outcome)
//!   around[n - 1]              (outermost)
//!     around[n - 2]
//!       ...
//!         around[0]
//!           before*
//!           original
//!           afterReturn* | afterThrow*
//! ```
//!
//! Around advices wrap in reverse precedence order: with `A` at order 10 and `B` at order 9,
//! `A` encloses `B`, while `B`'s before advices still run ahead of `A`'s.

use std::{fmt, sync::Arc};

use aspect_model::{
    annotation::AnnotationContext,
    error::{AdviceError, ExecutionError, WeavingError},
    symbol::Symbol,
    target::AnnotationTarget,
    value::{Instance, Value},
};
use aspect_pointcut::PointcutPhase;
use parking_lot::Mutex;
use tracing::{debug, instrument, trace};

use crate::{
    advice::Advice,
    context::{AdviceContext, CompileContext, Joinpoint},
    strategy::{JoinpointKind, Original, WeavingStrategy},
};

pub struct ExecutionPlan {
    target: Arc<AnnotationTarget>,
    strategy: Arc<dyn WeavingStrategy>,
    annotations: Vec<Arc<AnnotationContext>>,
    compile: Vec<Arc<Advice>>,
    before: Vec<Arc<Advice>>,
    around: Vec<Arc<Advice>>,
    after_return: Vec<Arc<Advice>>,
    after_throw: Vec<Arc<Advice>>,
    after: Vec<Arc<Advice>>,
    compiled: Mutex<Option<Symbol>>,
    linked: Mutex<Option<Original>>,
}

impl ExecutionPlan {
    /// `advices` must already be sorted by precedence.
    pub(crate) fn new(
        target: Arc<AnnotationTarget>,
        strategy: Arc<dyn WeavingStrategy>,
        annotations: Vec<Arc<AnnotationContext>>,
        advices: Vec<Arc<Advice>>,
    ) -> Self {
        let mut plan = ExecutionPlan {
            target,
            strategy,
            annotations,
            compile: vec![],
            before: vec![],
            around: vec![],
            after_return: vec![],
            after_throw: vec![],
            after: vec![],
            compiled: Mutex::new(None),
            linked: Mutex::new(None),
        };

        for advice in advices {
            match advice.phase() {
                PointcutPhase::Compile => plan.compile.push(advice),
                PointcutPhase::Before => plan.before.push(advice),
                PointcutPhase::Around => plan.around.push(advice),
                PointcutPhase::AfterReturn => plan.after_return.push(advice),
                PointcutPhase::AfterThrow => plan.after_throw.push(advice),
                PointcutPhase::After => plan.after.push(advice),
            }
        }

        plan
    }

    pub fn target(&self) -> &Arc<AnnotationTarget> {
        &self.target
    }

    pub fn kind(&self) -> JoinpointKind {
        self.strategy.kind()
    }

    /// Annotations of the element (and of its parameters, for methods).
    pub fn annotations(&self) -> &[Arc<AnnotationContext>] {
        &self.annotations
    }

    pub fn advices(&self, phase: PointcutPhase) -> &[Arc<Advice>] {
        match phase {
            PointcutPhase::Compile => &self.compile,
            PointcutPhase::Before => &self.before,
            PointcutPhase::Around => &self.around,
            PointcutPhase::AfterReturn => &self.after_return,
            PointcutPhase::AfterThrow => &self.after_throw,
            PointcutPhase::After => &self.after,
        }
    }

    pub fn is_empty(&self) -> bool {
        PointcutPhase::ALL
            .iter()
            .all(|phase| self.advices(*phase).is_empty())
    }

    /// Whether the compile advices already ran.
    pub fn is_compiled(&self) -> bool {
        self.compiled.lock().is_some()
    }

    /// Run the compile advices over `natural`, once. Later calls return the first result and
    /// ignore `natural`.
    #[instrument(skip_all, fields(element = %self.target.label))]
    pub fn compile(&self, natural: Option<Symbol>) -> Result<Symbol, ExecutionError> {
        if let Some(symbol) = self.compiled.lock().as_ref() {
            return Ok(symbol.clone());
        }

        // Compiled outside of the lock: compile advices may reenter the weaver. Two threads racing
        // here both compile, and the first result wins.
        let symbol = self.run_compile_advices(natural)?;
        debug!(element = %self.target.label, "compiled");

        Ok(self.compiled.lock().get_or_insert(symbol).clone())
    }

    fn run_compile_advices(&self, natural: Option<Symbol>) -> Result<Symbol, ExecutionError> {
        let mut ctxt = CompileContext {
            target: self.target.clone(),
            annotations: self.annotations.clone(),
            symbol: natural,
        };

        for advice in &self.compile {
            if let Some(symbol) = advice.compile(&mut ctxt)? {
                if !self.strategy.accepts(&symbol) {
                    return Err(AdviceError::IncompatibleSymbol {
                        advice: advice.key(),
                        label: self.target.label.clone(),
                        expected: self.strategy.symbol_kind(),
                        found: symbol.kind_name(),
                    }
                    .into());
                }
                ctxt.symbol = Some(symbol);
            }
        }

        ctxt.symbol.ok_or_else(|| {
            WeavingError::MissingSymbol {
                label: self.target.label.clone(),
            }
            .into()
        })
    }

    fn link(&self, natural: &Option<Symbol>) -> Result<Original, ExecutionError> {
        if let Some(original) = self.linked.lock().as_ref() {
            return Ok(original.clone());
        }

        let symbol = self.compile(natural.clone())?;
        let original = self.strategy.link(symbol, &self.target)?;

        Ok(self.linked.lock().get_or_insert(original).clone())
    }

    /// Run one invocation of the element. `natural` is the symbol the class hierarchy provides,
    /// compiled on first use.
    pub fn execute(
        self: &Arc<Self>,
        natural: &Option<Symbol>,
        instance: Option<Instance>,
        args: Vec<Value>,
    ) -> Result<Value, ExecutionError> {
        let original = self.link(natural)?;

        let mut ctxt = AdviceContext::new(
            self.target.clone(),
            self.annotations.clone(),
            instance,
            args,
        );

        let result = self.proceed_from(0, &original, &mut ctxt);

        if self.after.is_empty() {
            return result;
        }

        match result {
            Ok(value) => ctxt.value = value,
            Err(error) => ctxt.error = Some(error),
        }

        for advice in &self.after {
            if advice.call(&mut ctxt)?.is_some() {
                return Err(self.unexpected_return("after", advice));
            }
        }

        match ctxt.error.take() {
            Some(error) => Err(error),
            None => Ok(ctxt.value),
        }
    }

    fn proceed_from(
        self: &Arc<Self>,
        level: usize,
        original: &Original,
        ctxt: &mut AdviceContext,
    ) -> Result<Value, ExecutionError> {
        let Some(advice) = self.around.iter().rev().nth(level) else {
            let outer = ctxt.joinpoint.take();
            let result = self.innermost(original, ctxt);
            ctxt.joinpoint = outer;
            return result;
        };

        let plan = self.clone();
        let next = original.clone();
        let outer = ctxt.joinpoint.replace(Joinpoint::new(move |ctxt: &mut AdviceContext| {
            plan.proceed_from(level + 1, &next, ctxt)
        }));

        let returned = advice.call(ctxt);
        ctxt.joinpoint = outer;

        if let Some(value) = returned? {
            self.strategy
                .check_value(PointcutPhase::Around, advice, &value, &self.target)?;
            ctxt.value = value;
        }

        Ok(ctxt.value.clone())
    }

    fn innermost(
        &self,
        original: &Original,
        ctxt: &mut AdviceContext,
    ) -> Result<Value, ExecutionError> {
        for advice in &self.before {
            if advice.call(ctxt)?.is_some() {
                return Err(self.unexpected_return("before", advice));
            }
        }

        trace!(element = %self.target.label, "running original");

        match original(ctxt) {
            Ok(value) => {
                ctxt.value = value;
                for advice in &self.after_return {
                    if let Some(value) = advice.call(ctxt)? {
                        self.strategy.check_value(
                            PointcutPhase::AfterReturn,
                            advice,
                            &value,
                            &self.target,
                        )?;
                        ctxt.value = value;
                    }
                }
                Ok(ctxt.value.clone())
            }
            Err(error) if error.is_fatal() || self.after_throw.is_empty() => Err(error),
            Err(error) => {
                ctxt.error = Some(error);
                ctxt.value = Value::null();

                let handled = self.handle_error(ctxt);
                ctxt.error = None;
                handled
            }
        }
    }

    fn handle_error(&self, ctxt: &mut AdviceContext) -> Result<Value, ExecutionError> {
        for advice in &self.after_throw {
            if let Some(value) = advice.call(ctxt)? {
                self.strategy
                    .check_value(PointcutPhase::AfterThrow, advice, &value, &self.target)?;
                ctxt.value = value;
            }
        }

        Ok(ctxt.value.clone())
    }

    fn unexpected_return(&self, phase: &'static str, advice: &Advice) -> ExecutionError {
        AdviceError::UnexpectedReturn {
            phase,
            advice: advice.key(),
            label: self.target.label.clone(),
        }
        .into()
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = |advices: &[Arc<Advice>]| advices.iter().map(|a| a.key()).collect::<Vec<_>>();

        f.debug_struct("ExecutionPlan")
            .field("target", &self.target)
            .field("compile", &keys(&self.compile))
            .field("before", &keys(&self.before))
            .field("around", &keys(&self.around))
            .field("after_return", &keys(&self.after_return))
            .field("after_throw", &keys(&self.after_throw))
            .field("after", &keys(&self.after))
            .finish()
    }
}
