// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;

use crate::{PointcutError, PointcutExpression, PointcutType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointcutPhase {
    Compile,
    Before,
    Around,
    AfterReturn,
    AfterThrow,
    After,
}

impl PointcutPhase {
    pub const ALL: [PointcutPhase; 6] = [
        PointcutPhase::Compile,
        PointcutPhase::Before,
        PointcutPhase::Around,
        PointcutPhase::AfterReturn,
        PointcutPhase::AfterThrow,
        PointcutPhase::After,
    ];
}

impl fmt::Display for PointcutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointcutPhase::Compile => "compile",
            PointcutPhase::Before => "before",
            PointcutPhase::Around => "around",
            PointcutPhase::AfterReturn => "afterReturn",
            PointcutPhase::AfterThrow => "afterThrow",
            PointcutPhase::After => "after",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pointcut {
    phase: PointcutPhase,
    expression: PointcutExpression,
}

impl Pointcut {
    pub fn new(phase: PointcutPhase, expression: PointcutExpression) -> Self {
        Self { phase, expression }
    }

    pub fn parse(phase: PointcutPhase, expression: &str) -> Result<Self, PointcutError> {
        Ok(Self::new(phase, expression.parse()?))
    }

    pub fn phase(&self) -> PointcutPhase {
        self.phase
    }

    pub fn pointcut_type(&self) -> PointcutType {
        self.expression.pointcut_type()
    }

    pub fn expression(&self) -> &PointcutExpression {
        &self.expression
    }

    /// Canonical reference, for example `before(@demo:Log method *)`.
    pub fn reference(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.phase, self.expression)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn reference() {
        let pointcut = Pointcut::parse(PointcutPhase::AfterThrow, "@demo:Log  property").unwrap();
        insta::assert_snapshot!(pointcut.reference(), @"afterThrow(@demo:Log get property *)");
        assert_eq!(pointcut.pointcut_type(), PointcutType::GetProperty);
    }
}
