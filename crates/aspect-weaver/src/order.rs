// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

/// Precedence of an aspect or an advice. Lower sorts first and, for around advices, wraps
/// outermost.
///
/// The derived ordering puts `Highest` before every value and `Lowest` after every value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Order {
    Highest,
    Value(i64),
    /// Also the precedence of anything declared without an order.
    #[default]
    Lowest,
}

impl From<i64> for Order {
    fn from(value: i64) -> Self {
        Order::Value(value)
    }
}

impl From<i32> for Order {
    fn from(value: i32) -> Self {
        Order::Value(value.into())
    }
}

/// Sort key of an advice within one phase of an execution plan.
///
/// Aspect order first, then the aspect's registration sequence (so advices of one aspect stay
/// together), then the advice order and the advice's registration sequence. Sequences are unique,
/// which makes this a total order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Precedence {
    pub aspect_order: Order,
    pub aspect_seq: u64,
    pub advice_order: Order,
    pub advice_seq: u64,
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn sentinels_bound_every_value() {
        let mut orders = vec![
            Order::Lowest,
            Order::Value(10),
            Order::Highest,
            Order::Value(-3),
            Order::Value(i64::MAX),
            Order::Value(i64::MIN),
        ];
        orders.sort();

        assert_eq!(
            orders,
            vec![
                Order::Highest,
                Order::Value(i64::MIN),
                Order::Value(-3),
                Order::Value(10),
                Order::Value(i64::MAX),
                Order::Lowest,
            ]
        );
        assert_eq!(Order::default(), Order::Lowest);
    }

    #[test]
    fn aspect_order_dominates_advice_order() {
        let key = |aspect_order, aspect_seq, advice_order, advice_seq| Precedence {
            aspect_order,
            aspect_seq,
            advice_order,
            advice_seq,
        };

        let ordered_aspect = key(Order::Value(1), 5, Order::Lowest, 9);
        let unordered_aspect = key(Order::Lowest, 0, Order::Highest, 0);
        assert!(ordered_aspect < unordered_aspect);

        let first = key(Order::Lowest, 0, Order::Lowest, 1);
        let second = key(Order::Lowest, 0, Order::Lowest, 2);
        assert!(first < second);
    }
}
