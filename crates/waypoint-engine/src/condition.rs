//! Condition evaluation.
//!
//! Value semantics are pinned per JSON type rather than coerced:
//! - equality compares numbers numerically (`20 == 20.0`) and everything
//!   else structurally, with no cross-type coercion (`"1" != 1`);
//! - ordering is defined for number/number and string/string pairs only,
//!   any other pairing compares as `false`;
//! - `in`/`not_in` need an array and `range`/`range_not_in` a two-element
//!   `[min, max]` array, otherwise both forms of the operator yield `false`.

use std::cmp::Ordering;

use serde_json::Value;

use waypoint_core::{
    Condition, ConditionExpression, ExecutionContext, LogicalOperator, Operator, Result,
    WaypointError,
};

use crate::logger::InstanceLogger;

/// Evaluates condition trees against a context, logging through the
/// owning engine's logger.
pub struct ConditionEvaluator<'a> {
    log: &'a InstanceLogger,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(log: &'a InstanceLogger) -> Self {
        Self { log }
    }

    pub fn evaluate(&self, expr: &ConditionExpression, ctx: &ExecutionContext) -> Result<bool> {
        match expr {
            ConditionExpression::Leaf(condition) => self.evaluate_leaf(condition, ctx),
            ConditionExpression::All(children) => self.all(children, ctx),
            ConditionExpression::Group {
                operator: LogicalOperator::And,
                conditions,
            } => self.all(conditions, ctx),
            ConditionExpression::Group {
                operator: LogicalOperator::Or,
                conditions,
            } => self.any(conditions, ctx),
        }
    }

    fn all(&self, children: &[ConditionExpression], ctx: &ExecutionContext) -> Result<bool> {
        for child in children {
            if !self.evaluate(child, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn any(&self, children: &[ConditionExpression], ctx: &ExecutionContext) -> Result<bool> {
        for child in children {
            if self.evaluate(child, ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn evaluate_leaf(&self, condition: &Condition, ctx: &ExecutionContext) -> Result<bool> {
        let Some(actual) = ctx.get(&condition.key) else {
            self.log.log(&format!(
                "Condition failed: context does not have key {}",
                condition.key
            ));
            return Ok(false);
        };

        let result = compare_leaf(&condition.operator, actual, &condition.value)?;

        self.log.log(&format!(
            "Condition evaluated: key={}, operator={}, value={}, contextValue={}, result={}",
            condition.key, condition.operator, condition.value, actual, result
        ));
        Ok(result)
    }
}

/// Evaluate without logging.
pub fn evaluate(expr: &ConditionExpression, ctx: &ExecutionContext) -> Result<bool> {
    let log = InstanceLogger::disabled();
    ConditionEvaluator::new(&log).evaluate(expr, ctx)
}

fn compare_leaf(operator: &Operator, actual: &Value, expected: &Value) -> Result<bool> {
    let result = match operator {
        Operator::Equals => values_equal(actual, expected),
        Operator::NotEquals => !values_equal(actual, expected),
        Operator::GreaterThan => order(actual, expected).is_some_and(|o| o.is_gt()),
        Operator::GreaterThanOrEquals => order(actual, expected).is_some_and(|o| o.is_ge()),
        Operator::LesserThan => order(actual, expected).is_some_and(|o| o.is_lt()),
        Operator::LesserThanOrEquals => order(actual, expected).is_some_and(|o| o.is_le()),
        Operator::In => expected
            .as_array()
            .is_some_and(|items| items.iter().any(|v| values_equal(actual, v))),
        Operator::NotIn => expected
            .as_array()
            .is_some_and(|items| !items.iter().any(|v| values_equal(actual, v))),
        Operator::Range => bounds(expected).is_some_and(|(min, max)| within(actual, min, max)),
        Operator::RangeNotIn => {
            bounds(expected).is_some_and(|(min, max)| !within(actual, min, max))
        }
        Operator::Unsupported(name) => {
            return Err(WaypointError::UnsupportedOperator(name.clone()));
        }
    };
    Ok(result)
}

/// Strict typed equality; numbers compare by value regardless of
/// integer/float representation.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn bounds(value: &Value) -> Option<(&Value, &Value)> {
    match value.as_array()?.as_slice() {
        [min, max] => Some((min, max)),
        _ => None,
    }
}

fn within(actual: &Value, min: &Value, max: &Value) -> bool {
    order(actual, min).is_some_and(|o| o.is_ge()) && order(actual, max).is_some_and(|o| o.is_le())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use waypoint_test_utils::{context, RecordingLogger};

    fn leaf(key: &str, op: &str, value: Value) -> ConditionExpression {
        ConditionExpression::leaf(key, op, value)
    }

    fn check(op: &str, actual: Value, expected: Value) -> bool {
        let ctx = context(json!({ "x": actual }));
        evaluate(&leaf("x", op, expected), &ctx).unwrap()
    }

    #[test]
    fn test_age_threshold() {
        let cond = leaf("age", "greater_than_or_equals", json!(18));
        assert!(evaluate(&cond, &context(json!({"age": 20}))).unwrap());
        assert!(!evaluate(&cond, &context(json!({"age": 16}))).unwrap());
        assert!(!evaluate(&cond, &context(json!({}))).unwrap());
    }

    #[test]
    fn test_missing_key_is_logged_not_failed() {
        let sink = Arc::new(RecordingLogger::new());
        let log = InstanceLogger::new("eval", true, sink.clone());
        let evaluator = ConditionEvaluator::new(&log);

        let result = evaluator
            .evaluate(&leaf("age", "bogus_operator", json!(1)), &context(json!({})))
            .unwrap();
        assert!(!result);
        assert!(sink.contains("context does not have key age"));
    }

    #[test]
    fn test_equality_is_typed() {
        assert!(check("equals", json!("premium"), json!("premium")));
        assert!(check("equals", json!(20), json!(20.0)));
        assert!(check("equals", json!(true), json!(true)));
        assert!(check("equals", json!(null), json!(null)));
        assert!(!check("equals", json!("1"), json!(1)));
        assert!(!check("equals", json!(0), json!(false)));
        assert!(check("not_equals", json!("basic"), json!("premium")));
        assert!(check("not_equals", json!("1"), json!(1)));
        assert!(check("equals", json!({"a": [1, 2]}), json!({"a": [1.0, 2]})));
    }

    #[test]
    fn test_ordering() {
        assert!(check("greater_than", json!(21), json!(18)));
        assert!(!check("greater_than", json!(18), json!(18)));
        assert!(check("greater_than_or_equals", json!(18), json!(18)));
        assert!(check("lesser_than", json!(1.5), json!(2)));
        assert!(check("lesser_than_or_equals", json!(2), json!(2.0)));
        assert!(check("lesser_than", json!("apple"), json!("banana")));
        assert!(!check("greater_than", json!("20"), json!(18)));
        assert!(!check("lesser_than", json!(null), json!(18)));
    }

    #[test]
    fn test_membership() {
        assert!(check("in", json!(2), json!([1, 2, 3])));
        assert!(!check("in", json!(4), json!([1, 2, 3])));
        assert!(check("not_in", json!(4), json!([1, 2, 3])));
        assert!(!check("not_in", json!(2), json!([1, 2, 3])));
        assert!(check("in", json!("gold"), json!(["gold", "premium"])));
        // non-array value fails both forms
        assert!(!check("in", json!(2), json!(2)));
        assert!(!check("not_in", json!(2), json!(2)));
    }

    #[test]
    fn test_range_inclusive() {
        assert!(check("range", json!(20), json!([10, 20])));
        assert!(check("range", json!(10), json!([10, 20])));
        assert!(!check("range", json!(21), json!([10, 20])));
        assert!(check("range_not_in", json!(21), json!([10, 20])));
        assert!(!check("range_not_in", json!(15), json!([10, 20])));
        // malformed bounds fail both forms
        assert!(!check("range", json!(15), json!([10])));
        assert!(!check("range_not_in", json!(15), json!([10, 20, 30])));
        assert!(!check("range", json!(15), json!("10-20")));
    }

    #[test]
    fn test_unsupported_operator_fails() {
        let ctx = context(json!({"x": 1}));
        let err = evaluate(&leaf("x", "return_value", json!(null)), &ctx).unwrap_err();
        assert!(matches!(err, WaypointError::UnsupportedOperator(ref op) if op == "return_value"));
    }

    #[test]
    fn test_groups() {
        let ctx = context(json!({"age": 20, "plan": "premium"}));
        let yes = || leaf("age", "greater_than", json!(18));
        let no = || leaf("plan", "equals", json!("basic"));

        assert!(evaluate(&ConditionExpression::and(vec![yes(), yes()]), &ctx).unwrap());
        assert!(!evaluate(&ConditionExpression::and(vec![yes(), no()]), &ctx).unwrap());
        assert!(evaluate(&ConditionExpression::or(vec![no(), yes()]), &ctx).unwrap());
        assert!(!evaluate(&ConditionExpression::or(vec![no(), no()]), &ctx).unwrap());
        assert!(evaluate(&ConditionExpression::All(vec![yes(), yes()]), &ctx).unwrap());
        assert!(!evaluate(&ConditionExpression::All(vec![yes(), no()]), &ctx).unwrap());
    }

    #[test]
    fn test_nested_groups() {
        let ctx = context(json!({"age": 70, "member": false}));
        let expr = ConditionExpression::or(vec![
            leaf("member", "equals", json!(true)),
            ConditionExpression::and(vec![
                leaf("age", "range_not_in", json!([18, 64])),
                leaf("age", "greater_than", json!(64)),
            ]),
        ]);
        assert!(evaluate(&expr, &ctx).unwrap());
    }

    #[test]
    fn test_short_circuit_skips_later_children() {
        let ctx = context(json!({"x": 1}));
        let bad = || leaf("x", "no_such_operator", json!(1));

        // AND stops at the first false child
        let and = ConditionExpression::and(vec![leaf("x", "equals", json!(2)), bad()]);
        assert!(!evaluate(&and, &ctx).unwrap());

        // OR stops at the first true child
        let or = ConditionExpression::or(vec![leaf("x", "equals", json!(1)), bad()]);
        assert!(evaluate(&or, &ctx).unwrap());

        // once the outcome is open, the bad child is reached
        let open = ConditionExpression::and(vec![leaf("x", "equals", json!(1)), bad()]);
        assert!(evaluate(&open, &ctx).is_err());
    }
}
