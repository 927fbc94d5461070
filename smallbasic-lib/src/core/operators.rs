//! What the operators of the language do to values. Like the conversions in
//! [`data`](crate::core::data), none of these can fail.

use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::core::{parse_number, BinaryOperator, Value};

impl Value {
    pub fn binary(&self, operator: BinaryOperator, rhs: &Value) -> Value {
        use BinaryOperator::*;
        match operator {
            Add => self.add(rhs),
            Subtract => arithmetic(self, rhs, Decimal::checked_sub),
            Multiply => arithmetic(self, rhs, Decimal::checked_mul),
            Divide => arithmetic(self, rhs, Decimal::checked_div),
            Equal => Value::Boolean(self.is_equal_to(rhs)),
            NotEqual => Value::Boolean(!self.is_equal_to(rhs)),
            LessThan => Value::Boolean(self.compare(rhs) == Ordering::Less),
            GreaterThan => Value::Boolean(self.compare(rhs) == Ordering::Greater),
            LessThanOrEqual => Value::Boolean(self.compare(rhs) != Ordering::Greater),
            GreaterThanOrEqual => Value::Boolean(self.compare(rhs) != Ordering::Less),
            And => Value::Boolean(self.to_boolean() && rhs.to_boolean()),
            Or => Value::Boolean(self.to_boolean() || rhs.to_boolean()),
        }
    }

    /// numbers and numeric text are summed, everything else is concatenated
    pub fn add(&self, rhs: &Value) -> Value {
        match (self.as_number(), rhs.as_number()) {
            (Some(l), Some(r)) => Value::Number(l.checked_add(r).unwrap_or(Decimal::ZERO)),
            _ => Value::String(self.to_display_string() + &rhs.to_display_string()),
        }
    }

    fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_number(s),
            Value::Boolean(_) | Value::Array(_) => None,
        }
    }

    pub fn negate(&self) -> Value {
        let n = self.to_number();
        if n.is_zero() {
            // no negative zero
            return Value::Number(Decimal::ZERO);
        }
        Value::Number(-n)
    }
}

/// overflow and division by zero yield 0
fn arithmetic(
    lhs: &Value,
    rhs: &Value,
    op: fn(Decimal, Decimal) -> Option<Decimal>,
) -> Value {
    Value::Number(op(lhs.to_number(), rhs.to_number()).unwrap_or(Decimal::ZERO))
}
