// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Arithmetic, comparison, and equality (spec.md §4.7): int arithmetic
//! wraps on overflow, any float operand promotes the whole expression to
//! float, and `+` additionally concatenates when either side is a
//! string. Grounded on the teacher's `intrinsics/arithmetic.rs`
//! (`wrapping_add`/`wrapping_sub`/`wrapping_mul`, divisor-sign-adjusted
//! modulo, structural vs. identity equality), adapted from its
//! int-only ABI to this language's int/float/string/object mix.

#[cfg(test)]
#[path = "arithmetic_test.rs"]
mod arithmetic_test;

use crate::error::RuntimeError;
use crate::value_fmt::display_value;
use vela_core::{ObjectKind, Value};
use vela_heap::Heap;

fn is_string(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if obj.kind() == ObjectKind::String)
}

fn as_number(value: Value, op: &'static str, line: u32) -> Result<Number, RuntimeError> {
    match value {
        Value::Int(n) => Ok(Number::Int(n)),
        Value::Float(f) => Ok(Number::Float(f)),
        other => Err(RuntimeError::TypeError { op, found: other.type_name(), expected: "integer or float", line }),
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

/// `+`: numeric addition, or string concatenation when either side is a
/// string (spec.md §4.7).
pub(crate) fn add(heap: &Heap, a: Value, b: Value, line: u32) -> Result<Value, RuntimeError> {
    if is_string(&a) || is_string(&b) {
        let mut text = display_value(&a);
        text.push_str(&display_value(&b));
        let obj = heap.alloc_string(text.as_bytes())?;
        return Ok(Value::Object(obj));
    }
    binop(a, b, "+", line, i64::wrapping_add, |x, y| x + y)
}

pub(crate) fn sub(a: Value, b: Value, line: u32) -> Result<Value, RuntimeError> {
    binop(a, b, "-", line, i64::wrapping_sub, |x, y| x - y)
}

pub(crate) fn mul(a: Value, b: Value, line: u32) -> Result<Value, RuntimeError> {
    binop(a, b, "*", line, i64::wrapping_mul, |x, y| x * y)
}

pub(crate) fn div(a: Value, b: Value, line: u32) -> Result<Value, RuntimeError> {
    match (as_number(a, "/", line)?, as_number(b, "/", line)?) {
        (Number::Int(_), Number::Int(0)) => Err(RuntimeError::DivisionByZero { line }),
        (Number::Int(x), Number::Int(y)) => Ok(Value::Int(x.wrapping_div(y))),
        (x, y) => Ok(Value::Float(x.as_f64() / y.as_f64())),
    }
}

/// `%`: result takes the sign of the divisor, not the dividend.
pub(crate) fn rem(a: Value, b: Value, line: u32) -> Result<Value, RuntimeError> {
    match (as_number(a, "%", line)?, as_number(b, "%", line)?) {
        (Number::Int(_), Number::Int(0)) => Err(RuntimeError::DivisionByZero { line }),
        (Number::Int(x), Number::Int(y)) => {
            let r = x.wrapping_rem(y);
            let adjusted = if (r < 0 && y > 0) || (r > 0 && y < 0) { r.wrapping_add(y) } else { r };
            Ok(Value::Int(adjusted))
        }
        (x, y) => {
            let (x, y) = (x.as_f64(), y.as_f64());
            let r = x % y;
            let adjusted = if (r < 0.0 && y > 0.0) || (r > 0.0 && y < 0.0) { r + y } else { r };
            Ok(Value::Float(adjusted))
        }
    }
}

pub(crate) fn neg(value: Value, line: u32) -> Result<Value, RuntimeError> {
    match as_number(value, "unary -", line)? {
        Number::Int(n) => Ok(Value::Int(n.wrapping_neg())),
        Number::Float(f) => Ok(Value::Float(-f)),
    }
}

fn binop(
    a: Value,
    b: Value,
    op: &'static str,
    line: u32,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (as_number(a, op, line)?, as_number(b, op, line)?) {
        (Number::Int(x), Number::Int(y)) => Ok(Value::Int(int_op(x, y))),
        (x, y) => Ok(Value::Float(float_op(x.as_f64(), y.as_f64()))),
    }
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(n) => n as f64,
            Self::Float(f) => f,
        }
    }
}

/// `<`/`<=`/`>`/`>=`: numeric only, per spec.md §4.7 (no lexical string
/// ordering in the core language).
pub(crate) fn compare(a: Value, b: Value, op: &'static str, line: u32) -> Result<std::cmp::Ordering, RuntimeError> {
    let (x, y) = (as_number(a, op, line)?.as_f64(), as_number(b, op, line)?.as_f64());
    x.partial_cmp(&y).ok_or(RuntimeError::TypeError { op, found: "nan", expected: "a comparable number", line })
}

/// `==`/`!=`: structural equality. Numbers compare across int/float,
/// strings by content, everything else (array, map, struct, function,
/// module, environment, future) by reference identity — this language
/// has no deep-equality container semantics (spec.md §3 "Lifecycles").
#[must_use]
pub(crate) fn values_equal(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => x as f64 == y,
        (Value::Object(x), Value::Object(y)) if x.kind() == ObjectKind::String && y.kind() == ObjectKind::String => {
            let (sx, sy) = (unsafe { x.header() }.as_string(), unsafe { y.header() }.as_string());
            sx.hash == sy.hash && sx.bytes.as_ref() == sy.bytes.as_ref()
        }
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        _ => false,
    }
}
