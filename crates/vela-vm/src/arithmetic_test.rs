// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

#![allow(clippy::unwrap_used)]

use super::*;
use proptest::prelude::*;
use vela_heap::{GcConfig, Heap};

fn heap() -> Heap {
    Heap::new(GcConfig::default())
}

#[test]
fn int_add_wraps_on_overflow() {
    let h = heap();
    let result = add(&h, Value::Int(i64::MAX), Value::Int(1), 1).unwrap();
    assert_eq!(result, Value::Int(i64::MIN));
}

#[test]
fn mixed_int_float_promotes_to_float() {
    let h = heap();
    let result = add(&h, Value::Int(1), Value::Float(0.5), 1).unwrap();
    assert_eq!(result, Value::Float(1.5));
}

#[test]
fn string_concat_via_add() {
    let h = heap();
    let s = h.alloc_string(b"foo").unwrap();
    let result = add(&h, Value::Object(s), Value::Int(1), 1).unwrap();
    let Value::Object(obj) = result else { panic!("expected a string object") };
    assert_eq!(unsafe { obj.header() }.as_string().as_str(), "foo1");
}

#[test]
fn div_by_zero_int_is_fatal() {
    let err = div(Value::Int(1), Value::Int(0), 7).unwrap_err();
    assert!(matches!(err, RuntimeError::DivisionByZero { line: 7 }));
}

#[test]
fn div_by_zero_float_is_infinity_not_an_error() {
    let result = div(Value::Float(1.0), Value::Float(0.0), 1).unwrap();
    assert_eq!(result, Value::Float(f64::INFINITY));
}

#[test]
fn modulo_takes_sign_of_divisor() {
    assert_eq!(rem(Value::Int(-7), Value::Int(3), 1).unwrap(), Value::Int(2));
    assert_eq!(rem(Value::Int(7), Value::Int(-3), 1).unwrap(), Value::Int(-2));
    assert_eq!(rem(Value::Int(-7), Value::Int(-3), 1).unwrap(), Value::Int(-1));
}

#[test]
fn comparison_rejects_nan() {
    let err = compare(Value::Float(f64::NAN), Value::Int(1), "<", 1).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeError { .. }));
}

#[test]
fn equality_crosses_int_and_float() {
    assert!(values_equal(Value::Int(3), Value::Float(3.0)));
    assert!(!values_equal(Value::Int(3), Value::Float(3.1)));
}

#[test]
fn equality_is_content_based_for_strings() {
    let h = heap();
    let a = h.alloc_string(b"same text, allocated twice, long enough to skip interning so the pointers differ up frontxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx").unwrap();
    let b = h.alloc_string(b"same text, allocated twice, long enough to skip interning so the pointers differ up frontxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx").unwrap();
    assert!(!a.ptr_eq(b));
    assert!(values_equal(Value::Object(a), Value::Object(b)));
}

#[test]
fn equality_is_identity_based_for_arrays() {
    let h = heap();
    let a = h.alloc_array(vec![Value::Int(1)]).unwrap();
    let b = h.alloc_array(vec![Value::Int(1)]).unwrap();
    assert!(!values_equal(Value::Object(a), Value::Object(b)));
    assert!(values_equal(Value::Object(a), Value::Object(a)));
}

proptest! {
    /// Integer arithmetic wraps rather than panics, for every pair of
    /// operands (spec.md §4.7: int overflow wraps).
    #[test]
    fn int_arithmetic_never_panics_and_matches_wrapping_semantics(x: i64, y: i64) {
        prop_assert_eq!(sub(Value::Int(x), Value::Int(y), 1).unwrap(), Value::Int(x.wrapping_sub(y)));
        prop_assert_eq!(mul(Value::Int(x), Value::Int(y), 1).unwrap(), Value::Int(x.wrapping_mul(y)));
        prop_assert_eq!(neg(Value::Int(x), 1).unwrap(), Value::Int(x.wrapping_neg()));
    }

    /// `%`'s result always takes the sign of the divisor (or is zero),
    /// never the dividend's, for any nonzero divisor.
    #[test]
    fn modulo_result_sign_always_matches_the_divisor(x: i64, y in any::<i64>().prop_filter("nonzero divisor", |y| *y != 0)) {
        let Value::Int(r) = rem(Value::Int(x), Value::Int(y), 1).unwrap() else { panic!("expected an int result") };
        prop_assert!(r == 0 || (r < 0) == (y < 0));
    }

    /// `+`/`*` are commutative over integers regardless of operand order.
    #[test]
    fn int_add_and_mul_are_commutative(x: i64, y: i64) {
        let h = heap();
        prop_assert_eq!(add(&h, Value::Int(x), Value::Int(y), 1).unwrap(), add(&h, Value::Int(y), Value::Int(x), 1).unwrap());
        prop_assert_eq!(mul(Value::Int(x), Value::Int(y), 1).unwrap(), mul(Value::Int(y), Value::Int(x), 1).unwrap());
    }

    /// Equality is reflexive and symmetric across every value shape this
    /// fuzz can produce (ints, floats, and the int/float crossover).
    #[test]
    fn equality_is_reflexive_and_symmetric(x: i64, y: i64) {
        let (vx, vy) = (Value::Int(x), Value::Int(y));
        prop_assert!(values_equal(vx, vx));
        prop_assert_eq!(values_equal(vx, vy), values_equal(vy, vx));

        let (as_float, as_int) = (Value::Float(f64::from(x as i32)), Value::Int(i64::from(x as i32)));
        prop_assert!(values_equal(as_float, as_int));
        prop_assert!(values_equal(as_int, as_float));
    }
}
