// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

#![allow(clippy::unwrap_used)]

use super::*;
use vela_heap::{GcConfig, Heap};

#[test]
fn resolved_future_awaits_to_its_wrapped_value() {
    let heap = Heap::new(GcConfig::default());
    let future = alloc_resolved(&heap, Value::Int(42)).unwrap();
    assert_eq!(await_value(future, 1).unwrap(), Value::Int(42));
}

#[test]
fn awaiting_a_non_future_is_an_identity() {
    assert_eq!(await_value(Value::Int(7), 1).unwrap(), Value::Int(7));
    assert_eq!(await_value(Value::Nil, 1).unwrap(), Value::Nil);
}

#[test]
fn awaiting_a_future_twice_yields_the_same_value() {
    let heap = Heap::new(GcConfig::default());
    let future = alloc_resolved(&heap, Value::Bool(true)).unwrap();
    assert_eq!(await_value(future, 1).unwrap(), Value::Bool(true));
    assert_eq!(await_value(future, 1).unwrap(), Value::Bool(true));
}
