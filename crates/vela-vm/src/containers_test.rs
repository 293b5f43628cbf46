// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

#![allow(clippy::unwrap_used)]

use super::*;
use vela_core::{ObjectPayload, StructDefObj, StructInstanceObj};
use vela_heap::{GcConfig, Heap};

fn heap() -> Heap {
    Heap::new(GcConfig::default())
}

#[test]
fn getidx_out_of_range_is_nil_not_fatal() {
    let h = heap();
    let array = new_array(&h).unwrap();
    let value = get_index(array, Value::Int(5), 1).unwrap();
    assert_eq!(value, Value::Nil);
}

#[test]
fn setidx_auto_grows_filling_gaps_with_nil() {
    let h = heap();
    let array = new_array(&h).unwrap();
    set_index(&h, array, Value::Int(3), Value::Int(99), 1).unwrap();
    assert_eq!(get_index(array, Value::Int(3), 1).unwrap(), Value::Int(99));
    assert_eq!(get_index(array, Value::Int(0), 1).unwrap(), Value::Nil);
    assert_eq!(len(array, 1).unwrap(), Value::Int(4));
}

#[test]
fn setidx_rejects_negative_index() {
    let h = heap();
    let array = new_array(&h).unwrap();
    let err = set_index(&h, array, Value::Int(-1), Value::Int(1), 9).unwrap_err();
    assert!(matches!(err, RuntimeError::RangeError { index: -1, line: 9 }));
}

#[test]
fn push_and_pop_round_trip() {
    let h = heap();
    let array = new_array(&h).unwrap();
    push(&h, array, Value::Int(1), 1).unwrap();
    push(&h, array, Value::Int(2), 1).unwrap();
    assert_eq!(len(array, 1).unwrap(), Value::Int(2));
    assert_eq!(pop(array, 1).unwrap(), Value::Int(2));
    assert_eq!(len(array, 1).unwrap(), Value::Int(1));
}

#[test]
fn pop_on_empty_array_is_nil() {
    let h = heap();
    let array = new_array(&h).unwrap();
    assert_eq!(pop(array, 1).unwrap(), Value::Nil);
}

#[test]
fn map_get_and_set_by_string_key() {
    let h = heap();
    let map = new_map(&h).unwrap();
    let key = Value::Object(h.alloc_string(b"name").unwrap());
    set_index(&h, map, key, Value::Int(7), 1).unwrap();
    assert_eq!(get_index(map, key, 1).unwrap(), Value::Int(7));
}

#[test]
fn map_get_missing_key_is_nil() {
    let h = heap();
    let map = new_map(&h).unwrap();
    let key = Value::Object(h.alloc_string(b"missing").unwrap());
    assert_eq!(get_index(map, key, 1).unwrap(), Value::Nil);
}

fn make_struct(h: &Heap, field_names: &[&str], values: Vec<Value>) -> Value {
    let fields: Vec<_> = field_names.iter().map(|n| h.alloc_string(n.as_bytes()).unwrap()).collect();
    let def = StructDefObj { name: "Point".into(), fields };
    let def_ref = h
        .allocate(ObjectKind::StructDef, false, std::mem::size_of::<StructDefObj>() as u32, ObjectPayload::StructDef(def))
        .unwrap();
    let instance = StructInstanceObj { def: def_ref, fields: values };
    Value::Object(
        h.allocate(ObjectKind::StructInstance, false, std::mem::size_of::<StructInstanceObj>() as u32, ObjectPayload::StructInstance(instance))
            .unwrap(),
    )
}

#[test]
fn getprop_on_struct_is_scan_or_nil() {
    let h = heap();
    let instance = make_struct(&h, &["x", "y"], vec![Value::Int(1), Value::Int(2)]);
    let field_y = h.alloc_string(b"y").unwrap();
    assert_eq!(get_prop(instance, field_y, 1).unwrap(), Value::Int(2));
    let field_missing = h.alloc_string(b"z").unwrap();
    assert_eq!(get_prop(instance, field_missing, 1).unwrap(), Value::Nil);
}

#[test]
fn setprop_on_missing_field_is_fatal() {
    let h = heap();
    let instance = make_struct(&h, &["x"], vec![Value::Int(1)]);
    let field_missing = h.alloc_string(b"z").unwrap();
    let err = set_prop(&h, instance, field_missing, Value::Int(9), 3).unwrap_err();
    assert!(matches!(err, RuntimeError::NameError { line: 3, .. }));
}

#[test]
fn setprop_updates_existing_field() {
    let h = heap();
    let instance = make_struct(&h, &["x"], vec![Value::Int(1)]);
    let field_x = h.alloc_string(b"x").unwrap();
    set_prop(&h, instance, field_x, Value::Int(42), 1).unwrap();
    assert_eq!(get_prop(instance, field_x, 1).unwrap(), Value::Int(42));
}

#[test]
fn string_length_property() {
    let h = heap();
    let s = Value::Object(h.alloc_string(b"hello").unwrap());
    let field_len = h.alloc_string(b"length").unwrap();
    assert_eq!(get_prop(s, field_len, 1).unwrap(), Value::Int(5));
}
