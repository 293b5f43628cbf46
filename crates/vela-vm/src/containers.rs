// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Array, Map, and Struct operations (spec.md §4.7 "Property/index
//! access rules", §3 "Array"/"Map"/"StructDef"/"StructInstance").
//!
//! `GETIDX`/`GETPROP` misses are nil, never fatal, except a missing
//! struct field on write (`SETPROP`) or a property lookup through a
//! Module, both of which abort per spec.md.

#[cfg(test)]
#[path = "containers_test.rs"]
mod containers_test;

use crate::error::RuntimeError;
use vela_core::{ArrayObj, HeapMap, HeapMapEntry, KeyValue, ObjectKind, ObjectPayload, ObjectRef, Value};
use vela_heap::Heap;

/// Fixed bucket width for a freshly allocated Map; spec.md leaves the
/// exact count open, so this mirrors `vela_heap::env::BUCKET_COUNT`.
const MAP_BUCKET_COUNT: usize = 16;

pub(crate) fn new_array(heap: &Heap) -> Result<Value, RuntimeError> {
    Ok(Value::Object(heap.alloc_array(Vec::new())?))
}

pub(crate) fn new_map(heap: &Heap) -> Result<Value, RuntimeError> {
    let map = HeapMap { buckets: (0..MAP_BUCKET_COUNT).map(|_| Vec::new()).collect(), len: 0 };
    let size = std::mem::size_of::<HeapMap>() as u32;
    Ok(Value::Object(heap.allocate(ObjectKind::Map, false, size, ObjectPayload::Map(map))?))
}

pub(crate) fn push(heap: &Heap, array: Value, item: Value, line: u32) -> Result<(), RuntimeError> {
    let Value::Object(mut obj) = array else {
        return Err(type_err("PUSH", array, "array", line));
    };
    match &mut unsafe { obj.object_mut() }.payload {
        ObjectPayload::Array(a) => a.items.push(item),
        _ => return Err(type_err("PUSH", Value::Object(obj), "array", line)),
    }
    heap.write_barrier(obj)?;
    Ok(())
}

pub(crate) fn pop(array: Value, line: u32) -> Result<Value, RuntimeError> {
    let Value::Object(mut obj) = array else {
        return Err(type_err("POP", array, "array", line));
    };
    match &mut unsafe { obj.object_mut() }.payload {
        ObjectPayload::Array(a) => Ok(a.items.pop().unwrap_or(Value::Nil)),
        _ => Err(type_err("POP", Value::Object(obj), "array", line)),
    }
}

pub(crate) fn len(target: Value, line: u32) -> Result<Value, RuntimeError> {
    match target {
        Value::Object(obj) => match obj.kind() {
            ObjectKind::Array => match &unsafe { obj.object() }.payload {
                ObjectPayload::Array(a) => Ok(Value::Int(a.items.len() as i64)),
                _ => unreachable!("kind() said Array"),
            },
            ObjectKind::Map => match &unsafe { obj.object() }.payload {
                ObjectPayload::Map(m) => Ok(Value::Int(m.len as i64)),
                _ => unreachable!("kind() said Map"),
            },
            ObjectKind::String => Ok(Value::Int(unsafe { obj.header() }.as_string().len() as i64)),
            _ => Err(type_err("LEN", Value::Object(obj), "array, map, or string", line)),
        },
        other => Err(type_err("LEN", other, "array, map, or string", line)),
    }
}

/// `GETIDX Ra,Rb,Rc`: out-of-range or missing-key is nil, never fatal
/// (spec.md §4.7).
pub(crate) fn get_index(target: Value, index: Value, line: u32) -> Result<Value, RuntimeError> {
    match target {
        Value::Object(obj) if obj.kind() == ObjectKind::Array => {
            let ArrayObj { items } = match &unsafe { obj.object() }.payload {
                ObjectPayload::Array(a) => a,
                _ => unreachable!("kind() said Array"),
            };
            let Value::Int(idx) = index else {
                return Err(type_err("GETIDX", index, "integer index", line));
            };
            Ok(usize::try_from(idx).ok().and_then(|i| items.get(i).copied()).unwrap_or(Value::Nil))
        }
        Value::Object(obj) if obj.kind() == ObjectKind::Map => {
            let map = match &unsafe { obj.object() }.payload {
                ObjectPayload::Map(m) => m,
                _ => unreachable!("kind() said Map"),
            };
            let (key, key_str) = map_key(index, line)?;
            Ok(map_get(map, &key, key_str.as_deref()).unwrap_or(Value::Nil))
        }
        other => Err(type_err("GETIDX", other, "array or map", line)),
    }
}

/// `SETIDX Ra,Rb,Rc` (target in `A`): arrays grow to fit a positive
/// out-of-range index, filling the gap with nil (spec.md §4 Open
/// Question: guaranteed auto-growth). A negative index is a
/// `RangeError`.
pub(crate) fn set_index(heap: &Heap, target: Value, index: Value, value: Value, line: u32) -> Result<(), RuntimeError> {
    match target {
        Value::Object(mut obj) if obj.kind() == ObjectKind::Array => {
            let Value::Int(idx) = index else {
                return Err(type_err("SETIDX", index, "integer index", line));
            };
            if idx < 0 {
                return Err(RuntimeError::RangeError { index: idx, line });
            }
            let idx = idx as usize;
            match &mut unsafe { obj.object_mut() }.payload {
                ObjectPayload::Array(a) => {
                    if idx >= a.items.len() {
                        a.items.resize(idx + 1, Value::Nil);
                    }
                    a.items[idx] = value;
                }
                _ => unreachable!("kind() said Array"),
            }
            heap.write_barrier(obj)?;
            Ok(())
        }
        Value::Object(mut obj) if obj.kind() == ObjectKind::Map => {
            let (key, key_str) = map_key(index, line)?;
            match &mut unsafe { obj.object_mut() }.payload {
                ObjectPayload::Map(m) => map_set(m, key, key_str, value),
                _ => unreachable!("kind() said Map"),
            }
            heap.write_barrier(obj)?;
            Ok(())
        }
        other => Err(type_err("SETIDX", other, "array or map", line)),
    }
}

/// `GETPROP Ra,Rb,Kc`: struct field lookup is a non-fatal scan-or-nil;
/// a Module property is a fatal-if-undefined global lookup; `"length"`
/// on a String returns its byte length (spec.md §4.7).
pub(crate) fn get_prop(object: Value, field: ObjectRef, line: u32) -> Result<Value, RuntimeError> {
    match object {
        Value::Object(obj) if obj.kind() == ObjectKind::StructInstance => {
            let instance = match &unsafe { obj.object() }.payload {
                ObjectPayload::StructInstance(i) => i,
                _ => unreachable!("kind() said StructInstance"),
            };
            let def = match &unsafe { instance.def.object() }.payload {
                ObjectPayload::StructDef(d) => d,
                _ => unreachable!("struct instance's def is always a StructDef"),
            };
            Ok(def
                .fields
                .iter()
                .position(|f| field_matches(*f, field))
                .and_then(|i| instance.fields.get(i).copied())
                .unwrap_or(Value::Nil))
        }
        Value::Object(obj) if obj.kind() == ObjectKind::Module => {
            let env = match &unsafe { obj.object() }.payload {
                ObjectPayload::Module(m) => m.env,
                _ => unreachable!("kind() said Module"),
            };
            vela_heap::env::get_global(env, field)
                .map_err(|_| crate::interpreter::name_error(field, line))
        }
        Value::Object(obj) if obj.kind() == ObjectKind::String => {
            if unsafe { field.header() }.as_string().as_str() == "length" {
                Ok(Value::Int(unsafe { obj.header() }.as_string().len() as i64))
            } else {
                Err(type_err("GETPROP", Value::Object(obj), "a struct, module, or \"length\"", line))
            }
        }
        other => Err(type_err("GETPROP", other, "struct, module, or string", line)),
    }
}

/// `SETPROP Ra,Kb,Rc`: the field must already exist on the instance's
/// type; a missing field is fatal (spec.md §4.7).
pub(crate) fn set_prop(heap: &Heap, object: Value, field: ObjectRef, value: Value, line: u32) -> Result<(), RuntimeError> {
    let Value::Object(mut obj) = object else {
        return Err(type_err("SETPROP", object, "struct", line));
    };
    if obj.kind() != ObjectKind::StructInstance {
        return Err(type_err("SETPROP", Value::Object(obj), "struct", line));
    }
    let field_index = {
        let instance = match &unsafe { obj.object() }.payload {
            ObjectPayload::StructInstance(i) => i,
            _ => unreachable!("kind() said StructInstance"),
        };
        let def = match &unsafe { instance.def.object() }.payload {
            ObjectPayload::StructDef(d) => d,
            _ => unreachable!("struct instance's def is always a StructDef"),
        };
        def.fields.iter().position(|f| field_matches(*f, field))
    };
    let Some(field_index) = field_index else {
        let name = unsafe { field.header() }.as_string().as_str().to_string();
        return Err(RuntimeError::NameError { name, line });
    };
    match &mut unsafe { obj.object_mut() }.payload {
        ObjectPayload::StructInstance(i) => i.fields[field_index] = value,
        _ => unreachable!("kind() said StructInstance"),
    }
    heap.write_barrier(obj)?;
    Ok(())
}

fn field_matches(a: ObjectRef, b: ObjectRef) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    let (sa, sb) = (unsafe { a.header() }.as_string(), unsafe { b.header() }.as_string());
    sa.hash == sb.hash && sa.bytes.as_ref() == sb.bytes.as_ref()
}

fn map_key(value: Value, line: u32) -> Result<(KeyValue, Option<Box<str>>), RuntimeError> {
    match value {
        Value::Int(n) => Ok((KeyValue::Int(n), None)),
        Value::Object(obj) if obj.kind() == ObjectKind::String => {
            let s = unsafe { obj.header() }.as_string();
            Ok((KeyValue::Str(s.hash), Some(s.as_str().into())))
        }
        other => Err(type_err("map index", other, "integer or string", line)),
    }
}

fn key_eq(a: &KeyValue, a_str: Option<&str>, b: &KeyValue, b_str: Option<&str>) -> bool {
    match (a, b) {
        (KeyValue::Int(x), KeyValue::Int(y)) => x == y,
        (KeyValue::Str(_), KeyValue::Str(_)) => a_str == b_str,
        _ => false,
    }
}

fn bucket_index(bucket_count: usize, key: &KeyValue) -> usize {
    match key {
        KeyValue::Int(n) => (*n as u64 as usize) % bucket_count,
        KeyValue::Str(h) => (*h as usize) % bucket_count,
    }
}

fn map_get(map: &HeapMap, key: &KeyValue, key_str: Option<&str>) -> Option<Value> {
    let idx = bucket_index(map.buckets.len(), key);
    map.buckets[idx]
        .iter()
        .find(|e| key_eq(&e.key, e.key_str.as_deref(), key, key_str))
        .map(|e| e.value)
}

fn map_set(map: &mut HeapMap, key: KeyValue, key_str: Option<Box<str>>, value: Value) {
    let idx = bucket_index(map.buckets.len(), &key);
    let bucket = &mut map.buckets[idx];
    if let Some(slot) = bucket.iter_mut().find(|e| key_eq(&e.key, e.key_str.as_deref(), &key, key_str.as_deref())) {
        slot.value = value;
    } else {
        bucket.push(HeapMapEntry { key, key_str, value });
        map.len += 1;
    }
}

fn type_err(op: &'static str, found: Value, expected: &'static str, line: u32) -> RuntimeError {
    RuntimeError::TypeError { op, found: found.type_name(), expected, line }
}
