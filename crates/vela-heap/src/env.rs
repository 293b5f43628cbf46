// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Environment & Globals (spec.md §4.4): a parent-linked pair of
//! fixed-size open-chained hash tables keyed by interned-string
//! pointer identity, with a byte-comparison fallback for names whose
//! cross-module identity isn't guaranteed yet.

#[cfg(test)]
#[path = "env_test.rs"]
mod env_test;

use crate::error::HeapError;
use crate::heap::Heap;
use vela_core::{EnvKey, EnvironmentObj, ObjectRef, Value};

/// Bucket-array width for both tables of a fresh environment. Fixed for
/// the environment's lifetime; collisions chain within a bucket.
pub const BUCKET_COUNT: usize = 16;

#[must_use]
pub fn new_environment(parent: Option<ObjectRef>) -> EnvironmentObj {
    EnvironmentObj {
        parent,
        variables: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
        functions: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
    }
}

fn name_matches(key: &EnvKey, name: ObjectRef) -> bool {
    if key.name.ptr_eq(name) {
        return true;
    }
    let a = unsafe { key.name.header().as_string() };
    let b = unsafe { name.header().as_string() };
    a.hash == b.hash && a.bytes.as_ref() == b.bytes.as_ref()
}

fn bucket_index(hash: u64) -> usize {
    (hash as usize) % BUCKET_COUNT
}

/// Insert or update `name` in one of `env`'s tables (spec.md §4.4
/// `defineGlobal` / the function-table analog).
fn insert(table: &mut [Vec<(EnvKey, Value)>], name: ObjectRef, value: Value) {
    let hash = unsafe { name.header().as_string() }.hash;
    let key = EnvKey { name, hash };
    let bucket = &mut table[bucket_index(hash)];
    if let Some(slot) = bucket.iter_mut().find(|(k, _)| name_matches(k, name)) {
        slot.1 = value;
    } else {
        bucket.push((key, value));
    }
}

fn lookup_local(table: &[Vec<(EnvKey, Value)>], name: ObjectRef) -> Option<Value> {
    let hash = unsafe { name.header().as_string() }.hash;
    table[bucket_index(hash)]
        .iter()
        .find(|(k, _)| name_matches(k, name))
        .map(|(_, v)| *v)
}

/// Walk `env` and its parent chain looking for `name` in `table`.
fn lookup_chain(
    env: ObjectRef,
    table: impl Fn(&EnvironmentObj) -> &[Vec<(EnvKey, Value)>] + Copy,
    name: ObjectRef,
) -> Option<Value> {
    let mut current = Some(env);
    while let Some(node) = current {
        let environment = match &unsafe { node.object() }.payload {
            vela_core::ObjectPayload::Environment(e) => e,
            _ => return None,
        };
        if let Some(value) = lookup_local(table(environment), name) {
            return Some(value);
        }
        current = environment.parent;
    }
    None
}

fn undefined_name_error(name: ObjectRef) -> HeapError {
    HeapError::UndefinedName { name: unsafe { name.header().as_string() }.as_str().to_string() }
}

/// `defineGlobal(env, name, value)` (spec.md §4.4): insert or update the
/// variable table, then fire the write barrier since this is a
/// pointer-store into a (possibly already-black) container.
pub fn define_global(heap: &Heap, env: ObjectRef, name: ObjectRef, value: Value) -> Result<(), HeapError> {
    let mut node = env;
    if let vela_core::ObjectPayload::Environment(environment) = &mut unsafe { node.object_mut() }.payload {
        insert(&mut environment.variables, name, value);
    }
    heap.write_barrier(env)
}

/// `getGlobal(env, name) -> value | error` (spec.md §4.4): undefined
/// name is a runtime error.
pub fn get_global(env: ObjectRef, name: ObjectRef) -> Result<Value, HeapError> {
    lookup_chain(env, |e| &e.variables, name).ok_or_else(|| undefined_name_error(name))
}

/// Insert or update the function table, without the "also mirror into
/// variables" behavior that only `defineNative` needs.
pub fn define_function(heap: &Heap, env: ObjectRef, name: ObjectRef, value: Value) -> Result<(), HeapError> {
    let mut node = env;
    if let vela_core::ObjectPayload::Environment(environment) = &mut unsafe { node.object_mut() }.payload {
        insert(&mut environment.functions, name, value);
    }
    heap.write_barrier(env)
}

pub fn get_function(env: ObjectRef, name: ObjectRef) -> Result<Value, HeapError> {
    lookup_chain(env, |e| &e.functions, name).ok_or_else(|| undefined_name_error(name))
}
