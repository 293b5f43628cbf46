// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Native-function registration (spec.md §4.1, §4.4 `defineNative`;
//! SPEC_FULL.md §2 "native-function registration interface").
//!
//! `vela-vm` never needs to know the names of individual native
//! modules (HTTP, JSON, ...); a host embeds them by implementing
//! [`NativeModule`] and calling [`install`] once against the host
//! environment at startup.

#[cfg(test)]
#[path = "globals_test.rs"]
mod globals_test;

use crate::env;
use crate::error::HeapError;
use crate::heap::Heap;
use tracing::info;
use vela_core::{FunctionObj, NativeFn, ObjectKind, ObjectPayload, ObjectRef, Value};

/// A bundle of native functions a host registers into a module
/// environment (the seam the standard library — HTTP, JSON, TUI, UON,
/// timers, file I/O — sits behind per spec.md §1; none of those
/// implementations are part of this crate).
pub trait NativeModule {
    fn name(&self) -> &str;
    fn register(&self, heap: &Heap, env: ObjectRef) -> Result<(), HeapError>;
}

/// `defineNative(env, name, fn, arity)` (spec.md §4.4): allocates a
/// permanent `Function::Native` object and mirrors it into both the
/// function table and the variable table, so the name is callable as a
/// first-class value.
pub fn define_native(
    heap: &Heap,
    target_env: ObjectRef,
    name: &str,
    func: NativeFn,
    arity: Option<u8>,
) -> Result<(), HeapError> {
    let name_obj = heap.alloc_string(name.as_bytes())?;
    let payload = ObjectPayload::Function(FunctionObj::Native { func, arity, name: name.into() });
    let size = std::mem::size_of::<FunctionObj>() as u32;
    let function_obj = heap.allocate(ObjectKind::Function, true, size, payload)?;

    env::define_function(heap, target_env, name_obj, Value::Object(function_obj))?;
    env::define_global(heap, target_env, name_obj, Value::Object(function_obj))
}

/// Register every module in `modules` into `env`.
pub fn install(modules: &[&dyn NativeModule], heap: &Heap, env: ObjectRef) -> Result<(), HeapError> {
    for module in modules {
        info!(module = module.name(), "registering native module");
        module.register(heap, env)?;
    }
    Ok(())
}
