// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Futures (spec.md §4.8): a one-shot synchronization object. `ASYNC`
//! runs its call synchronously and hands back an already-resolved
//! Future; `AWAIT` blocks on the Mutex+Condvar pair until `done` is set,
//! which with the current synchronous `ASYNC` means it never actually
//! blocks — the wait loop stays in place for the scheduler spec.md §9
//! leaves room to grow into.

#[cfg(test)]
#[path = "future_test.rs"]
mod future_test;

use crate::error::RuntimeError;
use vela_core::{FutureObj, FutureState, ObjectKind, ObjectPayload, Value};
use vela_heap::Heap;

/// Wrap `value` in a Future that is resolved before it's ever observed.
pub(crate) fn alloc_resolved(heap: &Heap, value: Value) -> Result<Value, RuntimeError> {
    let future = FutureObj {
        state: std::sync::Mutex::new(FutureState { done: true, result: Some(value) }),
        condvar: std::sync::Condvar::new(),
    };
    let size = std::mem::size_of::<FutureObj>() as u32;
    let obj = heap.allocate(ObjectKind::Future, false, size, ObjectPayload::Future(future))?;
    Ok(Value::Object(obj))
}

/// `AWAIT Ra,Rb`: block until `value` (a Future) resolves and yield its
/// result; a non-Future operand passes through unchanged (spec.md §4.8
/// "AWAIT on a non-Future is an identity").
pub(crate) fn await_value(value: Value, line: u32) -> Result<Value, RuntimeError> {
    let Value::Object(obj) = value else { return Ok(value) };
    if obj.kind() != ObjectKind::Future {
        return Ok(Value::Object(obj));
    }
    let future = match &unsafe { obj.object() }.payload {
        ObjectPayload::Future(f) => f,
        _ => unreachable!("kind() said Future"),
    };
    let mut guard = future.state.lock().map_err(|_| RuntimeError::NativeError {
        name: "await".into(),
        message: "future lock poisoned".into(),
        line,
    })?;
    while !guard.done {
        guard = future.condvar.wait(guard).map_err(|_| RuntimeError::NativeError {
            name: "await".into(),
            message: "future lock poisoned".into(),
            line,
        })?;
    }
    Ok(guard.result.unwrap_or(Value::Nil))
}
