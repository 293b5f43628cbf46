// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Shared value representation for the Vela execution core.
//!
//! This crate defines the tagged [`Value`] type and the plain-data layout
//! of every heap object kind. It owns no allocator and no garbage
//! collector — those live in `vela-heap`, which casts [`ObjectRef`]
//! pointers into the concrete structs defined here.

pub mod chunk;
pub mod object;
pub mod value;

pub use chunk::Chunk;
pub use object::{
    ArrayObj, EnvKey, EnvironmentObj, FunctionObj, FutureObj, FutureState, Generation, HeapMap,
    HeapMapEntry, KeyValue, ModuleObj, NativeFn, Object, ObjectHeader, ObjectKind, ObjectPayload,
    StringObj, StructDefObj, StructInstanceObj, MAX_SHORT_STRING_LEN,
};
pub use value::{ObjectRef, Value};
