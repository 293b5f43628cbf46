// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Heap object layout: the `ObjectHeader` every object carries, and the
//! plain-data payload for each object kind named in spec.md §3.

use crate::value::{ObjectRef, Value};
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Strings at or under this length are candidates for interning
/// (spec.md §3 invariant I3, threshold example).
pub const MAX_SHORT_STRING_LEN: usize = 256;

/// Discriminant for the kind of object a header describes.
///
/// Mirrored alongside `ObjectPayload`'s own discriminant so that GC
/// bookkeeping (which only ever looks at the header) can branch on kind
/// without touching the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectKind {
    String = 0,
    Array = 1,
    Map = 2,
    StructDef = 3,
    StructInstance = 4,
    Function = 5,
    Module = 6,
    Environment = 7,
    Future = 8,
}

impl ObjectKind {
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Array => "array",
            Self::Map => "map",
            Self::StructDef => "struct-def",
            Self::StructInstance => "struct",
            Self::Function => "function",
            Self::Module => "module",
            Self::Environment => "environment",
            Self::Future => "future",
        }
    }
}

/// Generation an object currently lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Generation {
    Young = 0,
    Old = 1,
}

/// Every heap object starts with this header (spec.md §3 "ObjectHeader
/// fields").
pub struct ObjectHeader {
    pub kind: ObjectKind,
    /// Tri-color mark bit. Plain `bool` would race under the background
    /// marker, so this is atomic even though only one bit is used.
    mark: AtomicBool,
    /// Roots registered by native library setup; never reclaimed.
    pub permanent: bool,
    generation: AtomicU8,
    /// Intrusive link forming the per-generation allocation list.
    pub next: Option<NonNull<Object>>,
    /// Approximate allocation size in bytes, for GC threshold accounting
    /// and sweep bookkeeping (spec.md §4.1 "bumps a byte counter").
    pub size: u32,
}

impl ObjectHeader {
    #[must_use]
    pub fn new(kind: ObjectKind, permanent: bool, size: u32) -> Self {
        Self {
            kind,
            // Objects allocated while the GC is marking must start black
            // (snapshot-at-the-beginning); `Heap::allocate` flips this to
            // `true` when appropriate after construction.
            mark: AtomicBool::new(permanent),
            permanent,
            generation: AtomicU8::new(Generation::Young as u8),
            next: None,
            size,
        }
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.mark.load(Ordering::Acquire)
    }

    pub fn set_marked(&self, marked: bool) {
        self.mark.store(marked, Ordering::Release);
    }

    /// Atomically mark the object; returns whether it was already marked
    /// (used by the tracer to avoid re-queuing a black object).
    pub fn mark_if_unmarked(&self) -> bool {
        self.mark
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        match self.generation.load(Ordering::Acquire) {
            0 => Generation::Young,
            _ => Generation::Old,
        }
    }

    pub fn promote(&self) {
        self.generation
            .store(Generation::Old as u8, Ordering::Release);
    }
}

/// A heap object: header followed by its payload.
///
/// `#[repr(C)]` with the header as the first field guarantees a pointer
/// to the header is also a valid pointer to the whole object, which is
/// what lets `ObjectRef` (a `NonNull<ObjectHeader>`) be reinterpreted as
/// `*const Object` / `*mut Object`.
#[repr(C)]
pub struct Object {
    pub header: ObjectHeader,
    pub payload: ObjectPayload,
}

/// The per-kind payload. One variant per object kind in spec.md §3.
pub enum ObjectPayload {
    String(StringObj),
    Array(ArrayObj),
    Map(HeapMap),
    StructDef(StructDefObj),
    StructInstance(StructInstanceObj),
    Function(FunctionObj),
    Module(ModuleObj),
    Environment(EnvironmentObj),
    Future(FutureObj),
}

/// Immutable byte sequence with a precomputed hash (spec.md §3 "String").
pub struct StringObj {
    pub bytes: Box<[u8]>,
    pub hash: u64,
}

impl StringObj {
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Safety: only ever constructed from valid UTF-8 (§4.2, §4.7
        // conversions always produce valid UTF-8 themselves).
        core::str::from_utf8(&self.bytes).unwrap_or("")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn is_internable(&self) -> bool {
        self.bytes.len() <= MAX_SHORT_STRING_LEN
    }
}

/// Dynamic sequence of values (spec.md §3 "Array").
#[derive(Default)]
pub struct ArrayObj {
    pub items: Vec<Value>,
}

/// A single key in a [`HeapMap`]: strings compare by content, integers by
/// value (spec.md §3 "Map": "hash table from string-or-integer key").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Int(i64),
    /// Hash of the string's bytes, used for bucket placement; equality
    /// still requires comparing the live string contents (stored
    /// alongside in `HeapMapEntry::key_str`).
    Str(u64),
}

pub struct HeapMapEntry {
    pub key: KeyValue,
    pub key_str: Option<Box<str>>,
    pub value: Value,
}

/// Open-chained hash table from string-or-integer key to value.
#[derive(Default)]
pub struct HeapMap {
    pub buckets: Vec<Vec<HeapMapEntry>>,
    pub len: usize,
}

/// Ordered list of field names for a struct type (spec.md §3 "StructDef").
pub struct StructDefObj {
    pub name: Box<str>,
    pub fields: Vec<ObjectRef>,
}

/// An instance of a [`StructDefObj`] (spec.md §3 "StructInstance").
pub struct StructInstanceObj {
    pub def: ObjectRef,
    pub fields: Vec<Value>,
}

/// Either a compiled bytecode function or a native host function
/// (spec.md §3 "Function").
pub enum FunctionObj {
    Bytecode {
        chunk: std::sync::Arc<crate::chunk::Chunk>,
        arity: u8,
        module_env: ObjectRef,
        module_path: Option<Box<str>>,
        name: Box<str>,
    },
    Native {
        func: NativeFn,
        arity: Option<u8>,
        name: Box<str>,
    },
}

/// Native function pointer per the ABI in spec.md §4.6 / §6.
pub type NativeFn = fn(args: &[Value]) -> Result<Value, Box<str>>;

/// A name plus its own environment (spec.md §3 "Module").
pub struct ModuleObj {
    pub name: Box<str>,
    pub path: Option<Box<str>>,
    pub env: ObjectRef,
}

/// Parent link plus two fixed-size open-chained hash tables, keyed by
/// interned-string pointer identity (spec.md §3 "Environment", §4.4).
pub struct EnvironmentObj {
    pub parent: Option<ObjectRef>,
    pub variables: Vec<Vec<(EnvKey, Value)>>,
    pub functions: Vec<Vec<(EnvKey, Value)>>,
}

/// A binding key: pointer identity of an interned string when available,
/// falling back to byte comparison when cross-module identity can't be
/// assumed (spec.md §4.4).
#[derive(Clone, Copy)]
pub struct EnvKey {
    pub name: ObjectRef,
    pub hash: u64,
}

/// One-shot synchronization object (spec.md §3 "Future").
pub struct FutureObj {
    pub state: std::sync::Mutex<FutureState>,
    pub condvar: std::sync::Condvar,
}

#[derive(Default)]
pub struct FutureState {
    pub done: bool,
    pub result: Option<Value>,
}

impl ObjectHeader {
    /// Reinterpret `self` (the header, always the first field of
    /// `Object`) as the owning `Object` and borrow its string payload.
    ///
    /// # Safety
    /// Caller must know `self` actually belongs to a `String` object.
    #[must_use]
    pub fn as_string(&self) -> &StringObj {
        let obj = (std::ptr::from_ref(self)).cast::<Object>();
        match unsafe { &(*obj).payload } {
            ObjectPayload::String(s) => s,
            _ => unreachable!("as_string called on non-string object"),
        }
    }
}

impl ObjectRef {
    /// Borrow the full object (header + payload).
    ///
    /// # Safety
    /// The object must still be alive.
    #[must_use]
    pub unsafe fn object(&self) -> &Object {
        unsafe { &*self.as_ptr().cast::<Object>() }
    }

    /// Mutably borrow the full object.
    ///
    /// # Safety
    /// The caller must hold exclusive access (no other live borrows) and
    /// the object must still be alive. Any pointer-store into a
    /// container payload must go through the write barrier afterwards.
    #[must_use]
    pub unsafe fn object_mut(&mut self) -> &mut Object {
        unsafe { &mut *self.as_ptr().cast::<Object>() }
    }
}
