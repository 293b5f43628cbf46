// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! The heap: allocation, the nursery/old generation lists, and the
//! tri-color mark-sweep collector that drives them (spec.md §4.1,
//! §4.3). Grounded on `fgc::gc::GarbageCollector`'s orchestration shape
//! (state mutex, gray worklist, stats struct), simplified from FGC's
//! concurrent mark-compact-with-regions design to the plain
//! nursery+old mark-sweep spec.md actually asks for.

#[cfg(test)]
#[path = "heap_test.rs"]
mod heap_test;

use crate::error::HeapError;
use crate::gc::{recompute_threshold, GcConfig, GcState, GcStats};
use crate::interner::{hash_bytes, StringInterner};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};
use vela_core::{
    ArrayObj, Object, ObjectHeader, ObjectKind, ObjectPayload, ObjectRef, StringObj, Value,
};

/// Supplies the roots the mutator alone knows about: the value stack,
/// active call-frame register windows, and the module table (spec.md
/// §4.3 step 1). The heap itself contributes permanent roots and the
/// interner's live entries without the caller's help.
pub trait RootProvider {
    fn enumerate_roots(&self, push: &mut dyn FnMut(ObjectRef));
}

/// A `RootProvider` with nothing to contribute, useful for tests and
/// for collecting before any frame has been pushed.
pub struct NoRoots;
impl RootProvider for NoRoots {
    fn enumerate_roots(&self, _push: &mut dyn FnMut(ObjectRef)) {}
}

/// Intrusive singly-linked allocation list for one generation.
#[derive(Default)]
struct ObjectList {
    head: Option<NonNull<Object>>,
    tail: Option<NonNull<Object>>,
    count: usize,
    bytes: usize,
}

// Safety: list nodes are only ever touched while the owning `Mutex` is
// held, so the raw pointers inside don't need their own synchronization.
unsafe impl Send for ObjectList {}

impl ObjectList {
    fn push_front(&mut self, mut node: NonNull<Object>, size: usize) {
        unsafe {
            node.as_mut().header.next = self.head;
        }
        if self.tail.is_none() {
            self.tail = Some(node);
        }
        self.head = Some(node);
        self.count += 1;
        self.bytes += size;
    }

    /// Move every node of `self` onto the head of `dest`, emptying `self`.
    fn drain_onto_head_of(&mut self, dest: &mut Self) {
        let Some(tail) = self.tail else { return };
        unsafe {
            (*tail.as_ptr()).header.next = dest.head;
        }
        if dest.head.is_none() {
            dest.tail = self.tail;
        }
        dest.head = self.head;
        dest.count += self.count;
        dest.bytes += self.bytes;
        *self = Self::default();
    }

    /// Drop every unmarked node, clear the mark bit and promote the
    /// survivors (spec.md §4.3 step 4).
    fn sweep(&mut self) -> (usize, usize) {
        let mut freed_count = 0;
        let mut freed_bytes = 0;
        let mut survivors = Self::default();
        let mut cursor = self.head.take();
        self.tail = None;
        while let Some(node) = cursor {
            let header = unsafe { &(*node.as_ptr()).header };
            cursor = header.next;
            if header.is_marked() {
                header.set_marked(false);
                header.promote();
                let size = header.size as usize;
                survivors.push_front(node, size);
            } else {
                freed_count += 1;
                freed_bytes += header.size as usize;
                drop(unsafe { Box::from_raw(node.as_ptr()) });
            }
        }
        *self = survivors;
        (freed_count, freed_bytes)
    }
}

/// The value heap shared by every frame of one VM instance.
pub struct Heap {
    nursery: Mutex<ObjectList>,
    old: Mutex<ObjectList>,
    state: Mutex<GcState>,
    threshold: AtomicUsize,
    bytes_allocated: AtomicUsize,
    config: GcConfig,
    interner: StringInterner,
    permanent_roots: Mutex<Vec<ObjectRef>>,
    /// Containers re-grayed by the write barrier while a cycle is
    /// marking; drained by the tracer alongside its own gray stack.
    regray: Mutex<Vec<ObjectRef>>,
}

impl Heap {
    #[must_use]
    pub fn new(config: GcConfig) -> Self {
        Self {
            nursery: Mutex::default(),
            old: Mutex::default(),
            state: Mutex::new(GcState::Idle),
            threshold: AtomicUsize::new(config.initial_threshold),
            bytes_allocated: AtomicUsize::new(0),
            config,
            interner: StringInterner::new(),
            permanent_roots: Mutex::new(Vec::new()),
            regray: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    #[must_use]
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated.load(Ordering::Relaxed)
    }

    fn state(&self) -> Result<GcState, HeapError> {
        self.state
            .lock()
            .map(|s| *s)
            .map_err(|e| HeapError::LockPoisoned(format!("gc state: {e}")))
    }

    /// Allocate a new object of `kind` with the given payload. Links it
    /// into the nursery unless `permanent`, in which case it is rooted
    /// forever and never linked into a sweepable list (spec.md §3
    /// "Lifecycles").
    pub fn allocate(
        &self,
        kind: ObjectKind,
        permanent: bool,
        size: u32,
        payload: ObjectPayload,
    ) -> Result<ObjectRef, HeapError> {
        let marking = self.state()? == GcState::Marking;
        let header = ObjectHeader::new(kind, permanent, size);
        if marking && !permanent {
            // Snapshot-at-the-beginning: allocate black during an active
            // mark so the tracer never has to revisit this object.
            header.set_marked(true);
        }
        let boxed = Box::new(Object { header, payload });
        let raw = Box::into_raw(boxed);
        let node = NonNull::new(raw).ok_or(HeapError::OutOfMemory)?;
        let obj_ref = unsafe { ObjectRef::from_raw(node.cast()) };

        if permanent {
            self.permanent_roots
                .lock()
                .map_err(|e| HeapError::LockPoisoned(format!("permanent roots: {e}")))?
                .push(obj_ref);
        } else {
            self.nursery
                .lock()
                .map_err(|e| HeapError::LockPoisoned(format!("nursery: {e}")))?
                .push_front(node, size as usize);
            self.bytes_allocated.fetch_add(size as usize, Ordering::Relaxed);
        }
        Ok(obj_ref)
    }

    /// Intern-aware string allocation (spec.md §4.2). Strings at or
    /// under the interning threshold are looked up first; a miss
    /// allocates and registers the new object, a hit returns the
    /// existing one and allocates nothing.
    pub fn alloc_string(&self, bytes: &[u8]) -> Result<ObjectRef, HeapError> {
        let hash = hash_bytes(bytes);
        let internable = bytes.len() <= vela_core::MAX_SHORT_STRING_LEN;
        if internable {
            if let Some(existing) = self.interner.lookup(bytes, hash)? {
                return Ok(existing);
            }
        }
        let size = (bytes.len() + std::mem::size_of::<StringObj>()) as u32;
        let payload = ObjectPayload::String(StringObj { bytes: bytes.into(), hash });
        let obj_ref = self.allocate(ObjectKind::String, false, size, payload)?;
        if internable {
            self.interner.insert(obj_ref, hash)?;
        }
        Ok(obj_ref)
    }

    pub fn alloc_array(&self, items: Vec<Value>) -> Result<ObjectRef, HeapError> {
        let size = (items.capacity() * std::mem::size_of::<Value>()) as u32;
        self.allocate(ObjectKind::Array, false, size, ObjectPayload::Array(ArrayObj { items }))
    }

    /// Allocate a fresh module/top-level scope (spec.md §3
    /// "Environment"). `permanent` should be `true` only for the
    /// host-module environment created at startup (spec.md §3
    /// "Lifecycles": "native functions registered at startup, their
    /// host-module Environment ... are allocated once and never
    /// reclaimed").
    pub fn alloc_environment(&self, parent: Option<ObjectRef>, permanent: bool) -> Result<ObjectRef, HeapError> {
        let env = crate::env::new_environment(parent);
        let size = std::mem::size_of::<vela_core::EnvironmentObj>() as u32;
        self.allocate(ObjectKind::Environment, permanent, size, ObjectPayload::Environment(env))
    }

    /// Write barrier (spec.md §4.3 "Write barrier contract"): called by
    /// every opcode that mutates a container (array push, index-store,
    /// struct field store, global define/set, environment insert). If a
    /// GC cycle is marking and `container` is already black, queue it
    /// for re-tracing so the newly reachable white value isn't missed.
    pub fn write_barrier(&self, container: ObjectRef) -> Result<(), HeapError> {
        if self.state()? != GcState::Marking {
            return Ok(());
        }
        if unsafe { container.header() }.is_marked() {
            self.regray
                .lock()
                .map_err(|e| HeapError::LockPoisoned(format!("regray set: {e}")))?
                .push(container);
        }
        Ok(())
    }

    /// Run one full stop-the-world cycle synchronously.
    #[instrument(skip(self, roots))]
    pub fn collect(&self, roots: &dyn RootProvider) -> Result<GcStats, HeapError> {
        self.begin_marking()?;
        let mut gray = self.seed_roots(roots)?;
        self.drain_gray(&mut gray)?;
        self.finish_marking()?;
        let stats = self.sweep_and_resize()?;
        self.finish_sweeping()?;
        info!(freed = stats.bytes_freed, retained = stats.bytes_retained, next_threshold = stats.new_threshold, "gc cycle complete");
        Ok(stats)
    }

    /// Run a cycle in the background: roots are enumerated on the
    /// calling thread (the "brief pause" spec.md §4.3 describes), then
    /// marking and sweeping proceed on a dedicated thread while the
    /// mutator keeps running, protected by the write barrier.
    pub fn collect_background(self: &Arc<Self>, roots: &dyn RootProvider) -> Result<(), HeapError> {
        self.begin_marking()?;
        let mut gray = self.seed_roots(roots)?;
        let heap = Arc::clone(self);
        std::thread::Builder::new()
            .name("vela-gc-marker".into())
            .spawn(move || {
                if let Err(err) = heap.drain_gray(&mut gray).and_then(|()| heap.finish_marking()) {
                    tracing::error!(%err, "background marker failed");
                    return;
                }
                match heap.sweep_and_resize().and_then(|stats| {
                    heap.finish_sweeping()?;
                    Ok(stats)
                }) {
                    Ok(stats) => info!(freed = stats.bytes_freed, "background gc cycle complete"),
                    Err(err) => tracing::error!(%err, "background sweep failed"),
                }
            })
            .map_err(|e| HeapError::LockPoisoned(format!("spawn gc thread: {e}")))?;
        Ok(())
    }

    /// Trigger a collection if the byte counter has crossed the current
    /// threshold, or unconditionally in stress mode (spec.md §4.1).
    pub fn maybe_collect(self: &Arc<Self>, roots: &dyn RootProvider) -> Result<(), HeapError> {
        let over_threshold = self.bytes_allocated() > self.threshold.load(Ordering::Relaxed);
        if !(over_threshold || self.config.stress) {
            return Ok(());
        }
        if self.config.background {
            self.collect_background(roots)
        } else {
            self.collect(roots).map(|_| ())
        }
    }

    fn begin_marking(&self) -> Result<(), HeapError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("gc state: {e}")))?;
        debug!("gc: idle -> marking");
        *state = GcState::Marking;
        drop(state);
        let mut nursery = self
            .nursery
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("nursery: {e}")))?;
        let mut old = self
            .old
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("old generation: {e}")))?;
        nursery.drain_onto_head_of(&mut old);
        Ok(())
    }

    fn seed_roots(&self, roots: &dyn RootProvider) -> Result<Vec<ObjectRef>, HeapError> {
        let mut gray = Vec::new();
        roots.enumerate_roots(&mut |obj| {
            if unsafe { obj.header() }.mark_if_unmarked() {
                gray.push(obj);
            }
        });
        for obj in self
            .permanent_roots
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("permanent roots: {e}")))?
            .iter()
        {
            gray.push(*obj);
        }
        Ok(gray)
    }

    fn drain_gray(&self, gray: &mut Vec<ObjectRef>) -> Result<(), HeapError> {
        loop {
            if let Some(obj) = gray.pop() {
                trace_children(obj, &mut |child| {
                    if unsafe { child.header() }.mark_if_unmarked() {
                        gray.push(child);
                    }
                });
                continue;
            }
            let mut pending = self
                .regray
                .lock()
                .map_err(|e| HeapError::LockPoisoned(format!("regray set: {e}")))?;
            if pending.is_empty() {
                break;
            }
            gray.append(&mut pending);
        }
        self.interner.prune(|obj| unsafe { obj.header() }.is_marked())?;
        Ok(())
    }

    fn finish_marking(&self) -> Result<(), HeapError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("gc state: {e}")))?;
        debug!("gc: marking -> sweeping");
        *state = GcState::Sweeping;
        Ok(())
    }

    fn sweep_and_resize(&self) -> Result<GcStats, HeapError> {
        let mut old = self
            .old
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("old generation: {e}")))?;
        let bytes_before = self.bytes_allocated();
        let (objects_freed, bytes_freed) = old.sweep();
        let bytes_retained = old.bytes;
        self.bytes_allocated.store(bytes_retained, Ordering::Relaxed);

        let previous_threshold = self.threshold.load(Ordering::Relaxed);
        let new_threshold = recompute_threshold(&self.config, previous_threshold, bytes_freed, bytes_before);
        self.threshold.store(new_threshold, Ordering::Relaxed);

        Ok(GcStats { objects_freed, bytes_freed, bytes_retained, new_threshold })
    }

    fn finish_sweeping(&self) -> Result<(), HeapError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("gc state: {e}")))?;
        debug!("gc: sweeping -> idle");
        *state = GcState::Idle;
        Ok(())
    }
}

/// Push every child reference reachable directly from `obj` (spec.md
/// §4.3 step 2: "array items, map entries, struct fields, function's
/// constant pool and closure-environment, module env's tables,
/// environment's enclosing and entry key-strings").
///
/// # Safety
/// `obj` must still be alive.
fn trace_children(obj: ObjectRef, push: &mut dyn FnMut(ObjectRef)) {
    let object = unsafe { obj.object() };
    match &object.payload {
        ObjectPayload::String(_) => {}
        ObjectPayload::Array(array) => {
            for value in &array.items {
                push_value(value, push);
            }
        }
        ObjectPayload::Map(map) => {
            for bucket in &map.buckets {
                for entry in bucket {
                    push_value(&entry.value, push);
                }
            }
        }
        ObjectPayload::StructDef(def) => {
            for field_name in &def.fields {
                push(*field_name);
            }
        }
        ObjectPayload::StructInstance(instance) => {
            push(instance.def);
            for value in &instance.fields {
                push_value(value, push);
            }
        }
        ObjectPayload::Function(vela_core::FunctionObj::Bytecode { chunk, module_env, .. }) => {
            push(*module_env);
            for constant in &chunk.constants {
                push_value(constant, push);
            }
        }
        ObjectPayload::Function(vela_core::FunctionObj::Native { .. }) => {}
        ObjectPayload::Module(module) => push(module.env),
        ObjectPayload::Environment(env) => {
            if let Some(parent) = env.parent {
                push(parent);
            }
            for table in [&env.variables, &env.functions] {
                for bucket in table {
                    for (key, value) in bucket {
                        push(key.name);
                        push_value(value, push);
                    }
                }
            }
        }
        ObjectPayload::Future(future) => {
            if let Ok(state) = future.state.lock() {
                if let Some(result) = &state.result {
                    push_value(result, push);
                }
            }
        }
    }
}

fn push_value(value: &Value, push: &mut dyn FnMut(ObjectRef)) {
    if let Value::Object(obj) = value {
        push(*obj);
    }
}
