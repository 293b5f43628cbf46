// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! String interner (spec.md §4.2).
//!
//! Maps content to a unique `String` object for strings no longer than
//! [`vela_core::MAX_SHORT_STRING_LEN`]. A mutex protects the pool's
//! index; `Heap::intern` releases it again before the object itself is
//! allocated, so the interner never holds a lock across a GC-triggering
//! allocation.

#[cfg(test)]
#[path = "interner_test.rs"]
mod interner_test;

use crate::error::HeapError;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::Hasher;
use std::sync::Mutex;
use vela_core::ObjectRef;

/// FxHash of a byte sequence, used both for bucket placement in the
/// interner and as `StringObj::hash`.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

#[derive(Default)]
pub struct StringInterner {
    pool: Mutex<FxHashMap<u64, Vec<ObjectRef>>>,
}

impl StringInterner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing interned string with the given content.
    pub fn lookup(&self, bytes: &[u8], hash: u64) -> Result<Option<ObjectRef>, HeapError> {
        let pool = self
            .pool
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("interner pool: {e}")))?;
        Ok(pool
            .get(&hash)
            .and_then(|bucket| bucket.iter().copied().find(|obj| unsafe { obj.header().as_string().bytes.as_ref() == bytes })))
    }

    /// Register a freshly allocated string object under its hash.
    ///
    /// Spec.md §4.2: a short race window may let two mutators both miss
    /// `lookup` and both `insert` an equal string; both entries stay
    /// valid and the loser is collected normally on the next cycle.
    pub fn insert(&self, obj: ObjectRef, hash: u64) -> Result<(), HeapError> {
        let mut pool = self
            .pool
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("interner pool: {e}")))?;
        pool.entry(hash).or_default().push(obj);
        Ok(())
    }

    /// Drop entries whose object did not survive the last mark (called
    /// during sweep, per spec.md §4.3 step 3).
    pub fn prune(&self, is_marked: impl Fn(ObjectRef) -> bool) -> Result<(), HeapError> {
        let mut pool = self
            .pool
            .lock()
            .map_err(|e| HeapError::LockPoisoned(format!("interner pool: {e}")))?;
        pool.retain(|_, bucket| {
            bucket.retain(|obj| is_marked(*obj));
            !bucket.is_empty()
        });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pool
            .lock()
            .map(|pool| pool.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
