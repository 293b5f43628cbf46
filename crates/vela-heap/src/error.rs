// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Error taxonomy for the heap/environment boundary (spec.md §7:
//! `NameError`, `OOM`). The remaining taxonomy entries (`ResolveError`,
//! `TypeError`, `ArityError`, `RangeError`, `ImportError`,
//! `StackOverflow`) belong to the crates that can actually raise them
//! (`vela-compiler`, `vela-vm`).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// `getGlobal` of an undefined name (spec.md §4.4, §7 `NameError`).
    #[error("undefined name: {name}")]
    UndefinedName { name: String },

    /// Allocation failure. Fatal per spec.md §4.3/§7.
    #[error("out of memory")]
    OutOfMemory,

    /// A GC-internal mutex was poisoned by a panicking holder. Per
    /// spec.md §4.3 "GC worker faults are fatal".
    #[error("GC state poisoned: {0}")]
    LockPoisoned(String),
}
