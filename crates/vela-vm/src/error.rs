// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Runtime error taxonomy (spec.md §7: `TypeError`, `ArityError`,
//! `NameError`, `RangeError`, `ImportError`, `OOM`, `StackOverflow`).
//!
//! Every kind here is fatal: spec.md §7 "the core does not provide
//! user-level exception handling ... all error kinds above abort
//! execution with a diagnostic naming the kind, the offending value (if
//! any), and the source line".

use thiserror::Error;
use vela_heap::HeapError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("line {line}: invalid opcode {opcode}")]
    InvalidOpcode { opcode: u8, line: u32 },

    #[error("line {line}: {op} on {found}, expected {expected}")]
    TypeError {
        op: &'static str,
        found: &'static str,
        expected: &'static str,
        line: u32,
    },

    #[error("line {line}: {name} expects {expected} argument(s), got {got}")]
    ArityError {
        name: Box<str>,
        expected: u8,
        got: u8,
        line: u32,
    },

    #[error("line {line}: undefined name: {name}")]
    NameError { name: String, line: u32 },

    #[error("line {line}: index {index} out of range")]
    RangeError { index: i64, line: u32 },

    #[error("line {line}: division by zero")]
    DivisionByZero { line: u32 },

    #[error("failed to import \"{path}\": {reason}")]
    ImportError { path: String, reason: String },

    #[error("value is not callable: {type_name}")]
    NotCallable { type_name: &'static str, line: u32 },

    #[error("native function \"{name}\" failed: {message}")]
    NativeError { name: Box<str>, message: Box<str>, line: u32 },

    #[error("call stack exceeded {limit} nested frames")]
    StackOverflow { limit: usize },

    #[error("register file exceeded {limit} registers")]
    RegisterOverflow { limit: usize },

    #[error(transparent)]
    Heap(#[from] HeapError),
}
