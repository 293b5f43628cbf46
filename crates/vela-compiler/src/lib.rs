// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! AST -> bytecode compiler for the Vela VM (spec.md §4.6).
//!
//! [`compile_module`] is the only entry point a caller needs: it walks
//! a parsed program once, resolving locals against a per-function
//! register allocator and emitting globals for anything declared
//! directly at module scope.

mod compiler;
mod declare;
mod error;
mod statement;

pub use compiler::{FunctionCompiler, ModuleCompiler};
pub use declare::compile_module;
pub use error::CompileError;
