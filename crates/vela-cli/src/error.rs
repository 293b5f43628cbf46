// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Top-level error type the runner and REPL report to the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error(transparent)]
    Parse(#[from] vela_ast::ParseError),

    #[error(transparent)]
    Compile(#[from] vela_compiler::CompileError),

    #[error(transparent)]
    Runtime(#[from] vela_vm::RuntimeError),

    #[error(transparent)]
    Heap(#[from] vela_heap::HeapError),

    #[error("line editor: {source}")]
    Readline { source: rustyline::error::ReadlineError },
}
