// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Compile and run one `.vl` file to completion, then exit.

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use vela_heap::{GcConfig, Heap};
use vela_vm::Vm;

use crate::error::CliError;

pub fn run_file(path: &Path, gc_config: GcConfig) -> Result<(), CliError> {
    let source = std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.display().to_string(), source })?;

    let heap = Arc::new(Heap::new(gc_config));
    let module_env = heap.alloc_environment(None, true)?;
    let module_path = path.to_string_lossy().into_owned();

    let program = vela_ast::parse(&source)?;
    let chunk = vela_compiler::compile_module(&heap, module_env, Some(&module_path), &program)?;

    info!(path = %module_path, instructions = chunk.code.len(), "running module");

    let mut vm = Vm::new(Arc::clone(&heap));
    vm.execute_chunk(chunk, module_env, Some(module_path.into_boxed_str()))?;
    Ok(())
}
