// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! `IMPORT` (spec.md §4.7 "Module import"): resolve a path relative to
//! the importing module's own directory, canonicalize it so two
//! different relative spellings of the same file share one cache
//! entry, and run it to completion in a register window that never
//! overlaps a live frame's.

#[cfg(test)]
#[path = "module_test.rs"]
mod module_test;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vela_compiler::compile_module;
use vela_core::Value;
use vela_heap::Heap;

use crate::error::RuntimeError;
use crate::interpreter::Vm;

fn resolve_path(path_text: &str, importer_path: Option<&str>) -> PathBuf {
    let requested = Path::new(path_text);
    if requested.is_absolute() {
        return requested.to_path_buf();
    }
    match importer_path.and_then(|p| Path::new(p).parent()) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(requested),
        _ => requested.to_path_buf(),
    }
}

fn import_error(path_text: &str, reason: impl ToString) -> RuntimeError {
    RuntimeError::ImportError { path: path_text.to_string(), reason: reason.to_string() }
}

/// Handle one `IMPORT` instruction: on a cache hit, hand back the
/// existing Module immediately (`Ok(Some(..))`); on a miss, read,
/// parse, and compile the target file and push an Import-kind frame so
/// the main loop runs it to completion (`Ok(None)`).
pub(crate) fn begin_import(
    vm: &mut Vm,
    path_text: &str,
    importer_path: Option<&str>,
    result_reg: usize,
) -> Result<Option<Value>, RuntimeError> {
    let resolved = resolve_path(path_text, importer_path);
    let canonical = std::fs::canonicalize(&resolved).map_err(|e| import_error(path_text, e))?;

    if let Some(cached) = vm.cached_module(&canonical) {
        return Ok(Some(cached));
    }

    let source = std::fs::read_to_string(&canonical).map_err(|e| import_error(path_text, e))?;
    let ast = vela_ast::parse(&source).map_err(|e| import_error(path_text, e))?;

    let heap: Arc<Heap> = Arc::clone(vm.heap());
    let env = heap.alloc_environment(None, false)?;
    let module_path: Box<str> = canonical.to_string_lossy().into_owned().into_boxed_str();

    let chunk = compile_module(&heap, env, Some(&module_path), &ast).map_err(|e| import_error(path_text, e))?;

    vm.begin_import(canonical, chunk, env, module_path, result_reg)
}
