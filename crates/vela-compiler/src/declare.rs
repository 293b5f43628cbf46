// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Function and struct declarations, and the public module-compiling
//! entry point (spec.md §4.4, §4.6).

#[cfg(test)]
#[path = "declare_test.rs"]
mod declare_test;

use std::sync::Arc;

use vela_ast::ast::Stmt;
use vela_bytecode::op;
use vela_core::{Chunk, FunctionObj, ObjectKind, ObjectPayload, Value};

use crate::compiler::{finish, FunctionCompiler, ModuleCompiler};
use crate::error::CompileError;
use crate::statement::stmt_line;

/// Compile an entire module's top-level body into one chunk (its own
/// "function", implicitly returning nil at the end).
pub fn compile_module(
    heap: &vela_heap::Heap,
    module_env: vela_core::ObjectRef,
    module_path: Option<&str>,
    program: &[Stmt],
) -> Result<Arc<Chunk>, CompileError> {
    let mut module = ModuleCompiler::new(heap, module_env, module_path);
    module.collect_async_functions(program);

    let mut fc = FunctionCompiler::new(&module, true);
    for stmt in program {
        fc.compile_stmt(stmt)?;
    }
    let tail_line = program.last().map_or(0, stmt_line);
    fc.emit_abc(op::RETURNNIL, 0, 0, 0, tail_line);
    Ok(finish(fc.chunk))
}

/// Compile a nested function body and bind it as a global or local
/// (spec.md §1: only module-scope capture is required, so every
/// function — including one declared inside another — gets a fresh
/// [`FunctionCompiler`] with no view of its enclosing locals).
pub(crate) fn compile_function_decl(
    fc: &mut FunctionCompiler<'_, '_>,
    name: &str,
    params: &[String],
    body: &[Stmt],
    _is_async: bool,
    line: u32,
) -> Result<(), CompileError> {
    let func_obj = compile_function(fc.module, name, params, body, line)?;

    if fc.declares_global() {
        let mark = fc.next_reg;
        let reg = fc.reserve_register(line)?;
        let idx = fc.add_constant(Value::Object(func_obj), line)?;
        fc.emit_abx(op::LOADK, reg, idx, line)?;
        let name_idx = fc.name_constant(name, line)?;
        fc.emit_abx(op::DEFGLOBAL, reg, name_idx, line)?;
        fc.next_reg = mark;
    } else {
        let reg = fc.declare_local(name, line)?;
        let idx = fc.add_constant(Value::Object(func_obj), line)?;
        fc.emit_abx(op::LOADK, reg, idx, line)?;
    }
    Ok(())
}

/// Compile `params`/`body` into their own chunk and wrap it in a
/// heap-allocated `Function` object.
///
/// The object is allocated permanent, the same way `defineNative`
/// roots its native functions (spec.md §4.4): a compiled function is
/// reachable for as long as its defining module is, so there is no
/// reclaiming benefit to tracking it through the ordinary nursery/old
/// generations, and it sidesteps having to root a half-built function
/// object against a GC cycle running concurrently with compilation.
pub(crate) fn compile_function(
    module: &ModuleCompiler<'_>,
    name: &str,
    params: &[String],
    body: &[Stmt],
    line: u32,
) -> Result<vela_core::ObjectRef, CompileError> {
    let mut fc = FunctionCompiler::new(module, false);
    for param in params {
        fc.declare_local(param, line)?;
    }
    for stmt in body {
        fc.compile_stmt(stmt)?;
    }
    let tail_line = body.last().map_or(line, stmt_line);
    fc.emit_abc(op::RETURNNIL, 0, 0, 0, tail_line);

    let arity: u8 = params.len().try_into().map_err(|_| CompileError::TooManyLocals { line })?;
    let chunk = finish(fc.chunk);
    let payload = ObjectPayload::Function(FunctionObj::Bytecode {
        chunk,
        arity,
        module_env: module.module_env,
        module_path: module.module_path.clone(),
        name: name.into(),
    });
    let size = std::mem::size_of::<FunctionObj>() as u32;
    module
        .heap
        .allocate(ObjectKind::Function, true, size, payload)
        .map_err(|source| CompileError::Heap { source, line })
}

/// `struct Name { a, b, c }` compiles to a single `STRUCTDEF` that
/// defines the type directly in the global environment; there is no
/// destination register because a struct type, unlike a value, only
/// ever lives in the globals table (spec.md §3 "StructDef").
pub(crate) fn compile_struct_decl(
    fc: &mut FunctionCompiler<'_, '_>,
    name: &str,
    fields: &[String],
    line: u32,
) -> Result<(), CompileError> {
    let name_idx = fc.name_constant(name, line)?;
    for field in fields {
        fc.name_constant(field, line)?;
    }
    let field_count: u8 = fields.len().try_into().map_err(|_| CompileError::TooManyRegisters { line })?;
    fc.emit_abx(op::STRUCTDEF, field_count, name_idx, line)?;
    Ok(())
}
