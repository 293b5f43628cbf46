// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Interactive top-level loop (SPEC_FULL.md §2 "REPL"), grounded on
//! `lona-vm/src/repl/mod.rs`'s read-compile-execute-print shape: one
//! statement in, one value out, errors reported without killing the
//! session.
//!
//! Declarations persist across lines through one shared module
//! environment; each line still gets its own [`Vm`] (mirroring the
//! teacher's `proc.reset()` between expressions), since the register
//! file has no use for state carried past a completed top-level call.

#[cfg(test)]
#[path = "repl_test.rs"]
mod repl_test;

use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use vela_bytecode::disassemble::disassemble;
use vela_core::{Chunk, ObjectRef};
use vela_heap::{GcConfig, Heap};
use vela_vm::{display_value, Vm};

use crate::error::CliError;

const PROMPT: &str = "vela> ";

pub fn run(gc_config: GcConfig) -> Result<(), CliError> {
    println!("Vela REPL. Enter statements ending in `;`. :disasm shows the last chunk, :quit exits.");

    let heap = Arc::new(Heap::new(gc_config));
    let module_env = heap.alloc_environment(None, true)?;
    let mut last_chunk: Option<Arc<Chunk>> = None;

    let mut editor = DefaultEditor::new().map_err(|source| CliError::Readline { source })?;
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line).ok();

                match line {
                    ":quit" | ":exit" => break,
                    ":disasm" => {
                        match &last_chunk {
                            Some(chunk) => print!("{}", disassemble(chunk, "<repl>")),
                            None => println!("no chunk compiled yet"),
                        }
                        continue;
                    }
                    _ => {}
                }

                eval_line(&heap, module_env, line, &mut last_chunk);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(source) => return Err(CliError::Readline { source }),
        }
    }
    Ok(())
}

fn eval_line(heap: &Arc<Heap>, module_env: ObjectRef, line: &str, last_chunk: &mut Option<Arc<Chunk>>) {
    let program = match vela_ast::parse(line) {
        Ok(program) => program,
        Err(err) => {
            println!("parse error: {err}");
            return;
        }
    };

    let chunk = match vela_compiler::compile_module(heap, module_env, None, &program) {
        Ok(chunk) => chunk,
        Err(err) => {
            println!("compile error: {err}");
            return;
        }
    };
    *last_chunk = Some(Arc::clone(&chunk));

    let mut vm = Vm::new(Arc::clone(heap));
    match vm.execute_chunk(chunk, module_env, None) {
        Ok(value) => println!("{}", display_value(&value)),
        Err(err) => println!("runtime error: {err}"),
    }
}
