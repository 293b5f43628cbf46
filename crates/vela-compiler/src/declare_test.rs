// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

#![allow(clippy::unwrap_used)]

use super::*;
use vela_bytecode::{decode_a, decode_opcode};
use vela_core::ObjectKind;
use vela_heap::{GcConfig, Heap};

fn setup() -> (Heap, vela_core::ObjectRef) {
    let heap = Heap::new(GcConfig::default());
    let env = heap.alloc_environment(None, true).unwrap();
    (heap, env)
}

#[test]
fn module_body_ends_in_returnnil() {
    let (heap, env) = setup();
    let program = vela_ast::parse("var x = 1;").unwrap();
    let chunk = compile_module(&heap, env, None, &program).unwrap();
    assert_eq!(decode_opcode(*chunk.code.last().unwrap()), op::RETURNNIL);
}

#[test]
fn top_level_function_decl_defines_a_global() {
    let (heap, env) = setup();
    let program = vela_ast::parse("function add(a, b) { return a + b; }").unwrap();
    let chunk = compile_module(&heap, env, None, &program).unwrap();
    assert!(chunk.code.iter().any(|&i| decode_opcode(i) == op::DEFGLOBAL));
    assert_eq!(chunk.constants.len(), 2); // the Function constant + its name
}

#[test]
fn nested_function_decl_becomes_a_local_bound_to_a_loadk() {
    let (heap, env) = setup();
    let program = vela_ast::parse("{ function add(a, b) { return a + b; } }").unwrap();
    let chunk = compile_module(&heap, env, None, &program).unwrap();
    assert!(!chunk.code.iter().any(|&i| decode_opcode(i) == op::DEFGLOBAL));
    assert!(chunk.code.iter().any(|&i| decode_opcode(i) == op::LOADK));
}

#[test]
fn compiled_function_object_is_permanent_and_a_function_kind() {
    let (heap, env) = setup();
    let module = ModuleCompiler::new(&heap, env, None);
    let body = vec![vela_ast::ast::Stmt::Return {
        value: Some(vela_ast::ast::Expr::Literal { value: vela_ast::ast::Literal::Int(1), line: 1 }),
        line: 1,
    }];
    let func_ref = compile_function(&module, "f", &["a".to_string()], &body, 1).unwrap();
    assert_eq!(func_ref.kind(), ObjectKind::Function);
    assert!(unsafe { func_ref.header() }.permanent);
}

#[test]
fn struct_decl_emits_structdef_with_field_count() {
    let (heap, env) = setup();
    let program = vela_ast::parse("struct Point { x; y; }").unwrap();
    let chunk = compile_module(&heap, env, None, &program).unwrap();
    let structdef = chunk.code.iter().find(|&&i| decode_opcode(i) == op::STRUCTDEF).unwrap();
    assert_eq!(decode_a(*structdef), 2);
}
