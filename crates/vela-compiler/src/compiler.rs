// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Register allocator and expression compiler (spec.md §4.6).
//!
//! Locals occupy fixed, low-numbered registers; temporaries are
//! allocated above the current high-water mark and freed back to a
//! saved mark once an expression has consumed them. R0 is reserved for
//! the function object itself and is never handed out by
//! [`FunctionCompiler::reserve_register`].

#[cfg(test)]
#[path = "compiler_test.rs"]
mod compiler_test;

use rustc_hash::FxHashSet;
use std::sync::Arc;
use vela_ast::ast::{BinaryOp, Expr, Literal, UnaryOp};
use vela_bytecode::{encode_abc, encode_abx, encode_asbx, encode_sbx24, op, LOADI_MAX, LOADI_MIN};
use vela_core::{Chunk, ObjectRef, Value};
use vela_heap::Heap;

use crate::error::CompileError;

/// Register reserved for the function object itself (spec.md §4.6:
/// "R0 reserves the function object itself").
pub(crate) const FUNCTION_REG: u8 = 0;
/// First register available to locals and temporaries.
pub(crate) const FIRST_FREE_REG: u16 = 1;
/// One past the highest addressable register (an 8-bit operand field).
pub(crate) const REG_LIMIT: u16 = 256;

/// Read-only state shared by every function compiled within one module
/// (spec.md §4.4: a Function "holds a non-owning back-reference to
/// their defining Environment").
pub struct ModuleCompiler<'h> {
    pub(crate) heap: &'h Heap,
    pub(crate) module_env: ObjectRef,
    pub(crate) module_path: Option<Box<str>>,
    /// Top-level function names declared `async`, collected by a
    /// forward pass so a call site can tell at compile time whether
    /// `CALL` or `ASYNC` is the right opcode (spec.md §4.8 scenario:
    /// `async function g(){...}; print(await g());`).
    pub(crate) async_functions: FxHashSet<Box<str>>,
}

impl<'h> ModuleCompiler<'h> {
    #[must_use]
    pub fn new(heap: &'h Heap, module_env: ObjectRef, module_path: Option<&str>) -> Self {
        Self {
            heap,
            module_env,
            module_path: module_path.map(Box::from),
            async_functions: FxHashSet::default(),
        }
    }

    pub(crate) fn collect_async_functions(&mut self, program: &[vela_ast::ast::Stmt]) {
        use vela_ast::ast::Stmt;
        for stmt in program {
            if let Stmt::FunctionDecl { name, is_async: true, .. } = stmt {
                self.async_functions.insert(name.as_str().into());
            }
        }
    }
}

/// A resolved local variable: name, its fixed register, and the scope
/// depth it was declared at.
pub(crate) struct Local {
    pub(crate) name: Box<str>,
    pub(crate) reg: u8,
    pub(crate) depth: u32,
}

/// Per-function compiler state. A fresh instance is built for every
/// function body (including the module's own top-level body); nothing
/// is shared between them except the read-only [`ModuleCompiler`],
/// since closures over enclosing locals are not part of this language
/// (spec.md §1 Non-goals).
pub struct FunctionCompiler<'m, 'h> {
    pub(crate) module: &'m ModuleCompiler<'h>,
    pub(crate) chunk: Chunk,
    pub(crate) locals: Vec<Local>,
    pub(crate) scope_depth: u32,
    pub(crate) next_reg: u16,
    /// `true` only for the module's own top-level body: `var` and
    /// `function`/`struct` declarations made directly in it (not
    /// inside a nested block) become globals instead of locals
    /// (spec.md §1: "only module-scope / top-level capture is
    /// required").
    pub(crate) top_level: bool,
}

impl<'m, 'h> FunctionCompiler<'m, 'h> {
    pub(crate) fn new(module: &'m ModuleCompiler<'h>, top_level: bool) -> Self {
        let mut chunk = Chunk::new();
        chunk.max_regs = FIRST_FREE_REG;
        Self { module, chunk, locals: Vec::new(), scope_depth: 0, next_reg: FIRST_FREE_REG, top_level }
    }

    /// A declaration is global when it sits directly in the top-level
    /// body, outside of any nested block.
    pub(crate) fn declares_global(&self) -> bool {
        self.top_level && self.scope_depth == 0
    }

    pub(crate) fn reserve_register(&mut self, line: u32) -> Result<u8, CompileError> {
        if self.next_reg >= REG_LIMIT {
            return Err(CompileError::TooManyRegisters { line });
        }
        let reg = self.next_reg as u8;
        self.next_reg += 1;
        self.chunk.max_regs = self.chunk.max_regs.max(self.next_reg);
        Ok(reg)
    }

    pub(crate) fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    pub(crate) fn end_scope(&mut self) {
        self.scope_depth -= 1;
        while matches!(self.locals.last(), Some(l) if l.depth > self.scope_depth) {
            self.locals.pop();
        }
        self.next_reg = self.locals.last().map_or(FIRST_FREE_REG, |l| u16::from(l.reg) + 1);
    }

    pub(crate) fn declare_local(&mut self, name: &str, line: u32) -> Result<u8, CompileError> {
        if self.locals.len() >= REG_LIMIT as usize {
            return Err(CompileError::TooManyLocals { line });
        }
        let reg = self.reserve_register(line)?;
        self.locals.push(Local { name: name.into(), reg, depth: self.scope_depth });
        Ok(reg)
    }

    pub(crate) fn resolve_local(&self, name: &str) -> Option<u8> {
        self.locals.iter().rev().find(|l| l.name.as_ref() == name).map(|l| l.reg)
    }

    pub(crate) fn emit_abc(&mut self, opcode: u8, a: u8, b: u8, c: u8, line: u32) -> usize {
        self.chunk.emit(encode_abc(opcode, a, b, c), line)
    }

    pub(crate) fn emit_abx(&mut self, opcode: u8, a: u8, bx: u32, line: u32) -> Result<usize, CompileError> {
        let bx: u16 = bx.try_into().map_err(|_| CompileError::ConstantPoolFull { line })?;
        Ok(self.chunk.emit(encode_abx(opcode, a, bx), line))
    }

    /// Add `value` to the constant pool. Returns the index.
    pub(crate) fn add_constant(&mut self, value: Value, line: u32) -> Result<u32, CompileError> {
        self.chunk.add_constant(value).ok_or(CompileError::ConstantPoolFull { line })
    }

    /// Intern `name` and add it to the constant pool.
    pub(crate) fn name_constant(&mut self, name: &str, line: u32) -> Result<u32, CompileError> {
        let obj = self
            .module
            .heap
            .alloc_string(name.as_bytes())
            .map_err(|source| CompileError::Heap { source, line })?;
        self.add_constant(Value::Object(obj), line)
    }

    /// Emit a forward jump with a placeholder offset, returning the
    /// index to patch once the target is known.
    pub(crate) fn emit_jump(&mut self, opcode: u8, a: u8, line: u32) -> usize {
        self.chunk.emit(encode_asbx(opcode, a, 0), line)
    }

    /// Patch a previously emitted `emit_jump` to land at the chunk's
    /// current end.
    pub(crate) fn patch_jump(&mut self, index: usize, line: u32) -> Result<(), CompileError> {
        let opcode = (self.chunk.code[index] >> 24) as u8;
        let a = (self.chunk.code[index] >> 16) as u8;
        let offset = self.chunk.code.len() as i64 - (index as i64 + 1);
        let offset: i16 = offset.try_into().map_err(|_| CompileError::TooManyRegisters { line })?;
        self.chunk.patch(index, encode_asbx(opcode, a, offset));
        Ok(())
    }

    /// Emit an unconditional backward branch to `target` (a `LOOP`).
    pub(crate) fn emit_loop(&mut self, target: usize, line: u32) -> Result<(), CompileError> {
        let offset = target as i64 - (self.chunk.code.len() as i64 + 1);
        let offset: i32 = offset.try_into().map_err(|_| CompileError::TooManyRegisters { line })?;
        self.chunk.emit(encode_sbx24(op::LOOP, offset), line);
        Ok(())
    }

    /// Emit an unconditional forward `JMP` with a placeholder offset,
    /// for skipping an `else` branch.
    pub(crate) fn emit_jmp(&mut self, line: u32) -> usize {
        self.chunk.emit(encode_sbx24(op::JMP, 0), line)
    }

    /// Patch a previously emitted `emit_jmp` to land at the chunk's
    /// current end.
    pub(crate) fn patch_jmp(&mut self, index: usize, line: u32) -> Result<(), CompileError> {
        let offset = self.chunk.code.len() as i64 - (index as i64 + 1);
        let offset: i32 = offset.try_into().map_err(|_| CompileError::TooManyRegisters { line })?;
        self.chunk.patch(index, encode_sbx24(op::JMP, offset));
        Ok(())
    }

    /// Compile `expr`, leaving its value in `dest`.
    pub(crate) fn compile_expr(&mut self, expr: &Expr, dest: u8) -> Result<(), CompileError> {
        match expr {
            Expr::Literal { value, line } => self.compile_literal(value, dest, *line),
            Expr::Var { name, line } => self.compile_var(name, dest, *line),
            Expr::Unary { op: uop, operand, line } => self.compile_unary(*uop, operand, dest, *line),
            Expr::Binary { op: bop, left, right, line } => {
                self.compile_binary(*bop, left, right, dest, *line)
            }
            Expr::ArrayLit { elements, line } => self.compile_array_lit(elements, dest, *line),
            Expr::Index { target, index, line } => self.compile_index(target, index, dest, *line),
            Expr::Property { object, field, line } => self.compile_property(object, field, dest, *line),
            Expr::Call { callee, args, line } => self.compile_call(callee, args, dest, *line),
            Expr::Await { operand, line } => self.compile_await(operand, dest, *line),
        }
    }

    fn compile_literal(&mut self, lit: &Literal, dest: u8, line: u32) -> Result<(), CompileError> {
        match lit {
            Literal::Nil => {
                self.emit_abc(op::LOADNIL, dest, 0, 0, line);
            }
            Literal::True => {
                self.emit_abc(op::LOADTRUE, dest, 0, 0, line);
            }
            Literal::False => {
                self.emit_abc(op::LOADFALSE, dest, 0, 0, line);
            }
            Literal::Int(n) => self.compile_int(*n, dest, line)?,
            Literal::Float(f) => {
                let idx = self.add_constant(Value::Float(*f), line)?;
                self.emit_abx(op::LOADK, dest, idx, line)?;
            }
            Literal::Str(s) => {
                let obj = self
                    .module
                    .heap
                    .alloc_string(s.as_bytes())
                    .map_err(|source| CompileError::Heap { source, line })?;
                let idx = self.add_constant(Value::Object(obj), line)?;
                self.emit_abx(op::LOADK, dest, idx, line)?;
            }
        }
        Ok(())
    }

    /// Integers fitting in `LOADI`'s signed 16-bit immediate skip the
    /// constant pool entirely (spec.md §4.6).
    fn compile_int(&mut self, n: i64, dest: u8, line: u32) -> Result<(), CompileError> {
        if (LOADI_MIN..=LOADI_MAX).contains(&n) {
            self.chunk.emit(encode_asbx(op::LOADI, dest, n as i16), line);
        } else {
            let idx = self.add_constant(Value::Int(n), line)?;
            self.emit_abx(op::LOADK, dest, idx, line)?;
        }
        Ok(())
    }

    fn compile_var(&mut self, name: &str, dest: u8, line: u32) -> Result<(), CompileError> {
        if let Some(reg) = self.resolve_local(name) {
            if reg != dest {
                self.emit_abc(op::MOVE, dest, reg, 0, line);
            }
        } else {
            let idx = self.name_constant(name, line)?;
            self.emit_abx(op::GETGLOBAL, dest, idx, line)?;
        }
        Ok(())
    }

    fn compile_unary(&mut self, uop: UnaryOp, operand: &Expr, dest: u8, line: u32) -> Result<(), CompileError> {
        let mark = self.next_reg;
        let src = self.reserve_register(line)?;
        self.compile_expr(operand, src)?;
        let opcode = match uop {
            UnaryOp::Neg => op::NEG,
            UnaryOp::Not => op::NOT,
        };
        self.emit_abc(opcode, dest, src, 0, line);
        self.next_reg = mark;
        Ok(())
    }

    fn compile_binary(
        &mut self,
        bop: BinaryOp,
        left: &Expr,
        right: &Expr,
        dest: u8,
        line: u32,
    ) -> Result<(), CompileError> {
        match bop {
            BinaryOp::And => self.compile_short_circuit(op::JMPF, left, right, dest, line),
            BinaryOp::Or => self.compile_short_circuit(op::JMPT, left, right, dest, line),
            _ => {
                let mark = self.next_reg;
                let lreg = self.reserve_register(line)?;
                self.compile_expr(left, lreg)?;
                let rreg = self.reserve_register(line)?;
                self.compile_expr(right, rreg)?;
                let opcode = binop_opcode(bop, line)?;
                self.emit_abc(opcode, dest, lreg, rreg, line);
                self.next_reg = mark;
                Ok(())
            }
        }
    }

    /// `&&`/`||` evaluate the left operand into `dest`; if that already
    /// decides the result (false for `&&`, true for `||`) the right
    /// side is skipped (spec.md §4 Open Question: short-circuit).
    fn compile_short_circuit(
        &mut self,
        branch_op: u8,
        left: &Expr,
        right: &Expr,
        dest: u8,
        line: u32,
    ) -> Result<(), CompileError> {
        self.compile_expr(left, dest)?;
        let skip = self.emit_jump(branch_op, dest, line);
        self.compile_expr(right, dest)?;
        self.patch_jump(skip, line)
    }

    fn compile_array_lit(&mut self, elements: &[Expr], dest: u8, line: u32) -> Result<(), CompileError> {
        self.emit_abc(op::NEWARRAY, dest, 0, 0, line);
        let mark = self.next_reg;
        let item_reg = self.reserve_register(line)?;
        for element in elements {
            self.compile_expr(element, item_reg)?;
            self.emit_abc(op::PUSH, dest, item_reg, 0, line);
        }
        self.next_reg = mark;
        Ok(())
    }

    fn compile_index(&mut self, target: &Expr, index: &Expr, dest: u8, line: u32) -> Result<(), CompileError> {
        let mark = self.next_reg;
        let treg = self.reserve_register(line)?;
        self.compile_expr(target, treg)?;
        let ireg = self.reserve_register(line)?;
        self.compile_expr(index, ireg)?;
        self.emit_abc(op::GETIDX, dest, treg, ireg, line);
        self.next_reg = mark;
        Ok(())
    }

    fn compile_property(&mut self, object: &Expr, field: &str, dest: u8, line: u32) -> Result<(), CompileError> {
        let mark = self.next_reg;
        let oreg = self.reserve_register(line)?;
        self.compile_expr(object, oreg)?;
        let kidx = self.property_name_constant(field, line)?;
        self.emit_abc(op::GETPROP, dest, oreg, kidx, line);
        self.next_reg = mark;
        Ok(())
    }

    /// `GETPROP`/`SETPROP` address their field-name constant through an
    /// 8-bit `C`/`B` field respectively, unlike the 16-bit `Bx` used for
    /// globals — so this index must fit a `u8`.
    pub(crate) fn property_name_constant(&mut self, name: &str, line: u32) -> Result<u8, CompileError> {
        let idx = self.name_constant(name, line)?;
        u8::try_from(idx).map_err(|_| CompileError::ConstantPoolFull { line })
    }

    fn compile_call(&mut self, callee: &Expr, args: &[Expr], dest: u8, line: u32) -> Result<(), CompileError> {
        if let Expr::Var { name, .. } = callee {
            if name.as_str() == "print" && args.len() == 1 {
                return self.compile_print(&args[0], dest, line);
            }
        }

        let is_async = matches!(callee, Expr::Var { name, .. } if self.module.async_functions.contains(name.as_str()));

        let mark = self.next_reg;
        let func_reg = self.reserve_register(line)?;
        self.compile_expr(callee, func_reg)?;
        for arg in args {
            let arg_reg = self.reserve_register(line)?;
            self.compile_expr(arg, arg_reg)?;
        }
        let argc: u8 = args.len().try_into().map_err(|_| CompileError::TooManyRegisters { line })?;

        if is_async {
            // `ASYNC Ra,Rb,C`: unlike `CALL`, the destination (the
            // resulting Future) and the callee register are distinct
            // fields, so no extra MOVE is needed regardless of `dest`.
            self.emit_abc(op::ASYNC, dest, func_reg, argc, line);
        } else {
            self.emit_abc(op::CALL, func_reg, argc, 1, line);
            if dest != func_reg {
                self.emit_abc(op::MOVE, dest, func_reg, 0, line);
            }
        }
        self.next_reg = mark;
        Ok(())
    }

    /// `print(expr)` is the one surface form that lowers to the `PRINT`
    /// opcode directly rather than a global lookup + `CALL`; spec.md's
    /// worked examples call it like an ordinary function, but it never
    /// resolves through `GETGLOBAL` and cannot be shadowed, rebound, or
    /// passed around as a value. It has no result, so `dest` gets `nil`.
    fn compile_print(&mut self, arg: &Expr, dest: u8, line: u32) -> Result<(), CompileError> {
        let mark = self.next_reg;
        let arg_reg = self.reserve_register(line)?;
        self.compile_expr(arg, arg_reg)?;
        self.emit_abc(op::PRINT, arg_reg, 0, 0, line);
        self.next_reg = mark;
        self.emit_abc(op::LOADNIL, dest, 0, 0, line);
        Ok(())
    }

    fn compile_await(&mut self, operand: &Expr, dest: u8, line: u32) -> Result<(), CompileError> {
        let mark = self.next_reg;
        let src = self.reserve_register(line)?;
        self.compile_expr(operand, src)?;
        self.emit_abc(op::AWAIT, dest, src, 0, line);
        self.next_reg = mark;
        Ok(())
    }
}

fn binop_opcode(bop: BinaryOp, line: u32) -> Result<u8, CompileError> {
    Ok(match bop {
        BinaryOp::Add => op::ADD,
        BinaryOp::Sub => op::SUB,
        BinaryOp::Mul => op::MUL,
        BinaryOp::Div => op::DIV,
        BinaryOp::Mod => op::MOD,
        BinaryOp::Eq => op::EQ,
        BinaryOp::Ne => op::NE,
        BinaryOp::Lt => op::LT,
        BinaryOp::Le => op::LE,
        BinaryOp::Gt => op::GT,
        BinaryOp::Ge => op::GE,
        BinaryOp::And | BinaryOp::Or => {
            return Err(CompileError::UndefinedOperator { op: "&&/||", context: "binop_opcode", line })
        }
    })
}

/// Wrap a finished chunk in an `Arc`, matching `FunctionObj::Bytecode`'s
/// shared ownership (one compiled chunk, possibly many call frames).
pub(crate) fn finish(chunk: Chunk) -> Arc<Chunk> {
    Arc::new(chunk)
}
