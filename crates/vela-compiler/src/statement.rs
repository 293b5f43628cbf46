// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Statement compiling: declarations, assignment, and control flow
//! (spec.md §4.6).

#[cfg(test)]
#[path = "statement_test.rs"]
mod statement_test;

use vela_ast::ast::{AssignOp, Stmt};
use vela_bytecode::op;

use crate::compiler::FunctionCompiler;
use crate::error::CompileError;

/// Every `Stmt` variant carries its own source line.
pub(crate) fn stmt_line(stmt: &Stmt) -> u32 {
    match stmt {
        Stmt::Expr(e) => e.line(),
        Stmt::Block(stmts) => stmts.last().map_or(0, stmt_line),
        Stmt::VarDecl { line, .. }
        | Stmt::Assign { line, .. }
        | Stmt::IndexAssign { line, .. }
        | Stmt::PropertyAssign { line, .. }
        | Stmt::If { line, .. }
        | Stmt::While { line, .. }
        | Stmt::For { line, .. }
        | Stmt::Foreach { line, .. }
        | Stmt::FunctionDecl { line, .. }
        | Stmt::Return { line, .. }
        | Stmt::StructDecl { line, .. }
        | Stmt::Import { line, .. } => *line,
    }
}

impl FunctionCompiler<'_, '_> {
    pub(crate) fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expr(expr) => {
                let mark = self.next_reg;
                let reg = self.reserve_register(expr.line())?;
                self.compile_expr(expr, reg)?;
                self.next_reg = mark;
                Ok(())
            }
            Stmt::Block(stmts) => {
                self.begin_scope();
                for s in stmts {
                    self.compile_stmt(s)?;
                }
                self.end_scope();
                Ok(())
            }
            Stmt::VarDecl { name, init, line } => self.compile_var_decl(name, init.as_ref(), *line),
            Stmt::Assign { name, op: aop, value, line } => self.compile_assign(name, *aop, value, *line),
            Stmt::IndexAssign { target, index, value, line } => {
                self.compile_index_assign(target, index, value, *line)
            }
            Stmt::PropertyAssign { object, name, value, line } => {
                self.compile_property_assign(object, name, value, *line)
            }
            Stmt::If { cond, then_branch, else_branch, line } => {
                self.compile_if(cond, then_branch, else_branch.as_deref(), *line)
            }
            Stmt::While { cond, body, line } => self.compile_while(cond, body, *line),
            Stmt::For { init, cond, increment, body, line } => {
                self.compile_for(init.as_deref(), cond.as_ref(), increment.as_deref(), body, *line)
            }
            Stmt::Foreach { iterator, collection, body, line } => {
                self.compile_foreach(iterator, collection, body, *line)
            }
            Stmt::FunctionDecl { name, params, body, is_async, line } => {
                crate::declare::compile_function_decl(self, name, params, body, *is_async, *line)
            }
            Stmt::Return { value, line } => self.compile_return(value.as_ref(), *line),
            Stmt::StructDecl { name, fields, line } => crate::declare::compile_struct_decl(self, name, fields, *line),
            Stmt::Import { path, alias, line } => self.compile_import(path, alias, *line),
        }
    }

    fn compile_var_decl(
        &mut self,
        name: &str,
        init: Option<&vela_ast::ast::Expr>,
        line: u32,
    ) -> Result<(), CompileError> {
        if self.declares_global() {
            let mark = self.next_reg;
            let reg = self.reserve_register(line)?;
            match init {
                Some(expr) => self.compile_expr(expr, reg)?,
                None => {
                    self.emit_abc(op::LOADNIL, reg, 0, 0, line);
                }
            }
            let idx = self.name_constant(name, line)?;
            self.emit_abx(op::DEFGLOBAL, reg, idx, line)?;
            self.next_reg = mark;
        } else {
            let reg = self.declare_local(name, line)?;
            match init {
                Some(expr) => self.compile_expr(expr, reg)?,
                None => {
                    self.emit_abc(op::LOADNIL, reg, 0, 0, line);
                }
            }
        }
        Ok(())
    }

    fn compile_assign(
        &mut self,
        name: &str,
        aop: AssignOp,
        value: &vela_ast::ast::Expr,
        line: u32,
    ) -> Result<(), CompileError> {
        if let Some(reg) = self.resolve_local(name) {
            match aop {
                AssignOp::Set => self.compile_expr(value, reg)?,
                _ => {
                    let mark = self.next_reg;
                    let vreg = self.reserve_register(line)?;
                    self.compile_expr(value, vreg)?;
                    self.emit_abc(assign_opcode(aop, line)?, reg, reg, vreg, line);
                    self.next_reg = mark;
                }
            }
            return Ok(());
        }

        let name_idx = self.name_constant(name, line)?;
        let mark = self.next_reg;
        let vreg = self.reserve_register(line)?;
        match aop {
            AssignOp::Set => self.compile_expr(value, vreg)?,
            _ => {
                self.emit_abx(op::GETGLOBAL, vreg, name_idx, line)?;
                let rhs = self.reserve_register(line)?;
                self.compile_expr(value, rhs)?;
                self.emit_abc(assign_opcode(aop, line)?, vreg, vreg, rhs, line);
            }
        }
        self.emit_abx(op::SETGLOBAL, vreg, name_idx, line)?;
        self.next_reg = mark;
        Ok(())
    }

    fn compile_index_assign(
        &mut self,
        target: &vela_ast::ast::Expr,
        index: &vela_ast::ast::Expr,
        value: &vela_ast::ast::Expr,
        line: u32,
    ) -> Result<(), CompileError> {
        let mark = self.next_reg;
        let treg = self.reserve_register(line)?;
        self.compile_expr(target, treg)?;
        let ireg = self.reserve_register(line)?;
        self.compile_expr(index, ireg)?;
        let vreg = self.reserve_register(line)?;
        self.compile_expr(value, vreg)?;
        // "SETIDX Ra,Rb,Rc (target in Ra)": unlike GETIDX, A holds the
        // array being mutated, not a destination.
        self.emit_abc(op::SETIDX, treg, ireg, vreg, line);
        self.next_reg = mark;
        Ok(())
    }

    fn compile_property_assign(
        &mut self,
        object: &vela_ast::ast::Expr,
        name: &str,
        value: &vela_ast::ast::Expr,
        line: u32,
    ) -> Result<(), CompileError> {
        let mark = self.next_reg;
        let oreg = self.reserve_register(line)?;
        self.compile_expr(object, oreg)?;
        let kidx = self.property_name_constant(name, line)?;
        let vreg = self.reserve_register(line)?;
        self.compile_expr(value, vreg)?;
        self.emit_abc(op::SETPROP, oreg, kidx, vreg, line);
        self.next_reg = mark;
        Ok(())
    }

    fn compile_if(
        &mut self,
        cond: &vela_ast::ast::Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
        line: u32,
    ) -> Result<(), CompileError> {
        let mark = self.next_reg;
        let creg = self.reserve_register(line)?;
        self.compile_expr(cond, creg)?;
        self.next_reg = mark;

        let else_jump = self.emit_jump(op::JMPF, creg, line);
        self.compile_stmt(then_branch)?;
        match else_branch {
            Some(else_stmt) => {
                let end_jump = self.emit_jmp(line);
                self.patch_jump(else_jump, line)?;
                self.compile_stmt(else_stmt)?;
                self.patch_jmp(end_jump, line)
            }
            None => self.patch_jump(else_jump, line),
        }
    }

    fn compile_while(&mut self, cond: &vela_ast::ast::Expr, body: &Stmt, line: u32) -> Result<(), CompileError> {
        let loop_start = self.chunk.code.len();
        let mark = self.next_reg;
        let creg = self.reserve_register(line)?;
        self.compile_expr(cond, creg)?;
        self.next_reg = mark;

        let exit_jump = self.emit_jump(op::JMPF, creg, line);
        self.compile_stmt(body)?;
        self.emit_loop(loop_start, line)?;
        self.patch_jump(exit_jump, line)
    }

    fn compile_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&vela_ast::ast::Expr>,
        increment: Option<&Stmt>,
        body: &Stmt,
        line: u32,
    ) -> Result<(), CompileError> {
        self.begin_scope();
        if let Some(init_stmt) = init {
            self.compile_stmt(init_stmt)?;
        }

        let loop_start = self.chunk.code.len();
        let exit_jump = match cond {
            Some(cond_expr) => {
                let mark = self.next_reg;
                let creg = self.reserve_register(line)?;
                self.compile_expr(cond_expr, creg)?;
                self.next_reg = mark;
                Some(self.emit_jump(op::JMPF, creg, line))
            }
            None => None,
        };

        self.compile_stmt(body)?;
        if let Some(inc) = increment {
            self.compile_stmt(inc)?;
        }
        self.emit_loop(loop_start, line)?;
        if let Some(idx) = exit_jump {
            self.patch_jump(idx, line)?;
        }
        self.end_scope();
        Ok(())
    }

    /// `foreach x in collection { body }`: hidden `.col`/`.idx` locals
    /// drive indexing; the loop variable is declared in its own nested
    /// scope so it reads as a fresh binding per iteration even though
    /// it reuses the same register every time through (spec.md §4.6).
    fn compile_foreach(
        &mut self,
        iterator: &str,
        collection: &vela_ast::ast::Expr,
        body: &Stmt,
        line: u32,
    ) -> Result<(), CompileError> {
        self.begin_scope();
        let col_reg = self.declare_local(".col", line)?;
        self.compile_expr(collection, col_reg)?;
        let idx_reg = self.declare_local(".idx", line)?;
        self.chunk.emit(vela_bytecode::encode_asbx(op::LOADI, idx_reg, 0), line);
        let len_reg = self.declare_local(".len", line)?;
        self.emit_abc(op::LEN, len_reg, col_reg, 0, line);

        let loop_start = self.chunk.code.len();
        let mark = self.next_reg;
        let cond_reg = self.reserve_register(line)?;
        self.emit_abc(op::LT, cond_reg, idx_reg, len_reg, line);
        self.next_reg = mark;
        let exit_jump = self.emit_jump(op::JMPF, cond_reg, line);

        self.begin_scope();
        let item_reg = self.declare_local(iterator, line)?;
        self.emit_abc(op::GETIDX, item_reg, col_reg, idx_reg, line);
        self.compile_stmt(body)?;
        self.end_scope();

        let mark2 = self.next_reg;
        let one_reg = self.reserve_register(line)?;
        self.chunk.emit(vela_bytecode::encode_asbx(op::LOADI, one_reg, 1), line);
        self.emit_abc(op::ADD, idx_reg, idx_reg, one_reg, line);
        self.next_reg = mark2;

        self.emit_loop(loop_start, line)?;
        self.patch_jump(exit_jump, line)?;
        self.end_scope();
        Ok(())
    }

    fn compile_return(&mut self, value: Option<&vela_ast::ast::Expr>, line: u32) -> Result<(), CompileError> {
        match value {
            Some(expr) => {
                let mark = self.next_reg;
                let reg = self.reserve_register(line)?;
                self.compile_expr(expr, reg)?;
                self.emit_abc(op::RETURN, reg, 0, 0, line);
                self.next_reg = mark;
            }
            None => {
                self.emit_abc(op::RETURNNIL, 0, 0, 0, line);
            }
        }
        Ok(())
    }

    fn compile_import(&mut self, path: &str, alias: &str, line: u32) -> Result<(), CompileError> {
        let path_idx = self.name_constant(path, line)?;
        if self.declares_global() {
            let mark = self.next_reg;
            let reg = self.reserve_register(line)?;
            self.emit_abx(op::IMPORT, reg, path_idx, line)?;
            let name_idx = self.name_constant(alias, line)?;
            self.emit_abx(op::DEFGLOBAL, reg, name_idx, line)?;
            self.next_reg = mark;
        } else {
            let reg = self.declare_local(alias, line)?;
            self.emit_abx(op::IMPORT, reg, path_idx, line)?;
        }
        Ok(())
    }
}

fn assign_opcode(aop: AssignOp, line: u32) -> Result<u8, CompileError> {
    Ok(match aop {
        AssignOp::AddSet => op::ADD,
        AssignOp::SubSet => op::SUB,
        AssignOp::MulSet => op::MUL,
        AssignOp::DivSet => op::DIV,
        AssignOp::Set => {
            return Err(CompileError::UndefinedOperator { op: "=", context: "assign_opcode", line })
        }
    })
}
