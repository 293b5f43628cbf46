// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Recursive-descent parser producing the AST node shapes in [`crate::ast`].
//!
//! Grounded on the expression-precedence structure of
//! `lona-vm/src/reader/parser.rs`, rewritten for infix C-like syntax
//! instead of Lonala's s-expressions.

#[cfg(test)]
#[path = "parser_test.rs"]
mod parser_test;

use crate::ast::*;
use crate::lexer::{LexError, Spanned, Token};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("line {line}: expected {expected}, found {found:?}")]
    Expected {
        line: u32,
        expected: &'static str,
        found: Token,
    },
    #[error("line {line}: unexpected end of input")]
    UnexpectedEof { line: u32 },
}

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    #[must_use]
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while !self.check(&Token::Eof) {
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    // --- token stream helpers ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn check(&self, t: &Token) -> bool {
        self.peek() == t
    }

    fn advance(&mut self) -> Spanned {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, t: &Token, what: &'static str) -> Result<Spanned, ParseError> {
        if self.check(t) {
            Ok(self.advance())
        } else {
            Err(ParseError::Expected {
                line: self.line(),
                expected: what,
                found: self.peek().clone(),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<(String, u32), ParseError> {
        let line = self.line();
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok((name, line))
            }
            found => Err(ParseError::Expected {
                line,
                expected: "identifier",
                found,
            }),
        }
    }

    fn match_tok(&mut self, t: &Token) -> bool {
        if self.check(t) {
            self.advance();
            true
        } else {
            false
        }
    }

    // --- statements ---

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        match self.peek().clone() {
            Token::LBrace => Ok(Stmt::Block(self.block()?)),
            Token::Var => self.var_decl(),
            Token::If => self.if_stmt(),
            Token::While => self.while_stmt(),
            Token::For => self.for_stmt(),
            Token::Foreach => self.foreach_stmt(),
            Token::Function => self.function_decl(false),
            Token::Async => {
                self.advance();
                self.expect(&Token::Function, "'function' after 'async'")?;
                self.function_decl_inner(true, line)
            }
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(&Token::Semicolon, "';' after return value")?;
                Ok(Stmt::Return { value, line })
            }
            Token::Struct => self.struct_decl(),
            Token::Import => self.import_stmt(),
            _ => self.expr_or_assign_stmt(),
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            stmts.push(self.statement()?);
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn var_decl(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let (name, _) = self.expect_ident()?;
        let init = if self.match_tok(&Token::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(&Token::Semicolon, "';' after variable declaration")?;
        Ok(Stmt::VarDecl { name, init, line })
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(&Token::LParen, "'(' after if")?;
        let cond = self.expression()?;
        self.expect(&Token::RParen, "')' after if condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_tok(&Token::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If { cond, then_branch, else_branch, line })
    }

    fn while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(&Token::LParen, "'(' after while")?;
        let cond = self.expression()?;
        self.expect(&Token::RParen, "')' after while condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { cond, body, line })
    }

    fn for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(&Token::LParen, "'(' after for")?;
        let init = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(Box::new(if self.check(&Token::Var) {
                self.var_decl()?
            } else {
                self.expr_or_assign_stmt()?
            }))
        };
        if init.is_none() {
            self.expect(&Token::Semicolon, "';' after for-init")?;
        }
        let cond = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Token::Semicolon, "';' after for-condition")?;
        let increment = if self.check(&Token::RParen) {
            None
        } else {
            Some(Box::new(self.assign_stmt_no_semicolon()?))
        };
        self.expect(&Token::RParen, "')' after for-clauses")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For { init, cond, increment, body, line })
    }

    fn foreach_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(&Token::LParen, "'(' after foreach")?;
        let (iterator, _) = self.expect_ident()?;
        self.expect(&Token::In, "'in' in foreach")?;
        let collection = self.expression()?;
        self.expect(&Token::RParen, "')' after foreach clause")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::Foreach { iterator, collection, body, line })
    }

    fn function_decl(&mut self, is_async: bool) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.function_decl_inner(is_async, line)
    }

    fn function_decl_inner(&mut self, is_async: bool, line: u32) -> Result<Stmt, ParseError> {
        self.advance(); // consume `function`
        let (name, _) = self.expect_ident()?;
        self.expect(&Token::LParen, "'(' after function name")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let (p, _) = self.expect_ident()?;
                params.push(p);
                if !self.match_tok(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')' after parameters")?;
        let body = self.block()?;
        Ok(Stmt::FunctionDecl { name, params, body, is_async, line })
    }

    fn struct_decl(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let (name, _) = self.expect_ident()?;
        self.expect(&Token::LBrace, "'{' after struct name")?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) {
            let (f, _) = self.expect_ident()?;
            fields.push(f);
            self.expect(&Token::Semicolon, "';' after field name")?;
        }
        self.expect(&Token::RBrace, "'}' after struct fields")?;
        Ok(Stmt::StructDecl { name, fields, line })
    }

    fn import_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let path_line = self.line();
        let path = match self.peek().clone() {
            Token::Str(s) => {
                self.advance();
                s
            }
            Token::Ident(s) => {
                self.advance();
                s
            }
            found => {
                return Err(ParseError::Expected {
                    line: path_line,
                    expected: "module path",
                    found,
                });
            }
        };
        let alias = if self.match_tok(&Token::As) {
            self.expect_ident()?.0
        } else {
            default_alias(&path)
        };
        self.expect(&Token::Semicolon, "';' after import")?;
        Ok(Stmt::Import { path, alias, line })
    }

    /// An expression statement, or one of the assignment forms
    /// (`name = expr`, `name op= expr`, `target[idx] = expr`,
    /// `obj.field = expr`), each terminated by `;`.
    fn expr_or_assign_stmt(&mut self) -> Result<Stmt, ParseError> {
        let stmt = self.assign_stmt_no_semicolon()?;
        self.expect(&Token::Semicolon, "';' after statement")?;
        Ok(stmt)
    }

    fn assign_stmt_no_semicolon(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let expr = self.expression()?;
        let op = match self.peek() {
            Token::Eq => Some(AssignOp::Set),
            Token::PlusEq => Some(AssignOp::AddSet),
            Token::MinusEq => Some(AssignOp::SubSet),
            Token::StarEq => Some(AssignOp::MulSet),
            Token::SlashEq => Some(AssignOp::DivSet),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(Stmt::Expr(expr));
        };
        self.advance();
        let value = self.expression()?;
        match expr {
            Expr::Var { name, .. } => Ok(Stmt::Assign { name, op, value, line }),
            Expr::Index { target, index, .. } => {
                if op != AssignOp::Set {
                    return Err(ParseError::Expected {
                        line,
                        expected: "'=' (compound index assignment is not supported)",
                        found: self.peek().clone(),
                    });
                }
                Ok(Stmt::IndexAssign { target: *target, index: *index, value, line })
            }
            Expr::Property { object, field, .. } => {
                if op != AssignOp::Set {
                    return Err(ParseError::Expected {
                        line,
                        expected: "'=' (compound property assignment is not supported)",
                        found: self.peek().clone(),
                    });
                }
                Ok(Stmt::PropertyAssign { object: *object, name: field, value, line })
            }
            _ => Err(ParseError::Expected {
                line,
                expected: "assignable expression",
                found: self.peek().clone(),
            }),
        }
    }

    // --- expressions (precedence climbing) ---

    pub fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.check(&Token::OrOr) {
            let line = self.line();
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Binary { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right), line };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality_expr()?;
        while self.check(&Token::AndAnd) {
            let line = self.line();
            self.advance();
            let right = self.equality_expr()?;
            left = Expr::Binary { op: BinaryOp::And, left: Box::new(left), right: Box::new(right), line };
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.comparison_expr()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::BangEq => BinaryOp::Ne,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.comparison_expr()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), line };
        }
        Ok(left)
    }

    fn comparison_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::Ge,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.additive_expr()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), line };
        }
        Ok(left)
    }

    fn additive_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.multiplicative_expr()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), line };
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.unary_expr()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), line };
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(Expr::Unary { op: UnaryOp::Neg, operand: Box::new(self.unary_expr()?), line })
            }
            Token::Bang => {
                self.advance();
                Ok(Expr::Unary { op: UnaryOp::Not, operand: Box::new(self.unary_expr()?), line })
            }
            Token::Await => {
                self.advance();
                Ok(Expr::Await { operand: Box::new(self.unary_expr()?), line })
            }
            _ => self.postfix_expr(),
        }
    }

    fn postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary_expr()?;
        loop {
            let line = self.line();
            match self.peek() {
                Token::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&Token::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.match_tok(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen, "')' after call arguments")?;
                    expr = Expr::Call { callee: Box::new(expr), args, line };
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(&Token::RBracket, "']' after index")?;
                    expr = Expr::Index { target: Box::new(expr), index: Box::new(index), line };
                }
                Token::Dot => {
                    self.advance();
                    let (field, _) = self.expect_ident()?;
                    expr = Expr::Property { object: Box::new(expr), field, line };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary_expr(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.peek().clone() {
            Token::Int(n) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Int(n), line })
            }
            Token::Float(f) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Float(f), line })
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Str(s), line })
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal { value: Literal::True, line })
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal { value: Literal::False, line })
            }
            Token::Nil => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Nil, line })
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Var { name, line })
            }
            Token::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&Token::RParen, "')' after expression")?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&Token::RBracket) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.match_tok(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBracket, "']' after array literal")?;
                Ok(Expr::ArrayLit { elements, line })
            }
            Token::Eof => Err(ParseError::UnexpectedEof { line }),
            found => Err(ParseError::Expected { line, expected: "expression", found }),
        }
    }
}

fn default_alias(path: &str) -> String {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.strip_suffix(".vl").unwrap_or(base).to_string()
}
