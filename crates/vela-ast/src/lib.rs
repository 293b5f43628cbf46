// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! AST node shapes consumed by the Vela compiler (spec.md §6), plus a
//! lexer and recursive-descent parser producing them.
//!
//! The lexer/parser are an external collaborator per spec.md §1 — the
//! compiler only depends on the node shapes in [`ast`], never on this
//! crate's grammar choices — but are included so the workspace is
//! exercisable end to end.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{Lexer, Token};
pub use parser::{ParseError, Parser};

/// Parse a full program from source text.
pub fn parse(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}
