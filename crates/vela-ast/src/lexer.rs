// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Lexer for Vela source code.
//!
//! Converts source text into a token stream. Grounded on the
//! `Peekable<Chars>`-driven scanner in `lona-vm/src/reader/lexer.rs`,
//! adapted from Lonala's s-expression grammar to the C-like grammar
//! spec.md §6 assumes (braces, semicolons, infix operators).

#[cfg(test)]
#[path = "lexer_test.rs"]
mod lexer_test;

use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Nil,

    // Keywords
    Var,
    Function,
    Async,
    Await,
    If,
    Else,
    While,
    For,
    Foreach,
    In,
    Return,
    Struct,
    Import,
    As,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Dot,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Eq,
    EqEq,
    BangEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: u32 },
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { line: u32, ch: char },
    #[error("line {line}: malformed number literal")]
    MalformedNumber { line: u32 },
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let eof = spanned.token == Token::Eof;
            tokens.push(spanned);
            if eof {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_trivia();
        let line = self.line;
        let Some(ch) = self.chars.next() else {
            return Ok(Spanned { token: Token::Eof, line });
        };

        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '.' => Token::Dot,
            '+' => self.choose('=', Token::PlusEq, Token::Plus),
            '-' => self.choose('=', Token::MinusEq, Token::Minus),
            '*' => self.choose('=', Token::StarEq, Token::Star),
            '/' => self.choose('=', Token::SlashEq, Token::Slash),
            '%' => Token::Percent,
            '!' => self.choose('=', Token::BangEq, Token::Bang),
            '=' => self.choose('=', Token::EqEq, Token::Eq),
            '<' => self.choose('=', Token::LtEq, Token::Lt),
            '>' => self.choose('=', Token::GtEq, Token::Gt),
            '&' => {
                if self.chars.next_if_eq(&'&').is_some() {
                    Token::AndAnd
                } else {
                    return Err(LexError::UnexpectedChar { line, ch: '&' });
                }
            }
            '|' => {
                if self.chars.next_if_eq(&'|').is_some() {
                    Token::OrOr
                } else {
                    return Err(LexError::UnexpectedChar { line, ch: '|' });
                }
            }
            '"' => self.scan_string(line)?,
            c if c.is_ascii_digit() => self.scan_number(c, line)?,
            c if is_ident_start(c) => self.scan_ident(c),
            c => return Err(LexError::UnexpectedChar { line, ch: c }),
        };
        Ok(Spanned { token, line })
    }

    fn choose(&mut self, expect: char, then: Token, otherwise: Token) -> Token {
        if self.chars.next_if_eq(&expect).is_some() {
            then
        } else {
            otherwise
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some('\n') => {
                    self.line += 1;
                    self.chars.next();
                }
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('/') => {
                    let mut clone = self.chars.clone();
                    clone.next();
                    if clone.peek() == Some(&'/') {
                        self.chars.next();
                        self.chars.next();
                        for c in self.chars.by_ref() {
                            if c == '\n' {
                                self.line += 1;
                                break;
                            }
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_string(&mut self, start_line: u32) -> Result<Token, LexError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                None => return Err(LexError::UnterminatedString { line: start_line }),
                Some('"') => return Ok(Token::Str(s)),
                Some('\\') => match self.chars.next() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('"') => s.push('"'),
                    Some('\\') => s.push('\\'),
                    Some(other) => s.push(other),
                    None => return Err(LexError::UnterminatedString { line: start_line }),
                },
                Some('\n') => {
                    self.line += 1;
                    s.push('\n');
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn scan_number(&mut self, first: char, line: u32) -> Result<Token, LexError> {
        let mut text = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.chars.peek() == Some(&'.') {
            let mut clone = self.chars.clone();
            clone.next();
            if clone.peek().is_some_and(char::is_ascii_digit) {
                is_float = true;
                text.push('.');
                self.chars.next();
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
            }
        }
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| LexError::MalformedNumber { line })
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| LexError::MalformedNumber { line })
        }
    }

    fn scan_ident(&mut self, first: char) -> Token {
        let mut text = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match text.as_str() {
            "var" => Token::Var,
            "function" => Token::Function,
            "async" => Token::Async,
            "await" => Token::Await,
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "for" => Token::For,
            "foreach" => Token::Foreach,
            "in" => Token::In,
            "return" => Token::Return,
            "struct" => Token::Struct,
            "import" => Token::Import,
            "as" => Token::As,
            "true" => Token::True,
            "false" => Token::False,
            "nil" => Token::Nil,
            _ => Token::Ident(text),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
