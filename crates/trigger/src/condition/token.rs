// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token types for the condition lexer.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier or keyword (`task`, `true`, `undefined`, ...).
    Ident(String),
    Number(f64),
    /// Single- or double-quoted string literal, unescaped.
    Str(String),
    LParen,
    RParen,
    /// `.`
    Dot,
    /// `?.`
    OptDot,
    /// `!`
    Bang,
    /// `-` (only valid before a number literal)
    Minus,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `==`
    EqEq,
    /// `===`
    EqEqEq,
    /// `!=`
    NotEq,
    /// `!==`
    NotEqEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Dot => f.write_str("."),
            Token::OptDot => f.write_str("?."),
            Token::Bang => f.write_str("!"),
            Token::Minus => f.write_str("-"),
            Token::AndAnd => f.write_str("&&"),
            Token::OrOr => f.write_str("||"),
            Token::EqEq => f.write_str("=="),
            Token::EqEqEq => f.write_str("==="),
            Token::NotEq => f.write_str("!="),
            Token::NotEqEq => f.write_str("!=="),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character {ch:?} at byte {at}")]
    UnexpectedChar { ch: char, at: usize },
    #[error("unterminated string literal starting at byte {at}")]
    UnterminatedString { at: usize },
    #[error("malformed number {text:?} at byte {at}")]
    BadNumber { text: String, at: usize },
}
