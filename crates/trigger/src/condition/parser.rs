// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent parser for the condition grammar.
//!
//! Precedence, loosest first: `||`, `&&`, comparison (non-associative),
//! unary `!`/`-`, primary. Primaries are parenthesized expressions,
//! literals, and dotted property paths with optional `?.` segments.

use super::lexer::tokenize;
use super::token::{LexError, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Cmp { op: CmpOp, lhs: Box<Expr>, rhs: Box<Expr> },
    /// Dotted property path rooted in the event payload.
    Path(Vec<PathSeg>),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSeg {
    pub name: String,
    /// True for `?.`-reached segments. Plain reads on a missing parent
    /// resolve to undefined anyway, so this only affects readability of
    /// the source condition, not semantics.
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected end of condition")]
    UnexpectedEnd,
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("trailing input after expression: {0}")]
    TrailingInput(String),
    #[error("chained comparisons are not supported")]
    ChainedComparison,
}

pub(super) fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ParseError::TrailingInput(tok.to_string())),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.cmp_expr()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.cmp_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.unary_expr()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CmpOp::LooseEq,
            Some(Token::EqEqEq) => CmpOp::StrictEq,
            Some(Token::NotEq) => CmpOp::LooseNe,
            Some(Token::NotEqEq) => CmpOp::StrictNe,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.unary_expr()?;
        if matches!(
            self.peek(),
            Some(
                Token::EqEq
                    | Token::EqEqEq
                    | Token::NotEq
                    | Token::NotEqEq
                    | Token::Lt
                    | Token::Le
                    | Token::Gt
                    | Token::Ge
            )
        ) {
            return Err(ParseError::ChainedComparison);
        }
        Ok(Expr::Cmp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn unary_expr(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Bang) {
            let inner = self.unary_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        if self.eat(&Token::Minus) {
            // Unary minus only applies to number literals.
            return match self.next() {
                Some(Token::Number(n)) => Ok(Expr::Literal(Literal::Num(-n))),
                Some(tok) => Err(ParseError::UnexpectedToken(tok.to_string())),
                None => Err(ParseError::UnexpectedEnd),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                if !self.eat(&Token::RParen) {
                    return match self.peek() {
                        Some(tok) => Err(ParseError::UnexpectedToken(tok.to_string())),
                        None => Err(ParseError::UnexpectedEnd),
                    };
                }
                Ok(inner)
            }
            Some(Token::Number(n)) => Ok(Expr::Literal(Literal::Num(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Literal::Bool(true))),
                "false" => Ok(Expr::Literal(Literal::Bool(false))),
                "null" => Ok(Expr::Literal(Literal::Null)),
                "undefined" => Ok(Expr::Literal(Literal::Undefined)),
                _ => self.path(name),
            },
            Some(tok) => Err(ParseError::UnexpectedToken(tok.to_string())),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn path(&mut self, root: String) -> Result<Expr, ParseError> {
        let mut segs = vec![PathSeg { name: root, optional: false }];
        loop {
            let optional = match self.peek() {
                Some(Token::Dot) => false,
                Some(Token::OptDot) => true,
                _ => break,
            };
            self.pos += 1;
            match self.next() {
                Some(Token::Ident(name)) => segs.push(PathSeg { name, optional }),
                Some(tok) => return Err(ParseError::UnexpectedToken(tok.to_string())),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
        Ok(Expr::Path(segs))
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
