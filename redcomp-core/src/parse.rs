//! Recursive-descent parser for contract expressions
//!
//! The syntax is Lustre-flavoured. Precedence, loosest first:
//! `if`, `->`, `=>`, `or`/`xor`, `and`, `not`, relations,
//! `+`/`-`, `*`/`/`/`div`/`mod`, unary `-`/`pre`, postfix access.

use crate::ast::{BinaryOp, Expr, Quantifier, UnaryOp};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};

/// Parse a single expression, rejecting trailing input
pub fn parse_expr(source: &str) -> Result<Expr> {
    let mut parser = Parser::new(source);
    let expr = parser.parse_expr()?;
    match parser.lexer.next_token() {
        None => Ok(expr),
        Some(_) => Err(parser.error("unexpected trailing input")),
    }
}

struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.lexer.span().start,
            message: message.to_string(),
        }
    }

    fn peek(&mut self) -> Option<Token<'a>> {
        match self.lexer.peek_token() {
            Some(Ok(token)) => Some(token.clone()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Result<Token<'a>> {
        match self.lexer.next_token() {
            Some(Ok(token)) => Ok(token),
            Some(Err(())) => Err(self.error("unrecognised input")),
            None => Err(Error::UnexpectedEof(self.source.to_string())),
        }
    }

    fn expect(&mut self, expected: Token<'a>, what: &str) -> Result<()> {
        let token = self.advance()?;
        if token == expected {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn eat(&mut self, expected: &Token<'a>) -> bool {
        if self.peek().as_ref() == Some(expected) {
            self.lexer.next_token();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.advance()? {
            Token::Ident(name) => Ok(name.to_string()),
            _ => Err(self.error("expected identifier")),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        if self.eat(&Token::If) {
            let cond = self.parse_expr()?;
            self.expect(Token::Then, "'then'")?;
            let then_expr = self.parse_expr()?;
            self.expect(Token::Else, "'else'")?;
            let else_expr = self.parse_expr()?;
            return Ok(Expr::if_then_else(cond, then_expr, else_expr));
        }
        self.parse_arrow()
    }

    fn parse_arrow(&mut self) -> Result<Expr> {
        let left = self.parse_implies()?;
        if self.eat(&Token::Arrow) {
            let right = self.parse_expr()?;
            return Ok(Expr::binary(left, BinaryOp::Arrow, right));
        }
        Ok(left)
    }

    fn parse_implies(&mut self) -> Result<Expr> {
        let left = self.parse_or()?;
        if self.eat(&Token::Implies) {
            let right = self.parse_implies()?;
            return Ok(Expr::binary(left, BinaryOp::Implies, right));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        loop {
            let op = match self.peek() {
                Some(Token::Or) => BinaryOp::Or,
                Some(Token::Xor) => BinaryOp::Xor,
                _ => return Ok(left),
            };
            self.lexer.next_token();
            let right = self.parse_and()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&Token::Not) {
            return Ok(Expr::not(self.parse_not()?));
        }
        self.parse_relation()
    }

    fn parse_relation(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Equal) => BinaryOp::Equal,
            Some(Token::NotEqual) => BinaryOp::NotEqual,
            Some(Token::Greater) => BinaryOp::Greater,
            Some(Token::Less) => BinaryOp::Less,
            Some(Token::GreaterEqual) => BinaryOp::GreaterEqual,
            Some(Token::LessEqual) => BinaryOp::LessEqual,
            _ => return Ok(left),
        };
        self.lexer.next_token();
        let right = self.parse_additive()?;
        Ok(Expr::binary(left, op, right))
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Plus,
                Some(Token::Minus) => BinaryOp::Minus,
                _ => return Ok(left),
            };
            self.lexer.next_token();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Div) => BinaryOp::IntDivide,
                Some(Token::Mod) => BinaryOp::Modulus,
                _ => return Ok(left),
            };
            self.lexer.next_token();
            let right = self.parse_unary()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            return Ok(match self.parse_unary()? {
                Expr::Int(value) => Expr::Int(-value),
                operand => Expr::unary(UnaryOp::Negative, operand),
            });
        }
        if self.eat(&Token::Pre) {
            return Ok(Expr::pre(self.parse_unary()?));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.lexer.next_token();
                    let field = self.ident()?;
                    expr = Expr::RecordAccess {
                        record: Box::new(expr),
                        field,
                    };
                }
                Some(Token::LBracket) => {
                    self.lexer.next_token();
                    let index = self.parse_expr()?;
                    if self.eat(&Token::Assign) {
                        let value = self.parse_expr()?;
                        self.expect(Token::RBracket, "']'")?;
                        expr = Expr::ArrayUpdate {
                            array: Box::new(expr),
                            index: Box::new(index),
                            value: Box::new(value),
                        };
                    } else {
                        self.expect(Token::RBracket, "']'")?;
                        expr = Expr::ArrayAccess {
                            array: Box::new(expr),
                            index: Box::new(index),
                        };
                    }
                }
                Some(Token::LBrace) if !matches!(expr, Expr::Id(_)) => {
                    self.lexer.next_token();
                    let field = self.ident()?;
                    self.expect(Token::Assign, "':='")?;
                    let value = self.parse_expr()?;
                    self.expect(Token::RBrace, "'}'")?;
                    expr = Expr::RecordUpdate {
                        record: Box::new(expr),
                        field,
                        value: Box::new(value),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance()? {
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Integer(value) => Ok(Expr::Int(value)),
            Token::Real(text) => Ok(Expr::Real(text.to_string())),
            Token::Ident(name) => self.parse_identifier_tail(name.to_string()),
            Token::LParen => {
                let first = self.parse_expr()?;
                if self.eat(&Token::Comma) {
                    let mut items = vec![first];
                    items.extend(self.parse_list(Token::RParen)?);
                    return Ok(Expr::Tuple(items));
                }
                self.expect(Token::RParen, "')'")?;
                Ok(first)
            }
            Token::LBracket => Ok(Expr::Array(self.parse_list(Token::RBracket)?)),
            Token::Forall => self.parse_quantified(Quantifier::Forall),
            Token::Exists => self.parse_quantified(Quantifier::Exists),
            _ => Err(self.error("expected expression")),
        }
    }

    /// Call, record construction/update, or plain variable after an identifier
    fn parse_identifier_tail(&mut self, name: String) -> Result<Expr> {
        match self.peek() {
            Some(Token::LParen) => {
                self.lexer.next_token();
                let args = self.parse_list(Token::RParen)?;
                Ok(Expr::call(name, args))
            }
            Some(Token::LBrace) => {
                self.lexer.next_token();
                let field = self.ident()?;
                if self.eat(&Token::Assign) {
                    let value = self.parse_expr()?;
                    self.expect(Token::RBrace, "'}'")?;
                    return Ok(Expr::RecordUpdate {
                        record: Box::new(Expr::Id(name)),
                        field,
                        value: Box::new(value),
                    });
                }
                self.expect(Token::Equal, "'=' or ':='")?;
                let mut fields = vec![(field, self.parse_expr()?)];
                while self.eat(&Token::Semicolon) {
                    let field = self.ident()?;
                    self.expect(Token::Equal, "'='")?;
                    fields.push((field, self.parse_expr()?));
                }
                self.expect(Token::RBrace, "'}'")?;
                Ok(Expr::Record {
                    type_name: name,
                    fields,
                })
            }
            _ => Ok(Expr::Id(name)),
        }
    }

    /// Comma-separated expressions up to and including `close`
    fn parse_list(&mut self, close: Token<'a>) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(close, "closing delimiter")?;
            return Ok(items);
        }
    }

    fn parse_quantified(&mut self, quantifier: Quantifier) -> Result<Expr> {
        let mut bound = vec![self.ident()?];
        while self.eat(&Token::Comma) {
            bound.push(self.ident()?);
        }
        self.expect(Token::Dot, "'.'")?;
        let body = self.parse_expr()?;
        Ok(Expr::Quantified {
            quantifier,
            bound,
            body: Box::new(body),
        })
    }
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
