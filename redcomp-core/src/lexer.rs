//! Lexer for the textual contract expression syntax using logos

use logos::{Lexer as LogosLexer, Logos};

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    // Keywords
    #[token("true", priority = 10)]
    True,
    #[token("false", priority = 10)]
    False,
    #[token("not", priority = 10)]
    Not,
    #[token("and", priority = 10)]
    And,
    #[token("or", priority = 10)]
    Or,
    #[token("xor", priority = 10)]
    Xor,
    #[token("if", priority = 10)]
    If,
    #[token("then", priority = 10)]
    Then,
    #[token("else", priority = 10)]
    Else,
    #[token("pre", priority = 10)]
    Pre,
    #[token("div", priority = 10)]
    Div,
    #[token("mod", priority = 10)]
    Mod,
    #[token("forall", priority = 10)]
    Forall,
    #[token("exists", priority = 10)]
    Exists,

    // Operators
    #[token("->")]
    Arrow,
    #[token("=>")]
    Implies,
    #[token(":=")]
    Assign,
    #[token("<>")]
    NotEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<=")]
    LessEqual,
    #[token("=")]
    Equal,
    #[token(">")]
    Greater,
    #[token("<")]
    Less,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+", priority = 6)]
    Real(&'a str),
    #[regex(r"[0-9]+", priority = 5, callback = |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    /// Identifier, possibly qualified with dots (`C1.x`)
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*", priority = 3)]
    Ident(&'a str),

    // Comments and whitespace
    #[regex(r"--[^\n]*", logos::skip)]
    #[regex(r"[ \t\n\r]+", logos::skip)]
    Whitespace,
}

/// Lexer with a single token of lookahead
pub struct Lexer<'a> {
    inner: LogosLexer<'a, Token<'a>>,
    peeked: Option<(Option<Result<Token<'a>, ()>>, std::ops::Range<usize>)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    /// Next token; `Some(Err(()))` marks input the lexer could not recognise
    pub fn next_token(&mut self) -> Option<Result<Token<'a>, ()>> {
        if let Some((token, _)) = self.peeked.take() {
            token
        } else {
            self.inner.next()
        }
    }

    pub fn peek_token(&mut self) -> Option<&Result<Token<'a>, ()>> {
        if self.peeked.is_none() {
            let token = self.inner.next();
            let span = self.inner.span();
            self.peeked = Some((token, span));
        }
        self.peeked.as_ref().and_then(|(token, _)| token.as_ref())
    }

    /// Byte range of the last token returned or peeked
    pub fn span(&self) -> std::ops::Range<usize> {
        if let Some((_, span)) = &self.peeked {
            span.clone()
        } else {
            self.inner.span()
        }
    }
}
