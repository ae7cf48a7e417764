//! Token types for lexical analysis

use crate::span::Span;

/// A single lexical token with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// Source location of the token
    pub span: Span,
}

/// Classification of token types recognised by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Ident(String),

    // Keywords
    Func,
    Var,
    If,
    Else,
    For,
    Return,
    Go,
    Chan,
    Make,

    // Type names
    TypeInt,
    TypeFloat,
    TypeBool,
    TypeString,

    // Operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    Pipe,
    Shl,
    Shr,
    Bang,
    Arrow,      // `<-` (channel send/receive)
    AmpAmp,     // `&&`
    PipePipe,   // `||`
    Eq,         // `=`
    EqEq,       // `==`
    NotEq,      // `!=`
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Eof,
}

impl TokenKind {
    /// Look up whether an identifier string is a reserved keyword
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        Some(match ident {
            "func" => TokenKind::Func,
            "var" => TokenKind::Var,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "go" => TokenKind::Go,
            "chan" => TokenKind::Chan,
            "make" => TokenKind::Make,
            "int" => TokenKind::TypeInt,
            "float" => TokenKind::TypeFloat,
            "bool" => TokenKind::TypeBool,
            "string" => TokenKind::TypeString,
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => return None,
        })
    }
}
