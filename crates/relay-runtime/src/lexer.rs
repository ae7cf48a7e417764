//! Lexical analysis
//!
//! Hand-written scanner over the raw source bytes. Produces a flat `Vec<Token>`
//! terminated by `TokenKind::Eof`; the parser never re-enters the lexer.

use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Converts source text into a token stream
pub struct Lexer<'src> {
    src: &'src [u8],
    pos: usize,
}

impl<'src> Lexer<'src> {
    /// Create a lexer over the given source text
    pub fn new(src: &'src str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    /// Lex the entire source into a token vector
    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.pos += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while self.peek().is_some() && self.peek() != Some(b'\n') {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, Diagnostic> {
        self.skip_trivia();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            });
        };

        let kind = match c {
            b'0'..=b'9' => return self.lex_number(start),
            b'"' => return self.lex_string(start),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => return self.lex_ident(start),
            b'+' => {
                self.advance();
                TokenKind::Plus
            }
            b'-' => {
                self.advance();
                TokenKind::Minus
            }
            b'*' => {
                self.advance();
                TokenKind::Star
            }
            b'/' => {
                self.advance();
                TokenKind::Slash
            }
            b'%' => {
                self.advance();
                TokenKind::Percent
            }
            b'^' => {
                self.advance();
                TokenKind::Caret
            }
            b'(' => {
                self.advance();
                TokenKind::LParen
            }
            b')' => {
                self.advance();
                TokenKind::RParen
            }
            b'{' => {
                self.advance();
                TokenKind::LBrace
            }
            b'}' => {
                self.advance();
                TokenKind::RBrace
            }
            b',' => {
                self.advance();
                TokenKind::Comma
            }
            b';' => {
                self.advance();
                TokenKind::Semicolon
            }
            b'&' => {
                self.advance();
                if self.peek() == Some(b'&') {
                    self.advance();
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                }
            }
            b'|' => {
                self.advance();
                if self.peek() == Some(b'|') {
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            b'!' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            b'=' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'<' => {
                self.advance();
                match self.peek() {
                    Some(b'-') => {
                        self.advance();
                        TokenKind::Arrow
                    }
                    Some(b'=') => {
                        self.advance();
                        TokenKind::Le
                    }
                    Some(b'<') => {
                        self.advance();
                        TokenKind::Shl
                    }
                    _ => TokenKind::Lt,
                }
            }
            b'>' => {
                self.advance();
                match self.peek() {
                    Some(b'=') => {
                        self.advance();
                        TokenKind::Ge
                    }
                    Some(b'>') => {
                        self.advance();
                        TokenKind::Shr
                    }
                    _ => TokenKind::Gt,
                }
            }
            other => {
                self.advance();
                return Err(Diagnostic::error_with_code(
                    error_codes::LEX_UNEXPECTED_CHAR,
                    format!("unexpected character '{}'", other as char),
                    Span::new(start, self.pos),
                ));
            }
        };

        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, Diagnostic> {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let kind = if is_float {
            TokenKind::Float(text.parse().map_err(|_| {
                Diagnostic::error_with_code(
                    error_codes::LEX_MALFORMED_NUMBER,
                    format!("malformed float literal '{text}'"),
                    Span::new(start, self.pos),
                )
            })?)
        } else {
            TokenKind::Integer(text.parse().map_err(|_| {
                Diagnostic::error_with_code(
                    error_codes::LEX_MALFORMED_NUMBER,
                    format!("malformed integer literal '{text}'"),
                    Span::new(start, self.pos),
                )
            })?)
        };
        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn lex_string(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(b'"') => value.push('"'),
                    Some(b'\\') => value.push('\\'),
                    Some(other) => value.push(other as char),
                    None => {
                        return Err(Diagnostic::error_with_code(
                            error_codes::LEX_UNTERMINATED_STRING,
                            "unterminated string literal",
                            Span::new(start, self.pos),
                        ))
                    }
                },
                Some(c) => value.push(c as char),
                None => {
                    return Err(Diagnostic::error_with_code(
                        error_codes::LEX_UNTERMINATED_STRING,
                        "unterminated string literal",
                        Span::new(start, self.pos),
                    ))
                }
            }
        }
        Ok(Token {
            kind: TokenKind::String(value),
            span: Span::new(start, self.pos),
        })
    }

    fn lex_ident(&mut self, start: usize) -> Result<Token, Diagnostic> {
        while matches!(self.peek(), Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'0'..=b'9') | Some(b'_'))
        {
            self.advance();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let kind = TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()));
        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_basic_program() {
        let tokens = Lexer::new("var x int = 10").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Var));
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "x"));
        assert!(matches!(tokens[2].kind, TokenKind::TypeInt));
        assert!(matches!(tokens[3].kind, TokenKind::Eq));
        assert!(matches!(tokens[4].kind, TokenKind::Integer(10)));
    }

    #[test]
    fn lexes_channel_operators() {
        let tokens = Lexer::new("<- ch <- v").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Arrow));
        assert!(matches!(tokens[2].kind, TokenKind::Arrow));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = Lexer::new("\"hello").tokenize().unwrap_err();
        assert_eq!(err.code, error_codes::LEX_UNTERMINATED_STRING);
    }
}
