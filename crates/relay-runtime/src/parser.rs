//! Recursive-descent parser
//!
//! Builds the [`ast`] parse tree from a token stream. Expressions are parsed
//! with precedence climbing; everything else is straight recursive descent.
//! Each declaration/statement/expression node is assigned a fresh [`ast::NodeId`]
//! as it is constructed.

use crate::ast::*;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id: 0,
        }
    }

    /// Parse a complete source file into a [`Program`]
    pub fn parse_program(mut self) -> Result<Program, Diagnostic> {
        let mut functions = Vec::new();
        while !self.at_eof() {
            functions.push(self.parse_function_decl()?);
        }
        Ok(Program { functions })
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, Diagnostic> {
        if self.peek() == kind {
            Ok(self.bump())
        } else {
            Err(Diagnostic::error_with_code(
                error_codes::PARSE_UNEXPECTED_TOKEN,
                format!("expected {:?}, found {:?}", kind, self.peek()),
                self.peek_span(),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), Diagnostic> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Ok((name, span))
            }
            other => Err(Diagnostic::error_with_code(
                error_codes::PARSE_UNEXPECTED_TOKEN,
                format!("expected identifier, found {:?}", other),
                span,
            )),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    // ---- declarations ----

    fn parse_function_decl(&mut self) -> Result<FunctionDecl, Diagnostic> {
        let start = self.peek_span();
        self.expect(&TokenKind::Func)?;
        let (name, _) = self.expect_ident()?;
        let sig = self.parse_signature()?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(FunctionDecl {
            id: self.fresh_id(),
            name,
            sig,
            body,
            span,
        })
    }

    fn parse_signature(&mut self) -> Result<FunctionSig, Diagnostic> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                let (name, span) = self.expect_ident()?;
                let ty = self.parse_type()?;
                params.push(Param { name, ty, span });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        let ret = if self.starts_type() {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok(FunctionSig { params, ret })
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::TypeInt
                | TokenKind::TypeFloat
                | TokenKind::TypeBool
                | TokenKind::TypeString
                | TokenKind::Chan
                | TokenKind::Func
        )
    }

    fn parse_type(&mut self) -> Result<TypeExpr, Diagnostic> {
        match self.peek().clone() {
            TokenKind::TypeInt => {
                self.bump();
                Ok(TypeExpr::Int)
            }
            TokenKind::TypeFloat => {
                self.bump();
                Ok(TypeExpr::Float)
            }
            TokenKind::TypeBool => {
                self.bump();
                Ok(TypeExpr::Bool)
            }
            TokenKind::TypeString => {
                self.bump();
                Ok(TypeExpr::String)
            }
            TokenKind::Chan => {
                self.bump();
                let elem = self.parse_type()?;
                Ok(TypeExpr::Chan(Box::new(elem)))
            }
            TokenKind::Func => {
                self.bump();
                self.expect(&TokenKind::LParen)?;
                let mut params = Vec::new();
                if !matches!(self.peek(), TokenKind::RParen) {
                    loop {
                        params.push(self.parse_type()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen)?;
                let ret = if self.starts_type() {
                    Some(Box::new(self.parse_type()?))
                } else {
                    None
                };
                Ok(TypeExpr::Func(params, ret))
            }
            other => Err(Diagnostic::error_with_code(
                error_codes::PARSE_UNEXPECTED_TOKEN,
                format!("expected a type, found {:?}", other),
                self.peek_span(),
            )),
        }
    }

    fn parse_block(&mut self) -> Result<Block, Diagnostic> {
        let start = self.expect(&TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(&TokenKind::RBrace)?.span;
        Ok(Block {
            stmts,
            span: start.merge(end),
        })
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.peek_span();
        let kind = match self.peek().clone() {
            TokenKind::Var => {
                self.bump();
                let (name, _) = self.expect_ident()?;
                let ty = if self.starts_type() {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let init = if self.eat(&TokenKind::Eq) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                StmtKind::VarDecl { name, ty, init }
            }
            TokenKind::If => {
                self.bump();
                let cond = self.parse_expr()?;
                let then_block = self.parse_block()?;
                let else_block = if self.eat(&TokenKind::Else) {
                    Some(self.parse_block()?)
                } else {
                    None
                };
                StmtKind::If {
                    cond,
                    then_block,
                    else_block,
                }
            }
            TokenKind::For => {
                self.bump();
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                StmtKind::For { cond, body }
            }
            TokenKind::Return => {
                self.bump();
                let value = if matches!(self.peek(), TokenKind::Semicolon | TokenKind::RBrace) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                StmtKind::Return(value)
            }
            TokenKind::Go => {
                self.bump();
                let call = self.parse_expr()?;
                if !matches!(call.kind, ExprKind::Call { .. }) {
                    return Err(Diagnostic::error_with_code(
                        error_codes::SHAPE_ERROR,
                        "`go` requires a call expression",
                        call.span,
                    ));
                }
                StmtKind::Go { call }
            }
            TokenKind::Ident(_) => {
                // Disambiguate `name = expr` from a bare expression statement
                // by lookahead on the token after the identifier.
                if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Eq)) {
                    let (name, _) = self.expect_ident()?;
                    self.expect(&TokenKind::Eq)?;
                    let value = self.parse_expr()?;
                    StmtKind::Assign { name, value }
                } else {
                    self.parse_expr_or_send_stmt()?
                }
            }
            _ => self.parse_expr_or_send_stmt()?,
        };
        self.eat(&TokenKind::Semicolon);
        let end = self.tokens[self.pos.saturating_sub(1)].span;
        Ok(Stmt {
            id: self.fresh_id(),
            kind,
            span: start.merge(end),
        })
    }

    fn parse_expr_or_send_stmt(&mut self) -> Result<StmtKind, Diagnostic> {
        let expr = self.parse_expr()?;
        if self.eat(&TokenKind::Arrow) {
            // `chan <- value`
            let value = self.parse_expr()?;
            Ok(StmtKind::Send { chan: expr, value })
        } else {
            Ok(StmtKind::Expr(expr))
        }
    }

    // ---- expressions (precedence climbing) ----

    fn parse_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), TokenKind::PipePipe) {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_equality()?;
        while matches!(self.peek(), TokenKind::AmpAmp) {
            self.bump();
            let rhs = self.parse_equality()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_comparison()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_bitor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_bitor()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_bitand()?;
        while matches!(self.peek(), TokenKind::Pipe) {
            self.bump();
            let rhs = self.parse_bitand()?;
            lhs = self.binary(BinaryOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_shift()?;
        while matches!(self.peek(), TokenKind::Amp) {
            self.bump();
            let rhs = self.parse_shift()?;
            lhs = self.binary(BinaryOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                TokenKind::Caret => BinaryOp::BitXor,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.peek_span();
        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Caret => Some(UnaryOp::BitNot),
            TokenKind::Arrow => Some(UnaryOp::Recv),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Ok(Expr {
                id: self.fresh_id(),
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            });
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        while matches!(self.peek(), TokenKind::LParen) {
            self.bump();
            let mut args = Vec::new();
            if !matches!(self.peek(), TokenKind::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            let end = self.expect(&TokenKind::RParen)?.span;
            let span = expr.span.merge(end);
            expr = Expr {
                id: self.fresh_id(),
                kind: ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                },
                span,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.peek_span();
        match self.peek().clone() {
            TokenKind::Integer(n) => {
                self.bump();
                Ok(self.leaf(ExprKind::Integer(n), start))
            }
            TokenKind::Float(f) => {
                self.bump();
                Ok(self.leaf(ExprKind::Float(f), start))
            }
            TokenKind::Bool(b) => {
                self.bump();
                Ok(self.leaf(ExprKind::Bool(b), start))
            }
            TokenKind::String(s) => {
                self.bump();
                Ok(self.leaf(ExprKind::String(s), start))
            }
            TokenKind::Make => {
                self.bump();
                self.expect(&TokenKind::LParen)?;
                self.expect(&TokenKind::Chan)?;
                let elem = self.parse_type()?;
                self.expect(&TokenKind::Comma)?;
                let capacity = self.parse_expr()?;
                let end = self.expect(&TokenKind::RParen)?.span;
                Ok(Expr {
                    id: self.fresh_id(),
                    kind: ExprKind::Make {
                        elem,
                        capacity: Box::new(capacity),
                    },
                    span: start.merge(end),
                })
            }
            TokenKind::Func => {
                self.bump();
                let sig = self.parse_signature()?;
                let body = self.parse_block()?;
                let span = start.merge(body.span);
                Ok(Expr {
                    id: self.fresh_id(),
                    kind: ExprKind::FunctionLit {
                        id: self.fresh_id(),
                        sig,
                        body,
                    },
                    span,
                })
            }
            TokenKind::Ident(name) => {
                self.bump();
                Ok(self.leaf(ExprKind::Ident(name), start))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            other => Err(Diagnostic::error_with_code(
                error_codes::PARSE_UNEXPECTED_TOKEN,
                format!("unexpected token {:?} in expression", other),
                start,
            )),
        }
    }

    fn leaf(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.fresh_id(),
            kind,
            span,
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        let span = lhs.span.merge(rhs.span);
        Expr {
            id: self.fresh_id(),
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> Program {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens).parse_program().unwrap()
    }

    #[test]
    fn parses_if_else() {
        let program = parse(
            "func main() { var x int; var y int = 10; if (y > 2) { x = 1 } else { x = 2 } }",
        );
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].body.stmts.len(), 3);
    }

    #[test]
    fn parses_go_statement() {
        let program = parse("func main() { go worker(1, 2) }");
        assert!(matches!(
            program.functions[0].body.stmts[0].kind,
            StmtKind::Go { .. }
        ));
    }

    #[test]
    fn rejects_go_on_non_call() {
        let tokens = Lexer::new("func main() { go 1 }").tokenize().unwrap();
        let err = Parser::new(tokens).parse_program().unwrap_err();
        assert_eq!(err.code, error_codes::SHAPE_ERROR);
    }

    #[test]
    fn parses_make_and_send() {
        let program = parse("func main() { var ch chan int = make(chan int, 1); ch <- 42 }");
        assert!(matches!(
            program.functions[0].body.stmts[1].kind,
            StmtKind::Send { .. }
        ));
    }
}
