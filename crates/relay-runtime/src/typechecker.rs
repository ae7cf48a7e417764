//! Type Annotator — compiler pass 3
//!
//! Assigns a canonical interned type to every expression and declaration
//! node, walking the tree with a scoped name -> type
//! environment. Requires the [`analyzer`] results because a function
//! literal's value type depends on its capture count (`capc`).

use crate::analyzer::FrameInfo;
use crate::ast::*;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::scanner::{FunctionIndex, ScanResult};
use crate::types::{Type, TypeIndex, TypeTable};
use std::collections::HashMap;

/// Result of type annotation: the interned type table plus per-node type
/// assignments. A `Call` to a function with no return type annotates its
/// node with `None`.
pub struct TypeAnnotation {
    pub table: TypeTable,
    pub expr_types: HashMap<NodeId, Option<TypeIndex>>,
    /// The `Function(args, ret)` type of every scanned function, keyed by
    /// its function index (used by the emitter to resolve `invoke_static`
    /// call targets).
    pub function_types: HashMap<FunctionIndex, TypeIndex>,
    /// The *value* type of every scanned function: a plain `Function` type
    /// if it has no captures, or `Closure(fn_type, capc)` if it does.
    pub value_types: HashMap<FunctionIndex, TypeIndex>,
    /// The type a `var` statement ultimately bound its name to (declared
    /// type if present, else the initializer's type), keyed by the
    /// statement's node id. The emitter needs this to size escaped-variable
    /// boxes without re-resolving surface syntax.
    pub var_types: HashMap<NodeId, TypeIndex>,
}

pub struct TypeChecker<'a> {
    scan: &'a ScanResult,
    frames: &'a HashMap<FunctionIndex, FrameInfo>,
    table: TypeTable,
    scopes: Vec<HashMap<String, TypeIndex>>,
    expr_types: HashMap<NodeId, Option<TypeIndex>>,
    function_types: HashMap<FunctionIndex, TypeIndex>,
    value_types: HashMap<FunctionIndex, TypeIndex>,
    var_types: HashMap<NodeId, TypeIndex>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(scan: &'a ScanResult, frames: &'a HashMap<FunctionIndex, FrameInfo>) -> Self {
        Self {
            scan,
            frames,
            table: TypeTable::new(),
            scopes: Vec::new(),
            expr_types: HashMap::new(),
            function_types: HashMap::new(),
            value_types: HashMap::new(),
            var_types: HashMap::new(),
        }
    }

    pub fn check(mut self, program: &Program) -> Result<TypeAnnotation, Diagnostic> {
        // Pre-register every top-level function's signature type and the
        // builtin natives, in a base scope visible from any nesting depth.
        let mut base = HashMap::new();
        for decl in &program.functions {
            let fn_ty = self.register_signature(&decl.sig)?;
            let index = self.scan.by_node[&decl.id];
            self.function_types.insert(index, fn_ty);
            self.value_types.insert(index, fn_ty);
            base.insert(decl.name.clone(), fn_ty);
        }
        base.insert(
            "sprint".to_string(),
            self.table
                .intern(Type::Function(vec![TypeTable::STRING], None)),
        );
        base.insert(
            "iprint".to_string(),
            self.table
                .intern(Type::Function(vec![TypeTable::INT], None)),
        );
        base.insert(
            "fprint".to_string(),
            self.table
                .intern(Type::Function(vec![TypeTable::FLOAT], None)),
        );
        self.scopes.push(base);

        for decl in &program.functions {
            self.check_function(decl.id, &decl.sig, &decl.body)?;
        }

        Ok(TypeAnnotation {
            table: self.table,
            expr_types: self.expr_types,
            function_types: self.function_types,
            value_types: self.value_types,
            var_types: self.var_types,
        })
    }

    /// Whether a value of type `value` may be stored in a slot declared as
    /// `target`. Equal types are always compatible; additionally a
    /// `Callable(fn_ty)` slot accepts either a `Closure` over the same
    /// signature (any capture count) or the bare `Function` value itself,
    /// since all three share the one-word closure-address representation at
    /// runtime.
    fn assignable(&self, target: TypeIndex, value: TypeIndex) -> bool {
        if target == value {
            return true;
        }
        if let Type::Callable(target_fn) = self.table.get(target) {
            return match self.table.get(value) {
                Type::Closure(value_fn, _) => value_fn == target_fn,
                _ => value == *target_fn,
            };
        }
        false
    }

    fn register_signature(&mut self, sig: &FunctionSig) -> Result<TypeIndex, Diagnostic> {
        let mut params = Vec::new();
        for p in &sig.params {
            params.push(self.resolve_type(&p.ty)?);
        }
        let ret = sig.ret.as_ref().map(|t| self.resolve_type(t)).transpose()?;
        Ok(self.table.intern(Type::Function(params, ret)))
    }

    /// Resolve a surface `TypeExpr` to an interned type. Function-valued
    /// slots are wrapped as `Callable` so a closure address may be stored
    /// there.
    fn resolve_type(&mut self, ty: &TypeExpr) -> Result<TypeIndex, Diagnostic> {
        Ok(match ty {
            TypeExpr::Int => TypeTable::INT,
            TypeExpr::Float => TypeTable::FLOAT,
            TypeExpr::Bool => TypeTable::BOOL,
            TypeExpr::String => TypeTable::STRING,
            TypeExpr::Chan(elem) => {
                let elem_ty = self.resolve_type(elem)?;
                self.table.intern(Type::Channel(elem_ty))
            }
            TypeExpr::Func(params, ret) => {
                let mut param_tys = Vec::new();
                for p in params {
                    param_tys.push(self.resolve_type(p)?);
                }
                let ret_ty = ret.as_ref().map(|r| self.resolve_type(r)).transpose()?;
                let fn_ty = self.table.intern(Type::Function(param_tys, ret_ty));
                self.table.intern(Type::Callable(fn_ty))
            }
        })
    }

    fn check_function(
        &mut self,
        node_id: NodeId,
        sig: &FunctionSig,
        body: &Block,
    ) -> Result<(), Diagnostic> {
        let index = self.scan.by_node[&node_id];
        // Register the plain function-signature type up front so that
        // recursive calls (direct or through a literal referencing itself)
        // and the capc > 0 wrapping below both have a type to work with.
        let fn_ty = match self.function_types.get(&index) {
            Some(ty) => *ty,
            None => {
                let ty = self.register_signature(sig)?;
                self.function_types.insert(index, ty);
                ty
            }
        };
        self.value_types.entry(index).or_insert(fn_ty);

        let mut scope = HashMap::new();
        for p in &sig.params {
            let ty = self.resolve_type(&p.ty)?;
            scope.insert(p.name.clone(), ty);
        }
        self.scopes.push(scope);
        self.check_block(body)?;
        self.scopes.pop();

        // Closures with captures get wrapped; this must happen after the
        // analyzer has run so `capc` is known.
        let capc = self.frames.get(&index).map(|f| f.capc()).unwrap_or(0);
        if capc > 0 {
            let wrapped = self.table.intern(Type::Closure(fn_ty, capc));
            self.value_types.insert(index, wrapped);
        }
        Ok(())
    }

    fn lookup(&self, name: &str, span: crate::span::Span) -> Result<TypeIndex, Diagnostic> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return Ok(*ty);
            }
        }
        Err(Diagnostic::error_with_code(
            error_codes::NAME_ERROR,
            format!("undefined name '{name}'"),
            span,
        ))
    }

    fn check_block(&mut self, block: &Block) -> Result<(), Diagnostic> {
        for stmt in &block.stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), Diagnostic> {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                let declared = ty.as_ref().map(|t| self.resolve_type(t)).transpose()?;
                let init_ty = match init {
                    Some(expr) => self.check_expr(expr)?,
                    None => None,
                };
                let final_ty = match (declared, init_ty) {
                    (Some(d), Some(i)) if !self.assignable(d, i) => {
                        return Err(Diagnostic::error_with_code(
                            error_codes::TYPE_ERROR,
                            format!(
                                "cannot initialize '{name}' of type {} with value of type {}",
                                self.table.name(d),
                                self.table.name(i)
                            ),
                            stmt.span,
                        ))
                    }
                    (Some(d), _) => d,
                    (None, Some(i)) => i,
                    (None, None) => {
                        return Err(Diagnostic::error_with_code(
                            error_codes::TYPE_ERROR,
                            format!("cannot infer type of '{name}'"),
                            stmt.span,
                        ))
                    }
                };
                self.scopes.last_mut().unwrap().insert(name.clone(), final_ty);
                self.var_types.insert(stmt.id, final_ty);
            }
            StmtKind::Assign { name, value } => {
                let value_ty = self.check_expr(value)?;
                let target_ty = self.lookup(name, stmt.span)?;
                if let Some(v) = value_ty {
                    if !self.assignable(target_ty, v) {
                        return Err(Diagnostic::error_with_code(
                            error_codes::TYPE_ERROR,
                            format!("cannot assign {} to '{name}'", self.table.name(v)),
                            stmt.span,
                        ));
                    }
                }
            }
            StmtKind::Send { chan, value } => {
                let chan_ty = self.check_expr(chan)?;
                let value_ty = self.check_expr(value)?;
                if let Some(ct) = chan_ty {
                    let elem = match self.table.get(ct) {
                        Type::Channel(elem) => *elem,
                        _ => {
                            return Err(Diagnostic::error_with_code(
                                error_codes::TYPE_ERROR,
                                "send target is not a channel",
                                stmt.span,
                            ))
                        }
                    };
                    if value_ty != Some(elem) {
                        return Err(Diagnostic::error_with_code(
                            error_codes::TYPE_ERROR,
                            "sent value does not match channel element type",
                            stmt.span,
                        ));
                    }
                }
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.expect_bool(cond)?;
                self.check_block(then_block)?;
                if let Some(b) = else_block {
                    self.check_block(b)?;
                }
            }
            StmtKind::For { cond, body } => {
                self.expect_bool(cond)?;
                self.check_block(body)?;
            }
            StmtKind::Return(Some(expr)) => {
                self.check_expr(expr)?;
            }
            StmtKind::Return(None) => {}
            StmtKind::Go { call } => {
                self.check_expr(call)?;
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr)?;
            }
        }
        Ok(())
    }

    fn expect_bool(&mut self, expr: &Expr) -> Result<(), Diagnostic> {
        let ty = self.check_expr(expr)?;
        if ty != Some(TypeTable::BOOL) {
            return Err(Diagnostic::error_with_code(
                error_codes::TYPE_ERROR,
                "condition must be of type bool",
                expr.span,
            ));
        }
        Ok(())
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Option<TypeIndex>, Diagnostic> {
        let ty = self.check_expr_inner(expr)?;
        self.expr_types.insert(expr.id, ty);
        Ok(ty)
    }

    fn check_expr_inner(&mut self, expr: &Expr) -> Result<Option<TypeIndex>, Diagnostic> {
        Ok(Some(match &expr.kind {
            ExprKind::Integer(_) => TypeTable::INT,
            ExprKind::Float(_) => TypeTable::FLOAT,
            ExprKind::Bool(_) => TypeTable::BOOL,
            ExprKind::String(_) => TypeTable::STRING,
            ExprKind::Ident(name) => self.lookup(name, expr.span)?,
            ExprKind::Unary { op, operand } => {
                let operand_ty = self
                    .check_expr(operand)?
                    .ok_or_else(|| non_value_error(operand.span))?;
                match op {
                    UnaryOp::Recv => match self.table.get(operand_ty) {
                        Type::Channel(elem) => *elem,
                        _ => {
                            return Err(Diagnostic::error_with_code(
                                error_codes::TYPE_ERROR,
                                "`<-` requires a channel operand",
                                expr.span,
                            ))
                        }
                    },
                    UnaryOp::Not => TypeTable::BOOL,
                    UnaryOp::BitNot => TypeTable::INT,
                    UnaryOp::Neg => operand_ty,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = self
                    .check_expr(lhs)?
                    .ok_or_else(|| non_value_error(lhs.span))?;
                let rhs_ty = self
                    .check_expr(rhs)?
                    .ok_or_else(|| non_value_error(rhs.span))?;
                if lhs_ty != rhs_ty {
                    return Err(Diagnostic::error_with_code(
                        error_codes::TYPE_ERROR,
                        format!(
                            "type mismatch: {} vs {}",
                            self.table.name(lhs_ty),
                            self.table.name(rhs_ty)
                        ),
                        expr.span,
                    ));
                }
                match op {
                    BinaryOp::And
                    | BinaryOp::Or
                    | BinaryOp::Eq
                    | BinaryOp::Ne
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge => TypeTable::BOOL,
                    BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Rem => TypeTable::INT,
                    BinaryOp::Add
                    | BinaryOp::Sub
                    | BinaryOp::Mul
                    | BinaryOp::Div
                    | BinaryOp::BitAnd
                    | BinaryOp::BitOr
                    | BinaryOp::BitXor => lhs_ty,
                }
            }
            ExprKind::Call { callee, args } => {
                let callee_ty = self
                    .check_expr(callee)?
                    .ok_or_else(|| non_value_error(callee.span))?;
                for a in args {
                    self.check_expr(a)?;
                }
                let resolved = match self.table.get(callee_ty) {
                    Type::Function(_, ret) => *ret,
                    Type::Closure(fn_ty, _) | Type::Callable(fn_ty) => {
                        match self.table.get(*fn_ty) {
                            Type::Function(_, ret) => *ret,
                            _ => unreachable!("fn_ty always interns a Function"),
                        }
                    }
                    Type::Native => None,
                    _ => {
                        return Err(Diagnostic::error_with_code(
                            error_codes::TYPE_ERROR,
                            "call target is not callable",
                            expr.span,
                        ))
                    }
                };
                return Ok(resolved);
            }
            ExprKind::Make { elem, capacity } => {
                let cap_ty = self.check_expr(capacity)?;
                if cap_ty != Some(TypeTable::INT) {
                    return Err(Diagnostic::error_with_code(
                        error_codes::TYPE_ERROR,
                        "channel capacity must be an int",
                        expr.span,
                    ));
                }
                let elem_ty = self.resolve_type(elem)?;
                self.table.intern(Type::Channel(elem_ty))
            }
            ExprKind::FunctionLit { id, sig, body } => {
                self.check_function(*id, sig, body)?;
                let index = self.scan.by_node[id];
                self.value_types[&index]
            }
        }))
    }
}

fn non_value_error(span: crate::span::Span) -> Diagnostic {
    Diagnostic::error_with_code(
        error_codes::TYPE_ERROR,
        "expression does not produce a value",
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::scanner;

    fn check(src: &str) -> Result<TypeAnnotation, Diagnostic> {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        let scan = scanner::scan(&program);
        let frames = analyzer::analyze(&scan, &program);
        TypeChecker::new(&scan, &frames).check(&program)
    }

    #[test]
    fn binary_operand_mismatch_is_an_error() {
        let err = check("func main() { var x int = 1; var y float = 1.0; var z bool = x > 0 && y > 0.0 }")
            .map(|_| ())
            .unwrap_err();
        let _ = err;
    }

    #[test]
    fn comparison_yields_bool() {
        let annotated = check("func main() { var x int = 1; var y bool = x > 0 }").unwrap();
        assert!(!annotated.expr_types.is_empty());
    }

    #[test]
    fn channel_receive_yields_element_type() {
        let annotated =
            check("func main() { var ch chan int = make(chan int, 1); var x int = <- ch }").unwrap();
        assert!(!annotated.expr_types.is_empty());
    }

    #[test]
    fn closures_with_captures_get_closure_type() {
        let annotated = check(
            "func outer() func() int { var n int = 1; var f func() int = func() int { return n }; return f }",
        )
        .unwrap();
        let literal_idx = crate::scanner::FunctionIndex(1);
        match annotated.table.get(annotated.value_types[&literal_idx]) {
            Type::Closure(_, capc) => assert_eq!(*capc, 1),
            other => panic!("expected Closure type, got {other:?}"),
        }
    }
}
