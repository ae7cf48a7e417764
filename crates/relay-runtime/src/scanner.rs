//! Function Scanner — compiler pass 1
//!
//! Walks the parse tree top-down, assigning a dense function index to every
//! function declaration and function literal. Does not
//! inspect bodies beyond recursing into nested function literals.

use crate::ast::*;
use std::collections::HashMap;

/// Dense index into the function table, stable for the lifetime of
/// compilation and execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionIndex(pub u32);

/// Output of the Function Scanner: a flat list of discovered functions plus
/// lookup maps from parse-node identity and from top-level name.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// One entry per discovered function, in discovery order; the entry's
    /// position is its `FunctionIndex`.
    pub functions: Vec<ScannedFunction>,
    /// `parse_node -> function index`, for both the declaration/literal node
    /// and its inner function node.
    pub by_node: HashMap<NodeId, FunctionIndex>,
    /// `name -> function index`, for named top-level declarations only.
    pub by_name: HashMap<String, FunctionIndex>,
}

/// Everything the scanner records about one function, before any variable
/// or type analysis has run.
#[derive(Debug, Clone)]
pub struct ScannedFunction {
    pub index: FunctionIndex,
    pub name: Option<String>,
    pub sig: FunctionSig,
    pub body: Block,
    /// Node id of the inner function node (the signature+body unit)
    pub node_id: NodeId,
}

/// Walks a [`Program`] and produces a [`ScanResult`]
pub fn scan(program: &Program) -> ScanResult {
    let mut result = ScanResult::default();
    for decl in &program.functions {
        scan_function(
            &mut result,
            Some(decl.name.clone()),
            decl.id,
            &decl.sig,
            &decl.body,
        );
    }
    result
}

fn scan_function(
    result: &mut ScanResult,
    name: Option<String>,
    node_id: NodeId,
    sig: &FunctionSig,
    body: &Block,
) {
    let index = FunctionIndex(result.functions.len() as u32);
    result.by_node.insert(node_id, index);
    if let Some(name) = &name {
        result.by_name.insert(name.clone(), index);
    }
    result.functions.push(ScannedFunction {
        index,
        name,
        sig: sig.clone(),
        body: body.clone(),
        node_id,
    });
    scan_block(result, body);
}

fn scan_block(result: &mut ScanResult, block: &Block) {
    for stmt in &block.stmts {
        scan_stmt(result, stmt);
    }
}

fn scan_stmt(result: &mut ScanResult, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::VarDecl { init, .. } => {
            if let Some(expr) = init {
                scan_expr(result, expr);
            }
        }
        StmtKind::Assign { value, .. } => scan_expr(result, value),
        StmtKind::Send { chan, value } => {
            scan_expr(result, chan);
            scan_expr(result, value);
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            scan_expr(result, cond);
            scan_block(result, then_block);
            if let Some(b) = else_block {
                scan_block(result, b);
            }
        }
        StmtKind::For { cond, body } => {
            scan_expr(result, cond);
            scan_block(result, body);
        }
        StmtKind::Return(Some(expr)) => scan_expr(result, expr),
        StmtKind::Return(None) => {}
        StmtKind::Go { call } => scan_expr(result, call),
        StmtKind::Expr(expr) => scan_expr(result, expr),
    }
}

fn scan_expr(result: &mut ScanResult, expr: &Expr) {
    match &expr.kind {
        ExprKind::FunctionLit { id, sig, body } => {
            // Function literals have no name binding.
            scan_function(result, None, *id, sig, body);
        }
        ExprKind::Unary { operand, .. } => scan_expr(result, operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            scan_expr(result, lhs);
            scan_expr(result, rhs);
        }
        ExprKind::Call { callee, args } => {
            scan_expr(result, callee);
            for a in args {
                scan_expr(result, a);
            }
        }
        ExprKind::Make { capacity, .. } => scan_expr(result, capacity),
        ExprKind::Integer(_)
        | ExprKind::Float(_)
        | ExprKind::Bool(_)
        | ExprKind::String(_)
        | ExprKind::Ident(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn scan_src(src: &str) -> ScanResult {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        scan(&program)
    }

    #[test]
    fn finds_nested_function_literals() {
        let result = scan_src(
            "func outer() { var f func() = func() { var g int = 1 } }",
        );
        // outer + the anonymous literal = 2 functions
        assert_eq!(result.functions.len(), 2);
        assert!(result.by_name.contains_key("outer"));
    }

    #[test]
    fn assigns_dense_indices_in_discovery_order() {
        let result = scan_src("func a() {} func b() {}");
        assert_eq!(result.functions[0].index, FunctionIndex(0));
        assert_eq!(result.functions[1].index, FunctionIndex(1));
    }
}
