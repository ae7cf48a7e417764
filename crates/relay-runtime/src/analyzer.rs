//! Variable Analyzer — compiler pass 2
//!
//! Computes, for every function discovered by the [`scanner`], a per-function
//! frame describing its parameters, locals and captures, and categorises
//! every bound name as *bound*, *free*, or *escaped*.

use crate::ast::*;
use crate::scanner::{FunctionIndex, ScanResult};
use std::collections::HashMap;

/// Top-level builtin names that are never treated as captured variables
/// when referenced inside a function body.
pub const NATIVE_BUILTIN_NAMES: &[&str] = &["sprint", "iprint", "fprint"];

/// How a name declared or referenced within a function is ultimately bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarCategory {
    /// Declared here, never captured by an inner function: lives in a stack slot.
    Bound,
    /// Referenced here but declared in an outer scope: becomes a capture of
    /// this function.
    Free,
    /// Declared here, captured by at least one inner function: lives in a
    /// one-word heap box; accessed through a pointer in its stack slot.
    Escaped,
}

/// Compile-time per-function variable layout, keyed by parse-node identity
/// of the function.
#[derive(Debug, Clone, Default)]
pub struct FrameInfo {
    /// Insertion-ordered capture names (become slots `0..capc`)
    pub captures: Vec<String>,
    /// Insertion-ordered parameter names (become slots `capc..capc+argc`)
    pub parameters: Vec<String>,
    /// Insertion-ordered local names (become slots `capc+argc..varc`)
    pub locals: Vec<String>,
    /// Final category of every name, after all propagation has completed
    pub categories: HashMap<String, VarCategory>,
    /// Final stack-slot index of every name
    pub slots: HashMap<String, u32>,
}

impl FrameInfo {
    pub fn capc(&self) -> u16 {
        self.captures.len() as u16
    }

    pub fn argc(&self) -> u16 {
        self.parameters.len() as u16
    }

    pub fn varc(&self) -> u16 {
        (self.captures.len() + self.parameters.len() + self.locals.len()) as u16
    }

    pub fn category_of(&self, name: &str) -> Option<VarCategory> {
        self.categories.get(name).copied()
    }

    pub fn slot_of(&self, name: &str) -> Option<u32> {
        self.slots.get(name).copied()
    }
}

/// Working, in-progress frame kept on the analyzer's stack while a function
/// body is being visited. Distinct from [`FrameInfo`] because categories can
/// still change (free -> escaped propagation, new captures appended) until
/// the function's traversal completes.
#[derive(Debug, Default)]
struct WorkingFrame {
    parameters: Vec<String>,
    locals: Vec<String>,
    captures: Vec<String>,
    categories: HashMap<String, VarCategory>,
}

impl WorkingFrame {
    fn declare_param(&mut self, name: String) {
        self.categories.insert(name.clone(), VarCategory::Bound);
        self.parameters.push(name);
    }

    fn declare_local(&mut self, name: String) {
        // Re-declaration (e.g. loop body re-entered) keeps the first slot;
        // there is no block scoping here, only function scoping.
        if !self.categories.contains_key(&name) {
            self.categories.insert(name.clone(), VarCategory::Bound);
            self.locals.push(name);
        }
    }

    fn reference(&mut self, name: &str) {
        if !self.categories.contains_key(name) {
            self.categories.insert(name.to_string(), VarCategory::Free);
            self.captures.push(name.to_string());
        }
    }

    fn finalize(self) -> FrameInfo {
        let mut slots = HashMap::new();
        let mut next = 0u32;
        for name in self.captures.iter().chain(self.parameters.iter()).chain(self.locals.iter()) {
            slots.insert(name.clone(), next);
            next += 1;
        }
        FrameInfo {
            captures: self.captures,
            parameters: self.parameters,
            locals: self.locals,
            categories: self.categories,
            slots,
        }
    }
}

pub struct Analyzer<'a> {
    scan: &'a ScanResult,
    stack: Vec<WorkingFrame>,
    pub results: HashMap<FunctionIndex, FrameInfo>,
}

impl<'a> Analyzer<'a> {
    pub fn new(scan: &'a ScanResult) -> Self {
        Self {
            scan,
            stack: Vec::new(),
            results: HashMap::new(),
        }
    }

    /// Analyze every top-level function declaration in the program.
    pub fn analyze(mut self, program: &Program) -> HashMap<FunctionIndex, FrameInfo> {
        for decl in &program.functions {
            self.analyze_function(decl.id, &decl.sig, &decl.body);
        }
        self.results
    }

    fn is_static_name(&self, name: &str) -> bool {
        self.scan.by_name.contains_key(name) || NATIVE_BUILTIN_NAMES.contains(&name)
    }

    fn analyze_function(&mut self, node_id: NodeId, sig: &FunctionSig, body: &Block) {
        self.stack.push(WorkingFrame::default());
        for param in &sig.params {
            self.stack.last_mut().unwrap().declare_param(param.name.clone());
        }
        self.visit_block(body);

        let finished = self.stack.pop().unwrap();
        let leftover_free: Vec<String> = finished
            .categories
            .iter()
            .filter(|(_, cat)| matches!(cat, VarCategory::Free))
            .map(|(name, _)| name.clone())
            .collect();
        let frame_info = finished.finalize();

        let index = *self
            .scan
            .by_node
            .get(&node_id)
            .expect("every analyzed function must have been scanned");
        self.results.insert(index, frame_info);

        // Step 6: propagate names still free here into the enclosing frame.
        if let Some(enclosing) = self.stack.last_mut() {
            for name in leftover_free {
                match enclosing.categories.get(&name).copied() {
                    None => {
                        enclosing
                            .categories
                            .insert(name.clone(), VarCategory::Free);
                        enclosing.captures.push(name);
                    }
                    Some(VarCategory::Bound) => {
                        enclosing
                            .categories
                            .insert(name.clone(), VarCategory::Escaped);
                    }
                    Some(VarCategory::Free) | Some(VarCategory::Escaped) => {
                        // already propagating / already escaped; nothing to do
                    }
                }
            }
        }
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, init, .. } => {
                if let Some(expr) = init {
                    self.visit_expr(expr);
                }
                self.stack.last_mut().unwrap().declare_local(name.clone());
            }
            StmtKind::Assign { name, value } => {
                self.visit_expr(value);
                self.reference_name(name);
            }
            StmtKind::Send { chan, value } => {
                self.visit_expr(chan);
                self.visit_expr(value);
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.visit_expr(cond);
                self.visit_block(then_block);
                if let Some(b) = else_block {
                    self.visit_block(b);
                }
            }
            StmtKind::For { cond, body } => {
                self.visit_expr(cond);
                self.visit_block(body);
            }
            StmtKind::Return(Some(expr)) => self.visit_expr(expr),
            StmtKind::Return(None) => {}
            StmtKind::Go { call } => self.visit_expr(call),
            StmtKind::Expr(expr) => self.visit_expr(expr),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.reference_name(name),
            ExprKind::Unary { operand, .. } => self.visit_expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
            ExprKind::Call { callee, args } => {
                self.visit_expr(callee);
                for a in args {
                    self.visit_expr(a);
                }
            }
            ExprKind::Make { capacity, .. } => self.visit_expr(capacity),
            ExprKind::FunctionLit { id, sig, body } => {
                self.analyze_function(*id, sig, body);
            }
            ExprKind::Integer(_) | ExprKind::Float(_) | ExprKind::Bool(_) | ExprKind::String(_) => {}
        }
    }

    fn reference_name(&mut self, name: &str) {
        if self.is_static_name(name) {
            return;
        }
        self.stack.last_mut().unwrap().reference(name);
    }
}

/// Convenience entry point: scan then analyze a program in one call.
pub fn analyze(scan: &ScanResult, program: &Program) -> HashMap<FunctionIndex, FrameInfo> {
    Analyzer::new(scan).analyze(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::scanner;

    fn analyze_src(src: &str) -> (ScanResult, HashMap<FunctionIndex, FrameInfo>) {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        let scan = scanner::scan(&program);
        let frames = Analyzer::new(&scan).analyze(&program);
        (scan, frames)
    }

    #[test]
    fn promotes_captured_local_to_escaped() {
        // `counter` is bound in `makeCounter`, captured by the returned
        // literal, so it must be promoted to escaped.
        let (scan, frames) = analyze_src(
            "func makeCounter() func() int { var counter int = 0; var f func() int = func() int { return counter }; return f }",
        );
        let outer_idx = scan.by_name["makeCounter"];
        let outer_frame = &frames[&outer_idx];
        assert_eq!(
            outer_frame.category_of("counter"),
            Some(VarCategory::Escaped)
        );
    }

    #[test]
    fn uncaptured_local_stays_bound() {
        let (scan, frames) = analyze_src("func f() { var x int = 1; x = 2 }");
        let idx = scan.by_name["f"];
        assert_eq!(frames[&idx].category_of("x"), Some(VarCategory::Bound));
    }

    #[test]
    fn top_level_function_name_is_not_a_capture() {
        let (scan, frames) = analyze_src("func helper() int { return 1 } func main() { helper() }");
        let idx = scan.by_name["main"];
        assert!(frames[&idx].captures.is_empty());
    }

    #[test]
    fn inner_literal_records_free_capture() {
        let (scan, frames) = analyze_src(
            "func outer() { var n int = 1; var f func() int = func() int { return n } }",
        );
        let literal_idx = FunctionIndex(1);
        assert_eq!(scan.functions[1].index, literal_idx);
        assert!(frames[&literal_idx].captures.contains(&"n".to_string()));
        assert_eq!(
            frames[&literal_idx].category_of("n"),
            Some(VarCategory::Free)
        );
    }

    #[test]
    fn param_slot_layout_is_captures_then_params_then_locals() {
        let (scan, frames) = analyze_src(
            "func outer() { var n int = 1; var f func(int) int = func(x int) int { var y int = 1; return n + x + y } }",
        );
        let literal_idx = FunctionIndex(1);
        let frame = &frames[&literal_idx];
        assert_eq!(frame.slot_of("n"), Some(0)); // capture
        assert_eq!(frame.slot_of("x"), Some(1)); // parameter
        assert_eq!(frame.slot_of("y"), Some(2)); // local
        assert_eq!(frame.capc(), 1);
        assert_eq!(frame.argc(), 1);
        assert_eq!(frame.varc(), 3);
        let _ = scan;
    }
}
