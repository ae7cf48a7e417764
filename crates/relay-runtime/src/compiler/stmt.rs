//! Statement lowering
use super::Compiler;
use crate::analyzer::VarCategory;
use crate::ast::{Block, Expr, ExprKind, Stmt, StmtKind};
use crate::bytecode::{Function, Instruction, Opcode};
use crate::value::int_to_word;
use crate::vm::native;

impl<'a> Compiler<'a> {
    pub(super) fn compile_block(&mut self, func: &mut Function, block: &Block) {
        for stmt in &block.stmts {
            self.compile_stmt(func, stmt);
        }
    }

    fn compile_stmt(&mut self, func: &mut Function, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, init, .. } => self.compile_var_decl(func, stmt, name, init),
            StmtKind::Assign { name, value } => self.compile_assign(func, name, value),
            StmtKind::Send { chan, value } => self.compile_send(func, chan, value),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => self.compile_if(func, cond, then_block, else_block.as_ref()),
            StmtKind::For { cond, body } => self.compile_for(func, cond, body),
            StmtKind::Return(expr) => {
                if let Some(e) = expr {
                    self.compile_expr(func, e);
                }
                func.emit(Instruction::simple(Opcode::Ret));
            }
            StmtKind::Go { call } => self.compile_go(func, call),
            StmtKind::Expr(expr) => {
                self.compile_expr(func, expr);
                let produces_value = self
                    .annotation
                    .expr_types
                    .get(&expr.id)
                    .copied()
                    .flatten()
                    .is_some();
                if produces_value {
                    func.emit(Instruction::simple(Opcode::Pop));
                }
            }
        }
    }

    fn compile_var_decl(&mut self, func: &mut Function, stmt: &Stmt, name: &str, init: &Option<Expr>) {
        let ty = self.annotation.var_types[&stmt.id];
        let slot = self.frame().slot_of(name).unwrap() as u64;
        let escaped = self.frame().category_of(name) == Some(VarCategory::Escaped);

        if escaped {
            func.emit(Instruction::new(Opcode::New, ty.0 as u64));
            func.emit(Instruction::simple(Opcode::Dup));
            func.emit(Instruction::new(Opcode::Store, slot));
            self.compile_init(func, init);
            func.emit(Instruction::new(Opcode::WStore, 0));
        } else {
            self.compile_init(func, init);
            func.emit(Instruction::new(Opcode::Store, slot));
        }
    }

    fn compile_init(&mut self, func: &mut Function, init: &Option<Expr>) {
        match init {
            Some(expr) => self.compile_expr(func, expr),
            None => func.emit(Instruction::new(Opcode::Push, int_to_word(0))),
        };
    }

    fn compile_assign(&mut self, func: &mut Function, name: &str, value: &Expr) {
        let frame = self.frame();
        let slot = frame.slot_of(name).unwrap() as u64;
        let escaped_or_free = matches!(
            frame.category_of(name),
            Some(VarCategory::Escaped) | Some(VarCategory::Free)
        );
        if escaped_or_free {
            func.emit(Instruction::new(Opcode::Load, slot));
            self.compile_expr(func, value);
            func.emit(Instruction::new(Opcode::WStore, 0));
        } else {
            self.compile_expr(func, value);
            func.emit(Instruction::new(Opcode::Store, slot));
        }
    }

    /// `ch <- v`: `push ch; new_ box-type; dup; eval v; wstore 0;
    /// invoke_native chan_send`.
    fn compile_send(&mut self, func: &mut Function, chan: &Expr, value: &Expr) {
        self.compile_expr(func, chan);
        let box_ty = self.annotation.expr_types[&value.id].expect("sent value must have a type");
        func.emit(Instruction::new(Opcode::New, box_ty.0 as u64));
        func.emit(Instruction::simple(Opcode::Dup));
        self.compile_expr(func, value);
        func.emit(Instruction::new(Opcode::WStore, 0));
        func.emit(Instruction::new(Opcode::InvokeNative, native::CHAN_SEND));
    }

    /// `if cond { A } else { B }`: `eval cond; if_f -> L1; A; goto L2; L1: B; L2:`
    fn compile_if(&mut self, func: &mut Function, cond: &Expr, then_block: &Block, else_block: Option<&Block>) {
        self.compile_expr(func, cond);
        let if_f_at = func.emit(Instruction::new(Opcode::IfFalse, 0));
        self.compile_block(func, then_block);
        match else_block {
            Some(else_block) => {
                let goto_at = func.emit(Instruction::new(Opcode::Goto, 0));
                func.patch_jump_here(if_f_at);
                self.compile_block(func, else_block);
                func.patch_jump_here(goto_at);
            }
            None => func.patch_jump_here(if_f_at),
        }
    }

    /// `for cond { body }`: `L0: eval cond; if_f -> L1; body; goto L0; L1:`
    fn compile_for(&mut self, func: &mut Function, cond: &Expr, body: &Block) {
        let l0 = func.code.len() as u64;
        self.compile_expr(func, cond);
        let if_f_at = func.emit(Instruction::new(Opcode::IfFalse, 0));
        self.compile_block(func, body);
        func.emit(Instruction::new(Opcode::Goto, l0));
        func.patch_jump_here(if_f_at);
    }

    /// `go f(args…)`: `push args; push f; invoke_native new_thread`
    fn compile_go(&mut self, func: &mut Function, call: &Expr) {
        let ExprKind::Call { callee, args } = &call.kind else {
            unreachable!("parser guarantees `go`'s operand is a call expression")
        };
        for arg in args {
            self.compile_expr(func, arg);
        }
        self.compile_callable_value(func, callee);
        func.emit(Instruction::new(Opcode::InvokeNative, native::NEW_THREAD));
    }
}
