//! Expression lowering
use super::Compiler;
use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::bytecode::{Function, Instruction, Opcode};
use crate::types::TypeTable;
use crate::value::{bool_to_word, float_to_word, int_to_word};
use crate::vm::native;

impl<'a> Compiler<'a> {
    pub(super) fn compile_expr(&mut self, func: &mut Function, expr: &Expr) {
        match &expr.kind {
            ExprKind::Integer(i) => func.emit(Instruction::new(Opcode::Push, int_to_word(*i))),
            ExprKind::Float(f) => func.emit(Instruction::new(Opcode::Push, float_to_word(*f))),
            ExprKind::Bool(b) => func.emit(Instruction::new(Opcode::Push, bool_to_word(*b))),
            ExprKind::String(s) => {
                let idx = self.strings.new_string(s.clone());
                func.emit(Instruction::new(Opcode::New, TypeTable::STRING.0 as u64));
                func.emit(Instruction::simple(Opcode::Dup));
                func.emit(Instruction::new(Opcode::Push, idx.0 as u64));
                func.emit(Instruction::new(Opcode::WStore, 0));
            }
            ExprKind::Ident(name) => {
                if self.frame().slot_of(name).is_some() {
                    self.emit_read_local(func, name);
                } else {
                    self.compile_callable_value(func, expr);
                }
            }
            ExprKind::Unary { op, operand } => self.compile_unary(func, *op, operand),
            ExprKind::Binary { op, lhs, rhs } => self.compile_binary(func, *op, lhs, rhs),
            ExprKind::Call { callee, args } => self.compile_call(func, callee, args),
            ExprKind::Make { capacity, .. } => {
                self.compile_expr(func, capacity);
                func.emit(Instruction::new(Opcode::InvokeNative, native::NEW_CHAN));
            }
            ExprKind::FunctionLit { id, .. } => self.compile_function_literal(func, *id),
        }
    }

    /// `f(args…)` where `f` must be evaluated as a value rather than
    /// invoked directly: a bare top-level function name gets wrapped in a
    /// trivial zero-capture closure so `invoke_dynamic`/`new_thread` see a
    /// uniform closure address; anything else (a local holding a closure, a
    /// nested call returning one) is just evaluated normally.
    pub(super) fn compile_callable_value(&mut self, func: &mut Function, expr: &Expr) {
        if let ExprKind::Ident(name) = &expr.kind {
            if self.frame().slot_of(name).is_none() {
                let index = self.scan.by_name[name];
                let fn_ty = self.annotation.function_types[&index];
                func.emit(Instruction::new(Opcode::New, fn_ty.0 as u64));
                func.emit(Instruction::simple(Opcode::Dup));
                func.emit(Instruction::new(Opcode::Push, index.0 as u64));
                func.emit(Instruction::new(Opcode::WStore, 0));
                return;
            }
        }
        self.compile_expr(func, expr);
    }

    fn compile_unary(&mut self, func: &mut Function, op: UnaryOp, operand: &Expr) {
        match op {
            UnaryOp::Recv => {
                self.compile_expr(func, operand);
                func.emit(Instruction::new(Opcode::InvokeNative, native::CHAN_RECV));
                func.emit(Instruction::new(Opcode::WLoad, 0));
            }
            UnaryOp::Not => {
                self.compile_expr(func, operand);
                func.emit(Instruction::simple(Opcode::LNot));
            }
            UnaryOp::BitNot => {
                self.compile_expr(func, operand);
                func.emit(Instruction::simple(Opcode::INot));
            }
            UnaryOp::Neg => {
                let is_float = self.is_float_typed(operand);
                self.compile_expr(func, operand);
                func.emit(Instruction::simple(if is_float { Opcode::FNeg } else { Opcode::INeg }));
            }
        }
    }

    fn compile_binary(&mut self, func: &mut Function, op: BinaryOp, lhs: &Expr, rhs: &Expr) {
        match op {
            BinaryOp::And => {
                self.compile_expr(func, lhs);
                func.emit(Instruction::simple(Opcode::Dup));
                let at = func.emit(Instruction::new(Opcode::IfFalse, 0));
                func.emit(Instruction::simple(Opcode::Pop));
                self.compile_expr(func, rhs);
                func.patch_jump_here(at);
                return;
            }
            BinaryOp::Or => {
                self.compile_expr(func, lhs);
                func.emit(Instruction::simple(Opcode::Dup));
                let at = func.emit(Instruction::new(Opcode::IfTrue, 0));
                func.emit(Instruction::simple(Opcode::Pop));
                self.compile_expr(func, rhs);
                func.patch_jump_here(at);
                return;
            }
            _ => {}
        }

        let is_float = self.is_float_typed(lhs);
        self.compile_expr(func, lhs);
        self.compile_expr(func, rhs);
        let opcode = match op {
            BinaryOp::Add => if is_float { Opcode::FAdd } else { Opcode::IAdd },
            BinaryOp::Sub => if is_float { Opcode::FSub } else { Opcode::ISub },
            BinaryOp::Mul => if is_float { Opcode::FMul } else { Opcode::IMul },
            BinaryOp::Div => if is_float { Opcode::FDiv } else { Opcode::IDiv },
            BinaryOp::Rem => Opcode::IRem,
            BinaryOp::Shl => Opcode::IShl,
            BinaryOp::Shr => Opcode::IShr,
            BinaryOp::BitAnd => Opcode::IAnd,
            BinaryOp::BitOr => Opcode::IOr,
            BinaryOp::BitXor => Opcode::IXor,
            BinaryOp::Eq => if is_float { Opcode::FEq } else { Opcode::IEq },
            BinaryOp::Ne => if is_float { Opcode::FNe } else { Opcode::INe },
            BinaryOp::Lt => if is_float { Opcode::FLt } else { Opcode::ILt },
            BinaryOp::Le => if is_float { Opcode::FLe } else { Opcode::ILe },
            BinaryOp::Gt => if is_float { Opcode::FGt } else { Opcode::IGt },
            BinaryOp::Ge => if is_float { Opcode::FGe } else { Opcode::IGe },
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        };
        func.emit(Instruction::simple(opcode));
    }

    fn compile_call(&mut self, func: &mut Function, callee: &Expr, args: &[Expr]) {
        if let ExprKind::Ident(name) = &callee.kind {
            if self.frame().slot_of(name).is_none() {
                if let Some(&target) = self.scan.by_name.get(name) {
                    for arg in args {
                        self.compile_expr(func, arg);
                    }
                    func.emit(Instruction::new(Opcode::InvokeStatic, target.0 as u64));
                    return;
                }
                if let Some(native_idx) = Self::native_index_of(name) {
                    for arg in args {
                        self.compile_expr(func, arg);
                    }
                    func.emit(Instruction::new(Opcode::InvokeNative, native_idx));
                    return;
                }
                unreachable!("typechecker already rejected calls to undefined names");
            }
        }

        for arg in args {
            self.compile_expr(func, arg);
        }
        self.compile_callable_value(func, callee);
        func.emit(Instruction::simple(Opcode::InvokeDynamic));
    }

    /// `new_ closure-type; dup; push fn_index; wstore 0; for each capture
    /// slot i: dup; load capture_slot; wstore i+1`.
    fn compile_function_literal(&mut self, func: &mut Function, literal_id: crate::ast::NodeId) {
        let literal_index = self.scan.by_node[&literal_id];
        let literal_frame = self.frames[&literal_index].clone();
        let value_ty = self.annotation.value_types[&literal_index];

        func.emit(Instruction::new(Opcode::New, value_ty.0 as u64));
        func.emit(Instruction::simple(Opcode::Dup));
        func.emit(Instruction::new(Opcode::Push, literal_index.0 as u64));
        func.emit(Instruction::new(Opcode::WStore, 0));
        for (i, capture_name) in literal_frame.captures.iter().enumerate() {
            // A captured name is always Escaped or Free in the enclosing
            // frame, so its slot already holds a heap box pointer. Copy
            // that pointer verbatim (a bare slot load, not
            // `emit_read_local`'s load-then-dereference) so the new
            // closure shares the same box as the enclosing frame instead
            // of capturing a snapshot of its current value.
            let slot = self.frame().slot_of(capture_name).expect("capture must be bound in the enclosing frame") as u64;
            func.emit(Instruction::simple(Opcode::Dup));
            func.emit(Instruction::new(Opcode::Load, slot));
            func.emit(Instruction::new(Opcode::WStore, (i + 1) as u64));
        }
    }

    fn is_float_typed(&self, expr: &Expr) -> bool {
        self.annotation.expr_types.get(&expr.id).copied().flatten() == Some(TypeTable::FLOAT)
    }
}
