//! Emitter — compiler pass 4
//!
//! Lowers every function the [`scanner`](crate::scanner) discovered into a
//! flat [`Function`], using the [`analyzer`](crate::analyzer)'s frame
//! categorisation and the [`typechecker`](crate::typechecker)'s type
//! annotations. The scanner already flattened top-level declarations and
//! nested function literals into one list ordered by [`FunctionIndex`], so
//! compilation is a single pass over that list: a function literal's own
//! body is compiled once, here, when its turn comes up; everywhere else it
//! is referenced, only the closure-allocation sequence is emitted.

mod expr;
mod stmt;

use crate::analyzer::{FrameInfo, VarCategory};
use crate::bytecode::{Function, FunctionTable, Instruction, Opcode};
use crate::scanner::{FunctionIndex, ScanResult, ScannedFunction};
use crate::symbol::StringPool;
use crate::typechecker::TypeAnnotation;
use crate::types::{Type, TypeIndex};
use crate::vm::native;
use std::collections::HashMap;

pub struct Compiler<'a> {
    scan: &'a ScanResult,
    frames: &'a HashMap<FunctionIndex, FrameInfo>,
    annotation: &'a TypeAnnotation,
    strings: &'a mut StringPool,
    current_frame: Option<&'a FrameInfo>,
}

impl<'a> Compiler<'a> {
    pub fn new(
        scan: &'a ScanResult,
        frames: &'a HashMap<FunctionIndex, FrameInfo>,
        annotation: &'a TypeAnnotation,
        strings: &'a mut StringPool,
    ) -> Self {
        Self {
            scan,
            frames,
            annotation,
            strings,
            current_frame: None,
        }
    }

    /// Compile every scanned function into a [`FunctionTable`], in
    /// [`FunctionIndex`] order.
    pub fn compile(mut self) -> FunctionTable {
        let mut table = FunctionTable::new();
        for scanned in &self.scan.functions {
            let func = self.compile_function(scanned);
            table.push(func);
        }
        table
    }

    fn compile_function(&mut self, scanned: &ScannedFunction) -> Function {
        let frame = &self.frames[&scanned.index];
        let mut func = Function::new(
            scanned.index,
            scanned.name.clone(),
            frame.capc(),
            frame.argc(),
            frame.varc(),
        );
        for name in frame.captures.iter().chain(frame.locals.iter()) {
            if matches!(
                frame.category_of(name),
                Some(VarCategory::Escaped) | Some(VarCategory::Free)
            ) {
                func.mark_pointer_slot(frame.slot_of(name).unwrap() as u16);
            }
        }

        self.current_frame = Some(frame);
        self.emit_prologue(&mut func, scanned);
        self.compile_block(&mut func, &scanned.body);
        if func.code.last().map(|i| i.opcode) != Some(Opcode::Ret) {
            func.emit(Instruction::simple(Opcode::Ret));
        }
        self.current_frame = None;
        func
    }

    /// Parameters captured by an inner closure arrive as plain words (via
    /// the generic `invoke_static`/`invoke_dynamic` materialisation) and
    /// must be boxed in place before the body runs.
    fn emit_prologue(&self, func: &mut Function, scanned: &ScannedFunction) {
        let frame = self.current_frame.unwrap();
        let param_types = self.param_types(scanned.index);
        for (i, param) in scanned.sig.params.iter().enumerate() {
            if frame.category_of(&param.name) == Some(VarCategory::Escaped) {
                let slot = frame.slot_of(&param.name).unwrap() as u64;
                let ty = param_types[i];
                func.emit(Instruction::new(Opcode::New, ty.0 as u64));
                func.emit(Instruction::simple(Opcode::Dup));
                func.emit(Instruction::new(Opcode::Load, slot));
                func.emit(Instruction::new(Opcode::WStore, 0));
                func.emit(Instruction::new(Opcode::Store, slot));
            }
        }
    }

    fn param_types(&self, index: FunctionIndex) -> Vec<TypeIndex> {
        let fn_ty = self.annotation.function_types[&index];
        match self.annotation.table.get(fn_ty) {
            Type::Function(params, _) => params.clone(),
            other => unreachable!("function_types always maps to Type::Function, got {other:?}"),
        }
    }

    fn frame(&self) -> &'a FrameInfo {
        self.current_frame.expect("compiling a statement/expression outside a function body")
    }

    /// Emit the read sequence for a local binding already known to live in
    /// this function's frame: a plain slot load if bound, or a load-then-
    /// dereference if the slot holds a box pointer (escaped declaration or
    /// capture of an escaped outer declaration).
    fn emit_read_local(&self, func: &mut Function, name: &str) {
        let frame = self.frame();
        let slot = frame.slot_of(name).expect("name must be bound in the current frame") as u64;
        func.emit(Instruction::new(Opcode::Load, slot));
        if matches!(
            frame.category_of(name),
            Some(VarCategory::Escaped) | Some(VarCategory::Free)
        ) {
            func.emit(Instruction::new(Opcode::WLoad, 0));
        }
    }

    fn native_index_of(name: &str) -> Option<u64> {
        match name {
            "sprint" => Some(native::SPRINT),
            "iprint" => Some(native::IPRINT),
            "fprint" => Some(native::FPRINT),
            _ => None,
        }
    }
}
