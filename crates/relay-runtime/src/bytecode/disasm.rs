//! Bytecode disassembler
//!
//! Converts a compiled [`Function`] back to human-readable assembly, used
//! for debugging and test fixtures.

use super::{Function, FunctionTable, Opcode};
use std::fmt::Write;

/// Disassemble every function in a table to human-readable text.
pub fn disassemble(table: &FunctionTable) -> String {
    let mut out = String::new();
    for function in table.iter() {
        writeln!(
            out,
            "fn {} #{} capc={} argc={} varc={}",
            function.name.as_deref().unwrap_or("<anon>"),
            function.index.0,
            function.capc,
            function.argc,
            function.varc
        )
        .unwrap();
        disassemble_function(function, &mut out);
        writeln!(out).unwrap();
    }
    out
}

fn disassemble_function(function: &Function, out: &mut String) {
    for (offset, instr) in function.code.iter().enumerate() {
        if instr.opcode.has_payload() {
            writeln!(out, "{offset:04}  {:?} {}", instr.opcode, instr.payload).unwrap();
        } else {
            writeln!(out, "{offset:04}  {:?}", instr.opcode).unwrap();
        }
    }
}

/// Render a single opcode name, used by error messages that reference an
/// instruction without a whole function in hand.
pub fn opcode_name(opcode: Opcode) -> String {
    format!("{opcode:?}")
}
