//! Call-stack activation records
//!
//! Conceptually a frame is bytes laid out on a call-stack arena
//! (`function_index`, `previous_frame_pointer`, `return_program_counter`
//! followed by `varc` local slots). This interpreter keeps the call stack
//! as a `Vec<Frame>` of plain Rust structs instead of raw bytes; the fields
//! below are exactly that layout, just not byte-packed, since nothing here
//! ever addresses a frame through a heap pointer.

use crate::scanner::FunctionIndex;
use crate::value::Word;

/// One activation record.
#[derive(Debug)]
pub struct Frame {
    pub function_index: FunctionIndex,
    /// Cursor into `function_index`'s code; advanced by the fetch loop and
    /// restored verbatim when a callee returns into this frame.
    pub pc: usize,
    /// `varc` word-sized local slots: captures, then parameters, then locals.
    pub locals: Vec<Word>,
}

impl Frame {
    pub fn new(function_index: FunctionIndex, varc: u16) -> Self {
        Self {
            function_index,
            pc: 0,
            locals: vec![0; varc as usize],
        }
    }
}
