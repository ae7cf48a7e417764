//! Native function table
//!
//! Stable indices, each handler freely popping its own arguments off the
//! calling thread's operand stack and pushing its own results, per
//! `invoke_native`'s contract.

use super::{RuntimeContext, Thread};
use crate::scanner::FunctionIndex;
use crate::symbol::StringIndex;
use crate::value::{word_to_float, word_to_int, RuntimeError, Word};
use crate::vm::channel::ChannelIndex;
use std::sync::Arc;

pub const NEW_THREAD: u64 = 0;
pub const NEW_CHAN: u64 = 1;
pub const CHAN_SEND: u64 = 2;
pub const CHAN_RECV: u64 = 3;
pub const SPRINT: u64 = 4;
pub const IPRINT: u64 = 5;
pub const FPRINT: u64 = 6;

/// Dispatch one native call by its stable index.
pub fn dispatch(idx: u64, thread: &mut Thread) -> Result<(), RuntimeError> {
    match idx {
        NEW_THREAD => new_thread(thread),
        NEW_CHAN => new_chan(thread),
        CHAN_SEND => chan_send(thread),
        CHAN_RECV => chan_recv(thread),
        SPRINT => sprint(thread),
        IPRINT => iprint(thread),
        FPRINT => fprint(thread),
        other => Err(RuntimeError::InvalidBytecode(format!(
            "no native function at index {other}"
        ))),
    }
}

/// `…, args…, closure → …`: spawn a goroutine invoking the closure on args.
fn new_thread(thread: &mut Thread) -> Result<(), RuntimeError> {
    let closure_addr = thread.pop()?;
    let fi = FunctionIndex(thread.ctx.heap.read_word(closure_addr) as u32);
    let target = thread.ctx.functions.get(fi).clone();

    let mut args = Vec::with_capacity(target.argc as usize);
    for _ in 0..target.argc {
        args.push(thread.pop()?);
    }

    let mut locals = vec![0 as Word; target.varc as usize];
    for c in 0..target.capc as usize {
        locals[c] = thread.ctx.heap.read_word(closure_addr + 8 * (1 + c as u64));
    }
    let capc = target.capc as usize;
    let argc = args.len();
    for (j, value) in args.into_iter().enumerate() {
        locals[capc + argc - 1 - j] = value;
    }

    let ctx = thread.ctx.clone();
    let operand_cap = thread.operand_cap;
    let frame_cap = thread.frame_cap;
    ctx.goroutines.register();
    std::thread::spawn(move || {
        let spawned_ctx: Arc<RuntimeContext> = ctx.clone();
        let mut worker = Thread::new(spawned_ctx, operand_cap, frame_cap);
        if let Err(err) = worker.run(fi, locals) {
            eprintln!("goroutine aborted: {err}");
        }
        ctx.goroutines.deregister();
    });
    Ok(())
}

/// `…, capacity → …, channel`: create a channel of the given capacity.
fn new_chan(thread: &mut Thread) -> Result<(), RuntimeError> {
    let capacity = word_to_int(thread.pop()?);
    if capacity < 0 {
        return Err(RuntimeError::Channel(
            "channel capacity must be non-negative".to_string(),
        ));
    }
    let idx = thread.ctx.channels.new_channel(capacity as u64);
    thread.push(idx.0 as Word)
}

/// `…, channel, item_box → …`: push a boxed value onto a channel, blocking
/// while full.
fn chan_send(thread: &mut Thread) -> Result<(), RuntimeError> {
    let item_box = thread.pop()?;
    let channel = thread.pop()?;
    let chan = thread.ctx.channels.get(ChannelIndex(channel as u32));
    chan.push(item_box);
    Ok(())
}

/// `…, channel → …, item_box`: pop a boxed value from a channel, blocking
/// while empty.
fn chan_recv(thread: &mut Thread) -> Result<(), RuntimeError> {
    let channel = thread.pop()?;
    let chan = thread.ctx.channels.get(ChannelIndex(channel as u32));
    let item_box = chan.pop();
    thread.push(item_box)
}

/// `…, string_box → …`: write the boxed string's bytes to stdout.
fn sprint(thread: &mut Thread) -> Result<(), RuntimeError> {
    let string_box = thread.pop()?;
    let idx = StringIndex(thread.ctx.heap.read_word(string_box) as u32);
    let s = thread.ctx.strings.get(idx);
    thread.ctx.output.write(s.as_bytes());
    Ok(())
}

/// `…, int → …`: write a decimal integer to stdout.
fn iprint(thread: &mut Thread) -> Result<(), RuntimeError> {
    let value = word_to_int(thread.pop()?);
    thread.ctx.output.write(value.to_string().as_bytes());
    Ok(())
}

/// `…, float → …`: write a decimal float to stdout.
fn fprint(thread: &mut Thread) -> Result<(), RuntimeError> {
    let value = word_to_float(thread.pop()?);
    thread.ctx.output.write(value.to_string().as_bytes());
    Ok(())
}
