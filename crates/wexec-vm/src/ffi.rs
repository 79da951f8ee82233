//! Host-call dispatch.
//!
//! The host-call set is closed and known at build time, so calls are
//! dispatched on a tagged variant rather than through virtual dispatch.
//! The evaluator never calls into here; call opcodes are placeholder
//! traps, and the embedder drives host calls between instructions.

use std::io;

use wexec_core::Trap;

use crate::context::Context;

/// Identifier of a host call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallId {
    /// Copy bytes out of linear memory into the host's output sink.
    Write,
    /// Copy bytes from the host's input source into linear memory.
    Read,
    /// Fail the run on request.
    Fail,
}

/// Dispatches host calls against a context.
///
/// Owns the host-side endpoints; the sandbox side of every transfer is
/// bounds-checked through the context.
pub struct FfiHandler {
    output: Box<dyn io::Write>,
    input: Option<Box<dyn io::Read>>,
}

impl FfiHandler {
    pub fn new(output: Box<dyn io::Write>) -> Self {
        Self {
            output,
            input: None,
        }
    }

    /// Attach an input source for `CallId::Read`.
    pub fn with_input(mut self, input: Box<dyn io::Read>) -> Self {
        self.input = Some(input);
        self
    }

    /// Dispatch one host call.
    ///
    /// Write and Read pop a length and then an address from the operand
    /// stack, both int32. A negative length is out of bounds.
    pub fn call(&mut self, id: CallId, cx: &mut Context<'_>) -> Result<(), Trap> {
        match id {
            CallId::Write => {
                let len = pop_len(cx)?;
                let addr = cx.pop_int32()?;
                let written = {
                    let bytes = cx.heap_bytes(addr, len)?;
                    self.output.write_all(bytes)
                };
                if written.is_err() {
                    return Err(cx.trap(Trap::HostFailure));
                }
                Ok(())
            }
            CallId::Read => {
                let len = pop_len(cx)?;
                let addr = cx.pop_int32()?;
                let input = match self.input.as_mut() {
                    Some(input) => input,
                    None => return Err(cx.trap(Trap::HostFailure)),
                };
                let filled = {
                    let bytes = cx.heap_bytes_mut(addr, len)?;
                    input.read_exact(bytes)
                };
                if filled.is_err() {
                    return Err(cx.trap(Trap::HostFailure));
                }
                Ok(())
            }
            CallId::Fail => Err(cx.trap(Trap::HostFailure)),
        }
    }
}

fn pop_len(cx: &mut Context<'_>) -> Result<usize, Trap> {
    let len = cx.pop_int32()?;
    match usize::try_from(len) {
        Ok(len) => Ok(len),
        Err(_) => Err(cx.trap(Trap::MemoryOutOfBounds)),
    }
}
