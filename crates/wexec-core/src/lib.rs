//! Shared types for the wexec virtual machine.
//!
//! This crate is the leaf of the workspace: the value model, the opcode
//! enumeration, decoded instruction nodes, the per-module literal pool,
//! and the trap taxonomy. The execution engine itself lives in `wexec-vm`.

mod literal;
mod opcode;
mod trap;
mod types;

pub use literal::LiteralPool;
pub use opcode::{Node, Opcode};
pub use trap::{LogTrapHandler, Trap, TrapHandler};
pub use types::{ValType, Value};
