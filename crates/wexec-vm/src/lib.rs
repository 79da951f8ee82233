//! WebAssembly-style execution core
//!
//! This crate provides the sandboxed execution core: linear memory, the
//! NaN bit-pattern policy, and the per-opcode instruction evaluator,
//! driven by a session-level run loop.
//!
//! # Architecture
//!
//! The core handles:
//! - Linear memory (bounds-checked, fail-closed byte sandbox)
//! - NaN bit-pattern policy (canonical, inverse, or random payloads)
//! - The machine context (operand stack, local and global slots)
//! - Per-opcode interpretation for int32, float32 and float64 nodes
//! - Run-level outcomes (success, failure, OOM, timeout)
//!
//! Module decoding, call dispatch and the command-line shell are external
//! collaborators; the evaluator itself is stateless and resumable between
//! nodes.
//!
//! # Example
//!
//! ```ignore
//! use wexec_core::LogTrapHandler;
//! use wexec_vm::{Program, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default());
//! let mut handler = LogTrapHandler;
//!
//! let program: Program = load_program();
//! let outcome = session.run(&program, &mut handler);
//! std::process::exit(outcome.status.exit_code());
//! ```

mod context;
mod eval;
mod ffi;
mod memory;
mod nan;
mod session;

// Re-export public types
pub use context::Context;
pub use eval::{evaluate, evaluate_float32, evaluate_float64, evaluate_int32, EvalType};
pub use ffi::{CallId, FfiHandler};
pub use memory::{LinearMemory, Scalar};
pub use nan::{NanBits, NanKind, ParseNanKindError};
pub use session::{Program, RunOutcome, Session, SessionConfig, Status};
