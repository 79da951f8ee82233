use thiserror::Error;

use crate::types::ValType;

/// A fatal trap: unrecoverable for the current execution.
///
/// Trap reasons carry enough information for a surrounding run loop to
/// classify the outcome (failure vs. out-of-memory); the classification
/// itself is the run loop's concern.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Trap {
    #[error("linear memory address out of bounds")]
    MemoryOutOfBounds,
    #[error("linear memory resize failed")]
    MemoryResizeFailed,
    #[error("signed integer division by zero")]
    SignedDivisionByZero,
    #[error("unsigned integer division by zero")]
    UnsignedDivisionByZero,
    #[error("unsigned integer remainder by zero")]
    RemainderByZero,
    #[error("signed integer division overflow")]
    SignedDivisionOverflow,
    #[error("float to signed integer conversion failure")]
    SignedConversionFailure,
    #[error("float to unsigned integer conversion failure")]
    UnsignedConversionFailure,
    #[error("direct call unimplemented")]
    UnimplementedDirectCall,
    #[error("indirect call unimplemented")]
    UnimplementedIndirectCall,
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("value type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    #[error("local index {0} out of bounds")]
    LocalIndexOutOfBounds(u32),
    #[error("global index {0} out of bounds")]
    GlobalIndexOutOfBounds(u32),
    #[error("literal index {0} out of bounds")]
    LiteralIndexOutOfBounds(u32),
    #[error("address table index {0} out of bounds")]
    AddressIndexOutOfBounds(u32),
    #[error("opcode not valid for this evaluation type")]
    UnsupportedOpcode,
    #[error("no evaluator for value type {0:?}")]
    UnsupportedEvalType(ValType),
    #[error("host call failed")]
    HostFailure,
}

/// Receiver for fatal traps and non-fatal slow-path notices.
///
/// `trap` is notified of every fatal trap before it propagates to the
/// caller as an error. `slow` is a non-fatal advisory; execution continues
/// (it is used solely for unaligned heap access notices).
pub trait TrapHandler {
    fn trap(&mut self, trap: &Trap);

    fn slow(&mut self, reason: &str);
}

/// Default trap handler reporting through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTrapHandler;

impl TrapHandler for LogTrapHandler {
    fn trap(&mut self, trap: &Trap) {
        log::error!("trap: {trap}");
    }

    fn slow(&mut self, reason: &str) {
        log::warn!("slow path: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trap_messages_match_the_reason_strings() {
        assert_eq!(
            Trap::MemoryOutOfBounds.to_string(),
            "linear memory address out of bounds"
        );
        assert_eq!(
            Trap::SignedDivisionOverflow.to_string(),
            "signed integer division overflow"
        );
        assert_eq!(
            Trap::RemainderByZero.to_string(),
            "unsigned integer remainder by zero"
        );
        assert_eq!(
            Trap::SignedConversionFailure.to_string(),
            "float to signed integer conversion failure"
        );
    }

    #[test]
    fn type_mismatch_names_both_types() {
        let trap = Trap::TypeMismatch {
            expected: "int32",
            got: "float64",
        };
        assert_eq!(
            trap.to_string(),
            "value type mismatch: expected int32, got float64"
        );
    }
}
