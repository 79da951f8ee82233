//! The execution session: the run loop and the state that outlives a
//! single instruction.
//!
//! A session owns the linear memory, the global slots and the NaN policy
//! for one run. Nothing here is ambient or process-global; embedders
//! construct a session, feed it a program and read the outcome.

use log::debug;

use wexec_core::{LiteralPool, Node, Trap, TrapHandler, ValType, Value};

use crate::context::Context;
use crate::eval::{evaluate_float32, evaluate_float64, evaluate_int32};
use crate::memory::LinearMemory;
use crate::nan::{NanBits, NanKind};

/// Run-level outcome, reported to the embedding shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    /// A fatal trap was raised.
    Failure,
    /// The linear memory could not be resized.
    Oom,
    /// The instruction budget was exhausted.
    Timeout,
}

impl Status {
    /// Shell exit code for this status. Oom mirrors the Linux OOM killer
    /// (128 + SIGKILL); Timeout mirrors timeout(1).
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Failure => 1,
            Status::Oom => 128 + 9,
            Status::Timeout => 124,
        }
    }

    fn classify(trap: &Trap) -> Status {
        match trap {
            Trap::MemoryResizeFailed => Status::Oom,
            _ => Status::Failure,
        }
    }
}

/// A decoded program: instruction nodes in execution order, each tagged
/// with the type its result is interpreted at, plus the module-level
/// tables the context reads. Decoding itself is the loader's concern.
#[derive(Debug, Default)]
pub struct Program {
    pub code: Vec<(ValType, Node)>,
    pub literals: LiteralPool,
    pub local_types: Vec<ValType>,
    pub global_types: Vec<ValType>,
    pub address_table: Vec<u32>,
}

/// Session construction parameters.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    pub nan_kind: NanKind,
    /// Instructions allowed before the run times out. `None` is
    /// unbounded.
    pub max_instructions: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nan_kind: NanKind::Random,
            max_instructions: None,
        }
    }
}

/// What a finished run leaves behind.
#[derive(Debug, PartialEq)]
pub struct RunOutcome {
    pub status: Status,
    /// The operand stack at the point the run ended.
    pub stack: Vec<Value>,
}

/// One execution session. Holds the memory, the global slots and the NaN
/// policy across instructions; the evaluator borrows them per node.
pub struct Session {
    nan_bits: NanBits,
    memory: LinearMemory,
    globals: Vec<Value>,
    max_instructions: Option<u64>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            nan_bits: NanBits::new(config.nan_kind),
            memory: LinearMemory::new(),
            globals: Vec::new(),
            max_instructions: config.max_instructions,
        }
    }

    pub fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    /// The linear memory, for sizing it before a run. Programs have no
    /// grow opcode; the embedder decides the sandbox size.
    pub fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    /// The global slots as left by the last run.
    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    pub fn nan_bits_mut(&mut self) -> &mut NanBits {
        &mut self.nan_bits
    }

    /// Execute `program` to completion, a trap, or budget exhaustion.
    ///
    /// Nodes run in order, single-threaded and non-suspending. The
    /// instruction budget is checked before each node.
    pub fn run(&mut self, program: &Program, handler: &mut dyn TrapHandler) -> RunOutcome {
        let budget = self.max_instructions;

        let mut locals = match zeroed_slots(&program.local_types, handler) {
            Ok(slots) => slots,
            Err(_) => {
                return RunOutcome {
                    status: Status::Failure,
                    stack: Vec::new(),
                }
            }
        };
        self.globals = match zeroed_slots(&program.global_types, handler) {
            Ok(slots) => slots,
            Err(_) => {
                return RunOutcome {
                    status: Status::Failure,
                    stack: Vec::new(),
                }
            }
        };

        debug!("running {} instruction nodes", program.code.len());

        let mut cx = Context::new(
            &mut locals,
            &mut self.globals,
            &mut self.memory,
            &mut self.nan_bits,
            &program.literals,
            &program.address_table,
            handler,
        );

        let mut executed: u64 = 0;
        for &(ty, node) in &program.code {
            if let Some(max) = budget {
                if executed >= max {
                    debug!("instruction budget of {max} exhausted");
                    return RunOutcome {
                        status: Status::Timeout,
                        stack: cx.into_stack(),
                    };
                }
            }
            executed += 1;

            let result = match ty {
                ValType::Int32 => evaluate_int32(node, &mut cx),
                ValType::Float32 => evaluate_float32(node, &mut cx),
                ValType::Float64 => evaluate_float64(node, &mut cx),
                ValType::Int64 | ValType::Void => Err(cx.trap(Trap::UnsupportedEvalType(ty))),
            };
            if let Err(trap) = result {
                return RunOutcome {
                    status: Status::classify(&trap),
                    stack: cx.into_stack(),
                };
            }
        }

        debug!("run complete after {executed} instructions");
        RunOutcome {
            status: Status::Success,
            stack: cx.into_stack(),
        }
    }
}

/// Zero-initialized slots for the given types. Slot types must have a
/// zero value; Int64 and Void slots are rejected up front.
fn zeroed_slots(types: &[ValType], handler: &mut dyn TrapHandler) -> Result<Vec<Value>, Trap> {
    let mut slots = Vec::with_capacity(types.len());
    for &ty in types {
        match ty.zero_value() {
            Some(v) => slots.push(v),
            None => {
                let trap = Trap::UnsupportedEvalType(ty);
                handler.trap(&trap);
                return Err(trap);
            }
        }
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wexec_core::{LogTrapHandler, Opcode};

    fn int32_node(op: Opcode, payload: u32) -> (ValType, Node) {
        (ValType::Int32, Node::new(op, payload))
    }

    fn session() -> Session {
        Session::new(SessionConfig {
            nan_kind: NanKind::Canonical,
            max_instructions: None,
        })
    }

    #[test]
    fn default_config_is_unbounded_random() {
        let config = SessionConfig::default();
        assert_eq!(config.nan_kind, NanKind::Random);
        assert_eq!(config.max_instructions, None);
    }

    #[test]
    fn exit_codes_match_the_shell_contract() {
        assert_eq!(Status::Success.exit_code(), 0);
        assert_eq!(Status::Failure.exit_code(), 1);
        assert_eq!(Status::Oom.exit_code(), 137);
        assert_eq!(Status::Timeout.exit_code(), 124);
    }

    #[test]
    fn empty_program_succeeds_with_empty_stack() {
        let mut handler = LogTrapHandler;
        let outcome = session().run(&Program::default(), &mut handler);
        assert_eq!(outcome.status, Status::Success);
        assert!(outcome.stack.is_empty());
    }

    #[test]
    fn arithmetic_program_leaves_its_result() {
        let mut program = Program::default();
        let two = program.literals.push_i32(2);
        let three = program.literals.push_i32(3);
        program.code = vec![
            int32_node(Opcode::Literal, two),
            int32_node(Opcode::Literal, three),
            int32_node(Opcode::Int32Add, 0),
        ];

        let mut handler = LogTrapHandler;
        let outcome = session().run(&program, &mut handler);
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.stack, vec![Value::I32(5)]);
    }

    #[test]
    fn division_by_zero_is_a_failure_with_nothing_pushed() {
        let mut program = Program::default();
        let five = program.literals.push_i32(5);
        let zero = program.literals.push_i32(0);
        program.code = vec![
            int32_node(Opcode::Literal, five),
            int32_node(Opcode::Literal, zero),
            int32_node(Opcode::Int32SDiv, 0),
        ];

        let mut handler = LogTrapHandler;
        let outcome = session().run(&program, &mut handler);
        assert_eq!(outcome.status, Status::Failure);
        // Both operands consumed, no result pushed.
        assert!(outcome.stack.is_empty());
    }

    #[test]
    fn budget_exhaustion_is_a_timeout() {
        let mut program = Program::default();
        let one = program.literals.push_i32(1);
        program.code = vec![int32_node(Opcode::Literal, one); 10];

        let mut session = Session::new(SessionConfig {
            nan_kind: NanKind::Canonical,
            max_instructions: Some(3),
        });
        let mut handler = LogTrapHandler;
        let outcome = session.run(&program, &mut handler);
        assert_eq!(outcome.status, Status::Timeout);
        assert_eq!(outcome.stack.len(), 3);
    }

    #[test]
    fn unsized_memory_store_is_a_failure() {
        let mut program = Program::default();
        let addr = program.literals.push_i32(0);
        let byte = program.literals.push_i32(0x41);
        program.code = vec![
            int32_node(Opcode::Literal, byte),
            int32_node(Opcode::Literal, addr),
            int32_node(Opcode::StoreHeap, 0),
        ];

        let mut handler = LogTrapHandler;
        let outcome = session().run(&program, &mut handler);
        assert_eq!(outcome.status, Status::Failure);
    }

    #[test]
    fn heap_round_trip_through_a_run() {
        let mut program = Program::default();
        let addr = program.literals.push_i32(0);
        let word = program.literals.push_i32(0x41);
        program.code = vec![
            int32_node(Opcode::Literal, word),
            int32_node(Opcode::Literal, addr),
            int32_node(Opcode::StoreHeap, 0),
            int32_node(Opcode::Literal, addr),
            int32_node(Opcode::LoadHeap, 0),
        ];

        let mut session = session();
        let mut handler = LogTrapHandler;
        session.memory_mut().resize(64, &mut handler).unwrap();
        let outcome = session.run(&program, &mut handler);
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.stack, vec![Value::I32(0x41), Value::I32(0x41)]);
    }

    #[test]
    fn globals_survive_the_run() {
        let mut program = Program::default();
        program.global_types = vec![ValType::Int32, ValType::Float64];
        let seven = program.literals.push_i32(7);
        program.code = vec![
            int32_node(Opcode::Literal, seven),
            int32_node(Opcode::StoreGlobal, 0),
        ];

        let mut session = session();
        let mut handler = LogTrapHandler;
        let outcome = session.run(&program, &mut handler);
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(session.globals(), &[Value::I32(7), Value::F64(0.0)]);
    }

    #[test]
    fn int64_nodes_are_unsupported() {
        let mut program = Program::default();
        program.code = vec![(ValType::Int64, Node::op(Opcode::Int32Add))];

        let mut handler = LogTrapHandler;
        let outcome = session().run(&program, &mut handler);
        assert_eq!(outcome.status, Status::Failure);
    }

    #[test]
    fn void_slot_types_fail_before_execution() {
        let mut program = Program::default();
        program.local_types = vec![ValType::Void];
        let one = program.literals.push_i32(1);
        program.code = vec![int32_node(Opcode::Literal, one)];

        let mut handler = LogTrapHandler;
        let outcome = session().run(&program, &mut handler);
        assert_eq!(outcome.status, Status::Failure);
        assert!(outcome.stack.is_empty());
    }
}
