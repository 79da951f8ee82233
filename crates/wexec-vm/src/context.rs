//! The machine context: everything a single instruction's interpretation
//! may touch. The evaluator mutates nothing else.

use wexec_core::{LiteralPool, Trap, TrapHandler, Value};

use crate::memory::{LinearMemory, Scalar};
use crate::nan::NanBits;

/// Execution context for the instruction evaluator.
///
/// Owns the operand stack; borrows the local and global slots, the linear
/// memory, the NaN policy, the module's literal pool and address table,
/// and the trap handler for the duration of one run.
pub struct Context<'a> {
    stack: Vec<Value>,
    locals: &'a mut [Value],
    globals: &'a mut [Value],
    memory: &'a mut LinearMemory,
    nan_bits: &'a mut NanBits,
    literals: &'a LiteralPool,
    address_table: &'a [u32],
    handler: &'a mut dyn TrapHandler,
}

impl<'a> Context<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        locals: &'a mut [Value],
        globals: &'a mut [Value],
        memory: &'a mut LinearMemory,
        nan_bits: &'a mut NanBits,
        literals: &'a LiteralPool,
        address_table: &'a [u32],
        handler: &'a mut dyn TrapHandler,
    ) -> Self {
        Self {
            stack: Vec::new(),
            locals,
            globals,
            memory,
            nan_bits,
            literals,
            address_table,
            handler,
        }
    }

    /// Report a fatal trap to the handler and hand it back for
    /// propagation.
    pub fn trap(&mut self, trap: Trap) -> Trap {
        self.handler.trap(&trap);
        trap
    }

    // ========================================================================
    // Operand stack
    // ========================================================================

    /// All values on the stack, bottom to top.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Consume the context, yielding the final operand stack.
    pub fn into_stack(self) -> Vec<Value> {
        self.stack
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, Trap> {
        match self.stack.pop() {
            Some(v) => Ok(v),
            None => Err(self.trap(Trap::StackUnderflow)),
        }
    }

    pub fn push_int32(&mut self, v: i32) {
        self.stack.push(Value::I32(v));
    }

    pub fn push_float32(&mut self, v: f32) {
        self.stack.push(Value::F32(v));
    }

    pub fn push_float64(&mut self, v: f64) {
        self.stack.push(Value::F64(v));
    }

    /// Booleans are int32 results: 1 for true, 0 for false.
    pub fn push_boolean(&mut self, v: bool) {
        self.push_int32(i32::from(v));
    }

    pub fn pop_int32(&mut self) -> Result<i32, Trap> {
        let v = self.pop()?;
        match v.as_i32() {
            Some(x) => Ok(x),
            None => Err(self.type_mismatch("int32", v)),
        }
    }

    pub fn pop_float32(&mut self) -> Result<f32, Trap> {
        let v = self.pop()?;
        match v.as_f32() {
            Some(x) => Ok(x),
            None => Err(self.type_mismatch("float32", v)),
        }
    }

    pub fn pop_float64(&mut self) -> Result<f64, Trap> {
        let v = self.pop()?;
        match v.as_f64() {
            Some(x) => Ok(x),
            None => Err(self.type_mismatch("float64", v)),
        }
    }

    fn type_mismatch(&mut self, expected: &'static str, got: Value) -> Trap {
        self.trap(Trap::TypeMismatch {
            expected,
            got: got.type_name(),
        })
    }

    // ========================================================================
    // Local and global slots
    // ========================================================================

    pub fn load_local(&mut self, idx: u32) -> Result<Value, Trap> {
        let i = self.local_index(idx)?;
        Ok(self.locals[i])
    }

    pub fn store_local(&mut self, idx: u32, value: Value) -> Result<(), Trap> {
        let i = self.local_index(idx)?;
        self.locals[i] = value;
        Ok(())
    }

    pub fn load_global(&mut self, idx: u32) -> Result<Value, Trap> {
        let i = self.global_index(idx)?;
        Ok(self.globals[i])
    }

    pub fn store_global(&mut self, idx: u32, value: Value) -> Result<(), Trap> {
        let i = self.global_index(idx)?;
        self.globals[i] = value;
        Ok(())
    }

    fn local_index(&mut self, idx: u32) -> Result<usize, Trap> {
        let i = idx as usize;
        if i >= self.locals.len() {
            return Err(self.trap(Trap::LocalIndexOutOfBounds(idx)));
        }
        Ok(i)
    }

    fn global_index(&mut self, idx: u32) -> Result<usize, Trap> {
        let i = idx as usize;
        if i >= self.globals.len() {
            return Err(self.trap(Trap::GlobalIndexOutOfBounds(idx)));
        }
        Ok(i)
    }

    // ========================================================================
    // Heap
    // ========================================================================

    /// Load a scalar at `addr + offset`. The effective address is computed
    /// in 64 bits so the memory's width check catches negative or
    /// overflowing sums; nothing wraps silently.
    pub fn load_heap<T: Scalar>(
        &mut self,
        addr: i32,
        offset: i32,
        p2align: u8,
    ) -> Result<T, Trap> {
        let ea = i64::from(addr) + i64::from(offset);
        self.memory.load(ea, p2align, &mut *self.handler)
    }

    /// Store a scalar at `addr + offset`.
    pub fn store_heap<T: Scalar>(
        &mut self,
        addr: i32,
        offset: i32,
        p2align: u8,
        value: T,
    ) -> Result<(), Trap> {
        let ea = i64::from(addr) + i64::from(offset);
        self.memory.store(ea, p2align, &mut *self.handler, value)
    }

    /// Bounds-checked byte view into the heap, for host-call copies.
    pub fn heap_bytes(&mut self, addr: i32, len: usize) -> Result<&[u8], Trap> {
        self.memory.bytes(i64::from(addr), len, &mut *self.handler)
    }

    /// Mutable bounds-checked byte view into the heap.
    pub fn heap_bytes_mut(&mut self, addr: i32, len: usize) -> Result<&mut [u8], Trap> {
        self.memory.bytes_mut(i64::from(addr), len, &mut *self.handler)
    }

    // ========================================================================
    // Literals and addresses
    // ========================================================================

    pub fn read_literal_int32(&mut self, payload: u32) -> Result<i32, Trap> {
        match self.literals.i32(payload) {
            Some(x) => Ok(x),
            None => Err(self.trap(Trap::LiteralIndexOutOfBounds(payload))),
        }
    }

    pub fn read_literal_float32(&mut self, payload: u32) -> Result<f32, Trap> {
        match self.literals.f32(payload) {
            Some(x) => Ok(x),
            None => Err(self.trap(Trap::LiteralIndexOutOfBounds(payload))),
        }
    }

    pub fn read_literal_float64(&mut self, payload: u32) -> Result<f64, Trap> {
        match self.literals.f64(payload) {
            Some(x) => Ok(x),
            None => Err(self.trap(Trap::LiteralIndexOutOfBounds(payload))),
        }
    }

    /// The address of a payload-identified location, from the module's
    /// address table.
    pub fn addressof(&mut self, payload: u32) -> Result<i32, Trap> {
        match self.address_table.get(payload as usize) {
            Some(&addr) => Ok(addr as i32),
            None => Err(self.trap(Trap::AddressIndexOutOfBounds(payload))),
        }
    }

    /// The session's NaN policy, for transforming NaN results.
    pub fn nan_bits(&mut self) -> &mut NanBits {
        self.nan_bits
    }
}
