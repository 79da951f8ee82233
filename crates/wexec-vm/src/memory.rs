//! The sandboxed linear memory: a growable byte buffer with bounds- and
//! alignment-checked scalar access.
//!
//! Every failure path tears the memory down to a well-defined empty state
//! before reporting the trap, so a torn-down memory fails closed: later
//! accesses go through the same bounds check against size zero.

use wexec_core::{Trap, TrapHandler};

/// A scalar that can be stored in linear memory.
///
/// Bytes are exchanged little-endian and reinterpreted without validation
/// of the bit pattern; a loaded float may be any pattern, including NaNs.
pub trait Scalar: Copy {
    const SIZE: usize;

    fn from_le(bytes: &[u8]) -> Self;

    fn write_le(self, out: &mut [u8]);
}

impl Scalar for i32 {
    const SIZE: usize = 4;

    fn from_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        i32::from_le_bytes(buf)
    }

    fn write_le(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }
}

impl Scalar for f32 {
    const SIZE: usize = 4;

    fn from_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        f32::from_le_bytes(buf)
    }

    fn write_le(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }
}

impl Scalar for f64 {
    const SIZE: usize = 8;

    fn from_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(buf)
    }

    fn write_le(self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.to_le_bytes());
    }
}

/// The linear memory. Invariant: the buffer's length is always the current
/// size; the buffer is empty exactly when the size is zero (initial state,
/// or after a failed resize or access tore it down).
#[derive(Debug, Default)]
pub struct LinearMemory {
    data: Vec<u8>,
}

impl LinearMemory {
    /// Create an empty memory. Memory is grown only via explicit `resize`.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Tear the memory down and report the trap. The buffer is released
    /// and the size becomes zero; never a partial state.
    fn fail(&mut self, trap: Trap, handler: &mut dyn TrapHandler) -> Trap {
        self.data = Vec::new();
        handler.trap(&trap);
        trap
    }

    fn out_of_bounds(&mut self, handler: &mut dyn TrapHandler) -> Trap {
        self.fail(Trap::MemoryOutOfBounds, handler)
    }

    /// Request the buffer be exactly `new_size` bytes.
    ///
    /// Newly added bytes are zero-initialized; bytes below
    /// `min(old, new)` are preserved. A size that does not fit the native
    /// address width, or a failed allocation, traps and tears the memory
    /// down.
    pub fn resize(&mut self, new_size: u64, handler: &mut dyn TrapHandler) -> Result<(), Trap> {
        let casted = new_size as usize;
        if casted as u64 != new_size {
            return Err(self.fail(Trap::MemoryResizeFailed, handler));
        }
        if casted > self.data.len() {
            let additional = casted - self.data.len();
            if self.data.try_reserve_exact(additional).is_err() {
                return Err(self.fail(Trap::MemoryResizeFailed, handler));
            }
        }
        self.data.resize(casted, 0);
        Ok(())
    }

    /// Read `T::SIZE` bytes at `addr`, reinterpreted little-endian.
    pub fn load<T: Scalar>(
        &mut self,
        addr: i64,
        p2align: u8,
        handler: &mut dyn TrapHandler,
    ) -> Result<T, Trap> {
        let casted = self.cast_addr(addr, handler)?;
        self.check_addr(T::SIZE, casted, p2align, handler)?;
        Ok(T::from_le(&self.data[casted..casted + T::SIZE]))
    }

    /// Write `value`'s bytes verbatim at `addr`.
    pub fn store<T: Scalar>(
        &mut self,
        addr: i64,
        p2align: u8,
        handler: &mut dyn TrapHandler,
        value: T,
    ) -> Result<(), Trap> {
        let casted = self.cast_addr(addr, handler)?;
        self.check_addr(T::SIZE, casted, p2align, handler)?;
        value.write_le(&mut self.data[casted..casted + T::SIZE]);
        Ok(())
    }

    /// Borrow `len` bytes starting at `addr`, bounds-checked. Used by the
    /// host-call layer for bulk copies out of the sandbox.
    pub fn bytes(
        &mut self,
        addr: i64,
        len: usize,
        handler: &mut dyn TrapHandler,
    ) -> Result<&[u8], Trap> {
        let casted = self.cast_addr(addr, handler)?;
        self.check_addr(len, casted, 0, handler)?;
        Ok(&self.data[casted..casted + len])
    }

    /// Mutable variant of [`bytes`](Self::bytes), for bulk copies into the
    /// sandbox.
    pub fn bytes_mut(
        &mut self,
        addr: i64,
        len: usize,
        handler: &mut dyn TrapHandler,
    ) -> Result<&mut [u8], Trap> {
        let casted = self.cast_addr(addr, handler)?;
        self.check_addr(len, casted, 0, handler)?;
        Ok(&mut self.data[casted..casted + len])
    }

    /// An address wider than the native address width is out of bounds if
    /// truncation changes its value; it is never silently truncated.
    fn cast_addr(&mut self, addr: i64, handler: &mut dyn TrapHandler) -> Result<usize, Trap> {
        let casted = addr as usize;
        if casted as i64 != addr {
            return Err(self.out_of_bounds(handler));
        }
        Ok(casted)
    }

    /// Bounds are checked on the end address to catch addr+length
    /// wraparound. Misalignment is a non-fatal slow-path notice; the
    /// access proceeds.
    fn check_addr(
        &mut self,
        access_size: usize,
        addr: usize,
        p2align: u8,
        handler: &mut dyn TrapHandler,
    ) -> Result<(), Trap> {
        match addr.checked_add(access_size) {
            Some(end) if end <= self.data.len() => {}
            _ => return Err(self.out_of_bounds(handler)),
        }

        if u32::from(p2align) < usize::BITS {
            let mask = (1usize << p2align) - 1;
            if addr & mask != 0 {
                handler.slow("linear memory access address underaligned");
            }
        }
        Ok(())
    }
}
