/// Per-module pool of literal values.
///
/// Slots store raw 64-bit patterns; the typed readers reinterpret the low
/// bits for the requested type. `Literal` nodes and the offset immediates
/// of the `*WithOffset` heap opcodes index into this pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiteralPool {
    slots: Vec<u64>,
}

impl LiteralPool {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Number of slots in the pool.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append an int32 literal, returning its pool index.
    pub fn push_i32(&mut self, v: i32) -> u32 {
        self.push_raw(u64::from(v as u32))
    }

    /// Append a float32 literal, returning its pool index.
    pub fn push_f32(&mut self, v: f32) -> u32 {
        self.push_raw(u64::from(v.to_bits()))
    }

    /// Append a float64 literal, returning its pool index.
    pub fn push_f64(&mut self, v: f64) -> u32 {
        self.push_raw(v.to_bits())
    }

    fn push_raw(&mut self, bits: u64) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(bits);
        index
    }

    /// Read a slot as an int32.
    pub fn i32(&self, index: u32) -> Option<i32> {
        self.get(index).map(|bits| bits as u32 as i32)
    }

    /// Read a slot as a float32 (bit reinterpretation of the low word).
    pub fn f32(&self, index: u32) -> Option<f32> {
        self.get(index).map(|bits| f32::from_bits(bits as u32))
    }

    /// Read a slot as a float64 (bit reinterpretation).
    pub fn f64(&self, index: u32) -> Option<f64> {
        self.get(index).map(f64::from_bits)
    }

    fn get(&self, index: u32) -> Option<u64> {
        self.slots.get(index as usize).copied()
    }
}
