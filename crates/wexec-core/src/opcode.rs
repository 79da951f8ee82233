/// Opcodes of the instruction set.
///
/// Structural opcodes (locals, globals, heap, literals, calls) are shared
/// by every evaluation type; the remaining opcodes name the type they
/// operate on. Float comparison opcodes produce int32 booleans and are
/// therefore interpreted by the int32 evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Structural.
    GetLocal,
    SetLocal,
    LoadHeap,
    StoreHeap,
    LoadHeapWithOffset,
    StoreHeapWithOffset,
    LoadGlobal,
    StoreGlobal,
    CallDirect,
    CallIndirect,
    AddressOf,
    Literal,

    // Int32 arithmetic and logic.
    Int32Add,
    Int32Sub,
    Int32Mul,
    Int32SDiv,
    Int32UDiv,
    Int32SRem,
    Int32URem,
    Int32And,
    Int32Ior,
    Int32Xor,
    Int32Shl,
    Int32Shr,
    Int32Sar,

    // Comparisons (all push an int32 boolean).
    Int32Eq,
    Int32Slt,
    Int32Sle,
    Int32Ult,
    Int32Ule,
    Float32Eq,
    Float32Lt,
    Float32Le,
    Float64Eq,
    Float64Lt,
    Float64Le,

    // Conversions to int32.
    SInt32FromFloat64,
    SInt32FromFloat32,
    Uint32FromFloat64,
    Uint32FromFloat32,
    Int32FromFloat32Bits,

    // Float32.
    Float32Add,
    Float32Sub,
    Float32Mul,
    Float32Div,
    Float32Abs,
    Float32Neg,
    Float32Copysign,
    Float32Ceil,
    Float32Floor,
    Float32Sqrt,
    Float32FromFloat64,
    Float32FromSInt32,
    Float32FromUInt32,
    Float32FromInt32Bits,

    // Float64.
    Float64Add,
    Float64Sub,
    Float64Mul,
    Float64Div,
    Float64Abs,
    Float64Neg,
    Float64Copysign,
    Float64Ceil,
    Float64Floor,
    Float64Sqrt,
    Float64FromFloat32,
    Float64FromSInt32,
    Float64FromUInt32,
}

/// A decoded instruction node: an opcode plus an opaque payload.
///
/// The payload's interpretation is opcode-dependent: a local/global slot
/// index, a literal-pool index, an address-table index, or a `p2align`
/// hint for heap accesses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub opcode: Opcode,
    pub payload: u32,
}

impl Node {
    pub fn new(opcode: Opcode, payload: u32) -> Self {
        Self { opcode, payload }
    }

    /// A node with a zero payload, for opcodes that ignore it.
    pub fn op(opcode: Opcode) -> Self {
        Self { opcode, payload: 0 }
    }
}
