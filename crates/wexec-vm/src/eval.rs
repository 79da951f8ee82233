//! The instruction evaluator.
//!
//! One generic entry point interprets the structural opcodes (locals,
//! globals, heap, literals, calls) once; the per-type quirks live in the
//! [`EvalType`] implementations for `i32`, `f32` and `f64`. Each call is a
//! pure function of the node and the context at entry; the evaluator
//! keeps no state of its own.
//!
//! Binary operands pop right-hand first, then left-hand, matching the
//! stack's push order. This ordering is part of the contract and is
//! preserved in every handler.

use wexec_core::{Node, Opcode, Trap, Value};

use crate::context::Context;
use crate::memory::Scalar;

/// A value type the evaluator can interpret instructions for.
///
/// Supplies the typed context accessors the generic structural handlers
/// need, plus the type-specific opcode table in `eval_op`.
pub trait EvalType: Scalar {
    fn pop(cx: &mut Context<'_>) -> Result<Self, Trap>;

    fn push(cx: &mut Context<'_>, v: Self);

    fn read_literal(cx: &mut Context<'_>, payload: u32) -> Result<Self, Trap>;

    /// Extract a value of this type from a local/global slot.
    fn from_slot(cx: &mut Context<'_>, slot: Value) -> Result<Self, Trap>;

    fn into_value(self) -> Value;

    /// Interpret a type-specific opcode. Structural opcodes never reach
    /// this.
    fn eval_op(node: Node, cx: &mut Context<'_>) -> Result<(), Trap>;
}

/// Interpret one instruction node against the context.
pub fn evaluate<T: EvalType>(node: Node, cx: &mut Context<'_>) -> Result<(), Trap> {
    match node.opcode {
        Opcode::GetLocal => {
            let slot = cx.load_local(node.payload)?;
            let x = T::from_slot(cx, slot)?;
            T::push(cx, x);
        }
        Opcode::SetLocal => {
            // SetLocal is an expression: the stored value is re-pushed.
            let v = T::pop(cx)?;
            cx.store_local(node.payload, v.into_value())?;
            T::push(cx, v);
        }
        Opcode::LoadHeap => {
            let p = cx.pop_int32()?;
            let x: T = cx.load_heap(p, 0, node.payload as u8)?;
            T::push(cx, x);
        }
        Opcode::StoreHeap => {
            let p = cx.pop_int32()?;
            let v = T::pop(cx)?;
            cx.store_heap(p, 0, node.payload as u8, v)?;
            T::push(cx, v);
        }
        Opcode::LoadHeapWithOffset => {
            let p = cx.pop_int32()?;
            let i = cx.read_literal_int32(node.payload)?;
            let x: T = cx.load_heap(p, i, 0)?;
            T::push(cx, x);
        }
        Opcode::StoreHeapWithOffset => {
            let p = cx.pop_int32()?;
            let v = T::pop(cx)?;
            let i = cx.read_literal_int32(node.payload)?;
            cx.store_heap(p, i, 0, v)?;
            T::push(cx, v);
        }
        Opcode::LoadGlobal => {
            let slot = cx.load_global(node.payload)?;
            let x = T::from_slot(cx, slot)?;
            T::push(cx, x);
        }
        Opcode::StoreGlobal => {
            let v = T::pop(cx)?;
            cx.store_global(node.payload, v.into_value())?;
            T::push(cx, v);
        }
        Opcode::Literal => {
            let x = T::read_literal(cx, node.payload)?;
            T::push(cx, x);
        }
        Opcode::AddressOf => {
            let x = cx.addressof(node.payload)?;
            cx.push_int32(x);
        }
        Opcode::CallDirect => {
            // Placeholder slot; the call-dispatch layer is a separate
            // collaborator.
            return Err(cx.trap(Trap::UnimplementedDirectCall));
        }
        Opcode::CallIndirect => {
            return Err(cx.trap(Trap::UnimplementedIndirectCall));
        }
        _ => T::eval_op(node, cx)?,
    }
    Ok(())
}

/// Interpret an instruction node typed int32.
pub fn evaluate_int32(node: Node, cx: &mut Context<'_>) -> Result<(), Trap> {
    evaluate::<i32>(node, cx)
}

/// Interpret an instruction node typed float32.
pub fn evaluate_float32(node: Node, cx: &mut Context<'_>) -> Result<(), Trap> {
    evaluate::<f32>(node, cx)
}

/// Interpret an instruction node typed float64.
pub fn evaluate_float64(node: Node, cx: &mut Context<'_>) -> Result<(), Trap> {
    evaluate::<f64>(node, cx)
}

impl EvalType for i32 {
    fn pop(cx: &mut Context<'_>) -> Result<Self, Trap> {
        cx.pop_int32()
    }

    fn push(cx: &mut Context<'_>, v: Self) {
        cx.push_int32(v);
    }

    fn read_literal(cx: &mut Context<'_>, payload: u32) -> Result<Self, Trap> {
        cx.read_literal_int32(payload)
    }

    fn from_slot(cx: &mut Context<'_>, slot: Value) -> Result<Self, Trap> {
        match slot.as_i32() {
            Some(x) => Ok(x),
            None => Err(cx.trap(Trap::TypeMismatch {
                expected: "int32",
                got: slot.type_name(),
            })),
        }
    }

    fn into_value(self) -> Value {
        Value::I32(self)
    }

    fn eval_op(node: Node, cx: &mut Context<'_>) -> Result<(), Trap> {
        match node.opcode {
            Opcode::Int32Add => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_int32(l.wrapping_add(r));
            }
            Opcode::Int32Sub => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_int32(l.wrapping_sub(r));
            }
            Opcode::Int32Mul => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_int32(l.wrapping_mul(r));
            }
            Opcode::Int32SDiv => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                if r == 0 {
                    return Err(cx.trap(Trap::SignedDivisionByZero));
                }
                if l == i32::MIN && r == -1 {
                    return Err(cx.trap(Trap::SignedDivisionOverflow));
                }
                cx.push_int32(l / r);
            }
            Opcode::Int32UDiv => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                if r == 0 {
                    return Err(cx.trap(Trap::UnsignedDivisionByZero));
                }
                cx.push_int32(((l as u32) / (r as u32)) as i32);
            }
            Opcode::Int32SRem => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                if r == 0 {
                    return Err(cx.trap(Trap::RemainderByZero));
                }
                // INT32_MIN % -1 cannot overflow the remainder: it is 0.
                let x = if l == i32::MIN && r == -1 { 0 } else { l % r };
                cx.push_int32(x);
            }
            Opcode::Int32URem => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                if r == 0 {
                    return Err(cx.trap(Trap::RemainderByZero));
                }
                cx.push_int32(((l as u32) % (r as u32)) as i32);
            }
            Opcode::Int32And => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_int32(l & r);
            }
            Opcode::Int32Ior => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_int32(l | r);
            }
            Opcode::Int32Xor => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_int32(l ^ r);
            }
            Opcode::Int32Shl => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                // Shift amounts saturate: >= 32 (including negative
                // amounts viewed as unsigned) yields 0.
                let x = if (r as u32) >= 32 {
                    0
                } else {
                    ((l as u32) << (r as u32)) as i32
                };
                cx.push_int32(x);
            }
            Opcode::Int32Shr => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                let x = if (r as u32) >= 32 {
                    0
                } else {
                    ((l as u32) >> (r as u32)) as i32
                };
                cx.push_int32(x);
            }
            Opcode::Int32Sar => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                // Arithmetic shift clamps to 31, replicating the sign bit.
                cx.push_int32(l >> (r as u32).min(31));
            }
            Opcode::Int32Eq => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_boolean(l == r);
            }
            Opcode::Int32Slt => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_boolean(l < r);
            }
            Opcode::Int32Sle => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_boolean(l <= r);
            }
            Opcode::Int32Ult => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_boolean((l as u32) < (r as u32));
            }
            Opcode::Int32Ule => {
                let r = cx.pop_int32()?;
                let l = cx.pop_int32()?;
                cx.push_boolean((l as u32) <= (r as u32));
            }
            Opcode::Float32Eq => {
                let r = cx.pop_float32()?;
                let l = cx.pop_float32()?;
                cx.push_boolean(l == r);
            }
            Opcode::Float32Lt => {
                let r = cx.pop_float32()?;
                let l = cx.pop_float32()?;
                cx.push_boolean(l < r);
            }
            Opcode::Float32Le => {
                let r = cx.pop_float32()?;
                let l = cx.pop_float32()?;
                cx.push_boolean(l <= r);
            }
            Opcode::Float64Eq => {
                let r = cx.pop_float64()?;
                let l = cx.pop_float64()?;
                cx.push_boolean(l == r);
            }
            Opcode::Float64Lt => {
                let r = cx.pop_float64()?;
                let l = cx.pop_float64()?;
                cx.push_boolean(l < r);
            }
            Opcode::Float64Le => {
                let r = cx.pop_float64()?;
                let l = cx.pop_float64()?;
                cx.push_boolean(l <= r);
            }
            Opcode::SInt32FromFloat64 => {
                let o = cx.pop_float64()?;
                if !in_signed_range(o) {
                    return Err(cx.trap(Trap::SignedConversionFailure));
                }
                cx.push_int32(o as i32);
            }
            Opcode::SInt32FromFloat32 => {
                let o = cx.pop_float32()?;
                if !in_signed_range(f64::from(o)) {
                    return Err(cx.trap(Trap::SignedConversionFailure));
                }
                cx.push_int32(o as i32);
            }
            Opcode::Uint32FromFloat64 => {
                let o = cx.pop_float64()?;
                if !in_unsigned_range(o) {
                    return Err(cx.trap(Trap::UnsignedConversionFailure));
                }
                cx.push_int32(o as u32 as i32);
            }
            Opcode::Uint32FromFloat32 => {
                let o = cx.pop_float32()?;
                if !in_unsigned_range(f64::from(o)) {
                    return Err(cx.trap(Trap::UnsignedConversionFailure));
                }
                cx.push_int32(o as u32 as i32);
            }
            Opcode::Int32FromFloat32Bits => {
                let o = cx.pop_float32()?;
                cx.push_int32(o.to_bits() as i32);
            }
            _ => return Err(cx.trap(Trap::UnsupportedOpcode)),
        }
        Ok(())
    }
}

/// The exact open interval (INT32_MIN - 1, INT32_MAX + 1). Both endpoints
/// are exactly representable in f64, and NaN fails both comparisons.
fn in_signed_range(o: f64) -> bool {
    o > f64::from(i32::MIN) - 1.0 && o < f64::from(i32::MAX) + 1.0
}

/// The half-open interval [0, UINT32_MAX + 1). Negative reals are
/// rejected even when they would truncate to zero.
fn in_unsigned_range(o: f64) -> bool {
    o >= 0.0 && o < f64::from(u32::MAX) + 1.0
}

impl EvalType for f32 {
    fn pop(cx: &mut Context<'_>) -> Result<Self, Trap> {
        cx.pop_float32()
    }

    fn push(cx: &mut Context<'_>, v: Self) {
        cx.push_float32(v);
    }

    fn read_literal(cx: &mut Context<'_>, payload: u32) -> Result<Self, Trap> {
        cx.read_literal_float32(payload)
    }

    fn from_slot(cx: &mut Context<'_>, slot: Value) -> Result<Self, Trap> {
        match slot.as_f32() {
            Some(x) => Ok(x),
            None => Err(cx.trap(Trap::TypeMismatch {
                expected: "float32",
                got: slot.type_name(),
            })),
        }
    }

    fn into_value(self) -> Value {
        Value::F32(self)
    }

    fn eval_op(node: Node, cx: &mut Context<'_>) -> Result<(), Trap> {
        match node.opcode {
            Opcode::Float32Add => {
                let r = cx.pop_float32()?;
                let l = cx.pop_float32()?;
                let mut x = l + r;
                if x.is_nan() {
                    x = cx.nan_bits().transform_f32(x);
                }
                cx.push_float32(x);
            }
            Opcode::Float32Sub => {
                let r = cx.pop_float32()?;
                let l = cx.pop_float32()?;
                let mut x = l - r;
                if x.is_nan() {
                    x = cx.nan_bits().transform_f32(x);
                }
                cx.push_float32(x);
            }
            Opcode::Float32Mul => {
                let r = cx.pop_float32()?;
                let l = cx.pop_float32()?;
                let mut x = l * r;
                if x.is_nan() {
                    x = cx.nan_bits().transform_f32(x);
                }
                cx.push_float32(x);
            }
            Opcode::Float32Div => {
                let r = cx.pop_float32()?;
                let l = cx.pop_float32()?;
                // Division by zero is spelled out rather than left to the
                // host: 0/0 is NaN, x/0 is infinity with the operands'
                // combined sign.
                let mut x = if r == 0.0 {
                    if l == 0.0 {
                        f32::NAN
                    } else {
                        f32::INFINITY.copysign(l * r)
                    }
                } else {
                    l / r
                };
                if x.is_nan() {
                    x = cx.nan_bits().transform_f32(x);
                }
                cx.push_float32(x);
            }
            Opcode::Float32Abs => {
                let o = cx.pop_float32()?;
                cx.push_float32(o.abs());
            }
            Opcode::Float32Neg => {
                let o = cx.pop_float32()?;
                cx.push_float32(-o);
            }
            Opcode::Float32Copysign => {
                let r = cx.pop_float32()?;
                let l = cx.pop_float32()?;
                cx.push_float32(l.copysign(r));
            }
            Opcode::Float32Ceil => {
                let o = cx.pop_float32()?;
                let mut x = o.ceil();
                if x.is_nan() {
                    x = cx.nan_bits().transform_f32(x);
                }
                cx.push_float32(x);
            }
            Opcode::Float32Floor => {
                let o = cx.pop_float32()?;
                let mut x = o.floor();
                if x.is_nan() {
                    x = cx.nan_bits().transform_f32(x);
                }
                cx.push_float32(x);
            }
            Opcode::Float32Sqrt => {
                let o = cx.pop_float32()?;
                let mut x = o.sqrt();
                if x.is_nan() {
                    x = cx.nan_bits().transform_f32(x);
                }
                cx.push_float32(x);
            }
            Opcode::Float32FromFloat64 => {
                let o = cx.pop_float64()?;
                let mut x = o as f32;
                if x.is_nan() {
                    x = cx.nan_bits().transform_f32(x);
                }
                cx.push_float32(x);
            }
            Opcode::Float32FromSInt32 => {
                let o = cx.pop_int32()?;
                cx.push_float32(o as f32);
            }
            Opcode::Float32FromUInt32 => {
                let o = cx.pop_int32()?;
                cx.push_float32((o as u32) as f32);
            }
            Opcode::Float32FromInt32Bits => {
                let o = cx.pop_int32()?;
                cx.push_float32(f32::from_bits(o as u32));
            }
            _ => return Err(cx.trap(Trap::UnsupportedOpcode)),
        }
        Ok(())
    }
}

impl EvalType for f64 {
    fn pop(cx: &mut Context<'_>) -> Result<Self, Trap> {
        cx.pop_float64()
    }

    fn push(cx: &mut Context<'_>, v: Self) {
        cx.push_float64(v);
    }

    fn read_literal(cx: &mut Context<'_>, payload: u32) -> Result<Self, Trap> {
        cx.read_literal_float64(payload)
    }

    fn from_slot(cx: &mut Context<'_>, slot: Value) -> Result<Self, Trap> {
        match slot.as_f64() {
            Some(x) => Ok(x),
            None => Err(cx.trap(Trap::TypeMismatch {
                expected: "float64",
                got: slot.type_name(),
            })),
        }
    }

    fn into_value(self) -> Value {
        Value::F64(self)
    }

    fn eval_op(node: Node, cx: &mut Context<'_>) -> Result<(), Trap> {
        match node.opcode {
            Opcode::Float64Add => {
                let r = cx.pop_float64()?;
                let l = cx.pop_float64()?;
                let mut x = l + r;
                if x.is_nan() {
                    x = cx.nan_bits().transform_f64(x);
                }
                cx.push_float64(x);
            }
            Opcode::Float64Sub => {
                let r = cx.pop_float64()?;
                let l = cx.pop_float64()?;
                let mut x = l - r;
                if x.is_nan() {
                    x = cx.nan_bits().transform_f64(x);
                }
                cx.push_float64(x);
            }
            Opcode::Float64Mul => {
                let r = cx.pop_float64()?;
                let l = cx.pop_float64()?;
                let mut x = l * r;
                if x.is_nan() {
                    x = cx.nan_bits().transform_f64(x);
                }
                cx.push_float64(x);
            }
            Opcode::Float64Div => {
                let r = cx.pop_float64()?;
                let l = cx.pop_float64()?;
                let mut x = if r == 0.0 {
                    if l == 0.0 {
                        f64::NAN
                    } else {
                        f64::INFINITY.copysign(l * r)
                    }
                } else {
                    l / r
                };
                if x.is_nan() {
                    x = cx.nan_bits().transform_f64(x);
                }
                cx.push_float64(x);
            }
            Opcode::Float64Abs => {
                let o = cx.pop_float64()?;
                cx.push_float64(o.abs());
            }
            Opcode::Float64Neg => {
                let o = cx.pop_float64()?;
                cx.push_float64(-o);
            }
            Opcode::Float64Copysign => {
                let r = cx.pop_float64()?;
                let l = cx.pop_float64()?;
                cx.push_float64(l.copysign(r));
            }
            Opcode::Float64Ceil => {
                let o = cx.pop_float64()?;
                let mut x = o.ceil();
                if x.is_nan() {
                    x = cx.nan_bits().transform_f64(x);
                }
                cx.push_float64(x);
            }
            Opcode::Float64Floor => {
                let o = cx.pop_float64()?;
                let mut x = o.floor();
                if x.is_nan() {
                    x = cx.nan_bits().transform_f64(x);
                }
                cx.push_float64(x);
            }
            Opcode::Float64Sqrt => {
                let o = cx.pop_float64()?;
                let mut x = o.sqrt();
                if x.is_nan() {
                    x = cx.nan_bits().transform_f64(x);
                }
                cx.push_float64(x);
            }
            Opcode::Float64FromFloat32 => {
                let o = cx.pop_float32()?;
                let mut x = f64::from(o);
                if x.is_nan() {
                    x = cx.nan_bits().transform_f64(x);
                }
                cx.push_float64(x);
            }
            Opcode::Float64FromSInt32 => {
                let o = cx.pop_int32()?;
                cx.push_float64(f64::from(o));
            }
            Opcode::Float64FromUInt32 => {
                let o = cx.pop_int32()?;
                cx.push_float64(f64::from(o as u32));
            }
            _ => return Err(cx.trap(Trap::UnsupportedOpcode)),
        }
        Ok(())
    }
}
