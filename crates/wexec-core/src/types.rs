/// Value types of the instruction set.
///
/// The evaluator only exercises `Int32`, `Float32` and `Float64`; `Int64`
/// and `Void` are declared for completeness of the type lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValType {
    Int32,
    Int64,
    Float32,
    Float64,
    Void,
}

impl ValType {
    /// The zero value used to initialize a slot of this type.
    /// `Void` has no values.
    pub fn zero_value(self) -> Option<Value> {
        match self {
            ValType::Int32 => Some(Value::I32(0)),
            ValType::Int64 => Some(Value::I64(0)),
            ValType::Float32 => Some(Value::F32(0.0)),
            ValType::Float64 => Some(Value::F64(0.0)),
            ValType::Void => None,
        }
    }
}

/// A runtime value: a tagged union over exactly the host representations.
///
/// There is no implicit widening between tags; the typed accessors return
/// `None` on a tag mismatch rather than converting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// Get the value type of this value.
    pub fn ty(&self) -> ValType {
        match self {
            Value::I32(_) => ValType::Int32,
            Value::I64(_) => ValType::Int64,
            Value::F32(_) => ValType::Float32,
            Value::F64(_) => ValType::Float64,
        }
    }

    /// Human-readable name of the value's type, for trap messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
        }
    }

    /// Try to get as an int32. No widening or narrowing.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as an int64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a float32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a float64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}
