//! Decoded field values.

use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};

/// A named set of decoded fields.
pub type Record = BTreeMap<String, Value>;

/// A decoded field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// A half-precision float, widened on decode.
    F16(f64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Utf8(String),
    /// A Latin-1 string (one byte per character).
    Ascii(String),
    Bytes(Bytes),
    Seq(Vec<Value>),
    /// The names of the flags that were set.
    Flags(BTreeSet<String>),
}

impl Value {
    /// Returns the raw bits of an integer value (two's complement for signed values) and its
    /// width in bits.
    pub fn bits(&self) -> Option<(u64, u32)> {
        Some(match *self {
            Self::U8(v) => (v as u64, 8),
            Self::U16(v) => (v as u64, 16),
            Self::U32(v) => (v as u64, 32),
            Self::U64(v) => (v, 64),
            Self::I8(v) => (v as u8 as u64, 8),
            Self::I16(v) => (v as u16 as u64, 16),
            Self::I32(v) => (v as u32 as u64, 32),
            Self::I64(v) => (v as u64, 64),
            _ => return None,
        })
    }

    /// Returns true for 64-bit integers.
    pub fn is_wide(&self) -> bool {
        matches!(self, Self::U64(_) | Self::I64(_))
    }

    /// Returns the value of any integer as an `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match *self {
            Self::U8(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::U64(v) => v.into(),
            Self::I8(v) => v.into(),
            Self::I16(v) => v.into(),
            Self::I32(v) => v.into(),
            Self::I64(v) => v.into(),
            _ => return None,
        })
    }

    /// Returns the value of a non-negative integer as a `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i128().and_then(|v| u64::try_from(v).ok())
    }

    /// Returns the value of a non-negative integer as a `usize`, typically a length.
    pub fn as_usize(&self) -> Option<usize> {
        self.as_i128().and_then(|v| usize::try_from(v).ok())
    }

    /// Returns the value of any float as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F16(v) | Self::F64(v) => Some(v),
            Self::F32(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the content of a UTF-8 or Latin-1 string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(v) | Self::Ascii(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Flags(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($type:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$type> for Value {
                fn from(value: $type) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => Utf8,
    Bytes => Bytes,
    Vec<Value> => Seq,
    BTreeSet<String> => Flags,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

/// Types that can be read back out of a [Value].
pub trait FromValue: Sized {
    /// Human readable description of the expected value, used in errors.
    const EXPECTED: &'static str;

    /// Converts `value`, returning `None` if it has the wrong type.
    fn from_value(value: &Value) -> Option<Self>;
}

// Exact matches only: a `u16` field can't be read as a `u32`.
macro_rules! impl_from_value {
    ($($type:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $type {
                const EXPECTED: &'static str = concat!("a ", stringify!($type));

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_value!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    bool => Bool,
    Bytes => Bytes,
    Vec<Value> => Seq,
    BTreeSet<String> => Flags,
);

impl FromValue for usize {
    const EXPECTED: &'static str = "a length";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_usize()
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "a float";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}
