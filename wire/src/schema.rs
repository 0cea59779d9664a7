//! Declarative field layouts.
//!
//! A layout is a list of [Field]s, each naming the field and describing how to read it with a
//! [Kind]. [crate::Packet::fields] applies a layout in order, so later fields can take their length
//! from earlier ones.
//!
//! ```
//! use commonware_wire::{schema::{Field, IntKind, Kind, Len}, Packet, ReaderCfg, Value};
//!
//! let layout = [
//!     Field::new("len", Kind::Int(IntKind::U8)).temp(),
//!     Field::new("name", Kind::Utf8(Len::temp("len"))),
//!     Field::new("version", Kind::Constant(Value::U8(1))),
//! ];
//! let mut packet = Packet::from_bytes(&b"\x02hi"[..], ReaderCfg::default()).unwrap();
//! packet.fields(&layout).unwrap();
//! packet.complete().unwrap();
//! assert_eq!(packet.get("name"), Some(&Value::Utf8("hi".into())));
//! assert_eq!(packet.get("len"), None);
//! ```

use crate::{Endian, Value};

/// Width and signedness of a fixed-width integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl IntKind {
    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 => 4,
            Self::U64 | Self::I64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
        }
    }

    /// Inclusive bounds of the values this kind can hold.
    pub const fn bounds(self) -> (i128, i128) {
        match self {
            Self::U8 => (0, u8::MAX as i128),
            Self::U16 => (0, u16::MAX as i128),
            Self::U32 => (0, u32::MAX as i128),
            Self::U64 => (0, u64::MAX as i128),
            Self::I8 => (i8::MIN as i128, i8::MAX as i128),
            Self::I16 => (i16::MIN as i128, i16::MAX as i128),
            Self::I32 => (i32::MIN as i128, i32::MAX as i128),
            Self::I64 => (i64::MIN as i128, i64::MAX as i128),
        }
    }

    /// Returns true if `value` is within [IntKind::bounds].
    pub const fn contains(self, value: i128) -> bool {
        let (min, max) = self.bounds();
        min <= value && value <= max
    }
}

/// Width of a float.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatKind {
    F16,
    F32,
    F64,
}

impl FloatKind {
    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::F16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// Where the length of a variable-width field comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Len {
    /// A length known up front.
    Fixed(usize),
    /// The value of a previously stored output field.
    Field(String),
    /// The value of a previously stored temporary field.
    Temp(String),
}

impl Len {
    /// Takes the length from the output field `name`.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Takes the length from the temporary field `name`.
    pub fn temp(name: impl Into<String>) -> Self {
        Self::Temp(name.into())
    }
}

impl From<usize> for Len {
    fn from(len: usize) -> Self {
        Self::Fixed(len)
    }
}

/// How a field is read.
#[derive(Clone, Debug, PartialEq)]
pub enum Kind {
    Int(IntKind),
    Float(FloatKind),
    Bytes(Len),
    Ascii(Len),
    Utf8(Len),
    /// Everything after the cursor.
    Unused,
    /// A value that isn't read from the input at all.
    Constant(Value),
}

/// A named field in a layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: Kind,
    /// Store in the temporary record instead of the output record.
    pub temp: bool,
    /// Byte order override.
    pub endian: Option<Endian>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            temp: false,
            endian: None,
        }
    }

    /// Marks the field as temporary.
    pub fn temp(mut self) -> Self {
        self.temp = true;
        self
    }

    /// Overrides the byte order for this field.
    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = Some(endian);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_bounds() {
        assert!(IntKind::U16.contains(65535));
        assert!(!IntKind::U16.contains(65536));
        assert!(!IntKind::U16.contains(-1));
        assert!(IntKind::I64.contains(i64::MIN as i128));
        assert!(!IntKind::I64.contains(i64::MAX as i128 + 1));
        assert!(IntKind::U64.contains(u64::MAX as i128));
    }

    #[test]
    fn test_sizes() {
        let ints = [
            IntKind::U8,
            IntKind::U16,
            IntKind::U32,
            IntKind::U64,
            IntKind::I8,
            IntKind::I16,
            IntKind::I32,
            IntKind::I64,
        ];
        for kind in ints {
            let bits = kind.name()[1..].parse::<usize>().unwrap();
            assert_eq!(kind.size() * 8, bits);
        }
        assert_eq!(FloatKind::F16.size(), 2);
        assert_eq!(FloatKind::F32.size(), 4);
        assert_eq!(FloatKind::F64.size(), 8);
    }

    #[test]
    fn test_field_builder() {
        let field = Field::new("x", Kind::Bytes(4.into()))
            .temp()
            .endian(Endian::Little);
        assert!(field.temp);
        assert_eq!(field.endian, Some(Endian::Little));
        assert_eq!(field.kind, Kind::Bytes(Len::Fixed(4)));
    }
}
