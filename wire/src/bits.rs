//! Bit-range and flag extraction from integer fields.
//!
//! Bits are numbered from the least significant bit (0). Signed sources are viewed as their two's
//! complement bit pattern at their own width, so bit 7 of an `i8` is its sign bit.

use crate::{Error, Value};
use std::collections::BTreeSet;

/// The widest range [extract] will return as an integer.
///
/// Extracted integers are kept within the exact-integer range of an `f64` so they convert to
/// floats losslessly.
pub const MAX_RANGE_BITS: u32 = 53;

/// Which bits to extract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Select {
    /// An inclusive range. The order of the two indices doesn't matter.
    Range { start: u32, finish: u32 },
    /// Named single bits.
    Flags(Vec<(String, u32)>),
}

/// Describes how to derive one field from the bits of another.
///
/// ```
/// use commonware_wire::{Bits, Packet, ReaderCfg, Value};
///
/// let mut packet = Packet::from_bytes(&b"\x02\x03"[..], ReaderCfg::default()).unwrap();
/// packet.u16("bop").unwrap();
/// packet.bits(&Bits::range("bop", "blort", 8, 9)).unwrap();
/// assert_eq!(packet.get("blort"), Some(&Value::U32(2)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bits {
    /// Source field.
    pub from: String,
    /// Destination field.
    pub to: String,
    /// Look the source up in the temporary record.
    pub from_temp: bool,
    pub select: Select,
}

impl Bits {
    /// Extracts the bits between `start` and `finish` (inclusive, in either order).
    pub fn range(from: impl Into<String>, to: impl Into<String>, start: u32, finish: u32) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_temp: false,
            select: Select::Range { start, finish },
        }
    }

    /// Extracts a single bit as a boolean.
    pub fn bit(from: impl Into<String>, to: impl Into<String>, bit: u32) -> Self {
        Self::range(from, to, bit, bit)
    }

    /// Extracts the set of named flags whose bit is set.
    pub fn flags<N: Into<String>>(
        from: impl Into<String>,
        to: impl Into<String>,
        flags: impl IntoIterator<Item = (N, u32)>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_temp: false,
            select: Select::Flags(
                flags
                    .into_iter()
                    .map(|(name, bit)| (name.into(), bit))
                    .collect(),
            ),
        }
    }

    /// Reads the source field from the temporary record.
    pub fn from_temp(mut self) -> Self {
        self.from_temp = true;
        self
    }
}

/// Derives a value from the bits of `source` (the value of field `field`).
///
/// A single-bit range yields [Value::Bool]. A wider range yields [Value::U64] for 64-bit sources
/// and [Value::U32] otherwise. [Select::Flags] yields [Value::Flags].
pub fn extract(field: &str, source: &Value, select: &Select) -> Result<Value, Error> {
    let (raw, width) = source
        .bits()
        .ok_or_else(|| Error::FieldType(field.to_owned(), "an integer"))?;
    let check = |bit: u32| {
        if bit >= width {
            return Err(Error::BitRange(
                field.to_owned(),
                format!("bit {bit} of a {width}-bit value"),
            ));
        }
        Ok(())
    };

    match select {
        Select::Range { start, finish } => {
            let high = *start.max(finish);
            let low = *start.min(finish);
            check(high)?;
            if high == low {
                return Ok(Value::Bool((raw >> low) & 1 == 1));
            }
            let count = high - low + 1;
            if count > MAX_RANGE_BITS {
                return Err(Error::BitRange(
                    field.to_owned(),
                    format!("{count} bits is wider than {MAX_RANGE_BITS}"),
                ));
            }
            let bits = (raw >> low) & ((1u64 << count) - 1);
            if source.is_wide() {
                Ok(Value::U64(bits))
            } else {
                // Narrow sources are at most 32 bits wide.
                Ok(Value::U32(bits as u32))
            }
        }
        Select::Flags(flags) => {
            let mut set = BTreeSet::new();
            for (name, bit) in flags {
                check(*bit)?;
                if (raw >> bit) & 1 == 1 {
                    set.insert(name.clone());
                }
            }
            Ok(Value::Flags(set))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn range(start: u32, finish: u32) -> Select {
        Select::Range { start, finish }
    }

    #[test]
    fn test_single_bit() {
        assert_eq!(
            extract("foo", &Value::U8(1), &range(0, 0)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            extract("foo", &Value::U8(1), &range(1, 1)),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            extract("foo", &Value::I8(-128), &range(7, 7)),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_multi_bit() {
        assert_eq!(
            extract("bop", &Value::U16(0x0203), &range(8, 9)),
            Ok(Value::U32(2))
        );
        assert_eq!(
            extract("bop", &Value::U16(0x0203), &range(0, 7)),
            Ok(Value::U32(3))
        );
        assert_eq!(
            extract("bop", &Value::I16(-1), &range(15, 4)),
            Ok(Value::U32(0xFFF))
        );
    }

    #[test_case(0, 9; "low")]
    #[test_case(3, 17; "middle")]
    #[test_case(30, 31; "top")]
    fn test_order_insensitive(a: u32, b: u32) {
        let source = Value::U32(0xDEADBEEF);
        assert_eq!(
            extract("x", &source, &range(a, b)),
            extract("x", &source, &range(b, a))
        );
    }

    #[test]
    fn test_wide_source() {
        let source = Value::U64(0xFEDC_BA98_7654_3210);
        assert_eq!(
            extract("x", &source, &range(63, 60)),
            Ok(Value::U64(0xF))
        );
        assert_eq!(
            extract("x", &source, &range(63, 63)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            extract("x", &source, &range(11, 63)),
            Ok(Value::U64(0xFEDC_BA98_7654_3210 >> 11))
        );

        // Bits above 2^53 survive.
        let source = Value::I64(i64::MIN + 1);
        assert_eq!(
            extract("x", &source, &range(62, 10)),
            Ok(Value::U64(0))
        );
        assert_eq!(extract("x", &source, &range(0, 0)), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_range_errors() {
        assert!(matches!(
            extract("x", &Value::U8(0), &range(8, 0)),
            Err(Error::BitRange(_, _))
        ));
        assert!(matches!(
            extract("x", &Value::U64(0), &range(0, 63)),
            Err(Error::BitRange(_, _))
        ));
        assert!(matches!(
            extract("x", &Value::Utf8("1".into()), &range(0, 0)),
            Err(Error::FieldType(_, "an integer"))
        ));
    }

    #[test]
    fn test_flags() {
        let select = Select::Flags(vec![
            ("a".to_owned(), 0),
            ("b".to_owned(), 1),
            ("c".to_owned(), 7),
        ]);
        let value = extract("x", &Value::U8(0b1000_0001), &select).unwrap();
        let expected: BTreeSet<String> = ["a", "c"].into_iter().map(String::from).collect();
        assert_eq!(value, Value::Flags(expected));

        let select = Select::Flags(vec![("z".to_owned(), 8)]);
        assert!(extract("x", &Value::U8(0), &select).is_err());
    }

    #[test]
    fn test_builders() {
        let bits = Bits::bit("a", "b", 3).from_temp();
        assert!(bits.from_temp);
        assert_eq!(bits.select, range(3, 3));

        let bits = Bits::flags("a", "b", [("x", 1), ("y", 2)]);
        assert_eq!(
            bits.select,
            Select::Flags(vec![("x".to_owned(), 1), ("y".to_owned(), 2)])
        );
    }
}
