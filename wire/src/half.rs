//! IEEE-754 binary16 ("half precision") conversion.
//!
//! Decoding accepts every bit pattern. Encoding is exact-only: a value is encoded only if it can
//! be decoded back to the same `f64`, so writers fail instead of silently rounding.
//!
//! NaN payloads are not preserved on decode. Every NaN decodes to [f64::NAN].

use crate::Endian;

const SIGN_MASK: u16 = 0x8000;
const EXPONENT_MASK: u16 = 0x7C00;
const MANTISSA_MASK: u16 = 0x03FF;
const MANTISSA_BITS: u32 = 10;

/// Bits dropped when narrowing an `f32` mantissa (23 bits) to a half mantissa (10 bits).
const DROPPED_BITS: u32 = 13;

/// Biased `f32` exponent range that maps onto normal halves.
const NORMAL_MIN: u32 = 113;
const NORMAL_MAX: u32 = 142;

/// Biased `f32` exponent range that maps onto subnormal halves.
const SUBNORMAL_MIN: u32 = 103;
const SUBNORMAL_MAX: u32 = 112;

/// Difference between the `f32` exponent bias (127) and the half exponent bias (15).
const REBIAS: u32 = 112;

/// Converts a half bit pattern to an `f64`.
pub fn from_bits(bits: u16) -> f64 {
    let negative = bits & SIGN_MASK != 0;
    let exponent = (bits & EXPONENT_MASK) >> MANTISSA_BITS;
    let mantissa = (bits & MANTISSA_MASK) as f64;

    let magnitude = match exponent {
        // Zero and subnormals: mantissa * 2^-24
        0 => mantissa * 2f64.powi(-24),
        0x1F if mantissa == 0.0 => f64::INFINITY,
        0x1F => return f64::NAN,
        _ => (1.0 + mantissa / 1024.0) * 2f64.powi(exponent as i32 - 15),
    };
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Decodes the two bytes at `offset` of `buf`.
///
/// Returns `None` if fewer than two bytes are available at `offset`.
pub fn decode_half(buf: &[u8], offset: usize, endian: Endian) -> Option<f64> {
    let end = offset.checked_add(2)?;
    let bytes: [u8; 2] = buf.get(offset..end)?.try_into().ok()?;
    let bits = match endian {
        Endian::Big => u16::from_be_bytes(bytes),
        Endian::Little => u16::from_le_bytes(bytes),
    };
    Some(from_bits(bits))
}

/// Returns the half bit pattern that represents `value` exactly, or `None` if no such pattern
/// exists.
///
/// ```
/// use commonware_wire::half::encode_half;
///
/// assert_eq!(encode_half(1.25), Some(0x3D00));
/// assert_eq!(encode_half(65536.0), None);
/// assert_eq!(encode_half(0.1), None);
/// ```
pub fn encode_half(value: f64) -> Option<u16> {
    // Anything that isn't already an exact f32 has too many mantissa bits.
    let narrow = value as f32;
    if !value.is_nan() && narrow as f64 != value {
        return None;
    }

    let bits = narrow.to_bits();
    let sign = ((bits >> 16) as u16) & SIGN_MASK;
    let exponent = (bits >> 23) & 0xFF;
    let mantissa = bits & 0x007F_FFFF;

    match exponent {
        // Infinity and NaN. Keep the high payload bits, but never let a NaN collapse into infinity.
        0xFF => {
            let mut payload = (mantissa >> DROPPED_BITS) as u16;
            if mantissa != 0 && payload == 0 {
                payload = 0x0200;
            }
            Some(sign | EXPONENT_MASK | payload)
        }
        // Zero. Nonzero f32 subnormals are far below the smallest half subnormal.
        0 if mantissa == 0 => Some(sign),
        NORMAL_MIN..=NORMAL_MAX => {
            if mantissa & ((1 << DROPPED_BITS) - 1) != 0 {
                return None;
            }
            let exponent = ((exponent - REBIAS) as u16) << MANTISSA_BITS;
            Some(sign | exponent | (mantissa >> DROPPED_BITS) as u16)
        }
        SUBNORMAL_MIN..=SUBNORMAL_MAX => {
            // Make the implicit leading one explicit and shift it into subnormal position.
            let full = mantissa | 0x0080_0000;
            let shift = 126 - exponent;
            if full & ((1 << shift) - 1) != 0 {
                return None;
            }
            Some(sign | (full >> shift) as u16)
        }
        _ => None,
    }
}

/// Returns true if `value` can be written as a half without losing precision.
pub fn is_exact_half(value: f64) -> bool {
    encode_half(value).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0x0000, 0.0; "zero")]
    #[test_case(0x3C00, 1.0; "one")]
    #[test_case(0x3D00, 1.25; "one and a quarter")]
    #[test_case(0xC000, -2.0; "negative two")]
    #[test_case(0x7BFF, 65504.0; "max normal")]
    #[test_case(0x0400, 6.103515625e-5; "min normal")]
    #[test_case(0x0001, 5.960464477539063e-8; "min subnormal")]
    #[test_case(0x03FF, 6.097555160522461e-5; "max subnormal")]
    #[test_case(0x3555, 0.333251953125; "third")]
    fn test_exact(bits: u16, value: f64) {
        assert_eq!(from_bits(bits), value);
        assert_eq!(encode_half(value), Some(bits));
        assert!(is_exact_half(value));
    }

    #[test]
    fn test_signed_zero() {
        let negative = from_bits(0x8000);
        assert_eq!(negative, 0.0);
        assert!(negative.is_sign_negative());
        assert_eq!(encode_half(-0.0), Some(0x8000));
        assert_eq!(encode_half(0.0), Some(0x0000));
    }

    #[test]
    fn test_infinity() {
        assert_eq!(from_bits(0x7C00), f64::INFINITY);
        assert_eq!(from_bits(0xFC00), f64::NEG_INFINITY);
        assert_eq!(encode_half(f64::INFINITY), Some(0x7C00));
        assert_eq!(encode_half(f64::NEG_INFINITY), Some(0xFC00));
    }

    #[test]
    fn test_nan_canonical() {
        for bits in [0x7C01u16, 0x7E00, 0x7FFF, 0xFC01, 0xFE00] {
            let value = from_bits(bits);
            assert!(value.is_nan());
            assert_eq!(value.to_bits(), f64::NAN.to_bits());
        }
        let encoded = encode_half(f64::NAN).unwrap();
        assert_eq!(encoded & EXPONENT_MASK, EXPONENT_MASK);
        assert_ne!(encoded & MANTISSA_MASK, 0);
    }

    #[test]
    fn test_nan_low_payload_stays_nan() {
        let nan = f32::from_bits(0x7F80_0001) as f64;
        let encoded = encode_half(nan).unwrap();
        assert!(from_bits(encoded).is_nan());
    }

    #[test_case(65536.0; "exponent too large")]
    #[test_case(65520.0; "rounds to infinity")]
    #[test_case(1e-10; "exponent too small")]
    #[test_case(0.1; "not an f32")]
    #[test_case(1.0009765625 + 2f64.powi(-20); "too many mantissa bits")]
    #[test_case(1.5 * 2f64.powi(-24); "subnormal loses precision")]
    #[test_case(f32::MIN_POSITIVE as f64 / 2.0; "f32 subnormal")]
    fn test_inexact(value: f64) {
        assert_eq!(encode_half(value), None);
        assert!(!is_exact_half(value));
    }

    #[test]
    fn test_all_patterns_roundtrip() {
        for bits in 0..=u16::MAX {
            let value = from_bits(bits);
            if value.is_nan() {
                continue;
            }
            assert_eq!(encode_half(value), Some(bits), "bits {bits:#06x}");
        }
    }

    #[test]
    fn test_decode_endianness() {
        let buf = [0xFF, 0x3D, 0x00, 0x3D];
        assert_eq!(decode_half(&buf, 1, Endian::Big), Some(1.25));
        assert_eq!(decode_half(&buf, 2, Endian::Little), Some(1.25));
        assert_eq!(decode_half(&buf, 3, Endian::Big), None);
        assert_eq!(decode_half(&buf, usize::MAX, Endian::Big), None);
    }
}
