//! Sequential, typed decoding from an immutable buffer.
//!
//! # Truncation
//!
//! A [Reader] either fails on the first read past the end of its buffer ([Truncation::Strict]) or
//! records that the input was truncated and keeps going ([Truncation::Tolerant]). In the latter
//! case every read (including the one that ran out of bytes) returns the [Sentinel] of its type,
//! without looking at the buffer, until [Reader::reset] is called. This lets a caller decode as
//! much of a partial message as possible and check [Reader::is_truncated] once at the end.

use crate::{half, latch::Latch, Endian, Error, ReaderCfg, Truncation, Utf8Mode};
use bytes::Bytes;
use tracing::debug;

/// Value returned by a read on a truncated, tolerant [Reader].
///
/// Integer sentinels are valid values too (`u8::MAX` may well be in the input). Check
/// [Reader::is_truncated] instead of comparing a result against its sentinel.
pub trait Sentinel {
    /// Returns the sentinel.
    fn sentinel() -> Self;
}

macro_rules! impl_sentinel {
    ($($type:ty => $value:expr),* $(,)?) => {
        $(
            impl Sentinel for $type {
                #[inline]
                fn sentinel() -> Self {
                    $value
                }
            }
        )*
    };
}

impl_sentinel!(
    u8 => u8::MAX,
    u16 => u16::MAX,
    u32 => u32::MAX,
    u64 => u64::MAX,
    i8 => i8::MIN,
    i16 => i16::MIN,
    i32 => i32::MIN,
    i64 => i64::MIN,
    f32 => f32::NAN,
    f64 => f64::NAN,
    Bytes => Bytes::new(),
    String => String::new(),
);

/// A cursor over an immutable buffer that decodes fixed-width values.
///
/// # Example
///
/// ```
/// use commonware_wire::{Error, Reader, ReaderCfg};
///
/// let mut reader = Reader::new(&b"abcd"[..], ReaderCfg::default()).unwrap();
/// assert_eq!(reader.u8().unwrap(), 0x61);
/// assert_eq!(reader.u16().unwrap(), 0x6263);
/// assert_eq!(reader.offset(), 3);
/// assert!(matches!(reader.complete(), Err(Error::ExtraBytes { offset: 3, length: 4 })));
/// ```
#[derive(Clone, Debug)]
pub struct Reader {
    buf: Bytes,
    offset: usize,
    endian: Endian,
    utf8: Utf8Mode,
    allow_truncation: Latch,
    truncated: Latch,
}

// Fixed-width numeric reads. Types wider than one byte get an extra method that overrides the
// configured byte order for a single call.
macro_rules! impl_read {
    ($type:ty, $name:ident) => {
        #[doc = concat!("Reads a `", stringify!($type), "`.")]
        pub fn $name(&mut self) -> Result<$type, Error> {
            Ok(match self.take::<{ std::mem::size_of::<$type>() }>()? {
                Some(bytes) => <$type>::from_be_bytes(bytes),
                None => <$type>::sentinel(),
            })
        }
    };
    ($type:ty, $name:ident, $name_endian:ident) => {
        #[doc = concat!("Reads a `", stringify!($type), "` in the configured byte order.")]
        pub fn $name(&mut self) -> Result<$type, Error> {
            self.$name_endian(self.endian)
        }

        #[doc = concat!("Reads a `", stringify!($type), "` in the given byte order.")]
        pub fn $name_endian(&mut self, endian: Endian) -> Result<$type, Error> {
            Ok(match self.take::<{ std::mem::size_of::<$type>() }>()? {
                Some(bytes) => match endian {
                    Endian::Big => <$type>::from_be_bytes(bytes),
                    Endian::Little => <$type>::from_le_bytes(bytes),
                },
                None => <$type>::sentinel(),
            })
        }
    };
}

impl Reader {
    /// Creates a reader over `buf`.
    ///
    /// Fails with [Error::Offset] if `cfg.offset` is past the end of `buf`.
    pub fn new(buf: impl Into<Bytes>, cfg: ReaderCfg) -> Result<Self, Error> {
        let buf = buf.into();
        if cfg.offset > buf.len() {
            return Err(Error::Offset {
                offset: cfg.offset,
                length: buf.len(),
            });
        }
        let allow_truncation = match cfg.truncation {
            Truncation::Strict => Latch::new("allow_truncation"),
            Truncation::Tolerant => Latch::raised("allow_truncation"),
        };
        Ok(Self {
            buf,
            offset: cfg.offset,
            endian: cfg.endian,
            utf8: cfg.utf8,
            allow_truncation,
            truncated: Latch::new("truncated"),
        })
    }

    /// Returns the cursor position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the number of bytes after the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Returns the configured byte order.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Returns true if a read has run past the end of the buffer (tolerant mode only).
    pub fn is_truncated(&self) -> bool {
        self.truncated.get()
    }

    /// Marks the input as truncated.
    ///
    /// Used by callers that detect truncation elsewhere. There is no way to clear the flag other
    /// than [Reader::reset].
    pub fn set_truncated(&mut self) {
        if self.truncated.set() {
            debug!(offset = self.offset, "reader marked truncated");
        }
    }

    /// Applies an externally requested value to the truncated flag.
    ///
    /// Fails with [Error::Latch] when asked to clear a raised flag.
    pub fn assign_truncated(&mut self, truncated: bool) -> Result<(), Error> {
        if truncated {
            self.set_truncated();
            return Ok(());
        }
        self.truncated.try_assign(false)
    }

    /// Returns true if the reader tolerates truncation.
    pub fn allows_truncation(&self) -> bool {
        self.allow_truncation.get()
    }

    /// Switches the reader to [Truncation::Tolerant]. There is no way back.
    pub fn allow_truncation(&mut self) {
        self.allow_truncation.set();
    }

    /// Applies an externally requested truncation mode.
    ///
    /// Fails with [Error::Latch] when asked to return to strict mode.
    pub fn assign_allow_truncation(&mut self, allow: bool) -> Result<(), Error> {
        self.allow_truncation.try_assign(allow)
    }

    /// Moves the cursor to `offset`.
    ///
    /// Fails with [Error::Offset] if `offset` is past the end of the buffer, or if the reader
    /// tolerates truncation (tolerant readers only move forward).
    pub fn seek(&mut self, offset: usize) -> Result<(), Error> {
        if offset > self.buf.len() || self.allow_truncation.get() {
            return Err(Error::Offset {
                offset,
                length: self.buf.len(),
            });
        }
        self.offset = offset;
        Ok(())
    }

    /// Moves the cursor to the start of the buffer and clears the truncated flag.
    ///
    /// The offset the reader was created with is not restored.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.truncated.reset();
    }

    /// Returns the bytes after the cursor without consuming them.
    pub fn unused(&self) -> Bytes {
        self.buf.slice(self.offset..)
    }

    /// Advances the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), Error> {
        self.claim(n).map(|_| ())
    }

    /// Fails with [Error::ExtraBytes] if any bytes remain after the cursor.
    ///
    /// A truncated reader is already known to be incomplete, so this is a no-op once truncated.
    pub fn complete(&self) -> Result<(), Error> {
        if self.truncated.get() || self.offset == self.buf.len() {
            return Ok(());
        }
        Err(Error::ExtraBytes {
            offset: self.offset,
            length: self.buf.len(),
        })
    }

    /// Reserves `size` bytes at the cursor and returns where they start.
    ///
    /// Returns `Ok(None)` if the reader is (or just became) truncated.
    fn claim(&mut self, size: usize) -> Result<Option<usize>, Error> {
        if self.truncated.get() {
            return Ok(None);
        }
        let start = self.offset;
        match start.checked_add(size) {
            Some(end) if end <= self.buf.len() => {
                self.offset = end;
                Ok(Some(start))
            }
            _ if self.allow_truncation.get() => {
                self.truncated.set();
                debug!(
                    start,
                    requested = size,
                    size = self.buf.len(),
                    "reader truncated"
                );
                Ok(None)
            }
            _ => Err(Error::Truncation {
                start,
                requested: size,
                size: self.buf.len(),
            }),
        }
    }

    /// Consumes `N` bytes.
    fn take<const N: usize>(&mut self) -> Result<Option<[u8; N]>, Error> {
        let Some(start) = self.claim(N)? else {
            return Ok(None);
        };
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buf[start..start + N]);
        Ok(Some(bytes))
    }

    impl_read!(u8, u8);
    impl_read!(i8, i8);
    impl_read!(u16, u16, u16_endian);
    impl_read!(u32, u32, u32_endian);
    impl_read!(u64, u64, u64_endian);
    impl_read!(i16, i16, i16_endian);
    impl_read!(i32, i32, i32_endian);
    impl_read!(i64, i64, i64_endian);
    impl_read!(f32, f32, f32_endian);
    impl_read!(f64, f64, f64_endian);

    /// Reads a half-precision float in the configured byte order.
    pub fn f16(&mut self) -> Result<f64, Error> {
        self.f16_endian(self.endian)
    }

    /// Reads a half-precision float in the given byte order.
    pub fn f16_endian(&mut self, endian: Endian) -> Result<f64, Error> {
        Ok(match self.take::<2>()? {
            Some(bytes) => half::from_bits(match endian {
                Endian::Big => u16::from_be_bytes(bytes),
                Endian::Little => u16::from_le_bytes(bytes),
            }),
            None => f64::sentinel(),
        })
    }

    /// Reads `n` bytes without copying them.
    pub fn bytes(&mut self, n: usize) -> Result<Bytes, Error> {
        Ok(match self.claim(n)? {
            Some(start) => self.buf.slice(start..start + n),
            None => Bytes::sentinel(),
        })
    }

    /// Reads `n` bytes, mapping each byte to the code point of the same value (Latin-1).
    pub fn ascii(&mut self, n: usize) -> Result<String, Error> {
        Ok(match self.claim(n)? {
            Some(start) => self.buf[start..start + n]
                .iter()
                .map(|&b| b as char)
                .collect(),
            None => String::sentinel(),
        })
    }

    /// Reads `n` bytes of UTF-8 using the configured [Utf8Mode].
    pub fn utf8(&mut self, n: usize) -> Result<String, Error> {
        let Some(start) = self.claim(n)? else {
            return Ok(String::sentinel());
        };
        let raw = &self.buf[start..start + n];
        match self.utf8 {
            Utf8Mode::Strict => Ok(std::str::from_utf8(raw)?.to_owned()),
            Utf8Mode::Replace => Ok(String::from_utf8_lossy(raw).into_owned()),
        }
    }

    /// Calls `f` up to `n` times, collecting the results.
    ///
    /// Stops as soon as the reader is truncated. The result of the call that ran out of bytes is
    /// dropped, so the returned vector only holds values decoded from real input.
    pub fn times<T>(
        &mut self,
        n: usize,
        mut f: impl FnMut(&mut Self) -> Result<T, Error>,
    ) -> Result<Vec<T>, Error> {
        let mut values = Vec::with_capacity(n.min(self.remaining()));
        for _ in 0..n {
            if self.truncated.get() {
                break;
            }
            let value = f(self)?;
            if self.truncated.get() {
                break;
            }
            values.push(value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste::paste;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn strict(buf: &'static [u8]) -> Reader {
        Reader::new(buf, ReaderCfg::default()).unwrap()
    }

    fn tolerant(buf: &'static [u8]) -> Reader {
        Reader::new(buf, ReaderCfg::default().truncation(Truncation::Tolerant)).unwrap()
    }

    macro_rules! impl_num_test {
        ($type:ty, $name:ident) => {
            paste! {
                #[test]
                fn [<test_ $name>]() {
                    let size = std::mem::size_of::<$type>();
                    for value in [0 as $type, 1 as $type, 42 as $type, <$type>::MAX, <$type>::MIN] {
                        let mut reader = Reader::new(value.to_be_bytes().to_vec(), ReaderCfg::default()).unwrap();
                        assert_eq!(reader.$name().unwrap(), value);
                        assert_eq!(reader.offset(), size);
                        reader.complete().unwrap();

                        let cfg = ReaderCfg::default().endian(Endian::Little);
                        let mut reader = Reader::new(value.to_le_bytes().to_vec(), cfg).unwrap();
                        assert_eq!(reader.$name().unwrap(), value);
                        reader.complete().unwrap();
                    }

                    // One byte short
                    let mut reader = Reader::new(vec![0u8; size - 1], ReaderCfg::default()).unwrap();
                    assert_eq!(
                        reader.$name(),
                        Err(Error::Truncation { start: 0, requested: size, size: size - 1 })
                    );
                    assert_eq!(reader.offset(), 0);
                }
            }
        };
    }
    impl_num_test!(u8, u8);
    impl_num_test!(u16, u16);
    impl_num_test!(u32, u32);
    impl_num_test!(u64, u64);
    impl_num_test!(i8, i8);
    impl_num_test!(i16, i16);
    impl_num_test!(i32, i32);
    impl_num_test!(i64, i64);
    impl_num_test!(f32, f32);
    impl_num_test!(f64, f64);

    #[test]
    fn test_sequential() {
        let mut reader = strict(b"abcd");
        assert_eq!(reader.u8().unwrap(), 0x61);
        assert_eq!(reader.u16().unwrap(), 0x6263);
        assert_eq!(reader.offset(), 3);
        assert_eq!(reader.remaining(), 1);
        assert_eq!(
            reader.complete(),
            Err(Error::ExtraBytes {
                offset: 3,
                length: 4
            })
        );
        assert_eq!(reader.u8().unwrap(), 0x64);
        reader.complete().unwrap();
    }

    #[test]
    fn test_endian_override() {
        let mut reader = strict(&[0x01, 0x02, 0x01, 0x02]);
        assert_eq!(reader.u16_endian(Endian::Little).unwrap(), 0x0201);
        assert_eq!(reader.u16().unwrap(), 0x0102);

        let cfg = ReaderCfg::default().endian(Endian::Little);
        let mut reader = Reader::new(&b"\x01\x02\x01\x02"[..], cfg).unwrap();
        assert_eq!(reader.u16().unwrap(), 0x0201);
        assert_eq!(reader.u16_endian(Endian::Big).unwrap(), 0x0102);
    }

    #[test]
    fn test_f16() {
        let mut reader = strict(&[0x3D, 0x00, 0x00, 0x3D, 0x7C]);
        assert_eq!(reader.f16().unwrap(), 1.25);
        assert_eq!(reader.f16_endian(Endian::Little).unwrap(), 1.25);
        assert!(matches!(
            reader.f16(),
            Err(Error::Truncation {
                start: 4,
                requested: 2,
                size: 5
            })
        ));
    }

    #[test]
    fn test_f64_needs_eight_bytes() {
        let mut reader = strict(&[0x3F, 0xF0, 0x00, 0x00, 0x00]);
        assert_eq!(
            reader.f64(),
            Err(Error::Truncation {
                start: 0,
                requested: 8,
                size: 5
            })
        );
    }

    #[test]
    fn test_bytes_zero_copy() {
        let buf = Bytes::from_static(b"hello world");
        let mut reader = Reader::new(buf.clone(), ReaderCfg::default()).unwrap();
        let hello = reader.bytes(5).unwrap();
        assert_eq!(&hello[..], b"hello");
        assert_eq!(hello.as_ptr(), buf.as_ptr());
        assert_eq!(reader.bytes(0).unwrap(), Bytes::new());
        assert_eq!(&reader.unused()[..], b" world");
        assert_eq!(reader.offset(), 5);
    }

    #[test]
    fn test_ascii_latin1() {
        let mut reader = strict(&[0x41, 0xE9, 0xFF]);
        assert_eq!(reader.ascii(3).unwrap(), "A\u{e9}\u{ff}");
    }

    #[test]
    fn test_utf8_modes() {
        let bad: &'static [u8] = &[0x68, 0x69, 0xFF];
        let mut reader = strict(bad);
        assert!(matches!(reader.utf8(3), Err(Error::Utf8(_))));

        let cfg = ReaderCfg::default().utf8(Utf8Mode::Replace);
        let mut reader = Reader::new(bad, cfg).unwrap();
        assert_eq!(reader.utf8(3).unwrap(), "hi\u{fffd}");

        let mut reader = strict("żółw".as_bytes());
        let len = reader.len();
        assert_eq!(reader.utf8(len).unwrap(), "żółw");
    }

    #[test]
    fn test_initial_offset() {
        let cfg = ReaderCfg::default().offset(2);
        let mut reader = Reader::new(&b"abcd"[..], cfg).unwrap();
        assert_eq!(reader.u8().unwrap(), b'c');

        let cfg = ReaderCfg::default().offset(4);
        assert!(Reader::new(&b"abcd"[..], cfg).is_ok());

        let cfg = ReaderCfg::default().offset(5);
        assert_eq!(
            Reader::new(&b"abcd"[..], cfg).err(),
            Some(Error::Offset {
                offset: 5,
                length: 4
            })
        );
    }

    #[test]
    fn test_seek_and_reset() {
        let mut reader = strict(b"abcd");
        reader.seek(3).unwrap();
        assert_eq!(reader.u8().unwrap(), b'd');
        reader.seek(1).unwrap();
        assert_eq!(reader.u8().unwrap(), b'b');
        assert_eq!(
            reader.seek(5),
            Err(Error::Offset {
                offset: 5,
                length: 4
            })
        );
        reader.reset();
        assert_eq!(reader.offset(), 0);
    }

    #[test]
    fn test_seek_tolerant() {
        let mut reader = tolerant(b"abcd");
        assert!(matches!(reader.seek(0), Err(Error::Offset { .. })));
    }

    #[test]
    fn test_skip() {
        let mut reader = strict(b"abcd");
        reader.skip(2).unwrap();
        assert_eq!(reader.u8().unwrap(), b'c');
        assert!(matches!(
            reader.skip(2),
            Err(Error::Truncation {
                start: 3,
                requested: 2,
                size: 4
            })
        ));
    }

    #[test]
    fn test_tolerant_truncation() {
        let mut reader = tolerant(&[1, 2, 3, 4]);
        assert_eq!(reader.bytes(64).unwrap(), Bytes::new());
        assert!(reader.is_truncated());
        assert_eq!(reader.offset(), 0);

        // Every later read returns its sentinel, even if the bytes are there.
        assert_eq!(reader.u8().unwrap(), u8::MAX);
        assert_eq!(reader.i8().unwrap(), i8::MIN);
        assert_eq!(reader.u64().unwrap(), u64::MAX);
        assert_eq!(reader.i64().unwrap(), i64::MIN);
        assert!(reader.f16().unwrap().is_nan());
        assert!(reader.f32().unwrap().is_nan());
        assert!(reader.f64().unwrap().is_nan());
        assert_eq!(reader.ascii(1).unwrap(), "");
        assert_eq!(reader.utf8(1).unwrap(), "");
        reader.skip(1).unwrap();
        assert_eq!(reader.offset(), 0);
        reader.complete().unwrap();

        reader.reset();
        assert!(!reader.is_truncated());
        assert_eq!(reader.u8().unwrap(), 1);
    }

    #[test]
    fn test_set_truncated() {
        let mut reader = strict(&[1, 2]);
        reader.set_truncated();
        assert!(reader.is_truncated());
        reader.assign_truncated(true).unwrap();
        assert_eq!(
            reader.assign_truncated(false),
            Err(Error::Latch("truncated"))
        );
        reader.complete().unwrap();
        assert_eq!(reader.u8().unwrap(), u8::MAX);
    }

    #[test]
    fn test_allow_truncation_one_way() {
        let mut reader = strict(&[1]);
        assert!(!reader.allows_truncation());
        reader.assign_allow_truncation(false).unwrap();
        reader.allow_truncation();
        assert!(reader.allows_truncation());
        assert_eq!(
            reader.assign_allow_truncation(false),
            Err(Error::Latch("allow_truncation"))
        );
        assert_eq!(reader.u16().unwrap(), u16::MAX);
        assert!(reader.is_truncated());

        // Reset clears truncation but not the mode.
        reader.reset();
        assert!(reader.allows_truncation());
    }

    #[test]
    fn test_times() {
        let mut reader = strict(&[1, 2, 3, 4]);
        assert_eq!(reader.times(4, |r| r.u8()).unwrap(), vec![1, 2, 3, 4]);

        let mut reader = tolerant(&[1, 2]);
        assert_eq!(reader.times(4, |r| r.u8()).unwrap(), vec![1, 2]);
        assert!(reader.is_truncated());

        let mut reader = strict(&[1, 2]);
        assert!(matches!(
            reader.times(4, |r| r.u8()),
            Err(Error::Truncation { .. })
        ));

        let mut reader = strict(&[]);
        assert!(reader.times(0, |r| r.u8()).unwrap().is_empty());
    }

    #[test]
    fn test_times_huge_count() {
        let mut reader = tolerant(&[1, 2, 3]);
        assert_eq!(reader.times(usize::MAX, |r| r.u8()).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_cursor_monotonic() {
        let mut rng = StdRng::seed_from_u64(0);
        let buf: Vec<u8> = (0..4096).map(|_| rng.gen()).collect();
        let mut reader = Reader::new(buf, ReaderCfg::default()).unwrap();
        loop {
            let before = reader.offset();
            let expected = match rng.gen_range(0..6) {
                0 => reader.u8().map(|_| 1),
                1 => reader.u16().map(|_| 2),
                2 => reader.u32().map(|_| 4),
                3 => reader.f64().map(|_| 8),
                4 => reader.f16().map(|_| 2),
                _ => {
                    let n = rng.gen_range(0..32);
                    reader.bytes(n).map(|_| n)
                }
            };
            match expected {
                Ok(n) => assert_eq!(reader.offset(), before + n),
                Err(Error::Truncation { start, .. }) => {
                    assert_eq!(start, before);
                    assert_eq!(reader.offset(), before);
                    break;
                }
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
    }

    #[test]
    fn test_truncated_reads_never_reach_buffer() {
        let mut reader = tolerant(&[1, 2, 3, 4]);
        reader.bytes(64).unwrap();
        assert!(reader.is_truncated());

        // The bytes are still there, but no read may consume them.
        assert_eq!(reader.remaining(), 4);
        assert_eq!(reader.u8().unwrap(), u8::MAX);
        assert_eq!(reader.u32().unwrap(), u32::MAX);
        assert_eq!(reader.bytes(1).unwrap(), Bytes::new());
        assert!(reader.times(4, |r| r.u8()).unwrap().is_empty());
        reader.skip(2).unwrap();
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.remaining(), 4);

        // A sentinel-valued byte in the input is only distinguishable through the flag.
        let mut reader = tolerant(&[0xFF]);
        assert_eq!(reader.u8().unwrap(), u8::MAX);
        assert!(!reader.is_truncated());
        assert_eq!(reader.u8().unwrap(), u8::MAX);
        assert!(reader.is_truncated());
    }

    #[test]
    fn test_strict_short_read_is_an_error() {
        let mut reader = strict(&[7]);
        assert_eq!(
            reader.u32(),
            Err(Error::Truncation {
                start: 0,
                requested: 4,
                size: 1
            })
        );
        assert_eq!(reader.u8().unwrap(), 7);
    }
}
