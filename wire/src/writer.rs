//! Growable, typed encoding into a list of fixed-capacity chunks.
//!
//! Small writes are copied into the open (last) chunk. Writes that don't fit and are nearly a
//! chunk long or longer are stored as their own chunk, which for [Chunk::Owned] input means no copy
//! at all. Chunks are only coalesced into one contiguous buffer by [Writer::read] or
//! [Writer::peek].

use crate::{
    config::MIN_CHUNK_SIZE,
    half,
    schema::{FloatKind, IntKind},
    Endian, Error, WriterCfg,
};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

/// Headroom kept for the widest typed write (8 bytes).
const SLACK: usize = 8;

/// Input to [Writer::write_chunk].
#[derive(Clone, Debug)]
pub enum Chunk<'a> {
    /// Bytes the writer can't keep a reference to. Always copied.
    Borrowed(&'a [u8]),
    /// Bytes the writer may keep without copying.
    Owned(Bytes),
}

impl Chunk<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Borrowed(slice) => slice,
            Self::Owned(bytes) => bytes,
        }
    }
}

impl<'a> From<&'a [u8]> for Chunk<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Self::Borrowed(slice)
    }
}

impl From<Bytes> for Chunk<'_> {
    fn from(bytes: Bytes) -> Self {
        Self::Owned(bytes)
    }
}

/// Accumulates typed writes.
///
/// # Example
///
/// ```
/// use commonware_wire::{Writer, WriterCfg};
///
/// let mut writer = Writer::new(WriterCfg::default().chunk_size(8)).unwrap();
/// writer.utf8("123456789");
/// writer.write(&[0x0a, 0x0b, 0x0c]);
/// assert_eq!(writer.chunks(), 2);
/// assert_eq!(&writer.read()[..], b"123456789\x0a\x0b\x0c");
/// assert!(writer.is_empty());
/// ```
#[derive(Debug)]
pub struct Writer {
    cfg: WriterCfg,
    /// Closed chunks, each trimmed to its content.
    sealed: Vec<Bytes>,
    /// The open chunk. Its length is the cursor.
    current: BytesMut,
    /// Total bytes written.
    length: usize,
}

macro_rules! impl_write {
    ($type:ty, $name:ident) => {
        #[doc = concat!("Writes a `", stringify!($type), "`.")]
        pub fn $name(&mut self, value: $type) {
            self.put(&value.to_be_bytes());
        }
    };
    ($type:ty, $name:ident, $name_endian:ident) => {
        #[doc = concat!("Writes a `", stringify!($type), "` in the configured byte order.")]
        pub fn $name(&mut self, value: $type) {
            self.$name_endian(value, self.cfg.endian);
        }

        #[doc = concat!("Writes a `", stringify!($type), "` in the given byte order.")]
        pub fn $name_endian(&mut self, value: $type, endian: Endian) {
            match endian {
                Endian::Big => self.put(&value.to_be_bytes()),
                Endian::Little => self.put(&value.to_le_bytes()),
            }
        }
    };
}

impl Writer {
    /// Creates an empty writer.
    ///
    /// Fails with [Error::ChunkSize] if `cfg.chunk_size` is smaller than [MIN_CHUNK_SIZE].
    pub fn new(cfg: WriterCfg) -> Result<Self, Error> {
        if cfg.chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::ChunkSize(cfg.chunk_size, MIN_CHUNK_SIZE));
        }
        Ok(Self {
            cfg,
            sealed: Vec::new(),
            current: BytesMut::with_capacity(cfg.chunk_size),
            length: 0,
        })
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the number of chunks currently holding data.
    pub fn chunks(&self) -> usize {
        self.sealed.len() + usize::from(!self.current.is_empty())
    }

    /// Returns the writer's configuration.
    pub fn cfg(&self) -> &WriterCfg {
        &self.cfg
    }

    /// Space left in the open chunk.
    fn available(&self) -> usize {
        self.current.capacity() - self.current.len()
    }

    /// Moves the content of the open chunk to the sealed list, keeping any spare capacity open.
    fn seal(&mut self) {
        if !self.current.is_empty() {
            self.sealed.push(self.current.split().freeze());
        }
    }

    /// Seals the open chunk and starts a new, empty one.
    fn grow(&mut self) {
        self.seal();
        self.current = BytesMut::with_capacity(self.cfg.chunk_size);
        trace!(chunks = self.sealed.len(), "allocated chunk");
    }

    /// Copies a value no wider than [SLACK] bytes into the open chunk.
    fn put(&mut self, bytes: &[u8]) {
        if self.available() < bytes.len() {
            self.grow();
        }
        self.current.put_slice(bytes);
        self.length += bytes.len();
    }

    /// Appends `buf`, copying it.
    pub fn write(&mut self, buf: &[u8]) {
        self.write_chunk(Chunk::Borrowed(buf), true);
    }

    /// Appends `buf`, adopting it without a copy when it is large unless
    /// [WriterCfg::copy] is set.
    pub fn write_owned(&mut self, buf: Bytes) {
        self.write_chunk(Chunk::Owned(buf), self.cfg.copy);
    }

    /// Appends `chunk`.
    ///
    /// If `chunk` fits in the open chunk it is copied there. Otherwise, if it is longer than
    /// `chunk_size - 8` bytes, it becomes a chunk of its own (copied if `copy` is set or the input
    /// is borrowed). Otherwise a new chunk is started and `chunk` is copied to its front.
    pub fn write_chunk(&mut self, chunk: Chunk<'_>, copy: bool) {
        let len = chunk.as_slice().len();
        if len <= self.available() {
            self.current.put_slice(chunk.as_slice());
        } else if len > self.cfg.chunk_size - SLACK {
            self.seal();
            let adopted = match chunk {
                Chunk::Owned(bytes) if !copy => bytes,
                chunk => Bytes::copy_from_slice(chunk.as_slice()),
            };
            trace!(len, "stored buffer as chunk");
            self.sealed.push(adopted);
        } else {
            self.grow();
            self.current.put_slice(chunk.as_slice());
        }
        self.length += len;
    }

    impl_write!(u8, u8);
    impl_write!(i8, i8);
    impl_write!(u16, u16, u16_endian);
    impl_write!(u32, u32, u32_endian);
    impl_write!(u64, u64, u64_endian);
    impl_write!(i16, i16, i16_endian);
    impl_write!(i32, i32, i32_endian);
    impl_write!(i64, i64, i64_endian);
    impl_write!(f32, f32, f32_endian);
    impl_write!(f64, f64, f64_endian);

    /// Writes `value` as a half-precision float in the configured byte order.
    ///
    /// Fails with [Error::Range] if `value` isn't exactly representable.
    pub fn f16(&mut self, value: f64) -> Result<(), Error> {
        self.f16_endian(value, self.cfg.endian)
    }

    /// Writes `value` as a half-precision float in the given byte order.
    pub fn f16_endian(&mut self, value: f64, endian: Endian) -> Result<(), Error> {
        let bits = half::encode_half(value)
            .ok_or_else(|| Error::Range(FloatKind::F16.name(), value.to_string()))?;
        self.u16_endian(bits, endian);
        Ok(())
    }

    /// Writes an integer of the given width after checking that it fits.
    ///
    /// Fails with [Error::Range] (and writes nothing) if `value` is outside `kind`'s bounds.
    pub fn int(&mut self, kind: IntKind, value: i128) -> Result<(), Error> {
        self.int_endian(kind, value, self.cfg.endian)
    }

    /// Like [Writer::int] with an explicit byte order.
    pub fn int_endian(&mut self, kind: IntKind, value: i128, endian: Endian) -> Result<(), Error> {
        if !kind.contains(value) {
            return Err(Error::Range(kind.name(), value.to_string()));
        }
        // Bounds were checked above, so the casts are exact.
        match kind {
            IntKind::U8 => self.u8(value as u8),
            IntKind::U16 => self.u16_endian(value as u16, endian),
            IntKind::U32 => self.u32_endian(value as u32, endian),
            IntKind::U64 => self.u64_endian(value as u64, endian),
            IntKind::I8 => self.i8(value as i8),
            IntKind::I16 => self.i16_endian(value as i16, endian),
            IntKind::I32 => self.i32_endian(value as i32, endian),
            IntKind::I64 => self.i64_endian(value as i64, endian),
        }
        Ok(())
    }

    /// Writes a number given as an `f64` as an integer of the given width.
    ///
    /// Fails with [Error::Range] if `value` is not finite, has a fractional part, or is out of
    /// bounds.
    pub fn int_from_f64(&mut self, kind: IntKind, value: f64) -> Result<(), Error> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(Error::Range(kind.name(), value.to_string()));
        }
        // Saturates outside the i128 domain, which every kind rejects anyway.
        self.int(kind, value as i128)
    }

    /// Writes a float of the given width after checking that no precision is lost.
    ///
    /// `F32` accepts NaN and values that survive a round trip through `f32`. `F16` accepts values
    /// for which [half::is_exact_half] holds. `F64` accepts everything.
    pub fn float(&mut self, kind: FloatKind, value: f64) -> Result<(), Error> {
        self.float_endian(kind, value, self.cfg.endian)
    }

    /// Like [Writer::float] with an explicit byte order.
    pub fn float_endian(
        &mut self,
        kind: FloatKind,
        value: f64,
        endian: Endian,
    ) -> Result<(), Error> {
        match kind {
            FloatKind::F16 => self.f16_endian(value, endian)?,
            FloatKind::F32 => {
                let narrow = value as f32;
                if !value.is_nan() && narrow as f64 != value {
                    return Err(Error::Range(kind.name(), value.to_string()));
                }
                self.f32_endian(narrow, endian);
            }
            FloatKind::F64 => self.f64_endian(value, endian),
        }
        Ok(())
    }

    /// Writes `s` as one byte per character.
    ///
    /// Fails with [Error::Range] (and writes nothing) if any character is above U+00FF.
    pub fn ascii(&mut self, s: &str) -> Result<(), Error> {
        let bytes = s
            .chars()
            .map(|c| u8::try_from(c).map_err(|_| Error::Range("ascii", format!("{c:?}"))))
            .collect::<Result<Vec<u8>, Error>>()?;
        self.write(&bytes);
        Ok(())
    }

    /// Writes `s` as UTF-8.
    pub fn utf8(&mut self, s: &str) {
        self.write(s.as_bytes());
    }

    /// Joins every chunk into one buffer that becomes the only chunk.
    fn coalesce(&mut self) -> Bytes {
        self.seal();
        match self.sealed.len() {
            0 => Bytes::new(),
            1 => self.sealed[0].clone(),
            chunks => {
                trace!(chunks, length = self.length, "coalescing chunks");
                let mut joined = BytesMut::with_capacity(self.length);
                for chunk in &self.sealed {
                    joined.put_slice(chunk);
                }
                let joined = joined.freeze();
                self.sealed = vec![joined.clone()];
                joined
            }
        }
    }

    /// Returns everything written so far and clears the writer.
    pub fn read(&mut self) -> Bytes {
        let out = self.coalesce();
        self.clear();
        out
    }

    /// Returns everything written so far without clearing the writer.
    ///
    /// The joined buffer is kept, so a following [Writer::peek] or [Writer::read] doesn't copy
    /// again.
    pub fn peek(&mut self) -> Bytes {
        self.coalesce()
    }

    /// Discards everything written.
    pub fn clear(&mut self) {
        self.sealed.clear();
        self.current = BytesMut::with_capacity(self.cfg.chunk_size);
        self.length = 0;
    }
}

impl std::io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Writer::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
