//! Decode a structured message into named fields.
//!
//! A [Packet] wraps a [Reader] and stores each value it reads under a name, either in the output
//! record (what the caller gets back) or in the temporary record (values such as length prefixes
//! that only steer later reads). Stored integers can be split into bit ranges and flags with
//! [Packet::bits].
//!
//! When the reader tolerates truncation, nothing is stored once the input has run out, so the
//! record holds only what was really decoded.
//!
//! # Example
//!
//! ```
//! use commonware_wire::{Bits, Packet, ReaderCfg, Value};
//!
//! let mut packet = Packet::from_bytes(&b"\x81\x03abc"[..], ReaderCfg::default()).unwrap();
//! packet
//!     .u8("header")?
//!     .bits(&Bits::bit("header", "compressed", 7))?
//!     .u8_with("len", commonware_wire::Opts::new().temp())?;
//! let len = packet.get_temp_as::<usize>("len")?;
//! packet.ascii("body", len)?.complete()?;
//!
//! assert_eq!(packet.get("compressed"), Some(&Value::Bool(true)));
//! assert_eq!(packet.get("body"), Some(&Value::Ascii("abc".into())));
//! # Ok::<(), commonware_wire::Error>(())
//! ```

use crate::{
    bits::{self, Bits},
    schema::{Field, FloatKind, IntKind, Kind, Len},
    value::{FromValue, Record},
    Endian, Error, Reader, ReaderCfg, Value,
};
use bytes::Bytes;
use paste::paste;
use tracing::{debug, trace};

/// Transforms a value before it is stored. Called with the value, the field name, and whether the
/// field is temporary.
pub type Convert<'a> = &'a dyn Fn(Value, &str, bool) -> Result<Value, Error>;

/// Per-call options for [Packet] reads.
#[derive(Clone, Copy, Default)]
pub struct Opts<'a> {
    /// Store in the temporary record.
    pub temp: bool,
    /// Byte order override for this read.
    pub endian: Option<Endian>,
    /// Transformation applied before storing.
    pub convert: Option<Convert<'a>>,
}

impl<'a> Opts<'a> {
    pub const fn new() -> Self {
        Self {
            temp: false,
            endian: None,
            convert: None,
        }
    }

    /// Stores the field in the temporary record.
    pub const fn temp(mut self) -> Self {
        self.temp = true;
        self
    }

    /// Reads the field in the given byte order.
    pub const fn endian(mut self, endian: Endian) -> Self {
        self.endian = Some(endian);
        self
    }

    /// Reads the field in little-endian order.
    pub const fn little_endian(self) -> Self {
        self.endian(Endian::Little)
    }

    /// Transforms the value before it is stored.
    pub const fn convert(mut self, convert: Convert<'a>) -> Self {
        self.convert = Some(convert);
        self
    }
}

impl std::fmt::Debug for Opts<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opts")
            .field("temp", &self.temp)
            .field("endian", &self.endian)
            .field("convert", &self.convert.is_some())
            .finish()
    }
}

/// Accumulates named fields decoded from a [Reader].
#[derive(Clone, Debug)]
pub struct Packet {
    reader: Reader,
    record: Record,
    temp: Record,
}

// Fixed-width reads. `$name` reads with default options, `$name_with` takes [Opts].
macro_rules! impl_field {
    ($name:ident, $variant:ident) => {
        paste! {
            #[doc = concat!("Reads a `", stringify!($name), "` into field `name`.")]
            pub fn $name(&mut self, name: &str) -> Result<&mut Self, Error> {
                self.[<$name _with>](name, Opts::new())
            }

            #[doc = concat!("Reads a `", stringify!($name), "` into field `name` with options.")]
            pub fn [<$name _with>](
                &mut self,
                name: &str,
                opts: Opts<'_>,
            ) -> Result<&mut Self, Error> {
                let value = self.reader.$name()?;
                self.store(name, Value::$variant(value), &opts)
            }
        }
    };
    ($name:ident, $variant:ident, endian) => {
        paste! {
            #[doc = concat!("Reads a `", stringify!($name), "` into field `name`.")]
            pub fn $name(&mut self, name: &str) -> Result<&mut Self, Error> {
                self.[<$name _with>](name, Opts::new())
            }

            #[doc = concat!("Reads a `", stringify!($name), "` into field `name` with options.")]
            pub fn [<$name _with>](
                &mut self,
                name: &str,
                opts: Opts<'_>,
            ) -> Result<&mut Self, Error> {
                let value = match opts.endian {
                    Some(endian) => self.reader.[<$name _endian>](endian)?,
                    None => self.reader.$name()?,
                };
                self.store(name, Value::$variant(value), &opts)
            }
        }
    };
}

impl Packet {
    /// Wraps `reader`.
    pub fn new(reader: Reader) -> Self {
        Self {
            reader,
            record: Record::new(),
            temp: Record::new(),
        }
    }

    /// Creates a reader over `buf` and wraps it.
    pub fn from_bytes(buf: impl Into<Bytes>, cfg: ReaderCfg) -> Result<Self, Error> {
        Ok(Self::new(Reader::new(buf, cfg)?))
    }

    /// Returns the wrapped reader.
    ///
    /// Only shared access is given out, so the reader is always rewound through [Packet::reset]
    /// together with the records.
    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    /// Returns the output record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Returns the temporary record.
    pub fn temp(&self) -> &Record {
        &self.temp
    }

    /// Consumes the packet, returning the output record.
    pub fn into_record(self) -> Record {
        self.record
    }

    /// Returns the output field `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    /// Returns the temporary field `name`.
    pub fn get_temp(&self, name: &str) -> Option<&Value> {
        self.temp.get(name)
    }

    /// Returns the output field `name` as a `T`.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T, Error> {
        Self::lookup(&self.record, name)
    }

    /// Returns the temporary field `name` as a `T`.
    pub fn get_temp_as<T: FromValue>(&self, name: &str) -> Result<T, Error> {
        Self::lookup(&self.temp, name)
    }

    fn lookup<T: FromValue>(record: &Record, name: &str) -> Result<T, Error> {
        let value = record
            .get(name)
            .ok_or_else(|| Error::MissingField(name.to_owned()))?;
        T::from_value(value).ok_or_else(|| Error::FieldType(name.to_owned(), T::EXPECTED))
    }

    /// Returns the cursor position.
    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    /// Returns the number of bytes after the cursor.
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// Returns true if the reader tolerates truncation.
    pub fn allows_truncation(&self) -> bool {
        self.reader.allows_truncation()
    }

    /// Switches the reader to tolerate truncation. There is no way back.
    pub fn allow_truncation(&mut self) {
        self.reader.allow_truncation();
    }

    /// Applies an externally requested truncation mode (see [Reader::assign_allow_truncation]).
    pub fn assign_allow_truncation(&mut self, allow: bool) -> Result<(), Error> {
        self.reader.assign_allow_truncation(allow)
    }

    /// Returns true if the input has been found to be truncated.
    pub fn is_truncated(&self) -> bool {
        self.reader.is_truncated()
    }

    /// Marks the input as truncated. Nothing is stored afterwards.
    pub fn set_truncated(&mut self) {
        self.reader.set_truncated();
    }

    /// Applies an externally requested truncated flag (see [Reader::assign_truncated]).
    pub fn assign_truncated(&mut self, truncated: bool) -> Result<(), Error> {
        self.reader.assign_truncated(truncated)
    }

    /// Rewinds the reader and forgets every stored field.
    pub fn reset(&mut self) {
        debug!(
            fields = self.record.len(),
            temp = self.temp.len(),
            "resetting packet"
        );
        self.reader.reset();
        self.record.clear();
        self.temp.clear();
    }

    /// Fails with [Error::ExtraBytes] if input remains (see [Reader::complete]).
    pub fn complete(&self) -> Result<(), Error> {
        self.reader.complete()
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<&mut Self, Error> {
        self.reader.skip(n)?;
        Ok(self)
    }

    /// Stores `value` under `name` unless the reader is truncated.
    fn store(&mut self, name: &str, value: Value, opts: &Opts<'_>) -> Result<&mut Self, Error> {
        if self.reader.is_truncated() {
            trace!(name, "truncated, not storing");
            return Ok(self);
        }
        let value = match opts.convert {
            Some(convert) => convert(value, name, opts.temp)?,
            None => value,
        };
        let record = if opts.temp {
            &mut self.temp
        } else {
            &mut self.record
        };
        record.insert(name.to_owned(), value);
        Ok(self)
    }

    impl_field!(u8, U8);
    impl_field!(i8, I8);
    impl_field!(u16, U16, endian);
    impl_field!(u32, U32, endian);
    impl_field!(u64, U64, endian);
    impl_field!(i16, I16, endian);
    impl_field!(i32, I32, endian);
    impl_field!(i64, I64, endian);
    impl_field!(f16, F16, endian);
    impl_field!(f32, F32, endian);
    impl_field!(f64, F64, endian);

    /// Reads `len` bytes into field `name`.
    pub fn bytes(&mut self, name: &str, len: usize) -> Result<&mut Self, Error> {
        self.bytes_with(name, len, Opts::new())
    }

    /// Reads `len` bytes into field `name` with options.
    pub fn bytes_with(
        &mut self,
        name: &str,
        len: usize,
        opts: Opts<'_>,
    ) -> Result<&mut Self, Error> {
        let value = self.reader.bytes(len)?;
        self.store(name, Value::Bytes(value), &opts)
    }

    /// Reads `len` Latin-1 characters into field `name`.
    pub fn ascii(&mut self, name: &str, len: usize) -> Result<&mut Self, Error> {
        self.ascii_with(name, len, Opts::new())
    }

    /// Reads `len` Latin-1 characters into field `name` with options.
    pub fn ascii_with(
        &mut self,
        name: &str,
        len: usize,
        opts: Opts<'_>,
    ) -> Result<&mut Self, Error> {
        let value = self.reader.ascii(len)?;
        self.store(name, Value::Ascii(value), &opts)
    }

    /// Reads `len` bytes of UTF-8 into field `name`.
    pub fn utf8(&mut self, name: &str, len: usize) -> Result<&mut Self, Error> {
        self.utf8_with(name, len, Opts::new())
    }

    /// Reads `len` bytes of UTF-8 into field `name` with options.
    pub fn utf8_with(
        &mut self,
        name: &str,
        len: usize,
        opts: Opts<'_>,
    ) -> Result<&mut Self, Error> {
        let value = self.reader.utf8(len)?;
        self.store(name, Value::Utf8(value), &opts)
    }

    /// Stores the bytes after the cursor in field `name` without consuming them.
    pub fn unused(&mut self, name: &str) -> Result<&mut Self, Error> {
        self.unused_with(name, Opts::new())
    }

    /// Like [Packet::unused] with options.
    pub fn unused_with(&mut self, name: &str, opts: Opts<'_>) -> Result<&mut Self, Error> {
        let value = self.reader.unused();
        self.store(name, Value::Bytes(value), &opts)
    }

    /// Stores `value` in field `name` without reading anything.
    pub fn constant(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, Error> {
        self.constant_with(name, value, Opts::new())
    }

    /// Like [Packet::constant] with options.
    pub fn constant_with(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        opts: Opts<'_>,
    ) -> Result<&mut Self, Error> {
        self.store(name, value.into(), &opts)
    }

    /// Calls `f` up to `n` times and stores the results as a sequence (see [Reader::times]).
    pub fn times<T, F>(&mut self, name: &str, n: usize, f: F) -> Result<&mut Self, Error>
    where
        T: Into<Value>,
        F: FnMut(&mut Reader) -> Result<T, Error>,
    {
        self.times_with(name, n, f, Opts::new())
    }

    /// Like [Packet::times] with options.
    pub fn times_with<T, F>(
        &mut self,
        name: &str,
        n: usize,
        f: F,
        opts: Opts<'_>,
    ) -> Result<&mut Self, Error>
    where
        T: Into<Value>,
        F: FnMut(&mut Reader) -> Result<T, Error>,
    {
        let values = self.reader.times(n, f)?;
        let values = values.into_iter().map(Into::into).collect();
        self.store(name, Value::Seq(values), &opts)
    }

    /// Calls `f` for as long as `keep_going` returns true (given the iteration number and the
    /// reader) and the reader isn't truncated, then stores the results as a sequence.
    ///
    /// Only truncation or `keep_going` end the loop.
    pub fn repeat_while<T, K, F>(
        &mut self,
        name: &str,
        keep_going: K,
        f: F,
    ) -> Result<&mut Self, Error>
    where
        T: Into<Value>,
        K: FnMut(usize, &Reader) -> bool,
        F: FnMut(&mut Reader) -> Result<T, Error>,
    {
        self.repeat_while_with(name, keep_going, f, Opts::new())
    }

    /// Like [Packet::repeat_while] with options.
    pub fn repeat_while_with<T, K, F>(
        &mut self,
        name: &str,
        mut keep_going: K,
        mut f: F,
        opts: Opts<'_>,
    ) -> Result<&mut Self, Error>
    where
        T: Into<Value>,
        K: FnMut(usize, &Reader) -> bool,
        F: FnMut(&mut Reader) -> Result<T, Error>,
    {
        let mut values = Vec::new();
        let mut iteration = 0;
        while !self.reader.is_truncated() && keep_going(iteration, &self.reader) {
            let value = f(&mut self.reader)?;
            if self.reader.is_truncated() {
                break;
            }
            values.push(value.into());
            iteration += 1;
        }
        self.store(name, Value::Seq(values), &opts)
    }

    /// Calls `f` with this packet if `condition` holds and the reader isn't truncated.
    pub fn maybe<F>(&mut self, condition: bool, f: F) -> Result<&mut Self, Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        if condition && !self.reader.is_truncated() {
            f(&mut *self)?;
        }
        Ok(self)
    }

    /// Derives a field from bits of a stored integer (see [crate::bits]).
    pub fn bits(&mut self, bits: &Bits) -> Result<&mut Self, Error> {
        self.bits_with(bits, Opts::new())
    }

    /// Like [Packet::bits] with options. `opts.temp` selects where the result is stored.
    ///
    /// If the source field was never stored and the reader tolerates truncation, nothing
    /// happens. Otherwise a missing source fails with [Error::MissingField].
    pub fn bits_with(&mut self, bits: &Bits, opts: Opts<'_>) -> Result<&mut Self, Error> {
        let source = if bits.from_temp {
            self.temp.get(&bits.from)
        } else {
            self.record.get(&bits.from)
        };
        let Some(source) = source else {
            if self.reader.allows_truncation() {
                return Ok(self);
            }
            return Err(Error::MissingField(bits.from.clone()));
        };
        let value = bits::extract(&bits.from, source, &bits.select)?;
        self.store(&bits.to, value, &opts)
    }

    /// Resolves a [Len], returning `None` if it refers to a field that was skipped because the
    /// input is truncated.
    fn resolve(&self, len: &Len) -> Result<Option<usize>, Error> {
        let (record, name) = match len {
            Len::Fixed(len) => return Ok(Some(*len)),
            Len::Field(name) => (&self.record, name),
            Len::Temp(name) => (&self.temp, name),
        };
        if !record.contains_key(name) && self.reader.is_truncated() {
            return Ok(None);
        }
        Self::lookup::<usize>(record, name).map(Some)
    }

    /// Reads each field of a layout in order.
    pub fn fields(&mut self, fields: &[Field]) -> Result<&mut Self, Error> {
        for field in fields {
            self.field(field)?;
        }
        Ok(self)
    }

    /// Reads a single field of a layout.
    pub fn field(&mut self, field: &Field) -> Result<&mut Self, Error> {
        let opts = Opts {
            temp: field.temp,
            endian: field.endian,
            convert: None,
        };
        let name = field.name.as_str();
        match &field.kind {
            Kind::Int(kind) => match kind {
                IntKind::U8 => self.u8_with(name, opts),
                IntKind::U16 => self.u16_with(name, opts),
                IntKind::U32 => self.u32_with(name, opts),
                IntKind::U64 => self.u64_with(name, opts),
                IntKind::I8 => self.i8_with(name, opts),
                IntKind::I16 => self.i16_with(name, opts),
                IntKind::I32 => self.i32_with(name, opts),
                IntKind::I64 => self.i64_with(name, opts),
            },
            Kind::Float(kind) => match kind {
                FloatKind::F16 => self.f16_with(name, opts),
                FloatKind::F32 => self.f32_with(name, opts),
                FloatKind::F64 => self.f64_with(name, opts),
            },
            Kind::Bytes(len) => match self.resolve(len)? {
                Some(len) => self.bytes_with(name, len, opts),
                None => Ok(self),
            },
            Kind::Ascii(len) => match self.resolve(len)? {
                Some(len) => self.ascii_with(name, len, opts),
                None => Ok(self),
            },
            Kind::Utf8(len) => match self.resolve(len)? {
                Some(len) => self.utf8_with(name, len, opts),
                None => Ok(self),
            },
            Kind::Unused => self.unused_with(name, opts),
            Kind::Constant(value) => self.constant_with(name, value.clone(), opts),
        }
    }
}
