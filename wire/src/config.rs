//! Configuration for [crate::Reader] and [crate::Writer].

/// Byte order used for multi-byte values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Most significant byte first (network order).
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

impl Endian {
    /// Returns true if this is [Endian::Little].
    pub const fn is_little(self) -> bool {
        matches!(self, Self::Little)
    }
}

impl From<bool> for Endian {
    /// Interprets the value as "little endian?".
    fn from(little: bool) -> Self {
        if little {
            Self::Little
        } else {
            Self::Big
        }
    }
}

/// How ill-formed UTF-8 is handled when decoding strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Utf8Mode {
    /// Fail with [crate::Error::Utf8].
    #[default]
    Strict,
    /// Substitute U+FFFD for each ill-formed sequence.
    Replace,
}

/// What a [crate::Reader] does when asked for more bytes than remain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Truncation {
    /// Fail with [crate::Error::Truncation].
    #[default]
    Strict,
    /// Raise the `truncated` flag and return sentinel values from then on.
    Tolerant,
}

/// Configuration for a [crate::Reader].
///
/// # Examples
///
/// ```
/// use commonware_wire::{Endian, ReaderCfg, Truncation};
///
/// let cfg = ReaderCfg::default().endian(Endian::Little).truncation(Truncation::Tolerant);
/// assert_eq!(cfg.offset, 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReaderCfg {
    /// Initial cursor position.
    pub offset: usize,
    /// Default byte order.
    pub endian: Endian,
    /// Handling of ill-formed UTF-8.
    pub utf8: Utf8Mode,
    /// Handling of reads past the end of the buffer.
    pub truncation: Truncation,
}

impl ReaderCfg {
    /// Sets the initial cursor position.
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the default byte order.
    pub const fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Sets the UTF-8 decoding mode.
    pub const fn utf8(mut self, utf8: Utf8Mode) -> Self {
        self.utf8 = utf8;
        self
    }

    /// Sets the truncation mode.
    pub const fn truncation(mut self, truncation: Truncation) -> Self {
        self.truncation = truncation;
        self
    }
}

/// Smallest accepted [WriterCfg::chunk_size].
///
/// The widest typed write is 8 bytes, so every chunk must be able to hold at least one.
pub const MIN_CHUNK_SIZE: usize = 8;

/// Default [WriterCfg::chunk_size].
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Configuration for a [crate::Writer].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WriterCfg {
    /// Capacity of each chunk. Must be at least [MIN_CHUNK_SIZE].
    pub chunk_size: usize,
    /// Whether large buffers passed with [crate::Chunk::Owned] are copied instead of adopted.
    pub copy: bool,
    /// Default byte order.
    pub endian: Endian,
}

impl Default for WriterCfg {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            copy: false,
            endian: Endian::Big,
        }
    }
}

impl WriterCfg {
    /// Sets the chunk capacity.
    pub const fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets whether adopted buffers are copied.
    pub const fn copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    /// Sets the default byte order.
    pub const fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }
}
