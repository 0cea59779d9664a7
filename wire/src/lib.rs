//! Read, write, and accumulate fixed-width binary fields.
//!
//! # Overview
//!
//! Binary formats are often described as a sequence of fields: a `u16` here, a length-prefixed
//! string there, a flags byte whose individual bits carry meaning. This crate provides the pieces
//! to work with such formats directly:
//! - [Reader]: a cursor over an immutable buffer with typed, endian-aware reads
//! - [Writer]: a growable sink that stores its output in fixed-capacity chunks
//! - [Packet]: a [Reader] that records every value it reads under a name, with bit-range and flag
//!   extraction through [Bits]
//! - [half]: IEEE 754 half-precision conversion, which the standard library doesn't provide
//!
//! # Truncation
//!
//! By default, reading past the end of the input fails with [Error::Truncation]. A reader can
//! instead tolerate truncation ([Truncation::Tolerant]): the first read that runs out of bytes
//! marks the reader truncated and returns a sentinel ([Sentinel]) without moving the cursor. Every
//! read after that does the same, and a [Packet] stops storing fields, so decoding a partial
//! message yields exactly the fields that were present.
//!
//! # Example
//!
//! ```
//! use commonware_wire::{Bits, Packet, ReaderCfg, Value, Writer, WriterCfg};
//!
//! // Encode a message
//! let mut writer = Writer::new(WriterCfg::default()).unwrap();
//! writer.u8(0b0000_0101);
//! writer.u16(5);
//! writer.utf8("hello");
//! writer.f16(0.5).unwrap();
//! let buf = writer.read();
//!
//! // Decode it
//! let mut packet = Packet::from_bytes(buf, ReaderCfg::default()).unwrap();
//! packet
//!     .u8("flags")?
//!     .bits(&Bits::flags("flags", "set", [("ack", 0), ("syn", 1), ("fin", 2)]))?
//!     .u16("len")?;
//! let len = packet.get_as::<usize>("len")?;
//! packet.utf8("body", len)?.f16("ratio")?.complete()?;
//!
//! assert_eq!(packet.get("body"), Some(&Value::Utf8("hello".into())));
//! assert_eq!(packet.get("ratio"), Some(&Value::F16(0.5)));
//! let set = packet.get("set").and_then(Value::as_flags).unwrap();
//! assert!(set.contains("ack") && set.contains("fin") && !set.contains("syn"));
//! # Ok::<(), commonware_wire::Error>(())
//! ```

pub mod bits;
pub mod config;
pub mod error;
pub mod half;
pub mod latch;
pub mod packet;
pub mod reader;
pub mod schema;
pub mod value;
pub mod writer;

// Re-export main types and traits
pub use bits::Bits;
pub use config::{Endian, ReaderCfg, Truncation, Utf8Mode, WriterCfg};
pub use error::Error;
pub use latch::Latch;
pub use packet::{Opts, Packet};
pub use reader::{Reader, Sentinel};
pub use value::{FromValue, Record, Value};
pub use writer::{Chunk, Writer};
