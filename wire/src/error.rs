//! Error types for wire operations

use thiserror::Error;

/// Error type for wire operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid offset: {offset} (length {length})")]
    Offset { offset: usize, length: usize },
    #[error("truncated: requested {requested} bytes at offset {start} of {size}")]
    Truncation {
        start: usize,
        requested: usize,
        size: usize,
    },
    #[error("extra bytes: {} unread at offset {offset} of {length}", .length - .offset)]
    ExtraBytes { offset: usize, length: usize },
    #[error("invalid chunk size: {0} < {1}")]
    ChunkSize(usize, usize), // found, min
    #[error("out of range for {0}: {1}")]
    Range(&'static str, String), // kind, value
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("field {0} is not {1}")]
    FieldType(String, &'static str), // field, expected
    #[error("invalid bit range for {0}: {1}")]
    BitRange(String, String), // field, message
    #[error("invalid data in {0}: {1}")]
    InvalidData(String, String), // context, message
    #[error("cannot clear {0} once set")]
    Latch(&'static str),
}
