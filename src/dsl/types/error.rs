//! Custom error types for the dsl-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum DslError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The dictionary source violates the headword/body block structure.
    /// Scanning stops at the first such violation.
    #[error("Malformed dictionary source at byte {offset}: {message}")]
    StructuralScan { offset: u64, message: String },

    /// A persisted index could not be loaded. The index must be treated as
    /// unusable; callers may rebuild it from the dictionary source.
    #[error("Invalid index: {0}")]
    IndexFormat(#[from] IndexFormatError),

    /// A value does not fit the fixed-width field of the index format.
    #[error("Index field `{field}` overflow: {value} exceeds {max}")]
    IndexOverflow {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// A read was requested past the end of a byte-range source.
    #[error("Read of {length} bytes at offset {offset} exceeds source size {size}")]
    OutOfBounds { offset: u64, length: u64, size: u64 },

    /// An explicitly requested text encoding label is not known.
    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),
}

impl DslError {
    /// Returns `true` when the error means a persisted index is unusable and
    /// should be rebuilt from the source.
    pub fn is_index_format(&self) -> bool {
        matches!(self, DslError::IndexFormat(_))
    }
}

/// Reasons a serialized index is rejected on load.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexFormatError {
    #[error("magic marker mismatch: found {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("unsupported index format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },

    #[error("truncated index while reading {context}")]
    Truncated { context: &'static str },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("corrupt index: {0}")]
    Corrupt(String),
}

/// A convenience `Result` type alias using the crate's `DslError` type.
pub type Result<T> = std::result::Result<T, DslError>;
