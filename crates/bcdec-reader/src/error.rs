//! Decode errors

use thiserror::Error;

/// What went wrong while decoding
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Signature or prologue mismatch
    #[error("bad signature {found:02x?}")]
    BadMagic {
        /// Bytes found at the start of the stream
        found: Vec<u8>,
    },

    /// Unknown, unsupported or disallowed container flags
    #[error("unsupported container flags {flags:#x}")]
    BadFlags {
        /// Flag word as read
        flags: u32,
    },

    /// Input ended inside a structure
    #[error("truncated input")]
    TruncatedInput,

    /// A prototype record did not consume exactly its declared length
    #[error("prototype length mismatch: declared {expected}, consumed {actual}")]
    LengthMismatch {
        /// Declared length
        expected: u64,
        /// Bytes consumed
        actual: u64,
    },

    /// Debug info present but not allowed
    #[error("unexpected debug info")]
    UnexpectedDebugInfo,

    /// Child prototype referenced with an empty decode stack
    #[error("child prototype reference without a decoded prototype")]
    StackUnderflow,

    /// Child prototypes nested deeper than the decoder accepts
    #[error("prototypes nested {0} levels deep")]
    NestingTooDeep(u32),

    /// Template table key decoded to nil
    #[error("nil template table key")]
    InvalidKey,

    /// Bytes after the end sentinel, or more than one root prototype
    #[error("trailing data after container end")]
    TrailingData,

    /// Obfuscated opcode outside the substitution table
    #[error("bad opcode {0}")]
    BadOpcode(u8),

    /// Single read requirement above the buffer limit
    #[error("read of {0} bytes exceeds buffer limit")]
    BufferLimit(usize),

    /// Source read failure
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode failure with its chunk name and stream offset
#[derive(Debug, Error)]
#[error("{chunk}: {kind} (offset {offset:#x})")]
pub struct DecodeError {
    /// Chunk display name
    pub chunk: String,
    /// Stream offset where the failure was detected
    pub offset: u64,
    /// Failure kind
    pub kind: ErrorKind,
}

impl DecodeError {
    /// Create an error without a chunk name
    pub fn new(kind: ErrorKind, offset: u64) -> Self {
        Self {
            chunk: String::new(),
            offset,
            kind,
        }
    }

    /// Attach the chunk display name
    pub fn with_chunk(mut self, chunk: impl Into<String>) -> Self {
        self.chunk = chunk.into();
        self
    }
}

/// Result type for decode operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Display form of a chunk name: binary chunks show as `(binary)`, a leading
/// `@` or `=` is dropped.
pub fn chunk_display_name(chunk: &str) -> &str {
    if chunk.starts_with('\x1b') {
        "(binary)"
    } else if let Some(rest) = chunk.strip_prefix(['@', '=']) {
        rest
    } else {
        chunk
    }
}
