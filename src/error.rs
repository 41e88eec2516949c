// Error taxonomy shared by the buffer, LZX and container layers.
//
// Every variant is terminal for the file being processed. Non-fatal
// conditions (unknown platform or format version) are logged, never raised.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum XnbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid magic: expected \"XNB\", got {0:02X?}")]
    InvalidMagic([u8; 3]),

    #[error("truncated file: header declares {declared} bytes, buffer holds {actual}")]
    TruncatedFile { declared: u64, actual: u64 },

    #[error("unsupported: {0}")]
    UnsupportedFeature(String),

    #[error("corrupt compressed stream: {0}")]
    CorruptStream(String),

    #[error("compressed stream ended with {remaining} bytes of the frame still owed")]
    TruncatedStream { remaining: usize },

    #[error("corrupt huffman table: {0}")]
    CorruptHuffmanTable(String),

    #[error("malformed 7-bit encoded integer at byte {offset}")]
    MalformedVarint { offset: usize },

    #[error("reader index {index} out of range ({count} readers declared)")]
    InvalidReaderIndex { index: u32, count: usize },

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("read of {requested} bytes at offset {offset} runs past end of {len}-byte buffer")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        len: usize,
    },

    #[error("content does not match its reader: {0}")]
    InvalidContent(String),

    #[error("lz4 block error: {0}")]
    Lz4(String),

    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, XnbError>;
