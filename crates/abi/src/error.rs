//! The error module holds the [AbiError] taxonomy for the marshaling core.

use thiserror::Error;

/// Errors produced while encoding or decoding ABI data.
///
/// Every variant carries enough context (lengths, expected kinds, hex
/// prefixes) to diagnose the offending buffer without re-running the decode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// The encoding/decoding contract was violated by local data.
    #[error("malformed ABI data: {0}")]
    MalformedAbiData(String),

    /// A call payload carried a selector that does not belong to the
    /// descriptor it was decoded against. Usually a stale or mismatched
    /// contract ABI.
    #[error("unknown selector: expected 0x{expected}, got 0x{got}")]
    UnknownSelector { expected: String, got: String },

    /// A log carried a topic0 that does not belong to the descriptor it was
    /// decoded against.
    #[error("unknown topic: expected 0x{expected}, got 0x{got}")]
    UnknownTopic { expected: String, got: String },
}

/// Convenience result alias for fallible ABI operations.
pub type Result<T> = core::result::Result<T, AbiError>;
