//! Error types for the typed KV layer
//!
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations. Two outcome families deliberately do NOT live here:
//! commit conflicts (`CommitOutcome::Conflict`, a normal value callers
//! retry on) and queue delivery failures (recorded via undelivered-marker
//! keys, never surfaced synchronously).

use crate::key::Key;
use thiserror::Error;

/// Result type alias for typedkv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the typed KV layer.
///
/// Construction errors (everything except [`Error::Codec`] and
/// [`Error::Store`]) are surfaced before any store round-trip.
#[derive(Debug, Error)]
pub enum Error {
    /// Key does not fully match any schema variant
    #[error("key {key} does not match any schema variant")]
    SchemaMismatch {
        /// The offending key
        key: Key,
    },

    /// Key is not a valid listing prefix for the schema
    #[error("key {key} is not a valid listing prefix")]
    InvalidPrefix {
        /// The offending key
        key: Key,
    },

    /// Malformed range selector (out-of-family bounds, inverted range, ...)
    #[error("invalid selector: {reason}")]
    InvalidSelector {
        /// What was wrong with the selector
        reason: String,
    },

    /// Counter mutation staged against a non-counter key
    #[error("key {key} is not declared as a counter")]
    NotACounter {
        /// The offending key
        key: Key,
    },

    /// Value written with a codec whose kind disagrees with the variant
    #[error("key {key} holds {expected} values, got {actual}")]
    ValueKindMismatch {
        /// The offending key
        key: Key,
        /// Kind declared by the schema variant
        expected: String,
        /// Kind the caller supplied
        actual: String,
    },

    /// Commit-versionstamp placeholder used outside an atomic operation
    #[error("key {key} uses the commit versionstamp outside an atomic operation")]
    MisplacedCommitVersion {
        /// The offending key
        key: Key,
    },

    /// A list cursor failed to decode
    #[error("invalid list cursor")]
    InvalidCursor,

    /// Too many keys passed to a watch subscription
    #[error("watching {actual} keys exceeds maximum {max}")]
    TooManyWatchedKeys {
        /// Number of keys requested
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Too many checks and mutations staged on one atomic operation
    #[error("atomic operation stages {actual} ops, maximum is {max}")]
    TooManyOps {
        /// Number of staged checks plus mutations
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Value exceeds the maximum encoded size
    #[error("value of {actual} bytes exceeds maximum {max}")]
    ValueTooLarge {
        /// Encoded size in bytes
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Serialization or deserialization failure
    #[error("codec error: {0}")]
    Codec(String),

    /// Transport or store fault, distinct from a commit conflict.
    ///
    /// Never retried by this layer; retry policy belongs to the caller.
    #[error("store error: {0}")]
    Store(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Codec(e.to_string())
    }
}
