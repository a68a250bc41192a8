//! # swapsync-logs
//!
//! Bounded buffer for the daemon's log stream.
//!
//! Log batches arrive as raw text holding zero or more newline-delimited
//! records. Each record is parsed (tracing JSON or plain text), given a
//! content hash for stable identity, and appended in arrival order. The
//! buffer never collapses duplicates; it only sheds its oldest tenth once
//! it grows past a high-water mark.
//!
//! ## Modules
//!
//! - [`parse`]: batch splitting and record parsing
//! - [`hash`]: canonical serialization and BLAKE3 content hashes
//! - [`buffer`]: the bounded [`LogBuffer`]

pub mod buffer;
pub mod hash;
pub mod parse;

pub use buffer::{HashedLogEntry, LogBuffer, DEFAULT_HIGH_WATER_MARK};
pub use hash::LogHash;

/// Error types for log buffer configuration.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The high-water mark must leave room for at least one entry.
    #[error("invalid high-water mark: {0}")]
    InvalidHighWaterMark(usize),
}

/// Convenience result type for log buffer operations.
pub type Result<T> = std::result::Result<T, LogError>;
