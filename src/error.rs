//! Error taxonomy for the edit journal.
//!
//! Contract violations (recording into a frozen journal, finishing twice) are
//! programming errors and panic; everything recoverable flows through
//! [`JournalError`].

use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Errors surfaced by replay and by the binary codec.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Underlying stream failure during snapshot write/read.
    #[error("I/O: {0}")]
    Io(#[from] io::Error),
    /// Malformed or truncated snapshot; a partial journal is never returned.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// The journal holds state the codec cannot represent.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// The mutation target rejected a replayed mutation. The target is left
    /// partially mutated; the caller must treat the edit as unrecoverable.
    #[error("replay rejected: {0}")]
    Replay(String),
}
