//! Error types for the thumbnail pipeline

use thiserror::Error;

use crate::data::AssetKey;

/// Errors that can end a single decode.
///
/// Every variant is terminal to the one request that caused it; none
/// of them crashes a worker or poisons the queue or cache for other
/// requests.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The source asset could not be read
    #[error("could not read {key}: {source}")]
    Open {
        key: AssetKey,
        source: std::io::Error,
    },

    /// The source bytes are corrupt or in an unsupported format
    #[error("could not decode {key}: {source}")]
    Malformed {
        key: AssetKey,
        source: image::ImageError,
    },

    /// The load was stopped cooperatively. Not a user-visible failure.
    #[error("load was cancelled")]
    Cancelled,
}

impl DecodeError {
    /// Cancellation ends a decode the same way a failure does, but it
    /// must never be surfaced to the user as an error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DecodeError::Cancelled)
    }
}
