//! Error types for flotsam-gossip.

use thiserror::Error;

/// Errors that can occur while handling announcement messages.
#[derive(Debug, Error)]
pub enum GossipError {
    /// A wire message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// An advertise message carried an empty content id.
    #[error("empty content id in advertise message")]
    EmptyContentId,
}
