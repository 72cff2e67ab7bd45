//! Error types for flotsam-node.

use thiserror::Error;

/// Errors that can abort the cache node's event loop.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The ledger snapshot could not be opened or written.
    #[error("store error: {0}")]
    Store(#[from] flotsam_store::StoreError),
}
