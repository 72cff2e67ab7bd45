//! # flotsam-node
//!
//! The announcement cache driver: a single logical worker that loads the
//! persisted ledger, ingests inbound announcements, runs the rebroadcast
//! scheduler, fans messages out to every peer channel, and snapshots the
//! ledger each iteration.
//!
//! All collaborator handles (peer transport, pinning queue, summary
//! publisher, retention interface) are injected at construction; the
//! node owns no process-wide state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod collaborators;
pub mod error;
pub mod node;

pub use collaborators::{Collaborators, ContentStore};
pub use error::NodeError;
pub use node::{CacheNode, NodeConfig, NodeState};
