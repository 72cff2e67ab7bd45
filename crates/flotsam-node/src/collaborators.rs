//! Channel handles connecting the cache node to its collaborators.
//!
//! Sends are fire-and-forget: a slow or absent collaborator is logged
//! and skipped rather than allowed to stall the event loop.

use flotsam_gossip::{Announcement, ContentId};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Local retention interface, queried once at startup to learn which
/// content ids already have their data pinned on this node.
pub trait ContentStore: Send + Sync {
    /// Returns the set of content ids currently retained locally.
    fn list_retained(&self) -> HashSet<ContentId>;
}

/// Channel handles wired into a [`CacheNode`](crate::CacheNode).
#[derive(Debug)]
pub struct Collaborators {
    /// Announcements arriving from the peer transport.
    pub inbound: mpsc::Receiver<Announcement>,
    /// One outbound channel per peer; rebroadcasts fan out to all of them.
    pub peers: Vec<mpsc::Sender<Announcement>>,
    /// Retention requests for newly discovered ids.
    pub pinning: mpsc::Sender<ContentId>,
    /// First-seen and startup notifications for the summary publisher.
    pub summary: mpsc::Sender<ContentId>,
}

/// Non-blocking send; a full or closed channel drops the value.
pub(crate) fn offer<T>(tx: &mpsc::Sender<T>, value: T, channel: &'static str) {
    match tx.try_send(value) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!(channel, "channel full, dropping send"),
        Err(TrySendError::Closed(_)) => debug!(channel, "channel closed, dropping send"),
    }
}
