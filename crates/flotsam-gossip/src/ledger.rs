//! The announcement ledger: which ids this node knows, and when each was
//! last mentioned.

use crate::message::{Announcement, ContentId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Outcome of ingesting one announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// True when the id was not previously known to this node.
    pub first_seen: bool,
}

/// Startup resynchronization plan produced by [`AnnounceLedger::announce_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncePlan {
    /// Ids to enqueue for pinning: known but not retained locally.
    pub pin: Vec<ContentId>,
    /// Ids to enqueue to the summary publisher: every known id.
    pub summarize: Vec<ContentId>,
}

/// In-memory registry of content ids known to this node.
///
/// The known set grows monotonically; there is no removal. Every key in
/// the mention map is a member of the known set, while ids loaded from
/// persistence may carry no mention until they are next seen or emitted.
#[derive(Debug, Clone, Default)]
pub struct AnnounceLedger {
    known: HashSet<ContentId>,
    last_mention: HashMap<ContentId, i64>,
}

impl AnnounceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from persisted parts.
    ///
    /// Mention keys missing from the known set are added to it, so the
    /// ledger invariant holds even for snapshots written by older nodes.
    #[must_use]
    pub fn from_parts(known: HashSet<ContentId>, last_mention: HashMap<ContentId, i64>) -> Self {
        let mut known = known;
        known.extend(last_mention.keys().cloned());
        Self {
            known,
            last_mention,
        }
    }

    /// Records one inbound announcement at `now` (seconds since epoch).
    ///
    /// The mention timestamp is updated unconditionally. The outcome
    /// reports whether the id is new, so the caller can notify its
    /// collaborators at most once per process lifetime.
    pub fn ingest(&mut self, announcement: &Announcement, now: i64) -> IngestOutcome {
        self.last_mention.insert(announcement.id.clone(), now);
        let first_seen = self.known.insert(announcement.id.clone());
        if first_seen {
            debug!(id = %announcement.id, known = self.known.len(), "learned content id");
        }
        IngestOutcome { first_seen }
    }

    /// Builds the startup resynchronization plan: pin everything not in
    /// `retained`, summarize everything known.
    ///
    /// Unconditional over the whole ledger, unlike [`ingest`](Self::ingest)
    /// which is gated on novelty. Both lists come back sorted.
    #[must_use]
    pub fn announce_all(&self, retained: &HashSet<ContentId>) -> AnnouncePlan {
        let mut pin: Vec<ContentId> = self.known.difference(retained).cloned().collect();
        pin.sort();
        let mut summarize: Vec<ContentId> = self.known.iter().cloned().collect();
        summarize.sort();
        AnnouncePlan { pin, summarize }
    }

    /// Stamps `id` as mentioned at `now`.
    ///
    /// Ignored for unknown ids, so the mention map never outgrows the
    /// known set.
    pub fn mark_mentioned(&mut self, id: &ContentId, now: i64) {
        if self.known.contains(id) {
            self.last_mention.insert(id.clone(), now);
        }
    }

    /// When `id` was last received from or emitted to a peer, if ever.
    #[must_use]
    pub fn last_mention(&self, id: &ContentId) -> Option<i64> {
        self.last_mention.get(id).copied()
    }

    /// True if the id is known to this node.
    #[must_use]
    pub fn contains(&self, id: &ContentId) -> bool {
        self.known.contains(id)
    }

    /// Number of known ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// True when no ids are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Iterates over the known ids in arbitrary order.
    pub fn ids(&self) -> impl Iterator<Item = &ContentId> {
        self.known.iter()
    }

    /// The full known set.
    #[must_use]
    pub fn known_set(&self) -> &HashSet<ContentId> {
        &self.known
    }

    /// The full mention map.
    #[must_use]
    pub fn mentions(&self) -> &HashMap<ContentId, i64> {
        &self.last_mention
    }
}
