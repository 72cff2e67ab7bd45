//! The cache node event loop.

use crate::collaborators::{offer, Collaborators, ContentStore};
use crate::error::NodeError;
use chrono::Utc;
use flotsam_gossip::{
    AnnounceLedger, Announcement, ContentId, RebroadcastConfig, RebroadcastScheduler,
};
use flotsam_store::{CacheStore, PersistedState};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info};

/// Lifecycle state of a cache node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Loading persisted state and resynchronizing collaborators.
    Starting,
    /// Processing inbound announcements and rebroadcasting.
    Running,
    /// Flushing the ledger before exit.
    Stopping,
    /// Terminal.
    Stopped,
}

impl NodeState {
    /// True while the node should keep iterating its event loop.
    #[must_use]
    pub const fn can_process(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// True until shutdown has begun.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Stopping | Self::Stopped)
    }
}

/// Configuration for a cache node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Directory holding the ledger snapshot.
    pub cache_dir: PathBuf,
    /// Bounded wait on the inbound channel. Doubles as the heartbeat for
    /// scheduling and persistence when no traffic arrives.
    pub poll_timeout: Duration,
    /// Rebroadcast tuning.
    pub rebroadcast: RebroadcastConfig,
}

impl NodeConfig {
    /// Creates a config with default timings for the given cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            poll_timeout: Duration::from_secs(5),
            rebroadcast: RebroadcastConfig::default(),
        }
    }

    /// Sets the inbound poll timeout.
    #[must_use]
    pub const fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Sets the rebroadcast tuning.
    #[must_use]
    pub fn with_rebroadcast(mut self, rebroadcast: RebroadcastConfig) -> Self {
        self.rebroadcast = rebroadcast;
        self
    }
}

/// The announcement cache driver.
///
/// One logical worker owns the ledger, scheduler, and store; the peer
/// transport, pinning queue, and summary publisher are reached only
/// through the injected [`Collaborators`] channels.
#[derive(Debug)]
pub struct CacheNode {
    config: NodeConfig,
    state: NodeState,
    ledger: AnnounceLedger,
    scheduler: RebroadcastScheduler,
    retained: HashSet<ContentId>,
    channels: Collaborators,
}

impl CacheNode {
    /// Creates a node in the `Starting` state.
    #[must_use]
    pub fn new(config: NodeConfig, channels: Collaborators) -> Self {
        let scheduler = RebroadcastScheduler::new(config.rebroadcast.clone());
        Self {
            config,
            state: NodeState::Starting,
            ledger: AnnounceLedger::new(),
            scheduler,
            retained: HashSet::new(),
            channels,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> NodeState {
        self.state
    }

    /// Runs the node until the shutdown signal fires, the inbound
    /// channel closes, or the loop fails.
    ///
    /// The final snapshot flush runs on every exit path, including the
    /// error path, before any error is surfaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or a snapshot
    /// write fails.
    pub async fn run(
        mut self,
        content_store: &dyn ContentStore,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), NodeError> {
        let store = CacheStore::open(&self.config.cache_dir)?;
        self.start(&store, content_store);

        let result = self.run_loop(&store, &mut shutdown).await;

        self.state = NodeState::Stopping;
        let flush = store.sync(&PersistedState::from(&self.ledger));
        info!(known = self.ledger.len(), "announcement cache stopped");
        self.state = NodeState::Stopped;
        result.and(flush.map_err(NodeError::from))
    }

    /// Loads persisted state and resynchronizes collaborators: every
    /// known id goes to the summary publisher, every unretained one to
    /// the pinning queue.
    fn start(&mut self, store: &CacheStore, content_store: &dyn ContentStore) {
        self.ledger = store.load().into_ledger();
        self.retained = content_store.list_retained();
        info!(
            known = self.ledger.len(),
            retained = self.retained.len(),
            "announcement cache loaded"
        );

        let plan = self.ledger.announce_all(&self.retained);
        for id in plan.pin {
            offer(&self.channels.pinning, id, "pinning");
        }
        for id in plan.summarize {
            offer(&self.channels.summary, id, "summary");
        }
        self.state = NodeState::Running;
    }

    async fn run_loop(
        &mut self,
        store: &CacheStore,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), NodeError> {
        while self.state.can_process() {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("shutdown signal received");
                    break;
                }
                inbound = timeout(self.config.poll_timeout, self.channels.inbound.recv()) => {
                    match inbound {
                        Ok(Some(announcement)) => self.ingest(&announcement),
                        Ok(None) => {
                            debug!("inbound channel closed");
                            break;
                        }
                        // A quiet interval is the loop heartbeat, not an error.
                        Err(_) => {}
                    }
                }
            }

            self.rebroadcast();
            store.sync(&PersistedState::from(&self.ledger))?;
        }
        Ok(())
    }

    /// Records one inbound announcement. Collaborators hear about an id
    /// at most once per process lifetime, on first sighting.
    fn ingest(&mut self, announcement: &Announcement) {
        let outcome = self.ledger.ingest(announcement, Utc::now().timestamp());
        if !outcome.first_seen {
            return;
        }
        if !self.retained.contains(&announcement.id) {
            offer(&self.channels.pinning, announcement.id.clone(), "pinning");
        }
        offer(&self.channels.summary, announcement.id.clone(), "summary");
    }

    /// One scheduler pass; whatever it emits goes to every peer.
    fn rebroadcast(&mut self) {
        for announcement in self.scheduler.tick(&mut self.ledger, Utc::now().timestamp()) {
            for peer in &self.channels.peers {
                offer(peer, announcement.clone(), "peer");
            }
        }
    }
}
