//! Durable snapshot persistence for the Flotsam announcement cache.
//!
//! One JSON document per cache directory holds the known content ids and
//! their last-mention timestamps. A corrupt snapshot is discarded on
//! load rather than surfaced: the ledger is re-derivable from gossip
//! traffic, so an unreadable file costs history, never availability.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use flotsam_gossip::{AnnounceLedger, ContentId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the snapshot inside the cache directory.
pub const SNAPSHOT_FILE: &str = "announce-cache.json";

/// Errors raised while opening the store or writing a snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk image of the announcement ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Every content id known to the node, serialized as a list.
    pub known: HashSet<ContentId>,
    /// Last-mention timestamps, seconds since epoch.
    pub last_mentions: HashMap<ContentId, i64>,
}

impl PersistedState {
    /// Rebuilds the in-memory ledger from this snapshot.
    #[must_use]
    pub fn into_ledger(self) -> AnnounceLedger {
        AnnounceLedger::from_parts(self.known, self.last_mentions)
    }
}

impl From<&AnnounceLedger> for PersistedState {
    fn from(ledger: &AnnounceLedger) -> Self {
        Self {
            known: ledger.known_set().clone(),
            last_mentions: ledger.mentions().clone(),
        }
    }
}

/// Snapshot store bound to one cache directory.
///
/// No file handle is held between syncs; each [`sync`](Self::sync)
/// writes a fresh temp file and renames it over the snapshot, so a crash
/// mid-write leaves the previous snapshot intact and dropping the store
/// is its close.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    /// Binds a store to `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(SNAPSHOT_FILE),
        })
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted state.
    ///
    /// A missing snapshot yields the empty state. A corrupt or
    /// unreadable snapshot is discarded with a warning and also yields
    /// the empty state; the next [`sync`](Self::sync) starts the file
    /// over.
    #[must_use]
    pub fn load(&self) -> PersistedState {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot yet, starting empty");
                return PersistedState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable snapshot discarded");
                let _ = fs::remove_file(&self.path);
                return PersistedState::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt snapshot discarded");
                let _ = fs::remove_file(&self.path);
                PersistedState::default()
            }
        }
    }

    /// Writes `state` to disk atomically.
    ///
    /// Intended to run once per driver iteration.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the filesystem write fails.
    pub fn sync(&self, state: &PersistedState) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
