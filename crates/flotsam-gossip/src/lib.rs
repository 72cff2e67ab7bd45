//! # flotsam-gossip
//!
//! Announcement ledger and rebroadcast scheduling for the Flotsam
//! content swarm.
//!
//! This crate provides:
//!
//! - The advertise wire codec exchanged over the peer bus
//! - A monotonic registry of content ids known to this node
//! - Rate-limited anti-entropy re-announcement of known ids
//!
//! ## Core Types
//!
//! - [`ContentId`]: opaque identifier for an immutable piece of content
//! - [`Announcement`]: a single advertise message
//! - [`AnnounceLedger`]: the known-id set and last-mention timestamps
//! - [`RebroadcastScheduler`]: picks the most overdue id each tick

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ledger;
pub mod message;
pub mod scheduler;

pub use error::GossipError;
pub use ledger::{AnnounceLedger, AnnouncePlan, IngestOutcome};
pub use message::{AdvertiseDetails, Announcement, ContentId, WireMessage, DEFAULT_BUCKET};
pub use scheduler::{RebroadcastConfig, RebroadcastScheduler};
