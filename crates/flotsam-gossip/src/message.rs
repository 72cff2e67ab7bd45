//! Announcement data model and the JSON wire codec.

use crate::error::GossipError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket name carried in advertise messages.
pub const DEFAULT_BUCKET: &str = "files";

/// Opaque identifier for an immutable piece of content (a hash).
///
/// No internal structure is interpreted; ids are compared, ordered, and
/// hashed as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Creates a content id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single content announcement.
///
/// Created either by a peer (inbound) or by the rebroadcast scheduler
/// (outbound); never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// The announced content id.
    pub id: ContentId,
    /// Optional free-form comment attached by the announcer.
    pub comment: Option<String>,
}

impl Announcement {
    /// Creates an announcement for `id` with no comment.
    pub fn new(id: impl Into<ContentId>) -> Self {
        Self {
            id: id.into(),
            comment: None,
        }
    }

    /// Attaches a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Payload of an advertise message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiseDetails {
    /// Namespace the id lives in.
    pub bucket: String,
    /// The announced content id.
    pub ipfs: ContentId,
    /// Optional comment; omitted on the wire when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Messages exchanged with peers over the announcement bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mtype", rename_all = "lowercase")]
pub enum WireMessage {
    /// Advertise a content id to the swarm.
    Advertise {
        /// The advertise payload.
        details: AdvertiseDetails,
    },
}

impl WireMessage {
    /// Wraps an announcement in its wire form.
    #[must_use]
    pub fn advertise(announcement: &Announcement) -> Self {
        Self::Advertise {
            details: AdvertiseDetails {
                bucket: DEFAULT_BUCKET.to_string(),
                ipfs: announcement.id.clone(),
                comment: announcement.comment.clone(),
            },
        }
    }

    /// Serializes the message to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, GossipError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a message from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, the message type is
    /// unknown, or the advertised id is empty.
    pub fn decode(raw: &str) -> Result<Self, GossipError> {
        let message: Self = serde_json::from_str(raw)?;
        let Self::Advertise { details } = &message;
        if details.ipfs.is_empty() {
            return Err(GossipError::EmptyContentId);
        }
        Ok(message)
    }

    /// Extracts the announcement carried by this message.
    #[must_use]
    pub fn into_announcement(self) -> Announcement {
        let Self::Advertise { details } = self;
        Announcement {
            id: details.ipfs,
            comment: details.comment,
        }
    }
}
