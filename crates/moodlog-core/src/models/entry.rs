//! Journal entry model

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

use super::attachment::Attachment;

/// A client-generated identifier for an entry, using UUID v7 (time-sortable).
///
/// Assigned once at creation, stable for the lifetime of the client-side
/// object, and never transmitted to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalId(Uuid);

impl LocalId {
    /// Create a new unique local ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The backend-assigned integer identity of a synced entry.
///
/// Immutable once assigned; two entries are the same logical journal item
/// iff their server ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerId(i64);

impl ServerId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ServerId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Entry identity across the sync boundary.
///
/// An entry starts `Pending` (created locally, no server round trip yet) and
/// becomes `Synced` once the backend assigns a server id. Code that needs a
/// server id has to match on this explicitly; there is no way to read one
/// out of a pending entry by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryId {
    /// Created locally, not yet acknowledged by the server.
    Pending { local: LocalId },
    /// Acknowledged by the server under `server`.
    Synced { local: LocalId, server: ServerId },
}

impl EntryId {
    /// A fresh pending identity with a newly generated local id.
    #[must_use]
    pub fn pending() -> Self {
        Self::Pending {
            local: LocalId::new(),
        }
    }

    /// A synced identity with a newly generated local id, for entries
    /// reconstructed from a server response.
    #[must_use]
    pub fn synced(server: ServerId) -> Self {
        Self::Synced {
            local: LocalId::new(),
            server,
        }
    }

    #[must_use]
    pub const fn local(&self) -> LocalId {
        match self {
            Self::Pending { local } | Self::Synced { local, .. } => *local,
        }
    }

    #[must_use]
    pub const fn server(&self) -> Option<ServerId> {
        match self {
            Self::Pending { .. } => None,
            Self::Synced { server, .. } => Some(*server),
        }
    }

    /// Promote a pending identity to synced, keeping the local id.
    ///
    /// A synced identity keeps its original server id; server ids never
    /// change for a logical entry.
    #[must_use]
    pub const fn with_server(self, server: ServerId) -> Self {
        match self {
            Self::Pending { local } => Self::Synced { local, server },
            Self::Synced { .. } => self,
        }
    }
}

/// One tag from the closed set of emotion categories.
///
/// Always present on an entry; unknown wire tags decode as `Neutral` rather
/// than failing the whole record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emotion {
    Happy,
    Calm,
    #[default]
    Neutral,
    Sad,
    Anxious,
    Angry,
}

impl Emotion {
    pub const ALL: [Self; 6] = [
        Self::Happy,
        Self::Calm,
        Self::Neutral,
        Self::Sad,
        Self::Anxious,
        Self::Angry,
    ];

    /// The lowercase wire tag for this emotion.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Calm => "calm",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Angry => "angry",
        }
    }

    /// Lenient decode: unknown or empty tags map to `Neutral`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|emotion| emotion.as_tag() == normalized)
            .unwrap_or_default()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for Emotion {
    type Err = String;

    /// Strict parse for user input; use [`Emotion::from_tag`] for wire data.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|emotion| emotion.as_tag() == normalized)
            .ok_or_else(|| {
                let tags: Vec<&str> = Self::ALL.iter().map(|emotion| emotion.as_tag()).collect();
                format!("unknown emotion {s:?} (expected one of: {})", tags.join(", "))
            })
    }
}

impl Serialize for Emotion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for Emotion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// A journal entry.
///
/// Equality, ordering into sets, and list diffing all go by the local id
/// alone; two `Entry` values with the same local id are the same identity
/// even if their fields differ, which lets in-place list replacement work
/// without full reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Pending or synced identity.
    pub id: EntryId,
    /// Canonical creation time (Unix ms). Server-authoritative once synced.
    pub timestamp: i64,
    /// Plain text body; may be empty.
    pub content: String,
    /// Emotion tag.
    pub emotion: Emotion,
    /// Ordered attachment descriptors, at most [`super::MAX_ATTACHMENTS`].
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// True once the content was edited away from its generated original.
    #[serde(default)]
    pub edited: bool,
}

impl Entry {
    /// Create a pending entry from local user action, stamped with the
    /// client clock.
    #[must_use]
    pub fn new_pending(content: impl Into<String>, emotion: Emotion) -> Self {
        Self {
            id: EntryId::pending(),
            timestamp: crate::util::unix_timestamp_ms(),
            content: content.into(),
            emotion,
            attachments: Vec::new(),
            edited: false,
        }
    }

    #[must_use]
    pub const fn local_id(&self) -> LocalId {
        self.id.local()
    }

    #[must_use]
    pub const fn server_id(&self) -> Option<ServerId> {
        self.id.server()
    }

    /// Whether the server has acknowledged this entry.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self.id, EntryId::Synced { .. })
    }

    /// The displayable body. Empty content is a valid, displayable entry.
    #[must_use]
    pub fn display_content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.local_id() == other.local_id()
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.local_id().hash(state);
    }
}
