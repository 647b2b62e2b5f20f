//! Attachment descriptors and per-session edit tracking.

use serde::{Deserialize, Serialize};

/// Maximum number of attachments per entry.
pub const MAX_ATTACHMENTS: usize = 3;

/// One image attached to an entry, discriminated by sync state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    /// Already stored server-side. `id` is the server attachment
    /// identifier (an integer in string form), `url` the retrieval URL.
    Existing { id: String, url: String },
    /// Raw local image data pending upload; no server identity yet.
    New {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
}

impl Attachment {
    #[must_use]
    pub fn existing(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Existing {
            id: id.into(),
            url: url.into(),
        }
    }

    #[must_use]
    pub const fn new_pending(bytes: Vec<u8>) -> Self {
        Self::New { bytes }
    }

    #[must_use]
    pub const fn is_existing(&self) -> bool {
        matches!(self, Self::Existing { .. })
    }
}

/// The save payload computed from a tracker's current state.
///
/// `keep_ids` are the server attachment ids the server should retain;
/// `add_payloads` are base64-encoded bytes it should ingest. Anything in
/// neither set is implicitly deleted server-side by omission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentDiff {
    pub keep_ids: Vec<i64>,
    pub add_payloads: Vec<String>,
}

impl AttachmentDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keep_ids.is_empty() && self.add_payloads.is_empty()
    }
}

/// Tracks the attachment list for one create/edit session.
///
/// Seeded from an entry's existing attachments when editing, empty when
/// creating. An attachment added and then removed within the same session
/// never surfaces in the diff at all.
#[derive(Debug, Clone, Default)]
pub struct AttachmentTracker {
    slots: Vec<Attachment>,
}

impl AttachmentTracker {
    /// An empty tracker for a create session.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// A tracker seeded with an entry's current attachments for an edit
    /// session.
    #[must_use]
    pub fn seeded(attachments: Vec<Attachment>) -> Self {
        Self { slots: attachments }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slots(&self) -> &[Attachment] {
        &self.slots
    }

    /// Append a new pending attachment.
    ///
    /// Returns `false` without mutating when the list is already at
    /// [`MAX_ATTACHMENTS`].
    pub fn add_new(&mut self, bytes: Vec<u8>) -> bool {
        if self.slots.len() >= MAX_ATTACHMENTS {
            return false;
        }
        self.slots.push(Attachment::new_pending(bytes));
        true
    }

    /// Remove the attachment at `index` unconditionally, whatever its state.
    ///
    /// Returns the removed descriptor, or `None` when the index is out of
    /// bounds.
    pub fn remove_at(&mut self, index: usize) -> Option<Attachment> {
        if index < self.slots.len() {
            Some(self.slots.remove(index))
        } else {
            None
        }
    }

    /// Compute the keep/add payload for the coordinator's create/update
    /// calls from the current list state.
    ///
    /// Existing descriptors whose id does not parse as an integer are
    /// skipped with a warning rather than failing the save.
    #[must_use]
    pub fn diff_for_save(&self) -> AttachmentDiff {
        use base64::prelude::{Engine as _, BASE64_STANDARD};

        let mut diff = AttachmentDiff::default();
        for slot in &self.slots {
            match slot {
                Attachment::Existing { id, .. } => match id.parse::<i64>() {
                    Ok(parsed) => diff.keep_ids.push(parsed),
                    Err(_) => {
                        tracing::warn!(id = %id, "skipping attachment with non-integer server id");
                    }
                },
                Attachment::New { bytes } => {
                    diff.add_payloads.push(BASE64_STANDARD.encode(bytes));
                }
            }
        }
        diff
    }
}

mod base64_bytes {
    use base64::prelude::{Engine as _, BASE64_STANDARD};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}
