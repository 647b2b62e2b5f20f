//! Data models for moodlog

pub mod attachment;
pub mod entry;

pub use attachment::{Attachment, AttachmentDiff, AttachmentTracker, MAX_ATTACHMENTS};
pub use entry::{Emotion, Entry, EntryId, LocalId, ServerId};
