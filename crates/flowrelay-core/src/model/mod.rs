//! Items, containers, and upload DTOs exchanged with connectors.

use std::fmt;

use chrono::{DateTime, Utc};
use flowrelay_config::{DuplicatePolicy, TriggerFilter};
use serde::{Deserialize, Serialize};

/// Attachment metadata carried by a candidate item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Handle used to fetch the payload from the source.
    pub id: String,
    /// Original filename.
    pub filename: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Declared payload size.
    pub size_bytes: u64,
}

impl Attachment {
    /// Lower-case extension of the filename, without the dot.
    ///
    /// Dot-files (`.env`) and names ending in a dot have no extension.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let (stem, extension) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || extension.is_empty() {
            return None;
        }
        Some(extension.to_ascii_lowercase())
    }
}

/// One unit listed by a source connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Source-assigned identifier.
    pub id: String,
    /// Subject line or label.
    pub subject: String,
    /// Sender address.
    pub sender: String,
    /// Time the item arrived at the source.
    pub received_at: DateTime<Utc>,
    /// Attachments in source order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Loose query passed to [`crate::SourceConnector::list`].
///
/// Sources may return a superset; the engine re-applies the full filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuery {
    /// Sender substring, if constrained.
    pub sender: Option<String>,
    /// Subject substring, if constrained.
    pub subject_keyword: Option<String>,
    /// Whether only items with attachments are wanted.
    pub attachment_required: bool,
}

impl SourceQuery {
    /// Derive the connector query from a trigger filter.
    #[must_use]
    pub fn from_filter(filter: &TriggerFilter) -> Self {
        let non_empty = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Self {
            sender: non_empty(&filter.sender),
            subject_keyword: non_empty(&filter.subject_keyword),
            attachment_required: filter.attachment_required || filter.restricts_extensions(),
        }
    }
}

/// Destination-side folder or bucket path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationContainer {
    /// Destination-assigned identifier.
    pub id: String,
    /// Full normalised path.
    pub path: String,
    /// Identifier of the enclosing container, if any.
    pub parent_id: Option<String>,
}

/// Payload handed to [`crate::DestinationConnector::upload`].
#[derive(Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Target container identifier.
    pub container_id: String,
    /// Requested filename.
    pub filename: String,
    /// MIME type forwarded to the destination.
    pub mime_type: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Behaviour when `filename` already exists.
    pub policy: DuplicatePolicy,
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("container_id", &self.container_id)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("payload_len", &self.payload.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Outcome of an upload with respect to existing files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadDisposition {
    /// No file with the name existed.
    Created,
    /// An existing file was replaced.
    Overwritten,
    /// The payload was stored under a suffixed name.
    Renamed,
    /// An existing file was kept and nothing was written.
    SkippedExisting,
}

impl UploadDisposition {
    /// Snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Overwritten => "overwritten",
            Self::Renamed => "renamed",
            Self::SkippedExisting => "skipped_existing",
        }
    }

    /// Whether the payload was actually written.
    #[must_use]
    pub const fn wrote_payload(self) -> bool {
        !matches!(self, Self::SkippedExisting)
    }
}

impl fmt::Display for UploadDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name used by [`flowrelay_config::DuplicatePolicy::RenameWithSuffix`]: `stem (n).ext`.
#[must_use]
pub fn suffixed_filename(filename: &str, n: u32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            format!("{stem} ({n}).{extension}")
        }
        _ => format!("{filename} ({n})"),
    }
}

/// File reported by the destination after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Destination-assigned identifier.
    pub id: String,
    /// Final stored name.
    pub name: String,
    /// Bytes stored.
    pub size_bytes: u64,
    /// How the destination handled the name.
    pub disposition: UploadDisposition,
    /// Hex-encoded content checksum, when the destination computes one.
    pub checksum: Option<String>,
}
