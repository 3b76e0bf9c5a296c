//! Flow and item fixtures.

use chrono::{DateTime, TimeZone, Utc};
use flowrelay_config::{DuplicatePolicy, FlowConfig, TriggerFilter};
use flowrelay_core::{Attachment, CandidateItem};
use uuid::Uuid;

/// Default payload ceiling used by [`flow`].
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 1_024 * 1_024;

/// A fixed instant (2024-03-05T10:30:00Z) for deterministic path resolution.
#[must_use]
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0)
        .single()
        .unwrap_or_default()
}

/// A valid, enabled flow writing to `Inbox/{flow_name}` with an open filter.
#[must_use]
pub fn flow(name: &str) -> FlowConfig {
    FlowConfig {
        id: Uuid::new_v4(),
        name: name.to_string(),
        enabled: true,
        filter: TriggerFilter::default(),
        destination_path: "Inbox/{flow_name}".to_string(),
        auto_generate_path: false,
        duplicate_policy: DuplicatePolicy::RenameWithSuffix,
        max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
    }
}

/// Build a trigger filter from its parts.
#[must_use]
pub fn filter(
    sender: &str,
    subject_keyword: &str,
    attachment_required: bool,
    allowed_extensions: &[&str],
) -> TriggerFilter {
    TriggerFilter {
        sender: sender.to_string(),
        subject_keyword: subject_keyword.to_string(),
        attachment_required,
        allowed_extensions: allowed_extensions
            .iter()
            .map(|extension| (*extension).to_string())
            .collect(),
    }
}

/// Attachment metadata with a MIME type guessed from the extension.
#[must_use]
pub fn attachment(id: &str, filename: &str, size_bytes: u64) -> Attachment {
    let mime_type = match filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "pdf" => "application/pdf",
        Some(ext) if ext == "csv" => "text/csv",
        Some(ext) if ext == "txt" => "text/plain",
        Some(ext) if ext == "png" => "image/png",
        _ => "application/octet-stream",
    };
    Attachment {
        id: id.to_string(),
        filename: filename.to_string(),
        mime_type: mime_type.to_string(),
        size_bytes,
    }
}

/// Candidate item received at [`fixed_time`].
#[must_use]
pub fn item(id: &str, sender: &str, subject: &str, attachments: Vec<Attachment>) -> CandidateItem {
    CandidateItem {
        id: id.to_string(),
        subject: subject.to_string(),
        sender: sender.to_string(),
        received_at: fixed_time(),
        attachments,
    }
}
