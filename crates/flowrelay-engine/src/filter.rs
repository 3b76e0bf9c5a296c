//! Trigger filter evaluation.
//!
//! Pure predicates: no I/O, no side effects. Every configured predicate must
//! hold; empty fields impose no constraint.

use flowrelay_config::{TriggerFilter, normalize_extension};
use flowrelay_core::{Attachment, CandidateItem};

/// Whether `item` satisfies every configured predicate of `filter`.
#[must_use]
pub fn matches(item: &CandidateItem, filter: &TriggerFilter) -> bool {
    if !contains_ignore_case(&item.sender, &filter.sender) {
        return false;
    }
    if !contains_ignore_case(&item.subject, &filter.subject_keyword) {
        return false;
    }
    if filter.attachment_required && item.attachments.is_empty() {
        return false;
    }
    if filter.restricts_extensions()
        && !item
            .attachments
            .iter()
            .any(|attachment| extension_allowed(attachment, filter))
    {
        return false;
    }
    true
}

/// Attachments of `item` whose extension the filter accepts, in item order.
#[must_use]
pub fn eligible_attachments<'a>(
    item: &'a CandidateItem,
    filter: &TriggerFilter,
) -> Vec<&'a Attachment> {
    item.attachments
        .iter()
        .filter(|attachment| extension_allowed(attachment, filter))
        .collect()
}

fn extension_allowed(attachment: &Attachment, filter: &TriggerFilter) -> bool {
    if !filter.restricts_extensions() {
        return true;
    }
    let Some(extension) = attachment.extension() else {
        return false;
    };
    filter
        .allowed_extensions
        .iter()
        .filter_map(|allowed| normalize_extension(allowed))
        .any(|allowed| allowed == extension)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
