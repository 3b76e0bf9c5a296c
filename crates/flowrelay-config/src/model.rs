//! Typed flow models.
//!
//! # Design
//! - Pure data carriers shared by the catalog, the engine, and connectors.
//! - A `FlowConfig` is an immutable snapshot for the duration of a run.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// Trigger predicates evaluated against every candidate item.
///
/// Empty fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerFilter {
    /// Case-insensitive substring expected in the sender address.
    pub sender: String,
    /// Case-insensitive substring expected in the subject line.
    pub subject_keyword: String,
    /// Whether at least one attachment must be present.
    pub attachment_required: bool,
    /// Lower-case file extensions (without the dot) eligible for transfer.
    pub allowed_extensions: BTreeSet<String>,
}

impl TriggerFilter {
    /// Whether the filter constrains attachment extensions.
    #[must_use]
    pub fn restricts_extensions(&self) -> bool {
        !self.allowed_extensions.is_empty()
    }
}

/// Behaviour applied by the destination when an uploaded filename already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Leave the existing file untouched and skip the upload.
    Skip,
    /// Replace the existing file.
    Overwrite,
    /// Store the upload under `stem (n).ext`.
    #[default]
    RenameWithSuffix,
}

impl DuplicatePolicy {
    /// Render the policy as its snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::RenameWithSuffix => "rename_with_suffix",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "rename_with_suffix" | "rename" => Ok(Self::RenameWithSuffix),
            other => Err(ConfigError::invalid(
                "duplicate_policy",
                "unknown duplicate policy",
                Some(other),
            )),
        }
    }
}

/// Declarative definition of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Stable flow identifier.
    pub id: Uuid,
    /// Human-readable flow name, also used for `{flow_name}` substitution.
    pub name: String,
    /// Whether the scheduler should run the flow.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Trigger predicates applied to candidate items.
    #[serde(default)]
    pub filter: TriggerFilter,
    /// Destination path template or literal path.
    #[serde(default)]
    pub destination_path: String,
    /// Ignore `destination_path` and derive a dated folder from the flow name.
    #[serde(default)]
    pub auto_generate_path: bool,
    /// Conflict behaviour forwarded to the destination.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Largest attachment, in bytes, that may be transferred.
    pub max_payload_bytes: u64,
}

const fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duplicate_policy_parses_and_formats() {
        assert_eq!("skip".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Skip);
        assert_eq!(
            "overwrite".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::Overwrite
        );
        assert_eq!(
            "rename".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::RenameWithSuffix
        );
        assert!("replace".parse::<DuplicatePolicy>().is_err());
        assert_eq!(DuplicatePolicy::RenameWithSuffix.to_string(), "rename_with_suffix");
    }

    #[test]
    fn flow_config_deserialises_with_defaults() {
        let flow: FlowConfig = serde_json::from_value(json!({
            "id": "00000000-0000-0000-0000-0000000000aa",
            "name": "Invoices",
            "destination_path": "Finance/{year}",
            "max_payload_bytes": 1024
        }))
        .expect("flow should decode");

        assert!(flow.enabled);
        assert_eq!(flow.duplicate_policy, DuplicatePolicy::RenameWithSuffix);
        assert_eq!(flow.filter, TriggerFilter::default());
        assert!(!flow.filter.restricts_extensions());
    }
}
