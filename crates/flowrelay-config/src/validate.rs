//! Validation helpers and parsing utilities for flow definitions and settings.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::model::FlowConfig;

/// Normalise a user-supplied extension: trim, drop leading dots, lower-case.
///
/// Returns `None` when nothing remains.
#[must_use]
pub fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

/// Validate a flow definition and return its normalised form.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidFlow`] wrapping the first field that failed validation.
pub fn validate_flow(flow: FlowConfig) -> ConfigResult<FlowConfig> {
    let flow_id = flow.id;
    normalise_flow(flow).map_err(|source| ConfigError::InvalidFlow {
        flow_id,
        source: Box::new(source),
    })
}

fn normalise_flow(mut flow: FlowConfig) -> ConfigResult<FlowConfig> {
    if flow.max_payload_bytes == 0 {
        return Err(ConfigError::invalid(
            "max_payload_bytes",
            "must be greater than zero",
            Some("0"),
        ));
    }

    flow.name = flow.name.trim().to_string();
    if flow.name.is_empty() {
        return Err(ConfigError::invalid(
            "name",
            "must not be empty",
            None::<String>,
        ));
    }

    if !flow.auto_generate_path && flow.destination_path.trim().is_empty() {
        return Err(ConfigError::invalid(
            "destination_path",
            "required unless auto_generate_path is set",
            None::<String>,
        ));
    }

    let mut extensions = BTreeSet::new();
    for raw in &flow.filter.allowed_extensions {
        let Some(extension) = normalize_extension(raw) else {
            return Err(ConfigError::invalid(
                "filter.allowed_extensions",
                "entries must not be empty",
                Some(raw.as_str()),
            ));
        };
        extensions.insert(extension);
    }
    flow.filter.allowed_extensions = extensions;
    flow.filter.sender = flow.filter.sender.trim().to_string();
    flow.filter.subject_keyword = flow.filter.subject_keyword.trim().to_string();

    Ok(flow)
}

pub(crate) fn parse_positive_usize(field: &'static str, value: &str) -> ConfigResult<usize> {
    let parsed = value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::invalid(field, "must be an integer", Some(value)))?;
    if parsed == 0 {
        return Err(ConfigError::invalid(
            field,
            "must be greater than zero",
            Some(value),
        ));
    }
    Ok(parsed)
}

pub(crate) fn parse_duration_secs(field: &'static str, value: &str) -> ConfigResult<Duration> {
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(field, "must be a whole number of seconds", Some(value)))?;
    if secs == 0 {
        return Err(ConfigError::invalid(
            field,
            "must be greater than zero",
            Some(value),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DuplicatePolicy, TriggerFilter};
    use uuid::Uuid;

    fn sample_flow() -> FlowConfig {
        FlowConfig {
            id: Uuid::new_v4(),
            name: "  Receipts ".to_string(),
            enabled: true,
            filter: TriggerFilter {
                sender: " billing@acme.com ".to_string(),
                subject_keyword: String::new(),
                attachment_required: true,
                allowed_extensions: [".PDF", "csv"].into_iter().map(String::from).collect(),
            },
            destination_path: "Receipts/{year}".to_string(),
            auto_generate_path: false,
            duplicate_policy: DuplicatePolicy::Skip,
            max_payload_bytes: 10,
        }
    }

    #[test]
    fn normalize_extension_strips_dots_and_case() {
        assert_eq!(normalize_extension(".PDF"), Some("pdf".to_string()));
        assert_eq!(normalize_extension("  tar.GZ "), Some("tar.gz".to_string()));
        assert_eq!(normalize_extension(" . "), None);
    }

    #[test]
    fn validate_flow_normalises_fields() {
        let flow = validate_flow(sample_flow()).expect("flow should validate");
        assert_eq!(flow.name, "Receipts");
        assert_eq!(flow.filter.sender, "billing@acme.com");
        let extensions: Vec<_> = flow.filter.allowed_extensions.iter().cloned().collect();
        assert_eq!(extensions, vec!["csv".to_string(), "pdf".to_string()]);
    }

    #[test]
    fn validate_flow_rejects_zero_payload_limit() {
        let mut flow = sample_flow();
        flow.max_payload_bytes = 0;
        let err = validate_flow(flow).unwrap_err();
        let ConfigError::InvalidFlow { source, .. } = err else {
            panic!("expected invalid flow error");
        };
        assert!(matches!(
            *source,
            ConfigError::InvalidField {
                field: "max_payload_bytes",
                ..
            }
        ));
    }

    #[test]
    fn validate_flow_requires_destination_unless_generated() {
        let mut flow = sample_flow();
        flow.destination_path = "   ".to_string();
        assert!(validate_flow(flow.clone()).is_err());

        flow.auto_generate_path = true;
        assert!(validate_flow(flow).is_ok());
    }

    #[test]
    fn validate_flow_rejects_blank_extension() {
        let mut flow = sample_flow();
        flow.filter.allowed_extensions.insert(".".to_string());
        assert!(validate_flow(flow).is_err());
    }

    #[test]
    fn parse_helpers_reject_zero_and_garbage() {
        assert_eq!(parse_positive_usize("concurrency", "8").unwrap(), 8);
        assert!(parse_positive_usize("concurrency", "0").is_err());
        assert!(parse_positive_usize("concurrency", "many").is_err());
        assert_eq!(
            parse_duration_secs("timeout", "30").unwrap(),
            Duration::from_secs(30)
        );
        assert!(parse_duration_secs("timeout", "-1").is_err());
    }
}
