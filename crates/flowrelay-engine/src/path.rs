//! Destination path templating and container resolution.
//!
//! # Design
//! - Substitution is deterministic: unknown or unterminated tokens stay verbatim.
//! - `ensure_exists` is get-or-create per path prefix, so repeated calls
//!   resolve to the same container without creating duplicates.

use chrono::{DateTime, Datelike, Utc};
use flowrelay_config::FlowConfig;
use flowrelay_core::{ConnectorError, ConnectorResult, DestinationConnector, DestinationContainer};
use tracing::debug;

/// Template used when a flow sets `auto_generate_path`.
pub const AUTO_PATH_TEMPLATE: &str = "Email Attachments/{flow_name}/{year}-{month}";

/// Values available to path templates.
#[derive(Debug, Clone, Copy)]
pub struct PathContext<'a> {
    /// Flow name substituted for `{flow_name}`.
    pub flow_name: &'a str,
    /// Run start time supplying `{year}`, `{month}` and `{day}`.
    pub timestamp: DateTime<Utc>,
}

/// Template the flow resolves its destination from.
#[must_use]
pub fn template_for(flow: &FlowConfig) -> &str {
    if flow.auto_generate_path {
        AUTO_PATH_TEMPLATE
    } else {
        &flow.destination_path
    }
}

/// Substitute known tokens in `template` and normalise the result.
#[must_use]
pub fn resolve(template: &str, context: &PathContext<'_>) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            output.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let token = &after_open[..close];
        if token.contains('{') {
            output.push('{');
            rest = after_open;
            continue;
        }
        match substitution(token, context) {
            Some(value) => output.push_str(&value),
            None => {
                output.push('{');
                output.push_str(token);
                output.push('}');
            }
        }
        rest = &after_open[close + 1..];
    }
    output.push_str(rest);
    normalize_path(&output)
}

fn substitution(token: &str, context: &PathContext<'_>) -> Option<String> {
    match token {
        "flow_name" => Some(context.flow_name.trim().replace(['/', '\\'], "-")),
        "year" => Some(format!("{:04}", context.timestamp.year())),
        "month" => Some(format!("{:02}", context.timestamp.month())),
        "day" => Some(format!("{:02}", context.timestamp.day())),
        _ => None,
    }
}

/// Use `/` separators, trim each segment, and drop empty segments.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    raw.split(['/', '\\'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve the container at `path`, creating each missing prefix in order.
///
/// # Errors
///
/// Returns [`ConnectorError::DestinationUnavailable`] for an empty path or
/// when any lookup or creation fails.
pub async fn ensure_exists(
    destination: &dyn DestinationConnector,
    path: &str,
) -> ConnectorResult<DestinationContainer> {
    let path = normalize_path(path);
    let mut current: Option<DestinationContainer> = None;
    let mut prefix = String::with_capacity(path.len());

    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);

        let existing = destination
            .lookup_container(&prefix)
            .await
            .map_err(|err| err.into_destination_unavailable(&path))?;
        let container = if let Some(container) = existing {
            container
        } else {
            debug!(path = %prefix, "creating destination container");
            let parent_id = current.as_ref().map(|parent| parent.id.as_str());
            destination
                .create_container(&prefix, parent_id)
                .await
                .map_err(|err| err.into_destination_unavailable(&path))?
        };
        current = Some(container);
    }

    current.ok_or_else(|| ConnectorError::DestinationUnavailable {
        path: path.clone(),
        detail: "destination path is empty".to_string(),
    })
}
