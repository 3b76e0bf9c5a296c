//! Path sanitising shared by the filesystem connectors.

/// Normalise a `/`-separated container path, rejecting traversal segments.
///
/// Returns `None` for an empty path or one containing `.` or `..`.
pub(crate) fn relative_path(raw: &str) -> Option<String> {
    let segments: Vec<&str> = raw
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() || segments.iter().any(|segment| matches!(*segment, "." | "..")) {
        return None;
    }
    Some(segments.join("/"))
}

/// Parent of a normalised relative path.
pub(crate) fn parent_of(relative: &str) -> Option<String> {
    relative
        .rsplit_once('/')
        .map(|(parent, _)| parent.to_string())
}

/// Whether `name` is usable as a single path component.
pub(crate) fn is_safe_component(name: &str) -> bool {
    !name.trim().is_empty()
        && !matches!(name, "." | "..")
        && !name.contains(['/', '\\', '\0'])
}
