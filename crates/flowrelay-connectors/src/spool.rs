//! Spool-directory source.
//!
//! Layout: one sub-directory per message holding a `message.json` manifest
//! (a serialised [`CandidateItem`]) and one file per attachment, named by the
//! attachment id. The source keeps no state between calls: payload fetches
//! locate the message folder from the item id on their own.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flowrelay_core::{CandidateItem, ConnectorError, ConnectorResult, SourceConnector, SourceQuery};
use tokio::fs;
use tracing::{debug, warn};

use crate::paths::is_safe_component;

/// Manifest file name inside each message directory.
pub const MESSAGE_MANIFEST: &str = "message.json";

const SERVICE_NAME: &str = "spool";

/// Source reading messages from a spool directory.
pub struct SpoolSource {
    root: PathBuf,
}

impl SpoolSource {
    /// Source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Spool directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder whose manifest carries `item_id`; a folder named after the id is tried first.
    async fn locate(&self, item_id: &str) -> io::Result<Option<PathBuf>> {
        if is_safe_component(item_id) {
            let direct = self.root.join(item_id);
            if Self::holds_item(&direct, item_id).await {
                return Ok(Some(direct));
            }
        }
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let folder = entry.path();
            if Self::holds_item(&folder, item_id).await {
                return Ok(Some(folder));
            }
        }
        Ok(None)
    }

    async fn holds_item(folder: &Path, item_id: &str) -> bool {
        Self::read_manifest(folder)
            .await
            .is_ok_and(|item| item.id == item_id)
    }

    async fn read_manifest(folder: &Path) -> Result<CandidateItem, String> {
        let manifest = folder.join(MESSAGE_MANIFEST);
        let bytes = fs::read(&manifest)
            .await
            .map_err(|err| format!("cannot read {}: {err}", manifest.display()))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| format!("invalid {}: {err}", manifest.display()))
    }
}

fn query_admits(query: &SourceQuery, item: &CandidateItem) -> bool {
    let contains = |haystack: &str, needle: Option<&str>| {
        needle.is_none_or(|needle| haystack.to_lowercase().contains(&needle.to_lowercase()))
    };
    contains(&item.sender, query.sender.as_deref())
        && contains(&item.subject, query.subject_keyword.as_deref())
        && (!query.attachment_required || !item.attachments.is_empty())
}

#[async_trait]
impl SourceConnector for SpoolSource {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    async fn test_connection(&self) -> bool {
        fs::metadata(&self.root)
            .await
            .is_ok_and(|metadata| metadata.is_dir())
    }

    async fn list(&self, query: &SourceQuery) -> ConnectorResult<Vec<CandidateItem>> {
        let io_error = |source| ConnectorError::Io {
            operation: "spool.list",
            path: self.root.clone(),
            source,
        };
        let mut entries = fs::read_dir(&self.root).await.map_err(io_error)?;
        let mut items = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let folder = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .is_ok_and(|file_type| file_type.is_dir());
            if !is_dir {
                continue;
            }
            match Self::read_manifest(&folder).await {
                Ok(item) if query_admits(query, &item) => items.push(item),
                Ok(_) => {}
                Err(reason) => warn!(folder = %folder.display(), %reason, "skipping spool entry"),
            }
        }

        items.sort_by(|a, b| a.received_at.cmp(&b.received_at).then_with(|| a.id.cmp(&b.id)));
        debug!(count = items.len(), root = %self.root.display(), "spool listed");
        Ok(items)
    }

    async fn fetch_payload(&self, item_id: &str, attachment_id: &str) -> ConnectorResult<Vec<u8>> {
        let unavailable = |detail: &str| ConnectorError::PayloadUnavailable {
            item_id: item_id.to_string(),
            attachment_id: attachment_id.to_string(),
            detail: detail.to_string(),
        };
        if !is_safe_component(attachment_id) {
            return Err(unavailable("invalid attachment id"));
        }
        let folder = match self.locate(item_id).await {
            Ok(Some(folder)) => folder,
            Ok(None) => return Err(unavailable("unknown item")),
            Err(source) => {
                return Err(ConnectorError::Io {
                    operation: "spool.locate",
                    path: self.root.clone(),
                    source,
                });
            }
        };
        let path = folder.join(attachment_id);
        match fs::read(&path).await {
            Ok(payload) => Ok(payload),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(unavailable("attachment file missing"))
            }
            Err(source) => Err(ConnectorError::Io {
                operation: "spool.fetch",
                path,
                source,
            }),
        }
    }
}
