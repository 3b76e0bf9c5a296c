//! Directory-tree destination.
//!
//! # Design
//! - Container ids are normalised paths relative to the storage root.
//! - Payloads land in a hidden `.part` file first and are renamed into place,
//!   so a reader never observes a partial file.
//! - Name selection and the final rename are serialised to keep duplicate
//!   policies consistent under concurrent uploads.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flowrelay_config::DuplicatePolicy;
use flowrelay_core::{
    ConnectorError, ConnectorResult, DestinationConnector, DestinationContainer, UploadDisposition,
    UploadRequest, UploadedFile, suffixed_filename,
};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::paths::{is_safe_component, parent_of, relative_path};

const SERVICE_NAME: &str = "local";

/// Destination writing into a directory tree.
pub struct LocalDestination {
    root: PathBuf,
    finalize: Mutex<()>,
}

impl LocalDestination {
    /// Destination rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            finalize: Mutex::new(()),
        }
    }

    /// Storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container(relative: String) -> DestinationContainer {
        DestinationContainer {
            parent_id: parent_of(&relative),
            id: relative.clone(),
            path: relative,
        }
    }

    fn container_dir(&self, path: &str) -> ConnectorResult<(String, PathBuf)> {
        let relative = relative_path(path).ok_or_else(|| ConnectorError::DestinationUnavailable {
            path: path.to_string(),
            detail: "path is empty or escapes the storage root".to_string(),
        })?;
        let dir = self.root.join(&relative);
        Ok((relative, dir))
    }

    async fn write_temp(dir: &Path, filename: &str, payload: &[u8]) -> ConnectorResult<PathBuf> {
        let temp = dir.join(format!(".{filename}.{}.part", Uuid::new_v4().simple()));
        let io_error = |source| ConnectorError::Io {
            operation: "local.write_temp",
            path: temp.clone(),
            source,
        };
        let mut file = fs::File::create(&temp).await.map_err(io_error)?;
        let written = match file.write_all(payload).await {
            Ok(()) => file.sync_all().await,
            Err(err) => Err(err),
        };
        if let Err(source) = written {
            discard(&temp).await;
            return Err(io_error(source));
        }
        Ok(temp)
    }

    async fn choose_name(
        dir: &Path,
        filename: &str,
        policy: DuplicatePolicy,
    ) -> ConnectorResult<(String, UploadDisposition)> {
        if !exists(&dir.join(filename)).await? {
            return Ok((filename.to_string(), UploadDisposition::Created));
        }
        match policy {
            DuplicatePolicy::Skip => Ok((filename.to_string(), UploadDisposition::SkippedExisting)),
            DuplicatePolicy::Overwrite => Ok((filename.to_string(), UploadDisposition::Overwritten)),
            DuplicatePolicy::RenameWithSuffix => {
                let mut n = 1;
                loop {
                    let candidate = suffixed_filename(filename, n);
                    if !exists(&dir.join(&candidate)).await? {
                        return Ok((candidate, UploadDisposition::Renamed));
                    }
                    n += 1;
                }
            }
        }
    }
}

async fn exists(path: &Path) -> ConnectorResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|source| ConnectorError::Io {
            operation: "local.exists",
            path: path.to_path_buf(),
            source,
        })
}

async fn discard(temp: &Path) {
    if let Err(err) = fs::remove_file(temp).await {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(path = %temp.display(), error = %err, "failed to remove temporary upload");
        }
    }
}

fn sha256_hex(payload: &[u8]) -> String {
    format!("{:x}", Sha256::digest(payload))
}

#[async_trait]
impl DestinationConnector for LocalDestination {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    async fn test_connection(&self) -> bool {
        fs::metadata(&self.root)
            .await
            .is_ok_and(|metadata| metadata.is_dir())
    }

    async fn lookup_container(&self, path: &str) -> ConnectorResult<Option<DestinationContainer>> {
        let (relative, dir) = self.container_dir(path)?;
        match fs::metadata(&dir).await {
            Ok(metadata) if metadata.is_dir() => Ok(Some(Self::container(relative))),
            Ok(_) => Err(ConnectorError::DestinationUnavailable {
                path: relative,
                detail: "a file occupies the container path".to_string(),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConnectorError::Io {
                operation: "local.lookup_container",
                path: dir,
                source,
            }),
        }
    }

    async fn create_container(
        &self,
        path: &str,
        _parent_id: Option<&str>,
    ) -> ConnectorResult<DestinationContainer> {
        let (relative, dir) = self.container_dir(path)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| ConnectorError::Io {
                operation: "local.create_container",
                path: dir.clone(),
                source,
            })?;
        debug!(path = %relative, "container ready");
        Ok(Self::container(relative))
    }

    async fn upload(&self, request: UploadRequest) -> ConnectorResult<UploadedFile> {
        if !is_safe_component(&request.filename) {
            return Err(ConnectorError::TransferError {
                operation: "upload",
                detail: format!("invalid filename {:?}", request.filename),
            });
        }
        let (container_id, dir) = self.container_dir(&request.container_id)?;
        if !exists(&dir).await? {
            return Err(ConnectorError::TransferError {
                operation: "upload",
                detail: format!("container {container_id} does not exist"),
            });
        }

        if request.policy == DuplicatePolicy::Skip && exists(&dir.join(&request.filename)).await? {
            return Ok(UploadedFile {
                id: format!("{container_id}/{}", request.filename),
                name: request.filename,
                size_bytes: 0,
                disposition: UploadDisposition::SkippedExisting,
                checksum: None,
            });
        }

        let checksum = sha256_hex(&request.payload);
        let size_bytes = u64::try_from(request.payload.len()).unwrap_or(u64::MAX);
        let temp = Self::write_temp(&dir, &request.filename, &request.payload).await?;

        let _guard = self.finalize.lock().await;
        let (name, disposition) =
            match Self::choose_name(&dir, &request.filename, request.policy).await {
                Ok(choice) => choice,
                Err(err) => {
                    discard(&temp).await;
                    return Err(err);
                }
            };
        if !disposition.wrote_payload() {
            discard(&temp).await;
            return Ok(UploadedFile {
                id: format!("{container_id}/{name}"),
                name,
                size_bytes: 0,
                disposition,
                checksum: None,
            });
        }

        let target = dir.join(&name);
        if let Err(source) = fs::rename(&temp, &target).await {
            discard(&temp).await;
            return Err(ConnectorError::Io {
                operation: "local.rename",
                path: target,
                source,
            });
        }
        debug!(container = %container_id, %name, %disposition, size_bytes, "payload stored");
        Ok(UploadedFile {
            id: format!("{container_id}/{name}"),
            name,
            size_bytes,
            disposition,
            checksum: Some(checksum),
        })
    }
}
