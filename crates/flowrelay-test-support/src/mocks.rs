//! In-memory connectors with failure injection and call recording.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use flowrelay_config::DuplicatePolicy;
use flowrelay_core::{
    CandidateItem, ConnectorError, ConnectorResult, DestinationConnector, DestinationContainer,
    SourceConnector, SourceQuery, UploadDisposition, UploadRequest, UploadedFile,
    suffixed_filename,
};

/// Callback invoked with the attachment id on every payload fetch.
pub type FetchHook = Arc<dyn Fn(&str) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Source serving a fixed list of items from memory.
pub struct MemorySource {
    service: String,
    reachable: AtomicBool,
    list_fails: AtomicBool,
    items: Mutex<Vec<CandidateItem>>,
    payloads: Mutex<HashMap<(String, String), Vec<u8>>>,
    unavailable: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    list_delay: Mutex<Option<Duration>>,
    fetch_delay: Mutex<Option<Duration>>,
    on_fetch: Mutex<Option<FetchHook>>,
    fetched: Mutex<Vec<String>>,
    last_query: Mutex<Option<SourceQuery>>,
    list_calls: AtomicUsize,
}

impl MemorySource {
    /// Create an empty, reachable source.
    #[must_use]
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            reachable: AtomicBool::new(true),
            list_fails: AtomicBool::new(false),
            items: Mutex::new(Vec::new()),
            payloads: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(HashSet::new()),
            panicking: Mutex::new(HashSet::new()),
            list_delay: Mutex::new(None),
            fetch_delay: Mutex::new(None),
            on_fetch: Mutex::new(None),
            fetched: Mutex::new(Vec::new()),
            last_query: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Add an item; every attachment gets a payload of its declared size.
    pub fn push_item(&self, item: CandidateItem) {
        {
            let mut payloads = lock(&self.payloads);
            for attachment in &item.attachments {
                let size = usize::try_from(attachment.size_bytes).unwrap_or(0);
                payloads.insert(
                    (item.id.clone(), attachment.id.clone()),
                    vec![b'x'; size],
                );
            }
        }
        lock(&self.items).push(item);
    }

    /// Replace the payload served for one attachment.
    pub fn set_payload(&self, item_id: &str, attachment_id: &str, payload: Vec<u8>) {
        lock(&self.payloads).insert((item_id.to_string(), attachment_id.to_string()), payload);
    }

    /// Toggle the connectivity probe result.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make `list` fail with [`ConnectorError::Unreachable`].
    pub fn fail_listing(&self) {
        self.list_fails.store(true, Ordering::SeqCst);
    }

    /// Make fetches of `attachment_id` fail with [`ConnectorError::PayloadUnavailable`].
    pub fn mark_unavailable(&self, attachment_id: &str) {
        lock(&self.unavailable).insert(attachment_id.to_string());
    }

    /// Make fetches of `attachment_id` panic.
    pub fn panic_on_fetch(&self, attachment_id: &str) {
        lock(&self.panicking).insert(attachment_id.to_string());
    }

    /// Delay every listing by `delay`.
    pub fn set_list_delay(&self, delay: Duration) {
        *lock(&self.list_delay) = Some(delay);
    }

    /// Delay every fetch by `delay`.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *lock(&self.fetch_delay) = Some(delay);
    }

    /// Install a callback run at the start of every fetch.
    pub fn on_fetch(&self, hook: FetchHook) {
        *lock(&self.on_fetch) = Some(hook);
    }

    /// Attachment ids fetched so far, in call order.
    #[must_use]
    pub fn fetched(&self) -> Vec<String> {
        lock(&self.fetched).clone()
    }

    /// Query passed to the most recent `list` call.
    #[must_use]
    pub fn last_query(&self) -> Option<SourceQuery> {
        lock(&self.last_query).clone()
    }

    /// Number of `list` calls.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceConnector for MemorySource {
    fn service_name(&self) -> &str {
        &self.service
    }

    async fn test_connection(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    async fn list(&self, query: &SourceQuery) -> ConnectorResult<Vec<CandidateItem>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_query) = Some(query.clone());
        let delay = *lock(&self.list_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(ConnectorError::Unreachable {
                service: self.service.clone(),
                detail: "listing disabled".to_string(),
            });
        }
        Ok(lock(&self.items).clone())
    }

    async fn fetch_payload(&self, item_id: &str, attachment_id: &str) -> ConnectorResult<Vec<u8>> {
        let hook = lock(&self.on_fetch).clone();
        if let Some(hook) = hook {
            hook(attachment_id);
        }
        lock(&self.fetched).push(attachment_id.to_string());

        let delay = *lock(&self.fetch_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        assert!(
            !lock(&self.panicking).contains(attachment_id),
            "injected panic while fetching {attachment_id}"
        );
        if lock(&self.unavailable).contains(attachment_id) {
            return Err(ConnectorError::PayloadUnavailable {
                item_id: item_id.to_string(),
                attachment_id: attachment_id.to_string(),
                detail: "attachment deleted".to_string(),
            });
        }
        lock(&self.payloads)
            .get(&(item_id.to_string(), attachment_id.to_string()))
            .cloned()
            .ok_or_else(|| ConnectorError::PayloadUnavailable {
                item_id: item_id.to_string(),
                attachment_id: attachment_id.to_string(),
                detail: "unknown attachment".to_string(),
            })
    }
}

#[derive(Default)]
struct DestinationState {
    containers: BTreeMap<String, DestinationContainer>,
    files: BTreeMap<(String, String), Vec<u8>>,
    next_id: u64,
}

impl DestinationState {
    fn has_file(&self, container_id: &str, name: &str) -> bool {
        self.files
            .contains_key(&(container_id.to_string(), name.to_string()))
    }
}

/// Destination keeping containers and files in memory.
pub struct MemoryDestination {
    service: String,
    reachable: AtomicBool,
    containers_fail: AtomicBool,
    state: Mutex<DestinationState>,
    failing_uploads: Mutex<HashSet<String>>,
    upload_delay: Mutex<Option<Duration>>,
    container_delay: Mutex<Option<Duration>>,
    create_calls: AtomicUsize,
    upload_calls: AtomicUsize,
}

impl MemoryDestination {
    /// Create an empty, reachable destination.
    #[must_use]
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            reachable: AtomicBool::new(true),
            containers_fail: AtomicBool::new(false),
            state: Mutex::new(DestinationState::default()),
            failing_uploads: Mutex::new(HashSet::new()),
            upload_delay: Mutex::new(None),
            container_delay: Mutex::new(None),
            create_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
        }
    }

    /// Toggle the connectivity probe result.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make container lookups and creation fail.
    pub fn fail_containers(&self) {
        self.containers_fail.store(true, Ordering::SeqCst);
    }

    /// Make uploads of `filename` fail with [`ConnectorError::TransferError`].
    pub fn fail_uploads_of(&self, filename: &str) {
        lock(&self.failing_uploads).insert(filename.to_string());
    }

    /// Delay every upload by `delay`.
    pub fn set_upload_delay(&self, delay: Duration) {
        *lock(&self.upload_delay) = Some(delay);
    }

    /// Delay every container lookup by `delay`.
    pub fn set_container_delay(&self, delay: Duration) {
        *lock(&self.container_delay) = Some(delay);
    }

    /// Pre-populate a file inside `container_id`.
    pub fn seed_file(&self, container_id: &str, name: &str, payload: Vec<u8>) {
        lock(&self.state)
            .files
            .insert((container_id.to_string(), name.to_string()), payload);
    }

    /// Every container, ordered by path.
    #[must_use]
    pub fn containers(&self) -> Vec<DestinationContainer> {
        lock(&self.state).containers.values().cloned().collect()
    }

    /// Names stored in the container at `path`, sorted.
    #[must_use]
    pub fn files_at(&self, path: &str) -> Vec<String> {
        let state = lock(&self.state);
        let Some(container) = state.containers.get(path) else {
            return Vec::new();
        };
        state
            .files
            .keys()
            .filter(|(container_id, _)| *container_id == container.id)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Contents of one stored file.
    #[must_use]
    pub fn file(&self, container_id: &str, name: &str) -> Option<Vec<u8>> {
        lock(&self.state)
            .files
            .get(&(container_id.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of containers actually created.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of upload calls, successful or not.
    #[must_use]
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    fn container_failure(&self, path: &str) -> ConnectorResult<()> {
        if self.containers_fail.load(Ordering::SeqCst) {
            return Err(ConnectorError::Unreachable {
                service: self.service.clone(),
                detail: format!("cannot resolve {path}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DestinationConnector for MemoryDestination {
    fn service_name(&self) -> &str {
        &self.service
    }

    async fn test_connection(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    async fn lookup_container(&self, path: &str) -> ConnectorResult<Option<DestinationContainer>> {
        let delay = *lock(&self.container_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.container_failure(path)?;
        Ok(lock(&self.state).containers.get(path).cloned())
    }

    async fn create_container(
        &self,
        path: &str,
        parent_id: Option<&str>,
    ) -> ConnectorResult<DestinationContainer> {
        self.container_failure(path)?;
        let mut state = lock(&self.state);
        if let Some(existing) = state.containers.get(path) {
            return Ok(existing.clone());
        }
        state.next_id += 1;
        let container = DestinationContainer {
            id: format!("container-{}", state.next_id),
            path: path.to_string(),
            parent_id: parent_id.map(str::to_string),
        };
        state.containers.insert(path.to_string(), container.clone());
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(container)
    }

    async fn upload(&self, request: UploadRequest) -> ConnectorResult<UploadedFile> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.upload_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if lock(&self.failing_uploads).contains(&request.filename) {
            return Err(ConnectorError::TransferError {
                operation: "upload",
                detail: format!("{} rejected by {}", request.filename, self.service),
            });
        }

        let mut state = lock(&self.state);
        let container_id = request.container_id.as_str();
        let (name, disposition) = if !state.has_file(container_id, &request.filename) {
            (request.filename.clone(), UploadDisposition::Created)
        } else {
            match request.policy {
                DuplicatePolicy::Skip => (request.filename.clone(), UploadDisposition::SkippedExisting),
                DuplicatePolicy::Overwrite => {
                    (request.filename.clone(), UploadDisposition::Overwritten)
                }
                DuplicatePolicy::RenameWithSuffix => {
                    let mut n = 1;
                    while state.has_file(container_id, &suffixed_filename(&request.filename, n)) {
                        n += 1;
                    }
                    (suffixed_filename(&request.filename, n), UploadDisposition::Renamed)
                }
            }
        };

        let key = (request.container_id.clone(), name.clone());
        let size_bytes = if disposition.wrote_payload() {
            let size = request.payload.len() as u64;
            state.files.insert(key.clone(), request.payload);
            size
        } else {
            state.files.get(&key).map_or(0, |existing| existing.len() as u64)
        };
        Ok(UploadedFile {
            id: format!("{}/{}", key.0, key.1),
            name,
            size_bytes,
            disposition,
            checksum: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{attachment, item};

    fn request(filename: &str, policy: DuplicatePolicy) -> UploadRequest {
        UploadRequest {
            container_id: "container-1".into(),
            filename: filename.into(),
            mime_type: "text/plain".into(),
            payload: b"data".to_vec(),
            policy,
        }
    }

    #[tokio::test]
    async fn source_serves_generated_payloads_and_failures() {
        let source = MemorySource::new("mail");
        source.push_item(item(
            "m1",
            "a@acme.com",
            "hello",
            vec![attachment("a1", "one.txt", 3), attachment("a2", "two.txt", 2)],
        ));
        source.mark_unavailable("a2");

        assert_eq!(source.fetch_payload("m1", "a1").await.ok(), Some(b"xxx".to_vec()));
        assert!(matches!(
            source.fetch_payload("m1", "a2").await,
            Err(ConnectorError::PayloadUnavailable { .. })
        ));
        assert_eq!(source.fetched(), vec!["a1".to_string(), "a2".to_string()]);
    }

    #[tokio::test]
    async fn destination_applies_duplicate_policies() -> ConnectorResult<()> {
        let destination = MemoryDestination::new("drive");
        let container = destination.create_container("Inbox", None).await?;
        assert_eq!(container.id, "container-1");

        let first = destination
            .upload(request("a.txt", DuplicatePolicy::RenameWithSuffix))
            .await?;
        assert_eq!(first.disposition, UploadDisposition::Created);
        let renamed = destination
            .upload(request("a.txt", DuplicatePolicy::RenameWithSuffix))
            .await?;
        assert_eq!(renamed.name, "a (1).txt");
        let renamed_again = destination
            .upload(request("a.txt", DuplicatePolicy::RenameWithSuffix))
            .await?;
        assert_eq!(renamed_again.name, "a (2).txt");
        let skipped = destination
            .upload(request("a.txt", DuplicatePolicy::Skip))
            .await?;
        assert_eq!(skipped.disposition, UploadDisposition::SkippedExisting);
        let overwritten = destination
            .upload(request("a.txt", DuplicatePolicy::Overwrite))
            .await?;
        assert_eq!(overwritten.disposition, UploadDisposition::Overwritten);

        assert_eq!(
            destination.files_at("Inbox"),
            vec!["a (1).txt", "a (2).txt", "a.txt"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn create_container_is_idempotent() -> ConnectorResult<()> {
        let destination = MemoryDestination::new("drive");
        let first = destination.create_container("Reports", None).await?;
        let second = destination.create_container("Reports", None).await?;
        assert_eq!(first, second);
        assert_eq!(destination.create_calls(), 1);
        Ok(())
    }
}
