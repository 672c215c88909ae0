//! Request handlers for the `/files` API.
//!
//! [`FilesApi`] turns each external operation into storage calls plus, for
//! mutations, exactly one change notification. Handlers return typed bodies;
//! the router owns the HTTP encoding.

use std::{sync::Arc, time::Duration};

use filedock_core::{
    api::{DeleteResponse, ListResponse, PollResponse, UploadResponse},
    domain::{content_type_for, FileDescriptor, FileName, StorageError},
    ports::IFileStorage,
};
use filedock_notify::{ChangeRegister, LongPoll};
use futures_util::future::join_all;
use hyper::body::Bytes;
use tracing::{debug, error, info, warn};

use crate::{
    error::{
        ApiError, MSG_DELETE_FAILED, MSG_DOWNLOAD_FAILED, MSG_FILE_NOT_FOUND,
        MSG_INVALID_FILE_NAME, MSG_LIST_FAILED, MSG_NO_FILE, MSG_NO_FILE_NAME, MSG_UPLOAD_FAILED,
    },
    metrics::MetricsRegistry,
    multipart::UploadPayload,
};

pub const MSG_UPLOADED: &str = "File uploaded successfully";
pub const MSG_DELETED: &str = "File deleted successfully";

/// A file ready to be sent back to the client
#[derive(Debug, Clone)]
pub struct Download {
    pub name: FileName,
    pub content_type: &'static str,
    pub data: Bytes,
}

/// The file API: storage, change register and long-poll resolver together.
pub struct FilesApi {
    storage: Arc<dyn IFileStorage>,
    register: Arc<ChangeRegister>,
    poll: LongPoll,
    metrics: Arc<MetricsRegistry>,
}

impl FilesApi {
    pub fn new(
        storage: Arc<dyn IFileStorage>,
        register: Arc<ChangeRegister>,
        poll_timeout: Duration,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let poll = LongPoll::new(Arc::clone(&register), poll_timeout);
        Self {
            storage,
            register,
            poll,
            metrics,
        }
    }

    /// The change register shared with every handler
    pub fn register(&self) -> &Arc<ChangeRegister> {
        &self.register
    }

    /// The metrics registry handlers record into
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    // ========================================================================
    // Read-only operations
    // ========================================================================

    /// Lists every file with its metadata.
    ///
    /// A file that disappears or cannot be stat'ed between listing and
    /// projection is left out rather than failing the whole listing.
    ///
    /// The timestamp is taken before the directory scan. A mutation that
    /// lands during the scan is then newer than the returned timestamp, so
    /// a poll from it answers at once.
    pub async fn list(&self) -> Result<ListResponse, ApiError> {
        let timestamp = self.register.last_change_at();
        let names = self.storage.list().await.map_err(|e| {
            error!(error = %e, "failed to list storage root");
            ApiError::Internal(MSG_LIST_FAILED)
        })?;

        let stats = join_all(names.iter().map(|name| self.storage.stat(name))).await;
        let files: Vec<FileDescriptor> = names
            .iter()
            .zip(stats)
            .filter_map(|(name, stat)| match stat {
                Ok(descriptor) => Some(descriptor),
                Err(e) if e.is_not_found() => {
                    debug!(%name, "file vanished while listing");
                    None
                }
                Err(e) => {
                    warn!(%name, error = %e, "dropping file from listing");
                    None
                }
            })
            .collect();

        Ok(ListResponse { files, timestamp })
    }

    /// Long poll: resolves once something changed after `since`, or after
    /// the poll timeout with `changes: false`.
    pub async fn poll(&self, since: i64) -> PollResponse {
        let outcome = self.poll.wait_for_change(since).await;
        PollResponse {
            changes: outcome.changed,
            timestamp: outcome.timestamp,
        }
    }

    /// Reads a file for download.
    pub async fn download(&self, raw_name: &str) -> Result<Download, ApiError> {
        let name = sanitize(raw_name)?;

        let data = self.storage.read(&name).await.map_err(|e| match e {
            StorageError::NotFound(_) => ApiError::NotFound(MSG_FILE_NOT_FOUND),
            e => {
                error!(%name, error = %e, "download failed");
                ApiError::Internal(MSG_DOWNLOAD_FAILED)
            }
        })?;

        self.metrics.record_bytes("download", data.len() as u64);
        debug!(%name, bytes = data.len(), "serving download");

        Ok(Download {
            content_type: content_type_for(&name),
            name,
            data: Bytes::from(data),
        })
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Stores an uploaded file under its sanitized name and notifies pollers.
    pub async fn upload(&self, payload: Option<UploadPayload>) -> Result<UploadResponse, ApiError> {
        let payload = payload.ok_or(ApiError::BadRequest(MSG_NO_FILE))?;
        let name = sanitize(&payload.file_name)?;

        self.storage.write(&name, &payload.data).await.map_err(|e| {
            error!(%name, error = %e, "upload failed");
            ApiError::Internal(MSG_UPLOAD_FAILED)
        })?;
        let timestamp = self.notify();

        let file = match self.storage.stat(&name).await {
            Ok(file) => file,
            Err(e) => {
                warn!(%name, error = %e, "could not stat uploaded file");
                FileDescriptor::just_written(name.clone(), payload.data.len() as u64)
            }
        };

        self.metrics.record_bytes("upload", file.size);
        info!(%name, size = file.size, original = %payload.file_name, "file uploaded");

        Ok(UploadResponse {
            message: MSG_UPLOADED.to_string(),
            file,
            timestamp,
        })
    }

    /// Deletes a file and notifies pollers.
    pub async fn delete(&self, raw_name: Option<&str>) -> Result<DeleteResponse, ApiError> {
        let raw_name = raw_name
            .filter(|n| !n.is_empty())
            .ok_or(ApiError::BadRequest(MSG_NO_FILE_NAME))?;
        let name = sanitize(raw_name)?;

        self.storage.remove(&name).await.map_err(|e| match e {
            StorageError::NotFound(_) => ApiError::NotFound(MSG_FILE_NOT_FOUND),
            e => {
                error!(%name, error = %e, "delete failed");
                ApiError::Internal(MSG_DELETE_FAILED)
            }
        })?;
        let timestamp = self.notify();

        info!(%name, "file deleted");
        Ok(DeleteResponse {
            message: MSG_DELETED.to_string(),
            timestamp,
        })
    }

    fn notify(&self) -> i64 {
        let outcome = self.register.notify();
        self.metrics.record_notification();
        debug!(released = outcome.released, "pollers notified");
        outcome.timestamp
    }
}

fn sanitize(raw: &str) -> Result<FileName, ApiError> {
    FileName::sanitize(raw).map_err(|_| {
        debug!(raw, "rejected file name");
        ApiError::BadRequest(MSG_INVALID_FILE_NAME)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use filedock_storage::DirectoryStorage;
    use tempfile::TempDir;

    use super::*;

    fn setup(timeout: Duration) -> (TempDir, FilesApi) {
        let dir = tempfile::tempdir().unwrap();
        let api = FilesApi::new(
            Arc::new(DirectoryStorage::new(dir.path().join("uploads"))),
            Arc::new(ChangeRegister::starting_at(1_000)),
            timeout,
            Arc::new(MetricsRegistry::new().unwrap()),
        );
        (dir, api)
    }

    /// Runs another mutation in the middle of an operation.
    enum Interleave {
        /// Writes `late.txt` and notifies after the directory scan.
        WriteAfterScan(Arc<ChangeRegister>),
        /// Removes the file right before it is stat'ed.
        RemoveBeforeStat,
    }

    struct InterleavedStorage {
        inner: DirectoryStorage,
        interleave: Interleave,
    }

    #[async_trait::async_trait]
    impl IFileStorage for InterleavedStorage {
        async fn list(&self) -> Result<Vec<FileName>, StorageError> {
            let names = self.inner.list().await?;
            if let Interleave::WriteAfterScan(register) = &self.interleave {
                let late = FileName::sanitize("late.txt").unwrap();
                self.inner.write(&late, b"late").await?;
                register.notify();
            }
            Ok(names)
        }

        async fn stat(&self, name: &FileName) -> Result<FileDescriptor, StorageError> {
            if let Interleave::RemoveBeforeStat = self.interleave {
                self.inner.remove(name).await?;
            }
            self.inner.stat(name).await
        }

        async fn read(&self, name: &FileName) -> Result<Vec<u8>, StorageError> {
            self.inner.read(name).await
        }

        async fn write(&self, name: &FileName, data: &[u8]) -> Result<(), StorageError> {
            self.inner.write(name, data).await
        }

        async fn remove(&self, name: &FileName) -> Result<(), StorageError> {
            self.inner.remove(name).await
        }
    }

    fn interleaved(
        dir: &TempDir,
        register: &Arc<ChangeRegister>,
        interleave: Interleave,
    ) -> FilesApi {
        let storage = InterleavedStorage {
            inner: DirectoryStorage::new(dir.path().join("uploads")),
            interleave,
        };
        FilesApi::new(
            Arc::new(storage),
            Arc::clone(register),
            Duration::from_secs(30),
            Arc::new(MetricsRegistry::new().unwrap()),
        )
    }

    fn payload(name: &str, data: &'static [u8]) -> Option<UploadPayload> {
        Some(UploadPayload {
            file_name: name.to_string(),
            data: Bytes::from_static(data),
        })
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let listing = api.list().await.unwrap();
        assert!(listing.files.is_empty());
        assert_eq!(listing.timestamp, 1_000);
    }

    #[tokio::test]
    async fn test_upload_then_list_and_download() {
        let (_dir, api) = setup(Duration::from_secs(30));

        let uploaded = api.upload(payload("report.pdf", b"%PDF-1.4")).await.unwrap();
        assert_eq!(uploaded.message, MSG_UPLOADED);
        assert_eq!(uploaded.file.name.as_str(), "report.pdf");
        assert_eq!(uploaded.file.size, 8);
        assert!(uploaded.timestamp > 1_000);

        let listing = api.list().await.unwrap();
        assert_eq!(listing.files, vec![uploaded.file.clone()]);
        assert_eq!(listing.timestamp, uploaded.timestamp);

        let download = api.download("report.pdf").await.unwrap();
        assert_eq!(download.content_type, "application/pdf");
        assert_eq!(&download.data[..], b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_upload_sanitizes_name() {
        let (dir, api) = setup(Duration::from_secs(30));

        let uploaded = api
            .upload(payload("../../etc/passwd", b"root:x:0:0"))
            .await
            .unwrap();
        assert_eq!(uploaded.file.name.as_str(), "....etcpasswd");
        assert!(dir.path().join("uploads").join("....etcpasswd").is_file());

        // The download path applies the same sanitization.
        let download = api.download("../../etc/passwd").await.unwrap();
        assert_eq!(&download.data[..], b"root:x:0:0");
    }

    #[tokio::test]
    async fn test_upload_without_payload_is_bad_request() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let err = api.upload(None).await.unwrap_err();
        assert_eq!(err, ApiError::BadRequest(MSG_NO_FILE));
        assert_eq!(api.register().last_change_at(), 1_000);
    }

    #[tokio::test]
    async fn test_upload_with_unusable_name_is_bad_request() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let err = api.upload(payload("..", b"x")).await.unwrap_err();
        assert_eq!(err, ApiError::BadRequest(MSG_INVALID_FILE_NAME));
        assert_eq!(api.register().last_change_at(), 1_000);
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let err = api.download("ghost.txt").await.unwrap_err();
        assert_eq!(err, ApiError::NotFound(MSG_FILE_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let uploaded = api.upload(payload("a.txt", b"x")).await.unwrap();

        let deleted = api.delete(Some("a.txt")).await.unwrap();
        assert_eq!(deleted.message, MSG_DELETED);
        assert!(deleted.timestamp > uploaded.timestamp);
        assert!(api.list().await.unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn test_delete_errors() {
        let (_dir, api) = setup(Duration::from_secs(30));

        assert_eq!(
            api.delete(None).await.unwrap_err(),
            ApiError::BadRequest(MSG_NO_FILE_NAME)
        );
        assert_eq!(
            api.delete(Some("")).await.unwrap_err(),
            ApiError::BadRequest(MSG_NO_FILE_NAME)
        );
        assert_eq!(
            api.delete(Some("ghost.txt")).await.unwrap_err(),
            ApiError::NotFound(MSG_FILE_NOT_FOUND)
        );
        // Failed deletes are not mutations.
        assert_eq!(api.register().last_change_at(), 1_000);
    }

    #[tokio::test]
    async fn test_each_mutation_notifies_once() {
        let (_dir, api) = setup(Duration::from_secs(30));

        api.upload(payload("a.txt", b"1")).await.unwrap();
        api.upload(payload("b.txt", b"22")).await.unwrap();
        api.delete(Some("a.txt")).await.unwrap();

        assert_eq!(api.metrics().notifications_total.get(), 3);
    }

    #[tokio::test]
    async fn test_list_reflects_surviving_files() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let mut expected = BTreeMap::new();

        let ops: &[(&str, Option<&'static [u8]>)] = &[
            ("a.txt", Some(b"aaaa".as_slice())),
            ("b.txt", Some(b"bb".as_slice())),
            ("c.txt", Some(b"c".as_slice())),
            ("b.txt", None),
            ("a.txt", Some(b"a".as_slice())),
            ("d.bin", Some(b"".as_slice())),
            ("c.txt", None),
        ];
        for (name, data) in ops {
            match data {
                Some(data) => {
                    api.upload(payload(name, *data)).await.unwrap();
                    expected.insert(name.to_string(), data.len() as u64);
                }
                None => {
                    api.delete(Some(*name)).await.unwrap();
                    expected.remove(*name);
                }
            }
        }

        let listed: BTreeMap<String, u64> = api
            .list()
            .await
            .unwrap()
            .files
            .into_iter()
            .map(|f| (f.name.to_string(), f.size))
            .collect();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_upload_during_listing_is_seen_by_next_poll() {
        let dir = tempfile::tempdir().unwrap();
        let register = Arc::new(ChangeRegister::starting_at(1_000));
        let api = interleaved(
            &dir,
            &register,
            Interleave::WriteAfterScan(Arc::clone(&register)),
        );

        let listing = api.list().await.unwrap();
        assert!(listing.files.is_empty());
        assert_eq!(listing.timestamp, 1_000);

        // The file missing from the listing must show up as a change.
        let polled = tokio::time::timeout(Duration::from_secs(5), api.poll(listing.timestamp))
            .await
            .unwrap();
        assert!(polled.changes);
        assert_eq!(polled.timestamp, register.last_change_at());
        assert!(polled.timestamp > listing.timestamp);
    }

    #[tokio::test]
    async fn test_upload_succeeds_when_file_is_removed_before_stat() {
        let dir = tempfile::tempdir().unwrap();
        let register = Arc::new(ChangeRegister::starting_at(1_000));
        let api = interleaved(&dir, &register, Interleave::RemoveBeforeStat);

        let uploaded = api.upload(payload("brief.txt", b"gone")).await.unwrap();
        assert_eq!(uploaded.message, MSG_UPLOADED);
        assert_eq!(uploaded.file.name.as_str(), "brief.txt");
        assert_eq!(uploaded.file.size, 4);
        assert_eq!(uploaded.timestamp, register.last_change_at());
        assert!(uploaded.timestamp > 1_000);
    }

    #[tokio::test]
    async fn test_poll_released_by_upload() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let api = Arc::new(api);

        let since = api.register().last_change_at();
        let poller = {
            let api = Arc::clone(&api);
            tokio::spawn(async move { api.poll(since).await })
        };
        while api.register().waiter_count() == 0 {
            tokio::task::yield_now().await;
        }

        let uploaded = api.upload(payload("a.txt", b"x")).await.unwrap();
        let polled = poller.await.unwrap();
        assert!(polled.changes);
        assert_eq!(polled.timestamp, uploaded.timestamp);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let start = tokio::time::Instant::now();

        let polled = api.poll(1_000).await;
        assert!(!polled.changes);
        assert_eq!(polled.timestamp, 1_000);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_poll_with_old_timestamp_returns_immediately() {
        let (_dir, api) = setup(Duration::from_secs(30));
        let polled = api.poll(0).await;
        assert_eq!(
            polled,
            PollResponse {
                changes: true,
                timestamp: 1_000
            }
        );
    }
}
