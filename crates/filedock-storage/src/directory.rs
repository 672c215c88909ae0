//! Flat directory storage adapter (secondary/driven adapter)
//!
//! Implements [`IFileStorage`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **Lazy root**: the root directory is created on first access, so a
//!   fresh deployment needs no setup step.
//! - **Atomic writes**: data is written to a hidden temporary file in the
//!   root and renamed over the target, so a concurrent download never sees
//!   a half-written file.
//! - **Temporary names**: temporary files contain `~`, which sanitization
//!   strips, so they can never collide with a client name and are skipped
//!   by `list`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use filedock_core::{
    domain::{EntryStat, FileDescriptor, FileName, StorageError},
    ports::IFileStorage,
};
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

/// Adapter that stores files as entries of a single directory.
#[derive(Debug)]
pub struct DirectoryStorage {
    root: PathBuf,
    root_ready: OnceCell<()>,
    tmp_counter: AtomicU64,
}

impl DirectoryStorage {
    /// Create an adapter for `root`. Nothing touches the disk until the first call.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            root_ready: OnceCell::new(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    /// The directory this adapter stores files in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    ///
    /// Runs at most once successfully; a failed attempt is retried on the
    /// next call.
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        self.root_ready
            .get_or_try_init(|| async {
                debug!(root = %self.root.display(), "ensuring storage root exists");
                tokio::fs::create_dir_all(&self.root)
                    .await
                    .map_err(|source| StorageError::Io {
                        op: "create_root",
                        source,
                    })
            })
            .await
            .map(|_| ())
    }

    fn path_of(&self, name: &FileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    fn tmp_path(&self) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".~filedock-{}-{}.tmp", std::process::id(), n))
    }

    /// Stats a stored entry; anything but a regular file counts as missing.
    async fn entry_stat(&self, name: &FileName) -> Result<EntryStat, StorageError> {
        let metadata = tokio::fs::metadata(self.path_of(name))
            .await
            .map_err(|e| StorageError::from_io("stat", name.as_str(), e))?;

        let stat = EntryStat::from(&metadata);
        if !stat.is_file {
            return Err(StorageError::NotFound(name.to_string()));
        }
        Ok(stat)
    }
}

#[async_trait::async_trait]
impl IFileStorage for DirectoryStorage {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn list(&self) -> Result<Vec<FileName>, StorageError> {
        self.ensure_root().await?;

        let io_err = |source| StorageError::Io { op: "list", source };
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let raw = entry.file_name();
            let Some(raw) = raw.to_str() else {
                debug!(name = ?raw, "skipping non UTF-8 entry");
                continue;
            };
            let Some(name) = FileName::from_existing(raw) else {
                debug!(name = raw, "skipping entry that is not a sanitized name");
                continue;
            };
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => names.push(name),
                Ok(_) => debug!(name = raw, "skipping non-file entry"),
                Err(e) => warn!(name = raw, error = %e, "could not read entry type"),
            }
        }

        names.sort();
        debug!(count = names.len(), "listed storage root");
        Ok(names)
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn stat(&self, name: &FileName) -> Result<FileDescriptor, StorageError> {
        self.ensure_root().await?;
        let stat = self.entry_stat(name).await?;
        Ok(FileDescriptor::project(name.clone(), &stat))
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn read(&self, name: &FileName) -> Result<Vec<u8>, StorageError> {
        self.ensure_root().await?;
        self.entry_stat(name).await?;

        debug!("reading file");
        let data = tokio::fs::read(self.path_of(name))
            .await
            .map_err(|e| StorageError::from_io("read", name.as_str(), e))?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(name = %name, bytes = data.len()))]
    async fn write(&self, name: &FileName, data: &[u8]) -> Result<(), StorageError> {
        self.ensure_root().await?;

        let target = self.path_of(name);
        let tmp_path = self.tmp_path();
        let io_err = |source| StorageError::Io { op: "write", source };

        debug!(?tmp_path, "writing to temporary file");
        if let Err(e) = tokio::fs::write(&tmp_path, data).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_err(e));
        }

        debug!("renaming temporary file to target");
        if let Err(e) = tokio::fs::rename(&tmp_path, &target).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_err(e));
        }

        debug!("write complete");
        Ok(())
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn remove(&self, name: &FileName) -> Result<(), StorageError> {
        self.ensure_root().await?;
        self.entry_stat(name).await?;

        match tokio::fs::remove_file(self.path_of(name)).await {
            Ok(()) => {
                debug!("remove complete");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(source) => Err(StorageError::Io {
                op: "remove",
                source,
            }),
        }
    }
}
