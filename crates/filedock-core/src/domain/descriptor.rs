//! Client-facing file metadata
//!
//! [`FileDescriptor`] is what clients see for each stored file. It is derived
//! from an [`EntryStat`] snapshot at request time and never cached.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file_name::FileName;

/// Snapshot of a directory entry's metadata as reported by the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    /// Whether this is a regular file (false for directories, sockets, ...)
    pub is_file: bool,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, if the platform reports one
    pub modified: Option<SystemTime>,
}

impl From<&std::fs::Metadata> for EntryStat {
    fn from(metadata: &std::fs::Metadata) -> Self {
        Self {
            is_file: metadata.is_file(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }
}

/// Metadata of a stored file as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Unique name within the storage root
    pub name: FileName,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
}

impl FileDescriptor {
    /// Projects a raw stat onto the client-facing descriptor.
    ///
    /// A missing modification time is reported as the Unix epoch.
    #[must_use]
    pub fn project(name: FileName, stat: &EntryStat) -> Self {
        let modified = stat
            .modified
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            name,
            size: stat.size,
            modified,
        }
    }

    /// Descriptor for a file this process has just written `size` bytes to,
    /// stamped with the current time.
    #[must_use]
    pub fn just_written(name: FileName, size: u64) -> Self {
        let stat = EntryStat {
            is_file: true,
            size,
            modified: Some(SystemTime::now()),
        };
        Self::project(name, &stat)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn test_project_copies_size_and_time() {
        let name = FileName::sanitize("a.txt").unwrap();
        let stat = EntryStat {
            is_file: true,
            size: 42,
            modified: Some(UNIX_EPOCH + Duration::from_millis(1_700_000_000_123)),
        };

        let descriptor = FileDescriptor::project(name.clone(), &stat);
        assert_eq!(descriptor.name, name);
        assert_eq!(descriptor.size, 42);
        assert_eq!(descriptor.modified.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_project_without_mtime_uses_epoch() {
        let stat = EntryStat {
            is_file: true,
            size: 0,
            modified: None,
        };
        let descriptor = FileDescriptor::project(FileName::sanitize("x").unwrap(), &stat);
        assert_eq!(descriptor.modified, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_entry_stat_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let file = EntryStat::from(&std::fs::metadata(&path).unwrap());
        assert!(file.is_file);
        assert_eq!(file.size, 5);
        assert!(file.modified.is_some());

        let directory = EntryStat::from(&std::fs::metadata(dir.path()).unwrap());
        assert!(!directory.is_file);
    }

    #[test]
    fn test_just_written_uses_current_time() {
        let before = Utc::now();
        let descriptor = FileDescriptor::just_written(FileName::sanitize("b.bin").unwrap(), 9);
        assert_eq!(descriptor.size, 9);
        assert!(descriptor.modified >= before - chrono::Duration::seconds(1));
        assert!(descriptor.modified <= Utc::now());
    }

    #[test]
    fn test_serialized_shape() {
        let descriptor = FileDescriptor {
            name: FileName::sanitize("a.txt").unwrap(),
            size: 3,
            modified: DateTime::<Utc>::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["name"], "a.txt");
        assert_eq!(json["size"], 3);
        assert_eq!(json["modified"], "1970-01-01T00:00:00Z");
    }
}
