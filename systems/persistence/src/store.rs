use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

const APP_DIRECTORY: &str = "geomerge";
const SESSION_FILE: &str = "session.txt";

/// Errors reported by snapshot stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The platform did not report a data directory for the current user.
    #[error("no data directory is available on this platform")]
    NoDataDirectory,
    /// Reading or writing the backing file failed.
    #[error("could not access {path}: {source}")]
    Io {
        /// File the store attempted to access.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Key-value collaborator holding at most one encoded session.
pub trait SnapshotStore {
    /// Returns the stored payload, or `None` when nothing was saved.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replaces the stored payload.
    fn save(&mut self, payload: &str) -> Result<(), StoreError>;

    /// Removes the stored payload. Erasing an empty store succeeds.
    fn erase(&mut self) -> Result<(), StoreError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn load(&self) -> Result<Option<String>, StoreError> {
        (**self).load()
    }

    fn save(&mut self, payload: &str) -> Result<(), StoreError> {
        (**self).save(payload)
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        (**self).erase()
    }
}

/// Stores the encoded session in a single file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store backed by the provided file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store inside the platform data directory.
    pub fn in_data_dir() -> Result<Self, StoreError> {
        let base = dirs::data_dir().ok_or(StoreError::NoDataDirectory)?;
        Ok(Self::new(base.join(APP_DIRECTORY).join(SESSION_FILE)))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(self.io_error(error)),
        }
    }

    fn save(&mut self, payload: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| self.io_error(error))?;
        }
        fs::write(&self.path, payload).map_err(|error| self.io_error(error))
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.io_error(error)),
        }
    }
}

/// In-memory store used by tests and sessions that opt out of saving.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    payload: Option<String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds the provided payload.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }

    /// Currently stored payload.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.payload.clone())
    }

    fn save(&mut self, payload: &str) -> Result<(), StoreError> {
        self.payload = Some(payload.to_owned());
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.payload = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("geomerge-store-{name}-{}-{nanos}", std::process::id()))
            .join(SESSION_FILE)
    }

    #[test]
    fn memory_store_replaces_and_erases() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load().expect("load"), None);

        store.save("first").expect("save");
        store.save("second").expect("save");
        assert_eq!(store.payload(), Some("second"));

        store.erase().expect("erase");
        store.erase().expect("erase twice");
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn file_store_creates_parent_directories() {
        let path = scratch_path("parents");
        let mut store = FileStore::new(&path);
        assert_eq!(store.load().expect("missing file loads as none"), None);

        store.save("geomerge:v1:payload").expect("save");
        assert_eq!(
            store.load().expect("load").as_deref(),
            Some("geomerge:v1:payload")
        );

        store.erase().expect("erase");
        store.erase().expect("erasing a missing file succeeds");
        assert_eq!(store.load().expect("load"), None);

        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn file_store_reports_unwritable_paths() {
        let blocker = scratch_path("blocker");
        let parent = blocker.parent().expect("scratch path has parent").to_path_buf();
        fs::create_dir_all(&parent).expect("create scratch dir");
        fs::write(&blocker, "not a directory").expect("write blocker");

        let mut store = FileStore::new(blocker.join("nested.txt"));
        let error = store.save("payload").expect_err("parent is a file");
        assert!(matches!(error, StoreError::Io { .. }));

        let _ = fs::remove_dir_all(parent);
    }
}
