//! Local persistence of the last edited document.
//!
//! A single fixed key, no versioning, last write wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, trace};

/// Key the document text is stored under.
pub const LAST_DOCUMENT_KEY: &str = "last-document";

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("I/O error on {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },
	#[error("stored document at {path} is not valid UTF-8")]
	Encoding { path: PathBuf },
	#[error("no storage directory could be determined")]
	NoDirectory,
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

/// Key-value store holding the last edited document.
pub trait DocumentStore: Send + Sync + 'static {
	fn load(&self) -> Result<Option<String>>;
	fn save(&self, text: &str) -> Result<()>;
}

/// Stores the document as a file named [`LAST_DOCUMENT_KEY`] in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
	dir: PathBuf,
}

impl FileStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Store under the configured or platform data directory.
	pub fn from_config(config: &crate::config::StorageConfig) -> Result<Self> {
		config.resolve_dir().map(Self::new).ok_or(StorageError::NoDirectory)
	}

	pub fn path(&self) -> PathBuf {
		self.dir.join(LAST_DOCUMENT_KEY)
	}
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
	move |error| StorageError::Io {
		path: path.to_path_buf(),
		error,
	}
}

impl DocumentStore for FileStore {
	fn load(&self) -> Result<Option<String>> {
		let path = self.path();
		let bytes = match std::fs::read(&path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(io_error(&path)(e)),
		};
		let text = String::from_utf8(bytes).map_err(|_| StorageError::Encoding { path: path.clone() })?;
		trace!(path = %path.display(), bytes = text.len(), "storage.load");
		Ok(Some(text))
	}

	fn save(&self, text: &str) -> Result<()> {
		std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
		let path = self.path();
		let tmp = self.dir.join(format!("{LAST_DOCUMENT_KEY}.tmp"));
		std::fs::write(&tmp, text).map_err(io_error(&tmp))?;
		std::fs::rename(&tmp, &path).map_err(io_error(&path))?;
		debug!(path = %path.display(), bytes = text.len(), "storage.save");
		Ok(())
	}
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	text: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_text(text: impl Into<String>) -> Self {
		Self {
			text: Arc::new(Mutex::new(Some(text.into()))),
		}
	}

	/// Current stored text.
	pub fn get(&self) -> Option<String> {
		self.text.lock().clone()
	}
}

impl DocumentStore for MemoryStore {
	fn load(&self) -> Result<Option<String>> {
		Ok(self.get())
	}

	fn save(&self, text: &str) -> Result<()> {
		*self.text.lock() = Some(text.to_string());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn missing_file_loads_as_none() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path());
		assert_eq!(store.load().unwrap(), None);
	}

	#[test]
	fn save_then_load_returns_last_write() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().join("nested"));

		store.save("first").unwrap();
		store.save("# second\n").unwrap();

		assert_eq!(store.load().unwrap().as_deref(), Some("# second\n"));
		assert!(!dir.path().join("nested").join("last-document.tmp").exists());
	}

	#[test]
	fn invalid_utf8_is_an_encoding_error() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join(LAST_DOCUMENT_KEY), [0xff, 0xfe]).unwrap();

		let err = FileStore::new(dir.path()).load().unwrap_err();
		assert!(matches!(err, StorageError::Encoding { .. }));
	}

	#[test]
	fn configured_dir_is_used() {
		let config = crate::config::StorageConfig {
			dir: Some(PathBuf::from("/var/lib/mdm")),
		};
		let store = FileStore::from_config(&config).unwrap();
		assert_eq!(store.path(), PathBuf::from("/var/lib/mdm/last-document"));
	}

	#[test]
	fn memory_store_round_trip() {
		let store = MemoryStore::new();
		assert_eq!(store.load().unwrap(), None);
		store.save("text").unwrap();
		assert_eq!(store.get().as_deref(), Some("text"));
	}
}
