//! Client access to the evaluator's virtual file tree.
//!
//! [`FileSystemProxy`] is a pass-through: every operation is one round trip
//! over the evaluator channel, nothing is cached, and the remote tree is the
//! only source of truth. [`FileBrowser`] layers a working directory and the
//! listing of the open directory on top.

mod browser;

use mdm_rpc::{DirEntry, EvaluatorChannel, FsErrorKind, RemoteError, path};
use thiserror::Error;
use tracing::trace;

pub use self::browser::FileBrowser;

/// A file-tree call failed.
#[derive(Debug, Clone, Error)]
pub enum FileSystemError {
	/// The evaluator rejected the operation. The effect on the tree is unknown;
	/// callers should list again.
	#[error("{kind}: {path}")]
	Remote { kind: FsErrorKind, path: String },
	/// The call did not complete.
	#[error("file system call failed: {0}")]
	Transport(mdm_rpc::Error),
	/// A listing was requested for something that is not a directory.
	#[error("no such directory: {0}")]
	MissingDirectory(String),
	/// A leaf name was empty, `.`, `..` or contained a separator.
	#[error("invalid entry name: {0:?}")]
	InvalidName(String),
	/// A path was not absolute or contained `.`/`..` segments.
	#[error("invalid path: {0:?}")]
	InvalidPath(String),
}

impl From<mdm_rpc::Error> for FileSystemError {
	fn from(error: mdm_rpc::Error) -> Self {
		match error {
			mdm_rpc::Error::Remote(RemoteError::FileSystem { kind, path }) => Self::Remote { kind, path },
			other => Self::Transport(other),
		}
	}
}

impl FileSystemError {
	/// Failure kind reported by the evaluator, if it reported one.
	pub fn kind(&self) -> Option<FsErrorKind> {
		match self {
			Self::Remote { kind, .. } => Some(*kind),
			_ => None,
		}
	}
}

pub type Result<T, E = FileSystemError> = std::result::Result<T, E>;

/// Path-addressed operations against the remote tree.
#[derive(Debug, Clone)]
pub struct FileSystemProxy {
	channel: EvaluatorChannel,
}

impl FileSystemProxy {
	pub fn new(channel: EvaluatorChannel) -> Self {
		Self { channel }
	}

	/// One directory level, in the evaluator's order.
	pub async fn list(&self, dir: &str) -> Result<Vec<DirEntry>> {
		trace!(path = dir, "vfs.list");
		self.channel
			.list_directory(dir)
			.await?
			.ok_or_else(|| FileSystemError::MissingDirectory(dir.to_string()))
	}

	pub async fn add_file(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
		trace!(path, bytes = bytes.len(), "vfs.add_file");
		Ok(self.channel.add_file(path, bytes).await?)
	}

	pub async fn add_directory(&self, path: &str) -> Result<()> {
		trace!(path, "vfs.add_directory");
		Ok(self.channel.add_directory(path).await?)
	}

	/// Renames or moves an entry; both arguments are full paths.
	pub async fn rename(&self, path: &str, new_path: &str) -> Result<()> {
		trace!(path, new_path, "vfs.rename");
		Ok(self.channel.rename_entry(path, new_path).await?)
	}

	pub async fn remove_file(&self, path: &str) -> Result<()> {
		trace!(path, "vfs.remove_file");
		Ok(self.channel.remove_file(path).await?)
	}

	pub async fn remove_directory(&self, path: &str) -> Result<()> {
		trace!(path, "vfs.remove_directory");
		Ok(self.channel.remove_directory(path).await?)
	}

	/// File contents; `None` when nothing exists at `path`.
	pub async fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
		trace!(path, "vfs.read");
		Ok(self.channel.read_file(path).await?)
	}
}

/// The directory the file browser has open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
	path: String,
}

impl Default for WorkingDirectory {
	fn default() -> Self {
		Self {
			path: path::ROOT.to_string(),
		}
	}
}

impl WorkingDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts at `dir`, normalized.
	pub fn at(dir: &str) -> Result<Self> {
		let path = path::normalize(dir).ok_or_else(|| FileSystemError::InvalidPath(dir.to_string()))?;
		Ok(Self { path })
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn is_root(&self) -> bool {
		self.path == path::ROOT
	}

	/// Full path of `name` inside this directory.
	pub fn join(&self, name: &str) -> Result<String> {
		if !path::is_valid_name(name) {
			return Err(FileSystemError::InvalidName(name.to_string()));
		}
		Ok(path::join(&self.path, name))
	}

	/// Descends into child directory `name`.
	pub fn enter(&mut self, name: &str) -> Result<()> {
		self.path = self.join(name)?;
		Ok(())
	}

	/// Moves to the parent directory; returns `false` at the root.
	pub fn up(&mut self) -> bool {
		match path::parent(&self.path) {
			Some(parent) => {
				self.path = parent;
				true
			}
			None => false,
		}
	}
}

#[cfg(test)]
mod tests;
