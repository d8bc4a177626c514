use mdm_rpc::DirEntry;
use tracing::{debug, warn};

use super::{FileSystemProxy, Result, WorkingDirectory};

/// File-tree view state: the open directory and its last listing.
///
/// Every mutation lists the open directory again afterwards, also when the
/// mutation failed, since a failed call may still have changed the tree.
#[derive(Debug)]
pub struct FileBrowser {
	proxy: FileSystemProxy,
	cwd: WorkingDirectory,
	entries: Vec<DirEntry>,
}

impl FileBrowser {
	pub fn new(proxy: FileSystemProxy) -> Self {
		Self {
			proxy,
			cwd: WorkingDirectory::new(),
			entries: Vec::new(),
		}
	}

	pub fn cwd(&self) -> &WorkingDirectory {
		&self.cwd
	}

	/// Listing of the open directory as of the last refresh.
	pub fn entries(&self) -> &[DirEntry] {
		&self.entries
	}

	pub fn entry(&self, name: &str) -> Option<&DirEntry> {
		self.entries.iter().find(|entry| entry.name == name)
	}

	/// Lists the open directory. On failure the listing is cleared.
	pub async fn refresh(&mut self) -> Result<&[DirEntry]> {
		match self.proxy.list(self.cwd.path()).await {
			Ok(entries) => {
				debug!(path = self.cwd.path(), entries = entries.len(), "vfs.browser.refresh");
				self.entries = entries;
				Ok(&self.entries)
			}
			Err(error) => {
				self.entries.clear();
				Err(error)
			}
		}
	}

	/// Opens child directory `name`. The working directory is unchanged if it cannot be listed.
	pub async fn enter(&mut self, name: &str) -> Result<()> {
		let previous = self.cwd.clone();
		self.cwd.enter(name)?;
		if let Err(error) = self.refresh().await {
			self.cwd = previous;
			return self.settle(Err(error)).await;
		}
		Ok(())
	}

	/// Opens the parent directory; returns `false` at the root.
	pub async fn up(&mut self) -> Result<bool> {
		if !self.cwd.up() {
			return Ok(false);
		}
		self.refresh().await?;
		Ok(true)
	}

	pub async fn create_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
		let path = self.cwd.join(name)?;
		let result = self.proxy.add_file(&path, bytes).await;
		self.settle(result).await
	}

	pub async fn create_directory(&mut self, name: &str) -> Result<()> {
		let path = self.cwd.join(name)?;
		let result = self.proxy.add_directory(&path).await;
		self.settle(result).await
	}

	/// Changes the leaf name of `name`, keeping it in the open directory.
	pub async fn rename(&mut self, name: &str, new_name: &str) -> Result<()> {
		let from = self.cwd.join(name)?;
		let to = self.cwd.join(new_name)?;
		let result = self.proxy.rename(&from, &to).await;
		self.settle(result).await
	}

	/// Moves `name` into the directory at absolute path `dir`.
	pub async fn move_to(&mut self, name: &str, dir: &str) -> Result<()> {
		let from = self.cwd.join(name)?;
		let to = WorkingDirectory::at(dir)?.join(name)?;
		let result = self.proxy.rename(&from, &to).await;
		self.settle(result).await
	}

	/// Deletes `name`, as a directory if the listing says it is one.
	pub async fn delete(&mut self, name: &str) -> Result<()> {
		let path = self.cwd.join(name)?;
		let result = match self.entry(name) {
			Some(entry) if entry.is_directory => self.proxy.remove_directory(&path).await,
			_ => self.proxy.remove_file(&path).await,
		};
		self.settle(result).await
	}

	/// Reads file `name` from the open directory.
	pub async fn open(&self, name: &str) -> Result<Option<Vec<u8>>> {
		let path = self.cwd.join(name)?;
		self.proxy.read(&path).await
	}

	async fn settle(&mut self, result: Result<()>) -> Result<()> {
		if let Err(error) = &result {
			debug!(%error, path = self.cwd.path(), "vfs.browser.mutation_failed");
		}
		if let Err(error) = self.refresh().await {
			warn!(%error, path = self.cwd.path(), "vfs.browser.refresh_failed");
		}
		result
	}
}
