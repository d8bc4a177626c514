//! File tree owned by the evaluator.

use std::collections::BTreeMap;

use mdm_rpc::{DirEntry, FsErrorKind, RemoteError, path};

use crate::evaluator::EvalResult;

/// Path-addressed file tree operations served by the worker.
pub trait FileSystem: Send {
	/// One directory level, or `None` if `path` is not a directory.
	fn list_directory(&self, path: &str) -> EvalResult<Option<Vec<DirEntry>>>;

	fn add_file(&mut self, path: &str, bytes: Vec<u8>) -> EvalResult<()>;

	fn add_directory(&mut self, path: &str) -> EvalResult<()>;

	/// Moves an entry; `new_path` may name a different parent.
	fn rename_entry(&mut self, path: &str, new_path: &str) -> EvalResult<()>;

	fn remove_file(&mut self, path: &str) -> EvalResult<()>;

	/// Removes a directory together with its contents.
	fn remove_directory(&mut self, path: &str) -> EvalResult<()>;

	/// File contents, or `None` if nothing exists at `path`.
	fn read_file(&self, path: &str) -> EvalResult<Option<Vec<u8>>>;
}

#[derive(Debug, Clone)]
enum Node {
	File(Vec<u8>),
	Dir(BTreeMap<String, Node>),
}

type Children = BTreeMap<String, Node>;

/// In-memory [`FileSystem`] rooted at `/`.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
	root: Children,
}

impl MemoryFileSystem {
	pub fn new() -> Self {
		Self::default()
	}
}

fn parse(path: &str) -> EvalResult<Vec<&str>> {
	path::segments(path).ok_or_else(|| RemoteError::fs(FsErrorKind::InvalidPath, path))
}

fn dir<'a>(root: &'a Children, segments: &[&str], path: &str) -> EvalResult<&'a Children> {
	let mut current = root;
	for segment in segments {
		match current.get(*segment) {
			Some(Node::Dir(children)) => current = children,
			Some(Node::File(_)) => return Err(RemoteError::fs(FsErrorKind::NotADirectory, path)),
			None => return Err(RemoteError::fs(FsErrorKind::NotFound, path)),
		}
	}
	Ok(current)
}

fn dir_mut<'a>(root: &'a mut Children, segments: &[&str], path: &str) -> EvalResult<&'a mut Children> {
	let mut current = root;
	for segment in segments {
		match current.get_mut(*segment) {
			Some(Node::Dir(children)) => current = children,
			Some(Node::File(_)) => return Err(RemoteError::fs(FsErrorKind::NotADirectory, path)),
			None => return Err(RemoteError::fs(FsErrorKind::NotFound, path)),
		}
	}
	Ok(current)
}

/// Splits into `(parent segments, leaf)`; the root has no leaf.
fn split_leaf<'p>(segments: &[&'p str], path: &str, root_kind: FsErrorKind) -> EvalResult<(Vec<&'p str>, &'p str)> {
	match segments.split_last() {
		Some((leaf, parent)) => Ok((parent.to_vec(), *leaf)),
		None => Err(RemoteError::fs(root_kind, path)),
	}
}

impl FileSystem for MemoryFileSystem {
	fn list_directory(&self, path: &str) -> EvalResult<Option<Vec<DirEntry>>> {
		let segments = parse(path)?;
		let Ok(children) = dir(&self.root, &segments, path) else {
			return Ok(None);
		};
		let entries = children
			.iter()
			.map(|(name, node)| DirEntry {
				name: name.clone(),
				is_directory: matches!(node, Node::Dir(_)),
			})
			.collect();
		Ok(Some(entries))
	}

	fn add_file(&mut self, path: &str, bytes: Vec<u8>) -> EvalResult<()> {
		let segments = parse(path)?;
		let (parent, leaf) = split_leaf(&segments, path, FsErrorKind::IsADirectory)?;
		let children = dir_mut(&mut self.root, &parent, path)?;
		if let Some(Node::Dir(_)) = children.get(leaf) {
			return Err(RemoteError::fs(FsErrorKind::IsADirectory, path));
		}
		children.insert(leaf.to_string(), Node::File(bytes));
		Ok(())
	}

	fn add_directory(&mut self, path: &str) -> EvalResult<()> {
		let segments = parse(path)?;
		let (parent, leaf) = split_leaf(&segments, path, FsErrorKind::AlreadyExists)?;
		let children = dir_mut(&mut self.root, &parent, path)?;
		if children.contains_key(leaf) {
			return Err(RemoteError::fs(FsErrorKind::AlreadyExists, path));
		}
		children.insert(leaf.to_string(), Node::Dir(Children::new()));
		Ok(())
	}

	fn rename_entry(&mut self, path: &str, new_path: &str) -> EvalResult<()> {
		let from = parse(path)?;
		let to = parse(new_path)?;
		let (from_parent, from_leaf) = split_leaf(&from, path, FsErrorKind::InvalidPath)?;
		let (to_parent, to_leaf) = split_leaf(&to, new_path, FsErrorKind::InvalidPath)?;

		let source_is_dir = match dir(&self.root, &from_parent, path)?.get(from_leaf) {
			Some(node) => matches!(node, Node::Dir(_)),
			None => return Err(RemoteError::fs(FsErrorKind::NotFound, path)),
		};
		if from == to {
			return Ok(());
		}
		if source_is_dir && path::is_within(new_path, path) {
			return Err(RemoteError::fs(FsErrorKind::InvalidPath, new_path));
		}
		if dir(&self.root, &to_parent, new_path)?.contains_key(to_leaf) {
			return Err(RemoteError::fs(FsErrorKind::AlreadyExists, new_path));
		}

		let node = dir_mut(&mut self.root, &from_parent, path)?
			.remove(from_leaf)
			.ok_or_else(|| RemoteError::fs(FsErrorKind::NotFound, path))?;
		dir_mut(&mut self.root, &to_parent, new_path)?.insert(to_leaf.to_string(), node);
		Ok(())
	}

	fn remove_file(&mut self, path: &str) -> EvalResult<()> {
		let segments = parse(path)?;
		let (parent, leaf) = split_leaf(&segments, path, FsErrorKind::IsADirectory)?;
		let children = dir_mut(&mut self.root, &parent, path)?;
		match children.get(leaf) {
			Some(Node::File(_)) => {
				children.remove(leaf);
				Ok(())
			}
			Some(Node::Dir(_)) => Err(RemoteError::fs(FsErrorKind::IsADirectory, path)),
			None => Err(RemoteError::fs(FsErrorKind::NotFound, path)),
		}
	}

	fn remove_directory(&mut self, path: &str) -> EvalResult<()> {
		let segments = parse(path)?;
		let (parent, leaf) = split_leaf(&segments, path, FsErrorKind::InvalidPath)?;
		let children = dir_mut(&mut self.root, &parent, path)?;
		match children.get(leaf) {
			Some(Node::Dir(_)) => {
				children.remove(leaf);
				Ok(())
			}
			Some(Node::File(_)) => Err(RemoteError::fs(FsErrorKind::NotADirectory, path)),
			None => Err(RemoteError::fs(FsErrorKind::NotFound, path)),
		}
	}

	fn read_file(&self, path: &str) -> EvalResult<Option<Vec<u8>>> {
		let segments = parse(path)?;
		let (parent, leaf) = split_leaf(&segments, path, FsErrorKind::IsADirectory)?;
		let Ok(children) = dir(&self.root, &parent, path) else {
			return Ok(None);
		};
		match children.get(leaf) {
			Some(Node::File(bytes)) => Ok(Some(bytes.clone())),
			Some(Node::Dir(_)) => Err(RemoteError::fs(FsErrorKind::IsADirectory, path)),
			None => Ok(None),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn kind(err: RemoteError) -> FsErrorKind {
		match err {
			RemoteError::FileSystem { kind, .. } => kind,
			other => panic!("expected file-system error, got {other:?}"),
		}
	}

	fn names(fs: &MemoryFileSystem, path: &str) -> Vec<String> {
		fs.list_directory(path).unwrap().unwrap().into_iter().map(|e| e.name).collect()
	}

	#[test]
	fn add_then_read_returns_same_bytes() {
		let mut fs = MemoryFileSystem::new();
		fs.add_file("/a.mdm", b"hello".to_vec()).unwrap();
		assert_eq!(fs.read_file("/a.mdm").unwrap(), Some(b"hello".to_vec()));
		assert_eq!(fs.read_file("/missing").unwrap(), None);
	}

	#[test]
	fn listing_is_one_level_and_name_ordered() {
		let mut fs = MemoryFileSystem::new();
		fs.add_directory("/docs/").unwrap();
		fs.add_file("/docs/inner.mdm", vec![]).unwrap();
		fs.add_file("/b.mdm", vec![]).unwrap();
		fs.add_file("/a.mdm", vec![]).unwrap();

		assert_eq!(
			fs.list_directory("/").unwrap().unwrap(),
			vec![DirEntry::file("a.mdm"), DirEntry::file("b.mdm"), DirEntry::directory("docs")]
		);
		assert_eq!(names(&fs, "/docs"), vec!["inner.mdm"]);
		assert_eq!(fs.list_directory("/nope").unwrap(), None);
		assert_eq!(fs.list_directory("/a.mdm").unwrap(), None);
	}

	#[test]
	fn add_directory_twice_is_rejected() {
		let mut fs = MemoryFileSystem::new();
		fs.add_directory("/docs").unwrap();
		assert_eq!(kind(fs.add_directory("/docs/").unwrap_err()), FsErrorKind::AlreadyExists);
	}

	#[test]
	fn add_file_needs_existing_parent() {
		let mut fs = MemoryFileSystem::new();
		assert_eq!(kind(fs.add_file("/no/such.mdm", vec![]).unwrap_err()), FsErrorKind::NotFound);
		fs.add_directory("/dir").unwrap();
		assert_eq!(kind(fs.add_file("/dir", vec![]).unwrap_err()), FsErrorKind::IsADirectory);
	}

	#[test]
	fn rename_moves_across_parents() {
		let mut fs = MemoryFileSystem::new();
		fs.add_directory("/src").unwrap();
		fs.add_directory("/dst").unwrap();
		fs.add_file("/src/a.mdm", b"A".to_vec()).unwrap();

		fs.rename_entry("/src/a.mdm", "/dst/b.mdm").unwrap();

		assert!(names(&fs, "/src").is_empty());
		assert_eq!(names(&fs, "/dst"), vec!["b.mdm"]);
		assert_eq!(fs.read_file("/dst/b.mdm").unwrap(), Some(b"A".to_vec()));
	}

	#[test]
	fn rename_guards() {
		let mut fs = MemoryFileSystem::new();
		fs.add_directory("/dir").unwrap();
		fs.add_directory("/dir/sub").unwrap();
		fs.add_file("/x", vec![]).unwrap();

		assert_eq!(kind(fs.rename_entry("/dir", "/dir/sub/dir").unwrap_err()), FsErrorKind::InvalidPath);
		assert_eq!(kind(fs.rename_entry("/x", "/dir/sub").unwrap_err()), FsErrorKind::AlreadyExists);
		assert_eq!(kind(fs.rename_entry("/missing", "/y").unwrap_err()), FsErrorKind::NotFound);
		assert_eq!(kind(fs.rename_entry("/x", "/nowhere/y").unwrap_err()), FsErrorKind::NotFound);
		fs.rename_entry("/x", "/x").unwrap();
		assert_eq!(names(&fs, "/"), vec!["dir", "x"]);
		assert_eq!(names(&fs, "/dir"), vec!["sub"]);
	}

	#[test]
	fn removal_checks_entry_kind() {
		let mut fs = MemoryFileSystem::new();
		fs.add_directory("/dir").unwrap();
		fs.add_file("/dir/a", vec![1]).unwrap();
		fs.add_file("/f", vec![2]).unwrap();

		assert_eq!(kind(fs.remove_file("/dir").unwrap_err()), FsErrorKind::IsADirectory);
		assert_eq!(kind(fs.remove_directory("/f").unwrap_err()), FsErrorKind::NotADirectory);
		assert_eq!(kind(fs.remove_directory("/").unwrap_err()), FsErrorKind::InvalidPath);

		fs.remove_directory("/dir").unwrap();
		fs.remove_file("/f").unwrap();
		assert!(names(&fs, "/").is_empty());
	}

	#[test]
	fn relative_paths_are_invalid() {
		let mut fs = MemoryFileSystem::new();
		assert_eq!(kind(fs.add_file("a.mdm", vec![]).unwrap_err()), FsErrorKind::InvalidPath);
		assert_eq!(kind(fs.read_file("../a").unwrap_err()), FsErrorKind::InvalidPath);
	}
}
