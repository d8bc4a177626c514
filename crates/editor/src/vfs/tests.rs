use mdm_rpc::{PackageDescriptor, RenderOutput};
use mdm_worker::{EvalResult, Evaluator, FileSystem, MemoryFileSystem, spawn_evaluator};
use pretty_assertions::assert_eq;

use super::*;

/// Hosts a bare file tree; evaluation is never exercised here.
#[derive(Default)]
struct TreeHost {
	fs: MemoryFileSystem,
}

impl Evaluator for TreeHost {
	fn initialize(&mut self) -> EvalResult<()> {
		Ok(())
	}

	fn configure_from_source(&mut self, _source: &str) -> EvalResult<bool> {
		Ok(true)
	}

	fn syntax_tree(&mut self, _source: &str) -> EvalResult<Option<String>> {
		Ok(None)
	}

	fn debug_syntax_tree(&mut self, _source: &str) -> EvalResult<Option<String>> {
		Ok(None)
	}

	fn structured_output(&mut self, _source: &str) -> EvalResult<Option<String>> {
		Ok(None)
	}

	fn evaluate(&mut self, _source: &str, _format: &str) -> EvalResult<Option<RenderOutput>> {
		Ok(None)
	}

	fn evaluate_fragment(&mut self, _source: &str, _format: &str) -> EvalResult<Option<RenderOutput>> {
		Ok(None)
	}

	fn list_packages(&mut self) -> EvalResult<Option<Vec<PackageDescriptor>>> {
		Ok(Some(Vec::new()))
	}

	fn file_system(&mut self) -> &mut dyn FileSystem {
		&mut self.fs
	}
}

async fn proxy() -> FileSystemProxy {
	let channel = spawn_evaluator(TreeHost::default()).unwrap();
	channel.initialize().await.unwrap();
	FileSystemProxy::new(channel)
}

fn names(entries: &[DirEntry]) -> Vec<&str> {
	entries.iter().map(|entry| entry.name.as_str()).collect()
}

#[tokio::test]
async fn add_then_read_returns_the_same_bytes() {
	let fs = proxy().await;
	let bytes = vec![0, 159, 146, 150, b'\n'];
	fs.add_file("/blob.bin", bytes.clone()).await.unwrap();
	assert_eq!(fs.read("/blob.bin").await.unwrap(), Some(bytes));
	assert_eq!(fs.read("/absent").await.unwrap(), None);
}

#[tokio::test]
async fn rename_moves_between_parents() {
	let fs = proxy().await;
	fs.add_directory("/src").await.unwrap();
	fs.add_directory("/lib/").await.unwrap();
	fs.add_file("/src/a.mdm", b"A".to_vec()).await.unwrap();

	fs.rename("/src/a.mdm", "/lib/b.mdm").await.unwrap();

	assert!(fs.list("/src").await.unwrap().is_empty());
	assert_eq!(fs.list("/lib").await.unwrap(), vec![DirEntry::file("b.mdm")]);
	assert_eq!(fs.read("/lib/b.mdm").await.unwrap(), Some(b"A".to_vec()));
}

#[tokio::test]
async fn listing_is_one_level() {
	let fs = proxy().await;
	fs.add_directory("/docs").await.unwrap();
	fs.add_file("/docs/deep.mdm", vec![]).await.unwrap();
	fs.add_file("/main.mdm", vec![]).await.unwrap();

	assert_eq!(
		fs.list("/").await.unwrap(),
		vec![DirEntry::directory("docs"), DirEntry::file("main.mdm")]
	);
}

#[tokio::test]
async fn add_directory_twice_reports_already_exists() {
	let fs = proxy().await;
	fs.add_directory("/dup").await.unwrap();
	let err = fs.add_directory("/dup").await.unwrap_err();
	assert_eq!(err.kind(), Some(FsErrorKind::AlreadyExists));
	assert_eq!(err.to_string(), "already exists: /dup");
}

#[tokio::test]
async fn listing_a_missing_directory_is_an_error() {
	let fs = proxy().await;
	fs.add_file("/file.mdm", vec![]).await.unwrap();
	assert!(matches!(fs.list("/nowhere").await, Err(FileSystemError::MissingDirectory(p)) if p == "/nowhere"));
	assert!(matches!(fs.list("/file.mdm").await, Err(FileSystemError::MissingDirectory(_))));
}

#[tokio::test]
async fn calls_before_initialize_are_transport_errors() {
	let channel = spawn_evaluator(TreeHost::default()).unwrap();
	let fs = FileSystemProxy::new(channel);
	let err = fs.list("/").await.unwrap_err();
	assert!(matches!(err, FileSystemError::Transport(mdm_rpc::Error::NotInitialized)));
	assert_eq!(err.kind(), None);
}

#[test]
fn working_directory_navigation() {
	let mut cwd = WorkingDirectory::new();
	assert!(cwd.is_root());
	assert!(!cwd.up());

	cwd.enter("docs").unwrap();
	cwd.enter("drafts").unwrap();
	assert_eq!(cwd.path(), "/docs/drafts");
	assert_eq!(cwd.join("a.mdm").unwrap(), "/docs/drafts/a.mdm");

	assert!(cwd.up());
	assert_eq!(cwd.path(), "/docs");
	assert!(cwd.up());
	assert!(cwd.is_root());
	assert_eq!(cwd.join("a.mdm").unwrap(), "/a.mdm");
}

#[test]
fn working_directory_rejects_bad_names() {
	let mut cwd = WorkingDirectory::at("/docs/").unwrap();
	assert_eq!(cwd.path(), "/docs");
	for name in ["", ".", "..", "a/b"] {
		assert!(matches!(cwd.enter(name), Err(FileSystemError::InvalidName(_))), "{name:?}");
	}
	assert_eq!(cwd.path(), "/docs");
	assert!(matches!(WorkingDirectory::at("docs"), Err(FileSystemError::InvalidPath(_))));
}

#[tokio::test]
async fn browser_refreshes_after_each_mutation() {
	let fs = proxy().await;
	let mut browser = FileBrowser::new(fs.clone());
	assert!(browser.refresh().await.unwrap().is_empty());

	browser.create_directory("docs").await.unwrap();
	browser.create_file("main.mdm", b"# hi".to_vec()).await.unwrap();
	assert_eq!(names(browser.entries()), vec!["docs", "main.mdm"]);

	browser.rename("main.mdm", "index.mdm").await.unwrap();
	assert_eq!(names(browser.entries()), vec!["docs", "index.mdm"]);

	browser.move_to("index.mdm", "/docs").await.unwrap();
	assert_eq!(names(browser.entries()), vec!["docs"]);

	browser.enter("docs").await.unwrap();
	assert_eq!(browser.cwd().path(), "/docs");
	assert_eq!(names(browser.entries()), vec!["index.mdm"]);
	assert_eq!(browser.open("index.mdm").await.unwrap(), Some(b"# hi".to_vec()));

	assert!(browser.up().await.unwrap());
	browser.delete("docs").await.unwrap();
	assert!(browser.entries().is_empty());
	assert!(!browser.up().await.unwrap());
}

#[tokio::test]
async fn browser_refreshes_even_when_the_mutation_fails() {
	let fs = proxy().await;
	let mut browser = FileBrowser::new(fs.clone());
	browser.create_directory("docs").await.unwrap();

	// Changed behind the browser's back; only a refresh can reveal it.
	fs.add_file("/external.mdm", vec![]).await.unwrap();

	let err = browser.create_directory("docs").await.unwrap_err();
	assert_eq!(err.kind(), Some(FsErrorKind::AlreadyExists));
	assert_eq!(names(browser.entries()), vec!["docs", "external.mdm"]);
}

#[tokio::test]
async fn entering_a_file_keeps_the_working_directory() {
	let fs = proxy().await;
	let mut browser = FileBrowser::new(fs);
	browser.create_file("notes.mdm", vec![]).await.unwrap();

	let err = browser.enter("notes.mdm").await.unwrap_err();
	assert!(matches!(err, FileSystemError::MissingDirectory(_)));
	assert!(browser.cwd().is_root());
	assert_eq!(names(browser.entries()), vec!["notes.mdm"]);
}

#[tokio::test]
async fn deleting_uses_the_entry_kind() {
	let fs = proxy().await;
	let mut browser = FileBrowser::new(fs.clone());
	browser.create_directory("dir").await.unwrap();
	browser.create_file("dir-file", vec![]).await.unwrap();
	fs.add_file("/dir/inner.mdm", vec![]).await.unwrap();

	browser.delete("dir").await.unwrap();
	browser.delete("dir-file").await.unwrap();
	assert!(browser.entries().is_empty());

	let err = browser.delete("ghost").await.unwrap_err();
	assert_eq!(err.kind(), Some(FsErrorKind::NotFound));
}
