use std::sync::{Arc, Mutex};

use mdm_rpc::{Error, FsErrorKind, PackageDescriptor, RenderOutput};
use pretty_assertions::assert_eq;

use super::*;
use crate::fs::{FileSystem, MemoryFileSystem};

#[derive(Default)]
struct RecordingEvaluator {
	fs: MemoryFileSystem,
	seen: Arc<Mutex<Vec<String>>>,
}

impl Evaluator for RecordingEvaluator {
	fn initialize(&mut self) -> EvalResult<()> {
		Ok(())
	}

	fn configure_from_source(&mut self, _source: &str) -> EvalResult<bool> {
		Ok(true)
	}

	fn syntax_tree(&mut self, source: &str) -> EvalResult<Option<String>> {
		Ok(Some(format!("(doc {source:?})")))
	}

	fn debug_syntax_tree(&mut self, _source: &str) -> EvalResult<Option<String>> {
		Ok(None)
	}

	fn structured_output(&mut self, _source: &str) -> EvalResult<Option<String>> {
		panic!("structured output exploded");
	}

	fn evaluate(&mut self, source: &str, format: &str) -> EvalResult<Option<RenderOutput>> {
		self.seen.lock().unwrap().push(source.to_string());
		Ok(Some(RenderOutput::text(format!("<{format}>{source}</{format}>"))))
	}

	fn evaluate_fragment(&mut self, source: &str, _format: &str) -> EvalResult<Option<RenderOutput>> {
		Ok(Some(RenderOutput::text(source)))
	}

	fn list_packages(&mut self) -> EvalResult<Option<Vec<PackageDescriptor>>> {
		Ok(Some(vec![PackageDescriptor {
			name: "core".into(),
			version: "1.0.0".into(),
			..PackageDescriptor::default()
		}]))
	}

	fn file_system(&mut self) -> &mut dyn FileSystem {
		&mut self.fs
	}
}

async fn ready_channel(evaluator: RecordingEvaluator) -> EvaluatorChannel {
	let channel = spawn_evaluator(evaluator).unwrap();
	channel.initialize().await.unwrap();
	channel
}

#[tokio::test]
async fn serves_evaluation_calls() {
	let channel = ready_channel(RecordingEvaluator::default()).await;

	let output = channel.evaluate("hi", "html").await.unwrap();
	assert_eq!(output, Some(RenderOutput::text("<html>hi</html>")));
	assert_eq!(channel.abstract_syntax_tree("x").await.unwrap().as_deref(), Some("(doc \"x\")"));
	assert_eq!(channel.debug_abstract_syntax_tree("x").await.unwrap(), None);
	assert!(channel.configure_from_source("x").await.unwrap());
	assert_eq!(channel.list_packages().await.unwrap().unwrap()[0].name, "core");
}

#[tokio::test]
async fn calls_before_initialize_never_reach_the_host() {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let channel = spawn_evaluator(RecordingEvaluator {
		seen: Arc::clone(&seen),
		..RecordingEvaluator::default()
	})
	.unwrap();

	assert!(matches!(channel.evaluate("early", "html").await, Err(Error::NotInitialized)));
	channel.initialize().await.unwrap();
	channel.evaluate("late", "html").await.unwrap();
	assert_eq!(*seen.lock().unwrap(), vec!["late".to_string()]);
}

#[tokio::test]
async fn file_round_trip_through_the_host() {
	let channel = ready_channel(RecordingEvaluator::default()).await;

	channel.add_directory("/docs/").await.unwrap();
	channel.add_file("/docs/a.mdm", b"alpha".to_vec()).await.unwrap();
	assert_eq!(channel.read_file("/docs/a.mdm").await.unwrap(), Some(b"alpha".to_vec()));

	channel.rename_entry("/docs/a.mdm", "/b.mdm").await.unwrap();
	let docs = channel.list_directory("/docs").await.unwrap().unwrap();
	assert!(docs.is_empty());
	let root = channel.list_directory("/").await.unwrap().unwrap();
	assert!(root.iter().any(|e| e.name == "b.mdm" && !e.is_directory));

	let err = channel.add_directory("/docs").await.unwrap_err();
	assert!(matches!(
		err,
		Error::Remote(RemoteError::FileSystem {
			kind: FsErrorKind::AlreadyExists,
			..
		})
	));
}

#[tokio::test]
async fn panics_become_internal_errors() {
	let channel = ready_channel(RecordingEvaluator::default()).await;

	let err = channel.structured_output("x").await.unwrap_err();
	match err {
		Error::Remote(RemoteError::Internal(message)) => assert!(message.contains("structured output exploded")),
		other => panic!("expected internal error, got {other:?}"),
	}

	// The host survives and keeps serving.
	assert!(channel.evaluate("after", "html").await.unwrap().is_some());
}

#[tokio::test]
async fn concurrent_calls_are_all_served() {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let channel = ready_channel(RecordingEvaluator {
		seen: Arc::clone(&seen),
		..RecordingEvaluator::default()
	})
	.await;

	let calls: Vec<_> = (0..5)
		.map(|i| {
			let channel = channel.clone();
			tokio::spawn(async move { channel.evaluate(i.to_string(), "html").await })
		})
		.collect();
	for call in calls {
		call.await.unwrap().unwrap();
	}

	let mut seen = seen.lock().unwrap().clone();
	seen.sort();
	assert_eq!(seen, vec!["0", "1", "2", "3", "4"]);
}

#[test]
fn extracts_static_str_payload() {
	let payload = panic::catch_unwind(|| panic!("boom-str")).unwrap_err();
	assert_eq!(panic_message(payload.as_ref()), "boom-str");
}

#[test]
fn extracts_string_payload() {
	let payload = panic::catch_unwind(|| panic!("{}", String::from("boom-string"))).unwrap_err();
	assert_eq!(panic_message(payload.as_ref()), "boom-string");
}

#[test]
fn second_install_is_rejected() {
	let first = install(RecordingEvaluator::default());
	assert!(first.is_ok());
	assert!(installed().is_some());
	assert!(matches!(install(RecordingEvaluator::default()), Err(InstallError::AlreadyInstalled)));
}
