//! Async driver around [`RequestCoordinator`].
//!
//! One task owns the coordinator and reacts to UI commands, call completions,
//! evaluator readiness and the coordinator's next deadline. Remote calls run
//! on their own tasks and report back through a completion channel, so the
//! check-then-apply of every outcome happens on the session task alone.

mod perform;
mod persist;

use std::sync::Arc;
use std::time::Instant;

use mdm_rpc::{EvaluatorChannel, PackageDescriptor, path};
use mdm_worker::TaskClass;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub use self::perform::{classify, perform};
use self::persist::Persister;
use crate::config::CoordinatorConfig;
use crate::coordinator::{
	EvaluationMode, EvaluationOutcome, EvaluationRequest, EvaluationView, FileRoute, PendingFile, RequestCoordinator, Trigger, Verdict,
};
use crate::storage::DocumentStore;

/// Input accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
	/// Incidental typing; debounced.
	Edit(String),
	/// Whole-document replacement; dispatched immediately.
	Replace(String),
	SetMode(EvaluationMode),
	SetFormat(Option<String>),
	/// A file for the evaluator's tree, typically from a bundle import.
	ForwardFile(PendingFile),
}

/// The session task has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("editor session is closed")]
pub struct SessionClosed;

#[derive(Debug)]
enum Completion {
	Evaluated { sequence: u64, outcome: EvaluationOutcome },
	Packages(Option<Vec<PackageDescriptor>>),
	FilesFlushed { written: usize, failed: usize },
}

/// Cloneable handle to a running [`EditorSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
	commands: mpsc::UnboundedSender<SessionCommand>,
	view: watch::Receiver<EvaluationView>,
	packages: watch::Receiver<Vec<PackageDescriptor>>,
	cancel: CancellationToken,
}

impl SessionHandle {
	pub fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
		self.commands.send(command).map_err(|_| SessionClosed)
	}

	pub fn edit(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
		self.send(SessionCommand::Edit(text.into()))
	}

	pub fn replace(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
		self.send(SessionCommand::Replace(text.into()))
	}

	pub fn set_mode(&self, mode: EvaluationMode) -> Result<(), SessionClosed> {
		self.send(SessionCommand::SetMode(mode))
	}

	pub fn set_format(&self, format: Option<String>) -> Result<(), SessionClosed> {
		self.send(SessionCommand::SetFormat(format))
	}

	/// Import sink: the file is buffered until the evaluator is ready, then written under the root.
	pub fn forward_file(&self, name: impl Into<String>, bytes: Vec<u8>) -> Result<(), SessionClosed> {
		self.send(SessionCommand::ForwardFile(PendingFile { name: name.into(), bytes }))
	}

	/// Published evaluation state.
	pub fn view(&self) -> watch::Receiver<EvaluationView> {
		self.view.clone()
	}

	/// Published package listing; only updated when it changes.
	pub fn packages(&self) -> watch::Receiver<Vec<PackageDescriptor>> {
		self.packages.clone()
	}

	/// Stops the session task. Calls already in flight complete unobserved.
	pub fn shutdown(&self) {
		self.cancel.cancel();
	}

	pub fn is_closed(&self) -> bool {
		self.commands.is_closed()
	}
}

/// State owned by the session task.
pub struct EditorSession {
	coordinator: RequestCoordinator,
	channel: EvaluatorChannel,
	persister: Persister,
	ready: bool,
	readiness: watch::Receiver<bool>,
	commands: mpsc::UnboundedReceiver<SessionCommand>,
	completions: mpsc::UnboundedReceiver<Completion>,
	completion_tx: mpsc::UnboundedSender<Completion>,
	view_tx: watch::Sender<EvaluationView>,
	packages_tx: watch::Sender<Vec<PackageDescriptor>>,
	cancel: CancellationToken,
}

impl EditorSession {
	/// Starts the session task on the current runtime.
	///
	/// The stored document, if any, becomes the initial text and is
	/// evaluated as soon as the evaluator is ready.
	pub fn spawn(channel: EvaluatorChannel, config: CoordinatorConfig, store: Arc<dyn DocumentStore>) -> SessionHandle {
		let initial = match store.load() {
			Ok(text) => text.unwrap_or_default(),
			Err(error) => {
				warn!(%error, "session.load_failed");
				String::new()
			}
		};

		let (command_tx, commands) = mpsc::unbounded_channel();
		let (completion_tx, completions) = mpsc::unbounded_channel();
		let (view_tx, view) = watch::channel(EvaluationView::default());
		let (packages_tx, packages) = watch::channel(Vec::new());
		let cancel = CancellationToken::new();

		let mut coordinator = RequestCoordinator::new(config, initial);
		coordinator.schedule(Instant::now(), Trigger::Replace);

		let session = Self {
			coordinator,
			readiness: channel.readiness(),
			ready: false,
			channel,
			persister: Persister::new(store),
			commands,
			completions,
			completion_tx,
			view_tx,
			packages_tx,
			cancel: cancel.clone(),
		};
		mdm_worker::spawn(TaskClass::Interactive, session.run());

		SessionHandle {
			commands: command_tx,
			view,
			packages,
			cancel,
		}
	}

	async fn run(mut self) {
		debug!(bytes = self.coordinator.source().len(), "session.start");
		if *self.readiness.borrow_and_update() {
			self.on_ready();
		}

		let cancel = self.cancel.clone();
		loop {
			let deadline = self.coordinator.next_deadline(self.ready);
			let sleep_until = deadline.map_or_else(tokio::time::Instant::now, tokio::time::Instant::from_std);

			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				Some(completion) = self.completions.recv() => self.on_completion(completion),
				command = self.commands.recv() => match command {
					Some(command) => self.on_command(command),
					None => break,
				},
				changed = self.readiness.changed(), if !self.ready => match changed {
					Ok(()) => {
						if *self.readiness.borrow_and_update() {
							self.on_ready();
						}
					}
					Err(_) => break,
				},
				_ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => self.poll(),
			}
		}
		debug!(last_accepted = self.coordinator.last_accepted(), "session.stop");
	}

	fn on_command(&mut self, command: SessionCommand) {
		let now = Instant::now();
		match command {
			SessionCommand::Edit(text) => {
				self.persist(&text);
				self.coordinator.on_edit(now, text);
			}
			SessionCommand::Replace(text) => {
				self.persist(&text);
				self.coordinator.on_replace(now, text);
			}
			SessionCommand::SetMode(mode) => self.coordinator.on_mode_change(now, mode),
			SessionCommand::SetFormat(format) => self.coordinator.on_format_change(now, format),
			SessionCommand::ForwardFile(file) => match self.coordinator.forward_file(file) {
				Ok(FileRoute::Queued) => {}
				Ok(FileRoute::Flush(files)) => self.flush_files(files),
				Err(error) => warn!(%error, "session.file_dropped"),
			},
		}
	}

	fn persist(&self, text: &str) {
		self.persister.submit(text);
	}

	fn on_ready(&mut self) {
		self.ready = true;
		debug!("session.evaluator_ready");
		match self.coordinator.on_ready() {
			Some(files) if !files.is_empty() => self.flush_files(files),
			_ => {}
		}
	}

	fn poll(&mut self) {
		if let Some(request) = self.coordinator.poll_due(Instant::now(), self.ready) {
			self.dispatch(request);
		}
	}

	fn dispatch(&self, request: EvaluationRequest) {
		let call = request.call(self.coordinator.default_format());
		let sequence = request.sequence;
		let channel = self.channel.clone();
		let completion_tx = self.completion_tx.clone();
		mdm_worker::spawn(TaskClass::Interactive, async move {
			let outcome = perform(&channel, call).await;
			let _ = completion_tx.send(Completion::Evaluated { sequence, outcome });
		});
	}

	fn on_completion(&mut self, completion: Completion) {
		let now = Instant::now();
		match completion {
			Completion::Evaluated { sequence, outcome } => match self.coordinator.on_outcome(now, sequence, outcome) {
				Verdict::Accepted { refresh_packages } => {
					self.publish_view();
					if refresh_packages {
						self.refresh_packages();
					}
				}
				Verdict::Retrying { .. } | Verdict::Superseded => self.publish_view(),
				Verdict::Stale | Verdict::Dropped => {}
			},
			Completion::Packages(listing) => {
				let coordinator = &mut self.coordinator;
				let changed = self.packages_tx.send_if_modified(|current| {
					if !coordinator.apply_packages(listing) {
						return false;
					}
					*current = coordinator.packages().to_vec();
					true
				});
				if changed {
					debug!(count = self.coordinator.packages().len(), "session.packages_changed");
				}
			}
			Completion::FilesFlushed { written, failed } => {
				debug!(written, failed, "session.flush_files_done");
				if let Some(files) = self.coordinator.on_files_flushed(now) {
					self.flush_files(files);
				}
			}
		}
	}

	fn publish_view(&self) {
		let view = self.coordinator.view();
		self.view_tx.send_if_modified(|current| {
			if current == view {
				return false;
			}
			*current = view.clone();
			true
		});
	}

	fn refresh_packages(&self) {
		let channel = self.channel.clone();
		let completion_tx = self.completion_tx.clone();
		mdm_worker::spawn(TaskClass::Background, async move {
			match channel.list_packages().await {
				Ok(listing) => {
					let _ = completion_tx.send(Completion::Packages(listing));
				}
				Err(error) => debug!(%error, "session.packages_failed"),
			}
		});
	}

	/// Writes files in arrival order on one task; the coordinator allows a single flush at a time.
	fn flush_files(&self, files: Vec<PendingFile>) {
		debug!(files = files.len(), "session.flush_files");
		let channel = self.channel.clone();
		let completion_tx = self.completion_tx.clone();
		mdm_worker::spawn(TaskClass::Background, async move {
			let mut written = 0;
			let mut failed = 0;
			for file in files {
				if write(&channel, file).await {
					written += 1;
				} else {
					failed += 1;
				}
			}
			let _ = completion_tx.send(Completion::FilesFlushed { written, failed });
		});
	}
}

/// Writes one file under the root; failures are logged, not propagated.
async fn write(channel: &EvaluatorChannel, file: PendingFile) -> bool {
	let target = path::join(path::ROOT, &file.name);
	match channel.add_file(target.as_str(), file.bytes).await {
		Ok(()) => {
			trace!(path = %target, "session.file_written");
			true
		}
		Err(error) => {
			warn!(path = %target, %error, "session.file_write_failed");
			false
		}
	}
}
