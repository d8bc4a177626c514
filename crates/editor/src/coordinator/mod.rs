//! Evaluation request coordinator.
//!
//! [`RequestCoordinator`] owns the single evaluation slot of an editor and
//! decides when to issue a request and which outcomes may touch the view:
//! - Debounce scheduling (incidental typing waits, deliberate changes don't)
//! - Sequence allocation and stale-outcome suppression
//! - Retry of not-ready outcomes until ready or superseded, within the configured limit
//! - Buffering of imported files until the evaluator's tree is reachable
//!
//! The coordinator performs no I/O and reads no clock. Every method takes
//! `now`, and the driver asks [`RequestCoordinator::next_deadline`] when to
//! call back. Cancellation is purely logical: replacing the deadline drops
//! the pending dispatch, and outcomes of superseded sequences are discarded.
//!
//! # Phases
//!
//! | From | Event | To |
//! |---|---|---|
//! | any | input | `Debouncing` |
//! | `Debouncing`, `Retrying` | deadline passed, ready | `InFlight` |
//! | `InFlight` | success / invalidated / evaluation error | `Accepted` |
//! | `InFlight` | not ready | `Retrying` |
//! | `InFlight` | transport failure | `Idle` |
//!
//! An outcome whose sequence is not the latest issued is `Stale` and changes
//! nothing. Outcomes for the latest sequence that land while newer input is
//! debouncing are still applied, but leave the slot `Debouncing`.

mod pending;
mod request;

use std::time::{Duration, Instant};

use mdm_rpc::{Diagnostic, PackageDescriptor, SequenceCounter};
use tracing::{debug, trace, warn};

pub use self::pending::{PendingFile, PendingFiles, PendingFilesFull};
pub use self::request::{EvaluationCall, EvaluationMode, EvaluationOutcome, EvaluationRequest, Failure};
use crate::config::CoordinatorConfig;
use crate::packages::PackageCache;

/// Phase of the evaluation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
	/// Nothing pending or displayed yet.
	Idle,
	/// Input received, waiting for the deadline.
	Debouncing,
	/// A request was issued and its outcome is awaited.
	InFlight,
	/// The evaluator was not ready; a re-issue is scheduled.
	Retrying,
	/// The latest outcome was applied to the view.
	Accepted,
}

/// What caused a dispatch to be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
	/// Incidental typing.
	Edit,
	/// The whole document was replaced (import, load).
	Replace,
	ModeChange,
	FormatChange,
	/// Buffered files reached the evaluator's tree.
	FilesFlushed,
}

impl Trigger {
	/// Deliberate changes dispatch without debounce.
	pub const fn is_deliberate(self) -> bool {
		!matches!(self, Self::Edit)
	}
}

/// What the coordinator did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	/// Applied to the view.
	Accepted {
		/// Whether the package listing should be re-queried.
		refresh_packages: bool,
	},
	/// The outcome belongs to a superseded request and was discarded.
	Stale,
	/// Not ready; the same intent is re-issued at `at`.
	Retrying {
		at: Instant,
		attempt: u32,
	},
	/// Not ready, but newer input is already scheduled; no retry of its own.
	Superseded,
	/// The call never produced an outcome; the view is unchanged.
	Dropped,
}

/// Where a forwarded file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRoute {
	/// Held until readiness, or behind the flush already writing.
	Queued,
	/// Nothing is writing; flush these now, then report [`RequestCoordinator::on_files_flushed`].
	Flush(Vec<PendingFile>),
}

/// Evaluation state published to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationView {
	/// Sequence of the outcome this view reflects.
	pub sequence: Option<u64>,
	/// Rendered output; `None` when invalidated or failed.
	pub output: Option<String>,
	pub warnings: Vec<String>,
	pub errors: Vec<Diagnostic>,
	/// A dependency is loading and the request will be retried.
	pub loading_dependency: bool,
}

/// Single-slot evaluation state machine.
#[derive(Debug)]
pub struct RequestCoordinator {
	config: CoordinatorConfig,
	phase: SlotPhase,
	mode: EvaluationMode,
	source: String,
	target_format: Option<String>,
	deadline: Option<Instant>,
	sequences: SequenceCounter,
	latest_issued: Option<u64>,
	last_accepted: Option<u64>,
	not_ready_attempts: u32,
	pending_files: PendingFiles,
	flushing: bool,
	view: EvaluationView,
	packages: PackageCache,
}

impl RequestCoordinator {
	pub fn new(config: CoordinatorConfig, source: impl Into<String>) -> Self {
		let pending_files = PendingFiles::new(config.pending_file_capacity);
		Self {
			config,
			phase: SlotPhase::Idle,
			mode: EvaluationMode::default(),
			source: source.into(),
			target_format: None,
			deadline: None,
			sequences: SequenceCounter::starting_at(1),
			latest_issued: None,
			last_accepted: None,
			not_ready_attempts: 0,
			pending_files,
			flushing: false,
			view: EvaluationView::default(),
			packages: PackageCache::new(),
		}
	}

	/// Records typed text; dispatch waits for the debounce window.
	pub fn on_edit(&mut self, now: Instant, text: impl Into<String>) {
		self.source = text.into();
		self.schedule(now, Trigger::Edit);
	}

	/// Replaces the document; dispatch is immediate.
	pub fn on_replace(&mut self, now: Instant, text: impl Into<String>) {
		self.source = text.into();
		self.schedule(now, Trigger::Replace);
	}

	pub fn on_mode_change(&mut self, now: Instant, mode: EvaluationMode) {
		self.mode = mode;
		self.schedule(now, Trigger::ModeChange);
	}

	/// Sets the output format; `None` falls back to the configured default.
	pub fn on_format_change(&mut self, now: Instant, format: Option<String>) {
		self.target_format = format;
		self.schedule(now, Trigger::FormatChange);
	}

	/// Replaces any pending deadline with a fresh one for `trigger`.
	pub fn schedule(&mut self, now: Instant, trigger: Trigger) {
		let delay = if trigger.is_deliberate() { Duration::ZERO } else { self.config.debounce() };
		if self.phase == SlotPhase::Retrying {
			debug!(attempts = self.not_ready_attempts, ?trigger, "coordinator.retry_superseded");
		}
		self.deadline = Some(now + delay);
		self.phase = SlotPhase::Debouncing;
		self.not_ready_attempts = 0;
		trace!(?trigger, delay_ms = delay.as_millis() as u64, "coordinator.schedule");
	}

	/// When the driver should call [`Self::poll_due`] next.
	///
	/// `None` while nothing is scheduled or dispatch is held (evaluator not
	/// ready, or buffered files still flushing).
	pub fn next_deadline(&self, ready: bool) -> Option<Instant> {
		if !ready || self.flushing {
			return None;
		}
		self.deadline
	}

	/// Issues the scheduled request once its deadline has passed.
	///
	/// The intent is held, not dropped, while the evaluator is not ready or
	/// buffered files are still being flushed.
	pub fn poll_due(&mut self, now: Instant, ready: bool) -> Option<EvaluationRequest> {
		let deadline = self.deadline?;
		if now < deadline {
			return None;
		}
		if !ready || self.flushing {
			trace!(ready, flushing = self.flushing, "coordinator.dispatch_held");
			return None;
		}

		self.deadline = None;
		let sequence = self.sequences.issue();
		self.latest_issued = Some(sequence);
		self.phase = SlotPhase::InFlight;
		debug!(
			sequence,
			mode = self.mode.as_str(),
			format = self.target_format.as_deref(),
			bytes = self.source.len(),
			"coordinator.dispatch"
		);

		Some(EvaluationRequest {
			sequence,
			mode: self.mode,
			source: self.source.clone(),
			target_format: self.target_format.clone(),
		})
	}

	/// Applies the outcome of request `sequence`.
	pub fn on_outcome(&mut self, now: Instant, sequence: u64, outcome: EvaluationOutcome) -> Verdict {
		if self.latest_issued != Some(sequence) {
			debug!(sequence, latest = self.latest_issued, outcome = outcome.kind(), "coordinator.outcome_stale");
			return Verdict::Stale;
		}
		trace!(sequence, outcome = outcome.kind(), "coordinator.outcome");
		let superseded = self.deadline.is_some();

		match outcome {
			EvaluationOutcome::Success(render) => {
				self.view = EvaluationView {
					sequence: Some(sequence),
					output: Some(render.content),
					warnings: render.warnings,
					errors: render.errors.into_iter().map(Diagnostic::from_message).collect(),
					loading_dependency: false,
				};
				self.accept(sequence, superseded);
				Verdict::Accepted { refresh_packages: true }
			}
			EvaluationOutcome::Invalidated => {
				self.view = EvaluationView {
					sequence: Some(sequence),
					..EvaluationView::default()
				};
				self.accept(sequence, superseded);
				Verdict::Accepted { refresh_packages: false }
			}
			EvaluationOutcome::Failure(Failure::Evaluation(errors)) => {
				debug!(sequence, errors = errors.len(), "coordinator.evaluation_error");
				self.view = EvaluationView {
					sequence: Some(sequence),
					errors,
					..EvaluationView::default()
				};
				self.accept(sequence, superseded);
				Verdict::Accepted { refresh_packages: false }
			}
			EvaluationOutcome::Failure(Failure::NotReady { detail }) => self.on_not_ready(now, sequence, detail, superseded),
			EvaluationOutcome::Failure(Failure::Transport { detail }) => {
				warn!(sequence, %detail, "coordinator.transport_failure");
				if !superseded {
					self.phase = SlotPhase::Idle;
				}
				Verdict::Dropped
			}
		}
	}

	fn on_not_ready(&mut self, now: Instant, sequence: u64, detail: String, superseded: bool) -> Verdict {
		self.view.loading_dependency = true;
		self.view.errors.clear();
		if superseded {
			debug!(sequence, "coordinator.not_ready_superseded");
			return Verdict::Superseded;
		}

		self.not_ready_attempts += 1;
		let attempt = self.not_ready_attempts;
		if let Some(max) = self.config.max_not_ready_retries
			&& attempt > max
		{
			warn!(sequence, attempts = attempt, %detail, "coordinator.retries_exhausted");
			self.view = EvaluationView {
				sequence: Some(sequence),
				errors: vec![Diagnostic {
					message: format!("dependency did not become ready after {max} retries"),
					raw: detail,
				}],
				..EvaluationView::default()
			};
			self.accept(sequence, false);
			return Verdict::Accepted { refresh_packages: false };
		}

		let at = now + self.config.retry_delay();
		self.deadline = Some(at);
		self.phase = SlotPhase::Retrying;
		debug!(sequence, attempt, %detail, "coordinator.not_ready_retry");
		Verdict::Retrying { at, attempt }
	}

	fn accept(&mut self, sequence: u64, superseded: bool) {
		self.last_accepted = Some(sequence);
		self.not_ready_attempts = 0;
		self.phase = if superseded { SlotPhase::Debouncing } else { SlotPhase::Accepted };
		trace!(sequence, superseded, "coordinator.accepted");
	}

	/// Routes a file forwarded by the import resolver.
	///
	/// Files reach the tree in arrival order: one flush writes at a time and
	/// evaluation is held while it runs.
	pub fn forward_file(&mut self, file: PendingFile) -> Result<FileRoute, PendingFilesFull> {
		if self.pending_files.is_drained() && !self.flushing {
			self.flushing = true;
			trace!(name = %file.name, "coordinator.file_flush");
			return Ok(FileRoute::Flush(vec![file]));
		}
		trace!(name = %file.name, queued = self.pending_files.len(), "coordinator.file_queued");
		self.pending_files.push(file)?;
		Ok(FileRoute::Queued)
	}

	/// The evaluator became ready. Returns the buffered files exactly once.
	///
	/// When files are returned, dispatch is held until
	/// [`Self::on_files_flushed`].
	pub fn on_ready(&mut self) -> Option<Vec<PendingFile>> {
		let files = self.pending_files.drain_once()?;
		if !files.is_empty() {
			self.flushing = true;
			debug!(files = files.len(), "coordinator.flush_start");
		}
		Some(files)
	}

	/// A flush finished writing.
	///
	/// Files queued behind it are returned as the next flush; otherwise
	/// evaluation is released and re-triggered.
	pub fn on_files_flushed(&mut self, now: Instant) -> Option<Vec<PendingFile>> {
		if !self.pending_files.is_empty() {
			let files = self.pending_files.take();
			debug!(files = files.len(), "coordinator.flush_continue");
			return Some(files);
		}
		self.flushing = false;
		self.schedule(now, Trigger::FilesFlushed);
		None
	}

	/// Replaces the package snapshot if the listing changed.
	pub fn apply_packages(&mut self, listing: Option<Vec<PackageDescriptor>>) -> bool {
		self.packages.apply(listing)
	}

	pub fn packages(&self) -> &[PackageDescriptor] {
		self.packages.snapshot()
	}

	pub fn view(&self) -> &EvaluationView {
		&self.view
	}

	pub fn phase(&self) -> SlotPhase {
		self.phase
	}

	pub fn mode(&self) -> EvaluationMode {
		self.mode
	}

	pub fn source(&self) -> &str {
		&self.source
	}

	pub fn target_format(&self) -> Option<&str> {
		self.target_format.as_deref()
	}

	pub fn default_format(&self) -> &str {
		&self.config.default_format
	}

	pub fn latest_issued(&self) -> Option<u64> {
		self.latest_issued
	}

	pub fn last_accepted(&self) -> Option<u64> {
		self.last_accepted
	}

	pub fn not_ready_attempts(&self) -> u32 {
		self.not_ready_attempts
	}

	pub fn is_flushing(&self) -> bool {
		self.flushing
	}
}
