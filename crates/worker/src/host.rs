//! The evaluator host thread.
//!
//! One dedicated OS thread owns the [`Evaluator`] and drains its [`Inbox`]
//! first-come-first-served. Calls from the client may be outstanding
//! concurrently; the host serializes their execution in arrival order.
//! A panicking evaluator call is reported as [`RemoteError::Internal`] and the
//! host keeps serving.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::time::Instant;

use mdm_rpc::{Envelope, EvaluatorChannel, Inbox, RemoteError, Request, Response};
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::evaluator::{EvalResult, Evaluator};
use crate::{TaskClass, spawn_named_thread};

/// Name of the evaluator host thread.
pub const HOST_THREAD_NAME: &str = "mdm-evaluator";

/// Failure to start the process-wide evaluator.
#[derive(Debug, Error)]
pub enum InstallError {
	#[error("evaluator already installed")]
	AlreadyInstalled,
	#[error("failed to spawn evaluator thread: {0}")]
	Spawn(#[from] std::io::Error),
}

static INSTALLED: OnceLock<EvaluatorChannel> = OnceLock::new();

/// Starts the process-wide evaluator.
///
/// The host is created once and never recreated; later calls fail with
/// [`InstallError::AlreadyInstalled`].
pub fn install<E: Evaluator>(evaluator: E) -> Result<&'static EvaluatorChannel, InstallError> {
	if INSTALLED.get().is_some() {
		return Err(InstallError::AlreadyInstalled);
	}
	let channel = spawn_evaluator(evaluator)?;
	INSTALLED.set(channel).map_err(|_| InstallError::AlreadyInstalled)?;
	INSTALLED.get().ok_or(InstallError::AlreadyInstalled)
}

/// The channel of the process-wide evaluator, if installed.
pub fn installed() -> Option<&'static EvaluatorChannel> {
	INSTALLED.get()
}

/// Starts a host thread for `evaluator` and returns its channel.
///
/// The thread exits once every clone of the channel is dropped.
pub fn spawn_evaluator<E: Evaluator>(evaluator: E) -> std::io::Result<EvaluatorChannel> {
	let (channel, inbox) = EvaluatorChannel::new();
	spawn_named_thread(TaskClass::CpuBlocking, HOST_THREAD_NAME, move || run(evaluator, inbox))?;
	Ok(channel)
}

fn run<E: Evaluator>(mut evaluator: E, mut inbox: Inbox) {
	debug!("worker.host.start");
	while let Some(Envelope { id, request, reply }) = inbox.blocking_recv() {
		let method = request.method();
		let start = Instant::now();
		let result = match panic::catch_unwind(AssertUnwindSafe(|| dispatch(&mut evaluator, request))) {
			Ok(result) => result,
			Err(payload) => {
				let message = panic_message(payload.as_ref());
				error!(id, method = method.as_str(), %message, "worker.host.panic");
				Err(RemoteError::Internal(message))
			}
		};
		trace!(
			id,
			method = method.as_str(),
			ok = result.is_ok(),
			elapsed_us = start.elapsed().as_micros() as u64,
			"worker.host.call"
		);
		if reply.send(result).is_err() {
			trace!(id, method = method.as_str(), "worker.host.reply_dropped");
		}
	}
	debug!("worker.host.stop");
}

fn dispatch<E: Evaluator>(evaluator: &mut E, request: Request) -> EvalResult<Response> {
	match request {
		Request::Initialize => evaluator.initialize().map(|()| Response::Unit),
		Request::ResetContext => evaluator.reset_context().map(|()| Response::Unit),
		Request::ConfigureFromSource { source } => evaluator.configure_from_source(&source).map(Response::Configured),
		Request::GetAbstractSyntaxTree { source } => evaluator.syntax_tree(&source).map(Response::Text),
		Request::GetDebugAbstractSyntaxTree { source } => evaluator.debug_syntax_tree(&source).map(Response::Text),
		Request::GetStructuredOutput { source } => evaluator.structured_output(&source).map(Response::Text),
		Request::Evaluate { source, format } => evaluator.evaluate(&source, &format).map(Response::Render),
		Request::EvaluateFragment { source, format } => evaluator.evaluate_fragment(&source, &format).map(Response::Render),
		Request::ListPackages => evaluator.list_packages().map(Response::Packages),
		Request::ListDirectory { path } => evaluator.file_system().list_directory(&path).map(Response::Listing),
		Request::AddFile { path, bytes } => evaluator.file_system().add_file(&path, bytes).map(|()| Response::Unit),
		Request::AddDirectory { path } => evaluator.file_system().add_directory(&path).map(|()| Response::Unit),
		Request::RenameEntry { path, new_path } => evaluator.file_system().rename_entry(&path, &new_path).map(|()| Response::Unit),
		Request::RemoveFile { path } => evaluator.file_system().remove_file(&path).map(|()| Response::Unit),
		Request::RemoveDirectory { path } => evaluator.file_system().remove_directory(&path).map(|()| Response::Unit),
		Request::ReadFile { path } => evaluator.file_system().read_file(&path).map(Response::Bytes),
	}
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}

#[cfg(test)]
mod tests;
