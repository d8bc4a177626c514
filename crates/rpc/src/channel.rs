//! Client half of the evaluator boundary.
//!
//! [`EvaluatorChannel`] turns method calls into [`Envelope`]s pushed to the
//! worker's [`Inbox`] and awaits the matching reply. Calls are independent:
//! the channel imposes no queuing or ordering of its own, and any number may
//! be outstanding at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard, mpsc, oneshot, watch};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{Envelope, Method, Request, Response};
use crate::types::{DirEntry, PackageDescriptor, RenderOutput};

/// Worker side of the channel: envelopes in arrival order.
#[derive(Debug)]
pub struct Inbox {
	rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Inbox {
	/// Waits for the next envelope on a runtime task.
	pub async fn recv(&mut self) -> Option<Envelope> {
		self.rx.recv().await
	}

	/// Waits for the next envelope from a plain OS thread.
	pub fn blocking_recv(&mut self) -> Option<Envelope> {
		self.rx.blocking_recv()
	}
}

#[derive(Debug)]
struct Shared {
	tx: mpsc::UnboundedSender<Envelope>,
	ready: watch::Sender<bool>,
	ids: AtomicU64,
	context: Mutex<()>,
}

/// Exclusive use of the evaluator's context; see [`EvaluatorChannel::lock_context`].
pub type ContextGuard<'a> = MutexGuard<'a, ()>;

/// Cloneable handle for calling the evaluator worker.
#[derive(Debug, Clone)]
pub struct EvaluatorChannel {
	inner: Arc<Shared>,
}

impl EvaluatorChannel {
	/// Creates a channel and the inbox the worker drains.
	pub fn new() -> (Self, Inbox) {
		let (tx, rx) = mpsc::unbounded_channel();
		let (ready, _) = watch::channel(false);
		let channel = Self {
			inner: Arc::new(Shared {
				tx,
				ready,
				ids: AtomicU64::new(0),
				context: Mutex::new(()),
			}),
		};
		(channel, Inbox { rx })
	}

	/// Whether `initialize` has completed.
	pub fn is_ready(&self) -> bool {
		*self.inner.ready.borrow()
	}

	/// Subscribes to readiness changes.
	pub fn readiness(&self) -> watch::Receiver<bool> {
		self.inner.ready.subscribe()
	}

	/// Waits for exclusive use of the evaluator's context.
	///
	/// Calls stay independent; a caller whose calls build on each other
	/// (reset, configure, then evaluate) holds the guard across all of them
	/// so no other holder's calls land in between. Waiters are served in
	/// arrival order.
	pub async fn lock_context(&self) -> ContextGuard<'_> {
		self.inner.context.lock().await
	}

	/// Performs one call.
	///
	/// Anything but `initialize` is rejected with [`Error::NotInitialized`]
	/// before readiness, without contacting the worker.
	pub async fn call(&self, request: Request) -> Result<Response> {
		let method = request.method();
		if method != Method::Initialize && !self.is_ready() {
			debug!(method = method.as_str(), "rpc.call.not_initialized");
			return Err(Error::NotInitialized);
		}

		let id = self.inner.ids.fetch_add(1, Ordering::Relaxed);
		let (reply, rx) = oneshot::channel();
		trace!(id, method = method.as_str(), "rpc.call");
		self.inner
			.tx
			.send(Envelope { id, request, reply })
			.map_err(|_| Error::ServiceStopped)?;

		let response = rx.await.map_err(|_| Error::ServiceStopped)??;
		trace!(id, method = method.as_str(), "rpc.reply");

		if method == Method::Initialize {
			let flipped = self.inner.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
			if flipped {
				debug!("rpc.channel.ready");
			}
		}
		Ok(response)
	}

	pub async fn initialize(&self) -> Result<()> {
		let response = self.call(Request::Initialize).await?;
		expect_unit(Method::Initialize, response)
	}

	pub async fn reset_context(&self) -> Result<()> {
		let response = self.call(Request::ResetContext).await?;
		expect_unit(Method::ResetContext, response)
	}

	/// Returns whether configuration is complete.
	pub async fn configure_from_source(&self, source: impl Into<String>) -> Result<bool> {
		match self.call(Request::ConfigureFromSource { source: source.into() }).await? {
			Response::Configured(done) => Ok(done),
			_ => Err(Error::UnexpectedResponse {
				method: Method::ConfigureFromSource,
			}),
		}
	}

	pub async fn abstract_syntax_tree(&self, source: impl Into<String>) -> Result<Option<String>> {
		let response = self.call(Request::GetAbstractSyntaxTree { source: source.into() }).await?;
		expect_text(Method::GetAbstractSyntaxTree, response)
	}

	pub async fn debug_abstract_syntax_tree(&self, source: impl Into<String>) -> Result<Option<String>> {
		let response = self.call(Request::GetDebugAbstractSyntaxTree { source: source.into() }).await?;
		expect_text(Method::GetDebugAbstractSyntaxTree, response)
	}

	pub async fn structured_output(&self, source: impl Into<String>) -> Result<Option<String>> {
		let response = self.call(Request::GetStructuredOutput { source: source.into() }).await?;
		expect_text(Method::GetStructuredOutput, response)
	}

	pub async fn evaluate(&self, source: impl Into<String>, format: impl Into<String>) -> Result<Option<RenderOutput>> {
		let request = Request::Evaluate {
			source: source.into(),
			format: format.into(),
		};
		expect_render(Method::Evaluate, self.call(request).await?)
	}

	/// Like [`Self::evaluate`] without the document wrapper.
	pub async fn evaluate_fragment(&self, source: impl Into<String>, format: impl Into<String>) -> Result<Option<RenderOutput>> {
		let request = Request::EvaluateFragment {
			source: source.into(),
			format: format.into(),
		};
		expect_render(Method::EvaluateFragment, self.call(request).await?)
	}

	pub async fn list_packages(&self) -> Result<Option<Vec<PackageDescriptor>>> {
		match self.call(Request::ListPackages).await? {
			Response::Packages(packages) => Ok(packages),
			_ => Err(Error::UnexpectedResponse {
				method: Method::ListPackages,
			}),
		}
	}

	pub async fn list_directory(&self, path: impl Into<String>) -> Result<Option<Vec<DirEntry>>> {
		match self.call(Request::ListDirectory { path: path.into() }).await? {
			Response::Listing(entries) => Ok(entries),
			_ => Err(Error::UnexpectedResponse {
				method: Method::ListDirectory,
			}),
		}
	}

	pub async fn add_file(&self, path: impl Into<String>, bytes: Vec<u8>) -> Result<()> {
		let response = self.call(Request::AddFile { path: path.into(), bytes }).await?;
		expect_unit(Method::AddFile, response)
	}

	pub async fn add_directory(&self, path: impl Into<String>) -> Result<()> {
		let response = self.call(Request::AddDirectory { path: path.into() }).await?;
		expect_unit(Method::AddDirectory, response)
	}

	pub async fn rename_entry(&self, path: impl Into<String>, new_path: impl Into<String>) -> Result<()> {
		let request = Request::RenameEntry {
			path: path.into(),
			new_path: new_path.into(),
		};
		expect_unit(Method::RenameEntry, self.call(request).await?)
	}

	pub async fn remove_file(&self, path: impl Into<String>) -> Result<()> {
		let response = self.call(Request::RemoveFile { path: path.into() }).await?;
		expect_unit(Method::RemoveFile, response)
	}

	pub async fn remove_directory(&self, path: impl Into<String>) -> Result<()> {
		let response = self.call(Request::RemoveDirectory { path: path.into() }).await?;
		expect_unit(Method::RemoveDirectory, response)
	}

	pub async fn read_file(&self, path: impl Into<String>) -> Result<Option<Vec<u8>>> {
		match self.call(Request::ReadFile { path: path.into() }).await? {
			Response::Bytes(bytes) => Ok(bytes),
			_ => Err(Error::UnexpectedResponse { method: Method::ReadFile }),
		}
	}
}

fn expect_unit(method: Method, response: Response) -> Result<()> {
	match response {
		Response::Unit => Ok(()),
		_ => Err(Error::UnexpectedResponse { method }),
	}
}

fn expect_text(method: Method, response: Response) -> Result<Option<String>> {
	match response {
		Response::Text(text) => Ok(text),
		_ => Err(Error::UnexpectedResponse { method }),
	}
}

fn expect_render(method: Method, response: Response) -> Result<Option<RenderOutput>> {
	match response {
		Response::Render(output) => Ok(output),
		_ => Err(Error::UnexpectedResponse { method }),
	}
}
