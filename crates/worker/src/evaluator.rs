use mdm_rpc::{PackageDescriptor, RemoteError, RenderOutput};

use crate::fs::FileSystem;

/// Result of one evaluator call as seen by the host.
pub type EvalResult<T> = Result<T, RemoteError>;

/// The evaluator hosted on the worker thread.
///
/// Implementations are opaque to the rest of the system: parsing, package
/// loading and rendering all happen behind this trait. A dependency that is
/// still downloading is reported as [`RemoteError::NotReady`]; a source that
/// fails to evaluate as [`RemoteError::Evaluation`].
pub trait Evaluator: Send + 'static {
	/// One-time setup; the client channel becomes ready once this succeeds.
	fn initialize(&mut self) -> EvalResult<()>;

	/// Drops per-document state accumulated by previous evaluations.
	fn reset_context(&mut self) -> EvalResult<()> {
		Ok(())
	}

	/// Reads package/module declarations from `source`.
	///
	/// Returns `false` while declared dependencies are still loading.
	fn configure_from_source(&mut self, source: &str) -> EvalResult<bool>;

	fn syntax_tree(&mut self, source: &str) -> EvalResult<Option<String>>;

	fn debug_syntax_tree(&mut self, source: &str) -> EvalResult<Option<String>>;

	fn structured_output(&mut self, source: &str) -> EvalResult<Option<String>>;

	fn evaluate(&mut self, source: &str, format: &str) -> EvalResult<Option<RenderOutput>>;

	/// Same as [`Self::evaluate`] with the document wrapper omitted.
	fn evaluate_fragment(&mut self, source: &str, format: &str) -> EvalResult<Option<RenderOutput>>;

	fn list_packages(&mut self) -> EvalResult<Option<Vec<PackageDescriptor>>> {
		Ok(None)
	}

	/// The file tree evaluations read from.
	fn file_system(&mut self) -> &mut dyn FileSystem;
}
