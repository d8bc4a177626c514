//! Method table and message shapes for the evaluator boundary.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::RemoteError;
use crate::types::{DirEntry, PackageDescriptor, RenderOutput};

/// Monotonic sequence numbers for evaluation requests.
///
/// Owned by a single writer; numbers are never reused.
#[derive(Debug, Clone, Copy)]
pub struct SequenceCounter {
	upcoming: u64,
}

impl SequenceCounter {
	pub const fn starting_at(first: u64) -> Self {
		Self { upcoming: first }
	}

	/// Hands out the next number.
	pub fn issue(&mut self) -> u64 {
		let sequence = self.upcoming;
		self.upcoming += 1;
		sequence
	}
}

/// Names of the calls the worker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
	Initialize,
	ResetContext,
	ConfigureFromSource,
	GetAbstractSyntaxTree,
	GetDebugAbstractSyntaxTree,
	GetStructuredOutput,
	Evaluate,
	EvaluateFragment,
	ListPackages,
	ListDirectory,
	AddFile,
	AddDirectory,
	RenameEntry,
	RemoveFile,
	RemoveDirectory,
	ReadFile,
}

impl Method {
	/// Wire name of the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Initialize => "initialize",
			Self::ResetContext => "resetContext",
			Self::ConfigureFromSource => "configureFromSource",
			Self::GetAbstractSyntaxTree => "getAbstractSyntaxTree",
			Self::GetDebugAbstractSyntaxTree => "getDebugAbstractSyntaxTree",
			Self::GetStructuredOutput => "getStructuredOutput",
			Self::Evaluate => "evaluate",
			Self::EvaluateFragment => "evaluateFragment",
			Self::ListPackages => "listPackages",
			Self::ListDirectory => "listDirectory",
			Self::AddFile => "addFile",
			Self::AddDirectory => "addDirectory",
			Self::RenameEntry => "renameEntry",
			Self::RemoveFile => "removeFile",
			Self::RemoveDirectory => "removeDirectory",
			Self::ReadFile => "readFile",
		}
	}
}

impl std::fmt::Display for Method {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One call, carrying exactly the arguments its method takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Request {
	Initialize,
	ResetContext,
	ConfigureFromSource { source: String },
	GetAbstractSyntaxTree { source: String },
	GetDebugAbstractSyntaxTree { source: String },
	GetStructuredOutput { source: String },
	Evaluate { source: String, format: String },
	EvaluateFragment { source: String, format: String },
	ListPackages,
	ListDirectory { path: String },
	AddFile { path: String, bytes: Vec<u8> },
	AddDirectory { path: String },
	RenameEntry { path: String, new_path: String },
	RemoveFile { path: String },
	RemoveDirectory { path: String },
	ReadFile { path: String },
}

impl Request {
	pub const fn method(&self) -> Method {
		match self {
			Self::Initialize => Method::Initialize,
			Self::ResetContext => Method::ResetContext,
			Self::ConfigureFromSource { .. } => Method::ConfigureFromSource,
			Self::GetAbstractSyntaxTree { .. } => Method::GetAbstractSyntaxTree,
			Self::GetDebugAbstractSyntaxTree { .. } => Method::GetDebugAbstractSyntaxTree,
			Self::GetStructuredOutput { .. } => Method::GetStructuredOutput,
			Self::Evaluate { .. } => Method::Evaluate,
			Self::EvaluateFragment { .. } => Method::EvaluateFragment,
			Self::ListPackages => Method::ListPackages,
			Self::ListDirectory { .. } => Method::ListDirectory,
			Self::AddFile { .. } => Method::AddFile,
			Self::AddDirectory { .. } => Method::AddDirectory,
			Self::RenameEntry { .. } => Method::RenameEntry,
			Self::RemoveFile { .. } => Method::RemoveFile,
			Self::RemoveDirectory { .. } => Method::RemoveDirectory,
			Self::ReadFile { .. } => Method::ReadFile,
		}
	}
}

/// Successful result of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Response {
	/// Calls without a result value.
	Unit,
	/// `configureFromSource`: whether configuration is complete.
	Configured(bool),
	/// Tree and structured-output calls.
	Text(Option<String>),
	/// `evaluate` / `evaluateFragment`.
	Render(Option<RenderOutput>),
	/// `listPackages`.
	Packages(Option<Vec<PackageDescriptor>>),
	/// `listDirectory`.
	Listing(Option<Vec<DirEntry>>),
	/// `readFile`.
	Bytes(Option<Vec<u8>>),
}

/// Reply slot for one call.
pub type Reply = oneshot::Sender<Result<Response, RemoteError>>;

/// A call in flight towards the worker.
#[derive(Debug)]
pub struct Envelope {
	/// Client-assigned id, used for log correlation only.
	pub id: u64,
	pub request: Request,
	pub reply: Reply,
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn sequences_start_where_asked() {
		let mut sequences = SequenceCounter::starting_at(1);
		assert_eq!(sequences.issue(), 1);
		assert_eq!(sequences.issue(), 2);
	}

	#[test]
	fn request_names_follow_wire_table() {
		let request = Request::EvaluateFragment {
			source: "# hi".into(),
			format: "html".into(),
		};
		assert_eq!(request.method().as_str(), "evaluateFragment");
		assert_eq!(Request::ListPackages.method().to_string(), "listPackages");

		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(json["method"], "evaluateFragment");
		assert_eq!(json["format"], "html");
	}
}
