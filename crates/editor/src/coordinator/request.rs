//! Evaluation requests, the calls they map to, and their outcomes.

use mdm_rpc::{Diagnostic, RenderOutput, Request};

/// Which evaluator call a request performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EvaluationMode {
	/// Full rendered document.
	#[default]
	Document,
	/// Rendered output without the document wrapper.
	Fragment,
	/// Abstract syntax tree dump.
	SyntaxTree,
	/// Abstract syntax tree dump with debug detail.
	DebugSyntaxTree,
	/// Structured (machine-readable) output.
	StructuredOutput,
}

impl EvaluationMode {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Document => "document",
			Self::Fragment => "fragment",
			Self::SyntaxTree => "syntax_tree",
			Self::DebugSyntaxTree => "debug_syntax_tree",
			Self::StructuredOutput => "structured_output",
		}
	}
}

/// One "evaluate this snapshot" intent. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
	pub sequence: u64,
	pub mode: EvaluationMode,
	pub source: String,
	pub target_format: Option<String>,
}

impl EvaluationRequest {
	/// The remote call this request performs; `default_format` fills a missing target format.
	pub fn call(&self, default_format: &str) -> EvaluationCall {
		let source = self.source.clone();
		let format = || self.target_format.clone().unwrap_or_else(|| default_format.to_string());
		match self.mode {
			EvaluationMode::Document => EvaluationCall::Evaluate { source, format: format() },
			EvaluationMode::Fragment => EvaluationCall::EvaluateFragment { source, format: format() },
			EvaluationMode::SyntaxTree => EvaluationCall::SyntaxTree { source },
			EvaluationMode::DebugSyntaxTree => EvaluationCall::DebugSyntaxTree { source },
			EvaluationMode::StructuredOutput => EvaluationCall::StructuredOutput { source },
		}
	}
}

/// A remote evaluation call with exactly the arguments it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationCall {
	Evaluate { source: String, format: String },
	EvaluateFragment { source: String, format: String },
	SyntaxTree { source: String },
	DebugSyntaxTree { source: String },
	StructuredOutput { source: String },
}

impl EvaluationCall {
	pub fn source(&self) -> &str {
		match self {
			Self::Evaluate { source, .. }
			| Self::EvaluateFragment { source, .. }
			| Self::SyntaxTree { source }
			| Self::DebugSyntaxTree { source }
			| Self::StructuredOutput { source } => source,
		}
	}

	/// Whether the evaluator must be configured from the source first.
	pub const fn needs_configuration(&self) -> bool {
		matches!(self, Self::Evaluate { .. } | Self::EvaluateFragment { .. })
	}

	/// The wire request for this call.
	pub fn into_request(self) -> Request {
		match self {
			Self::Evaluate { source, format } => Request::Evaluate { source, format },
			Self::EvaluateFragment { source, format } => Request::EvaluateFragment { source, format },
			Self::SyntaxTree { source } => Request::GetAbstractSyntaxTree { source },
			Self::DebugSyntaxTree { source } => Request::GetDebugAbstractSyntaxTree { source },
			Self::StructuredOutput { source } => Request::GetStructuredOutput { source },
		}
	}
}

/// Result of one evaluation as seen by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
	Success(RenderOutput),
	/// A result exists but must not be shown.
	Invalidated,
	Failure(Failure),
}

impl EvaluationOutcome {
	/// Short label for logs.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Success(_) => "success",
			Self::Invalidated => "invalidated",
			Self::Failure(failure) => failure.kind(),
		}
	}
}

/// Why an evaluation did not produce output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
	/// A dependency is still loading; retried.
	NotReady { detail: String },
	/// The source failed to evaluate; a displayable terminal state.
	Evaluation(Vec<Diagnostic>),
	/// The worker was unreachable or broke the protocol.
	Transport { detail: String },
}

impl Failure {
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::NotReady { .. } => "not_ready",
			Self::Evaluation(_) => "evaluation",
			Self::Transport { .. } => "transport",
		}
	}
}
