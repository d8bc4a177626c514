//! Error types for evaluator calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::Method;
use crate::types::Diagnostic;

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Client-side failure of one call.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum Error {
	/// The worker has not finished `initialize`; the call never left the client.
	#[error("evaluator is not initialized")]
	NotInitialized,
	/// The worker thread is gone and dropped the reply slot.
	#[error("evaluator service stopped")]
	ServiceStopped,
	/// The worker handled the call and reported a failure.
	#[error(transparent)]
	Remote(#[from] RemoteError),
	/// The worker answered with a payload shape that does not belong to the method.
	#[error("unexpected response to {method}")]
	UnexpectedResponse {
		/// The method that was called.
		method: Method,
	},
}

/// Failure reported by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RemoteError {
	/// A dependency is still being fetched; the call may succeed later.
	#[error("evaluator not ready: {detail}")]
	NotReady {
		/// What the evaluator is waiting for.
		detail: String,
	},
	/// The source failed to evaluate.
	#[error("evaluation failed with {} error(s)", .0.len())]
	Evaluation(Vec<Diagnostic>),
	/// A file-system call failed.
	#[error("{kind}: {path}")]
	FileSystem {
		/// Failure classification.
		kind: FsErrorKind,
		/// The path the call was addressed to.
		path: String,
	},
	/// The worker threw while handling the call.
	#[error("evaluator internal error: {0}")]
	Internal(String),
}

impl RemoteError {
	pub fn fs(kind: FsErrorKind, path: impl Into<String>) -> Self {
		Self::FileSystem { kind, path: path.into() }
	}
}

/// Classification of a failed file-system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FsErrorKind {
	NotFound,
	AlreadyExists,
	NotADirectory,
	IsADirectory,
	InvalidPath,
}

impl FsErrorKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::NotFound => "not found",
			Self::AlreadyExists => "already exists",
			Self::NotADirectory => "not a directory",
			Self::IsADirectory => "is a directory",
			Self::InvalidPath => "invalid path",
		}
	}
}

impl std::fmt::Display for FsErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
