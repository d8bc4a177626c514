//! Typed request/response channel to the mdm evaluator worker.
//!
//! This crate defines everything that crosses the evaluator boundary:
//! * `Request` / `Response`: one variant per evaluator method
//! * `EvaluatorChannel`: method-call semantics over message passing, gated on readiness
//! * `path`: path-string marshaling for the worker's file tree
//! * payload types shared by both sides (`RenderOutput`, `DirEntry`, `PackageDescriptor`)

pub mod channel;
pub mod error;
pub mod path;
pub mod protocol;
pub mod types;

pub use channel::{ContextGuard, EvaluatorChannel, Inbox};
pub use error::{Error, FsErrorKind, RemoteError, Result};
pub use protocol::{Envelope, Method, Reply, Request, Response, SequenceCounter};
pub use types::{ArgumentDescriptor, Diagnostic, DirEntry, PackageDescriptor, RenderOutput, TransformDescriptor, VariableDescriptor};
