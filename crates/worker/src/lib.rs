//! Evaluator host and task spawning primitives.
//!
//! The evaluator is a heavyweight, opaque collaborator. This crate runs it on
//! a single dedicated thread behind an [`mdm_rpc::EvaluatorChannel`], together
//! with the file tree it reads from.

mod class;
pub mod evaluator;
pub mod fs;
pub mod host;
mod spawn;

pub use class::TaskClass;
pub use evaluator::{EvalResult, Evaluator};
pub use fs::{FileSystem, MemoryFileSystem};
pub use host::{InstallError, install, installed, spawn_evaluator};
pub use spawn::{spawn, spawn_blocking, spawn_named_thread};
