#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Editor-side engine for continuous evaluation against the mdm evaluator.
//!
//! # Main Types
//!
//! - [`RequestCoordinator`] - Debounce, staleness and retry state machine for one evaluation slot
//! - [`EditorSession`] / [`SessionHandle`] - Async driver that runs the coordinator against an [`mdm_rpc::EvaluatorChannel`]
//! - [`FileSystemProxy`] / [`FileBrowser`] - Access to the evaluator's virtual file tree
//! - [`ImportBundleResolver`] - Fetches multi-file bundles and picks their entry document
//!
//! # Architecture
//!
//! ```text
//! UI ──commands──▶ SessionHandle ──▶ EditorSession task
//!                                      ├── RequestCoordinator   (pure, clock injected)
//!                                      └── spawned calls ──▶ EvaluatorChannel ──▶ worker thread
//! UI ──▶ FileBrowser ──▶ FileSystemProxy ──▶ EvaluatorChannel
//! ImportBundleResolver ──sink──▶ SessionHandle::forward_file
//! ```

pub mod config;
pub mod coordinator;
pub mod import;
pub mod packages;
pub mod session;
pub mod storage;
pub mod vfs;

pub use config::{ConfigError, CoordinatorConfig, EditorConfig, ImportConfig, StorageConfig};
pub use coordinator::{EvaluationMode, EvaluationOutcome, EvaluationRequest, EvaluationView, RequestCoordinator};
pub use import::{BundleSource, GistSource, ImportBundle, ImportBundleResolver, ImportError, Resolution, resolve_bundle};
pub use packages::PackageCache;
pub use session::{EditorSession, SessionClosed, SessionCommand, SessionHandle};
pub use storage::{DocumentStore, FileStore, MemoryStore, StorageError};
pub use vfs::{FileBrowser, FileSystemError, FileSystemProxy, WorkingDirectory};
