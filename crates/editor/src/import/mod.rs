//! Multi-file bundle import.
//!
//! A bundle is fetched as one unit, then [`resolve_bundle`] picks the entry
//! document by file name alone and hands every other member to a sink. The
//! sink is usually [`crate::SessionHandle::forward_file`], which buffers the
//! files until the evaluator's tree is reachable.

mod gist;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

pub use self::gist::{GistSource, gist_id};
use crate::config::ImportConfig;

/// Recognized document extension, matched case-insensitively.
pub const DOCUMENT_EXTENSION: &str = ".mdm";
/// Entry document name in multi-file bundles, matched case-insensitively.
pub const ENTRY_NAME: &str = "main.mdm";

pub const NO_FILES: &str = "No files found in Gist";
pub const NO_DOCUMENT: &str = "No .mdm file found";
pub const NO_ENTRY: &str = "Gist contains multiple files but none named main.mdm";

/// File name to raw content.
pub type ImportBundle = BTreeMap<String, Vec<u8>>;

/// Fetching a bundle failed.
#[derive(Debug, Error)]
pub enum ImportError {
	#[error("invalid bundle identifier: {0:?}")]
	InvalidId(String),
	#[error("invalid import API base: {0}")]
	InvalidBase(String),
	#[error("request to {url} failed with status {status}")]
	Status { url: String, status: u16 },
	#[error("network error: {0}")]
	Network(String),
	#[error("invalid bundle payload: {0}")]
	Decode(String),
}

/// What a bundle resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
	/// Text of the chosen entry document.
	Entry(String),
	/// The bundle did not have the expected shape.
	Diagnostic(&'static str),
}

impl Resolution {
	/// Text to show as the document; diagnostics stand in for content.
	pub fn into_text(self) -> String {
		match self {
			Self::Entry(text) => text,
			Self::Diagnostic(message) => message.to_string(),
		}
	}

	pub fn is_entry(&self) -> bool {
		matches!(self, Self::Entry(_))
	}
}

fn is_document(name: &str) -> bool {
	name.len() > DOCUMENT_EXTENSION.len()
		&& name.is_char_boundary(name.len() - DOCUMENT_EXTENSION.len())
		&& name[name.len() - DOCUMENT_EXTENSION.len()..].eq_ignore_ascii_case(DOCUMENT_EXTENSION)
}

fn decode(bytes: Vec<u8>) -> String {
	match String::from_utf8(bytes) {
		Ok(text) => text,
		Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
	}
}

/// Picks the entry document of `bundle`.
///
/// * no members: [`NO_FILES`]
/// * one member: it is the entry if it is a document, else [`NO_DOCUMENT`]
/// * several: the member named [`ENTRY_NAME`] is the entry, else [`NO_ENTRY`];
///   every other member goes to `sink` in name order either way
pub fn resolve_bundle(bundle: ImportBundle, mut sink: impl FnMut(String, Vec<u8>)) -> Resolution {
	let members = bundle.len();
	let resolution = match members {
		0 => Resolution::Diagnostic(NO_FILES),
		1 => match bundle.into_iter().next() {
			Some((name, bytes)) if is_document(&name) => Resolution::Entry(decode(bytes)),
			_ => Resolution::Diagnostic(NO_DOCUMENT),
		},
		_ => {
			let mut entry = None;
			for (name, bytes) in bundle {
				if entry.is_none() && name.eq_ignore_ascii_case(ENTRY_NAME) {
					entry = Some(bytes);
					continue;
				}
				sink(name, bytes);
			}
			entry.map_or(Resolution::Diagnostic(NO_ENTRY), |bytes| Resolution::Entry(decode(bytes)))
		}
	};
	debug!(members, entry = resolution.is_entry(), "import.resolve");
	resolution
}

/// Where bundles come from.
#[async_trait]
pub trait BundleSource: Send + Sync {
	async fn fetch(&self, id: &str) -> Result<ImportBundle, ImportError>;
}

/// Fetches bundles and resolves their entry document.
#[derive(Clone)]
pub struct ImportBundleResolver {
	source: Arc<dyn BundleSource>,
}

impl std::fmt::Debug for ImportBundleResolver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ImportBundleResolver").finish_non_exhaustive()
	}
}

impl ImportBundleResolver {
	pub fn new(source: Arc<dyn BundleSource>) -> Self {
		Self { source }
	}

	/// Resolver backed by the configured Gist API.
	pub fn from_config(config: &ImportConfig) -> Result<Self, ImportError> {
		Ok(Self::new(Arc::new(GistSource::new(config)?)))
	}

	/// Fetches bundle `id` and resolves it. Fetch failures propagate;
	/// shape problems come back as [`Resolution::Diagnostic`].
	pub async fn resolve(&self, id: &str, sink: impl FnMut(String, Vec<u8>)) -> Result<Resolution, ImportError> {
		let bundle = self.source.fetch(id).await?;
		Ok(resolve_bundle(bundle, sink))
	}
}
