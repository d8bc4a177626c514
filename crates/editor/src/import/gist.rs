//! Gist-compatible HTTP bundle source.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use super::{BundleSource, ImportBundle, ImportError};
use crate::config::ImportConfig;

const GIST_MEDIA_TYPE: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
pub(super) struct GistPayload {
	pub files: BTreeMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GistFile {
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub truncated: bool,
	#[serde(default)]
	pub raw_url: Option<String>,
}

pub(super) fn parse_gist(body: &[u8]) -> Result<GistPayload, ImportError> {
	serde_json::from_slice(body).map_err(|e| ImportError::Decode(e.to_string()))
}

/// Extracts a gist id from a bare id or a gist page URL.
pub fn gist_id(input: &str) -> Result<String, ImportError> {
	let input = input.trim();
	let candidate = match Url::parse(input) {
		Ok(url) => url
			.path_segments()
			.and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
			.map(str::to_string)
			.unwrap_or_default(),
		Err(_) => input.to_string(),
	};
	if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_alphanumeric()) {
		return Err(ImportError::InvalidId(input.to_string()));
	}
	Ok(candidate)
}

/// Fetches bundles from `{api_base}/gists/{id}`.
#[derive(Debug, Clone)]
pub struct GistSource {
	client: Client,
	api_base: Url,
	timeout: Duration,
}

impl GistSource {
	pub fn new(config: &ImportConfig) -> Result<Self, ImportError> {
		let api_base = Url::parse(&config.api_base).map_err(|e| ImportError::InvalidBase(e.to_string()))?;
		if api_base.cannot_be_a_base() {
			return Err(ImportError::InvalidBase(config.api_base.clone()));
		}
		let client = Client::builder()
			.user_agent(config.user_agent.as_str())
			.build()
			.map_err(|e| ImportError::Network(e.to_string()))?;
		Ok(Self {
			client,
			api_base,
			timeout: config.timeout(),
		})
	}

	/// API URL for gist `id` (a bare id or a gist page URL).
	pub fn gist_url(&self, id: &str) -> Result<Url, ImportError> {
		let id = gist_id(id)?;
		let mut url = self.api_base.clone();
		url.path_segments_mut()
			.map_err(|()| ImportError::InvalidBase(self.api_base.to_string()))?
			.pop_if_empty()
			.push("gists")
			.push(&id);
		Ok(url)
	}

	async fn get(&self, url: &str) -> Result<Vec<u8>, ImportError> {
		let response = self
			.client
			.get(url)
			.header(ACCEPT, GIST_MEDIA_TYPE)
			.timeout(self.timeout)
			.send()
			.await
			.map_err(|e| ImportError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			return Err(ImportError::Status {
				url: url.to_string(),
				status: status.as_u16(),
			});
		}

		let body = response.bytes().await.map_err(|e| ImportError::Network(e.to_string()))?;
		Ok(body.to_vec())
	}
}

#[async_trait]
impl BundleSource for GistSource {
	async fn fetch(&self, id: &str) -> Result<ImportBundle, ImportError> {
		let url = self.gist_url(id)?;
		debug!(%url, "import.gist.fetch");
		let payload = parse_gist(&self.get(url.as_str()).await?)?;

		let mut bundle = ImportBundle::new();
		for (name, file) in payload.files {
			let bytes = match (file.content, file.truncated, file.raw_url) {
				(Some(content), false, _) => content.into_bytes(),
				(_, _, Some(raw_url)) => {
					trace!(file = %name, %raw_url, "import.gist.fetch_raw");
					self.get(&raw_url).await?
				}
				(_, _, None) => return Err(ImportError::Decode(format!("file {name:?} has no content"))),
			};
			bundle.insert(name, bytes);
		}
		debug!(files = bundle.len(), "import.gist.fetched");
		Ok(bundle)
	}
}
