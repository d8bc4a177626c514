//! Editor configuration loaded from TOML.
//!
//! Every field has a default, so an empty document (or no file at all) yields
//! a working configuration:
//!
//! ```toml
//! [coordinator]
//! debounce_ms = 300
//! retry_delay_ms = 200
//! # max_not_ready_retries = 50   # absent: retry until ready
//! pending_file_capacity = 256
//! default_format = "html"
//!
//! [import]
//! api_base = "https://api.github.com"
//! timeout_secs = 30
//!
//! [storage]
//! # dir = "/path/to/state"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid value for {field}: {reason}")]
	Invalid {
		field: &'static str,
		reason: String,
	},
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
	pub coordinator: CoordinatorConfig,
	pub import: ImportConfig,
	pub storage: StorageConfig,
}

impl EditorConfig {
	/// Parses configuration from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a configuration file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.coordinator.pending_file_capacity == 0 {
			return Err(ConfigError::Invalid {
				field: "coordinator.pending_file_capacity",
				reason: "must be at least 1".into(),
			});
		}
		if self.coordinator.default_format.trim().is_empty() {
			return Err(ConfigError::Invalid {
				field: "coordinator.default_format",
				reason: "must not be empty".into(),
			});
		}
		if let Err(e) = url::Url::parse(&self.import.api_base) {
			return Err(ConfigError::Invalid {
				field: "import.api_base",
				reason: e.to_string(),
			});
		}
		Ok(())
	}
}

/// Timing and limits of the request coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
	/// Quiet period after incidental typing before an evaluation is issued.
	pub debounce_ms: u64,
	/// Delay before re-issuing a request the evaluator was not ready for.
	pub retry_delay_ms: u64,
	/// Upper bound on consecutive not-ready retries; `None` retries until ready.
	pub max_not_ready_retries: Option<u32>,
	/// Capacity of the queue holding imported files until the evaluator is ready.
	pub pending_file_capacity: usize,
	/// Output format used when a request names none.
	pub default_format: String,
}

impl Default for CoordinatorConfig {
	fn default() -> Self {
		Self {
			debounce_ms: 300,
			retry_delay_ms: 200,
			max_not_ready_retries: None,
			pending_file_capacity: 256,
			default_format: "html".to_string(),
		}
	}
}

impl CoordinatorConfig {
	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}
}

/// Remote bundle import settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
	/// Base URL of the Gist-compatible API.
	pub api_base: String,
	pub timeout_secs: u64,
	pub user_agent: String,
}

impl Default for ImportConfig {
	fn default() -> Self {
		Self {
			api_base: "https://api.github.com".to_string(),
			timeout_secs: 30,
			user_agent: concat!("mdm-editor/", env!("CARGO_PKG_VERSION")).to_string(),
		}
	}
}

impl ImportConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

/// Local persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
	/// Directory for persisted state; defaults to the platform data directory.
	pub dir: Option<PathBuf>,
}

impl StorageConfig {
	/// Resolved storage directory, if one can be determined.
	pub fn resolve_dir(&self) -> Option<PathBuf> {
		self.dir.clone().or_else(|| dirs::data_dir().map(|dir| dir.join("mdm")))
	}
}
