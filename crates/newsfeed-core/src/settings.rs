//! Pipeline settings
//!
//! Settings come from a TOML document and can be overridden through
//! `NEWSFEED_*` environment variables:
//!
//! ```toml
//! chunk_size = 500
//! fanout_mode = "background"
//! workers = 8
//!
//! [retry]
//! strategy = "fixed_delay"
//! delay_ms = 20
//! ```

use crate::retry::RetryStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix of the environment variables read by [`FeedSettings::with_env_overrides`]
pub const ENV_PREFIX: &str = "NEWSFEED_";

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("failed to read settings file {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("invalid value for {key}: {value:?}")]
	Env { key: String, value: String },

	#[error("invalid settings: {0}")]
	Invalid(String),
}

/// Whether fan-out runs in the request path or on background workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutMode {
	/// Fan-out completes before tweet creation returns; failures surface to the author
	#[default]
	Inline,
	/// Fan-out is queued and retried by background workers
	Background,
}

impl std::str::FromStr for FanoutMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"inline" => Ok(FanoutMode::Inline),
			"background" => Ok(FanoutMode::Background),
			other => Err(other.to_string()),
		}
	}
}

/// Settings of the fan-out engine, the feed reader and the fan-out queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
	/// Maximum number of feed rows per batch write
	pub chunk_size: usize,
	/// Retries of a single failed chunk before the fan-out is reported failed
	pub max_chunk_retries: u32,
	/// Delay between chunk retries and between queued job attempts
	pub retry: RetryStrategy,
	/// Store-level timeout of one chunk write
	pub write_timeout_ms: u64,
	/// Page size used when a read asks for 0 entries
	pub default_page_size: usize,
	/// Upper bound on the page size of a read
	pub max_page_size: usize,
	pub fanout_mode: FanoutMode,
	/// Capacity of the background job channel
	pub queue_capacity: usize,
	/// Number of background fan-out workers
	pub workers: usize,
	/// Whole-call attempts of a queued fan-out before it is dead-lettered
	pub max_job_attempts: u32,
}

impl Default for FeedSettings {
	fn default() -> Self {
		Self {
			chunk_size: 1000,
			max_chunk_retries: 3,
			retry: RetryStrategy::default(),
			write_timeout_ms: 5_000,
			default_page_size: 20,
			max_page_size: 100,
			fanout_mode: FanoutMode::Inline,
			queue_capacity: 1024,
			workers: 4,
			max_job_attempts: 3,
		}
	}
}

impl FeedSettings {
	/// Parse settings from a TOML document; missing keys keep their defaults
	///
	/// # Examples
	///
	/// ```
	/// use newsfeed_core::FeedSettings;
	///
	/// let settings = FeedSettings::from_toml_str("chunk_size = 250").unwrap();
	/// assert_eq!(settings.chunk_size, 250);
	/// assert_eq!(settings.max_page_size, 100);
	/// ```
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		let settings: FeedSettings = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Load settings from a TOML file, apply environment overrides and validate
	pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let settings: FeedSettings = toml::from_str(&source)?;
		let settings = settings.with_env_overrides()?;
		settings.validate()?;
		tracing::debug!(path = %path.display(), ?settings, "Loaded newsfeed settings");
		Ok(settings)
	}

	/// Apply `NEWSFEED_*` variables from the process environment
	pub fn with_env_overrides(self) -> Result<Self, SettingsError> {
		self.with_overrides_from(|key| std::env::var(key).ok())
	}

	/// Apply overrides from an arbitrary variable lookup
	///
	/// `lookup` receives the full variable name, e.g. `NEWSFEED_CHUNK_SIZE`.
	pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, SettingsError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &str| {
			let key = format!("{}{}", ENV_PREFIX, name);
			lookup(&key).map(|value| (key, value))
		};

		if let Some((key, value)) = read("CHUNK_SIZE") {
			self.chunk_size = parse_var(key, value)?;
		}
		if let Some((key, value)) = read("MAX_CHUNK_RETRIES") {
			self.max_chunk_retries = parse_var(key, value)?;
		}
		if let Some((key, value)) = read("WRITE_TIMEOUT_MS") {
			self.write_timeout_ms = parse_var(key, value)?;
		}
		if let Some((key, value)) = read("DEFAULT_PAGE_SIZE") {
			self.default_page_size = parse_var(key, value)?;
		}
		if let Some((key, value)) = read("MAX_PAGE_SIZE") {
			self.max_page_size = parse_var(key, value)?;
		}
		if let Some((key, value)) = read("FANOUT_MODE") {
			self.fanout_mode = parse_var(key, value)?;
		}
		if let Some((key, value)) = read("QUEUE_CAPACITY") {
			self.queue_capacity = parse_var(key, value)?;
		}
		if let Some((key, value)) = read("WORKERS") {
			self.workers = parse_var(key, value)?;
		}
		if let Some((key, value)) = read("MAX_JOB_ATTEMPTS") {
			self.max_job_attempts = parse_var(key, value)?;
		}

		Ok(self)
	}

	/// Reject settings the pipeline cannot run with
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.chunk_size == 0 {
			return Err(SettingsError::Invalid("chunk_size must be at least 1".into()));
		}
		if self.default_page_size == 0 || self.max_page_size == 0 {
			return Err(SettingsError::Invalid("page sizes must be at least 1".into()));
		}
		if self.default_page_size > self.max_page_size {
			return Err(SettingsError::Invalid(format!(
				"default_page_size ({}) exceeds max_page_size ({})",
				self.default_page_size, self.max_page_size
			)));
		}
		if self.workers == 0 || self.queue_capacity == 0 {
			return Err(SettingsError::Invalid(
				"workers and queue_capacity must be at least 1".into(),
			));
		}
		if self.max_job_attempts == 0 {
			return Err(SettingsError::Invalid("max_job_attempts must be at least 1".into()));
		}
		Ok(())
	}

	pub fn write_timeout(&self) -> Duration {
		Duration::from_millis(self.write_timeout_ms)
	}
}

fn parse_var<T: std::str::FromStr>(key: String, value: String) -> Result<T, SettingsError> {
	value
		.trim()
		.parse()
		.map_err(|_| SettingsError::Env { key, value })
}
