use std::{
	io,
	path::{Path, PathBuf},
	time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::SweepPolicy;

const APP_DIR: &str = "housing-sync";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	Read { path: PathBuf, source: io::Error },

	#[error("invalid config file: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("invalid config: {0}")]
	Invalid(String),

	#[error("no data directory available on this platform")]
	NoDataDir,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
	pub remote: RemoteConfig,
	pub poller: PollerConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
	pub base_url: String,
	pub port: Option<u16>,
	pub timeout_secs: u64,
}

impl Default for RemoteConfig {
	fn default() -> Self {
		Self { base_url: "http://localhost".into(), port: None, timeout_secs: 30 }
	}
}

impl RemoteConfig {
	/// `base_url` with the optional port appended and no trailing slash.
	pub fn base(&self) -> String {
		let base = self.base_url.trim_end_matches('/');
		match self.port {
			Some(port) => format!("{base}:{port}"),
			None => base.to_string(),
		}
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollerConfig {
	pub interval_secs: u64,
	/// Soft-delete everything when the remote answers with an empty list.
	pub sweep_on_empty: bool,
	pub snapshots_after_cycle: bool,
}

impl Default for PollerConfig {
	fn default() -> Self {
		Self { interval_secs: 300, sweep_on_empty: true, snapshots_after_cycle: true }
	}
}

impl PollerConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_secs)
	}

	pub fn policy(&self) -> SweepPolicy {
		SweepPolicy { sweep_on_empty: self.sweep_on_empty }
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
	pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
	pub dir: Option<PathBuf>,
}

impl Config {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Read `path`, falling back to defaults when the file does not exist.
	pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
		match std::fs::read_to_string(path) {
			Ok(text) => Self::from_toml_str(&text),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
			Err(source) => Err(ConfigError::Read { path: path.to_path_buf(), source }),
		}
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.remote.base_url.trim().is_empty() {
			return Err(ConfigError::Invalid("remote.base_url is empty".into()));
		}
		if self.remote.timeout_secs == 0 {
			return Err(ConfigError::Invalid("remote.timeout_secs must be positive".into()));
		}
		if self.poller.interval_secs == 0 {
			return Err(ConfigError::Invalid("poller.interval_secs must be positive".into()));
		}
		Ok(())
	}

	pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
		match &self.database.path {
			Some(path) => Ok(path.clone()),
			None => Ok(data_dir()?.join("housing.db")),
		}
	}
}

/// `<platform data dir>/housing-sync`
pub fn data_dir() -> Result<PathBuf, ConfigError> {
	dirs::data_dir().map(|d| d.join(APP_DIR)).ok_or(ConfigError::NoDataDir)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
	Ok(data_dir()?.join("config.toml"))
}
