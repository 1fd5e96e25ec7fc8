//! Configuration for filegate
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (`.toml`, or `.json`/`.json5`)
//! 3. Environment variables (FILEGATE_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "FILEGATE_";

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// ENDPOINTS
	// ========================================================================
	/// `host:port` of the TCP file store
	pub server_addr: String,

	/// Address the HTTP gateway listens on
	pub gateway_bind: String,

	/// Path prefix of every gateway route
	pub api_prefix: String,

	// ========================================================================
	// TRANSFER
	// ========================================================================
	/// Bytes per chunk for streaming, upload and ranged download
	pub chunk_size: u64,

	/// Concurrent chunk uploads
	pub max_concurrency: usize,

	/// Concurrent ranged downloads
	pub download_concurrency: usize,

	// ========================================================================
	// LISTING
	// ========================================================================
	/// Deadline for each per-entry STAT while listing
	pub stat_timeout_ms: u64,

	/// STATs in flight while listing
	pub list_stat_concurrency: usize,

	// ========================================================================
	// TIMEOUTS & LIMITS
	// ========================================================================
	pub connect_timeout_ms: u64,

	/// Per-command deadline (0 = none)
	pub command_timeout_ms: u64,

	/// Request timeout of the HTTP client
	pub http_timeout_ms: u64,

	/// Largest payload accepted from the store
	pub max_frame_bytes: u64,

	/// Largest PATCH body accepted by the gateway
	pub max_write_bytes: usize,

	// ========================================================================
	// SIZE CACHE
	// ========================================================================
	/// Entries kept (0 disables the cache)
	pub size_cache_capacity: usize,

	pub size_cache_ttl_ms: u64,

	// ========================================================================
	// TRACING & LOGGING
	// ========================================================================
	/// Announce a trace id on every store connection
	pub send_trace: bool,

	pub trace_prefix: String,

	/// Log level (trace, debug, info, warn, error)
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			// Endpoints
			server_addr: "127.0.0.1:9090".to_string(),
			gateway_bind: "127.0.0.1:3000".to_string(),
			api_prefix: "/api".to_string(),

			// Transfer
			chunk_size: 256 * 1024,
			max_concurrency: 4,
			download_concurrency: 6,

			// Listing
			stat_timeout_ms: 2000,
			list_stat_concurrency: 16,

			// Timeouts
			connect_timeout_ms: 5000,
			command_timeout_ms: 30_000,
			http_timeout_ms: 60_000,
			max_frame_bytes: 64 * 1024 * 1024,
			max_write_bytes: 20 * 1024 * 1024,

			// Cache
			size_cache_capacity: 1024,
			size_cache_ttl_ms: 5000,

			// Tracing
			send_trace: true,
			trace_prefix: "filegate".to_string(),
			log_level: "info".to_string(),
		}
	}
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	Io { path: PathBuf, source: std::io::Error },
	/// Config file content is not valid for its format
	Parse { path: PathBuf, message: String },
	/// Environment variable holds an unusable value
	Env { key: String, value: String },
	/// A setting is out of range
	Invalid(String),
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Io { path, source } => {
				write!(f, "Cannot read config {}: {}", path.display(), source)
			}
			ConfigError::Parse { path, message } => {
				write!(f, "Invalid config {}: {}", path.display(), message)
			}
			ConfigError::Env { key, value } => write!(f, "Invalid value {:?} for {}", value, key),
			ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
		}
	}
}

impl std::error::Error for ConfigError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ConfigError::Io { source, .. } => Some(source),
			_ => None,
		}
	}
}

// ============================================================================
// LOADING
// ============================================================================

impl Config {
	/// Defaults, overlaid by an optional file, then by the environment
	pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
		let mut config = match path {
			Some(path) => Config::from_file(path)?,
			None => Config::default(),
		};
		config.apply_env(std::env::vars())?;
		config.validate()?;
		Ok(config)
	}

	/// Parse a config file; `.toml` uses TOML, anything else JSON5
	pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
		let text = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
		let parse_err = |message: String| ConfigError::Parse { path: path.to_path_buf(), message };
		match path.extension().and_then(|e| e.to_str()) {
			Some("toml") => toml::from_str(&text).map_err(|e| parse_err(e.to_string())),
			_ => json5::from_str(&text).map_err(|e| parse_err(e.to_string())),
		}
	}

	/// Apply `FILEGATE_*` overrides from an iterator of variables
	pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		for (key, value) in vars {
			let Some(name) = key.strip_prefix(ENV_PREFIX) else {
				continue;
			};
			let bad = || ConfigError::Env { key: key.clone(), value: value.clone() };
			match name {
				"SERVER_ADDR" => self.server_addr = value.clone(),
				"GATEWAY_BIND" => self.gateway_bind = value.clone(),
				"API_PREFIX" => self.api_prefix = value.clone(),
				"CHUNK_SIZE" => self.chunk_size = value.parse().map_err(|_| bad())?,
				"MAX_CONCURRENCY" => self.max_concurrency = value.parse().map_err(|_| bad())?,
				"DOWNLOAD_CONCURRENCY" => {
					self.download_concurrency = value.parse().map_err(|_| bad())?
				}
				"STAT_TIMEOUT_MS" => self.stat_timeout_ms = value.parse().map_err(|_| bad())?,
				"LIST_STAT_CONCURRENCY" => {
					self.list_stat_concurrency = value.parse().map_err(|_| bad())?
				}
				"CONNECT_TIMEOUT_MS" => self.connect_timeout_ms = value.parse().map_err(|_| bad())?,
				"COMMAND_TIMEOUT_MS" => self.command_timeout_ms = value.parse().map_err(|_| bad())?,
				"HTTP_TIMEOUT_MS" => self.http_timeout_ms = value.parse().map_err(|_| bad())?,
				"MAX_FRAME_BYTES" => self.max_frame_bytes = value.parse().map_err(|_| bad())?,
				"MAX_WRITE_BYTES" => self.max_write_bytes = value.parse().map_err(|_| bad())?,
				"SIZE_CACHE_CAPACITY" => {
					self.size_cache_capacity = value.parse().map_err(|_| bad())?
				}
				"SIZE_CACHE_TTL_MS" => self.size_cache_ttl_ms = value.parse().map_err(|_| bad())?,
				"SEND_TRACE" => self.send_trace = parse_bool(&value).ok_or_else(bad)?,
				"TRACE_PREFIX" => self.trace_prefix = value.clone(),
				"LOG_LEVEL" => self.log_level = value.clone(),
				_ => {}
			}
		}
		Ok(())
	}

	/// Reject settings the transfer and protocol layers cannot work with
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.server_addr.trim().is_empty() {
			return Err(ConfigError::Invalid("serverAddr must not be empty".to_string()));
		}
		if self.chunk_size == 0 {
			return Err(ConfigError::Invalid("chunkSize must be greater than 0".to_string()));
		}
		if self.chunk_size > self.max_frame_bytes {
			return Err(ConfigError::Invalid(format!(
				"chunkSize {} exceeds maxFrameBytes {}",
				self.chunk_size, self.max_frame_bytes
			)));
		}
		// Every chunk of an upload goes through the gateway as one PATCH body
		if self.chunk_size > self.max_write_bytes as u64 {
			return Err(ConfigError::Invalid(format!(
				"chunkSize {} exceeds maxWriteBytes {}",
				self.chunk_size, self.max_write_bytes
			)));
		}
		for (key, value) in [
			("maxConcurrency", self.max_concurrency),
			("downloadConcurrency", self.download_concurrency),
			("listStatConcurrency", self.list_stat_concurrency),
		] {
			if value == 0 {
				return Err(ConfigError::Invalid(format!("{} must be greater than 0", key)));
			}
		}
		if !self.api_prefix.starts_with('/') {
			return Err(ConfigError::Invalid(format!(
				"apiPrefix must start with '/', got {:?}",
				self.api_prefix
			)));
		}
		Ok(())
	}
}

fn parse_bool(value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
		pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
	}

	#[test]
	fn test_config_default() {
		let config = Config::default();
		assert_eq!(config.chunk_size, 262_144);
		assert_eq!(config.max_concurrency, 4);
		assert_eq!(config.download_concurrency, 6);
		assert_eq!(config.stat_timeout_ms, 2000);
		assert_eq!(config.api_prefix, "/api");
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_toml_file_overrides_defaults() {
		let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		writeln!(file, "serverAddr = \"10.0.0.2:7000\"\nchunkSize = 65536").unwrap();
		let config = Config::from_file(file.path()).unwrap();
		assert_eq!(config.server_addr, "10.0.0.2:7000");
		assert_eq!(config.chunk_size, 65536);
		assert_eq!(config.max_concurrency, 4);
	}

	#[test]
	fn test_json5_file() {
		let mut file = tempfile::Builder::new().suffix(".json5").tempfile().unwrap();
		writeln!(file, "{{ downloadConcurrency: 2, // comment\n sendTrace: false }}").unwrap();
		let config = Config::from_file(file.path()).unwrap();
		assert_eq!(config.download_concurrency, 2);
		assert!(!config.send_trace);
	}

	#[test]
	fn test_bad_file() {
		let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		writeln!(file, "chunkSize = \"big\"").unwrap();
		assert!(matches!(Config::from_file(file.path()), Err(ConfigError::Parse { .. })));
		assert!(matches!(
			Config::from_file(Path::new("/nonexistent/filegate.toml")),
			Err(ConfigError::Io { .. })
		));
	}

	#[test]
	fn test_env_overrides() {
		let mut config = Config::default();
		config
			.apply_env(env(&[
				("FILEGATE_SERVER_ADDR", "store:1"),
				("FILEGATE_COMMAND_TIMEOUT_MS", "0"),
				("FILEGATE_SEND_TRACE", "off"),
				("UNRELATED", "x"),
			]))
			.unwrap();
		assert_eq!(config.server_addr, "store:1");
		assert_eq!(config.command_timeout_ms, 0);
		assert!(!config.send_trace);

		let err = config.apply_env(env(&[("FILEGATE_CHUNK_SIZE", "lots")])).unwrap_err();
		assert!(matches!(err, ConfigError::Env { .. }));
	}

	#[test]
	fn test_validate() {
		let base = Config::default();

		let mut config = base.clone();
		config.chunk_size = 0;
		assert!(config.validate().is_err());

		let mut config = base.clone();
		config.chunk_size = base.max_frame_bytes + 1;
		assert!(config.validate().is_err());

		let mut config = base.clone();
		config.max_write_bytes = 1024;
		config.chunk_size = 1025;
		assert!(config.validate().unwrap_err().to_string().contains("maxWriteBytes"));
		config.chunk_size = 1024;
		assert!(config.validate().is_ok());

		let mut config = base.clone();
		config.download_concurrency = 0;
		assert!(config.validate().unwrap_err().to_string().contains("downloadConcurrency"));

		let mut config = base.clone();
		config.api_prefix = "api".to_string();
		assert!(config.validate().is_err());

		let mut config = base;
		config.server_addr = " ".to_string();
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_config_serialization() {
		let config = Config::default();
		let json = serde_json::to_string(&config).expect("Failed to serialize");
		assert!(json.contains("\"serverAddr\""));
		let deserialized: Config = serde_json::from_str(&json).expect("Failed to deserialize");
		assert_eq!(config, deserialized);
	}
}

// vim: ts=4
