//! Worker configuration
//!
//! Built-in defaults, optionally overridden by a TOML file, optionally
//! overridden per job through incoming metadata (the typed accessors on
//! the worker consult metadata first and fall back here).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

/// Seconds to wait for a remote host connection.
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 20;
/// Seconds to wait for a proxy connection.
pub const DEFAULT_PROXY_CONNECT_TIMEOUT: u64 = 10;
/// Seconds to wait for the first reply to a request.
pub const DEFAULT_RESPONSE_TIMEOUT: u64 = 600;
/// Seconds to wait for subsequent data.
pub const DEFAULT_READ_TIMEOUT: u64 = 15;

/// Entries buffered before a listing batch is flushed.
pub const DEFAULT_LIST_BATCH_ENTRIES: usize = 200;
/// Milliseconds a buffered listing entry may age before a flush.
pub const DEFAULT_LIST_BATCH_AGE_MS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkerConfig {
	pub connect_timeout: u64,
	pub proxy_connect_timeout: u64,
	pub response_timeout: u64,
	pub read_timeout: u64,

	/// Listing batch size threshold. Tuned to balance per-message overhead
	/// against the latency of the first entries reaching the job.
	pub list_batch_entries: usize,
	pub list_batch_age_ms: u64,
}

impl Default for WorkerConfig {
	fn default() -> Self {
		Self {
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			proxy_connect_timeout: DEFAULT_PROXY_CONNECT_TIMEOUT,
			response_timeout: DEFAULT_RESPONSE_TIMEOUT,
			read_timeout: DEFAULT_READ_TIMEOUT,
			list_batch_entries: DEFAULT_LIST_BATCH_ENTRIES,
			list_batch_age_ms: DEFAULT_LIST_BATCH_AGE_MS,
		}
	}
}

impl WorkerConfig {
	/// Load configuration from a TOML file, keeping defaults for absent keys.
	pub fn from_toml_file(path: &Path) -> Result<Self, Box<dyn Error>> {
		let raw = std::fs::read_to_string(path)
			.map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
		let config = toml::from_str(&raw)
			.map_err(|e| format!("cannot parse config {}: {}", path.display(), e))?;
		Ok(config)
	}
}


// vim: ts=4
