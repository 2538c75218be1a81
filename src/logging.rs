//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("worker attached");
//! debug!("dispatching {}", cmd);
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs always go to stderr: a worker's stdout may be the protocol stream
/// itself. Control the level with `RUST_LOG`:
///
/// ```bash
/// RUST_LOG=debug workr serve /srv/data
/// RUST_LOG=workr::worker=trace workr serve /srv/data
/// ```
pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();
}
