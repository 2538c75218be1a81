//! Resource locations
//!
//! Operations address resources with `scheme://[user@]host[:port]/path`
//! strings. A bare path is shorthand for the `file` scheme. The worker
//! only needs the components split apart; it never resolves or rewrites
//! locations itself.

use crate::error::{ErrorCode, WorkerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUrl {
	pub scheme: String,
	pub user: Option<String>,
	pub host: Option<String>,
	pub port: Option<u16>,
	pub path: String,
}

impl ResourceUrl {
	pub fn parse(location: &str) -> Result<Self, WorkerError> {
		let malformed = || WorkerError::new(ErrorCode::MalformedUrl, location);

		if location.is_empty() {
			return Err(malformed());
		}

		let (scheme, rest) = match location.find("://") {
			Some(pos) => {
				let scheme = &location[..pos];
				if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-') {
					return Err(malformed());
				}
				(scheme.to_string(), &location[pos + 3..])
			}
			// No scheme: treat the whole string as a local path.
			None => return Ok(Self {
				scheme: "file".to_string(),
				user: None,
				host: None,
				port: None,
				path: location.to_string(),
			}),
		};

		let (authority, path) = match rest.find('/') {
			Some(pos) => (&rest[..pos], rest[pos..].to_string()),
			None => (rest, String::from("/")),
		};

		if authority.is_empty() {
			return Ok(Self { scheme, user: None, host: None, port: None, path });
		}

		let (user, host_port) = match authority.find('@') {
			Some(pos) => (Some(authority[..pos].to_string()), &authority[pos + 1..]),
			None => (None, authority),
		};

		let (host, port) = match host_port.find(':') {
			Some(pos) => {
				let port = host_port[pos + 1..].parse::<u16>().map_err(|_| malformed())?;
				(host_port[..pos].to_string(), Some(port))
			}
			None => (host_port.to_string(), None),
		};

		if host.is_empty() {
			return Err(malformed());
		}

		Ok(Self { scheme, user, host: Some(host), port, path })
	}

	/// The path component, for workers that map resources onto a filesystem.
	pub fn file_path(&self) -> &str {
		&self.path
	}
}

impl std::fmt::Display for ResourceUrl {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}://", self.scheme)?;
		if let Some(user) = &self.user {
			write!(f, "{}@", user)?;
		}
		if let Some(host) = &self.host {
			write!(f, "{}", host)?;
		}
		if let Some(port) = self.port {
			write!(f, ":{}", port)?;
		}
		write!(f, "{}", self.path)
	}
}


// vim: ts=4
