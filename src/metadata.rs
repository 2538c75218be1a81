//! Metadata maps exchanged between job and worker
//!
//! Two independent string maps. The *incoming* map is replaced whenever
//! the job pushes metadata ahead of a command and is read-only to
//! handlers; the job uses it both for per-operation knobs (`recurse`,
//! `statDetails`, `resume`) and for configuration (timeouts). The
//! *outgoing* map collects what handlers want the job to see and is
//! transmitted at a flush checkpoint.
//!
//! Whether a flush clears the outgoing map is an explicit parameter: a
//! worker held in the pool and later attached to a different job must not
//! leak stale metadata into the new job, so the normal flush clears.
//! `FlushMode::Keep` exists for metadata produced before the worker is
//! bound to its eventual job, which must still be visible to the next
//! dispatch.

use std::collections::BTreeMap;

/// What happens to the outgoing map after a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
	Clear,
	Keep,
}

#[derive(Debug, Default)]
pub struct MetaDataStore {
	incoming: BTreeMap<String, String>,
	outgoing: BTreeMap<String, String>,
}

impl MetaDataStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace the incoming map with the job-supplied one.
	pub fn set_incoming(&mut self, map: BTreeMap<String, String>) {
		self.incoming = map;
	}

	pub fn has(&self, key: &str) -> bool {
		self.incoming.contains_key(key)
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.incoming.get(key).map(|s| s.as_str())
	}

	pub fn all(&self) -> &BTreeMap<String, String> {
		&self.incoming
	}

	/// Queue a key for the next outgoing flush.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.outgoing.insert(key.into(), value.into());
	}

	pub fn outgoing_is_empty(&self) -> bool {
		self.outgoing.is_empty()
	}

	/// Hand out the outgoing map for transmission. `Clear` leaves the map
	/// empty, `Keep` leaves it intact for a later flush.
	pub fn take_outgoing(&mut self, mode: FlushMode) -> BTreeMap<String, String> {
		match mode {
			FlushMode::Clear => std::mem::take(&mut self.outgoing),
			FlushMode::Keep => self.outgoing.clone(),
		}
	}

	/// Drop queued outgoing metadata without sending it.
	pub fn discard_outgoing(&mut self) {
		self.outgoing.clear();
	}

	//////////////////////////
	// Typed config lookups //
	//////////////////////////

	pub fn config_bool(&self, key: &str, default: bool) -> bool {
		match self.get(key) {
			Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
				"true" | "1" | "yes" | "on" => true,
				"false" | "0" | "no" | "off" => false,
				_ => default,
			},
			None => default,
		}
	}

	pub fn config_int(&self, key: &str, default: i64) -> i64 {
		self.get(key).and_then(|raw| raw.trim().parse::<i64>().ok()).unwrap_or(default)
	}

	pub fn config_str(&self, key: &str, default: &str) -> String {
		self.get(key).unwrap_or(default).to_string()
	}
}


// vim: ts=4
