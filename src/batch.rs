//! Entry batching for directory listings
//!
//! One message per entry is prohibitively chatty for large directories;
//! buffering everything delays the first results and risks unbounded
//! memory. The batcher flushes on whichever of two thresholds trips
//! first: the buffer reaching `max_entries`, or the oldest buffered entry
//! exceeding `max_age`. The final partial batch is drained by the
//! dispatch loop when the listing handler completes, never by the batcher
//! itself: the protocol requires every listDir to end with an explicit
//! completion signal regardless of batch boundaries.

use std::time::{Duration, Instant};

use crate::config::{DEFAULT_LIST_BATCH_AGE_MS, DEFAULT_LIST_BATCH_ENTRIES};
use crate::entry::UdsEntry;

#[derive(Debug)]
pub struct EntryBatcher {
	buf: Vec<UdsEntry>,
	max_entries: usize,
	max_age: Duration,
	oldest: Option<Instant>,
}

impl Default for EntryBatcher {
	fn default() -> Self {
		Self::new(DEFAULT_LIST_BATCH_ENTRIES, Duration::from_millis(DEFAULT_LIST_BATCH_AGE_MS))
	}
}

impl EntryBatcher {
	pub fn new(max_entries: usize, max_age: Duration) -> Self {
		Self { buf: Vec::new(), max_entries: max_entries.max(1), max_age, oldest: None }
	}

	/// Buffer an entry. Returns a full batch when a threshold trips.
	pub fn push(&mut self, entry: UdsEntry) -> Option<Vec<UdsEntry>> {
		if self.buf.is_empty() {
			self.oldest = Some(Instant::now());
		}
		self.buf.push(entry);

		let aged = self.oldest.map(|t| t.elapsed() >= self.max_age).unwrap_or(false);
		if self.buf.len() >= self.max_entries || aged {
			self.oldest = None;
			Some(std::mem::take(&mut self.buf))
		} else {
			None
		}
	}

	/// Drain the final partial batch, if any.
	pub fn take(&mut self) -> Option<Vec<UdsEntry>> {
		self.oldest = None;
		if self.buf.is_empty() {
			None
		} else {
			Some(std::mem::take(&mut self.buf))
		}
	}

	pub fn len(&self) -> usize {
		self.buf.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}
}


// vim: ts=4
