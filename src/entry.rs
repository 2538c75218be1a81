//! Attribute records for filesystem-like objects
//!
//! A `UdsEntry` describes one object (a file, a directory, a remote
//! resource) as a sequence of tagged fields. Workers populate whichever
//! fields they can produce cheaply for the requested detail level; the
//! consumer must tolerate missing fields. Field tags are wire-stable.

use serde::{Deserialize, Serialize};

/// Wire-stable field tags for entry attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum UdsField {
	Name = 1,
	Size = 2,
	ModificationTime = 3,
	AccessTime = 4,
	CreationTime = 5,
	FileType = 6,
	Access = 7,
	User = 8,
	Group = 9,
	LinkDest = 10,
	LocalPath = 11,
	MimeType = 12,
	IconName = 13,
	Url = 14,
	DisplayName = 15,
}

/// A field value; whether a field carries a number or text is fixed per tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UdsValue {
	Num(i64),
	Text(String),
}

/// One attribute record. Field order is insertion order; a tag appears at
/// most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdsEntry {
	fields: Vec<(u32, UdsValue)>,
}

impl UdsEntry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace a field.
	pub fn insert(&mut self, field: UdsField, value: UdsValue) {
		let tag = field as u32;
		match self.fields.iter_mut().find(|(t, _)| *t == tag) {
			Some(slot) => slot.1 = value,
			None => self.fields.push((tag, value)),
		}
	}

	pub fn set_number(&mut self, field: UdsField, value: i64) {
		self.insert(field, UdsValue::Num(value));
	}

	pub fn set_text(&mut self, field: UdsField, value: impl Into<String>) {
		self.insert(field, UdsValue::Text(value.into()));
	}

	pub fn number(&self, field: UdsField) -> Option<i64> {
		match self.get(field) {
			Some(UdsValue::Num(n)) => Some(*n),
			_ => None,
		}
	}

	pub fn text(&self, field: UdsField) -> Option<&str> {
		match self.get(field) {
			Some(UdsValue::Text(s)) => Some(s.as_str()),
			_ => None,
		}
	}

	pub fn get(&self, field: UdsField) -> Option<&UdsValue> {
		let tag = field as u32;
		self.fields.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)
	}

	pub fn contains(&self, field: UdsField) -> bool {
		self.get(field).is_some()
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Raw `(tag, value)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &(u32, UdsValue)> {
		self.fields.iter()
	}

	/// Field pairs sorted by tag, for order-insensitive comparison.
	pub fn sorted_fields(&self) -> Vec<(u32, UdsValue)> {
		let mut fields = self.fields.clone();
		fields.sort_by_key(|(t, _)| *t);
		fields
	}
}

bitflags::bitflags! {
	/// Which attribute groups a stat call should produce.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct StatDetails: u32 {
		/// Existence, name and file type.
		const BASIC = 1;
		/// Owner and group.
		const USER = 2;
		/// Timestamps and size.
		const TIME = 4;
		/// Resolve symlink targets.
		const RESOLVE_SYMLINK = 8;
		const ACL = 16;
		const INODE = 32;
		const MIME_TYPE = 64;
	}
}

impl StatDetails {
	/// Adapter for the legacy integer detail levels carried by older jobs.
	/// 0 probes bare existence, 1 is the moderate set used for deletion
	/// scans, 2 and above means everything.
	pub fn from_level(level: i64) -> Self {
		match level {
			i64::MIN..=0 => StatDetails::BASIC,
			1 => StatDetails::BASIC | StatDetails::USER | StatDetails::TIME,
			_ => StatDetails::all(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_insert_replaces_existing_field() {
		let mut entry = UdsEntry::new();
		entry.set_text(UdsField::Name, "a");
		entry.set_text(UdsField::Name, "b");
		assert_eq!(entry.len(), 1);
		assert_eq!(entry.text(UdsField::Name), Some("b"));
	}

	#[test]
	fn test_missing_fields_are_tolerated() {
		let entry = UdsEntry::new();
		assert_eq!(entry.number(UdsField::Size), None);
		assert_eq!(entry.text(UdsField::LinkDest), None);
		assert!(!entry.contains(UdsField::MimeType));
	}

	#[test]
	fn test_typed_accessors_check_variant() {
		let mut entry = UdsEntry::new();
		entry.set_text(UdsField::Name, "x");
		assert_eq!(entry.number(UdsField::Name), None);
	}

	#[test]
	fn test_sorted_fields_ignore_insertion_order() {
		let mut a = UdsEntry::new();
		a.set_number(UdsField::Size, 7);
		a.set_text(UdsField::Name, "f");
		let mut b = UdsEntry::new();
		b.set_text(UdsField::Name, "f");
		b.set_number(UdsField::Size, 7);
		assert_eq!(a.sorted_fields(), b.sorted_fields());
	}

	#[test]
	fn test_stat_details_level_adapter() {
		assert_eq!(StatDetails::from_level(0), StatDetails::BASIC);
		assert!(StatDetails::from_level(1).contains(StatDetails::TIME));
		assert!(!StatDetails::from_level(1).contains(StatDetails::RESOLVE_SYMLINK));
		assert_eq!(StatDetails::from_level(2), StatDetails::all());
	}
}

// vim: ts=4
