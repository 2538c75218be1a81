//! Protocol error types
//!
//! Errors at this level concern the framing and encoding of messages, not
//! the outcome of operations. A framing error is fatal to the connection:
//! once a frame header is corrupt there is no way to resynchronize the
//! stream, so the dispatch loop tears the connection down.

use std::fmt;
use std::io;

/// Protocol-level (framing/encoding) error
#[derive(Debug)]
pub enum ProtocolError {
	/// I/O error from the underlying transport
	Io(io::Error),
	/// Peer closed the connection between frames (clean shutdown)
	Closed,
	/// Connection ended in the middle of a frame
	Truncated,
	/// Command tag not in the vocabulary table
	UnknownCommand(u32),
	/// Payload exceeds the frame size cap
	FrameTooLarge(usize),
	/// A command arrived in the wrong direction for this endpoint
	WrongDirection(u32),
	/// A command the current protocol state does not admit
	UnexpectedCommand(u32),
	/// Payload (de)serialization failure
	Codec(String),
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
			ProtocolError::Closed => write!(f, "connection closed"),
			ProtocolError::Truncated => write!(f, "connection closed mid-frame"),
			ProtocolError::UnknownCommand(tag) => write!(f, "unknown command tag {}", tag),
			ProtocolError::FrameTooLarge(len) => {
				write!(f, "frame payload of {} bytes exceeds cap", len)
			}
			ProtocolError::WrongDirection(tag) => {
				write!(f, "command {} is not valid in this direction", tag)
			}
			ProtocolError::UnexpectedCommand(tag) => {
				write!(f, "command {} is not valid in the current state", tag)
			}
			ProtocolError::Codec(msg) => write!(f, "payload codec error: {}", msg),
		}
	}
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
	fn from(e: io::Error) -> Self {
		ProtocolError::Io(e)
	}
}

impl From<bincode::Error> for ProtocolError {
	fn from(e: bincode::Error) -> Self {
		ProtocolError::Codec(e.to_string())
	}
}

// vim: ts=4
