//! Wire protocol between job and worker
//!
//! This module defines the command vocabulary, the message framing and the
//! per-command payload encodings. The transport carrying the frames is out
//! of scope; anything that behaves like an ordered byte stream works.

pub mod codec;
pub mod commands;
pub mod error;

pub use codec::{AuthInfo, JobFlags, Message, OpenFlags};
pub use commands::{Command, Direction, ALL_COMMANDS};
pub use error::ProtocolError;

// vim: ts=4
