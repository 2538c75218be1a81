//! Message framing and payload encoding
//!
//! A message is a `(command, payload)` pair. On the wire each message is
//! framed as `[u32 LE payload length][u32 LE command tag][payload]`.
//! Payloads are bincode-encoded argument structs whose field order is
//! fixed; there is no in-band schema or version field, so the meaning of a
//! payload is coupled to the command tag by the vocabulary table alone.
//! Decoding a payload against the wrong command is undefined.
//!
//! A few commands carry raw bytes instead of an argument struct: `Data`,
//! `DataAnswer`, `Write` and `Special` payloads are opaque to this layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::commands::Command;
use super::error::ProtocolError;

/// Frame header size: payload length + command tag.
pub const HEADER_SIZE: usize = 8;

/// Cap on a single frame's payload. Guards the receiver against allocating
/// on a corrupt or hostile length field.
pub const MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// One decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
	pub cmd: Command,
	pub payload: Vec<u8>,
}

impl Message {
	pub fn new(cmd: Command, payload: Vec<u8>) -> Self {
		Self { cmd, payload }
	}
}

/// Encode a command-specific argument struct for transmission.
pub fn encode_args<T: Serialize>(args: &T) -> Result<Vec<u8>, ProtocolError> {
	Ok(bincode::serialize(args)?)
}

/// Decode a payload as the argument struct of the command it arrived under.
pub fn decode_args<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, ProtocolError> {
	Ok(bincode::deserialize(payload)?)
}

/// Build the 8-byte frame header for a payload.
pub fn frame_header(cmd: Command, payload_len: usize) -> Result<[u8; HEADER_SIZE], ProtocolError> {
	if payload_len > MAX_PAYLOAD {
		return Err(ProtocolError::FrameTooLarge(payload_len));
	}
	let mut header = [0u8; HEADER_SIZE];
	header[..4].copy_from_slice(&(payload_len as u32).to_le_bytes());
	header[4..].copy_from_slice(&(cmd as u32).to_le_bytes());
	Ok(header)
}

/// Parse a frame header into `(command, payload length)`.
pub fn parse_header(header: &[u8; HEADER_SIZE]) -> Result<(Command, usize), ProtocolError> {
	let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
	let tag = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
	if len > MAX_PAYLOAD {
		return Err(ProtocolError::FrameTooLarge(len));
	}
	let cmd = Command::from_wire(tag).ok_or(ProtocolError::UnknownCommand(tag))?;
	Ok((cmd, len))
}

bitflags::bitflags! {
	/// Job-supplied flags for mutating operations. Carried on the wire as
	/// raw bits; unknown bits from a newer peer are dropped on decode.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct JobFlags: u32 {
		const OVERWRITE = 1;
		const RESUME = 2;
	}
}

bitflags::bitflags! {
	/// Open mode for the streaming open/read/write/seek/close session.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct OpenFlags: u32 {
		const READ = 1;
		const WRITE = 2;
		const APPEND = 4;
		const TRUNCATE = 8;
	}
}

///////////////////////////////
// Job -> worker payloads    //
///////////////////////////////

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetHostArgs {
	pub host: String,
	pub port: u16,
	pub user: String,
	pub pass: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlArgs {
	pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutArgs {
	pub url: String,
	pub permissions: i32,
	/// `JobFlags` bits.
	pub flags: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MkdirArgs {
	pub url: String,
	pub permissions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameArgs {
	pub src: String,
	pub dest: String,
	/// `JobFlags` bits.
	pub flags: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymlinkArgs {
	pub target: String,
	pub dest: String,
	/// `JobFlags` bits.
	pub flags: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChmodArgs {
	pub url: String,
	pub permissions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChownArgs {
	pub url: String,
	pub owner: String,
	pub group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetModificationTimeArgs {
	pub url: String,
	/// Seconds since the unix epoch.
	pub mtime: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyArgs {
	pub src: String,
	pub dest: String,
	pub permissions: i32,
	/// `JobFlags` bits.
	pub flags: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelArgs {
	pub url: String,
	pub is_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLinkDestArgs {
	pub url: String,
	pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenArgs {
	pub url: String,
	/// `OpenFlags` bits.
	pub flags: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadArgs {
	pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeekArgs {
	pub offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiGetRequest {
	pub url: String,
	pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiGetArgs {
	pub requests: Vec<MultiGetRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeAnswerArgs {
	pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBoxAnswerArgs {
	pub button: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthAnswerArgs {
	/// 0 on success, otherwise a wire error code.
	pub code: u32,
	pub info: AuthInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfoAnswerArgs {
	pub hostname: String,
	/// Resolved addresses in textual form.
	pub addresses: Vec<String>,
	/// 0 on success, otherwise a wire error code.
	pub error: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeAnswerArgs {
	pub status: u32,
}

///////////////////////////////
// Worker -> job payloads    //
///////////////////////////////

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorArgs {
	pub code: u32,
	pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeArgs {
	pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextArgs {
	pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanResumeQueryArgs {
	pub offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBoxArgs {
	pub kind: u32,
	pub text: String,
	pub caption: String,
	pub button_yes: String,
	pub button_no: String,
	pub dont_ask_again: String,
}

/// Credential record exchanged with the out-of-process broker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthInfo {
	pub url: String,
	pub username: String,
	pub password: String,
	pub prompt: String,
	pub caption: String,
	pub comment: String,
	pub realm: String,
	pub keep_password: bool,
	pub verify_path: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequestArgs {
	pub info: AuthInfo,
	pub error_msg: String,
	/// Query the credential cache only, do not prompt.
	pub check_only: bool,
	/// Store the supplied credentials, do not prompt.
	pub cache_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfoRequestArgs {
	pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeRequestArgs {
	pub action: String,
	pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReportArgs {
	pub worker_id: String,
	pub protocol: String,
	pub host: String,
	pub connected: bool,
}


// vim: ts=4
