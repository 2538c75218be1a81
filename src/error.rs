//! Error types for worker operations
//!
//! Operation failures travel to the job as an `error` signal carrying a
//! numeric code plus a context string. The codes are wire-stable; the
//! context string has a fixed meaning per code (usually the path or host
//! the operation touched) and the job side builds the user-visible
//! message from the pair. `WorkerDefined` is the one exception: it
//! carries the complete message text itself.

use std::fmt;

use crate::protocol::ProtocolError;

/// Wire-stable operation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
	CannotOpenForReading = 1,
	CannotOpenForWriting = 2,
	CannotLaunchProcess = 3,
	InternalError = 4,
	MalformedUrl = 5,
	UnsupportedProtocol = 6,
	UnsupportedAction = 7,
	DoesNotExist = 11,
	FileAlreadyExists = 12,
	DirAlreadyExists = 13,
	AccessDenied = 14,
	WriteAccessDenied = 15,
	CannotEnterDirectory = 16,
	CannotMkdir = 20,
	CannotChmod = 21,
	CannotChown = 22,
	CannotSetModificationTime = 23,
	CannotDelete = 24,
	CannotRename = 25,
	CannotSymlink = 26,
	CannotRead = 27,
	CannotWrite = 28,
	CannotSeek = 29,
	CannotResume = 30,
	ConnectionBroken = 40,
	UnknownHost = 41,
	CannotConnect = 42,
	ServerTimeout = 43,
	UserCanceled = 50,
	WorkerDefined = 125,
}

impl ErrorCode {
	pub fn from_wire(code: u32) -> Option<ErrorCode> {
		ALL_ERROR_CODES.iter().copied().find(|c| *c as u32 == code)
	}

	pub fn label(self) -> &'static str {
		match self {
			ErrorCode::CannotOpenForReading => "cannot open for reading",
			ErrorCode::CannotOpenForWriting => "cannot open for writing",
			ErrorCode::CannotLaunchProcess => "cannot launch process",
			ErrorCode::InternalError => "internal error",
			ErrorCode::MalformedUrl => "malformed URL",
			ErrorCode::UnsupportedProtocol => "unsupported protocol",
			ErrorCode::UnsupportedAction => "unsupported action",
			ErrorCode::DoesNotExist => "does not exist",
			ErrorCode::FileAlreadyExists => "file already exists",
			ErrorCode::DirAlreadyExists => "directory already exists",
			ErrorCode::AccessDenied => "access denied",
			ErrorCode::WriteAccessDenied => "write access denied",
			ErrorCode::CannotEnterDirectory => "cannot enter directory",
			ErrorCode::CannotMkdir => "cannot create directory",
			ErrorCode::CannotChmod => "cannot change permissions",
			ErrorCode::CannotChown => "cannot change ownership",
			ErrorCode::CannotSetModificationTime => "cannot set modification time",
			ErrorCode::CannotDelete => "cannot delete",
			ErrorCode::CannotRename => "cannot rename",
			ErrorCode::CannotSymlink => "cannot create symlink",
			ErrorCode::CannotRead => "cannot read",
			ErrorCode::CannotWrite => "cannot write",
			ErrorCode::CannotSeek => "cannot seek",
			ErrorCode::CannotResume => "cannot resume",
			ErrorCode::ConnectionBroken => "connection broken",
			ErrorCode::UnknownHost => "unknown host",
			ErrorCode::CannotConnect => "cannot connect",
			ErrorCode::ServerTimeout => "server timeout",
			ErrorCode::UserCanceled => "canceled by user",
			ErrorCode::WorkerDefined => "worker-defined error",
		}
	}
}

const ALL_ERROR_CODES: &[ErrorCode] = &[
	ErrorCode::CannotOpenForReading,
	ErrorCode::CannotOpenForWriting,
	ErrorCode::CannotLaunchProcess,
	ErrorCode::InternalError,
	ErrorCode::MalformedUrl,
	ErrorCode::UnsupportedProtocol,
	ErrorCode::UnsupportedAction,
	ErrorCode::DoesNotExist,
	ErrorCode::FileAlreadyExists,
	ErrorCode::DirAlreadyExists,
	ErrorCode::AccessDenied,
	ErrorCode::WriteAccessDenied,
	ErrorCode::CannotEnterDirectory,
	ErrorCode::CannotMkdir,
	ErrorCode::CannotChmod,
	ErrorCode::CannotChown,
	ErrorCode::CannotSetModificationTime,
	ErrorCode::CannotDelete,
	ErrorCode::CannotRename,
	ErrorCode::CannotSymlink,
	ErrorCode::CannotRead,
	ErrorCode::CannotWrite,
	ErrorCode::CannotSeek,
	ErrorCode::CannotResume,
	ErrorCode::ConnectionBroken,
	ErrorCode::UnknownHost,
	ErrorCode::CannotConnect,
	ErrorCode::ServerTimeout,
	ErrorCode::UserCanceled,
	ErrorCode::WorkerDefined,
];

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.label())
	}
}

/// A failed operation: error code plus its fixed-meaning context string.
#[derive(Debug, Clone)]
pub struct WorkerError {
	pub code: ErrorCode,
	pub text: String,
}

impl WorkerError {
	pub fn new(code: ErrorCode, text: impl Into<String>) -> Self {
		Self { code, text: text.into() }
	}

	/// A free-text error the job displays verbatim.
	pub fn worker_defined(message: impl Into<String>) -> Self {
		Self { code: ErrorCode::WorkerDefined, text: message.into() }
	}

	/// The canned response for an operation a protocol does not implement.
	pub fn unsupported(protocol: &str, action: crate::protocol::Command) -> Self {
		Self {
			code: ErrorCode::UnsupportedAction,
			text: format!("the {} protocol does not support the action {}", protocol, action),
		}
	}
}

impl fmt::Display for WorkerError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.text.is_empty() {
			write!(f, "{}", self.code)
		} else {
			write!(f, "{}: {}", self.code, self.text)
		}
	}
}

impl std::error::Error for WorkerError {}

impl From<ProtocolError> for WorkerError {
	fn from(e: ProtocolError) -> Self {
		match e {
			ProtocolError::Closed | ProtocolError::Truncated => {
				WorkerError::new(ErrorCode::ConnectionBroken, e.to_string())
			}
			other => WorkerError::new(ErrorCode::InternalError, other.to_string()),
		}
	}
}


// vim: ts=4
