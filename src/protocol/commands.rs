//! Command vocabulary for the worker protocol
//!
//! Every message on the wire is tagged with one of these commands. The
//! numeric values are part of the wire contract shared with the job side
//! and must never be renumbered; adding a command means appending a new
//! value, not recycling an old one.
//!
//! Commands are directional. The job drives the worker with operation
//! commands and answers sync-requests with reply commands; the worker
//! responds with info and message signals. An endpoint receiving a command
//! of its own direction is observing a protocol violation.

/// Who is allowed to send a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	JobToWorker,
	WorkerToJob,
}

impl std::fmt::Display for Direction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Direction::JobToWorker => write!(f, "job->worker"),
			Direction::WorkerToJob => write!(f, "worker->job"),
		}
	}
}

/// Wire command tags.
///
/// Ranges: job->worker sync-request answers 64..=66 and 97..=99, job->worker
/// operations 67..=96, worker->job info signals 10..=39, worker->job message
/// signals 100..=139.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
	// Job -> worker: sync-request answers
	AuthAnswer = 64,
	HostInfoAnswer = 65,
	PrivilegeAnswer = 66,

	// Job -> worker: operations
	SetHost = 67,
	OpenConnection = 70,
	CloseConnection = 71,
	Get = 72,
	Put = 73,
	Stat = 74,
	Mimetype = 75,
	ListDir = 76,
	Mkdir = 77,
	Rename = 78,
	Symlink = 79,
	Chmod = 80,
	Chown = 81,
	SetModificationTime = 82,
	Copy = 83,
	Del = 84,
	SetLinkDest = 85,
	Special = 86,
	MultiGet = 87,
	WorkerStatus = 88,
	ReparseConfiguration = 89,
	MetaData = 90,
	SubUrl = 91,
	Open = 92,
	Read = 93,
	Write = 94,
	Seek = 95,
	Close = 96,

	// Job -> worker: more sync-request answers
	DataAnswer = 97,
	ResumeAnswer = 98,
	MessageBoxAnswer = 99,

	// Worker -> job: info signals
	TotalSize = 10,
	ProcessedSize = 11,
	Speed = 12,
	Position = 13,
	Written = 14,
	Truncated = 15,
	Redirection = 20,
	MimeType = 21,
	ErrorPage = 22,
	Warning = 23,
	InfoMessage = 24,
	MetaDataFlush = 25,

	// Worker -> job: message signals
	Data = 100,
	DataReq = 101,
	Error = 102,
	Connected = 103,
	Finished = 104,
	StatEntry = 105,
	ListEntries = 106,
	CanResumeQuery = 107,
	CanResumeAnnounce = 108,
	Opened = 109,
	NeedSubUrlData = 110,
	WorkerStatusReport = 111,
	MessageBox = 112,
	AuthRequest = 113,
	HostInfoRequest = 114,
	PrivilegeRequest = 115,
}

/// Every command in the vocabulary, in wire-tag order within each range.
pub const ALL_COMMANDS: &[Command] = &[
	Command::TotalSize,
	Command::ProcessedSize,
	Command::Speed,
	Command::Position,
	Command::Written,
	Command::Truncated,
	Command::Redirection,
	Command::MimeType,
	Command::ErrorPage,
	Command::Warning,
	Command::InfoMessage,
	Command::MetaDataFlush,
	Command::AuthAnswer,
	Command::HostInfoAnswer,
	Command::PrivilegeAnswer,
	Command::SetHost,
	Command::OpenConnection,
	Command::CloseConnection,
	Command::Get,
	Command::Put,
	Command::Stat,
	Command::Mimetype,
	Command::ListDir,
	Command::Mkdir,
	Command::Rename,
	Command::Symlink,
	Command::Chmod,
	Command::Chown,
	Command::SetModificationTime,
	Command::Copy,
	Command::Del,
	Command::SetLinkDest,
	Command::Special,
	Command::MultiGet,
	Command::WorkerStatus,
	Command::ReparseConfiguration,
	Command::MetaData,
	Command::SubUrl,
	Command::Open,
	Command::Read,
	Command::Write,
	Command::Seek,
	Command::Close,
	Command::DataAnswer,
	Command::ResumeAnswer,
	Command::MessageBoxAnswer,
	Command::Data,
	Command::DataReq,
	Command::Error,
	Command::Connected,
	Command::Finished,
	Command::StatEntry,
	Command::ListEntries,
	Command::CanResumeQuery,
	Command::CanResumeAnnounce,
	Command::Opened,
	Command::NeedSubUrlData,
	Command::WorkerStatusReport,
	Command::MessageBox,
	Command::AuthRequest,
	Command::HostInfoRequest,
	Command::PrivilegeRequest,
];

impl Command {
	/// Look up a wire tag in the vocabulary table.
	pub fn from_wire(tag: u32) -> Option<Command> {
		ALL_COMMANDS.iter().copied().find(|c| *c as u32 == tag)
	}

	pub fn direction(self) -> Direction {
		match self {
			Command::AuthAnswer
			| Command::HostInfoAnswer
			| Command::PrivilegeAnswer
			| Command::SetHost
			| Command::OpenConnection
			| Command::CloseConnection
			| Command::Get
			| Command::Put
			| Command::Stat
			| Command::Mimetype
			| Command::ListDir
			| Command::Mkdir
			| Command::Rename
			| Command::Symlink
			| Command::Chmod
			| Command::Chown
			| Command::SetModificationTime
			| Command::Copy
			| Command::Del
			| Command::SetLinkDest
			| Command::Special
			| Command::MultiGet
			| Command::WorkerStatus
			| Command::ReparseConfiguration
			| Command::MetaData
			| Command::SubUrl
			| Command::Open
			| Command::Read
			| Command::Write
			| Command::Seek
			| Command::Close
			| Command::DataAnswer
			| Command::ResumeAnswer
			| Command::MessageBoxAnswer => Direction::JobToWorker,
			_ => Direction::WorkerToJob,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Command::AuthAnswer => "authAnswer",
			Command::HostInfoAnswer => "hostInfoAnswer",
			Command::PrivilegeAnswer => "privilegeAnswer",
			Command::SetHost => "setHost",
			Command::OpenConnection => "openConnection",
			Command::CloseConnection => "closeConnection",
			Command::Get => "get",
			Command::Put => "put",
			Command::Stat => "stat",
			Command::Mimetype => "mimetype",
			Command::ListDir => "listDir",
			Command::Mkdir => "mkdir",
			Command::Rename => "rename",
			Command::Symlink => "symlink",
			Command::Chmod => "chmod",
			Command::Chown => "chown",
			Command::SetModificationTime => "setModificationTime",
			Command::Copy => "copy",
			Command::Del => "del",
			Command::SetLinkDest => "setLinkDest",
			Command::Special => "special",
			Command::MultiGet => "multiGet",
			Command::WorkerStatus => "workerStatus",
			Command::ReparseConfiguration => "reparseConfiguration",
			Command::MetaData => "metaData",
			Command::SubUrl => "subUrl",
			Command::Open => "open",
			Command::Read => "read",
			Command::Write => "write",
			Command::Seek => "seek",
			Command::Close => "close",
			Command::DataAnswer => "dataAnswer",
			Command::ResumeAnswer => "resumeAnswer",
			Command::MessageBoxAnswer => "messageBoxAnswer",
			Command::TotalSize => "totalSize",
			Command::ProcessedSize => "processedSize",
			Command::Speed => "speed",
			Command::Position => "position",
			Command::Written => "written",
			Command::Truncated => "truncated",
			Command::Redirection => "redirection",
			Command::MimeType => "mimeType",
			Command::ErrorPage => "errorPage",
			Command::Warning => "warning",
			Command::InfoMessage => "infoMessage",
			Command::MetaDataFlush => "metaDataFlush",
			Command::Data => "data",
			Command::DataReq => "dataReq",
			Command::Error => "error",
			Command::Connected => "connected",
			Command::Finished => "finished",
			Command::StatEntry => "statEntry",
			Command::ListEntries => "listEntries",
			Command::CanResumeQuery => "canResumeQuery",
			Command::CanResumeAnnounce => "canResumeAnnounce",
			Command::Opened => "opened",
			Command::NeedSubUrlData => "needSubUrlData",
			Command::WorkerStatusReport => "workerStatusReport",
			Command::MessageBox => "messageBox",
			Command::AuthRequest => "authRequest",
			Command::HostInfoRequest => "hostInfoRequest",
			Command::PrivilegeRequest => "privilegeRequest",
		}
	}
}

impl std::fmt::Display for Command {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name())
	}
}


// vim: ts=4
