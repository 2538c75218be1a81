//! Operation handlers
//!
//! One protocol implementation = one `WorkerHandler`. The dispatch loop
//! decodes each job command and calls the matching method; the handler
//! does the work, emitting signals and sync-requests through the worker
//! it is given. The terminal signal is the engine's job: return `Ok(())`
//! for `finished`, return a `WorkerError` for `error`. Defaults report
//! the action as unsupported so a protocol only implements what it can
//! actually do.

use async_trait::async_trait;

use crate::error::WorkerError;
use crate::protocol::codec::MultiGetRequest;
use crate::protocol::{Command, JobFlags, OpenFlags};
use crate::resource::ResourceUrl;
use crate::worker::{HostSpec, Worker};

/// Result type for operation handlers.
pub type HandlerResult = Result<(), WorkerError>;

#[async_trait]
pub trait WorkerHandler: Send {
	/// Host, port or credentials changed. Called directly by the dispatch
	/// loop, not a job operation; there is nothing to fail or finish.
	async fn set_host(&mut self, _host: &HostSpec) {}

	// === Connection-oriented mode ===

	/// Forced connection setup. On success the engine reports `connected`.
	/// A worker in connection-oriented mode reports `ConnectionBroken` on a
	/// lost connection instead of silently reconnecting.
	async fn open_connection(&mut self, w: &mut Worker) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::OpenConnection))
	}

	/// Forced teardown; resets the worker to connectionless mode.
	async fn close_connection(&mut self, _w: &mut Worker) {}

	// === Data operations ===

	/// Retrieve a resource: emit the mime type, stream `data` blocks, end
	/// with an empty block. Honors `resume`/`range-start` metadata when
	/// byte ranges are supported.
	async fn get(&mut self, w: &mut Worker, _url: &ResourceUrl) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Get))
	}

	/// Store a resource, pulling payload blocks with `request_data`. Must
	/// not alter the permissions of a pre-existing destination, and should
	/// apply the `modified` metadata timestamp when present.
	async fn put(
		&mut self,
		w: &mut Worker,
		_url: &ResourceUrl,
		_permissions: i32,
		_flags: JobFlags,
	) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Put))
	}

	/// Describe one resource with a `stat_entry`. The fidelity asked for
	/// arrives in the `statDetails` metadata key.
	async fn stat(&mut self, w: &mut Worker, _url: &ResourceUrl) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Stat))
	}

	/// Emit the resource's mime type, or enough leading data to sniff it.
	async fn mimetype(&mut self, w: &mut Worker, _url: &ResourceUrl) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Mimetype))
	}

	/// Enumerate a directory through `list_entry`; batching and the final
	/// flush are the engine's concern.
	async fn list_dir(&mut self, w: &mut Worker, _url: &ResourceUrl) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::ListDir))
	}

	// === Tree manipulation ===

	async fn mkdir(&mut self, w: &mut Worker, _url: &ResourceUrl, _permissions: i32) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Mkdir))
	}

	/// Rename within the same protocol/host. The handler itself must
	/// detect an existing destination and report file/dir-already-exists;
	/// no stat happens beforehand.
	async fn rename(
		&mut self,
		w: &mut Worker,
		_src: &ResourceUrl,
		_dest: &ResourceUrl,
		_flags: JobFlags,
	) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Rename))
	}

	async fn symlink(
		&mut self,
		w: &mut Worker,
		_target: &str,
		_dest: &ResourceUrl,
		_flags: JobFlags,
	) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Symlink))
	}

	async fn chmod(&mut self, w: &mut Worker, _url: &ResourceUrl, _permissions: i32) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Chmod))
	}

	async fn chown(
		&mut self,
		w: &mut Worker,
		_url: &ResourceUrl,
		_owner: &str,
		_group: &str,
	) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Chown))
	}

	/// `mtime` is seconds since the unix epoch.
	async fn set_modification_time(
		&mut self,
		w: &mut Worker,
		_url: &ResourceUrl,
		_mtime: i64,
	) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::SetModificationTime))
	}

	/// Same-protocol copy. Collision detection is the handler's duty, like
	/// `rename`; the destination keeps the source's modification time.
	async fn copy(
		&mut self,
		w: &mut Worker,
		_src: &ResourceUrl,
		_dest: &ResourceUrl,
		_permissions: i32,
		_flags: JobFlags,
	) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Copy))
	}

	/// Delete. A directory with contents only goes away when the job set
	/// `recurse=true` in the incoming metadata.
	async fn del(&mut self, w: &mut Worker, _url: &ResourceUrl, _is_file: bool) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Del))
	}

	async fn set_link_dest(
		&mut self,
		w: &mut Worker,
		_url: &ResourceUrl,
		_target: &str,
	) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::SetLinkDest))
	}

	// === Protocol-specific extensions ===

	/// Catch-all for protocol-specific commands; the payload layout is
	/// whatever the protocol documents for itself.
	async fn special(&mut self, w: &mut Worker, _data: &[u8]) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Special))
	}

	/// Pipelined retrieval of several resources in one command.
	async fn multi_get(&mut self, w: &mut Worker, _requests: &[MultiGetRequest]) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::MultiGet))
	}

	/// Prepare for streaming from a sub-resource.
	async fn sub_url(&mut self, w: &mut Worker, _url: &ResourceUrl) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::SubUrl))
	}

	/// Status query; the default answers with the engine's own report.
	async fn worker_status(&mut self, w: &mut Worker) -> HandlerResult {
		w.status_report().await
	}

	/// The scheduler announced changed configuration (proxies and the
	/// like). Most protocols have nothing to recompute.
	async fn reparse_configuration(&mut self, _w: &mut Worker) -> HandlerResult {
		Ok(())
	}

	// === Streaming session (open/read/write/seek/close) ===

	/// Open a resource for random access. On success the engine emits
	/// `opened` and enters the session loop.
	async fn open(&mut self, w: &mut Worker, _url: &ResourceUrl, _flags: OpenFlags) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Open))
	}

	/// Produce up to `size` bytes as `data` blocks; an empty block means
	/// end of file.
	async fn read(&mut self, w: &mut Worker, _size: u64) -> HandlerResult {
		Err(WorkerError::unsupported(w.protocol(), Command::Read))
	}

	/// Write a block at the current position; returns bytes written.
	async fn write(&mut self, w: &mut Worker, _data: &[u8]) -> Result<u64, WorkerError> {
		Err(WorkerError::unsupported(w.protocol(), Command::Write))
	}

	/// Reposition; returns the new absolute offset.
	async fn seek(&mut self, w: &mut Worker, _offset: u64) -> Result<u64, WorkerError> {
		Err(WorkerError::unsupported(w.protocol(), Command::Seek))
	}

	/// End the streaming session. The engine reports the session's single
	/// terminal signal afterwards.
	async fn close(&mut self, _w: &mut Worker) -> HandlerResult {
		Ok(())
	}
}

/// Incoming metadata keys with protocol-wide meaning, collected here so
/// handlers and tests spell them identically.
pub mod meta_keys {
	/// Which side of a copy/rename this stat represents (`source`/`dest`).
	pub const STAT_SIDE: &str = "statSide";
	/// Requested stat fidelity; legacy integer levels are adapted via
	/// `StatDetails::from_level`.
	pub const STAT_DETAILS: &str = "statDetails";
	/// Permit recursive deletion of non-empty directories.
	pub const RECURSE: &str = "recurse";
	/// Resume offset for partial transfers.
	pub const RESUME: &str = "resume";
	/// Alternate range-start spelling used by range-capable gets.
	pub const RANGE_START: &str = "range-start";
	/// Modification timestamp to apply on put (seconds since epoch).
	pub const MODIFIED: &str = "modified";
}

// vim: ts=4
