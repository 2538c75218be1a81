//! Reference local-file worker
//!
//! Serves `file` scheme operations beneath a root directory. This is the
//! handler the `serve` subcommand runs and the test-suite drives; it
//! implements every operation the engine contracts specify for a
//! filesystem-backed protocol. Resources outside the root are refused.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use tokio::fs as afs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use async_trait::async_trait;

use crate::entry::{StatDetails, UdsEntry, UdsField};
use crate::error::{ErrorCode, WorkerError};
use crate::handler::{meta_keys, HandlerResult, WorkerHandler};
use crate::logging::*;
use crate::protocol::{JobFlags, OpenFlags};
use crate::resource::ResourceUrl;
use crate::worker::Worker;

/// Transfer block size for get/put/copy loops.
const BLOCK_SIZE: usize = 64 * 1024;

/// Suffix for in-flight uploads, renamed into place on completion.
const PART_SUFFIX: &str = ".workr-tmp";

pub struct FileWorker {
	root: PathBuf,
	session: Option<afs::File>,
}

impl FileWorker {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into(), session: None }
	}

	/// Map a resource URL onto a path under the root. Parent-directory
	/// components are refused outright rather than resolved.
	fn local_path(&self, url: &ResourceUrl) -> Result<PathBuf, WorkerError> {
		let relative = url.file_path().trim_start_matches('/');
		let candidate = Path::new(relative);
		for component in candidate.components() {
			if matches!(component, Component::ParentDir) {
				return Err(WorkerError::new(ErrorCode::AccessDenied, url.to_string()));
			}
		}
		Ok(self.root.join(candidate))
	}

	fn stat_entry_for(
		path: &Path,
		name: &str,
		details: StatDetails,
	) -> Result<UdsEntry, WorkerError> {
		let meta = std::fs::symlink_metadata(path)
			.map_err(|e| io_error(e, ErrorCode::DoesNotExist, path))?;

		let mut entry = UdsEntry::new();
		entry.set_text(UdsField::Name, name);
		entry.set_number(UdsField::FileType, (meta.mode() & (libc::S_IFMT as u32)) as i64);
		entry.set_number(UdsField::Access, (meta.mode() & 0o7777) as i64);

		if details.contains(StatDetails::TIME) {
			entry.set_number(UdsField::Size, meta.size() as i64);
			entry.set_number(UdsField::ModificationTime, meta.mtime());
			entry.set_number(UdsField::AccessTime, meta.atime());
		}
		if details.contains(StatDetails::USER) {
			entry.set_text(UdsField::User, meta.uid().to_string());
			entry.set_text(UdsField::Group, meta.gid().to_string());
		}
		if details.contains(StatDetails::INODE) {
			entry.set_number(UdsField::CreationTime, meta.ctime());
		}
		if details.contains(StatDetails::RESOLVE_SYMLINK) && meta.file_type().is_symlink() {
			if let Ok(target) = std::fs::read_link(path) {
				entry.set_text(UdsField::LinkDest, target.to_string_lossy());
			}
			entry.set_text(UdsField::LocalPath, path.to_string_lossy());
		}
		if details.contains(StatDetails::MIME_TYPE) && meta.is_file() {
			entry.set_text(UdsField::MimeType, guess_mime(path));
		}
		Ok(entry)
	}
}

#[async_trait]
impl WorkerHandler for FileWorker {
	async fn get(&mut self, w: &mut Worker, url: &ResourceUrl) -> HandlerResult {
		let path = self.local_path(url)?;
		let mut file = afs::File::open(&path)
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotOpenForReading, &path))?;
		let meta = file
			.metadata()
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotOpenForReading, &path))?;
		if meta.is_dir() {
			return Err(WorkerError::new(ErrorCode::CannotOpenForReading, path_text(&path)));
		}

		w.mime_type(guess_mime(&path)).await?;
		w.total_size(meta.len()).await?;

		let offset = resume_offset(w);
		if offset > 0 {
			w.can_resume().await?;
			file.seek(std::io::SeekFrom::Start(offset))
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotResume, &path))?;
		}

		let mut buf = vec![0u8; BLOCK_SIZE];
		let mut processed = offset;
		loop {
			if w.was_killed() {
				return Err(WorkerError::new(ErrorCode::UserCanceled, path_text(&path)));
			}
			let n = file
				.read(&mut buf)
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotRead, &path))?;
			if n == 0 {
				break;
			}
			w.data(&buf[..n]).await?;
			processed += n as u64;
			w.processed_size(processed).await?;
		}
		w.data(&[]).await?;
		Ok(())
	}

	async fn put(
		&mut self,
		w: &mut Worker,
		url: &ResourceUrl,
		permissions: i32,
		flags: JobFlags,
	) -> HandlerResult {
		let path = self.local_path(url)?;
		let dest_meta = std::fs::symlink_metadata(&path).ok();
		let dest_existed = dest_meta.is_some();
		let resume = flags.contains(JobFlags::RESUME);

		if let Some(meta) = &dest_meta {
			if meta.is_dir() {
				return Err(WorkerError::new(ErrorCode::DirAlreadyExists, path_text(&path)));
			}
			if !flags.contains(JobFlags::OVERWRITE) && !resume {
				return Err(WorkerError::new(ErrorCode::FileAlreadyExists, path_text(&path)));
			}
		}

		let part_path = part_path_for(&path)?;
		let resume_at = if resume {
			let existing =
				std::fs::symlink_metadata(&part_path).map(|m| m.len()).unwrap_or(0);
			if w.can_resume_offset(existing).await? {
				existing
			} else {
				0
			}
		} else {
			0
		};

		let mut file = if resume_at > 0 {
			afs::OpenOptions::new()
				.append(true)
				.open(&part_path)
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotResume, &part_path))?
		} else {
			afs::File::create(&part_path)
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotOpenForWriting, &part_path))?
		};

		let mut written = resume_at;
		loop {
			if w.was_killed() {
				return Err(WorkerError::new(ErrorCode::UserCanceled, path_text(&path)));
			}
			let chunk = w.request_data().await?;
			if chunk.is_empty() {
				break;
			}
			file.write_all(&chunk)
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotWrite, &part_path))?;
			written += chunk.len() as u64;
			w.processed_size(written).await?;
		}
		file.flush().await.map_err(|e| io_error(e, ErrorCode::CannotWrite, &part_path))?;
		drop(file);

		// A pre-existing destination keeps its permission bits (the upload
		// replaces it via rename, so carry them onto the part file); only a
		// fresh file gets the job-supplied mode.
		let mode = match &dest_meta {
			Some(meta) => Some(meta.mode() & 0o7777),
			None if permissions >= 0 => Some(permissions as u32 & 0o7777),
			None => None,
		};
		if let Some(mode) = mode {
			afs::set_permissions(&part_path, std::fs::Permissions::from_mode(mode))
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotChmod, &part_path))?;
		}

		afs::rename(&part_path, &path)
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotRename, &path))?;

		let mtime = w.config_int(meta_keys::MODIFIED, 0);
		if mtime > 0 {
			filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(mtime, 0))
				.map_err(|e| io_error(e, ErrorCode::CannotSetModificationTime, &path))?;
		}
		Ok(())
	}

	async fn stat(&mut self, w: &mut Worker, url: &ResourceUrl) -> HandlerResult {
		let path = self.local_path(url)?;
		let details = StatDetails::from_level(w.config_int(meta_keys::STAT_DETAILS, 2));
		debug!(
			"stat {} ({} side, {:?})",
			path.display(),
			w.config_str(meta_keys::STAT_SIDE, "source"),
			details
		);
		let name = path
			.file_name()
			.map(|n| n.to_string_lossy().to_string())
			.unwrap_or_else(|| String::from("/"));
		let entry = Self::stat_entry_for(&path, &name, details)?;
		w.stat_entry(&entry).await?;
		Ok(())
	}

	async fn mimetype(&mut self, w: &mut Worker, url: &ResourceUrl) -> HandlerResult {
		let path = self.local_path(url)?;
		std::fs::symlink_metadata(&path).map_err(|e| io_error(e, ErrorCode::DoesNotExist, &path))?;
		w.mime_type(guess_mime(&path)).await?;
		Ok(())
	}

	async fn list_dir(&mut self, w: &mut Worker, url: &ResourceUrl) -> HandlerResult {
		let path = self.local_path(url)?;
		let read_dir = std::fs::read_dir(&path)
			.map_err(|e| io_error(e, ErrorCode::CannotEnterDirectory, &path))?;

		for dir_entry in read_dir {
			if w.was_killed() {
				return Err(WorkerError::new(ErrorCode::UserCanceled, path_text(&path)));
			}
			let dir_entry = match dir_entry {
				Ok(e) => e,
				Err(e) => {
					warn!("skipping unreadable entry in {}: {}", path.display(), e);
					continue;
				}
			};
			let name = dir_entry.file_name().to_string_lossy().to_string();
			let entry_path = dir_entry.path();
			match Self::stat_entry_for(
				&entry_path,
				&name,
				StatDetails::BASIC | StatDetails::USER | StatDetails::TIME,
			) {
				Ok(entry) => w.list_entry(entry).await?,
				Err(e) => {
					// Entries vanishing mid-listing are routine.
					debug!("cannot stat {}: {}", entry_path.display(), e);
				}
			}
		}
		Ok(())
	}

	async fn mkdir(&mut self, w: &mut Worker, url: &ResourceUrl, permissions: i32) -> HandlerResult {
		let path = self.local_path(url)?;
		if let Ok(meta) = std::fs::symlink_metadata(&path) {
			let code = if meta.is_dir() {
				ErrorCode::DirAlreadyExists
			} else {
				ErrorCode::FileAlreadyExists
			};
			return Err(WorkerError::new(code, path_text(&path)));
		}
		afs::create_dir(&path).await.map_err(|e| io_error(e, ErrorCode::CannotMkdir, &path))?;
		if permissions >= 0 {
			self.chmod(w, url, permissions).await?;
		}
		Ok(())
	}

	async fn rename(
		&mut self,
		_w: &mut Worker,
		src: &ResourceUrl,
		dest: &ResourceUrl,
		flags: JobFlags,
	) -> HandlerResult {
		let src_path = self.local_path(src)?;
		let dest_path = self.local_path(dest)?;
		std::fs::symlink_metadata(&src_path)
			.map_err(|e| io_error(e, ErrorCode::DoesNotExist, &src_path))?;
		if let Ok(meta) = std::fs::symlink_metadata(&dest_path) {
			if !flags.contains(JobFlags::OVERWRITE) {
				let code = if meta.is_dir() {
					ErrorCode::DirAlreadyExists
				} else {
					ErrorCode::FileAlreadyExists
				};
				return Err(WorkerError::new(code, path_text(&dest_path)));
			}
		}
		afs::rename(&src_path, &dest_path)
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotRename, &src_path))?;
		Ok(())
	}

	async fn symlink(
		&mut self,
		_w: &mut Worker,
		target: &str,
		dest: &ResourceUrl,
		flags: JobFlags,
	) -> HandlerResult {
		let dest_path = self.local_path(dest)?;
		if std::fs::symlink_metadata(&dest_path).is_ok() {
			if !flags.contains(JobFlags::OVERWRITE) {
				return Err(WorkerError::new(ErrorCode::FileAlreadyExists, path_text(&dest_path)));
			}
			afs::remove_file(&dest_path)
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotSymlink, &dest_path))?;
		}
		afs::symlink(target, &dest_path)
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotSymlink, &dest_path))?;
		Ok(())
	}

	async fn chmod(&mut self, _w: &mut Worker, url: &ResourceUrl, permissions: i32) -> HandlerResult {
		let path = self.local_path(url)?;
		afs::set_permissions(&path, std::fs::Permissions::from_mode(permissions as u32 & 0o7777))
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotChmod, &path))?;
		Ok(())
	}

	async fn chown(
		&mut self,
		_w: &mut Worker,
		url: &ResourceUrl,
		owner: &str,
		group: &str,
	) -> HandlerResult {
		let path = self.local_path(url)?;
		std::fs::symlink_metadata(&path).map_err(|e| io_error(e, ErrorCode::DoesNotExist, &path))?;

		// Numeric ids only; name resolution belongs to the job side.
		let uid = parse_id(owner).ok_or_else(|| {
			WorkerError::new(ErrorCode::CannotChown, format!("{}: unknown owner {}", path_text(&path), owner))
		})?;
		let gid = parse_id(group).ok_or_else(|| {
			WorkerError::new(ErrorCode::CannotChown, format!("{}: unknown group {}", path_text(&path), group))
		})?;

		let c_path = CString::new(path.as_os_str().as_bytes())
			.map_err(|_| WorkerError::new(ErrorCode::CannotChown, path_text(&path)))?;
		let rc = unsafe { libc::chown(c_path.as_ptr(), uid, gid as libc::gid_t) };
		if rc != 0 {
			return Err(io_error(std::io::Error::last_os_error(), ErrorCode::CannotChown, &path));
		}
		Ok(())
	}

	async fn set_modification_time(
		&mut self,
		_w: &mut Worker,
		url: &ResourceUrl,
		mtime: i64,
	) -> HandlerResult {
		let path = self.local_path(url)?;
		std::fs::symlink_metadata(&path).map_err(|e| io_error(e, ErrorCode::DoesNotExist, &path))?;
		filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(mtime, 0))
			.map_err(|e| io_error(e, ErrorCode::CannotSetModificationTime, &path))?;
		Ok(())
	}

	async fn copy(
		&mut self,
		w: &mut Worker,
		src: &ResourceUrl,
		dest: &ResourceUrl,
		permissions: i32,
		flags: JobFlags,
	) -> HandlerResult {
		let src_path = self.local_path(src)?;
		let dest_path = self.local_path(dest)?;

		let src_meta = std::fs::symlink_metadata(&src_path)
			.map_err(|e| io_error(e, ErrorCode::DoesNotExist, &src_path))?;
		if !src_meta.is_file() {
			return Err(WorkerError::new(ErrorCode::CannotOpenForReading, path_text(&src_path)));
		}
		if let Ok(meta) = std::fs::symlink_metadata(&dest_path) {
			if !flags.contains(JobFlags::OVERWRITE) {
				let code = if meta.is_dir() {
					ErrorCode::DirAlreadyExists
				} else {
					ErrorCode::FileAlreadyExists
				};
				return Err(WorkerError::new(code, path_text(&dest_path)));
			}
		}

		let mut src_file = afs::File::open(&src_path)
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotOpenForReading, &src_path))?;
		let mut dest_file = afs::File::create(&dest_path)
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotOpenForWriting, &dest_path))?;

		w.total_size(src_meta.len()).await?;
		let mut buf = vec![0u8; BLOCK_SIZE];
		let mut processed = 0u64;
		loop {
			if w.was_killed() {
				return Err(WorkerError::new(ErrorCode::UserCanceled, path_text(&src_path)));
			}
			let n = src_file
				.read(&mut buf)
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotRead, &src_path))?;
			if n == 0 {
				break;
			}
			dest_file
				.write_all(&buf[..n])
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotWrite, &dest_path))?;
			processed += n as u64;
			w.processed_size(processed).await?;
		}
		dest_file.flush().await.map_err(|e| io_error(e, ErrorCode::CannotWrite, &dest_path))?;
		drop(dest_file);

		let mode = if permissions >= 0 { permissions as u32 & 0o7777 } else { src_meta.mode() & 0o7777 };
		afs::set_permissions(&dest_path, std::fs::Permissions::from_mode(mode))
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotChmod, &dest_path))?;

		// The copy carries the source's modification time.
		filetime::set_file_mtime(
			&dest_path,
			filetime::FileTime::from_unix_time(src_meta.mtime(), 0),
		)
		.map_err(|e| io_error(e, ErrorCode::CannotSetModificationTime, &dest_path))?;
		Ok(())
	}

	async fn del(&mut self, w: &mut Worker, url: &ResourceUrl, is_file: bool) -> HandlerResult {
		let path = self.local_path(url)?;
		if is_file {
			afs::remove_file(&path)
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotDelete, &path))?;
			return Ok(());
		}

		std::fs::symlink_metadata(&path).map_err(|e| io_error(e, ErrorCode::DoesNotExist, &path))?;
		if w.config_bool(meta_keys::RECURSE, false) {
			let kill = w.kill_switch();
			remove_tree(&path, &kill).map_err(|e| io_error(e, ErrorCode::CannotDelete, &path))?;
		} else {
			afs::remove_dir(&path)
				.await
				.map_err(|e| io_error(e, ErrorCode::CannotDelete, &path))?;
		}
		Ok(())
	}

	async fn set_link_dest(
		&mut self,
		_w: &mut Worker,
		url: &ResourceUrl,
		target: &str,
	) -> HandlerResult {
		let path = self.local_path(url)?;
		let meta = std::fs::symlink_metadata(&path)
			.map_err(|e| io_error(e, ErrorCode::DoesNotExist, &path))?;
		if !meta.file_type().is_symlink() {
			return Err(WorkerError::new(ErrorCode::CannotSymlink, path_text(&path)));
		}
		afs::remove_file(&path).await.map_err(|e| io_error(e, ErrorCode::CannotSymlink, &path))?;
		afs::symlink(target, &path)
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotSymlink, &path))?;
		Ok(())
	}

	async fn open(&mut self, _w: &mut Worker, url: &ResourceUrl, flags: OpenFlags) -> HandlerResult {
		let path = self.local_path(url)?;
		let mut options = afs::OpenOptions::new();
		options.read(flags.contains(OpenFlags::READ));
		if flags.contains(OpenFlags::WRITE) {
			options.write(true).create(true);
		}
		if flags.contains(OpenFlags::APPEND) {
			options.append(true);
		}
		if flags.contains(OpenFlags::TRUNCATE) {
			options.truncate(true);
		}
		let file = options
			.open(&path)
			.await
			.map_err(|e| io_error(e, ErrorCode::CannotOpenForReading, &path))?;
		self.session = Some(file);
		Ok(())
	}

	async fn read(&mut self, w: &mut Worker, size: u64) -> HandlerResult {
		let file = self.session.as_mut().ok_or_else(no_session)?;
		let mut remaining = size;
		let mut buf = vec![0u8; BLOCK_SIZE];
		while remaining > 0 {
			let want = remaining.min(BLOCK_SIZE as u64) as usize;
			let n = file
				.read(&mut buf[..want])
				.await
				.map_err(|e| WorkerError::new(ErrorCode::CannotRead, e.to_string()))?;
			if n == 0 {
				w.data(&[]).await?;
				return Ok(());
			}
			w.data(&buf[..n]).await?;
			remaining -= n as u64;
		}
		Ok(())
	}

	async fn write(&mut self, _w: &mut Worker, data: &[u8]) -> Result<u64, WorkerError> {
		let file = self.session.as_mut().ok_or_else(no_session)?;
		file.write_all(data)
			.await
			.map_err(|e| WorkerError::new(ErrorCode::CannotWrite, e.to_string()))?;
		Ok(data.len() as u64)
	}

	async fn seek(&mut self, _w: &mut Worker, offset: u64) -> Result<u64, WorkerError> {
		let file = self.session.as_mut().ok_or_else(no_session)?;
		file.seek(std::io::SeekFrom::Start(offset))
			.await
			.map_err(|e| WorkerError::new(ErrorCode::CannotSeek, e.to_string()))
	}

	async fn close(&mut self, _w: &mut Worker) -> HandlerResult {
		if let Some(mut file) = self.session.take() {
			file.flush()
				.await
				.map_err(|e| WorkerError::new(ErrorCode::CannotWrite, e.to_string()))?;
		}
		Ok(())
	}
}

/// Resume offset from either spelling the job may use.
fn resume_offset(w: &Worker) -> u64 {
	let offset = w.config_int(meta_keys::RESUME, w.config_int(meta_keys::RANGE_START, 0));
	offset.max(0) as u64
}

fn part_path_for(path: &Path) -> Result<PathBuf, WorkerError> {
	let name = path
		.file_name()
		.ok_or_else(|| WorkerError::new(ErrorCode::MalformedUrl, path_text(path)))?;
	let mut part_name = name.to_os_string();
	part_name.push(PART_SUFFIX);
	Ok(path.with_file_name(part_name))
}

/// Delete a directory tree, honoring the kill switch between entries.
fn remove_tree(dir: &Path, kill: &crate::worker::KillSwitch) -> std::io::Result<()> {
	for entry in std::fs::read_dir(dir)? {
		if kill.is_set() {
			return Err(std::io::Error::new(std::io::ErrorKind::Interrupted, "killed"));
		}
		let entry = entry?;
		let path = entry.path();
		let meta = std::fs::symlink_metadata(&path)?;
		if meta.is_dir() {
			remove_tree(&path, kill)?;
		} else {
			std::fs::remove_file(&path)?;
		}
	}
	std::fs::remove_dir(dir)
}

fn parse_id(raw: &str) -> Option<libc::uid_t> {
	if raw.is_empty() {
		// Empty means "leave unchanged".
		return Some(u32::MAX as libc::uid_t);
	}
	raw.parse::<libc::uid_t>().ok()
}

fn path_text(path: &Path) -> String {
	path.to_string_lossy().to_string()
}

fn io_error(e: std::io::Error, fallback: ErrorCode, path: &Path) -> WorkerError {
	let code = match e.kind() {
		std::io::ErrorKind::NotFound => ErrorCode::DoesNotExist,
		std::io::ErrorKind::PermissionDenied => ErrorCode::AccessDenied,
		std::io::ErrorKind::AlreadyExists => ErrorCode::FileAlreadyExists,
		_ => fallback,
	};
	WorkerError::new(code, path_text(path))
}

fn no_session() -> WorkerError {
	WorkerError::new(ErrorCode::InternalError, "no open streaming session")
}

/// Minimal extension-based mime sniffing; the job side has the real
/// database and treats this as a hint.
fn guess_mime(path: &Path) -> &'static str {
	match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
		Some("txt") | Some("log") | Some("cfg") | Some("conf") => "text/plain",
		Some("html") | Some("htm") => "text/html",
		Some("xml") => "application/xml",
		Some("json") => "application/json",
		Some("toml") => "application/toml",
		Some("png") => "image/png",
		Some("jpg") | Some("jpeg") => "image/jpeg",
		Some("gif") => "image/gif",
		Some("svg") => "image/svg+xml",
		Some("pdf") => "application/pdf",
		Some("zip") => "application/zip",
		Some("gz") => "application/gzip",
		Some("tar") => "application/x-tar",
		Some("mp3") => "audio/mpeg",
		Some("mp4") => "video/mp4",
		Some("sh") => "application/x-shellscript",
		Some("rs") => "text/x-rust",
		Some("c") => "text/x-csrc",
		Some("py") => "text/x-python",
		_ => "application/octet-stream",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_guess_mime() {
		assert_eq!(guess_mime(Path::new("a/b/readme.txt")), "text/plain");
		assert_eq!(guess_mime(Path::new("photo.JPG")), "image/jpeg");
		assert_eq!(guess_mime(Path::new("blob")), "application/octet-stream");
	}

	#[test]
	fn test_part_path() {
		let part = part_path_for(Path::new("/data/file.bin")).unwrap();
		assert_eq!(part, Path::new("/data/file.bin.workr-tmp"));
	}

	#[test]
	fn test_local_path_confinement() {
		let worker = FileWorker::new("/srv/root");
		let url = ResourceUrl::parse("file:///../etc/passwd").unwrap();
		assert!(worker.local_path(&url).is_err());
		let ok = ResourceUrl::parse("file:///sub/dir/x").unwrap();
		assert_eq!(worker.local_path(&ok).unwrap(), Path::new("/srv/root/sub/dir/x"));
	}
}

// vim: ts=4
