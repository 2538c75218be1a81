//! The worker engine
//!
//! One worker process serves one job at a time: the dispatch loop blocks
//! on the connection while idle, decodes the next command, runs the
//! matching handler to completion and reports exactly one terminal signal
//! (`finished` or `error`) per dispatched command. There is no event loop
//! behind it; when a handler needs more input mid-operation (write
//! payload, a message-box answer, resolved host addresses) it performs a
//! narrow nested receive that only admits the anticipated reply commands.
//!
//! Cancellation is cooperative. An external signal handler triggers the
//! kill switch; handlers poll `was_killed()` at chunk and entry
//! boundaries, and the engine itself honors the switch at its blocking
//! points.

use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::batch::EntryBatcher;
use crate::config::WorkerConfig;
use crate::connection::Connection;
use crate::entry::UdsEntry;
use crate::error::{ErrorCode, WorkerError};
use crate::handler::WorkerHandler;
use crate::logging::*;
use crate::metadata::{FlushMode, MetaDataStore};
use crate::protocol::codec::{
	self, AuthAnswerArgs, AuthInfo, AuthRequestArgs, CanResumeQueryArgs, ChmodArgs, ChownArgs,
	CopyArgs, DelArgs, ErrorArgs, HostInfoAnswerArgs, HostInfoRequestArgs, MessageBoxAnswerArgs,
	MessageBoxArgs, MkdirArgs, MultiGetArgs, OpenArgs, PrivilegeAnswerArgs, PrivilegeRequestArgs,
	PutArgs, ReadArgs, RenameArgs, ResumeAnswerArgs, SeekArgs, SetHostArgs, SetLinkDestArgs,
	SetModificationTimeArgs, SizeArgs, StatusReportArgs, SymlinkArgs, TextArgs, UrlArgs,
};
use crate::protocol::{Command, Direction, JobFlags, Message, OpenFlags, ProtocolError};
use crate::resource::ResourceUrl;

/// Dispatch loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
	Idle,
	Dispatching,
	AwaitingReply,
	ShuttingDown,
}

/// Host, port and credentials every operation runs against.
#[derive(Debug, Clone, Default)]
pub struct HostSpec {
	pub host: String,
	pub port: u16,
	pub user: String,
	pub password: String,
}

/// Message box flavors, matching the job-side dialog types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageBoxKind {
	QuestionYesNo = 1,
	WarningYesNo = 2,
	WarningContinueCancel = 3,
	WarningYesNoCancel = 4,
	Information = 5,
	SslMessageBox = 6,
	WarningContinueCancelDetailed = 10,
}

/// Button answers a message box can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ButtonCode {
	Ok = 1,
	Cancel = 2,
	Yes = 3,
	No = 4,
	Continue = 5,
}

impl ButtonCode {
	pub fn from_wire(code: u32) -> Option<ButtonCode> {
		match code {
			1 => Some(ButtonCode::Ok),
			2 => Some(ButtonCode::Cancel),
			3 => Some(ButtonCode::Yes),
			4 => Some(ButtonCode::No),
			5 => Some(ButtonCode::Continue),
			_ => None,
		}
	}
}

/// Answer from the privilege-policy service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PrivilegeOperationStatus {
	Authorized = 1,
	NotAuthorized = 2,
	OperationNotAllowed = 3,
	UserCanceled = 4,
}

impl PrivilegeOperationStatus {
	pub fn from_wire(status: u32) -> Option<PrivilegeOperationStatus> {
		match status {
			1 => Some(PrivilegeOperationStatus::Authorized),
			2 => Some(PrivilegeOperationStatus::NotAuthorized),
			3 => Some(PrivilegeOperationStatus::OperationNotAllowed),
			4 => Some(PrivilegeOperationStatus::UserCanceled),
			_ => None,
		}
	}
}

/// Outcome of a host lookup answered by the job.
#[derive(Debug, Clone)]
pub struct ResolvedHost {
	pub hostname: String,
	pub addresses: Vec<IpAddr>,
}

/// Cooperative cancellation token shared with the signal handler.
#[derive(Clone, Default)]
pub struct KillSwitch {
	flag: Arc<AtomicBool>,
	notify: Arc<Notify>,
}

impl KillSwitch {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn trigger(&self) {
		self.flag.store(true, Ordering::SeqCst);
		self.notify.notify_waiters();
	}

	pub fn is_set(&self) -> bool {
		self.flag.load(Ordering::SeqCst)
	}

	/// Resolves once the switch has been triggered.
	pub async fn cancelled(&self) {
		loop {
			if self.is_set() {
				return;
			}
			let notified = self.notify.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();
			if self.is_set() {
				return;
			}
			notified.await;
		}
	}
}

struct SpecialTimer {
	deadline: tokio::time::Instant,
	payload: Vec<u8>,
}

pub struct Worker {
	protocol: String,
	worker_id: Uuid,
	conn: Connection,
	config: WorkerConfig,
	meta: MetaDataStore,
	batcher: EntryBatcher,
	state: WorkerState,
	host: Option<HostSpec>,
	connected_host: bool,
	kill: KillSwitch,
	special_timer: Option<SpecialTimer>,
	temp_auths: Vec<String>,
}

impl Worker {
	pub fn new(protocol: impl Into<String>, conn: Connection) -> Self {
		Self::with_config(protocol, conn, WorkerConfig::default())
	}

	pub fn with_config(protocol: impl Into<String>, conn: Connection, config: WorkerConfig) -> Self {
		let batcher = EntryBatcher::new(
			config.list_batch_entries,
			Duration::from_millis(config.list_batch_age_ms),
		);
		Self {
			protocol: protocol.into(),
			worker_id: Uuid::new_v4(),
			conn,
			config,
			meta: MetaDataStore::new(),
			batcher,
			state: WorkerState::Idle,
			host: None,
			connected_host: false,
			kill: KillSwitch::new(),
			special_timer: None,
			temp_auths: Vec::new(),
		}
	}

	pub fn protocol(&self) -> &str {
		&self.protocol
	}

	pub fn worker_id(&self) -> Uuid {
		self.worker_id
	}

	pub fn state(&self) -> WorkerState {
		self.state
	}

	pub fn host(&self) -> Option<&HostSpec> {
		self.host.as_ref()
	}

	/// Clone of the kill switch, for wiring into a signal handler.
	pub fn kill_switch(&self) -> KillSwitch {
		self.kill.clone()
	}

	/// Whether the kill switch has fired. Long-running handlers check this
	/// at chunk/entry boundaries and abort as soon as practical.
	pub fn was_killed(&self) -> bool {
		self.kill.is_set()
	}

	//////////////
	// Metadata //
	//////////////

	pub fn set_meta_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.meta.set(key, value);
	}

	pub fn has_meta_data(&self, key: &str) -> bool {
		self.meta.has(key)
	}

	pub fn meta_data(&self, key: &str) -> Option<&str> {
		self.meta.get(key)
	}

	pub fn all_meta_data(&self) -> &BTreeMap<String, String> {
		self.meta.all()
	}

	pub fn config_bool(&self, key: &str, default: bool) -> bool {
		self.meta.config_bool(key, default)
	}

	pub fn config_int(&self, key: &str, default: i64) -> i64 {
		self.meta.config_int(key, default)
	}

	pub fn config_str(&self, key: &str, default: &str) -> String {
		self.meta.config_str(key, default)
	}

	/// Flush outgoing metadata now. `FlushMode::Clear` is the normal flush;
	/// `Keep` is for metadata produced before the worker is attached to its
	/// eventual job.
	pub async fn send_meta_data(&mut self, mode: FlushMode) -> Result<(), WorkerError> {
		if self.meta.outgoing_is_empty() {
			return Ok(());
		}
		let map = self.meta.take_outgoing(mode);
		self.emit(Command::MetaDataFlush, &map).await.map_err(Into::into)
	}

	//////////////
	// Timeouts //
	//////////////

	pub fn connect_timeout(&self) -> u64 {
		self.timeout_from_meta("connectTimeout", self.config.connect_timeout)
	}

	pub fn proxy_connect_timeout(&self) -> u64 {
		self.timeout_from_meta("proxyConnectTimeout", self.config.proxy_connect_timeout)
	}

	pub fn response_timeout(&self) -> u64 {
		self.timeout_from_meta("responseTimeout", self.config.response_timeout)
	}

	pub fn read_timeout(&self) -> u64 {
		self.timeout_from_meta("readTimeout", self.config.read_timeout)
	}

	fn timeout_from_meta(&self, key: &str, default: u64) -> u64 {
		let value = self.meta.config_int(key, default as i64);
		if value <= 0 {
			default
		} else {
			value as u64
		}
	}

	/////////////////////////////
	// Signals toward the job  //
	/////////////////////////////

	/// Send a block of payload data; an empty block signals end of data.
	pub async fn data(&mut self, data: &[u8]) -> Result<(), WorkerError> {
		self.conn.send(Command::Data, data).await.map_err(Into::into)
	}

	pub async fn total_size(&mut self, bytes: u64) -> Result<(), WorkerError> {
		self.emit(Command::TotalSize, &SizeArgs { bytes }).await.map_err(Into::into)
	}

	pub async fn processed_size(&mut self, bytes: u64) -> Result<(), WorkerError> {
		self.emit(Command::ProcessedSize, &SizeArgs { bytes }).await.map_err(Into::into)
	}

	pub async fn position(&mut self, offset: u64) -> Result<(), WorkerError> {
		self.emit(Command::Position, &SizeArgs { bytes: offset }).await.map_err(Into::into)
	}

	pub async fn written(&mut self, bytes: u64) -> Result<(), WorkerError> {
		self.emit(Command::Written, &SizeArgs { bytes }).await.map_err(Into::into)
	}

	pub async fn truncated(&mut self, length: u64) -> Result<(), WorkerError> {
		self.emit(Command::Truncated, &SizeArgs { bytes: length }).await.map_err(Into::into)
	}

	pub async fn speed(&mut self, bytes_per_second: u64) -> Result<(), WorkerError> {
		self.emit(Command::Speed, &SizeArgs { bytes: bytes_per_second }).await.map_err(Into::into)
	}

	/// Non-terminal: the worker keeps running after announcing a redirect.
	pub async fn redirection(&mut self, url: &str) -> Result<(), WorkerError> {
		self.emit(Command::Redirection, &TextArgs { text: url.to_string() }).await.map_err(Into::into)
	}

	/// The data that follows is an error page, not the requested resource.
	pub async fn error_page(&mut self) -> Result<(), WorkerError> {
		self.conn.send(Command::ErrorPage, &[]).await.map_err(Into::into)
	}

	pub async fn mime_type(&mut self, mime: &str) -> Result<(), WorkerError> {
		self.emit(Command::MimeType, &TextArgs { text: mime.to_string() }).await.map_err(Into::into)
	}

	pub async fn warning(&mut self, msg: &str) -> Result<(), WorkerError> {
		self.emit(Command::Warning, &TextArgs { text: msg.to_string() }).await.map_err(Into::into)
	}

	pub async fn info_message(&mut self, msg: &str) -> Result<(), WorkerError> {
		self.emit(Command::InfoMessage, &TextArgs { text: msg.to_string() }).await.map_err(Into::into)
	}

	pub async fn need_sub_url_data(&mut self) -> Result<(), WorkerError> {
		self.conn.send(Command::NeedSubUrlData, &[]).await.map_err(Into::into)
	}

	/// Report the stat result for the current stat command.
	pub async fn stat_entry(&mut self, entry: &UdsEntry) -> Result<(), WorkerError> {
		self.emit(Command::StatEntry, entry).await.map_err(Into::into)
	}

	/// Buffer one listing entry; full batches go out as `listEntries`.
	pub async fn list_entry(&mut self, entry: UdsEntry) -> Result<(), WorkerError> {
		if let Some(batch) = self.batcher.push(entry) {
			self.emit(Command::ListEntries, &batch).await?;
		}
		Ok(())
	}

	/// Announce byte-range support at the start of a get.
	pub async fn can_resume(&mut self) -> Result<(), WorkerError> {
		self.conn.send(Command::CanResumeAnnounce, &[]).await.map_err(Into::into)
	}

	/// Report worker status to the job; used by the default workerStatus
	/// handler and available to overrides.
	pub async fn status_report(&mut self) -> Result<(), WorkerError> {
		let args = StatusReportArgs {
			worker_id: self.worker_id.to_string(),
			protocol: self.protocol.clone(),
			host: self.host.as_ref().map(|h| h.host.clone()).unwrap_or_default(),
			connected: self.connected_host,
		};
		self.emit(Command::WorkerStatusReport, &args).await.map_err(Into::into)
	}

	///////////////////////
	// Sync-request API  //
	///////////////////////

	/// Narrow receive: block until one of `expected` arrives, the response
	/// timeout elapses, or the kill switch fires. Metadata pushes are
	/// control traffic and are absorbed without ending the wait; any other
	/// command is a protocol violation — the job must answer what it was
	/// asked.
	pub async fn wait_for_answer(&mut self, expected: &[Command]) -> Result<Message, WorkerError> {
		let prev = self.state;
		self.state = WorkerState::AwaitingReply;
		let result = self.wait_for_answer_inner(expected).await;
		self.state = prev;
		result
	}

	async fn wait_for_answer_inner(&mut self, expected: &[Command]) -> Result<Message, WorkerError> {
		let deadline =
			tokio::time::Instant::now() + Duration::from_secs(self.response_timeout());
		loop {
			let kill = self.kill.clone();
			let received = tokio::select! {
				_ = kill.cancelled() => {
					return Err(WorkerError::new(
						ErrorCode::UserCanceled,
						"worker killed while awaiting a reply",
					));
				}
				res = tokio::time::timeout_at(deadline, self.conn.recv()) => res,
			};
			let msg = match received {
				Err(_) => {
					return Err(WorkerError::new(
						ErrorCode::ServerTimeout,
						"no reply within the response timeout",
					));
				}
				Ok(Ok(msg)) => msg,
				Ok(Err(e)) => return Err(WorkerError::from(e)),
			};
			if expected.contains(&msg.cmd) {
				return Ok(msg);
			}
			if msg.cmd == Command::MetaData {
				let map = codec::decode_args(&msg.payload).map_err(WorkerError::from)?;
				self.meta.set_incoming(map);
				continue;
			}
			return Err(WorkerError::new(
				ErrorCode::InternalError,
				format!("unexpected {} while awaiting a reply", msg.cmd),
			));
		}
	}

	/// Ask the job for the next block of write payload. An empty result is
	/// end of stream; a failed wait is a transport error the caller must
	/// turn into an operation error, not end-of-data.
	pub async fn request_data(&mut self) -> Result<Vec<u8>, WorkerError> {
		self.conn.send(Command::DataReq, &[]).await.map_err(WorkerError::from)?;
		let msg = self.wait_for_answer(&[Command::DataAnswer]).await?;
		Ok(msg.payload)
	}

	/// Ask whether the job accepts resuming an upload at `offset`.
	pub async fn can_resume_offset(&mut self, offset: u64) -> Result<bool, WorkerError> {
		self.emit(Command::CanResumeQuery, &CanResumeQueryArgs { offset })
			.await
			.map_err(WorkerError::from)?;
		let msg = self.wait_for_answer(&[Command::ResumeAnswer]).await?;
		let args: ResumeAnswerArgs = codec::decode_args(&msg.payload).map_err(WorkerError::from)?;
		Ok(args.accepted)
	}

	/// Show a message box through the job's confirmation UI and wait for
	/// the button answer. Only valid while a command is being dispatched.
	pub async fn message_box(
		&mut self,
		kind: MessageBoxKind,
		text: &str,
		caption: &str,
		button_yes: &str,
		button_no: &str,
	) -> Result<ButtonCode, WorkerError> {
		self.message_box_dont_ask(kind, text, caption, button_yes, button_no, "").await
	}

	/// `message_box` with a "don't ask again" checkbox name.
	pub async fn message_box_dont_ask(
		&mut self,
		kind: MessageBoxKind,
		text: &str,
		caption: &str,
		button_yes: &str,
		button_no: &str,
		dont_ask_again: &str,
	) -> Result<ButtonCode, WorkerError> {
		if self.state != WorkerState::Dispatching {
			return Err(WorkerError::new(
				ErrorCode::InternalError,
				"message box requested outside a dispatched command",
			));
		}
		let args = MessageBoxArgs {
			kind: kind as u32,
			text: text.to_string(),
			caption: caption.to_string(),
			button_yes: button_yes.to_string(),
			button_no: button_no.to_string(),
			dont_ask_again: dont_ask_again.to_string(),
		};
		self.emit(Command::MessageBox, &args).await.map_err(WorkerError::from)?;
		let msg = self.wait_for_answer(&[Command::MessageBoxAnswer]).await?;
		let answer: MessageBoxAnswerArgs =
			codec::decode_args(&msg.payload).map_err(WorkerError::from)?;
		ButtonCode::from_wire(answer.button).ok_or_else(|| {
			WorkerError::new(ErrorCode::InternalError, format!("invalid button code {}", answer.button))
		})
	}

	/// Compatibility wrapper for callers still using the old positional
	/// argument order (text before kind).
	pub async fn message_box_legacy(
		&mut self,
		text: &str,
		kind: MessageBoxKind,
		caption: &str,
		button_yes: &str,
		button_no: &str,
	) -> Result<ButtonCode, WorkerError> {
		self.message_box(kind, text, caption, button_yes, button_no).await
	}

	/// Prompt the user for credentials through the out-of-process broker.
	/// On success `info` is filled in with what the user entered.
	pub async fn open_password_dialog(
		&mut self,
		info: &mut AuthInfo,
		error_msg: &str,
	) -> Result<(), WorkerError> {
		let answer = self.auth_round_trip(info, error_msg, false, false).await?;
		if answer.code == 0 {
			*info = answer.info;
			Ok(())
		} else {
			Err(WorkerError::new(
				ErrorCode::from_wire(answer.code).unwrap_or(ErrorCode::InternalError),
				"credential request refused",
			))
		}
	}

	/// Look for cached credentials matching `info`. Fills `info` and
	/// returns true when the broker has a match.
	pub async fn check_cached_authentication(
		&mut self,
		info: &mut AuthInfo,
	) -> Result<bool, WorkerError> {
		let answer = self.auth_round_trip(info, "", true, false).await?;
		if answer.code == 0 {
			*info = answer.info;
			Ok(true)
		} else {
			Ok(false)
		}
	}

	/// Store credentials in the broker's persistent cache.
	pub async fn cache_authentication(&mut self, info: &AuthInfo) -> Result<bool, WorkerError> {
		let answer = self.auth_round_trip(info, "", false, true).await?;
		Ok(answer.code == 0)
	}

	async fn auth_round_trip(
		&mut self,
		info: &AuthInfo,
		error_msg: &str,
		check_only: bool,
		cache_only: bool,
	) -> Result<AuthAnswerArgs, WorkerError> {
		let args = AuthRequestArgs {
			info: info.clone(),
			error_msg: error_msg.to_string(),
			check_only,
			cache_only,
		};
		self.emit(Command::AuthRequest, &args).await.map_err(WorkerError::from)?;
		let msg = self.wait_for_answer(&[Command::AuthAnswer]).await?;
		codec::decode_args(&msg.payload).map_err(WorkerError::from)
	}

	/// Check with the privilege-policy service whether `action` may run.
	/// A temporary authorization recorded earlier answers locally.
	pub async fn request_privilege_operation(
		&mut self,
		action: &str,
		details: &str,
	) -> Result<PrivilegeOperationStatus, WorkerError> {
		if self.temp_auths.iter().any(|a| a == action) {
			debug!("privilege action {} covered by temporary authorization", action);
			return Ok(PrivilegeOperationStatus::Authorized);
		}
		let args =
			PrivilegeRequestArgs { action: action.to_string(), details: details.to_string() };
		self.emit(Command::PrivilegeRequest, &args).await.map_err(WorkerError::from)?;
		let msg = self.wait_for_answer(&[Command::PrivilegeAnswer]).await?;
		let answer: PrivilegeAnswerArgs =
			codec::decode_args(&msg.payload).map_err(WorkerError::from)?;
		PrivilegeOperationStatus::from_wire(answer.status).ok_or_else(|| {
			WorkerError::new(
				ErrorCode::InternalError,
				format!("invalid privilege status {}", answer.status),
			)
		})
	}

	/// Authorize `action` for the remainder of this worker's life.
	pub fn add_temporary_authorization(&mut self, action: &str) {
		if !self.temp_auths.iter().any(|a| a == action) {
			self.temp_auths.push(action.to_string());
		}
	}

	/// Fire an asynchronous host lookup request at the job.
	pub async fn lookup_host(&mut self, host: &str) -> Result<(), WorkerError> {
		self.emit(Command::HostInfoRequest, &HostInfoRequestArgs { host: host.to_string() })
			.await
			.map_err(Into::into)
	}

	/// Collect the answer to a previous `lookup_host`. The wait honors the
	/// kill switch, so a worker stuck on resolution still dies promptly.
	pub async fn wait_for_host_info(&mut self) -> Result<ResolvedHost, WorkerError> {
		let msg = self.wait_for_answer(&[Command::HostInfoAnswer]).await?;
		let args: HostInfoAnswerArgs = codec::decode_args(&msg.payload).map_err(WorkerError::from)?;
		if args.error != 0 {
			return Err(WorkerError::new(ErrorCode::UnknownHost, args.hostname));
		}
		let addresses = args.addresses.iter().filter_map(|a| a.parse::<IpAddr>().ok()).collect();
		Ok(ResolvedHost { hostname: args.hostname, addresses })
	}

	///////////////////
	// Special timer //
	///////////////////

	/// Arm a one-shot timer that synthesizes a `special` command with
	/// `payload` if the worker is still idle when it fires. A new timer
	/// replaces any pending one; a non-positive timeout cancels.
	pub fn set_timeout_special_command(&mut self, seconds: i64, payload: Vec<u8>) {
		if seconds <= 0 {
			self.special_timer = None;
			return;
		}
		self.special_timer = Some(SpecialTimer {
			deadline: tokio::time::Instant::now() + Duration::from_secs(seconds as u64),
			payload,
		});
	}

	///////////////////
	// Dispatch loop //
	///////////////////

	/// Run the dispatch loop until the job hangs up, the kill switch
	/// fires, or the connection dies with a framing error.
	pub async fn run<H>(&mut self, handler: &mut H) -> Result<(), ProtocolError>
	where
		H: WorkerHandler + ?Sized,
	{
		info!("{} worker {} entering dispatch loop", self.protocol, self.worker_id);
		loop {
			self.state = WorkerState::Idle;
			let kill = self.kill.clone();
			let next = tokio::select! {
				_ = kill.cancelled() => {
					info!("kill switch observed while idle, shutting down");
					self.state = WorkerState::ShuttingDown;
					return Ok(());
				}
				res = Self::read_idle(&mut self.conn, &mut self.special_timer) => res,
			};
			let msg = match next {
				Ok(Some(msg)) => msg,
				Ok(None) => {
					debug!("job closed the connection, worker exiting");
					self.state = WorkerState::ShuttingDown;
					return Ok(());
				}
				Err(e) => {
					self.state = WorkerState::ShuttingDown;
					return Err(e);
				}
			};

			if msg.cmd.direction() != Direction::JobToWorker {
				self.state = WorkerState::ShuttingDown;
				return Err(ProtocolError::WrongDirection(msg.cmd as u32));
			}

			match msg.cmd {
				Command::MetaData => {
					let map: BTreeMap<String, String> = codec::decode_args(&msg.payload)?;
					trace!("incoming metadata replaced ({} keys)", map.len());
					self.meta.set_incoming(map);
				}
				Command::SetHost => {
					// Handled directly: every other operation depends on the
					// host and credentials being current.
					let args: SetHostArgs = codec::decode_args(&msg.payload)?;
					let spec = HostSpec {
						host: args.host,
						port: args.port,
						user: args.user,
						password: args.pass,
					};
					debug!("setHost {}:{}", spec.host, spec.port);
					handler.set_host(&spec).await;
					self.host = Some(spec);
					self.connected_host = false;
				}
				_ => {
					self.dispatch(handler, msg).await?;
					if self.kill.is_set() {
						self.state = WorkerState::ShuttingDown;
						return Ok(());
					}
				}
			}
		}
	}

	/// Idle read, arbitrated against the special-command timer.
	async fn read_idle(
		conn: &mut Connection,
		special_timer: &mut Option<SpecialTimer>,
	) -> Result<Option<Message>, ProtocolError> {
		let deadline = special_timer.as_ref().map(|t| t.deadline);
		let received = match deadline {
			Some(deadline) => match tokio::time::timeout_at(deadline, conn.recv()).await {
				Ok(res) => res,
				Err(_) => {
					let payload = special_timer.take().map(|t| t.payload).unwrap_or_default();
					debug!("special-command timer fired");
					return Ok(Some(Message::new(Command::Special, payload)));
				}
			},
			None => conn.recv().await,
		};
		match received {
			Ok(msg) => Ok(Some(msg)),
			Err(ProtocolError::Closed) => Ok(None),
			Err(e) => Err(e),
		}
	}

	async fn dispatch<H>(&mut self, handler: &mut H, msg: Message) -> Result<(), ProtocolError>
	where
		H: WorkerHandler + ?Sized,
	{
		self.state = WorkerState::Dispatching;
		debug!("dispatching {}", msg.cmd);

		if msg.cmd == Command::Open {
			let args: OpenArgs = codec::decode_args(&msg.payload)?;
			return self.run_open_session(handler, args).await;
		}

		let outcome: Result<(), WorkerError> = match msg.cmd {
			Command::OpenConnection => handler.open_connection(self).await,
			Command::CloseConnection => {
				handler.close_connection(self).await;
				Ok(())
			}
			Command::Get => match self.decode_url(&msg.payload)? {
				Ok(url) => handler.get(self, &url).await,
				Err(e) => Err(e),
			},
			Command::Put => {
				let args: PutArgs = codec::decode_args(&msg.payload)?;
				let flags = JobFlags::from_bits_truncate(args.flags);
				match ResourceUrl::parse(&args.url) {
					Ok(url) => handler.put(self, &url, args.permissions, flags).await,
					Err(e) => Err(e),
				}
			}
			Command::Stat => match self.decode_url(&msg.payload)? {
				Ok(url) => handler.stat(self, &url).await,
				Err(e) => Err(e),
			},
			Command::Mimetype => match self.decode_url(&msg.payload)? {
				Ok(url) => handler.mimetype(self, &url).await,
				Err(e) => Err(e),
			},
			Command::ListDir => match self.decode_url(&msg.payload)? {
				Ok(url) => handler.list_dir(self, &url).await,
				Err(e) => Err(e),
			},
			Command::Mkdir => {
				let args: MkdirArgs = codec::decode_args(&msg.payload)?;
				match ResourceUrl::parse(&args.url) {
					Ok(url) => handler.mkdir(self, &url, args.permissions).await,
					Err(e) => Err(e),
				}
			}
			Command::Rename => {
				let args: RenameArgs = codec::decode_args(&msg.payload)?;
				let flags = JobFlags::from_bits_truncate(args.flags);
				match Self::parse_pair(&args.src, &args.dest) {
					Ok((src, dest)) => handler.rename(self, &src, &dest, flags).await,
					Err(e) => Err(e),
				}
			}
			Command::Symlink => {
				let args: SymlinkArgs = codec::decode_args(&msg.payload)?;
				let flags = JobFlags::from_bits_truncate(args.flags);
				match ResourceUrl::parse(&args.dest) {
					Ok(dest) => handler.symlink(self, &args.target, &dest, flags).await,
					Err(e) => Err(e),
				}
			}
			Command::Chmod => {
				let args: ChmodArgs = codec::decode_args(&msg.payload)?;
				match ResourceUrl::parse(&args.url) {
					Ok(url) => handler.chmod(self, &url, args.permissions).await,
					Err(e) => Err(e),
				}
			}
			Command::Chown => {
				let args: ChownArgs = codec::decode_args(&msg.payload)?;
				match ResourceUrl::parse(&args.url) {
					Ok(url) => handler.chown(self, &url, &args.owner, &args.group).await,
					Err(e) => Err(e),
				}
			}
			Command::SetModificationTime => {
				let args: SetModificationTimeArgs = codec::decode_args(&msg.payload)?;
				match ResourceUrl::parse(&args.url) {
					Ok(url) => handler.set_modification_time(self, &url, args.mtime).await,
					Err(e) => Err(e),
				}
			}
			Command::Copy => {
				let args: CopyArgs = codec::decode_args(&msg.payload)?;
				let flags = JobFlags::from_bits_truncate(args.flags);
				match Self::parse_pair(&args.src, &args.dest) {
					Ok((src, dest)) => {
						handler.copy(self, &src, &dest, args.permissions, flags).await
					}
					Err(e) => Err(e),
				}
			}
			Command::Del => {
				let args: DelArgs = codec::decode_args(&msg.payload)?;
				match ResourceUrl::parse(&args.url) {
					Ok(url) => handler.del(self, &url, args.is_file).await,
					Err(e) => Err(e),
				}
			}
			Command::SetLinkDest => {
				let args: SetLinkDestArgs = codec::decode_args(&msg.payload)?;
				match ResourceUrl::parse(&args.url) {
					Ok(url) => handler.set_link_dest(self, &url, &args.target).await,
					Err(e) => Err(e),
				}
			}
			Command::Special => handler.special(self, &msg.payload).await,
			Command::MultiGet => {
				let args: MultiGetArgs = codec::decode_args(&msg.payload)?;
				handler.multi_get(self, &args.requests).await
			}
			Command::WorkerStatus => handler.worker_status(self).await,
			Command::ReparseConfiguration => handler.reparse_configuration(self).await,
			Command::SubUrl => match self.decode_url(&msg.payload)? {
				Ok(url) => handler.sub_url(self, &url).await,
				Err(e) => Err(e),
			},
			// Sync-request answers and streaming sub-commands are only
			// valid inside the wait that asked for them.
			other => {
				self.state = WorkerState::ShuttingDown;
				return Err(ProtocolError::UnexpectedCommand(other as u32));
			}
		};

		self.finish_command(msg.cmd, outcome).await
	}

	/// Emit the single terminal signal for a dispatched command.
	async fn finish_command(
		&mut self,
		cmd: Command,
		outcome: Result<(), WorkerError>,
	) -> Result<(), ProtocolError> {
		if self.kill.is_set() {
			// A killed worker stops signaling; lifecycle teardown follows.
			self.meta.discard_outgoing();
			return Ok(());
		}

		// Every listDir ends with its partial batch on the wire, whether
		// the listing succeeded or not.
		if cmd == Command::ListDir {
			if let Some(tail) = self.batcher.take() {
				self.emit(Command::ListEntries, &tail).await?;
			}
		}

		match outcome {
			Ok(()) => match cmd {
				Command::OpenConnection => {
					self.connected_host = true;
					self.conn.send(Command::Connected, &[]).await?;
				}
				Command::CloseConnection => {
					self.connected_host = false;
				}
				_ => {
					if !self.meta.outgoing_is_empty() {
						let map = self.meta.take_outgoing(FlushMode::Clear);
						self.emit(Command::MetaDataFlush, &map).await?;
					}
					self.conn.send(Command::Finished, &[]).await?;
				}
			},
			Err(e) => {
				debug!("{} failed: {}", cmd, e);
				self.meta.discard_outgoing();
				let args = ErrorArgs { code: e.code as u32, text: e.text };
				self.emit(Command::Error, &args).await?;
			}
		}
		Ok(())
	}

	/// Nested loop for the streaming open/read/write/seek/close session.
	/// The whole session is one top-level command and yields exactly one
	/// terminal signal.
	async fn run_open_session<H>(
		&mut self,
		handler: &mut H,
		args: OpenArgs,
	) -> Result<(), ProtocolError>
	where
		H: WorkerHandler + ?Sized,
	{
		let url = match ResourceUrl::parse(&args.url) {
			Ok(url) => url,
			Err(e) => return self.finish_command(Command::Open, Err(e)).await,
		};
		let flags = OpenFlags::from_bits_truncate(args.flags);
		if let Err(e) = handler.open(self, &url, flags).await {
			return self.finish_command(Command::Open, Err(e)).await;
		}
		self.conn.send(Command::Opened, &[]).await?;

		loop {
			let kill = self.kill.clone();
			let msg = tokio::select! {
				_ = kill.cancelled() => {
					self.state = WorkerState::ShuttingDown;
					return Ok(());
				}
				res = self.conn.recv() => match res {
					Ok(msg) => msg,
					Err(ProtocolError::Closed) => return Ok(()),
					Err(e) => return Err(e),
				}
			};
			match msg.cmd {
				Command::MetaData => {
					let map: BTreeMap<String, String> = codec::decode_args(&msg.payload)?;
					self.meta.set_incoming(map);
				}
				Command::Read => {
					let read_args: ReadArgs = codec::decode_args(&msg.payload)?;
					if let Err(e) = handler.read(self, read_args.size).await {
						return self.finish_command(Command::Open, Err(e)).await;
					}
				}
				Command::Write => match handler.write(self, &msg.payload).await {
					Ok(n) => self.emit(Command::Written, &SizeArgs { bytes: n }).await?,
					Err(e) => return self.finish_command(Command::Open, Err(e)).await,
				},
				Command::Seek => {
					let seek_args: SeekArgs = codec::decode_args(&msg.payload)?;
					match handler.seek(self, seek_args.offset).await {
						Ok(pos) => self.emit(Command::Position, &SizeArgs { bytes: pos }).await?,
						Err(e) => return self.finish_command(Command::Open, Err(e)).await,
					}
				}
				Command::Close => {
					let outcome = handler.close(self).await;
					return self.finish_command(Command::Open, outcome).await;
				}
				other => {
					self.state = WorkerState::ShuttingDown;
					return Err(ProtocolError::UnexpectedCommand(other as u32));
				}
			}
		}
	}

	fn decode_url(&self, payload: &[u8]) -> Result<Result<ResourceUrl, WorkerError>, ProtocolError> {
		let args: UrlArgs = codec::decode_args(payload)?;
		Ok(ResourceUrl::parse(&args.url))
	}

	fn parse_pair(src: &str, dest: &str) -> Result<(ResourceUrl, ResourceUrl), WorkerError> {
		Ok((ResourceUrl::parse(src)?, ResourceUrl::parse(dest)?))
	}

	async fn emit<T: Serialize>(&mut self, cmd: Command, args: &T) -> Result<(), ProtocolError> {
		let payload = codec::encode_args(args)?;
		self.conn.send(cmd, &payload).await
	}
}


// vim: ts=4
