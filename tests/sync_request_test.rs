//! Sync-request protocol tests
//!
//! A handler running inside a dispatched command obtains more input from
//! the job through narrow nested receives: data pulls, message boxes,
//! credential round-trips, privilege checks and host lookups. These tests
//! script the job side of each exchange and check the timeout and
//! violation behavior the handlers rely on.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use workr::error::ErrorCode;
use workr::handler::{HandlerResult, WorkerHandler};
use workr::protocol::codec::{
	self, AuthAnswerArgs, AuthInfo, AuthRequestArgs, CanResumeQueryArgs, ErrorArgs,
	HostInfoAnswerArgs, MessageBoxAnswerArgs, MessageBoxArgs, PrivilegeAnswerArgs,
	PrivilegeRequestArgs, PutArgs, ResumeAnswerArgs,
};
use workr::protocol::{Command, JobFlags, Message, ProtocolError};
use workr::resource::ResourceUrl;
use workr::worker::{ButtonCode, MessageBoxKind, PrivilegeOperationStatus, Worker};
use workr::{Connection, WorkerError};

type WorkerTask = tokio::task::JoinHandle<Result<(), ProtocolError>>;

fn spawn_worker<H>(handler: H) -> (WorkerTask, Connection)
where
	H: WorkerHandler + 'static,
{
	let (worker_conn, job_conn) = Connection::pair(1 << 20);
	let task = tokio::spawn(async move {
		let mut worker = Worker::new("test", worker_conn);
		let mut handler = handler;
		worker.run(&mut handler).await
	});
	(task, job_conn)
}

async fn recv(job: &mut Connection) -> Message {
	tokio::time::timeout(Duration::from_secs(10), job.recv())
		.await
		.expect("worker went silent")
		.expect("connection died")
}

async fn recv_expect(job: &mut Connection, cmd: Command) -> Message {
	let msg = recv(job).await;
	assert_eq!(msg.cmd, cmd, "expected {}, got {}", cmd, msg.cmd);
	msg
}

async fn send_args<T: serde::Serialize>(job: &mut Connection, cmd: Command, args: &T) {
	let payload = codec::encode_args(args).unwrap();
	job.send(cmd, &payload).await.unwrap();
}

fn error_code_of(msg: &Message) -> u32 {
	let args: ErrorArgs = codec::decode_args(&msg.payload).unwrap();
	args.code
}

// ============================================================================
// readData (dataReq/dataAnswer)
// ============================================================================

/// Collects put payload through request_data, like a real upload handler.
struct SinkHandler {
	received: Arc<Mutex<Vec<u8>>>,
}

#[async_trait]
impl WorkerHandler for SinkHandler {
	async fn put(
		&mut self,
		w: &mut Worker,
		_url: &ResourceUrl,
		_permissions: i32,
		_flags: JobFlags,
	) -> HandlerResult {
		let mut total = 0u64;
		loop {
			let chunk = w.request_data().await?;
			if chunk.is_empty() {
				break;
			}
			total += chunk.len() as u64;
			self.received.lock().unwrap().extend_from_slice(&chunk);
			w.processed_size(total).await?;
		}
		Ok(())
	}
}

#[tokio::test]
async fn test_request_data_pulls_until_empty_block() {
	let received = Arc::new(Mutex::new(Vec::new()));
	let (task, mut job) = spawn_worker(SinkHandler { received: received.clone() });

	send_args(
		&mut job,
		Command::Put,
		&PutArgs { url: "test:///up".to_string(), permissions: -1, flags: JobFlags::empty().bits() },
	)
	.await;

	recv_expect(&mut job, Command::DataReq).await;
	job.send(Command::DataAnswer, b"first ").await.unwrap();
	recv_expect(&mut job, Command::ProcessedSize).await;
	recv_expect(&mut job, Command::DataReq).await;
	job.send(Command::DataAnswer, b"second").await.unwrap();
	recv_expect(&mut job, Command::ProcessedSize).await;
	recv_expect(&mut job, Command::DataReq).await;
	job.send(Command::DataAnswer, &[]).await.unwrap();
	recv_expect(&mut job, Command::Finished).await;

	assert_eq!(received.lock().unwrap().as_slice(), b"first second");

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_wait_for_answer_times_out_as_an_error_not_a_hang() {
	let received = Arc::new(Mutex::new(Vec::new()));
	let (task, mut job) = spawn_worker(SinkHandler { received });

	// Shrink the response timeout through job-supplied configuration.
	let meta: std::collections::BTreeMap<String, String> =
		[("responseTimeout".to_string(), "1".to_string())].into_iter().collect();
	send_args(&mut job, Command::MetaData, &meta).await;
	send_args(
		&mut job,
		Command::Put,
		&PutArgs { url: "test:///up".to_string(), permissions: -1, flags: JobFlags::empty().bits() },
	)
	.await;

	recv_expect(&mut job, Command::DataReq).await;
	// Never answer. The nested wait must give up on its own.
	let started = Instant::now();
	let msg = recv_expect(&mut job, Command::Error).await;
	let elapsed = started.elapsed();
	assert_eq!(error_code_of(&msg), ErrorCode::ServerTimeout as u32);
	assert!(elapsed >= Duration::from_millis(800), "gave up too early: {:?}", elapsed);
	assert!(elapsed < Duration::from_secs(5), "gave up too late: {:?}", elapsed);

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unexpected_command_during_wait_fails_the_operation() {
	let received = Arc::new(Mutex::new(Vec::new()));
	let (task, mut job) = spawn_worker(SinkHandler { received });

	send_args(
		&mut job,
		Command::Put,
		&PutArgs { url: "test:///up".to_string(), permissions: -1, flags: JobFlags::empty().bits() },
	)
	.await;
	recv_expect(&mut job, Command::DataReq).await;

	// Answer with something the worker never asked about.
	job.send(Command::Special, b"noise").await.unwrap();
	let msg = recv_expect(&mut job, Command::Error).await;
	assert_eq!(error_code_of(&msg), ErrorCode::InternalError as u32);

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_kill_during_wait_aborts_without_further_signals() {
	let (worker_conn, mut job) = Connection::pair(1 << 20);
	let mut worker = Worker::new("test", worker_conn);
	let kill = worker.kill_switch();
	let received = Arc::new(Mutex::new(Vec::new()));
	let task = tokio::spawn(async move {
		let mut handler = SinkHandler { received };
		worker.run(&mut handler).await
	});

	send_args(
		&mut job,
		Command::Put,
		&PutArgs { url: "test:///up".to_string(), permissions: -1, flags: JobFlags::empty().bits() },
	)
	.await;
	recv_expect(&mut job, Command::DataReq).await;

	kill.trigger();
	// The worker winds down without a terminal signal for the command.
	tokio::time::timeout(Duration::from_secs(5), task)
		.await
		.expect("worker ignored kill during nested wait")
		.unwrap()
		.unwrap();
	match job.recv().await {
		Err(ProtocolError::Closed) => {}
		other => panic!("expected silence then close after kill, got {:?}", other),
	}
}

// ============================================================================
// Message box, resume query, auth, privilege, host info
// ============================================================================

#[derive(Default)]
struct ExchangeHandler;

#[async_trait]
impl WorkerHandler for ExchangeHandler {
	async fn special(&mut self, w: &mut Worker, data: &[u8]) -> HandlerResult {
		match data {
			b"ask" => {
				let button = w
					.message_box(
						MessageBoxKind::WarningContinueCancel,
						"overwrite the lot?",
						"Transfer",
						"Continue",
						"Cancel",
					)
					.await?;
				if button == ButtonCode::Continue {
					Ok(())
				} else {
					Err(WorkerError::new(ErrorCode::UserCanceled, "declined"))
				}
			}
			b"ask-legacy" => {
				let button = w
					.message_box_legacy("proceed?", MessageBoxKind::QuestionYesNo, "", "", "")
					.await?;
				if button == ButtonCode::Yes {
					Ok(())
				} else {
					Err(WorkerError::new(ErrorCode::UserCanceled, "declined"))
				}
			}
			b"resume" => {
				if w.can_resume_offset(4096).await? {
					Ok(())
				} else {
					Err(WorkerError::new(ErrorCode::CannotResume, "rejected"))
				}
			}
			b"auth" => {
				let mut info = AuthInfo {
					url: "test://files.example.org/".to_string(),
					username: "anon".to_string(),
					..AuthInfo::default()
				};
				if w.check_cached_authentication(&mut info).await? {
					return Err(WorkerError::new(ErrorCode::InternalError, "unexpected cache hit"));
				}
				w.open_password_dialog(&mut info, "").await?;
				if info.password.is_empty() {
					return Err(WorkerError::new(ErrorCode::InternalError, "no password"));
				}
				if !w.cache_authentication(&info).await? {
					return Err(WorkerError::new(ErrorCode::InternalError, "cache refused"));
				}
				Ok(())
			}
			b"auth-cancel" => {
				let mut info = AuthInfo::default();
				match w.open_password_dialog(&mut info, "try again").await {
					Err(e) if e.code == ErrorCode::UserCanceled => Ok(()),
					other => Err(WorkerError::new(
						ErrorCode::InternalError,
						format!("expected cancel, got {:?}", other),
					)),
				}
			}
			b"priv-granted" => {
				w.add_temporary_authorization("org.example.mount");
				match w.request_privilege_operation("org.example.mount", "mount /dev/sdb1").await? {
					PrivilegeOperationStatus::Authorized => Ok(()),
					status => Err(WorkerError::new(
						ErrorCode::AccessDenied,
						format!("unexpected status {:?}", status),
					)),
				}
			}
			b"priv-ask" => {
				match w.request_privilege_operation("org.example.format", "format /dev/sdb").await? {
					PrivilegeOperationStatus::NotAuthorized => {
						Err(WorkerError::new(ErrorCode::AccessDenied, "org.example.format"))
					}
					status => Err(WorkerError::new(
						ErrorCode::InternalError,
						format!("unexpected status {:?}", status),
					)),
				}
			}
			b"host" => {
				w.lookup_host("files.example.org").await?;
				let resolved = w.wait_for_host_info().await?;
				if resolved.addresses.len() == 2 {
					Ok(())
				} else {
					Err(WorkerError::new(ErrorCode::UnknownHost, resolved.hostname))
				}
			}
			b"host-fail" => {
				w.lookup_host("nowhere.invalid").await?;
				w.wait_for_host_info().await.map(|_| ())
			}
			_ => Err(WorkerError::new(ErrorCode::InternalError, "unknown script")),
		}
	}
}

#[tokio::test]
async fn test_message_box_round_trip() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"ask").await.unwrap();
	let msg = recv_expect(&mut job, Command::MessageBox).await;
	let args: MessageBoxArgs = codec::decode_args(&msg.payload).unwrap();
	assert_eq!(args.kind, MessageBoxKind::WarningContinueCancel as u32);
	assert_eq!(args.text, "overwrite the lot?");

	send_args(
		&mut job,
		Command::MessageBoxAnswer,
		&MessageBoxAnswerArgs { button: ButtonCode::Continue as u32 },
	)
	.await;
	recv_expect(&mut job, Command::Finished).await;

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_message_box_legacy_wrapper_and_refusal() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"ask-legacy").await.unwrap();
	let msg = recv_expect(&mut job, Command::MessageBox).await;
	let args: MessageBoxArgs = codec::decode_args(&msg.payload).unwrap();
	assert_eq!(args.kind, MessageBoxKind::QuestionYesNo as u32);

	send_args(
		&mut job,
		Command::MessageBoxAnswer,
		&MessageBoxAnswerArgs { button: ButtonCode::No as u32 },
	)
	.await;
	let msg = recv_expect(&mut job, Command::Error).await;
	assert_eq!(error_code_of(&msg), ErrorCode::UserCanceled as u32);

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_resume_query_round_trip() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"resume").await.unwrap();
	let msg = recv_expect(&mut job, Command::CanResumeQuery).await;
	let args: CanResumeQueryArgs = codec::decode_args(&msg.payload).unwrap();
	assert_eq!(args.offset, 4096);

	send_args(&mut job, Command::ResumeAnswer, &ResumeAnswerArgs { accepted: true }).await;
	recv_expect(&mut job, Command::Finished).await;

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_credential_broker_round_trips() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"auth").await.unwrap();

	// Cache probe: miss.
	let msg = recv_expect(&mut job, Command::AuthRequest).await;
	let args: AuthRequestArgs = codec::decode_args(&msg.payload).unwrap();
	assert!(args.check_only);
	send_args(
		&mut job,
		Command::AuthAnswer,
		&AuthAnswerArgs { code: ErrorCode::DoesNotExist as u32, info: AuthInfo::default() },
	)
	.await;

	// Interactive prompt: succeed with credentials.
	let msg = recv_expect(&mut job, Command::AuthRequest).await;
	let args: AuthRequestArgs = codec::decode_args(&msg.payload).unwrap();
	assert!(!args.check_only && !args.cache_only);
	assert_eq!(args.info.username, "anon");
	let mut filled = args.info.clone();
	filled.password = "hunter2".to_string();
	send_args(&mut job, Command::AuthAnswer, &AuthAnswerArgs { code: 0, info: filled }).await;

	// Store request.
	let msg = recv_expect(&mut job, Command::AuthRequest).await;
	let args: AuthRequestArgs = codec::decode_args(&msg.payload).unwrap();
	assert!(args.cache_only);
	assert_eq!(args.info.password, "hunter2");
	send_args(&mut job, Command::AuthAnswer, &AuthAnswerArgs { code: 0, info: args.info }).await;

	recv_expect(&mut job, Command::Finished).await;

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_password_dialog_cancellation_maps_to_error_code() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"auth-cancel").await.unwrap();
	recv_expect(&mut job, Command::AuthRequest).await;
	send_args(
		&mut job,
		Command::AuthAnswer,
		&AuthAnswerArgs { code: ErrorCode::UserCanceled as u32, info: AuthInfo::default() },
	)
	.await;
	// The handler expected the cancellation and reports success.
	recv_expect(&mut job, Command::Finished).await;

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_temporary_authorization_short_circuits_privilege_check() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"priv-granted").await.unwrap();
	// No PrivilegeRequest may reach the job; the next message is terminal.
	let msg = recv(&mut job).await;
	assert_eq!(msg.cmd, Command::Finished, "unexpected {}", msg.cmd);

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_privilege_check_round_trip() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"priv-ask").await.unwrap();
	let msg = recv_expect(&mut job, Command::PrivilegeRequest).await;
	let args: PrivilegeRequestArgs = codec::decode_args(&msg.payload).unwrap();
	assert_eq!(args.action, "org.example.format");

	send_args(
		&mut job,
		Command::PrivilegeAnswer,
		&PrivilegeAnswerArgs { status: PrivilegeOperationStatus::NotAuthorized as u32 },
	)
	.await;
	let msg = recv_expect(&mut job, Command::Error).await;
	assert_eq!(error_code_of(&msg), ErrorCode::AccessDenied as u32);

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_host_lookup_round_trip() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"host").await.unwrap();
	let msg = recv_expect(&mut job, Command::HostInfoRequest).await;
	let args: codec::HostInfoRequestArgs = codec::decode_args(&msg.payload).unwrap();
	assert_eq!(args.host, "files.example.org");

	send_args(
		&mut job,
		Command::HostInfoAnswer,
		&HostInfoAnswerArgs {
			hostname: "files.example.org".to_string(),
			addresses: vec![
				"192.0.2.17".to_string(),
				"2001:db8::17".to_string(),
			],
			error: 0,
		},
	)
	.await;
	recv_expect(&mut job, Command::Finished).await;

	drop(job);
	task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_host_lookup_failure_surfaces_unknown_host() {
	let (task, mut job) = spawn_worker(ExchangeHandler);

	job.send(Command::Special, b"host-fail").await.unwrap();
	recv_expect(&mut job, Command::HostInfoRequest).await;
	send_args(
		&mut job,
		Command::HostInfoAnswer,
		&HostInfoAnswerArgs {
			hostname: "nowhere.invalid".to_string(),
			addresses: Vec::new(),
			error: ErrorCode::UnknownHost as u32,
		},
	)
	.await;
	let msg = recv_expect(&mut job, Command::Error).await;
	assert_eq!(error_code_of(&msg), ErrorCode::UnknownHost as u32);

	drop(job);
	task.await.unwrap().unwrap();
}

// vim: ts=4
