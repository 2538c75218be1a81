//! # workr - I/O worker protocol engine
//!
//! workr is the worker side of a job/worker virtual-filesystem stack: a
//! job-based client issues operations (stat, get, put, listDir, rename,
//! copy, del, ...) against URL-addressed resources, and an out-of-process
//! worker executes them, streaming data, entries and metadata back over a
//! framed byte channel.
//!
//! A protocol implementation plugs in by implementing [`WorkerHandler`]
//! and handing it to a [`Worker`] bound to a [`Connection`]:
//!
//! ```rust,ignore
//! use workr::{Connection, Worker};
//! use workr::fileworker::FileWorker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut worker = Worker::new("file", Connection::stdio());
//!     let mut handler = FileWorker::new("/srv/data");
//!     worker.run(&mut handler).await?;
//!     Ok(())
//! }
//! ```
//!
//! The engine owns the dispatch loop, the terminal-signal discipline
//! (exactly one `finished` or `error` per command), entry batching for
//! listings, the metadata store, sync-requests toward the job
//! (data pulls, message boxes, credentials, privilege checks, host
//! lookups) and cooperative kill handling.

pub mod batch;
pub mod config;
pub mod connection;
pub mod entry;
pub mod error;
pub mod fileworker;
pub mod handler;
pub mod logging;
pub mod metadata;
pub mod protocol;
pub mod resource;
pub mod worker;

// Re-export commonly used types
pub use config::WorkerConfig;
pub use connection::Connection;
pub use entry::{StatDetails, UdsEntry, UdsField, UdsValue};
pub use error::{ErrorCode, WorkerError};
pub use handler::{HandlerResult, WorkerHandler};
pub use metadata::FlushMode;
pub use protocol::{Command, Direction, JobFlags, Message, OpenFlags, ProtocolError};
pub use resource::ResourceUrl;
pub use worker::{ButtonCode, KillSwitch, MessageBoxKind, PrivilegeOperationStatus, Worker, WorkerState};

// vim: ts=4
