//! Framed message channel between worker and job
//!
//! Wraps any ordered byte stream pair in the message framing from
//! `protocol::codec`. The transport itself (pipes, sockets, an in-memory
//! duplex for tests) is supplied from outside; the worker process
//! normally runs on its inherited stdio.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::logging::*;
use crate::protocol::codec::{self, HEADER_SIZE};
use crate::protocol::{Command, Message, ProtocolError};

pub struct Connection {
	reader: BufReader<Box<dyn AsyncRead + Send + Unpin>>,
	writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl Connection {
	pub fn new(
		reader: impl AsyncRead + Send + Unpin + 'static,
		writer: impl AsyncWrite + Send + Unpin + 'static,
	) -> Self {
		Self {
			reader: BufReader::new(Box::new(reader) as Box<dyn AsyncRead + Send + Unpin>),
			writer: Box::new(writer),
		}
	}

	/// The channel a spawned worker inherits from its job.
	pub fn stdio() -> Self {
		Self::new(tokio::io::stdin(), tokio::io::stdout())
	}

	/// An in-memory connection pair: one end for the worker under test,
	/// one for the test acting as the job.
	pub fn pair(capacity: usize) -> (Connection, Connection) {
		let (a, b) = tokio::io::duplex(capacity);
		let (a_read, a_write) = tokio::io::split(a);
		let (b_read, b_write) = tokio::io::split(b);
		(Connection::new(a_read, a_write), Connection::new(b_read, b_write))
	}

	/// Send one framed message and flush it.
	pub async fn send(&mut self, cmd: Command, payload: &[u8]) -> Result<(), ProtocolError> {
		let header = codec::frame_header(cmd, payload.len())?;
		trace!("send {} ({} bytes)", cmd, payload.len());
		self.writer.write_all(&header).await?;
		if !payload.is_empty() {
			self.writer.write_all(payload).await?;
		}
		self.writer.flush().await?;
		Ok(())
	}

	/// Receive the next framed message.
	///
	/// A clean close between frames is `ProtocolError::Closed`; running dry
	/// inside a frame is `Truncated` and unrecoverable.
	pub async fn recv(&mut self) -> Result<Message, ProtocolError> {
		let mut header = [0u8; HEADER_SIZE];
		let n = self.reader.read(&mut header).await?;
		if n == 0 {
			return Err(ProtocolError::Closed);
		}
		if n < HEADER_SIZE {
			self.reader
				.read_exact(&mut header[n..])
				.await
				.map_err(|e| map_eof(e, ProtocolError::Truncated))?;
		}

		let (cmd, len) = codec::parse_header(&header)?;
		let mut payload = vec![0u8; len];
		if len > 0 {
			self.reader
				.read_exact(&mut payload)
				.await
				.map_err(|e| map_eof(e, ProtocolError::Truncated))?;
		}
		if tracing::enabled!(tracing::Level::TRACE) {
			let preview = &payload[..payload.len().min(32)];
			trace!("recv {} ({} bytes) {}", cmd, payload.len(), hex::encode(preview));
		}
		Ok(Message::new(cmd, payload))
	}
}

fn map_eof(e: std::io::Error, eof: ProtocolError) -> ProtocolError {
	if e.kind() == std::io::ErrorKind::UnexpectedEof {
		eof
	} else {
		ProtocolError::Io(e)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_send_recv_round_trip() {
		let (mut a, mut b) = Connection::pair(4096);
		a.send(Command::Data, b"hello").await.unwrap();
		let msg = b.recv().await.unwrap();
		assert_eq!(msg.cmd, Command::Data);
		assert_eq!(msg.payload, b"hello");
	}

	#[tokio::test]
	async fn test_clean_close_between_frames() {
		let (a, mut b) = Connection::pair(4096);
		drop(a);
		match b.recv().await {
			Err(ProtocolError::Closed) => {}
			other => panic!("expected Closed, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_truncated_frame_is_fatal() {
		let (a, mut b) = Connection::pair(4096);
		// Write a header promising 100 payload bytes, then hang up.
		let mut a = a;
		let header = codec::frame_header(Command::Data, 100).unwrap();
		a.writer.write_all(&header).await.unwrap();
		a.writer.flush().await.unwrap();
		drop(a);
		match b.recv().await {
			Err(ProtocolError::Truncated) => {}
			other => panic!("expected Truncated, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_empty_payload() {
		let (mut a, mut b) = Connection::pair(4096);
		a.send(Command::Finished, &[]).await.unwrap();
		let msg = b.recv().await.unwrap();
		assert_eq!(msg.cmd, Command::Finished);
		assert!(msg.payload.is_empty());
	}
}

// vim: ts=4
