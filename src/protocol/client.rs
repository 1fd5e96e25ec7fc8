//! Command client for the file store
//!
//! [`StoreClient`] is cheap to clone and opens a fresh connection for every
//! operation; the connection is dropped (and the socket closed) on every
//! exit path. Only [`ReadSession`] keeps a connection across calls.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::command::{parse_names, validate_name, Command};
use super::connection::{CallLimits, Connection};
use super::error::{ProtocolError, ProtocolResult};
use super::session::ReadSession;
use crate::config::Config;
use crate::logging::*;

/// Connection settings shared by every call of a client
#[derive(Debug, Clone)]
pub struct ClientOptions {
	/// `host:port` of the store
	pub addr: String,
	pub connect_timeout: Duration,
	/// Per-call deadline, `None` disables it
	pub command_timeout: Option<Duration>,
	/// Largest payload accepted from the server
	pub max_frame_bytes: u64,
	/// Send `TRACE <id>` as the first line of every connection
	pub send_trace: bool,
	pub trace_prefix: String,
}

impl Default for ClientOptions {
	fn default() -> Self {
		ClientOptions::from(&Config::default())
	}
}

impl From<&Config> for ClientOptions {
	fn from(config: &Config) -> Self {
		ClientOptions {
			addr: config.server_addr.clone(),
			connect_timeout: Duration::from_millis(config.connect_timeout_ms),
			command_timeout: match config.command_timeout_ms {
				0 => None,
				ms => Some(Duration::from_millis(ms)),
			},
			max_frame_bytes: config.max_frame_bytes,
			send_trace: config.send_trace,
			trace_prefix: config.trace_prefix.clone(),
		}
	}
}

/// Outcome of a WRITE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
	/// Bytes sent
	pub requested: u64,
	/// Bytes the server reported as written
	pub acknowledged: u64,
}

impl WriteAck {
	pub fn is_complete(&self) -> bool {
		self.acknowledged == self.requested
	}
}

/// Build a fresh trace id: `<prefix>:<pid>-<uuid>`
pub fn new_trace_id(prefix: &str) -> String {
	format!("{}:{}-{}", prefix, std::process::id(), uuid::Uuid::new_v4().simple())
}

/// Client for the line-framed file store protocol
#[derive(Debug, Clone)]
pub struct StoreClient {
	options: Arc<ClientOptions>,
	trace: Option<String>,
	cancel: CancellationToken,
}

impl StoreClient {
	pub fn new(options: ClientOptions) -> Self {
		Self { options: Arc::new(options), trace: None, cancel: CancellationToken::new() }
	}

	pub fn from_config(config: &Config) -> Self {
		Self::new(ClientOptions::from(config))
	}

	pub fn options(&self) -> &ClientOptions {
		&self.options
	}

	/// Same client, but every connection announces `trace_id`
	pub fn with_trace(&self, trace_id: impl Into<String>) -> Self {
		Self { trace: Some(trace_id.into()), ..self.clone() }
	}

	/// Same client, with calls aborted once `cancel` fires
	pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
		Self { cancel, ..self.clone() }
	}

	pub fn cancel_token(&self) -> &CancellationToken {
		&self.cancel
	}

	pub(crate) async fn connect(&self) -> ProtocolResult<Connection> {
		let trace = if self.options.send_trace {
			Some(self.trace.clone().unwrap_or_else(|| new_trace_id(&self.options.trace_prefix)))
		} else {
			None
		};
		let limits = CallLimits::new(self.options.command_timeout, self.cancel.clone());
		Connection::connect(&self.options, limits, trace).await
	}

	/// Create the file if it does not exist
	pub async fn open(&self, name: &str) -> ProtocolResult<()> {
		validate_name(name)?;
		let mut conn = self.connect().await?;
		conn.call(&Command::Open(name.to_string()), None).await?;
		Ok(())
	}

	/// Active file names in server order
	pub async fn list(&self) -> ProtocolResult<Vec<String>> {
		let mut conn = self.connect().await?;
		let payload = conn.call_with_payload(&Command::List).await?;
		Ok(parse_names(&payload))
	}

	/// Current size of a file
	pub async fn stat(&self, name: &str) -> ProtocolResult<u64> {
		validate_name(name)?;
		let mut conn = self.connect().await?;
		conn.call(&Command::Stat(name.to_string()), None)
			.await?
			.ok_or_else(|| ProtocolError::Malformed("STAT reply carries no size".to_string()))
	}

	/// Whole file content
	pub async fn read_full(&self, name: &str) -> ProtocolResult<Bytes> {
		let size = self.stat(name).await?;
		if size == 0 {
			return Ok(Bytes::new());
		}
		self.read_range(name, 0, size).await
	}

	/// Up to `length` bytes starting at `offset`
	pub async fn read_range(&self, name: &str, offset: u64, length: u64) -> ProtocolResult<Bytes> {
		validate_name(name)?;
		let mut conn = self.connect().await?;
		conn.call(&Command::Open(name.to_string()), None).await?;
		conn.call_with_payload(&Command::Read { offset, length }).await
	}

	/// Write `data` at `offset`
	///
	/// A short acknowledgement is returned as-is; it is never retried here.
	pub async fn write(&self, name: &str, offset: u64, data: &[u8]) -> ProtocolResult<WriteAck> {
		validate_name(name)?;
		let mut conn = self.connect().await?;
		conn.call(&Command::Open(name.to_string()), None).await?;
		let requested = data.len() as u64;
		let acknowledged = conn
			.call(&Command::Write { offset, length: requested }, Some(data))
			.await?
			.ok_or_else(|| ProtocolError::Malformed("WRITE reply carries no count".to_string()))?;
		let ack = WriteAck { requested, acknowledged };
		if !ack.is_complete() {
			warn!(
				"[client] short write on {} at {}: {} of {} bytes acknowledged",
				name, offset, acknowledged, requested
			);
		}
		Ok(ack)
	}

	/// Move a file to the trash
	pub async fn trash(&self, name: &str) -> ProtocolResult<()> {
		validate_name(name)?;
		let mut conn = self.connect().await?;
		conn.call(&Command::Trash(name.to_string()), None).await?;
		Ok(())
	}

	/// Delete is always a soft delete
	pub async fn delete(&self, name: &str) -> ProtocolResult<()> {
		self.trash(name).await
	}

	/// Trashed file names in server order
	pub async fn list_trash(&self) -> ProtocolResult<Vec<String>> {
		let mut conn = self.connect().await?;
		let payload = conn.call_with_payload(&Command::ListTrash).await?;
		Ok(parse_names(&payload))
	}

	/// Move a file from the trash back to the active namespace
	pub async fn restore(&self, name: &str) -> ProtocolResult<()> {
		validate_name(name)?;
		let mut conn = self.connect().await?;
		conn.call(&Command::Restore(name.to_string()), None).await?;
		Ok(())
	}

	/// Remove a trashed file for good
	pub async fn purge(&self, name: &str) -> ProtocolResult<()> {
		validate_name(name)?;
		let mut conn = self.connect().await?;
		conn.call(&Command::PurgeTrash(name.to_string()), None).await?;
		Ok(())
	}

	/// Open a read session on `name`
	pub async fn session(&self, name: &str) -> ProtocolResult<ReadSession> {
		let mut session = ReadSession::new(self.clone());
		session.open(name).await?;
		Ok(session)
	}
}


// vim: ts=4
