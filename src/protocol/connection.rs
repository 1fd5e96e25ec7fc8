//! Single TCP connection to the file store
//!
//! Carries one command at a time. Every exchange is bounded by the
//! connection's [`CallLimits`]; once a transport failure, timeout or
//! cancellation interrupts a frame the connection is marked broken and
//! refuses further commands, because the stream position is unknown.

use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::client::ClientOptions;
use super::command::{Command, Status};
use super::error::{ProtocolError, ProtocolResult};
use super::frame::FrameReader;
use crate::logging::*;

/// Deadline and cancellation applied to every call on a connection
#[derive(Debug, Clone, Default)]
pub struct CallLimits {
	/// Per-call deadline, `None` waits forever
	pub timeout: Option<Duration>,
	pub cancel: CancellationToken,
}

impl CallLimits {
	pub fn new(timeout: Option<Duration>, cancel: CancellationToken) -> Self {
		Self { timeout, cancel }
	}

	/// Run `fut` under the deadline, aborting early on cancellation
	pub async fn bound<T, F>(&self, fut: F) -> ProtocolResult<T>
	where
		F: Future<Output = ProtocolResult<T>>,
	{
		if self.cancel.is_cancelled() {
			return Err(ProtocolError::Cancelled);
		}
		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => Err(ProtocolError::Cancelled),
			res = with_deadline(self.timeout, fut) => res,
		}
	}
}

async fn with_deadline<T, F>(timeout: Option<Duration>, fut: F) -> ProtocolResult<T>
where
	F: Future<Output = ProtocolResult<T>>,
{
	match timeout {
		Some(limit) => match tokio::time::timeout(limit, fut).await {
			Ok(res) => res,
			Err(_) => Err(ProtocolError::Timeout { millis: limit.as_millis() as u64 }),
		},
		None => fut.await,
	}
}

/// Open connection with its read-ahead buffer
pub struct Connection {
	reader: FrameReader<TcpStream>,
	trace_id: Option<String>,
	limits: CallLimits,
	max_frame: u64,
	broken: bool,
}

impl Connection {
	/// Connect to the store and announce the trace id, if any
	pub async fn connect(
		options: &ClientOptions,
		limits: CallLimits,
		trace_id: Option<String>,
	) -> ProtocolResult<Self> {
		let connect_limits = CallLimits::new(Some(options.connect_timeout), limits.cancel.clone());
		let addr = options.addr.as_str();
		let stream = connect_limits
			.bound(async { TcpStream::connect(addr).await.map_err(ProtocolError::from) })
			.await?;
		stream.set_nodelay(true)?;

		let mut conn = Connection {
			reader: FrameReader::new(stream),
			trace_id,
			limits,
			max_frame: options.max_frame_bytes,
			broken: false,
		};
		if let Some(id) = conn.trace_id.clone() {
			let line = Command::Trace(id).encode()?;
			let limits = conn.limits.clone();
			let res = limits.bound(conn.send(line.as_bytes(), None)).await;
			conn.check(res)?;
		}
		debug!("[conn {}] connected to {}", conn.tag(), addr);
		Ok(conn)
	}

	pub fn trace_id(&self) -> Option<&str> {
		self.trace_id.as_deref()
	}

	/// False once a call was interrupted mid-frame
	pub fn is_usable(&self) -> bool {
		!self.broken
	}

	fn tag(&self) -> &str {
		self.trace_id.as_deref().unwrap_or("-")
	}

	fn check<T>(&mut self, res: ProtocolResult<T>) -> ProtocolResult<T> {
		if let Err(e) = &res {
			if e.is_transport() || matches!(e, ProtocolError::Malformed(_)) {
				self.broken = true;
			}
		}
		res
	}

	async fn send(&mut self, line: &[u8], payload: Option<&[u8]>) -> ProtocolResult<()> {
		let stream = self.reader.get_mut();
		stream.write_all(line).await?;
		if let Some(data) = payload {
			stream.write_all(data).await?;
		}
		stream.flush().await?;
		Ok(())
	}

	async fn exchange(&mut self, cmd: &Command, payload: Option<&[u8]>) -> ProtocolResult<Status> {
		let line = cmd.encode()?;
		self.send(line.as_bytes(), payload).await?;
		let reply = self.reader.read_line().await?;
		debug!("[conn {}] {} -> {}", self.tag(), cmd.verb(), reply);
		Status::parse(&reply)
	}

	/// Send one command and consume its status line
	///
	/// Returns the numeric argument of `OK <n>`, or `None` for a bare `OK`.
	/// Any payload announced by the reply is left for [`Connection::read_payload`].
	pub async fn call(
		&mut self,
		cmd: &Command,
		payload: Option<&[u8]>,
	) -> ProtocolResult<Option<u64>> {
		if self.broken {
			return Err(ProtocolError::InvalidState("connection is broken".to_string()));
		}
		let limits = self.limits.clone();
		let res = limits.bound(self.exchange(cmd, payload)).await;
		let status = self.check(res)?;
		status.into_result(cmd.verb())
	}

	/// Consume an `n` byte payload announced by the previous status line
	pub async fn read_payload(&mut self, n: u64) -> ProtocolResult<Bytes> {
		if n > self.max_frame {
			self.broken = true;
			return Err(ProtocolError::Malformed(format!(
				"payload of {} bytes exceeds the {} byte frame limit",
				n, self.max_frame
			)));
		}
		let limits = self.limits.clone();
		let res = limits.bound(self.reader.read_exact(n as usize)).await;
		self.check(res)
	}

	/// Command whose `OK <n>` reply is followed by `n` payload bytes
	pub async fn call_with_payload(&mut self, cmd: &Command) -> ProtocolResult<Bytes> {
		let n = self.call(cmd, None).await?.ok_or_else(|| {
			ProtocolError::Malformed(format!("{} reply carries no byte count", cmd.verb()))
		})?;
		self.read_payload(n).await
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		debug!("[conn {}] closed", self.tag());
	}
}


// vim: ts=4
