//! Read session
//!
//! A connection bound to one opened file, serving many `READ`s at arbitrary
//! offsets until closed. States are `closed -> open -> closed`.

use bytes::Bytes;

use super::client::StoreClient;
use super::command::{validate_name, Command};
use super::connection::Connection;
use super::error::{ProtocolError, ProtocolResult};
use crate::logging::*;

pub struct ReadSession {
	client: StoreClient,
	conn: Option<Connection>,
	name: Option<String>,
}

impl ReadSession {
	/// New session in the closed state
	pub fn new(client: StoreClient) -> Self {
		Self { client, conn: None, name: None }
	}

	pub fn is_open(&self) -> bool {
		self.conn.is_some()
	}

	/// Name of the opened file
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Connect and `OPEN` the file; the session is open only on `OK`
	pub async fn open(&mut self, name: &str) -> ProtocolResult<()> {
		if self.is_open() {
			return Err(ProtocolError::InvalidState(format!(
				"session already open on {}",
				self.name.as_deref().unwrap_or_default()
			)));
		}
		validate_name(name)?;
		let mut conn = self.client.connect().await?;
		conn.call(&Command::Open(name.to_string()), None).await?;
		debug!("[session] opened {}", name);
		self.conn = Some(conn);
		self.name = Some(name.to_string());
		Ok(())
	}

	/// Read up to `length` bytes at `offset`; empty means no more data
	pub async fn read(&mut self, offset: u64, length: u64) -> ProtocolResult<Bytes> {
		let conn = match self.conn.as_mut() {
			Some(conn) => conn,
			None => return Err(ProtocolError::InvalidState("session is not open".to_string())),
		};
		match conn.call_with_payload(&Command::Read { offset, length }).await {
			Ok(data) => Ok(data),
			Err(e) => {
				if !conn.is_usable() {
					warn!("[session] closing {:?} after failure: {}", self.name, e);
					self.close();
				}
				Err(e)
			}
		}
	}

	/// Release the connection; valid from any state
	pub fn close(&mut self) {
		if let Some(conn) = self.conn.take() {
			drop(conn);
			debug!("[session] closed {}", self.name.as_deref().unwrap_or_default());
		}
		self.name = None;
	}
}

impl Drop for ReadSession {
	fn drop(&mut self) {
		self.close();
	}
}

// vim: ts=4
