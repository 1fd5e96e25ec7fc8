//! Parallel chunk orchestration
//!
//! Chunked upload and parallel ranged download over any [`ChunkTransport`]:
//! the HTTP gateway ([`GatewayClient`]) or the store itself
//! ([`crate::protocol::StoreClient`]). Writes are offset-addressed and reads
//! land in index-addressed slots, so completion order never matters.

pub mod bulk;
pub mod direct;
pub mod download;
pub mod http;
pub mod plan;
pub mod upload;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

use crate::config::Config;
use crate::protocol::ProtocolError;

pub use bulk::{trash_many, BulkOutcome};
pub use download::download;
pub use http::GatewayClient;
pub use plan::{plan_chunks, ChunkRange};
pub use upload::{upload, UploadSummary};

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;

/// Chunk-level operations a transfer needs
#[async_trait]
pub trait ChunkTransport: Send + Sync {
	/// Create the file (empty) if missing
	async fn create(&self, name: &str) -> TransferResult<()>;

	async fn stat(&self, name: &str) -> TransferResult<u64>;

	/// Write one chunk, returning the acknowledged byte count
	async fn write_chunk(&self, name: &str, offset: u64, data: Bytes) -> TransferResult<u64>;

	/// Read up to `length` bytes at `offset`
	async fn read_range(&self, name: &str, offset: u64, length: u64) -> TransferResult<Bytes>;

	/// Soft delete
	async fn trash(&self, name: &str) -> TransferResult<()>;
}

/// Chunking and pool widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
	pub chunk_size: u64,
	pub upload_concurrency: usize,
	pub download_concurrency: usize,
}

impl Default for TransferOptions {
	fn default() -> Self {
		TransferOptions::from(&Config::default())
	}
}

impl From<&Config> for TransferOptions {
	fn from(config: &Config) -> Self {
		TransferOptions {
			chunk_size: config.chunk_size,
			upload_concurrency: config.max_concurrency,
			download_concurrency: config.download_concurrency,
		}
	}
}

impl TransferOptions {
	pub fn validate(&self) -> TransferResult<()> {
		if self.chunk_size == 0 {
			return Err(TransferError::InvalidOptions("chunk size must be positive".to_string()));
		}
		if self.upload_concurrency == 0 || self.download_concurrency == 0 {
			return Err(TransferError::InvalidOptions("concurrency must be positive".to_string()));
		}
		Ok(())
	}
}

/// Transfer error type
#[derive(Debug)]
pub enum TransferError {
	/// Store call failed (direct transport)
	Store(ProtocolError),
	/// Gateway answered with an error status
	Http { status: u16, message: String },
	/// Gateway could not be reached or the body was unreadable
	Request(reqwest::Error),
	/// Server acknowledged fewer bytes than sent
	ShortWrite { offset: u64, requested: u64, acknowledged: u64 },
	/// Ranged read returned a different byte count than planned
	ShortRange { offset: u64, expected: u64, received: u64 },
	/// Some items of a bulk operation failed
	Partial { succeeded: usize, failed: usize },
	InvalidOptions(String),
}

impl TransferError {
	/// True when the peer was unreachable rather than refusing
	pub fn is_transport(&self) -> bool {
		match self {
			TransferError::Store(e) => e.is_transport(),
			TransferError::Request(_) => true,
			_ => false,
		}
	}
}

impl fmt::Display for TransferError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransferError::Store(e) => write!(f, "{}", e),
			TransferError::Http { status, message } => {
				write!(f, "Gateway returned {}: {}", status, message)
			}
			TransferError::Request(e) => write!(f, "HTTP request failed: {}", e),
			TransferError::ShortWrite { offset, requested, acknowledged } => write!(
				f,
				"Short write at offset {}: {} of {} bytes acknowledged",
				offset, acknowledged, requested
			),
			TransferError::ShortRange { offset, expected, received } => write!(
				f,
				"Short range at offset {}: expected {} bytes, received {}",
				offset, expected, received
			),
			TransferError::Partial { succeeded, failed } => {
				write!(f, "{} of {} operations failed", failed, succeeded + failed)
			}
			TransferError::InvalidOptions(msg) => write!(f, "Invalid transfer options: {}", msg),
		}
	}
}

impl std::error::Error for TransferError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			TransferError::Store(e) => Some(e),
			TransferError::Request(e) => Some(e),
			_ => None,
		}
	}
}

impl From<ProtocolError> for TransferError {
	fn from(e: ProtocolError) -> Self {
		TransferError::Store(e)
	}
}

impl From<reqwest::Error> for TransferError {
	fn from(e: reqwest::Error) -> Self {
		TransferError::Request(e)
	}
}

// vim: ts=4
