//! # filegate - client and HTTP gateway for a line-framed file store
//!
//! The store speaks a minimal text protocol over TCP (`OPEN`, `LIST`,
//! `STAT`, `READ`, `WRITE`, `TRASH`, `LISTTRASH`, `RESTORE`, `PURGETRASH`).
//! This crate provides:
//!
//! - [`protocol`]: frame reader, command client and read sessions
//! - [`gateway`]: an axum HTTP surface with ranged streaming reads
//! - [`transfer`]: parallel chunked upload and ranged download
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filegate::config::Config;
//! use filegate::protocol::StoreClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StoreClient::from_config(&Config::default());
//!     client.write("hello.txt", 0, b"hello").await?;
//!     println!("{:?}", client.read_full("hello.txt").await?);
//!     Ok(())
//! }
//! ```

pub mod bench;
pub mod cache;
pub mod callbacks;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod progress;
pub mod protocol;
pub mod transfer;
pub mod types;

// Re-export commonly used types and functions
pub use config::Config;
pub use error::GateError;
pub use protocol::{ProtocolError, ReadSession, StoreClient};
pub use transfer::{ChunkTransport, GatewayClient, TransferError, TransferOptions};

// vim: ts=4
