//! File store protocol layer
//!
//! Text-framed TCP protocol: one command line per request, one status line
//! per reply, optionally followed by a raw payload.
//!
//! # Example Usage
//!
//! ```ignore
//! use filegate::protocol::{ClientOptions, StoreClient};
//!
//! let client = StoreClient::new(ClientOptions::default());
//! client.write("notes.txt", 0, b"hello").await?;
//! let mut session = client.session("notes.txt").await?;
//! let head = session.read(0, 4).await?;
//! session.close();
//! ```

pub mod client;
pub mod command;
pub mod connection;
pub mod error;
pub mod frame;
pub mod session;

// Re-export public API
pub use client::{new_trace_id, ClientOptions, StoreClient, WriteAck};
pub use command::{validate_name, Command, Status};
pub use connection::CallLimits;
pub use error::{ProtocolError, ProtocolResult};
pub use frame::{FrameReader, MAX_LINE_BYTES};
pub use session::ReadSession;

// vim: ts=4
