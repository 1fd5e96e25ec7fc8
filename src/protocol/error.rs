//! Protocol error types
//!
//! Every failure the client, connection and session layers can produce.
//! Callers mostly care about one split: did the server say no
//! ([`ProtocolError::is_rejection`]) or could we not talk to it at all
//! ([`ProtocolError::is_transport`]).

use std::fmt;
use std::io;

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Protocol error type
#[derive(Debug)]
pub enum ProtocolError {
	/// I/O error from the socket (refused, reset, broken pipe)
	Io(io::Error),
	/// Peer closed the stream before a full frame arrived
	ConnectionClosed,
	/// Per-call deadline expired
	Timeout { millis: u64 },
	/// Call aborted through its cancellation token
	Cancelled,
	/// Server answered with something other than `OK`
	Rejected { command: String, reason: String },
	/// Reply did not follow the protocol grammar
	Malformed(String),
	/// File name cannot be sent on the wire
	InvalidName(String),
	/// Operation not allowed in the current session state
	InvalidState(String),
}

impl ProtocolError {
	/// True when the server was unreachable or the stream broke
	pub fn is_transport(&self) -> bool {
		matches!(
			self,
			ProtocolError::Io(_)
				| ProtocolError::ConnectionClosed
				| ProtocolError::Timeout { .. }
				| ProtocolError::Cancelled
		)
	}

	/// True when the server understood the command and refused it
	pub fn is_rejection(&self) -> bool {
		matches!(self, ProtocolError::Rejected { .. })
	}

	pub(crate) fn rejected(command: &str, reason: &str) -> Self {
		ProtocolError::Rejected { command: command.to_string(), reason: reason.to_string() }
	}
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
			ProtocolError::ConnectionClosed => write!(f, "Connection closed by peer mid-frame"),
			ProtocolError::Timeout { millis } => write!(f, "Call timed out after {} ms", millis),
			ProtocolError::Cancelled => write!(f, "Call cancelled"),
			ProtocolError::Rejected { command, reason } => {
				if reason.is_empty() {
					write!(f, "{} failed: server returned ERR", command)
				} else {
					write!(f, "{} failed: {}", command, reason)
				}
			}
			ProtocolError::Malformed(msg) => write!(f, "Protocol violation: {}", msg),
			ProtocolError::InvalidName(name) => write!(f, "Invalid file name: {:?}", name),
			ProtocolError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
		}
	}
}

impl std::error::Error for ProtocolError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ProtocolError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for ProtocolError {
	fn from(e: io::Error) -> Self {
		if e.kind() == io::ErrorKind::UnexpectedEof {
			ProtocolError::ConnectionClosed
		} else {
			ProtocolError::Io(e)
		}
	}
}


// vim: ts=4
