//! Crate-level error type
//!
//! Wraps the per-layer errors so CLI commands and the benchmark can use a
//! single `?` chain.

use std::error::Error;
use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::protocol::ProtocolError;
use crate::transfer::TransferError;

#[derive(Debug)]
pub enum GateError {
	/// Store protocol error (nested)
	Protocol(ProtocolError),

	/// Transfer error (nested)
	Transfer(TransferError),

	/// Gateway error (nested)
	Gateway(GatewayError),

	/// Configuration error (nested)
	Config(ConfigError),

	/// I/O error
	Io(io::Error),

	/// Generic error message
	Other { message: String },
}

impl GateError {
	pub fn other(message: impl Into<String>) -> Self {
		GateError::Other { message: message.into() }
	}
}

impl fmt::Display for GateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GateError::Protocol(e) => write!(f, "Store error: {}", e),
			GateError::Transfer(e) => write!(f, "Transfer error: {}", e),
			GateError::Gateway(e) => write!(f, "Gateway error: {}", e),
			GateError::Config(e) => write!(f, "{}", e),
			GateError::Io(e) => write!(f, "I/O error: {}", e),
			GateError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for GateError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			GateError::Protocol(e) => Some(e),
			GateError::Transfer(e) => Some(e),
			GateError::Gateway(e) => Some(e),
			GateError::Config(e) => Some(e),
			GateError::Io(e) => Some(e),
			GateError::Other { .. } => None,
		}
	}
}

impl From<ProtocolError> for GateError {
	fn from(e: ProtocolError) -> Self {
		GateError::Protocol(e)
	}
}

impl From<TransferError> for GateError {
	fn from(e: TransferError) -> Self {
		GateError::Transfer(e)
	}
}

impl From<GatewayError> for GateError {
	fn from(e: GatewayError) -> Self {
		GateError::Gateway(e)
	}
}

impl From<ConfigError> for GateError {
	fn from(e: ConfigError) -> Self {
		GateError::Config(e)
	}
}

impl From<io::Error> for GateError {
	fn from(e: io::Error) -> Self {
		GateError::Io(e)
	}
}


// vim: ts=4
