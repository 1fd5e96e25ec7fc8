//! Gateway error type and its HTTP mapping

use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

use super::range::RangeError;
use crate::logging::*;
use crate::protocol::ProtocolError;
use crate::types::ErrorReply;

#[derive(Debug)]
pub enum GatewayError {
	/// Store call failed: transport or protocol failure
	Store(ProtocolError),
	/// Request rejected before any store call
	Validation(String),
	/// Requested range starts past the end of a file of `size` bytes
	RangeNotSatisfiable { size: u64 },
	/// axum could not extract the request (bad path, query or body)
	Request { status: StatusCode, message: String },
	Internal(String),
}

impl GatewayError {
	pub fn status(&self) -> StatusCode {
		match self {
			GatewayError::Store(ProtocolError::InvalidName(_)) => StatusCode::BAD_REQUEST,
			GatewayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
			GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
			GatewayError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
			GatewayError::Request { status, .. } => *status,
			GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub(crate) fn from_range(e: RangeError, size: u64) -> Self {
		match e {
			RangeError::Malformed(msg) => GatewayError::Validation(msg),
			RangeError::Unsatisfiable => GatewayError::RangeNotSatisfiable { size },
		}
	}
}

impl fmt::Display for GatewayError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GatewayError::Store(e) => write!(f, "{}", e),
			GatewayError::Validation(msg) => write!(f, "{}", msg),
			GatewayError::RangeNotSatisfiable { size } => {
				write!(f, "Range not satisfiable for a file of {} bytes", size)
			}
			GatewayError::Request { message, .. } => write!(f, "{}", message),
			GatewayError::Internal(msg) => write!(f, "Internal error: {}", msg),
		}
	}
}

impl std::error::Error for GatewayError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			GatewayError::Store(e) => Some(e),
			_ => None,
		}
	}
}

impl From<ProtocolError> for GatewayError {
	fn from(e: ProtocolError) -> Self {
		GatewayError::Store(e)
	}
}

impl From<PathRejection> for GatewayError {
	fn from(e: PathRejection) -> Self {
		GatewayError::Request { status: e.status(), message: e.body_text() }
	}
}

impl From<QueryRejection> for GatewayError {
	fn from(e: QueryRejection) -> Self {
		GatewayError::Request { status: e.status(), message: e.body_text() }
	}
}

impl From<BytesRejection> for GatewayError {
	fn from(e: BytesRejection) -> Self {
		GatewayError::Request { status: e.status(), message: e.body_text() }
	}
}

impl IntoResponse for GatewayError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			error!("[gateway] {}", self);
		} else {
			debug!("[gateway] rejected request: {}", self);
		}
		let body = Json(ErrorReply { error: self.to_string() });
		match self {
			GatewayError::RangeNotSatisfiable { size } => {
				(status, [(header::CONTENT_RANGE, format!("bytes */{}", size))], body)
					.into_response()
			}
			_ => (status, body).into_response(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_mapping() {
		assert_eq!(
			GatewayError::Store(ProtocolError::ConnectionClosed).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
		assert_eq!(
			GatewayError::Store(ProtocolError::rejected("STAT", "missing")).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
		assert_eq!(
			GatewayError::Store(ProtocolError::InvalidName(String::new())).status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(GatewayError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
		let e = GatewayError::Request {
			status: StatusCode::PAYLOAD_TOO_LARGE,
			message: "length limit exceeded".into(),
		};
		assert_eq!(e.status(), StatusCode::PAYLOAD_TOO_LARGE);
		assert_eq!(e.to_string(), "length limit exceeded");
		assert_eq!(
			GatewayError::from_range(RangeError::Unsatisfiable, 9).status(),
			StatusCode::RANGE_NOT_SATISFIABLE
		);
	}

	#[test]
	fn test_unsatisfiable_response_carries_content_range() {
		let response = GatewayError::RangeNotSatisfiable { size: 42 }.into_response();
		assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
		assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */42");
	}
}

// vim: ts=4
