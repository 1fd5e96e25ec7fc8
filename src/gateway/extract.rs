//! Extractors whose rejections answer with the gateway's JSON error body
//!
//! Thin wrappers over axum's `Path`, `Query` and `Bytes`. The status axum
//! picked (400, 413, ...) is kept; only the body changes.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::error::GatewayError;

/// Path parameters
pub struct ApiPath<T>(pub T);

/// Query string
pub struct ApiQuery<T>(pub T);

/// Raw request body, subject to the router's body limit
pub struct ApiBody(pub Bytes);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
	T: DeserializeOwned + Send,
	S: Send + Sync,
{
	type Rejection = GatewayError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
		Ok(ApiPath(value))
	}
}

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = GatewayError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
		Ok(ApiQuery(value))
	}
}

#[async_trait]
impl<S> FromRequest<S> for ApiBody
where
	S: Send + Sync,
{
	type Rejection = GatewayError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		Ok(ApiBody(Bytes::from_request(req, state).await?))
	}
}

// vim: ts=4
