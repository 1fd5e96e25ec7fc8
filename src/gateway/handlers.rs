//! Route handlers

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::sync::Arc;

use super::error::GatewayError;
use super::extract::{ApiBody, ApiPath, ApiQuery};
use super::range::{parse_offset, resolve, ReadQuery};
use super::stream::session_stream;
use super::GatewayState;
use crate::logging::*;
use crate::protocol::StoreClient;
use crate::transfer::http::{OFFSET_HEADER, TRACE_HEADER};
use crate::types::{FileEntry, FileList, NameList, WriteReply};

type HandlerResult<T> = Result<T, GatewayError>;

/// Store client for this request, carrying the caller's trace id if sent
fn client_for(state: &GatewayState, headers: &HeaderMap) -> StoreClient {
	match headers.get(TRACE_HEADER).and_then(|v| v.to_str().ok()).map(str::trim) {
		Some(id) if !id.is_empty() => state.client.with_trace(id),
		_ => state.client.clone(),
	}
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
	headers.get(name).and_then(|v| v.to_str().ok())
}

/// `GET /files`
pub async fn list_files(
	State(state): State<Arc<GatewayState>>,
	headers: HeaderMap,
) -> HandlerResult<Json<FileList>> {
	let client = client_for(&state, &headers);
	let names = client.list().await?;
	let files = stream::iter(names)
		.map(|name| {
			let client = client.clone();
			let state = state.clone();
			async move {
				let size = state.listing_size(&client, &name).await;
				FileEntry { name, size }
			}
		})
		.buffered(state.config.list_stat_concurrency.max(1))
		.collect::<Vec<_>>()
		.await;
	Ok(Json(FileList { files }))
}

/// `GET /files/:name/stat`
pub async fn stat_file(
	State(state): State<Arc<GatewayState>>,
	ApiPath(name): ApiPath<String>,
	headers: HeaderMap,
) -> HandlerResult<Json<FileEntry>> {
	let generation = state.cache.generation();
	let size = client_for(&state, &headers).stat(&name).await?;
	state.cache.insert_if_current(&name, generation, size);
	Ok(Json(FileEntry { name, size }))
}

/// `GET /files/~read/:name`
pub async fn read_file(
	State(state): State<Arc<GatewayState>>,
	ApiPath(name): ApiPath<String>,
	ApiQuery(query): ApiQuery<ReadQuery>,
	headers: HeaderMap,
) -> HandlerResult<Response> {
	let client = client_for(&state, &headers);
	let generation = state.cache.generation();
	let size = client.stat(&name).await?;
	state.cache.insert_if_current(&name, generation, size);

	let range = resolve(header_str(&headers, header::RANGE), &query, size)
		.map_err(|e| GatewayError::from_range(e, size))?;

	let status = if range.partial { StatusCode::PARTIAL_CONTENT } else { StatusCode::OK };
	let mut builder = Response::builder()
		.status(status)
		.header(header::CONTENT_TYPE, "application/octet-stream")
		.header(header::ACCEPT_RANGES, "bytes")
		.header(header::CONTENT_LENGTH, range.length);
	if range.partial {
		builder = builder.header(header::CONTENT_RANGE, range.content_range(size));
	}

	let body = if range.length == 0 {
		Body::empty()
	} else {
		let session = client.session(&name).await?;
		debug!("[gateway] streaming {} bytes of {} from {}", range.length, name, range.start);
		let chunks = session_stream(session, range.start, range.length, state.config.chunk_size);
		Body::from_stream(chunks)
	};
	builder
		.body(body)
		.map_err(|e| GatewayError::Internal(format!("cannot build response: {}", e)))
}

/// `POST /files/:name`
pub async fn create_file(
	State(state): State<Arc<GatewayState>>,
	ApiPath(name): ApiPath<String>,
	headers: HeaderMap,
) -> HandlerResult<impl IntoResponse> {
	client_for(&state, &headers).open(&name).await?;
	state.cache.invalidate(&name);
	Ok(Json(json!({ "ok": true })))
}

/// `PATCH /files/:name`
pub async fn write_file(
	State(state): State<Arc<GatewayState>>,
	ApiPath(name): ApiPath<String>,
	headers: HeaderMap,
	ApiBody(body): ApiBody,
) -> HandlerResult<Json<WriteReply>> {
	let offset =
		parse_offset(header_str(&headers, OFFSET_HEADER)).map_err(GatewayError::Validation)?;
	let ack = client_for(&state, &headers).write(&name, offset, &body).await?;
	state.cache.invalidate(&name);
	Ok(Json(WriteReply { written: ack.acknowledged, offset }))
}

/// `DELETE /files/:name`
pub async fn trash_file(
	State(state): State<Arc<GatewayState>>,
	ApiPath(name): ApiPath<String>,
	headers: HeaderMap,
) -> HandlerResult<impl IntoResponse> {
	client_for(&state, &headers).trash(&name).await?;
	state.cache.invalidate(&name);
	Ok(Json(json!({ "ok": true, "trashed": name })))
}

/// `GET /files/~trash/list`
pub async fn list_trash(
	State(state): State<Arc<GatewayState>>,
	headers: HeaderMap,
) -> HandlerResult<Json<NameList>> {
	let files = client_for(&state, &headers).list_trash().await?;
	Ok(Json(NameList { files }))
}

/// `POST /files/~trash/:name/restore`
pub async fn restore_file(
	State(state): State<Arc<GatewayState>>,
	ApiPath(name): ApiPath<String>,
	headers: HeaderMap,
) -> HandlerResult<impl IntoResponse> {
	client_for(&state, &headers).restore(&name).await?;
	state.cache.invalidate(&name);
	Ok(Json(json!({ "ok": true, "restored": name })))
}

/// `DELETE /files/~trash/:name`
pub async fn purge_file(
	State(state): State<Arc<GatewayState>>,
	ApiPath(name): ApiPath<String>,
	headers: HeaderMap,
) -> HandlerResult<impl IntoResponse> {
	client_for(&state, &headers).purge(&name).await?;
	state.cache.invalidate(&name);
	Ok(Json(json!({ "ok": true, "purged": name })))
}

// vim: ts=4
