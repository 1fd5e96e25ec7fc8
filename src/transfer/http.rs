//! HTTP client for the gateway

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::RANGE;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use std::time::Duration;

use super::{ChunkTransport, TransferError, TransferResult};
use crate::config::Config;
use crate::types::{ErrorReply, FileEntry, FileList, NameList, WriteReply};

/// Header carrying the chunk offset of a PATCH
pub const OFFSET_HEADER: &str = "x-offset";
/// Header forwarded to the store as the connection trace id
pub const TRACE_HEADER: &str = "x-trace-id";

#[derive(Debug, Clone)]
pub struct GatewayClient {
	client: Client,
	base: Url,
	trace: Option<String>,
}

impl GatewayClient {
	/// `base_url` is the gateway root; `api_prefix` is prepended to every route
	pub fn new(base_url: &str, api_prefix: &str, timeout: Duration) -> TransferResult<Self> {
		let mut base = Url::parse(base_url).map_err(|e| {
			TransferError::InvalidOptions(format!("bad gateway url {:?}: {}", base_url, e))
		})?;
		{
			let mut segments = base.path_segments_mut().map_err(|_| {
				TransferError::InvalidOptions(format!("gateway url {:?} cannot be a base", base_url))
			})?;
			segments.pop_if_empty();
			segments.extend(api_prefix.split('/').filter(|s| !s.is_empty()));
		}
		let client = Client::builder().timeout(timeout).build()?;
		Ok(Self { client, base, trace: None })
	}

	pub fn from_config(base_url: &str, config: &Config) -> TransferResult<Self> {
		Self::new(base_url, &config.api_prefix, Duration::from_millis(config.http_timeout_ms))
	}

	/// Same client, sending `x-trace-id` on every request
	pub fn with_trace(&self, trace_id: impl Into<String>) -> Self {
		Self { trace: Some(trace_id.into()), ..self.clone() }
	}

	fn url(&self, segments: &[&str]) -> Url {
		let mut url = self.base.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.push("files");
			path.extend(segments);
		}
		url
	}

	fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
		let builder = self.client.request(method, self.url(segments));
		match &self.trace {
			Some(id) => builder.header(TRACE_HEADER, id),
			None => builder,
		}
	}

	async fn send(&self, builder: RequestBuilder) -> TransferResult<Response> {
		let response = builder.send().await?;
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}
		let body = response.text().await.unwrap_or_default();
		let message = match serde_json::from_str::<ErrorReply>(&body) {
			Ok(reply) => reply.error,
			Err(_) => body,
		};
		Err(TransferError::Http { status: status.as_u16(), message })
	}

	/// Active files with their sizes
	pub async fn list(&self) -> TransferResult<Vec<FileEntry>> {
		let reply: FileList = self.send(self.request(Method::GET, &[])).await?.json().await?;
		Ok(reply.files)
	}

	pub async fn stat(&self, name: &str) -> TransferResult<u64> {
		let entry: FileEntry =
			self.send(self.request(Method::GET, &[name, "stat"])).await?.json().await?;
		Ok(entry.size)
	}

	pub async fn create(&self, name: &str) -> TransferResult<()> {
		self.send(self.request(Method::POST, &[name])).await?;
		Ok(())
	}

	/// PATCH one chunk, returning the acknowledged byte count
	pub async fn write_chunk(&self, name: &str, offset: u64, data: Bytes) -> TransferResult<u64> {
		let builder = self
			.request(Method::PATCH, &[name])
			.header(OFFSET_HEADER, offset.to_string())
			.header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
			.body(data);
		let reply: WriteReply = self.send(builder).await?.json().await?;
		Ok(reply.written)
	}

	/// Ranged GET of `[offset, offset + length)`
	pub async fn read_range(&self, name: &str, offset: u64, length: u64) -> TransferResult<Bytes> {
		if length == 0 {
			return Ok(Bytes::new());
		}
		let range = format!("bytes={}-{}", offset, offset + length - 1);
		let builder = self.request(Method::GET, &["~read", name]).header(RANGE, range);
		Ok(self.send(builder).await?.bytes().await?)
	}

	/// Whole file in one streamed GET
	pub async fn read_all(&self, name: &str) -> TransferResult<Bytes> {
		Ok(self.send(self.request(Method::GET, &["~read", name])).await?.bytes().await?)
	}

	pub async fn trash(&self, name: &str) -> TransferResult<()> {
		self.send(self.request(Method::DELETE, &[name])).await?;
		Ok(())
	}

	pub async fn list_trash(&self) -> TransferResult<Vec<String>> {
		let reply: NameList =
			self.send(self.request(Method::GET, &["~trash", "list"])).await?.json().await?;
		Ok(reply.files)
	}

	pub async fn restore(&self, name: &str) -> TransferResult<()> {
		self.send(self.request(Method::POST, &["~trash", name, "restore"])).await?;
		Ok(())
	}

	pub async fn purge(&self, name: &str) -> TransferResult<()> {
		self.send(self.request(Method::DELETE, &["~trash", name])).await?;
		Ok(())
	}
}

#[async_trait]
impl ChunkTransport for GatewayClient {
	async fn create(&self, name: &str) -> TransferResult<()> {
		GatewayClient::create(self, name).await
	}

	async fn stat(&self, name: &str) -> TransferResult<u64> {
		GatewayClient::stat(self, name).await
	}

	async fn write_chunk(&self, name: &str, offset: u64, data: Bytes) -> TransferResult<u64> {
		GatewayClient::write_chunk(self, name, offset, data).await
	}

	async fn read_range(&self, name: &str, offset: u64, length: u64) -> TransferResult<Bytes> {
		GatewayClient::read_range(self, name, offset, length).await
	}

	async fn trash(&self, name: &str) -> TransferResult<()> {
		GatewayClient::trash(self, name).await
	}
}


// vim: ts=4
