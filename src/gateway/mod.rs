//! HTTP gateway in front of the file store
//!
//! Routes (under the configured api prefix):
//!
//! | Route | Store commands |
//! |---|---|
//! | `GET /files` | `LIST`, then `STAT` per name |
//! | `GET /files/:name/stat` | `STAT` |
//! | `GET /files/~read/:name` | `STAT`, then a read session |
//! | `POST /files/:name` | `OPEN` |
//! | `PATCH /files/:name` | `OPEN` + `WRITE` at `x-offset` |
//! | `DELETE /files/:name` | `TRASH` |
//! | `GET /files/~trash/list` | `LISTTRASH` |
//! | `POST /files/~trash/:name/restore` | `RESTORE` |
//! | `DELETE /files/~trash/:name` | `PURGETRASH` |

pub mod error;
pub mod extract;
pub mod handlers;
pub mod range;
pub mod stream;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::cache::SizeCache;
use crate::config::Config;
use crate::logging::*;
use crate::protocol::StoreClient;

pub use error::GatewayError;
pub use range::{ByteRange, RangeError, ReadQuery};

/// Shared state of every request
pub struct GatewayState {
	pub client: StoreClient,
	pub cache: SizeCache,
	pub config: Config,
}

impl GatewayState {
	pub fn new(config: Config) -> Self {
		Self {
			client: StoreClient::from_config(&config),
			cache: SizeCache::new(
				config.size_cache_capacity,
				Duration::from_millis(config.size_cache_ttl_ms),
			),
			config,
		}
	}

	/// Size shown in a listing: cached, or a STAT raced against the deadline
	///
	/// A STAT that fails or misses the deadline reports 0.
	pub async fn listing_size(&self, client: &StoreClient, name: &str) -> u64 {
		if let Some(size) = self.cache.get(name) {
			return size;
		}
		let generation = self.cache.generation();
		let deadline = Duration::from_millis(self.config.stat_timeout_ms);
		match tokio::time::timeout(deadline, client.stat(name)).await {
			Ok(Ok(size)) => {
				self.cache.insert_if_current(name, generation, size);
				size
			}
			Ok(Err(e)) => {
				debug!("[gateway] stat {} failed while listing: {}", name, e);
				0
			}
			Err(_) => {
				debug!("[gateway] stat {} timed out while listing", name);
				0
			}
		}
	}
}

/// All routes, mounted under the api prefix
pub fn router(state: Arc<GatewayState>) -> Router {
	let body_limit = state.config.max_write_bytes;
	let prefix = state.config.api_prefix.trim_end_matches('/').to_string();
	let api = Router::new()
		.route("/files", get(handlers::list_files))
		.route("/files/~read/:name", get(handlers::read_file))
		.route("/files/~trash/list", get(handlers::list_trash))
		.route("/files/~trash/:name/restore", post(handlers::restore_file))
		.route("/files/~trash/:name", delete(handlers::purge_file))
		.route("/files/:name/stat", get(handlers::stat_file))
		.route(
			"/files/:name",
			post(handlers::create_file).patch(handlers::write_file).delete(handlers::trash_file),
		)
		.layer(DefaultBodyLimit::max(body_limit))
		.with_state(state);
	if prefix.is_empty() {
		api
	} else {
		Router::new().nest(&prefix, api)
	}
}

/// Bind `gatewayBind` and serve until the process ends
pub async fn serve(config: Config) -> std::io::Result<()> {
	let listener = TcpListener::bind(&config.gateway_bind).await?;
	serve_with_listener(listener, Arc::new(GatewayState::new(config))).await
}

/// Serve on an already bound listener
pub async fn serve_with_listener(
	listener: TcpListener,
	state: Arc<GatewayState>,
) -> std::io::Result<()> {
	info!(
		"[gateway] listening on {} (store {}, prefix {})",
		listener.local_addr()?,
		state.config.server_addr,
		state.config.api_prefix
	);
	axum::serve(listener, router(state)).await
}

// vim: ts=4
