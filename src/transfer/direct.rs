//! Transfers straight against the store, without the gateway

use async_trait::async_trait;
use bytes::Bytes;

use super::{ChunkTransport, TransferResult};
use crate::protocol::StoreClient;

#[async_trait]
impl ChunkTransport for StoreClient {
	async fn create(&self, name: &str) -> TransferResult<()> {
		Ok(self.open(name).await?)
	}

	async fn stat(&self, name: &str) -> TransferResult<u64> {
		Ok(StoreClient::stat(self, name).await?)
	}

	async fn write_chunk(&self, name: &str, offset: u64, data: Bytes) -> TransferResult<u64> {
		let ack = self.write(name, offset, &data).await?;
		Ok(ack.acknowledged)
	}

	async fn read_range(&self, name: &str, offset: u64, length: u64) -> TransferResult<Bytes> {
		Ok(StoreClient::read_range(self, name, offset, length).await?)
	}

	async fn trash(&self, name: &str) -> TransferResult<()> {
		Ok(StoreClient::trash(self, name).await?)
	}
}

// vim: ts=4
