//! Chunked upload with a bounded worker pool

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::time::Instant;

use super::plan::plan_chunks;
use super::{ChunkTransport, TransferError, TransferOptions, TransferResult};
use crate::callbacks::{ProgressCallback, TransferKind, TransferProgress};
use crate::logging::*;

/// What an upload did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
	pub chunks: usize,
	pub bytes: u64,
}

/// Create `name` and write `data` to it in parallel chunks
///
/// Chunks run `upload_concurrency` at a time in any order. The first failed
/// or short-acknowledged chunk aborts the upload; chunks still in flight are
/// dropped.
pub async fn upload<T>(
	transport: &T,
	name: &str,
	data: Bytes,
	options: &TransferOptions,
	progress: &dyn ProgressCallback,
) -> TransferResult<UploadSummary>
where
	T: ChunkTransport + ?Sized,
{
	options.validate()?;
	transport.create(name).await?;

	let total = data.len() as u64;
	let plan = plan_chunks(total, options.chunk_size);
	let started = Instant::now();
	debug!("[upload] {} bytes to {} in {} chunks", total, name, plan.len());

	let mut results = stream::iter(plan.iter().copied())
		.map(|chunk| {
			let body = data.slice(chunk.offset as usize..chunk.end() as usize);
			async move {
				let acknowledged = transport.write_chunk(name, chunk.offset, body).await?;
				if acknowledged != chunk.length {
					return Err(TransferError::ShortWrite {
						offset: chunk.offset,
						requested: chunk.length,
						acknowledged,
					});
				}
				Ok(acknowledged)
			}
		})
		.buffer_unordered(options.upload_concurrency);

	let mut done = 0;
	let mut bytes_done = 0;
	while let Some(result) = results.next().await {
		bytes_done += result?;
		done += 1;
		progress.on_progress(&TransferProgress {
			kind: TransferKind::Upload,
			name: name.to_string(),
			chunks_done: done,
			chunks_total: plan.len(),
			bytes_done,
			bytes_total: total,
			elapsed: started.elapsed(),
		});
	}

	info!("[upload] {} complete: {} bytes in {:?}", name, bytes_done, started.elapsed());
	Ok(UploadSummary { chunks: done, bytes: bytes_done })
}

// vim: ts=4
