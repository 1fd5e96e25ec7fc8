//! Parallel ranged download
//!
//! A fixed set of workers claims range indexes from a shared counter, so at
//! most `download_concurrency` reads are in flight. Each result is placed in
//! the slot of its index and the slots are concatenated at the end.

use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use super::plan::{plan_chunks, ChunkRange};
use super::{ChunkTransport, TransferError, TransferOptions, TransferResult};
use crate::callbacks::{ProgressCallback, TransferKind, TransferProgress};
use crate::logging::*;

/// Download the whole of `name`
pub async fn download<T>(
	transport: &T,
	name: &str,
	options: &TransferOptions,
	progress: &dyn ProgressCallback,
) -> TransferResult<Bytes>
where
	T: ChunkTransport + ?Sized,
{
	options.validate()?;
	let size = transport.stat(name).await?;
	let plan = plan_chunks(size, options.chunk_size);
	if plan.is_empty() {
		return Ok(Bytes::new());
	}

	let started = Instant::now();
	let next = AtomicUsize::new(0);
	let completed = AtomicUsize::new(0);
	let width = options.download_concurrency.min(plan.len());
	debug!("[download] {} bytes of {} in {} ranges, {} workers", size, name, plan.len(), width);

	let worker = |_id: usize| {
		let plan = &plan;
		let next = &next;
		let completed = &completed;
		async move {
			let mut fetched: Vec<(usize, Bytes)> = Vec::new();
			loop {
				let index = next.fetch_add(1, Ordering::SeqCst);
				let Some(range) = plan.get(index) else {
					break;
				};
				let data = fetch_range(transport, name, range).await?;
				fetched.push((index, data));
				let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
				progress.on_progress(&TransferProgress {
					kind: TransferKind::Download,
					name: name.to_string(),
					chunks_done: done,
					chunks_total: plan.len(),
					bytes_done: (done as u64 * options.chunk_size).min(size),
					bytes_total: size,
					elapsed: started.elapsed(),
				});
			}
			Ok::<_, TransferError>(fetched)
		}
	};
	let batches = try_join_all((0..width).map(worker)).await?;

	let mut slots: Vec<Option<Bytes>> = vec![None; plan.len()];
	for (index, data) in batches.into_iter().flatten() {
		slots[index] = Some(data);
	}
	let mut out = BytesMut::with_capacity(size as usize);
	for (index, slot) in slots.into_iter().enumerate() {
		match slot {
			Some(data) => out.extend_from_slice(&data),
			None => {
				return Err(TransferError::ShortRange {
					offset: plan[index].offset,
					expected: plan[index].length,
					received: 0,
				})
			}
		}
	}

	info!("[download] {} complete: {} bytes in {:?}", name, size, started.elapsed());
	Ok(out.freeze())
}

async fn fetch_range<T>(transport: &T, name: &str, range: &ChunkRange) -> TransferResult<Bytes>
where
	T: ChunkTransport + ?Sized,
{
	let data = transport.read_range(name, range.offset, range.length).await?;
	if data.len() as u64 != range.length {
		return Err(TransferError::ShortRange {
			offset: range.offset,
			expected: range.length,
			received: data.len() as u64,
		});
	}
	Ok(data)
}

// vim: ts=4
