//! Bulk soft delete
//!
//! Every name is attempted independently; one failure never stops the rest.

use futures::stream::{self, StreamExt};

use super::{ChunkTransport, TransferError, TransferResult};
use crate::logging::*;

/// Per-name results of a bulk operation, in input order
#[derive(Debug, Default)]
pub struct BulkOutcome {
	pub succeeded: Vec<String>,
	pub failed: Vec<(String, TransferError)>,
}

impl BulkOutcome {
	pub fn is_complete(&self) -> bool {
		self.failed.is_empty()
	}

	/// `Partial` when anything failed
	pub fn into_result(self) -> TransferResult<Vec<String>> {
		if self.failed.is_empty() {
			Ok(self.succeeded)
		} else {
			Err(TransferError::Partial { succeeded: self.succeeded.len(), failed: self.failed.len() })
		}
	}
}

/// Trash every name, `concurrency` at a time
pub async fn trash_many<T>(transport: &T, names: &[String], concurrency: usize) -> BulkOutcome
where
	T: ChunkTransport + ?Sized,
{
	let results: Vec<(String, TransferResult<()>)> = stream::iter(names.iter().cloned())
		.map(|name| async move {
			let result = transport.trash(&name).await;
			(name, result)
		})
		.buffered(concurrency.max(1))
		.collect()
		.await;

	let mut outcome = BulkOutcome::default();
	for (name, result) in results {
		match result {
			Ok(()) => outcome.succeeded.push(name),
			Err(e) => {
				warn!("[bulk] trash {} failed: {}", name, e);
				outcome.failed.push((name, e));
			}
		}
	}
	outcome
}

// vim: ts=4
