//! Callback traits for progress reporting

use std::time::Duration;

/// Direction of a chunked transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
	Upload,
	Download,
}

/// Progress statistics during a transfer
#[derive(Debug, Clone)]
pub struct TransferProgress {
	pub kind: TransferKind,

	/// File being transferred
	pub name: String,

	/// Chunks finished so far
	pub chunks_done: usize,

	pub chunks_total: usize,

	/// Bytes acknowledged (upload) or received (download) so far
	pub bytes_done: u64,

	pub bytes_total: u64,

	/// Elapsed time since start
	pub elapsed: Duration,
}

impl TransferProgress {
	/// Completed fraction in `[0, 1]`
	///
	/// Uploads count acknowledged bytes, downloads count finished ranges.
	pub fn ratio(&self) -> f64 {
		let ratio = match self.kind {
			TransferKind::Upload if self.bytes_total > 0 => {
				self.bytes_done as f64 / self.bytes_total as f64
			}
			TransferKind::Download if self.chunks_total > 0 => {
				self.chunks_done as f64 / self.chunks_total as f64
			}
			_ => 1.0,
		};
		ratio.clamp(0.0, 1.0)
	}

	/// Bytes per second since the start
	pub fn rate(&self) -> f64 {
		let secs = self.elapsed.as_secs_f64();
		if secs > 0.0 {
			self.bytes_done as f64 / secs
		} else {
			0.0
		}
	}
}

/// Callback for progress updates
pub trait ProgressCallback: Send + Sync {
	/// Called after every finished chunk
	fn on_progress(&self, progress: &TransferProgress);
}

/// Default progress callback that does nothing
pub struct NoProgressCallback;

impl ProgressCallback for NoProgressCallback {
	fn on_progress(&self, _progress: &TransferProgress) {}
}


// vim: ts=4
