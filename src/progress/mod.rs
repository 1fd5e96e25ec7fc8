//! Progress display callback for CLI transfers

pub mod constants;

use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use crate::callbacks::{ProgressCallback, TransferKind, TransferProgress};

/// Progress display constants
pub use constants::*;

/// Render a `[===   ]` bar for a ratio in `[0, 1]`
pub fn render_bar(ratio: f64) -> String {
	let filled = (ratio.clamp(0.0, 1.0) * PROGRESS_BAR_WIDTH as f64) as usize;
	format!("[{}{}]", "=".repeat(filled), " ".repeat(PROGRESS_BAR_WIDTH - filled))
}

/// Single-line progress bar on stderr
pub struct CliProgress {
	last_update: Mutex<Option<Instant>>,
}

impl CliProgress {
	pub fn new() -> Self {
		Self { last_update: Mutex::new(None) }
	}

	/// Terminate the progress line
	pub fn finish(&self) {
		let _ = writeln!(std::io::stderr());
	}
}

impl Default for CliProgress {
	fn default() -> Self {
		Self::new()
	}
}

impl ProgressCallback for CliProgress {
	fn on_progress(&self, progress: &TransferProgress) {
		let done = progress.chunks_done >= progress.chunks_total;
		// Throttle updates, but always draw the final state
		{
			let mut last = self.last_update.lock().unwrap_or_else(|e| e.into_inner());
			if let Some(at) = *last {
				if !done && at.elapsed().as_millis() < UPDATE_THROTTLE_MS {
					return;
				}
			}
			*last = Some(Instant::now());
		}

		let verb = match progress.kind {
			TransferKind::Upload => "Uploading",
			TransferKind::Download => "Downloading",
		};
		let _ = write!(
			std::io::stderr(),
			"\r  {} {}: {} {:.1}/{:.1} MB ({}/{} chunks) | {:.1} MB/s",
			verb,
			progress.name,
			render_bar(progress.ratio()),
			progress.bytes_done as f64 / BYTES_PER_MB,
			progress.bytes_total as f64 / BYTES_PER_MB,
			progress.chunks_done,
			progress.chunks_total,
			progress.rate() / BYTES_PER_MB
		);
		let _ = std::io::stderr().flush();
	}
}


// vim: ts=4
