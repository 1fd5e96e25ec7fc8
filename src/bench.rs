//! Read-heavy load benchmark against the store
//!
//! Each worker holds one connection with the bench file opened and issues a
//! mix of `READ` and `WRITE` at random offsets. A worker stops at its first
//! failure, counting it as an error.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::GateError;
use crate::logging::*;
use crate::protocol::{Command, ProtocolError, StoreClient};

#[derive(Debug, Clone)]
pub struct BenchOptions {
	pub name: String,
	pub workers: usize,
	/// Operations across all workers
	pub total_ops: usize,
	/// Span of the bench file the offsets fall into
	pub file_size: u64,
	/// Largest single read or write
	pub max_io: u64,
	/// Share of operations that are reads
	pub read_ratio: f64,
}

impl Default for BenchOptions {
	fn default() -> Self {
		BenchOptions {
			name: "store.bin".to_string(),
			workers: 8,
			total_ops: 10_000,
			file_size: 1 << 20,
			max_io: 4096,
			read_ratio: 0.8,
		}
	}
}

/// Counters of one worker
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
	pub ops: usize,
	pub reads: usize,
	pub writes: usize,
	pub errors: usize,
	pub total_latency: Duration,
}

impl WorkerStats {
	pub fn avg_latency(&self) -> Duration {
		if self.ops == 0 {
			Duration::ZERO
		} else {
			self.total_latency / self.ops as u32
		}
	}
}

#[derive(Debug, Clone)]
pub struct BenchReport {
	pub workers: Vec<WorkerStats>,
	pub elapsed: Duration,
}

impl BenchReport {
	/// Sum of all workers
	pub fn total(&self) -> WorkerStats {
		self.workers.iter().fold(WorkerStats::default(), |mut acc, w| {
			acc.ops += w.ops;
			acc.reads += w.reads;
			acc.writes += w.writes;
			acc.errors += w.errors;
			acc.total_latency += w.total_latency;
			acc
		})
	}

	pub fn ops_per_sec(&self) -> f64 {
		let secs = self.elapsed.as_secs_f64();
		if secs > 0.0 {
			self.total().ops as f64 / secs
		} else {
			0.0
		}
	}
}

impl fmt::Display for BenchReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "=== Per-worker stats ===")?;
		for (id, w) in self.workers.iter().enumerate() {
			writeln!(
				f,
				"Worker {}: ops={} (R={}, W={}, err={}), avg={} us",
				id,
				w.ops,
				w.reads,
				w.writes,
				w.errors,
				w.avg_latency().as_micros()
			)?;
		}
		let total = self.total();
		writeln!(f, "=== Aggregate ===")?;
		writeln!(
			f,
			"Total ops    : {} (reads={}, writes={}, errors={})",
			total.ops, total.reads, total.writes, total.errors
		)?;
		writeln!(f, "Total time   : {:.3} s", self.elapsed.as_secs_f64())?;
		writeln!(f, "Avg latency  : {} us/op", total.avg_latency().as_micros())?;
		write!(f, "Throughput   : {:.0} ops/sec", self.ops_per_sec())
	}
}

/// Make sure the bench file covers `file_size` bytes
async fn prepare(client: &StoreClient, options: &BenchOptions) -> Result<(), GateError> {
	client.open(&options.name).await?;
	let mut size = client.stat(&options.name).await?;
	let block = vec![0u8; 256 * 1024];
	while size < options.file_size {
		let len = (options.file_size - size).min(block.len() as u64) as usize;
		let ack = client.write(&options.name, size, &block[..len]).await?;
		if ack.acknowledged == 0 {
			return Err(GateError::other("store accepted no bytes while preparing bench file"));
		}
		size += ack.acknowledged;
	}
	Ok(())
}

async fn worker(client: StoreClient, options: BenchOptions, id: usize, ops: usize) -> WorkerStats {
	let mut stats = WorkerStats::default();
	let mut conn = match client.connect().await {
		Ok(conn) => conn,
		Err(e) => {
			warn!("[bench] worker {} cannot connect: {}", id, e);
			stats.errors = ops;
			return stats;
		}
	};
	if let Err(e) = conn.call(&Command::Open(options.name.clone()), None).await {
		warn!("[bench] worker {} cannot open {}: {}", id, options.name, e);
		stats.errors = ops;
		return stats;
	}

	let mut rng = StdRng::seed_from_u64(0xC0FFEE ^ (id as u64).wrapping_mul(1_315_423_911));
	let max_io = options.max_io.clamp(1, options.file_size.max(1));
	for _ in 0..ops {
		let len = rng.gen_range(1..=max_io);
		let offset = rng.gen_range(0..=options.file_size.saturating_sub(max_io));
		let is_read = rng.gen_bool(options.read_ratio);

		let started = Instant::now();
		let result = if is_read {
			conn.call_with_payload(&Command::Read { offset, length: len }).await.map(|_| ())
		} else {
			let data: Vec<u8> =
				(0..len).map(|j| ((offset + j + id as u64) & 0xFF) as u8).collect();
			match conn.call(&Command::Write { offset, length: len }, Some(&data)).await {
				Ok(Some(ack)) if ack == len => Ok(()),
				Ok(ack) => Err(ProtocolError::Malformed(format!(
					"WRITE acknowledged {:?} of {} bytes",
					ack, len
				))),
				Err(e) => Err(e),
			}
		};
		if let Err(e) = result {
			warn!("[bench] worker {} stopped: {}", id, e);
			stats.errors += 1;
			break;
		}
		stats.total_latency += started.elapsed();
		stats.ops += 1;
		if is_read {
			stats.reads += 1;
		} else {
			stats.writes += 1;
		}
	}
	stats
}

/// Run the benchmark and collect per-worker statistics
pub async fn run(client: &StoreClient, options: &BenchOptions) -> Result<BenchReport, GateError> {
	if options.workers == 0 || options.file_size == 0 {
		return Err(GateError::other("bench needs at least one worker and a non-empty file"));
	}
	prepare(client, options).await?;

	let per_worker = options.total_ops / options.workers;
	info!(
		"[bench] {} workers x {} ops on {} ({} bytes)",
		options.workers, per_worker, options.name, options.file_size
	);
	let started = Instant::now();
	let handles: Vec<_> = (0..options.workers)
		.map(|id| tokio::spawn(worker(client.clone(), options.clone(), id, per_worker)))
		.collect();
	let mut workers = Vec::with_capacity(handles.len());
	for handle in handles {
		workers.push(handle.await.map_err(|e| GateError::other(format!("bench worker: {}", e)))?);
	}
	Ok(BenchReport { workers, elapsed: started.elapsed() })
}


// vim: ts=4
