//! Splitting a byte span into fixed-size chunks

/// One planned chunk; `index` orders reassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
	pub index: usize,
	pub offset: u64,
	pub length: u64,
}

impl ChunkRange {
	/// Exclusive end offset
	pub fn end(&self) -> u64 {
		self.offset + self.length
	}
}

/// Partition `[0, size)` into `chunk_size` ranges; the last may be shorter
pub fn plan_chunks(size: u64, chunk_size: u64) -> Vec<ChunkRange> {
	if size == 0 || chunk_size == 0 {
		return Vec::new();
	}
	let count = size.div_ceil(chunk_size) as usize;
	(0..count)
		.map(|index| {
			let offset = index as u64 * chunk_size;
			ChunkRange { index, offset, length: chunk_size.min(size - offset) }
		})
		.collect()
}


// vim: ts=4
