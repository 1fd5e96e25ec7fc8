//! Byte range resolution for streamed reads
//!
//! Accepts a single `Range: bytes=...` header or the `?offset=&length=`
//! query pair. The query wins when both are present.

use serde::Deserialize;

/// `?offset=&length=` on the read route
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReadQuery {
	pub offset: Option<u64>,
	pub length: Option<u64>,
}

impl ReadQuery {
	pub fn is_empty(&self) -> bool {
		self.offset.is_none() && self.length.is_none()
	}
}

/// Resolved span of a read, always inside the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
	pub start: u64,
	pub length: u64,
	/// Answer with 206 and `Content-Range`
	pub partial: bool,
}

impl ByteRange {
	pub fn full(size: u64) -> Self {
		ByteRange { start: 0, length: size, partial: false }
	}

	/// Inclusive last byte
	pub fn last(&self) -> u64 {
		(self.start + self.length).saturating_sub(1)
	}

	/// `Content-Range` value for a partial answer
	pub fn content_range(&self, size: u64) -> String {
		format!("bytes {}-{}/{}", self.start, self.last(), size)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
	/// Not a range we understand (400)
	Malformed(String),
	/// Starts at or past the end of the file (416)
	Unsatisfiable,
}

/// Pick the span to send for a file of `size` bytes
pub fn resolve(header: Option<&str>, query: &ReadQuery, size: u64) -> Result<ByteRange, RangeError> {
	if !query.is_empty() {
		return resolve_query(query, size);
	}
	match header {
		Some(value) => resolve_header(value, size),
		None => Ok(ByteRange::full(size)),
	}
}

fn resolve_query(query: &ReadQuery, size: u64) -> Result<ByteRange, RangeError> {
	let start = query.offset.unwrap_or(0);
	if query.length == Some(0) {
		return Err(RangeError::Malformed("length must be positive".to_string()));
	}
	if start >= size {
		return Err(RangeError::Unsatisfiable);
	}
	let available = size - start;
	let length = query.length.map_or(available, |len| len.min(available));
	Ok(ByteRange { start, length, partial: true })
}

fn resolve_header(value: &str, size: u64) -> Result<ByteRange, RangeError> {
	let malformed = || RangeError::Malformed(format!("unsupported range {:?}", value));
	let ranges = value.trim().strip_prefix("bytes=").ok_or_else(malformed)?.trim();
	if ranges.contains(',') {
		return Err(RangeError::Malformed("multiple ranges are not supported".to_string()));
	}
	let (first, last) = ranges.split_once('-').ok_or_else(malformed)?;
	let (first, last) = (first.trim(), last.trim());

	if first.is_empty() {
		// Suffix: the final `n` bytes
		let n: u64 = last.parse().map_err(|_| malformed())?;
		if n == 0 || size == 0 {
			return Err(RangeError::Unsatisfiable);
		}
		let start = size.saturating_sub(n);
		return Ok(ByteRange { start, length: size - start, partial: true });
	}

	let start: u64 = first.parse().map_err(|_| malformed())?;
	let end = if last.is_empty() {
		None
	} else {
		let end: u64 = last.parse().map_err(|_| malformed())?;
		if end < start {
			return Err(malformed());
		}
		Some(end)
	};
	if start >= size {
		return Err(RangeError::Unsatisfiable);
	}
	let end = end.map_or(size - 1, |end| end.min(size - 1));
	Ok(ByteRange { start, length: end - start + 1, partial: true })
}

/// Parse `x-offset`: present, a plain non-negative integer
pub fn parse_offset(value: Option<&str>) -> Result<u64, String> {
	let raw = value.ok_or_else(|| "x-offset header is required".to_string())?.trim();
	if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
		return Err(format!("x-offset must be a non-negative integer, got {:?}", raw));
	}
	raw.parse().map_err(|_| format!("x-offset out of range: {:?}", raw))
}


// vim: ts=4
