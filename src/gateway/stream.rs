//! Chunked body stream over a read session
//!
//! Reads `chunk` bytes at a time and yields each chunk as soon as it
//! arrives. The session is closed when the span is exhausted, on a
//! zero-length read, after an error, or when the body is dropped because
//! the HTTP client went away.
//!
//! A zero-length read before the span is exhausted means the file shrank
//! after the STAT. The body then ends short of its `Content-Length` and
//! the client sees a truncated response.

use bytes::Bytes;
use futures::stream::{self, Stream};

use crate::logging::*;
use crate::protocol::{ProtocolError, ReadSession};

struct Cursor {
	session: ReadSession,
	offset: u64,
	remaining: u64,
	chunk: u64,
	done: bool,
}

/// Stream `length` bytes from `start` through an open session
pub fn session_stream(
	session: ReadSession,
	start: u64,
	length: u64,
	chunk: u64,
) -> impl Stream<Item = Result<Bytes, ProtocolError>> + Send + 'static {
	let cursor = Cursor { session, offset: start, remaining: length, chunk: chunk.max(1), done: false };
	stream::unfold(cursor, |mut cursor| async move {
		if cursor.done || cursor.remaining == 0 {
			cursor.session.close();
			return None;
		}
		let want = cursor.chunk.min(cursor.remaining);
		match cursor.session.read(cursor.offset, want).await {
			Ok(data) if data.is_empty() => {
				// Content-Length was announced from STAT; the body now ends short
				warn!(
					"[stream] {:?} ended at {} with {} announced bytes missing",
					cursor.session.name().unwrap_or_default(),
					cursor.offset,
					cursor.remaining
				);
				cursor.session.close();
				None
			}
			Ok(data) => {
				let n = data.len() as u64;
				cursor.offset += n;
				cursor.remaining = cursor.remaining.saturating_sub(n);
				Some((Ok(data), cursor))
			}
			Err(e) => {
				warn!("[stream] read at {} failed: {}", cursor.offset, e);
				cursor.session.close();
				cursor.done = true;
				Some((Err(e), cursor))
			}
		}
	})
}

// vim: ts=4
