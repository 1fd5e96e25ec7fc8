//! Frame reader
//!
//! Turns an arbitrarily chunked byte stream into protocol frames: text
//! status lines terminated by `\n`, and fixed-length binary payloads.
//!
//! A single transport read routinely returns the tail of one frame and the
//! head of the next (e.g. `OK 5\nhel`). The reader keeps everything it has
//! pulled from the transport in one owned buffer and serves later frames
//! from it before touching the socket again, so no byte is ever lost,
//! duplicated or handed back to the transport.

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::{ProtocolError, ProtocolResult};

/// Longest status line accepted before the peer is considered broken
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// How much spare room to make before each transport read
const READ_CHUNK: usize = 16 * 1024;

/// Pull-based frame reader over any async byte source
#[derive(Debug)]
pub struct FrameReader<R> {
	inner: R,
	buf: BytesMut,
}

impl<R> FrameReader<R> {
	/// Wrap a byte source
	pub fn new(inner: R) -> Self {
		Self { inner, buf: BytesMut::with_capacity(READ_CHUNK) }
	}

	/// Number of read-ahead bytes not yet handed out
	pub fn buffered(&self) -> usize {
		self.buf.len()
	}

	/// Access the underlying stream (used for writing on duplex transports)
	pub fn get_mut(&mut self) -> &mut R {
		&mut self.inner
	}

	pub fn get_ref(&self) -> &R {
		&self.inner
	}

	/// Give back the transport. Buffered bytes are dropped with the reader.
	pub fn into_inner(self) -> R {
		self.inner
	}
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
	/// Read more bytes from the transport into the buffer
	async fn fill(&mut self, want: usize) -> ProtocolResult<()> {
		self.buf.reserve(want.max(READ_CHUNK));
		let n = self.inner.read_buf(&mut self.buf).await?;
		if n == 0 {
			return Err(ProtocolError::ConnectionClosed);
		}
		Ok(())
	}

	/// Next `\n`-terminated frame, terminator and one trailing `\r` stripped
	pub async fn read_line(&mut self) -> ProtocolResult<String> {
		let mut scanned = 0;
		loop {
			if let Some(pos) = self.buf[scanned..].iter().position(|b| *b == b'\n') {
				let end = scanned + pos;
				let mut text = &self.buf[..end];
				if text.last() == Some(&b'\r') {
					text = &text[..text.len() - 1];
				}
				let line = String::from_utf8_lossy(text).into_owned();
				self.buf.advance(end + 1);
				return Ok(line);
			}
			scanned = self.buf.len();
			if scanned > MAX_LINE_BYTES {
				return Err(ProtocolError::Malformed(format!(
					"status line exceeds {} bytes",
					MAX_LINE_BYTES
				)));
			}
			self.fill(READ_CHUNK).await?;
		}
	}

	/// Next `n` raw bytes
	pub async fn read_exact(&mut self, n: usize) -> ProtocolResult<Bytes> {
		while self.buf.len() < n {
			let missing = n - self.buf.len();
			self.fill(missing).await?;
		}
		Ok(self.buf.split_to(n).freeze())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio_test::io::Builder;

	async fn status_and_payload(chunks: &[&[u8]]) -> (String, Bytes, usize) {
		let mut builder = Builder::new();
		for chunk in chunks {
			builder.read(chunk);
		}
		let mut reader = FrameReader::new(builder.build());
		let line = reader.read_line().await.unwrap();
		let n: usize = line[3..].parse().unwrap();
		let payload = reader.read_exact(n).await.unwrap();
		(line, payload, reader.buffered())
	}

	#[tokio::test]
	async fn test_single_chunk() {
		let (line, payload, left) = status_and_payload(&[b"OK 5\nhello"]).await;
		assert_eq!(line, "OK 5");
		assert_eq!(&payload[..], b"hello");
		assert_eq!(left, 0);
	}

	#[tokio::test]
	async fn test_split_inside_status_line() {
		let (line, payload, _) = status_and_payload(&[b"O", b"K 1", b"1\nhello", b" world"]).await;
		assert_eq!(line, "OK 11");
		assert_eq!(&payload[..], b"hello world");
	}

	#[tokio::test]
	async fn test_split_exactly_at_newline() {
		let (line, payload, _) = status_and_payload(&[b"OK 4", b"\n", b"abcd"]).await;
		assert_eq!(line, "OK 4");
		assert_eq!(&payload[..], b"abcd");

		let (line, payload, _) = status_and_payload(&[b"OK 4\n", b"abcd"]).await;
		assert_eq!(line, "OK 4");
		assert_eq!(&payload[..], b"abcd");
	}

	#[tokio::test]
	async fn test_split_mid_payload_byte_by_byte() {
		let data: &[&[u8]] = &[b"OK 6\n", b"a", b"b", b"c", b"d", b"e", b"f"];
		let (line, payload, _) = status_and_payload(data).await;
		assert_eq!(line, "OK 6");
		assert_eq!(&payload[..], b"abcdef");
	}

	#[tokio::test]
	async fn test_surplus_is_kept_for_next_frame() {
		let mock = Builder::new().read(b"OK 3\nabcOK\nOK 2\nxy").build();
		let mut reader = FrameReader::new(mock);
		assert_eq!(reader.read_line().await.unwrap(), "OK 3");
		assert_eq!(&reader.read_exact(3).await.unwrap()[..], b"abc");
		assert_eq!(reader.buffered(), 10);
		assert_eq!(reader.read_line().await.unwrap(), "OK");
		assert_eq!(reader.read_line().await.unwrap(), "OK 2");
		assert_eq!(&reader.read_exact(2).await.unwrap()[..], b"xy");
		assert_eq!(reader.buffered(), 0);
	}

	#[tokio::test]
	async fn test_carriage_return_stripped() {
		let mock = Builder::new().read(b"ERR no such file\r\n").build();
		let mut reader = FrameReader::new(mock);
		assert_eq!(reader.read_line().await.unwrap(), "ERR no such file");
	}

	#[tokio::test]
	async fn test_payload_containing_newlines_is_not_split() {
		let mock = Builder::new().read(b"OK 6\na\nb\nc\n").build();
		let mut reader = FrameReader::new(mock);
		let line = reader.read_line().await.unwrap();
		assert_eq!(line, "OK 6");
		assert_eq!(&reader.read_exact(6).await.unwrap()[..], b"a\nb\nc\n");
	}

	#[tokio::test]
	async fn test_zero_length_payload() {
		let mock = Builder::new().read(b"OK 0\n").build();
		let mut reader = FrameReader::new(mock);
		assert_eq!(reader.read_line().await.unwrap(), "OK 0");
		assert!(reader.read_exact(0).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_eof_inside_line() {
		let mock = Builder::new().read(b"OK 1").build();
		let mut reader = FrameReader::new(mock);
		assert!(matches!(reader.read_line().await, Err(ProtocolError::ConnectionClosed)));
	}

	#[tokio::test]
	async fn test_eof_inside_payload() {
		let mock = Builder::new().read(b"OK 10\nshort").build();
		let mut reader = FrameReader::new(mock);
		reader.read_line().await.unwrap();
		assert!(matches!(reader.read_exact(10).await, Err(ProtocolError::ConnectionClosed)));
	}

	#[tokio::test]
	async fn test_transport_error_propagates() {
		let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
		let mock = Builder::new().read(b"OK").read_error(err).build();
		let mut reader = FrameReader::new(mock);
		match reader.read_line().await {
			Err(ProtocolError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_overlong_line_rejected() {
		let junk = vec![b'x'; MAX_LINE_BYTES + 10];
		let mock = Builder::new().read(&junk).build();
		let mut reader = FrameReader::new(mock);
		assert!(matches!(reader.read_line().await, Err(ProtocolError::Malformed(_))));
	}
}

// vim: ts=4
