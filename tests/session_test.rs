//! Read session state machine against the in-memory store

mod common;

use common::{pattern, MockStore};
use filegate::protocol::{ClientOptions, ProtocolError, ReadSession, StoreClient};
use std::time::Duration;

#[tokio::test]
async fn test_many_reads_share_one_connection() {
	let store = MockStore::start().await;
	let data = pattern(4096);
	store.seed("s.bin", &data);

	let mut session = store.client().session("s.bin").await.unwrap();
	assert!(session.is_open());
	assert_eq!(session.name(), Some("s.bin"));

	for (offset, length) in [(0u64, 100u64), (4000, 96), (1000, 1), (2048, 1024)] {
		let chunk = session.read(offset, length).await.unwrap();
		assert_eq!(&chunk[..], &data[offset as usize..(offset + length) as usize]);
	}
	assert_eq!(store.connections(), 1);
	assert_eq!(store.count("OPEN"), 1);
	assert_eq!(store.count("READ"), 4);

	session.close();
	assert!(!session.is_open());
}

#[tokio::test]
async fn test_zero_length_read_at_end() {
	let store = MockStore::start().await;
	store.seed("tiny", b"abc");
	let mut session = store.client().session("tiny").await.unwrap();
	assert_eq!(&session.read(1, 10).await.unwrap()[..], b"bc");
	assert!(session.read(3, 10).await.unwrap().is_empty());
	assert!(session.is_open());
}

#[tokio::test]
async fn test_state_violations() {
	let store = MockStore::start().await;
	store.seed("f", b"abc");
	let mut session = ReadSession::new(store.client());

	assert!(matches!(session.read(0, 1).await, Err(ProtocolError::InvalidState(_))));
	assert_eq!(store.connections(), 0);

	session.open("f").await.unwrap();
	assert!(matches!(session.open("f").await, Err(ProtocolError::InvalidState(_))));
	assert!(session.is_open());

	session.close();
	session.close();
	assert!(!session.is_open());
	assert!(matches!(session.read(0, 1).await, Err(ProtocolError::InvalidState(_))));

	// Reopen after close
	session.open("f").await.unwrap();
	assert_eq!(&session.read(0, 3).await.unwrap()[..], b"abc");
}

#[tokio::test]
async fn test_rejected_open_leaves_session_closed() {
	let store = MockStore::start().await;
	store.reject("OPEN locked");
	let mut session = ReadSession::new(store.client());
	let err = session.open("locked").await.unwrap_err();
	assert!(err.is_rejection());
	assert!(!session.is_open());
}

#[tokio::test]
async fn test_rejection_keeps_session_open() {
	let store = MockStore::start().await;
	store.seed("f", b"abcdef");
	store.reject("READ 5 ");
	let mut session = store.client().session("f").await.unwrap();

	let err = session.read(5, 1).await.unwrap_err();
	assert!(err.is_rejection());
	assert!(session.is_open());
	assert_eq!(&session.read(0, 2).await.unwrap()[..], b"ab");
}

#[tokio::test]
async fn test_timeout_closes_session() {
	let store = MockStore::start().await;
	store.seed("f", b"abcdef");
	store.stall("READ 4 ");
	let client = StoreClient::new(ClientOptions {
		command_timeout: Some(Duration::from_millis(100)),
		..store.options()
	});
	let mut session = client.session("f").await.unwrap();

	let err = session.read(4, 2).await.unwrap_err();
	assert!(matches!(err, ProtocolError::Timeout { .. }));
	assert!(!session.is_open());
	assert!(matches!(session.read(0, 1).await, Err(ProtocolError::InvalidState(_))));
}

#[tokio::test]
async fn test_fragmented_session_reads() {
	let store = MockStore::start().await;
	let data = pattern(64);
	store.seed("f", &data);
	store.set_fragmented(true);
	let mut session = store.client().session("f").await.unwrap();
	let mut out = Vec::new();
	let mut offset = 0;
	loop {
		let chunk = session.read(offset, 10).await.unwrap();
		if chunk.is_empty() {
			break;
		}
		offset += chunk.len() as u64;
		out.extend_from_slice(&chunk);
	}
	assert_eq!(out, data);
}

// vim: ts=4
