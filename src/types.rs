//! JSON bodies shared by the gateway and its HTTP client

use serde::{Deserialize, Serialize};

/// One listing entry; `size` is only authoritative at the instant of the call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
	pub name: String,
	pub size: u64,
}

/// `GET /files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileList {
	pub files: Vec<FileEntry>,
}

/// `GET /files/~trash/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameList {
	pub files: Vec<String>,
}

/// `PATCH /files/:name`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReply {
	pub written: u64,
	pub offset: u64,
}

/// Body of every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
	pub error: String,
}

// vim: ts=4
