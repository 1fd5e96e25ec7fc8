//! Wire commands and status lines
//!
//! Every request is one ASCII line terminated by `\n`. Every reply starts
//! with one status line: `OK`, `OK <n>` or `ERR <reason>`.

use super::error::{ProtocolError, ProtocolResult};

/// One request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Trace(String),
	Open(String),
	List,
	Stat(String),
	Read { offset: u64, length: u64 },
	Write { offset: u64, length: u64 },
	Trash(String),
	ListTrash,
	Restore(String),
	PurgeTrash(String),
}

impl Command {
	/// Command keyword as it appears on the wire
	pub fn verb(&self) -> &'static str {
		match self {
			Command::Trace(_) => "TRACE",
			Command::Open(_) => "OPEN",
			Command::List => "LIST",
			Command::Stat(_) => "STAT",
			Command::Read { .. } => "READ",
			Command::Write { .. } => "WRITE",
			Command::Trash(_) => "TRASH",
			Command::ListTrash => "LISTTRASH",
			Command::Restore(_) => "RESTORE",
			Command::PurgeTrash(_) => "PURGETRASH",
		}
	}

	/// Name argument, for commands that carry one
	pub fn name(&self) -> Option<&str> {
		match self {
			Command::Trace(name)
			| Command::Open(name)
			| Command::Stat(name)
			| Command::Trash(name)
			| Command::Restore(name)
			| Command::PurgeTrash(name) => Some(name),
			_ => None,
		}
	}

	/// Render the request line including the trailing `\n`
	pub fn encode(&self) -> ProtocolResult<String> {
		if let Some(name) = self.name() {
			validate_name(name)?;
		}
		let line = match self {
			Command::List | Command::ListTrash => format!("{}\n", self.verb()),
			Command::Read { offset, length } | Command::Write { offset, length } => {
				format!("{} {} {}\n", self.verb(), offset, length)
			}
			_ => format!("{} {}\n", self.verb(), self.name().unwrap_or_default()),
		};
		Ok(line)
	}
}

/// Reject names that would break line framing
pub fn validate_name(name: &str) -> ProtocolResult<()> {
	if name.is_empty() || name.contains('\n') || name.contains('\r') {
		return Err(ProtocolError::InvalidName(name.to_string()));
	}
	Ok(())
}

/// Parsed status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
	/// `OK` with an optional numeric argument
	Ok(Option<u64>),
	/// Anything not starting with `OK`; carries the reason text
	Err(String),
}

impl Status {
	pub fn parse(line: &str) -> ProtocolResult<Status> {
		if line == "OK" {
			return Ok(Status::Ok(None));
		}
		if let Some(arg) = line.strip_prefix("OK ") {
			let arg = arg.trim();
			if arg.is_empty() {
				return Ok(Status::Ok(None));
			}
			let n = arg
				.parse::<u64>()
				.map_err(|_| ProtocolError::Malformed(format!("bad count in {:?}", line)))?;
			return Ok(Status::Ok(Some(n)));
		}
		let reason = line.strip_prefix("ERR").map(str::trim).unwrap_or(line.trim());
		Ok(Status::Err(reason.to_string()))
	}

	/// Turn a status into the numeric argument, failing on `ERR`
	pub fn into_result(self, verb: &str) -> ProtocolResult<Option<u64>> {
		match self {
			Status::Ok(n) => Ok(n),
			Status::Err(reason) => Err(ProtocolError::rejected(verb, &reason)),
		}
	}
}

/// Split a newline separated name listing, dropping blank entries
pub fn parse_names(payload: &[u8]) -> Vec<String> {
	String::from_utf8_lossy(payload)
		.split('\n')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect()
}


// vim: ts=4
