//! In-memory store speaking the line protocol, for integration tests
//!
//! Knobs: fragmented replies, stalled, delayed or rejected commands (matched
//! by command-line prefix) and caps on WRITE acknowledgements and READ
//! payloads. Every command
//! line, trace id and accepted connection is recorded.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filegate::config::Config;
use filegate::gateway::{serve_with_listener, GatewayState};
use filegate::protocol::{ClientOptions, StoreClient};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct StoreState {
	active: BTreeMap<String, Vec<u8>>,
	trash: BTreeMap<String, Vec<u8>>,
	commands: Vec<String>,
	traces: Vec<String>,
	connections: usize,
	fragment: bool,
	stall: Vec<String>,
	delay: Vec<(String, Duration)>,
	reject: Vec<String>,
	ack_cap: Option<u64>,
	read_cap: Option<usize>,
}

#[derive(Clone)]
pub struct MockStore {
	pub addr: SocketAddr,
	state: Arc<Mutex<StoreState>>,
}

impl MockStore {
	pub async fn start() -> MockStore {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let state = Arc::new(Mutex::new(StoreState::default()));
		let accept_state = state.clone();
		tokio::spawn(async move {
			while let Ok((stream, _)) = listener.accept().await {
				accept_state.lock().unwrap().connections += 1;
				let state = accept_state.clone();
				tokio::spawn(async move {
					let _ = handle(stream, state).await;
				});
			}
		});
		MockStore { addr, state }
	}

	pub fn config(&self) -> Config {
		Config {
			server_addr: self.addr.to_string(),
			connect_timeout_ms: 2000,
			command_timeout_ms: 5000,
			..Config::default()
		}
	}

	pub fn options(&self) -> ClientOptions {
		ClientOptions::from(&self.config())
	}

	pub fn client(&self) -> StoreClient {
		StoreClient::new(self.options())
	}

	// === Setup ===

	pub fn seed(&self, name: &str, data: &[u8]) {
		self.state.lock().unwrap().active.insert(name.to_string(), data.to_vec());
	}

	pub fn set_fragmented(&self, on: bool) {
		self.state.lock().unwrap().fragment = on;
	}

	/// Never answer command lines starting with `prefix`
	pub fn stall(&self, prefix: &str) {
		self.state.lock().unwrap().stall.push(prefix.to_string());
	}

	/// Execute command lines starting with `prefix` at once, reply after `by`
	pub fn delay(&self, prefix: &str, by: Duration) {
		self.state.lock().unwrap().delay.push((prefix.to_string(), by));
	}

	/// Answer `ERR injected` to command lines starting with `prefix`
	pub fn reject(&self, prefix: &str) {
		self.state.lock().unwrap().reject.push(prefix.to_string());
	}

	/// Acknowledge at most `cap` bytes per WRITE
	pub fn cap_write_ack(&self, cap: u64) {
		self.state.lock().unwrap().ack_cap = Some(cap);
	}

	/// Return at most `cap` bytes per READ, as if the file had shrunk
	pub fn cap_read(&self, cap: usize) {
		self.state.lock().unwrap().read_cap = Some(cap);
	}

	// === Inspection ===

	pub fn file(&self, name: &str) -> Option<Vec<u8>> {
		self.state.lock().unwrap().active.get(name).cloned()
	}

	pub fn trashed(&self, name: &str) -> Option<Vec<u8>> {
		self.state.lock().unwrap().trash.get(name).cloned()
	}

	pub fn commands(&self) -> Vec<String> {
		self.state.lock().unwrap().commands.clone()
	}

	pub fn count(&self, verb: &str) -> usize {
		let prefix = format!("{} ", verb);
		self.commands().iter().filter(|c| *c == verb || c.starts_with(&prefix)).count()
	}

	pub fn traces(&self) -> Vec<String> {
		self.state.lock().unwrap().traces.clone()
	}

	pub fn connections(&self) -> usize {
		self.state.lock().unwrap().connections
	}

	pub fn clear_log(&self) {
		let mut state = self.state.lock().unwrap();
		state.commands.clear();
		state.traces.clear();
	}
}

/// Deterministic test content
pub fn pattern(len: usize) -> Vec<u8> {
	(0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Run a gateway for `config` on an ephemeral port, returning its base URL
pub async fn spawn_gateway(config: Config) -> String {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let base = format!("http://{}", listener.local_addr().unwrap());
	let state = Arc::new(GatewayState::new(config));
	tokio::spawn(async move {
		let _ = serve_with_listener(listener, state).await;
	});
	base
}

async fn reply(wr: &mut OwnedWriteHalf, data: &[u8], fragment: bool) -> std::io::Result<()> {
	if fragment {
		for piece in data.chunks(3) {
			wr.write_all(piece).await?;
			wr.flush().await?;
			tokio::time::sleep(Duration::from_millis(1)).await;
		}
	} else {
		wr.write_all(data).await?;
	}
	wr.flush().await
}

fn with_payload(payload: &[u8]) -> Vec<u8> {
	let mut out = format!("OK {}\n", payload.len()).into_bytes();
	out.extend_from_slice(payload);
	out
}

fn name_list(names: impl Iterator<Item = String>) -> Vec<u8> {
	let mut payload = Vec::new();
	for name in names {
		payload.extend_from_slice(name.as_bytes());
		payload.push(b'\n');
	}
	with_payload(&payload)
}

async fn handle(stream: TcpStream, state: Arc<Mutex<StoreState>>) -> std::io::Result<()> {
	stream.set_nodelay(true)?;
	let (rd, mut wr) = stream.into_split();
	let mut rd = BufReader::new(rd);
	let mut current: Option<String> = None;

	loop {
		let mut raw = String::new();
		if rd.read_line(&mut raw).await? == 0 {
			return Ok(());
		}
		let line = raw.trim_end_matches(['\n', '\r']).to_string();
		let (cmd, arg) = match line.split_once(' ') {
			Some((cmd, arg)) => (cmd.to_string(), arg.to_string()),
			None => (line.clone(), String::new()),
		};

		if cmd == "TRACE" {
			state.lock().unwrap().traces.push(arg);
			continue;
		}

		// WRITE payload is consumed before anything else happens
		let mut write_data = Vec::new();
		if cmd == "WRITE" {
			let len: usize = arg.split(' ').nth(1).and_then(|l| l.parse().ok()).unwrap_or(0);
			write_data = vec![0u8; len];
			rd.read_exact(&mut write_data).await?;
		}

		let (stalled, rejected, delay, fragment) = {
			let mut s = state.lock().unwrap();
			s.commands.push(line.clone());
			(
				s.stall.iter().any(|p| line.starts_with(p.as_str())),
				s.reject.iter().any(|p| line.starts_with(p.as_str())),
				s.delay.iter().find(|(p, _)| line.starts_with(p.as_str())).map(|(_, d)| *d),
				s.fragment,
			)
		};
		if stalled {
			tokio::time::sleep(Duration::from_secs(60)).await;
			return Ok(());
		}
		if rejected {
			reply(&mut wr, b"ERR injected\n", fragment).await?;
			continue;
		}

		let out: Vec<u8> = {
			let mut s = state.lock().unwrap();
			match cmd.as_str() {
				"OPEN" => {
					s.active.entry(arg.clone()).or_default();
					current = Some(arg);
					b"OK\n".to_vec()
				}
				"LIST" => name_list(s.active.keys().cloned().collect::<Vec<_>>().into_iter()),
				"LISTTRASH" => name_list(s.trash.keys().cloned().collect::<Vec<_>>().into_iter()),
				"STAT" => match s.active.get(&arg) {
					Some(data) => format!("OK {}\n", data.len()).into_bytes(),
					None => b"ERR not found\n".to_vec(),
				},
				"READ" => {
					let read_cap = s.read_cap;
					let mut parts = arg.split(' ').map(|p| p.parse::<usize>().unwrap_or(0));
					let (off, len) = (parts.next().unwrap_or(0), parts.next().unwrap_or(0));
					match current.as_ref().and_then(|n| s.active.get(n)) {
						Some(data) => {
							let len = read_cap.map_or(len, |cap| len.min(cap));
							let start = off.min(data.len());
							let end = off.saturating_add(len).min(data.len());
							with_payload(&data[start..end])
						}
						None => b"ERR no file open\n".to_vec(),
					}
				}
				"WRITE" => {
					let off: usize = arg.split(' ').next().and_then(|o| o.parse().ok()).unwrap_or(0);
					let cap = s.ack_cap;
					match current.as_ref().and_then(|n| s.active.get_mut(n)) {
						Some(data) => {
							let ack = cap.map_or(write_data.len(), |c| write_data.len().min(c as usize));
							if data.len() < off + ack {
								data.resize(off + ack, 0);
							}
							data[off..off + ack].copy_from_slice(&write_data[..ack]);
							format!("OK {}\n", ack).into_bytes()
						}
						None => b"ERR no file open\n".to_vec(),
					}
				}
				"TRASH" => match s.active.remove(&arg) {
					Some(data) => {
						let mut target = arg.clone();
						let mut n = 1;
						while s.trash.contains_key(&target) {
							target = format!("{} ({})", arg, n);
							n += 1;
						}
						s.trash.insert(target, data);
						b"OK\n".to_vec()
					}
					None => b"ERR\n".to_vec(),
				},
				"RESTORE" => match s.trash.remove(&arg) {
					Some(data) => {
						s.active.insert(arg, data);
						b"OK\n".to_vec()
					}
					None => b"ERR\n".to_vec(),
				},
				"PURGETRASH" => match s.trash.remove(&arg) {
					Some(_) => b"OK\n".to_vec(),
					None => b"ERR\n".to_vec(),
				},
				_ => b"ERR\n".to_vec(),
			}
		};
		if let Some(by) = delay {
			tokio::time::sleep(by).await;
		}
		reply(&mut wr, &out, fragment).await?;
	}
}

// vim: ts=4
