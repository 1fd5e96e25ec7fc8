use bytes::Bytes;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use filegate::bench::{self, BenchOptions};
use filegate::config::Config;
use filegate::gateway;
use filegate::logging::{self, *};
use filegate::progress::CliProgress;
use filegate::protocol::StoreClient;
use filegate::transfer::{self, ChunkTransport, GatewayClient, TransferOptions};

///////////////////////
// Utility functions //
///////////////////////

/// Defaults, config file, environment, then CLI flags
fn load_config(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
	let mut config = Config::load(matches.get_one::<PathBuf>("config").map(|p| p.as_path()))?;
	if let Some(server) = matches.get_one::<String>("server") {
		config.server_addr = server.clone();
	}
	if let Some(level) = matches.get_one::<String>("log-level") {
		config.log_level = level.clone();
	}
	config.validate()?;
	Ok(config)
}

/// Gateway transport when `--gateway` is given, the store otherwise
fn transport_for(
	sub: &ArgMatches,
	config: &Config,
) -> Result<Box<dyn ChunkTransport>, Box<dyn Error>> {
	match sub.get_one::<String>("gateway") {
		Some(url) => Ok(Box::new(GatewayClient::from_config(url, config)?)),
		None => Ok(Box::new(StoreClient::from_config(config))),
	}
}

fn gateway_arg() -> Arg {
	Arg::new("gateway")
		.long("gateway")
		.value_name("URL")
		.help("Go through the HTTP gateway at URL instead of the store")
}

fn name_arg() -> Arg {
	Arg::new("name").required(true)
}

async fn write_output(dest: &str, data: &[u8]) -> Result<(), Box<dyn Error>> {
	if dest == "-" {
		let mut stdout = tokio::io::stdout();
		stdout.write_all(data).await?;
		stdout.flush().await?;
	} else {
		tokio::fs::write(dest, data).await?;
	}
	Ok(())
}

fn cli() -> Command {
	Command::new("filegate")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Client and HTTP gateway for a line-framed TCP file store")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.value_parser(value_parser!(PathBuf))
				.global(true)
				.help("Config file (.toml or .json5)"),
		)
		.arg(
			Arg::new("server")
				.short('s')
				.long("server")
				.value_name("HOST:PORT")
				.global(true)
				.help("Store address"),
		)
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.value_name("LEVEL")
				.global(true)
				.help("Log level when RUST_LOG is unset"),
		)
		.subcommand(
			Command::new("gateway").about("Run the HTTP gateway").arg(
				Arg::new("bind").short('b').long("bind").value_name("ADDR").help("Listen address"),
			),
		)
		.subcommand(Command::new("ls").about("List files with sizes"))
		.subcommand(Command::new("stat").about("Show a file's size").arg(name_arg()))
		.subcommand(Command::new("cat").about("Write a file to stdout").arg(name_arg()))
		.subcommand(
			Command::new("put")
				.about("Upload a local file in parallel chunks")
				.arg(Arg::new("file").required(true).value_parser(value_parser!(PathBuf)))
				.arg(Arg::new("name").help("Remote name (defaults to the file name)"))
				.arg(gateway_arg()),
		)
		.subcommand(
			Command::new("get")
				.about("Download a file with parallel ranged reads")
				.arg(name_arg())
				.arg(Arg::new("dest").help("Local path, '-' for stdout (defaults to the name)"))
				.arg(gateway_arg()),
		)
		.subcommand(
			Command::new("rm")
				.about("Move files to the trash")
				.arg(Arg::new("name").required(true).action(ArgAction::Append).num_args(1..))
				.arg(gateway_arg()),
		)
		.subcommand(Command::new("trash-ls").about("List trashed files"))
		.subcommand(Command::new("restore").about("Restore a trashed file").arg(name_arg()))
		.subcommand(Command::new("purge").about("Remove a trashed file for good").arg(name_arg()))
		.subcommand(
			Command::new("bench")
				.about("Read-heavy load benchmark against the store")
				.arg(
					Arg::new("workers")
						.short('w')
						.long("workers")
						.value_parser(value_parser!(usize))
						.default_value("8"),
				)
				.arg(
					Arg::new("ops")
						.short('n')
						.long("ops")
						.value_parser(value_parser!(usize))
						.default_value("10000"),
				)
				.arg(Arg::new("name").long("name").default_value("store.bin")),
		)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = cli().get_matches();
	let mut config = load_config(&matches)?;
	logging::init_tracing(&config.log_level);
	let store = StoreClient::from_config(&config);
	let options = TransferOptions::from(&config);

	match matches.subcommand() {
		Some(("gateway", sub)) => {
			if let Some(bind) = sub.get_one::<String>("bind") {
				config.gateway_bind = bind.clone();
			}
			gateway::serve(config).await?;
		}
		Some(("ls", _)) => {
			for name in store.list().await? {
				match store.stat(&name).await {
					Ok(size) => println!("{:>12}  {}", size, name),
					Err(e) => {
						warn!("stat {} failed: {}", name, e);
						println!("{:>12}  {}", "?", name);
					}
				}
			}
		}
		Some(("stat", sub)) => {
			let name = sub.get_one::<String>("name").ok_or("stat: name required")?;
			println!("{}", store.stat(name).await?);
		}
		Some(("cat", sub)) => {
			let name = sub.get_one::<String>("name").ok_or("cat: name required")?;
			write_output("-", &store.read_full(name).await?).await?;
		}
		Some(("put", sub)) => {
			let file = sub.get_one::<PathBuf>("file").ok_or("put: file required")?;
			let name = match sub.get_one::<String>("name") {
				Some(name) => name.clone(),
				None => remote_name(file)?,
			};
			let data = Bytes::from(tokio::fs::read(file).await?);
			let transport = transport_for(sub, &config)?;
			let progress = CliProgress::new();
			let summary =
				transfer::upload(transport.as_ref(), &name, data, &options, &progress).await;
			progress.finish();
			let summary = summary?;
			info!("uploaded {} bytes to {} in {} chunks", summary.bytes, name, summary.chunks);
		}
		Some(("get", sub)) => {
			let name = sub.get_one::<String>("name").ok_or("get: name required")?;
			let dest = sub.get_one::<String>("dest").unwrap_or(name);
			let transport = transport_for(sub, &config)?;
			let progress = CliProgress::new();
			let data = transfer::download(transport.as_ref(), name, &options, &progress).await;
			progress.finish();
			write_output(dest, &data?).await?;
		}
		Some(("rm", sub)) => {
			let names: Vec<String> =
				sub.get_many::<String>("name").ok_or("rm: name required")?.cloned().collect();
			let transport = transport_for(sub, &config)?;
			let outcome =
				transfer::trash_many(transport.as_ref(), &names, options.upload_concurrency).await;
			for (name, e) in &outcome.failed {
				eprintln!("{}: {}", name, e);
			}
			outcome.into_result()?;
		}
		Some(("trash-ls", _)) => {
			for name in store.list_trash().await? {
				println!("{}", name);
			}
		}
		Some(("restore", sub)) => {
			let name = sub.get_one::<String>("name").ok_or("restore: name required")?;
			store.restore(name).await?;
		}
		Some(("purge", sub)) => {
			let name = sub.get_one::<String>("name").ok_or("purge: name required")?;
			store.purge(name).await?;
		}
		Some(("bench", sub)) => {
			let bench_options = BenchOptions {
				workers: *sub.get_one::<usize>("workers").ok_or("bench: workers required")?,
				total_ops: *sub.get_one::<usize>("ops").ok_or("bench: ops required")?,
				name: sub.get_one::<String>("name").cloned().unwrap_or_else(|| "store.bin".into()),
				..BenchOptions::default()
			};
			let report = bench::run(&store, &bench_options).await?;
			println!("{}", report);
		}
		_ => {}
	}

	Ok(())
}

fn remote_name(file: &Path) -> Result<String, Box<dyn Error>> {
	Ok(file
		.file_name()
		.and_then(|n| n.to_str())
		.ok_or_else(|| format!("cannot derive a remote name from {}", file.display()))?
		.to_string())
}

// vim: ts=4
