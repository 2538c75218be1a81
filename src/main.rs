use clap::{Arg, Command};
use std::error::Error;
use std::path::PathBuf;

use workr::fileworker::FileWorker;
use workr::logging::*;
use workr::protocol::ALL_COMMANDS;
use workr::{Connection, Worker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("workr")
		.version(env!("CARGO_PKG_VERSION"))
		.about("I/O worker for virtual filesystem operations")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.help("Worker configuration file (TOML)"),
		)
		.subcommand(
			Command::new("serve")
				.about("Run a local-file worker on stdio (used internally by the job side)")
				.arg(Arg::new("dir").required(true).help("Directory the worker is rooted at")),
		)
		.subcommand(Command::new("commands").about("Print the command vocabulary table"))
		.get_matches();

	let config = match matches.get_one::<String>("config") {
		Some(path) => WorkerConfig::from_toml_file(&PathBuf::from(path))?,
		None => WorkerConfig::default(),
	};

	if let Some(sub) = matches.subcommand_matches("serve") {
		init_tracing();
		let dir = sub.get_one::<String>("dir").ok_or("serve: directory argument required")?;
		let root = std::fs::canonicalize(dir)
			.map_err(|e| format!("serve: cannot open root {}: {}", dir, e))?;

		let mut worker = Worker::with_config("file", Connection::stdio(), config);

		// Signals set the kill flag; the dispatch loop and handlers poll it
		// and wind down cooperatively.
		let kill = worker.kill_switch();
		tokio::spawn(async move {
			let mut term = match tokio::signal::unix::signal(
				tokio::signal::unix::SignalKind::terminate(),
			) {
				Ok(stream) => stream,
				Err(e) => {
					error!("cannot install SIGTERM handler: {}", e);
					return;
				}
			};
			tokio::select! {
				_ = tokio::signal::ctrl_c() => {}
				_ = term.recv() => {}
			}
			warn!("termination signal received, setting kill flag");
			kill.trigger();
		});

		let mut handler = FileWorker::new(root);
		worker.run(&mut handler).await?;
	} else if matches.subcommand_matches("commands").is_some() {
		let table: Vec<serde_json::Value> = ALL_COMMANDS
			.iter()
			.map(|cmd| {
				serde_json::json!({
					"name": cmd.name(),
					"tag": *cmd as u32,
					"direction": cmd.direction().to_string(),
				})
			})
			.collect();
		println!("{}", serde_json::to_string_pretty(&table)?);
	}

	Ok(())
}

// vim: ts=4
