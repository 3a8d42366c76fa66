mod logging;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use daemon::{
	config::{self, Config},
	db,
	engine::{CycleReport, Poller, SyncService},
	fetcher::HttpSource,
	snapshot::SnapshotProjector,
	store::SurrealStore,
};
use housing_core::Snapshot;
use tracing::info;

#[derive(Parser)]
#[command(name = "housing-sync")]
#[command(
	about = "Mirror the housing API into a local store and record occupancy snapshots",
	version
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Config file (default: <data dir>/housing-sync/config.toml)
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Database path, overriding the config file
	#[arg(long, global = true)]
	db: Option<PathBuf>,

	/// Use a throwaway in-memory database
	#[arg(long, global = true, conflicts_with = "db")]
	memory: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Poll on the configured interval until Ctrl-C
	Run,
	/// Run one reconciliation cycle now
	Sync,
	/// Record snapshots for every known location
	Snapshot {
		/// Defaults to today
		#[arg(long)]
		date: Option<NaiveDate>,
		#[arg(long)]
		json: bool,
	},
	/// Query recorded snapshots
	Snapshots {
		#[arg(long)]
		location: Option<String>,
		#[arg(long, conflicts_with_all = ["from", "to"])]
		date: Option<NaiveDate>,
		#[arg(long)]
		from: Option<NaiveDate>,
		#[arg(long)]
		to: Option<NaiveDate>,
		/// List distinct snapshot locations instead
		#[arg(long)]
		locations: bool,
		#[arg(long)]
		json: bool,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config_path = match &cli.config {
		Some(path) => path.clone(),
		None => config::default_config_path()?,
	};
	let config = Config::load_or_default(&config_path)
		.with_context(|| format!("loading config {}", config_path.display()))?;

	logging::init(config.logging.dir.as_deref())?;
	info!(config = %config_path.display(), "housing-sync v{}", env!("CARGO_PKG_VERSION"));

	let handle = if cli.memory {
		db::open_in_memory().await?
	} else {
		let path = match cli.db {
			Some(path) => path,
			None => config.database_path()?,
		};
		info!(path = %path.display(), "opening database");
		db::open(&path).await?
	};
	let store = Arc::new(SurrealStore::new(handle));

	match cli.command {
		Commands::Run => run(store, &config).await,
		Commands::Sync => sync_once(store, &config).await,
		Commands::Snapshot { date, json } => {
			let date = date.unwrap_or_else(|| Utc::now().date_naive());
			let projection = SnapshotProjector::new(store).project_all(date).await?;
			for location in &projection.rejected {
				eprintln!("skipped {location}: counts failed validation");
			}
			print_snapshots(&projection.created, json)
		}
		Commands::Snapshots { location, date, from, to, locations, json } => {
			let projector = SnapshotProjector::new(store);
			if locations {
				for location in projector.locations().await? {
					println!("{location}");
				}
				return Ok(());
			}

			let range = match (date, from, to) {
				(Some(day), _, _) => Some((day, day)),
				(None, Some(from), Some(to)) => Some((from, to)),
				(None, None, None) => None,
				_ => bail!("--from and --to must be given together"),
			};
			let rows = match (location.as_deref(), range) {
				(None, None) => projector.all().await?,
				(None, Some((from, to))) if from == to => projector.on(from).await?,
				(None, Some((from, to))) => projector.between(from, to).await?,
				(Some(location), None) => projector.at(location).await?,
				(Some(location), Some((from, to))) => {
					projector.at_between(location, from, to).await?
				}
			};
			print_snapshots(&rows, json)
		}
	}
}

fn service(
	store: Arc<SurrealStore>,
	config: &Config,
) -> Result<SyncService<SurrealStore, HttpSource>> {
	let source = HttpSource::new(&config.remote)?;
	info!(remote = %config.remote.base(), "remote configured");
	Ok(SyncService::new(store, Arc::new(source), config.poller.policy())
		.with_snapshots(config.poller.snapshots_after_cycle))
}

async fn run(store: Arc<SurrealStore>, config: &Config) -> Result<()> {
	let poller = Poller::new(service(store, config)?, config.poller.interval());
	poller.start()?;

	info!("polling, press Ctrl+C to stop");
	tokio::signal::ctrl_c().await?;
	info!("shutting down, waiting for any in-flight cycle");

	poller.stop().await?;
	info!(cycles = poller.completed_cycles(), "stopped");
	Ok(())
}

async fn sync_once(store: Arc<SurrealStore>, config: &Config) -> Result<()> {
	let report = service(store, config)?.run_cycle(Utc::now().date_naive()).await?;
	print_report(&report);
	Ok(())
}

fn print_report(report: &CycleReport) {
	println!("{:<8} {:>8} {:>8} {:>8}", "kind", "inserted", "updated", "deleted");
	for kind in &report.kinds {
		match &kind.skipped {
			Some(reason) => println!("{:<8} skipped: {reason}", kind.kind),
			None => println!(
				"{:<8} {:>8} {:>8} {:>8}",
				kind.kind, kind.inserted, kind.updated, kind.deleted
			),
		}
		if kind.suppressed > 0 {
			println!("{:<8} {} deletions withheld (empty remote)", "", kind.suppressed);
		}
	}
	if report.snapshots > 0 {
		println!("{} snapshots recorded for {}", report.snapshots, report.date);
	}
}

fn print_snapshots(rows: &[Snapshot], json: bool) -> Result<()> {
	if json {
		println!("{}", serde_json::to_string_pretty(rows)?);
		return Ok(());
	}
	for s in rows {
		let date = s.date.map(|d| d.to_string()).unwrap_or_default();
		let location = s.location.as_deref().unwrap_or("");
		println!(
			"{date}  {location:<20} rooms={:<5} users={}",
			s.room_occupancy_count, s.user_count
		);
	}
	Ok(())
}
