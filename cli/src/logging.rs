use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE: &str = "housing-sync.log";

/// stderr always; `<log_dir>/housing-sync.log` as well when a directory is configured.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	let file_layer = match log_dir {
		Some(dir) => {
			std::fs::create_dir_all(dir)
				.with_context(|| format!("creating log dir {}", dir.display()))?;
			let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
			Some(fmt::layer().with_ansi(false).with_writer(file_appender))
		}
		None => None,
	};

	tracing_subscriber::registry()
		.with(env_filter)
		.with(fmt::layer().with_target(false).with_writer(std::io::stderr))
		.with(file_layer)
		.try_init()
		.context("installing tracing subscriber")?;

	Ok(())
}
