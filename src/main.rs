mod cache;
mod commands;
mod config;
mod error;
mod ids;
mod lifecycle;
mod logging;
mod reconcile;
mod table;
mod tracker;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "reqsync")]
#[command(about = "Track material requests kept in a Smartsheet sheet")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/reqsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Sheet id to use instead of the configured one
  #[arg(short, long)]
  sheet: Option<u64>,

  /// Also print logs to stderr
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.verbose)?;

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(sheet) = args.sheet {
    config.sheet.id = sheet;
  }

  let token = config::Config::get_api_token()?;
  let client = table::SmartsheetClient::connect(&config, &token).await?;
  let clock = lifecycle::BusinessClock::new(config.records.utc_offset_hours)?;
  info!(sheet = config.sheet.id, "connected");

  let tracker = tracker::Tracker::new(Arc::new(client), &config, clock);
  commands::run(args.command, &tracker).await
}
