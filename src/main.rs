mod api;
mod app;
mod config;
mod event;
mod logging;
mod query;
mod sync;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(about = "A terminal UI for managing a product catalog over a REST API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/stockroom/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Product collection endpoint, e.g. http://localhost:8001/api/products
  #[arg(short = 'u', long, env = "STOCKROOM_API_URL")]
  api_url: Option<String>,

  /// Log file path (default: $XDG_DATA_HOME/stockroom/stockroom.log)
  #[arg(long)]
  log_file: Option<PathBuf>,

  /// Increase log verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let log_file = args.log_file.unwrap_or_else(logging::default_log_file);
  let _guard = logging::init(&log_file, args.verbose)?;

  // Command line / environment wins over the config file
  let config = config::Config::load(args.config.as_deref())?.with_api_url(args.api_url);

  // Put the terminal back before the panic report is printed
  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = app::restore_terminal();
    default_hook(info);
  }));

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
