mod cache;
mod config;
mod destination;
mod service;
mod store;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

use cache::{DestinationCache, NoopCache, SqliteCache};
use config::Config;
use destination::fetcher::Fetcher;
use service::DestinationService;
use store::SqliteStore;

#[derive(Parser, Debug)]
#[command(name = "wayfare")]
#[command(about = "Travel destination data aggregator with cache-aside storage")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/wayfare/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Look up the stored record for a city (cache first, then store)
  Read { city: String },
  /// Fetch fresh data from every source and persist it
  Refresh {
    city: String,
    /// Country name for the country-info source (defaults to the city)
    #[arg(long)]
    country: Option<String>,
  },
  /// List stored destinations matching a weather description
  Search {
    /// Weather description to match, e.g. "clear sky"
    #[arg(long)]
    condition: String,
  },
  /// Check store and cache health
  Status,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let filter =
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "wayfare=info".into());
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  let fetcher = Fetcher::from_config(
    &config.sources,
    Config::weather_api_key()?,
    Config::poi_api_key()?,
  )?;
  let store = SqliteStore::open(&config.store_path()?)?;
  let cache: Box<dyn DestinationCache> = if config.cache.enabled {
    Box::new(SqliteCache::open(&config.cache_path()?)?)
  } else {
    Box::new(NoopCache)
  };

  let service = DestinationService::new(fetcher, store, cache, config.cache.ttl());

  match args.command {
    Command::Read { city } => match service.read(&city)? {
      Some(facts) => println!("{}", serde_json::to_string_pretty(&facts)?),
      None => {
        eprintln!("destination not found; run `wayfare refresh {}` first", city);
        std::process::exit(1);
      }
    },
    Command::Refresh { city, country } => {
      let facts = service.refresh(&city, country.as_deref()).await?;
      println!("{}", serde_json::to_string_pretty(&facts)?);
    }
    Command::Search { condition } => {
      let hits = service.search_by_weather(&condition)?;
      println!("{}", serde_json::to_string_pretty(&hits)?);
    }
    Command::Status => {
      let report = service.status();
      println!("{}", serde_json::to_string_pretty(&report)?);
      if report.status != "ok" {
        std::process::exit(1);
      }
    }
  }

  Ok(())
}
