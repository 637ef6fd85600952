//! aqi-geo: geocode a city AQI table once and browse the cached result.

use aqi_geo::{
    load_dataset, AqiFrameExt, CacheStore, FileStore, GeoCache, GeoCacheError, GeocodeConfig,
    Month, TableSource, DEFAULT_CITY_COLUMN, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT,
};
use clap::{Parser, Subcommand};
use log::info;
use polars::prelude::DataFrame;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const PAGE_SIZE: usize = 10;

#[derive(Parser)]
#[command(name = "aqi-geo")]
#[command(about = "Geocode a city AQI dataset once and browse the cached table", long_about = None)]
#[command(version)]
struct Cli {
    /// Cache artifact holding the geocoded table (.csv or .parquet)
    #[arg(long, env = "AQI_GEO_CACHE", default_value = "aqi_geo.csv", global = true)]
    cache: PathBuf,

    /// Input dataset, only read when the cache artifact does not exist yet
    #[arg(long, env = "AQI_GEO_INPUT", default_value = "aqi_data.csv", global = true)]
    input: PathBuf,

    /// Client identifier sent to the geocoding service
    #[arg(long, env = "AQI_GEO_USER_AGENT", default_value = DEFAULT_USER_AGENT, global = true)]
    user_agent: String,

    /// Base URL of a Nominatim-compatible service
    #[arg(long, env = "AQI_GEO_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    endpoint: String,

    /// Minimum milliseconds between two geocoding requests
    #[arg(long, env = "AQI_GEO_INTERVAL_MS", default_value_t = 2000, global = true)]
    interval_ms: u64,

    /// Geocoding requests in flight at once
    #[arg(long, env = "AQI_GEO_CONCURRENCY", default_value_t = 1, global = true)]
    concurrency: usize,

    /// Look up each distinct city name once
    #[arg(long, global = true)]
    dedupe: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make sure the cache artifact exists and print a summary
    Geocode,

    /// Show one page of the table, ten rows per page
    Page {
        /// 1-based page number; invalid input shows the first page
        #[arg(default_value = "1")]
        number: String,
    },

    /// Find cities containing the query, ignoring case
    Search { query: String },

    /// Top and bottom cities by average AQI
    Rank {
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=10))]
        n: u32,
    },

    /// City coordinates with the AQI of one month (1-12), or the yearly average
    Map {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), GeoCacheError> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    configure_polars_display();

    let cli = Cli::parse();
    let table = geocoded_table(&cli).await?;

    match cli.command {
        Commands::Geocode => {
            println!("{} rows in {}", table.height(), cli.cache.display());
        }
        Commands::Page { number } => {
            let page = table.page(&number, PAGE_SIZE);
            println!("Page {} of {}", page.number, page.total_pages);
            println!("{}", page.frame);
        }
        Commands::Search { query } => {
            let found = table.search_city(&query, DEFAULT_CITY_COLUMN)?;
            if found.height() == 0 {
                println!("No cities match '{}'", query);
            } else {
                println!("{}", found);
            }
        }
        Commands::Rank { n } => {
            let n = usize::try_from(n).unwrap_or(5);
            println!("{}", table.top_bottom(n, "avg", DEFAULT_CITY_COLUMN)?);
        }
        Commands::Map { month } => {
            let month = month.and_then(Month::from_number);
            println!("{}", table.map_points(month)?);
        }
    }

    Ok(())
}

async fn geocoded_table(cli: &Cli) -> Result<DataFrame, GeoCacheError> {
    let config = GeocodeConfig::builder()
        .endpoint(cli.endpoint.as_str())
        .user_agent(cli.user_agent.as_str())
        .min_interval(Duration::from_millis(cli.interval_ms))
        .concurrency(cli.concurrency)
        .dedupe_names(cli.dedupe)
        .build();
    let store = FileStore::new(&cli.cache)?;
    info!("Cache artifact: {}", store.describe());

    let cache = GeoCache::nominatim(Arc::new(store), config)?;
    let input = cli.input.clone();
    let table = cache
        .ensure_geocoded_with(|| async move { load_dataset(input).await })
        .await?;

    if let TableSource::Resolved(report) = &table.source {
        info!("Geocoded and cached: {}", report);
    }
    Ok(table.frame)
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
