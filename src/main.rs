//! # School Match Search Main Driver
//!
//! ## Purpose
//! Command line entry point for the school match search tool. Parses a free-text
//! query into a structured filter and, when a school dataset is supplied, runs
//! the deterministic filter engine over it and prints the ranked results.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment variables
//! - **Output**: Parsed filter JSON on stdout, optionally followed by the
//!   filtered and sorted school records
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Parse the query (remote collaborator first when configured, local otherwise)
//! 4. Optionally load records, normalize them, filter and sort
//! 5. Print structured JSON output

use clap::{Arg, Command};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use school_match_search::{
    Config, FallbackParser, FilterEngine, GeoContext, GeoPoint, MatchError, Result, SchoolRecord,
};
use school_match_search::record::{FilterResult, RawSchoolRecord};
use school_match_search::utils::Timer;
use school_match_search::SortOption;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("school-search")
        .version("1.0.0")
        .author("School Directory Team")
        .about("Query-to-filter parser and filter engine for the school directory match feature")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .value_name("TEXT")
                .help("Free-text search query (Russian, Kazakh place names, English)")
                .required(true),
        )
        .arg(
            Arg::new("schools")
                .short('s')
                .long("schools")
                .value_name("FILE")
                .help("JSON file with school records to filter"),
        )
        .arg(
            Arg::new("lat")
                .long("lat")
                .value_name("DEG")
                .help("User latitude for nearby filtering and distance sorting")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("lon")
                .long("lon")
                .value_name("DEG")
                .help("User longitude for nearby filtering and distance sorting")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("radius")
                .long("radius")
                .value_name("KM")
                .help("Nearby radius in kilometers (overrides configuration)")
                .value_parser(clap::value_parser!(f64)),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = Config::from_file(config_path)?;

    init_logging(&config)?;
    info!("Configuration loaded from: {}", config_path);

    let parser = FallbackParser::from_config(&config.parser)?;
    let query = matches.get_one::<String>("query").unwrap();
    let (mut filter, source) = parser.parse(query).await;

    info!(source = %source, "query parsed");
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "source": source,
            "filter": filter,
        }))?
    );

    let Some(schools_path) = matches.get_one::<String>("schools") else {
        return Ok(());
    };

    let user_location = match (
        matches.get_one::<f64>("lat").copied(),
        matches.get_one::<f64>("lon").copied(),
    ) {
        (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
        (None, None) => None,
        _ => {
            return Err(MatchError::GeolocationUnavailable {
                reason: "both --lat and --lon are required for a user location".to_string(),
            })
        }
    };
    if filter.use_nearby && user_location.is_none() {
        warn!("query asked for nearby schools but no user location is available, dropping the nearby constraint");
        filter.use_nearby = false;
    }

    let records = load_records(schools_path)?;
    info!(count = records.len(), "school records loaded");

    let geo = GeoContext {
        user_location,
        radius_km: matches
            .get_one::<f64>("radius")
            .copied()
            .unwrap_or(config.filter.default_radius_km),
    };
    let engine = FilterEngine::new(geo);
    let timer = Timer::new("search");
    let mut results = engine.apply(&records, &filter);
    results.truncate(config.filter.max_results);
    timer.stop();

    info!(matched = results.len(), "filtering complete");
    let result = FilterResult {
        sort: filter.sort_option.unwrap_or(SortOption::Relevance),
        records: results,
    };
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config
            .logging
            .level
            .parse()
            .map_err(|_| MatchError::Config {
                message: format!("Invalid log level: {}", config.logging.level),
            })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .json()
                    .with_filter(filter),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_filter(filter),
            )
            .init();
    }

    Ok(())
}

/// Load school records from a JSON file, resolving legacy field fallbacks.
fn load_records(path: &str) -> Result<Vec<SchoolRecord>> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<RawSchoolRecord> = serde_json::from_str(&raw)?;
    Ok(records.into_iter().map(SchoolRecord::from).collect())
}
