#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for area safety ratings.
//!
//! Every subcommand prints JSON to stdout. Runtime settings come from the
//! `CIVIC_SAFETY_*` environment variables; `--city` overrides the city.

use clap::{Args, Parser, Subcommand};
use civic_safety_analysis_models::{AreaQuery, DEFAULT_RADIUS_MILES};
use civic_safety_engine::city::supported_cities;
use civic_safety_engine::{CityProfile, EngineConfig, SafetyEngine};
use civic_safety_source::registry::feeds_for_city;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "civic_safety", about = "Area safety and quality-of-life ratings")]
struct Cli {
    /// City profile id (overrides `CIVIC_SAFETY_CITY`)
    #[arg(long, global = true)]
    city: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combined rating for an address, ZIP code, or area
    Rating(AreaArgs),
    /// Separate police-safety and neighborhood-quality ratings
    Separated(AreaArgs),
    /// Ratings for every area in the city
    Compare,
    /// Re-ingest the dataset for an area (or the whole city)
    Refresh {
        /// Area to refresh (e.g., "Brooklyn")
        #[arg(long)]
        area: Option<String>,
    },
    /// List supported cities and their feeds
    Cities,
}

#[derive(Args)]
struct AreaArgs {
    /// Five-digit ZIP code
    #[arg(long)]
    zip: Option<String>,
    /// Borough, district, or neighborhood name
    #[arg(long)]
    area: Option<String>,
    /// Street address; rated by radius when it can be geocoded
    #[arg(long)]
    address: Option<String>,
    /// Search radius around the address, in miles
    #[arg(long, default_value_t = DEFAULT_RADIUS_MILES)]
    radius: f64,
}

impl AreaArgs {
    fn into_query(self) -> AreaQuery {
        AreaQuery {
            zip_code: self.zip,
            area_name: self.area,
            address: self.address,
            radius_miles: self.radius,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CityInfo {
    id: String,
    name: String,
    feeds: Vec<String>,
    fallback_areas: Vec<String>,
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_engine(city: Option<&str>) -> Result<SafetyEngine, Box<dyn std::error::Error>> {
    let mut config = EngineConfig::from_env()?;
    if let Some(city) = city {
        config = config.with_city(city);
    }
    Ok(SafetyEngine::from_config(config)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let city = cli.city.as_deref();

    match cli.command {
        Commands::Rating(args) => {
            let engine = build_engine(city)?;
            print_json(&engine.get_rating(&args.into_query()).await)?;
        }
        Commands::Separated(args) => {
            let engine = build_engine(city)?;
            print_json(&engine.get_separated_rating(&args.into_query()).await)?;
        }
        Commands::Compare => {
            let engine = build_engine(city)?;
            print_json(&engine.compare_areas().await)?;
        }
        Commands::Refresh { area } => {
            let engine = build_engine(city)?;
            let refreshed = engine.refresh(area.as_deref()).await;
            print_json(&serde_json::json!({ "refreshed": refreshed }))?;
            if !refreshed {
                return Err("refresh failed: no feed could be read".into());
            }
        }
        Commands::Cities => {
            let mut cities = Vec::new();
            for id in supported_cities() {
                let profile = CityProfile::load(id)?;
                cities.push(CityInfo {
                    feeds: feeds_for_city(id).into_iter().map(|f| f.id).collect(),
                    fallback_areas: profile.fallback.areas.into_iter().map(|a| a.area).collect(),
                    id: profile.id,
                    name: profile.name,
                });
            }
            print_json(&cities)?;
        }
    }

    Ok(())
}
