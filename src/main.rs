//! # Ridership-map CLI
//!
//! Command-line interface for the ridership-map library.
//! Filters a ridership table, joins it with station locations and writes the
//! dashboard data (charts, markers, routed path) as JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use log::error;
use ridership_map::{
    parse_date, Columns, Dashboard, Dataset, NoticeLevel, RidershipFilter, RoutingConfig,
};

mod cli;

/// Command-line interface for ridership-map
#[derive(Parser)]
#[command(name = "ridership-map")]
#[command(about = "Bus ridership dashboard data with station map and routed path overlay")]
#[command(long_about = "Filters a per-stop ridership table and joins it with station locations:
  ridership-map ridership.csv stations.geojson                  # First route in the file
  ridership-map ridership.csv stations.geojson --route 1001     # Pick a route
  ridership-map ridership.csv --list-routes                     # Show route ids
  ridership-map ridership.csv stations.geojson -o out.json --map-geojson map.geojson

Routing:
  The road-following overlay is requested from openrouteservice using the API
  key in ORS_API_KEY (a .env file is honored). Without a key the markers are
  still produced and an error notice is included in the output.")]
#[command(version = env!("RIDERSHIP_MAP_VERSION"))]
struct Cli {
    /// Ridership CSV (UTF-8)
    ridership: PathBuf,

    /// Station locations as a GeoJSON FeatureCollection (not needed for
    /// --list-routes and --dry-run)
    stations: Option<PathBuf>,

    /// Route id to show; defaults to the first route in the file
    #[arg(short, long)]
    route: Option<String>,

    /// Keep only stops whose name contains this text
    #[arg(short, long, default_value = "")]
    stop_search: String,

    /// Lowest stop order to keep
    #[arg(long)]
    order_min: Option<i64>,

    /// Highest stop order to keep
    #[arg(long)]
    order_max: Option<i64>,

    /// Keep only rows of this service date (YYYY-MM-DD), requires --date-column
    #[arg(long)]
    date: Option<String>,

    /// Name of the service date column
    #[arg(long)]
    date_column: Option<String>,

    /// openrouteservice travel profile
    #[arg(long, default_value = "driving-car")]
    profile: String,

    /// openrouteservice base URL (overrides ORS_BASE_URL)
    #[arg(long)]
    ors_url: Option<String>,

    /// Dashboard JSON output file, or "-" for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Also write the map layer as GeoJSON
    #[arg(long)]
    map_geojson: Option<PathBuf>,

    /// Print the available route ids and exit
    #[arg(long)]
    list_routes: bool,

    /// Show the resolved selection without calling the directions service
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    // Initialize logging to stderr
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("🚌 Ridership-map v{} starting...", env!("RIDERSHIP_MAP_VERSION"));
    }

    if cli.date.is_some() && cli.date_column.is_none() {
        bail!("--date requires --date-column");
    }

    let columns = Columns {
        date: cli.date_column.clone(),
        ..Default::default()
    };
    let dataset = ridership_map::open_ridership(&cli.ridership, &columns)
        .with_context(|| format!("loading ridership from {}", cli.ridership.display()))?;

    if cli.list_routes {
        for route in dataset.route_ids() {
            println!("{route}");
        }
        return Ok(());
    }

    let filter = resolve_filter(&cli, &dataset)?;

    if cli.dry_run {
        let rows = dataset.filter(&filter)?.len();
        let route = filter.route.as_deref().unwrap_or("(all)");
        eprintln!(
            "🔍 [DRY RUN] Route {route}, stop search '{}', order range {:?}: {rows} rows",
            filter.stop_search, filter.order_range
        );
        return Ok(());
    }

    let Some(stations_path) = &cli.stations else {
        bail!("a station GeoJSON file is required to build the dashboard");
    };
    let stations = ridership_map::open_stations(stations_path)
        .with_context(|| format!("loading stations from {}", stations_path.display()))?;

    let mut config = RoutingConfig::from_env();
    config.profile = cli.profile.clone();
    if let Some(url) = &cli.ors_url {
        config.base_url = url.clone();
    }

    let progress = cli::ProgressManager::new();
    let mut pipeline = ridership_map::pipeline(config)?.with_progress(progress.routing_callback());
    let dashboard = pipeline.run(&dataset, &stations, &filter).await?;

    report_notices(&dashboard);
    write_dashboard(&dashboard, &cli.output)?;

    if let Some(path) = &cli.map_geojson {
        write_map(&dashboard, path)?;
    }

    Ok(())
}

/// Build the filter from CLI flags, defaulting route and order range
fn resolve_filter(cli: &Cli, dataset: &Dataset) -> anyhow::Result<RidershipFilter> {
    let route = match &cli.route {
        Some(route) => route.clone(),
        None => match dataset.route_ids().into_iter().next() {
            Some(route) => route,
            None => bail!("ridership file contains no rows"),
        },
    };

    let order_range = resolve_order_range(dataset.order_bounds(&route), cli.order_min, cli.order_max)?;

    let date = match &cli.date {
        Some(text) => match parse_date(text) {
            Some(date) => Some(date),
            None => bail!("invalid --date '{text}', expected YYYY-MM-DD"),
        },
        None => None,
    };

    Ok(RidershipFilter {
        route: Some(route),
        stop_search: cli.stop_search.clone(),
        order_range,
        date,
    })
}

/// Fill missing slider ends from the route's bounds
fn resolve_order_range(
    bounds: Option<(i64, i64)>,
    min: Option<i64>,
    max: Option<i64>,
) -> anyhow::Result<Option<(i64, i64)>> {
    let range = match (bounds, min, max) {
        (_, Some(min), Some(max)) => Some((min, max)),
        (Some((low, high)), min, max) => Some((min.unwrap_or(low), max.unwrap_or(high))),
        (None, _, _) => None,
    };
    if let Some((min, max)) = range {
        if min > max {
            bail!("--order-min ({min}) is greater than --order-max ({max})");
        }
    }
    Ok(range)
}

fn report_notices(dashboard: &Dashboard) {
    for notice in &dashboard.notices {
        let icon = match notice.level {
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Warning => "⚠️ ",
            NoticeLevel::Error => "❌",
        };
        eprintln!("{icon} {}", notice.message);
    }
}

fn write_dashboard(dashboard: &Dashboard, output: &str) -> anyhow::Result<()> {
    if output == "-" {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, dashboard)?;
        writeln!(handle)?;
    } else {
        let file = File::create(output).with_context(|| format!("creating {output}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, dashboard)?;
        writer.flush()?;
        eprintln!("📁 Saved dashboard to: {output}");
    }
    Ok(())
}

fn write_map(dashboard: &Dashboard, path: &Path) -> anyhow::Result<()> {
    let Some(map) = &dashboard.map else {
        eprintln!("ℹ️  No map layer to write");
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &map.to_geojson())?;
    writer.flush()?;
    eprintln!("📁 Saved map layer to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_stations_optional() {
        let cli = Cli::try_parse_from(["ridership-map", "ridership.csv", "--list-routes"]).unwrap();
        assert!(cli.stations.is_none());
        assert!(cli.list_routes);

        let cli = Cli::try_parse_from(["ridership-map", "r.csv", "s.geojson"]).unwrap();
        assert_eq!(cli.stations, Some(PathBuf::from("s.geojson")));
    }

    #[test]
    fn test_resolve_order_range_defaults_to_bounds() {
        let range = resolve_order_range(Some((1, 40)), None, None).unwrap();
        assert_eq!(range, Some((1, 40)));
    }

    #[test]
    fn test_resolve_order_range_partial() {
        let range = resolve_order_range(Some((1, 40)), Some(5), None).unwrap();
        assert_eq!(range, Some((5, 40)));
    }

    #[test]
    fn test_resolve_order_range_inverted() {
        assert!(resolve_order_range(Some((1, 40)), Some(10), Some(3)).is_err());
    }

    #[test]
    fn test_resolve_order_range_unknown_route() {
        assert_eq!(resolve_order_range(None, None, Some(3)).unwrap(), None);
    }
}
