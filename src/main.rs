use std::env;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use tracing::{info, span, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fleetopt::check;
use fleetopt::config;
use fleetopt::error::{Error, Result};
use fleetopt::io::output::{add_geometries, solution_to_json, Timings};
use fleetopt::io::{format_solution, load_problem};
use fleetopt::solution::Solution;
use fleetopt::solver::{self, SolveOptions};

#[derive(Parser)]
#[command(name = "fleetopt", version, about = "Vehicle routing problem solver")]
struct Cli {
    /// Input problem file; stdin when omitted.
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Output file; stdout when omitted.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Routing server base URL (also FLEETOPT_ROUTER_URL).
    #[arg(short = 'a', long)]
    router: Option<String>,

    /// Add route geometries to the output.
    #[arg(short = 'g', long)]
    geometry: bool,

    /// Check the given routes instead of solving.
    #[arg(short = 'c', long)]
    check: bool,

    /// Total solving time limit, in seconds.
    #[arg(short = 'l', long)]
    limit: Option<f64>,

    /// Number of worker threads.
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Exploration depth, 0 to 5.
    #[arg(short = 'x', long)]
    explore: Option<usize>,

    /// Number of multi-start searches.
    #[arg(short = 's', long)]
    searches: Option<usize>,

    /// Break the reported cost down by travel-time and distance shares.
    #[arg(short = 'm', long)]
    metric_costs: bool,

    /// Dump local-search improvements to a CSV file.
    #[arg(long)]
    search_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();

    dotenv().ok();

    let cli = Cli::parse();
    let output_path = cli.output.clone();

    match run(cli).await {
        Ok(()) => {}
        Err(e) => {
            let document = e.to_json().to_string();
            let write_failed = match &output_path {
                Some(path) => fs::write(path, &document).is_err(),
                None => {
                    println!("{document}");
                    false
                }
            };
            if write_failed {
                eprintln!("{document}");
            }
            eprintln!("{}", e.to_string().red());
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let data = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| Error::Input(format!("could not read {}: {e}", path.display())))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| Error::Input(format!("could not read stdin: {e}")))?;
            buffer
        }
    };

    let router_url = cli
        .router
        .clone()
        .or_else(|| env::var("FLEETOPT_ROUTER_URL").ok())
        .unwrap_or_else(|| config::DEFAULT_ROUTER_URL.to_string());

    let loading_start = Instant::now();
    let loaded = {
        let load_span = span!(Level::INFO, "loading");
        let _guard = load_span.enter();
        load_problem(&data, &router_url, cli.geometry, cli.check).await?
    };
    let loading_ms = loading_start.elapsed().as_millis() as u64;

    let mut timings = Timings {
        loading_ms,
        solving_ms: 0,
        routing_ms: 0,
    };

    let mut solution: Solution;
    let mut search_log = Vec::new();

    if cli.check {
        solution = check::check_routes(&loaded.input, timings);
        if cli.geometry {
            // Sparse-matrix geometries were gathered while loading.
            for route in &mut solution.routes {
                let geometry = loaded
                    .input
                    .vehicles
                    .iter()
                    .position(|v| v.id == route.vehicle)
                    .and_then(|v_rank| loaded.vehicles_geometry.get(v_rank))
                    .filter(|g| !g.is_empty());
                route.geometry = geometry.cloned();
            }
        }
    } else {
        let options = SolveOptions {
            nb_searches: cli.searches.unwrap_or(config::NB_SEARCHES).max(1),
            depth: cli.explore.unwrap_or(config::DEPTH).min(config::MAX_DEPTH),
            nb_threads: cli.threads.unwrap_or(config::NB_THREADS).max(1),
            timeout: cli
                .limit
                .filter(|seconds| *seconds > 0.0)
                .map(std::time::Duration::from_secs_f64),
        };

        let solving_start = Instant::now();
        let internal = solver::solve(&loaded.input, &options)?;
        timings.solving_ms = solving_start.elapsed().as_millis() as u64;
        search_log = internal.search_log;

        solution = format_solution(
            &loaded.input,
            &internal.routes,
            &internal.unassigned,
            timings,
        );
        solution.summary.computing_times.solving = timings.solving_ms;

        if cli.geometry {
            let routing_start = Instant::now();
            add_geometries(&mut solution, &loaded.input, &loaded.routers).await?;
            timings.routing_ms = routing_start.elapsed().as_millis() as u64;
            solution.summary.computing_times.routing = timings.routing_ms;
        }
    }

    if let Some(path) = &cli.search_log {
        write_search_log(path, &search_log)?;
    }

    let document = serde_json::to_string(&solution_to_json(&solution))
        .map_err(|e| Error::Internal(format!("serialisation failed: {e}")))?;
    match &cli.output {
        Some(path) => fs::write(path, document)
            .map_err(|e| Error::Internal(format!("could not write {}: {e}", path.display())))?,
        None => println!("{document}"),
    }

    print_summary(&solution, cli.metric_costs, &loaded.input);

    info!(
        loading_ms = timings.loading_ms,
        solving_ms = timings.solving_ms,
        routing_ms = timings.routing_ms,
        "done"
    );

    Ok(())
}

/// One-line coloured recap on stderr, green when everything is assigned and
/// clean, red when violations remain.
fn print_summary(solution: &Solution, metric_costs: bool, input: &fleetopt::models::Input) {
    let headline = format!(
        "cost {} over {} route(s), {} unassigned",
        solution.summary.cost, solution.summary.routes, solution.summary.unassigned
    );

    if !solution.summary.violations.is_empty() {
        let causes: Vec<&str> = solution.summary.violations.iter().map(|v| v.cause).collect();
        eprintln!("{} ({})", headline.red(), causes.join(", "));
    } else if solution.summary.unassigned > 0 {
        eprintln!("{}", headline.yellow());
    } else {
        eprintln!("{}", headline.green());
    }

    if metric_costs {
        // Cost split between travel time and distance, using the fleet's
        // schedule when it is metric-derived.
        let first = &input.vehicles[0];
        if first.cost_based_on_metrics() {
            let time_share = first
                .cost_wrapper
                .user_cost_from_user_metrics(solution.summary.duration, 0);
            let distance_share = solution
                .summary
                .distance
                .map(|d| first.cost_wrapper.user_cost_from_user_metrics(0, d))
                .unwrap_or(0);
            eprintln!(
                "  time-based cost: {time_share}, distance-based cost: {distance_share}"
            );
        }
    }
}

fn write_search_log(
    path: &PathBuf,
    entries: &[(usize, solver::local_search::SearchLogEntry)],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| Error::Internal(format!("could not open search log: {e}")))?;

    writer
        .write_record(["timestamp", "search", "iteration", "operator", "gain"])
        .map_err(|e| Error::Internal(format!("search log write failed: {e}")))?;

    let now = Utc::now().to_rfc3339();
    for (search, entry) in entries {
        writer
            .write_record([
                now.clone(),
                search.to_string(),
                entry.iteration.to_string(),
                entry.operator.to_string(),
                entry.gain_cost.to_string(),
            ])
            .map_err(|e| Error::Internal(format!("search log write failed: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| Error::Internal(format!("search log write failed: {e}")))?;
    Ok(())
}
