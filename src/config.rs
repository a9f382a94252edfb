//! Solver-wide defaults, overridable from the CLI.

/// Number of heuristic parameter sets tried by the multi-start phase.
pub const NB_SEARCHES: usize = 4;

/// Exploration depth: the ruin phase removes up to 2^depth jobs at once.
pub const DEPTH: usize = 4;

/// Upper bound for the exploration depth CLI flag.
pub const MAX_DEPTH: usize = 5;

/// Depth from which the TSP route-fix operator joins the catalogue.
pub const ROUTE_FIX_DEPTH: usize = 5;

/// Default thread count when the CLI does not pin one.
pub const NB_THREADS: usize = 4;

/// Base seed for the per-search RNGs; search rank is added on top so runs
/// stay reproducible at any thread count.
pub const SEED: u64 = 64;

/// Fallback routing server, overridable with FLEETOPT_ROUTER_URL or the -a
/// flag.
pub const DEFAULT_ROUTER_URL: &str = "http://0.0.0.0:5000";

/// Routing profile assumed when vehicles do not name one.
pub const DEFAULT_PROFILE: &str = "car";
