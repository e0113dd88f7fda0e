use rayon::ThreadPoolBuilder;
use std::sync::OnceLock;
use tracing::{info, warn};

static RAYON_INIT: OnceLock<()> = OnceLock::new();

pub fn init_cpu_parallelism() {
    RAYON_INIT.get_or_init(|| {
        let num_threads = num_cpus::get().max(1);
        match ThreadPoolBuilder::new().num_threads(num_threads).build_global() {
            Ok(_) => info!(
                "Initialized Rayon thread pool with {} threads (all logical CPU cores)",
                num_threads
            ),
            Err(e) => warn!(
                "Rayon thread pool already initialized or unavailable ({}). Using existing configuration.",
                e
            ),
        }
    });
}

/// The usual number of days the US stock exchanges trade in a year.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Number of random portfolios to simulate when --count is not given.
pub const DEFAULT_PORTFOLIO_COUNT: usize = 100_000;

/// Decimal places risk values (in percent) are rounded to when grouping
/// frontier candidates. Coarser rounding gives a smoother, sparser frontier;
/// finer rounding gives more points but a noisier curve.
pub const DEFAULT_RISK_BUCKET_DECIMALS: u32 = 2;

/// Relative margin past the riskiest sampled portfolio used to place the
/// right endpoint of the boundary segment on the risk axis.
pub const DEFAULT_BOUNDARY_MARGIN: f64 = 0.02;

/// Range of historical data to fetch (e.g., "1y", "2y", "5y").
pub const DEFAULT_DATA_RANGE: &str = "1y";

/// Default asset universe when --tickers is not given.
pub const DEFAULT_ASSETS: &[&str] = &["VWO", "VNQ", "VEA"];
