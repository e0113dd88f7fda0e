mod app;
mod config;
mod data;
mod frontier;
mod portfolio;
mod tui;
mod ui;

use app::{App, SimulationParams};
use clap::Parser;
use frontier::{FrontierAnalysis, FrontierConfig};
use portfolio::RiskReturnPoint;
use std::io;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Frontier-TUI: efficient-frontier exploration over randomly sampled portfolios",
    after_help = "EXAMPLES:
    # Interactive dashboard over the default ETF universe
    cargo run --release

    # 250k portfolios over a custom universe, reproducible seed
    cargo run --release -- --tickers VTI,BND,GLD --count 250000 --seed 7

    # Console summary plus JSON export, no TUI
    cargo run --release -- --headless --export frontier.json"
)]
struct Args {
    /// Comma-separated tickers forming the asset universe
    #[arg(long)]
    tickers: Option<String>,

    /// Number of random portfolios to simulate
    #[arg(long, default_value_t = config::DEFAULT_PORTFOLIO_COUNT)]
    count: usize,

    /// Historical range to fetch (e.g., 1y, 2y, 5y)
    #[arg(long, default_value_t = config::DEFAULT_DATA_RANGE.to_string())]
    range: String,

    /// Decimal places risk is rounded to when bucketing frontier candidates
    #[arg(long, default_value_t = config::DEFAULT_RISK_BUCKET_DECIMALS)]
    bucket_decimals: u32,

    /// Relative margin past the riskiest portfolio for the boundary segment
    #[arg(long, default_value_t = config::DEFAULT_BOUNDARY_MARGIN)]
    boundary_margin: f64,

    /// Seed for reproducible weight sampling (drawn from entropy when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Print a console summary instead of launching the TUI
    #[arg(long)]
    headless: bool,

    /// Write the simulated dataset and frontier analysis to a JSON file
    /// (implies --headless)
    #[arg(long)]
    export: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    config::init_cpu_parallelism();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("frontier_tui=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();

    let tickers: Vec<String> = match args.tickers.as_deref() {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        None => config::DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
    };

    if tickers.is_empty() {
        error!("--tickers produced an empty universe. Example: --tickers VWO,VNQ,VEA");
        return Ok(());
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let frontier_config = FrontierConfig {
        bucket_decimals: args.bucket_decimals,
        boundary_margin: args.boundary_margin,
    };

    if args.headless || args.export.is_some() {
        match run_headless(&tickers, &args, seed, frontier_config).await {
            Ok(_) => info!("Simulation completed."),
            Err(e) => error!("Simulation failed: {}", e),
        }
        return Ok(());
    }

    let params = SimulationParams {
        count: args.count,
        range: args.range.clone(),
        seed,
        frontier: frontier_config,
    };

    let mut terminal = tui::init()?;
    let mut app = App::new(&tickers, params);
    let res = app.run(&mut terminal).await;

    tui::restore()?;

    if let Err(e) = res {
        error!("Error: {:?}", e);
    }

    Ok(())
}

async fn run_headless(
    tickers: &[String],
    args: &Args,
    seed: u64,
    frontier_config: FrontierConfig,
) -> anyhow::Result<()> {
    let returns = data::AssetReturns::load(tickers, &args.range).await?;
    let dataset = portfolio::simulate_portfolios(
        args.count,
        returns.tickers(),
        returns.covariance(),
        returns.cumulative_returns(),
        seed,
    )?;
    let analysis = frontier::extract(&dataset, &frontier_config);

    print_summary(&dataset, &analysis, tickers, seed);

    if let Some(path) = &args.export {
        let report = serde_json::json!({
            "tickers": tickers,
            "range": args.range,
            "seed": seed,
            "portfolios": dataset,
            "frontier": analysis,
        });
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &report)?;
        info!(
            "Wrote {} portfolios and {} frontier points to {}",
            dataset.len(),
            analysis.curve.len(),
            path.display()
        );
    }

    Ok(())
}

/// Pretty-prints the frontier analysis to stdout.
fn print_summary(
    dataset: &[RiskReturnPoint],
    analysis: &FrontierAnalysis,
    tickers: &[String],
    seed: u64,
) {
    let upper_half = dataset
        .iter()
        .filter(|p| p.ret >= analysis.most_efficient.ret)
        .count();

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║              Efficient Frontier Summary                    ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Universe               : {:<32} ║", tickers.join(", "));
    println!("║  Portfolios Sampled     : {:<32} ║", dataset.len());
    println!("║  Seed                   : {:<32} ║", seed);
    println!("║  Upper-Half Portfolios  : {:<32} ║", upper_half);
    println!("║  Frontier Points        : {:<32} ║", analysis.curve.len());
    println!("╠════════════════════════════════════════════════════════════╣");
    println!(
        "║  Most Efficient         : #{:<7} Risk {:>6.2}%  Ret {:>6.2}% ║",
        analysis.most_efficient.index, analysis.most_efficient.risk, analysis.most_efficient.ret
    );
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Frontier (Risk %  ->  Max Return %)                       ║");

    let shown = analysis.curve.len().min(20);
    for point in &analysis.curve[..shown] {
        println!("║    {:>8.2}  ->  {:>8.2}                                  ║", point.risk, point.ret);
    }
    if analysis.curve.len() > shown {
        println!("║    ... {} more                                            ║", analysis.curve.len() - shown);
    }

    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("⚠  Educational use only. Not financial advice.");
}
