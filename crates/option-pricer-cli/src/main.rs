mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analysis::{HeatmapArgs, ScenarioArgs};
use commands::pricing::{
    BoundaryArgs, ConfidenceArgs, ConvergenceArgs, GreeksArgs, PriceArgs, TreeArgs,
};
use commands::strategy::StrategyArgs;

/// European and American option pricing
#[derive(Parser)]
#[command(
    name = "opx",
    version,
    about = "European and American option pricing",
    long_about = "A CLI for pricing options with Black-Scholes, Monte Carlo and \
                  CRR binomial models. Computes Greeks, confidence intervals, \
                  convergence, early-exercise boundaries, multi-leg strategy \
                  payoffs, scenarios and sensitivity grids."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Price an option and report moneyness, Greeks and model comparison
    Price(PriceArgs),
    /// Delta, Gamma, Theta, Vega and Rho
    Greeks(GreeksArgs),
    /// Monte Carlo price with a confidence interval
    Confidence(ConfidenceArgs),
    /// Price convergence as simulations or tree steps grow
    Convergence(ConvergenceArgs),
    /// Dump a small binomial lattice
    Tree(TreeArgs),
    /// Early-exercise boundary of an American option
    Boundary(BoundaryArgs),
    /// Build and analyse a multi-leg option strategy
    Strategy(StrategyArgs),
    /// Reprice after a spot, volatility and time shock
    Scenario(ScenarioArgs),
    /// Two-way sensitivity grid of price, P&L or a Greek
    Heatmap(HeatmapArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Price(args) => commands::pricing::run_price(args),
        Commands::Greeks(args) => commands::pricing::run_greeks(args),
        Commands::Confidence(args) => commands::pricing::run_confidence(args),
        Commands::Convergence(args) => commands::pricing::run_convergence(args),
        Commands::Tree(args) => commands::pricing::run_tree(args),
        Commands::Boundary(args) => commands::pricing::run_boundary(args),
        Commands::Strategy(args) => commands::strategy::run_strategy(args),
        Commands::Scenario(args) => commands::analysis::run_scenario_cmd(args),
        Commands::Heatmap(args) => commands::analysis::run_heatmap(args),
        Commands::Version => {
            println!("opx {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
