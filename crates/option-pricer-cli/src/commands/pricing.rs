use clap::Args;
use std::time::Instant;

use option_pricer_core::analysis::report::{self, PricingRequest};
use option_pricer_core::greeks::{numerical_greeks, GreeksEngine};
use option_pricer_core::models::binomial::{
    BinomialConfig, BinomialTreePricer, DEFAULT_BOUNDARY_POINTS, DEFAULT_STEP_SIZES,
};
use option_pricer_core::models::monte_carlo::{MonteCarloConfig, MonteCarloPricer, DEFAULT_SIMULATION_SIZES};
use option_pricer_core::models::black_scholes::BlackScholesPricer;
use option_pricer_core::models::OptionPricer;
use option_pricer_core::PricingParameters;

use super::{envelope, CmdResult, MarketArgs, ModelArg, ModelArgs};
use crate::input;

/// Arguments for pricing an option with any model
#[derive(Args)]
pub struct PriceArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Confidence level for the Monte Carlo interval
    #[arg(long, default_value = "0.95")]
    pub confidence_level: f64,

    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_price(args: PriceArgs) -> CmdResult {
    let request: PricingRequest = match input::load(args.input.as_deref())? {
        Some(request) => request,
        None => PricingRequest {
            params: args.market.to_params()?,
            model: args.model.model.into(),
            monte_carlo: Some(args.model.mc_config()),
            binomial: Some(args.model.tree_config()),
            confidence_level: args.confidence_level,
        },
    };
    let result = report::price_option(&request)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for Greeks
#[derive(Args)]
pub struct GreeksArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Bump-and-reprice with the chosen model instead of closed-form Black-Scholes
    #[arg(long)]
    pub numerical: bool,

    /// Path to JSON/YAML input file with the six pricing parameters
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_greeks(args: GreeksArgs) -> CmdResult {
    let start = Instant::now();
    let params = params_or_flags(args.input.as_deref(), &args.market)?;
    let (greeks, methodology) = if args.numerical {
        let pricer = args.model.pricer()?;
        let greeks = numerical_greeks(&*pricer, &params)?;
        (greeks, format!("Finite differences on {}", pricer.model_info().name))
    } else {
        (
            GreeksEngine.calculate_all_greeks(&params)?,
            "Black-Scholes analytic Greeks".to_string(),
        )
    };
    let assumptions = serde_json::json!({
        "theta": "per calendar day",
        "vega": "per 1 vol point",
        "rho": "per 1 rate point",
    });
    envelope(&methodology, &assumptions, Vec::new(), start, greeks)
}

/// Arguments for a Monte Carlo confidence interval
#[derive(Args)]
pub struct ConfidenceArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Number of simulated paths
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Time steps per path
    #[arg(long)]
    pub mc_steps: Option<u32>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disable antithetic variates
    #[arg(long)]
    pub no_antithetic: bool,

    /// Confidence level in (0, 1)
    #[arg(long, default_value = "0.95")]
    pub confidence_level: f64,

    /// Path to JSON/YAML input file with the six pricing parameters
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_confidence(args: ConfidenceArgs) -> CmdResult {
    let start = Instant::now();
    let params = params_or_flags(args.input.as_deref(), &args.market)?;
    let defaults = MonteCarloConfig::default();
    let config = MonteCarloConfig {
        num_simulations: args.simulations.unwrap_or(defaults.num_simulations),
        num_steps: args.mc_steps.unwrap_or(defaults.num_steps),
        seed: args.seed,
        antithetic: !args.no_antithetic,
    };
    let pricer = MonteCarloPricer::new(config)?;
    let result = pricer.price_with_confidence(&params, args.confidence_level)?;
    envelope(
        "Monte Carlo with 10-batch standard error",
        &config,
        Vec::new(),
        start,
        result,
    )
}

/// Arguments for convergence analysis
#[derive(Args)]
pub struct ConvergenceArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Simulation counts (monte-carlo) or step counts (binomial), comma separated
    #[arg(long, value_delimiter = ',')]
    pub sizes: Vec<u32>,

    /// Path to JSON/YAML input file with the six pricing parameters
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_convergence(args: ConvergenceArgs) -> CmdResult {
    let start = Instant::now();
    let params = params_or_flags(args.input.as_deref(), &args.market)?;
    let bs = BlackScholesPricer.price(&params)?;
    let assumptions = serde_json::json!({ "black_scholes_price": bs });

    match args.model.model {
        ModelArg::MonteCarlo => {
            let sizes = sizes_or(&args.sizes, &DEFAULT_SIMULATION_SIZES);
            let pricer = MonteCarloPricer::new(args.model.mc_config())?;
            let result = pricer.get_convergence_analysis(&params, &sizes)?;
            envelope("Monte Carlo convergence", &assumptions, Vec::new(), start, result)
        }
        ModelArg::Binomial => {
            let sizes = sizes_or(&args.sizes, &DEFAULT_STEP_SIZES);
            let pricer = BinomialTreePricer::new(args.model.tree_config())?;
            let result = pricer.get_convergence_analysis(&params, &sizes)?;
            envelope("Binomial tree convergence", &assumptions, Vec::new(), start, result)
        }
        ModelArg::BlackScholes => {
            Err("convergence analysis needs --model monte-carlo or --model binomial".into())
        }
    }
}

/// Arguments for dumping a binomial lattice
#[derive(Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Lattice steps (keep small for display)
    #[arg(long, default_value = "5")]
    pub steps: u32,

    /// Allow early exercise
    #[arg(long)]
    pub american: bool,

    /// Path to JSON/YAML input file with the six pricing parameters
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_tree(args: TreeArgs) -> CmdResult {
    let start = Instant::now();
    let params = params_or_flags(args.input.as_deref(), &args.market)?;
    let config = BinomialConfig {
        num_steps: args.steps,
        american: args.american,
    };
    let tree = BinomialTreePricer::new(config)?.calculate_tree(&params)?;
    envelope("CRR binomial lattice", &config, Vec::new(), start, tree)
}

/// Arguments for the American early-exercise boundary
#[derive(Args)]
pub struct BoundaryArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Lattice steps
    #[arg(long, default_value = "100")]
    pub steps: u32,

    /// Lowest spot to scan (defaults to half the strike)
    #[arg(long)]
    pub min_spot: Option<f64>,

    /// Highest spot to scan (defaults to 1.5x the strike)
    #[arg(long)]
    pub max_spot: Option<f64>,

    /// Number of spots in the scan
    #[arg(long, default_value_t = DEFAULT_BOUNDARY_POINTS)]
    pub points: usize,

    /// Path to JSON/YAML input file with the six pricing parameters
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_boundary(args: BoundaryArgs) -> CmdResult {
    let start = Instant::now();
    let params = params_or_flags(args.input.as_deref(), &args.market)?;
    let config = BinomialConfig {
        num_steps: args.steps,
        american: true,
    };
    let range = (
        args.min_spot.unwrap_or(0.5 * params.strike),
        args.max_spot.unwrap_or(1.5 * params.strike),
    );
    let boundary = BinomialTreePricer::new(config)?
        .get_early_exercise_boundary(&params, range, args.points)?
        .ok_or("early exercise boundary is only defined for American trees")?;
    let warnings = vec![
        "Boundary follows the lattice centre line and is indicative only".to_string(),
    ];
    envelope("CRR binomial early-exercise scan", &config, warnings, start, boundary)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn params_or_flags(
    path: Option<&str>,
    market: &MarketArgs,
) -> Result<PricingParameters, Box<dyn std::error::Error>> {
    match input::load::<PricingParameters>(path)? {
        Some(params) => Ok(params),
        None => market.to_params(),
    }
}

fn sizes_or(given: &[u32], defaults: &[u32]) -> Vec<u32> {
    if given.is_empty() {
        defaults.to_vec()
    } else {
        given.to_vec()
    }
}
