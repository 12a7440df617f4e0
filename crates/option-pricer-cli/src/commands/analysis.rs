use clap::{Args, ValueEnum};
use std::time::Instant;

use option_pricer_core::analysis::scenario::{run_scenario, ScenarioShock};
use option_pricer_core::analysis::sensitivity::{self, linspace};
use option_pricer_core::greeks::Greek;
use option_pricer_core::models::OptionPricer;
use option_pricer_core::DAYS_PER_YEAR;

use super::pricing::params_or_flags;
use super::{envelope, CmdResult, MarketArgs, ModelArgs};

/// Arguments for a what-if scenario
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ScenarioArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Spot move in percent (e.g. -10 for a 10% fall)
    #[arg(long, default_value = "0")]
    pub spot_change: f64,

    /// Volatility move in percent of current volatility
    #[arg(long, default_value = "0")]
    pub vol_change: f64,

    /// Calendar days elapsed
    #[arg(long, default_value = "0")]
    pub days: f64,

    /// Path to JSON/YAML input file with the six pricing parameters
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_scenario_cmd(args: ScenarioArgs) -> CmdResult {
    let start = Instant::now();
    let params = params_or_flags(args.input.as_deref(), &args.market)?;
    let pricer = args.model.pricer()?;
    let shock = ScenarioShock {
        spot_change_pct: args.spot_change,
        vol_change_pct: args.vol_change,
        days_passed: args.days,
    };
    let result = run_scenario(&*pricer, &params, &shock)?;
    envelope(
        &format!("Full revaluation with {}", pricer.model_info().name),
        &shock,
        Vec::new(),
        start,
        result,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HeatmapMetric {
    /// Price over spot x volatility
    Price,
    /// P&L against today's premium over spot x days to expiry
    Pnl,
    /// One Greek over spot x days to expiry
    Greek,
}

/// Arguments for a two-way sensitivity grid
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct HeatmapArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// What to put in the cells
    #[arg(long, value_enum, default_value = "price")]
    pub metric: HeatmapMetric,

    /// Greek for --metric greek (delta, gamma, theta, vega, rho)
    #[arg(long, default_value = "delta")]
    pub greek: Greek,

    /// Spot range as a fraction of current spot: low
    #[arg(long, default_value = "0.8")]
    pub spot_low: f64,

    /// Spot range as a fraction of current spot: high
    #[arg(long, default_value = "1.2")]
    pub spot_high: f64,

    /// Volatility range for --metric price: low
    #[arg(long, default_value = "0.1")]
    pub vol_low: f64,

    /// Volatility range for --metric price: high
    #[arg(long, default_value = "0.5")]
    pub vol_high: f64,

    /// Grid points per axis
    #[arg(long, default_value = "9")]
    pub points: usize,

    /// Path to JSON/YAML input file with the six pricing parameters
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_heatmap(args: HeatmapArgs) -> CmdResult {
    let start = Instant::now();
    let params = params_or_flags(args.input.as_deref(), &args.market)?;
    let spots = linspace(
        params.spot * args.spot_low,
        params.spot * args.spot_high,
        args.points,
    );
    // Remaining time from today's expiry down to one day.
    let times = linspace(
        params.time_to_maturity,
        (1.0 / DAYS_PER_YEAR).min(params.time_to_maturity),
        args.points,
    );
    let assumptions = serde_json::json!({
        "base": params,
        "metric": format!("{:?}", args.metric).to_lowercase(),
        "points": args.points,
    });

    let (grid, methodology) = match args.metric {
        HeatmapMetric::Price => {
            let pricer = args.model.pricer()?;
            let vols = linspace(args.vol_low, args.vol_high, args.points);
            (
                sensitivity::price_grid(&*pricer, &params, &spots, &vols)?,
                format!("{} price, spot x volatility", pricer.model_info().name),
            )
        }
        HeatmapMetric::Pnl => {
            let pricer = args.model.pricer()?;
            let entry = pricer.price(&params)?;
            (
                sensitivity::pnl_grid(&*pricer, &params, entry, &spots, &times)?,
                format!("{} P&L, spot x time to expiry", pricer.model_info().name),
            )
        }
        HeatmapMetric::Greek => (
            sensitivity::greek_grid(&params, args.greek, &spots, &times)?,
            format!("Black-Scholes {}, spot x time to expiry", args.greek.name()),
        ),
    };
    envelope(&methodology, &assumptions, Vec::new(), start, grid)
}
