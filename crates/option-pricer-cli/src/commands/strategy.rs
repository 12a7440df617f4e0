use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Instant;

use option_pricer_core::strategies::{
    OptionLeg, StrategyFactory, StrategyInfo, StrategyKind, StrategyRequest,
};
use option_pricer_core::Money;

use super::{envelope, CmdResult};
use crate::input;

/// Arguments for building and analysing a named strategy
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct StrategyArgs {
    /// Strategy name, e.g. bull_call_spread, long-straddle, iron condor
    #[arg(long)]
    pub kind: Option<StrategyKind>,

    /// Strikes in the order the strategy names them, comma separated
    #[arg(long, value_delimiter = ',')]
    pub strikes: Vec<Decimal>,

    /// Current price of the underlying
    #[arg(long)]
    pub spot: Option<f64>,

    /// Time to maturity in years
    #[arg(long, alias = "time-to-maturity")]
    pub time: Option<f64>,

    /// Continuously compounded risk-free rate
    #[arg(long, alias = "risk-free-rate", default_value = "0.05")]
    pub rate: f64,

    /// Annualised volatility
    #[arg(long, alias = "volatility")]
    pub vol: Option<f64>,

    /// Spot prices at which to report the expiry payoff, comma separated
    #[arg(long, value_delimiter = ',')]
    pub payoff_at: Vec<Decimal>,

    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Serialize)]
struct PayoffPoint {
    spot: Money,
    payoff: Money,
}

#[derive(Serialize)]
struct StrategyOutput {
    #[serde(flatten)]
    info: StrategyInfo,
    kind: StrategyKind,
    strikes: Vec<Money>,
    leg_detail: Vec<OptionLeg>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    payoff: Vec<PayoffPoint>,
}

pub fn run_strategy(args: StrategyArgs) -> CmdResult {
    let start = Instant::now();
    let request: StrategyRequest = match input::load(args.input.as_deref())? {
        Some(request) => request,
        None => StrategyRequest {
            spot: args.spot.ok_or("--spot is required (or provide --input)")?,
            time_to_maturity: args.time.ok_or("--time is required (or provide --input)")?,
            risk_free_rate: args.rate,
            volatility: args.vol.ok_or("--vol is required (or provide --input)")?,
            kind: args.kind.ok_or("--kind is required (or provide --input)")?,
            strikes: args.strikes.clone(),
        },
    };

    let strategy = StrategyFactory::build_request(&request)?;
    let payoff = strategy
        .calculate_payoff(&args.payoff_at)
        .into_iter()
        .zip(args.payoff_at.iter())
        .map(|(payoff, &spot)| PayoffPoint { spot, payoff })
        .collect();

    let mut warnings = Vec::new();
    let info = strategy.get_strategy_info();
    if info.break_even_points.is_empty() {
        warnings.push("No break-even inside the analysis range".to_string());
    }

    let output = StrategyOutput {
        info,
        kind: request.kind,
        strikes: request.strikes.clone(),
        leg_detail: strategy.legs().to_vec(),
        payoff,
    };
    let assumptions = serde_json::json!({
        "spot": request.spot,
        "time_to_maturity": request.time_to_maturity,
        "risk_free_rate": request.risk_free_rate,
        "volatility": request.volatility,
        "premiums": "Black-Scholes, European exercise",
        "payoff": "at expiry, net of premiums",
    });
    envelope(
        "Leg-wise expiry payoff over a 1000-point spot grid",
        &assumptions,
        warnings,
        start,
        output,
    )
}
