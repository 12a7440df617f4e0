use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use option_pricer_core::analysis::report::PricingRequest;
use option_pricer_core::analysis::scenario::ScenarioShock;
use option_pricer_core::greeks::{numerical_greeks, GreeksEngine};
use option_pricer_core::models::binomial::{BinomialConfig, BinomialTreePricer};
use option_pricer_core::models::black_scholes::BlackScholesPricer;
use option_pricer_core::models::monte_carlo::{MonteCarloConfig, MonteCarloPricer};
use option_pricer_core::strategies::{StrategyFactory, StrategyRequest};
use option_pricer_core::PricingParameters;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: for<'de> Deserialize<'de>>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[napi]
pub fn price_option(input_json: String) -> NapiResult<String> {
    let request: PricingRequest = parse(&input_json)?;
    let output =
        option_pricer_core::analysis::report::price_option(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct GreeksInput {
    #[serde(flatten)]
    params: PricingParameters,
    /// Finite differences on a Monte Carlo or binomial pricer instead of
    /// closed-form Black-Scholes.
    #[serde(default)]
    monte_carlo: Option<MonteCarloConfig>,
    #[serde(default)]
    binomial: Option<BinomialConfig>,
}

#[napi]
pub fn calculate_greeks(input_json: String) -> NapiResult<String> {
    let input: GreeksInput = parse(&input_json)?;
    let greeks = match (input.monte_carlo, input.binomial) {
        (Some(config), _) => {
            let pricer = MonteCarloPricer::new(config).map_err(to_napi_error)?;
            numerical_greeks(&pricer, &input.params)
        }
        (None, Some(config)) => {
            let pricer = BinomialTreePricer::new(config).map_err(to_napi_error)?;
            numerical_greeks(&pricer, &input.params)
        }
        (None, None) => GreeksEngine.calculate_all_greeks(&input.params),
    }
    .map_err(to_napi_error)?;
    serde_json::to_string(&greeks).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ConfidenceInput {
    #[serde(flatten)]
    params: PricingParameters,
    #[serde(default)]
    config: MonteCarloConfig,
    #[serde(default = "default_confidence_level")]
    confidence_level: f64,
}

fn default_confidence_level() -> f64 {
    0.95
}

#[napi]
pub fn price_with_confidence(input_json: String) -> NapiResult<String> {
    let input: ConfidenceInput = parse(&input_json)?;
    let pricer = MonteCarloPricer::new(input.config).map_err(to_napi_error)?;
    let output = pricer
        .price_with_confidence(&input.params, input.confidence_level)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Lattice
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TreeInput {
    #[serde(flatten)]
    params: PricingParameters,
    #[serde(default)]
    config: BinomialConfig,
}

#[napi]
pub fn binomial_tree(input_json: String) -> NapiResult<String> {
    let input: TreeInput = parse(&input_json)?;
    let pricer = BinomialTreePricer::new(input.config).map_err(to_napi_error)?;
    let output = pricer.calculate_tree(&input.params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Strategies and analysis
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_strategy(input_json: String) -> NapiResult<String> {
    let request: StrategyRequest = parse(&input_json)?;
    let strategy = StrategyFactory::build_request(&request).map_err(to_napi_error)?;
    let output = serde_json::json!({
        "info": strategy.get_strategy_info(),
        "legs": strategy.legs(),
    });
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ScenarioInput {
    #[serde(flatten)]
    params: PricingParameters,
    shock: ScenarioShock,
}

#[napi]
pub fn run_scenario(input_json: String) -> NapiResult<String> {
    let input: ScenarioInput = parse(&input_json)?;
    let output = option_pricer_core::analysis::scenario::run_scenario(
        &BlackScholesPricer,
        &input.params,
        &input.shock,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct GridInput {
    #[serde(flatten)]
    params: PricingParameters,
    spots: Vec<f64>,
    volatilities: Vec<f64>,
}

#[napi]
pub fn price_grid(input_json: String) -> NapiResult<String> {
    let input: GridInput = parse(&input_json)?;
    let output = option_pricer_core::analysis::sensitivity::price_grid(
        &BlackScholesPricer,
        &input.params,
        &input.spots,
        &input.volatilities,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
