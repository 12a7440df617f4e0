use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::PricingError;
use crate::greeks::{GreeksBundle, GreeksEngine};
use crate::models::binomial::{BinomialConfig, BinomialTreePricer};
use crate::models::black_scholes::BlackScholesPricer;
use crate::models::monte_carlo::{ConfidenceResult, MonteCarloConfig, MonteCarloPricer};
use crate::models::{ModelInfo, OptionPricer};
use crate::types::{with_metadata, ComputationOutput, OptionType, PricingParameters};
use crate::validation::validate;
use crate::PricingResult;

/// Relative deviation from Black-Scholes at which a warning is attached.
pub const DEVIATION_WARNING_PCT: f64 = 2.0;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    #[default]
    BlackScholes,
    MonteCarlo,
    Binomial,
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelChoice::BlackScholes => "black_scholes",
            ModelChoice::MonteCarlo => "monte_carlo",
            ModelChoice::Binomial => "binomial",
        })
    }
}

fn default_confidence_level() -> f64 {
    0.95
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRequest {
    #[serde(flatten)]
    pub params: PricingParameters,
    #[serde(default)]
    pub model: ModelChoice,
    #[serde(default)]
    pub monte_carlo: Option<MonteCarloConfig>,
    #[serde(default)]
    pub binomial: Option<BinomialConfig>,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

impl PricingRequest {
    pub fn new(params: PricingParameters, model: ModelChoice) -> Self {
        Self {
            params,
            model,
            monte_carlo: None,
            binomial: None,
            confidence_level: default_confidence_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Moneyness {
    #[serde(rename = "ITM")]
    InTheMoney,
    #[serde(rename = "ATM")]
    AtTheMoney,
    #[serde(rename = "OTM")]
    OutOfTheMoney,
}

impl Moneyness {
    /// ATM when spot is within 1% of strike.
    pub fn classify(spot: f64, strike: f64, option_type: OptionType) -> Self {
        let ratio = spot / strike;
        if (0.99..=1.01).contains(&ratio) {
            return Moneyness::AtTheMoney;
        }
        let call_itm = ratio > 1.01;
        match (option_type, call_itm) {
            (OptionType::Call, true) | (OptionType::Put, false) => Moneyness::InTheMoney,
            _ => Moneyness::OutOfTheMoney,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingReport {
    pub model: ModelChoice,
    pub price: f64,
    pub intrinsic_value: f64,
    pub time_value: f64,
    pub moneyness: Moneyness,
    /// Spot at expiry where the holder breaks even.
    pub breakeven: f64,
    pub greeks: GreeksBundle,
    pub black_scholes_price: f64,
    pub difference: f64,
    pub difference_pct: f64,
    /// Opposite option implied by put-call parity (European models only).
    pub put_call_parity_price: Option<f64>,
    pub confidence: Option<ConfidenceResult>,
    /// American minus European price on the same lattice.
    pub early_exercise_premium: Option<f64>,
    pub model_info: ModelInfo,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price one option with the requested model and gather the figures a
/// results view shows alongside it.
pub fn price_option(request: &PricingRequest) -> PricingResult<ComputationOutput<PricingReport>> {
    let start = Instant::now();
    let params = &request.params;
    validate(params)?;

    let bs_price = BlackScholesPricer.price(params)?;
    let greeks = GreeksEngine.calculate_all_greeks(params)?;

    let mut confidence = None;
    let mut early_exercise_premium = None;
    let mut european = true;

    let (price, model_info, methodology) = match request.model {
        ModelChoice::BlackScholes => (
            bs_price,
            BlackScholesPricer.model_info(),
            "Black-Scholes (closed-form)",
        ),
        ModelChoice::MonteCarlo => {
            let pricer = MonteCarloPricer::new(request.monte_carlo.unwrap_or_default())?;
            let ci = pricer.price_with_confidence(params, request.confidence_level)?;
            let price = pricer.price(params)?;
            confidence = Some(ci);
            (
                price,
                pricer.model_info(),
                "Monte Carlo simulation (GBM, batched confidence interval)",
            )
        }
        ModelChoice::Binomial => {
            let config = request.binomial.unwrap_or_default();
            let pricer = BinomialTreePricer::new(config)?;
            let price = pricer.price(params)?;
            if config.american {
                european = false;
                let eu = BinomialTreePricer::new(BinomialConfig {
                    american: false,
                    ..config
                })?
                .price(params)?;
                early_exercise_premium = Some(price - eu);
            }
            (price, pricer.model_info(), "CRR binomial tree")
        }
    };

    if !price.is_finite() {
        return Err(PricingError::NumericalDegenerate {
            context: format!("{} produced a non-finite price", request.model),
        });
    }

    let intrinsic_value = params.intrinsic_value();
    let difference = price - bs_price;
    let difference_pct = if bs_price.abs() > f64::EPSILON {
        difference / bs_price * 100.0
    } else {
        0.0
    };

    let mut warnings = Vec::new();
    if request.model != ModelChoice::BlackScholes && difference_pct.abs() >= DEVIATION_WARNING_PCT {
        warn!(model = %request.model, difference_pct, "price deviates from Black-Scholes");
        warnings.push(format!(
            "{} price deviates {difference_pct:.2}% from Black-Scholes",
            request.model
        ));
    }
    if price < intrinsic_value && !european {
        warnings.push(format!(
            "American price {price:.4} below intrinsic value {intrinsic_value:.4}"
        ));
    }

    let put_call_parity_price = european.then(|| {
        let pv_strike = params.strike * (-params.risk_free_rate * params.time_to_maturity).exp();
        match params.option_type {
            OptionType::Call => price - params.spot + pv_strike,
            OptionType::Put => price + params.spot - pv_strike,
        }
    });

    let breakeven = match params.option_type {
        OptionType::Call => params.strike + price,
        OptionType::Put => params.strike - price,
    };

    debug!(model = %request.model, price, bs_price, "option priced");

    let report = PricingReport {
        model: request.model,
        price,
        intrinsic_value,
        time_value: price - intrinsic_value,
        moneyness: Moneyness::classify(params.spot, params.strike, params.option_type),
        breakeven,
        greeks,
        black_scholes_price: bs_price,
        difference,
        difference_pct,
        put_call_parity_price,
        confidence,
        early_exercise_premium,
        model_info,
    };

    let assumptions = serde_json::json!({
        "model": request.model,
        "option_type": params.option_type,
        "risk_free_rate": params.risk_free_rate,
        "volatility": params.volatility,
        "greeks": "analytic Black-Scholes",
        "confidence_level": request.confidence_level,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, &assumptions, warnings, elapsed, report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
