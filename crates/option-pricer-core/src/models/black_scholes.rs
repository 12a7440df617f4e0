use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use super::{assumptions, ModelInfo, ModelKind, OptionPricer};
use crate::types::{OptionType, PricingParameters};
use crate::validation::validate;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Standard normal helpers
// ---------------------------------------------------------------------------

/// Standard normal CDF.
pub(crate) fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    Normal::standard().pdf(x)
}

/// Standard normal quantile. `p` must lie in (0, 1).
pub(crate) fn norm_ppf(p: f64) -> f64 {
    Normal::standard().inverse_cdf(p)
}

// ---------------------------------------------------------------------------
// d1 / d2 machinery
// ---------------------------------------------------------------------------

/// Intermediate Black-Scholes quantities shared by the price and the Greeks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BsTerms {
    pub d1: f64,
    pub d2: f64,
    pub sqrt_t: f64,
    /// e^(-rT)
    pub discount: f64,
}

/// d1 = [ln(S/K) + (r + σ²/2)T] / (σ√T), d2 = d1 − σ√T.
///
/// Callers validate first; with T or σ at zero the result is not finite.
pub fn compute_terms(params: &PricingParameters) -> BsTerms {
    let sqrt_t = params.time_to_maturity.sqrt();
    let sigma_sqrt_t = params.volatility * sqrt_t;
    let d1 = ((params.spot / params.strike).ln()
        + (params.risk_free_rate + 0.5 * params.volatility * params.volatility)
            * params.time_to_maturity)
        / sigma_sqrt_t;
    BsTerms {
        d1,
        d2: d1 - sigma_sqrt_t,
        sqrt_t,
        discount: (-params.risk_free_rate * params.time_to_maturity).exp(),
    }
}

/// Validated (d1, d2) pair.
pub fn d1_d2(params: &PricingParameters) -> PricingResult<(f64, f64)> {
    validate(params)?;
    let terms = compute_terms(params);
    Ok((terms.d1, terms.d2))
}

pub(crate) fn price_from_terms(params: &PricingParameters, terms: &BsTerms) -> f64 {
    let s = params.spot;
    let k = params.strike;
    match params.option_type {
        OptionType::Call => s * norm_cdf(terms.d1) - k * terms.discount * norm_cdf(terms.d2),
        OptionType::Put => k * terms.discount * norm_cdf(-terms.d2) - s * norm_cdf(-terms.d1),
    }
}

// ---------------------------------------------------------------------------
// Pricer
// ---------------------------------------------------------------------------

/// Closed-form European pricer on a non-dividend-paying underlying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackScholesPricer;

impl BlackScholesPricer {
    pub fn new() -> Self {
        Self
    }
}

impl OptionPricer for BlackScholesPricer {
    fn price(&self, params: &PricingParameters) -> PricingResult<f64> {
        validate(params)?;
        let terms = compute_terms(params);
        Ok(price_from_terms(params, &terms))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: "Black-Scholes".into(),
            kind: ModelKind::Analytical,
            description: "Closed-form solution for European options".into(),
            assumptions: assumptions(&[
                "Constant volatility",
                "Constant risk-free rate",
                "No dividends",
                "European exercise only",
                "Log-normal distribution of returns",
                "No transaction costs",
                "Continuous trading",
            ]),
            supports_american: false,
            parameters: serde_json::json!({}),
        }
    }
}

/// Price from raw inputs; `option_type` is "call" or "put" in any case.
pub fn price(
    spot: f64,
    strike: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
    option_type: &str,
) -> PricingResult<f64> {
    let params = PricingParameters::parse(
        spot,
        strike,
        time_to_maturity,
        risk_free_rate,
        volatility,
        option_type,
    )?;
    BlackScholesPricer.price(&params)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
