use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PricingError;
use crate::models::black_scholes::{compute_terms, norm_cdf, norm_pdf, BsTerms};
use crate::models::OptionPricer;
use crate::types::{OptionType, PricingParameters, DAYS_PER_YEAR};
use crate::validation::validate;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Delta, Gamma, Theta (per calendar day), Vega and Rho (per 1 point).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GreeksBundle {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Greek {
    Delta,
    Gamma,
    Theta,
    Vega,
    Rho,
}

impl Greek {
    pub const ALL: [Greek; 5] = [
        Greek::Delta,
        Greek::Gamma,
        Greek::Theta,
        Greek::Vega,
        Greek::Rho,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Greek::Delta => "Delta",
            Greek::Gamma => "Gamma",
            Greek::Theta => "Theta",
            Greek::Vega => "Vega",
            Greek::Rho => "Rho",
        }
    }

    pub fn value(&self, bundle: &GreeksBundle) -> f64 {
        match self {
            Greek::Delta => bundle.delta,
            Greek::Gamma => bundle.gamma,
            Greek::Theta => bundle.theta,
            Greek::Vega => bundle.vega,
            Greek::Rho => bundle.rho,
        }
    }
}

impl fmt::Display for Greek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Greek {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delta" => Ok(Greek::Delta),
            "gamma" => Ok(Greek::Gamma),
            "theta" => Ok(Greek::Theta),
            "vega" => Ok(Greek::Vega),
            "rho" => Ok(Greek::Rho),
            _ => Err(PricingError::invalid(
                "greek",
                s,
                "must be one of Delta, Gamma, Theta, Vega, Rho",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Analytic Greeks (Black-Scholes)
// ---------------------------------------------------------------------------

fn delta_from(params: &PricingParameters, terms: &BsTerms) -> f64 {
    match params.option_type {
        OptionType::Call => norm_cdf(terms.d1),
        OptionType::Put => norm_cdf(terms.d1) - 1.0,
    }
}

fn gamma_from(params: &PricingParameters, terms: &BsTerms) -> f64 {
    norm_pdf(terms.d1) / (params.spot * params.volatility * terms.sqrt_t)
}

fn theta_from(params: &PricingParameters, terms: &BsTerms) -> f64 {
    let decay = -(params.spot * norm_pdf(terms.d1) * params.volatility) / (2.0 * terms.sqrt_t);
    let carry = params.risk_free_rate * params.strike * terms.discount;
    let annual = match params.option_type {
        OptionType::Call => decay - carry * norm_cdf(terms.d2),
        OptionType::Put => decay + carry * norm_cdf(-terms.d2),
    };
    annual / DAYS_PER_YEAR
}

fn vega_from(params: &PricingParameters, terms: &BsTerms) -> f64 {
    params.spot * norm_pdf(terms.d1) * terms.sqrt_t / 100.0
}

fn rho_from(params: &PricingParameters, terms: &BsTerms) -> f64 {
    let kt = params.strike * params.time_to_maturity * terms.discount;
    let rho = match params.option_type {
        OptionType::Call => kt * norm_cdf(terms.d2),
        OptionType::Put => -kt * norm_cdf(-terms.d2),
    };
    rho / 100.0
}

/// Closed-form Greeks on the Black-Scholes model.
///
/// Theta is per calendar day; Vega and Rho are per one percentage point.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreeksEngine;

impl GreeksEngine {
    pub fn new() -> Self {
        Self
    }

    fn terms(params: &PricingParameters) -> PricingResult<BsTerms> {
        validate(params)?;
        Ok(compute_terms(params))
    }

    pub fn delta(&self, params: &PricingParameters) -> PricingResult<f64> {
        Ok(delta_from(params, &Self::terms(params)?))
    }

    pub fn gamma(&self, params: &PricingParameters) -> PricingResult<f64> {
        Ok(gamma_from(params, &Self::terms(params)?))
    }

    pub fn theta(&self, params: &PricingParameters) -> PricingResult<f64> {
        Ok(theta_from(params, &Self::terms(params)?))
    }

    pub fn vega(&self, params: &PricingParameters) -> PricingResult<f64> {
        Ok(vega_from(params, &Self::terms(params)?))
    }

    pub fn rho(&self, params: &PricingParameters) -> PricingResult<f64> {
        Ok(rho_from(params, &Self::terms(params)?))
    }

    pub fn greek(&self, params: &PricingParameters, greek: Greek) -> PricingResult<f64> {
        match greek {
            Greek::Delta => self.delta(params),
            Greek::Gamma => self.gamma(params),
            Greek::Theta => self.theta(params),
            Greek::Vega => self.vega(params),
            Greek::Rho => self.rho(params),
        }
    }

    /// All five Greeks from a single d1/d2 evaluation.
    pub fn calculate_all_greeks(&self, params: &PricingParameters) -> PricingResult<GreeksBundle> {
        let terms = Self::terms(params)?;
        Ok(GreeksBundle {
            delta: delta_from(params, &terms),
            gamma: gamma_from(params, &terms),
            theta: theta_from(params, &terms),
            vega: vega_from(params, &terms),
            rho: rho_from(params, &terms),
        })
    }
}

// ---------------------------------------------------------------------------
// Finite-difference Greeks (any pricer)
// ---------------------------------------------------------------------------

/// Perturbation sizes for finite differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bumps {
    /// Spot bump as a fraction of spot.
    pub spot_pct: f64,
    /// Volatility bump as a fraction of volatility.
    pub vol_pct: f64,
    /// Absolute rate bump.
    pub rate: f64,
    /// Absolute time bump in years.
    pub time: f64,
}

impl Default for Bumps {
    fn default() -> Self {
        Self {
            spot_pct: 0.01,
            vol_pct: 0.01,
            rate: 0.0001,
            time: 1.0 / DAYS_PER_YEAR,
        }
    }
}

/// Greeks of any pricer by bump-and-reprice with the default bumps.
pub fn numerical_greeks<P>(pricer: &P, params: &PricingParameters) -> PricingResult<GreeksBundle>
where
    P: OptionPricer + ?Sized,
{
    numerical_greeks_with(pricer, params, &Bumps::default())
}

/// Central differences for Delta and Gamma, forward differences for the rest.
///
/// Theta is `-(P(T - h) - P(T)) / h` per calendar day, the sensitivity to
/// added maturity, so it carries the opposite sign to the analytic Theta.
/// It is skipped (reported as zero) when the time bump would reach expiry.
/// Any other repricing failure is returned as-is.
pub fn numerical_greeks_with<P>(
    pricer: &P,
    params: &PricingParameters,
    bumps: &Bumps,
) -> PricingResult<GreeksBundle>
where
    P: OptionPricer + ?Sized,
{
    let h_s = params.spot * bumps.spot_pct;
    let h_v = params.volatility * bumps.vol_pct;
    let h_r = bumps.rate;
    let h_t = bumps.time;

    let base = pricer.price(params)?;
    let up = pricer.price(&params.with_spot(params.spot + h_s))?;
    let down = pricer.price(&params.with_spot(params.spot - h_s))?;

    let delta = (up - down) / (2.0 * h_s);
    let gamma = (up - 2.0 * base + down) / (h_s * h_s);

    let theta = if params.time_to_maturity > h_t {
        let shorter = pricer.price(&params.with_time(params.time_to_maturity - h_t))?;
        -(shorter - base) / h_t
    } else {
        0.0
    };

    let vol_up = pricer.price(&params.with_volatility(params.volatility + h_v))?;
    let vega = (vol_up - base) / h_v;

    let rate_up = pricer.price(&params.with_rate(params.risk_free_rate + h_r))?;
    let rho = (rate_up - base) / h_r;

    Ok(GreeksBundle {
        delta,
        gamma,
        theta: theta / DAYS_PER_YEAR,
        vega: vega / 100.0,
        rho: rho / 100.0,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
