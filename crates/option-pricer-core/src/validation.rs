use crate::error::PricingError;
use crate::types::PricingParameters;
use crate::PricingResult;

pub const MIN_RISK_FREE_RATE: f64 = -0.10;
pub const MAX_RISK_FREE_RATE: f64 = 0.50;

pub(crate) fn check_positive(field: &str, value: f64) -> PricingResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PricingError::invalid(field, value, "must be positive"));
    }
    Ok(())
}

pub(crate) fn check_rate(value: f64) -> PricingResult<()> {
    if !(MIN_RISK_FREE_RATE..=MAX_RISK_FREE_RATE).contains(&value) {
        return Err(PricingError::invalid(
            "risk_free_rate",
            value,
            format!("must be between {MIN_RISK_FREE_RATE} and {MAX_RISK_FREE_RATE}"),
        ));
    }
    Ok(())
}

/// Checks the numeric inputs in order: spot, strike, time, volatility, rate.
pub fn validate_market(
    spot: f64,
    strike: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
) -> PricingResult<()> {
    check_positive("spot", spot)?;
    check_positive("strike", strike)?;
    check_positive("time_to_maturity", time_to_maturity)?;
    check_positive("volatility", volatility)?;
    check_rate(risk_free_rate)
}

/// Precondition check shared by every pricer. Pure; nothing is clamped.
pub fn validate(params: &PricingParameters) -> PricingResult<()> {
    validate_market(
        params.spot,
        params.strike,
        params.time_to_maturity,
        params.risk_free_rate,
        params.volatility,
    )
}
