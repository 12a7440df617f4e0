use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PricingError;
use crate::models::OptionPricer;
use crate::types::{PricingParameters, DAYS_PER_YEAR};
use crate::validation::validate;
use crate::PricingResult;

/// Market move applied to a position: percentage changes in spot and
/// volatility, and calendar days elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioShock {
    #[serde(default)]
    pub spot_change_pct: f64,
    #[serde(default)]
    pub vol_change_pct: f64,
    #[serde(default)]
    pub days_passed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub original_price: f64,
    pub scenario_price: f64,
    pub price_change: f64,
    pub pct_change: f64,
    pub scenario_params: PricingParameters,
}

impl ScenarioShock {
    /// Parameters after the shock. Errors when the shock leaves no time to
    /// expiry; other invalid results are left to the pricer's validation.
    pub fn apply(&self, params: &PricingParameters) -> PricingResult<PricingParameters> {
        let remaining = params.time_to_maturity - self.days_passed / DAYS_PER_YEAR;
        if !(remaining > 0.0) {
            return Err(PricingError::invalid(
                "days_passed",
                self.days_passed,
                "scenario reaches or passes expiry",
            ));
        }
        Ok(PricingParameters {
            spot: params.spot * (1.0 + self.spot_change_pct / 100.0),
            volatility: params.volatility * (1.0 + self.vol_change_pct / 100.0),
            time_to_maturity: remaining,
            ..*params
        })
    }
}

/// Reprice `params` before and after `shock` with the same pricer.
pub fn run_scenario<P>(pricer: &P, params: &PricingParameters, shock: &ScenarioShock) -> PricingResult<ScenarioResult>
where
    P: OptionPricer + ?Sized,
{
    validate(params)?;
    let scenario_params = shock.apply(params)?;
    let original_price = pricer.price(params)?;
    let scenario_price = pricer.price(&scenario_params)?;
    let price_change = scenario_price - original_price;
    let pct_change = if original_price.abs() > f64::EPSILON {
        price_change / original_price * 100.0
    } else {
        0.0
    };
    debug!(original_price, scenario_price, pct_change, "scenario repriced");
    Ok(ScenarioResult {
        original_price,
        scenario_price,
        price_change,
        pct_change,
        scenario_params,
    })
}
