pub mod black_scholes;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "binomial")]
pub mod binomial;

use serde::{Deserialize, Serialize};

use crate::types::PricingParameters;
use crate::PricingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Analytical,
    Simulation,
    Lattice,
}

/// Static description of a pricing model and its current configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: ModelKind,
    pub description: String,
    pub assumptions: Vec<String>,
    pub supports_american: bool,
    pub parameters: serde_json::Value,
}

/// Common surface of every pricing model.
///
/// Implementations validate their inputs before any numerical work and
/// never mutate themselves while pricing, so a shared reference can be
/// priced from several threads.
pub trait OptionPricer {
    fn price(&self, params: &PricingParameters) -> PricingResult<f64>;

    fn model_info(&self) -> ModelInfo;
}

impl<P: OptionPricer + ?Sized> OptionPricer for &P {
    fn price(&self, params: &PricingParameters) -> PricingResult<f64> {
        (**self).price(params)
    }

    fn model_info(&self) -> ModelInfo {
        (**self).model_info()
    }
}

pub(crate) fn assumptions(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
