use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use tracing::{debug, trace};

use super::black_scholes::norm_ppf;
use super::{assumptions, ModelInfo, ModelKind, OptionPricer};
use crate::error::PricingError;
use crate::greeks::{numerical_greeks, GreeksBundle};
use crate::types::{OptionType, PricingParameters};
use crate::validation::validate;
use crate::PricingResult;

/// Batches used to estimate the standard error in `price_with_confidence`.
pub const CONFIDENCE_BATCHES: u32 = 10;

pub const DEFAULT_SIMULATION_SIZES: [u32; 5] = [1_000, 5_000, 10_000, 50_000, 100_000];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn default_num_simulations() -> u32 {
    100_000
}

fn default_num_steps() -> u32 {
    252
}

fn default_antithetic() -> bool {
    true
}

/// Monte Carlo engine settings, fixed for the lifetime of a pricer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Total number of simulated paths (antithetic pairs count twice).
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Time steps per path.
    #[serde(default = "default_num_steps")]
    pub num_steps: u32,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_antithetic")]
    pub antithetic: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_simulations: default_num_simulations(),
            num_steps: default_num_steps(),
            seed: None,
            antithetic: default_antithetic(),
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> PricingResult<()> {
        if self.num_simulations == 0 {
            return Err(PricingError::config(
                "num_simulations",
                "must be at least 1",
            ));
        }
        if self.antithetic && self.num_simulations < 2 {
            return Err(PricingError::config(
                "num_simulations",
                "antithetic sampling needs at least 2 simulations",
            ));
        }
        if self.num_steps == 0 {
            return Err(PricingError::config("num_steps", "must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Point estimate with a CLT interval built from independent batches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    pub price: f64,
    pub std_error: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McConvergence {
    pub simulation_sizes: Vec<u32>,
    pub prices: Vec<f64>,
    pub final_price: f64,
}

// ---------------------------------------------------------------------------
// Pricer
// ---------------------------------------------------------------------------

/// Risk-neutral GBM path simulation with optional antithetic variates.
///
/// Each call to `price` seeds a fresh generator from the configured seed,
/// so a seeded pricer returns the same value every time and two pricers
/// never share random state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloPricer {
    config: MonteCarloConfig,
}

impl MonteCarloPricer {
    pub fn new(config: MonteCarloConfig) -> PricingResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        }
    }

    /// Discounted mean payoff over `num_simulations` paths drawn from `rng`.
    ///
    /// With antithetic sampling, `num_simulations / 2` normal sequences are
    /// drawn and each is paired with its negation.
    fn simulate(&self, params: &PricingParameters, num_simulations: u32, rng: &mut StdRng) -> f64 {
        let steps = self.config.num_steps;
        let dt = params.time_to_maturity / steps as f64;
        let drift = (params.risk_free_rate - 0.5 * params.volatility * params.volatility) * dt;
        let diffusion = params.volatility * dt.sqrt();
        let normal = Normal::standard();

        let draws = if self.config.antithetic {
            num_simulations / 2
        } else {
            num_simulations
        };

        let mut payoff_sum = 0.0;
        let mut paths = 0u64;
        for _ in 0..draws {
            let mut log_s = 0.0;
            let mut log_s_anti = 0.0;
            for _ in 0..steps {
                let z: f64 = rng.sample(&normal);
                log_s += drift + diffusion * z;
                log_s_anti += drift - diffusion * z;
            }
            payoff_sum += terminal_payoff(params, log_s);
            paths += 1;
            if self.config.antithetic {
                payoff_sum += terminal_payoff(params, log_s_anti);
                paths += 1;
            }
        }

        let discount = (-params.risk_free_rate * params.time_to_maturity).exp();
        discount * payoff_sum / paths as f64
    }

    /// Mean of 10 independent batch prices, with standard error
    /// `std(batch prices) / sqrt(10)` and a symmetric normal interval.
    pub fn price_with_confidence(
        &self,
        params: &PricingParameters,
        confidence_level: f64,
    ) -> PricingResult<ConfidenceResult> {
        validate(params)?;
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(PricingError::invalid(
                "confidence_level",
                confidence_level,
                "must lie strictly between 0 and 1",
            ));
        }
        let batch_size = self.config.num_simulations / CONFIDENCE_BATCHES;
        if batch_size < 2 {
            return Err(PricingError::config(
                "num_simulations",
                format!("need at least 2 simulations per batch across {CONFIDENCE_BATCHES} batches"),
            ));
        }

        let mut rng = self.rng();
        let batch_prices: Vec<f64> = (0..CONFIDENCE_BATCHES)
            .map(|b| {
                let p = self.simulate(params, batch_size, &mut rng);
                trace!(batch = b, price = p, "monte carlo batch");
                p
            })
            .collect();

        let n = batch_prices.len() as f64;
        let mean = batch_prices.iter().sum::<f64>() / n;
        let variance = batch_prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        let std_error = variance.sqrt() / n.sqrt();
        let z = norm_ppf((1.0 + confidence_level) / 2.0);

        debug!(
            price = mean,
            std_error,
            confidence_level,
            batch_size,
            "monte carlo confidence interval"
        );

        Ok(ConfidenceResult {
            price: mean,
            std_error,
            lower_bound: mean - z * std_error,
            upper_bound: mean + z * std_error,
            confidence_level,
        })
    }

    /// Reprice at each simulation count using a reconfigured copy of this
    /// pricer. The pricer itself is left untouched.
    pub fn get_convergence_analysis(
        &self,
        params: &PricingParameters,
        simulation_sizes: &[u32],
    ) -> PricingResult<McConvergence> {
        if simulation_sizes.is_empty() {
            return Err(PricingError::InsufficientData(
                "convergence analysis needs at least one simulation size".into(),
            ));
        }
        let prices = simulation_sizes
            .iter()
            .map(|&num_simulations| {
                let pricer = MonteCarloPricer::new(MonteCarloConfig {
                    num_simulations,
                    ..self.config
                })?;
                pricer.price(params)
            })
            .collect::<PricingResult<Vec<f64>>>()?;
        let final_price = prices.last().copied().unwrap_or_default();
        Ok(McConvergence {
            simulation_sizes: simulation_sizes.to_vec(),
            prices,
            final_price,
        })
    }

    /// Bump-and-reprice Greeks. A seeded pricer reuses its seed for every
    /// bump, so the differences see common random numbers.
    pub fn calculate_greeks_numerical(&self, params: &PricingParameters) -> PricingResult<GreeksBundle> {
        numerical_greeks(self, params)
    }
}

fn terminal_payoff(params: &PricingParameters, log_return: f64) -> f64 {
    let s_t = params.spot * log_return.exp();
    match params.option_type {
        OptionType::Call => (s_t - params.strike).max(0.0),
        OptionType::Put => (params.strike - s_t).max(0.0),
    }
}

impl OptionPricer for MonteCarloPricer {
    fn price(&self, params: &PricingParameters) -> PricingResult<f64> {
        validate(params)?;
        debug!(
            num_simulations = self.config.num_simulations,
            num_steps = self.config.num_steps,
            antithetic = self.config.antithetic,
            seed = ?self.config.seed,
            "monte carlo price"
        );
        let mut rng = self.rng();
        Ok(self.simulate(params, self.config.num_simulations, &mut rng))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: "Monte Carlo".into(),
            kind: ModelKind::Simulation,
            description: "Simulation-based pricing using random price paths".into(),
            assumptions: assumptions(&[
                "Geometric Brownian Motion for stock price",
                "Constant volatility and risk-free rate",
                "Risk-neutral valuation",
                "European exercise",
                "Log-normal distribution of returns",
            ]),
            supports_american: false,
            parameters: serde_json::json!({
                "num_simulations": self.config.num_simulations,
                "num_steps": self.config.num_steps,
                "antithetic": self.config.antithetic,
                "seed": self.config.seed,
            }),
        }
    }
}

/// Price from raw inputs with the given engine settings.
pub fn price(
    spot: f64,
    strike: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
    option_type: &str,
    config: MonteCarloConfig,
) -> PricingResult<f64> {
    let params = PricingParameters::parse(
        spot,
        strike,
        time_to_maturity,
        risk_free_rate,
        volatility,
        option_type,
    )?;
    MonteCarloPricer::new(config)?.price(&params)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::BlackScholesPricer;

    const SEED: u64 = 42;

    fn atm(option_type: OptionType) -> PricingParameters {
        PricingParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_maturity: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.20,
            option_type,
        }
    }

    fn pricer(num_simulations: u32, num_steps: u32) -> MonteCarloPricer {
        MonteCarloPricer::new(MonteCarloConfig {
            num_simulations,
            num_steps,
            seed: Some(SEED),
            antithetic: true,
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config: MonteCarloConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MonteCarloConfig::default());
        assert_eq!(config.num_simulations, 100_000);
        assert_eq!(config.num_steps, 252);
        assert!(config.antithetic);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_seeded_reproducibility() {
        let mc = pricer(20_000, 20);
        let a = mc.price(&atm(OptionType::Call)).unwrap();
        let b = mc.price(&atm(OptionType::Call)).unwrap();
        assert_eq!(a, b);

        let other = pricer(20_000, 20);
        assert_eq!(a, other.price(&atm(OptionType::Call)).unwrap());
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = pricer(5_000, 10).price(&atm(OptionType::Call)).unwrap();
        let b = MonteCarloPricer::new(MonteCarloConfig {
            num_simulations: 5_000,
            num_steps: 10,
            seed: Some(7),
            antithetic: true,
        })
        .unwrap()
        .price(&atm(OptionType::Call))
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_converges_to_black_scholes() {
        let mc = pricer(100_000, 10);
        for (option_type, tolerance) in [(OptionType::Call, 0.01), (OptionType::Put, 0.02)] {
            let params = atm(option_type);
            let bs = BlackScholesPricer.price(&params).unwrap();
            let price = mc.price(&params).unwrap();
            let rel = (price - bs).abs() / bs;
            assert!(rel < tolerance, "{option_type}: mc {price} vs bs {bs}");
        }
    }

    #[test]
    fn test_put_call_parity_approximate() {
        let mc = pricer(100_000, 10);
        let call = mc.price(&atm(OptionType::Call)).unwrap();
        let put = mc.price(&atm(OptionType::Put)).unwrap();
        let parity = 100.0 - 100.0 * (-0.05f64).exp();
        assert!(
            ((call - put) - parity).abs() / parity < 0.05,
            "c - p = {}, expected {parity}",
            call - put
        );
    }

    #[test]
    fn test_confidence_interval_contains_price() {
        let mc = pricer(50_000, 10);
        let ci = mc.price_with_confidence(&atm(OptionType::Call), 0.95).unwrap();
        assert!(ci.lower_bound <= ci.price && ci.price <= ci.upper_bound);
        assert!(ci.std_error > 0.0);
        assert_eq!(ci.confidence_level, 0.95);
        let half_width = ci.upper_bound - ci.price;
        assert!((half_width - 1.959_964 * ci.std_error).abs() < 1e-4);
    }

    #[test]
    fn test_wider_interval_at_higher_confidence() {
        let mc = pricer(20_000, 10);
        let params = atm(OptionType::Put);
        let ci90 = mc.price_with_confidence(&params, 0.90).unwrap();
        let ci99 = mc.price_with_confidence(&params, 0.99).unwrap();
        assert_eq!(ci90.price, ci99.price);
        assert!(ci99.upper_bound - ci99.lower_bound > ci90.upper_bound - ci90.lower_bound);
    }

    #[test]
    fn test_confidence_level_bounds() {
        let mc = pricer(1_000, 5);
        for level in [0.0, 1.0, 1.5, f64::NAN] {
            let err = mc.price_with_confidence(&atm(OptionType::Call), level).unwrap_err();
            assert_eq!(err.field(), Some("confidence_level"));
        }
    }

    #[test]
    fn test_confidence_needs_enough_simulations() {
        let mc = pricer(10, 5);
        let err = mc.price_with_confidence(&atm(OptionType::Call), 0.95).unwrap_err();
        match err {
            PricingError::Configuration { field, .. } => assert_eq!(field, "num_simulations"),
            other => panic!("Expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn test_antithetic_reduces_batch_spread() {
        // deep in the money the payoff is nearly linear in the draw, so
        // paired paths cancel most of the noise
        let params = atm(OptionType::Call).with_strike(1.0);
        let plain = MonteCarloPricer::new(MonteCarloConfig {
            num_simulations: 20_000,
            num_steps: 1,
            seed: Some(SEED),
            antithetic: false,
        })
        .unwrap();
        let paired = pricer(20_000, 1);
        let e_plain = plain.price_with_confidence(&params, 0.95).unwrap().std_error;
        let e_paired = paired.price_with_confidence(&params, 0.95).unwrap().std_error;
        assert!(e_paired < e_plain, "antithetic {e_paired} vs plain {e_plain}");
    }

    #[test]
    fn test_invalid_config() {
        let err = MonteCarloPricer::new(MonteCarloConfig {
            num_simulations: 0,
            ..MonteCarloConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.field(), Some("num_simulations"));

        let err = MonteCarloPricer::new(MonteCarloConfig {
            num_steps: 0,
            ..MonteCarloConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.field(), Some("num_steps"));

        let err = MonteCarloPricer::new(MonteCarloConfig {
            num_simulations: 1,
            antithetic: true,
            ..MonteCarloConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.field(), Some("num_simulations"));
    }

    #[test]
    fn test_invalid_params_rejected_before_simulation() {
        let err = pricer(1_000, 5)
            .price(&atm(OptionType::Call).with_volatility(0.0))
            .unwrap_err();
        assert_eq!(err.field(), Some("volatility"));
    }

    #[test]
    fn test_convergence_analysis_leaves_pricer_unchanged() {
        let mc = pricer(2_000, 5);
        let analysis = mc
            .get_convergence_analysis(&atm(OptionType::Call), &[500, 1_000, 4_000])
            .unwrap();
        assert_eq!(analysis.simulation_sizes, vec![500, 1_000, 4_000]);
        assert_eq!(analysis.prices.len(), 3);
        assert_eq!(analysis.final_price, analysis.prices[2]);
        assert_eq!(mc.config().num_simulations, 2_000);
    }

    #[test]
    fn test_convergence_analysis_empty_sizes() {
        let err = pricer(1_000, 5)
            .get_convergence_analysis(&atm(OptionType::Call), &[])
            .unwrap_err();
        assert!(matches!(err, PricingError::InsufficientData(_)));
    }

    #[test]
    fn test_numerical_greeks_close_to_analytic() {
        let mc = pricer(50_000, 5);
        let g = mc.calculate_greeks_numerical(&atm(OptionType::Call)).unwrap();
        assert!((g.delta - 0.6368).abs() < 0.02, "delta {}", g.delta);
        assert!((g.vega - 0.3752).abs() < 0.05, "vega {}", g.vega);
    }

    #[test]
    fn test_free_function() {
        let p = price(100.0, 100.0, 1.0, 0.05, 0.2, "Call", MonteCarloConfig {
            num_simulations: 10_000,
            num_steps: 5,
            seed: Some(SEED),
            antithetic: true,
        })
        .unwrap();
        assert!(p > 8.0 && p < 13.0);
    }
}
