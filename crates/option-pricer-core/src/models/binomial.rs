use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{assumptions, ModelInfo, ModelKind, OptionPricer};
use crate::error::PricingError;
use crate::greeks::{numerical_greeks, GreeksBundle};
use crate::types::{linspace, PricingParameters};
use crate::validation::{check_positive, validate};
use crate::PricingResult;

pub const DEFAULT_STEP_SIZES: [u32; 6] = [10, 25, 50, 100, 200, 500];

pub const DEFAULT_BOUNDARY_POINTS: usize = 50;

// ---------------------------------------------------------------------------
// Configuration and output types
// ---------------------------------------------------------------------------

fn default_num_steps() -> u32 {
    100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinomialConfig {
    #[serde(default = "default_num_steps")]
    pub num_steps: u32,
    /// Allow early exercise at every node.
    #[serde(default)]
    pub american: bool,
}

impl Default for BinomialConfig {
    fn default() -> Self {
        Self {
            num_steps: default_num_steps(),
            american: false,
        }
    }
}

impl BinomialConfig {
    pub fn validate(&self) -> PricingResult<()> {
        if self.num_steps == 0 {
            return Err(PricingError::config("num_steps", "must be at least 1"));
        }
        Ok(())
    }
}

/// Full lattice from one pricing run. Row `i` holds the `i + 1` nodes
/// reachable after `i` steps, node `j` being `j` up-moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeData {
    pub price: f64,
    pub price_tree: Vec<Vec<f64>>,
    pub option_tree: Vec<Vec<f64>>,
    pub exercise_tree: Vec<Vec<bool>>,
    pub num_steps: u32,
    pub american: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConvergence {
    pub step_sizes: Vec<u32>,
    pub prices: Vec<f64>,
    pub final_price: f64,
}

/// Approximate early-exercise boundary: for each starting spot, the first
/// time at which the centre-line node of its lattice is an exercise node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseBoundary {
    pub spot_prices: Vec<f64>,
    pub exercise_times: Vec<f64>,
    pub times: Vec<f64>,
}

// ---------------------------------------------------------------------------
// CRR lattice parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Crr {
    dt: f64,
    up: f64,
    down: f64,
    prob_up: f64,
    discount: f64,
}

impl Crr {
    fn new(params: &PricingParameters, num_steps: u32) -> PricingResult<Self> {
        let dt = params.time_to_maturity / num_steps as f64;
        let up = (params.volatility * dt.sqrt()).exp();
        let down = 1.0 / up;
        let prob_up = ((params.risk_free_rate * dt).exp() - down) / (up - down);
        if !prob_up.is_finite() || !(0.0..=1.0).contains(&prob_up) {
            return Err(PricingError::NumericalDegenerate {
                context: format!(
                    "risk-neutral probability {prob_up:.6} outside [0, 1] with {num_steps} steps; \
                     increase num_steps or volatility"
                ),
            });
        }
        Ok(Self {
            dt,
            up,
            down,
            prob_up,
            discount: (-params.risk_free_rate * dt).exp(),
        })
    }

    /// Underlying price after `step` moves with `ups` of them up.
    fn node_price(&self, spot: f64, step: u32, ups: u32) -> f64 {
        spot * self.up.powi(ups as i32) * self.down.powi((step - ups) as i32)
    }

    fn continuation(&self, value_down: f64, value_up: f64) -> f64 {
        self.discount * (self.prob_up * value_up + (1.0 - self.prob_up) * value_down)
    }
}

// ---------------------------------------------------------------------------
// Pricer
// ---------------------------------------------------------------------------

/// Cox-Ross-Rubinstein binomial lattice, European or American exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinomialTreePricer {
    config: BinomialConfig,
}

impl BinomialTreePricer {
    pub fn new(config: BinomialConfig) -> PricingResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BinomialConfig {
        &self.config
    }

    /// Price and keep every lattice level: forward-built underlying prices,
    /// backward-induced option values, and exercise flags.
    pub fn calculate_tree(&self, params: &PricingParameters) -> PricingResult<TreeData> {
        validate(params)?;
        let n = self.config.num_steps;
        let crr = Crr::new(params, n)?;

        let price_tree: Vec<Vec<f64>> = (0..=n)
            .map(|i| (0..=i).map(|j| crr.node_price(params.spot, i, j)).collect())
            .collect();

        let mut option_tree: Vec<Vec<f64>> = price_tree
            .iter()
            .map(|row| vec![0.0; row.len()])
            .collect();
        let mut exercise_tree: Vec<Vec<bool>> = price_tree
            .iter()
            .map(|row| vec![false; row.len()])
            .collect();

        let last = n as usize;
        for (j, s) in price_tree[last].iter().enumerate() {
            option_tree[last][j] = params.option_type.intrinsic(*s, params.strike);
        }

        for i in (0..last).rev() {
            for j in 0..=i {
                let continuation =
                    crr.continuation(option_tree[i + 1][j], option_tree[i + 1][j + 1]);
                if self.config.american {
                    let exercise = params.option_type.intrinsic(price_tree[i][j], params.strike);
                    option_tree[i][j] = continuation.max(exercise);
                    exercise_tree[i][j] = exercise > continuation;
                } else {
                    option_tree[i][j] = continuation;
                }
            }
        }

        Ok(TreeData {
            price: option_tree[0][0],
            price_tree,
            option_tree,
            exercise_tree,
            num_steps: n,
            american: self.config.american,
        })
    }

    /// Reprice at each step count using a reconfigured copy.
    pub fn get_convergence_analysis(
        &self,
        params: &PricingParameters,
        step_sizes: &[u32],
    ) -> PricingResult<TreeConvergence> {
        if step_sizes.is_empty() {
            return Err(PricingError::InsufficientData(
                "convergence analysis needs at least one step count".into(),
            ));
        }
        let prices = step_sizes
            .iter()
            .map(|&num_steps| {
                BinomialTreePricer::new(BinomialConfig {
                    num_steps,
                    ..self.config
                })?
                .price(params)
            })
            .collect::<PricingResult<Vec<f64>>>()?;
        let final_price = prices.last().copied().unwrap_or_default();
        Ok(TreeConvergence {
            step_sizes: step_sizes.to_vec(),
            prices,
            final_price,
        })
    }

    /// Scan `num_points` spots across `spot_range`, using strike, maturity,
    /// rate, volatility and option type from `params`.
    ///
    /// Only the node on each lattice's centre line (`exercise_tree[i][i / 2]`)
    /// is inspected, so the curve is indicative rather than exact. Returns
    /// `Ok(None)` for a European tree.
    pub fn get_early_exercise_boundary(
        &self,
        params: &PricingParameters,
        spot_range: (f64, f64),
        num_points: usize,
    ) -> PricingResult<Option<ExerciseBoundary>> {
        if !self.config.american {
            warn!("early exercise boundary requested for a European tree");
            return Ok(None);
        }
        let (min_spot, max_spot) = spot_range;
        check_positive("spot_range", min_spot)?;
        if !max_spot.is_finite() || min_spot >= max_spot {
            return Err(PricingError::invalid(
                "spot_range",
                format!("({min_spot}, {max_spot})"),
                "minimum must be below maximum",
            ));
        }
        if num_points < 2 {
            return Err(PricingError::invalid(
                "num_points",
                num_points,
                "need at least 2 points",
            ));
        }

        let n = self.config.num_steps;
        let dt = params.time_to_maturity / n as f64;
        let times: Vec<f64> = (0..=n).map(|i| i as f64 * dt).collect();
        let spot_prices = linspace(min_spot, max_spot, num_points);

        let mut exercise_times = Vec::with_capacity(num_points);
        for &spot in &spot_prices {
            let tree = self.calculate_tree(&params.with_spot(spot))?;
            let first = tree
                .exercise_tree
                .iter()
                .enumerate()
                .find(|(i, row)| row[i / 2])
                .map(|(i, _)| times[i])
                .unwrap_or(params.time_to_maturity);
            exercise_times.push(first);
        }

        Ok(Some(ExerciseBoundary {
            spot_prices,
            exercise_times,
            times,
        }))
    }

    pub fn calculate_greeks_numerical(&self, params: &PricingParameters) -> PricingResult<GreeksBundle> {
        numerical_greeks(self, params)
    }
}

impl OptionPricer for BinomialTreePricer {
    /// Same induction as `calculate_tree`, over a single rolling row.
    fn price(&self, params: &PricingParameters) -> PricingResult<f64> {
        validate(params)?;
        let n = self.config.num_steps;
        let crr = Crr::new(params, n)?;
        debug!(num_steps = n, american = self.config.american, "binomial price");

        let mut values: Vec<f64> = (0..=n)
            .map(|j| {
                params
                    .option_type
                    .intrinsic(crr.node_price(params.spot, n, j), params.strike)
            })
            .collect();

        for i in (0..n).rev() {
            for j in 0..=i {
                let k = j as usize;
                let continuation = crr.continuation(values[k], values[k + 1]);
                values[k] = if self.config.american {
                    let exercise = params
                        .option_type
                        .intrinsic(crr.node_price(params.spot, i, j), params.strike);
                    continuation.max(exercise)
                } else {
                    continuation
                };
            }
        }
        Ok(values[0])
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: "Binomial Tree".into(),
            kind: ModelKind::Lattice,
            description: "Discrete-time lattice model supporting American and European options"
                .into(),
            assumptions: assumptions(&[
                "Discrete time steps",
                "Two possible price movements per step",
                "Risk-neutral valuation",
                "Constant volatility and risk-free rate",
                "Supports early exercise (American options)",
            ]),
            supports_american: true,
            parameters: serde_json::json!({
                "num_steps": self.config.num_steps,
                "american": self.config.american,
            }),
        }
    }
}

/// Price from raw inputs with the given lattice settings.
pub fn price(
    spot: f64,
    strike: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
    option_type: &str,
    config: BinomialConfig,
) -> PricingResult<f64> {
    let params = PricingParameters::parse(
        spot,
        strike,
        time_to_maturity,
        risk_free_rate,
        volatility,
        option_type,
    )?;
    BinomialTreePricer::new(config)?.price(&params)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
