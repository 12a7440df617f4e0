pub mod analysis;
pub mod pricing;
pub mod strategy;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use option_pricer_core::analysis::report::ModelChoice;
use option_pricer_core::models::binomial::{BinomialConfig, BinomialTreePricer};
use option_pricer_core::models::black_scholes::BlackScholesPricer;
use option_pricer_core::models::monte_carlo::{MonteCarloConfig, MonteCarloPricer};
use option_pricer_core::models::OptionPricer;
use option_pricer_core::{with_metadata, year_fraction, PricingParameters};

pub type CmdResult = Result<Value, Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Shared arguments
// ---------------------------------------------------------------------------

/// The six pricing inputs as flags.
#[derive(Args, Debug, Clone)]
#[command(allow_hyphen_values = true)]
pub struct MarketArgs {
    /// Current price of the underlying
    #[arg(long)]
    pub spot: Option<f64>,

    /// Strike price
    #[arg(long)]
    pub strike: Option<f64>,

    /// Time to maturity in years (e.g. 0.25 for three months)
    #[arg(long, alias = "time-to-maturity")]
    pub time: Option<f64>,

    /// Expiry date (YYYY-MM-DD); used instead of --time
    #[arg(long, conflicts_with = "time")]
    pub expiry: Option<NaiveDate>,

    /// Valuation date for --expiry (defaults to today)
    #[arg(long, requires = "expiry")]
    pub valuation_date: Option<NaiveDate>,

    /// Continuously compounded risk-free rate (e.g. 0.05 for 5%)
    #[arg(long, alias = "risk-free-rate", default_value = "0.05")]
    pub rate: f64,

    /// Annualised volatility (e.g. 0.2 for 20%)
    #[arg(long, alias = "volatility")]
    pub vol: Option<f64>,

    /// call or put
    #[arg(long, default_value = "call")]
    pub option_type: String,
}

impl MarketArgs {
    pub fn to_params(&self) -> Result<PricingParameters, Box<dyn std::error::Error>> {
        let time = match (self.time, self.expiry) {
            (Some(t), _) => t,
            (None, Some(expiry)) => {
                let today = self
                    .valuation_date
                    .unwrap_or_else(|| chrono::Local::now().date_naive());
                year_fraction(today, expiry)
            }
            (None, None) => return Err("--time or --expiry is required (or provide --input)".into()),
        };
        Ok(PricingParameters::parse(
            self.spot.ok_or("--spot is required (or provide --input)")?,
            self.strike.ok_or("--strike is required (or provide --input)")?,
            time,
            self.rate,
            self.vol.ok_or("--vol is required (or provide --input)")?,
            &self.option_type,
        )?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    BlackScholes,
    MonteCarlo,
    Binomial,
}

impl From<ModelArg> for ModelChoice {
    fn from(m: ModelArg) -> Self {
        match m {
            ModelArg::BlackScholes => ModelChoice::BlackScholes,
            ModelArg::MonteCarlo => ModelChoice::MonteCarlo,
            ModelArg::Binomial => ModelChoice::Binomial,
        }
    }
}

/// Model selection and engine settings.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Pricing model
    #[arg(long, value_enum, default_value = "black-scholes")]
    pub model: ModelArg,

    /// Monte Carlo: number of simulated paths
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Monte Carlo: time steps per path
    #[arg(long)]
    pub mc_steps: Option<u32>,

    /// Monte Carlo: random seed for reproducible results
    #[arg(long)]
    pub seed: Option<u64>,

    /// Monte Carlo: disable antithetic variates
    #[arg(long)]
    pub no_antithetic: bool,

    /// Binomial: number of lattice steps
    #[arg(long)]
    pub tree_steps: Option<u32>,

    /// Binomial: allow early exercise
    #[arg(long)]
    pub american: bool,
}

impl ModelArgs {
    pub fn mc_config(&self) -> MonteCarloConfig {
        let defaults = MonteCarloConfig::default();
        MonteCarloConfig {
            num_simulations: self.simulations.unwrap_or(defaults.num_simulations),
            num_steps: self.mc_steps.unwrap_or(defaults.num_steps),
            seed: self.seed,
            antithetic: !self.no_antithetic,
        }
    }

    pub fn tree_config(&self) -> BinomialConfig {
        BinomialConfig {
            num_steps: self.tree_steps.unwrap_or(BinomialConfig::default().num_steps),
            american: self.american,
        }
    }

    pub fn pricer(&self) -> Result<Box<dyn OptionPricer>, Box<dyn std::error::Error>> {
        Ok(match self.model {
            ModelArg::BlackScholes => Box::new(BlackScholesPricer),
            ModelArg::MonteCarlo => Box::new(MonteCarloPricer::new(self.mc_config())?),
            ModelArg::Binomial => Box::new(BinomialTreePricer::new(self.tree_config())?),
        })
    }
}

/// Wrap a command result in the standard output envelope.
pub fn envelope<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    start: Instant,
    result: T,
) -> CmdResult {
    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(methodology, assumptions, warnings, elapsed, result);
    Ok(serde_json::to_value(output)?)
}
