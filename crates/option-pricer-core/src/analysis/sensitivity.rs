use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::greeks::{Greek, GreeksEngine};
use crate::models::OptionPricer;
use crate::types::PricingParameters;
use crate::PricingResult;

pub use crate::types::linspace;

/// Two-way sweep. `matrix[i][j]` is the output at `row_values[i]`,
/// `col_values[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub row_variable: String,
    pub col_variable: String,
    pub output_metric: String,
    pub row_values: Vec<f64>,
    pub col_values: Vec<f64>,
    pub matrix: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreekProfile {
    pub greek: Greek,
    pub spots: Vec<f64>,
    pub values: Vec<f64>,
}

fn require_values(field: &str, values: &[f64]) -> PricingResult<()> {
    if values.is_empty() {
        return Err(PricingError::InsufficientData(format!(
            "{field} sweep needs at least one value"
        )));
    }
    Ok(())
}

fn sweep<F>(
    (row_variable, row_values): (&str, &[f64]),
    (col_variable, col_values): (&str, &[f64]),
    output_metric: &str,
    eval: F,
) -> PricingResult<SensitivityGrid>
where
    F: Fn(f64, f64) -> PricingResult<f64>,
{
    require_values(row_variable, row_values)?;
    require_values(col_variable, col_values)?;
    let matrix = row_values
        .iter()
        .map(|&r| {
            col_values
                .iter()
                .map(|&c| eval(r, c))
                .collect::<PricingResult<Vec<f64>>>()
        })
        .collect::<PricingResult<Vec<Vec<f64>>>>()?;
    Ok(SensitivityGrid {
        row_variable: row_variable.to_string(),
        col_variable: col_variable.to_string(),
        output_metric: output_metric.to_string(),
        row_values: row_values.to_vec(),
        col_values: col_values.to_vec(),
        matrix,
    })
}

/// Option price over spot (rows) by volatility (columns).
pub fn price_grid<P>(
    pricer: &P,
    params: &PricingParameters,
    spots: &[f64],
    vols: &[f64],
) -> PricingResult<SensitivityGrid>
where
    P: OptionPricer + ?Sized,
{
    sweep(("spot", spots), ("volatility", vols), "price", |s, v| {
        pricer.price(&params.with_spot(s).with_volatility(v))
    })
}

/// Mark-to-model P&L against `entry_premium` over spot (rows) by
/// remaining time in years (columns).
pub fn pnl_grid<P>(
    pricer: &P,
    params: &PricingParameters,
    entry_premium: f64,
    spots: &[f64],
    times: &[f64],
) -> PricingResult<SensitivityGrid>
where
    P: OptionPricer + ?Sized,
{
    sweep(("spot", spots), ("time_to_maturity", times), "pnl", |s, t| {
        Ok(pricer.price(&params.with_spot(s).with_time(t))? - entry_premium)
    })
}

/// One analytic Greek across spot.
pub fn greek_profile(params: &PricingParameters, greek: Greek, spots: &[f64]) -> PricingResult<GreekProfile> {
    require_values("spot", spots)?;
    let engine = GreeksEngine;
    let values = spots
        .iter()
        .map(|&s| engine.greek(&params.with_spot(s), greek))
        .collect::<PricingResult<Vec<f64>>>()?;
    Ok(GreekProfile {
        greek,
        spots: spots.to_vec(),
        values,
    })
}

/// One analytic Greek over spot (rows) by remaining time (columns).
pub fn greek_grid(
    params: &PricingParameters,
    greek: Greek,
    spots: &[f64],
    times: &[f64],
) -> PricingResult<SensitivityGrid> {
    let engine = GreeksEngine;
    sweep(("spot", spots), ("time_to_maturity", times), greek.name(), |s, t| {
        engine.greek(&params.with_spot(s).with_time(t), greek)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::BlackScholesPricer;
    use crate::types::OptionType;

    fn params() -> PricingParameters {
        PricingParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_maturity: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.20,
            option_type: OptionType::Call,
        }
    }

    #[test]
    fn test_price_grid_shape_and_monotonicity() {
        let spots = linspace(80.0, 120.0, 5);
        let vols = linspace(0.1, 0.5, 3);
        let grid = price_grid(&BlackScholesPricer, &params(), &spots, &vols).unwrap();
        assert_eq!(grid.matrix.len(), 5);
        assert!(grid.matrix.iter().all(|row| row.len() == 3));
        for j in 0..3 {
            for i in 1..5 {
                assert!(grid.matrix[i][j] > grid.matrix[i - 1][j], "call rises with spot");
            }
        }
        for row in &grid.matrix {
            assert!(row[2] > row[0], "call rises with vol");
        }
    }

    #[test]
    fn test_pnl_grid_zero_at_entry() {
        let p = params();
        let entry = BlackScholesPricer.price(&p).unwrap();
        let grid = pnl_grid(&BlackScholesPricer, &p, entry, &[100.0, 110.0], &[1.0, 0.5]).unwrap();
        assert!(grid.matrix[0][0].abs() < 1e-12);
        assert!(grid.matrix[1][0] > 0.0);
        assert!(grid.matrix[0][1] < 0.0, "time decay loses money");
    }

    #[test]
    fn test_greek_profile_delta_increases() {
        let profile = greek_profile(&params(), Greek::Delta, &linspace(60.0, 140.0, 9)).unwrap();
        assert_eq!(profile.values.len(), 9);
        assert!(profile.values.windows(2).all(|w| w[1] > w[0]));
        assert!(profile.values.iter().all(|d| (0.0..=1.0).contains(d)));
    }

    #[test]
    fn test_greek_grid_gamma_peaks_near_strike() {
        let grid = greek_grid(&params(), Greek::Gamma, &[70.0, 100.0, 130.0], &[0.25]).unwrap();
        assert_eq!(grid.output_metric, "Gamma");
        assert!(grid.matrix[1][0] > grid.matrix[0][0]);
        assert!(grid.matrix[1][0] > grid.matrix[2][0]);
    }

    #[test]
    fn test_failed_point_propagates() {
        let err = price_grid(&BlackScholesPricer, &params(), &[100.0], &[0.2, 0.0]).unwrap_err();
        assert_eq!(err.field(), Some("volatility"));
    }

    #[test]
    fn test_empty_sweep() {
        let err = greek_profile(&params(), Greek::Vega, &[]).unwrap_err();
        assert!(matches!(err, PricingError::InsufficientData(_)));
    }
}
