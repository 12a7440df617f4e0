use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PricingError;
use crate::types::{Money, OptionType};
use crate::PricingResult;

/// Number of evenly spaced spots used for max profit/loss and break-evens.
pub const ANALYSIS_POINTS: usize = 1000;

const MIN_ANALYSIS_SPOT: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Long,
    Short,
}

/// `|max_loss| / max_profit`, or `Infinite` when the best payoff in the
/// analysis range is exactly zero. Serialised as the decimal string or `"inf"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RiskReward {
    Ratio(Decimal),
    Infinite,
}

impl fmt::Display for RiskReward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskReward::Ratio(r) => write!(f, "{r}"),
            RiskReward::Infinite => f.write_str("inf"),
        }
    }
}

impl From<RiskReward> for String {
    fn from(value: RiskReward) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for RiskReward {
    type Error = PricingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().eq_ignore_ascii_case("inf") {
            return Ok(RiskReward::Infinite);
        }
        Decimal::from_str(value.trim())
            .map(RiskReward::Ratio)
            .map_err(|e| PricingError::invalid("risk_reward_ratio", &value, e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Legs
// ---------------------------------------------------------------------------

/// One option position held to expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub option_type: OptionType,
    pub strike: Money,
    pub position: Position,
    pub quantity: u32,
    /// Premium per contract, always non-negative.
    pub premium: Money,
}

impl OptionLeg {
    pub fn new(
        option_type: OptionType,
        strike: Money,
        position: Position,
        quantity: u32,
        premium: Money,
    ) -> PricingResult<Self> {
        if strike <= Decimal::ZERO {
            return Err(PricingError::invalid("strike", strike, "must be positive"));
        }
        if quantity == 0 {
            return Err(PricingError::invalid("quantity", quantity, "must be at least 1"));
        }
        if premium < Decimal::ZERO {
            return Err(PricingError::invalid(
                "premium",
                premium,
                "must not be negative",
            ));
        }
        Ok(Self {
            option_type,
            strike,
            position,
            quantity,
            premium,
        })
    }

    pub fn intrinsic(&self, spot: Money) -> Money {
        match self.option_type {
            OptionType::Call => (spot - self.strike).max(Decimal::ZERO),
            OptionType::Put => (self.strike - spot).max(Decimal::ZERO),
        }
    }

    /// Profit or loss at expiry including the premium paid or received.
    pub fn payoff(&self, spot: Money) -> Money {
        let intrinsic = self.intrinsic(spot);
        let per_contract = match self.position {
            Position::Long => intrinsic - self.premium,
            Position::Short => self.premium - intrinsic,
        };
        per_contract * Decimal::from(self.quantity)
    }

    /// Premium cash flow: negative when paid, positive when received.
    pub fn premium_flow(&self) -> Money {
        let total = self.premium * Decimal::from(self.quantity);
        match self.position {
            Position::Long => -total,
            Position::Short => total,
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub legs: usize,
    pub net_premium: Money,
    pub max_profit: Money,
    pub max_loss: Money,
    pub break_even_points: Vec<Money>,
    pub risk_reward_ratio: RiskReward,
}

/// A named, ordered set of legs. Every metric is derived from the legs on
/// demand; legs are never modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionStrategy {
    name: String,
    legs: Vec<OptionLeg>,
}

impl OptionStrategy {
    pub fn new(name: impl Into<String>, legs: Vec<OptionLeg>) -> PricingResult<Self> {
        if legs.is_empty() {
            return Err(PricingError::InsufficientData(
                "a strategy needs at least one leg".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            legs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn legs(&self) -> &[OptionLeg] {
        &self.legs
    }

    pub fn payoff_at(&self, spot: Money) -> Money {
        self.legs.iter().map(|leg| leg.payoff(spot)).sum()
    }

    /// Total payoff at each spot in `spot_range`.
    pub fn calculate_payoff(&self, spot_range: &[Money]) -> Vec<Money> {
        spot_range.iter().map(|s| self.payoff_at(*s)).collect()
    }

    /// Positive for a net credit, negative for a net debit.
    pub fn net_premium(&self) -> Money {
        self.legs.iter().map(OptionLeg::premium_flow).sum()
    }

    /// 1000 spots from half the lowest strike (floored at 0.01) to 1.5x the
    /// highest strike, both ends included.
    pub fn analysis_range(&self) -> Vec<Money> {
        let min_strike = self
            .legs
            .iter()
            .map(|l| l.strike)
            .min()
            .unwrap_or(Decimal::ZERO);
        let max_strike = self
            .legs
            .iter()
            .map(|l| l.strike)
            .max()
            .unwrap_or(Decimal::ZERO);

        let start = (min_strike * dec!(0.5)).max(MIN_ANALYSIS_SPOT);
        let end = max_strike * dec!(1.5);
        let step = (end - start) / Decimal::from(ANALYSIS_POINTS - 1);
        (0..ANALYSIS_POINTS)
            .map(|i| {
                if i == ANALYSIS_POINTS - 1 {
                    end
                } else {
                    start + step * Decimal::from(i)
                }
            })
            .collect()
    }

    fn range_payoffs(&self) -> (Vec<Money>, Vec<Money>) {
        let spots = self.analysis_range();
        let payoffs = self.calculate_payoff(&spots);
        (spots, payoffs)
    }

    /// Best payoff observed over the analysis range. For strategies with
    /// unbounded upside this is the value at the range edge.
    pub fn max_profit(&self) -> Money {
        let (_, payoffs) = self.range_payoffs();
        payoffs.into_iter().max().unwrap_or(Decimal::ZERO)
    }

    /// Worst payoff observed over the analysis range, as a signed amount.
    pub fn max_loss(&self) -> Money {
        let (_, payoffs) = self.range_payoffs();
        payoffs.into_iter().min().unwrap_or(Decimal::ZERO)
    }

    /// Zero crossings of the payoff, ascending. A payoff that only touches
    /// zero without changing sign is not reported.
    pub fn break_even_points(&self) -> Vec<Money> {
        let (spots, payoffs) = self.range_payoffs();
        break_evens(&spots, &payoffs)
    }

    pub fn risk_reward_ratio(&self) -> RiskReward {
        let (_, payoffs) = self.range_payoffs();
        risk_reward(&payoffs)
    }

    /// Summary of every metric from a single pass over the analysis range.
    pub fn get_strategy_info(&self) -> StrategyInfo {
        let (spots, payoffs) = self.range_payoffs();
        StrategyInfo {
            name: self.name.clone(),
            legs: self.legs.len(),
            net_premium: self.net_premium(),
            max_profit: payoffs.iter().copied().max().unwrap_or(Decimal::ZERO),
            max_loss: payoffs.iter().copied().min().unwrap_or(Decimal::ZERO),
            break_even_points: break_evens(&spots, &payoffs),
            risk_reward_ratio: risk_reward(&payoffs),
        }
    }
}

fn break_evens(spots: &[Money], payoffs: &[Money]) -> Vec<Money> {
    let mut points = Vec::new();
    for i in 0..payoffs.len().saturating_sub(1) {
        let (p0, p1) = (payoffs[i], payoffs[i + 1]);
        let crosses = (p0 < Decimal::ZERO && p1 > Decimal::ZERO)
            || (p0 > Decimal::ZERO && p1 < Decimal::ZERO);
        if crosses {
            let (s0, s1) = (spots[i], spots[i + 1]);
            points.push(s0 - p0 * (s1 - s0) / (p1 - p0));
        }
    }
    points
}

fn risk_reward(payoffs: &[Money]) -> RiskReward {
    let max_profit = payoffs.iter().copied().max().unwrap_or(Decimal::ZERO);
    let max_loss = payoffs.iter().copied().min().unwrap_or(Decimal::ZERO);
    if max_profit == Decimal::ZERO {
        RiskReward::Infinite
    } else {
        RiskReward::Ratio(max_loss.abs() / max_profit)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leg(option_type: OptionType, strike: Decimal, position: Position, premium: Decimal) -> OptionLeg {
        OptionLeg::new(option_type, strike, position, 1, premium).unwrap()
    }

    fn bull_call_spread() -> OptionStrategy {
        // long 95 call for 7, short 105 call for 2
        OptionStrategy::new(
            "Bull Call Spread",
            vec![
                leg(OptionType::Call, dec!(95), Position::Long, dec!(7)),
                leg(OptionType::Call, dec!(105), Position::Short, dec!(2)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_leg_payoff_long_and_short() {
        let long_call = leg(OptionType::Call, dec!(100), Position::Long, dec!(5));
        assert_eq!(long_call.payoff(dec!(110)), dec!(5));
        assert_eq!(long_call.payoff(dec!(90)), dec!(-5));

        let short_put = leg(OptionType::Put, dec!(100), Position::Short, dec!(4));
        assert_eq!(short_put.payoff(dec!(110)), dec!(4));
        assert_eq!(short_put.payoff(dec!(90)), dec!(-6));
    }

    #[test]
    fn test_quantity_scales_payoff() {
        let two = OptionLeg::new(OptionType::Call, dec!(100), Position::Short, 2, dec!(3)).unwrap();
        assert_eq!(two.payoff(dec!(105)), dec!(-4));
        assert_eq!(two.premium_flow(), dec!(6));
    }

    #[test]
    fn test_leg_validation() {
        let err = OptionLeg::new(OptionType::Call, dec!(0), Position::Long, 1, dec!(1)).unwrap_err();
        assert_eq!(err.field(), Some("strike"));
        let err = OptionLeg::new(OptionType::Call, dec!(100), Position::Long, 0, dec!(1)).unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
        let err = OptionLeg::new(OptionType::Put, dec!(100), Position::Long, 1, dec!(-1)).unwrap_err();
        assert_eq!(err.field(), Some("premium"));
    }

    #[test]
    fn test_empty_strategy_rejected() {
        let err = OptionStrategy::new("Nothing", vec![]).unwrap_err();
        assert!(matches!(err, PricingError::InsufficientData(_)));
    }

    #[test]
    fn test_bull_call_spread_metrics() {
        let s = bull_call_spread();
        assert_eq!(s.net_premium(), dec!(-5));
        assert_eq!(s.max_profit(), dec!(5));
        assert_eq!(s.max_loss(), dec!(-5));
        assert_eq!(s.risk_reward_ratio(), RiskReward::Ratio(dec!(1)));

        let be = s.break_even_points();
        assert_eq!(be.len(), 1);
        assert!((be[0] - dec!(100)).abs() < dec!(0.000001), "break-even {}", be[0]);
    }

    #[test]
    fn test_payoff_is_sum_of_legs() {
        let s = bull_call_spread();
        let spots = vec![dec!(80), dec!(100), dec!(120)];
        assert_eq!(s.calculate_payoff(&spots), vec![dec!(-5), dec!(0), dec!(5)]);
    }

    #[test]
    fn test_analysis_range() {
        let range = bull_call_spread().analysis_range();
        assert_eq!(range.len(), ANALYSIS_POINTS);
        assert_eq!(range[0], dec!(47.5));
        assert_eq!(range[ANALYSIS_POINTS - 1], dec!(157.5));
        assert!(range.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_analysis_range_floor() {
        let s = OptionStrategy::new(
            "Tiny",
            vec![leg(OptionType::Put, dec!(0.01), Position::Long, dec!(0))],
        )
        .unwrap();
        assert_eq!(s.analysis_range()[0], dec!(0.01));
    }

    #[test]
    fn test_straddle_has_two_break_evens() {
        let s = OptionStrategy::new(
            "Long Straddle",
            vec![
                leg(OptionType::Call, dec!(100), Position::Long, dec!(6)),
                leg(OptionType::Put, dec!(100), Position::Long, dec!(4)),
            ],
        )
        .unwrap();
        let be = s.break_even_points();
        assert_eq!(be.len(), 2);
        assert!((be[0] - dec!(90)).abs() < dec!(0.000001));
        assert!((be[1] - dec!(110)).abs() < dec!(0.000001));
        assert!(be[0] < be[1]);
    }

    #[test]
    fn test_tangent_payoff_not_a_break_even() {
        // long call bought for nothing: payoff touches zero but never goes negative
        let s = OptionStrategy::new(
            "Free Call",
            vec![leg(OptionType::Call, dec!(100), Position::Long, dec!(0))],
        )
        .unwrap();
        assert!(s.break_even_points().is_empty());
    }

    #[test]
    fn test_risk_reward_infinite_at_zero_profit() {
        // zero-premium short put peaks at exactly zero above the strike
        let s = OptionStrategy::new(
            "Free Short Put",
            vec![leg(OptionType::Put, dec!(100), Position::Short, dec!(0))],
        )
        .unwrap();
        assert_eq!(s.max_profit(), Decimal::ZERO);
        assert_eq!(s.risk_reward_ratio(), RiskReward::Infinite);
        let json = serde_json::to_value(s.get_strategy_info()).unwrap();
        assert_eq!(json["risk_reward_ratio"], "inf");
    }

    #[test]
    fn test_risk_reward_ratio_with_negative_profit() {
        // range tops out at 150, so the best outcome is 50 - 1000
        let s = OptionStrategy::new(
            "Overpaid Call",
            vec![leg(OptionType::Call, dec!(100), Position::Long, dec!(1000))],
        )
        .unwrap();
        assert_eq!(s.max_profit(), dec!(-950));
        assert_eq!(s.max_loss(), dec!(-1000));
        assert_eq!(
            s.risk_reward_ratio(),
            RiskReward::Ratio(dec!(1000) / dec!(-950))
        );
    }

    #[test]
    fn test_strategy_info_consistent() {
        let s = bull_call_spread();
        let info = s.get_strategy_info();
        assert_eq!(info.name, "Bull Call Spread");
        assert_eq!(info.legs, 2);
        assert_eq!(info.max_profit, s.max_profit());
        assert_eq!(info.max_loss, s.max_loss());
        assert_eq!(info.break_even_points, s.break_even_points());
        assert_eq!(info.risk_reward_ratio, s.risk_reward_ratio());
    }

    #[test]
    fn test_risk_reward_parse() {
        assert_eq!(RiskReward::try_from("inf".to_string()).unwrap(), RiskReward::Infinite);
        assert_eq!(
            RiskReward::try_from("2.5".to_string()).unwrap(),
            RiskReward::Ratio(dec!(2.5))
        );
        assert!(RiskReward::try_from("lots".to_string()).is_err());
    }
}
