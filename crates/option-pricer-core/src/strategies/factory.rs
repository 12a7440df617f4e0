use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use super::legs::{OptionLeg, OptionStrategy, Position};
use crate::error::PricingError;
use crate::models::black_scholes::BlackScholesPricer;
use crate::models::OptionPricer;
use crate::types::{Money, OptionType, PricingParameters};
use crate::validation::{check_positive, check_rate};
use crate::PricingResult;

/// Decimal places kept when a model premium is converted to money.
const PREMIUM_DP: u32 = 10;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    BullCallSpread,
    BearPutSpread,
    BullPutSpread,
    BearCallSpread,
    LongStraddle,
    ShortStraddle,
    LongStrangle,
    ShortStrangle,
    CallButterfly,
    PutButterfly,
    IronCondor,
    IronButterfly,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 12] = [
        StrategyKind::BullCallSpread,
        StrategyKind::BearPutSpread,
        StrategyKind::BullPutSpread,
        StrategyKind::BearCallSpread,
        StrategyKind::LongStraddle,
        StrategyKind::ShortStraddle,
        StrategyKind::LongStrangle,
        StrategyKind::ShortStrangle,
        StrategyKind::CallButterfly,
        StrategyKind::PutButterfly,
        StrategyKind::IronCondor,
        StrategyKind::IronButterfly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::BullCallSpread => "bull_call_spread",
            StrategyKind::BearPutSpread => "bear_put_spread",
            StrategyKind::BullPutSpread => "bull_put_spread",
            StrategyKind::BearCallSpread => "bear_call_spread",
            StrategyKind::LongStraddle => "long_straddle",
            StrategyKind::ShortStraddle => "short_straddle",
            StrategyKind::LongStrangle => "long_strangle",
            StrategyKind::ShortStrangle => "short_strangle",
            StrategyKind::CallButterfly => "call_butterfly",
            StrategyKind::PutButterfly => "put_butterfly",
            StrategyKind::IronCondor => "iron_condor",
            StrategyKind::IronButterfly => "iron_butterfly",
        }
    }

    /// Strikes expected by `StrategyFactory::build`, in argument order.
    pub fn strike_names(&self) -> &'static [&'static str] {
        match self {
            StrategyKind::BullCallSpread
            | StrategyKind::BearPutSpread
            | StrategyKind::BullPutSpread
            | StrategyKind::BearCallSpread => &["lower", "upper"],
            StrategyKind::LongStraddle | StrategyKind::ShortStraddle => &["strike"],
            StrategyKind::LongStrangle | StrategyKind::ShortStrangle => &["call", "put"],
            StrategyKind::CallButterfly
            | StrategyKind::PutButterfly
            | StrategyKind::IronButterfly => &["lower", "middle", "upper"],
            StrategyKind::IronCondor => &["put_lower", "put_upper", "call_lower", "call_upper"],
        }
    }
}

impl FromStr for StrategyKind {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase().replace(&['-', ' '][..], "_");
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalised)
            .ok_or_else(|| PricingError::invalid("strategy", s, "unknown strategy"))
    }
}

/// Serialisable strategy request: market inputs plus kind and strikes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRequest {
    pub spot: f64,
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub kind: StrategyKind,
    pub strikes: Vec<Money>,
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds named strategies with Black-Scholes premiums under fixed market
/// conditions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyFactory {
    spot: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
}

impl StrategyFactory {
    pub fn new(
        spot: f64,
        time_to_maturity: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> PricingResult<Self> {
        check_positive("spot", spot)?;
        check_positive("time_to_maturity", time_to_maturity)?;
        check_positive("volatility", volatility)?;
        check_rate(risk_free_rate)?;
        Ok(Self {
            spot,
            time_to_maturity,
            risk_free_rate,
            volatility,
        })
    }

    pub fn from_request(request: &StrategyRequest) -> PricingResult<Self> {
        Self::new(
            request.spot,
            request.time_to_maturity,
            request.risk_free_rate,
            request.volatility,
        )
    }

    /// Black-Scholes premium for one contract, rounded to money.
    pub fn premium(&self, option_type: OptionType, strike: Money) -> PricingResult<Money> {
        let k = strike
            .to_f64()
            .ok_or_else(|| PricingError::invalid("strike", strike, "not representable as f64"))?;
        let params = PricingParameters {
            spot: self.spot,
            strike: k,
            time_to_maturity: self.time_to_maturity,
            risk_free_rate: self.risk_free_rate,
            volatility: self.volatility,
            option_type,
        };
        let price = BlackScholesPricer.price(&params)?;
        Decimal::from_f64(price)
            .map(|p| p.round_dp(PREMIUM_DP))
            .ok_or_else(|| PricingError::NumericalDegenerate {
                context: format!("premium {price} for {option_type} strike {strike} is not finite"),
            })
    }

    fn leg(
        &self,
        option_type: OptionType,
        strike: Money,
        position: Position,
        quantity: u32,
    ) -> PricingResult<OptionLeg> {
        let premium = self.premium(option_type, strike)?;
        OptionLeg::new(option_type, strike, position, quantity, premium)
    }

    fn strategy(name: &str, legs: Vec<OptionLeg>) -> PricingResult<OptionStrategy> {
        debug!(strategy = name, legs = legs.len(), "strategy built");
        OptionStrategy::new(name, legs)
    }

    // -- Vertical spreads ---------------------------------------------------

    /// Long call at `lower`, short call at `upper`.
    pub fn bull_call_spread(&self, lower: Money, upper: Money) -> PricingResult<OptionStrategy> {
        ascending(&[lower, upper])?;
        Self::strategy(
            "Bull Call Spread",
            vec![
                self.leg(OptionType::Call, lower, Position::Long, 1)?,
                self.leg(OptionType::Call, upper, Position::Short, 1)?,
            ],
        )
    }

    /// Long put at `upper`, short put at `lower`.
    pub fn bear_put_spread(&self, lower: Money, upper: Money) -> PricingResult<OptionStrategy> {
        ascending(&[lower, upper])?;
        Self::strategy(
            "Bear Put Spread",
            vec![
                self.leg(OptionType::Put, upper, Position::Long, 1)?,
                self.leg(OptionType::Put, lower, Position::Short, 1)?,
            ],
        )
    }

    /// Short put at `upper`, long put at `lower`. Opens for a credit.
    pub fn bull_put_spread(&self, lower: Money, upper: Money) -> PricingResult<OptionStrategy> {
        ascending(&[lower, upper])?;
        Self::strategy(
            "Bull Put Spread",
            vec![
                self.leg(OptionType::Put, upper, Position::Short, 1)?,
                self.leg(OptionType::Put, lower, Position::Long, 1)?,
            ],
        )
    }

    /// Short call at `lower`, long call at `upper`. Opens for a credit.
    pub fn bear_call_spread(&self, lower: Money, upper: Money) -> PricingResult<OptionStrategy> {
        ascending(&[lower, upper])?;
        Self::strategy(
            "Bear Call Spread",
            vec![
                self.leg(OptionType::Call, lower, Position::Short, 1)?,
                self.leg(OptionType::Call, upper, Position::Long, 1)?,
            ],
        )
    }

    // -- Volatility strategies ----------------------------------------------

    pub fn long_straddle(&self, strike: Money) -> PricingResult<OptionStrategy> {
        Self::strategy(
            "Long Straddle",
            vec![
                self.leg(OptionType::Call, strike, Position::Long, 1)?,
                self.leg(OptionType::Put, strike, Position::Long, 1)?,
            ],
        )
    }

    pub fn short_straddle(&self, strike: Money) -> PricingResult<OptionStrategy> {
        Self::strategy(
            "Short Straddle",
            vec![
                self.leg(OptionType::Call, strike, Position::Short, 1)?,
                self.leg(OptionType::Put, strike, Position::Short, 1)?,
            ],
        )
    }

    pub fn long_strangle(&self, call_strike: Money, put_strike: Money) -> PricingResult<OptionStrategy> {
        Self::strategy(
            "Long Strangle",
            vec![
                self.leg(OptionType::Call, call_strike, Position::Long, 1)?,
                self.leg(OptionType::Put, put_strike, Position::Long, 1)?,
            ],
        )
    }

    pub fn short_strangle(&self, call_strike: Money, put_strike: Money) -> PricingResult<OptionStrategy> {
        Self::strategy(
            "Short Strangle",
            vec![
                self.leg(OptionType::Call, call_strike, Position::Short, 1)?,
                self.leg(OptionType::Put, put_strike, Position::Short, 1)?,
            ],
        )
    }

    // -- Multi-leg ----------------------------------------------------------

    /// Long one wing at each of `lower` and `upper`, short two at `middle`.
    pub fn butterfly_spread(
        &self,
        lower: Money,
        middle: Money,
        upper: Money,
        option_type: OptionType,
    ) -> PricingResult<OptionStrategy> {
        ascending(&[lower, middle, upper])?;
        let name = match option_type {
            OptionType::Call => "Call Butterfly Spread",
            OptionType::Put => "Put Butterfly Spread",
        };
        Self::strategy(
            name,
            vec![
                self.leg(option_type, lower, Position::Long, 1)?,
                self.leg(option_type, middle, Position::Short, 2)?,
                self.leg(option_type, upper, Position::Long, 1)?,
            ],
        )
    }

    /// Bull put spread below the market plus bear call spread above it.
    pub fn iron_condor(
        &self,
        put_lower: Money,
        put_upper: Money,
        call_lower: Money,
        call_upper: Money,
    ) -> PricingResult<OptionStrategy> {
        ascending(&[put_lower, put_upper])?;
        ascending(&[call_lower, call_upper])?;
        if put_upper > call_lower {
            return Err(PricingError::invalid(
                "strikes",
                format!("{put_upper} > {call_lower}"),
                "put wing must sit at or below the call wing",
            ));
        }
        Self::strategy(
            "Iron Condor",
            vec![
                self.leg(OptionType::Put, put_lower, Position::Long, 1)?,
                self.leg(OptionType::Put, put_upper, Position::Short, 1)?,
                self.leg(OptionType::Call, call_lower, Position::Short, 1)?,
                self.leg(OptionType::Call, call_upper, Position::Long, 1)?,
            ],
        )
    }

    /// Short straddle at `middle` with long protective wings.
    pub fn iron_butterfly(&self, lower: Money, middle: Money, upper: Money) -> PricingResult<OptionStrategy> {
        ascending(&[lower, middle, upper])?;
        Self::strategy(
            "Iron Butterfly",
            vec![
                self.leg(OptionType::Put, lower, Position::Long, 1)?,
                self.leg(OptionType::Put, middle, Position::Short, 1)?,
                self.leg(OptionType::Call, middle, Position::Short, 1)?,
                self.leg(OptionType::Call, upper, Position::Long, 1)?,
            ],
        )
    }

    /// Dispatch a named strategy with strikes in `StrategyKind::strike_names` order.
    pub fn build(&self, kind: StrategyKind, strikes: &[Money]) -> PricingResult<OptionStrategy> {
        let expected = kind.strike_names();
        if strikes.len() != expected.len() {
            return Err(PricingError::invalid(
                "strikes",
                format!("{} given", strikes.len()),
                format!(
                    "{} needs {} strike(s): {}",
                    kind.as_str(),
                    expected.len(),
                    expected.join(", ")
                ),
            ));
        }
        let k = strikes;
        match kind {
            StrategyKind::BullCallSpread => self.bull_call_spread(k[0], k[1]),
            StrategyKind::BearPutSpread => self.bear_put_spread(k[0], k[1]),
            StrategyKind::BullPutSpread => self.bull_put_spread(k[0], k[1]),
            StrategyKind::BearCallSpread => self.bear_call_spread(k[0], k[1]),
            StrategyKind::LongStraddle => self.long_straddle(k[0]),
            StrategyKind::ShortStraddle => self.short_straddle(k[0]),
            StrategyKind::LongStrangle => self.long_strangle(k[0], k[1]),
            StrategyKind::ShortStrangle => self.short_strangle(k[0], k[1]),
            StrategyKind::CallButterfly => self.butterfly_spread(k[0], k[1], k[2], OptionType::Call),
            StrategyKind::PutButterfly => self.butterfly_spread(k[0], k[1], k[2], OptionType::Put),
            StrategyKind::IronCondor => self.iron_condor(k[0], k[1], k[2], k[3]),
            StrategyKind::IronButterfly => self.iron_butterfly(k[0], k[1], k[2]),
        }
    }

    pub fn build_request(request: &StrategyRequest) -> PricingResult<OptionStrategy> {
        Self::from_request(request)?.build(request.kind, &request.strikes)
    }
}

fn ascending(strikes: &[Money]) -> PricingResult<()> {
    if strikes.windows(2).any(|w| w[0] >= w[1]) {
        let listed: Vec<String> = strikes.iter().map(|s| s.to_string()).collect();
        return Err(PricingError::invalid(
            "strikes",
            listed.join(", "),
            "must be strictly increasing",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::legs::RiskReward;
    use rust_decimal_macros::dec;

    fn factory() -> StrategyFactory {
        StrategyFactory::new(100.0, 0.25, 0.05, 0.20).unwrap()
    }

    fn close(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_premium_matches_black_scholes() {
        let premium = factory().premium(OptionType::Call, dec!(100)).unwrap();
        let bs = crate::models::black_scholes::price(100.0, 100.0, 0.25, 0.05, 0.20, "call").unwrap();
        assert!((premium.to_f64().unwrap() - bs).abs() < 1e-9);
        assert!(premium.scale() <= PREMIUM_DP);
    }

    #[test]
    fn test_bull_call_spread() {
        let s = factory().bull_call_spread(dec!(95), dec!(105)).unwrap();
        assert_eq!(s.name(), "Bull Call Spread");
        let legs = s.legs();
        assert_eq!(legs[0].position, Position::Long);
        assert_eq!(legs[0].strike, dec!(95));
        assert_eq!(legs[1].position, Position::Short);

        let debit = -s.net_premium();
        assert!(debit > Decimal::ZERO && debit < dec!(10));
        let info = s.get_strategy_info();
        assert!(close(info.max_profit, dec!(10) - debit, dec!(0.0000001)));
        assert!(close(info.max_loss, -debit, dec!(0.0000001)));
        assert_eq!(info.break_even_points.len(), 1);
        assert!(close(info.break_even_points[0], dec!(95) + debit, dec!(0.000001)));
        match info.risk_reward_ratio {
            RiskReward::Ratio(r) => assert!(close(r, debit / (dec!(10) - debit), dec!(0.000001))),
            other => panic!("Expected a finite ratio, got {other:?}"),
        }
    }

    #[test]
    fn test_credit_spreads_open_for_credit() {
        let f = factory();
        assert!(f.bull_put_spread(dec!(95), dec!(105)).unwrap().net_premium() > Decimal::ZERO);
        assert!(f.bear_call_spread(dec!(95), dec!(105)).unwrap().net_premium() > Decimal::ZERO);
        assert!(f.bear_put_spread(dec!(95), dec!(105)).unwrap().net_premium() < Decimal::ZERO);
    }

    #[test]
    fn test_long_straddle_break_evens() {
        let s = factory().long_straddle(dec!(100)).unwrap();
        let cost = -s.net_premium();
        let be = s.break_even_points();
        assert_eq!(be.len(), 2);
        assert!(close(be[0], dec!(100) - cost, dec!(0.000001)));
        assert!(close(be[1], dec!(100) + cost, dec!(0.000001)));
    }

    #[test]
    fn test_short_straddle_profit_capped_by_credit() {
        let s = factory().short_straddle(dec!(100)).unwrap();
        let credit = s.net_premium();
        assert!(credit > Decimal::ZERO);
        let max_profit = s.max_profit();
        assert!(max_profit <= credit);
        assert!(credit - max_profit < dec!(0.1));
    }

    #[test]
    fn test_strangle_legs_follow_arguments() {
        let s = factory().long_strangle(dec!(110), dec!(90)).unwrap();
        assert_eq!(s.legs()[0].option_type, OptionType::Call);
        assert_eq!(s.legs()[0].strike, dec!(110));
        assert_eq!(s.legs()[1].option_type, OptionType::Put);
        assert_eq!(s.legs()[1].strike, dec!(90));
        assert_eq!(factory().short_strangle(dec!(110), dec!(90)).unwrap().name(), "Short Strangle");
    }

    #[test]
    fn test_butterfly_quantities_and_names() {
        let call = factory()
            .butterfly_spread(dec!(90), dec!(100), dec!(110), OptionType::Call)
            .unwrap();
        assert_eq!(call.name(), "Call Butterfly Spread");
        let quantities: Vec<u32> = call.legs().iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 1]);
        assert_eq!(call.legs()[1].position, Position::Short);

        let put = factory()
            .butterfly_spread(dec!(90), dec!(100), dec!(110), OptionType::Put)
            .unwrap();
        assert_eq!(put.name(), "Put Butterfly Spread");
        // profit peaks at the body
        assert!(close(put.payoff_at(dec!(100)), dec!(10) + put.net_premium(), dec!(0.0000001)));
    }

    #[test]
    fn test_iron_condor_limited_risk() {
        let s = factory()
            .iron_condor(dec!(85), dec!(95), dec!(105), dec!(115))
            .unwrap();
        let info = s.get_strategy_info();
        assert_eq!(info.legs, 4);
        let credit = info.net_premium;
        assert!(credit > Decimal::ZERO);
        assert!(close(info.max_profit, credit, dec!(0.0000001)));
        assert!(close(info.max_loss, credit - dec!(10), dec!(0.0000001)));
        assert_eq!(info.break_even_points.len(), 2);
    }

    #[test]
    fn test_iron_butterfly_legs() {
        let s = factory().iron_butterfly(dec!(90), dec!(100), dec!(110)).unwrap();
        let kinds: Vec<(OptionType, Position)> =
            s.legs().iter().map(|l| (l.option_type, l.position)).collect();
        assert_eq!(
            kinds,
            vec![
                (OptionType::Put, Position::Long),
                (OptionType::Put, Position::Short),
                (OptionType::Call, Position::Short),
                (OptionType::Call, Position::Long),
            ]
        );
    }

    #[test]
    fn test_strikes_must_ascend() {
        let err = factory().bull_call_spread(dec!(105), dec!(95)).unwrap_err();
        assert_eq!(err.field(), Some("strikes"));
        let err = factory()
            .iron_condor(dec!(85), dec!(105), dec!(95), dec!(115))
            .unwrap_err();
        assert_eq!(err.field(), Some("strikes"));
    }

    #[test]
    fn test_build_dispatch_and_missing_strikes() {
        let f = factory();
        let built = f.build(StrategyKind::IronCondor, &[dec!(85), dec!(95), dec!(105), dec!(115)]).unwrap();
        assert_eq!(built.name(), "Iron Condor");

        let err = f.build(StrategyKind::LongStrangle, &[dec!(110)]).unwrap_err();
        assert_eq!(err.field(), Some("strikes"));
    }

    #[test]
    fn test_build_request_from_json() {
        let request: StrategyRequest = serde_json::from_value(serde_json::json!({
            "spot": 100.0,
            "time_to_maturity": 0.5,
            "risk_free_rate": 0.03,
            "volatility": 0.25,
            "kind": "bear_call_spread",
            "strikes": ["100", "110"]
        }))
        .unwrap();
        let s = StrategyFactory::build_request(&request).unwrap();
        assert_eq!(s.name(), "Bear Call Spread");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("iron-condor".parse::<StrategyKind>().unwrap(), StrategyKind::IronCondor);
        assert_eq!("Long Straddle".parse::<StrategyKind>().unwrap(), StrategyKind::LongStraddle);
        assert!("covered_call".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_factory_validates_market() {
        let err = StrategyFactory::new(0.0, 0.25, 0.05, 0.2).unwrap_err();
        assert_eq!(err.field(), Some("spot"));
        let err = StrategyFactory::new(100.0, 0.25, 0.9, 0.2).unwrap_err();
        assert_eq!(err.field(), Some("risk_free_rate"));
    }
}
