pub mod factory;
pub mod legs;

pub use factory::{StrategyFactory, StrategyKind, StrategyRequest};
pub use legs::{OptionLeg, OptionStrategy, Position, RiskReward, StrategyInfo};
