use crate::domain::scoring::ScoredRecord;
use serde::{Deserialize, Serialize};

/// One bubble of the risk-vs-reward scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRewardPoint {
    pub symbol: String,
    pub x_volatility_pct: f64,
    pub y_growth_pct: f64,
    pub size_total_score: f64,
    pub color_dividend_yield_pct: f64,
}

pub fn risk_reward_points(scored: &[ScoredRecord]) -> Vec<RiskRewardPoint> {
    scored
        .iter()
        .map(|s| RiskRewardPoint {
            symbol: s.record.symbol.clone(),
            x_volatility_pct: s.record.volatility_pct,
            y_growth_pct: s.record.growth_pct,
            size_total_score: s.total_score,
            color_dividend_yield_pct: s.record.dividend_yield_pct,
        })
        .collect()
}
