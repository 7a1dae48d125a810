use crate::domain::instrument::InstrumentRecord;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RISK_FREE_RATE_PCT: f64 = 2.0;

// One-sided 95% normal quantile.
const VAR_Z_95: f64 = 1.65;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub symbol: String,
    /// `None` when volatility is zero.
    pub sharpe_ratio: Option<f64>,
    pub value_at_risk_pct: f64,
}

pub fn risk_metrics(record: &InstrumentRecord, risk_free_rate_pct: f64) -> RiskMetrics {
    let sharpe_ratio = if record.volatility_pct > 0.0 {
        Some((record.growth_pct - risk_free_rate_pct) / record.volatility_pct)
    } else {
        None
    };

    RiskMetrics {
        symbol: record.symbol.clone(),
        sharpe_ratio,
        value_at_risk_pct: record.volatility_pct * VAR_Z_95,
    }
}

pub fn risk_analysis(batch: &[InstrumentRecord], risk_free_rate_pct: f64) -> Vec<RiskMetrics> {
    batch
        .iter()
        .map(|r| risk_metrics(r, risk_free_rate_pct))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sharpe_and_var() {
        let r = InstrumentRecord::try_new("AAPL", 22.0, 20.0, 0.5, Some(30.0)).unwrap();
        let m = risk_metrics(&r, DEFAULT_RISK_FREE_RATE_PCT);
        assert_eq!(m.sharpe_ratio, Some(1.0));
        assert!((m.value_at_risk_pct - 33.0).abs() < 1e-9);
    }

    #[test]
    fn zero_volatility_has_no_sharpe() {
        let r = InstrumentRecord::try_new("CASH", 2.0, 0.0, 0.0, None).unwrap();
        let m = risk_metrics(&r, DEFAULT_RISK_FREE_RATE_PCT);
        assert_eq!(m.sharpe_ratio, None);
        assert_eq!(m.value_at_risk_pct, 0.0);
    }
}
