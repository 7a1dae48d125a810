use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Raw per-ticker metrics for one analysis batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub symbol: String,
    pub growth_pct: f64,
    pub volatility_pct: f64,
    pub dividend_yield_pct: f64,
    #[serde(default)]
    pub pe_ratio: Option<f64>,
}

impl InstrumentRecord {
    pub fn try_new(
        symbol: impl Into<String>,
        growth_pct: f64,
        volatility_pct: f64,
        dividend_yield_pct: f64,
        pe_ratio: Option<f64>,
    ) -> anyhow::Result<Self> {
        let record = Self {
            symbol: symbol.into().trim().to_string(),
            growth_pct,
            volatility_pct,
            dividend_yield_pct,
            pe_ratio,
        };
        record.validate()?;
        Ok(record)
    }

    /// Boundary check for records that arrive as JSON rather than via `try_new`.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.symbol.trim().is_empty(), "symbol must be non-empty");
        ensure!(
            self.growth_pct.is_finite(),
            "growth_pct must be finite for {} (got {})",
            self.symbol,
            self.growth_pct
        );
        ensure!(
            self.volatility_pct.is_finite() && self.volatility_pct >= 0.0,
            "volatility_pct must be finite and >= 0 for {} (got {})",
            self.symbol,
            self.volatility_pct
        );
        ensure!(
            self.dividend_yield_pct.is_finite() && self.dividend_yield_pct >= 0.0,
            "dividend_yield_pct must be finite and >= 0 for {} (got {})",
            self.symbol,
            self.dividend_yield_pct
        );
        if let Some(pe) = self.pe_ratio {
            ensure!(
                pe.is_finite(),
                "pe_ratio must be finite when present for {} (got {pe})",
                self.symbol
            );
        }
        Ok(())
    }
}

pub fn validate_batch(batch: &[InstrumentRecord]) -> anyhow::Result<()> {
    for record in batch {
        record.validate()?;
    }
    Ok(())
}
