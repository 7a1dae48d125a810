use crate::domain::instrument::InstrumentRecord;
use crate::ingest::types::{Fundamentals, PriceHistory};
use anyhow::ensure;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

// Two returns are the minimum for a sample standard deviation.
const MIN_CLOSES: usize = 3;

/// Percentage change from the first to the last close.
pub fn growth_pct(closes: &[f64]) -> anyhow::Result<f64> {
    ensure!(closes.len() >= 2, "need at least 2 closes (got {})", closes.len());
    let first = closes[0];
    let last = closes[closes.len() - 1];
    ensure!(first > 0.0, "first close must be positive (got {first})");
    Ok((last / first - 1.0) * 100.0)
}

fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualized sample standard deviation of daily returns, in percent.
pub fn annualized_volatility_pct(closes: &[f64]) -> anyhow::Result<f64> {
    let returns = daily_returns(closes);
    ensure!(
        returns.len() >= 2,
        "need at least 2 daily returns for volatility (got {})",
        returns.len()
    );
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Ok(var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
}

pub fn derive_record(
    history: &PriceHistory,
    fundamentals: &Fundamentals,
) -> anyhow::Result<InstrumentRecord> {
    let closes: Vec<f64> = history
        .closes
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .collect();
    ensure!(
        closes.len() >= MIN_CLOSES,
        "insufficient price history for {}: {} valid closes",
        history.symbol,
        closes.len()
    );

    let growth = growth_pct(&closes)?;
    let volatility = annualized_volatility_pct(&closes)?;
    let dividend_yield_pct = fundamentals.dividend_yield.unwrap_or(0.0) * 100.0;

    InstrumentRecord::try_new(
        history.symbol.clone(),
        growth,
        volatility,
        dividend_yield_pct,
        fundamentals.forward_pe,
    )
}
