//! Batch-relative scoring.
//!
//! Each metric is normalized against the largest value observed in the batch:
//! direct metrics (growth, dividend yield) as `value / max * 100`, inverted
//! metrics (volatility, P/E) as `(1 - value / max) * 100`. The total score is a
//! fixed-weight linear combination of the four sub-scores.
//!
//! A metric whose batch maximum is missing or not strictly positive scores 0
//! for every record, and a record without a P/E ratio gets a P/E score of 0.
//! Scores are never clamped, so a negative growth under a positive maximum
//! produces a negative growth score.

use crate::domain::instrument::InstrumentRecord;
use anyhow::ensure;
use serde::{Deserialize, Serialize};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub growth: f64,
    pub volatility: f64,
    pub dividend: f64,
    pub pe: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            growth: 0.4,
            volatility: 0.3,
            dividend: 0.2,
            pe: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn try_new(growth: f64, volatility: f64, dividend: f64, pe: f64) -> anyhow::Result<Self> {
        let weights = Self {
            growth,
            volatility,
            dividend,
            pe,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, w) in [
            ("growth", self.growth),
            ("volatility", self.volatility),
            ("dividend", self.dividend),
            ("pe", self.pe),
        ] {
            ensure!(
                w.is_finite() && w >= 0.0,
                "{name} weight must be finite and >= 0 (got {w})"
            );
        }
        let sum = self.growth + self.volatility + self.dividend + self.pe;
        ensure!(
            (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
            "scoring weights must sum to 1.0 (got {sum})"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: InstrumentRecord,
    pub growth_score: f64,
    pub volatility_score: f64,
    pub dividend_score: f64,
    pub pe_score: f64,
    pub total_score: f64,
}

pub type ScoredBatch = Vec<ScoredRecord>;

#[derive(Debug, Clone, Copy)]
struct BatchMaxima {
    growth: Option<f64>,
    volatility: Option<f64>,
    dividend: Option<f64>,
    pe: Option<f64>,
}

impl BatchMaxima {
    fn of(batch: &[InstrumentRecord]) -> Self {
        Self {
            growth: max_of(batch.iter().map(|r| r.growth_pct)),
            volatility: max_of(batch.iter().map(|r| r.volatility_pct)),
            dividend: max_of(batch.iter().map(|r| r.dividend_yield_pct)),
            pe: max_of(batch.iter().filter_map(|r| r.pe_ratio)),
        }
    }
}

fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| match acc {
        Some(m) if m >= v => Some(m),
        _ => Some(v),
    })
}

/// `None` when the maximum cannot be used as a divisor.
fn usable(max: Option<f64>) -> Option<f64> {
    max.filter(|m| m.is_finite() && *m > 0.0)
}

fn direct_score(value: f64, max: Option<f64>) -> f64 {
    match usable(max) {
        Some(m) => value / m * 100.0,
        None => 0.0,
    }
}

fn inverted_score(value: f64, max: Option<f64>) -> f64 {
    match usable(max) {
        Some(m) => (1.0 - value / m) * 100.0,
        None => 0.0,
    }
}

pub fn normalize_and_score(batch: &[InstrumentRecord], weights: &ScoringWeights) -> ScoredBatch {
    let maxima = BatchMaxima::of(batch);
    let degenerate: Vec<&str> = [
        ("growth", maxima.growth),
        ("volatility", maxima.volatility),
        ("dividend", maxima.dividend),
        ("pe", maxima.pe),
    ]
    .into_iter()
    .filter(|(_, m)| usable(*m).is_none())
    .map(|(name, _)| name)
    .collect();
    if !batch.is_empty() && !degenerate.is_empty() {
        tracing::debug!(
            batch_len = batch.len(),
            metrics = ?degenerate,
            "batch maximum not positive; scoring metric as 0"
        );
    }

    batch
        .iter()
        .map(|record| {
            let growth_score = direct_score(record.growth_pct, maxima.growth);
            let volatility_score = inverted_score(record.volatility_pct, maxima.volatility);
            let dividend_score = direct_score(record.dividend_yield_pct, maxima.dividend);
            let pe_score = record
                .pe_ratio
                .map(|pe| inverted_score(pe, maxima.pe))
                .unwrap_or(0.0);

            let total_score = growth_score * weights.growth
                + volatility_score * weights.volatility
                + dividend_score * weights.dividend
                + pe_score * weights.pe;

            ScoredRecord {
                record: record.clone(),
                growth_score,
                volatility_score,
                dividend_score,
                pe_score,
                total_score,
            }
        })
        .collect()
}
