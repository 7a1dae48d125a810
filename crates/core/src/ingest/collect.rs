use crate::domain::instrument::InstrumentRecord;
use crate::ingest::metrics;
use crate::ingest::provider::MarketDataProvider;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_FETCH_DELAY_MS: u64 = 1000;
const MAX_LOGGED_FAILURES: usize = 10;

#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Pause between instruments to stay under provider rate limits.
    pub delay: Duration,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_FETCH_DELAY_MS),
        }
    }
}

impl CollectOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut out = Self::default();
        if let Some(s) = lookup("FETCH_DELAY_MS") {
            if let Ok(ms) = s.parse::<u64>() {
                out.delay = Duration::from_millis(ms);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct CollectOutcome {
    pub batch: Vec<InstrumentRecord>,
    pub failures: Vec<FetchFailure>,
}

pub async fn fetch_instrument(
    provider: &dyn MarketDataProvider,
    symbol: &str,
) -> anyhow::Result<InstrumentRecord> {
    let history = provider
        .fetch_price_history(symbol)
        .await
        .with_context(|| format!("price history for {symbol}"))?;
    let fundamentals = provider
        .fetch_fundamentals(symbol)
        .await
        .with_context(|| format!("fundamentals for {symbol}"))?;
    metrics::derive_record(&history, &fundamentals)
}

/// Fetches instruments one at a time. A failing instrument is logged and left out.
pub async fn collect_batch(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    opts: &CollectOptions,
) -> CollectOutcome {
    let mut out = CollectOutcome::default();
    let total = symbols.len();

    for (idx, symbol) in symbols.iter().enumerate() {
        if idx != 0 && !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }

        match fetch_instrument(provider, symbol).await {
            Ok(record) => out.batch.push(record),
            Err(err) => {
                if out.failures.len() < MAX_LOGGED_FAILURES {
                    tracing::warn!(
                        idx,
                        %symbol,
                        provider = provider.provider_name(),
                        error = %format!("{err:#}"),
                        "instrument fetch failed; skipping"
                    );
                }
                out.failures.push(FetchFailure {
                    symbol: symbol.clone(),
                    error: format!("{err:#}"),
                });
            }
        }
    }

    tracing::info!(
        total,
        items = out.batch.len(),
        failures = out.failures.len(),
        provider = provider.provider_name(),
        "batch collected"
    );
    out
}
