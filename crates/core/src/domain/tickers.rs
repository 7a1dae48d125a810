use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_MARKET_SUFFIX: &str = ".ST";

/// How bare symbols (no `.`) are treated before retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "suffix", rename_all = "snake_case")]
pub enum MarketSuffixPolicy {
    /// Symbols pass through untouched; bare symbols are read as US listings.
    #[default]
    Preserve,
    /// Bare symbols get the suffix appended, e.g. `VOLV-B` -> `VOLV-B.ST`.
    AppendDefault(String),
}

impl MarketSuffixPolicy {
    pub fn from_mode(mode: &str, suffix: Option<&str>) -> anyhow::Result<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "" | "preserve" => Ok(Self::Preserve),
            "append" => {
                let suffix = suffix
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_MARKET_SUFFIX);
                let suffix = if suffix.starts_with('.') {
                    suffix.to_string()
                } else {
                    format!(".{suffix}")
                };
                Ok(Self::AppendDefault(suffix.to_ascii_uppercase()))
            }
            other => anyhow::bail!("unsupported market suffix mode: {other}"),
        }
    }
}

/// Splits a comma-separated symbol list. Entries are trimmed but otherwise kept
/// verbatim; order is kept, blanks and exact repeats dropped.
pub fn parse_ticker_input(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

pub fn apply_market_suffix(tickers: Vec<String>, policy: &MarketSuffixPolicy) -> Vec<String> {
    match policy {
        MarketSuffixPolicy::Preserve => tickers,
        MarketSuffixPolicy::AppendDefault(suffix) => tickers
            .into_iter()
            .map(|t| if t.contains('.') { t } else { format!("{t}{suffix}") })
            .collect(),
    }
}
