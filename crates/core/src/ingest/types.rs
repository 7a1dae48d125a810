use serde::{Deserialize, Serialize};

/// Daily closes over the lookback window, oldest first. Gaps are already dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub closes: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Trailing dividend yield as a fraction (0.031 == 3.1%).
    pub dividend_yield: Option<f64>,
    pub forward_pe: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub symbol: String,
    pub price: f64,
    /// Verbatim from the provider, e.g. `"-0.4712%"`.
    pub change_percent: String,
}
