use crate::config::Settings;
use crate::ingest::error::ProviderError;
use crate::ingest::provider::{get_json_with_retries, HttpOptions};
use crate::ingest::types::{Fundamentals, QuoteItem};
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
const PROVIDER: &str = "alpha_vantage";

/// The default trending list, in display order.
pub const DEFAULT_TRENDING_SYMBOLS: [&str; 10] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "NFLX", "ADBE", "INTC",
];

#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    /// `Ok(None)` when the provider knows nothing about the symbol.
    async fn fetch_global_quote(&self, symbol: &str) -> Result<Option<QuoteItem>>;
}

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retries: u32,
}

impl AlphaVantageClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_alpha_vantage_api_key()?.to_string();
        let base_url = settings
            .alpha_vantage_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let opts = HttpOptions::from_env();
        let http = opts.build_client()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            retries: opts.retries,
        })
    }

    fn query_url(&self) -> Result<reqwest::Url> {
        let url = format!("{}/query", self.base_url.trim_end_matches('/'));
        reqwest::Url::parse(&url).with_context(|| format!("invalid ALPHA_VANTAGE_BASE_URL: {url}"))
    }

    async fn call(&self, function: &str, symbol: &str) -> Result<Value> {
        let raw = get_json_with_retries(
            &self.http,
            PROVIDER,
            self.query_url()?,
            &[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ],
            self.retries,
        )
        .await?;
        check_api_message(&raw)?;
        Ok(raw)
    }

    pub async fn fetch_overview(&self, symbol: &str) -> Result<Fundamentals> {
        let raw = self.call("OVERVIEW", symbol).await?;
        Ok(parse_overview(&raw))
    }
}

#[async_trait::async_trait]
impl QuoteSource for AlphaVantageClient {
    async fn fetch_global_quote(&self, symbol: &str) -> Result<Option<QuoteItem>> {
        let raw = self.call("GLOBAL_QUOTE", symbol).await?;
        parse_global_quote(&raw)
    }
}

/// Alpha Vantage reports throttling and bad requests with HTTP 200 and a message body.
fn check_api_message(raw: &Value) -> Result<()> {
    if let Some(msg) = raw.get("Error Message").and_then(Value::as_str) {
        return Err(ProviderError::new(PROVIDER, "not_found", msg)
            .with_raw_body(raw.to_string())
            .into());
    }
    for key in ["Note", "Information"] {
        if let Some(msg) = raw.get(key).and_then(Value::as_str) {
            return Err(ProviderError::new(PROVIDER, "rate_limit", msg)
                .with_raw_body(raw.to_string())
                .into());
        }
    }
    Ok(())
}

/// Numeric fields arrive as strings; `"None"`, `"-"` and blanks mean absent.
fn av_number(raw: &Value, key: &str) -> Option<f64> {
    let v = match raw.get(key)? {
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    v.filter(|v| v.is_finite())
}

pub(crate) fn parse_overview(raw: &Value) -> Fundamentals {
    Fundamentals {
        dividend_yield: av_number(raw, "DividendYield"),
        forward_pe: av_number(raw, "ForwardPE"),
    }
}

pub(crate) fn parse_global_quote(raw: &Value) -> Result<Option<QuoteItem>> {
    let Some(quote) = raw.get("Global Quote").and_then(Value::as_object) else {
        return Ok(None);
    };
    if quote.is_empty() {
        return Ok(None);
    }

    let symbol = quote
        .get("01. symbol")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .context("GLOBAL_QUOTE missing '01. symbol'")?
        .to_string();
    let price = quote
        .get("05. price")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .with_context(|| format!("GLOBAL_QUOTE for {symbol} has no numeric '05. price'"))?;
    let change_percent = quote
        .get("10. change percent")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Some(QuoteItem {
        symbol,
        price,
        change_percent,
    }))
}

/// Quotes for `symbols` in order, skipping symbols that fail, capped at `limit`.
pub async fn fetch_trending_quotes(
    source: &dyn QuoteSource,
    symbols: &[String],
    limit: usize,
    delay: Duration,
) -> Vec<QuoteItem> {
    let mut out = Vec::new();
    for (idx, symbol) in symbols.iter().enumerate() {
        if out.len() >= limit {
            break;
        }
        if idx != 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match source.fetch_global_quote(symbol).await {
            Ok(Some(q)) => out.push(q),
            Ok(None) => tracing::debug!(%symbol, "no global quote; skipping"),
            Err(err) => tracing::warn!(%symbol, error = %err, "global quote fetch failed; skipping"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn parses_overview_fundamentals() {
        let v = json!({
            "Symbol": "KO",
            "DividendYield": "0.0295",
            "ForwardPE": "22.27",
            "PERatio": "25.1"
        });
        let f = parse_overview(&v);
        assert_eq!(f.dividend_yield, Some(0.0295));
        assert_eq!(f.forward_pe, Some(22.27));
    }

    #[test]
    fn overview_placeholders_mean_absent() {
        let v = json!({"Symbol": "TSLA", "DividendYield": "None", "ForwardPE": "-"});
        assert_eq!(parse_overview(&v), Fundamentals::default());
        assert_eq!(parse_overview(&json!({})), Fundamentals::default());
    }

    #[test]
    fn parses_global_quote() {
        let v = json!({
            "Global Quote": {
                "01. symbol": "IBM",
                "05. price": "183.2500",
                "10. change percent": "-0.4712%"
            }
        });
        let q = parse_global_quote(&v).unwrap().unwrap();
        assert_eq!(q.symbol, "IBM");
        assert_eq!(q.price, 183.25);
        assert_eq!(q.change_percent, "-0.4712%");
    }

    #[test]
    fn empty_global_quote_is_none() {
        assert_eq!(parse_global_quote(&json!({"Global Quote": {}})).unwrap(), None);
        assert_eq!(parse_global_quote(&json!({})).unwrap(), None);
    }

    #[test]
    fn rate_limit_note_is_reported() {
        let v = json!({"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"});
        let err = check_api_message(&v).unwrap_err();
        let pe = err.downcast_ref::<ProviderError>().unwrap();
        assert_eq!(pe.stage, "rate_limit");
        assert!(check_api_message(&json!({"Global Quote": {}})).is_ok());
    }

    struct FakeQuotes(HashMap<&'static str, Result<Option<f64>, &'static str>>);

    #[async_trait::async_trait]
    impl QuoteSource for FakeQuotes {
        async fn fetch_global_quote(&self, symbol: &str) -> Result<Option<QuoteItem>> {
            match self.0.get(symbol) {
                Some(Ok(Some(price))) => Ok(Some(QuoteItem {
                    symbol: symbol.to_string(),
                    price: *price,
                    change_percent: "0.0000%".to_string(),
                })),
                Some(Ok(None)) | None => Ok(None),
                Some(Err(msg)) => Err(anyhow::anyhow!(*msg)),
            }
        }
    }

    #[tokio::test]
    async fn trending_skips_failures_and_stops_at_limit() {
        let fake = FakeQuotes(HashMap::from([
            ("AAPL", Ok(Some(190.0))),
            ("MSFT", Err("HTTP 500")),
            ("GOOGL", Ok(None)),
            ("AMZN", Ok(Some(180.0))),
            ("META", Ok(Some(500.0))),
        ]));
        let symbols: Vec<String> = ["AAPL", "MSFT", "GOOGL", "AMZN", "META"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let out = fetch_trending_quotes(&fake, &symbols, 2, Duration::ZERO).await;
        let got: Vec<_> = out.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(got, vec!["AAPL", "AMZN"]);
    }
}
