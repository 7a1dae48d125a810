use crate::config::Settings;
use crate::ingest::alpha_vantage::AlphaVantageClient;
use crate::ingest::error::ProviderError;
use crate::ingest::types::{Fundamentals, PriceHistory};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_PRICE_HISTORY_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const LOOKBACK_RANGE: &str = "1y";
const USER_AGENT: &str = concat!("capital-insights/", env!("CARGO_PKG_VERSION"));

const PROVIDER_YAHOO: &str = "yahoo_chart";

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_price_history(&self, symbol: &str) -> Result<PriceHistory>;

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals>;
}

/// Shared knobs for the HTTP adapters.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub retries: u32,
}

impl HttpOptions {
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("MARKET_DATA_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        Self {
            timeout: Duration::from_secs(timeout_secs),
            retries: retries.max(1),
        }
    }

    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")
    }
}

pub(crate) async fn get_json_once(
    http: &reqwest::Client,
    provider: &'static str,
    url: reqwest::Url,
    query: &[(&str, &str)],
) -> Result<Value> {
    let res = http.get(url).query(query).send().await.map_err(|e| {
        ProviderError::new(provider, "request", format!("request failed: {e}"))
    })?;

    let status = res.status();
    let text = res
        .text()
        .await
        .with_context(|| format!("failed to read {provider} response"))?;

    if !status.is_success() {
        return Err(ProviderError::new(provider, "http", format!("HTTP {status}"))
            .with_status(status.as_u16())
            .with_raw_body(text)
            .into());
    }

    serde_json::from_str::<Value>(&text).map_err(|e| {
        ProviderError::new(provider, "parse", format!("response is not valid JSON: {e}"))
            .with_raw_body(text)
            .into()
    })
}

pub(crate) async fn get_json_with_retries(
    http: &reqwest::Client,
    provider: &'static str,
    url: reqwest::Url,
    query: &[(&str, &str)],
    retries: u32,
) -> Result<Value> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match get_json_once(http, provider, url.clone(), query).await {
            Ok(v) => return Ok(v),
            Err(err) => {
                let retryable = err
                    .downcast_ref::<ProviderError>()
                    .map_or(true, ProviderError::is_retryable);
                if !retryable || attempt >= retries {
                    return Err(err);
                }
                let backoff = Duration::from_secs(1 << (attempt - 1));
                tracing::warn!(provider, attempt, ?backoff, error = %err, "market data fetch failed; retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[derive(Debug)]
pub struct HttpMarketDataProvider {
    http: reqwest::Client,
    price_history_base_url: String,
    retries: u32,
    fundamentals: Option<AlphaVantageClient>,
}

impl HttpMarketDataProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let opts = HttpOptions::from_env();
        let http = opts.build_client()?;

        let price_history_base_url = settings
            .price_history_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRICE_HISTORY_BASE_URL.to_string());

        let fundamentals = match settings.alpha_vantage_api_key {
            Some(_) => Some(AlphaVantageClient::from_settings(settings)?),
            None => {
                tracing::info!("ALPHA_VANTAGE_API_KEY not set; fundamentals default to none");
                None
            }
        };

        Ok(Self {
            http,
            price_history_base_url,
            retries: opts.retries,
            fundamentals,
        })
    }

    fn chart_url(&self, symbol: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.price_history_base_url)
            .with_context(|| format!("invalid PRICE_HISTORY_BASE_URL: {}", self.price_history_base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("PRICE_HISTORY_BASE_URL cannot be a base URL"))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpMarketDataProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER_YAHOO
    }

    async fn fetch_price_history(&self, symbol: &str) -> Result<PriceHistory> {
        let url = self.chart_url(symbol)?;
        let raw = get_json_with_retries(
            &self.http,
            PROVIDER_YAHOO,
            url,
            &[("range", LOOKBACK_RANGE), ("interval", "1d")],
            self.retries,
        )
        .await?;
        parse_chart(symbol, raw)
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        match &self.fundamentals {
            Some(av) => av.fetch_overview(symbol).await,
            None => Ok(Fundamentals::default()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub(crate) fn parse_chart(symbol: &str, raw: Value) -> Result<PriceHistory> {
    let env = serde_json::from_value::<ChartEnvelope>(raw).map_err(|e| {
        ProviderError::new(PROVIDER_YAHOO, "parse", format!("unexpected chart shape: {e}"))
    })?;

    if let Some(err) = env.chart.error {
        return Err(ProviderError::new(
            PROVIDER_YAHOO,
            "not_found",
            format!("{symbol}: {} ({})", err.description, err.code),
        )
        .into());
    }

    let result = env
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::new(PROVIDER_YAHOO, "not_found", format!("{symbol}: empty chart result")))?;

    let closes: Vec<f64> = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close.into_iter().flatten().collect())
        .unwrap_or_default();

    anyhow::ensure!(!closes.is_empty(), "no closes returned for {symbol}");

    Ok(PriceHistory {
        symbol: symbol.to_string(),
        closes,
    })
}
