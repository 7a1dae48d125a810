use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use insights_core::analysis::{run_analysis, score_jointly, AnalysisConfig, AnalysisReport};
use insights_core::domain::instrument::{validate_batch, InstrumentRecord};
use insights_core::domain::recommendation::{recommend, RecommendationBatch};
use insights_core::domain::scoring::{normalize_and_score, ScoredBatch};
use insights_core::domain::suggestion::{suggest_similar, SuggestionBatch};
use insights_core::domain::tickers::parse_ticker_input;
use insights_core::ingest::alpha_vantage::{fetch_trending_quotes, AlphaVantageClient, QuoteSource};
use insights_core::ingest::provider::{HttpMarketDataProvider, MarketDataProvider};
use insights_core::ingest::types::QuoteItem;

const DEFAULT_TRENDING_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = insights_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let config = AnalysisConfig::from_env()?;
    let provider = HttpMarketDataProvider::from_settings(&settings)?;

    let quotes: Option<Arc<dyn QuoteSource>> = match AlphaVantageClient::from_settings(&settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "quote source unavailable; /trending will return 503");
            None
        }
    };

    let state = AppState {
        provider: Arc::new(provider),
        quotes,
        config: Arc::new(config),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/analyze", post(analyze))
        .route("/score", post(score))
        .route("/recommend", post(recommend_batch))
        .route("/suggest", post(suggest))
        .route("/trending", get(trending))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    provider: Arc<dyn MarketDataProvider>,
    quotes: Option<Arc<dyn QuoteSource>>,
    config: Arc<AnalysisConfig>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    /// Comma-separated symbols; blank means the configured default list.
    #[serde(default)]
    tickers: Option<String>,
    #[serde(default)]
    include_suggestions: bool,
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    batch: Vec<InstrumentRecord>,
}

#[derive(Debug, Serialize)]
struct RecommendResponse {
    scored: ScoredBatch,
    recommendations: RecommendationBatch,
}

#[derive(Debug, Deserialize)]
struct SuggestRequest {
    current: Vec<InstrumentRecord>,
    candidates: Vec<InstrumentRecord>,
}

#[derive(Debug, Deserialize)]
struct TrendingQuery {
    limit: Option<usize>,
}

fn bad_request(err: anyhow::Error) -> StatusCode {
    tracing::warn!(error = %err, "rejected request");
    StatusCode::BAD_REQUEST
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, StatusCode> {
    let tickers = match req.tickers.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => parse_ticker_input(s),
        _ => state.config.default_tickers.clone(),
    };
    if tickers.is_empty() {
        return Err(bad_request(anyhow::anyhow!("no ticker symbols given")));
    }

    let report = run_analysis(
        state.provider.as_ref(),
        tickers,
        req.include_suggestions,
        &state.config,
    )
    .await;
    Ok(Json(report))
}

async fn score(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<ScoredBatch>, StatusCode> {
    validate_batch(&req.batch).map_err(bad_request)?;
    Ok(Json(normalize_and_score(&req.batch, &state.config.weights)))
}

async fn recommend_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<RecommendResponse>, StatusCode> {
    validate_batch(&req.batch).map_err(bad_request)?;
    let scored = normalize_and_score(&req.batch, &state.config.weights);
    let recommendations = recommend(&scored, &state.config.recommend);
    Ok(Json(RecommendResponse {
        scored,
        recommendations,
    }))
}

async fn suggest(
    State(state): State<AppState>,
    Json(req): Json<SuggestRequest>,
) -> Result<Json<SuggestionBatch>, StatusCode> {
    validate_batch(&req.current).map_err(bad_request)?;
    validate_batch(&req.candidates).map_err(bad_request)?;

    let held: HashSet<&str> = req.current.iter().map(|r| r.symbol.as_str()).collect();
    let fresh: Vec<InstrumentRecord> = req
        .candidates
        .iter()
        .filter(|c| !held.contains(c.symbol.as_str()))
        .cloned()
        .collect();

    let (current, candidates) = score_jointly(&req.current, &fresh, &state.config.weights);
    Ok(Json(suggest_similar(
        &current,
        &candidates,
        state.config.suggestion_ratio,
    )))
}

async fn trending(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Result<Json<Vec<QuoteItem>>, StatusCode> {
    let Some(source) = &state.quotes else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let limit = q.limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
    let symbols = &state.config.candidate_tickers;
    let quotes =
        fetch_trending_quotes(source.as_ref(), symbols, limit, state.config.collect.delay).await;

    if quotes.is_empty() && !symbols.is_empty() && limit > 0 {
        let err = anyhow::anyhow!("no trending quotes could be fetched");
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "trending quotes unavailable");
        return Err(StatusCode::BAD_GATEWAY);
    }
    Ok(Json(quotes))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &insights_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use insights_core::ingest::types::{Fundamentals, PriceHistory};
    use serde_json::json;

    struct OfflineProvider;

    #[async_trait::async_trait]
    impl MarketDataProvider for OfflineProvider {
        fn provider_name(&self) -> &'static str {
            "offline"
        }

        async fn fetch_price_history(&self, symbol: &str) -> anyhow::Result<PriceHistory> {
            anyhow::bail!("offline: no history for {symbol}")
        }

        async fn fetch_fundamentals(&self, _symbol: &str) -> anyhow::Result<Fundamentals> {
            Ok(Fundamentals::default())
        }
    }

    fn state() -> AppState {
        let mut config = AnalysisConfig::default();
        config.collect.delay = std::time::Duration::ZERO;
        AppState {
            provider: Arc::new(OfflineProvider),
            quotes: None,
            config: Arc::new(config),
        }
    }

    fn batch_json() -> serde_json::Value {
        json!([
            {"symbol": "A", "growth_pct": 10.0, "volatility_pct": 5.0, "dividend_yield_pct": 2.0, "pe_ratio": 15.0},
            {"symbol": "B", "growth_pct": 20.0, "volatility_pct": 10.0, "dividend_yield_pct": 4.0, "pe_ratio": 10.0}
        ])
    }

    #[tokio::test]
    async fn score_endpoint_scores_batch() {
        let req: BatchRequest = serde_json::from_value(json!({"batch": batch_json()})).unwrap();
        let Json(scored) = score(State(state()), Json(req)).await.unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[1].growth_score, 100.0);
        assert_eq!(scored[0].volatility_score, 50.0);
    }

    #[tokio::test]
    async fn score_endpoint_rejects_invalid_records() {
        let req: BatchRequest = serde_json::from_value(json!({"batch": [
            {"symbol": "A", "growth_pct": 1.0, "volatility_pct": -5.0, "dividend_yield_pct": 0.0}
        ]}))
        .unwrap();
        let res = score(State(state()), Json(req)).await;
        assert_eq!(res.unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recommend_endpoint_returns_both_tables() {
        let req: BatchRequest = serde_json::from_value(json!({"batch": batch_json()})).unwrap();
        let Json(res) = recommend_batch(State(state()), Json(req)).await.unwrap();
        assert_eq!(res.scored.len(), 2);
        assert_eq!(res.recommendations.len(), 2);
        assert!(res.recommendations.iter().all(|r| r.recommended));
    }

    #[tokio::test]
    async fn suggest_endpoint_filters_candidates() {
        let req: SuggestRequest = serde_json::from_value(json!({
            "current": batch_json(),
            "candidates": [
                {"symbol": "C", "growth_pct": 20.0, "volatility_pct": 5.0, "dividend_yield_pct": 4.0, "pe_ratio": 10.0},
                {"symbol": "D", "growth_pct": 0.0, "volatility_pct": 10.0, "dividend_yield_pct": 0.0}
            ]
        }))
        .unwrap();
        let Json(out) = suggest(State(state()), Json(req)).await.unwrap();
        let symbols: Vec<_> = out.iter().map(|s| s.record.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["C"]);
    }

    #[tokio::test]
    async fn suggest_endpoint_skips_held_symbols() {
        let req: SuggestRequest = serde_json::from_value(json!({
            "current": batch_json(),
            "candidates": [
                {"symbol": "B", "growth_pct": 20.0, "volatility_pct": 10.0, "dividend_yield_pct": 4.0, "pe_ratio": 10.0},
                {"symbol": "E", "growth_pct": 18.0, "volatility_pct": 9.0, "dividend_yield_pct": 4.0, "pe_ratio": 10.0}
            ]
        }))
        .unwrap();
        let Json(out) = suggest(State(state()), Json(req)).await.unwrap();
        let symbols: Vec<_> = out.iter().map(|s| s.record.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["E"]);
    }

    #[tokio::test]
    async fn analyze_with_offline_provider_reports_failures() {
        let req = AnalyzeRequest {
            tickers: Some("AAPL, KO".to_string()),
            include_suggestions: false,
        };
        let Json(report) = analyze(State(state()), Json(req)).await.unwrap();
        assert!(report.scored.is_empty());
        assert_eq!(report.failures.len(), 2);
    }

    #[tokio::test]
    async fn analyze_rejects_only_commas() {
        let req = AnalyzeRequest {
            tickers: Some(" , ,".to_string()),
            include_suggestions: false,
        };
        let res = analyze(State(state()), Json(req)).await;
        assert_eq!(res.unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trending_without_quote_source_is_unavailable() {
        let res = trending(State(state()), Query(TrendingQuery { limit: None })).await;
        assert_eq!(res.unwrap_err(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
