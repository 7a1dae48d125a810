//! End-to-end analysis of one user-supplied ticker list.

use crate::domain::chart::{risk_reward_points, RiskRewardPoint};
use crate::domain::instrument::InstrumentRecord;
use crate::domain::recommendation::{recommend, Locale, RecommendOptions, RecommendationBatch};
use crate::domain::risk::{risk_analysis, RiskMetrics, DEFAULT_RISK_FREE_RATE_PCT};
use crate::domain::scoring::{normalize_and_score, ScoredBatch, ScoringWeights};
use crate::domain::suggestion::{suggest_similar, SuggestionBatch, DEFAULT_SUGGESTION_RATIO};
use crate::domain::tickers::{apply_market_suffix, parse_ticker_input, MarketSuffixPolicy};
use crate::ingest::alpha_vantage::DEFAULT_TRENDING_SYMBOLS;
use crate::ingest::collect::{collect_batch, CollectOptions, FetchFailure};
use crate::ingest::provider::MarketDataProvider;
use anyhow::{ensure, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TICKERS: &str = "AAPL, MSFT, KO, VOLV-B.ST, ERIC-B.ST";

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub weights: ScoringWeights,
    pub recommend: RecommendOptions,
    pub suggestion_ratio: f64,
    pub risk_free_rate_pct: f64,
    pub suffix_policy: MarketSuffixPolicy,
    pub collect: CollectOptions,
    pub default_tickers: Vec<String>,
    pub candidate_tickers: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            recommend: RecommendOptions::default(),
            suggestion_ratio: DEFAULT_SUGGESTION_RATIO,
            risk_free_rate_pct: DEFAULT_RISK_FREE_RATE_PCT,
            suffix_policy: MarketSuffixPolicy::default(),
            collect: CollectOptions::default(),
            default_tickers: parse_ticker_input(DEFAULT_TICKERS),
            candidate_tickers: DEFAULT_TRENDING_SYMBOLS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn lookup_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<f64>> {
    match lookup(key) {
        Some(s) if !s.trim().is_empty() => {
            let v = s
                .trim()
                .parse::<f64>()
                .with_context(|| format!("{key} must be a number (got {s:?})"))?;
            ensure!(v.is_finite(), "{key} must be finite (got {v})");
            Ok(Some(v))
        }
        _ => Ok(None),
    }
}

impl AnalysisConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut out = Self::default();

        let defaults = out.weights;
        out.weights = ScoringWeights::try_new(
            lookup_f64(&lookup, "SCORE_WEIGHT_GROWTH")?.unwrap_or(defaults.growth),
            lookup_f64(&lookup, "SCORE_WEIGHT_VOLATILITY")?.unwrap_or(defaults.volatility),
            lookup_f64(&lookup, "SCORE_WEIGHT_DIVIDEND")?.unwrap_or(defaults.dividend),
            lookup_f64(&lookup, "SCORE_WEIGHT_PE")?.unwrap_or(defaults.pe),
        )
        .context("invalid SCORE_WEIGHT_* configuration")?;

        if let Some(v) = lookup_f64(&lookup, "PE_THRESHOLD")? {
            out.recommend.pe_threshold = v;
        }
        if let Some(s) = lookup("RECOMMENDATION_LOCALE") {
            out.recommend.locale = s.parse::<Locale>()?;
        }
        if let Some(v) = lookup_f64(&lookup, "SUGGESTION_RATIO")? {
            ensure!(
                (0.0..=1.0).contains(&v),
                "SUGGESTION_RATIO must be within 0..=1 (got {v})"
            );
            out.suggestion_ratio = v;
        }
        if let Some(v) = lookup_f64(&lookup, "RISK_FREE_RATE_PCT")? {
            out.risk_free_rate_pct = v;
        }

        if let Some(mode) = lookup("MARKET_SUFFIX_MODE") {
            let suffix = lookup("MARKET_DEFAULT_SUFFIX");
            out.suffix_policy = MarketSuffixPolicy::from_mode(&mode, suffix.as_deref())?;
        }

        out.collect = CollectOptions::from_lookup(&lookup);

        if let Some(s) = lookup("DEFAULT_TICKERS") {
            let parsed = parse_ticker_input(&s);
            if !parsed.is_empty() {
                out.default_tickers = parsed;
            }
        }
        if let Some(s) = lookup("CANDIDATE_TICKERS") {
            out.candidate_tickers = parse_ticker_input(&s);
        }

        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub tickers: Vec<String>,
    pub scored: ScoredBatch,
    pub recommendations: RecommendationBatch,
    pub risk: Vec<RiskMetrics>,
    pub chart: Vec<RiskRewardPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<SuggestionBatch>,
    pub failures: Vec<FetchFailure>,
}

/// Scores both batches as one so their totals share the same maxima.
pub fn score_jointly(
    current: &[InstrumentRecord],
    candidates: &[InstrumentRecord],
    weights: &ScoringWeights,
) -> (ScoredBatch, ScoredBatch) {
    let union: Vec<InstrumentRecord> = current.iter().chain(candidates).cloned().collect();
    let mut scored = normalize_and_score(&union, weights);
    let candidates_scored = scored.split_off(current.len());
    (scored, candidates_scored)
}

pub async fn run_analysis(
    provider: &dyn MarketDataProvider,
    tickers: Vec<String>,
    include_suggestions: bool,
    config: &AnalysisConfig,
) -> AnalysisReport {
    let analysis_id = Uuid::new_v4();
    let tickers = apply_market_suffix(tickers, &config.suffix_policy);
    tracing::info!(%analysis_id, tickers = ?tickers, include_suggestions, "analysis started");

    let collected = collect_batch(provider, &tickers, &config.collect).await;
    let mut failures = collected.failures;
    let batch = collected.batch;

    let scored = normalize_and_score(&batch, &config.weights);
    let recommendations = recommend(&scored, &config.recommend);
    let risk = risk_analysis(&batch, config.risk_free_rate_pct);
    let chart = risk_reward_points(&scored);

    let suggestions = if include_suggestions {
        let held: Vec<&str> = tickers.iter().map(String::as_str).collect();
        let candidate_symbols: Vec<String> = config
            .candidate_tickers
            .iter()
            .filter(|c| !held.contains(&c.as_str()))
            .cloned()
            .collect();
        let candidates = collect_batch(provider, &candidate_symbols, &config.collect).await;
        failures.extend(candidates.failures);

        let (current_scored, candidate_scored) =
            score_jointly(&batch, &candidates.batch, &config.weights);
        Some(suggest_similar(
            &current_scored,
            &candidate_scored,
            config.suggestion_ratio,
        ))
    } else {
        None
    };

    tracing::info!(
        %analysis_id,
        scored = scored.len(),
        recommended = recommendations.iter().filter(|r| r.recommended).count(),
        suggestions = ?suggestions.as_ref().map(Vec::len),
        failures = failures.len(),
        "analysis finished"
    );

    AnalysisReport {
        analysis_id,
        generated_at: Utc::now(),
        tickers,
        scored,
        recommendations,
        risk,
        chart,
        suggestions,
        failures,
    }
}
