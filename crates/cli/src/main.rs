use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use insights_core::analysis::{run_analysis, AnalysisConfig};
use insights_core::domain::instrument::{validate_batch, InstrumentRecord};
use insights_core::domain::recommendation::recommend;
use insights_core::domain::scoring::normalize_and_score;
use insights_core::domain::tickers::parse_ticker_input;
use insights_core::ingest::alpha_vantage::{fetch_trending_quotes, AlphaVantageClient};
use insights_core::ingest::provider::HttpMarketDataProvider;

mod render;

#[derive(Debug, Parser)]
#[command(name = "insights")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch, score and recommend a comma-separated list of symbols.
    Analyze {
        /// e.g. "AAPL, MSFT, KO, VOLV-B.ST". Defaults to DEFAULT_TICKERS.
        #[arg(long)]
        tickers: Option<String>,

        /// Also score the candidate list and suggest comparable symbols.
        #[arg(long)]
        suggest: bool,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Score a batch read from a JSON file (array of instrument records). No network.
    Score {
        #[arg(long)]
        input: std::path::PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Show live quotes for the candidate list.
    Trending {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = insights_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let config = AnalysisConfig::from_env()?;

    let res = run(args.command, &settings, &config).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "command failed");
    }
    res
}

async fn run(
    command: Command,
    settings: &insights_core::config::Settings,
    config: &AnalysisConfig,
) -> anyhow::Result<()> {
    match command {
        Command::Analyze {
            tickers,
            suggest,
            json,
        } => {
            let tickers = match tickers.as_deref().map(str::trim) {
                Some(s) if !s.is_empty() => parse_ticker_input(s),
                _ => config.default_tickers.clone(),
            };
            anyhow::ensure!(!tickers.is_empty(), "no ticker symbols given");

            let provider = HttpMarketDataProvider::from_settings(settings)?;
            let report = run_analysis(&provider, tickers, suggest, config).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::analysis_report(&report));
            }
        }
        Command::Score { input, json } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let batch: Vec<InstrumentRecord> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of instrument records", input.display()))?;
            validate_batch(&batch)?;

            let scored = normalize_and_score(&batch, &config.weights);
            let recommendations = recommend(&scored, &config.recommend);

            if json {
                let out = serde_json::json!({
                    "scored": scored,
                    "recommendations": recommendations,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print!("{}", render::scored_table(&scored));
                print!("{}", render::recommendation_table(&recommendations));
            }
        }
        Command::Trending { limit } => {
            let client = AlphaVantageClient::from_settings(settings)?;
            let quotes = fetch_trending_quotes(
                &client,
                &config.candidate_tickers,
                limit,
                config.collect.delay,
            )
            .await;
            anyhow::ensure!(
                !quotes.is_empty() || limit == 0,
                "could not fetch any trending quotes"
            );
            print!("{}", render::quote_table(&quotes));
        }
    }
    Ok(())
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

    #[test]
    fn parses_analyze_flags() {
        let args = Args::try_parse_from(["insights", "analyze", "--tickers", "AAPL,KO", "--suggest"]).unwrap();
        match args.command {
            Command::Analyze {
                tickers,
                suggest,
                json,
            } => {
                assert_eq!(tickers.as_deref(), Some("AAPL,KO"));
                assert!(suggest);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn trending_limit_defaults_to_ten() {
        let args = Args::try_parse_from(["insights", "trending"]).unwrap();
        assert!(matches!(args.command, Command::Trending { limit: 10 }));
    }

    #[test]
    fn score_requires_input() {
        assert!(Args::try_parse_from(["insights", "score"]).is_err());
    }
}
