use crate::domain::scoring::ScoredRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PE_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Sv,
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "sv" | "swedish" | "svenska" => Ok(Self::Sv),
            other => anyhow::bail!("unsupported locale: {other}"),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::En => f.write_str("en"),
            Self::Sv => f.write_str("sv"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendOptions {
    pub pe_threshold: f64,
    pub locale: Locale,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            pe_threshold: DEFAULT_PE_THRESHOLD,
            locale: Locale::default(),
        }
    }
}

/// A reason that speaks for buying an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Argument {
    AboveAverage { total_score: f64, average: f64 },
    PositiveGrowth { growth_pct: f64 },
    PaysDividend { dividend_yield_pct: f64 },
    LowPe { pe_ratio: f64, threshold: f64 },
}

impl Argument {
    pub fn phrase(&self, locale: Locale) -> String {
        match (self, locale) {
            (Self::AboveAverage { total_score, average }, Locale::En) => format!(
                "Total score ({total_score:.2}) is above the batch average ({average:.2})."
            ),
            (Self::AboveAverage { total_score, average }, Locale::Sv) => format!(
                "Total Score ({total_score:.2}) är högre än genomsnittet ({average:.2})."
            ),
            (Self::PositiveGrowth { growth_pct }, Locale::En) => {
                format!("Positive growth ({growth_pct:.2}%).")
            }
            (Self::PositiveGrowth { growth_pct }, Locale::Sv) => {
                format!("Positiv tillväxt ({growth_pct:.2}%).")
            }
            (Self::PaysDividend { dividend_yield_pct }, Locale::En) => {
                format!("Pays a dividend ({dividend_yield_pct:.2}% yield).")
            }
            (Self::PaysDividend { dividend_yield_pct }, Locale::Sv) => {
                format!("Ger utdelning ({dividend_yield_pct:.2}% direktavkastning).")
            }
            (Self::LowPe { pe_ratio, threshold }, Locale::En) => {
                format!("P/E ratio ({pe_ratio:.2}) is below {threshold}.")
            }
            (Self::LowPe { pe_ratio, threshold }, Locale::Sv) => {
                format!("P/E-talet ({pe_ratio:.2}) är lägre än {threshold}.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: String,
    pub recommended: bool,
    pub label: String,
    pub motivation: String,
    pub arguments: Vec<Argument>,
}

pub type RecommendationBatch = Vec<Recommendation>;

fn label(recommended: bool, locale: Locale) -> &'static str {
    match (recommended, locale) {
        (true, Locale::En) => "Recommended",
        (false, Locale::En) => "Not recommended",
        (true, Locale::Sv) => "Rekommenderas",
        (false, Locale::Sv) => "Ej rekommenderad",
    }
}

fn no_reasons(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "No strong reasons.",
        Locale::Sv => "Inga starka skäl.",
    }
}

pub fn mean_total_score(scored: &[ScoredRecord]) -> Option<f64> {
    if scored.is_empty() {
        return None;
    }
    let sum: f64 = scored.iter().map(|s| s.total_score).sum();
    Some(sum / scored.len() as f64)
}

fn collect_arguments(s: &ScoredRecord, average: f64, pe_threshold: f64) -> Vec<Argument> {
    let mut out = Vec::new();
    if s.total_score > average {
        out.push(Argument::AboveAverage {
            total_score: s.total_score,
            average,
        });
    }
    if s.record.growth_pct > 0.0 {
        out.push(Argument::PositiveGrowth {
            growth_pct: s.record.growth_pct,
        });
    }
    if s.record.dividend_yield_pct > 0.0 {
        out.push(Argument::PaysDividend {
            dividend_yield_pct: s.record.dividend_yield_pct,
        });
    }
    if let Some(pe) = s.record.pe_ratio {
        if pe < pe_threshold {
            out.push(Argument::LowPe {
                pe_ratio: pe,
                threshold: pe_threshold,
            });
        }
    }
    out
}

pub fn recommend(scored: &[ScoredRecord], opts: &RecommendOptions) -> RecommendationBatch {
    let Some(average) = mean_total_score(scored) else {
        return Vec::new();
    };

    scored
        .iter()
        .map(|s| {
            let arguments = collect_arguments(s, average, opts.pe_threshold);
            let recommended = !arguments.is_empty();
            let motivation = if recommended {
                arguments
                    .iter()
                    .map(|a| a.phrase(opts.locale))
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                no_reasons(opts.locale).to_string()
            };

            Recommendation {
                symbol: s.record.symbol.clone(),
                recommended,
                label: label(recommended, opts.locale).to_string(),
                motivation,
                arguments,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::InstrumentRecord;

    fn scored(symbol: &str, total: f64, growth: f64, div: f64, pe: Option<f64>) -> ScoredRecord {
        ScoredRecord {
            record: InstrumentRecord::try_new(symbol, growth, 10.0, div, pe).unwrap(),
            growth_score: 0.0,
            volatility_score: 0.0,
            dividend_score: 0.0,
            pe_score: 0.0,
            total_score: total,
        }
    }

    #[test]
    fn record_exactly_at_average_is_not_above_average() {
        let batch = vec![
            scored("LOW", 40.0, -1.0, 0.0, None),
            scored("MID", 50.0, -1.0, 0.0, None),
            scored("HIGH", 60.0, -1.0, 0.0, None),
        ];
        let out = recommend(&batch, &RecommendOptions::default());
        assert_eq!(out.len(), 3);
        assert!(!out[0].recommended);
        assert!(!out[1].recommended);
        assert!(out[2].recommended);
        assert_eq!(out[1].motivation, "No strong reasons.");
        assert_eq!(out[1].label, "Not recommended");
        assert!(matches!(out[2].arguments[0], Argument::AboveAverage { .. }));
    }

    #[test]
    fn collects_all_arguments_in_order() {
        let batch = vec![
            scored("A", 80.0, 12.0, 2.5, Some(15.0)),
            scored("B", 20.0, -3.0, 0.0, Some(35.0)),
        ];
        let out = recommend(&batch, &RecommendOptions::default());
        let kinds: Vec<_> = out[0]
            .arguments
            .iter()
            .map(|a| match a {
                Argument::AboveAverage { .. } => "avg",
                Argument::PositiveGrowth { .. } => "growth",
                Argument::PaysDividend { .. } => "div",
                Argument::LowPe { .. } => "pe",
            })
            .collect();
        assert_eq!(kinds, vec!["avg", "growth", "div", "pe"]);
        assert_eq!(
            out[0].motivation,
            "Total score (80.00) is above the batch average (50.00). \
             Positive growth (12.00%). Pays a dividend (2.50% yield). \
             P/E ratio (15.00) is below 20."
        );
        assert!(!out[1].recommended);
    }

    #[test]
    fn null_pe_never_triggers_low_pe() {
        let batch = vec![scored("A", 50.0, -1.0, 0.0, None)];
        let out = recommend(&batch, &RecommendOptions::default());
        assert!(out[0].arguments.is_empty());
    }

    #[test]
    fn pe_threshold_is_strict() {
        let batch = vec![scored("A", 50.0, -1.0, 0.0, Some(20.0))];
        let out = recommend(&batch, &RecommendOptions::default());
        assert!(!out[0].recommended);
    }

    #[test]
    fn swedish_phrasing() {
        let opts = RecommendOptions {
            locale: Locale::Sv,
            ..Default::default()
        };
        let batch = vec![
            scored("A", 70.0, -1.0, 0.0, None),
            scored("B", 30.0, -1.0, 0.0, None),
        ];
        let out = recommend(&batch, &opts);
        assert_eq!(out[0].label, "Rekommenderas");
        assert_eq!(
            out[0].motivation,
            "Total Score (70.00) är högre än genomsnittet (50.00)."
        );
        assert_eq!(out[1].label, "Ej rekommenderad");
        assert_eq!(out[1].motivation, "Inga starka skäl.");
    }

    #[test]
    fn parses_locale() {
        assert_eq!("SV".parse::<Locale>().unwrap(), Locale::Sv);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn empty_batch_yields_no_recommendations() {
        assert!(recommend(&[], &RecommendOptions::default()).is_empty());
    }
}
