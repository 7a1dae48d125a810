use std::fmt::Write;

use insights_core::analysis::AnalysisReport;
use insights_core::domain::recommendation::Recommendation;
use insights_core::domain::risk::RiskMetrics;
use insights_core::domain::scoring::ScoredRecord;
use insights_core::ingest::types::QuoteItem;

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

pub fn scored_table(scored: &[ScoredRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>9} {:>9} {:>8} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "symbol", "growth%", "vol%", "div%", "p/e", "g_sc", "v_sc", "d_sc", "pe_sc", "total"
    );
    for s in scored {
        let r = &s.record;
        let _ = writeln!(
            out,
            "{:<12} {:>9.2} {:>9.2} {:>8.2} {:>7} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>7.2}",
            r.symbol,
            r.growth_pct,
            r.volatility_pct,
            r.dividend_yield_pct,
            opt(r.pe_ratio),
            s.growth_score,
            s.volatility_score,
            s.dividend_score,
            s.pe_score,
            s.total_score
        );
    }
    out
}

pub fn recommendation_table(recs: &[Recommendation]) -> String {
    let mut out = String::new();
    for r in recs {
        let _ = writeln!(out, "{:<12} {:<18} {}", r.symbol, r.label, r.motivation);
    }
    out
}

pub fn risk_table(risk: &[RiskMetrics]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:>8} {:>8}", "symbol", "sharpe", "VaR%");
    for m in risk {
        let _ = writeln!(
            out,
            "{:<12} {:>8} {:>8.2}",
            m.symbol,
            opt(m.sharpe_ratio),
            m.value_at_risk_pct
        );
    }
    out
}

pub fn quote_table(quotes: &[QuoteItem]) -> String {
    let mut out = String::new();
    for q in quotes {
        let _ = writeln!(out, "{:<8} {:>10.2} {:>10}", q.symbol, q.price, q.change_percent);
    }
    out
}

pub fn analysis_report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "analysis {} at {}",
        report.analysis_id,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if report.scored.is_empty() {
        let _ = writeln!(out, "\nno instruments could be scored");
    } else {
        let _ = writeln!(out, "\n{}", scored_table(&report.scored));
        let _ = writeln!(out, "{}", recommendation_table(&report.recommendations));
        let _ = writeln!(out, "{}", risk_table(&report.risk));
    }

    if let Some(suggestions) = &report.suggestions {
        let _ = writeln!(out, "suggested:");
        if suggestions.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for s in suggestions {
            let _ = writeln!(out, "  {:<12} {:>7.2}", s.record.symbol, s.total_score);
        }
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "skipped:");
        for f in &report.failures {
            let _ = writeln!(out, "  {:<12} {}", f.symbol, f.error);
        }
    }
    out
}
