use crate::domain::scoring::ScoredRecord;

pub const DEFAULT_SUGGESTION_RATIO: f64 = 0.7;

pub type SuggestionBatch = Vec<ScoredRecord>;

/// Candidates scoring at least `ratio` of the best total score seen across both
/// batches, best first. Equal scores keep their candidate order.
pub fn suggest_similar(
    current: &[ScoredRecord],
    candidates: &[ScoredRecord],
    ratio: f64,
) -> SuggestionBatch {
    let Some(best) = current
        .iter()
        .chain(candidates)
        .map(|s| s.total_score)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
    else {
        return Vec::new();
    };
    let cutoff = ratio * best;

    let mut out: Vec<ScoredRecord> = candidates
        .iter()
        .filter(|c| c.total_score >= cutoff)
        .cloned()
        .collect();

    // `sort_by` is stable.
    out.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}
