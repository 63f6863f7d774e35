//! Evidence ranking across candidate cutoffs
//!
//! Only the three primary tests (mean, variance, shape) feed the combined score.
//! The trend test is carried along for the report.

use super::distributions::probit;
use super::statistics::effect_size_label;
use super::tester::{CutoffCandidateResult, CutoffStatus};
use crate::config::CombineMethod;
use serde::Serialize;
use std::fmt::Write as _;

/// Floor applied before taking logarithms or probits of a p-value
pub const MIN_PVALUE: f64 = 1e-300;

const PRIMARY_TESTS: usize = 3;

/// A candidate with its position in the ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    /// 1-based position
    pub rank: usize,
    /// Combined evidence, higher is stronger; `None` for insufficient candidates
    pub score: Option<f64>,
    #[serde(flatten)]
    pub result: CutoffCandidateResult,
}

/// Order candidates by combined evidence
///
/// Evaluated candidates come first: score descending, then |d| descending, then
/// year ascending. Insufficient candidates follow in year order.
pub fn rank(results: Vec<CutoffCandidateResult>, method: CombineMethod) -> Vec<RankedCandidate> {
    let (evaluated, insufficient): (Vec<_>, Vec<_>) = results
        .into_iter()
        .partition(|r| r.is_evaluated() && r.primary_pvalues().is_some());

    let scores = combined_scores(&evaluated, method);

    let mut scored: Vec<(f64, CutoffCandidateResult)> = scores.into_iter().zip(evaluated).collect();
    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .total_cmp(score_a)
            .then_with(|| abs_d(b).total_cmp(&abs_d(a)))
            .then_with(|| a.candidate_year.cmp(&b.candidate_year))
    });

    let mut insufficient = insufficient;
    insufficient.sort_by_key(|r| r.candidate_year);

    scored
        .into_iter()
        .map(|(score, result)| (Some(score), result))
        .chain(insufficient.into_iter().map(|result| (None, result)))
        .enumerate()
        .map(|(i, (score, result))| RankedCandidate {
            rank: i + 1,
            score,
            result,
        })
        .collect()
}

/// Best `n` evaluated candidates
pub fn top(ranked: &[RankedCandidate], n: usize) -> Vec<&RankedCandidate> {
    ranked
        .iter()
        .filter(|c| c.score.is_some())
        .take(n)
        .collect()
}

fn abs_d(result: &CutoffCandidateResult) -> f64 {
    result.cohens_d.map(f64::abs).unwrap_or(0.0)
}

fn combined_scores(evaluated: &[CutoffCandidateResult], method: CombineMethod) -> Vec<f64> {
    let pvalues: Vec<[f64; 3]> = evaluated
        .iter()
        .filter_map(CutoffCandidateResult::primary_pvalues)
        .collect();

    match method {
        CombineMethod::MeanNegLog10 => pvalues
            .iter()
            .map(|ps| ps.iter().map(|&p| -p.max(MIN_PVALUE).log10()).sum::<f64>() / PRIMARY_TESTS as f64)
            .collect(),
        CombineMethod::Stouffer => pvalues
            .iter()
            .map(|ps| ps.iter().map(|&p| stouffer_z(p)).sum::<f64>() / (PRIMARY_TESTS as f64).sqrt())
            .collect(),
        CombineMethod::MeanRank => {
            let m = pvalues.len() as f64;
            let mut rank_sums = vec![0.0; pvalues.len()];
            for test in 0..PRIMARY_TESTS {
                let column: Vec<f64> = pvalues.iter().map(|ps| ps[test]).collect();
                for (sum, r) in rank_sums.iter_mut().zip(average_ranks(&column)) {
                    *sum += r;
                }
            }
            rank_sums
                .into_iter()
                .map(|sum| (m + 1.0) - sum / PRIMARY_TESTS as f64)
                .collect()
        }
    }
}

/// Φ⁻¹(1 - p), computed as -Φ⁻¹(p) so that tiny p keep their precision
fn stouffer_z(p: f64) -> f64 {
    -probit(p.clamp(MIN_PVALUE, 1.0 - f64::EPSILON))
}

/// 1-based ascending ranks; ties share the average of the positions they span
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start+1 ..= end
        let shared = (start + 1 + end) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = shared;
        }
        start = end;
    }
    ranks
}

/// Human-readable ranking report
pub fn to_report_string(ranked: &[RankedCandidate], method: CombineMethod, alpha: f64) -> String {
    let mut report = String::new();

    let evaluated = ranked.iter().filter(|c| c.score.is_some()).count();
    let _ = writeln!(
        report,
        "REGIME CHANGE RANKING ({} candidates, {} evaluated, combine = {:?})\n",
        ranked.len(),
        evaluated,
        method
    );

    if let Some(best) = ranked.first().filter(|c| c.score.is_some()) {
        let r = &best.result;
        let _ = writeln!(
            report,
            "Strongest evidence: {} (mean diff {:+.3}, Cohen's d {:+.3}, {} effect)\n",
            r.candidate_year,
            r.mean_difference.unwrap_or(0.0),
            r.cohens_d.unwrap_or(0.0),
            effect_size_label(r.cohens_d.unwrap_or(0.0))
        );
    }

    let _ = writeln!(
        report,
        "{:>4}  {:>6}  {:>8}  {:>9}  {:>8}  {:>10}  {:>10}  {:>10}  {:>10}",
        "rank", "year", "score", "mean_diff", "d", "t p", "levene p", "ks p", "trend p"
    );

    for candidate in ranked {
        let r = &candidate.result;
        match (&r.status, candidate.score) {
            (CutoffStatus::Evaluated, Some(score)) => {
                let _ = writeln!(
                    report,
                    "{:>4}  {:>6}  {:>8.3}  {:>+9.3}  {:>+8.3}  {:>10}  {:>10}  {:>10}  {:>10}",
                    candidate.rank,
                    r.candidate_year,
                    score,
                    r.mean_difference.unwrap_or(0.0),
                    r.cohens_d.unwrap_or(0.0),
                    format_p(r.t_test.map(|o| o.p_value), alpha),
                    format_p(r.levene.map(|o| o.p_value), alpha),
                    format_p(r.ks.map(|o| o.p_value), alpha),
                    format_p(r.trend.map(|o| o.p_value), alpha),
                );
            }
            (CutoffStatus::InsufficientEvidence { reason }, _) => {
                let _ = writeln!(
                    report,
                    "{:>4}  {:>6}  insufficient evidence: {}",
                    candidate.rank, r.candidate_year, reason
                );
            }
            (CutoffStatus::Evaluated, None) => {
                let _ = writeln!(
                    report,
                    "{:>4}  {:>6}  not scored",
                    candidate.rank, r.candidate_year
                );
            }
        }
    }

    let clamped: Vec<String> = ranked
        .iter()
        .filter(|c| c.result.any_clamped())
        .map(|c| c.result.candidate_year.to_string())
        .collect();
    if !clamped.is_empty() {
        let _ = writeln!(report, "\nClamped p-values at: {}", clamped.join(", "));
    }
    let _ = writeln!(report, "\n* p < {}", alpha);

    report
}

fn format_p(p: Option<f64>, alpha: f64) -> String {
    match p {
        Some(p) if p < alpha => format!("{:.2e}*", p),
        Some(p) => format!("{:.4}", p),
        None => "-".to_string(),
    }
}
