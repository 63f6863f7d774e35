//! Per-cutoff regime-change test

use super::statistics::{self, TestOutcome};
use crate::config::RegimeConfig;
use crate::descriptive::{self, Moments};
use crate::error::{EngineError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Distinct years needed in the window before a trend is tested
pub const MIN_TREND_YEARS: usize = 3;

/// Smallest |t| whose sign is compared against Cohen's d; the statistic is
/// computed in `f32` and near zero its sign carries no information
pub const SIGN_CHECK_MIN_T: f64 = 0.5;

/// Whether a candidate produced statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffStatus {
    Evaluated,
    InsufficientEvidence { reason: String },
}

/// Size and location of one side of a cutoff
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupSummary {
    pub n: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation
    pub std: Option<f64>,
}

impl GroupSummary {
    fn count_only(n: usize) -> Self {
        Self {
            n,
            mean: None,
            std: None,
        }
    }

    fn from_moments(m: &Moments) -> Self {
        Self {
            n: m.n,
            mean: Some(m.mean),
            std: m.sample_std(),
        }
    }
}

/// Full result for one candidate cutoff year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoffCandidateResult {
    pub candidate_year: i32,
    pub status: CutoffStatus,
    pub before: GroupSummary,
    pub after: GroupSummary,
    /// mean_after - mean_before
    pub mean_difference: Option<f64>,
    pub cohens_d: Option<f64>,
    pub t_test: Option<TestOutcome>,
    pub levene: Option<TestOutcome>,
    pub ks: Option<TestOutcome>,
    /// Mann-Kendall on yearly means; corroborating only, never part of the score
    pub trend: Option<TestOutcome>,
}

impl CutoffCandidateResult {
    fn insufficient(candidate_year: i32, n_before: usize, n_after: usize, reason: String) -> Self {
        Self {
            candidate_year,
            status: CutoffStatus::InsufficientEvidence { reason },
            before: GroupSummary::count_only(n_before),
            after: GroupSummary::count_only(n_after),
            mean_difference: None,
            cohens_d: None,
            t_test: None,
            levene: None,
            ks: None,
            trend: None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.status == CutoffStatus::Evaluated
    }

    /// p-values of the mean, variance, and shape tests, when all three exist
    pub fn primary_pvalues(&self) -> Option<[f64; 3]> {
        Some([
            self.t_test?.p_value,
            self.levene?.p_value,
            self.ks?.p_value,
        ])
    }

    /// True if any reported p-value had to be clamped
    pub fn any_clamped(&self) -> bool {
        [self.t_test, self.levene, self.ks, self.trend]
            .iter()
            .flatten()
            .any(|o| o.clamped)
    }
}

/// Test one candidate cutoff against a (year, rating) series
///
/// `before` is every rating with `year < candidate_year`, `after` the rest. Groups
/// below `min_group_size`, or a zero pooled standard deviation, yield
/// `InsufficientEvidence` rather than an error.
pub fn test_cutoff(
    series: &[(i32, f64)],
    candidate_year: i32,
    config: &RegimeConfig,
) -> Result<CutoffCandidateResult> {
    let (before, after) = split_at_cutoff(series, candidate_year);

    if before.len() < config.min_group_size || after.len() < config.min_group_size {
        let reason = format!(
            "groups of {} and {} ratings, need at least {} on each side",
            before.len(),
            after.len(),
            config.min_group_size
        );
        tracing::info!("cutoff {}: insufficient evidence ({})", candidate_year, reason);
        return Ok(CutoffCandidateResult::insufficient(
            candidate_year,
            before.len(),
            after.len(),
            reason,
        ));
    }

    let (Some(m_before), Some(m_after)) =
        (descriptive::moments(&before), descriptive::moments(&after))
    else {
        return Ok(CutoffCandidateResult::insufficient(
            candidate_year,
            before.len(),
            after.len(),
            "empty group".to_string(),
        ));
    };

    let pooled = statistics::pooled_std(&m_before, &m_after).unwrap_or(0.0);
    if pooled == 0.0 {
        let reason = "zero pooled standard deviation, no test statistic is defined".to_string();
        tracing::info!("cutoff {}: insufficient evidence ({})", candidate_year, reason);
        return Ok(CutoffCandidateResult::insufficient(
            candidate_year,
            before.len(),
            after.len(),
            reason,
        ));
    }

    let t_test = statistics::t_test(&before, &after, config.t_test, candidate_year)?;
    let levene = checked_pair("levene", candidate_year, statistics::levene(&before, &after))?;
    let ks = checked_pair("ks", candidate_year, statistics::ks_2samp(&before, &after))?;
    let trend = trend_around(series, candidate_year, config.trend_window)?;

    let mean_difference = m_after.mean - m_before.mean;
    let cohens_d = statistics::cohens_d(&m_before, &m_after);
    if let Some(d) = cohens_d {
        check_effect_sign(candidate_year, d, t_test.statistic)?;
    }

    let result = CutoffCandidateResult {
        candidate_year,
        status: CutoffStatus::Evaluated,
        before: GroupSummary::from_moments(&m_before),
        after: GroupSummary::from_moments(&m_after),
        mean_difference: Some(mean_difference),
        cohens_d,
        t_test: Some(t_test),
        levene,
        ks,
        trend,
    };

    tracing::info!(
        "cutoff {}: before n={} mean={:.3}, after n={} mean={:.3}, t={:.3} p={:.4}, d={:+.3}",
        candidate_year,
        m_before.n,
        m_before.mean,
        m_after.n,
        m_after.mean,
        t_test.statistic,
        t_test.p_value,
        cohens_d.unwrap_or(0.0)
    );

    Ok(result)
}

/// Ratings with `year < candidate_year`, then the rest
fn split_at_cutoff(series: &[(i32, f64)], candidate_year: i32) -> (Vec<f64>, Vec<f64>) {
    let before = series
        .iter()
        .filter(|&&(year, _)| year < candidate_year)
        .map(|&(_, rating)| rating)
        .collect();
    let after = series
        .iter()
        .filter(|&&(year, _)| year >= candidate_year)
        .map(|&(_, rating)| rating)
        .collect();
    (before, after)
}

/// Run every candidate independently, in the order given
pub fn sweep(
    series: &[(i32, f64)],
    candidates: &[i32],
    config: &RegimeConfig,
) -> Result<Vec<CutoffCandidateResult>> {
    candidates
        .iter()
        .map(|&year| test_cutoff(series, year, config))
        .collect()
}

fn checked_pair(
    test: &'static str,
    candidate: i32,
    pair: Option<(f64, f64)>,
) -> Result<Option<TestOutcome>> {
    pair.map(|(statistic, p)| TestOutcome::checked(test, candidate, statistic, p))
        .transpose()
}

/// Mann-Kendall over yearly mean ratings in `[candidate - window, candidate + window)`
fn trend_around(
    series: &[(i32, f64)],
    candidate_year: i32,
    window: i32,
) -> Result<Option<TestOutcome>> {
    let start = candidate_year - window;
    let end = candidate_year + window;

    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for &(year, rating) in series {
        if (start..end).contains(&year) {
            by_year.entry(year).or_default().push(rating);
        }
    }

    if by_year.len() < MIN_TREND_YEARS {
        tracing::debug!(
            "cutoff {}: {} distinct years in trend window, trend left undefined",
            candidate_year,
            by_year.len()
        );
        return Ok(None);
    }

    let yearly_means: Vec<f64> = by_year
        .values()
        .map(|ratings| ratings.iter().sum::<f64>() / ratings.len() as f64)
        .collect();

    checked_pair("mann-kendall", candidate_year, statistics::mann_kendall(&yearly_means))
}

/// Cohen's d and the independently computed t statistic must point the same way
fn check_effect_sign(candidate: i32, cohens_d: f64, t_statistic: f64) -> Result<()> {
    if t_statistic.abs() < SIGN_CHECK_MIN_T {
        return Ok(());
    }
    if (cohens_d > 0.0) != (t_statistic > 0.0) {
        return Err(EngineError::EffectSignMismatch {
            candidate,
            cohens_d,
            t_statistic,
        });
    }
    Ok(())
}
