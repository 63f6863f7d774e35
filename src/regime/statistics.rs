// Two-sample test battery for regime-change detection
//
// - Mean difference: aprender's `ttest_ind()` (Student pooled or Welch), f64 tail
// - Variance equality: Levene's test centred on the median (Brown-Forsythe)
// - Distribution shape: two-sample Kolmogorov-Smirnov with Stephens' correction
// - Monotonic trend: Mann-Kendall on year-ordered yearly means
//
// Every p-value leaving this module has passed `checked_pvalue`.

use super::distributions::{f_sf, kolmogorov_sf, normal_sf, student_t_two_sided};
use crate::config::TTestVariant;
use crate::descriptive::{self, Moments};
use crate::error::{EngineError, Result};
use serde::Serialize;
use std::cmp::Ordering;

/// p-values this close outside [0, 1] are numerical noise and get clamped
pub const PVALUE_CLAMP_TOLERANCE: f64 = 1e-9;

/// Statistic and p-value of one test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
    /// True when the raw p-value was clamped into [0, 1]
    pub clamped: bool,
}

impl TestOutcome {
    /// Build an outcome after checking the p-value range
    pub fn checked(test: &'static str, candidate: i32, statistic: f64, raw_p: f64) -> Result<Self> {
        let (p_value, clamped) = checked_pvalue(test, candidate, raw_p)?;
        Ok(Self {
            statistic,
            p_value,
            clamped,
        })
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Validate a raw p-value
///
/// NaN and excursions beyond the tolerance are invariant violations. Tiny
/// excursions are clamped, flagged, and logged.
pub fn checked_pvalue(test: &'static str, candidate: i32, raw: f64) -> Result<(f64, bool)> {
    if raw.is_nan() {
        return Err(EngineError::PValueOutOfRange {
            test,
            candidate,
            value: raw,
        });
    }
    if (0.0..=1.0).contains(&raw) {
        return Ok((raw, false));
    }
    if raw >= -PVALUE_CLAMP_TOLERANCE && raw <= 1.0 + PVALUE_CLAMP_TOLERANCE {
        let clamped = raw.clamp(0.0, 1.0);
        tracing::warn!(
            "{} p-value {:e} for cutoff {} clamped to {}",
            test,
            raw,
            candidate,
            clamped
        );
        return Ok((clamped, true));
    }
    Err(EngineError::PValueOutOfRange {
        test,
        candidate,
        value: raw,
    })
}

fn to_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}

/// Independent two-sample t-test of `after` against `before`
///
/// The statistic is positive when `after` has the higher mean.
pub fn t_test(
    before: &[f64],
    after: &[f64],
    variant: TTestVariant,
    candidate: i32,
) -> Result<TestOutcome> {
    let equal_var = matches!(variant, TTestVariant::Student);
    let result = aprender::stats::hypothesis::ttest_ind(&to_f32(after), &to_f32(before), equal_var)
        .map_err(|e| EngineError::TestFailure {
            candidate,
            reason: format!("t-test: {}", e),
        })?;

    // aprender reports p in f32, which underflows for large samples; re-evaluate
    // the two-sided tail in f64 from its statistic and degrees of freedom
    let statistic = f64::from(result.statistic);
    let p_value = student_t_two_sided(statistic, f64::from(result.df));
    TestOutcome::checked("t-test", candidate, statistic, p_value)
}

/// Brown-Forsythe variant of Levene's test for two groups: (W, p) with W ~ F(1, N - 2)
pub fn levene(before: &[f64], after: &[f64]) -> Option<(f64, f64)> {
    let groups = [before, after];
    if groups.iter().any(|g| g.is_empty()) {
        return None;
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let center = descriptive::median(g)?;
            Some(g.iter().map(|x| (x - center).abs()).collect::<Vec<f64>>())
        })
        .collect::<Option<_>>()?;

    let n_total: usize = deviations.iter().map(Vec::len).sum();
    if n_total <= groups.len() {
        return None;
    }

    let group_means: Vec<f64> = deviations
        .iter()
        .map(|d| d.iter().sum::<f64>() / d.len() as f64)
        .collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / n_total as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.iter().map(|z| (z - m).powi(2)).sum::<f64>())
        .sum();

    let k = groups.len() as f64;
    let df_within = n_total as f64 - k;

    let statistic = match (between == 0.0, within == 0.0) {
        (true, _) => 0.0,
        (false, true) => f64::INFINITY,
        (false, false) => (df_within / (k - 1.0)) * between / within,
    };

    Some((statistic, f_sf(statistic, k - 1.0, df_within)))
}

/// Two-sample Kolmogorov-Smirnov test: (D, p)
///
/// The p-value is the asymptotic Kolmogorov tail evaluated at
/// λ = (√nₑ + 0.12 + 0.11/√nₑ)·D with nₑ = n₁n₂/(n₁ + n₂).
pub fn ks_2samp(before: &[f64], after: &[f64]) -> Option<(f64, f64)> {
    if before.is_empty() || after.is_empty() {
        return None;
    }

    let mut a = before.to_vec();
    let mut b = after.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n1, n2) = (a.len(), b.len());
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < n1 && j < n2 {
        let x = a[i].min(b[j]);
        while i < n1 && a[i] <= x {
            i += 1;
        }
        while j < n2 && b[j] <= x {
            j += 1;
        }
        let gap = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        d = d.max(gap);
    }

    let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;
    Some((d, kolmogorov_sf(lambda)))
}

/// Mann-Kendall trend test: (Z, p), `None` below three observations
///
/// S counts concordant minus discordant pairs in series order. The variance is
/// tie-corrected and Z carries the usual ±1 continuity correction.
pub fn mann_kendall(series: &[f64]) -> Option<(f64, f64)> {
    let n = series.len();
    if n < 3 {
        return None;
    }

    let mut s: i64 = 0;
    for i in 0..n - 1 {
        for j in i + 1..n {
            s += match series[j].partial_cmp(&series[i]) {
                Some(Ordering::Greater) => 1,
                Some(Ordering::Less) => -1,
                _ => 0,
            };
        }
    }

    let mut sorted = series.to_vec();
    sorted.sort_by(f64::total_cmp);
    let tie_term: f64 = sorted
        .chunk_by(|x, y| x == y)
        .map(|run| run.len() as f64)
        .filter(|&t| t > 1.0)
        .map(|t| t * (t - 1.0) * (2.0 * t + 5.0))
        .sum();

    let nf = n as f64;
    let variance = (nf * (nf - 1.0) * (2.0 * nf + 5.0) - tie_term) / 18.0;
    if variance <= 0.0 {
        return Some((0.0, 1.0));
    }

    let z = match s.cmp(&0) {
        Ordering::Greater => (s - 1) as f64 / variance.sqrt(),
        Ordering::Less => (s + 1) as f64 / variance.sqrt(),
        Ordering::Equal => 0.0,
    };
    Some((z, (2.0 * normal_sf(z.abs())).min(1.0)))
}

/// Cohen's d from the two groups' moments: (mean_after - mean_before) / pooled sample σ
pub fn cohens_d(before: &Moments, after: &Moments) -> Option<f64> {
    let pooled = pooled_std(before, after)?;
    if pooled == 0.0 || !pooled.is_finite() {
        return None;
    }
    Some((after.mean - before.mean) / pooled)
}

/// √((s²_before + s²_after) / 2) with sample variances
pub fn pooled_std(before: &Moments, after: &Moments) -> Option<f64> {
    let var_before = before.sample_variance()?;
    let var_after = after.sample_variance()?;
    Some(((var_before + var_after) / 2.0).sqrt())
}

/// Label for |d| using Cohen's conventional thresholds
pub fn effect_size_label(d: f64) -> &'static str {
    let d = d.abs();
    if d < 0.2 {
        "negligible"
    } else if d < 0.5 {
        "small"
    } else if d < 0.8 {
        "medium"
    } else {
        "large"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pvalue_in_range_passes_through() {
        assert_eq!(checked_pvalue("t-test", 2008, 0.03).unwrap(), (0.03, false));
        assert_eq!(checked_pvalue("t-test", 2008, 0.0).unwrap(), (0.0, false));
        assert_eq!(checked_pvalue("t-test", 2008, 1.0).unwrap(), (1.0, false));
    }

    #[test]
    fn test_pvalue_tiny_excursion_is_clamped() {
        assert_eq!(
            checked_pvalue("levene", 2000, 1.0 + 1e-12).unwrap(),
            (1.0, true)
        );
        assert_eq!(checked_pvalue("ks", 2000, -1e-10).unwrap(), (0.0, true));
    }

    #[test]
    fn test_pvalue_nan_and_large_excursions_are_errors() {
        assert!(matches!(
            checked_pvalue("t-test", 2012, f64::NAN),
            Err(EngineError::PValueOutOfRange { candidate: 2012, .. })
        ));
        assert!(checked_pvalue("t-test", 2012, 1.01).is_err());
        assert!(checked_pvalue("t-test", 2012, -0.5).is_err());
    }

    #[test]
    fn test_t_test_detects_shift_and_sign() {
        let before: Vec<f64> = (0..40).map(|i| 6.0 + 0.1 * (i % 7) as f64).collect();
        let after: Vec<f64> = (0..40).map(|i| 6.8 + 0.1 * (i % 7) as f64).collect();

        let outcome = t_test(&before, &after, TTestVariant::Student, 2008).unwrap();
        assert!(outcome.statistic > 0.0);
        assert!(outcome.p_value < 0.001);

        let welch = t_test(&before, &after, TTestVariant::Welch, 2008).unwrap();
        assert!(welch.p_value < 0.001);
    }

    #[test]
    fn test_levene_equal_spread_vs_wider_spread() {
        let narrow: Vec<f64> = (0..50).map(|i| 6.0 + 0.05 * (i % 5) as f64).collect();
        let also_narrow: Vec<f64> = (0..50).map(|i| 7.0 + 0.05 * (i % 5) as f64).collect();
        let wide: Vec<f64> = (0..50).map(|i| 6.0 + 0.6 * (i % 5) as f64).collect();

        // Shifted but same spread: identical deviations from the median
        let (w_same, p_same) = levene(&narrow, &also_narrow).unwrap();
        assert!(w_same.abs() < 1e-3);
        assert!(p_same > 0.9);

        let (w, p) = levene(&narrow, &wide).unwrap();
        assert!(w > 10.0);
        assert!(p < 0.001);
    }

    #[test]
    fn test_ks_identical_and_disjoint_samples() {
        let a: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let (d, p) = ks_2samp(&a, &a).unwrap();
        assert_eq!(d, 0.0);
        assert_eq!(p, 1.0);

        let b: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let (d, p) = ks_2samp(&a, &b).unwrap();
        assert_eq!(d, 1.0);
        assert!(p < 1e-10);
    }

    #[test]
    fn test_ks_handles_ties_across_samples() {
        let a = [1.0, 2.0, 2.0, 3.0];
        let b = [2.0, 2.0, 3.0, 4.0];
        let (d, _) = ks_2samp(&a, &b).unwrap();
        // At x = 2: F_a = 0.75, F_b = 0.5
        assert!((d - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_mann_kendall_monotonic_series() {
        let rising: Vec<f64> = (0..15).map(|i| 6.0 + 0.05 * i as f64).collect();
        let (z, p) = mann_kendall(&rising).unwrap();
        assert!(z > 0.0);
        assert!(p < 0.001);

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        let (z, _) = mann_kendall(&falling).unwrap();
        assert!(z < 0.0);
    }

    #[test]
    fn test_mann_kendall_flat_and_short_series() {
        assert_eq!(mann_kendall(&[5.0; 8]), Some((0.0, 1.0)));
        assert_eq!(mann_kendall(&[1.0, 2.0]), None);
    }

    #[test]
    fn test_cohens_d_sign_and_degenerate() {
        let before = Moments {
            n: 10,
            mean: 6.0,
            population_variance: 0.9,
        };
        let after = Moments {
            n: 10,
            mean: 5.5,
            population_variance: 0.9,
        };
        // sample variance 1.0 on both sides, pooled σ = 1
        assert!((cohens_d(&before, &after).unwrap() + 0.5).abs() < 1e-12);

        let flat = Moments {
            n: 10,
            mean: 6.0,
            population_variance: 0.0,
        };
        assert_eq!(cohens_d(&flat, &flat), None);
    }

    #[test]
    fn test_effect_size_labels() {
        assert_eq!(effect_size_label(0.1), "negligible");
        assert_eq!(effect_size_label(-0.3), "small");
        assert_eq!(effect_size_label(0.5), "medium");
        assert_eq!(effect_size_label(-1.2), "large");
    }
}
