//! First-digit (Benford) and round-number checks on vote counts

use crate::config::YearRange;
use crate::dataset::Dataset;
use crate::regime::chi2_sf;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Vote counts that attract threshold gaming
pub const ROUND_VOTE_COUNTS: [u64; 7] = [100, 500, 1_000, 5_000, 10_000, 50_000, 100_000];

/// Share of items expected to sit on any one round count by chance
const ROUND_BASE_RATE: f64 = 0.001;

/// Clustering ratio above which round counts are considered excessive
const CLUSTERING_ALARM: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ManipulationLikelihood {
    Low,
    Medium,
    High,
}

impl ManipulationLikelihood {
    fn from_pvalue(p: f64) -> Self {
        if p < 0.01 {
            ManipulationLikelihood::High
        } else if p < 0.05 {
            ManipulationLikelihood::Medium
        } else {
            ManipulationLikelihood::Low
        }
    }
}

impl fmt::Display for ManipulationLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManipulationLikelihood::Low => write!(f, "LOW"),
            ManipulationLikelihood::Medium => write!(f, "MEDIUM"),
            ManipulationLikelihood::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteClustering {
    pub total_items: usize,
    /// Items whose vote count starts with digit 1..=9
    pub observed: [usize; 9],
    /// Benford share log10(1 + 1/d) for d = 1..=9
    pub expected_share: [f64; 9],
    pub chi2_statistic: f64,
    /// Upper tail of chi-square with 8 degrees of freedom
    pub p_value: f64,
    pub round_number_counts: BTreeMap<u64, usize>,
    pub total_round_numbers: usize,
    /// Round-count hits relative to the chance rate
    pub clustering_ratio: f64,
    pub likelihood: ManipulationLikelihood,
    pub verdict: String,
}

/// Benford share of leading digit `d`
pub fn benford_share(d: u32) -> f64 {
    (1.0 + 1.0 / f64::from(d)).log10()
}

fn leading_digit(mut n: u64) -> u32 {
    while n >= 10 {
        n /= 10;
    }
    n as u32
}

/// Run the vote-count checks over items released within `years`
///
/// `None` when no dated item in range has a positive vote count.
pub fn vote_clustering(dataset: &Dataset, years: &YearRange) -> Option<VoteClustering> {
    let votes: Vec<u64> = dataset
        .items()
        .iter()
        .filter(|item| item.year.is_some_and(|y| years.contains(y)))
        .map(|item| item.votes)
        .filter(|&v| v > 0)
        .collect();

    if votes.is_empty() {
        return None;
    }

    let mut observed = [0usize; 9];
    for &v in &votes {
        observed[leading_digit(v) as usize - 1] += 1;
    }

    let n = votes.len() as f64;
    let expected_share: [f64; 9] = std::array::from_fn(|i| benford_share(i as u32 + 1));
    let chi2_statistic: f64 = observed
        .iter()
        .zip(&expected_share)
        .map(|(&o, &share)| {
            let expected = n * share;
            (o as f64 - expected).powi(2) / expected
        })
        .sum();
    let p_value = chi2_sf(chi2_statistic, 8.0).clamp(0.0, 1.0);

    let round_number_counts: BTreeMap<u64, usize> = ROUND_VOTE_COUNTS
        .iter()
        .map(|&round| (round, votes.iter().filter(|&&v| v == round).count()))
        .collect();
    let total_round_numbers: usize = round_number_counts.values().sum();
    let expected_round = n * ROUND_BASE_RATE * ROUND_VOTE_COUNTS.len() as f64;
    let clustering_ratio = total_round_numbers as f64 / expected_round;

    let likelihood = ManipulationLikelihood::from_pvalue(p_value);
    let verdict = verdict(p_value, clustering_ratio).to_string();

    tracing::info!(
        "Benford chi2={:.2}, p={:.4}, manipulation={}; {} round vote counts ({:.1}x expected)",
        chi2_statistic,
        p_value,
        likelihood,
        total_round_numbers,
        clustering_ratio
    );

    Some(VoteClustering {
        total_items: votes.len(),
        observed,
        expected_share,
        chi2_statistic,
        p_value,
        round_number_counts,
        total_round_numbers,
        clustering_ratio,
        likelihood,
        verdict,
    })
}

fn verdict(p_value: f64, clustering_ratio: f64) -> &'static str {
    match (p_value < 0.01, clustering_ratio > CLUSTERING_ALARM) {
        (true, true) => "strong evidence of manipulation: Benford violation with round-number clustering",
        (true, false) => "Benford violation: first digits suggest artificial voting patterns",
        (false, true) => "excessive round-number clustering: possible threshold gaming",
        (false, false) => "no strong evidence of manipulation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RatingScale;
    use crate::dataset::ItemRecord;

    fn dataset_with_votes(votes: &[u64]) -> Dataset {
        let items = votes
            .iter()
            .enumerate()
            .map(|(i, &v)| ItemRecord::new(format!("v{}", i), Some(2021), &["Drama"], 6.0).with_votes(v))
            .collect();
        Dataset::new(items, &RatingScale { min: 0.0, max: 10.0 }).unwrap()
    }

    #[test]
    fn test_benford_shares_sum_to_one() {
        let total: f64 = (1..=9).map(benford_share).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(leading_digit(7), 7);
        assert_eq!(leading_digit(48_213), 4);
    }

    #[test]
    fn test_geometric_counts_follow_benford() {
        // Evenly spaced in log10 over exactly eight decades
        let votes: Vec<u64> = (0..2000)
            .map(|k| (1000.0 * 10f64.powf(f64::from(k) / 250.0)) as u64)
            .collect();
        let result = vote_clustering(&dataset_with_votes(&votes), &YearRange::new(2019, 2024)).unwrap();

        assert_eq!(result.total_items, 2000);
        assert_eq!(result.likelihood, ManipulationLikelihood::Low);
        assert_eq!(result.verdict, "no strong evidence of manipulation");
    }

    #[test]
    fn test_uniform_nines_violate_benford_and_round_counts_cluster() {
        let mut votes: Vec<u64> = (0..300).map(|i| 9_000 + i).collect();
        votes.extend(std::iter::repeat(1_000).take(50));
        let result = vote_clustering(&dataset_with_votes(&votes), &YearRange::new(2019, 2024)).unwrap();

        assert_eq!(result.observed[8], 300);
        assert_eq!(result.round_number_counts[&1_000], 50);
        assert_eq!(result.likelihood, ManipulationLikelihood::High);
        assert!(result.clustering_ratio > 10.0);
        assert!(result.verdict.starts_with("strong evidence"));
    }

    #[test]
    fn test_out_of_range_items_are_ignored() {
        let dataset = dataset_with_votes(&[1200, 3400]);
        assert!(vote_clustering(&dataset, &YearRange::new(1990, 1999)).is_none());
    }
}
