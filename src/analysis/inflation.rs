//! Per-year rating summary (rating-inflation view)

use crate::config::YearRange;
use crate::dataset::Dataset;
use crate::descriptive;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rating statistics for one release year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub count: usize,
    pub rating_mean: f64,
    pub rating_median: Option<f64>,
    /// Sample standard deviation; `None` for a single item
    pub rating_std: Option<f64>,
    pub votes_mean: f64,
    /// Yearly mean against the mean and sample σ of every rating in range
    pub rating_zscore: Option<f64>,
}

/// Summarize ratings per year within `years`
pub fn yearly_summary(dataset: &Dataset, years: &YearRange) -> Vec<YearSummary> {
    let mut by_year: BTreeMap<i32, Vec<(f64, u64)>> = BTreeMap::new();
    for item in dataset.items() {
        if let Some(year) = item.year.filter(|y| years.contains(*y)) {
            by_year.entry(year).or_default().push((item.rating, item.votes));
        }
    }

    let all_ratings: Vec<f64> = by_year.values().flatten().map(|(r, _)| *r).collect();
    let overall = descriptive::moments(&all_ratings);
    let overall_mean = overall.map(|m| m.mean);
    let overall_std = overall.and_then(|m| m.sample_std()).filter(|s| *s > 0.0);

    let summary: Vec<YearSummary> = by_year
        .into_iter()
        .filter_map(|(year, entries)| {
            let ratings: Vec<f64> = entries.iter().map(|(r, _)| *r).collect();
            let votes: Vec<f64> = entries.iter().map(|(_, v)| *v as f64).collect();
            let moments = descriptive::moments(&ratings)?;

            Some(YearSummary {
                year,
                count: ratings.len(),
                rating_mean: moments.mean,
                rating_median: descriptive::median(&ratings),
                rating_std: moments.sample_std(),
                votes_mean: votes.iter().sum::<f64>() / votes.len() as f64,
                rating_zscore: match (overall_mean, overall_std) {
                    (Some(mean), Some(std)) => Some((moments.mean - mean) / std),
                    _ => None,
                },
            })
        })
        .collect();

    tracing::debug!("summarized {} years", summary.len());
    summary
}
