//! High-rated item counts per decade

use crate::dataset::Dataset;
use crate::descriptive;
use serde::Serialize;
use std::collections::BTreeMap;

pub const HIGH_RATING_THRESHOLD: f64 = 8.0;
pub const HIGH_RATING_MIN_VOTES: u64 = 10_000;

/// Earliest decade reported
pub const FIRST_DECADE: i32 = 1950;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeHighlights {
    /// First year of the decade, e.g. 1990
    pub decade: i32,
    pub count: usize,
    pub rating_mean: f64,
    pub rating_median: Option<f64>,
    pub votes_mean: f64,
    pub votes_median: Option<f64>,
}

/// Items rated at least `threshold` with at least `min_votes` votes, grouped by decade
pub fn high_rated_by_decade(
    dataset: &Dataset,
    threshold: f64,
    min_votes: u64,
) -> Vec<DecadeHighlights> {
    let mut by_decade: BTreeMap<i32, Vec<(f64, f64)>> = BTreeMap::new();
    for item in dataset.items() {
        let Some(decade) = item.decade().map(|d| d * 10) else {
            continue;
        };
        if decade >= FIRST_DECADE && item.rating >= threshold && item.votes >= min_votes {
            by_decade
                .entry(decade)
                .or_default()
                .push((item.rating, item.votes as f64));
        }
    }

    let highlights: Vec<DecadeHighlights> = by_decade
        .into_iter()
        .map(|(decade, entries)| {
            let ratings: Vec<f64> = entries.iter().map(|(r, _)| *r).collect();
            let votes: Vec<f64> = entries.iter().map(|(_, v)| *v).collect();
            let count = entries.len() as f64;
            DecadeHighlights {
                decade,
                count: entries.len(),
                rating_mean: ratings.iter().sum::<f64>() / count,
                rating_median: descriptive::median(&ratings),
                votes_mean: votes.iter().sum::<f64>() / count,
                votes_median: descriptive::median(&votes),
            }
        })
        .collect();

    tracing::info!(
        "found {} high-rated items across {} decades",
        highlights.iter().map(|h| h.count).sum::<usize>(),
        highlights.len()
    );
    highlights
}
