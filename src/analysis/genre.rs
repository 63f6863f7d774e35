//! Recent-vs-historical rating comparison per category

use crate::config::{TTestVariant, YearRange};
use crate::dataset::Dataset;
use crate::descriptive;
use crate::error::Result;
use crate::regime::{cohens_d, effect_size_label, t_test};
use serde::Serialize;
use std::collections::BTreeMap;

/// Both periods need this many ratings in a category
pub const MIN_ITEMS_PER_GENRE: usize = 10;

/// |d| above this (with p below `SUSPICIOUS_P`) marks a category as suspicious
pub const SUSPICIOUS_EFFECT: f64 = 0.5;
pub const SUSPICIOUS_P: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreAnomaly {
    pub genre: String,
    pub recent_mean: f64,
    pub historical_mean: f64,
    /// recent_mean - historical_mean
    pub difference: f64,
    pub recent_count: usize,
    pub historical_count: usize,
    pub t_statistic: f64,
    pub p_value: f64,
    pub cohens_d: f64,
    pub effect_size: &'static str,
    pub suspicious: bool,
}

#[derive(Default)]
struct Periods {
    recent: Vec<f64>,
    historical: Vec<f64>,
}

/// Welch t-test of every category's recent ratings against its history
///
/// Items count toward every tag they carry. "Historical" is everything released
/// before `recent.start`. Categories with too few ratings in either period, or
/// with no spread at all, are skipped. Sorted by d descending.
pub fn genre_anomalies(
    dataset: &Dataset,
    recent: &YearRange,
    min_per_genre: usize,
) -> Result<Vec<GenreAnomaly>> {
    let mut periods: BTreeMap<&str, Periods> = BTreeMap::new();
    for item in dataset.items() {
        let Some(year) = item.year else { continue };
        for genre in &item.categories {
            let entry = periods.entry(genre.as_str()).or_default();
            if recent.contains(year) {
                entry.recent.push(item.rating);
            } else if year < recent.start {
                entry.historical.push(item.rating);
            }
        }
    }

    let mut anomalies = Vec::new();
    for (genre, Periods { recent: now, historical }) in periods {
        if now.len() < min_per_genre || historical.len() < min_per_genre {
            continue;
        }

        let (Some(m_recent), Some(m_hist)) =
            (descriptive::moments(&now), descriptive::moments(&historical))
        else {
            continue;
        };
        let Some(d) = cohens_d(&m_hist, &m_recent) else {
            tracing::debug!("genre {}: no rating spread, skipped", genre);
            continue;
        };

        let outcome = t_test(&historical, &now, TTestVariant::Welch, recent.start)?;

        anomalies.push(GenreAnomaly {
            genre: genre.to_string(),
            recent_mean: m_recent.mean,
            historical_mean: m_hist.mean,
            difference: m_recent.mean - m_hist.mean,
            recent_count: now.len(),
            historical_count: historical.len(),
            t_statistic: outcome.statistic,
            p_value: outcome.p_value,
            cohens_d: d,
            effect_size: effect_size_label(d),
            suspicious: d.abs() > SUSPICIOUS_EFFECT && outcome.p_value < SUSPICIOUS_P,
        });
    }

    anomalies.sort_by(|a, b| {
        b.cohens_d
            .total_cmp(&a.cohens_d)
            .then_with(|| a.genre.cmp(&b.genre))
    });

    tracing::info!(
        "genre anomalies: {} categories tested, {} suspicious",
        anomalies.len(),
        anomalies.iter().filter(|a| a.suspicious).count()
    );

    Ok(anomalies)
}
