//! Franchise vs standalone ratings within a category
//!
//! Recent items whose title carries a franchise keyword are compared, category
//! by category, against recent items with no franchise match. A franchise lead
//! that is both large and significant is flagged as possible coordinated rating.

use crate::config::{Franchise, TTestVariant, YearRange};
use crate::dataset::{Dataset, ItemRecord};
use crate::descriptive;
use crate::error::Result;
use crate::regime::{cohens_d, t_test};
use serde::Serialize;
use std::collections::BTreeSet;

pub const MIN_FRANCHISE_ITEMS: usize = 5;
pub const MIN_STANDALONE_ITEMS: usize = 10;

/// A franchise lead above this (with p below `SUSPICIOUS_P`) is suspicious
pub const SUSPICIOUS_DIFFERENCE: f64 = 0.3;
pub const SUSPICIOUS_P: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FranchiseComparison {
    pub genre: String,
    pub franchise_mean: f64,
    pub standalone_mean: f64,
    /// franchise_mean - standalone_mean
    pub difference: f64,
    pub franchise_count: usize,
    pub standalone_count: usize,
    /// Welch t, positive when franchise items rate higher
    pub t_statistic: f64,
    pub p_value: f64,
    pub cohens_d: f64,
    pub suspicious: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FranchiseReport {
    /// Recent items whose title matched a franchise
    pub franchise_items: usize,
    /// Distinct franchises among them
    pub franchises_seen: usize,
    pub franchise_mean: Option<f64>,
    pub standalone_mean: Option<f64>,
    /// Largest franchise lead first
    pub comparisons: Vec<FranchiseComparison>,
}

/// First franchise, in configured order, with a keyword in `title` (case-insensitive)
pub fn franchise_of<'a>(title: &str, franchises: &'a [Franchise]) -> Option<&'a str> {
    let title = title.to_lowercase();
    franchises
        .iter()
        .find(|f| {
            f.keywords.iter().any(|k| {
                let k = k.trim();
                !k.is_empty() && title.contains(&k.to_lowercase())
            })
        })
        .map(|f| f.name.as_str())
}

/// Compare franchise and standalone ratings released in `recent`, per genre
///
/// Items count toward every tag they carry. A genre needs
/// `MIN_FRANCHISE_ITEMS` franchise and `MIN_STANDALONE_ITEMS` standalone
/// ratings, and some rating spread, to be compared.
pub fn franchise_coordination(
    dataset: &Dataset,
    recent: &YearRange,
    franchises: &[Franchise],
    genres: &[String],
) -> Result<FranchiseReport> {
    let tagged: Vec<(&ItemRecord, Option<&str>)> = dataset
        .items()
        .iter()
        .filter(|item| item.year.is_some_and(|y| recent.contains(y)))
        .map(|item| {
            let franchise = item
                .title
                .as_deref()
                .and_then(|title| franchise_of(title, franchises));
            (item, franchise)
        })
        .collect();

    let mut comparisons = Vec::new();
    for genre in genres {
        let (franchise, standalone): (Vec<_>, Vec<_>) = tagged
            .iter()
            .filter(|(item, _)| item.categories.iter().any(|c| c == genre))
            .partition(|(_, franchise)| franchise.is_some());
        let franchise: Vec<f64> = franchise.iter().map(|(item, _)| item.rating).collect();
        let standalone: Vec<f64> = standalone.iter().map(|(item, _)| item.rating).collect();

        if franchise.len() < MIN_FRANCHISE_ITEMS || standalone.len() < MIN_STANDALONE_ITEMS {
            tracing::debug!(
                "franchise {}: {} franchise and {} standalone ratings, skipped",
                genre,
                franchise.len(),
                standalone.len()
            );
            continue;
        }

        let (Some(m_franchise), Some(m_standalone)) =
            (descriptive::moments(&franchise), descriptive::moments(&standalone))
        else {
            continue;
        };
        let Some(d) = cohens_d(&m_standalone, &m_franchise) else {
            tracing::debug!("franchise {}: no rating spread, skipped", genre);
            continue;
        };

        let outcome = t_test(&standalone, &franchise, TTestVariant::Welch, recent.start)?;
        let difference = m_franchise.mean - m_standalone.mean;

        comparisons.push(FranchiseComparison {
            genre: genre.clone(),
            franchise_mean: m_franchise.mean,
            standalone_mean: m_standalone.mean,
            difference,
            franchise_count: franchise.len(),
            standalone_count: standalone.len(),
            t_statistic: outcome.statistic,
            p_value: outcome.p_value,
            cohens_d: d,
            suspicious: difference > SUSPICIOUS_DIFFERENCE && outcome.p_value < SUSPICIOUS_P,
        });
    }

    comparisons.sort_by(|a, b| {
        b.difference
            .total_cmp(&a.difference)
            .then_with(|| a.genre.cmp(&b.genre))
    });

    let franchise_ratings: Vec<f64> = tagged
        .iter()
        .filter(|(_, f)| f.is_some())
        .map(|(item, _)| item.rating)
        .collect();
    let standalone_ratings: Vec<f64> = tagged
        .iter()
        .filter(|(_, f)| f.is_none())
        .map(|(item, _)| item.rating)
        .collect();
    let franchises_seen = tagged
        .iter()
        .filter_map(|(_, f)| *f)
        .collect::<BTreeSet<_>>()
        .len();

    let report = FranchiseReport {
        franchise_items: franchise_ratings.len(),
        franchises_seen,
        franchise_mean: descriptive::mean(&franchise_ratings),
        standalone_mean: descriptive::mean(&standalone_ratings),
        comparisons,
    };

    tracing::info!(
        "identified {} franchise items across {} franchises; {} genres compared",
        report.franchise_items,
        report.franchises_seen,
        report.comparisons.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_franchises, RatingScale};

    fn titled(id: String, title: String, year: i32, genre: &str, rating: f64) -> ItemRecord {
        ItemRecord::new(id, Some(year), &[genre], rating)
            .with_title(&title)
            .with_votes(50_000)
    }

    #[test]
    fn test_title_keywords_match_case_insensitively() {
        let franchises = default_franchises();
        assert_eq!(franchise_of("AVENGERS: ENDGAME", &franchises), Some("MCU"));
        assert_eq!(franchise_of("The Batman", &franchises), Some("DC"));
        assert_eq!(franchise_of("Dune: Part Two", &franchises), Some("Dune"));
        assert_eq!(franchise_of("Paddington 2", &franchises), None);
        assert_eq!(franchise_of("Anything", &[Franchise::new("Blank", &["  "])]), None);
    }

    #[test]
    fn test_franchise_lead_is_flagged_per_genre() {
        let mut items = Vec::new();
        for i in 0..8 {
            let jitter = 0.1 * (i % 4) as f64;
            items.push(titled(format!("mcu{}", i), format!("Avengers Part {}", i), 2020 + i % 4, "Action", 7.5 + jitter));
        }
        for i in 0..20 {
            let jitter = 0.1 * (i % 4) as f64;
            items.push(titled(format!("act{}", i), format!("Standalone Action {}", i), 2021, "Action", 6.5 + jitter));
        }
        for i in 0..3 {
            items.push(titled(format!("dc{}", i), format!("Joker {}", i), 2022, "Drama", 8.0));
        }
        for i in 0..15 {
            let jitter = 0.1 * (i % 3) as f64;
            items.push(titled(format!("dra{}", i), format!("Quiet Drama {}", i), 2022, "Drama", 6.0 + jitter));
        }
        // Outside the recent window
        items.push(titled("old".to_string(), "Batman".to_string(), 1989, "Action", 7.5));

        let dataset = Dataset::new(items, &RatingScale { min: 0.0, max: 10.0 }).unwrap();
        let genres = vec!["Action".to_string(), "Drama".to_string()];
        let report = franchise_coordination(
            &dataset,
            &YearRange::new(2019, 2024),
            &default_franchises(),
            &genres,
        )
        .unwrap();

        assert_eq!(report.franchise_items, 11);
        assert_eq!(report.franchises_seen, 2);

        // Drama has only three franchise ratings
        assert_eq!(report.comparisons.len(), 1);
        let action = &report.comparisons[0];
        assert_eq!(action.genre, "Action");
        assert_eq!(action.franchise_count, 8);
        assert_eq!(action.standalone_count, 20);
        assert!((action.difference - 1.0).abs() < 1e-9);
        assert!(action.t_statistic > 0.0);
        assert!(action.cohens_d > 0.0);
        assert!(action.suspicious);
    }

    #[test]
    fn test_no_recent_items_yields_empty_report() {
        let items = vec![titled("a".to_string(), "Batman".to_string(), 1989, "Action", 7.5)];
        let dataset = Dataset::new(items, &RatingScale { min: 0.0, max: 10.0 }).unwrap();
        let report = franchise_coordination(
            &dataset,
            &YearRange::new(2019, 2024),
            &default_franchises(),
            &["Action".to_string()],
        )
        .unwrap();

        assert_eq!(report.franchise_items, 0);
        assert_eq!(report.franchise_mean, None);
        assert!(report.comparisons.is_empty());
    }
}
