//! Documentary vote efficiency: rating earned per thousand votes
//!
//! A coordinated push shows up as documentaries rated far higher than their
//! vote count would suggest. Recent documentaries are compared against the
//! historical baseline, and any recent one above the baseline mean plus
//! `OUTLIER_SIGMA` σ is listed.

use crate::config::{TTestVariant, YearRange};
use crate::dataset::{Dataset, ItemRecord};
use crate::descriptive;
use crate::error::Result;
use crate::regime::{pooled_std, t_test};
use serde::Serialize;

pub const DOCUMENTARY: &str = "Documentary";
pub const OUTLIER_SIGMA: f64 = 2.0;
/// Longest outlier list carried in the report
pub const MAX_LISTED_OUTLIERS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficientDocumentary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub year: i32,
    pub rating: f64,
    pub votes: u64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentaryReport {
    pub recent_count: usize,
    pub historical_count: usize,
    pub recent_mean_rating: f64,
    pub historical_mean_rating: f64,
    pub recent_efficiency: f64,
    pub historical_efficiency: f64,
    /// recent_efficiency - historical_efficiency
    pub efficiency_boost: f64,
    /// Welch t-test of recent against historical efficiency; `None` without spread
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// Historical mean plus `OUTLIER_SIGMA` sample σ
    pub outlier_threshold: Option<f64>,
    pub suspicious_count: usize,
    /// Most efficient first, at most `MAX_LISTED_OUTLIERS`
    pub suspicious: Vec<EfficientDocumentary>,
}

/// Rating per thousand votes; undefined without votes
pub fn vote_efficiency(rating: f64, votes: u64) -> Option<f64> {
    (votes > 0).then(|| rating / (votes as f64 / 1000.0))
}

struct Documentary<'a> {
    item: &'a ItemRecord,
    year: i32,
    efficiency: f64,
}

fn efficiencies(docs: &[Documentary<'_>]) -> Vec<f64> {
    docs.iter().map(|d| d.efficiency).collect()
}

/// Mean rating of a non-empty period
fn mean_rating(docs: &[Documentary<'_>]) -> f64 {
    docs.iter().map(|d| d.item.rating).sum::<f64>() / docs.len() as f64
}

/// Compare recent documentaries against those released before `recent.start`
///
/// `None` when either period has no documentary with votes.
pub fn documentary_efficiency(
    dataset: &Dataset,
    recent: &YearRange,
) -> Result<Option<DocumentaryReport>> {
    let mut now = Vec::new();
    let mut historical = Vec::new();
    for item in dataset.items() {
        if !item.categories.iter().any(|c| c == DOCUMENTARY) {
            continue;
        }
        let (Some(year), Some(efficiency)) = (item.year, vote_efficiency(item.rating, item.votes))
        else {
            continue;
        };
        let doc = Documentary {
            item,
            year,
            efficiency,
        };
        if recent.contains(year) {
            now.push(doc);
        } else if year < recent.start {
            historical.push(doc);
        }
    }

    let (eff_now, eff_hist) = (efficiencies(&now), efficiencies(&historical));

    let (Some(m_now), Some(m_hist)) =
        (descriptive::moments(&eff_now), descriptive::moments(&eff_hist))
    else {
        tracing::info!(
            "documentary efficiency: {} recent and {} historical documentaries, not compared",
            now.len(),
            historical.len()
        );
        return Ok(None);
    };

    let outcome = match pooled_std(&m_hist, &m_now) {
        Some(pooled) if pooled > 0.0 => {
            Some(t_test(&eff_hist, &eff_now, TTestVariant::Welch, recent.start)?)
        }
        _ => None,
    };

    let outlier_threshold = m_hist.sample_std().map(|s| m_hist.mean + OUTLIER_SIGMA * s);
    let mut suspicious: Vec<EfficientDocumentary> = match outlier_threshold {
        Some(threshold) => now
            .iter()
            .filter(|d| d.efficiency > threshold)
            .map(|d| EfficientDocumentary {
                id: d.item.id.clone(),
                title: d.item.title.clone(),
                year: d.year,
                rating: d.item.rating,
                votes: d.item.votes,
                efficiency: d.efficiency,
            })
            .collect(),
        None => Vec::new(),
    };
    suspicious.sort_by(|a, b| {
        b.efficiency
            .total_cmp(&a.efficiency)
            .then_with(|| a.id.cmp(&b.id))
    });
    let suspicious_count = suspicious.len();
    suspicious.truncate(MAX_LISTED_OUTLIERS);

    let report = DocumentaryReport {
        recent_count: now.len(),
        historical_count: historical.len(),
        recent_mean_rating: mean_rating(&now),
        historical_mean_rating: mean_rating(&historical),
        recent_efficiency: m_now.mean,
        historical_efficiency: m_hist.mean,
        efficiency_boost: m_now.mean - m_hist.mean,
        t_statistic: outcome.map(|o| o.statistic),
        p_value: outcome.map(|o| o.p_value),
        outlier_threshold,
        suspicious_count,
        suspicious,
    };

    tracing::info!(
        "documentary efficiency boost {:+.3} (p={}); {} of {} recent documentaries above threshold",
        report.efficiency_boost,
        report
            .p_value
            .map(|p| format!("{:.4}", p))
            .unwrap_or_else(|| "-".to_string()),
        report.suspicious_count,
        report.recent_count
    );

    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RatingScale;

    fn doc(id: String, year: i32, rating: f64, votes: u64) -> ItemRecord {
        ItemRecord::new(id, Some(year), &[DOCUMENTARY, "History"], rating).with_votes(votes)
    }

    fn dataset(items: Vec<ItemRecord>) -> Dataset {
        Dataset::new(items, &RatingScale { min: 0.0, max: 10.0 }).unwrap()
    }

    #[test]
    fn test_vote_efficiency() {
        assert_eq!(vote_efficiency(8.0, 2_000), Some(4.0));
        assert_eq!(vote_efficiency(8.0, 0), None);
    }

    #[test]
    fn test_high_efficiency_recent_documentaries_are_listed() {
        let mut items = Vec::new();
        // Historical efficiency 7.0 / (10000..14000 / 1000): 0.5..0.7
        for i in 0..30 {
            items.push(doc(format!("h{}", i), 2000 + i % 15, 7.0, 10_000 + 1_000 * (i % 5) as u64));
        }
        // Ordinary recent documentaries
        for i in 0..10 {
            items.push(doc(format!("r{}", i), 2020, 7.0, 10_000 + 1_000 * (i % 5) as u64));
        }
        // Highly rated on very few votes: 9.0 / 1.0 and 8.5 / 1.0
        items.push(doc("push-a".to_string(), 2021, 9.0, 1_000));
        items.push(doc("push-b".to_string(), 2022, 8.5, 1_000));
        // Not a documentary
        items.push(ItemRecord::new("drama", Some(2021), &["Drama"], 9.9).with_votes(100));

        let report = documentary_efficiency(&dataset(items), &YearRange::new(2019, 2024))
            .unwrap()
            .unwrap();

        assert_eq!(report.recent_count, 12);
        assert_eq!(report.historical_count, 30);
        assert!((report.historical_mean_rating - 7.0).abs() < 1e-9);
        assert!(report.efficiency_boost > 0.0);
        assert!(report.t_statistic.unwrap() > 0.0);

        let ids: Vec<&str> = report.suspicious.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["push-a", "push-b"]);
        assert_eq!(report.suspicious_count, 2);
        assert!((report.suspicious[0].efficiency - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_period_is_not_compared() {
        let items = vec![doc("r".to_string(), 2020, 7.0, 5_000)];
        assert_eq!(
            documentary_efficiency(&dataset(items), &YearRange::new(2019, 2024)).unwrap(),
            None
        );
    }

    #[test]
    fn test_constant_efficiency_has_no_test() {
        let items: Vec<ItemRecord> = (0..6)
            .map(|i| doc(format!("d{}", i), if i < 3 { 2000 } else { 2020 }, 6.0, 2_000))
            .collect();
        let report = documentary_efficiency(&dataset(items), &YearRange::new(2019, 2024))
            .unwrap()
            .unwrap();
        assert_eq!(report.t_statistic, None);
        assert_eq!(report.efficiency_boost, 0.0);
        assert_eq!(report.suspicious_count, 0);
    }
}
