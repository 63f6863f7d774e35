//! Top-rated items per release era

use crate::dataset::Dataset;
use serde::Serialize;

/// A labelled, inclusive span of release years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Era {
    pub label: &'static str,
    pub first_year: i32,
    pub last_year: i32,
}

impl Era {
    const fn new(label: &'static str, first_year: i32, last_year: i32) -> Self {
        Self {
            label,
            first_year,
            last_year,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.first_year..=self.last_year).contains(&year)
    }
}

/// Release eras, oldest first; together they cover every year
pub const ERAS: [Era; 6] = [
    Era::new("Pre-1950", i32::MIN, 1949),
    Era::new("1950-1979", 1950, 1979),
    Era::new("1980-1999", 1980, 1999),
    Era::new("2000-2009", 2000, 2009),
    Era::new("2010-2019", 2010, 2019),
    Era::new("2020+", 2020, i32::MAX),
];

pub fn era_of(year: i32) -> Option<&'static Era> {
    ERAS.iter().find(|era| era.contains(year))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRatedItem {
    /// 1-based position within the era
    pub era_rank: usize,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub year: i32,
    pub rating: f64,
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EraRanking {
    pub era: &'static str,
    pub items: Vec<TopRatedItem>,
}

/// The `per_era` best-rated items with at least `min_votes` votes in each era
///
/// Ordered by rating, then votes, both descending; ties fall back to the item id.
/// Eras with no qualifying item are omitted.
pub fn top_rated_by_era(dataset: &Dataset, min_votes: u64, per_era: usize) -> Vec<EraRanking> {
    let rankings: Vec<EraRanking> = ERAS
        .iter()
        .filter_map(|era| {
            let mut members: Vec<_> = dataset
                .items()
                .iter()
                .filter(|item| item.votes >= min_votes)
                .filter_map(|item| item.year.filter(|y| era.contains(*y)).map(|y| (item, y)))
                .collect();
            if members.is_empty() {
                return None;
            }

            members.sort_by(|(a, _), (b, _)| {
                b.rating
                    .total_cmp(&a.rating)
                    .then_with(|| b.votes.cmp(&a.votes))
                    .then_with(|| a.id.cmp(&b.id))
            });

            let items = members
                .into_iter()
                .take(per_era)
                .enumerate()
                .map(|(i, (item, year))| TopRatedItem {
                    era_rank: i + 1,
                    id: item.id.clone(),
                    title: item.title.clone(),
                    year,
                    rating: item.rating,
                    votes: item.votes,
                })
                .collect();
            Some(EraRanking {
                era: era.label,
                items,
            })
        })
        .collect();

    tracing::info!(
        "found {} top-rated items across {} eras (min votes {})",
        rankings.iter().map(|r| r.items.len()).sum::<usize>(),
        rankings.len(),
        min_votes
    );
    rankings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RatingScale;
    use crate::dataset::ItemRecord;

    #[test]
    fn test_every_year_has_exactly_one_era() {
        for year in [i32::MIN, 1000, 1949, 1950, 1979, 1980, 1999, 2000, 2009, 2010, 2019, 2020, 2100] {
            assert_eq!(ERAS.iter().filter(|e| e.contains(year)).count(), 1, "year {}", year);
        }
        assert_eq!(era_of(1994).unwrap().label, "1980-1999");
        assert_eq!(era_of(2020).unwrap().label, "2020+");
    }

    #[test]
    fn test_ranking_breaks_rating_ties_by_votes() {
        let items = vec![
            ItemRecord::new("a", Some(1994), &["Drama"], 9.3).with_votes(2_800_000),
            ItemRecord::new("b", Some(1999), &["Drama"], 8.8).with_votes(20_000),
            ItemRecord::new("c", Some(1995), &["Drama"], 8.8).with_votes(90_000),
            ItemRecord::new("d", Some(1997), &["Drama"], 9.9).with_votes(9_999),
            ItemRecord::new("e", Some(1985), &["Drama"], 7.0).with_votes(15_000),
            ItemRecord::new("f", Some(2021), &["Drama"], 8.0).with_votes(10_000),
            ItemRecord::new("g", None, &["Drama"], 9.0).with_votes(10_000),
        ];
        let dataset = Dataset::new(items, &RatingScale { min: 0.0, max: 10.0 }).unwrap();

        let rankings = top_rated_by_era(&dataset, 10_000, 3);
        assert_eq!(rankings.len(), 2);

        assert_eq!(rankings[0].era, "1980-1999");
        let ids: Vec<&str> = rankings[0].items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert_eq!(rankings[0].items[2].era_rank, 3);

        assert_eq!(rankings[1].era, "2020+");
        assert_eq!(rankings[1].items.len(), 1);
    }
}
