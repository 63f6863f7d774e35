//! Cohort-relative normalization
//!
//! Items are grouped by (decade, primary category). Within each sufficient cohort a
//! component is winsorized to `mean ± k·σ` and z-scored against the *pre-clip* mean
//! and σ. Clipping bounds an outlier's influence on its own score without moving the
//! cohort baseline, so clipped cohorts are not re-centred.
//!
//! σ is the population standard deviation (divide by n).

use crate::config::ScoringConfig;
use crate::dataset::ItemRecord;
use crate::descriptive;
use crate::error::{EngineError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Reference population for normalization
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CohortKey {
    /// `year / 10`
    pub decade: i32,
    pub category: String,
}

impl CohortKey {
    pub fn new(decade: i32, category: impl Into<String>) -> Self {
        Self {
            decade,
            category: category.into(),
        }
    }

    /// Key for an item, `None` when it has no year or no usable category
    pub fn for_item(item: &ItemRecord, priority: &[String]) -> Option<Self> {
        let decade = item.decade()?;
        let category = primary_category(item, priority)?;
        Some(Self::new(decade, category))
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s/{}", self.decade * 10, self.category)
    }
}

/// Designated primary category
///
/// The first entry of `priority` that the item carries wins; when none of its tags
/// are listed, the item's first tag in source order is used.
pub fn primary_category<'a>(item: &'a ItemRecord, priority: &[String]) -> Option<&'a str> {
    priority
        .iter()
        .find_map(|wanted| item.categories.iter().find(|c| *c == wanted))
        .or_else(|| item.categories.iter().find(|c| !c.trim().is_empty()))
        .map(String::as_str)
}

/// Options for one normalization pass
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub min_cohort_size: usize,
    pub winsor_sigma: f64,
    pub category_priority: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

impl From<&ScoringConfig> for NormalizeOptions {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            min_cohort_size: config.min_cohort_size,
            winsor_sigma: config.winsor_sigma,
            category_priority: config.category_priority.clone(),
        }
    }
}

/// Outcome of the statistics step for one cohort
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CohortStatus {
    /// Enough defined values and non-zero spread
    Sufficient { mean: f64, std: f64, clipped: usize },
    /// Fewer defined values than the configured minimum
    Insufficient,
    /// Every defined value identical, σ = 0
    Degenerate { mean: f64 },
}

/// Per-cohort bookkeeping, reported alongside the z-scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortStats {
    pub members: usize,
    pub defined: usize,
    pub status: CohortStatus,
}

/// z-scores of one component for every item
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedComponent {
    pub component: String,
    pub scores: BTreeMap<String, Option<f64>>,
    pub cohorts: BTreeMap<CohortKey, CohortStats>,
}

impl NormalizedComponent {
    /// z-score of an item; `None` when undefined or unknown
    pub fn get(&self, id: &str) -> Option<f64> {
        self.scores.get(id).copied().flatten()
    }

    pub fn defined_count(&self) -> usize {
        self.scores.values().filter(|z| z.is_some()).count()
    }
}

/// z-score of an already-clipped value
///
/// A zero σ here means a degenerate cohort slipped past the status check.
pub fn zscore(clipped: f64, mean: f64, std: f64, cohort: &CohortKey) -> Result<f64> {
    if std == 0.0 || !std.is_finite() {
        return Err(EngineError::DegenerateSpread {
            context: format!("cohort {}", cohort),
        });
    }
    Ok((clipped - mean) / std)
}

/// Clip `value` into `[mean - k·std, mean + k·std]`
pub fn winsorize(value: f64, mean: f64, std: f64, sigma: f64) -> f64 {
    let bound = sigma * std;
    value.clamp(mean - bound, mean + bound)
}

/// Normalize `component` within (decade, primary category) cohorts
///
/// Every item in `items` gets an entry; undefined entries are `None`, never zero.
pub fn normalize(
    items: &[ItemRecord],
    component: &str,
    options: &NormalizeOptions,
) -> Result<NormalizedComponent> {
    let mut groups: BTreeMap<CohortKey, Vec<&ItemRecord>> = BTreeMap::new();
    let mut scores: BTreeMap<String, Option<f64>> = BTreeMap::new();

    for item in items {
        match CohortKey::for_item(item, &options.category_priority) {
            Some(key) => groups.entry(key).or_default().push(item),
            None => {
                scores.insert(item.id.clone(), None);
            }
        }
    }

    let mut cohorts = BTreeMap::new();
    for (key, members) in groups {
        let (stats, member_scores) = normalize_cohort(&key, &members, component, options)?;
        if !matches!(stats.status, CohortStatus::Sufficient { .. }) {
            tracing::debug!(
                "{} cohort {} left undefined: {:?} ({} of {} defined)",
                component,
                key,
                stats.status,
                stats.defined,
                stats.members
            );
        }
        scores.extend(member_scores);
        cohorts.insert(key, stats);
    }

    Ok(NormalizedComponent {
        component: component.to_string(),
        scores,
        cohorts,
    })
}

fn normalize_cohort(
    key: &CohortKey,
    members: &[&ItemRecord],
    component: &str,
    options: &NormalizeOptions,
) -> Result<(CohortStats, Vec<(String, Option<f64>)>)> {
    let values: Vec<f64> = members
        .iter()
        .filter_map(|item| item.component(component))
        .collect();

    let undefined = || {
        members
            .iter()
            .map(|item| (item.id.clone(), None))
            .collect::<Vec<_>>()
    };

    let mut stats = CohortStats {
        members: members.len(),
        defined: values.len(),
        status: CohortStatus::Insufficient,
    };

    if values.len() < options.min_cohort_size {
        return Ok((stats, undefined()));
    }

    let Some(moments) = descriptive::moments(&values) else {
        return Ok((stats, undefined()));
    };

    let std = moments.population_std();
    if std == 0.0 {
        stats.status = CohortStatus::Degenerate {
            mean: moments.mean,
        };
        return Ok((stats, undefined()));
    }

    let mut clipped = 0;
    let mut member_scores = Vec::with_capacity(members.len());
    for item in members {
        let z = match item.component(component) {
            Some(raw) => {
                let bounded = winsorize(raw, moments.mean, std, options.winsor_sigma);
                if bounded != raw {
                    clipped += 1;
                }
                Some(zscore(bounded, moments.mean, std, key)?)
            }
            None => None,
        };
        member_scores.push((item.id.clone(), z));
    }

    stats.status = CohortStatus::Sufficient {
        mean: moments.mean,
        std,
        clipped,
    };
    Ok((stats, member_scores))
}
