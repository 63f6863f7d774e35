// Cohort-relative quality scoring
//
// raw item records -> cohort normalization -> quality composite -> value score
//
// Every stage is a pure function of its inputs and the EngineConfig. Undefined
// values travel as `None` from the normalizer to the value score; nothing is ever
// defaulted to zero.

mod cohort;
mod quality;
mod value;

pub use cohort::{
    normalize, primary_category, winsorize, zscore, CohortKey, CohortStats, CohortStatus,
    NormalizeOptions, NormalizedComponent,
};
pub use quality::{compose, ComponentZScores, CompositeScore, Contribution, MIN_DEFINED_COMPONENTS};
pub use value::{score, score_inverted, ValueVerdict};

use crate::config::{EngineConfig, QualityComponent};
use crate::dataset::{Dataset, RATING_COMPONENT};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-item row of the scoring output table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemScore {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub primary_category: Option<String>,
    pub cohort: Option<CohortKey>,
    pub components: ComponentZScores,
    pub quality: Option<f64>,
    pub rating_z: Option<f64>,
    pub value: Option<f64>,
    pub verdict: Option<ValueVerdict>,
}

/// Result of a scoring run
#[derive(Debug, Clone)]
pub struct ScoringReport {
    pub items: Vec<ItemScore>,
    /// Normalization detail keyed by component name (includes `rating`)
    pub normalized: BTreeMap<String, NormalizedComponent>,
}

impl ScoringReport {
    pub fn defined_quality(&self) -> usize {
        self.items.iter().filter(|i| i.quality.is_some()).count()
    }

    pub fn defined_value(&self) -> usize {
        self.items.iter().filter(|i| i.value.is_some()).count()
    }

    /// Most negative value scores first
    pub fn most_overrated(&self, n: usize) -> Vec<&ItemScore> {
        let mut scored: Vec<&ItemScore> = self.items.iter().filter(|i| i.value.is_some()).collect();
        scored.sort_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.into_iter().take(n).collect()
    }

    /// Most positive value scores first
    pub fn most_underrated(&self, n: usize) -> Vec<&ItemScore> {
        let mut scored: Vec<&ItemScore> = self.items.iter().filter(|i| i.value.is_some()).collect();
        scored.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.into_iter().take(n).collect()
    }
}

/// Normalize, compose, and value-score every item in `dataset`
///
/// Configuration problems (including a category with no weight row and no default)
/// are reported before any item is scored.
pub fn score_dataset(dataset: &Dataset, config: &EngineConfig) -> Result<ScoringReport> {
    config.validate()?;
    let scoring = &config.scoring;

    let primaries: Vec<&str> = dataset
        .items()
        .iter()
        .filter_map(|item| primary_category(item, &scoring.category_priority))
        .collect();
    scoring.weights.ensure_covers(primaries.iter().copied())?;

    let options = NormalizeOptions::from(scoring);
    let mut normalized = BTreeMap::new();
    for name in QualityComponent::ALL
        .iter()
        .map(|c| c.as_str())
        .chain(std::iter::once(RATING_COMPONENT))
    {
        let component = normalize(dataset.items(), name, &options)?;
        tracing::debug!(
            "normalized {}: {} of {} items defined across {} cohorts",
            name,
            component.defined_count(),
            dataset.len(),
            component.cohorts.len()
        );
        normalized.insert(name.to_string(), component);
    }

    let lookup = |component: &str, id: &str| normalized.get(component).and_then(|n| n.get(id));

    let mut items = Vec::with_capacity(dataset.len());
    for item in dataset.items() {
        let primary = primary_category(item, &scoring.category_priority);
        let components = ComponentZScores {
            critical_acclaim: lookup(QualityComponent::CriticalAcclaim.as_str(), &item.id),
            legacy: lookup(QualityComponent::Legacy.as_str(), &item.id),
            technical: lookup(QualityComponent::Technical.as_str(), &item.id),
        };

        let quality = match primary {
            Some(category) => compose(category, &components, &scoring.weights)?.score,
            None => None,
        };
        let rating_z = lookup(RATING_COMPONENT, &item.id);
        let value = score(quality, rating_z);

        items.push(ItemScore {
            id: item.id.clone(),
            title: item.title.clone(),
            primary_category: primary.map(str::to_string),
            cohort: CohortKey::for_item(item, &scoring.category_priority),
            components,
            quality,
            rating_z,
            value,
            verdict: ValueVerdict::classify(value, scoring.value_band),
        });
    }

    let report = ScoringReport { items, normalized };
    tracing::info!(
        "scored {} items: {} quality composites, {} value scores",
        report.items.len(),
        report.defined_quality(),
        report.defined_value()
    );

    Ok(report)
}
