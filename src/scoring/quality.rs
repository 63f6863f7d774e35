//! Genre-weighted quality composite
//!
//! Missing-data policy: a composite needs at least two of the three components.
//! With two or three present, the weights of the present components are rescaled to
//! sum to 1 before the weighted sum is taken.

use crate::config::{GenreWeights, QualityComponent};
use crate::error::{ConfigError, Result};
use serde::Serialize;

/// Minimum number of defined components for a composite
pub const MIN_DEFINED_COMPONENTS: usize = 2;

/// An item's normalized quality components
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComponentZScores {
    pub critical_acclaim: Option<f64>,
    pub legacy: Option<f64>,
    pub technical: Option<f64>,
}

impl ComponentZScores {
    pub fn get(&self, component: QualityComponent) -> Option<f64> {
        match component {
            QualityComponent::CriticalAcclaim => self.critical_acclaim,
            QualityComponent::Legacy => self.legacy,
            QualityComponent::Technical => self.technical,
        }
    }

    pub fn defined(&self) -> usize {
        QualityComponent::ALL
            .iter()
            .filter(|c| self.get(**c).is_some())
            .count()
    }
}

/// One component's share of a composite
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    pub component: QualityComponent,
    /// Weight after renormalization over the defined components
    pub weight: f64,
    pub zscore: f64,
}

/// Composite quality score with the weights that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub score: Option<f64>,
    pub contributions: Vec<Contribution>,
}

impl CompositeScore {
    fn undefined() -> Self {
        Self {
            score: None,
            contributions: Vec::new(),
        }
    }
}

/// Combine z-scores using the weight row of `primary_category`
///
/// Fails only when the table has neither a row for the category nor a default row.
pub fn compose(
    primary_category: &str,
    components: &ComponentZScores,
    weights: &GenreWeights,
) -> Result<CompositeScore> {
    let row = weights
        .row_for(primary_category)
        .ok_or_else(|| ConfigError::MissingWeights {
            category: primary_category.to_string(),
        })?;

    if components.defined() < MIN_DEFINED_COMPONENTS {
        return Ok(CompositeScore::undefined());
    }

    let present: Vec<(QualityComponent, f64, f64)> = QualityComponent::ALL
        .iter()
        .filter_map(|&c| components.get(c).map(|z| (c, row.weight(c), z)))
        .collect();

    let total: f64 = present.iter().map(|(_, w, _)| w).sum();
    if total <= 0.0 {
        return Ok(CompositeScore::undefined());
    }

    let contributions: Vec<Contribution> = present
        .into_iter()
        .map(|(component, weight, zscore)| Contribution {
            component,
            weight: weight / total,
            zscore,
        })
        .collect();

    let score: f64 = contributions.iter().map(|c| c.weight * c.zscore).sum();

    Ok(CompositeScore {
        score: Some(score),
        contributions,
    })
}
