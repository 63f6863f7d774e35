//! JSON output format for scoring and regime runs
//!
//! Undefined scores serialize as `null`, never as zero.

use crate::dataset::DatasetSummary;
use crate::pipeline::{RegimeReport, RunReport, Supplements};
use crate::scoring::{ItemScore, ValueVerdict};
use serde::Serialize;

/// Counts of defined and undefined scores
#[derive(Debug, Clone, Serialize)]
pub struct JsonScoringSummary {
    pub scored_items: usize,
    pub defined_quality: usize,
    pub defined_value: usize,
    pub overrated: usize,
    pub fair: usize,
    pub underrated: usize,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub dataset: &'a DatasetSummary,
    /// Items left after the vote filter
    pub analyzed_items: usize,
    pub scoring: JsonScoringSummary,
    pub items: &'a [ItemScore],
    pub regime: &'a RegimeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplements: Option<&'a Supplements>,
}

impl<'a> JsonOutput<'a> {
    pub fn new(report: &'a RunReport) -> Self {
        let verdicts = |verdict: ValueVerdict| {
            report
                .scoring
                .items
                .iter()
                .filter(|i| i.verdict == Some(verdict))
                .count()
        };

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "ratingshift-json-v1".to_string(),
            dataset: &report.loaded,
            analyzed_items: report.analyzed_items,
            scoring: JsonScoringSummary {
                scored_items: report.scoring.items.len(),
                defined_quality: report.scoring.defined_quality(),
                defined_value: report.scoring.defined_value(),
                overrated: verdicts(ValueVerdict::Overrated),
                fair: verdicts(ValueVerdict::Fair),
                underrated: verdicts(ValueVerdict::Underrated),
            },
            items: &report.scoring.items,
            regime: &report.regime,
            supplements: report.supplements.as_ref(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
