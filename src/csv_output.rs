//! CSV output format for per-item scores and the cutoff ranking
//!
//! Undefined values are written as empty cells.

use crate::regime::{CutoffStatus, RankedCandidate, TestOutcome};
use crate::scoring::ItemScore;

pub const ITEM_HEADER: [&str; 10] = [
    "id",
    "primary_category",
    "cohort",
    "critical_acclaim_z",
    "legacy_z",
    "technical_z",
    "quality",
    "rating_z",
    "value",
    "verdict",
];

pub const RANKING_HEADER: [&str; 24] = [
    "rank",
    "year",
    "status",
    "n_before",
    "n_after",
    "mean_before",
    "mean_after",
    "mean_diff",
    "cohens_d",
    "t_statistic",
    "t_p",
    "levene_statistic",
    "levene_p",
    "ks_statistic",
    "ks_p",
    "trend_statistic",
    "trend_p",
    "t_clamped",
    "levene_clamped",
    "ks_clamped",
    "trend_clamped",
    "score",
    "reason",
    "significant_tests",
];

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn outcome_cells(outcome: Option<&TestOutcome>) -> [String; 2] {
    [
        cell(outcome.map(|o| o.statistic)),
        cell(outcome.map(|o| o.p_value)),
    ]
}

fn clamped_cell(outcome: Option<&TestOutcome>) -> String {
    outcome.map(|o| o.clamped.to_string()).unwrap_or_default()
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> anyhow::Result<String> {
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Per-item score table
pub fn items_to_csv(items: &[ItemScore]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ITEM_HEADER)?;

    for item in items {
        writer.write_record([
            item.id.clone(),
            item.primary_category.clone().unwrap_or_default(),
            item.cohort.as_ref().map(|c| c.to_string()).unwrap_or_default(),
            cell(item.components.critical_acclaim),
            cell(item.components.legacy),
            cell(item.components.technical),
            cell(item.quality),
            cell(item.rating_z),
            cell(item.value),
            item.verdict.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }

    into_string(writer)
}

/// Ranked cutoff table, one row per candidate in rank order
pub fn ranking_to_csv(ranked: &[RankedCandidate], alpha: f64) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(RANKING_HEADER)?;

    for candidate in ranked {
        let result = &candidate.result;
        let (status, reason) = match &result.status {
            CutoffStatus::Evaluated => ("evaluated", String::new()),
            CutoffStatus::InsufficientEvidence { reason } => ("insufficient_evidence", reason.clone()),
        };
        let tests = [
            result.t_test.as_ref(),
            result.levene.as_ref(),
            result.ks.as_ref(),
            result.trend.as_ref(),
        ];
        let significant = tests
            .iter()
            .flatten()
            .filter(|o| o.is_significant(alpha))
            .count();

        let mut record = vec![
            candidate.rank.to_string(),
            result.candidate_year.to_string(),
            status.to_string(),
            result.before.n.to_string(),
            result.after.n.to_string(),
            cell(result.before.mean),
            cell(result.after.mean),
            cell(result.mean_difference),
            cell(result.cohens_d),
        ];
        for outcome in tests {
            record.extend(outcome_cells(outcome));
        }
        for outcome in tests {
            record.push(clamped_cell(outcome));
        }
        record.push(cell(candidate.score));
        record.push(reason);
        record.push(if result.is_evaluated() {
            significant.to_string()
        } else {
            String::new()
        });

        writer.write_record(&record)?;
    }

    into_string(writer)
}
