//! Error taxonomy for the scoring and regime-detection engine
//!
//! Insufficient-data conditions are *not* errors: they travel as `None` or as
//! `CutoffStatus::InsufficientEvidence`. Everything here is either a defect in the
//! input table, a broken numerical post-condition, or a bad configuration.

use thiserror::Error;

/// Invariant violations raised by the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("duplicate item identifier '{id}' (rows {first_row} and {second_row})")]
    DuplicateIdentifier {
        id: String,
        first_row: usize,
        second_row: usize,
    },

    #[error("invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("{test} p-value {value} for cutoff {candidate} is outside [0, 1]")]
    PValueOutOfRange {
        test: &'static str,
        candidate: i32,
        value: f64,
    },

    #[error(
        "Cohen's d {cohens_d} for cutoff {candidate} disagrees in sign with t statistic {t_statistic}"
    )]
    EffectSignMismatch {
        candidate: i32,
        cohens_d: f64,
        t_statistic: f64,
    },

    #[error("zero standard deviation in {context} while a z-score was requested")]
    DegenerateSpread { context: String },

    #[error("statistical test failed for cutoff {candidate}: {reason}")]
    TestFailure { candidate: i32, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration problems, detected before any per-item work starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be {expectation}, got {value}")]
    OutOfRange {
        field: &'static str,
        expectation: &'static str,
        value: String,
    },

    #[error("weight row '{category}' sums to {sum}, expected 1")]
    WeightsDoNotSumToOne { category: String, sum: f64 },

    #[error("weight row '{category}' has {component} = {weight}, expected a value in [0, 1]")]
    WeightOutOfRange {
        category: String,
        component: &'static str,
        weight: f64,
    },

    #[error("no weight row for category '{category}' and no default row configured")]
    MissingWeights { category: String },

    #[error("candidate cutoff year list is empty")]
    NoCandidates,
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_identifier_names_the_item() {
        let err = EngineError::DuplicateIdentifier {
            id: "tt0111161".to_string(),
            first_row: 3,
            second_row: 9,
        };
        let message = err.to_string();
        assert!(message.contains("tt0111161"));
        assert!(message.contains("rows 3 and 9"));
    }

    #[test]
    fn test_config_error_converts_into_engine_error() {
        let err: EngineError = ConfigError::NoCandidates.into();
        assert_eq!(err.to_string(), "candidate cutoff year list is empty");
    }
}
