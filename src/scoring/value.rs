//! Value score: objective quality against crowd rating
//!
//! `value = quality_z - rating_z`. Negative means the crowd rates the item above
//! its quality (overrated); positive means underrated.

use serde::Serialize;
use std::fmt;

/// Quality composite minus rating z-score; undefined if either side is
pub fn score(quality: Option<f64>, rating_z: Option<f64>) -> Option<f64> {
    Some(quality? - rating_z?)
}

/// Same quantity under the opposite sign convention (`rating_z - quality`)
pub fn score_inverted(quality: Option<f64>, rating_z: Option<f64>) -> Option<f64> {
    Some(rating_z? - quality?)
}

/// Reading of a value score against a neutral band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueVerdict {
    /// Rating exceeds objective quality
    Overrated,
    /// Within the neutral band
    Fair,
    /// Objective quality exceeds rating
    Underrated,
}

impl ValueVerdict {
    pub fn classify(value: Option<f64>, band: f64) -> Option<Self> {
        let value = value?;
        Some(if value < -band {
            ValueVerdict::Overrated
        } else if value > band {
            ValueVerdict::Underrated
        } else {
            ValueVerdict::Fair
        })
    }
}

impl fmt::Display for ValueVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueVerdict::Overrated => write!(f, "overrated"),
            ValueVerdict::Fair => write!(f, "fair"),
            ValueVerdict::Underrated => write!(f, "underrated"),
        }
    }
}
