//! ratingshift - cohort-relative quality scoring and rating regime-change detection
//!
//! This library scores rated items against their (decade, primary category)
//! cohort, compares objective quality with popular rating, and tests candidate
//! cutoff years for a structural break in the rating distribution.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod dataset;
pub mod descriptive;
pub mod error;
pub mod json_output;
pub mod pipeline;
pub mod regime;
pub mod scoring;

pub use config::EngineConfig;
pub use dataset::{Dataset, ItemRecord};
pub use error::{ConfigError, EngineError, Result};
