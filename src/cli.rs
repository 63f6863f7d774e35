//! CLI argument parsing for ratingshift

use crate::config::{CombineMethod, EngineConfig, TTestVariant};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV ranking table for spreadsheet analysis
    Csv,
}

/// Built-in threshold presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Default,
    Strict,
    Permissive,
}

#[derive(Parser, Debug)]
#[command(name = "ratingshift")]
#[command(version)]
#[command(
    about = "Cohort-relative quality scoring and rating regime-change detection",
    long_about = None
)]
pub struct Cli {
    /// Item table (CSV, or JSON when the extension is .json)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// TOML configuration file (overrides the preset)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Threshold preset used when no configuration file is given
    #[arg(long = "preset", value_enum, default_value = "default")]
    pub preset: Preset,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also write the per-item score table as CSV
    #[arg(long = "items-csv", value_name = "PATH")]
    pub items_csv: Option<PathBuf>,

    /// Minimum vote count for an item to be analyzed
    #[arg(long = "min-votes", value_name = "N")]
    pub min_votes: Option<u64>,

    /// Candidate cutoff years, comma-separated
    #[arg(long = "candidates", value_name = "YEARS", value_delimiter = ',')]
    pub candidates: Option<Vec<i32>>,

    /// Minimum ratings on each side of a cutoff
    #[arg(long = "min-group-size", value_name = "N")]
    pub min_group_size: Option<usize>,

    /// Minimum cohort size for a defined z-score
    #[arg(long = "min-cohort-size", value_name = "N")]
    pub min_cohort_size: Option<usize>,

    /// How per-test p-values combine into one evidence score
    #[arg(long = "combine", value_enum)]
    pub combine: Option<CombineMethod>,

    /// Use Welch's unequal-variance t-test
    #[arg(long = "welch")]
    pub welch: bool,

    /// Number of candidates and items listed in text summaries
    #[arg(long = "top", value_name = "N")]
    pub top: Option<usize>,

    /// Include inflation, genre, vote-count and decade analyses
    #[arg(long = "supplements")]
    pub supplements: bool,

    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Resolve the configuration: file or preset, then command-line overrides
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => match self.preset {
                Preset::Default => EngineConfig::default(),
                Preset::Strict => EngineConfig::strict(),
                Preset::Permissive => EngineConfig::permissive(),
            },
        };

        if let Some(min_votes) = self.min_votes {
            config.dataset.min_votes = min_votes;
        }
        if let Some(candidates) = &self.candidates {
            config.regime.candidate_years = candidates.clone();
        }
        if let Some(n) = self.min_group_size {
            config.regime.min_group_size = n;
        }
        if let Some(n) = self.min_cohort_size {
            config.scoring.min_cohort_size = n;
        }
        if let Some(method) = self.combine {
            config.regime.combine = method;
        }
        if self.welch {
            config.regime.t_test = TTestVariant::Welch;
        }
        if let Some(n) = self.top {
            config.regime.top_n = n;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn input_is_json(&self) -> bool {
        self.input
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }
}
