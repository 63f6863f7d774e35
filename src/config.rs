//! Engine configuration
//!
//! Every threshold the engine uses lives here and is passed explicitly into each
//! component's entry point. Nothing reads ambient global state.
//!
//! # Example ratingshift.toml
//!
//! ```toml
//! [dataset]
//! min_votes = 1000
//! analysis_years = { start = 1980, end = 2024 }
//!
//! [scoring]
//! min_cohort_size = 10
//! winsor_sigma = 3.0
//! category_priority = ["Documentary", "Animation", "Horror"]
//!
//! [scoring.weights.default]
//! critical_acclaim = 0.40
//! legacy = 0.35
//! technical = 0.25
//!
//! [regime]
//! candidate_years = [2000, 2008, 2012, 2018, 2020]
//! min_group_size = 30
//! combine = "mean_neg_log10"
//!
//! [analysis]
//! recent_years = { start = 2019, end = 2024 }
//!
//! [[analysis.franchises]]
//! name = "Dune"
//! keywords = ["Dune"]
//! ```

use crate::error::ConfigError;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Key of the fallback row in the genre weight table
pub const DEFAULT_WEIGHT_ROW: &str = "default";

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// The three named quality components combined by the composer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityComponent {
    CriticalAcclaim,
    Legacy,
    Technical,
}

impl QualityComponent {
    pub const ALL: [QualityComponent; 3] = [
        QualityComponent::CriticalAcclaim,
        QualityComponent::Legacy,
        QualityComponent::Technical,
    ];

    /// Column / component name used in item tables
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityComponent::CriticalAcclaim => "critical_acclaim",
            QualityComponent::Legacy => "legacy",
            QualityComponent::Technical => "technical",
        }
    }
}

/// One row of the genre weight table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRow {
    pub critical_acclaim: f64,
    pub legacy: f64,
    pub technical: f64,
}

impl WeightRow {
    pub const fn new(critical_acclaim: f64, legacy: f64, technical: f64) -> Self {
        Self {
            critical_acclaim,
            legacy,
            technical,
        }
    }

    pub fn weight(&self, component: QualityComponent) -> f64 {
        match component {
            QualityComponent::CriticalAcclaim => self.critical_acclaim,
            QualityComponent::Legacy => self.legacy,
            QualityComponent::Technical => self.technical,
        }
    }

    pub fn sum(&self) -> f64 {
        self.critical_acclaim + self.legacy + self.technical
    }

    fn validate(&self, category: &str) -> std::result::Result<(), ConfigError> {
        for component in QualityComponent::ALL {
            let weight = self.weight(component);
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::WeightOutOfRange {
                    category: category.to_string(),
                    component: component.as_str(),
                    weight,
                });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne {
                category: category.to_string(),
                sum,
            });
        }

        Ok(())
    }
}

/// Genre weight table keyed by category name, with an optional `default` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenreWeights {
    rows: BTreeMap<String, WeightRow>,
}

impl Default for GenreWeights {
    fn default() -> Self {
        let rows = [
            (DEFAULT_WEIGHT_ROW, WeightRow::new(0.40, 0.35, 0.25)),
            ("Documentary", WeightRow::new(0.55, 0.30, 0.15)),
            ("Drama", WeightRow::new(0.50, 0.35, 0.15)),
            ("Comedy", WeightRow::new(0.40, 0.40, 0.20)),
            ("Horror", WeightRow::new(0.35, 0.40, 0.25)),
            ("Animation", WeightRow::new(0.30, 0.30, 0.40)),
            ("Action", WeightRow::new(0.30, 0.30, 0.40)),
            ("Sci-Fi", WeightRow::new(0.30, 0.30, 0.40)),
        ];

        Self {
            rows: rows
                .into_iter()
                .map(|(name, row)| (name.to_string(), row))
                .collect(),
        }
    }
}

impl GenreWeights {
    /// Build a table from explicit rows (include `"default"` for a fallback row)
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, WeightRow)>,
        S: Into<String>,
    {
        Self {
            rows: rows.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Weight row for a category, falling back to the default row
    pub fn row_for(&self, category: &str) -> Option<&WeightRow> {
        self.rows
            .get(category)
            .or_else(|| self.rows.get(DEFAULT_WEIGHT_ROW))
    }

    pub fn has_default(&self) -> bool {
        self.rows.contains_key(DEFAULT_WEIGHT_ROW)
    }

    /// Fail if any of `categories` would have no weight row
    pub fn ensure_covers<'a, I>(&self, categories: I) -> std::result::Result<(), ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.has_default() {
            return Ok(());
        }

        for category in categories {
            if !self.rows.contains_key(category) {
                return Err(ConfigError::MissingWeights {
                    category: category.to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (category, row) in &self.rows {
            row.validate(category)?;
        }
        Ok(())
    }
}

/// Which two-sample t-test variant the mean-difference test uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TTestVariant {
    /// Pooled-variance Student t-test
    #[default]
    Student,
    /// Unequal-variance Welch t-test
    Welch,
}

/// How per-test p-values are combined into one evidence score (higher = stronger)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CombineMethod {
    /// Mean of -log10(p) over the primary tests
    #[default]
    MeanNegLog10,
    /// Stouffer's Z: sum of probit(1 - p) divided by sqrt(k)
    Stouffer,
    /// (m + 1) minus the mean of per-test p-value ranks across evaluated candidates
    MeanRank,
}

/// Inclusive year range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

/// Bounds of the rating scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl RatingScale {
    pub fn contains(&self, rating: f64) -> bool {
        rating.is_finite() && rating >= self.min && rating <= self.max
    }
}

/// Dataset inclusion rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Items with fewer votes are excluded from analysis
    pub min_votes: u64,
    /// Years considered by the regime tester
    pub analysis_years: YearRange,
    pub rating_scale: RatingScale,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            min_votes: 1000,
            analysis_years: YearRange::new(1980, 2024),
            rating_scale: RatingScale {
                min: 0.0,
                max: 10.0,
            },
        }
    }
}

/// Cohort normalization and composite scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Cohorts with fewer defined values are insufficient
    pub min_cohort_size: usize,
    /// Winsorization bound in cohort standard deviations
    pub winsor_sigma: f64,
    /// |value| at or below this is classified `Fair`
    pub value_band: f64,
    /// Category order used to pick an item's primary category
    pub category_priority: Vec<String>,
    pub weights: GenreWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_cohort_size: 10,
            winsor_sigma: 3.0,
            value_band: 0.5,
            category_priority: [
                "Documentary",
                "Animation",
                "Horror",
                "Sci-Fi",
                "Western",
                "Musical",
                "War",
                "Film-Noir",
                "Thriller",
                "Comedy",
                "Action",
                "Drama",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            weights: GenreWeights::default(),
        }
    }
}

/// Regime-change testing and ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub candidate_years: Vec<i32>,
    /// Each side of a cutoff needs at least this many ratings
    pub min_group_size: usize,
    /// Half-width (years) of the Mann-Kendall window around a cutoff
    pub trend_window: i32,
    pub t_test: TTestVariant,
    pub combine: CombineMethod,
    /// Alpha used when labelling a test as significant in reports
    pub significance_level: f64,
    /// Number of candidates in the top-N summary
    pub top_n: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            candidate_years: vec![2000, 2008, 2012, 2018, 2020],
            min_group_size: 30,
            trend_window: 10,
            t_test: TTestVariant::Student,
            combine: CombineMethod::MeanNegLog10,
            significance_level: 0.05,
            top_n: 3,
        }
    }
}

/// A named franchise, recognised by case-insensitive title keywords
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Franchise {
    pub name: String,
    pub keywords: Vec<String>,
}

impl Franchise {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Franchises tagged in recent releases
pub fn default_franchises() -> Vec<Franchise> {
    vec![
        Franchise::new(
            "MCU",
            &[
                "Avengers", "Spider-Man", "Thor", "Black Widow", "Eternals", "Shang-Chi",
                "Doctor Strange", "Black Panther", "Guardians", "Ant-Man", "Captain Marvel",
                "Loki", "WandaVision", "Hawkeye", "Moon Knight", "She-Hulk", "Wakanda",
            ],
        ),
        Franchise::new(
            "DC",
            &[
                "Batman", "Superman", "Wonder Woman", "Aquaman", "Flash", "Black Adam",
                "Shazam", "Joker", "Suicide Squad", "Peacemaker", "Harley Quinn",
            ],
        ),
        Franchise::new(
            "Star Wars",
            &[
                "Mandalorian", "Boba Fett", "Ahsoka", "Obi-Wan", "Andor",
                "Rise of Skywalker", "Bad Batch", "Star Wars",
            ],
        ),
        Franchise::new("Fast & Furious", &["Fast", "Furious", "Hobbs & Shaw"]),
        Franchise::new("John Wick", &["John Wick"]),
        Franchise::new("Avatar", &["Avatar", "Way of Water"]),
        Franchise::new("Jurassic", &["Jurassic World", "Jurassic Park"]),
        Franchise::new("Mission Impossible", &["Mission: Impossible", "Mission Impossible"]),
        Franchise::new("Top Gun", &["Top Gun"]),
        Franchise::new("Dune", &["Dune"]),
    ]
}

/// Supplementary analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Period compared against everything released before it
    pub recent_years: YearRange,
    /// Ratings needed in both periods before a category is compared
    pub min_per_genre: usize,
    pub high_rating_threshold: f64,
    pub high_rating_min_votes: u64,
    pub franchises: Vec<Franchise>,
    /// Categories in which franchise and standalone releases are compared
    pub franchise_genres: Vec<String>,
    /// Vote floor for the per-era top-rated lists
    pub top_rated_min_votes: u64,
    pub top_per_era: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            recent_years: YearRange::new(2019, 2024),
            min_per_genre: 10,
            high_rating_threshold: 8.0,
            high_rating_min_votes: 10_000,
            franchises: default_franchises(),
            franchise_genres: ["Action", "Sci-Fi", "Adventure", "Thriller", "Drama"]
                .iter()
                .map(|g| g.to_string())
                .collect(),
            top_rated_min_votes: 10_000,
            top_per_era: 250,
        }
    }
}

/// Top-level configuration for a scoring + regime run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dataset: DatasetConfig,
    pub scoring: ScoringConfig,
    pub regime: RegimeConfig,
    pub analysis: AnalysisConfig,
}

impl EngineConfig {
    /// Stricter preset: larger cohorts and groups, tighter winsorization
    pub fn strict() -> Self {
        let mut config = Self::default();
        config.scoring.min_cohort_size = 25;
        config.scoring.winsor_sigma = 2.5;
        config.regime.min_group_size = 100;
        config.regime.significance_level = 0.01;
        config
    }

    /// Looser preset for small catalogs
    pub fn permissive() -> Self {
        let mut config = Self::default();
        config.dataset.min_votes = 0;
        config.scoring.min_cohort_size = 5;
        config.scoring.winsor_sigma = 4.0;
        config.regime.min_group_size = 10;
        config.regime.significance_level = 0.10;
        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Validate every threshold and the weight table
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let scale = &self.dataset.rating_scale;
        if !(scale.min.is_finite() && scale.max.is_finite() && scale.min < scale.max) {
            return Err(out_of_range(
                "dataset.rating_scale",
                "a finite range with min < max",
                format!("[{}, {}]", scale.min, scale.max),
            ));
        }

        let years = &self.dataset.analysis_years;
        if years.start > years.end {
            return Err(out_of_range(
                "dataset.analysis_years",
                "a range with start <= end",
                format!("{}..={}", years.start, years.end),
            ));
        }

        if self.scoring.min_cohort_size < 2 {
            return Err(out_of_range(
                "scoring.min_cohort_size",
                ">= 2",
                self.scoring.min_cohort_size.to_string(),
            ));
        }

        if !(self.scoring.winsor_sigma.is_finite() && self.scoring.winsor_sigma > 0.0) {
            return Err(out_of_range(
                "scoring.winsor_sigma",
                "a positive finite number",
                self.scoring.winsor_sigma.to_string(),
            ));
        }

        if !(self.scoring.value_band.is_finite() && self.scoring.value_band >= 0.0) {
            return Err(out_of_range(
                "scoring.value_band",
                "non-negative",
                self.scoring.value_band.to_string(),
            ));
        }

        self.scoring.weights.validate()?;

        if self.regime.candidate_years.is_empty() {
            return Err(ConfigError::NoCandidates);
        }

        if self.regime.min_group_size < 2 {
            return Err(out_of_range(
                "regime.min_group_size",
                ">= 2 for a two-sample test",
                self.regime.min_group_size.to_string(),
            ));
        }

        if self.regime.trend_window < 1 {
            return Err(out_of_range(
                "regime.trend_window",
                ">= 1",
                self.regime.trend_window.to_string(),
            ));
        }

        if !(self.regime.significance_level > 0.0 && self.regime.significance_level < 1.0) {
            return Err(out_of_range(
                "regime.significance_level",
                "in (0, 1)",
                self.regime.significance_level.to_string(),
            ));
        }

        let recent = &self.analysis.recent_years;
        if recent.start > recent.end {
            return Err(out_of_range(
                "analysis.recent_years",
                "a range with start <= end",
                format!("{}..={}", recent.start, recent.end),
            ));
        }

        if self.analysis.min_per_genre < 2 {
            return Err(out_of_range(
                "analysis.min_per_genre",
                ">= 2 for a two-sample test",
                self.analysis.min_per_genre.to_string(),
            ));
        }

        if let Some(franchise) = self
            .analysis
            .franchises
            .iter()
            .find(|f| f.keywords.iter().all(|k| k.trim().is_empty()))
        {
            return Err(out_of_range(
                "analysis.franchises",
                "at least one non-empty keyword per franchise",
                franchise.name.clone(),
            ));
        }

        if self.analysis.top_per_era == 0 {
            return Err(out_of_range(
                "analysis.top_per_era",
                ">= 1",
                self.analysis.top_per_era.to_string(),
            ));
        }

        Ok(())
    }

    /// Candidate years, deduplicated and ascending
    pub fn candidate_years(&self) -> Vec<i32> {
        self.regime
            .candidate_years
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn out_of_range(field: &'static str, expectation: &'static str, value: String) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        expectation,
        value,
    }
}
