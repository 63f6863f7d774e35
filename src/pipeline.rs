//! End-to-end runs over a loaded item table
//!
//! Both engines read the same cleaned table: the loaded dataset filtered to
//! `dataset.min_votes`. Configuration is validated once, before any per-item work.

use crate::analysis::{
    documentary_efficiency, franchise_coordination, genre_anomalies, high_rated_by_decade,
    top_rated_by_era, vote_clustering, yearly_summary, DecadeHighlights, DocumentaryReport,
    EraRanking, FranchiseReport, GenreAnomaly, VoteClustering, YearSummary,
};
use crate::config::{CombineMethod, EngineConfig};
use crate::dataset::{Dataset, DatasetSummary};
use crate::error::Result;
use crate::regime::{rank, sweep, RankedCandidate};
use crate::scoring::{score_dataset, ScoringReport};
use serde::Serialize;

/// Ranked regime-change candidates for one run
#[derive(Debug, Clone, Serialize)]
pub struct RegimeReport {
    /// Ratings in the analysis window after the vote filter
    pub series_len: usize,
    pub method: CombineMethod,
    pub significance_level: f64,
    pub candidates: Vec<RankedCandidate>,
}

impl RegimeReport {
    /// Highest-ranked evaluated candidate
    pub fn strongest(&self) -> Option<&RankedCandidate> {
        self.candidates.iter().find(|c| c.score.is_some())
    }
}

/// Descriptive views computed alongside the engines
#[derive(Debug, Clone, Serialize)]
pub struct Supplements {
    pub yearly: Vec<YearSummary>,
    pub genre_anomalies: Vec<GenreAnomaly>,
    pub franchises: FranchiseReport,
    pub documentaries: Option<DocumentaryReport>,
    pub vote_clustering: Option<VoteClustering>,
    pub high_rated: Vec<DecadeHighlights>,
    pub top_rated: Vec<EraRanking>,
}

/// Everything a full run produces
#[derive(Debug, Clone)]
pub struct RunReport {
    pub loaded: DatasetSummary,
    /// Items left after the vote filter
    pub analyzed_items: usize,
    pub scoring: ScoringReport,
    pub regime: RegimeReport,
    pub supplements: Option<Supplements>,
}

/// Apply the vote filter shared by both engines
pub fn clean(dataset: &Dataset, config: &EngineConfig) -> Dataset {
    let cleaned = dataset.with_min_votes(config.dataset.min_votes);
    tracing::info!(
        "{} of {} items have at least {} votes",
        cleaned.len(),
        dataset.len(),
        config.dataset.min_votes
    );
    cleaned
}

/// Score every item of an already cleaned dataset
pub fn run_scoring(cleaned: &Dataset, config: &EngineConfig) -> Result<ScoringReport> {
    score_dataset(cleaned, config)
}

/// Sweep and rank every configured cutoff year over an already cleaned dataset
pub fn run_regime(cleaned: &Dataset, config: &EngineConfig) -> Result<RegimeReport> {
    config.validate()?;
    let series = cleaned.timeseries(&config.dataset.analysis_years);
    let candidates = config.candidate_years();
    tracing::info!(
        "testing {} cutoff candidates over {} ratings ({}..={})",
        candidates.len(),
        series.len(),
        config.dataset.analysis_years.start,
        config.dataset.analysis_years.end
    );

    let results = sweep(&series, &candidates, &config.regime)?;
    let ranked = rank(results, config.regime.combine);

    if let Some(best) = ranked.iter().find(|c| c.score.is_some()) {
        tracing::info!(
            "strongest regime-change evidence at {}",
            best.result.candidate_year
        );
    } else {
        tracing::warn!("no candidate had enough ratings on both sides");
    }

    Ok(RegimeReport {
        series_len: series.len(),
        method: config.regime.combine,
        significance_level: config.regime.significance_level,
        candidates: ranked,
    })
}

/// Descriptive analyses; `loaded` is the unfiltered table, which the
/// high-rated and top-rated views filter with their own vote thresholds
pub fn run_supplements(
    loaded: &Dataset,
    cleaned: &Dataset,
    config: &EngineConfig,
) -> Result<Supplements> {
    let analysis = &config.analysis;
    Ok(Supplements {
        yearly: yearly_summary(cleaned, &config.dataset.analysis_years),
        genre_anomalies: genre_anomalies(cleaned, &analysis.recent_years, analysis.min_per_genre)?,
        franchises: franchise_coordination(
            cleaned,
            &analysis.recent_years,
            &analysis.franchises,
            &analysis.franchise_genres,
        )?,
        documentaries: documentary_efficiency(cleaned, &analysis.recent_years)?,
        vote_clustering: vote_clustering(loaded, &analysis.recent_years),
        high_rated: high_rated_by_decade(
            loaded,
            analysis.high_rating_threshold,
            analysis.high_rating_min_votes,
        ),
        top_rated: top_rated_by_era(loaded, analysis.top_rated_min_votes, analysis.top_per_era),
    })
}

/// Validate, clean, then run scoring, regime detection, and optionally the
/// supplementary analyses
pub fn run(dataset: &Dataset, config: &EngineConfig, supplements: bool) -> Result<RunReport> {
    config.validate()?;
    let cleaned = clean(dataset, config);

    let scoring = run_scoring(&cleaned, config)?;
    let regime = run_regime(&cleaned, config)?;
    let supplements = if supplements {
        Some(run_supplements(dataset, &cleaned, config)?)
    } else {
        None
    };

    Ok(RunReport {
        loaded: dataset.summary(),
        analyzed_items: cleaned.len(),
        scoring,
        regime,
        supplements,
    })
}
