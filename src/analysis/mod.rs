//! Supplementary descriptive analyses
//!
//! Views of the item table that sit beside the scoring and regime engines:
//! per-year inflation, per-category recent-vs-historical drift, franchise and
//! documentary rating checks, vote-count digit checks, and high-rated items per
//! decade and era. None of them feed the regime ranking.

pub mod benford;
pub mod decades;
pub mod documentary;
pub mod eras;
pub mod franchise;
pub mod genre;
pub mod inflation;

pub use benford::{vote_clustering, ManipulationLikelihood, VoteClustering};
pub use decades::{high_rated_by_decade, DecadeHighlights};
pub use documentary::{documentary_efficiency, vote_efficiency, DocumentaryReport, EfficientDocumentary};
pub use eras::{era_of, top_rated_by_era, Era, EraRanking, TopRatedItem, ERAS};
pub use franchise::{franchise_coordination, franchise_of, FranchiseComparison, FranchiseReport};
pub use genre::{genre_anomalies, GenreAnomaly, MIN_ITEMS_PER_GENRE};
pub use inflation::{yearly_summary, YearSummary};

pub use crate::regime::effect_size_label;
