// Regime-change detection over a (year, rating) series
//
// For each candidate cutoff year the series is split into before (< year) and
// after (>= year) groups and put through four tests: mean difference, variance
// equality, distribution shape, and a monotonic trend around the cutoff. The
// ranker then orders candidates by how strongly the three primary tests agree
// that something changed.
//
// Candidates are independent of one another. Insufficient data is a result
// (`CutoffStatus::InsufficientEvidence`), never an error.

mod distributions;
mod ranker;
mod statistics;
mod tester;

pub use distributions::{
    chi2_sf, f_sf, incomplete_beta, kolmogorov_sf, ln_gamma, normal_cdf, normal_sf, probit,
    student_t_two_sided,
};
pub use ranker::{average_ranks, rank, to_report_string, top, RankedCandidate, MIN_PVALUE};
pub use statistics::{
    checked_pvalue, cohens_d, effect_size_label, ks_2samp, levene, mann_kendall, pooled_std,
    t_test, TestOutcome, PVALUE_CLAMP_TOLERANCE,
};
pub use tester::{
    sweep, test_cutoff, CutoffCandidateResult, CutoffStatus, GroupSummary, MIN_TREND_YEARS,
};
