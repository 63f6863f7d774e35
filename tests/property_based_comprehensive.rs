//! Comprehensive property-based tests for pre-commit hook
//!
//! Covers the core invariants of ratingshift with proptest. Designed to run
//! under 30 seconds as a pre-commit quality gate.
//!
//! Core features tested:
//! 1. Distribution tails stay within [0, 1]
//! 2. Cohort winsorization and value scores
//! 3. Cutoff testing and ranking totality
//! 4. Item table parsing never panics

use proptest::prelude::*;
use ratingshift::config::{CombineMethod, RegimeConfig};
use ratingshift::regime;
use ratingshift::scoring;

const TOLERANCE: f64 = 1e-9;

fn in_unit_interval(p: f64) -> bool {
    (-TOLERANCE..=1.0 + TOLERANCE).contains(&p)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_student_t_pvalue_is_a_probability(t in -50.0f64..50.0, df in 1.0f64..5000.0) {
        let p = regime::student_t_two_sided(t, df);
        prop_assert!(in_unit_interval(p), "t={} df={} p={}", t, df, p);
    }

    #[test]
    fn prop_student_t_pvalue_decreases_with_statistic(t in 0.0f64..20.0, df in 2.0f64..500.0) {
        let near = regime::student_t_two_sided(t, df);
        let far = regime::student_t_two_sided(t + 0.5, df);
        prop_assert!(far <= near + TOLERANCE);
    }

    #[test]
    fn prop_f_and_chi2_tails_are_probabilities(
        x in 0.0f64..200.0,
        d1 in 1.0f64..20.0,
        d2 in 1.0f64..2000.0,
    ) {
        prop_assert!(in_unit_interval(regime::f_sf(x, d1, d2)));
        prop_assert!(in_unit_interval(regime::chi2_sf(x, d1)));
    }

    #[test]
    fn prop_kolmogorov_tail_is_monotone(lambda in 0.0f64..5.0) {
        let p = regime::kolmogorov_sf(lambda);
        prop_assert!((0.0..=1.0).contains(&p));
        prop_assert!(regime::kolmogorov_sf(lambda + 0.1) <= p + TOLERANCE);
    }

    #[test]
    fn prop_probit_inverts_normal_cdf(z in -6.0f64..6.0) {
        let back = regime::probit(regime::normal_cdf(z));
        prop_assert!((back - z).abs() < 1e-6, "z={} back={}", z, back);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_winsorize_stays_within_bounds(
        value in -1e6f64..1e6,
        mean in -100.0f64..100.0,
        std in 0.01f64..50.0,
        sigma in 0.5f64..5.0,
    ) {
        let clipped = scoring::winsorize(value, mean, std, sigma);
        prop_assert!(clipped >= mean - sigma * std - TOLERANCE);
        prop_assert!(clipped <= mean + sigma * std + TOLERANCE);
        if (value - mean).abs() <= sigma * std {
            prop_assert_eq!(clipped, value);
        }
    }

    #[test]
    fn prop_value_conventions_are_opposite(
        quality in proptest::option::of(-5.0f64..5.0),
        rating_z in proptest::option::of(-5.0f64..5.0),
    ) {
        let value = scoring::score(quality, rating_z);
        let inverted = scoring::score_inverted(quality, rating_z);
        prop_assert_eq!(value.is_some(), quality.is_some() && rating_z.is_some());
        if let (Some(v), Some(i)) = (value, inverted) {
            prop_assert!((v + i).abs() < TOLERANCE);
        }
    }

    #[test]
    fn prop_average_ranks_sum_to_triangle(values in prop::collection::vec(0.0f64..1.0, 1..40)) {
        let ranks = regime::average_ranks(&values);
        let n = values.len() as f64;
        let total: f64 = ranks.iter().sum();
        prop_assert!((total - n * (n + 1.0) / 2.0).abs() < 1e-6);
        prop_assert!(ranks.iter().all(|&r| (1.0..=n).contains(&r)));
    }
}

/// Year-ordered (year, rating) pairs over 1990..2010
fn series_strategy() -> impl Strategy<Value = Vec<(i32, f64)>> {
    prop::collection::vec(
        (1990i32..2010, 1.0f64..10.0),
        20..200,
    )
    .prop_map(|mut pairs| {
        pairs.sort_by_key(|(year, _)| *year);
        pairs
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_sweep_and_rank_are_total(
        series in series_strategy(),
        candidates in prop::collection::btree_set(1985i32..2015, 1..8),
        method in prop_oneof![
            Just(CombineMethod::MeanNegLog10),
            Just(CombineMethod::Stouffer),
            Just(CombineMethod::MeanRank),
        ],
    ) {
        let config = RegimeConfig { min_group_size: 5, ..RegimeConfig::default() };
        let candidates: Vec<i32> = candidates.into_iter().collect();

        let results = regime::sweep(&series, &candidates, &config).unwrap();
        prop_assert_eq!(results.len(), candidates.len());

        for result in &results {
            if let Some(ps) = result.primary_pvalues() {
                prop_assert!(ps.iter().all(|p| (0.0..=1.0).contains(p)));
            }
            if let (Some(d), Some(diff)) = (result.cohens_d, result.mean_difference) {
                prop_assert_eq!(d > 0.0, diff > 0.0);
            }
        }

        let ranked = regime::rank(results, method);
        let ranks: Vec<usize> = ranked.iter().map(|c| c.rank).collect();
        prop_assert_eq!(ranks, (1..=candidates.len()).collect::<Vec<_>>());

        // Scored candidates never follow unscored ones
        let first_unscored = ranked.iter().position(|c| c.score.is_none()).unwrap_or(ranked.len());
        prop_assert!(ranked[first_unscored..].iter().all(|c| c.score.is_none()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_read_csv_never_panics(body in "[a-z0-9,|.\\n-]{0,200}") {
        let table = format!("id,year,categories,rating,votes\n{}", body);
        let _ = ratingshift::dataset::read_csv(table.as_bytes());
    }

    #[test]
    fn prop_parse_year_accepts_plain_years(year in 1870i32..2100) {
        prop_assert_eq!(ratingshift::dataset::parse_year(&year.to_string()), Some(year));
        prop_assert_eq!(ratingshift::dataset::parse_year(&format!("{}-{}", year, year + 3)), None);
    }
}
