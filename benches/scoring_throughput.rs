/// Cohort scoring throughput
///
/// Measures normalization + composition + value scoring over synthetic catalogs
/// of increasing size.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ratingshift::config::{EngineConfig, RatingScale};
use ratingshift::dataset::{Dataset, ItemRecord};
use ratingshift::scoring::score_dataset;
use std::time::Duration;

const CATEGORIES: [&str; 6] = ["Drama", "Comedy", "Horror", "Documentary", "Action", "Animation"];

fn catalog(size: usize) -> Dataset {
    let items = (0..size)
        .map(|i| {
            let year = 1950 + (i % 75) as i32;
            let category = CATEGORIES[i % CATEGORIES.len()];
            let x = ((i * 7919) % 1000) as f64 / 100.0;
            ItemRecord::new(format!("tt{:08}", i), Some(year), &[category], (x % 9.0) + 1.0)
                .with_votes(1_000 + (i as u64 * 37) % 500_000)
                .with_component("critical_acclaim", Some(x))
                .with_component("legacy", Some((x * 1.3) % 10.0))
                .with_component("technical", if i % 11 == 0 { None } else { Some(10.0 - x) })
        })
        .collect();
    Dataset::new(items, &RatingScale { min: 0.0, max: 10.0 }).expect("valid catalog")
}

fn bench_score_dataset(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_dataset");
    group.measurement_time(Duration::from_secs(5));
    let config = EngineConfig::default();

    for size in [1_000usize, 10_000, 50_000] {
        let dataset = catalog(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &dataset, |b, dataset| {
            b.iter(|| black_box(score_dataset(dataset, &config).expect("scoring succeeds")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score_dataset);
criterion_main!(benches);
