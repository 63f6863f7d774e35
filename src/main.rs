use anyhow::{Context, Result};
use clap::Parser;
use ratingshift::cli::{Cli, OutputFormat};
use ratingshift::config::EngineConfig;
use ratingshift::dataset::{self, Dataset};
use ratingshift::pipeline::{self, RunReport};
use ratingshift::{csv_output, json_output::JsonOutput, regime};
use std::fmt::Write as _;
use std::fs::{self, File};
use tracing_subscriber::EnvFilter;

/// Initialize the stderr tracing subscriber; `--debug` raises the level to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dataset(cli: &Cli, config: &EngineConfig) -> Result<Dataset> {
    let file = File::open(&cli.input)
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;
    let parsed = if cli.input_is_json() {
        dataset::read_json(file)
    } else {
        dataset::read_csv(file)
    };
    let records = parsed.with_context(|| format!("Failed to read {}", cli.input.display()))?;

    tracing::info!("loaded {} records from {}", records.len(), cli.input.display());
    Ok(Dataset::new(records, &config.dataset.rating_scale)?)
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:+.3}", v)).unwrap_or_else(|| "-".to_string())
}

fn render_text(report: &RunReport, config: &EngineConfig) -> String {
    let mut out = String::new();
    let loaded = &report.loaded;
    let _ = writeln!(
        out,
        "Loaded {} items ({} undated, {} categories); {} with >= {} votes analyzed",
        loaded.total_items,
        loaded.undated_items,
        loaded.categories,
        report.analyzed_items,
        config.dataset.min_votes
    );
    let _ = writeln!(
        out,
        "Scored {} items: {} with quality, {} with value",
        report.scoring.items.len(),
        report.scoring.defined_quality(),
        report.scoring.defined_value()
    );
    out.push('\n');

    out.push_str(&regime::to_report_string(
        &report.regime.candidates,
        report.regime.method,
        report.regime.significance_level,
    ));
    out.push('\n');

    let n = config.regime.top_n;
    for (heading, items) in [
        ("Most overrated", report.scoring.most_overrated(n)),
        ("Most underrated", report.scoring.most_underrated(n)),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}:", heading);
        for item in items {
            let _ = writeln!(
                out,
                "  {:<12} {:<24} value {} (quality {}, rating z {})",
                item.id,
                item.title.as_deref().unwrap_or(""),
                optional(item.value),
                optional(item.quality),
                optional(item.rating_z)
            );
        }
    }

    if let Some(supplements) = &report.supplements {
        out.push('\n');
        let suspicious: Vec<&str> = supplements
            .genre_anomalies
            .iter()
            .filter(|g| g.suspicious)
            .map(|g| g.genre.as_str())
            .collect();
        let _ = writeln!(
            out,
            "Genres with suspicious recent shifts: {}",
            if suspicious.is_empty() {
                "none".to_string()
            } else {
                suspicious.join(", ")
            }
        );
        for franchise in supplements.franchises.comparisons.iter().filter(|c| c.suspicious) {
            let _ = writeln!(
                out,
                "Franchise lead in {}: {:+.2} over standalone (p={:.4})",
                franchise.genre, franchise.difference, franchise.p_value
            );
        }
        if let Some(docs) = &supplements.documentaries {
            let _ = writeln!(
                out,
                "Documentaries: vote efficiency {:+.3} vs history, {} of {} recent above threshold",
                docs.efficiency_boost, docs.suspicious_count, docs.recent_count
            );
        }
        if let Some(votes) = &supplements.vote_clustering {
            let _ = writeln!(
                out,
                "Vote counts: manipulation likelihood {} ({})",
                votes.likelihood, votes.verdict
            );
        }
        for decade in &supplements.high_rated {
            let _ = writeln!(
                out,
                "  {}s: {} high-rated items (mean {:.2})",
                decade.decade, decade.count, decade.rating_mean
            );
        }
        for era in &supplements.top_rated {
            if let Some(best) = era.items.first() {
                let _ = writeln!(
                    out,
                    "  {}: top rated {} ({:.1}, {} votes)",
                    era.era,
                    best.title.as_deref().unwrap_or(&best.id),
                    best.rating,
                    best.votes
                );
            }
        }
    }

    out
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    let config = cli.engine_config()?;
    let dataset = load_dataset(&cli, &config)?;
    let report = pipeline::run(&dataset, &config, cli.supplements)?;

    if let Some(path) = &cli.items_csv {
        fs::write(path, csv_output::items_to_csv(&report.scoring.items)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let rendered = match cli.format {
        OutputFormat::Text => render_text(&report, &config),
        OutputFormat::Json => JsonOutput::new(&report).to_json()?,
        OutputFormat::Csv => csv_output::ranking_to_csv(
            &report.regime.candidates,
            report.regime.significance_level,
        )?,
    };

    match &cli.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", rendered),
    }

    Ok(())
}
