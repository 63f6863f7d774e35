//! Item table: record model, entry validation, and loaders
//!
//! The engine never fetches or deduplicates data. It receives a fully materialized
//! table, checks column presence and basic ranges, and refuses duplicate identifiers.

use crate::config::{RatingScale, YearRange};
use crate::descriptive;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use thiserror::Error;

/// Columns with fixed meaning; every other column is a raw quality component
pub const RESERVED_COLUMNS: [&str; 6] = ["id", "title", "year", "categories", "rating", "votes"];

const REQUIRED_COLUMNS: [&str; 5] = ["id", "year", "categories", "rating", "votes"];

/// Component name that resolves to the item's own rating
pub const RATING_COMPONENT: &str = "rating";

/// Errors while reading an item table from CSV or JSON
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("item table is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse {column} value '{value}'")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One rated entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Release year; `None` when missing, unparseable, or a range
    #[serde(default)]
    pub year: Option<i32>,
    /// Category tags in source order (at least one)
    pub categories: Vec<String>,
    pub rating: f64,
    pub votes: u64,
    /// Named raw quality components; `None` = unknown
    #[serde(default)]
    pub components: BTreeMap<String, Option<f64>>,
}

impl ItemRecord {
    pub fn new(id: impl Into<String>, year: Option<i32>, categories: &[&str], rating: f64) -> Self {
        Self {
            id: id.into(),
            title: None,
            year,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            rating,
            votes: 0,
            components: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_votes(mut self, votes: u64) -> Self {
        self.votes = votes;
        self
    }

    pub fn with_component(mut self, name: &str, value: Option<f64>) -> Self {
        self.components.insert(name.to_string(), value);
        self
    }

    /// Raw value of a component; `"rating"` resolves to the rating itself
    pub fn component(&self, name: &str) -> Option<f64> {
        if name == RATING_COMPONENT {
            return Some(self.rating);
        }
        self.components.get(name).copied().flatten()
    }

    /// `year / 10`, e.g. 1994 -> 199
    pub fn decade(&self) -> Option<i32> {
        self.year.map(|y| y.div_euclid(10))
    }
}

/// Validated snapshot of the item table
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    items: Vec<ItemRecord>,
}

impl Dataset {
    /// Validate records and build a dataset
    ///
    /// Fails on the first duplicate identifier, empty category list, out-of-scale
    /// rating, or non-finite component value.
    pub fn new(items: Vec<ItemRecord>, scale: &RatingScale) -> Result<Self> {
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(items.len());

        for (row, item) in items.iter().enumerate() {
            if item.id.trim().is_empty() {
                return Err(EngineError::InvalidRecord {
                    id: format!("<row {}>", row),
                    reason: "empty identifier".to_string(),
                });
            }

            if let Some(&first_row) = seen.get(item.id.as_str()) {
                return Err(EngineError::DuplicateIdentifier {
                    id: item.id.clone(),
                    first_row,
                    second_row: row,
                });
            }
            seen.insert(item.id.as_str(), row);

            if item.categories.iter().all(|c| c.trim().is_empty()) {
                return Err(invalid(item, "no category tags".to_string()));
            }

            if !scale.contains(item.rating) {
                return Err(invalid(
                    item,
                    format!(
                        "rating {} outside scale [{}, {}]",
                        item.rating, scale.min, scale.max
                    ),
                ));
            }

            for (name, value) in &item.components {
                if matches!(value, Some(v) if !v.is_finite()) {
                    return Err(invalid(item, format!("component '{}' is not finite", name)));
                }
            }
        }

        Ok(Self { items })
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keep items with at least `min_votes` votes
    pub fn with_min_votes(&self, min_votes: u64) -> Dataset {
        Dataset {
            items: self
                .items
                .iter()
                .filter(|item| item.votes >= min_votes)
                .cloned()
                .collect(),
        }
    }

    /// (year, rating) pairs for dated items within `years`, ordered by year
    pub fn timeseries(&self, years: &YearRange) -> Vec<(i32, f64)> {
        let mut series: Vec<(i32, f64)> = self
            .items
            .iter()
            .filter_map(|item| item.year.map(|year| (year, item.rating)))
            .filter(|(year, _)| years.contains(*year))
            .collect();
        series.sort_by_key(|(year, _)| *year);
        series
    }

    /// Every category tag present in the table
    pub fn categories(&self) -> BTreeSet<&str> {
        self.items
            .iter()
            .flat_map(|item| item.categories.iter().map(String::as_str))
            .collect()
    }

    pub fn summary(&self) -> DatasetSummary {
        let years: Vec<f64> = self
            .items
            .iter()
            .filter_map(|item| item.year)
            .map(f64::from)
            .collect();

        DatasetSummary {
            total_items: self.items.len(),
            rated_items: self.items.iter().filter(|item| item.votes > 0).count(),
            undated_items: self.items.len() - years.len(),
            year_min: self.items.iter().filter_map(|item| item.year).min(),
            year_max: self.items.iter().filter_map(|item| item.year).max(),
            median_year: descriptive::median(&years),
            categories: self.categories().len(),
        }
    }
}

fn invalid(item: &ItemRecord, reason: String) -> EngineError {
    EngineError::InvalidRecord {
        id: item.id.clone(),
        reason,
    }
}

/// Quick quality overview of a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_items: usize,
    pub rated_items: usize,
    pub undated_items: usize,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub median_year: Option<f64>,
    pub categories: usize,
}

/// Read an item table from CSV
///
/// Categories are `|`- or `,`-separated inside their cell. Empty cells and `\N` are
/// nulls; ranged or unparseable years become `None`.
pub fn read_csv<R: Read>(reader: R) -> std::result::Result<Vec<ItemRecord>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let position = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(DatasetError::MissingColumn(name))
    };

    for name in REQUIRED_COLUMNS {
        position(name)?;
    }
    let id_col = position("id")?;
    let year_col = position("year")?;
    let categories_col = position("categories")?;
    let rating_col = position("rating")?;
    let votes_col = position("votes")?;
    let title_col = headers.iter().position(|h| h == "title");

    let component_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !RESERVED_COLUMNS.contains(h))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut items = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        let field = |col: usize| record.get(col).unwrap_or("");

        let rating = parse_required::<f64>(field(rating_col), row, "rating")?;
        let votes = parse_required::<u64>(field(votes_col), row, "votes")?;

        let mut components = BTreeMap::new();
        for (col, name) in &component_cols {
            let raw = field(*col);
            let value = if is_null(raw) {
                None
            } else {
                Some(raw.parse::<f64>().map_err(|_| DatasetError::Parse {
                    row,
                    column: name.clone(),
                    value: raw.to_string(),
                })?)
            };
            components.insert(name.clone(), value);
        }

        items.push(ItemRecord {
            id: field(id_col).to_string(),
            title: title_col
                .map(field)
                .filter(|t| !is_null(t))
                .map(str::to_string),
            year: parse_year(field(year_col)),
            categories: split_categories(field(categories_col)),
            rating,
            votes,
            components,
        });
    }

    Ok(items)
}

/// Read an item table from a JSON array of records
pub fn read_json<R: Read>(reader: R) -> std::result::Result<Vec<ItemRecord>, DatasetError> {
    Ok(serde_json::from_reader(reader)?)
}

fn is_null(raw: &str) -> bool {
    raw.is_empty() || raw == "\\N" || raw.eq_ignore_ascii_case("nan")
}

fn parse_required<T: std::str::FromStr>(
    raw: &str,
    row: usize,
    column: &str,
) -> std::result::Result<T, DatasetError> {
    raw.parse::<T>().map_err(|_| DatasetError::Parse {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Parse a release year; ranges such as `2020-2023`, out-of-range numbers and
/// junk yield `None`
pub fn parse_year(raw: &str) -> Option<i32> {
    if is_null(raw) {
        return None;
    }
    raw.parse::<i32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|y| y.fract() == 0.0)
            .filter(|y| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(y))
            .map(|y| y as i32)
    })
}

fn split_categories(raw: &str) -> Vec<String> {
    raw.split(['|', ','])
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "\\N")
        .map(str::to_string)
        .collect()
}
