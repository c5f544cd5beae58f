//! Derive the model's feature frame from promotional / catalog tables.

use chrono::Datelike;
use log::info;
use serde::{Deserialize, Serialize};

use crate::data::filter::retain_rows;
use crate::data::model::{ColumnKind, Table, Value};
use crate::data::parse::{extract_days, mentions_new_low, parse_date, parse_stripped};
use crate::schema::{normalize_columns, NO_SALES_ALIASES, PRICE, RELEASE};

/// Numeric features, in the order the model consumes them.
pub const NUMERIC_FEATURES: [&str; 6] = [
    "Price",
    "discount_pct",
    "rating_pct",
    "game_age_years",
    "ends_days",
    "started_days_ago",
];

pub const BOOLEAN_FEATURES: [&str; 1] = ["is_new_low"];

/// Columns of a promotional sales table.
pub const SALES_COLUMNS: [&str; 8] = [
    "Name", "Price", "Rating", "Release", "Discount", "Ends", "Started", "Note",
];

/// Horizon assumed when no sale end is given.
pub const DEFAULT_ENDS_DAYS: f64 = 30.0;
pub const DEFAULT_STARTED_DAYS_AGO: f64 = 0.0;
pub const DEFAULT_REFERENCE_YEAR: i32 = 2025;

// ---------------------------------------------------------------------------
// Feature frame
// ---------------------------------------------------------------------------

/// Names of the feature columns per kind. Categorical columns are one-hot
/// encoded by the model; none are derived yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumns {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub boolean: Vec<String>,
}

impl FeatureColumns {
    pub fn standard() -> Self {
        FeatureColumns {
            numeric: NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect(),
            categorical: Vec::new(),
            boolean: BOOLEAN_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// All names: numeric, then categorical, then boolean.
    pub fn names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .chain(&self.categorical)
            .chain(&self.boolean)
            .cloned()
            .collect()
    }
}

/// One feature vector. Missing numeric values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub numeric: Vec<f64>,
    pub categorical: Vec<String>,
    pub boolean: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub columns: FeatureColumns,
    pub rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of a numeric column by name.
    #[cfg(test)]
    pub fn numeric(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.numeric.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.numeric[idx]).collect())
    }
}

/// A feature frame with its `on_sale` labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub frame: FeatureFrame,
    pub labels: Vec<bool>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn subset(&self, indices: &[usize]) -> Features {
        Features {
            frame: FeatureFrame {
                columns: self.frame.columns.clone(),
                rows: indices.iter().map(|&i| self.frame.rows[i].clone()).collect(),
            },
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Append the rows of `other`, which must share the column layout.
    pub fn append(&mut self, other: Features) {
        debug_assert_eq!(self.frame.columns, other.frame.columns);
        self.frame.rows.extend(other.frame.rows);
        self.labels.extend(other.labels);
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct FeatureOptions {
    /// Year that `game_age_years` is measured from.
    pub reference_year: i32,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        FeatureOptions {
            reference_year: DEFAULT_REFERENCE_YEAR,
        }
    }
}

/// Build the feature frame and labels for every row of `table`.
///
/// Sales tables label a row on sale when `Discount` is non-empty. A table
/// without `Discount` but with the synthetic `on_sale` column (the merged
/// catalog) uses that label, and its `game_age_years` stands in for
/// unparseable release dates.
pub fn create_features(table: &Table, opts: &FeatureOptions) -> Features {
    let has_discount = table.has_column("Discount");
    let synthetic_label = !has_discount && table.has_column("on_sale");
    if synthetic_label {
        info!("No Discount column; using the synthetic on_sale label");
    }

    let mut rows = Vec::with_capacity(table.len());
    let mut labels = Vec::with_capacity(table.len());

    for i in 0..table.len() {
        let discount = table.get(i, "Discount");
        let label = if synthetic_label {
            table.get(i, "on_sale").as_f64() == Some(1.0)
        } else {
            discount.text().is_some_and(|d| !d.is_empty())
        };

        let price = parse_stripped(table.get(i, PRICE), &['$', ',']).unwrap_or(f64::NAN);
        let discount_pct = parse_stripped(discount, &['%', '-']).unwrap_or(0.0);
        let rating_pct = parse_stripped(table.get(i, "Rating"), &['%']).unwrap_or(f64::NAN);
        let game_age_years = match parse_date(table.get(i, RELEASE)) {
            Some(date) => (opts.reference_year - date.year()) as f64,
            None => table.get(i, "game_age_years").as_f64().unwrap_or(f64::NAN),
        };
        let ends_days = extract_days(table.get(i, "Ends")).unwrap_or(DEFAULT_ENDS_DAYS);
        let started_days_ago =
            extract_days(table.get(i, "Started")).unwrap_or(DEFAULT_STARTED_DAYS_AGO);
        let is_new_low = mentions_new_low(table.get(i, "Note"));

        rows.push(FeatureRow {
            numeric: vec![
                price,
                discount_pct,
                rating_pct,
                game_age_years,
                ends_days,
                started_days_ago,
            ],
            categorical: Vec::new(),
            boolean: vec![is_new_low],
        });
        labels.push(label);
    }

    Features {
        frame: FeatureFrame {
            columns: FeatureColumns::standard(),
            rows,
        },
        labels,
    }
}

/// Shape a table of items that are never discounted like a sales table so
/// its rows can serve as negative examples. Free items are dropped: never
/// discounting something free says nothing.
pub fn process_no_sales(mut table: Table) -> Table {
    normalize_columns(&mut table, NO_SALES_ALIASES);

    let mut out = Table::new(SALES_COLUMNS.iter().map(|c| c.to_string()).collect());
    for i in 0..table.len() {
        out.push_row(SALES_COLUMNS.iter().map(|c| table.get(i, c).clone()).collect());
    }

    for col in SALES_COLUMNS {
        let fill = if col == "Discount" {
            Value::String(String::new())
        } else {
            match out.column_kind(col) {
                ColumnKind::Integer => Value::Integer(0),
                ColumnKind::Float | ColumnKind::Empty => Value::Float(0.0),
                ColumnKind::Bool => Value::Bool(false),
                ColumnKind::Text | ColumnKind::Date => Value::String(String::new()),
            }
        };
        let filled: Vec<Value> = out
            .column(col)
            .map(|cells| {
                cells
                    .map(|v| if v.is_null() { fill.clone() } else { v.clone() })
                    .collect()
            })
            .unwrap_or_default();
        out.set_column(col, filled);
    }

    let removed = retain_rows(&mut out, PRICE, |v| parse_stripped(v, &['$', ',']) != Some(0.0));
    info!(
        "No-sales table: {} rows kept, {removed} free items dropped",
        out.len()
    );
    out
}

// ---------------------------------------------------------------------------
// Single-item queries
// ---------------------------------------------------------------------------

/// The inputs a caller knows about a game it wants a prediction for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleQuery {
    pub price: f64,
    pub rating_pct: f64,
    pub age_years: f64,
    pub is_new_low: bool,
}

impl SaleQuery {
    /// One-row frame assuming the game is not on sale yet.
    pub fn to_frame(&self) -> FeatureFrame {
        FeatureFrame {
            columns: FeatureColumns::standard(),
            rows: vec![FeatureRow {
                numeric: vec![
                    self.price,
                    0.0,
                    self.rating_pct,
                    self.age_years,
                    DEFAULT_ENDS_DAYS,
                    DEFAULT_STARTED_DAYS_AGO,
                ],
                categorical: Vec::new(),
                boolean: vec![self.is_new_low],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| Value::guess(c)).collect())
                .collect(),
        )
    }

    fn sales() -> Table {
        table(
            &SALES_COLUMNS,
            &[
                &["Portal", "$19.99", "95%", "Oct 10, 2007", "-25%", "Ends in 3 days", "Started 2 days ago", "New historical low!"],
                &["Dota 2", "$1,059.50", "80%", "2013-07-09", "", "", "", "Regular price"],
                &["Mystery", "Free", "", "someday", "", "", "", ""],
            ],
        )
    }

    #[test]
    fn sales_rows_become_feature_vectors() {
        let features = create_features(&sales(), &FeatureOptions::default());
        assert_eq!(features.labels, vec![true, false, false]);
        let frame = &features.frame;
        assert_eq!(frame.columns.names().len(), 7);

        assert_eq!(frame.rows[0].numeric, vec![19.99, 25.0, 95.0, 18.0, 3.0, 2.0]);
        assert_eq!(frame.rows[0].boolean, vec![true]);

        assert_eq!(frame.rows[1].numeric, vec![1059.5, 0.0, 80.0, 12.0, 30.0, 0.0]);
        assert_eq!(frame.rows[1].boolean, vec![false]);

        let mystery = &frame.rows[2].numeric;
        assert!(mystery[0].is_nan() && mystery[2].is_nan() && mystery[3].is_nan());
        assert_eq!(&mystery[4..], &[30.0, 0.0]);
    }

    #[test]
    fn merged_catalog_uses_synthetic_label_and_age() {
        let merged = table(
            &["Name", "Price", "Release", "game_age_years", "on_sale"],
            &[&["portal", "19.99", "2007-10-10", "18", "0"], &["dota 2", "0", "", "7.5", "1"]],
        );
        let features = create_features(&merged, &FeatureOptions { reference_year: 2025 });
        assert_eq!(features.labels, vec![false, true]);
        assert_eq!(features.frame.numeric("game_age_years"), Some(vec![18.0, 7.5]));
        assert_eq!(features.frame.numeric("discount_pct"), Some(vec![0.0, 0.0]));
    }

    #[test]
    fn no_sales_rows_are_negative_and_never_free() {
        let raw = table(
            &["AppID", "Name", "Release date", "Price", "Notes"],
            &[
                &["1", "Paid Game", "Jan 5, 2019", "14.99", ""],
                &["2", "Free Game", "Feb 1, 2020", "0", ""],
                &["3", "", "", "", ""],
                &["4", "Cheap", "", "0.99", ""],
            ],
        );
        let processed = process_no_sales(raw);
        assert_eq!(processed.columns, SALES_COLUMNS.to_vec());
        assert_eq!(processed.len(), 2);

        for col in SALES_COLUMNS {
            assert!(processed.column(col).unwrap().all(|v| !v.is_null()), "{col} has nulls");
        }
        assert_eq!(processed.get(1, "Release"), &Value::String(String::new()));
        assert_eq!(processed.get(0, "Discount"), &Value::String(String::new()));
        assert!(processed
            .column("Price")
            .unwrap()
            .all(|v| v.as_f64() != Some(0.0)));

        let features = create_features(&processed, &FeatureOptions::default());
        assert_eq!(features.labels, vec![false, false]);
    }

    #[test]
    fn query_fills_the_not_on_sale_defaults() {
        let frame = SaleQuery {
            price: 59.99,
            rating_pct: 92.0,
            age_years: 2.0,
            is_new_low: false,
        }
        .to_frame();
        assert_eq!(frame.rows[0].numeric, vec![59.99, 0.0, 92.0, 2.0, 30.0, 0.0]);
        assert_eq!(frame.columns, FeatureColumns::standard());
    }
}
