//! Reconcile the two raw catalogs into one canonical table.
//!
//! ```text
//!  games ─┐ normalize columns, keys   ┌─ outer join on Name ─┐
//!  store ─┘ drop missing, dedup       │  (_games / _store)   │
//!                                     └──────────┬───────────┘
//!                                                ▼
//!          Price → Release / release_year / game_age_years → impute → on_sale
//! ```

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use log::{info, warn};

use crate::data::filter::{dedup_by, drop_missing};
use crate::data::model::{Table, Value};
use crate::data::parse::{extract_price, parse_date};
use crate::data::stats::{fill_with_median, median, quantile};
use crate::error::{PipelineError, Result};
use crate::schema::{
    first_present, normalize_columns, GAMES_ALIASES, GAMES_SUFFIX, NAME, PRICE,
    PRICE_PRIORITY, RELEASE, RELEASE_PRIORITY, STORE_ALIASES, STORE_SUFFIX,
};

/// Name values that mean "no name".
const MISSING_NAMES: [&str; 4] = ["", "nan", "none", "null"];

/// Text fields unified row by row from their suffixed copies.
const COALESCED_FIELDS: [&str; 3] = ["Developer", "Publisher", "Genre"];

/// Used when no release column exists at all.
pub const DEFAULT_RELEASE_YEAR: i64 = 2020;
pub const DEFAULT_GAME_AGE: f64 = 5.0;
/// Used when no price is known at all.
pub const DEFAULT_PRICE: f64 = 0.0;

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// Year that `game_age_years` is measured from.
    pub current_year: i32,
    /// Prices strictly below this quantile are labelled `on_sale = 1`.
    pub sale_quantile: f64,
}

/// What happened while merging, for logging and inspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub both: usize,
    pub games_only: usize,
    pub store_only: usize,
    pub dropped_missing_names: [usize; 2],
    pub collapsed_duplicates: [usize; 2],
    pub shared_columns: Vec<String>,
    pub price_column: String,
    pub release_column: Option<String>,
    /// Set when the label could not be derived from prices.
    pub label_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct Merged {
    pub table: Table,
    pub report: MergeReport,
}

/// Normalize, join and clean the games and store catalogs.
pub fn clean_and_merge(mut games: Table, mut store: Table, opts: &MergeOptions) -> Result<Merged> {
    info!("Cleaning and merging datasets...");
    let mut report = MergeReport::default();

    for (label, table, aliases) in [
        ("games", &mut games, GAMES_ALIASES),
        ("store", &mut store, STORE_ALIASES),
    ] {
        let renamed = normalize_columns(table, aliases);
        if !renamed.is_empty() {
            info!("Renamed {label} columns: {renamed:?}");
        }
        if !table.has_column(NAME) {
            return Err(PipelineError::schema(
                format!("Name column not found in {label} dataset"),
                &table.columns,
            ));
        }
    }

    for (i, table) in [&mut games, &mut store].into_iter().enumerate() {
        normalize_names(table);
        report.dropped_missing_names[i] = drop_missing(table, NAME);
        report.collapsed_duplicates[i] = dedup_by(table, NAME);
    }
    info!(
        "After dropping missing names: games={} rows, store={} rows",
        games.len(),
        store.len()
    );
    if report.collapsed_duplicates.iter().any(|&n| n > 0) {
        info!(
            "Collapsed repeated names onto their first row: games={}, store={}",
            report.collapsed_duplicates[0], report.collapsed_duplicates[1]
        );
    }

    let mut merged = outer_join(&games, &store, &mut report);
    info!("Merged dataset: {} rows", merged.len());
    info!(
        "Merge statistics: both={}, games_only={}, store_only={}",
        report.both, report.games_only, report.store_only
    );

    report.price_column = reconcile_price(&mut merged)?;
    report.release_column = reconcile_release(&mut merged, opts.current_year);
    for field in COALESCED_FIELDS {
        coalesce_field(&mut merged, field);
    }
    impute_numeric(&mut merged, PRICE, DEFAULT_PRICE);
    impute_numeric(&mut merged, "game_age_years", DEFAULT_GAME_AGE);
    report.label_fallback = !label_on_sale(&mut merged, opts.sale_quantile);

    Ok(Merged {
        table: merged,
        report,
    })
}

/// Lower-case and trim names; missing markers become `Null`.
fn normalize_names(table: &mut Table) {
    let Some(idx) = table.column_index(NAME) else {
        return;
    };
    for row in &mut table.rows {
        let key = row[idx]
            .text()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !MISSING_NAMES.contains(&t.as_str()));
        row[idx] = key.map_or(Value::Null, Value::String);
    }
}

/// Full outer join on `Name`. Shared columns get source suffixes; rows are
/// ordered by key.
fn outer_join(games: &Table, store: &Table, report: &mut MergeReport) -> Table {
    let games_cols: HashSet<&str> = games.columns.iter().map(String::as_str).collect();
    let shared: HashSet<&str> = store
        .columns
        .iter()
        .map(String::as_str)
        .filter(|c| *c != NAME && games_cols.contains(c))
        .collect();
    if !shared.is_empty() {
        let mut listed: Vec<String> = shared.iter().map(|s| s.to_string()).collect();
        listed.sort();
        warn!("Common columns (will get suffixes): {listed:?}");
        report.shared_columns = listed;
    }

    let out_name = |col: &str, suffix: &str| {
        if shared.contains(col) {
            format!("{col}{suffix}")
        } else {
            col.to_string()
        }
    };
    let mut columns: Vec<String> = games
        .columns
        .iter()
        .map(|c| out_name(c.as_str(), GAMES_SUFFIX))
        .collect();
    let store_cols: Vec<usize> = (0..store.columns.len())
        .filter(|&i| store.columns[i] != NAME)
        .collect();
    columns.extend(
        store_cols
            .iter()
            .map(|&i| out_name(store.columns[i].as_str(), STORE_SUFFIX)),
    );

    let mut keyed: BTreeMap<String, (Option<usize>, Option<usize>)> = BTreeMap::new();
    for i in 0..games.len() {
        keyed.entry(games.get(i, NAME).to_string()).or_default().0 = Some(i);
    }
    for i in 0..store.len() {
        keyed.entry(store.get(i, NAME).to_string()).or_default().1 = Some(i);
    }

    let games_name = games.column_index(NAME);
    let mut table = Table::new(columns);
    for (key, sides) in keyed {
        let mut row: Vec<Value> = match sides.0 {
            Some(g) => games.rows[g].clone(),
            None => vec![Value::Null; games.columns.len()],
        };
        if let Some(idx) = games_name {
            row[idx] = Value::String(key);
        }
        match sides.1 {
            Some(s) => row.extend(store_cols.iter().map(|&i| store.rows[s][i].clone())),
            None => row.extend(std::iter::repeat(Value::Null).take(store_cols.len())),
        }
        match sides {
            (Some(_), Some(_)) => report.both += 1,
            (Some(_), None) => report.games_only += 1,
            _ => report.store_only += 1,
        }
        table.push_row(row);
    }
    table
}

/// Parse the highest-priority price column into `Price`.
fn reconcile_price(table: &mut Table) -> Result<String> {
    let source = first_present(table, PRICE_PRIORITY).ok_or_else(|| {
        PipelineError::schema("No Price column found after merge", &table.columns)
    })?;
    info!("Price column used: {source}");
    let prices: Vec<Value> = (0..table.len())
        .map(|i| Value::Float(extract_price(table.get(i, source))))
        .collect();
    table.set_column(PRICE, prices);
    Ok(source.to_string())
}

/// Parse the release column and derive `release_year` / `game_age_years`.
fn reconcile_release(table: &mut Table, current_year: i32) -> Option<String> {
    let source = first_present(table, RELEASE_PRIORITY).map(str::to_string).or_else(|| {
        table
            .columns
            .iter()
            .find(|c| c.to_lowercase().contains("release"))
            .cloned()
    });

    let Some(source) = source else {
        warn!("No Release column found, setting default values");
        let n = table.len();
        table.set_column("release_year", vec![Value::Integer(DEFAULT_RELEASE_YEAR); n]);
        table.set_column("game_age_years", vec![Value::Float(DEFAULT_GAME_AGE); n]);
        return None;
    };
    info!("Release column used: {source}");

    let dates: Vec<Option<NaiveDate>> =
        (0..table.len()).map(|i| parse_date(table.get(i, &source))).collect();
    let mut years: Vec<Option<i64>> = dates
        .iter()
        .map(|d| d.map(|d| d.year() as i64))
        .collect();

    let known: Vec<f64> = years.iter().flatten().map(|&y| y as f64).collect();
    if let Some(median_year) = median(&known) {
        let fill = median_year as i64;
        for year in years.iter_mut().filter(|y| y.is_none()) {
            *year = Some(fill);
        }
    }

    table.set_column(
        RELEASE,
        dates.into_iter().map(|d| d.map_or(Value::Null, Value::Date)).collect(),
    );
    table.set_column(
        "release_year",
        years.iter().map(|y| y.map_or(Value::Null, Value::Integer)).collect(),
    );
    table.set_column(
        "game_age_years",
        years
            .iter()
            .map(|y| y.map_or(Value::Null, |y| Value::Float((current_year as i64 - y) as f64)))
            .collect(),
    );
    Some(source)
}

/// Unify `field` from its `_games` / `_store` copies: each row takes the
/// first present value, games side first. Absent copies are skipped.
fn coalesce_field(table: &mut Table, field: &str) {
    if table.has_column(field) {
        return;
    }
    let sources: Vec<String> = [GAMES_SUFFIX, STORE_SUFFIX]
        .iter()
        .map(|suffix| format!("{field}{suffix}"))
        .filter(|c| table.has_column(c))
        .collect();
    if sources.is_empty() {
        return;
    }
    let values: Vec<Value> = (0..table.len())
        .map(|i| {
            sources
                .iter()
                .map(|c| table.get(i, c))
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect();
    table.set_column(field, values);
}

/// Fill missing cells of a numeric column with its median or `fallback`.
fn impute_numeric(table: &mut Table, column: &str, fallback: f64) {
    let Some(cells) = table.column(column) else {
        return;
    };
    let mut values: Vec<f64> = cells.map(|v| v.as_f64().unwrap_or(f64::NAN)).collect();
    let missing = values.iter().filter(|v| v.is_nan()).count();
    if missing == 0 {
        return;
    }
    let fill = fill_with_median(&mut values, fallback);
    info!("Imputed {missing} missing '{column}' values with {fill}");
    table.set_column(column, values.into_iter().map(Value::Float).collect());
}

/// Synthetic label: 1 when the price is below the `q` quantile. Returns
/// `false` (and labels everything 0) when no price is known.
fn label_on_sale(table: &mut Table, q: f64) -> bool {
    let prices: Vec<f64> = table
        .column(PRICE)
        .map(|cells| cells.map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
        .unwrap_or_default();

    let Some(threshold) = quantile(&prices, q) else {
        warn!("Could not create on_sale label, Price column missing or invalid");
        let n = table.len();
        table.set_column("on_sale", vec![Value::Integer(0); n]);
        return false;
    };
    info!("on_sale threshold: price < {threshold:.2} (quantile {q})");
    table.set_column(
        "on_sale",
        prices
            .iter()
            .map(|&p| Value::Integer(i64::from(p < threshold)))
            .collect(),
    );
    true
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

    fn opts() -> MergeOptions {
        MergeOptions {
            current_year: 2025,
            sale_quantile: 0.3,
        }
    }

    fn games() -> Table {
        table(
            &["AppID", "Name", "Release date", "Price", "Developers"],
            &[
                &["10", "  Counter-Strike ", "Nov 1, 2000", "9.99", "Valve"],
                &["20", "Portal", "Oct 10, 2007", "$19.99", "Valve"],
                &["30", "nan", "Jan 1, 2010", "5.00", "Nobody"],
                &["40", "Indie Gem", "coming soon", "Free", "Solo"],
            ],
        )
    }

    fn store() -> Table {
        table(
            &["appid", "name", "release_date", "price", "developer", "genres"],
            &[
                &["10", "counter-strike", "2000-11-01", "7.19", "Valve", "Action"],
                &["50", "Dota 2", "2013-07-09", "0.0", "Valve", "Strategy"],
                &["60", "", "2015-01-01", "1.00", "Ghost", "Puzzle"],
                &["70", "DOTA 2", "2013-07-09", "0.0", "Valve", "Strategy"],
            ],
        )
    }

    fn names(t: &Table) -> Vec<String> {
        (0..t.len()).map(|i| t.get(i, NAME).to_string()).collect()
    }

    #[test]
    fn outer_join_keeps_every_clean_key_once() {
        let merged = clean_and_merge(games(), store(), &opts()).unwrap();
        let t = &merged.table;
        assert_eq!(names(t), vec!["counter-strike", "dota 2", "indie gem", "portal"]);
        assert_eq!(merged.report.both, 1);
        assert_eq!(merged.report.games_only, 2);
        assert_eq!(merged.report.store_only, 1);
        assert_eq!(merged.report.dropped_missing_names, [1, 1]);
        assert_eq!(merged.report.collapsed_duplicates, [0, 1]);

        for name in names(t) {
            assert_eq!(name, name.trim().to_lowercase());
            assert!(!name.is_empty());
        }
        assert!(t.len() >= 3);
    }

    #[test]
    fn shared_columns_are_suffixed_and_games_price_wins() {
        let merged = clean_and_merge(games(), store(), &opts()).unwrap();
        let t = &merged.table;
        for col in ["Price_games", "Price_store", "Release_games", "Release_store", "Developer_games"] {
            assert!(t.has_column(col), "missing {col}");
        }
        assert!(t.has_column("Genre"));
        assert_eq!(t.get(1, "Developer"), &Value::String("Valve".into()));
        assert_eq!(t.get(2, "Developer"), &Value::String("Solo".into()));
        assert_eq!(merged.report.price_column, "Price_games");

        assert_eq!(t.get(0, PRICE), &Value::Float(9.99));
        // dota 2 only exists in the store table, so the games price is missing → 0.0
        assert_eq!(t.get(1, PRICE), &Value::Float(0.0));
        assert_eq!(t.get(2, PRICE), &Value::Float(0.0));
        assert_eq!(t.get(3, PRICE), &Value::Float(19.99));
    }

    #[test]
    fn release_years_are_imputed_with_the_median() {
        let merged = clean_and_merge(games(), store(), &opts()).unwrap();
        let t = &merged.table;
        assert_eq!(merged.report.release_column.as_deref(), Some("Release_games"));
        // counter-strike 2000, dota 2 missing in games, indie gem unparseable, portal 2007
        assert_eq!(t.get(0, "release_year"), &Value::Integer(2000));
        assert_eq!(t.get(0, "game_age_years"), &Value::Float(25.0));
        assert_eq!(t.get(1, "release_year"), &Value::Integer(2003));
        assert_eq!(t.get(2, "Release"), &Value::Null);
        assert_eq!(t.get(2, "game_age_years"), &Value::Float(22.0));
    }

    #[test]
    fn month_year_releases_keep_their_year() {
        let a = table(
            &["Name", "Release date", "Price"],
            &[&["Braid", "Oct 2008", "9.99"], &["Fez", "April 2012", "9.99"]],
        );
        let b = table(&["name", "release_date"], &[&["braid", "2008-08-06"]]);
        let merged = clean_and_merge(a, b, &opts()).unwrap();
        let t = &merged.table;
        assert_eq!(t.get(0, "Release"), &Value::Date(NaiveDate::from_ymd_opt(2008, 10, 1).unwrap()));
        assert_eq!(t.get(0, "release_year"), &Value::Integer(2008));
        assert_eq!(t.get(0, "game_age_years"), &Value::Float(17.0));
        assert_eq!(t.get(1, "release_year"), &Value::Integer(2012));
        assert_eq!(t.get(1, "game_age_years"), &Value::Float(13.0));
    }

    #[test]
    fn null_spelled_names_count_as_missing() {
        let a = table(&["Name", "Price"], &[&["Null", "1"], &["Real", "2"]]);
        let b = table(&["name"], &[&["NULL"]]);
        let merged = clean_and_merge(a, b, &opts()).unwrap();
        assert_eq!(names(&merged.table), vec!["real"]);
        assert_eq!(merged.report.dropped_missing_names, [1, 1]);
    }

    #[test]
    fn on_sale_is_binary_below_price_quantile() {
        let merged = clean_and_merge(games(), store(), &opts()).unwrap();
        let t = &merged.table;
        // prices 9.99, 0, 0, 19.99 → 30th percentile is 0.0, nothing is strictly below
        let labels: Vec<&Value> = t.column("on_sale").unwrap().collect();
        assert!(labels.iter().all(|v| matches!(v, Value::Integer(0) | Value::Integer(1))));
        assert!(!merged.report.label_fallback);

        let cheap = table(&["Name", "Price"], &[&["a", "1"], &["b", "10"], &["c", "20"], &["d", "30"]]);
        let merged = clean_and_merge(cheap, table(&["name"], &[&["a"]]), &opts()).unwrap();
        let labels: Vec<Value> = merged.table.column("on_sale").unwrap().cloned().collect();
        assert_eq!(
            labels,
            vec![Value::Integer(1), Value::Integer(0), Value::Integer(0), Value::Integer(0)]
        );
    }

    #[test]
    fn missing_release_column_uses_defaults() {
        let a = table(&["Name", "Price"], &[&["a", "1"]]);
        let b = table(&["title"], &[&["b"]]);
        let merged = clean_and_merge(a, b, &opts()).unwrap();
        assert_eq!(merged.report.release_column, None);
        assert_eq!(merged.table.get(1, "release_year"), &Value::Integer(DEFAULT_RELEASE_YEAR));
        assert_eq!(merged.table.get(1, "game_age_years"), &Value::Float(DEFAULT_GAME_AGE));
    }

    #[test]
    fn missing_name_column_is_a_schema_error() {
        let a = table(&["Title", "Price"], &[&["a", "1"]]);
        let err = clean_and_merge(a, store(), &opts()).unwrap_err();
        match err {
            PipelineError::Schema { available, .. } => {
                assert_eq!(available, vec!["Title", "Price"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_price_everywhere_is_a_schema_error() {
        let a = table(&["Name"], &[&["a"]]);
        let b = table(&["name"], &[&["b"]]);
        assert!(matches!(
            clean_and_merge(a, b, &opts()),
            Err(PipelineError::Schema { .. })
        ));
    }
}
