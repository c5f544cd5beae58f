use std::collections::HashSet;

use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Row predicates over a single column
// ---------------------------------------------------------------------------

/// Return indices of rows whose value in `column` passes `keep`.
///
/// A row of a table without that column is tested against `Value::Null`.
pub fn filtered_indices<F>(table: &Table, column: &str, keep: F) -> Vec<usize>
where
    F: Fn(&Value) -> bool,
{
    (0..table.len())
        .filter(|&i| keep(table.get(i, column)))
        .collect()
}

/// A new table holding only the rows at `indices`, in that order.
pub fn select_rows(table: &Table, indices: &[usize]) -> Table {
    Table {
        columns: table.columns.clone(),
        rows: indices.iter().map(|&i| table.rows[i].clone()).collect(),
    }
}

/// Keep the rows passing `keep`; returns how many were removed.
pub fn retain_rows<F>(table: &mut Table, column: &str, keep: F) -> usize
where
    F: Fn(&Value) -> bool,
{
    let kept = filtered_indices(table, column, keep);
    let removed = table.len() - kept.len();
    if removed > 0 {
        *table = select_rows(table, &kept);
    }
    removed
}

/// Drop rows whose `column` is `Null`.
pub fn drop_missing(table: &mut Table, column: &str) -> usize {
    retain_rows(table, column, |v| !v.is_null())
}

/// Keep only the first row for every distinct text of `column`.
pub fn dedup_by(table: &mut Table, column: &str) -> usize {
    let mut seen = HashSet::new();
    let kept: Vec<usize> = (0..table.len())
        .filter(|&i| seen.insert(table.get(i, column).to_string()))
        .collect();
    let removed = table.len() - kept.len();
    if removed > 0 {
        *table = select_rows(table, &kept);
    }
    removed
}
