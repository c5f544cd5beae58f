//! Column-name discovery for the heterogeneous catalogs.
//!
//! Each source has an ordered alias table: for every canonical column the
//! candidates are tried in order and the first one present is renamed.
//! After the join, the same "first present wins" rule picks between the
//! unsuffixed and suffixed copies of a field.

use log::warn;

use crate::data::model::Table;

/// Canonical column name plus the source names it may appear under.
#[derive(Debug, Clone, Copy)]
pub struct Alias {
    pub canonical: &'static str,
    pub candidates: &'static [&'static str],
}

pub const NAME: &str = "Name";
pub const RELEASE: &str = "Release";
pub const PRICE: &str = "Price";

/// Suffixes for columns both sources share, games source first.
pub const GAMES_SUFFIX: &str = "_games";
pub const STORE_SUFFIX: &str = "_store";

/// The FronkonGames `games.csv` catalog.
pub const GAMES_ALIASES: &[Alias] = &[
    Alias { canonical: NAME, candidates: &["app_name", "Name"] },
    Alias { canonical: RELEASE, candidates: &["Release date", "release_date"] },
    Alias { canonical: PRICE, candidates: &["Price", "price"] },
    Alias { canonical: "Developer", candidates: &["Developers", "developer"] },
    Alias { canonical: "Publisher", candidates: &["Publishers", "publisher"] },
];

/// The NikDavis `steam.csv` store catalog.
pub const STORE_ALIASES: &[Alias] = &[
    Alias { canonical: NAME, candidates: &["name", "title", "Name"] },
    Alias { canonical: RELEASE, candidates: &["release_date", "Release date"] },
    Alias { canonical: PRICE, candidates: &["price", "Price"] },
    Alias { canonical: "Developer", candidates: &["developer", "Developers"] },
    Alias { canonical: "Publisher", candidates: &["publisher", "Publishers"] },
    Alias { canonical: "Genre", candidates: &["genres", "genre"] },
];

/// Release column of the no-sales table.
pub const NO_SALES_ALIASES: &[Alias] = &[Alias {
    canonical: RELEASE,
    candidates: &["Release", "Release date", "release_date"],
}];

/// Post-join candidates for the unified price.
pub const PRICE_PRIORITY: &[&str] = &["Price", "Price_games", "Price_store"];

/// Post-join candidates for the unified release date.
pub const RELEASE_PRIORITY: &[&str] = &["Release", "Release_games", "Release_store"];

/// Rename the first present candidate of every alias to its canonical
/// name. Returns the applied `(from, to)` renames.
pub fn normalize_columns(table: &mut Table, aliases: &[Alias]) -> Vec<(String, String)> {
    let mut applied = Vec::new();
    for alias in aliases {
        let Some(found) = alias
            .candidates
            .iter()
            .find(|c| table.has_column(c))
            .map(|c| c.to_string())
        else {
            continue;
        };
        if found == alias.canonical {
            continue;
        }
        if table.has_column(alias.canonical) {
            warn!(
                "'{found}' replaces existing column '{}'",
                alias.canonical
            );
        }
        table.rename_column(&found, alias.canonical);
        applied.push((found, alias.canonical.to_string()));
    }
    applied
}

/// The first column of `priority` present in `table`.
pub fn first_present<'a>(table: &Table, priority: &[&'a str]) -> Option<&'a str> {
    priority.iter().copied().find(|c| table.has_column(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str]) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn first_candidate_wins() {
        let mut t = table(&["name", "title", "release_date", "Release date", "genres"]);
        let applied = normalize_columns(&mut t, STORE_ALIASES);
        assert_eq!(t.columns, vec!["Name", "title", "Release", "Release date", "Genre"]);
        assert_eq!(applied.len(), 3);
    }

    #[test]
    fn canonical_names_are_left_alone() {
        let mut t = table(&["Name", "Price", "Developers"]);
        let applied = normalize_columns(&mut t, GAMES_ALIASES);
        assert_eq!(t.columns, vec!["Name", "Price", "Developer"]);
        assert_eq!(applied, vec![("Developers".to_string(), "Developer".to_string())]);
    }

    #[test]
    fn priority_prefers_unsuffixed_then_games() {
        let t = table(&["Price_store", "Price_games"]);
        assert_eq!(first_present(&t, PRICE_PRIORITY), Some("Price_games"));
        assert_eq!(first_present(&table(&["x"]), PRICE_PRIORITY), None);
    }
}
