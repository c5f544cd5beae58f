/// Data layer: cell and table types, file I/O, row filtering, lenient
/// parsing and order statistics.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (cells type-guessed)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  ordered columns, Vec<Vec<Value>> rows
///   └──────────┘
///        │   filter: drop / dedup / select rows
///        │   parse:  prices, percents, day counts, dates
///        │   stats:  median, quantile
///        ▼
///   ┌──────────┐
///   │  writer   │  Table → .csv / .parquet
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod parse;
pub mod stats;
pub mod writer;
