/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table  (cache: once per process)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply Selection → filtered view (new Table)
///   └──────────┘
///        │
///        ├──────────────┬───────────────┐
///        ▼              ▼               ▼
///   ┌─────────┐   ┌──────────┐   ┌──────────────┐
///   │  stats   │   │  charts   │   │ crate::report │
///   └─────────┘   └──────────┘   └──────────────┘
/// ```

pub mod cache;
pub mod charts;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
pub mod stats;
