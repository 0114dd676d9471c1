/// Data layer: record model, source tables, ingestion, loading and filtering.
///
/// Architecture:
/// ```text
///  .csv / .parquet source table
///        │
///        ▼
///   ┌──────────┐
///   │  ingest   │  group rows by drift field → Record → {name}_{field}_{qy|ly}.json
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  glob pattern → Vec<Record>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  field / energy / interaction predicates → new Vec<Record>
///   └──────────┘
/// ```
pub mod filter;
pub mod ingest;
pub mod loader;
pub mod model;
pub mod source;
