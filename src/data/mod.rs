/// Data layer: measurement records, table files, the store and queries.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json / .parquet
///        │   ▲
///        ▼   │ whole-file rewrite
///   ┌──────────┐
///   │  format   │  parse / encode file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ DatasetStore  │  memoized load, validated append
///   └──────────────┘
///        │  &Dataset
///        ▼
///   ┌──────────┐
///   │  query    │  filter by particle, project columns, distinct values
///   └──────────┘
/// ```

pub mod error;
pub mod format;
pub mod model;
pub mod query;
pub mod store;

pub use error::{StoreError, ValidationError};
pub use model::{Column, ColumnKind, Dataset, Record, Value};
pub use store::DatasetStore;
