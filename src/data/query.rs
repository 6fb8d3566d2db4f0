use std::collections::BTreeSet;

use super::model::{Column, Dataset, Record, Value};

// ---------------------------------------------------------------------------
// Filter predicate: which particles are selected
// ---------------------------------------------------------------------------

/// Selected `Particle_Used` values. An empty set means "no filter".
pub type ParticleFilter = BTreeSet<String>;

/// Keep the records whose `particle_used` is in `allowed`.
///
/// An empty `allowed` set returns the whole dataset unchanged, so clearing
/// every selection shows everything rather than nothing. Records without a
/// particle never match a non-empty filter.
pub fn filter(dataset: &Dataset, allowed: &ParticleFilter) -> Dataset {
    if allowed.is_empty() {
        return dataset.clone();
    }
    let records = dataset
        .records()
        .iter()
        .filter(|rec| {
            rec.particle_used
                .as_ref()
                .is_some_and(|p| allowed.contains(p))
        })
        .cloned()
        .collect();
    Dataset::from_parts(dataset.columns().to_vec(), records)
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Restrict `dataset` to the named columns, in the order requested.
///
/// Names that are not a known column header, or not in the dataset's
/// schema, are skipped. Row count and order are unchanged.
pub fn project<S: AsRef<str>>(dataset: &Dataset, columns: &[S]) -> Dataset {
    let mut kept: Vec<Column> = Vec::new();
    for name in columns {
        match Column::from_header(name.as_ref()) {
            Some(col) if dataset.has_column(col) && !kept.contains(&col) => kept.push(col),
            _ => log::debug!("project: skipping column '{}'", name.as_ref()),
        }
    }

    let records = dataset
        .records()
        .iter()
        .map(|rec| {
            let mut out = Record::default();
            for col in &kept {
                out.copy_field(rec, *col);
            }
            out
        })
        .collect();
    Dataset::from_parts(kept, records)
}

// ---------------------------------------------------------------------------
// Column summaries
// ---------------------------------------------------------------------------

/// Distinct non-null values of `column`. Empty if the column is not in the
/// schema.
pub fn distinct_values(dataset: &Dataset, column: Column) -> BTreeSet<Value> {
    dataset
        .column_values(column)
        .into_iter()
        .flatten()
        .collect()
}

/// Numeric columns of the schema in schema order: the choices offered for
/// plot axes, marker size and colour.
pub fn numeric_columns(dataset: &Dataset) -> Vec<Column> {
    dataset
        .columns()
        .iter()
        .copied()
        .filter(|c| c.is_numeric())
        .collect()
}
