use std::collections::{BTreeMap, BTreeSet};

use matdash::data::query::{distinct_values, filter, project};
use matdash::data::{Column, DatasetStore, StoreError, ValidationError, Value};

fn submission(pairs: &[(Column, Value)]) -> BTreeMap<Column, Value> {
    pairs.iter().cloned().collect()
}

#[test]
fn first_run_then_entries_then_filtered_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uploaded_data.xlsx");
    let mut store = DatasetStore::open(&path).unwrap();

    // No file yet: canonical schema, nothing to select.
    let ds = store.load().unwrap();
    assert_eq!(ds.columns(), &Column::CANONICAL);
    assert_eq!(ds.len(), 0);
    for col in ds.columns() {
        assert!(distinct_values(ds, *col).is_empty());
    }

    store
        .append(submission(&[
            (Column::ParticleUsed, "SiO2".into()),
            (Column::ParticleSize, 12.34567.into()),
        ]))
        .unwrap();
    store
        .append(submission(&[
            (Column::ParticleUsed, "Au".into()),
            (Column::ParticleSize, "40".into()),
            (Column::Permeability, "0".into()),
            (Column::PaperDoi, " 10.1016/j.jmps.2024.105732 ".into()),
        ]))
        .unwrap();
    assert!(path.exists());

    // A fresh session sees both rows, in insertion order.
    let mut reopened = DatasetStore::open(&path).unwrap();
    let ds = reopened.load().unwrap();
    assert_eq!(ds.len(), 2);
    let first = &ds.records()[0];
    assert_eq!(first.particle_used.as_deref(), Some("SiO2"));
    assert_eq!(first.particle_size, Some(12.34567));
    assert_eq!(first.diffusivity, None);
    let last = &ds.records()[1];
    assert_eq!(last.permeability, Some(0.0));
    assert_eq!(last.paper_doi.as_deref(), Some("10.1016/j.jmps.2024.105732"));

    let particles: Vec<String> = distinct_values(ds, Column::ParticleUsed)
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    assert_eq!(particles, vec!["Au".to_string(), "SiO2".to_string()]);

    let only_gold: BTreeSet<String> = ["Au".to_string()].into();
    let view = project(&filter(ds, &only_gold), &["Particle_Size", "Permeability"]);
    assert_eq!(view.columns(), &[Column::ParticleSize, Column::Permeability]);
    assert_eq!(view.len(), 1);
    assert_eq!(view.records()[0].particle_size, Some(40.0));
    assert_eq!(view.records()[0].particle_used, None);

    assert_eq!(filter(ds, &BTreeSet::new()), *ds);
}

#[test]
fn rejected_submission_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uploaded_data.csv");
    let mut store = DatasetStore::open(&path).unwrap();
    store
        .append(submission(&[(Column::ParticleUsed, "SiO2".into())]))
        .unwrap();
    let before = std::fs::read(&path).unwrap();

    let err = store
        .append(submission(&[
            (Column::ParticleUsed, " ".into()),
            (Column::Diffusivity, "".into()),
        ]))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::EmptySubmission)
    ));
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(store.load().unwrap().len(), 1);
}

#[test]
fn csv_file_round_trips_through_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    let mut store = DatasetStore::open(&path).unwrap();
    store
        .append(submission(&[
            (Column::ParticleUsed, "Liposome".into()),
            (Column::PolymerMeshSize, 60.0.into()),
            (Column::Specificity, 0.123456789.into()),
        ]))
        .unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Liposome,,,,,60.00000,0.12346,"));

    let mut again = DatasetStore::open(&path).unwrap();
    again.persist().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
}
