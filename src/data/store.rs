use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::error::{StoreError, ValidationError};
use super::format::TableFormat;
use super::model::{round_to_persisted, Column, ColumnKind, Dataset, Record, Value};

// ---------------------------------------------------------------------------
// Dataset store
// ---------------------------------------------------------------------------

/// Owns the persisted dataset file and a memoized copy of its contents.
///
/// One store is created per session and handed to whatever needs the data.
/// The file is only ever rewritten whole: appends read the current file,
/// add the row and replace the file. There is no locking; two sessions
/// appending at the same time race and the last writer wins.
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    format: TableFormat,
    cache: Option<Dataset>,
}

impl DatasetStore {
    /// Bind a store to `path`. Nothing is read until [`load`](Self::load).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let format =
            TableFormat::from_path(&path).ok_or_else(|| StoreError::UnsupportedFormat {
                path: path.clone(),
            })?;
        Ok(DatasetStore {
            path,
            format,
            cache: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    /// The current dataset, read from disk on first use.
    ///
    /// A missing file is not an error: it yields an empty dataset with the
    /// canonical schema.
    pub fn load(&mut self) -> Result<&Dataset, StoreError> {
        let dataset = match self.cache.take() {
            Some(ds) => {
                log::debug!("Using cached dataset for {}", self.path.display());
                ds
            }
            None => self.read_persisted()?,
        };
        Ok(&*self.cache.insert(dataset))
    }

    /// Forget the memoized dataset; the next `load` reads the file again.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Validate `fields`, append them as a new record and rewrite the file.
    ///
    /// Text is trimmed and blank values are dropped. Numeric columns take
    /// either a number or numeric text; zero is a valid measurement. On any
    /// error neither the file nor the memoized dataset changes.
    pub fn append(&mut self, fields: BTreeMap<Column, Value>) -> Result<Record, StoreError> {
        let record = build_record(fields)?;

        let mut dataset = self.read_persisted()?;
        dataset.push(record.clone())?;
        self.write_persisted(&dataset)?;

        log::info!(
            "Appended record with {} field(s) to {} ({} rows)",
            record.set_columns().count(),
            self.path.display(),
            dataset.len()
        );
        self.cache = Some(dataset);
        Ok(record)
    }

    /// Add `column` to the persisted schema. Returns `false` if it was
    /// already there, in which case nothing is written.
    pub fn extend_schema(&mut self, column: Column) -> Result<bool, StoreError> {
        let mut dataset = self.read_persisted()?;
        if !dataset.extend_schema(column) {
            return Ok(false);
        }
        self.write_persisted(&dataset)?;
        log::info!("Added column {column} to {}", self.path.display());
        self.cache = Some(dataset);
        Ok(true)
    }

    /// Rewrite the file from the loaded dataset.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        let format = self.format;
        let path = self.path.clone();
        let dataset = self.load()?;
        write_file(&path, format, dataset)
    }

    /// Write the loaded dataset to `target`, in the format its extension
    /// names. The store stays bound to its own path.
    pub fn export(&mut self, target: &Path) -> Result<(), StoreError> {
        let format =
            TableFormat::from_path(target).ok_or_else(|| StoreError::UnsupportedFormat {
                path: target.to_path_buf(),
            })?;
        let dataset = self.load()?;
        write_file(target, format, dataset)?;
        log::info!("Exported {} rows to {}", dataset.len(), target.display());
        Ok(())
    }

    fn read_persisted(&self) -> Result<Dataset, StoreError> {
        match std::fs::metadata(&self.path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!(
                    "No dataset at {}; starting with an empty table",
                    self.path.display()
                );
                return Ok(Dataset::empty());
            }
            Err(e) => {
                return Err(StoreError::storage(
                    &self.path,
                    anyhow::Error::new(e).context("checking dataset file"),
                ))
            }
            Ok(_) => {}
        }

        let dataset = self
            .format
            .read(&self.path)
            .map_err(|e| StoreError::storage(&self.path, e))?;
        log::info!(
            "Loaded {} rows with columns {:?} from {}",
            dataset.len(),
            dataset.columns(),
            self.path.display()
        );
        Ok(dataset)
    }

    fn write_persisted(&self, dataset: &Dataset) -> Result<(), StoreError> {
        write_file(&self.path, self.format, dataset)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalize submitted fields into a record.
fn build_record(fields: BTreeMap<Column, Value>) -> Result<Record, ValidationError> {
    let mut record = Record::default();
    for (column, value) in fields {
        let value = match (column.kind(), value) {
            (ColumnKind::Text, Value::Text(s)) => {
                let s = s.trim();
                (!s.is_empty()).then(|| Value::Text(s.to_string()))
            }
            (ColumnKind::Text, Value::Number(_)) => {
                return Err(ValidationError::TypeMismatch { column })
            }
            (ColumnKind::Numeric, Value::Text(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    let v: f64 = s.parse().map_err(|_| ValidationError::InvalidNumber {
                        column,
                        input: s.to_string(),
                    })?;
                    checked_number(column, v)?
                }
            }
            (ColumnKind::Numeric, Value::Number(v)) => checked_number(column, v)?,
        };
        record.set(column, value)?;
    }

    if record.is_blank() {
        return Err(ValidationError::EmptySubmission);
    }
    Ok(record)
}

/// NaN means "not entered"; infinities are rejected.
fn checked_number(column: Column, v: f64) -> Result<Option<Value>, ValidationError> {
    if v.is_nan() {
        return Ok(None);
    }
    if !v.is_finite() {
        return Err(ValidationError::InvalidNumber {
            column,
            input: v.to_string(),
        });
    }
    Ok(Some(Value::Number(round_to_persisted(v))))
}

/// Replace `path` with the encoded dataset via a temporary sibling file.
fn write_file(path: &Path, format: TableFormat, dataset: &Dataset) -> Result<(), StoreError> {
    let write = || -> anyhow::Result<()> {
        let bytes = format.encode(dataset)?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).context("creating temporary file")?;
        tmp.write_all(&bytes).context("writing dataset")?;
        tmp.as_file().sync_all().context("syncing dataset")?;
        tmp.persist(path).map_err(|e| e.error).context("replacing dataset file")?;
        Ok(())
    };
    write().map_err(|e| StoreError::storage(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(Column, Value)]) -> BTreeMap<Column, Value> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn missing_file_loads_canonical_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DatasetStore::open(dir.path().join("uploaded_data.xlsx")).unwrap();
        let ds = store.load().unwrap();
        assert_eq!(ds.columns(), &Column::CANONICAL);
        assert!(ds.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = DatasetStore::open("data.txt").unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFormat { .. }));
    }

    #[test]
    fn append_writes_five_decimal_places() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut store = DatasetStore::open(&path).unwrap();

        store
            .append(fields(&[
                (Column::ParticleUsed, "SiO2".into()),
                (Column::ParticleSize, 12.34567.into()),
            ]))
            .unwrap();

        let ds = store.load().unwrap();
        let last = ds.records().last().unwrap();
        assert_eq!(last.particle_used.as_deref(), Some("SiO2"));
        assert_eq!(last.particle_size, Some(12.34567));
        assert_eq!(last.aspect_ratio, None);
        assert_eq!(last.paper_doi, None);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().nth(1), Some("SiO2,12.34567,,,,,,"));
    }

    #[test]
    fn blank_submission_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut store = DatasetStore::open(&path).unwrap();

        let err = store
            .append(fields(&[
                (Column::ParticleUsed, "   ".into()),
                (Column::PaperDoi, "".into()),
                (Column::Diffusivity, "".into()),
                (Column::Permeability, f64::NAN.into()),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptySubmission)
        ));
        assert!(!path.exists());

        store
            .append(fields(&[(Column::ParticleUsed, "Au".into())]))
            .unwrap();
        let before = std::fs::read(&path).unwrap();
        assert!(store.append(BTreeMap::new()).unwrap_err().is_validation());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn zero_is_a_measurement() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DatasetStore::open(dir.path().join("data.csv")).unwrap();
        let rec = store
            .append(fields(&[(Column::AspectRatio, 0.0.into())]))
            .unwrap();
        assert_eq!(rec.aspect_ratio, Some(0.0));
    }

    #[test]
    fn text_is_trimmed_and_numeric_text_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DatasetStore::open(dir.path().join("data.json")).unwrap();
        let rec = store
            .append(fields(&[
                (Column::ParticleUsed, "  PEG-PLGA ".into()),
                (Column::Permeability, " 1.234567 ".into()),
            ]))
            .unwrap();
        assert_eq!(rec.particle_used.as_deref(), Some("PEG-PLGA"));
        assert_eq!(rec.permeability, Some(1.23457));
    }

    #[test]
    fn invalid_inputs_are_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut store = DatasetStore::open(&path).unwrap();

        let err = store
            .append(fields(&[(Column::Diffusivity, "fast".into())]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidNumber { column: Column::Diffusivity, .. })
        ));

        let err = store
            .append(fields(&[(Column::PaperDoi, 1.0.into())]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::TypeMismatch { column: Column::PaperDoi })
        ));

        let err = store
            .append(fields(&[(Column::Permeability, f64::INFINITY.into())]))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(!path.exists());
    }

    #[test]
    fn column_outside_schema_needs_explicit_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut store = DatasetStore::open(&path).unwrap();

        let err = store
            .append(fields(&[(Column::Selectivity, 0.8.into())]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::UnknownColumn { column: Column::Selectivity })
        ));
        assert!(!path.exists());

        assert!(store.extend_schema(Column::Selectivity).unwrap());
        assert!(!store.extend_schema(Column::Selectivity).unwrap());
        store
            .append(fields(&[(Column::Selectivity, 0.8.into())]))
            .unwrap();
        let ds = store.load().unwrap();
        assert_eq!(ds.columns().last(), Some(&Column::Selectivity));
        assert_eq!(ds.records()[0].selectivity, Some(0.8));
    }

    #[test]
    fn extended_json_schema_survives_with_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut store = DatasetStore::open(&path).unwrap();

        assert!(store.extend_schema(Column::Selectivity).unwrap());
        let mut reopened = DatasetStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap().columns().last(), Some(&Column::Selectivity));

        let rec = store
            .append(fields(&[(Column::Selectivity, 0.8.into())]))
            .unwrap();
        assert_eq!(rec.selectivity, Some(0.8));
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn huge_finite_values_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut store = DatasetStore::open(&path).unwrap();

        let rec = store
            .append(fields(&[
                (Column::ParticleUsed, "X".into()),
                (Column::ParticleSize, 1e305.into()),
            ]))
            .unwrap();
        assert_eq!(rec.particle_size, Some(1e305));

        let mut reopened = DatasetStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap().records()[0].particle_size, Some(1e305));
    }

    #[test]
    fn append_refreshes_cached_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DatasetStore::open(dir.path().join("data.parquet")).unwrap();
        assert_eq!(store.load().unwrap().len(), 0);

        store
            .append(fields(&[(Column::ParticleUsed, "ZnO".into())]))
            .unwrap();
        store
            .append(fields(&[(Column::ParticleUsed, "ZnO".into())]))
            .unwrap();

        let ds = store.load().unwrap();
        assert_eq!(ds.len(), 2, "duplicate submissions produce duplicate rows");
        assert!(ds.records().iter().all(|r| r.particle_used.as_deref() == Some("ZnO")));
    }

    #[test]
    fn append_reads_rows_written_by_another_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut first = DatasetStore::open(&path).unwrap();
        let mut second = DatasetStore::open(&path).unwrap();
        first.load().unwrap();

        second
            .append(fields(&[(Column::ParticleUsed, "A".into())]))
            .unwrap();
        first
            .append(fields(&[(Column::ParticleUsed, "B".into())]))
            .unwrap();

        let names: Vec<_> = first
            .load()
            .unwrap()
            .records()
            .iter()
            .filter_map(|r| r.particle_used.clone())
            .collect();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn persist_round_trips_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let original = "Particle_Used,Particle_Size,Aspect_Ratio,Diffusivity,Permeability,Polymer_Network_Mesh_Size,Specificity,Paper_DOI\n\
                        SiO2,12.34567,1.00000,,0.25000,,,10.1/abc\n\
                        \"Au, citrate\",,,0.00000,,3.10000,,\n";
        std::fs::write(&path, original).unwrap();

        let mut store = DatasetStore::open(&path).unwrap();
        store.persist().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn unreadable_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();
        let mut store = DatasetStore::open(&path).unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Storage { .. }));

        let err = store
            .append(fields(&[(Column::ParticleUsed, "SiO2".into())]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn text_in_numeric_column_names_cell_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        std::fs::write(&path, "Particle_Used,Specificity,Paper DOI
SiO2,0.5,10.1/a
Au,high,10.1/b
")
            .unwrap();
        let mut store = DatasetStore::open(&path).unwrap();

        let message = store.load().unwrap_err().to_string();
        assert!(message.contains("CSV line 3"), "{message}");
        assert!(message.contains("Specificity: 'high' is not a number"), "{message}");

        let err = store
            .append(fields(&[(Column::ParticleUsed, "ZnO".into())]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage { .. }));
    }

    #[test]
    fn export_writes_another_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DatasetStore::open(dir.path().join("data.csv")).unwrap();
        store
            .append(fields(&[
                (Column::ParticleUsed, "SiO2".into()),
                (Column::Diffusivity, 2.5.into()),
            ]))
            .unwrap();

        let target = dir.path().join("copy.xlsx");
        store.export(&target).unwrap();

        let mut copy = DatasetStore::open(&target).unwrap();
        assert_eq!(copy.load().unwrap(), store.load().unwrap());
        assert!(store.export(&dir.path().join("copy.txt")).is_err());
    }
}
