use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

// ---------------------------------------------------------------------------
// Column – the fixed set of measurement fields
// ---------------------------------------------------------------------------

/// Whether a column holds free text or a floating-point measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Numeric,
}

/// One of the known measurement columns.
///
/// Declaration order is the order used for `BTreeMap<Column, _>` iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    ParticleUsed,
    ParticleSize,
    AspectRatio,
    Diffusivity,
    Permeability,
    PolymerMeshSize,
    Specificity,
    Selectivity,
    PaperDoi,
}

impl Column {
    /// Every known column.
    pub const ALL: [Column; 9] = [
        Column::ParticleUsed,
        Column::ParticleSize,
        Column::AspectRatio,
        Column::Diffusivity,
        Column::Permeability,
        Column::PolymerMeshSize,
        Column::Specificity,
        Column::Selectivity,
        Column::PaperDoi,
    ];

    /// Schema of a dataset that has never been persisted.
    pub const CANONICAL: [Column; 8] = [
        Column::ParticleUsed,
        Column::ParticleSize,
        Column::AspectRatio,
        Column::Diffusivity,
        Column::Permeability,
        Column::PolymerMeshSize,
        Column::Specificity,
        Column::PaperDoi,
    ];

    /// Header written to the persisted table.
    pub fn header(self) -> &'static str {
        match self {
            Column::ParticleUsed => "Particle_Used",
            Column::ParticleSize => "Particle_Size",
            Column::AspectRatio => "Aspect_Ratio",
            Column::Diffusivity => "Diffusivity",
            Column::Permeability => "Permeability",
            Column::PolymerMeshSize => "Polymer_Network_Mesh_Size",
            Column::Specificity => "Specificity",
            Column::Selectivity => "Selectivity",
            Column::PaperDoi => "Paper_DOI",
        }
    }

    /// Human-readable label including units.
    pub fn label(self) -> &'static str {
        match self {
            Column::ParticleUsed => "Particle Used",
            Column::ParticleSize => "Particle Size (nm)",
            Column::AspectRatio => "Aspect Ratio",
            Column::Diffusivity => "Diffusivity (m²/s)",
            Column::Permeability => "Permeability (m²)",
            Column::PolymerMeshSize => "Polymer Network Mesh Size (nm)",
            Column::Specificity => "Specificity",
            Column::Selectivity => "Selectivity",
            Column::PaperDoi => "Paper DOI",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::ParticleUsed | Column::PaperDoi => ColumnKind::Text,
            _ => ColumnKind::Numeric,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.kind() == ColumnKind::Numeric
    }

    /// Resolve a header cell to a column.
    ///
    /// Matching ignores ASCII case, surrounding whitespace, and treats
    /// spaces as underscores (`Paper DOI` == `Paper_DOI`).
    pub fn from_header(header: &str) -> Option<Column> {
        let wanted = header.trim().replace(' ', "_");
        Column::ALL
            .into_iter()
            .find(|col| col.header().eq_ignore_ascii_case(&wanted))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

// ---------------------------------------------------------------------------
// Value – a single non-null cell
// ---------------------------------------------------------------------------

/// A non-null cell value. Absent cells are `None` at the use site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Number(v) => v.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v:.5}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

/// Round to the five decimal places used when persisting.
///
/// Values too large to scale are already integral and come back unchanged.
/// Results that round to zero are `+0.0`.
pub fn round_to_persisted(v: f64) -> f64 {
    let scaled = v * 1e5;
    if !scaled.is_finite() {
        return v;
    }
    let rounded = scaled.round() / 1e5;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

// ---------------------------------------------------------------------------
// Record – one row
// ---------------------------------------------------------------------------

/// One measurement entry. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub particle_used: Option<String>,
    pub particle_size: Option<f64>,
    pub aspect_ratio: Option<f64>,
    pub diffusivity: Option<f64>,
    pub permeability: Option<f64>,
    pub polymer_mesh_size: Option<f64>,
    pub specificity: Option<f64>,
    pub selectivity: Option<f64>,
    pub paper_doi: Option<String>,
}

impl Record {
    fn text_slot(&mut self, column: Column) -> Option<&mut Option<String>> {
        match column {
            Column::ParticleUsed => Some(&mut self.particle_used),
            Column::PaperDoi => Some(&mut self.paper_doi),
            _ => None,
        }
    }

    fn number_slot(&mut self, column: Column) -> Option<&mut Option<f64>> {
        match column {
            Column::ParticleSize => Some(&mut self.particle_size),
            Column::AspectRatio => Some(&mut self.aspect_ratio),
            Column::Diffusivity => Some(&mut self.diffusivity),
            Column::Permeability => Some(&mut self.permeability),
            Column::PolymerMeshSize => Some(&mut self.polymer_mesh_size),
            Column::Specificity => Some(&mut self.specificity),
            Column::Selectivity => Some(&mut self.selectivity),
            Column::ParticleUsed | Column::PaperDoi => None,
        }
    }

    pub fn get(&self, column: Column) -> Option<Value> {
        let number = |v: Option<f64>| v.map(Value::Number);
        match column {
            Column::ParticleUsed => self.particle_used.clone().map(Value::Text),
            Column::ParticleSize => number(self.particle_size),
            Column::AspectRatio => number(self.aspect_ratio),
            Column::Diffusivity => number(self.diffusivity),
            Column::Permeability => number(self.permeability),
            Column::PolymerMeshSize => number(self.polymer_mesh_size),
            Column::Specificity => number(self.specificity),
            Column::Selectivity => number(self.selectivity),
            Column::PaperDoi => self.paper_doi.clone().map(Value::Text),
        }
    }

    /// Numeric field as `f64`; `None` for text columns and absent cells.
    pub fn number(&self, column: Column) -> Option<f64> {
        self.get(column).and_then(|v| v.as_f64())
    }

    /// Store `value` in `column`. The value kind must match the column kind.
    pub fn set(&mut self, column: Column, value: Option<Value>) -> Result<(), ValidationError> {
        match value {
            None => self.clear(column),
            Some(Value::Text(s)) => match self.text_slot(column) {
                Some(slot) => *slot = Some(s),
                None => return Err(ValidationError::TypeMismatch { column }),
            },
            Some(Value::Number(v)) => match self.number_slot(column) {
                Some(slot) => *slot = Some(v),
                None => return Err(ValidationError::TypeMismatch { column }),
            },
        }
        Ok(())
    }

    /// Copy one field from `other`, leaving the rest untouched.
    pub fn copy_field(&mut self, other: &Record, column: Column) {
        match column {
            Column::ParticleUsed => self.particle_used = other.particle_used.clone(),
            Column::ParticleSize => self.particle_size = other.particle_size,
            Column::AspectRatio => self.aspect_ratio = other.aspect_ratio,
            Column::Diffusivity => self.diffusivity = other.diffusivity,
            Column::Permeability => self.permeability = other.permeability,
            Column::PolymerMeshSize => self.polymer_mesh_size = other.polymer_mesh_size,
            Column::Specificity => self.specificity = other.specificity,
            Column::Selectivity => self.selectivity = other.selectivity,
            Column::PaperDoi => self.paper_doi = other.paper_doi.clone(),
        }
    }

    pub fn clear(&mut self, column: Column) {
        match column.kind() {
            ColumnKind::Text => {
                if let Some(slot) = self.text_slot(column) {
                    *slot = None;
                }
            }
            ColumnKind::Numeric => {
                if let Some(slot) = self.number_slot(column) {
                    *slot = None;
                }
            }
        }
    }

    /// Columns that hold a value, in declaration order.
    pub fn set_columns(&self) -> impl Iterator<Item = Column> + '_ {
        Column::ALL
            .into_iter()
            .filter(|col| self.get(*col).is_some())
    }

    pub fn is_blank(&self) -> bool {
        self.set_columns().next().is_none()
    }
}

// ---------------------------------------------------------------------------
// Dataset – records plus schema
// ---------------------------------------------------------------------------

/// An ordered table of records with an ordered, duplicate-free schema.
///
/// Every record only holds values for columns in the schema; `push`
/// enforces this and `extend_schema` is the only way to add a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    records: Vec<Record>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::empty()
    }
}

impl Dataset {
    /// Empty dataset with the canonical schema.
    pub fn empty() -> Self {
        Self::with_columns(Column::CANONICAL)
    }

    /// Empty dataset with the given schema; repeated columns are dropped.
    pub fn with_columns(columns: impl IntoIterator<Item = Column>) -> Self {
        let mut schema = Vec::new();
        for col in columns {
            if !schema.contains(&col) {
                schema.push(col);
            }
        }
        Dataset {
            columns: schema,
            records: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Add `column` to the schema. Returns `false` if it was already present.
    pub fn extend_schema(&mut self, column: Column) -> bool {
        if self.has_column(column) {
            return false;
        }
        self.columns.push(column);
        true
    }

    /// Append a record after checking it against the schema.
    pub fn push(&mut self, record: Record) -> Result<(), ValidationError> {
        if let Some(column) = record.set_columns().find(|c| !self.has_column(*c)) {
            return Err(ValidationError::UnknownColumn { column });
        }
        self.records.push(record);
        Ok(())
    }

    /// Values of one column in row order; all `None` if the column is not
    /// part of the schema.
    pub fn column_values(&self, column: Column) -> Vec<Option<Value>> {
        if !self.has_column(column) {
            return vec![None; self.records.len()];
        }
        self.records.iter().map(|r| r.get(column)).collect()
    }

    pub(crate) fn from_parts(columns: Vec<Column>, records: Vec<Record>) -> Self {
        Dataset { columns, records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_matching_accepts_spaces_and_case() {
        assert_eq!(Column::from_header("Paper DOI"), Some(Column::PaperDoi));
        assert_eq!(
            Column::from_header(" polymer network mesh size "),
            Some(Column::PolymerMeshSize)
        );
        assert_eq!(Column::from_header("Particle_Used"), Some(Column::ParticleUsed));
        assert_eq!(Column::from_header("Operator"), None);
    }

    #[test]
    fn canonical_schema_excludes_selectivity() {
        assert_eq!(Column::CANONICAL.len(), 8);
        assert!(!Column::CANONICAL.contains(&Column::Selectivity));
        assert_eq!(Dataset::empty().columns(), &Column::CANONICAL);
    }

    #[test]
    fn record_set_rejects_kind_mismatch() {
        let mut rec = Record::default();
        let err = rec
            .set(Column::ParticleUsed, Some(Value::Number(1.0)))
            .unwrap_err();
        assert_eq!(err, ValidationError::TypeMismatch { column: Column::ParticleUsed });
        assert!(rec.is_blank());

        rec.set(Column::Diffusivity, Some(Value::Number(0.0))).unwrap();
        assert_eq!(rec.diffusivity, Some(0.0));
        assert_eq!(rec.set_columns().collect::<Vec<_>>(), vec![Column::Diffusivity]);
    }

    #[test]
    fn push_enforces_schema() {
        let mut ds = Dataset::empty();
        let rec = Record {
            selectivity: Some(0.5),
            ..Default::default()
        };
        assert_eq!(
            ds.push(rec.clone()),
            Err(ValidationError::UnknownColumn { column: Column::Selectivity })
        );
        assert!(ds.is_empty());

        assert!(ds.extend_schema(Column::Selectivity));
        assert!(!ds.extend_schema(Column::Selectivity));
        ds.push(rec).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn column_values_outside_schema_are_null() {
        let mut ds = Dataset::with_columns([Column::ParticleUsed]);
        ds.push(Record {
            particle_used: Some("Au".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ds.column_values(Column::Permeability), vec![None]);
        assert_eq!(
            ds.column_values(Column::ParticleUsed),
            vec![Some(Value::Text("Au".into()))]
        );
    }

    #[test]
    fn values_order_numbers_before_text() {
        let mut vals = vec![
            Value::Text("b".into()),
            Value::Number(2.0),
            Value::Text("a".into()),
            Value::Number(-1.0),
        ];
        vals.sort();
        assert_eq!(
            vals,
            vec![
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::Text("a".into()),
                Value::Text("b".into()),
            ]
        );
        assert_eq!(Value::Number(12.345671).to_string(), "12.34567");
    }

    #[test]
    fn rounding_keeps_five_places() {
        assert_eq!(round_to_persisted(12.345674), 12.34567);
        assert_eq!(round_to_persisted(0.0), 0.0);
        assert_eq!(round_to_persisted(1e305), 1e305);
        assert_eq!(round_to_persisted(-1e305), -1e305);
        assert!(round_to_persisted(-0.000001).is_sign_positive());
        assert!(round_to_persisted(-0.0).is_sign_positive());
    }

    #[test]
    fn value_equality_agrees_with_ordering() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let hash = |v: &Value| {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        };
        let pos = Value::Number(0.0);
        let neg = Value::Number(-0.0);
        assert_eq!(pos == neg, pos.cmp(&neg) == Ordering::Equal);
        assert_ne!(pos, neg);

        let rounded = Value::Number(round_to_persisted(-0.000001));
        assert_eq!(rounded, pos);
        assert_eq!(hash(&rounded), hash(&pos));
    }

    #[test]
    fn copy_field_moves_one_column() {
        let src = Record {
            particle_used: Some("Au".into()),
            diffusivity: Some(2.0),
            ..Default::default()
        };
        let mut dst = Record::default();
        dst.copy_field(&src, Column::Diffusivity);
        dst.copy_field(&src, Column::Permeability);
        assert_eq!(dst.diffusivity, Some(2.0));
        assert_eq!(dst.particle_used, None);
        assert_eq!(dst.permeability, None);
    }
}
