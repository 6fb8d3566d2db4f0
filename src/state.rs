use std::collections::BTreeMap;
use std::path::Path;

use matdash::data::query::{self, ParticleFilter};
use matdash::data::{Column, Dataset, DatasetStore, Record, StoreError, ValidationError, Value};

use crate::color::{value_range, ColorMap, ColorScale};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Explore,
    Upload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Info(String),
    Error(String),
}

/// Plot selections made in the sidebar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotSettings {
    pub x_axis: Option<Column>,
    pub y_axis: Option<Column>,
    pub size_by: Option<Column>,
    pub color_by: Option<Column>,
}

/// Columns the "Evaluate your new particle" inputs offer.
pub const CUSTOM_POINT_COLUMNS: [Column; 3] =
    [Column::ParticleSize, Column::Diffusivity, Column::Permeability];

/// The full UI state, independent of rendering.
pub struct AppState {
    store: DatasetStore,

    pub page: Page,

    /// Schema of the loaded dataset.
    pub schema: Vec<Column>,
    /// Row count before filtering.
    pub total_rows: usize,
    /// Distinct particle names, sorted.
    pub particle_options: Vec<String>,
    /// Numeric columns for axis / size / colour selectors.
    pub axis_options: Vec<Column>,

    pub particle_filter: ParticleFilter,
    /// Rows passing the particle filter (cached).
    pub visible: Dataset,

    pub plot: PlotSettings,
    pub particle_colors: ColorMap,
    pub color_scale: Option<ColorScale>,
    pub size_range: Option<(f64, f64)>,

    /// Raw text of the highlighted-point inputs.
    pub custom_point: BTreeMap<Column, String>,

    /// Raw text of the upload form, one entry per schema column.
    pub form: BTreeMap<Column, String>,
    pub last_submitted: Option<Record>,

    pub status: Option<Status>,
}

impl AppState {
    pub fn new(store: DatasetStore) -> Self {
        let mut state = Self {
            store,
            page: Page::Explore,
            schema: Vec::new(),
            total_rows: 0,
            particle_options: Vec::new(),
            axis_options: Vec::new(),
            particle_filter: ParticleFilter::new(),
            visible: Dataset::empty(),
            plot: PlotSettings::default(),
            particle_colors: ColorMap::new(&Default::default()),
            color_scale: None,
            size_range: None,
            custom_point: BTreeMap::new(),
            form: BTreeMap::new(),
            last_submitted: None,
            status: None,
        };
        state.refresh();
        state
    }

    pub fn dataset_path(&self) -> &Path {
        self.store.path()
    }

    /// Reload from the store and rebuild everything derived from it.
    pub fn refresh(&mut self) {
        let dataset = match self.store.load() {
            Ok(ds) => ds,
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                self.status = Some(Status::Error(format!("Error: {e}")));
                self.clear_derived();
                return;
            }
        };

        let particles = query::distinct_values(dataset, Column::ParticleUsed);
        self.particle_options = particles
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        self.particle_colors = ColorMap::new(&particles);
        self.schema = dataset.columns().to_vec();
        self.total_rows = dataset.len();
        self.axis_options = query::numeric_columns(dataset);

        let options = &self.particle_options;
        self.particle_filter.retain(|p| options.contains(p));
        self.form.retain(|col, _| dataset.has_column(*col));

        let axes = &self.axis_options;
        let keep = |c: Option<Column>| c.filter(|c| axes.contains(c));
        self.plot.x_axis = keep(self.plot.x_axis).or_else(|| axes.first().copied());
        self.plot.y_axis = keep(self.plot.y_axis).or_else(|| axes.get(1).or(axes.first()).copied());
        self.plot.size_by = keep(self.plot.size_by);
        self.plot.color_by = keep(self.plot.color_by);

        self.visible = query::filter(dataset, &self.particle_filter);
        self.rebuild_scales();
    }

    /// Drop everything derived from a dataset that is no longer loaded.
    fn clear_derived(&mut self) {
        self.schema.clear();
        self.total_rows = 0;
        self.particle_options.clear();
        self.axis_options.clear();
        self.particle_filter.clear();
        self.visible = Dataset::with_columns(std::iter::empty());
        self.plot = PlotSettings::default();
        self.particle_colors = ColorMap::new(&Default::default());
        self.color_scale = None;
        self.size_range = None;
    }

    /// Recompute `visible` after a filter change.
    pub fn refilter(&mut self) {
        match self.store.load() {
            Ok(ds) => self.visible = query::filter(ds, &self.particle_filter),
            Err(e) => self.status = Some(Status::Error(format!("Error: {e}"))),
        }
    }

    /// Colour and size scales follow the full dataset so they stay put
    /// while filtering.
    pub fn rebuild_scales(&mut self) {
        let Ok(ds) = self.store.load() else {
            return;
        };
        let numbers = |col: Option<Column>| -> Vec<f64> {
            col.map(|c| ds.records().iter().filter_map(|r| r.number(c)).collect())
                .unwrap_or_default()
        };
        self.color_scale = ColorScale::from_values(numbers(self.plot.color_by));
        self.size_range = value_range(numbers(self.plot.size_by));
    }

    pub fn toggle_particle(&mut self, particle: &str) {
        if !self.particle_filter.remove(particle) {
            self.particle_filter.insert(particle.to_string());
        }
        self.refilter();
    }

    pub fn clear_particle_filter(&mut self) {
        self.particle_filter.clear();
        self.refilter();
    }

    /// Filtered rows restricted to what the scatter plot needs.
    pub fn plot_view(&self) -> Dataset {
        let mut columns = vec![Column::ParticleUsed];
        columns.extend(
            [self.plot.x_axis, self.plot.y_axis, self.plot.size_by, self.plot.color_by]
                .into_iter()
                .flatten(),
        );
        let names: Vec<&str> = columns.iter().map(|c| c.header()).collect();
        query::project(&self.visible, &names)
    }

    /// Title of the scatter plot, e.g. `Permeability vs Particle_Size`.
    pub fn plot_title(&self) -> Option<String> {
        let (x, y) = (self.plot.x_axis?, self.plot.y_axis?);
        Some(format!("{} vs {}", y.header(), x.header()))
    }

    /// Parsed value of a highlighted-point input; blank or invalid is `None`.
    pub fn custom_value(&self, column: Column) -> Option<f64> {
        self.custom_point
            .get(&column)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// The highlighted "User Input" marker, when both current axes have a
    /// value entered.
    pub fn custom_marker(&self) -> Option<[f64; 2]> {
        let x = self.custom_value(self.plot.x_axis?)?;
        let y = self.custom_value(self.plot.y_axis?)?;
        Some([x, y])
    }

    /// Submit the upload form through the store.
    pub fn submit_form(&mut self) {
        let fields: BTreeMap<Column, Value> = self
            .form
            .iter()
            .map(|(col, text)| (*col, Value::Text(text.clone())))
            .collect();

        match self.store.append(fields) {
            Ok(record) => {
                let file = self
                    .store
                    .path()
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.status = Some(Status::Info(format!(
                    "Data saved successfully to '{file}'!"
                )));
                self.last_submitted = Some(record);
                self.form.clear();
                self.refresh();
            }
            Err(StoreError::Validation(ValidationError::EmptySubmission)) => {
                self.status = Some(Status::Error(
                    "Please fill at least one field to submit data!".to_string(),
                ));
            }
            Err(e) => {
                log::error!("Failed to save record: {e}");
                self.status = Some(Status::Error(format!("Error: {e}")));
            }
        }
    }

    /// Switch to another dataset file.
    pub fn open_dataset(&mut self, path: &Path) {
        match DatasetStore::open(path) {
            Ok(store) => {
                log::info!("Switching dataset to {}", path.display());
                self.store = store;
                self.particle_filter.clear();
                self.plot = PlotSettings::default();
                self.form.clear();
                self.last_submitted = None;
                self.status = None;
                self.refresh();
            }
            Err(e) => {
                log::error!("Failed to open {}: {e}", path.display());
                self.status = Some(Status::Error(format!("Error: {e}")));
            }
        }
    }

    /// Write a copy of the dataset to `path`.
    pub fn export(&mut self, path: &Path) {
        match self.store.export(path) {
            Ok(()) => {
                self.status = Some(Status::Info(format!("Exported to {}", path.display())));
            }
            Err(e) => {
                log::error!("Export failed: {e}");
                self.status = Some(Status::Error(format!("Error: {e}")));
            }
        }
    }
}
