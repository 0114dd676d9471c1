use std::collections::BTreeSet;

use yieldscope::color::ColorMap;
use yieldscope::data::filter::RecordFilter;
use yieldscope::data::model::Record;
use yieldscope::physics::ParametricNrModel;
use yieldscope::render::{build_figure, Figure};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct AppState {
    /// Loaded records, in load order.
    pub records: Vec<Record>,

    /// Filter widgets: each range is applied only while its toggle is on.
    pub field_enabled: bool,
    pub field_range: (f64, f64),
    pub energy_enabled: bool,
    pub energy_range: (f64, f64),
    pub interaction: Option<String>,

    /// Distinct interaction types in the loaded records.
    pub interaction_types: Vec<String>,

    /// Indices of records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Record shown in the central panel.
    pub selected: Option<usize>,

    /// Comparison figure of the selected record.
    pub figure: Option<Figure>,

    pub model: ParametricNrModel,

    /// Dataset name → colour.
    pub color_map: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(model: ParametricNrModel) -> Self {
        Self {
            records: Vec::new(),
            field_enabled: false,
            field_range: (0.0, 1000.0),
            energy_enabled: false,
            energy_range: (0.0, 100.0),
            interaction: None,
            interaction_types: Vec::new(),
            visible_indices: Vec::new(),
            selected: None,
            figure: None,
            model,
            color_map: ColorMap::default(),
            status_message: None,
        }
    }

    /// Replace the loaded records and reset filters to span them.
    pub fn set_records(&mut self, records: Vec<Record>) {
        self.color_map = ColorMap::new(records.iter().map(|r| r.name.as_str()));
        self.interaction_types = records
            .iter()
            .map(|r| r.interaction_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if let Some(range) = span(records.iter().map(|r| r.field)) {
            self.field_range = range;
        }
        if let Some(range) = span(records.iter().flat_map(|r| r.recoil_energy.iter().copied())) {
            self.energy_range = range;
        }
        self.field_enabled = false;
        self.energy_enabled = false;
        self.interaction = None;

        self.records = records;
        self.selected = None;
        self.status_message = None;
        self.refilter();
    }

    /// Filter built from the enabled widgets.
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            field: self.field_enabled.then_some(self.field_range),
            energy: self.energy_enabled.then_some(self.energy_range),
            interaction_type: self.interaction.clone(),
        }
    }

    /// Recompute `visible_indices` after a filter change. The selection
    /// moves to the first visible record when it is filtered out.
    pub fn refilter(&mut self) {
        self.visible_indices = self.filter().apply(&self.records);
        let keep = self
            .selected
            .filter(|i| self.visible_indices.contains(i))
            .or_else(|| self.visible_indices.first().copied());
        self.select(keep);
    }

    pub fn select(&mut self, index: Option<usize>) {
        if index == self.selected && self.figure.is_some() {
            return;
        }
        self.selected = index;
        self.figure = None;

        let Some(record) = index.and_then(|i| self.records.get(i)) else {
            return;
        };
        match build_figure(&self.model, record) {
            Ok(fig) => {
                let color = self.color_map.color_for(&record.name);
                self.figure = Some(fig.with_data_color(color));
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Cannot draw {}: {e}", record.identification);
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.selected.and_then(|i| self.records.get(i))
    }
}

/// `(min, max)` of the values, `None` when there are none.
fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
