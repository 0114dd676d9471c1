use super::model::Record;

// ---------------------------------------------------------------------------
// Single-attribute filters
// ---------------------------------------------------------------------------

/// Keep records whose drift field lies in `[low, high]`.
pub fn field_filter(low: f64, high: f64, records: &[Record]) -> Vec<Record> {
    select(records, |r| in_field_range(r, low, high))
}

/// Keep records whose *every* recoil energy lies in `[low, high]`.
///
/// The test admits or rejects a whole record. A record without samples is
/// rejected.
pub fn energy_filter(low: f64, high: f64, records: &[Record]) -> Vec<Record> {
    select(records, |r| in_energy_range(r, low, high))
}

/// Keep records with exactly this interaction type (case-sensitive).
pub fn interaction_type_filter(kind: &str, records: &[Record]) -> Vec<Record> {
    select(records, |r| r.interaction_type == kind)
}

fn select(records: &[Record], keep: impl Fn(&Record) -> bool) -> Vec<Record> {
    records.iter().filter(|r| keep(r)).cloned().collect()
}

fn in_field_range(record: &Record, low: f64, high: f64) -> bool {
    low <= record.field && record.field <= high
}

fn in_energy_range(record: &Record, low: f64, high: f64) -> bool {
    !record.is_empty()
        && record
            .recoil_energy
            .iter()
            .all(|&e| low <= e && e <= high)
}

// ---------------------------------------------------------------------------
// Combined filter
// ---------------------------------------------------------------------------

/// All three filters at once; unset constraints pass everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub field: Option<(f64, f64)>,
    pub energy: Option<(f64, f64)>,
    pub interaction_type: Option<String>,
}

impl RecordFilter {
    pub fn is_active(&self) -> bool {
        self.field.is_some() || self.energy.is_some() || self.interaction_type.is_some()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some((lo, hi)) = self.field {
            if !in_field_range(record, lo, hi) {
                return false;
            }
        }
        if let Some((lo, hi)) = self.energy {
            if !in_energy_range(record, lo, hi) {
                return false;
            }
        }
        match &self.interaction_type {
            Some(kind) => record.interaction_type == *kind,
            None => true,
        }
    }

    /// Indices of the records passing every active constraint.
    pub fn apply(&self, records: &[Record]) -> Vec<usize> {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.matches(r))
            .map(|(i, _)| i)
            .collect()
    }

    /// New collection holding the records passing every active constraint.
    pub fn select(&self, records: &[Record]) -> Vec<Record> {
        select(records, |r| self.matches(r))
    }
}
