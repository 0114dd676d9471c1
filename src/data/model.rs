use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ---------------------------------------------------------------------------
// YieldType – which quantum a record measures
// ---------------------------------------------------------------------------

/// Charge (electrons per keV) or light (photons per keV).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YieldType {
    Charge,
    Light,
}

impl YieldType {
    /// Suffix used in record file names.
    pub fn file_suffix(self) -> &'static str {
        match self {
            YieldType::Charge => "qy",
            YieldType::Light => "ly",
        }
    }

    /// Y-axis label for the observed-vs-model panel.
    pub fn axis_label(self) -> &'static str {
        match self {
            YieldType::Charge => "Charge Yield [e-/keVr]",
            YieldType::Light => "Light Yield [ph/keVr]",
        }
    }
}

impl fmt::Display for YieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YieldType::Charge => write!(f, "charge"),
            YieldType::Light => write!(f, "light"),
        }
    }
}

impl FromStr for YieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "charge" => Ok(YieldType::Charge),
            "light" => Ok(YieldType::Light),
            other => Err(Error::UnsupportedYieldType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// MetadataValue – a scalar metadata cell after numeric coercion
// ---------------------------------------------------------------------------

/// A scalar metadata value: numeric when the source cell parsed as a float,
/// otherwise the original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Number(v) => write!(f, "{v}"),
            MetadataValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(v) => Some(*v),
            MetadataValue::Text(_) => None,
        }
    }
}

/// A sequence column that may contain missing entries (`null` in JSON).
pub type SparseSeries = Vec<Option<f64>>;

// ---------------------------------------------------------------------------
// Record – one (name, field, yield type) dataset
// ---------------------------------------------------------------------------

/// One normalized dataset: every sample measured at a single drift field.
///
/// Field order is the JSON key order of stored records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    /// Display label, e.g. the legend entry.
    pub identification: String,
    pub interaction_type: String,
    /// Drift field in V/cm.
    pub field: f64,
    pub yield_type: YieldType,

    // Charge-only scalar metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_field_error: Option<MetadataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_drift_field: Option<MetadataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquid_drift_field: Option<MetadataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_efficiency: Option<MetadataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixey: Option<MetadataValue>,

    /// Recoil energies in keV, one per sample.
    pub recoil_energy: Vec<f64>,
    #[serde(rename = "yield")]
    pub yields: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recoil_error: Option<SparseSeries>,
    pub corrected_energy: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recoil: Option<SparseSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_recoil: Option<SparseSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_yield: Option<SparseSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_yield: Option<SparseSeries>,
}

impl Record {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.recoil_energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recoil_energy.is_empty()
    }

    /// `(min, max)` yield bounds when both halves of the pair are present.
    pub fn yield_bounds(&self) -> Option<(&[Option<f64>], &[Option<f64>])> {
        match (&self.min_yield, &self.max_yield) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }

    /// `(min, max)` recoil-energy bounds when both halves are present.
    pub fn recoil_bounds(&self) -> Option<(&[Option<f64>], &[Option<f64>])> {
        match (&self.min_recoil, &self.max_recoil) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }

    /// Whether any charge-only metadata field is set.
    pub fn has_charge_metadata(&self) -> bool {
        self.drift_field_error.is_some()
            || self.gas_drift_field.is_some()
            || self.liquid_drift_field.is_some()
            || self.extraction_efficiency.is_some()
            || self.pixey.is_some()
    }

    /// Drop charge-only metadata; used for light records.
    pub fn clear_charge_metadata(&mut self) {
        self.drift_field_error = None;
        self.gas_drift_field = None;
        self.liquid_drift_field = None;
        self.extraction_efficiency = None;
        self.pixey = None;
    }

    /// Check that every index-aligned sequence has the same length and that
    /// bound columns come in pairs.
    pub fn check_alignment(&self) -> Result<(), String> {
        let n = self.recoil_energy.len();
        let mut lengths = vec![
            ("yield", self.yields.len()),
            ("corrected_energy", self.corrected_energy.len()),
        ];
        let optional = [
            ("recoil_error", &self.recoil_error),
            ("max_recoil", &self.max_recoil),
            ("min_recoil", &self.min_recoil),
            ("max_yield", &self.max_yield),
            ("min_yield", &self.min_yield),
        ];
        for (key, series) in optional {
            if let Some(s) = series {
                lengths.push((key, s.len()));
            }
        }
        for (key, len) in lengths {
            if len != n {
                return Err(format!(
                    "'{key}' has {len} values but 'recoil_energy' has {n}"
                ));
            }
        }
        if self.min_yield.is_some() != self.max_yield.is_some() {
            return Err("'min_yield' and 'max_yield' must appear together".into());
        }
        if self.min_recoil.is_some() != self.max_recoil.is_some() {
            return Err("'min_recoil' and 'max_recoil' must appear together".into());
        }
        Ok(())
    }
}
