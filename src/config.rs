use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::model::YieldType;
use crate::error::{Error, Result};
use crate::physics::DetectorProfile;

// ---------------------------------------------------------------------------
// Column naming for source tables
// ---------------------------------------------------------------------------

/// Header text of each logical column in a wide-format source table.
///
/// The defaults match the spreadsheet layout the measurements are collected in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub field: String,
    pub name: String,
    /// Dedicated label column. When unset, the label is taken from the
    /// second row of the `name` column.
    pub identification: Option<String>,
    pub recoil_energy: String,
    pub charge_yield: String,
    pub light_yield: String,
    pub recoil_error: String,
    pub corrected_energy: String,
    pub drift_field_error: String,
    pub gas_drift_field: String,
    pub liquid_drift_field: String,
    pub extraction_efficiency: String,
    pub pixey: String,
    pub max_yield: String,
    pub min_yield: String,
    pub max_recoil: String,
    pub min_recoil: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            field: "Field".into(),
            name: "Name".into(),
            identification: None,
            recoil_energy: "keVr".into(),
            charge_yield: "Q_y (e-/keVr)".into(),
            light_yield: "Ly (ph/keVr)".into(),
            recoil_error: "error".into(),
            corrected_energy: "EnergyCorr".into(),
            drift_field_error: "df +/- [V/cm]".into(),
            gas_drift_field: "GasF [V/cm]".into(),
            liquid_drift_field: "LiqF [V/cm]".into(),
            extraction_efficiency: "Extr Assumed".into(),
            pixey: "Extr PIXeY".into(),
            max_yield: "Y+".into(),
            min_yield: "Y-".into(),
            max_recoil: "x+".into(),
            min_recoil: "x-".into(),
        }
    }
}

impl ColumnMap {
    /// Yield column for the given yield type.
    pub fn yield_column(&self, yield_type: YieldType) -> &str {
        match yield_type {
            YieldType::Charge => &self.charge_yield,
            YieldType::Light => &self.light_yield,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings – everything a run can be configured with
// ---------------------------------------------------------------------------

/// Process-wide settings, loaded once and passed by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub columns: ColumnMap,
    /// Cell contents treated as "no value" (compared after trimming).
    pub missing_markers: Vec<String>,
    /// Interaction type stamped on ingested records.
    pub interaction_type: String,
    /// Detector the yield model is configured for.
    pub detector: DetectorProfile,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            missing_markers: ["", "nan", "NaN", "NA", "N/A", "null", "None"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            interaction_type: "NR".into(),
            detector: DetectorProfile::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; absent keys keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let settings = serde_json::from_str(&text)?;
        Ok(settings)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                log::info!("Reading settings from {}", p.display());
                Self::from_path(p)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn is_missing(&self, cell: &str) -> bool {
        let cell = cell.trim();
        self.missing_markers.iter().any(|m| m == cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_keep_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{ "columns": { "field": "Drift" }, "interaction_type": "ER" }"#)
                .unwrap();
        assert_eq!(s.columns.field, "Drift");
        assert_eq!(s.columns.name, "Name");
        assert_eq!(s.interaction_type, "ER");
        assert_eq!(s.detector, DetectorProfile::default());
    }

    #[test]
    fn missing_markers_are_trimmed() {
        let s = Settings::default();
        assert!(s.is_missing("  "));
        assert!(s.is_missing(" NaN "));
        assert!(!s.is_missing("0"));
    }

    #[test]
    fn yield_column_follows_type() {
        let c = ColumnMap::default();
        assert_eq!(c.yield_column(YieldType::Charge), "Q_y (e-/keVr)");
        assert_eq!(c.yield_column(YieldType::Light), "Ly (ph/keVr)");
    }
}
