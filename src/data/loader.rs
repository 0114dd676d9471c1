use std::path::{Path, PathBuf};

use glob::glob;

use super::model::{Record, YieldType};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load every record file matching a glob pattern.
///
/// Fails on the first malformed file: a comparison batch built from a partial
/// collection would silently miss datasets.
pub fn load_all(pattern: &str) -> Result<Vec<Record>> {
    let paths = expand_pattern(pattern)?;
    if paths.is_empty() {
        log::warn!("No record files match '{pattern}'");
    }

    let records = paths
        .iter()
        .map(|p| load_record(p))
        .collect::<Result<Vec<_>>>()?;

    log::info!("Loaded {} records from '{pattern}'", records.len());
    Ok(records)
}

/// Load all `*.json` records in a directory.
pub fn load_dir(dir: &Path) -> Result<Vec<Record>> {
    let pattern = dir.join("*.json");
    load_all(&pattern.to_string_lossy())
}

/// Read and validate a single record file.
pub fn load_record(path: &Path) -> Result<Record> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_record(&text, path)
}

/// Parse record JSON; `origin` is only used for error context.
pub fn parse_record(text: &str, origin: &Path) -> Result<Record> {
    let parse_error = |reason: String| Error::Parse {
        path: origin.to_path_buf(),
        reason,
    };

    let mut record: Record =
        serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    record.check_alignment().map_err(parse_error)?;

    if record.yield_type == YieldType::Light && record.has_charge_metadata() {
        log::warn!(
            "{}: dropping charge-only metadata from a light yield record",
            origin.display()
        );
        record.clear_charge_metadata();
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Expand a glob pattern to the matching files, in the glob crate's order.
fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob(pattern).map_err(|e| Error::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            Error::io(path, e.into())
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "name": "Columbia",
        "identification": "Columbia 2024",
        "interaction_type": "NR",
        "field": 270,
        "yield_type": "charge",
        "gas_drift_field": 5.0,
        "pixey": "n/a",
        "recoil_energy": [4.0, 8.0],
        "yield": [7.1, 6.5],
        "recoil_error": [0.4, null],
        "corrected_energy": [4.1, 8.2]
    }"#;

    #[test]
    fn parses_record_with_optional_fields() {
        let rec = parse_record(RECORD, Path::new("inline.json")).unwrap();
        assert_eq!(rec.field, 270.0);
        assert_eq!(rec.yields, vec![7.1, 6.5]);
        assert_eq!(rec.recoil_error, Some(vec![Some(0.4), None]));
        assert_eq!(rec.max_yield, None);
    }

    #[test]
    fn missing_key_is_a_parse_error() {
        let text = RECORD.replace("\"yield\": [7.1, 6.5],", "");
        let err = parse_record(&text, Path::new("broken.json")).unwrap_err();
        match err {
            Error::Parse { path, reason } => {
                assert_eq!(path, Path::new("broken.json"));
                assert!(reason.contains("yield"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn misaligned_record_is_a_parse_error() {
        let text = RECORD.replace("[4.1, 8.2]", "[4.1]");
        let err = parse_record(&text, Path::new("short.json")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn unknown_yield_type_is_rejected() {
        let text = RECORD.replace("\"charge\"", "\"heat\"");
        assert!(parse_record(&text, Path::new("heat.json")).is_err());
    }

    #[test]
    fn light_records_lose_charge_metadata() {
        let text = RECORD.replace("\"charge\"", "\"light\"");
        let rec = parse_record(&text, Path::new("light.json")).unwrap();
        assert!(!rec.has_charge_metadata());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = load_all("records/[*.json").unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn matched_directories_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("nested.json")).unwrap();
        std::fs::write(tmp.path().join("columbia.json"), RECORD).unwrap();

        let records = load_dir(tmp.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identification, "Columbia 2024");
    }
}
