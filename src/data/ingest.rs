use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::model::{MetadataValue, Record, SparseSeries, YieldType};
use super::source::SourceTable;
use crate::config::Settings;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read a source table, normalize it and write one record file per drift
/// field into `out_dir`. Returns the written paths in group order.
pub fn ingest_file(
    path: &Path,
    yield_type: YieldType,
    out_dir: &Path,
    settings: &Settings,
) -> Result<Vec<PathBuf>> {
    let table = SourceTable::load(path)?;
    log::info!(
        "Read {} rows with columns {:?} from {}",
        table.len(),
        table.headers,
        path.display()
    );

    let records = normalize(&table, yield_type, settings)?;
    std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;

    records
        .iter()
        .map(|record| write_record(out_dir, record))
        .collect()
}

/// Split a source table into one [`Record`] per distinct drift field.
///
/// Groups come out in order of first appearance of their field value.
pub fn normalize(
    table: &SourceTable,
    yield_type: YieldType,
    settings: &Settings,
) -> Result<Vec<Record>> {
    let cols = ResolvedColumns::resolve(table, yield_type, settings)?;

    let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
    let mut by_key: HashMap<u64, usize> = HashMap::new();
    for row in 0..table.len() {
        let field = required_number(table, row, cols.field, &settings.columns.field)?;
        // -0.0 and 0.0 are the same field.
        let key = (field + 0.0).to_bits();
        let slot = *by_key.entry(key).or_insert_with(|| {
            groups.push((field, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }

    groups
        .iter()
        .map(|(field, rows)| build_record(table, &cols, *field, rows, yield_type, settings))
        .collect()
}

/// Deterministic file name for a record: `{name}_{field}_{qy|ly}.json`.
/// Spaces and path separators in the name become `_`, so the file always
/// lands directly in the output directory.
pub fn output_file_name(name: &str, field: f64, yield_type: YieldType) -> String {
    let stem = name.to_lowercase().replace([' ', '/', '\\'], "_");
    format!(
        "{stem}_{}_{}.json",
        format_field(field),
        yield_type.file_suffix()
    )
}

/// Print a field value as a float with at least one decimal (`270.0`).
pub fn format_field(field: f64) -> String {
    format!("{field:?}")
}

/// Serialize `record` as indented JSON into `dir`, replacing any existing
/// file of the same name.
pub fn write_record(dir: &Path, record: &Record) -> Result<PathBuf> {
    let path = dir.join(output_file_name(
        &record.name,
        record.field,
        record.yield_type,
    ));

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record.serialize(&mut ser)?;

    std::fs::write(&path, buf).map_err(|e| Error::io(&path, e))?;
    log::info!(
        "Wrote {} ({} samples) to {}",
        record.name,
        record.len(),
        path.display()
    );
    Ok(path)
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Strip everything except digits, `.` and `-` (unit annotations, footnote
/// markers, `~`, ...).
pub fn clean_numeric(cell: &str) -> String {
    cell.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

/// Two-step coercion of a scalar metadata cell: missing markers give `None`,
/// cells whose cleaned text parses as a float give a number, anything else
/// keeps its original (trimmed) text.
pub fn coerce_metadata(cell: &str, settings: &Settings) -> Option<MetadataValue> {
    if settings.is_missing(cell) {
        return None;
    }
    let trimmed = cell.trim();
    match clean_numeric(trimmed).parse::<f64>() {
        Ok(v) => Some(MetadataValue::Number(v)),
        Err(_) => Some(MetadataValue::Text(trimmed.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Column indices looked up once per table.
struct ResolvedColumns {
    field: usize,
    name: usize,
    identification: Option<usize>,
    recoil_energy: usize,
    yield_col: usize,
    corrected_energy: usize,
    recoil_error: Option<usize>,
    drift_field_error: Option<usize>,
    gas_drift_field: Option<usize>,
    liquid_drift_field: Option<usize>,
    extraction_efficiency: Option<usize>,
    pixey: Option<usize>,
    max_yield: Option<usize>,
    min_yield: Option<usize>,
    max_recoil: Option<usize>,
    min_recoil: Option<usize>,
}

impl ResolvedColumns {
    fn resolve(table: &SourceTable, yield_type: YieldType, settings: &Settings) -> Result<Self> {
        let c = &settings.columns;
        let identification = match &c.identification {
            Some(header) => Some(table.require(header)?),
            None => None,
        };
        Ok(Self {
            field: table.require(&c.field)?,
            name: table.require(&c.name)?,
            identification,
            recoil_energy: table.require(&c.recoil_energy)?,
            yield_col: table.require(c.yield_column(yield_type))?,
            corrected_energy: table.require(&c.corrected_energy)?,
            recoil_error: table.column(&c.recoil_error),
            drift_field_error: table.column(&c.drift_field_error),
            gas_drift_field: table.column(&c.gas_drift_field),
            liquid_drift_field: table.column(&c.liquid_drift_field),
            extraction_efficiency: table.column(&c.extraction_efficiency),
            pixey: table.column(&c.pixey),
            max_yield: table.column(&c.max_yield),
            min_yield: table.column(&c.min_yield),
            max_recoil: table.column(&c.max_recoil),
            min_recoil: table.column(&c.min_recoil),
        })
    }
}

fn build_record(
    table: &SourceTable,
    cols: &ResolvedColumns,
    field: f64,
    rows: &[usize],
    yield_type: YieldType,
    settings: &Settings,
) -> Result<Record> {
    let c = &settings.columns;
    let first = rows[0];

    let name = table.cell(first, cols.name).trim().to_string();
    if settings.is_missing(&name) {
        return Err(invalid(&c.name, first, &name));
    }
    let identification = identification(table, cols, rows, &name, settings);

    let numbers = |col: usize, header: &str| -> Result<Vec<f64>> {
        rows.iter()
            .map(|&row| required_number(table, row, col, header))
            .collect()
    };
    let recoil_energy = numbers(cols.recoil_energy, &c.recoil_energy)?;
    let yields = numbers(cols.yield_col, c.yield_column(yield_type))?;
    let corrected_energy = numbers(cols.corrected_energy, &c.corrected_energy)?;
    let recoil_error = sparse_series(table, cols.recoil_error, rows, &c.recoil_error, settings)?;

    let (max_yield, min_yield) = bound_pair(
        table,
        (cols.max_yield, &c.max_yield),
        (cols.min_yield, &c.min_yield),
        rows,
        settings,
    )?;
    let (max_recoil, min_recoil) = bound_pair(
        table,
        (cols.max_recoil, &c.max_recoil),
        (cols.min_recoil, &c.min_recoil),
        rows,
        settings,
    )?;

    let scalar = |col: Option<usize>| -> Option<MetadataValue> {
        match yield_type {
            YieldType::Charge => col.and_then(|i| coerce_metadata(table.cell(first, i), settings)),
            YieldType::Light => None,
        }
    };

    Ok(Record {
        name,
        identification,
        interaction_type: settings.interaction_type.clone(),
        field,
        yield_type,
        drift_field_error: scalar(cols.drift_field_error),
        gas_drift_field: scalar(cols.gas_drift_field),
        liquid_drift_field: scalar(cols.liquid_drift_field),
        extraction_efficiency: scalar(cols.extraction_efficiency),
        pixey: scalar(cols.pixey),
        recoil_energy,
        yields,
        recoil_error,
        corrected_energy,
        max_recoil,
        min_recoil,
        max_yield,
        min_yield,
    })
}

/// Display label: the dedicated column when configured, otherwise the
/// second row of the name column, otherwise the name itself.
fn identification(
    table: &SourceTable,
    cols: &ResolvedColumns,
    rows: &[usize],
    name: &str,
    settings: &Settings,
) -> String {
    let candidate = match cols.identification {
        Some(col) => table.cell(rows[0], col),
        None => rows.get(1).map(|&r| table.cell(r, cols.name)).unwrap_or(""),
    };
    if settings.is_missing(candidate) {
        name.to_string()
    } else {
        candidate.trim().to_string()
    }
}

fn invalid(column: &str, row: usize, value: &str) -> Error {
    Error::InvalidCell {
        column: column.to_string(),
        row: row + 1,
        value: value.to_string(),
    }
}

/// A finite number; `NaN` and infinities spelled out in the cell are invalid.
fn required_number(table: &SourceTable, row: usize, col: usize, header: &str) -> Result<f64> {
    let cell = table.cell(row, col);
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(header, row, cell))
}

/// Missing markers and non-finite numbers read as `None`.
fn optional_number(
    table: &SourceTable,
    row: usize,
    col: usize,
    header: &str,
    settings: &Settings,
) -> Result<Option<f64>> {
    let cell = table.cell(row, col);
    if settings.is_missing(cell) {
        return Ok(None);
    }
    let value = cell
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid(header, row, cell))?;
    Ok(value.is_finite().then_some(value))
}

/// Present when the column exists and at least one cell in the group holds a
/// value; missing cells inside a present column become `None`.
fn sparse_series(
    table: &SourceTable,
    col: Option<usize>,
    rows: &[usize],
    header: &str,
    settings: &Settings,
) -> Result<Option<SparseSeries>> {
    let Some(col) = col else {
        return Ok(None);
    };
    let series = rows
        .iter()
        .map(|&row| optional_number(table, row, col, header, settings))
        .collect::<Result<SparseSeries>>()?;
    Ok(series.iter().any(Option::is_some).then_some(series))
}

/// Upper/lower bound columns are kept or dropped together.
fn bound_pair(
    table: &SourceTable,
    (max_col, max_header): (Option<usize>, &str),
    (min_col, min_header): (Option<usize>, &str),
    rows: &[usize],
    settings: &Settings,
) -> Result<(Option<SparseSeries>, Option<SparseSeries>)> {
    let (Some(max_col), Some(min_col)) = (max_col, min_col) else {
        return Ok((None, None));
    };
    let max = sparse_series(table, Some(max_col), rows, max_header, settings)?;
    let min = sparse_series(table, Some(min_col), rows, min_header, settings)?;
    if max.is_none() && min.is_none() {
        return Ok((None, None));
    }
    let blank = || vec![None; rows.len()];
    Ok((
        Some(max.unwrap_or_else(blank)),
        Some(min.unwrap_or_else(blank)),
    ))
}
