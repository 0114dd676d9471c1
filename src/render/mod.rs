//! Comparison figures.
//!
//! [`build_figure`] turns a record into a backend-neutral two-panel
//! [`Figure`] and [`build_diff_figure`] summarises a whole collection as
//! percent error against drift field; the
//! [`draw`] module writes figures to SVG/PNG files and the viewer draws the
//! same description with egui.

pub mod draw;

use std::path::{Path, PathBuf};

use crate::color::{self, ColorMap, Rgb};
use crate::compare::{reference_curve, residuals, yield_diffs};
use crate::data::ingest::format_field;
use crate::data::model::Record;
use crate::error::{Error, Result};
use crate::physics::YieldModel;

/// File written by `plot` when no output path is given.
pub const DEFAULT_FIGURE_FILE: &str = "yield_comparison.png";
/// File written by `diffs` when no output path is given.
pub const DEFAULT_DIFF_FILE: &str = "yield_diffs.png";
/// Padding around the data extent, in keV.
pub const X_MARGIN_KEV: f64 = 5.0;
/// Padding around the yield extent.
pub const Y_MARGIN: f64 = 0.5;
/// Residual magnitude above which the residual axis turns symmetric-log.
pub const SYMLOG_THRESHOLD: f64 = 10.0;

// ---------------------------------------------------------------------------
// Figure description
// ---------------------------------------------------------------------------

/// Vertical axis scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisScale {
    Linear,
    /// Linear within `±linthresh`, logarithmic outside.
    SymLog { linthresh: f64 },
}

impl AxisScale {
    /// Data value → plotting coordinate.
    pub fn forward(self, v: f64) -> f64 {
        match self {
            AxisScale::Linear => v,
            AxisScale::SymLog { linthresh } => {
                let a = v.abs() / linthresh;
                if a <= 1.0 {
                    v / linthresh
                } else {
                    v.signum() * (1.0 + a.log10())
                }
            }
        }
    }

    /// Plotting coordinate → data value.
    pub fn inverse(self, u: f64) -> f64 {
        match self {
            AxisScale::Linear => u,
            AxisScale::SymLog { linthresh } => {
                if u.abs() <= 1.0 {
                    u * linthresh
                } else {
                    u.signum() * linthresh * 10f64.powf(u.abs() - 1.0)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Markers,
    DashedLine,
}

/// A named set of points drawn one way.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: Option<String>,
    pub points: Vec<(f64, f64)>,
    pub mark: Mark,
    pub color: Rgb,
}

/// One error bar segment in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorBar {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub x_label: String,
    pub y_label: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub y_scale: AxisScale,
    pub series: Vec<Series>,
    pub error_bars: Vec<ErrorBar>,
    /// Dashed horizontal reference lines.
    pub hlines: Vec<f64>,
}

/// Observed data with the model curve above, residuals below. Single-panel
/// figures leave `lower` empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub upper: Panel,
    pub lower: Option<Panel>,
}

impl Figure {
    /// Recolour the observed data and residual markers.
    pub fn with_data_color(mut self, rgb: Rgb) -> Self {
        for s in self
            .upper
            .series
            .iter_mut()
            .chain(self.lower.iter_mut().flat_map(|p| p.series.iter_mut()))
        {
            if s.mark == Mark::Markers {
                s.color = rgb;
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Describe the comparison figure for one record.
pub fn build_figure(model: &dyn YieldModel, record: &Record) -> Result<Figure> {
    let x_extent = extent(&record.corrected_energy);
    let y_extent = extent(&record.yields);
    let (Some((x_min, x_max)), Some((y_min, y_max))) = (x_extent, y_extent) else {
        return Err(Error::EmptyRecord {
            record: format!("{} ({} V/cm)", record.identification, format_field(record.field)),
        });
    };
    let x_range = (x_min - X_MARGIN_KEV, x_max + X_MARGIN_KEV);

    let observed = Series {
        label: Some(record.identification.clone()),
        points: record
            .corrected_energy
            .iter()
            .copied()
            .zip(record.yields.iter().copied())
            .collect(),
        mark: Mark::Markers,
        color: color::DATA,
    };

    let curve = reference_curve(model, record.field, record.yield_type);
    let model_series = Series {
        label: Some(format!("{}: {} V/cm", model.name(), format_field(record.field))),
        points: curve
            .energies
            .iter()
            .copied()
            .zip(curve.yields.iter().copied())
            .filter(|(_, y)| y.is_finite())
            .collect(),
        mark: Mark::DashedLine,
        color: color::MODEL,
    };

    let upper = Panel {
        x_label: "Recoil Energy [keV]".into(),
        y_label: record.yield_type.axis_label().into(),
        x_range,
        y_range: (y_min - Y_MARGIN, y_max + Y_MARGIN),
        y_scale: AxisScale::Linear,
        series: vec![observed, model_series],
        error_bars: error_bars(record),
        hlines: Vec::new(),
    };

    let res = residuals(model, record);
    let points: Vec<(f64, f64)> = res
        .points
        .iter()
        .filter_map(|r| r.value.map(|v| (r.energy, v)))
        .collect();
    let y_scale = match res.max_abs() {
        Some(m) if m > SYMLOG_THRESHOLD => AxisScale::SymLog { linthresh: 1.0 },
        _ => AxisScale::Linear,
    };

    let lower = Panel {
        x_label: "Recoil Energy [keV]".into(),
        y_label: res.scheme.axis_label().into(),
        x_range,
        y_range: residual_range(points.iter().map(|p| p.1)),
        y_scale,
        series: vec![Series {
            label: None,
            points,
            mark: Mark::Markers,
            color: color::DATA,
        }],
        error_bars: Vec::new(),
        hlines: vec![0.0],
    };

    Ok(Figure {
        title: format!(
            "{}: {} yield at {} V/cm",
            record.identification,
            record.yield_type,
            format_field(record.field)
        ),
        upper,
        lower: Some(lower),
    })
}

/// Percent error of every record against the model, plotted over drift
/// field. One marker series per identification, coloured by dataset name.
pub fn build_diff_figure(model: &dyn YieldModel, records: &[Record]) -> Result<Figure> {
    if records.is_empty() {
        return Err(Error::EmptyCollection);
    }
    let colors = ColorMap::new(records.iter().map(|r| r.name.as_str()));

    let mut series: Vec<Series> = Vec::new();
    let mut bars = Vec::new();
    for diff in yield_diffs(model, records) {
        let idx = match series
            .iter()
            .position(|s| s.label.as_deref() == Some(diff.identification.as_str()))
        {
            Some(i) => i,
            None => {
                series.push(Series {
                    label: Some(diff.identification.clone()),
                    points: Vec::new(),
                    mark: Mark::Markers,
                    color: colors.color_for(&diff.name),
                });
                series.len() - 1
            }
        };
        for p in &diff.points {
            let Some(v) = p.value else { continue };
            series[idx].points.push((diff.field, v));
            if let Some(e) = p.error {
                bars.push(ErrorBar {
                    from: (diff.field, v - e),
                    to: (diff.field, v + e),
                });
            }
        }
    }

    let fields: Vec<f64> = records.iter().map(|r| r.field).collect();
    let x_range = match extent(&fields) {
        Some((lo, hi)) => {
            let pad = ((hi - lo) * 0.05).max(10.0);
            (lo - pad, hi + pad)
        }
        None => (0.0, 1.0),
    };
    let reach = bars
        .iter()
        .flat_map(|b| [b.from.1, b.to.1])
        .chain(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    let upper = Panel {
        x_label: "Field Strength [V/cm]".into(),
        y_label: "Percent Error".into(),
        x_range,
        y_range: residual_range(reach),
        y_scale: AxisScale::Linear,
        series,
        error_bars: bars,
        hlines: vec![0.0],
    };
    Ok(Figure {
        title: format!("Yield percent error vs. {}", model.name()),
        upper,
        lower: None,
    })
}

/// Build the figure and, when `output` is given, write it there.
pub fn render(model: &dyn YieldModel, record: &Record, output: Option<&Path>) -> Result<Figure> {
    let figure = build_figure(model, record)?;
    if let Some(path) = output {
        draw::save_figure(&figure, path)?;
        log::info!("Saved figure for {} to {}", record.identification, path.display());
    }
    Ok(figure)
}

/// Render every record as one page, in collection order. Pages go to
/// `path`, or to numbered files next to it when the batch outgrows one file
/// (see [`draw::page_files`]). Returns the files written.
pub fn render_batch(
    model: &dyn YieldModel,
    records: &[Record],
    path: &Path,
) -> Result<Vec<PathBuf>> {
    if records.is_empty() {
        return Err(Error::EmptyCollection);
    }
    let figures = records
        .iter()
        .map(|r| build_figure(model, r))
        .collect::<Result<Vec<_>>>()?;
    let written = draw::save_pages(&figures, path)?;
    log::info!("Saved {} pages to {} file(s)", figures.len(), written.len());
    Ok(written)
}

/// Build the percent-error figure and write it to `path`.
pub fn render_diffs(model: &dyn YieldModel, records: &[Record], path: &Path) -> Result<Figure> {
    let figure = build_diff_figure(model, records)?;
    draw::save_figure(&figure, path)?;
    log::info!("Saved percent errors of {} records to {}", records.len(), path.display());
    Ok(figure)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `(min, max)` of the finite values, `None` when there are none.
fn extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Residual axis range: the data extent plus 10%, always including zero.
fn residual_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let data: Vec<f64> = values.collect();
    match extent(&data) {
        None => (-1.0, 1.0),
        Some((lo, hi)) => {
            let (lo, hi) = (lo.min(0.0), hi.max(0.0));
            let pad = ((hi - lo) * 0.1).max(0.5);
            (lo - pad, hi + pad)
        }
    }
}

/// Vertical bars from `recoil_error` (or the yield bounds when there is no
/// error column) and horizontal bars from the recoil bounds.
fn error_bars(record: &Record) -> Vec<ErrorBar> {
    let mut bars = Vec::new();
    let samples = record.corrected_energy.iter().zip(&record.yields).enumerate();

    if let Some(errors) = &record.recoil_error {
        for (i, (&x, &y)) in samples.clone() {
            if let Some(e) = errors.get(i).copied().flatten() {
                bars.push(ErrorBar {
                    from: (x, y - e),
                    to: (x, y + e),
                });
            }
        }
    } else if let Some((lo, hi)) = record.yield_bounds() {
        for (i, (&x, _)) in samples.clone() {
            if let (Some(Some(l)), Some(Some(h))) = (lo.get(i), hi.get(i)) {
                bars.push(ErrorBar {
                    from: (x, *l),
                    to: (x, *h),
                });
            }
        }
    }

    if let Some((lo, hi)) = record.recoil_bounds() {
        for (i, (_, &y)) in samples {
            if let (Some(Some(l)), Some(Some(h))) = (lo.get(i), hi.get(i)) {
                bars.push(ErrorBar {
                    from: (*l, y),
                    to: (*h, y),
                });
            }
        }
    }
    bars
}
