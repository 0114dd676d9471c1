//! Observed-vs-model comparison: predictions, reference curves, residuals.

use crate::data::model::{Record, YieldType};
use crate::physics::YieldModel;

/// Number of energies in a reference curve.
pub const SWEEP_POINTS: usize = 1000;
/// Reference curve energy range in keV (log-uniform, inclusive).
pub const SWEEP_MIN_KEV: f64 = 0.1;
pub const SWEEP_MAX_KEV: f64 = 100.0;

/// Predicted yield per keV at each energy.
///
/// Non-positive energies have no defined yield and come out as NaN.
pub fn predict(
    model: &dyn YieldModel,
    energies: &[f64],
    field: f64,
    yield_type: YieldType,
) -> Vec<f64> {
    energies
        .iter()
        .map(|&energy| {
            if energy <= 0.0 {
                return f64::NAN;
            }
            let q = model.nuclear_recoil(energy, field);
            let raw = match yield_type {
                YieldType::Charge => q.electrons,
                YieldType::Light => q.photons,
            };
            raw / energy
        })
        .collect()
}

/// `n` log-uniform points from `lo` to `hi`, both included.
pub fn log_sweep(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let (a, b) = (lo.log10(), hi.log10());
            let step = (b - a) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        hi
                    } else {
                        10f64.powf(a + step * i as f64)
                    }
                })
                .collect()
        }
    }
}

/// A densely sampled model prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub energies: Vec<f64>,
    pub yields: Vec<f64>,
}

/// Model prediction over the fixed 0.1–100 keV sweep at one field.
pub fn reference_curve(model: &dyn YieldModel, field: f64, yield_type: YieldType) -> Curve {
    let energies = log_sweep(SWEEP_MIN_KEV, SWEEP_MAX_KEV, SWEEP_POINTS);
    let yields = predict(model, &energies, field, yield_type);
    Curve { energies, yields }
}

// ---------------------------------------------------------------------------
// Residuals
// ---------------------------------------------------------------------------

/// How residuals of a record are scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Plain `observed - predicted`.
    None,
    /// Divided by the per-sample `recoil_error`.
    RecoilError,
    /// Divided by half the `max_yield - min_yield` spread.
    YieldBounds,
}

impl Normalization {
    /// Axis label for the residual panel.
    pub fn axis_label(self) -> &'static str {
        match self {
            Normalization::None => "Observed - Model",
            Normalization::RecoilError | Normalization::YieldBounds => "\u{03C3} (deviation)",
        }
    }
}

/// Residual of one sample. `value` is `None` when the sample's normalizer
/// is missing or zero, or the prediction is undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub energy: f64,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residuals {
    pub scheme: Normalization,
    pub points: Vec<Residual>,
}

impl Residuals {
    /// Defined residual values, in sample order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|r| r.value)
    }

    /// Largest defined residual magnitude.
    pub fn max_abs(&self) -> Option<f64> {
        self.values().map(f64::abs).reduce(f64::max)
    }
}

/// Observed minus predicted yield for every sample of `record`, evaluated at
/// the sample's corrected energy and the record's field.
///
/// `recoil_error` takes precedence over the yield bounds as normalizer.
pub fn residuals(model: &dyn YieldModel, record: &Record) -> Residuals {
    let predicted = predict(
        model,
        &record.corrected_energy,
        record.field,
        record.yield_type,
    );

    let (scheme, normalizers): (Normalization, Vec<Option<f64>>) =
        if let Some(errors) = &record.recoil_error {
            (Normalization::RecoilError, errors.clone())
        } else if let Some((lo, hi)) = record.yield_bounds() {
            let spread = lo
                .iter()
                .zip(hi)
                .map(|(l, h)| match (l, h) {
                    (Some(l), Some(h)) => Some((h - l) / 2.0),
                    _ => None,
                })
                .collect();
            (Normalization::YieldBounds, spread)
        } else {
            (Normalization::None, vec![Some(1.0); record.len()])
        };

    let mut undefined = 0usize;
    let points: Vec<Residual> = record
        .corrected_energy
        .iter()
        .zip(&record.yields)
        .zip(predicted)
        .zip(normalizers)
        .map(|(((&energy, &observed), expected), norm)| {
            let value = norm
                .filter(|n| *n != 0.0 && n.is_finite())
                .map(|n| (observed - expected) / n)
                .filter(|v| v.is_finite());
            if value.is_none() {
                undefined += 1;
            }
            Residual { energy, value }
        })
        .collect();

    if undefined > 0 {
        log::warn!(
            "{} ({} V/cm): {undefined} sample(s) without a usable residual",
            record.identification,
            record.field
        );
    }

    Residuals { scheme, points }
}

// ---------------------------------------------------------------------------
// Percent error across a collection
// ---------------------------------------------------------------------------

/// Percent deviation of one sample from the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentError {
    pub energy: f64,
    /// `|observed - predicted| / predicted * 100`; `None` when the
    /// prediction is zero or undefined.
    pub value: Option<f64>,
    /// `recoil_error` in the same percent units, when quoted.
    pub error: Option<f64>,
}

/// Percent errors of one record, tagged with its field for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldDiff {
    pub name: String,
    pub identification: String,
    pub field: f64,
    pub yield_type: YieldType,
    pub points: Vec<PercentError>,
}

/// Percent error of every sample of every record against the model,
/// in collection order.
pub fn yield_diffs(model: &dyn YieldModel, records: &[Record]) -> Vec<YieldDiff> {
    records
        .iter()
        .map(|record| {
            let predicted = predict(
                model,
                &record.corrected_energy,
                record.field,
                record.yield_type,
            );
            let points = record
                .corrected_energy
                .iter()
                .zip(&record.yields)
                .zip(predicted)
                .enumerate()
                .map(|(i, ((&energy, &observed), expected))| {
                    let usable = expected.is_finite() && expected != 0.0;
                    let percent = |v: f64| (v * 100.0 / expected).abs();
                    let error = record
                        .recoil_error
                        .as_ref()
                        .and_then(|errors| errors.get(i).copied().flatten());
                    PercentError {
                        energy,
                        value: usable.then(|| percent(observed - expected)),
                        error: error.filter(|_| usable).map(percent),
                    }
                })
                .collect();
            YieldDiff {
                name: record.name.clone(),
                identification: record.identification.clone(),
                field: record.field,
                yield_type: record.yield_type,
                points,
            }
        })
        .collect()
}
