//! Recoil yield model used as the reference for comparisons.
//!
//! Everything downstream talks to [`YieldModel`]; the built-in
//! [`ParametricNrModel`] is a NEST-style mean-yield parameterization for
//! nuclear recoils in liquid xenon.

use serde::{Deserialize, Serialize};

/// Mean number of quanta produced by one recoil.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quanta {
    pub photons: f64,
    pub electrons: f64,
}

/// Source of predicted yields.
pub trait YieldModel {
    /// Short label used in plot legends.
    fn name(&self) -> &str {
        "Model"
    }

    /// Mean photon and electron counts for a nuclear recoil of `energy` keV
    /// in a drift field of `field` V/cm.
    fn nuclear_recoil(&self, energy: f64, field: f64) -> Quanta;
}

impl<M: YieldModel + ?Sized> YieldModel for &M {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn nuclear_recoil(&self, energy: f64, field: f64) -> Quanta {
        (**self).nuclear_recoil(energy, field)
    }
}

// ---------------------------------------------------------------------------
// Detector profile
// ---------------------------------------------------------------------------

/// Detector conditions that enter the yield model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorProfile {
    pub name: String,
    /// Liquid xenon density in g/cm^3.
    pub density: f64,
}

impl DetectorProfile {
    /// The XENON10 example detector (177 K, 2.14 bar).
    pub fn xenon10() -> Self {
        Self {
            name: "XENON10".into(),
            density: 2.86,
        }
    }
}

impl Default for DetectorProfile {
    fn default() -> Self {
        Self::xenon10()
    }
}

// ---------------------------------------------------------------------------
// Built-in nuclear recoil model
// ---------------------------------------------------------------------------

/// Reference liquid xenon density the field dependence is quoted at.
const REFERENCE_DENSITY: f64 = 2.9;

/// Free parameters of the nuclear recoil parameterization.
#[derive(Debug, Clone, PartialEq)]
pub struct NrYieldParams {
    /// Total quanta: `alpha * E^beta`.
    pub alpha: f64,
    pub beta: f64,
    /// Thomas-Imel box parameter: `gamma * F^delta`.
    pub gamma: f64,
    pub delta: f64,
    /// Charge yield energy offset and exponent.
    pub epsilon: f64,
    pub zeta: f64,
    /// Low-energy charge roll-off: `1 - 1 / (1 + (E/eta)^theta)^iota`.
    pub eta: f64,
    pub theta: f64,
    pub iota: f64,
    /// Low-energy light roll-off: `1 - 1 / (1 + (E/kappa)^lambda)^mu`.
    pub kappa: f64,
    pub lambda: f64,
    pub mu: f64,
}

impl Default for NrYieldParams {
    fn default() -> Self {
        Self {
            alpha: 11.0,
            beta: 1.1,
            gamma: 0.0480,
            delta: -0.0533,
            epsilon: 12.6,
            zeta: 0.5,
            eta: 0.3,
            theta: 2.0,
            iota: 1.0,
            kappa: 2.0,
            lambda: 0.5,
            mu: 1.0,
        }
    }
}

/// Parametric mean-yield model for nuclear recoils.
#[derive(Debug, Clone)]
pub struct ParametricNrModel {
    profile: DetectorProfile,
    params: NrYieldParams,
    label: String,
}

impl ParametricNrModel {
    pub fn new(profile: DetectorProfile) -> Self {
        Self::with_params(profile, NrYieldParams::default())
    }

    pub fn with_params(profile: DetectorProfile, params: NrYieldParams) -> Self {
        let label = format!("NR model ({})", profile.name);
        Self {
            profile,
            params,
            label,
        }
    }

    pub fn profile(&self) -> &DetectorProfile {
        &self.profile
    }

    fn roll_off(energy: f64, scale: f64, power: f64, outer: f64) -> f64 {
        1.0 - 1.0 / (1.0 + (energy / scale).powf(power)).powf(outer)
    }
}

impl YieldModel for ParametricNrModel {
    fn name(&self) -> &str {
        &self.label
    }

    fn nuclear_recoil(&self, energy: f64, field: f64) -> Quanta {
        if !(energy > 0.0) {
            return Quanta {
                photons: 0.0,
                electrons: 0.0,
            };
        }
        let p = &self.params;
        let total = p.alpha * energy.powf(p.beta);
        let thomas_imel = p.gamma
            * field.max(f64::MIN_POSITIVE).powf(p.delta)
            * (self.profile.density / REFERENCE_DENSITY).powf(0.3);

        let charge_per_kev = (1.0 / (thomas_imel * (energy + p.epsilon).powf(p.zeta))
            * Self::roll_off(energy, p.eta, p.theta, p.iota))
        .max(0.0);
        let light_per_kev = (total / energy - charge_per_kev).max(0.0);

        Quanta {
            photons: light_per_kev * energy * Self::roll_off(energy, p.kappa, p.lambda, p.mu),
            electrons: charge_per_kev * energy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quanta_are_non_negative_and_grow_with_energy() {
        let model = ParametricNrModel::new(DetectorProfile::xenon10());
        let low = model.nuclear_recoil(1.0, 200.0);
        let high = model.nuclear_recoil(50.0, 200.0);
        assert!(low.photons >= 0.0 && low.electrons >= 0.0);
        assert!(high.photons > low.photons);
        assert!(high.electrons > low.electrons);
    }

    #[test]
    fn charge_yield_per_kev_is_in_the_expected_range() {
        let model = ParametricNrModel::new(DetectorProfile::xenon10());
        let q = model.nuclear_recoil(10.0, 500.0);
        let qy = q.electrons / 10.0;
        let ly = q.photons / 10.0;
        assert!((4.0..9.0).contains(&qy), "qy = {qy}");
        assert!((4.0..10.0).contains(&ly), "ly = {ly}");
    }

    #[test]
    fn higher_field_gives_more_charge() {
        let model = ParametricNrModel::new(DetectorProfile::default());
        let weak = model.nuclear_recoil(20.0, 10.0).electrons;
        let strong = model.nuclear_recoil(20.0, 3000.0).electrons;
        assert!(strong > weak);
    }

    #[test]
    fn label_names_the_detector() {
        let model = ParametricNrModel::new(DetectorProfile::xenon10());
        assert_eq!(model.name(), "NR model (XENON10)");
    }

    #[test]
    fn zero_energy_yields_nothing() {
        let model = ParametricNrModel::new(DetectorProfile::default());
        let q = model.nuclear_recoil(0.0, 100.0);
        assert_eq!(q.photons, 0.0);
        assert_eq!(q.electrons, 0.0);
    }
}
