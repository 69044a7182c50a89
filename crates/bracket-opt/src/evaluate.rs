//! Evaluator contract and a reference implementation.
//!
//! Contract
//! - `evaluate` is deterministic and pure in `(candidate, inputs)`.
//! - `weight` is non-decreasing in `bracket_height` and `angle_leg`, and
//!   `evaluate` reports `weight(c, inputs, h, leg)` for the geometry it
//!   actually checked. The search's lower bound relies on both.
//!
//! The reference evaluator uses simplified elastic checks. It is good enough to
//! exercise the search end to end; it is not a design code implementation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::ChannelCatalog;
use crate::error::{EvaluationFault, ExtensionError};
use crate::generate::Candidate;
use crate::geometry::{
    derive_geometry, min_bracket_height, DerivedGeometry, ANGLE_HORIZONTAL_LEG, DIM_D_MAX,
    MAX_STANDARD_BRACKET_HEIGHT,
};
use crate::inputs::DesignInputs;
use crate::selector::BracketType;

/// One verification line.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CheckResult {
    pub name: String,
    /// Demand over capacity; ≤ 1 passes.
    pub utilisation: f64,
    pub passed: bool,
}

impl CheckResult {
    fn new(name: &str, demand: f64, capacity: f64) -> Self {
        let utilisation = if capacity > 0.0 {
            demand / capacity
        } else {
            f64::INFINITY
        };
        Self {
            name: name.to_string(),
            utilisation,
            passed: utilisation <= 1.0 + 1e-9,
        }
    }
}

/// Evaluator output for one candidate.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Evaluation {
    pub valid: bool,
    /// Steel weight in kg per metre run; `None` unless valid.
    pub weight: Option<f64>,
    pub checks: Vec<CheckResult>,
    /// Why the candidate was rejected before or during the checks.
    pub failure: Option<String>,
}

impl Evaluation {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            weight: None,
            checks: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    /// Weight used for ranking: unbounded unless valid.
    pub fn effective_weight(&self) -> f64 {
        match (self.valid, self.weight) {
            (true, Some(w)) => w,
            _ => f64::INFINITY,
        }
    }

    /// Largest utilisation over all checks.
    pub fn governing_utilisation(&self) -> f64 {
        self.checks
            .iter()
            .map(|c| c.utilisation)
            .fold(0.0, f64::max)
    }
}

/// Structural verification and weight of a candidate.
pub trait Evaluator {
    fn evaluate(
        &self,
        candidate: &Candidate,
        inputs: &DesignInputs,
    ) -> Result<Evaluation, EvaluationFault>;

    /// Steel weight (kg/m) of `candidate` built with the given bracket height
    /// and vertical leg.
    fn weight(
        &self,
        candidate: &Candidate,
        inputs: &DesignInputs,
        bracket_height: f64,
        angle_leg: f64,
    ) -> f64;
}

/// Steel properties used by the reference checks.
#[derive(Clone, Copy, Debug)]
pub struct SteelCfg {
    /// Yield strength, N/mm².
    pub fy: f64,
    /// Elastic modulus, N/mm².
    pub e_modulus: f64,
    /// Density, kg/mm³.
    pub density: f64,
}

impl Default for SteelCfg {
    fn default() -> Self {
        Self {
            fy: 235.0,
            e_modulus: 200_000.0,
            density: 7.85e-6,
        }
    }
}

/// Bolt resistances (tension, shear) in kN.
fn bolt_capacity(diameter: u32) -> Option<(f64, f64)> {
    match diameter {
        10 => Some((10.5, 8.0)),
        12 => Some((15.3, 11.6)),
        _ => None,
    }
}

/// Bolt mass per bracket, kg.
fn bolt_mass(diameter: u32) -> f64 {
    if diameter >= 12 {
        0.08
    } else {
        0.05
    }
}

/// Bracket plate stands off the slab edge by this much beyond the cavity (mm).
const BRACKET_STANDOFF: f64 = 40.0;
/// Plate area over its bounding rectangle (tapered brackets).
const PLATE_FILL: f64 = 0.6;
/// Deflection limit of the angle between brackets (mm).
const MAX_DEFLECTION: f64 = 1.5;

/// Simplified evaluator backed by a channel catalog.
pub struct ReferenceEvaluator<'a> {
    catalog: &'a dyn ChannelCatalog,
    steel: SteelCfg,
}

impl<'a> ReferenceEvaluator<'a> {
    pub fn new(catalog: &'a dyn ChannelCatalog) -> Self {
        Self {
            catalog,
            steel: SteelCfg::default(),
        }
    }

    pub fn with_steel(mut self, steel: SteelCfg) -> Self {
        self.steel = steel;
        self
    }

    fn height_within_range(&self, c: &Candidate, g: &DerivedGeometry) -> Option<String> {
        let h = g.bracket_height();
        let lo = min_bracket_height(c.bracket_type);
        let hi = match c.bracket_type {
            BracketType::Standard => MAX_STANDARD_BRACKET_HEIGHT,
            BracketType::Inverted => DIM_D_MAX,
        };
        if h < lo - 1e-9 || h > hi + 1e-9 {
            Some(format!(
                "{} bracket height {h:.1} mm outside [{lo:.0}, {hi:.0}]",
                c.bracket_type
            ))
        } else {
            None
        }
    }

    fn checks(
        &self,
        c: &Candidate,
        inputs: &DesignInputs,
        g: &DerivedGeometry,
        characteristic_load: f64,
    ) -> Result<Vec<CheckResult>, EvaluationFault> {
        let spec = self
            .catalog
            .lookup(&c.channel_family, inputs.slab_thickness, c.bracket_centres)
            .ok_or_else(|| {
                EvaluationFault::new(format!(
                    "no channel data for {} at slab {:.0} mm",
                    c.channel_family, inputs.slab_thickness
                ))
            })?;
        let (bolt_t, bolt_v) = bolt_capacity(c.bolt_diameter)
            .ok_or_else(|| EvaluationFault::new(format!("unknown bolt M{}", c.bolt_diameter)))?;
        let fy = self.steel.fy;
        let h = g.bracket_height();
        let notch = inputs.notch.map(|n| n.height).unwrap_or(0.0).max(0.0);
        let h_eff = h - notch;

        let v = g.bracket_load;
        let e = inputs.cavity_width + inputs.masonry_thickness() / 3.0;
        let m = v * e;
        let m_rd = fy * c.bracket_thickness * h_eff.max(0.0).powi(2) / 6.0 / 1000.0;
        let lever = g.rise_to_bolts().max(0.4 * h_eff).max(1.0);
        let tension = m / lever;

        let w = g.design_load;
        let span = c.bracket_centres as f64;
        let t_a = c.angle_thickness;
        let leg = g.angle_leg;
        let toe_moment = w * inputs.masonry_thickness() / 3.0;
        let toe_rd = fy * t_a * t_a / 6.0;
        let span_moment = w / 1000.0 * span * span / 8.0;
        let span_rd = fy * t_a * leg * leg / 6.0 / 1000.0;
        let inertia = t_a * leg.powi(3) / 12.0;
        let deflection =
            5.0 * characteristic_load * span.powi(4) / (384.0 * self.steel.e_modulus * inertia);

        Ok(vec![
            CheckResult::new("notch", notch, 0.5 * h),
            CheckResult::new("bracket_bending", m, m_rd),
            CheckResult::new("bolt_tension", tension, bolt_t),
            CheckResult::new("bolt_shear", v, bolt_v),
            CheckResult::new("channel_tension", tension, spec.tension_capacity),
            CheckResult::new("channel_shear", v, spec.shear_capacity),
            CheckResult::new("angle_toe_bending", toe_moment, toe_rd),
            CheckResult::new("angle_span_bending", span_moment, span_rd),
            CheckResult::new("angle_deflection", deflection, MAX_DEFLECTION),
        ])
    }
}

impl Evaluator for ReferenceEvaluator<'_> {
    fn evaluate(
        &self,
        candidate: &Candidate,
        inputs: &DesignInputs,
    ) -> Result<Evaluation, EvaluationFault> {
        let load = inputs
            .effective_load()
            .map_err(|e| EvaluationFault::new(e.to_string()))?;
        let g = match derive_geometry(candidate, inputs, load) {
            Ok(g) => g,
            Err(e @ ExtensionError::ManufacturingLimitExceeded { .. }) => {
                return Ok(Evaluation::rejected(e.to_string()))
            }
        };
        if let Some(reason) = self.height_within_range(candidate, &g) {
            return Ok(Evaluation::rejected(reason));
        }
        let checks = self.checks(candidate, inputs, &g, load)?;
        let valid = checks.iter().all(|c| c.passed);
        let failure = checks
            .iter()
            .find(|c| !c.passed)
            .map(|c| format!("{} utilisation {:.2}", c.name, c.utilisation));
        let weight = valid.then(|| self.weight(candidate, inputs, g.bracket_height(), g.angle_leg));
        Ok(Evaluation {
            valid,
            weight,
            checks,
            failure,
        })
    }

    fn weight(
        &self,
        candidate: &Candidate,
        inputs: &DesignInputs,
        bracket_height: f64,
        angle_leg: f64,
    ) -> f64 {
        let rho = self.steel.density;
        let per_metre = 1000.0 / candidate.bracket_centres as f64;
        let plate = bracket_height.max(0.0)
            * (inputs.cavity_width + BRACKET_STANDOFF)
            * PLATE_FILL
            * candidate.bracket_thickness;
        let bracket = plate * rho * per_metre;
        let t = candidate.angle_thickness;
        let angle = (angle_leg + ANGLE_HORIZONTAL_LEG - t) * t * rho * 1000.0;
        let bolts = bolt_mass(candidate.bolt_diameter) * per_metre;
        bracket + angle + bolts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::TableCatalog;
    use crate::selector::AngleOrientation;

    fn std_candidate(centres: u32, fixing: f64) -> Candidate {
        Candidate {
            bracket_centres: centres,
            bracket_thickness: 3.0,
            angle_thickness: 5.0,
            vertical_leg: 60.0,
            bolt_diameter: 10,
            bracket_type: BracketType::Standard,
            angle_orientation: AngleOrientation::Inverted,
            channel_family: "CPRO38".into(),
            fixing_position: fixing,
            dim_d: None,
        }
    }

    #[test]
    fn typical_case_validates_with_finite_weight() {
        let cat = TableCatalog::reference();
        let ev = ReferenceEvaluator::new(&cat);
        let inputs = DesignInputs::new(200.0, 100.0, -100.0, 4.0);
        let out = ev.evaluate(&std_candidate(450, 75.0), &inputs).unwrap();
        assert!(out.valid, "{:?}", out.failure);
        let w = out.weight.unwrap();
        assert!(w.is_finite() && w > 0.0);
        assert_eq!(out.effective_weight(), w);
        assert!(out.governing_utilisation() <= 1.0);
    }

    #[test]
    fn weight_is_monotone_in_height_and_leg() {
        let cat = TableCatalog::reference();
        let ev = ReferenceEvaluator::new(&cat);
        let inputs = DesignInputs::new(200.0, 100.0, -100.0, 4.0);
        let c = std_candidate(450, 75.0);
        let base = ev.weight(&c, &inputs, 150.0, 60.0);
        assert!(ev.weight(&c, &inputs, 160.0, 60.0) > base);
        assert!(ev.weight(&c, &inputs, 150.0, 70.0) > base);
        // wider centres are lighter per metre
        assert!(ev.weight(&std_candidate(600, 75.0), &inputs, 150.0, 60.0) < base);
    }

    #[test]
    fn overloaded_candidate_is_invalid_without_weight() {
        let cat = TableCatalog::reference();
        let ev = ReferenceEvaluator::new(&cat);
        let inputs = DesignInputs::new(200.0, 100.0, -100.0, 40.0);
        let out = ev.evaluate(&std_candidate(600, 75.0), &inputs).unwrap();
        assert!(!out.valid);
        assert!(out.weight.is_none());
        assert_eq!(out.effective_weight(), f64::INFINITY);
        assert!(out.failure.is_some());
    }

    #[test]
    fn manufacturing_limit_is_a_rejection_not_a_fault() {
        let cat = TableCatalog::reference();
        let ev = ReferenceEvaluator::new(&cat);
        // limit just below the bolt: nearly the whole rise must be trimmed
        let inputs = DesignInputs::new(300.0, 100.0, -500.0, 2.0).with_exclusion_limit(-80.0);
        let out = ev.evaluate(&std_candidate(300, 75.0), &inputs).unwrap();
        assert!(!out.valid);
        assert!(out.failure.unwrap().contains("manufacturing limit"));
    }

    #[test]
    fn missing_channel_data_is_a_fault() {
        let cat = TableCatalog::reference();
        let ev = ReferenceEvaluator::new(&cat);
        let inputs = DesignInputs::new(200.0, 100.0, -100.0, 4.0);
        let mut c = std_candidate(450, 75.0);
        c.channel_family = "NOPE".into();
        assert!(ev.evaluate(&c, &inputs).is_err());
    }
}
