//! Final selection, advisory alerts, and annotated alternatives.

use std::collections::{BTreeMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::generate::Candidate;
use crate::inputs::DesignInputs;
use crate::search::{EvaluatedDesign, OptimizationResult, SearchStats};
use crate::selector::{AngleOrientation, BracketType};

/// Alert attached when an inverted part projects below the slab soffit.
pub const NOTCH_ADVISORY: &str = "Inverted bracket or angle projects below the slab soffit; \
the masonry may need notching around the bracket.";

/// Another valid design, relative to the selection.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alternative {
    pub design: EvaluatedDesign,
    /// `(alternative − selected) / selected · 100`.
    pub weight_delta_pct: f64,
    pub differences: Vec<String>,
}

/// Pick the final design.
///
/// When the bearing is above the slab soffit and a standard bracket with a
/// standard angle validated, that design wins even if heavier. Returns the
/// pick and whether it replaced a different global best.
pub fn choose(
    best: EvaluatedDesign,
    best_standard: Option<EvaluatedDesign>,
    inputs: &DesignInputs,
) -> (EvaluatedDesign, bool) {
    match best_standard {
        Some(standard) if inputs.bearing_above_slab_bottom() => {
            let replaced = standard.candidate.structural_key() != best.candidate.structural_key();
            (standard, replaced)
        }
        _ => (best, false),
    }
}

fn uses_inverted_part(c: &Candidate) -> bool {
    c.bracket_type == BracketType::Inverted || c.angle_orientation == AngleOrientation::Inverted
}

/// Advisory alerts for the final design.
pub fn alerts(selected: &EvaluatedDesign) -> Vec<String> {
    let mut out = Vec::new();
    if uses_inverted_part(&selected.candidate) && selected.geometry.drop_below_slab > 0.0 {
        out.push(NOTCH_ADVISORY.to_string());
    }
    if let Some(reason) = &selected.geometry.extension.flip_reason {
        out.push(reason.clone());
    }
    out
}

/// Human-readable field differences from `selected` to `other`.
pub fn differences(selected: &Candidate, other: &Candidate) -> Vec<String> {
    let mut out = Vec::new();
    if selected.bracket_type != other.bracket_type {
        out.push(format!(
            "bracket type: {} → {}",
            selected.bracket_type, other.bracket_type
        ));
    }
    if selected.angle_orientation != other.angle_orientation {
        out.push(format!(
            "angle orientation: {} → {}",
            selected.angle_orientation, other.angle_orientation
        ));
    }
    if selected.bracket_centres != other.bracket_centres {
        out.push(format!(
            "bracket centres: {} → {} mm",
            selected.bracket_centres, other.bracket_centres
        ));
    }
    if selected.bracket_thickness != other.bracket_thickness {
        out.push(format!(
            "bracket thickness: {} → {} mm",
            selected.bracket_thickness, other.bracket_thickness
        ));
    }
    if selected.angle_thickness != other.angle_thickness {
        out.push(format!(
            "angle thickness: {} → {} mm",
            selected.angle_thickness, other.angle_thickness
        ));
    }
    if selected.bolt_diameter != other.bolt_diameter {
        out.push(format!(
            "bolt: M{} → M{}",
            selected.bolt_diameter, other.bolt_diameter
        ));
    }
    if selected.vertical_leg != other.vertical_leg {
        out.push(format!(
            "vertical leg: {} → {} mm",
            selected.vertical_leg, other.vertical_leg
        ));
    }
    if selected.channel_family != other.channel_family {
        out.push(format!(
            "channel: {} → {}",
            selected.channel_family, other.channel_family
        ));
    }
    out
}

/// Alternatives in weight order, without the selection, one per structural
/// identity, at most `cap`.
pub fn annotate(
    selected: &EvaluatedDesign,
    pool: impl IntoIterator<Item = EvaluatedDesign>,
    cap: usize,
) -> Vec<Alternative> {
    let mut seen = HashSet::new();
    seen.insert(selected.candidate.structural_key());
    let mut pool: Vec<EvaluatedDesign> = pool.into_iter().collect();
    pool.sort_by(|a, b| a.weight.total_cmp(&b.weight));
    pool.into_iter()
        .filter(|d| seen.insert(d.candidate.structural_key()))
        .take(cap)
        .map(|design| Alternative {
            weight_delta_pct: (design.weight - selected.weight) / selected.weight * 100.0,
            differences: differences(&selected.candidate, &design.candidate),
            design,
        })
        .collect()
}

pub(crate) fn finalize(
    best: EvaluatedDesign,
    best_standard: Option<EvaluatedDesign>,
    pool: Vec<EvaluatedDesign>,
    channel_bests: BTreeMap<String, EvaluatedDesign>,
    inputs: &DesignInputs,
    stats: SearchStats,
    cap: usize,
) -> OptimizationResult {
    let global_best_weight = best.weight;
    let (selected, overridden) = choose(best.clone(), best_standard, inputs);
    if overridden {
        tracing::info!(
            global = global_best_weight,
            selected = selected.weight,
            "standard-angle design preferred"
        );
    }
    let alternatives = annotate(&selected, pool.into_iter().chain(Some(best)), cap);
    let alerts = alerts(&selected);
    OptimizationResult {
        selected,
        overridden,
        global_best_weight,
        alternatives,
        alerts,
        channel_bests,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::Evaluation;
    use crate::geometry::{BracketFrame, DerivedGeometry, ExtensionOutcome, ExtensionRequest};

    fn design(
        ty: BracketType,
        orientation: AngleOrientation,
        centres: u32,
        weight: f64,
        drop: f64,
    ) -> EvaluatedDesign {
        let candidate = Candidate {
            bracket_centres: centres,
            bracket_thickness: 3.0,
            angle_thickness: 5.0,
            vertical_leg: 60.0,
            bolt_diameter: 10,
            bracket_type: ty,
            angle_orientation: orientation,
            channel_family: "CPRO38".into(),
            fixing_position: 75.0,
            dim_d: None,
        };
        let extension = ExtensionOutcome::noop(&ExtensionRequest {
            bracket_height: 150.0,
            rise_to_bolts: 100.0,
            bracket_top: -50.0,
            limit: None,
            bracket_type: ty,
            angle_orientation: orientation,
            fixing_position: 75.0,
            angle_leg: 60.0,
        });
        EvaluatedDesign {
            candidate,
            geometry: DerivedGeometry {
                frame: BracketFrame {
                    top: -50.0,
                    bottom: -200.0,
                    height: 150.0,
                    rise_to_bolts: 125.0,
                },
                drop_below_slab: drop,
                angle_leg: 60.0,
                design_load: 5.4,
                bracket_load: 2.43,
                extension,
            },
            valid: true,
            weight,
            evaluation: Evaluation {
                valid: true,
                weight: Some(weight),
                checks: Vec::new(),
                failure: None,
            },
        }
    }

    #[test]
    fn standard_angle_overrides_lighter_best_above_soffit() {
        let inputs = DesignInputs::new(250.0, 100.0, -160.0, 4.0);
        let best = design(BracketType::Standard, AngleOrientation::Inverted, 600, 8.0, 0.0);
        let standard = design(BracketType::Standard, AngleOrientation::Standard, 450, 9.5, 0.0);
        let (pick, replaced) = choose(best, Some(standard), &inputs);
        assert!(replaced);
        assert_eq!(pick.candidate.bracket_type, BracketType::Standard);
        assert_eq!(pick.candidate.angle_orientation, AngleOrientation::Standard);
        assert_eq!(pick.weight, 9.5);
    }

    #[test]
    fn no_override_below_soffit() {
        // |−300| ≥ 250: bearing below the slab
        let inputs = DesignInputs::new(250.0, 100.0, -300.0, 4.0);
        let best = design(BracketType::Standard, AngleOrientation::Inverted, 600, 8.0, 0.0);
        let standard = design(BracketType::Standard, AngleOrientation::Standard, 450, 9.5, 0.0);
        let (pick, replaced) = choose(best, Some(standard), &inputs);
        assert!(!replaced);
        assert_eq!(pick.weight, 8.0);
    }

    #[test]
    fn notch_alert_needs_inverted_part_and_drop() {
        let inv = design(BracketType::Standard, AngleOrientation::Inverted, 450, 9.0, 12.0);
        assert!(alerts(&inv).iter().any(|a| a == NOTCH_ADVISORY));
        let inv_bracket = design(BracketType::Inverted, AngleOrientation::Standard, 450, 9.0, 5.0);
        assert!(alerts(&inv_bracket).iter().any(|a| a == NOTCH_ADVISORY));
        let no_drop = design(BracketType::Standard, AngleOrientation::Inverted, 450, 9.0, 0.0);
        assert!(!alerts(&no_drop).iter().any(|a| a == NOTCH_ADVISORY));
        let all_standard = design(BracketType::Standard, AngleOrientation::Standard, 450, 9.0, 30.0);
        assert!(!alerts(&all_standard).iter().any(|a| a == NOTCH_ADVISORY));
    }

    #[test]
    fn alternatives_are_deduplicated_and_annotated() {
        let selected = design(BracketType::Standard, AngleOrientation::Standard, 450, 10.0, 0.0);
        let pool = vec![
            design(BracketType::Standard, AngleOrientation::Inverted, 600, 8.0, 0.0),
            design(BracketType::Standard, AngleOrientation::Inverted, 600, 8.5, 0.0),
            selected.clone(),
            design(BracketType::Standard, AngleOrientation::Standard, 300, 12.0, 0.0),
        ];
        let alts = annotate(&selected, pool, 10);
        assert_eq!(alts.len(), 2);
        assert_eq!(alts[0].design.weight, 8.0);
        assert!((alts[0].weight_delta_pct + 20.0).abs() < 1e-9);
        assert_eq!(
            alts[0].differences,
            vec![
                "angle orientation: standard → inverted".to_string(),
                "bracket centres: 450 → 600 mm".to_string(),
            ]
        );
        assert!((alts[1].weight_delta_pct - 20.0).abs() < 1e-9);
        assert_eq!(annotate(&selected, Vec::new(), 10).len(), 0);
    }
}
