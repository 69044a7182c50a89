//! Candidate enumeration over the discrete design space.
//!
//! The product is spacing × bracket thickness × angle section × bolt ×
//! channel family × (type, orientation) × fixing position, restricted by the
//! load, the channel table and `selector::allowed_pairs`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::ChannelCatalog;
use crate::error::SearchError;
use crate::geometry::{BOLT_TO_BRACKET_BOTTOM_INVERTED, DIM_D_MAX, DIM_D_MIN};
use crate::inputs::{fixing_positions, DesignInputs, HIGH_LOAD_THRESHOLD};
use crate::selector::{allowed_pairs, AngleOrientation, BracketType};

/// Bracket centres ladder (mm).
pub const BRACKET_CENTRES: [u32; 7] = [300, 350, 400, 450, 500, 550, 600];
pub const BRACKET_THICKNESSES: [f64; 2] = [3.0, 4.0];
/// Angle thickness and the vertical leg it is rolled with (mm).
pub const ANGLE_SECTIONS: [(f64, f64); 5] =
    [(3.0, 60.0), (4.0, 60.0), (5.0, 60.0), (6.0, 65.0), (8.0, 75.0)];
pub const BOLT_DIAMETERS: [u32; 2] = [10, 12];
/// Slack allowed on Dim D before the pre-filter drops an Inverted candidate.
pub const PREFILTER_TOLERANCE: f64 = 5.0;

/// One point of the design space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Candidate {
    pub bracket_centres: u32,
    pub bracket_thickness: f64,
    pub angle_thickness: f64,
    pub vertical_leg: f64,
    pub bolt_diameter: u32,
    pub bracket_type: BracketType,
    pub angle_orientation: AngleOrientation,
    pub channel_family: String,
    /// Depth of the channel below the slab top (mm).
    pub fixing_position: f64,
    /// Inverted only: required bracket height clamped to `[DIM_D_MIN, DIM_D_MAX]`.
    pub dim_d: Option<f64>,
}

/// Structural identity: all fields except the fixing position and `dim_d`,
/// which is a function of it. Lengths are keyed in tenths of a millimetre.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructuralKey {
    pub bracket_centres: u32,
    pub bracket_thickness: i64,
    pub angle_thickness: i64,
    pub vertical_leg: i64,
    pub bolt_diameter: u32,
    pub bracket_type: BracketType,
    pub angle_orientation: AngleOrientation,
    pub channel_family: String,
}

#[inline]
fn tenths(x: f64) -> i64 {
    (x * 10.0).round() as i64
}

/// Raw Inverted bracket height needed to reach the bearing from the bolt tail.
pub fn inverted_required_height(support_level: f64, angle_thickness: f64, fixing: f64) -> f64 {
    (support_level - angle_thickness) - (-fixing - BOLT_TO_BRACKET_BOTTOM_INVERTED)
}

impl Candidate {
    pub fn structural_key(&self) -> StructuralKey {
        StructuralKey {
            bracket_centres: self.bracket_centres,
            bracket_thickness: tenths(self.bracket_thickness),
            angle_thickness: tenths(self.angle_thickness),
            vertical_leg: tenths(self.vertical_leg),
            bolt_diameter: self.bolt_diameter,
            bracket_type: self.bracket_type,
            angle_orientation: self.angle_orientation,
            channel_family: self.channel_family.clone(),
        }
    }

    /// Same structure moved to another fixing position.
    pub fn at_fixing(&self, fixing_position: f64, support_level: f64) -> Candidate {
        let mut c = self.clone();
        c.fixing_position = fixing_position;
        c.dim_d = c.derive_dim_d(support_level);
        c
    }

    fn derive_dim_d(&self, support_level: f64) -> Option<f64> {
        match self.bracket_type {
            BracketType::Standard => None,
            BracketType::Inverted => Some(
                inverted_required_height(support_level, self.angle_thickness, self.fixing_position)
                    .clamp(DIM_D_MIN, DIM_D_MAX),
            ),
        }
    }
}

/// Bracket centres permitted for an effective load.
pub fn centres_for_load(load: f64) -> impl Iterator<Item = u32> {
    let cap = if load > HIGH_LOAD_THRESHOLD { 500 } else { 600 };
    BRACKET_CENTRES.into_iter().filter(move |&s| s <= cap)
}

/// Enumerate all candidates for `inputs`.
///
/// With `prefilter` set, Inverted candidates whose required Dim D cannot fit
/// the range are dropped early. Dropping is only done without an exclusion
/// zone, since a zone can shorten the bracket afterwards. The evaluator
/// rejects the same candidates either way.
pub fn generate(
    inputs: &DesignInputs,
    catalog: &dyn ChannelCatalog,
    prefilter: bool,
) -> Result<Vec<Candidate>, SearchError> {
    inputs.validate()?;
    let load = inputs.effective_load()?;
    let bsl = inputs.support_level;
    let pairs = allowed_pairs(bsl);
    let mode = inputs.fixing_mode();
    let filter_dim_d = prefilter && inputs.exclusion_limit().is_none();

    let mut out = Vec::new();
    let mut dropped = 0usize;
    for family in inputs.effective_families(catalog) {
        for centres in centres_for_load(load) {
            let Some(spec) = catalog.lookup(&family, inputs.slab_thickness, centres) else {
                continue;
            };
            if !spec.valid_spacings.contains(&centres) {
                continue;
            }
            let positions = fixing_positions(mode, inputs.slab_thickness, spec.bottom_edge);
            for &bracket_thickness in &BRACKET_THICKNESSES {
                for &(angle_thickness, vertical_leg) in &ANGLE_SECTIONS {
                    for &bolt_diameter in &BOLT_DIAMETERS {
                        for &(bracket_type, angle_orientation) in &pairs {
                            for &f in &positions {
                                if filter_dim_d
                                    && bracket_type == BracketType::Inverted
                                    && inverted_required_height(bsl, angle_thickness, f)
                                        > DIM_D_MAX + PREFILTER_TOLERANCE
                                {
                                    dropped += 1;
                                    continue;
                                }
                                let c = Candidate {
                                    bracket_centres: centres,
                                    bracket_thickness,
                                    angle_thickness,
                                    vertical_leg,
                                    bolt_diameter,
                                    bracket_type,
                                    angle_orientation,
                                    channel_family: family.clone(),
                                    fixing_position: f,
                                    dim_d: None,
                                };
                                let dim_d = c.derive_dim_d(bsl);
                                out.push(Candidate { dim_d, ..c });
                            }
                        }
                    }
                }
            }
        }
    }
    tracing::debug!(candidates = out.len(), dropped, "generated");
    Ok(out)
}
