//! Geometry constants, the unconstrained bracket frame, and derived geometry.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ExtensionError;
use crate::generate::Candidate;
use crate::inputs::DesignInputs;
use crate::selector::{AngleOrientation, BracketType};

use super::extension::{resolve_extension, ExtensionOutcome, ExtensionRequest};

/// Standard bracket: bracket top above the bolt centre (mm).
pub const BOLT_TO_BRACKET_TOP: f64 = 40.0;
/// Inverted bracket: tail below the bolt centre (mm).
pub const BOLT_TO_BRACKET_BOTTOM_INVERTED: f64 = 40.0;
pub const MIN_STANDARD_BRACKET_HEIGHT: f64 = 150.0;
pub const MAX_STANDARD_BRACKET_HEIGHT: f64 = 600.0;
/// Inverted bracket height range ("Dim D").
pub const DIM_D_MIN: f64 = 135.0;
pub const DIM_D_MAX: f64 = 450.0;
/// Rolling limit for the angle's vertical leg.
pub const MAX_ANGLE_LEG: f64 = 400.0;
/// Horizontal (bearing) leg of every angle (mm).
pub const ANGLE_HORIZONTAL_LEG: f64 = 90.0;
/// Partial factor applied to the characteristic load.
pub const LOAD_FACTOR: f64 = 1.35;

/// Bracket end trimmed by an exclusion zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BracketEnd {
    Top,
    Bottom,
}

/// Vertical extent of a bracket, levels in the slab frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BracketFrame {
    pub top: f64,
    pub bottom: f64,
    pub height: f64,
    /// Bracket bottom up to the bolt centre.
    pub rise_to_bolts: f64,
}

impl BracketFrame {
    /// Shorten the bracket by `by` from one end.
    pub fn trim(self, end: BracketEnd, by: f64) -> Self {
        match end {
            BracketEnd::Top => Self {
                top: self.top - by,
                height: self.height - by,
                ..self
            },
            BracketEnd::Bottom => Self {
                bottom: self.bottom + by,
                height: self.height - by,
                rise_to_bolts: self.rise_to_bolts - by,
                ..self
            },
        }
    }

    /// How far the bracket reaches below the slab soffit (0 if it does not).
    pub fn drop_below_slab(&self, slab_thickness: f64) -> f64 {
        (-slab_thickness - self.bottom).max(0.0)
    }
}

/// Unconstrained frame for a bracket type at a fixing position.
///
/// Heights below the type minimum are padded: Standard brackets grow upwards,
/// Inverted brackets grow their tail downwards.
pub fn frame_for(
    ty: BracketType,
    orientation: AngleOrientation,
    support_level: f64,
    angle_thickness: f64,
    vertical_leg: f64,
    fixing_position: f64,
) -> BracketFrame {
    let bolt = -fixing_position;
    match ty {
        BracketType::Standard => {
            let bottom = match orientation {
                AngleOrientation::Standard => support_level - angle_thickness,
                AngleOrientation::Inverted => support_level - vertical_leg,
            };
            let rise = bolt - bottom;
            let height = (rise + BOLT_TO_BRACKET_TOP).max(MIN_STANDARD_BRACKET_HEIGHT);
            BracketFrame {
                top: bottom + height,
                bottom,
                height,
                rise_to_bolts: rise,
            }
        }
        BracketType::Inverted => {
            let top = support_level - angle_thickness;
            let tail = bolt - BOLT_TO_BRACKET_BOTTOM_INVERTED;
            let height = (top - tail).max(DIM_D_MIN);
            let bottom = top - height;
            BracketFrame {
                top,
                bottom,
                height,
                rise_to_bolts: bolt - bottom,
            }
        }
    }
}

/// Geometry of one candidate after exclusion-zone resolution.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DerivedGeometry {
    pub frame: BracketFrame,
    pub drop_below_slab: f64,
    /// Vertical leg actually rolled (extended when the bracket was trimmed).
    pub angle_leg: f64,
    /// Factored line load (kN/m).
    pub design_load: f64,
    /// Factored load per bracket (kN).
    pub bracket_load: f64,
    pub extension: ExtensionOutcome,
}

impl DerivedGeometry {
    #[inline]
    pub fn bracket_height(&self) -> f64 {
        self.frame.height
    }

    #[inline]
    pub fn rise_to_bolts(&self) -> f64 {
        self.frame.rise_to_bolts
    }
}

/// Derive geometry for `c`, trimming against the exclusion zone if active.
///
/// Downstream code must use the returned frame and leg, never the
/// unconstrained ones, when `extension.applied` is set.
pub fn derive_geometry(
    c: &Candidate,
    inputs: &DesignInputs,
    characteristic_load: f64,
) -> Result<DerivedGeometry, ExtensionError> {
    let raw = frame_for(
        c.bracket_type,
        c.angle_orientation,
        inputs.support_level,
        c.angle_thickness,
        c.vertical_leg,
        c.fixing_position,
    );
    let extension = resolve_extension(&ExtensionRequest {
        bracket_height: raw.height,
        rise_to_bolts: raw.rise_to_bolts,
        bracket_top: raw.top,
        limit: inputs.exclusion_limit(),
        bracket_type: c.bracket_type,
        angle_orientation: c.angle_orientation,
        fixing_position: c.fixing_position,
        angle_leg: c.vertical_leg,
    })?;
    let frame = match extension.regime {
        Some(regime) if extension.applied => {
            raw.trim(regime.trimmed_end(c.bracket_type), extension.bracket_reduction)
        }
        _ => raw,
    };
    let design_load = LOAD_FACTOR * characteristic_load;
    Ok(DerivedGeometry {
        frame,
        drop_below_slab: frame.drop_below_slab(inputs.slab_thickness),
        angle_leg: extension.extended_angle_height,
        design_load,
        bracket_load: design_load * c.bracket_centres as f64 / 1000.0,
        extension,
    })
}
