//! Bracket geometry in the slab frame, and exclusion-zone resolution.
//!
//! Purpose
//! - One place that turns a `Candidate` plus `DesignInputs` into levels,
//!   heights and loads. The evaluator, the bound estimator and the generator
//!   pre-filter all read geometry from here, so they cannot disagree.
//!
//! Frame
//! - `y` is measured from the slab top, up positive. The bolt sits at
//!   `y = −fixing_position`; the slab soffit at `y = −slab_thickness`.
//! - Standard brackets hang from the bolt down to the bearing; Inverted
//!   brackets stand on a short tail below the bolt and reach up to the
//!   bearing. Inverted height is the "Dim D" bounding parameter.
//!
//! Exclusion zones
//! - `extension` trims the bracket against the limit and lengthens the angle
//!   leg by the same amount; see `resolve_extension`.

mod extension;
mod types;

use crate::selector::BracketType;

pub use extension::{resolve_extension, ExclusionRegime, ExtensionOutcome, ExtensionRequest};
pub use types::{
    derive_geometry, frame_for, BracketEnd, BracketFrame, DerivedGeometry, ANGLE_HORIZONTAL_LEG,
    BOLT_TO_BRACKET_BOTTOM_INVERTED, BOLT_TO_BRACKET_TOP, DIM_D_MAX, DIM_D_MIN,
    LOAD_FACTOR, MAX_ANGLE_LEG, MAX_STANDARD_BRACKET_HEIGHT, MIN_STANDARD_BRACKET_HEIGHT,
};

/// Minimum bracket height of a bracket type.
pub fn min_bracket_height(ty: BracketType) -> f64 {
    match ty {
        BracketType::Standard => MIN_STANDARD_BRACKET_HEIGHT,
        BracketType::Inverted => DIM_D_MIN,
    }
}
