//! Exclusion-zone resolution: bracket trim, angle extension, orientation flip.
//!
//! The limit's sign picks a regime once; each regime owns one formula for the
//! maximum rise to bolts. Whatever is trimmed from the bracket is added to the
//! angle's vertical leg, so the support reach is unchanged.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ExtensionError;
use crate::selector::{AngleOrientation, BracketType};

use super::types::{BracketEnd, MAX_ANGLE_LEG};

/// Exclusion limit classified by its position relative to the slab top.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExclusionRegime {
    /// `limit ≥ 0`.
    AtOrAboveTop(f64),
    /// `limit < 0`.
    BelowTop(f64),
}

impl ExclusionRegime {
    pub fn classify(limit: f64) -> Self {
        if limit >= 0.0 {
            Self::AtOrAboveTop(limit)
        } else {
            Self::BelowTop(limit)
        }
    }

    /// Largest rise to bolts the zone permits at `fixing_position`.
    pub fn max_rise_to_bolts(self, fixing_position: f64) -> f64 {
        match self {
            Self::AtOrAboveTop(limit) => fixing_position + limit,
            Self::BelowTop(limit) => (limit - (-fixing_position)).abs(),
        }
    }

    /// End of the bracket that moves when it is trimmed.
    pub fn trimmed_end(self, ty: BracketType) -> BracketEnd {
        match (ty, self) {
            (BracketType::Inverted, Self::AtOrAboveTop(_)) => BracketEnd::Top,
            _ => BracketEnd::Bottom,
        }
    }
}

/// Everything the resolver reads. Lengths in mm, levels in the slab frame.
#[derive(Clone, Copy, Debug)]
pub struct ExtensionRequest {
    /// Unconstrained bracket height.
    pub bracket_height: f64,
    /// Unconstrained rise from bracket bottom to bolt.
    pub rise_to_bolts: f64,
    /// Unconstrained bracket top level (its height above the slab top).
    pub bracket_top: f64,
    /// Effective exclusion limit; `None` disables the feature.
    pub limit: Option<f64>,
    pub bracket_type: BracketType,
    pub angle_orientation: AngleOrientation,
    pub fixing_position: f64,
    /// Current vertical leg of the angle.
    pub angle_leg: f64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtensionOutcome {
    pub applied: bool,
    pub regime: Option<ExclusionRegime>,
    pub original_bracket_height: f64,
    pub limited_bracket_height: f64,
    pub bracket_reduction: f64,
    pub original_angle_height: f64,
    pub extended_angle_height: f64,
    pub angle_extension: f64,
    pub orientation_flipped: bool,
    pub original_orientation: AngleOrientation,
    pub final_orientation: AngleOrientation,
    pub flip_reason: Option<String>,
}

impl ExtensionOutcome {
    /// Outcome that leaves bracket and angle untouched.
    pub fn noop(req: &ExtensionRequest) -> Self {
        Self {
            applied: false,
            regime: None,
            original_bracket_height: req.bracket_height,
            limited_bracket_height: req.bracket_height,
            bracket_reduction: 0.0,
            original_angle_height: req.angle_leg,
            extended_angle_height: req.angle_leg,
            angle_extension: 0.0,
            orientation_flipped: false,
            original_orientation: req.angle_orientation,
            final_orientation: req.angle_orientation,
            flip_reason: None,
        }
    }
}

const FLIP_REASON: &str = "angle flipped to inverted: a standard leg on an inverted bracket \
cannot extend upward without losing fixing alignment";

/// Resolve the exclusion zone for one bracket.
///
/// Errors with `ManufacturingLimitExceeded` when the extended leg exceeds
/// [`MAX_ANGLE_LEG`]; callers treat that candidate as invalid.
pub fn resolve_extension(req: &ExtensionRequest) -> Result<ExtensionOutcome, ExtensionError> {
    let Some(limit) = req.limit else {
        return Ok(ExtensionOutcome::noop(req));
    };
    let regime = ExclusionRegime::classify(limit);
    let reduction = match (req.bracket_type, regime) {
        (BracketType::Inverted, ExclusionRegime::AtOrAboveTop(l)) => {
            (req.bracket_top.max(0.0) - l).max(0.0)
        }
        _ => (req.rise_to_bolts - regime.max_rise_to_bolts(req.fixing_position)).max(0.0),
    };
    let mut out = ExtensionOutcome {
        regime: Some(regime),
        ..ExtensionOutcome::noop(req)
    };
    if reduction <= 0.0 {
        return Ok(out);
    }

    let extension = reduction;
    let extended = req.angle_leg + extension;
    if extended > MAX_ANGLE_LEG {
        return Err(ExtensionError::ManufacturingLimitExceeded {
            extended_height: extended,
            limit: MAX_ANGLE_LEG,
        });
    }
    out.applied = true;
    out.bracket_reduction = reduction;
    out.limited_bracket_height = req.bracket_height - reduction;
    out.angle_extension = extension;
    out.extended_angle_height = extended;

    if req.bracket_type == BracketType::Inverted
        && req.angle_orientation == AngleOrientation::Standard
    {
        out.orientation_flipped = true;
        out.final_orientation = AngleOrientation::Inverted;
        out.flip_reason = Some(FLIP_REASON.to_string());
    }
    Ok(out)
}
