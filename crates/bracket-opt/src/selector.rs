//! Bracket type and angle orientation eligibility by support level.
//!
//! The bracket type depends on a fixed BSL threshold only, never on the
//! fixing position, so that type selection is stable across the fixing sweep.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// BSL at or below which the bracket hangs from the fixing (Standard).
pub const STANDARD_BRACKET_THRESHOLD: f64 = -75.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BracketType {
    Standard,
    Inverted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AngleOrientation {
    Standard,
    Inverted,
}

impl std::fmt::Display for BracketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Inverted => write!(f, "inverted"),
        }
    }
}

impl std::fmt::Display for AngleOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Inverted => write!(f, "inverted"),
        }
    }
}

const BOTH: &[AngleOrientation] = &[AngleOrientation::Standard, AngleOrientation::Inverted];
const STANDARD_ONLY: &[AngleOrientation] = &[AngleOrientation::Standard];
const INVERTED_ONLY: &[AngleOrientation] = &[AngleOrientation::Inverted];

/// Bracket type for a signed support level.
pub fn bracket_type(support_level: f64) -> BracketType {
    if support_level <= STANDARD_BRACKET_THRESHOLD {
        BracketType::Standard
    } else {
        BracketType::Inverted
    }
}

/// Angle orientations allowed at a signed support level.
///
/// Bands: `≥ 0` both, `[−50, −25]` standard, `[−135, −75]` inverted,
/// `[−175, −150]` both, `< −175` both. Levels between bands allow both.
pub fn valid_orientations(support_level: f64) -> &'static [AngleOrientation] {
    let bsl = support_level;
    if (-50.0..=-25.0).contains(&bsl) {
        STANDARD_ONLY
    } else if (-135.0..=-75.0).contains(&bsl) {
        INVERTED_ONLY
    } else {
        // ≥ 0, [−175, −150], < −175 and the gaps between bands
        BOTH
    }
}

/// All (type, orientation) pairs the generator may emit for `support_level`.
pub fn allowed_pairs(support_level: f64) -> Vec<(BracketType, AngleOrientation)> {
    let ty = bracket_type(support_level);
    valid_orientations(support_level)
        .iter()
        .map(|&o| (ty, o))
        .collect()
}

/// Whether `(ty, orientation)` may appear for `support_level`.
pub fn is_allowed(support_level: f64, ty: BracketType, orientation: AngleOrientation) -> bool {
    bracket_type(support_level) == ty && valid_orientations(support_level).contains(&orientation)
}
