//! Design inputs and effective parameter resolution.
//!
//! Every input with a fallback chain has exactly one resolver here, and the
//! precedence is written down on that resolver. Geometry and evaluation code
//! only ever reads the resolved values.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::ChannelCatalog;
use crate::error::SearchError;

/// Lowest fixing position (mm below slab top) and the default for fixed mode.
pub const MIN_FIXING_POSITION: f64 = 75.0;
/// Step of the fixing-position sweep and of the local refinement.
pub const FIXING_STEP: f64 = 5.0;
/// Masonry leaf thickness used when none is given (mm).
pub const DEFAULT_MASONRY_THICKNESS: f64 = 102.5;
/// Effective load above which bracket centres are capped at 500 mm (kN/m).
pub const HIGH_LOAD_THRESHOLD: f64 = 5.0;
/// Thickest slab accepted (mm); bounds the fixing-position sweep.
pub const MAX_SLAB_THICKNESS: f64 = 2000.0;

/// Masonry supported by the angle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MasonryProperties {
    /// Unit weight, kN/m³.
    pub density: f64,
    /// Leaf thickness, mm. Non-positive means "use the default".
    pub thickness: f64,
    /// Supported storey height, m.
    pub height: f64,
}

impl Default for MasonryProperties {
    fn default() -> Self {
        Self {
            density: 20.0,
            thickness: DEFAULT_MASONRY_THICKNESS,
            height: 0.0,
        }
    }
}

/// Notch cut from the bracket to clear a soffit detail.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Notch {
    pub height: f64,
    pub depth: f64,
}

/// Vertical region the bracket must not intrude into.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExclusionZone {
    pub enabled: bool,
    /// Position limit relative to the slab top (mm, signed).
    pub limit: Option<f64>,
}

/// Immutable per-run inputs. Lengths in mm, loads in kN/m.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DesignInputs {
    pub slab_thickness: f64,
    pub cavity_width: f64,
    /// Signed bracket support level relative to the slab top; negative is below.
    pub support_level: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub characteristic_load: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub masonry: MasonryProperties,
    #[cfg_attr(feature = "serde", serde(default))]
    pub notch: Option<Notch>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fixing_position: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub use_custom_fixing_position: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub exclusion_zone: ExclusionZone,
    #[cfg_attr(feature = "serde", serde(default))]
    pub channel_families: Option<Vec<String>>,
}

impl DesignInputs {
    /// Minimal inputs with everything optional left unset.
    pub fn new(slab_thickness: f64, cavity_width: f64, support_level: f64, load: f64) -> Self {
        Self {
            slab_thickness,
            cavity_width,
            support_level,
            characteristic_load: Some(load),
            masonry: MasonryProperties::default(),
            notch: None,
            fixing_position: None,
            use_custom_fixing_position: false,
            exclusion_zone: ExclusionZone::default(),
            channel_families: None,
        }
    }

    pub fn with_fixed_fixing(mut self, position: f64) -> Self {
        self.fixing_position = Some(position);
        self.use_custom_fixing_position = true;
        self
    }

    pub fn with_exclusion_limit(mut self, limit: f64) -> Self {
        self.exclusion_zone = ExclusionZone {
            enabled: true,
            limit: Some(limit),
        };
        self
    }

    pub fn with_families<S: Into<String>>(mut self, families: impl IntoIterator<Item = S>) -> Self {
        self.channel_families = Some(families.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_notch(mut self, height: f64, depth: f64) -> Self {
        self.notch = Some(Notch { height, depth });
        self
    }

    /// Reject inputs no resolver can make sense of.
    pub fn validate(&self) -> Result<(), SearchError> {
        let finite = [self.slab_thickness, self.cavity_width, self.support_level]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(SearchError::invalid("geometry must be finite"));
        }
        if self.slab_thickness <= 0.0 || self.slab_thickness > MAX_SLAB_THICKNESS {
            return Err(SearchError::invalid(format!(
                "slab_thickness must be in (0, {MAX_SLAB_THICKNESS}]"
            )));
        }
        if self.cavity_width <= 0.0 {
            return Err(SearchError::invalid("cavity_width must be > 0"));
        }
        if let FixingMode::Fixed(p) = self.fixing_mode() {
            if !(p.is_finite() && p > 0.0 && p < self.slab_thickness) {
                return Err(SearchError::invalid(format!(
                    "fixing_position {p} must lie inside the slab"
                )));
            }
        }
        self.effective_load()?;
        Ok(())
    }

    /// Characteristic line load.
    ///
    /// Precedence: explicit `characteristic_load` (if finite and positive),
    /// then masonry self-weight `density · thickness · height`, else error.
    pub fn effective_load(&self) -> Result<f64, SearchError> {
        if let Some(load) = self.characteristic_load {
            if load.is_finite() && load > 0.0 {
                return Ok(load);
            }
        }
        let m = &self.masonry;
        let derived = m.density * self.masonry_thickness() / 1000.0 * m.height;
        if derived.is_finite() && derived > 0.0 {
            Ok(derived)
        } else {
            Err(SearchError::invalid(
                "no characteristic load and masonry self-weight is not positive",
            ))
        }
    }

    /// Masonry leaf thickness: the given value if positive, else the default.
    pub fn masonry_thickness(&self) -> f64 {
        if self.masonry.thickness > 0.0 {
            self.masonry.thickness
        } else {
            DEFAULT_MASONRY_THICKNESS
        }
    }

    /// Fixing mode.
    ///
    /// Precedence: custom flag with a position → that position; custom flag
    /// without one → [`MIN_FIXING_POSITION`]; otherwise sweep. A position
    /// given without the flag is ignored.
    pub fn fixing_mode(&self) -> FixingMode {
        match (self.use_custom_fixing_position, self.fixing_position) {
            (true, Some(p)) => FixingMode::Fixed(p),
            (true, None) => FixingMode::Fixed(MIN_FIXING_POSITION),
            (false, _) => FixingMode::Sweep,
        }
    }

    /// Exclusion limit, or `None` when the feature is off or has no limit.
    pub fn exclusion_limit(&self) -> Option<f64> {
        match self.exclusion_zone {
            ExclusionZone {
                enabled: true,
                limit: Some(l),
            } if l.is_finite() => Some(l),
            _ => None,
        }
    }

    /// Channel families to search: a non-empty allow-list, else the catalog.
    pub fn effective_families(&self, catalog: &dyn ChannelCatalog) -> Vec<String> {
        match &self.channel_families {
            Some(list) if !list.is_empty() => list.clone(),
            _ => catalog.families(),
        }
    }

    /// Bearing level lies above the slab soffit.
    pub fn bearing_above_slab_bottom(&self) -> bool {
        self.support_level.abs() < self.slab_thickness
    }
}

/// How fixing positions are produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FixingMode {
    Fixed(f64),
    Sweep,
}

/// Fixing positions for a channel with the given bottom edge distance.
///
/// Sweep runs from [`MIN_FIXING_POSITION`] to `slab − bottom_edge` in
/// [`FIXING_STEP`] increments and collapses to the minimum on thin slabs.
pub fn fixing_positions(mode: FixingMode, slab_thickness: f64, bottom_edge: f64) -> Vec<f64> {
    match mode {
        FixingMode::Fixed(p) => vec![p],
        FixingMode::Sweep => {
            let max = slab_thickness - bottom_edge;
            if max < MIN_FIXING_POSITION {
                return vec![MIN_FIXING_POSITION];
            }
            let steps = ((max - MIN_FIXING_POSITION) / FIXING_STEP + 1e-9).floor() as usize;
            (0..=steps)
                .map(|k| MIN_FIXING_POSITION + k as f64 * FIXING_STEP)
                .collect()
        }
    }
}
