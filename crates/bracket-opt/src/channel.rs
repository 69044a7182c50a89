//! Cast-in channel reference data.
//!
//! The search only needs edge distances and permitted bracket centres; the
//! reference evaluator also reads the channel capacities.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Channel data for one family at one slab thickness.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelSpec {
    /// Minimum distance from slab top to the channel (mm).
    pub top_edge: f64,
    /// Minimum distance from the channel to the slab soffit (mm).
    pub bottom_edge: f64,
    /// Bracket centres the channel is rated for (mm).
    pub valid_spacings: Vec<u32>,
    /// Design tension resistance per bracket (kN).
    pub tension_capacity: f64,
    /// Design shear resistance per bracket (kN).
    pub shear_capacity: f64,
}

/// Read-only channel lookup.
pub trait ChannelCatalog {
    /// All families known to the catalog, in a stable order.
    fn families(&self) -> Vec<String>;

    /// Spec for `family` in a slab of `slab_thickness` at `bracket_centres`.
    fn lookup(&self, family: &str, slab_thickness: f64, bracket_centres: u32)
        -> Option<ChannelSpec>;
}

/// One table row: a family over an inclusive slab-thickness band.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelRow {
    pub family: String,
    pub slab_min: f64,
    pub slab_max: f64,
    pub spec: ChannelSpec,
}

/// Row-based catalog; first matching row wins.
#[derive(Clone, Debug, Default)]
pub struct TableCatalog {
    rows: Vec<ChannelRow>,
}

const ALL_CENTRES: [u32; 7] = [300, 350, 400, 450, 500, 550, 600];

impl TableCatalog {
    pub fn new(rows: Vec<ChannelRow>) -> Self {
        Self { rows }
    }

    /// Built-in table with two channel families.
    pub fn reference() -> Self {
        let row = |family: &str, slab_min: f64, bottom_edge: f64, tension: f64, shear: f64| {
            ChannelRow {
                family: family.to_string(),
                slab_min,
                slab_max: 1000.0,
                spec: ChannelSpec {
                    top_edge: 75.0,
                    bottom_edge,
                    valid_spacings: ALL_CENTRES.to_vec(),
                    tension_capacity: tension,
                    shear_capacity: shear,
                },
            }
        };
        Self::new(vec![
            row("CPRO38", 150.0, 125.0, 7.5, 9.0),
            row("CPRO50", 225.0, 150.0, 11.0, 13.5),
        ])
    }

    pub fn rows(&self) -> &[ChannelRow] {
        &self.rows
    }
}

impl ChannelCatalog for TableCatalog {
    fn families(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for r in &self.rows {
            if !out.contains(&r.family) {
                out.push(r.family.clone());
            }
        }
        out
    }

    // Rows do not vary by centres; `ChannelSpec::valid_spacings` carries the permitted centres.
    fn lookup(
        &self,
        family: &str,
        slab_thickness: f64,
        _bracket_centres: u32,
    ) -> Option<ChannelSpec> {
        self.rows
            .iter()
            .find(|r| {
                r.family == family && slab_thickness >= r.slab_min && slab_thickness <= r.slab_max
            })
            .map(|r| r.spec.clone())
    }
}
