//! Design-space search for masonry support brackets.
//!
//! Given slab geometry, cavity width, a signed bracket support level (BSL)
//! and a characteristic load, the search picks the lightest structurally
//! valid bracket/angle/channel configuration.
//!
//! Pipeline
//! - `generate`: enumerate candidates (spacing, thicknesses, bolts, channel
//!   family, fixing position) restricted to the type/orientation pairs of
//!   `selector`.
//! - `search`: collapse candidates to structural identities, sort them by an
//!   admissible weight bound, and scan in order with local fixing-position
//!   refinement until no remaining candidate can beat the incumbent.
//! - `policy`: final pick (standard-angle preference), alerts, annotated
//!   alternatives.
//!
//! Structural checks and steel weights live behind the [`Evaluator`] trait;
//! channel data lives behind [`ChannelCatalog`]. Reference implementations of
//! both ship with the crate so that the search can run end to end.

pub mod api;
pub mod channel;
pub mod error;
pub mod evaluate;
pub mod generate;
pub mod geometry;
pub mod inputs;
pub mod policy;
pub mod sample;
pub mod search;
pub mod selector;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use channel::{ChannelCatalog, ChannelSpec, TableCatalog};
pub use error::{EvaluationFault, ExtensionError, SearchError};
pub use evaluate::{Evaluation, Evaluator, ReferenceEvaluator};
pub use inputs::DesignInputs;
pub use search::{optimize, OptimizationResult, SearchCfg};
pub use selector::{AngleOrientation, BracketType};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::channel::{ChannelCatalog, ChannelRow, ChannelSpec, TableCatalog};
    pub use crate::evaluate::{CheckResult, Evaluation, Evaluator, ReferenceEvaluator};
    pub use crate::generate::{Candidate, StructuralKey};
    pub use crate::geometry::{DerivedGeometry, ExtensionOutcome};
    pub use crate::inputs::{DesignInputs, ExclusionZone, MasonryProperties, Notch};
    pub use crate::policy::Alternative;
    pub use crate::search::{
        optimize, CancelToken, EvaluatedDesign, OptimizationResult, SearchCfg, SearchEngine,
        SearchProgress,
    };
    pub use crate::selector::{AngleOrientation, BracketType};
}
