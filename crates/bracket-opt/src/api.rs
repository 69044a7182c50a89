//! Curated surface for front-ends (CLI, notebooks, benches).
//!
//! Prefer these re-exports over reaching into modules; module layout may move.

pub use crate::channel::{ChannelCatalog, ChannelRow, ChannelSpec, TableCatalog};
pub use crate::evaluate::{CheckResult, Evaluation, Evaluator, ReferenceEvaluator, SteelCfg};
pub use crate::inputs::{DesignInputs, ExclusionZone, MasonryProperties, Notch};
pub use crate::policy::{Alternative, NOTCH_ADVISORY};
pub use crate::sample::{sample_batch, sample_inputs, ReplayToken, ScenarioCfg};
pub use crate::search::{
    optimize, CancelToken, EvaluatedDesign, OptimizationResult, ProgressCallback, SearchCfg,
    SearchEngine, SearchProgress, SearchStats,
};
pub use crate::selector::{allowed_pairs, AngleOrientation, BracketType};
pub use crate::{EvaluationFault, ExtensionError, SearchError};

/// Run the search against the reference channel table and evaluator.
pub fn optimize_with_defaults(inputs: &DesignInputs) -> Result<OptimizationResult, SearchError> {
    optimize_with_catalog(inputs, &TableCatalog::reference(), SearchCfg::default())
}

/// Run the search against `catalog` with the reference evaluator.
pub fn optimize_with_catalog(
    inputs: &DesignInputs,
    catalog: &dyn ChannelCatalog,
    cfg: SearchCfg,
) -> Result<OptimizationResult, SearchError> {
    let evaluator = ReferenceEvaluator::new(catalog);
    optimize(inputs, catalog, &evaluator, cfg)
}
