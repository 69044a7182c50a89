//! Branch-and-bound search over structural variants.
//!
//! Purpose
//! - Collapse generated candidates to structural identities, bound each one
//!   from below, and scan them in ascending bound order. Each group gets a
//!   local fixing-position search; the scan stops at the first group whose
//!   bound cannot beat the incumbent.
//!
//! Why this design
//! - The bound is admissible and the stream is sorted, so stopping at the
//!   first losing bound never discards a lighter design.
//! - The scan is a fold: each step consumes the running state and returns the
//!   next, and the early exits (prune, cancel) are explicit `Break`s.
//!
//! Notes
//! - Control returns to the scheduler every `SearchCfg::yield_every` groups;
//!   cancellation and progress are observed only there.

mod bound;
mod engine;
mod types;

pub use bound::{bounded_groups, group_structural, lower_bound, StructuralGroup};
pub use engine::{optimize, SearchEngine};
pub use types::{
    CancelToken, EvaluatedDesign, OptimizationResult, ProgressCallback, SearchCfg, SearchProgress,
    SearchStats,
};

#[cfg(test)]
mod tests;
