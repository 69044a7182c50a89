//! Search configuration, control handles, and result types.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::evaluate::Evaluation;
use crate::generate::Candidate;
use crate::geometry::DerivedGeometry;
use crate::policy::Alternative;

/// Search configuration.
#[derive(Clone, Copy, Debug)]
pub struct SearchCfg {
    /// Stop once the next bound cannot beat the incumbent. Turning this off
    /// must not change the selected weight; it exists for ablations and tests.
    pub prune: bool,
    /// Structural candidates between yield points (cancel check, progress).
    pub yield_every: usize,
    /// Cap on the alternatives list.
    pub max_alternatives: usize,
    /// Drop geometrically unreachable Inverted candidates before scoring.
    pub prefilter: bool,
}

impl Default for SearchCfg {
    fn default() -> Self {
        Self {
            prune: true,
            yield_every: 256,
            max_alternatives: 10,
            prefilter: true,
        }
    }
}

impl SearchCfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn with_yield_every(mut self, n: usize) -> Self {
        self.yield_every = n.max(1);
        self
    }

    pub fn with_max_alternatives(mut self, n: usize) -> Self {
        self.max_alternatives = n;
        self
    }

    pub fn with_prefilter(mut self, prefilter: bool) -> Self {
        self.prefilter = prefilter;
        self
    }
}

/// Shared cancellation flag, observed at yield points.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Advisory progress snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchProgress {
    /// Structural candidates processed so far.
    pub evaluated: usize,
    /// Structural candidates in the sorted stream.
    pub total: usize,
    pub best_weight: Option<f64>,
}

/// Fire-and-forget progress sink.
pub type ProgressCallback = Box<dyn Fn(SearchProgress) + Send + Sync>;

/// A validated design as ranked by the search.
///
/// `candidate.angle_orientation` is the final orientation, i.e. after any
/// flip recorded in `geometry.extension`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvaluatedDesign {
    pub candidate: Candidate,
    pub geometry: DerivedGeometry,
    pub valid: bool,
    /// kg per metre run.
    pub weight: f64,
    pub evaluation: Evaluation,
}

/// Counters describing one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchStats {
    pub generated: usize,
    pub structural: usize,
    /// Structural candidates scored (pruned ones excluded).
    pub evaluated: usize,
    /// Evaluator calls including local fixing refinement.
    pub evaluations: usize,
    pub faults: usize,
    /// Structural candidates skipped by the bound.
    pub pruned: usize,
}

/// Final output of a search.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationResult {
    pub selected: EvaluatedDesign,
    /// The standard-angle preference replaced a lighter global best.
    pub overridden: bool,
    pub global_best_weight: f64,
    pub alternatives: Vec<Alternative>,
    pub alerts: Vec<String>,
    pub channel_bests: BTreeMap<String, EvaluatedDesign>,
    pub stats: SearchStats,
}
