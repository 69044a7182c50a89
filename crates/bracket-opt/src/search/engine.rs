//! Branch-and-bound scan over bound-sorted structural groups.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use crate::channel::ChannelCatalog;
use crate::error::SearchError;
use crate::evaluate::Evaluator;
use crate::generate::{generate, Candidate};
use crate::geometry::derive_geometry;
use crate::inputs::DesignInputs;
use crate::policy;
use crate::selector::{is_allowed, AngleOrientation, BracketType};

use super::bound::{bounded_groups, StructuralGroup};
use super::types::{
    CancelToken, EvaluatedDesign, OptimizationResult, ProgressCallback, SearchCfg, SearchProgress,
    SearchStats,
};

/// Generate, bound, scan and select with the given collaborators.
pub fn optimize(
    inputs: &DesignInputs,
    catalog: &dyn ChannelCatalog,
    evaluator: &dyn Evaluator,
    cfg: SearchCfg,
) -> Result<OptimizationResult, SearchError> {
    SearchEngine::new(catalog, evaluator).with_cfg(cfg).run(inputs)
}

/// Search driver. Holds collaborators and control handles only; every run
/// builds its own accumulators.
pub struct SearchEngine<'a> {
    catalog: &'a dyn ChannelCatalog,
    evaluator: &'a dyn Evaluator,
    cfg: SearchCfg,
    progress: Option<ProgressCallback>,
    cancel: Option<CancelToken>,
}

/// Running state of the scan. Each step consumes it and returns the next one.
#[derive(Default)]
struct SearchState {
    best: Option<EvaluatedDesign>,
    best_standard: Option<EvaluatedDesign>,
    channel_bests: BTreeMap<String, EvaluatedDesign>,
    /// Ascending by weight, one entry per structural identity.
    alternatives: Vec<EvaluatedDesign>,
    evaluated: usize,
    evaluations: usize,
    faults: usize,
}

enum Halt {
    Pruned { state: SearchState, at: usize },
    Cancelled(SearchState),
}

/// Result of refining one structural group.
struct Refined {
    design: Option<EvaluatedDesign>,
    evaluations: usize,
    faults: usize,
}

enum Scored {
    Valid(Box<EvaluatedDesign>),
    Invalid,
    Fault,
}

fn is_standard_pair(c: &Candidate) -> bool {
    c.bracket_type == BracketType::Standard && c.angle_orientation == AngleOrientation::Standard
}

fn lighter(current: Option<&EvaluatedDesign>, w: f64) -> bool {
    current.map_or(true, |d| w < d.weight)
}

impl SearchState {
    /// Weight a group's bound must undercut to still matter.
    fn threshold(&self, standard_override: bool) -> f64 {
        let incumbent = if standard_override {
            self.best_standard.as_ref()
        } else {
            self.best.as_ref()
        };
        incumbent.map_or(f64::INFINITY, |d| d.weight)
    }

    fn absorb(mut self, refined: Refined, cap: usize) -> Self {
        self.evaluated += 1;
        self.evaluations += refined.evaluations;
        self.faults += refined.faults;
        let Some(design) = refined.design else {
            return self;
        };
        let w = design.weight;
        if lighter(self.best.as_ref(), w) {
            self.best = Some(design.clone());
        }
        if is_standard_pair(&design.candidate) && lighter(self.best_standard.as_ref(), w) {
            self.best_standard = Some(design.clone());
        }
        let family = design.candidate.channel_family.clone();
        if lighter(self.channel_bests.get(&family), w) {
            self.channel_bests.insert(family, design.clone());
        }
        self.insert_alternative(design, cap);
        self
    }

    fn insert_alternative(&mut self, design: EvaluatedDesign, cap: usize) {
        if cap == 0 {
            return;
        }
        let key = design.candidate.structural_key();
        if let Some(i) = self
            .alternatives
            .iter()
            .position(|d| d.candidate.structural_key() == key)
        {
            if self.alternatives[i].weight <= design.weight {
                return;
            }
            self.alternatives.remove(i);
        }
        let at = self
            .alternatives
            .partition_point(|d| d.weight <= design.weight);
        if at >= cap {
            return;
        }
        self.alternatives.insert(at, design);
        self.alternatives.truncate(cap);
    }
}

impl<'a> SearchEngine<'a> {
    pub fn new(catalog: &'a dyn ChannelCatalog, evaluator: &'a dyn Evaluator) -> Self {
        Self {
            catalog,
            evaluator,
            cfg: SearchCfg::default(),
            progress: None,
            cancel: None,
        }
    }

    pub fn with_cfg(mut self, cfg: SearchCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn run(&self, inputs: &DesignInputs) -> Result<OptimizationResult, SearchError> {
        let _span = tracing::info_span!(
            "search",
            bsl = inputs.support_level,
            slab = inputs.slab_thickness
        )
        .entered();
        let load = inputs.effective_load()?;
        let candidates = generate(inputs, self.catalog, self.cfg.prefilter)?;
        let generated = candidates.len();
        let groups = bounded_groups(candidates, inputs, self.evaluator);
        let total = groups.len();
        // The standard-angle preference can replace the lightest design, so
        // pruning must then also protect the standard-angle incumbent.
        let standard_override = inputs.bearing_above_slab_bottom()
            && is_allowed(
                inputs.support_level,
                BracketType::Standard,
                AngleOrientation::Standard,
            );
        tracing::info!(generated, structural = total, standard_override, "scan start");

        let yield_every = self.cfg.yield_every.max(1);
        let flow = groups
            .iter()
            .enumerate()
            .try_fold(SearchState::default(), |state, (i, group)| {
                if i % yield_every == 0 {
                    if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                        return ControlFlow::Break(Halt::Cancelled(state));
                    }
                    self.report(&state, i, total);
                    std::thread::yield_now();
                }
                if self.cfg.prune && group.bound >= state.threshold(standard_override) {
                    return ControlFlow::Break(Halt::Pruned { state, at: i });
                }
                let refined = self.refine(group, inputs, load);
                ControlFlow::Continue(state.absorb(refined, self.cfg.max_alternatives))
            });

        let (state, pruned) = match flow {
            ControlFlow::Continue(state) => (state, 0),
            ControlFlow::Break(Halt::Pruned { state, at }) => (state, total - at),
            ControlFlow::Break(Halt::Cancelled(state)) => {
                tracing::info!(evaluated = state.evaluated, "search cancelled");
                return Err(SearchError::Cancelled {
                    evaluated: state.evaluated,
                });
            }
        };
        self.report(&state, state.evaluated, total);

        let stats = SearchStats {
            generated,
            structural: total,
            evaluated: state.evaluated,
            evaluations: state.evaluations,
            faults: state.faults,
            pruned,
        };
        let Some(best) = state.best else {
            tracing::warn!(evaluated = stats.evaluated, "no valid design");
            return Err(SearchError::InfeasibleDesign {
                evaluated: stats.evaluated,
            });
        };
        tracing::info!(
            weight = best.weight,
            evaluated = stats.evaluated,
            pruned,
            "scan done"
        );
        Ok(policy::finalize(
            best,
            state.best_standard,
            state.alternatives,
            state.channel_bests,
            inputs,
            stats,
            self.cfg.max_alternatives,
        ))
    }

    fn report(&self, state: &SearchState, evaluated: usize, total: usize) {
        if let Some(cb) = &self.progress {
            cb(SearchProgress {
                evaluated,
                total,
                best_weight: state.best.as_ref().map(|d| d.weight),
            });
        }
    }

    /// Local fixing-position search for one structural group.
    ///
    /// Standard brackets walk from the deepest position upwards in 5 mm steps
    /// until one validates; Inverted brackets are scored at the start only.
    fn refine(&self, group: &StructuralGroup, inputs: &DesignInputs, load: f64) -> Refined {
        let steps: Vec<f64> = match group.candidate.bracket_type {
            BracketType::Standard => group.positions.iter().rev().copied().collect(),
            BracketType::Inverted => vec![group.start_position()],
        };
        let mut refined = Refined {
            design: None,
            evaluations: 0,
            faults: 0,
        };
        for f in steps {
            let c = group.candidate.at_fixing(f, inputs.support_level);
            refined.evaluations += 1;
            match self.score(c, inputs, load) {
                Scored::Valid(d) => {
                    refined.design = Some(*d);
                    break;
                }
                Scored::Invalid => {}
                Scored::Fault => refined.faults += 1,
            }
        }
        refined
    }

    fn score(&self, c: Candidate, inputs: &DesignInputs, load: f64) -> Scored {
        debug_assert!(is_allowed(
            inputs.support_level,
            c.bracket_type,
            c.angle_orientation
        ));
        let geometry = match derive_geometry(&c, inputs, load) {
            Ok(g) => g,
            Err(e) => {
                tracing::debug!(fixing = c.fixing_position, error = %e, "candidate rejected");
                return Scored::Invalid;
            }
        };
        let evaluation = match self.evaluator.evaluate(&c, inputs) {
            Ok(ev) => ev,
            Err(fault) => {
                tracing::warn!(
                    family = %c.channel_family,
                    centres = c.bracket_centres,
                    fixing = c.fixing_position,
                    error = %fault,
                    "evaluator fault; candidate skipped"
                );
                return Scored::Fault;
            }
        };
        if !evaluation.valid {
            return Scored::Invalid;
        }
        let weight = evaluation.effective_weight();
        if !weight.is_finite() {
            return Scored::Invalid;
        }
        let mut candidate = c;
        candidate.angle_orientation = geometry.extension.final_orientation;
        Scored::Valid(Box::new(EvaluatedDesign {
            candidate,
            geometry,
            valid: true,
            weight,
            evaluation,
        }))
    }
}
