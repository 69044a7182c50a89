use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use super::*;
use crate::channel::TableCatalog;
use crate::error::{EvaluationFault, SearchError};
use crate::evaluate::{Evaluation, Evaluator, ReferenceEvaluator};
use crate::generate::{generate, Candidate, StructuralKey};
use crate::inputs::DesignInputs;
use crate::selector::{is_allowed, AngleOrientation, BracketType};

/// Reference evaluator that faults on one slice of the space.
struct FaultyEvaluator<'a> {
    inner: ReferenceEvaluator<'a>,
}

impl FaultyEvaluator<'_> {
    fn faults_on(c: &Candidate) -> bool {
        c.bracket_centres == 300 && c.bolt_diameter == 12
    }
}

impl Evaluator for FaultyEvaluator<'_> {
    fn evaluate(
        &self,
        candidate: &Candidate,
        inputs: &DesignInputs,
    ) -> Result<Evaluation, EvaluationFault> {
        if Self::faults_on(candidate) {
            return Err(EvaluationFault::new("solver diverged"));
        }
        self.inner.evaluate(candidate, inputs)
    }

    fn weight(&self, candidate: &Candidate, inputs: &DesignInputs, h: f64, leg: f64) -> f64 {
        self.inner.weight(candidate, inputs, h, leg)
    }
}

/// Reference evaluator that rejects fixings deeper than `max_fixing` and
/// records every position it is asked about.
struct DepthLimited<'a> {
    inner: ReferenceEvaluator<'a>,
    max_fixing: f64,
    seen: RefCell<Vec<(StructuralKey, f64)>>,
}

impl Evaluator for DepthLimited<'_> {
    fn evaluate(
        &self,
        candidate: &Candidate,
        inputs: &DesignInputs,
    ) -> Result<Evaluation, EvaluationFault> {
        self.seen
            .borrow_mut()
            .push((candidate.structural_key(), candidate.fixing_position));
        if candidate.fixing_position > self.max_fixing {
            return Ok(Evaluation::rejected("fixing too deep"));
        }
        self.inner.evaluate(candidate, inputs)
    }

    fn weight(&self, candidate: &Candidate, inputs: &DesignInputs, h: f64, leg: f64) -> f64 {
        self.inner.weight(candidate, inputs, h, leg)
    }
}

fn typical() -> DesignInputs {
    DesignInputs::new(250.0, 100.0, -160.0, 3.0)
}

#[test]
fn typical_case_selects_a_valid_allowed_design() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let inputs = typical();
    let out = optimize(&inputs, &cat, &ev, SearchCfg::default()).unwrap();
    let c = &out.selected.candidate;
    assert!(out.selected.valid);
    assert!(out.selected.weight.is_finite() && out.selected.weight > 0.0);
    assert!(is_allowed(inputs.support_level, c.bracket_type, c.angle_orientation));
    assert_eq!(out.stats.evaluated + out.stats.pruned, out.stats.structural);
    assert!(out.stats.evaluations >= out.stats.evaluated);
}

#[test]
fn standard_angle_is_preferred_above_soffit() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let out = optimize(&typical(), &cat, &ev, SearchCfg::default()).unwrap();
    assert_eq!(out.selected.candidate.bracket_type, BracketType::Standard);
    assert_eq!(out.selected.candidate.angle_orientation, AngleOrientation::Standard);
    assert!(out.global_best_weight <= out.selected.weight);
    if !out.overridden {
        assert_eq!(out.global_best_weight, out.selected.weight);
    }
}

#[test]
fn bound_never_exceeds_a_valid_weight() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    for inputs in [
        typical(),
        DesignInputs::new(300.0, 120.0, -40.0, 4.0),
        DesignInputs::new(300.0, 120.0, 20.0, 2.5),
        DesignInputs::new(350.0, 80.0, -260.0, 6.0).with_exclusion_limit(-120.0),
    ] {
        let groups = bounded_groups(generate(&inputs, &cat, true).unwrap(), &inputs, &ev);
        assert!(groups.windows(2).all(|w| w[0].bound <= w[1].bound));
        for g in &groups {
            for &f in &g.positions {
                let c = g.candidate.at_fixing(f, inputs.support_level);
                let out = ev.evaluate(&c, &inputs).unwrap();
                if out.valid {
                    assert!(
                        out.effective_weight() + 1e-9 >= g.bound,
                        "bound {} above weight {} at f={f}",
                        g.bound,
                        out.effective_weight()
                    );
                }
            }
        }
    }
}

#[test]
fn grouping_collapses_fixing_positions() {
    let cat = TableCatalog::reference();
    let inputs = DesignInputs::new(300.0, 100.0, -200.0, 3.0).with_families(["CPRO38"]);
    let cands = generate(&inputs, &cat, true).unwrap();
    let n = cands.len();
    let groups = group_structural(cands);
    let total: usize = groups.iter().map(|(_, p)| p.len()).sum();
    assert_eq!(total, n);
    let keys: HashSet<_> = groups.iter().map(|(c, _)| c.structural_key()).collect();
    assert_eq!(keys.len(), groups.len());
    // 300 − 125 = 175: positions 75..=175 in 5 mm steps
    assert!(groups.iter().all(|(_, p)| p.len() == 21 && p[0] == 75.0));
}

#[test]
fn standard_bracket_steps_up_from_deepest_fixing() {
    let cat = TableCatalog::reference();
    let ev = DepthLimited {
        inner: ReferenceEvaluator::new(&cat),
        max_fixing: 100.0,
        seen: RefCell::default(),
    };
    // CPRO38 in a 300 mm slab: sweep 75..=175
    let inputs = DesignInputs::new(300.0, 100.0, -200.0, 3.0).with_families(["CPRO38"]);
    let out = optimize(&inputs, &cat, &ev, SearchCfg::default()).unwrap();
    assert_eq!(out.selected.candidate.bracket_type, BracketType::Standard);
    assert_eq!(out.selected.candidate.fixing_position, 100.0);

    let key = out.selected.candidate.structural_key();
    let visited: Vec<f64> = ev
        .seen
        .borrow()
        .iter()
        .filter(|(k, _)| *k == key)
        .map(|&(_, f)| f)
        .collect();
    let expected: Vec<f64> = (0..=15).map(|k| 175.0 - 5.0 * k as f64).collect();
    assert_eq!(visited, expected);
    // every scored standard group started at the deepest position
    let seen = ev.seen.borrow();
    let mut starts = HashSet::new();
    for (k, f) in seen.iter() {
        if starts.insert(k.clone()) {
            assert_eq!(*f, 175.0);
        }
    }
}

#[test]
fn overloaded_design_is_infeasible() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let inputs = DesignInputs::new(250.0, 100.0, -160.0, 200.0);
    match optimize(&inputs, &cat, &ev, SearchCfg::default()) {
        Err(SearchError::InfeasibleDesign { evaluated }) => assert!(evaluated > 0),
        other => panic!("expected infeasible, got {other:?}"),
    }
}

#[test]
fn invalid_inputs_are_reported() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let inputs = DesignInputs::new(0.0, 100.0, -160.0, 3.0);
    assert!(matches!(
        optimize(&inputs, &cat, &ev, SearchCfg::default()),
        Err(SearchError::InvalidInputs { .. })
    ));
}

#[test]
fn faulting_candidates_are_skipped() {
    let cat = TableCatalog::reference();
    let ev = FaultyEvaluator {
        inner: ReferenceEvaluator::new(&cat),
    };
    let cfg = SearchCfg::default().with_prune(false);
    let out = optimize(&typical(), &cat, &ev, cfg).unwrap();
    assert!(out.stats.faults > 0);
    assert!(!FaultyEvaluator::faults_on(&out.selected.candidate));
    assert!(out
        .alternatives
        .iter()
        .all(|a| !FaultyEvaluator::faults_on(&a.design.candidate)));
}

#[test]
fn cancelled_token_stops_before_scoring() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let token = CancelToken::new();
    token.cancel();
    let out = SearchEngine::new(&cat, &ev)
        .with_cancel(token.clone())
        .run(&typical());
    assert!(token.is_cancelled());
    assert!(matches!(out, Err(SearchError::Cancelled { evaluated: 0 })));
}

#[test]
fn progress_is_reported_at_yield_points() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let seen: Arc<Mutex<Vec<SearchProgress>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let out = SearchEngine::new(&cat, &ev)
        .with_cfg(SearchCfg::default().with_prune(false).with_yield_every(8))
        .with_progress(Box::new(move |p| sink.lock().unwrap().push(p)))
        .run(&typical())
        .unwrap();
    let seen = seen.lock().unwrap();
    let total = out.stats.structural;
    // one report per yield point plus the final one
    assert_eq!(seen.len(), total.div_ceil(8) + 1);
    assert!(seen.windows(2).all(|w| w[0].evaluated <= w[1].evaluated));
    assert!(seen.iter().all(|p| p.total == total));
    let last = seen.last().unwrap();
    assert_eq!(last.evaluated, total);
    assert_eq!(last.best_weight, Some(out.global_best_weight));
}

#[test]
fn alternatives_are_capped_distinct_and_sorted() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let cfg = SearchCfg::default().with_prune(false).with_max_alternatives(3);
    let out = optimize(&typical(), &cat, &ev, cfg).unwrap();
    assert!(!out.alternatives.is_empty() && out.alternatives.len() <= 3);
    let selected_key = out.selected.candidate.structural_key();
    let keys: HashSet<_> = out
        .alternatives
        .iter()
        .map(|a| a.design.candidate.structural_key())
        .collect();
    assert_eq!(keys.len(), out.alternatives.len());
    assert!(!keys.contains(&selected_key));
    assert!(out
        .alternatives
        .windows(2)
        .all(|w| w[0].design.weight <= w[1].design.weight));
    assert!(out.alternatives.iter().all(|a| !a.differences.is_empty()));

    let none = optimize(&typical(), &cat, &ev, cfg.with_max_alternatives(0)).unwrap();
    assert!(none.alternatives.is_empty());
}

#[test]
fn channel_bests_cover_every_family_without_pruning() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let cfg = SearchCfg::default().with_prune(false);
    let out = optimize(&typical(), &cat, &ev, cfg).unwrap();
    assert_eq!(
        out.channel_bests.keys().cloned().collect::<Vec<_>>(),
        vec!["CPRO38".to_string(), "CPRO50".to_string()]
    );
    let lightest = out
        .channel_bests
        .values()
        .map(|d| d.weight)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(lightest, out.global_best_weight);
    assert_eq!(out.stats.pruned, 0);
}

#[test]
fn pruning_skips_work() {
    let cat = TableCatalog::reference();
    let ev = ReferenceEvaluator::new(&cat);
    let inputs = DesignInputs::new(300.0, 100.0, -40.0, 3.0);
    let pruned = optimize(&inputs, &cat, &ev, SearchCfg::default()).unwrap();
    let full = optimize(&inputs, &cat, &ev, SearchCfg::default().with_prune(false)).unwrap();
    assert!(pruned.stats.evaluated <= full.stats.evaluated);
    assert_eq!(pruned.selected.weight, full.selected.weight);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pruning_never_changes_the_selected_weight(
        slab in 150.0f64..400.0,
        cavity in 50.0f64..150.0,
        bsl in -300.0f64..50.0,
        load in 1.0f64..8.0,
        limit in proptest::option::of(-250.0f64..0.0),
    ) {
        let cat = TableCatalog::reference();
        let ev = ReferenceEvaluator::new(&cat);
        let mut inputs = DesignInputs::new(slab.round(), cavity.round(), bsl.round(), load);
        if let Some(l) = limit {
            inputs = inputs.with_exclusion_limit(l.round());
        }
        let on = optimize(&inputs, &cat, &ev, SearchCfg::default());
        let off = optimize(&inputs, &cat, &ev, SearchCfg::default().with_prune(false));
        match (on, off) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.selected.weight, b.selected.weight);
                prop_assert_eq!(a.overridden, b.overridden);
            }
            (Err(SearchError::InfeasibleDesign { .. }), Err(SearchError::InfeasibleDesign { .. })) => {}
            (a, b) => prop_assert!(false, "mismatch: {:?} vs {:?}", a.map(|r| r.selected.weight), b.map(|r| r.selected.weight)),
        }
    }
}
