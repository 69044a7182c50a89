//! Structural deduplication and admissible lower bounds.

use std::collections::HashMap;

use crate::evaluate::Evaluator;
use crate::generate::{Candidate, StructuralKey};
use crate::geometry::{frame_for, min_bracket_height};
use crate::inputs::DesignInputs;
use crate::selector::BracketType;

/// One structural identity with the fixing positions generated for it.
#[derive(Clone, Debug)]
pub struct StructuralGroup {
    /// Representative placed at the starting fixing position.
    pub candidate: Candidate,
    /// Generated fixing positions, ascending.
    pub positions: Vec<f64>,
    pub bound: f64,
}

impl StructuralGroup {
    /// Fixing position the local search starts from.
    ///
    /// Standard: the deepest position, which gives the shortest bracket.
    /// Inverted: the shallowest one, i.e. the fixed default.
    pub fn start_position(&self) -> f64 {
        let first = self.positions.first().copied();
        let last = self.positions.last().copied();
        match self.candidate.bracket_type {
            BracketType::Standard => last,
            BracketType::Inverted => first,
        }
        .unwrap_or(self.candidate.fixing_position)
    }
}

/// Collapse candidates to one group per structural identity, in first-seen
/// order.
pub fn group_structural(candidates: Vec<Candidate>) -> Vec<(Candidate, Vec<f64>)> {
    let mut index: HashMap<StructuralKey, usize> = HashMap::new();
    let mut groups: Vec<(Candidate, Vec<f64>)> = Vec::new();
    for c in candidates {
        let key = c.structural_key();
        match index.get(&key) {
            Some(&i) => groups[i].1.push(c.fixing_position),
            None => {
                index.insert(key, groups.len());
                let f = c.fixing_position;
                groups.push((c, vec![f]));
            }
        }
    }
    for (_, positions) in &mut groups {
        positions.sort_by(|a, b| a.total_cmp(b));
        positions.dedup();
    }
    groups
}

/// Lower bound on the weight of any valid design in the group.
///
/// Uses the shortest bracket reachable over the group's fixing positions
/// (the type minimum when an exclusion zone may trim it) and the un-extended
/// leg. Admissible as long as the evaluator's weight is monotone.
pub fn lower_bound(
    candidate: &Candidate,
    positions: &[f64],
    inputs: &DesignInputs,
    evaluator: &dyn Evaluator,
) -> f64 {
    let floor = min_bracket_height(candidate.bracket_type);
    let height = if inputs.exclusion_limit().is_some() {
        floor
    } else {
        positions
            .iter()
            .map(|&f| {
                frame_for(
                    candidate.bracket_type,
                    candidate.angle_orientation,
                    inputs.support_level,
                    candidate.angle_thickness,
                    candidate.vertical_leg,
                    f,
                )
                .height
            })
            .fold(f64::INFINITY, f64::min)
            .max(floor)
    };
    evaluator.weight(candidate, inputs, height, candidate.vertical_leg)
}

/// Group, bound, and sort ascending by bound (stable on ties).
pub fn bounded_groups(
    candidates: Vec<Candidate>,
    inputs: &DesignInputs,
    evaluator: &dyn Evaluator,
) -> Vec<StructuralGroup> {
    let mut groups: Vec<StructuralGroup> = group_structural(candidates)
        .into_iter()
        .map(|(c, positions)| {
            let bound = lower_bound(&c, &positions, inputs, evaluator);
            let mut g = StructuralGroup {
                candidate: c,
                positions,
                bound,
            };
            let start = g.start_position();
            g.candidate = g.candidate.at_fixing(start, inputs.support_level);
            g
        })
        .collect();
    groups.sort_by(|a, b| a.bound.total_cmp(&b.bound));
    groups
}
