//! Enumeration of legal choice sequences from a simulated state.

use crate::core::belief::BeliefBase;
use crate::core::choice::Choice;
use crate::core::intention::Intention;
use crate::core::tree::{NodeId, NodeKind};

/// Every legal next choice sequence across all unfinished intentions.
///
/// An intention at a goal contributes one sequence per chain of applicable,
/// not yet failed plans leading down to an action, closed by committing that action. An
/// intention at an action contributes the commit when its precondition holds
/// with certainty.
pub fn legal_choices(intentions: &[Intention], beliefs: &BeliefBase) -> Vec<Vec<Choice>> {
    let mut sequences = Vec::new();
    for (index, intention) in intentions.iter().enumerate() {
        let Some(cursor) = intention.cursor() else {
            continue;
        };
        let tree = intention.tree();
        match &tree.node(cursor).kind {
            NodeKind::Goal(_) => {
                for path in plan_paths(intention, cursor, beliefs) {
                    let mut seq: Vec<Choice> = path
                        .into_iter()
                        .map(|plan| Choice::SelectPlan {
                            intention: index,
                            plan,
                        })
                        .collect();
                    seq.push(Choice::ExecuteAction { intention: index });
                    sequences.push(seq);
                }
            }
            NodeKind::Action(action) => {
                if beliefs.holds(&action.pre) {
                    sequences.push(vec![Choice::ExecuteAction { intention: index }]);
                }
            }
            NodeKind::Plan(_) => {}
        }
    }
    sequences
}

/// Plan-index chains from `goal` down to the first action, through applicable plans only.
pub fn plan_paths(intention: &Intention, goal: NodeId, beliefs: &BeliefBase) -> Vec<Vec<usize>> {
    let tree = intention.tree();
    let mut paths = Vec::new();
    for (index, plan_id) in tree.plans(goal).iter().enumerate() {
        let NodeKind::Plan(plan) = &tree.node(*plan_id).kind else {
            continue;
        };
        if intention.has_failed(*plan_id) || !beliefs.holds(&plan.context) {
            continue;
        }
        let Some(&entry) = plan.body.first() else {
            continue;
        };
        match tree.node(entry).kind {
            NodeKind::Action(_) => paths.push(vec![index]),
            NodeKind::Goal(_) => {
                for rest in plan_paths(intention, entry, beliefs) {
                    let mut path = Vec::with_capacity(rest.len() + 1);
                    path.push(index);
                    path.extend(rest);
                    paths.push(path);
                }
            }
            NodeKind::Plan(_) => {}
        }
    }
    paths
}
