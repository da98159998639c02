//! Offline path sampling for fragility and establishment statistics.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::core::literal::Literal;
use crate::core::tree::{GoalTree, NodeId, NodeKind, NodeStats};

/// One action on a sampled path; `cycle` is its 1-based position.
struct SimStep<'t> {
    pre: &'t [Literal],
    post: &'t [Literal],
    cycle: u64,
}

/// Sample `samples` random paths through every plan in `tree`.
///
/// Subgoals pick a plan uniformly at random; context conditions are ignored.
/// Each goal's statistics are the sum over its plans.
pub fn sample_tree<R: Rng>(tree: &GoalTree, samples: u32, rng: &mut R) -> Vec<NodeStats> {
    let mut stats = vec![NodeStats::default(); tree.len()];
    for id in tree.ids() {
        if !matches!(tree.node(id).kind, NodeKind::Plan(_)) {
            continue;
        }
        for _ in 0..samples {
            let mut path = Vec::new();
            walk_plan(tree, id, &mut path, rng);
            summarise(&mut stats[id.index()], &path);
        }
    }
    for id in tree.ids() {
        if !matches!(tree.node(id).kind, NodeKind::Goal(_)) {
            continue;
        }
        let mut total = NodeStats::default();
        for plan in tree.plans(id) {
            total.absorb(&stats[plan.index()]);
        }
        stats[id.index()] = total;
    }
    stats
}

/// Profile `tree` unless it already carries statistics. Returns whether sampling ran.
pub fn ensure_profiled<R: Rng>(tree: &GoalTree, samples: u32, rng: &mut R) -> bool {
    if tree.is_profiled() {
        return false;
    }
    let stats = sample_tree(tree, samples, rng);
    let installed = tree.install_stats(stats);
    debug!(goal = tree.name(), samples, nodes = tree.len(), "profiled goal tree");
    installed
}

fn walk_plan<'t, R: Rng>(
    tree: &'t GoalTree,
    plan: NodeId,
    path: &mut Vec<SimStep<'t>>,
    rng: &mut R,
) {
    let NodeKind::Plan(node) = &tree.node(plan).kind else {
        return;
    };
    for step in &node.body {
        match &tree.node(*step).kind {
            NodeKind::Action(action) => {
                let cycle = path.len() as u64 + 1;
                path.push(SimStep {
                    pre: &action.pre,
                    post: &action.post,
                    cycle,
                });
            }
            NodeKind::Goal(goal) => {
                if let Some(chosen) = goal.plans.choose(rng) {
                    walk_plan(tree, *chosen, path, rng);
                }
            }
            NodeKind::Plan(_) => {}
        }
    }
}

/// Add one sampled path to a plan's totals.
///
/// A literal's fragility grows by the gap between its latest establishment
/// and the last step that required it, provided its negation was not
/// established more recently.
fn summarise(stats: &mut NodeStats, path: &[SimStep<'_>]) {
    let mut required: BTreeMap<&Literal, u64> = BTreeMap::new();
    let mut established: BTreeMap<&Literal, u64> = BTreeMap::new();

    for step in path {
        for lit in step.post {
            let last = established.get(lit).copied().unwrap_or(0);
            if let Some(needed_at) = required.remove(lit) {
                add_fragility(stats, &established, lit, needed_at, last);
            }
            established.insert(lit, step.cycle);
            *stats.establishment.entry(lit.clone()).or_default() += 1;
        }
        for lit in step.pre {
            required.insert(lit, step.cycle);
        }
    }
    for (lit, needed_at) in required {
        let last = established.get(lit).copied().unwrap_or(0);
        add_fragility(stats, &established, lit, needed_at, last);
    }

    stats.runs += 1;
    stats.length += path.len() as u64;
}

fn add_fragility(
    stats: &mut NodeStats,
    established: &BTreeMap<&Literal, u64>,
    lit: &Literal,
    needed_at: u64,
    last: u64,
) {
    let negated = established.get(&lit.negation()).copied().unwrap_or(0);
    if negated <= last {
        *stats.fragility.entry(lit.clone()).or_default() += needed_at.saturating_sub(last);
    }
}
