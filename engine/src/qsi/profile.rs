//! Averaged QSI statistics over the remaining steps of an intention.

use std::collections::{BTreeMap, HashMap};

use crate::core::intention::Intention;
use crate::core::literal::Literal;
use crate::core::tree::{GoalTree, NodeId, NodeKind, NodeStats};

/// Expected fragility and establishment per literal, and expected remaining length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentionProfile {
    pub fragility: BTreeMap<Literal, f64>,
    pub establishment: BTreeMap<Literal, f64>,
    pub length: f64,
}

impl IntentionProfile {
    /// Fold the steps the intention still has to run into one profile.
    ///
    /// Goals and a leading plan contribute their sampled averages. Actions are
    /// counted directly: a precondition nothing has established yet is fragile
    /// for the whole prefix, one established earlier in the sequence is
    /// fragile for the steps since it was established.
    pub fn from_intention(intention: &Intention) -> Self {
        let tree = intention.tree();
        let steps = intention.remaining_steps();
        let mut profile = Self::default();
        let mut established_at: HashMap<Literal, usize> = HashMap::new();

        for (i, step) in steps.iter().enumerate() {
            match &tree.node(*step).kind {
                NodeKind::Action(action) => {
                    for lit in &action.pre {
                        let established = profile.establishment.get(lit).copied().unwrap_or(0.0);
                        if established == 0.0 {
                            profile.fragility.insert(lit.clone(), profile.length + 1.0);
                        } else if let Some(&from) = established_at.get(lit) {
                            let window: f64 =
                                steps[from..i].iter().map(|s| step_length(tree, *s)).sum();
                            *profile.fragility.entry(lit.clone()).or_default() += window;
                            established_at.insert(lit.clone(), i);
                        } else {
                            *profile.fragility.entry(lit.clone()).or_default() += 1.0;
                        }
                    }
                    for lit in &action.post {
                        *profile.establishment.entry(lit.clone()).or_default() += 1.0;
                        established_at.insert(lit.clone(), i);
                        established_at.remove(&lit.negation());
                    }
                    profile.length += 1.0;
                }
                NodeKind::Goal(_) => {
                    let Some(stats) = sampled(tree, *step) else {
                        continue;
                    };
                    let runs = stats.runs as f64;
                    for (lit, count) in &stats.establishment {
                        *profile.establishment.entry(lit.clone()).or_default() +=
                            *count as f64 / runs;
                        established_at.remove(lit);
                        established_at.remove(&lit.negation());
                    }
                    for (lit, count) in &stats.fragility {
                        *profile.fragility.entry(lit.clone()).or_default() += *count as f64 / runs;
                    }
                    profile.length += stats.average_length();
                }
                NodeKind::Plan(_) => {
                    let Some(stats) = sampled(tree, *step) else {
                        continue;
                    };
                    let runs = stats.runs as f64;
                    profile.fragility = averaged(&stats.fragility, runs);
                    profile.establishment = averaged(&stats.establishment, runs);
                    profile.length = stats.average_length();
                }
            }
        }
        profile
    }
}

fn sampled(tree: &GoalTree, id: NodeId) -> Option<&NodeStats> {
    tree.stats(id).filter(|stats| stats.runs > 0)
}

fn averaged(totals: &BTreeMap<Literal, u64>, runs: f64) -> BTreeMap<Literal, f64> {
    totals
        .iter()
        .map(|(lit, count)| (lit.clone(), *count as f64 / runs))
        .collect()
}

/// Expected number of actions a step stands for.
fn step_length(tree: &GoalTree, id: NodeId) -> f64 {
    match tree.node(id).kind {
        NodeKind::Action(_) => 1.0,
        NodeKind::Goal(_) => sampled(tree, id).map_or(0.0, NodeStats::average_length),
        NodeKind::Plan(_) => 0.0,
    }
}

/// Profiles keyed by intention index and cursor, valid for one fixed set of intentions.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: HashMap<(usize, NodeId), IntentionProfile>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profiles of the listed unfinished intentions, building missing ones.
    pub fn profiles(
        &mut self,
        intentions: &[Intention],
        indices: &[usize],
    ) -> Vec<&IntentionProfile> {
        for &index in indices {
            if let Some(cursor) = intentions[index].cursor() {
                self.entries
                    .entry((index, cursor))
                    .or_insert_with(|| IntentionProfile::from_intention(&intentions[index]));
            }
        }
        let entries = &self.entries;
        indices
            .iter()
            .filter_map(|&index| {
                let cursor = intentions[index].cursor()?;
                entries.get(&(index, cursor))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::belief::BeliefBase;
    use crate::qsi::sampler::ensure_profiled;
    use crate::test_support::{action, goal, intention, lit, plan};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn chained() -> Intention {
        let gpt = intention(goal(
            "g0",
            vec![plan(
                "p0",
                &[],
                vec![action("a1", &[], &["p+"]), action("a2", &["p+"], &["q+"])],
            )],
        ));
        let mut rng = StdRng::seed_from_u64(2);
        ensure_profiled(gpt.tree(), 4, &mut rng);
        gpt
    }

    #[test]
    fn fresh_intention_uses_goal_averages() {
        let profile = IntentionProfile::from_intention(&chained());
        assert_eq!(profile.length, 2.0);
        assert_eq!(profile.fragility.get(&lit("p+")), Some(&1.0));
        assert_eq!(profile.establishment.get(&lit("p+")), Some(&1.0));
        assert_eq!(profile.establishment.get(&lit("q+")), Some(&1.0));
    }

    #[test]
    fn leading_plan_uses_plan_averages() {
        let mut gpt = chained();
        gpt.simulate_plan(0).expect("commit");
        let profile = IntentionProfile::from_intention(&gpt);
        assert_eq!(profile.length, 2.0);
        assert_eq!(profile.fragility.get(&lit("p+")), Some(&1.0));
    }

    /// Mid-plan, a precondition with no establishment ahead of it spans the prefix.
    #[test]
    fn remaining_actions_are_counted_directly() {
        let mut gpt = chained();
        let mut beliefs = BeliefBase::new();
        gpt.simulate_plan(0).expect("commit");
        gpt.simulate_action(&mut beliefs).expect("a1");
        let profile = IntentionProfile::from_intention(&gpt);
        assert_eq!(profile.length, 1.0);
        assert_eq!(profile.fragility.get(&lit("p+")), Some(&1.0));
        assert_eq!(profile.establishment.get(&lit("q+")), Some(&1.0));
        assert_eq!(profile.establishment.get(&lit("p+")), None);
    }

    #[test]
    fn finished_intention_has_empty_profile() {
        let mut gpt = chained();
        let mut beliefs = BeliefBase::new();
        gpt.simulate_plan(0).expect("commit");
        gpt.simulate_action(&mut beliefs).expect("a1");
        gpt.simulate_action(&mut beliefs).expect("a2");
        assert_eq!(IntentionProfile::from_intention(&gpt), IntentionProfile::default());
    }

    #[test]
    fn cache_reuses_profiles_per_cursor() {
        let intentions = vec![chained(), chained()];
        let mut cache = ProfileCache::new();
        assert_eq!(cache.profiles(&intentions, &[0, 1]).len(), 2);
        assert_eq!(cache.profiles(&intentions, &[1]).len(), 1);
        assert_eq!(cache.len(), 2);
    }
}
