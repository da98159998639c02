//! Random playouts and replay of stored choice sequences.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::belief::BeliefBase;
use crate::core::choice::{Choice, apply_choice, finished_count};
use crate::core::intention::Intention;
use crate::core::tree::NodeKind;
use crate::error::EngineError;

/// Reward and choices of one playout.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    pub reward: f64,
    pub choices: Vec<Choice>,
}

/// Play random choices until no intention can make progress.
///
/// An intention is picked at random; its goals are descended by trying plans
/// in random order until one's context holds. When an action with a holding
/// precondition is reached, the recorded choices are applied and every
/// unfinished intention becomes eligible again. An intention that stalls is
/// dropped for the rest of the pass. The reward is the number of finished
/// intentions.
pub fn rollout<R: Rng>(
    intentions: &[Intention],
    beliefs: &BeliefBase,
    rng: &mut R,
) -> Result<Rollout, EngineError> {
    let mut state = intentions.to_vec();
    let mut beliefs = beliefs.clone();
    let mut choices = Vec::new();
    let mut eligible = unfinished(&state);

    while !eligible.is_empty() {
        let index = eligible.swap_remove(rng.gen_range(0..eligible.len()));
        let Some(local) = playable_prefix(&state[index], index, &beliefs, rng) else {
            continue;
        };
        for choice in &local {
            apply_choice(&mut state, &mut beliefs, choice)?;
        }
        choices.extend(local);
        eligible = unfinished(&state);
    }

    Ok(Rollout {
        reward: finished_count(&state) as f64,
        choices,
    })
}

/// Replay `choices` from the given state, stopping at the first one that no
/// longer applies. Returns the finished count reached and how many choices applied.
pub fn replay(
    choices: &[Choice],
    intentions: &[Intention],
    beliefs: &BeliefBase,
) -> Result<(f64, usize), EngineError> {
    let mut state = intentions.to_vec();
    let mut beliefs = beliefs.clone();
    let mut applied = 0;
    for choice in choices {
        if !applicable(&state, &beliefs, choice) {
            break;
        }
        apply_choice(&mut state, &mut beliefs, choice)?;
        applied += 1;
    }
    Ok((finished_count(&state) as f64, applied))
}

/// Whether `choice` fits the current step of its intention and its condition holds.
pub fn applicable(intentions: &[Intention], beliefs: &BeliefBase, choice: &Choice) -> bool {
    let Some(intention) = intentions.get(choice.intention()) else {
        return false;
    };
    let Some(cursor) = intention.cursor() else {
        return false;
    };
    let tree = intention.tree();
    match (choice, &tree.node(cursor).kind) {
        (Choice::SelectPlan { plan, .. }, NodeKind::Goal(goal)) => {
            goal.plans.get(*plan).is_some_and(|id| match &tree.node(*id).kind {
                NodeKind::Plan(p) => {
                    !intention.has_failed(*id) && !p.body.is_empty() && beliefs.holds(&p.context)
                }
                NodeKind::Goal(_) | NodeKind::Action(_) => false,
            })
        }
        (Choice::ExecuteAction { .. }, NodeKind::Action(action)) => beliefs.holds(&action.pre),
        _ => false,
    }
}

fn unfinished(intentions: &[Intention]) -> Vec<usize> {
    intentions
        .iter()
        .enumerate()
        .filter(|(_, i)| !i.is_finished())
        .map(|(index, _)| index)
        .collect()
}

/// Random plan choices down to an executable action, or `None` if the intention stalls.
fn playable_prefix<R: Rng>(
    intention: &Intention,
    index: usize,
    beliefs: &BeliefBase,
    rng: &mut R,
) -> Option<Vec<Choice>> {
    let tree = intention.tree();
    let mut step = intention.cursor()?;
    let mut local = Vec::new();
    loop {
        match &tree.node(step).kind {
            NodeKind::Goal(goal) => {
                let mut order: Vec<usize> = (0..goal.plans.len()).collect();
                order.shuffle(rng);
                let (plan, entry) = order.into_iter().find_map(|p| {
                    if intention.has_failed(goal.plans[p]) {
                        return None;
                    }
                    let NodeKind::Plan(plan) = &tree.node(goal.plans[p]).kind else {
                        return None;
                    };
                    let entry = *plan.body.first()?;
                    beliefs.holds(&plan.context).then_some((p, entry))
                })?;
                local.push(Choice::SelectPlan {
                    intention: index,
                    plan,
                });
                step = entry;
            }
            NodeKind::Action(action) => {
                if !beliefs.holds(&action.pre) {
                    return None;
                }
                local.push(Choice::ExecuteAction { intention: index });
                return Some(local);
            }
            NodeKind::Plan(_) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{action, beliefs, goal, intention, plan};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn completes_independent_intentions() {
        let intentions = vec![
            intention(goal("g0", vec![plan("p0", &[], vec![action("a", &[], &["x+"])])])),
            intention(goal("g1", vec![plan("p1", &[], vec![action("b", &["x+"], &[])])])),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let result = rollout(&intentions, &beliefs(&["x-"]), &mut rng).expect("rollout");
            assert_eq!(result.reward, 2.0);
            assert_eq!(result.choices.len(), 4);
        }
    }

    /// An intention blocked by its precondition stalls without an error.
    #[test]
    fn blocked_intention_stalls_quietly() {
        let intentions = vec![
            intention(goal("g0", vec![plan("p0", &[], vec![action("a", &["never+"], &[])])])),
            intention(goal("g1", vec![plan("p1", &["never+"], vec![action("b", &[], &[])])])),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let result = rollout(&intentions, &beliefs(&[]), &mut rng).expect("rollout");
        assert_eq!(result.reward, 0.0);
        assert!(result.choices.is_empty());
    }

    /// Conflicting intentions: whichever runs first decides the reward.
    #[test]
    fn reward_reflects_interference() {
        let intentions = vec![
            intention(goal(
                "g0",
                vec![plan("p0", &[], vec![action("a0", &[], &["k-"]), action("a1", &[], &[])])],
            )),
            intention(goal("g1", vec![plan("p1", &[], vec![action("b0", &["k+"], &[])])])),
        ];
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = Vec::new();
        for _ in 0..50 {
            let result = rollout(&intentions, &beliefs(&["k+"]), &mut rng).expect("rollout");
            seen.push(result.reward);
        }
        assert!(seen.iter().all(|r| *r == 1.0 || *r == 2.0));
        assert!(seen.contains(&1.0));
        assert!(seen.contains(&2.0));
    }

    #[test]
    fn replay_stops_at_first_inapplicable_choice() {
        let intentions = vec![intention(goal(
            "g",
            vec![plan("p", &[], vec![action("a", &[], &[]), action("b", &["x+"], &[])])],
        ))];
        let choices = vec![
            Choice::SelectPlan { intention: 0, plan: 0 },
            Choice::ExecuteAction { intention: 0 },
            Choice::ExecuteAction { intention: 0 },
        ];
        let (reward, applied) = replay(&choices, &intentions, &beliefs(&[])).expect("replay");
        assert_eq!(applied, 2);
        assert_eq!(reward, 0.0);

        let (reward, applied) = replay(&choices, &intentions, &beliefs(&["x+"])).expect("replay");
        assert_eq!(applied, 3);
        assert_eq!(reward, 1.0);
    }
}
