//! Live execution state of one goal-plan tree.
//!
//! An [`Intention`] shares its static [`GoalTree`] and owns a cursor plus the
//! backtrack stack of goals whose plan is in progress. Per-node statuses are
//! copied on write, so cloning an intention for search is cheap.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::belief::BeliefBase;
use crate::core::tree::{GoalTree, NodeId, NodeKind};
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Default,
    Active,
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentionStatus {
    Active,
    Achieved,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Intention {
    tree: Arc<GoalTree>,
    cursor: Option<NodeId>,
    backtrack: Vec<NodeId>,
    statuses: Arc<Vec<NodeStatus>>,
    failed: bool,
}

impl Intention {
    pub fn new(tree: Arc<GoalTree>) -> Self {
        let statuses = Arc::new(vec![NodeStatus::Default; tree.len()]);
        Self {
            cursor: Some(tree.root()),
            tree,
            backtrack: Vec::new(),
            statuses,
            failed: false,
        }
    }

    pub fn tree(&self) -> &Arc<GoalTree> {
        &self.tree
    }

    /// Current step, or `None` once the top-level goal is achieved or exhausted.
    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn backtrack(&self) -> &[NodeId] {
        &self.backtrack
    }

    pub fn is_finished(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn status(&self) -> IntentionStatus {
        match (self.cursor, self.failed) {
            (Some(_), _) => IntentionStatus::Active,
            (None, false) => IntentionStatus::Achieved,
            (None, true) => IntentionStatus::Failed,
        }
    }

    pub fn node_status(&self, id: NodeId) -> NodeStatus {
        self.statuses[id.index()]
    }

    /// Whether `id` already failed in this intention; failed plans are not retried.
    pub fn has_failed(&self, id: NodeId) -> bool {
        self.node_status(id) == NodeStatus::Failure
    }

    /// Path of the cursor for diagnostics.
    pub fn location(&self) -> String {
        match self.cursor {
            Some(id) => self.tree.path(id),
            None => format!("{}/<finished>", self.tree.name()),
        }
    }

    /// Mark the current action active and return it; `None` when the cursor is not an action.
    pub fn progress_action(&mut self) -> Option<NodeId> {
        let id = self.cursor?;
        match self.tree.node(id).kind {
            NodeKind::Action(_) => {
                self.set_status(id, NodeStatus::Active);
                Some(id)
            }
            NodeKind::Goal(_) | NodeKind::Plan(_) => None,
        }
    }

    /// Commit plan `plan_index` of the current goal and move to its entry step.
    pub fn progress_plan(&mut self, plan_index: usize) -> Result<NodeId, EngineError> {
        let (goal, plan, entry) = self.resolve_plan(plan_index)?;
        self.set_status(goal, NodeStatus::Active);
        self.set_status(plan, NodeStatus::Active);
        self.backtrack.push(goal);
        self.cursor = Some(entry);
        Ok(plan)
    }

    /// Record that the current action executed successfully and advance.
    pub fn succeed(&mut self) -> Result<(), EngineError> {
        let action = self.current_action()?;
        self.set_status(action, NodeStatus::Success);
        self.advance(action, true);
        Ok(())
    }

    /// Record that the current step failed and backtrack.
    ///
    /// The innermost pending goal resumes if it still has an untried plan;
    /// otherwise failure propagates one goal further up. With an empty
    /// backtrack stack the intention has failed for good.
    pub fn fail(&mut self) -> Result<(), EngineError> {
        let Some(mut current) = self.cursor else {
            return Err(EngineError::violation(
                self.location(),
                "fail on a finished intention",
            ));
        };
        loop {
            self.set_status(current, NodeStatus::Failure);
            let Some(goal) = self.backtrack.pop() else {
                self.cursor = None;
                self.failed = true;
                return Ok(());
            };
            let available = self
                .tree
                .plans(goal)
                .iter()
                .any(|plan| self.node_status(*plan) == NodeStatus::Default);
            if let Some(plan) = self.active_plan(goal) {
                self.set_status(plan, NodeStatus::Failure);
            }
            self.cursor = Some(goal);
            if available {
                return Ok(());
            }
            current = goal;
        }
    }

    /// Simulated plan commit: same cursor movement as [`Self::progress_plan`],
    /// statuses untouched.
    pub fn simulate_plan(&mut self, plan_index: usize) -> Result<(), EngineError> {
        let (goal, _, entry) = self.resolve_plan(plan_index)?;
        self.backtrack.push(goal);
        self.cursor = Some(entry);
        Ok(())
    }

    /// Simulated action success: postconditions go into `beliefs`.
    pub fn simulate_action(&mut self, beliefs: &mut BeliefBase) -> Result<(), EngineError> {
        let action = self.current_action()?;
        if let NodeKind::Action(node) = &self.tree.node(action).kind {
            beliefs.update_all(&node.post);
        }
        self.advance(action, false);
        Ok(())
    }

    /// Steps still to run, in order.
    ///
    /// When the cursor is the entry of its plan, the plan itself stands in for
    /// its whole body. Later steps are found by climbing enclosing plans.
    pub fn remaining_steps(&self) -> Vec<NodeId> {
        let mut steps = Vec::new();
        let Some(cursor) = self.cursor else {
            return steps;
        };
        let mut next = Some(cursor);
        if let Some(plan) = self.tree.enclosing_plan(cursor) {
            let is_entry = match &self.tree.node(plan).kind {
                NodeKind::Plan(p) => p.body.first() == Some(&cursor),
                NodeKind::Goal(_) | NodeKind::Action(_) => false,
            };
            if is_entry {
                steps.push(plan);
                next = self.tree.continuation(plan);
            }
        }
        while let Some(step) = next {
            steps.push(step);
            next = self.tree.continuation(step);
        }
        steps
    }

    fn resolve_plan(&self, plan_index: usize) -> Result<(NodeId, NodeId, NodeId), EngineError> {
        let Some(goal) = self.cursor else {
            return Err(EngineError::violation(
                self.location(),
                "plan choice on a finished intention",
            ));
        };
        let NodeKind::Goal(node) = &self.tree.node(goal).kind else {
            return Err(EngineError::violation(
                self.location(),
                "plan choice while the current step is not a goal",
            ));
        };
        let Some(&plan) = node.plans.get(plan_index) else {
            return Err(EngineError::violation(
                self.location(),
                format!(
                    "plan index {} out of range ({} plans)",
                    plan_index,
                    node.plans.len()
                ),
            ));
        };
        let entry = match &self.tree.node(plan).kind {
            NodeKind::Plan(p) => p.body.first().copied(),
            NodeKind::Goal(_) | NodeKind::Action(_) => None,
        };
        let Some(entry) = entry else {
            return Err(EngineError::violation(
                self.tree.path(plan),
                "plan has an empty body",
            ));
        };
        Ok((goal, plan, entry))
    }

    fn current_action(&self) -> Result<NodeId, EngineError> {
        match self.cursor {
            Some(id) if matches!(self.tree.node(id).kind, NodeKind::Action(_)) => Ok(id),
            Some(_) => Err(EngineError::violation(
                self.location(),
                "action step expected",
            )),
            None => Err(EngineError::violation(
                self.location(),
                "action step expected on a finished intention",
            )),
        }
    }

    fn active_plan(&self, goal: NodeId) -> Option<NodeId> {
        self.tree
            .plans(goal)
            .iter()
            .copied()
            .find(|plan| self.node_status(*plan) == NodeStatus::Active)
    }

    /// Move past a finished step, closing every goal whose plan just ran out.
    fn advance(&mut self, from: NodeId, record: bool) {
        let mut next = self.tree.node(from).next;
        while next.is_none() {
            let Some(goal) = self.backtrack.pop() else {
                break;
            };
            if record {
                self.set_status(goal, NodeStatus::Success);
                if let Some(plan) = self.active_plan(goal) {
                    self.set_status(plan, NodeStatus::Success);
                }
            }
            next = self.tree.node(goal).next;
        }
        self.cursor = next;
    }

    fn set_status(&mut self, id: NodeId, status: NodeStatus) {
        Arc::make_mut(&mut self.statuses)[id.index()] = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{action, goal, intention, lit, plan, subgoal};

    fn two_step() -> Intention {
        intention(goal(
            "g0",
            vec![plan(
                "p0",
                &[],
                vec![action("a1", &[], &["p+"]), action("a2", &["p+"], &["q+"])],
            )],
        ))
    }

    fn name_at(intention: &Intention) -> Option<String> {
        intention
            .cursor()
            .map(|id| intention.tree().node(id).name.clone())
    }

    /// After n successes through a single plan the top-level goal is achieved.
    #[test]
    fn sequential_success_reaches_null_cursor() {
        let mut gpt = two_step();
        gpt.progress_plan(0).expect("commit");
        assert_eq!(name_at(&gpt).as_deref(), Some("a1"));
        assert_eq!(gpt.backtrack().len(), 1);

        assert!(gpt.progress_action().is_some());
        gpt.succeed().expect("a1");
        assert_eq!(name_at(&gpt).as_deref(), Some("a2"));

        gpt.progress_action();
        gpt.succeed().expect("a2");
        assert_eq!(gpt.cursor(), None);
        assert!(gpt.backtrack().is_empty());
        assert_eq!(gpt.status(), IntentionStatus::Achieved);
        let root = gpt.tree().root();
        assert_eq!(gpt.node_status(root), NodeStatus::Success);
        let p0 = gpt.tree().find("p0").expect("p0");
        assert_eq!(gpt.node_status(p0), NodeStatus::Success);
    }

    /// Finishing a subgoal's plan resumes at the parent's next step.
    #[test]
    fn subgoal_completion_resumes_parent_sequence() {
        let mut gpt = intention(goal(
            "g0",
            vec![plan(
                "p0",
                &[],
                vec![
                    subgoal(goal("g1", vec![plan("p1", &[], vec![action("a1", &[], &[])])])),
                    action("a2", &[], &[]),
                ],
            )],
        ));
        gpt.progress_plan(0).expect("p0");
        gpt.progress_plan(0).expect("p1");
        assert_eq!(gpt.backtrack().len(), 2);
        gpt.progress_action();
        gpt.succeed().expect("a1");
        assert_eq!(name_at(&gpt).as_deref(), Some("a2"));
        assert_eq!(gpt.backtrack().len(), 1);
        let g1 = gpt.tree().find("g1").expect("g1");
        assert_eq!(gpt.node_status(g1), NodeStatus::Success);
    }

    #[test]
    fn progress_action_is_noop_on_goal() {
        let mut gpt = two_step();
        assert_eq!(gpt.progress_action(), None);
        assert_eq!(gpt.node_status(gpt.tree().root()), NodeStatus::Default);
    }

    #[test]
    fn progress_plan_rejects_bad_index_and_non_goal() {
        let mut gpt = two_step();
        let err = gpt.progress_plan(3).expect_err("out of range");
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("out of range"));

        gpt.progress_plan(0).expect("commit");
        let err = gpt.progress_plan(0).expect_err("cursor on action");
        assert!(err.to_string().contains("not a goal"));
    }

    /// Failure with an untried alternative resumes at the goal.
    #[test]
    fn failure_backtracks_to_goal_with_untried_plan() {
        let mut gpt = intention(goal(
            "g0",
            vec![
                plan("p0", &[], vec![action("a0", &[], &[])]),
                plan("p1", &[], vec![action("a1", &[], &[])]),
            ],
        ));
        gpt.progress_plan(0).expect("p0");
        gpt.progress_action();
        gpt.fail().expect("fail");
        assert_eq!(gpt.cursor(), Some(gpt.tree().root()));
        assert!(gpt.backtrack().is_empty());
        let p0 = gpt.tree().find("p0").expect("p0");
        let p1 = gpt.tree().find("p1").expect("p1");
        assert_eq!(gpt.node_status(p0), NodeStatus::Failure);
        assert_eq!(gpt.node_status(p1), NodeStatus::Default);
        assert_eq!(gpt.status(), IntentionStatus::Active);
    }

    /// Exhausted subgoal propagates upward until a goal with an untried plan.
    #[test]
    fn failure_propagates_through_exhausted_subgoal() {
        let mut gpt = intention(goal(
            "g0",
            vec![
                plan(
                    "p0",
                    &[],
                    vec![subgoal(goal(
                        "g1",
                        vec![plan("p1", &[], vec![action("a1", &[], &[])])],
                    ))],
                ),
                plan("p0b", &[], vec![action("b", &[], &[])]),
            ],
        ));
        gpt.progress_plan(0).expect("p0");
        gpt.progress_plan(0).expect("p1");
        gpt.progress_action();
        gpt.fail().expect("fail");
        assert_eq!(gpt.cursor(), Some(gpt.tree().root()));
        let g1 = gpt.tree().find("g1").expect("g1");
        assert_eq!(gpt.node_status(g1), NodeStatus::Failure);

        gpt.progress_plan(1).expect("p0b");
        gpt.progress_action();
        gpt.fail().expect("fail again");
        assert_eq!(gpt.cursor(), None);
        assert_eq!(gpt.status(), IntentionStatus::Failed);
        assert!(gpt.fail().is_err());
    }

    /// Clones share the tree but never each other's cursor, stack or statuses.
    #[test]
    fn clone_is_independent() {
        let original = two_step();
        let mut copy = original.clone();
        copy.progress_plan(0).expect("commit");
        copy.progress_action();
        copy.succeed().expect("succeed");
        assert_eq!(original.cursor(), Some(original.tree().root()));
        assert!(original.backtrack().is_empty());
        let a1 = original.tree().find("a1").expect("a1");
        assert_eq!(original.node_status(a1), NodeStatus::Default);
        assert!(Arc::ptr_eq(original.tree(), copy.tree()));
    }

    #[test]
    fn simulation_updates_beliefs_not_statuses() {
        let mut gpt = two_step();
        let mut beliefs = BeliefBase::new();
        gpt.simulate_plan(0).expect("plan");
        gpt.simulate_action(&mut beliefs).expect("a1");
        assert!(beliefs.holds(&[lit("p+")]));
        gpt.simulate_action(&mut beliefs).expect("a2");
        assert!(gpt.is_finished());
        assert_eq!(gpt.node_status(gpt.tree().root()), NodeStatus::Default);
    }

    #[test]
    fn remaining_steps_folds_entry_into_plan() {
        let mut gpt = intention(goal(
            "g0",
            vec![plan(
                "p0",
                &[],
                vec![
                    action("a0", &[], &[]),
                    subgoal(goal("g1", vec![plan("p1", &[], vec![action("a1", &[], &[])])])),
                    action("a2", &[], &[]),
                ],
            )],
        ));
        let tree = gpt.tree().clone();
        let names = |steps: Vec<NodeId>| -> Vec<String> {
            steps.into_iter().map(|id| tree.node(id).name.clone()).collect()
        };
        assert_eq!(names(gpt.remaining_steps()), vec!["g0"]);
        gpt.simulate_plan(0).expect("p0");
        assert_eq!(names(gpt.remaining_steps()), vec!["p0"]);
        let mut beliefs = BeliefBase::new();
        gpt.simulate_action(&mut beliefs).expect("a0");
        assert_eq!(names(gpt.remaining_steps()), vec!["g1", "a2"]);
        gpt.simulate_plan(0).expect("p1");
        assert_eq!(names(gpt.remaining_steps()), vec!["p1", "a2"]);
    }
}
