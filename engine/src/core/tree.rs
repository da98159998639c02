//! Static goal-plan tree stored as an arena.
//!
//! Nodes are addressed by [`NodeId`]. `parent` and `next` are lookup links into
//! the same arena, never ownership. A built tree is immutable apart from the
//! write-once simulation statistics attached by the offline sampler, so it is
//! shared between intentions and their clones through `Arc`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::core::literal::Literal;
use crate::core::types::{GoalDef, PlanDef, StepDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalNode {
    /// Alternative plans, any one of which achieves the goal.
    pub plans: Vec<NodeId>,
    pub condition: Vec<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    /// Context condition.
    pub context: Vec<Literal>,
    /// Ordered steps; `body[0]` is the entry point.
    pub body: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionNode {
    pub pre: Vec<Literal>,
    pub post: Vec<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Goal(GoalNode),
    Plan(PlanNode),
    Action(ActionNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub parent: Option<NodeId>,
    /// Following sibling in the enclosing plan body.
    pub next: Option<NodeId>,
    pub kind: NodeKind,
}

/// Totals accumulated by offline path sampling for one plan or goal.
///
/// Keys are full literals, so `l` and its negation are tracked separately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStats {
    pub fragility: BTreeMap<Literal, u64>,
    pub establishment: BTreeMap<Literal, u64>,
    /// Sum of sampled path lengths, in actions.
    pub length: u64,
    pub runs: u64,
}

impl NodeStats {
    /// Add another node's totals into this one.
    pub fn absorb(&mut self, other: &NodeStats) {
        for (lit, count) in &other.fragility {
            *self.fragility.entry(lit.clone()).or_default() += count;
        }
        for (lit, count) in &other.establishment {
            *self.establishment.entry(lit.clone()).or_default() += count;
        }
        self.length += other.length;
        self.runs += other.runs;
    }

    pub fn average_length(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.length as f64 / self.runs as f64
    }
}

#[derive(Debug)]
pub struct GoalTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
    stats: OnceLock<Vec<NodeStats>>,
}

impl GoalTree {
    /// Build the arena for one top-level goal and wire parent/next links.
    pub fn from_def(def: &GoalDef) -> Self {
        let mut nodes = Vec::new();
        let root = push_goal(&mut nodes, def, None);
        Self {
            nodes,
            root,
            stats: OnceLock::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn name(&self) -> &str {
        &self.nodes[self.root.0].name
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.ids().find(|id| self.node(*id).name == name)
    }

    /// Plans of a goal node; empty for any other kind.
    pub fn plans(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Goal(goal) => &goal.plans,
            NodeKind::Plan(_) | NodeKind::Action(_) => &[],
        }
    }

    /// Plan that `id` is a body step of, if any.
    pub fn enclosing_plan(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        match self.node(parent).kind {
            NodeKind::Plan(_) => Some(parent),
            NodeKind::Goal(_) | NodeKind::Action(_) => None,
        }
    }

    /// Closest following step after `id` finishes, climbing enclosing plans and goals.
    pub fn continuation(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let node = self.node(current);
            if let Some(next) = node.next {
                return Some(next);
            }
            current = node.parent?;
        }
    }

    /// `/`-separated name path from the root to `id`.
    pub fn path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            names.push(node.name.as_str());
            current = node.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Sampled statistics for `id`, once the tree has been profiled.
    pub fn stats(&self, id: NodeId) -> Option<&NodeStats> {
        self.stats.get().and_then(|all| all.get(id.0))
    }

    pub fn is_profiled(&self) -> bool {
        self.stats.get().is_some()
    }

    /// Attach sampled statistics. Returns `false` if the tree was already profiled.
    pub fn install_stats(&self, stats: Vec<NodeStats>) -> bool {
        self.stats.set(stats).is_ok()
    }
}

fn push_goal(nodes: &mut Vec<TreeNode>, def: &GoalDef, parent: Option<NodeId>) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(TreeNode {
        name: def.name.clone(),
        parent,
        next: None,
        kind: NodeKind::Goal(GoalNode {
            plans: Vec::new(),
            condition: def.condition.clone(),
        }),
    });
    let plans: Vec<NodeId> = def
        .plans
        .iter()
        .map(|plan| push_plan(nodes, plan, id))
        .collect();
    if let NodeKind::Goal(goal) = &mut nodes[id.0].kind {
        goal.plans = plans;
    }
    id
}

fn push_plan(nodes: &mut Vec<TreeNode>, def: &PlanDef, parent: NodeId) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(TreeNode {
        name: def.name.clone(),
        parent: Some(parent),
        next: None,
        kind: NodeKind::Plan(PlanNode {
            context: def.context.clone(),
            body: Vec::new(),
        }),
    });
    let body: Vec<NodeId> = def
        .body
        .iter()
        .map(|step| match step {
            StepDef::Goal(goal) => push_goal(nodes, goal, Some(id)),
            StepDef::Action(action) => {
                let action_id = NodeId(nodes.len());
                nodes.push(TreeNode {
                    name: action.name.clone(),
                    parent: Some(id),
                    next: None,
                    kind: NodeKind::Action(ActionNode {
                        pre: action.pre.clone(),
                        post: action.post.clone(),
                    }),
                });
                action_id
            }
        })
        .collect();
    for pair in body.windows(2) {
        nodes[pair[0].0].next = Some(pair[1]);
    }
    if let NodeKind::Plan(plan) = &mut nodes[id.0].kind {
        plan.body = body;
    }
    id
}
