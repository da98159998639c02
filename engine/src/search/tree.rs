//! Search tree stored as an arena of nodes labelled with choice sequences.

use crate::core::choice::Choice;
use crate::search::stats::Statistic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchId(usize);

#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Choices on the edge from the parent. Empty for the root.
    pub choices: Vec<Choice>,
    pub children: Vec<SearchId>,
    pub stats: Statistic,
}

#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl Default for SearchTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![SearchNode {
                choices: Vec::new(),
                children: Vec::new(),
                stats: Statistic::default(),
            }],
        }
    }

    pub fn root(&self) -> SearchId {
        SearchId(0)
    }

    pub fn node(&self, id: SearchId) -> &SearchNode {
        &self.nodes[id.0]
    }

    pub fn stats_mut(&mut self, id: SearchId) -> &mut Statistic {
        &mut self.nodes[id.0].stats
    }

    pub fn children(&self, id: SearchId) -> &[SearchId] {
        &self.nodes[id.0].children
    }

    pub fn add_child(&mut self, parent: SearchId, choices: Vec<Choice>) -> SearchId {
        let id = SearchId(self.nodes.len());
        self.nodes.push(SearchNode {
            choices,
            children: Vec::new(),
            stats: Statistic::default(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child of `id` with the highest mean reward, ignoring unvisited children.
    pub fn best_child(&self, id: SearchId) -> Option<SearchId> {
        let mut best: Option<(SearchId, f64)> = None;
        for child in self.children(id) {
            let stats = &self.node(*child).stats;
            if stats.visits() == 0 {
                continue;
            }
            let mean = stats.mean();
            if best.is_none_or(|(_, m)| mean > m) {
                best = Some((*child, mean));
            }
        }
        best.map(|(child, _)| child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_child_uses_mean_and_skips_unvisited() {
        let mut tree = SearchTree::new();
        let root = tree.root();
        let a = tree.add_child(root, vec![Choice::ExecuteAction { intention: 0 }]);
        let b = tree.add_child(root, vec![Choice::ExecuteAction { intention: 1 }]);
        let c = tree.add_child(root, vec![Choice::ExecuteAction { intention: 2 }]);
        assert_eq!(tree.best_child(root), None);

        tree.stats_mut(a).add(1.0);
        tree.stats_mut(a).add(1.0);
        tree.stats_mut(b).add(2.0);
        tree.stats_mut(b).add(0.0);
        tree.stats_mut(b).add(2.0);
        assert_eq!(tree.best_child(root), Some(b));
        assert_eq!(tree.node(c).stats.visits(), 0);
        assert_eq!(tree.len(), 4);
    }
}
