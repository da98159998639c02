//! Child-selection scores.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::search::stats::Statistic;
use crate::search::{EPSILON, SearchConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPolicy {
    /// Plain UCT; the root's best child decides each cycle.
    #[default]
    Uct,
    /// Single-player MCTS: scaled exploration plus a variance bonus.
    SpMcts,
    /// Single-player score with conflict estimates standing in for rollouts.
    QsiMcts,
}

impl SearchPolicy {
    /// Score of `child` under a parent with `parent_visits` visits.
    ///
    /// `jitter` is a uniform sample in `[0,1)` that breaks exact ties.
    pub fn score(
        &self,
        child: &Statistic,
        parent_visits: u64,
        cfg: &SearchConfig,
        jitter: f64,
    ) -> f64 {
        let n = child.visits() as f64 + EPSILON;
        let mean = child.total() / n;
        let explore = ((parent_visits as f64 + 1.0).ln() / n).sqrt();
        match self {
            SearchPolicy::Uct => mean + explore + jitter * EPSILON,
            SearchPolicy::SpMcts | SearchPolicy::QsiMcts => {
                let spread = child.total_sq() - child.visits() as f64 * mean * mean;
                let variance = ((spread + cfg.variance_bias) / n).max(0.0).sqrt();
                mean + cfg.exploration * explore + jitter * EPSILON + variance
            }
        }
    }

    /// Whether the agent keeps the best rollout's full plan between cycles.
    pub fn carries_plan(&self) -> bool {
        matches!(self, SearchPolicy::SpMcts | SearchPolicy::QsiMcts)
    }

    pub fn uses_conflict_estimates(&self) -> bool {
        matches!(self, SearchPolicy::QsiMcts)
    }
}

impl fmt::Display for SearchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchPolicy::Uct => "uct",
            SearchPolicy::SpMcts => "sp_mcts",
            SearchPolicy::QsiMcts => "qsi_mcts",
        };
        f.write_str(name)
    }
}

impl FromStr for SearchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uct" => Ok(SearchPolicy::Uct),
            "sp_mcts" | "sp-mcts" => Ok(SearchPolicy::SpMcts),
            "qsi_mcts" | "qsi-mcts" => Ok(SearchPolicy::QsiMcts),
            other => Err(format!(
                "unknown policy '{}' (expected uct, sp_mcts or qsi_mcts)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visited(rewards: &[f64]) -> Statistic {
        let mut stat = Statistic::default();
        for r in rewards {
            stat.add(*r);
        }
        stat
    }

    /// Unvisited children outrank visited ones under every policy.
    #[test]
    fn unvisited_children_come_first() {
        let cfg = SearchConfig::default();
        for policy in [SearchPolicy::Uct, SearchPolicy::SpMcts, SearchPolicy::QsiMcts] {
            let fresh = policy.score(&Statistic::default(), 10, &cfg, 0.0);
            let seen = policy.score(&visited(&[2.0, 2.0, 2.0]), 10, &cfg, 0.9);
            assert!(fresh > seen, "{policy}");
        }
    }

    #[test]
    fn uct_prefers_higher_mean_at_equal_visits() {
        let cfg = SearchConfig::default();
        let low = SearchPolicy::Uct.score(&visited(&[0.0, 1.0]), 4, &cfg, 0.5);
        let high = SearchPolicy::Uct.score(&visited(&[2.0, 2.0]), 4, &cfg, 0.0);
        assert!(high > low);
    }

    /// The variance term favours the noisier child when means are equal.
    #[test]
    fn single_player_rewards_variance() {
        let cfg = SearchConfig {
            variance_bias: 0.0,
            ..SearchConfig::default()
        };
        let steady = SearchPolicy::SpMcts.score(&visited(&[1.0, 1.0]), 4, &cfg, 0.0);
        let noisy = SearchPolicy::SpMcts.score(&visited(&[0.0, 2.0]), 4, &cfg, 0.0);
        assert!(noisy > steady);
    }

    #[test]
    fn parses_names() {
        assert_eq!("uct".parse::<SearchPolicy>(), Ok(SearchPolicy::Uct));
        assert_eq!("sp-mcts".parse::<SearchPolicy>(), Ok(SearchPolicy::SpMcts));
        assert_eq!(SearchPolicy::QsiMcts.to_string(), "qsi_mcts");
        assert!("greedy".parse::<SearchPolicy>().is_err());
    }
}
