//! Conflict probabilities between intention profiles.

use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use crate::qsi::profile::IntentionProfile;

/// How subsets of intentions are examined when asking whether `k` of them can
/// be achieved together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubsetStrategy {
    /// Every `C(n, k)` subset, in lexicographic order.
    Exhaustive,
    /// Independent random subsets; `n - k + 1` draws unless `trials` is set.
    Sampled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trials: Option<u32>,
    },
}

impl Default for SubsetStrategy {
    fn default() -> Self {
        SubsetStrategy::Sampled { trials: None }
    }
}

/// Probability that `establishment` steps producing `¬l`, spread over an
/// intention of `length` steps, hit a `fragility`-step window in which `l`
/// must survive.
///
/// Computes `1 - C(L-E, F) / C(L, F)` on rounded values, as a running product
/// so large lengths do not overflow. Certain conflict when `F > L - E`.
pub fn prob_conflict_literal(length: f64, fragility: f64, establishment: f64) -> f64 {
    let l = length.round() as i64;
    let f = fragility.round() as i64;
    let e = establishment.round() as i64;
    if l - e < f {
        return 1.0;
    }
    let mut free = 1.0;
    for t in 0..f {
        free *= (l - e - t) as f64 / (l - t) as f64;
    }
    (1.0 - free).clamp(0.0, 1.0)
}

/// Worst single-literal conflict between two intentions, in either direction.
pub fn prob_conflict_pair(a: &IntentionProfile, b: &IntentionProfile) -> f64 {
    directed(a, b).max(directed(b, a))
}

fn directed(fragile: &IntentionProfile, other: &IntentionProfile) -> f64 {
    fragile
        .fragility
        .iter()
        .filter_map(|(lit, frag)| {
            other
                .establishment
                .get(&lit.negation())
                .map(|estab| prob_conflict_literal(other.length, *frag, *estab))
        })
        .fold(0.0, f64::max)
}

/// Probability that at least one pair in the set conflicts. Zero for fewer than two.
pub fn prob_conflict_set(profiles: &[&IntentionProfile]) -> f64 {
    if profiles.len() <= 1 {
        return 0.0;
    }
    let mut free = 1.0;
    for (i, a) in profiles.iter().enumerate() {
        for b in &profiles[i + 1..] {
            free *= 1.0 - prob_conflict_pair(a, b);
        }
    }
    (1.0 - free).clamp(0.0, 1.0)
}

/// Conflict-free probability of the best `k`-subset found.
///
/// Stops as soon as a subset beats `accept`. With `k <= 1` nothing can
/// conflict; with `k` above the number of profiles no subset exists.
pub fn prob_achievable<R: Rng>(
    profiles: &[&IntentionProfile],
    k: usize,
    strategy: SubsetStrategy,
    accept: f64,
    rng: &mut R,
) -> f64 {
    let n = profiles.len();
    if k <= 1 {
        return 1.0;
    }
    if k > n {
        return 0.0;
    }
    let mut best = 0.0f64;
    let mut consider = |subset: &[usize]| -> bool {
        let chosen: Vec<&IntentionProfile> = subset.iter().map(|&i| profiles[i]).collect();
        best = best.max(1.0 - prob_conflict_set(&chosen));
        best <= accept
    };
    match strategy {
        SubsetStrategy::Exhaustive => for_each_combination(n, k, consider),
        SubsetStrategy::Sampled { trials } => {
            let trials = trials.unwrap_or((n - k + 1) as u32).max(1);
            for _ in 0..trials {
                let subset = index::sample(rng, n, k).into_vec();
                if !consider(&subset) {
                    break;
                }
            }
        }
    }
    best
}

/// Visit `k`-combinations of `0..n` in lexicographic order until `visit` returns false.
fn for_each_combination(n: usize, k: usize, mut visit: impl FnMut(&[usize]) -> bool) {
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        if !visit(&idx) {
            return;
        }
        let mut i = k;
        while i > 0 && idx[i - 1] == n - k + i - 1 {
            i -= 1;
        }
        if i == 0 {
            return;
        }
        idx[i - 1] += 1;
        for j in i..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}
