//! Running reward statistics of a search-tree node.

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistic {
    visits: u64,
    total: f64,
    total_sq: f64,
    best: f64,
}

impl Statistic {
    pub fn add(&mut self, reward: f64) {
        self.add_times(reward, 1);
    }

    /// Record `reward` as if it had been observed `times` times.
    pub fn add_times(&mut self, reward: f64, times: u64) {
        let n = times as f64;
        self.visits += times;
        self.total += reward * n;
        self.total_sq += reward * reward * n;
        if reward > self.best {
            self.best = reward;
        }
    }

    pub fn visits(&self) -> u64 {
        self.visits
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn total_sq(&self) -> f64 {
        self.total_sq
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Mean reward; 0 before the first visit.
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            return 0.0;
        }
        self.total / self.visits as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_sums_and_best() {
        let mut stat = Statistic::default();
        stat.add(1.0);
        stat.add(3.0);
        stat.add_times(2.0, 2);
        assert_eq!(stat.visits(), 4);
        assert_eq!(stat.total(), 8.0);
        assert_eq!(stat.total_sq(), 1.0 + 9.0 + 8.0);
        assert_eq!(stat.best(), 3.0);
        assert_eq!(stat.mean(), 2.0);
    }

    #[test]
    fn empty_mean_is_zero() {
        assert_eq!(Statistic::default().mean(), 0.0);
    }
}
