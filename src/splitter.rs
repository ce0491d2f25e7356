//! Per-sample training/test assignment, drawn once per key and reused
//! for every artifact derived from that key.

use std::collections::HashMap;

use rand::rngs::ThreadRng;
use rand::Rng;

/// Which partition a sample and all its artifacts belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Training,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Test => "test",
        }
    }
}

const DRAW_RANGE: u32 = 10_000;

/// Assigns sample keys to a partition with a configurable retention
/// ratio. Assignments are memoized, so asking twice for the same key
/// within a run always returns the same answer.
#[derive(Debug)]
pub struct DatasetSplitter {
    threshold: u32,
    assignments: HashMap<String, Split>,
    rng: ThreadRng,
}

impl DatasetSplitter {
    /// `train_ratio` is the fraction of samples kept for training,
    /// clamped to [0, 1].
    pub fn new(train_ratio: f64) -> Self {
        Self {
            threshold: (train_ratio.clamp(0.0, 1.0) * DRAW_RANGE as f64) as u32,
            assignments: HashMap::new(),
            rng: rand::thread_rng(),
        }
    }

    /// Partition for `key`, drawing it on first sight.
    pub fn assign(&mut self, key: &str) -> Split {
        let threshold = self.threshold;
        let rng = &mut self.rng;
        *self
            .assignments
            .entry(key.to_string())
            .or_insert_with(|| {
                if rng.gen_range(0..DRAW_RANGE) < threshold {
                    Split::Training
                } else {
                    Split::Test
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_stable_within_a_run() {
        let mut splitter = DatasetSplitter::new(0.5);
        for i in 0..200 {
            let key = format!("img{i}.jpg");
            let first = splitter.assign(&key);
            assert_eq!(splitter.assign(&key), first);
        }
    }

    #[test]
    fn ratio_one_keeps_everything() {
        let mut splitter = DatasetSplitter::new(1.0);
        for i in 0..100 {
            assert_eq!(splitter.assign(&format!("k{i}")), Split::Training);
        }
    }

    #[test]
    fn ratio_zero_keeps_nothing() {
        let mut splitter = DatasetSplitter::new(0.0);
        for i in 0..100 {
            assert_eq!(splitter.assign(&format!("k{i}")), Split::Test);
        }
    }

    #[test]
    fn default_ratio_lands_near_three_quarters() {
        let mut splitter = DatasetSplitter::new(0.75);
        let total = 10_000;
        let training = (0..total)
            .filter(|i| splitter.assign(&format!("k{i}")) == Split::Training)
            .count();
        let fraction = training as f64 / total as f64;
        assert!(
            (0.7..0.8).contains(&fraction),
            "training fraction {fraction}"
        );
    }

    #[test]
    fn out_of_range_ratio_is_clamped() {
        let mut splitter = DatasetSplitter::new(7.5);
        assert_eq!(splitter.assign("k"), Split::Training);
    }
}
