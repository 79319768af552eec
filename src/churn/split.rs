//! Seeded train/test hold-out split

use crate::error::{AnalyticsError, Result, Stage};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of one hold-out split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Shuffles row indices and holds out `⌈test_size · n⌉` of them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainTestSplitter {
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for TrainTestSplitter {
    fn default() -> Self {
        Self {
            test_size: 0.3,
            random_state: 42,
        }
    }
}

impl TrainTestSplitter {
    pub fn new(test_size: f64, random_state: u64) -> Self {
        Self {
            test_size,
            random_state,
        }
    }

    pub fn n_test(&self, n_samples: usize) -> usize {
        (self.test_size * n_samples as f64).ceil() as usize
    }

    pub fn split(&self, n_samples: usize) -> Result<HoldoutSplit> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(AnalyticsError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }

        let n_test = self.n_test(n_samples);
        if n_test == 0 || n_test >= n_samples {
            return Err(AnalyticsError::data_quality(
                Stage::ChurnClassifier,
                format!(
                    "{} samples cannot be split with test_size {}",
                    n_samples, self.test_size
                ),
            ));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        indices.shuffle(&mut rng);

        let train_indices = indices.split_off(n_test);
        Ok(HoldoutSplit {
            train_indices,
            test_indices: indices,
        })
    }
}
