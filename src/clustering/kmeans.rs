//! K-Means with k-means++ initialization

use crate::error::{AnalyticsError, Result, Stage};
use ndarray::{Array2, ArrayView1};
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of one k-means fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansFit {
    /// Cluster id per row, in `0..n_clusters`
    pub labels: Vec<usize>,
    /// n_clusters × n_features
    pub centroids: Array2<f64>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub n_iter: usize,
    /// Assignments stopped changing before `max_iter`
    pub converged: bool,
}

/// K-Means clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    /// Restarts from fresh k-means++ seeds; the lowest inertia wins
    pub n_init: usize,
    pub random_state: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(4)
    }
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            n_init: 1,
            random_state: 42,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit on the rows of `x`. Identical seed and input give identical labels.
    pub fn fit(&self, x: &Array2<f64>) -> Result<KMeansFit> {
        let n_samples = x.nrows();
        if self.n_clusters == 0 || self.n_init == 0 || self.max_iter == 0 {
            return Err(AnalyticsError::ConfigError(
                "n_clusters, n_init and max_iter must all be ≥ 1".to_string(),
            ));
        }
        if n_samples < self.n_clusters {
            return Err(AnalyticsError::data_quality(
                Stage::Clusterer,
                format!("n_samples ({}) < n_clusters ({})", n_samples, self.n_clusters),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut best: Option<KMeansFit> = None;
        for run in 0..self.n_init {
            let fit = self.fit_once(x, &mut rng);
            debug!(run, inertia = fit.inertia, n_iter = fit.n_iter, "k-means run finished");
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| AnalyticsError::model_fit(Stage::Clusterer, "no k-means run completed"))
    }

    fn fit_once(&self, x: &Array2<f64>, rng: &mut ChaCha8Rng) -> KMeansFit {
        let n_samples = x.nrows();
        let k = self.n_clusters;
        let mut centroids = Self::kmeans_pp_init(x, k, rng);
        let mut labels: Option<Vec<usize>> = None;
        let mut n_iter = 0;
        let mut converged = false;

        while n_iter < self.max_iter {
            n_iter += 1;
            let new_labels = Self::assign(x, &centroids);

            if labels.as_ref() == Some(&new_labels) {
                converged = true;
                break;
            }

            // Update step
            let mut sums = Array2::<f64>::zeros(centroids.dim());
            let mut counts = vec![0usize; k];
            for (i, &c) in new_labels.iter().enumerate() {
                counts[c] += 1;
                let mut row = sums.row_mut(c);
                row += &x.row(i);
            }
            for c in 0..k {
                if counts[c] > 0 {
                    let mean = &sums.row(c) / counts[c] as f64;
                    centroids.row_mut(c).assign(&mean);
                } else {
                    // Empty cluster: reseed from a random row
                    let idx = (rng.next_u64() as usize) % n_samples;
                    centroids.row_mut(c).assign(&x.row(idx));
                }
            }
            labels = Some(new_labels);
        }

        // the last update may have moved centroids after the final assignment
        let labels = if converged {
            labels.unwrap_or_default()
        } else {
            Self::assign(x, &centroids)
        };
        let inertia: f64 = labels
            .iter()
            .enumerate()
            .map(|(i, &c)| Self::euclidean_sq(&x.row(i), &centroids.row(c)))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
            converged,
        }
    }

    /// Nearest centroid per row; ties go to the lower cluster id
    fn assign(x: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
        (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let mut best_c = 0;
                let mut best_dist = f64::MAX;
                for c in 0..centroids.nrows() {
                    let d = Self::euclidean_sq(&row, &centroids.row(c));
                    if d < best_dist {
                        best_dist = d;
                        best_c = c;
                    }
                }
                best_c
            })
            .collect()
    }

    /// K-means++ initialization: pick centroids spread apart
    fn kmeans_pp_init(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
        let n_samples = x.nrows();
        let mut centroids = Array2::zeros((k, x.ncols()));

        let first = (rng.next_u64() as usize) % n_samples;
        centroids.row_mut(0).assign(&x.row(first));

        for c in 1..k {
            let dists: Vec<f64> = (0..n_samples)
                .map(|i| {
                    (0..c)
                        .map(|j| Self::euclidean_sq(&x.row(i), &centroids.row(j)))
                        .fold(f64::MAX, f64::min)
                })
                .collect();

            // Weighted random selection proportional to D²
            let total: f64 = dists.iter().sum();
            if total <= 0.0 {
                let idx = (rng.next_u64() as usize) % n_samples;
                centroids.row_mut(c).assign(&x.row(idx));
                continue;
            }

            let r = (rng.next_u64() as f64 / u64::MAX as f64) * total;
            let mut cumulative = 0.0;
            let mut chosen = n_samples - 1;
            for (i, &d) in dists.iter().enumerate() {
                cumulative += d;
                if cumulative >= r {
                    chosen = i;
                    break;
                }
            }
            centroids.row_mut(c).assign(&x.row(chosen));
        }

        centroids
    }

    fn euclidean_sq(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, -0.1],
            [-0.1, 0.1],
            [10.0, 10.0],
            [10.1, 9.9],
            [9.9, 10.1],
            [0.0, 10.0],
            [0.1, 9.9],
            [10.0, 0.0],
            [9.9, 0.1],
        ]
    }

    #[test]
    fn test_separates_blobs() {
        let fit = KMeans::new(4).with_n_init(5).fit(&blobs()).unwrap();
        assert!(fit.converged);
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[3], fit.labels[5]);
        assert_eq!(fit.labels[6], fit.labels[7]);
        assert_eq!(fit.labels[8], fit.labels[9]);
        let mut distinct = fit.labels.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 4);
        assert!(fit.inertia < 1.0);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let a = KMeans::new(3).fit(&blobs()).unwrap();
        let b = KMeans::new(3).fit(&blobs()).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn test_labels_in_range() {
        let fit = KMeans::new(4).with_random_state(7).fit(&blobs()).unwrap();
        assert!(fit.labels.iter().all(|&l| l < 4));
        assert_eq!(fit.centroids.nrows(), 4);
    }

    #[test]
    fn test_first_pass_is_not_taken_as_convergence() {
        // convergence needs two identical assignments in a row
        let x = array![[0.0], [0.2], [5.0], [5.2]];
        let fit = KMeans::new(2).fit(&x).unwrap();
        assert_ne!(fit.labels[0], fit.labels[2]);
        assert!(fit.n_iter >= 2);
    }

    #[test]
    fn test_too_few_samples() {
        let x = array![[1.0], [2.0]];
        assert!(matches!(
            KMeans::new(4).fit(&x),
            Err(AnalyticsError::DataQuality { .. })
        ));
    }
}
