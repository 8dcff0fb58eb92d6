//! A from-scratch isolation forest, the Tier-2 unsupervised outlier model.
//!
//! No crate in this codebase's dependency stack ships an isolation forest
//! (`linfa`/`linfa-clustering` cover clustering, not isolation-based outlier
//! detection), so this builds the standard algorithm directly on `ndarray`
//! for the feature matrix and a seeded `rand_chacha` generator so results are
//! reproducible across runs (required for the determinism property this
//! model is held to).

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const DEFAULT_SEED: u64 = 42;
const DEFAULT_ESTIMATORS: usize = 100;
const MAX_SAMPLE_SIZE: usize = 256;

enum Node {
    Leaf { size: usize },
    Internal { feature: usize, split: f64, left: Box<Node>, right: Box<Node> },
}

struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn build(data: &[Vec<f64>], depth: usize, height_limit: usize, rng: &mut ChaCha8Rng) -> Node {
        if data.len() <= 1 || depth >= height_limit {
            return Node::Leaf { size: data.len() };
        }

        let n_features = data[0].len();
        // Try a handful of features in case the first choice happens to be constant.
        for _ in 0..n_features.max(1) {
            let feature = rng.random_range(0..n_features);
            let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
            for row in data {
                min = min.min(row[feature]);
                max = max.max(row[feature]);
            }
            if min == max {
                continue;
            }

            let split = rng.random_range(min..max);
            let (left, right): (Vec<_>, Vec<_>) = data.iter().cloned().partition(|row| row[feature] < split);
            if left.is_empty() || right.is_empty() {
                continue;
            }

            return Node::Internal {
                feature,
                split,
                left: Box::new(Self::build(&left, depth + 1, height_limit, rng)),
                right: Box::new(Self::build(&right, depth + 1, height_limit, rng)),
            };
        }

        Node::Leaf { size: data.len() }
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        fn walk(node: &Node, point: &[f64], depth: f64) -> f64 {
            match node {
                Node::Leaf { size } => depth + average_path_length_correction(*size),
                Node::Internal { feature, split, left, right } => {
                    if point[*feature] < *split {
                        walk(left, point, depth + 1.0)
                    } else {
                        walk(right, point, depth + 1.0)
                    }
                }
            }
        }
        walk(&self.root, point, 0.0)
    }
}

/// Average path length of an unsuccessful search in a binary search tree of `n` nodes.
fn average_path_length_correction(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + 0.5772156649015329) - (2.0 * (n - 1.0) / n)
}

pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fits `n_estimators` trees, each on an independent random subsample of `data`.
    pub fn fit(data: &Array2<f64>, seed: u64, n_estimators: usize) -> Self {
        let n = data.nrows();
        let sample_size = n.min(MAX_SAMPLE_SIZE);
        let height_limit = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let rows: Vec<Vec<f64>> = data.outer_iter().map(|r| r.to_vec()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let trees = (0..n_estimators)
            .map(|_| {
                let mut subsample: Vec<Vec<f64>> = Vec::with_capacity(sample_size);
                for _ in 0..sample_size {
                    let idx = rng.random_range(0..rows.len());
                    subsample.push(rows[idx].clone());
                }
                IsolationTree { root: IsolationTree::build(&subsample, 0, height_limit, &mut rng) }
            })
            .collect();

        Self { trees, sample_size }
    }

    pub fn fit_default(data: &Array2<f64>) -> Self {
        Self::fit(data, DEFAULT_SEED, DEFAULT_ESTIMATORS)
    }

    /// Normalized anomaly score in `(0, 1]`; values near 1 indicate isolation
    /// (anomalous), values near 0.5 indicate a typical point.
    pub fn score(&self, point: &[f64]) -> f64 {
        let avg_path: f64 =
            self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / self.trees.len() as f64;
        let c = average_path_length_correction(self.sample_size);
        if c == 0.0 {
            return 0.5;
        }
        2f64.powf(-avg_path / c)
    }

    /// Maps the raw isolation score onto `[0, 1]`, clamping the "normal" half
    /// of the range to zero so downstream blending only reacts to outliers.
    pub fn anomaly_score_0_1(&self, point: &[f64]) -> f64 {
        (2.0 * (self.score(point) - 0.5)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn isolated_outlier_scores_higher_than_clustered_points() {
        let mut rows = Vec::new();
        for i in 0..40 {
            rows.push([i as f64 % 5.0, (i as f64 * 0.1) % 2.0]);
        }
        rows.push([500.0, 500.0]);
        let data = Array2::from_shape_vec((rows.len(), 2), rows.concat()).unwrap();

        let forest = IsolationForest::fit_default(&data);
        let outlier_score = forest.anomaly_score_0_1(&[500.0, 500.0]);
        let normal_score = forest.anomaly_score_0_1(&[2.0, 0.5]);

        assert!(outlier_score > normal_score, "outlier={outlier_score} normal={normal_score}");
    }

    #[test]
    fn same_seed_is_deterministic() {
        let data = array![[1.0, 2.0], [2.0, 3.0], [3.0, 1.0], [10.0, 10.0], [1.5, 2.5]];
        let a = IsolationForest::fit(&data, 42, 20).anomaly_score_0_1(&[10.0, 10.0]);
        let b = IsolationForest::fit(&data, 42, 20).anomaly_score_0_1(&[10.0, 10.0]);
        assert_eq!(a, b);
    }
}
