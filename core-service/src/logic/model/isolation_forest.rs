//! Isolation Forest - unsupervised outlier model
//!
//! Mỗi tree cô lập điểm bằng split ngẫu nhiên; điểm bất thường bị cô lập
//! ở độ sâu thấp. Score theo chuẩn sklearn:
//!
//! - `score_samples = -2^(-E[h(x)] / c(max_samples))`, trong [-1, 0)
//! - `decision_function = score_samples - offset`
//! - `offset` = percentile `contamination` của training scores

use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::logic::config::TrainingConfig;

const EULER_GAMMA: f64 = 0.5772156649;

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// Flat node arena, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(data: &Array2<f64>, rows: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(data, rows, 0, max_depth, rng);
        tree
    }

    fn grow(
        &mut self,
        data: &Array2<f64>,
        rows: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let index = self.nodes.len();

        if depth >= max_depth || rows.len() <= 1 {
            self.nodes.push(Node::Leaf { size: rows.len() });
            return index;
        }

        // Chỉ split trên features không constant trong node này
        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = data[[r, feature]];
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((feature, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            self.nodes.push(Node::Leaf { size: rows.len() });
            return index;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| data[[r, feature]] < threshold);

        // Placeholder, patched once children are known
        self.nodes.push(Node::Leaf { size: 0 });
        let left = self.grow(data, left_rows, depth + 1, max_depth, rng);
        let right = self.grow(data, right_rows, depth + 1, max_depth, rng);
        self.nodes[index] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };

        index
    }

    /// Depth of the leaf reached by `x` plus the expected remaining depth
    pub fn path_length(&self, x: ArrayView1<f64>) -> f64 {
        let mut index = 0;
        let mut depth = 0.0;

        while let Some(node) = self.nodes.get(index) {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = x.get(*feature).copied().unwrap_or(0.0);
                    index = if value < *threshold { *left } else { *right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(*size),
            }
        }

        depth
    }

    fn is_well_formed(&self, n_features: usize) -> bool {
        let count = self.nodes.len();
        // Children always sit after their parent in the arena
        count > 0
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < n_features
                        && threshold.is_finite()
                        && (i + 1..count).contains(left)
                        && (i + 1..count).contains(right)
                }
                Node::Leaf { .. } => true,
            })
    }
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    pub trees: Vec<IsolationTree>,
    /// Effective sub-sample size used per tree
    pub max_samples: usize,
    pub n_features: usize,
    pub contamination: f64,
    pub offset: f64,
}

impl IsolationForest {
    /// Fit on an already-scaled matrix (rows = samples)
    pub fn fit(data: &Array2<f64>, config: &TrainingConfig) -> PipelineResult<Self> {
        let n_samples = data.nrows();
        if n_samples < 2 {
            return Err(PipelineError::Training(format!(
                "need at least 2 samples, got {}",
                n_samples
            )));
        }

        let max_samples = config.max_samples.min(n_samples).max(2);
        let max_depth = (max_samples as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees = (0..config.n_estimators.max(1))
            .map(|_| {
                let rows = sample(&mut rng, n_samples, max_samples).into_vec();
                IsolationTree::build(data, rows, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            max_samples,
            n_features: data.ncols(),
            contamination: config.contamination,
            offset: -0.5,
        };

        let training_scores: Vec<f64> = data
            .axis_iter(Axis(0))
            .map(|row| forest.score_sample(row))
            .collect();
        forest.offset = percentile(&training_scores, 100.0 * config.contamination);

        log::info!(
            "Isolation forest fitted: {} trees, {} samples/tree, offset {:.4}",
            forest.trees.len(),
            max_samples,
            forest.offset
        );

        Ok(forest)
    }

    /// Raw score, lower = more anomalous, in [-1, 0)
    pub fn score_sample(&self, x: ArrayView1<f64>) -> f64 {
        if self.trees.is_empty() {
            return -0.5;
        }

        let mean_depth =
            self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.max_samples).max(f64::MIN_POSITIVE);

        -(2f64.powf(-mean_depth / norm))
    }

    pub fn decision_function(&self, x: ArrayView1<f64>) -> f64 {
        self.score_sample(x) - self.offset
    }

    /// Structural checks for a deserialized artifact
    pub fn check(&self, n_features: usize) -> Result<(), String> {
        if self.n_features != n_features {
            return Err(format!(
                "forest has {} features, expected {}",
                self.n_features, n_features
            ));
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        if !self.offset.is_finite() {
            return Err("forest offset is not finite".into());
        }
        if !self.trees.iter().all(|t| t.is_well_formed(n_features)) {
            return Err("forest contains a malformed tree".into());
        }
        Ok(())
    }
}

/// Linear-interpolated percentile (numpy default)
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn clustered_data() -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        Array2::from_shape_fn((200, 3), |_| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!(c256 > 9.0 && c256 < 11.0);
    }

    #[test]
    fn test_percentile() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&values, 10.0) - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_scores_in_range_and_outlier_lower() {
        let data = clustered_data();
        let forest = IsolationForest::fit(&data, &TrainingConfig::default()).unwrap();

        for row in data.axis_iter(Axis(0)) {
            let s = forest.score_sample(row);
            assert!((-1.0..0.0).contains(&s), "score {} out of range", s);
        }

        let inlier = ndarray::arr1(&[0.0, 0.0, 0.0]);
        let outlier = ndarray::arr1(&[25.0, -25.0, 25.0]);
        assert!(forest.score_sample(outlier.view()) < forest.score_sample(inlier.view()));
        assert!(forest.decision_function(outlier.view()) < 0.0);
    }

    #[test]
    fn test_fit_is_deterministic_with_seed() {
        let data = clustered_data();
        let a = IsolationForest::fit(&data, &TrainingConfig::default()).unwrap();
        let b = IsolationForest::fit(&data, &TrainingConfig::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.check(3).is_ok());
        assert!(a.check(4).is_err());
    }

    #[test]
    fn test_contamination_sets_offset() {
        let data = clustered_data();
        let forest = IsolationForest::fit(&data, &TrainingConfig::default()).unwrap();

        let flagged = data
            .axis_iter(Axis(0))
            .filter(|row| forest.decision_function(*row) < 0.0)
            .count();
        // Roughly 10% of training rows fall below the offset
        assert!(flagged >= 10 && flagged <= 30, "flagged {}", flagged);
    }

    #[test]
    fn test_rejects_single_sample() {
        let data = Array2::<f64>::zeros((1, 3));
        assert!(IsolationForest::fit(&data, &TrainingConfig::default()).is_err());
    }
}
