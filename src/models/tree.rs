//! Дерево решений для регрессии (CART, критерий MSE)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Regressor;

/// Параметры одного дерева
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` — без ограничения глубины
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Сколько признаков рассматривать в узле; `None` — все
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    params: TreeParams,
    seed: u64,
    root: Option<TreeNode>,
    importances: Option<Array1<f64>>,
    n_features: usize,
}

impl RegressionTree {
    pub fn new(params: TreeParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            root: None,
            importances: None,
            n_features: 0,
        }
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Обучение на подмножестве строк (повторы допустимы, для bootstrap)
    pub(crate) fn fit_indices(
        &mut self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
    ) -> Result<()> {
        if X.nrows() != y.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} rows in X, {} targets",
                X.nrows(),
                y.len()
            )));
        }
        if indices.is_empty() || X.ncols() == 0 {
            return Err(Error::EmptyData("Empty dataset".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut importances = Array1::zeros(X.ncols());
        let root = self.build_tree(X, y, indices, 0, &mut rng, &mut importances);

        let total = importances.sum();
        if total > 0.0 {
            importances /= total;
        }

        self.root = Some(root);
        self.importances = Some(importances);
        self.n_features = X.ncols();
        Ok(())
    }

    fn build_tree(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
        importances: &mut Array1<f64>,
    ) -> TreeNode {
        let n = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;
        let node_sse: f64 = indices.iter().map(|&i| (y[i] - mean).powi(2)).sum();

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || node_sse <= 1e-12
        {
            return TreeNode::Leaf { value: mean };
        }

        let mut features: Vec<usize> = (0..X.ncols()).collect();
        if let Some(k) = self.params.max_features.filter(|&k| k > 0 && k < features.len()) {
            features.shuffle(rng);
            features.truncate(k);
        }

        let best = features
            .iter()
            .filter_map(|&feature| self.best_threshold(X.column(feature), y, &indices, feature))
            .fold(None::<BestSplit>, |best, candidate| match best {
                Some(b) if b.sse <= candidate.sse => Some(b),
                _ => Some(candidate),
            });

        let Some(best) = best else {
            return TreeNode::Leaf { value: mean };
        };

        importances[best.feature] += (node_sse - best.sse).max(0.0);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| X[[i, best.feature]] <= best.threshold);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build_tree(X, y, left_indices, depth + 1, rng, importances)),
            right: Box::new(self.build_tree(X, y, right_indices, depth + 1, rng, importances)),
        }
    }

    /// Перебор порогов по серединам между соседними различными значениями
    fn best_threshold(
        &self,
        column: ArrayView1<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature: usize,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut pairs: Vec<(f64, f64)> = indices.iter().map(|&i| (column[i], y[i])).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
        let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        let mut best: Option<BestSplit> = None;

        for k in 1..n {
            let (prev_x, prev_y) = pairs[k - 1];
            left_sum += prev_y;
            left_sq += prev_y * prev_y;

            let next_x = pairs[k].0;
            if next_x <= prev_x || k < min_leaf || n - k < min_leaf {
                continue;
            }

            let n_left = k as f64;
            let n_right = (n - k) as f64;
            let right_sum = total_sum - left_sum;
            let left_sse = left_sq - left_sum * left_sum / n_left;
            let right_sse = (total_sq - left_sq) - right_sum * right_sum / n_right;
            let sse = left_sse + right_sse;

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                let mut threshold = (prev_x + next_x) / 2.0;
                if threshold >= next_x {
                    threshold = prev_x;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    sse,
                });
            }
        }

        best
    }

    fn predict_single(&self, node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    self.predict_single(left, sample)
                } else {
                    self.predict_single(right, sample)
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        self.root.as_ref().map(depth_of).unwrap_or(0)
    }
}

/// Матрица для прогноза должна иметь столько же колонок, сколько при обучении
pub(crate) fn check_width(X: &Array2<f64>, n_features: usize) -> Result<()> {
    if X.ncols() != n_features {
        return Err(Error::ShapeMismatch(format!(
            "model trained on {} features, got {}",
            n_features,
            X.ncols()
        )));
    }
    Ok(())
}

impl Regressor for RegressionTree {
    fn name(&self) -> &'static str {
        "decision-tree"
    }

    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fit_indices(X, y, (0..X.nrows()).collect())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| Error::Model("Model not trained".to_string()))?;
        check_width(X, self.n_features)?;

        Ok(X.rows()
            .into_iter()
            .map(|row| self.predict_single(root, row))
            .collect())
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn fits_step_function_exactly() {
        let X = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 20.0, 20.0, 20.0];

        let mut tree = RegressionTree::new(TreeParams::default(), 0);
        tree.fit(&X, &y).unwrap();

        let pred = tree.predict(&array![[0.0], [2.5], [6.4], [6.6], [100.0]]).unwrap();
        assert_eq!(pred.to_vec(), vec![5.0, 5.0, 5.0, 20.0, 20.0]);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn importances_follow_informative_feature() {
        // второй признак — шум, цель зависит только от первого
        let X = array![
            [1.0, 7.0],
            [2.0, 3.0],
            [3.0, 7.0],
            [4.0, 3.0],
            [5.0, 7.0],
            [6.0, 3.0]
        ];
        let y = array![1.0, 1.0, 1.0, 9.0, 9.0, 9.0];

        let mut tree = RegressionTree::new(TreeParams::default(), 0);
        tree.fit(&X, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_abs_diff_eq!(importances[0], 1.0);
        assert_abs_diff_eq!(importances[1], 0.0);
    }

    #[test]
    fn narrower_matrix_is_rejected() {
        let X = array![[1.0, 0.0], [2.0, 1.0], [8.0, 0.0], [9.0, 1.0]];
        let y = array![1.0, 1.0, 5.0, 5.0];
        let mut tree = RegressionTree::new(TreeParams::default(), 0);
        tree.fit(&X, &y).unwrap();

        let err = tree.predict(&array![[1.0], [9.0]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn respects_depth_and_leaf_limits() {
        let X = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let mut shallow = RegressionTree::new(
            TreeParams {
                max_depth: Some(1),
                ..TreeParams::default()
            },
            0,
        );
        shallow.fit(&X, &y).unwrap();
        assert_eq!(shallow.depth(), 1);

        let mut leafy = RegressionTree::new(
            TreeParams {
                min_samples_leaf: 4,
                ..TreeParams::default()
            },
            0,
        );
        leafy.fit(&X, &y).unwrap();
        let pred = leafy.predict(&X).unwrap();
        assert_abs_diff_eq!(pred[0], 2.5);
        assert_abs_diff_eq!(pred[7], 6.5);
    }

    #[test]
    fn constant_target_is_single_leaf() {
        let X = array![[1.0], [2.0], [3.0]];
        let y = array![4.0, 4.0, 4.0];
        let mut tree = RegressionTree::new(TreeParams::default(), 0);
        tree.fit(&X, &y).unwrap();
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.feature_importances().unwrap().to_vec(), vec![0.0]);
    }

    #[test]
    fn untrained_or_empty_is_error() {
        let tree = RegressionTree::new(TreeParams::default(), 0);
        assert!(matches!(tree.predict(&array![[1.0]]), Err(Error::Model(_))));

        let mut tree = RegressionTree::new(TreeParams::default(), 0);
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(tree.fit(&empty, &Array1::zeros(0)).is_err());
    }
}
