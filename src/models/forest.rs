//! Случайный лес для регрессии

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::tree::{check_width, RegressionTree, TreeParams};
use crate::models::Regressor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default)]
    pub max_features: Option<usize>,
    #[serde(default = "default_bootstrap")]
    pub bootstrap: bool,
}

fn default_n_estimators() -> usize { 100 }
fn default_min_samples_split() -> usize { 2 }
fn default_min_samples_leaf() -> usize { 1 }
fn default_bootstrap() -> bool { true }

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: None,
            bootstrap: default_bootstrap(),
        }
    }
}

impl ForestParams {
    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::Config("n_estimators must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(Error::Config("min_samples_split must be at least 2".to_string()));
        }
        if self.min_samples_leaf == 0 {
            return Err(Error::Config("min_samples_leaf must be at least 1".to_string()));
        }
        if self.max_depth == Some(0) {
            return Err(Error::Config("max_depth must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    params: ForestParams,
    seed: u64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn name(&self) -> &'static str {
        "random-forest"
    }

    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.params.validate()?;
        let n_samples = X.nrows();
        if n_samples == 0 {
            return Err(Error::EmptyData("Empty dataset".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let tree_params = self.params.tree_params();

        let mut trees = Vec::with_capacity(self.params.n_estimators);
        for _ in 0..self.params.n_estimators {
            let tree_seed: u64 = rng.gen();
            let indices: Vec<usize> = if self.params.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let mut tree = RegressionTree::new(tree_params, tree_seed);
            tree.fit_indices(X, y, indices)?;
            trees.push(tree);
        }

        self.trees = trees;
        self.n_features = X.ncols();
        tracing::debug!("Random forest trained: {} trees", self.trees.len());
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(Error::Model("Model not trained".to_string()));
        }
        check_width(X, self.n_features)?;

        let mut sum: Array1<f64> = Array1::zeros(X.nrows());
        for tree in &self.trees {
            sum += &tree.predict(X)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.trees.is_empty() {
            return None;
        }

        let mut total: Array1<f64> = Array1::zeros(self.n_features);
        for importances in self.trees.iter().filter_map(|t| t.feature_importances()) {
            total += &importances;
        }

        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        Some(total)
    }
}
