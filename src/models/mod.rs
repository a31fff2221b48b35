/// Регрессионные модели

pub mod forest;
pub mod linear;
pub mod tree;
pub mod tuning;

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use forest::{ForestParams, RandomForest};
pub use linear::LinearModel;
pub use tree::{RegressionTree, TreeParams};
pub use tuning::{GridSearch, ParamGrid, SearchResult};

/// Общий интерфейс оценщиков
pub trait Regressor {
    fn name(&self) -> &'static str;

    #[allow(non_snake_case)]
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    #[allow(non_snake_case)]
    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>>;

    /// Важность признаков по колонкам матрицы; только для деревьев
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimatorKind {
    Linear,
    DecisionTree,
    #[default]
    RandomForest,
}

impl EstimatorKind {
    pub const ALL: [EstimatorKind; 3] = [Self::Linear, Self::DecisionTree, Self::RandomForest];

    pub fn supports_tuning(&self) -> bool {
        !matches!(self, Self::Linear)
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::DecisionTree => write!(f, "decision-tree"),
            Self::RandomForest => write!(f, "random-forest"),
        }
    }
}

impl FromStr for EstimatorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "decision-tree" | "tree" => Ok(Self::DecisionTree),
            "random-forest" | "forest" => Ok(Self::RandomForest),
            other => Err(format!("unknown estimator '{}'", other)),
        }
    }
}

/// Дерево берет параметры из настроек леса, кроме числа деревьев и bootstrap
pub fn build_estimator(kind: EstimatorKind, params: &ForestParams, seed: u64) -> Box<dyn Regressor> {
    match kind {
        EstimatorKind::Linear => Box::new(LinearModel::new()),
        EstimatorKind::DecisionTree => Box::new(RegressionTree::new(params.tree_params(), seed)),
        EstimatorKind::RandomForest => Box::new(RandomForest::new(*params, seed)),
    }
}
