//! Подбор гиперпараметров по сетке с кросс-валидацией
//!
//! Кодировщик категорий переобучается на обучающей части каждого фолда,
//! поэтому оценка на валидационной части не видит ее целевых значений.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::evaluation::RegressionMetrics;
use crate::models::{build_estimator, EstimatorKind, ForestParams, Regressor};
use crate::preprocessing::encoding::EncodingStrategy;
use crate::preprocessing::feature_engineering::{EncodedSplit, FeatureEngineer, ModelingData};
use crate::split::k_fold;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGrid {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: Vec<usize>,
    #[serde(default = "default_max_depth")]
    pub max_depth: Vec<Option<usize>>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: Vec<usize>,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: Vec<usize>,
}

fn default_n_estimators() -> Vec<usize> { vec![100, 200, 300] }
fn default_max_depth() -> Vec<Option<usize>> { vec![None, Some(10), Some(20)] }
fn default_min_samples_split() -> Vec<usize> { vec![2, 5, 10] }
fn default_min_samples_leaf() -> Vec<usize> { vec![1, 2, 4] }

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
        }
    }
}

impl ParamGrid {
    /// Декартово произведение; число деревьев меняется быстрее всего.
    /// Для одиночного дерева число деревьев не перебирается.
    pub fn candidates(&self, kind: EstimatorKind, base: &ForestParams) -> Vec<ForestParams> {
        let n_estimators = match kind {
            EstimatorKind::RandomForest if !self.n_estimators.is_empty() => self.n_estimators.clone(),
            _ => vec![base.n_estimators],
        };
        let max_depth = non_empty_or(&self.max_depth, base.max_depth);
        let min_split = non_empty_or(&self.min_samples_split, base.min_samples_split);
        let min_leaf = non_empty_or(&self.min_samples_leaf, base.min_samples_leaf);

        let mut candidates = Vec::new();
        for &depth in &max_depth {
            for &leaf in &min_leaf {
                for &split in &min_split {
                    for &trees in &n_estimators {
                        candidates.push(ForestParams {
                            n_estimators: trees,
                            max_depth: depth,
                            min_samples_split: split,
                            min_samples_leaf: leaf,
                            ..*base
                        });
                    }
                }
            }
        }
        candidates
    }
}

fn non_empty_or<T: Copy>(values: &[T], fallback: T) -> Vec<T> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    /// Среднее отрицательное MAE по фолдам
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub best_params: ForestParams,
    pub best_score: f64,
    pub folds: usize,
    pub scores: Vec<CandidateScore>,
}

/// Закодированный фолд: матрицы и цели обучающей и валидационной частей
#[derive(Debug, Clone)]
pub struct EncodedFold {
    pub encoded: EncodedSplit,
    pub y_train: Array1<f64>,
    pub y_valid: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    folds: usize,
}

impl GridSearch {
    pub fn new(grid: ParamGrid, folds: usize) -> Self {
        Self { grid, folds }
    }

    /// Кодировщик обучается заново на обучающей части каждого фолда.
    /// Кодирование не зависит от кандидата, поэтому считается один раз.
    pub fn encode_folds(
        &self,
        data: &ModelingData,
        encoding: Option<EncodingStrategy>,
        smoothing: f64,
    ) -> Result<Vec<EncodedFold>> {
        k_fold(data.n_samples(), self.folds)?
            .iter()
            .map(|fold| {
                let train = data.subset(&fold.train);
                let valid = data.subset(&fold.test);
                let encoded = FeatureEngineer::encode_split(&train, &valid, encoding, smoothing)?;
                Ok(EncodedFold {
                    encoded,
                    y_train: train.target,
                    y_valid: valid.target,
                })
            })
            .collect()
    }

    pub fn search(
        &self,
        kind: EstimatorKind,
        data: &ModelingData,
        encoding: Option<EncodingStrategy>,
        smoothing: f64,
        base: &ForestParams,
        seed: u64,
    ) -> Result<SearchResult> {
        if !kind.supports_tuning() {
            return Err(Error::Config(format!("{} has no hyperparameters to tune", kind)));
        }

        let fold_data = self.encode_folds(data, encoding, smoothing)?;

        let candidates = self.grid.candidates(kind, base);
        tracing::info!(
            "Grid search: {} candidates x {} folds for {}",
            candidates.len(),
            self.folds,
            kind
        );

        let mut scores = Vec::with_capacity(candidates.len());
        let mut best: Option<CandidateScore> = None;

        for params in candidates {
            params.validate()?;

            let mut total_mae = 0.0;
            for fold in &fold_data {
                let mut model = build_estimator(kind, &params, seed);
                model.fit(&fold.encoded.X_train, &fold.y_train)?;
                let y_pred = model.predict(&fold.encoded.X_test)?;
                total_mae += RegressionMetrics::compute(&fold.y_valid, &y_pred)?.mae;
            }

            let candidate = CandidateScore {
                params,
                score: -total_mae / fold_data.len() as f64,
            };
            tracing::debug!("{:?} -> {:.4}", candidate.params, candidate.score);

            if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate.clone());
            }
            scores.push(candidate);
        }

        let best = best.ok_or_else(|| Error::Config("empty parameter grid".to_string()))?;
        tracing::info!(
            "Best parameters: {:?} (neg MAE {:.4})",
            best.params,
            best.score
        );

        Ok(SearchResult {
            best_params: best.params,
            best_score: best.score,
            folds: self.folds,
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn data(n: usize) -> ModelingData {
        let numeric = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let target = Array1::from_shape_fn(n, |i| if i % 10 < 5 { 1.0 } else { 9.0 });
        ModelingData {
            numeric_names: vec!["x".to_string()],
            categorical_names: vec!["g".to_string()],
            numeric,
            categorical: vec![(0..n).map(|i| format!("g{}", i % 10 / 5)).collect()],
            target,
            source_rows: (0..n).collect(),
        }
    }

    #[test]
    fn default_grid_matches_reference_search_space() {
        let grid = ParamGrid::default();
        let base = ForestParams::default();
        assert_eq!(grid.candidates(EstimatorKind::RandomForest, &base).len(), 81);
        assert_eq!(grid.candidates(EstimatorKind::DecisionTree, &base).len(), 27);
    }

    #[test]
    fn candidate_order_is_stable() {
        let grid = ParamGrid {
            n_estimators: vec![5, 10],
            max_depth: vec![Some(1)],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1, 3],
        };
        let c = grid.candidates(EstimatorKind::RandomForest, &ForestParams::default());
        let pairs: Vec<_> = c.iter().map(|p| (p.min_samples_leaf, p.n_estimators)).collect();
        assert_eq!(pairs, vec![(1, 5), (1, 10), (3, 5), (3, 10)]);
    }

    #[test]
    fn best_score_dominates_all_candidates() {
        let grid = ParamGrid {
            n_estimators: vec![],
            max_depth: vec![Some(1), None],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        };
        let search = GridSearch::new(grid, 5);
        let result = search
            .search(
                EstimatorKind::DecisionTree,
                &data(50),
                Some(EncodingStrategy::TargetMean),
                0.0,
                &ForestParams::default(),
                42,
            )
            .unwrap();

        assert_eq!(result.scores.len(), 2);
        assert!(result.best_score <= 0.0);
        assert!(result.scores.iter().all(|c| c.score <= result.best_score));
        assert_eq!(result.folds, 5);
    }

    #[test]
    fn validation_targets_never_reach_fold_encoding() {
        // 10 строк, 5 фолдов по 2; категория "z" есть только в последнем валидационном фолде
        let n = 10;
        let mut base = ModelingData {
            numeric_names: vec!["x".to_string()],
            categorical_names: vec!["g".to_string()],
            numeric: Array2::from_shape_fn((n, 1), |(i, _)| i as f64),
            categorical: vec![(0..n)
                .map(|i| match i {
                    8 | 9 => "z".to_string(),
                    _ if i % 2 == 0 => "a".to_string(),
                    _ => "b".to_string(),
                })
                .collect()],
            target: Array1::from_shape_fn(n, |i| i as f64),
            source_rows: (0..n).collect(),
        };

        let search = GridSearch::new(ParamGrid::default(), 5);
        let before = search
            .encode_folds(&base, Some(EncodingStrategy::TargetMean), 0.0)
            .unwrap();

        base.target[8] = 1000.0;
        base.target[9] = -1000.0;
        let after = search
            .encode_folds(&base, Some(EncodingStrategy::TargetMean), 0.0)
            .unwrap();

        let last_before = &before[4].encoded;
        let last_after = &after[4].encoded;
        assert_eq!(last_before.X_train, last_after.X_train);
        assert_eq!(last_before.X_test, last_after.X_test);

        // неизвестная категория получает среднее цели обучающей части фолда
        let fold_prior = (0..8).map(|i| i as f64).sum::<f64>() / 8.0;
        assert_eq!(last_after.X_test[[0, 1]], fold_prior);
        assert_eq!(last_after.X_test[[1, 1]], fold_prior);
        assert_eq!(after[4].y_valid.to_vec(), vec![1000.0, -1000.0]);
    }

    #[test]
    fn linear_model_is_not_tunable() {
        let search = GridSearch::new(ParamGrid::default(), 3);
        let err = search
            .search(EstimatorKind::Linear, &data(10), None, 0.0, &ForestParams::default(), 0)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
