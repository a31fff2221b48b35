//! Единый конфигурируемый конвейер моделирования

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::evaluation::{rank_importances, FeatureImportance, RegressionMetrics};
use crate::models::{build_estimator, EstimatorKind, ForestParams, GridSearch, ParamGrid};
use crate::preprocessing::{EncodingStrategy, FeatureEngineer, ModelingData};
use crate::split::{train_test_split, Split};
use crate::table::Table;
use crate::types::{ModelingReport, TuningSummary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelingConfig {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_numeric_features")]
    pub numeric_features: Vec<String>,
    #[serde(default = "default_categorical_features")]
    pub categorical_features: Vec<String>,
    #[serde(default = "default_true")]
    pub include_categoricals: bool,
    #[serde(default)]
    pub encoding: EncodingStrategy,
    /// Сглаживание target-mean кодирования
    #[serde(default)]
    pub smoothing: f64,
    #[serde(default)]
    pub estimator: EstimatorKind,
    #[serde(default)]
    pub tune_hyperparameters: bool,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub forest: ForestParams,
    #[serde(default)]
    pub grid: ParamGrid,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
}

fn default_target() -> String {
    "TPSent_12_meses_num".to_string()
}

fn default_numeric_features() -> Vec<String> {
    [
        "TPCPL_Dec_2024_num",
        "Conc100_Dec_2024",
        "CN_12_meses",
        "Desp_12_meses",
        "Sus_Dec_2023",
        "Sus_Dec_2024",
        "Tbaix_12_meses",
        "CP_Dec_2024",
        "SentCM_12_meses",
        "SentSM_12_meses",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_categorical_features() -> Vec<String> {
    ["Nome orgao", "Municipio", "Grau"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_cv_folds() -> usize {
    5
}

impl Default for ModelingConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            numeric_features: default_numeric_features(),
            categorical_features: default_categorical_features(),
            include_categoricals: true,
            encoding: EncodingStrategy::default(),
            smoothing: 0.0,
            estimator: EstimatorKind::default(),
            tune_hyperparameters: false,
            test_size: default_test_size(),
            seed: default_seed(),
            forest: ForestParams::default(),
            grid: ParamGrid::default(),
            cv_folds: default_cv_folds(),
        }
    }
}

impl ModelingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(Error::Config("target column is empty".to_string()));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(Error::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if !self.smoothing.is_finite() || self.smoothing < 0.0 {
            return Err(Error::Config(format!(
                "smoothing must be non-negative, got {}",
                self.smoothing
            )));
        }
        if self.tune_hyperparameters && self.cv_folds < 2 {
            return Err(Error::Config(format!(
                "need at least 2 folds, got {}",
                self.cv_folds
            )));
        }
        if self.selected_categoricals().is_empty() && self.numeric_features.is_empty() {
            return Err(Error::Config("no predictor columns selected".to_string()));
        }
        self.forest.validate()
    }

    /// Категориальные колонки с учетом флага `include_categoricals`
    pub fn selected_categoricals(&self) -> &[String] {
        if self.include_categoricals {
            &self.categorical_features
        } else {
            &[]
        }
    }

    /// `None` означает только числовые признаки
    pub fn effective_encoding(&self) -> Option<EncodingStrategy> {
        if self.include_categoricals && !self.categorical_features.is_empty() {
            Some(self.encoding)
        } else {
            None
        }
    }
}

/// Подготовленные данные и разбиение, общие для нескольких оценщиков
struct Prepared {
    data: ModelingData,
    split: Split,
    train: ModelingData,
    test: ModelingData,
}

fn prepare(table: &Table, config: &ModelingConfig) -> Result<Prepared> {
    config.validate()?;

    let data = FeatureEngineer::extract(
        table,
        &config.target,
        &config.numeric_features,
        config.selected_categoricals(),
    )?;
    let split = train_test_split(data.n_samples(), config.test_size, config.seed)?;
    let train = data.subset(&split.train);
    let test = data.subset(&split.test);

    tracing::info!(
        "Split {} samples: {} train / {} test (seed {})",
        data.n_samples(),
        train.n_samples(),
        test.n_samples(),
        config.seed
    );

    Ok(Prepared {
        data,
        split,
        train,
        test,
    })
}

/// Обучает один оценщик на обучающей части и оценивает на тестовой
pub fn evaluate_split(
    kind: EstimatorKind,
    params: &ForestParams,
    train: &ModelingData,
    test: &ModelingData,
    encoding: Option<EncodingStrategy>,
    smoothing: f64,
    seed: u64,
) -> Result<(RegressionMetrics, Vec<FeatureImportance>)> {
    let encoded = FeatureEngineer::encode_split(train, test, encoding, smoothing)?;

    let mut model = build_estimator(kind, params, seed);
    model.fit(&encoded.X_train, &train.target)?;
    let y_pred = model.predict(&encoded.X_test)?;
    let metrics = RegressionMetrics::compute(&test.target, &y_pred)?;

    let importances = match model.feature_importances() {
        Some(scores) => rank_importances(&encoded.feature_names, &scores)?,
        None => Vec::new(),
    };

    Ok((metrics, importances))
}

fn fit_and_report(kind: EstimatorKind, prepared: &Prepared, config: &ModelingConfig) -> Result<ModelingReport> {
    let encoding = config.effective_encoding();

    let mut params = config.forest;
    let mut tuning = None;

    if config.tune_hyperparameters {
        if kind.supports_tuning() {
            let search = GridSearch::new(config.grid.clone(), config.cv_folds);
            let result = search.search(kind, &prepared.train, encoding, config.smoothing, &params, config.seed)?;
            tuning = Some(TuningSummary {
                best_params: result.best_params,
                best_score: result.best_score,
                folds: result.folds,
                candidates: result.scores.len(),
            });
            params = result.best_params;
        } else {
            tracing::warn!("{} has no hyperparameters, tuning skipped", kind);
        }
    }

    let (metrics, feature_importances) = evaluate_split(
        kind,
        &params,
        &prepared.train,
        &prepared.test,
        encoding,
        config.smoothing,
        config.seed,
    )?;

    tracing::info!(
        "{}: MAE {:.4}, RMSE {:.4}, R2 {:.4}",
        kind,
        metrics.mae,
        metrics.rmse,
        metrics.r2
    );

    Ok(ModelingReport {
        generated_at: Utc::now(),
        estimator: kind,
        encoding,
        n_samples: prepared.data.n_samples(),
        n_train: prepared.split.train.len(),
        n_test: prepared.split.test.len(),
        params: kind.supports_tuning().then_some(params),
        metrics,
        feature_importances,
        tuning,
        train_rows: prepared.train.source_rows.clone(),
        test_rows: prepared.test.source_rows.clone(),
    })
}

/// Полный прогон для оценщика из настроек
pub fn run_modeling(table: &Table, config: &ModelingConfig) -> Result<ModelingReport> {
    let prepared = prepare(table, config)?;
    fit_and_report(config.estimator, &prepared, config)
}

/// Все оценщики на одном и том же разбиении, лучший по R2 первым
pub fn compare_estimators(table: &Table, config: &ModelingConfig) -> Result<Vec<ModelingReport>> {
    let prepared = prepare(table, config)?;

    let mut reports = EstimatorKind::ALL
        .iter()
        .map(|&kind| fit_and_report(kind, &prepared, config))
        .collect::<Result<Vec<_>>>()?;

    reports.sort_by(|a, b| b.metrics.r2.total_cmp(&a.metrics.r2));
    Ok(reports)
}
