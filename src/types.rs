/// Типы отчетов

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::evaluation::{FeatureImportance, RegressionMetrics};
use crate::models::{EstimatorKind, ForestParams};
use crate::preprocessing::EncodingStrategy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedColumnSummary {
    pub source: String,
    pub derived: String,
    pub parsed: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_dropped: usize,
    pub cells_filled: usize,
    pub derived_columns: Vec<DerivedColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningSummary {
    pub best_params: ForestParams,
    pub best_score: f64,
    pub folds: usize,
    pub candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelingReport {
    pub generated_at: DateTime<Utc>,
    pub estimator: EstimatorKind,
    /// `None` — только числовые признаки
    pub encoding: Option<EncodingStrategy>,
    pub n_samples: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub params: Option<ForestParams>,
    pub metrics: RegressionMetrics,
    pub feature_importances: Vec<FeatureImportance>,
    pub tuning: Option<TuningSummary>,
    /// Номера строк очищенной таблицы
    #[serde(skip_serializing)]
    pub train_rows: Vec<usize>,
    #[serde(skip_serializing)]
    pub test_rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Выборочное (n - 1); `None` при count < 2
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub column: String,
    pub pearson: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub group: String,
    pub mean_target: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAnalysis {
    pub column: String,
    pub n_groups: usize,
    /// Наибольшее среднее значение цели
    pub slowest: Vec<GroupStat>,
    pub largest: Vec<GroupStat>,
    /// То же, только группы с числом строк не меньше порога
    pub slowest_filtered: Vec<GroupStat>,
    pub largest_filtered: Vec<GroupStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExploratoryReport {
    pub n_rows: usize,
    pub n_columns: usize,
    pub missing: Vec<MissingCount>,
    pub numeric_summary: Vec<ColumnSummary>,
    pub target_correlations: Vec<Correlation>,
    pub groups: Vec<GroupAnalysis>,
    pub demand_index: Option<ColumnSummary>,
}
