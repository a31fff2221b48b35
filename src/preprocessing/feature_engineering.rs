//! Построение матрицы признаков из очищенной таблицы

#![allow(non_snake_case)]

use ndarray::{concatenate, Array1, Array2, Axis};

use crate::error::{Error, Result};
use crate::preprocessing::encoding::{CategoricalEncoder, EncodingStrategy, FittedCategoricalEncoder};
use crate::preprocessing::numeric::parse_number;
use crate::table::Table;

/// Выбранные колонки в виде, пригодном для обучения
#[derive(Debug, Clone, PartialEq)]
pub struct ModelingData {
    pub numeric_names: Vec<String>,
    pub categorical_names: Vec<String>,
    /// `n_samples x n_numeric`
    pub numeric: Array2<f64>,
    /// По колонкам: `categorical[j][i]`
    pub categorical: Vec<Vec<String>>,
    pub target: Array1<f64>,
    /// Номера строк исходной таблицы
    pub source_rows: Vec<usize>,
}

impl ModelingData {
    pub fn n_samples(&self) -> usize {
        self.target.len()
    }

    /// Подвыборка строк в заданном порядке
    pub fn subset(&self, indices: &[usize]) -> ModelingData {
        ModelingData {
            numeric_names: self.numeric_names.clone(),
            categorical_names: self.categorical_names.clone(),
            numeric: self.numeric.select(Axis(0), indices),
            categorical: self
                .categorical
                .iter()
                .map(|column| indices.iter().map(|&i| column[i].clone()).collect())
                .collect(),
            target: self.target.select(Axis(0), indices),
            source_rows: indices.iter().map(|&i| self.source_rows[i]).collect(),
        }
    }

    /// Имена колонок итоговой матрицы: числовые, затем закодированные
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric_names
            .iter()
            .chain(self.categorical_names.iter())
            .cloned()
            .collect()
    }

    pub fn target_slice(&self) -> Vec<f64> {
        self.target.to_vec()
    }
}

/// Закодированные обучающая и тестовая матрицы
#[derive(Debug, Clone)]
pub struct EncodedSplit {
    pub X_train: Array2<f64>,
    pub X_test: Array2<f64>,
    pub feature_names: Vec<String>,
    pub encoder: Option<FittedCategoricalEncoder>,
}

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Извлекает цель, числовые и категориальные колонки.
    /// Строки с пропуском в любой выбранной колонке исключаются.
    pub fn extract(
        table: &Table,
        target: &str,
        numeric: &[String],
        categorical: &[String],
    ) -> Result<ModelingData> {
        if numeric.is_empty() && categorical.is_empty() {
            return Err(Error::Config("no predictor columns selected".to_string()));
        }

        let target_idx = table.column_index(target)?;
        let numeric_idx = table.require_columns(numeric)?;
        let categorical_idx = table.require_columns(categorical)?;

        let mut numeric_values: Vec<f64> = Vec::new();
        let mut categorical_values: Vec<Vec<String>> = vec![Vec::new(); categorical.len()];
        let mut targets: Vec<f64> = Vec::new();
        let mut source_rows = Vec::new();
        let mut skipped = 0;

        for (row_idx, row) in table.rows().iter().enumerate() {
            let complete = row[target_idx].is_some()
                && numeric_idx.iter().all(|&c| row[c].is_some())
                && categorical_idx.iter().all(|&c| row[c].is_some());
            if !complete {
                skipped += 1;
                continue;
            }

            targets.push(parse_cell(table, row_idx, target_idx)?);
            for &col in &numeric_idx {
                numeric_values.push(parse_cell(table, row_idx, col)?);
            }
            for (j, &col) in categorical_idx.iter().enumerate() {
                let value = row[col].as_deref().unwrap_or_default().trim().to_string();
                categorical_values[j].push(value);
            }
            source_rows.push(row_idx);
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} incomplete rows before modeling", skipped);
        }
        if targets.is_empty() {
            return Err(Error::EmptyData(
                "no complete rows for the selected columns".to_string(),
            ));
        }

        let n_samples = targets.len();
        let numeric_matrix = Array2::from_shape_vec((n_samples, numeric.len()), numeric_values)
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;

        tracing::debug!(
            "Extracted {} samples, {} numeric and {} categorical features",
            n_samples,
            numeric.len(),
            categorical.len()
        );

        Ok(ModelingData {
            numeric_names: numeric.to_vec(),
            categorical_names: categorical.to_vec(),
            numeric: numeric_matrix,
            categorical: categorical_values,
            target: Array1::from(targets),
            source_rows,
        })
    }

    /// Кодировщик обучается только на `train` и применяется к обеим частям.
    /// `encoding == None` оставляет только числовые признаки.
    pub fn encode_split(
        train: &ModelingData,
        test: &ModelingData,
        encoding: Option<EncodingStrategy>,
        smoothing: f64,
    ) -> Result<EncodedSplit> {
        let strategy = match encoding {
            Some(strategy) if !train.categorical_names.is_empty() => strategy,
            _ => {
                if train.numeric_names.is_empty() {
                    return Err(Error::Config(
                        "categoricals excluded and no numeric features left".to_string(),
                    ));
                }
                return Ok(EncodedSplit {
                    X_train: train.numeric.clone(),
                    X_test: test.numeric.clone(),
                    feature_names: train.numeric_names.clone(),
                    encoder: None,
                });
            }
        };

        let encoder = CategoricalEncoder::new(strategy)
            .with_smoothing(smoothing)
            .fit(&train.categorical, &train.target_slice())?;

        let X_train = Self::assemble(&train.numeric, &encoder.transform(&train.categorical)?)?;
        let X_test = Self::assemble(&test.numeric, &encoder.transform(&test.categorical)?)?;

        Ok(EncodedSplit {
            X_train,
            X_test,
            feature_names: train.feature_names(),
            encoder: Some(encoder),
        })
    }

    fn assemble(numeric: &Array2<f64>, encoded: &Array2<f64>) -> Result<Array2<f64>> {
        concatenate(Axis(1), &[numeric.view(), encoded.view()])
            .map_err(|e| Error::ShapeMismatch(e.to_string()))
    }
}

fn parse_cell(table: &Table, row: usize, col: usize) -> Result<f64> {
    let value = table.cell(row, col).unwrap_or_default();
    parse_number(value).ok_or_else(|| Error::InvalidNumber {
        column: table.headers()[col].clone(),
        // номер строки в файле: заголовок занимает первую
        row: row + 2,
        value: value.to_string(),
    })
}
