//! Кодирование категориальных признаков
//!
//! Все кодировщики обучаются только на обучающей выборке: `fit` возвращает
//! отдельный обученный объект, `transform` которого не видит целевую
//! переменную и не меняет выученные значения.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingStrategy {
    /// Среднее значение цели по категории
    #[default]
    TargetMean,
    /// Порядковый номер категории
    Ordinal,
}

impl fmt::Display for EncodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetMean => write!(f, "target-mean"),
            Self::Ordinal => write!(f, "ordinal"),
        }
    }
}

impl FromStr for EncodingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "target-mean" | "target" => Ok(Self::TargetMean),
            "ordinal" => Ok(Self::Ordinal),
            other => Err(format!("unknown encoding strategy '{}'", other)),
        }
    }
}

/// Target-mean encoder (необученный)
#[derive(Debug, Clone, Default)]
pub struct TargetEncoder {
    /// Вес глобального среднего: `(sum + m * prior) / (count + m)`
    smoothing: f64,
}

impl TargetEncoder {
    pub fn new() -> Self {
        Self { smoothing: 0.0 }
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing.max(0.0);
        self
    }

    pub fn fit<S: AsRef<str>>(&self, categories: &[S], targets: &[f64]) -> Result<FittedTargetEncoder> {
        if categories.len() != targets.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} categories for {} targets",
                categories.len(),
                targets.len()
            )));
        }
        if targets.is_empty() {
            return Err(Error::EmptyData(
                "cannot fit target encoder on empty data".to_string(),
            ));
        }

        let prior = targets.iter().sum::<f64>() / targets.len() as f64;

        let mut stats: HashMap<String, (f64, usize)> = HashMap::new();
        for (category, &target) in categories.iter().zip(targets) {
            let entry = stats.entry(category.as_ref().to_string()).or_insert((0.0, 0));
            entry.0 += target;
            entry.1 += 1;
        }

        let m = self.smoothing;
        let means = stats
            .into_iter()
            .map(|(category, (sum, count))| {
                (category, (sum + m * prior) / (count as f64 + m))
            })
            .collect();

        Ok(FittedTargetEncoder { means, prior })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedTargetEncoder {
    means: HashMap<String, f64>,
    prior: f64,
}

impl FittedTargetEncoder {
    /// Глобальное среднее обучающей выборки; значение для новых категорий
    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn category_value(&self, category: &str) -> Option<f64> {
        self.means.get(category).copied()
    }

    pub fn encode(&self, category: &str) -> f64 {
        self.category_value(category).unwrap_or(self.prior)
    }

    pub fn transform<S: AsRef<str>>(&self, categories: &[S]) -> Vec<f64> {
        categories.iter().map(|c| self.encode(c.as_ref())).collect()
    }

    pub fn n_categories(&self) -> usize {
        self.means.len()
    }
}

/// Ordinal encoder: категории сортируются, новые получают -1
#[derive(Debug, Clone, Default)]
pub struct OrdinalEncoder;

impl OrdinalEncoder {
    pub fn fit<S: AsRef<str>>(&self, categories: &[S]) -> Result<FittedOrdinalEncoder> {
        if categories.is_empty() {
            return Err(Error::EmptyData(
                "cannot fit ordinal encoder on empty data".to_string(),
            ));
        }

        let sorted: BTreeSet<&str> = categories.iter().map(|c| c.as_ref()).collect();
        let codes = sorted
            .into_iter()
            .enumerate()
            .map(|(code, category)| (category.to_string(), code))
            .collect();

        Ok(FittedOrdinalEncoder { codes })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedOrdinalEncoder {
    codes: HashMap<String, usize>,
}

impl FittedOrdinalEncoder {
    pub const UNKNOWN: f64 = -1.0;

    pub fn encode(&self, category: &str) -> f64 {
        self.codes
            .get(category)
            .map(|&c| c as f64)
            .unwrap_or(Self::UNKNOWN)
    }

    pub fn transform<S: AsRef<str>>(&self, categories: &[S]) -> Vec<f64> {
        categories.iter().map(|c| self.encode(c.as_ref())).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FittedColumnEncoder {
    TargetMean(FittedTargetEncoder),
    Ordinal(FittedOrdinalEncoder),
}

impl FittedColumnEncoder {
    fn transform(&self, categories: &[String]) -> Vec<f64> {
        match self {
            Self::TargetMean(enc) => enc.transform(categories),
            Self::Ordinal(enc) => enc.transform(categories),
        }
    }
}

/// Кодировщик набора категориальных колонок, по одному на колонку
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    strategy: EncodingStrategy,
    smoothing: f64,
}

impl CategoricalEncoder {
    pub fn new(strategy: EncodingStrategy) -> Self {
        Self {
            strategy,
            smoothing: 0.0,
        }
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// `columns` хранятся по колонкам: `columns[j][i]` — значение строки `i`
    pub fn fit(&self, columns: &[Vec<String>], targets: &[f64]) -> Result<FittedCategoricalEncoder> {
        let encoders = columns
            .iter()
            .map(|column| match self.strategy {
                EncodingStrategy::TargetMean => TargetEncoder::new()
                    .with_smoothing(self.smoothing)
                    .fit(column.as_slice(), targets)
                    .map(FittedColumnEncoder::TargetMean),
                EncodingStrategy::Ordinal => {
                    if column.len() != targets.len() {
                        return Err(Error::ShapeMismatch(format!(
                            "{} categories for {} targets",
                            column.len(),
                            targets.len()
                        )));
                    }
                    OrdinalEncoder.fit(column.as_slice()).map(FittedColumnEncoder::Ordinal)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FittedCategoricalEncoder { encoders })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedCategoricalEncoder {
    encoders: Vec<FittedColumnEncoder>,
}

impl FittedCategoricalEncoder {
    pub fn encoders(&self) -> &[FittedColumnEncoder] {
        &self.encoders
    }

    /// Матрица `n_rows x n_columns`
    pub fn transform(&self, columns: &[Vec<String>]) -> Result<Array2<f64>> {
        if columns.len() != self.encoders.len() {
            return Err(Error::ShapeMismatch(format!(
                "encoder fitted on {} columns, got {}",
                self.encoders.len(),
                columns.len()
            )));
        }

        let n_rows = columns.first().map(Vec::len).unwrap_or(0);
        let mut encoded = Array2::zeros((n_rows, columns.len()));
        for (j, (encoder, column)) in self.encoders.iter().zip(columns).enumerate() {
            if column.len() != n_rows {
                return Err(Error::ShapeMismatch(format!(
                    "categorical column {} has {} rows, expected {}",
                    j,
                    column.len(),
                    n_rows
                )));
            }
            for (i, value) in encoder.transform(column).into_iter().enumerate() {
                encoded[[i, j]] = value;
            }
        }

        Ok(encoded)
    }
}
