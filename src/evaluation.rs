//! Метрики качества и важность признаков

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    /// `y_true[i]` и `y_pred[i]` должны относиться к одной строке
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} true values, {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(Error::EmptyData("no predictions to evaluate".to_string()));
        }

        let n = y_true.len() as f64;
        let residuals = y_true - y_pred;
        let mae = residuals.mapv(f64::abs).sum() / n;
        let ss_res = residuals.mapv(|r| r * r).sum();
        let rmse = (ss_res / n).sqrt();

        let mean = y_true.sum() / n;
        let ss_tot = y_true.mapv(|v| (v - mean).powi(2)).sum();
        // при нулевой дисперсии: 1 для точного прогноза, иначе 0
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Ok(Self { mae, rmse, r2 })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Связывает важности с именами по номеру колонки и сортирует по убыванию
pub fn rank_importances(names: &[String], scores: &Array1<f64>) -> Result<Vec<FeatureImportance>> {
    if names.len() != scores.len() {
        return Err(Error::ShapeMismatch(format!(
            "{} feature names, {} importance scores",
            names.len(),
            scores.len()
        )));
    }

    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(scores.iter())
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn computes_standard_metrics() {
        let y_true = array![3.0, -0.5, 2.0, 7.0];
        let y_pred = array![2.5, 0.0, 2.0, 8.0];
        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();

        assert_abs_diff_eq!(m.mae, 0.5);
        assert_abs_diff_eq!(m.rmse, 0.375f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(m.r2, 0.948_608_137_044_967_9, epsilon = 1e-12);
    }

    #[test]
    fn metrics_depend_on_row_alignment() {
        let y_true = array![1.0, 2.0, 3.0];
        let aligned = RegressionMetrics::compute(&y_true, &array![1.0, 2.0, 3.0]).unwrap();
        let shuffled = RegressionMetrics::compute(&y_true, &array![3.0, 1.0, 2.0]).unwrap();

        assert_eq!(aligned.mae, 0.0);
        assert_eq!(aligned.r2, 1.0);
        assert!(shuffled.mae > 0.0);
        assert!(shuffled.r2 < 1.0);
    }

    #[test]
    fn constant_target_r2_convention() {
        let y_true = array![2.0, 2.0];
        assert_eq!(RegressionMetrics::compute(&y_true, &array![2.0, 2.0]).unwrap().r2, 1.0);
        assert_eq!(RegressionMetrics::compute(&y_true, &array![1.0, 2.0]).unwrap().r2, 0.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(RegressionMetrics::compute(&array![1.0], &array![1.0, 2.0]).is_err());
        assert!(rank_importances(&["a".to_string()], &array![0.5, 0.5]).is_err());
    }

    #[test]
    fn importances_keep_their_names() {
        let names = vec!["Grau".to_string(), "CN_12_meses".to_string(), "Municipio".to_string()];
        let ranked = rank_importances(&names, &array![0.2, 0.7, 0.1]).unwrap();

        let order: Vec<_> = ranked.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["CN_12_meses", "Grau", "Municipio"]);
        assert_eq!(ranked[0].importance, 0.7);
    }
}
