//! Линейная регрессия (МНК) на базе linfa-linear

#![allow(non_snake_case)]

use linfa::prelude::*;
use linfa::Dataset;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use ndarray::{Array1, Array2};

use crate::error::{Error, Result};
use crate::models::tree::check_width;
use crate::models::Regressor;

#[derive(Default)]
pub struct LinearModel {
    fitted: Option<FittedLinearRegression<f64>>,
}

impl LinearModel {
    pub fn new() -> Self {
        Self { fitted: None }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|m| m.params())
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|m| m.intercept())
    }
}

impl Regressor for LinearModel {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if X.nrows() == 0 || X.ncols() == 0 {
            return Err(Error::EmptyData("Empty dataset".to_string()));
        }
        if X.nrows() != y.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} rows in X, {} targets",
                X.nrows(),
                y.len()
            )));
        }

        let dataset = Dataset::new(X.clone(), y.clone());
        let model = LinearRegression::new()
            .fit(&dataset)
            .map_err(|e| Error::Model(e.to_string()))?;

        self.fitted = Some(model);
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self
            .fitted
            .as_ref()
            .ok_or_else(|| Error::Model("Model not trained".to_string()))?;
        check_width(X, model.params().len())?;
        Ok(model.predict(X))
    }
}
