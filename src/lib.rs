//! TJSP ML - анализ и прогноз сроков рассмотрения дел по подразделениям суда

pub mod analysis;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod split;
pub mod table;
pub mod types;

pub use error::{Error, Result};
pub use table::Table;
pub use types::*;

// Re-export для удобства
pub use analysis::{explore, ExploreConfig};
pub use cleaning::{clean_table, run_cleaning, CleaningConfig};
pub use config::AppConfig;
pub use models::{EstimatorKind, ForestParams, ParamGrid};
pub use pipeline::{compare_estimators, run_modeling, ModelingConfig};
