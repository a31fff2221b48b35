//! Настройки приложения из JSON-файла
//!
//! Любое поле можно опустить: значения по умолчанию совпадают с константами
//! исходных скриптов обработки.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::ExploreConfig;
use crate::cleaning::CleaningConfig;
use crate::error::{Error, Result};
use crate::pipeline::ModelingConfig;
use crate::table::DEFAULT_DELIMITER;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_raw_input")]
    pub raw_input: PathBuf,
    #[serde(default = "default_cleaned_output")]
    pub cleaned_output: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_raw_input() -> PathBuf {
    PathBuf::from("dados/tjsp_processos_sp.csv")
}

fn default_cleaned_output() -> PathBuf {
    PathBuf::from("dados/tjsp_processos_tratado.csv")
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER as char
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_input: default_raw_input(),
            cleaned_output: default_cleaned_output(),
            delimiter: default_delimiter(),
        }
    }
}

impl PathsConfig {
    /// Разделитель в виде байта для csv
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(|b| b.is_ascii() && *b != b'"' && *b != b'\n')
            .ok_or_else(|| Error::Config(format!("unsupported delimiter '{}'", self.delimiter)))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub modeling: ModelingConfig,
    #[serde(default)]
    pub explore: ExploreConfig,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: AppConfig = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.paths.delimiter_byte()?;
        if self.paths.raw_input == self.paths.cleaned_output {
            return Err(Error::Config(
                "cleaned output would overwrite the raw input".to_string(),
            ));
        }
        self.modeling.validate()
    }
}
