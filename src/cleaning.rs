//! Этап очистки: длительности в месяцах и обработка пропусков

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::preprocessing::{parse_duration, MissingValuePolicy};
use crate::table::Table;
use crate::types::{CleaningSummary, DerivedColumnSummary};

/// Текстовая колонка длительности и имя производной числовой колонки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationColumn {
    pub source: String,
    pub derived: String,
}

impl DurationColumn {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            derived: format!("{}_num", source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    #[serde(default = "default_duration_columns")]
    pub duration_columns: Vec<DurationColumn>,
    #[serde(default)]
    pub policy: MissingValuePolicy,
}

fn default_duration_columns() -> Vec<DurationColumn> {
    vec![
        DurationColumn::new("TPSent_12_meses"),
        DurationColumn::new("TPCPL_Dec_2024"),
    ]
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            duration_columns: default_duration_columns(),
            policy: MissingValuePolicy::default(),
        }
    }
}

/// Добавляет (или перезаписывает) производные колонки с месяцами
pub fn derive_durations(table: &mut Table, columns: &[DurationColumn]) -> Result<Vec<DerivedColumnSummary>> {
    let mut summaries = Vec::with_capacity(columns.len());

    for column in columns {
        let values: Vec<Option<String>> = table
            .column(&column.source)?
            .map(|cell| parse_duration(cell).map(|months| months.to_string()))
            .collect();

        let missing = values.iter().filter(|v| v.is_none()).count();
        let summary = DerivedColumnSummary {
            source: column.source.clone(),
            derived: column.derived.clone(),
            parsed: values.len() - missing,
            missing,
        };
        tracing::debug!(
            "{} -> {}: {} parsed, {} missing",
            summary.source,
            summary.derived,
            summary.parsed,
            summary.missing
        );

        table.set_column(&column.derived, values)?;
        summaries.push(summary);
    }

    Ok(summaries)
}

/// Очистка в памяти: сначала длительности, затем политика пропусков
pub fn clean_table(mut table: Table, config: &CleaningConfig) -> Result<(Table, Vec<DerivedColumnSummary>, usize, usize)> {
    let derived = derive_durations(&mut table, &config.duration_columns)?;
    let (table, outcome) = config.policy.apply_with_outcome(table)?;
    Ok((table, derived, outcome.rows_dropped, outcome.cells_filled))
}

/// Читает сырой файл и целиком перезаписывает очищенный.
/// При любой ошибке до записи выходной файл не трогается.
pub fn run_cleaning(
    input: &Path,
    output: &Path,
    delimiter: u8,
    config: &CleaningConfig,
) -> Result<CleaningSummary> {
    let raw = Table::read_csv(input, delimiter)?;
    let rows_read = raw.n_rows();
    tracing::info!("Loaded {} raw rows from {}", rows_read, input.display());

    let (cleaned, derived_columns, rows_dropped, cells_filled) = clean_table(raw, config)?;
    cleaned.write_csv(output, delimiter)?;

    tracing::info!(
        "Cleaned table saved to {} with {} rows",
        output.display(),
        cleaned.n_rows()
    );

    Ok(CleaningSummary {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows_read,
        rows_written: cleaned.n_rows(),
        rows_dropped,
        cells_filled,
        derived_columns,
    })
}
