//! Политика обработки пропусков

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::Table;

pub const NOT_INFORMED: &str = "Não informado";
pub const ZERO_PERCENT: &str = "0%";

/// Фиксированная обработка пропусков по группам колонок.
///
/// Сначала удаляются строки с пропуском в любой колонке `drop_if_missing`,
/// затем заполняются значения-заглушки. Удаленная строка ничего не заполняет.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValuePolicy {
    #[serde(default = "default_drop_if_missing")]
    pub drop_if_missing: Vec<String>,
    #[serde(default = "default_fill_not_informed")]
    pub fill_not_informed: Vec<String>,
    #[serde(default = "default_fill_zero_percent")]
    pub fill_zero_percent: Vec<String>,
}

fn default_drop_if_missing() -> Vec<String> {
    to_strings(&["TPSent_12_meses_num", "TPCPL_Dec_2024_num", "IAD_12_meses"])
}
fn default_fill_not_informed() -> Vec<String> {
    to_strings(&["Municipio", "UF", "TC_Dec_2024", "TPCPL_Dec_2024"])
}
fn default_fill_zero_percent() -> Vec<String> {
    to_strings(&["%CP", "%Sus"])
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for MissingValuePolicy {
    fn default() -> Self {
        Self {
            drop_if_missing: default_drop_if_missing(),
            fill_not_informed: default_fill_not_informed(),
            fill_zero_percent: default_fill_zero_percent(),
        }
    }
}

/// Итог применения политики
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub rows_before: usize,
    pub rows_dropped: usize,
    pub cells_filled: usize,
}

impl MissingValuePolicy {
    pub fn apply(&self, table: Table) -> Result<Table> {
        self.apply_with_outcome(table).map(|(table, _)| table)
    }

    pub fn apply_with_outcome(&self, mut table: Table) -> Result<(Table, PolicyOutcome)> {
        // Схему проверяем до любых изменений
        let drop_cols = table.require_columns(&self.drop_if_missing)?;
        let not_informed_cols = table.require_columns(&self.fill_not_informed)?;
        let zero_percent_cols = table.require_columns(&self.fill_zero_percent)?;

        let rows_before = table.n_rows();
        let rows_dropped = table.retain_rows(|row| drop_cols.iter().all(|&c| row[c].is_some()));
        if rows_dropped > 0 {
            tracing::warn!(
                "Dropped {} of {} rows with missing required fields",
                rows_dropped,
                rows_before
            );
        }

        let mut cells_filled = 0;
        for &col in &not_informed_cols {
            cells_filled += table.fill_missing(col, NOT_INFORMED);
        }
        for &col in &zero_percent_cols {
            cells_filled += table.fill_missing(col, ZERO_PERCENT);
        }
        tracing::debug!("Filled {} missing cells with sentinels", cells_filled);

        Ok((
            table,
            PolicyOutcome {
                rows_before,
                rows_dropped,
                cells_filled,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn policy() -> MissingValuePolicy {
        MissingValuePolicy {
            drop_if_missing: to_strings(&["dur", "iad"]),
            fill_not_informed: to_strings(&["mun"]),
            fill_zero_percent: to_strings(&["pct"]),
        }
    }

    fn table() -> Table {
        Table::from_rows(
            ["dur", "iad", "mun", "pct"],
            vec![
                vec![Some("12"), Some("80%"), None, None],
                vec![None, Some("90%"), None, None],
                vec![Some("5"), None, Some("Santos"), Some("3%")],
                vec![Some("7"), Some("70%"), Some("Campinas"), None],
            ],
        )
        .unwrap()
    }

    #[test]
    fn drops_rows_missing_required_fields() {
        let (cleaned, outcome) = policy().apply_with_outcome(table()).unwrap();
        assert_eq!(cleaned.n_rows(), 2);
        assert_eq!(outcome.rows_before, 4);
        assert_eq!(outcome.rows_dropped, 2);

        for name in ["dur", "iad"] {
            assert!(cleaned.column(name).unwrap().all(|v| v.is_some()));
        }
    }

    #[test]
    fn fills_sentinels_only_on_kept_rows() {
        let (cleaned, outcome) = policy().apply_with_outcome(table()).unwrap();
        let mun: Vec<_> = cleaned.column("mun").unwrap().collect();
        let pct: Vec<_> = cleaned.column("pct").unwrap().collect();

        assert_eq!(mun, vec![Some(NOT_INFORMED), Some("Campinas")]);
        assert_eq!(pct, vec![Some(ZERO_PERCENT), Some(ZERO_PERCENT)]);
        // две строки удалены до заполнения: их пропуски не считаются
        assert_eq!(outcome.cells_filled, 3);
    }

    #[test]
    fn missing_policy_column_is_schema_error() {
        let mut p = policy();
        p.fill_zero_percent.push("absent".into());
        let err = p.apply(table()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(c) if c == "absent"));
    }

    #[test]
    fn defaults_follow_dataset_columns() {
        let p = MissingValuePolicy::default();
        assert!(p.drop_if_missing.contains(&"IAD_12_meses".to_string()));
        assert_eq!(p.fill_zero_percent, to_strings(&["%CP", "%Sus"]));

        let parsed: MissingValuePolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, p);
    }
}
