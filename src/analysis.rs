//! Разведочный анализ очищенной таблицы

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::preprocessing::numeric::{parse_number, parse_plain_number};
use crate::preprocessing::parse_percentage;
use crate::table::Table;
use crate::types::{
    ColumnSummary, Correlation, ExploratoryReport, GroupAnalysis, GroupStat, MissingCount,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreConfig {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_group_columns")]
    pub group_columns: Vec<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
    /// Колонка индекса спроса в виде "95,2%"; `None` отключает сводку
    #[serde(default = "default_demand_index_column")]
    pub demand_index_column: Option<String>,
}

fn default_target() -> String {
    "TPSent_12_meses_num".to_string()
}

fn default_group_columns() -> Vec<String> {
    ["Nome orgao", "Municipio", "Grau"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_top_n() -> usize {
    10
}

fn default_min_group_size() -> usize {
    5
}

fn default_demand_index_column() -> Option<String> {
    Some("IAD_12_meses".to_string())
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            group_columns: default_group_columns(),
            top_n: default_top_n(),
            min_group_size: default_min_group_size(),
            demand_index_column: default_demand_index_column(),
        }
    }
}

pub fn explore(table: &Table, config: &ExploreConfig) -> Result<ExploratoryReport> {
    if config.top_n == 0 {
        return Err(Error::Config("top_n must be at least 1".to_string()));
    }
    let target_idx = table.column_index(&config.target)?;
    let group_idx = table.require_columns(&config.group_columns)?;

    let missing = table
        .headers()
        .iter()
        .enumerate()
        .map(|(col, name)| MissingCount {
            column: name.clone(),
            missing: table.missing_count(col),
        })
        .collect();

    let numeric_columns = numeric_columns(table);
    let numeric_summary = numeric_columns
        .iter()
        .filter_map(|&col| {
            let values: Vec<f64> = column_values(table, col).into_iter().flatten().collect();
            summarize(&table.headers()[col], &values)
        })
        .collect();

    let target: Vec<Option<f64>> = column_values_with(table, target_idx, parse_number);
    let target_correlations = correlations(table, &numeric_columns, target_idx, &target);

    let groups = group_idx
        .iter()
        .map(|&col| analyze_groups(table, col, &target, config))
        .collect();

    let demand_index = match &config.demand_index_column {
        Some(name) if table.has_column(name) => {
            let values: Vec<f64> = table.column(name)?.filter_map(parse_percentage).collect();
            summarize(name, &values)
        }
        Some(name) => {
            tracing::warn!("Demand index column '{}' not found", name);
            None
        }
        None => None,
    };

    tracing::info!(
        "Explored {} rows, {} numeric columns, {} group columns",
        table.n_rows(),
        numeric_columns.len(),
        group_idx.len()
    );

    Ok(ExploratoryReport {
        n_rows: table.n_rows(),
        n_columns: table.n_cols(),
        missing,
        numeric_summary,
        target_correlations,
        groups,
        demand_index,
    })
}

/// Колонки, все непустые значения которых являются числами
fn numeric_columns(table: &Table) -> Vec<usize> {
    (0..table.n_cols())
        .filter(|&col| {
            let mut present = table.rows().iter().filter_map(|row| row[col].as_deref()).peekable();
            present.peek().is_some() && present.all(|v| parse_plain_number(v).is_some())
        })
        .collect()
}

fn column_values(table: &Table, col: usize) -> Vec<Option<f64>> {
    column_values_with(table, col, parse_plain_number)
}

fn column_values_with(table: &Table, col: usize, parse: fn(&str) -> Option<f64>) -> Vec<Option<f64>> {
    table
        .rows()
        .iter()
        .map(|row| row[col].as_deref().and_then(parse))
        .collect()
}

fn summarize(column: &str, values: &[f64]) -> Option<ColumnSummary> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.len() > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    });

    Some(ColumnSummary {
        column: column.to_string(),
        count: values.len(),
        mean,
        std,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

fn correlations(table: &Table, columns: &[usize], target_idx: usize, target: &[Option<f64>]) -> Vec<Correlation> {
    let mut result: Vec<Correlation> = columns
        .iter()
        .filter(|&&col| col != target_idx)
        .filter_map(|&col| {
            let pairs: Vec<(f64, f64)> = column_values(table, col)
                .into_iter()
                .zip(target.iter())
                .filter_map(|(x, y)| Some((x?, (*y)?)))
                .collect();
            pearson(&pairs).map(|r| Correlation {
                column: table.headers()[col].clone(),
                pearson: r,
            })
        })
        .collect();

    result.sort_by(|a, b| b.pearson.total_cmp(&a.pearson));
    result
}

/// `None` при менее чем двух парах или нулевой дисперсии
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

fn analyze_groups(table: &Table, col: usize, target: &[Option<f64>], config: &ExploreConfig) -> GroupAnalysis {
    // (сумма цели, строк с целью, всего строк группы)
    let mut acc: HashMap<&str, (f64, usize, usize)> = HashMap::new();
    for (row, y) in table.rows().iter().zip(target.iter()) {
        let Some(group) = row[col].as_deref() else {
            continue;
        };
        let entry = acc.entry(group).or_insert((0.0, 0, 0));
        entry.2 += 1;
        if let Some(y) = y {
            entry.0 += y;
            entry.1 += 1;
        }
    }

    let mut stats: Vec<GroupStat> = acc
        .into_iter()
        .map(|(group, (sum, with_target, count))| GroupStat {
            group: group.to_string(),
            mean_target: if with_target > 0 {
                sum / with_target as f64
            } else {
                f64::NAN
            },
            count,
        })
        .collect();
    // стабильный порядок при равенстве
    stats.sort_by(|a, b| a.group.cmp(&b.group));

    let filtered: Vec<GroupStat> = stats
        .iter()
        .filter(|s| s.count >= config.min_group_size)
        .cloned()
        .collect();

    GroupAnalysis {
        column: table.headers()[col].clone(),
        n_groups: stats.len(),
        slowest: top_by_mean(&stats, config.top_n),
        largest: top_by_count(&stats, config.top_n),
        slowest_filtered: top_by_mean(&filtered, config.top_n),
        largest_filtered: top_by_count(&filtered, config.top_n),
    }
}

fn top_by_mean(stats: &[GroupStat], n: usize) -> Vec<GroupStat> {
    // группы без единого значения цели не ранжируются
    let mut sorted: Vec<GroupStat> = stats.iter().filter(|s| !s.mean_target.is_nan()).cloned().collect();
    sorted.sort_by(|a, b| b.mean_target.total_cmp(&a.mean_target));
    sorted.truncate(n);
    sorted
}

fn top_by_count(stats: &[GroupStat], n: usize) -> Vec<GroupStat> {
    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted.truncate(n);
    sorted
}
