//! Табличные данные: чтение и запись `;`-разделенных файлов

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::{Error, Result};

pub const DEFAULT_DELIMITER: u8 = b';';

/// Значения, которые считаются пропуском (как в pandas)
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NA_TOKENS.contains(&trimmed)
}

/// Таблица в памяти: заголовок и строки с необязательными ячейками
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_rows<H, R, C>(headers: H, rows: R) -> Result<Self>
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = Option<&'static str>>,
    {
        let mut table = Self::new(headers.into_iter().map(Into::into).collect());
        for row in rows {
            table.push_row(row.into_iter().map(|c| c.map(str::to_string)).collect())?;
        }
        Ok(table)
    }

    pub fn read_csv(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let width = headers.len();

        let mut table = Self::new(headers);
        for record in reader.records() {
            let record = record?;
            // лишние ячейки означают сдвиг колонок: такую строку не угадать
            if record.len() > width {
                let line = record.position().map_or(0, |p| p.line());
                return Err(Error::ShapeMismatch(format!(
                    "{} line {}: expected {} fields, saw {}",
                    path.display(),
                    line,
                    width,
                    record.len()
                )));
            }
            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|cell| {
                    if is_missing(cell) {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect();
            // короткие строки дополняем пропусками
            row.resize(width, None);
            table.rows.push(row);
        }

        tracing::debug!(
            "Read {} rows x {} columns from {}",
            table.n_rows(),
            table.n_cols(),
            path.display()
        );
        Ok(table)
    }

    /// Полная перезапись файла
    pub fn write_csv(&self, path: impl AsRef<Path>, delimiter: u8) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| Error::io(path, e))?;

        let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(file);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        writer.flush().map_err(|e| Error::io(path, e))?;

        tracing::debug!("Wrote {} rows to {}", self.n_rows(), path.display());
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Проверка схемы: все колонки должны присутствовать
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names.iter().map(|n| self.column_index(n.as_ref())).collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = Option<&str>> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| row[idx].as_deref()))
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(Error::ShapeMismatch(format!(
                "row has {} cells, header has {}",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Добавляет колонку в конец; если такая уже есть, заменяет значения
    pub fn set_column(&mut self, name: &str, values: Vec<Option<String>>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(Error::ShapeMismatch(format!(
                "column '{}' has {} values, table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.headers.iter().position(|h| h == name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Оставляет только строки, для которых предикат истинен; возвращает число удаленных
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Option<String>]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Заполняет пропуски в колонке; возвращает число заполненных ячеек
    pub fn fill_missing(&mut self, col: usize, value: &str) -> usize {
        let mut filled = 0;
        for row in &mut self.rows {
            if row[col].is_none() {
                row[col] = Some(value.to_string());
                filled += 1;
            }
        }
        filled
    }

    pub fn missing_count(&self, col: usize) -> usize {
        self.rows.iter().filter(|row| row[col].is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            ["a", "b"],
            vec![vec![Some("1"), None], vec![Some("2"), Some("x")]],
        )
        .unwrap()
    }

    #[test]
    fn na_tokens_are_missing() {
        assert!(is_missing(""));
        assert!(is_missing("   "));
        assert!(is_missing("NaN"));
        assert!(is_missing("NA"));
        assert!(!is_missing("0"));
        assert!(!is_missing("Não informado"));
    }

    #[test]
    fn column_lookup_fails_loudly() {
        let table = sample();
        assert_eq!(table.column_index("b").unwrap(), 1);
        assert!(matches!(
            table.column_index("c"),
            Err(Error::MissingColumn(name)) if name == "c"
        ));
    }

    #[test]
    fn set_column_appends_then_replaces() {
        let mut table = sample();
        table
            .set_column("c", vec![Some("7".into()), None])
            .unwrap();
        assert_eq!(table.headers(), &["a", "b", "c"]);
        table
            .set_column("c", vec![None, Some("8".into())])
            .unwrap();
        assert_eq!(table.n_cols(), 3);
        assert_eq!(table.cell(1, 2), Some("8"));
        assert_eq!(table.cell(0, 2), None);
    }

    #[test]
    fn set_column_rejects_wrong_length() {
        let mut table = sample();
        assert!(matches!(
            table.set_column("c", vec![None]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn fill_and_retain() {
        let mut table = sample();
        assert_eq!(table.missing_count(1), 1);
        let dropped = table.retain_rows(|row| row[1].is_some());
        assert_eq!(dropped, 1);
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.fill_missing(1, "z"), 0);
    }

    #[test]
    fn csv_round_trip_preserves_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("t.csv");
        let table = sample();
        table.write_csv(&path, DEFAULT_DELIMITER).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a;b\n1;\n2;x\n");

        let back = Table::read_csv(&path, DEFAULT_DELIMITER).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn extra_cells_are_rejected_with_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.csv");
        std::fs::write(&path, "a;b\n1;2\n3;4;5\n").unwrap();

        let err = Table::read_csv(&path, DEFAULT_DELIMITER).unwrap_err();
        match err {
            Error::ShapeMismatch(msg) => {
                assert!(msg.contains("line 3"), "{}", msg);
                assert!(msg.contains("saw 3"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn short_rows_are_padded_with_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "a;b;c\n1;2\n").unwrap();

        let table = Table::read_csv(&path, DEFAULT_DELIMITER).unwrap();
        assert_eq!(table.rows()[0], vec![Some("1".to_string()), Some("2".to_string()), None]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Table::read_csv("/nonexistent/dir/file.csv", DEFAULT_DELIMITER).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
