use std::io::Read;
use std::path::Path;

use arrow::array::Array;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// SourceTable – a wide-format table of text cells
// ---------------------------------------------------------------------------

/// A raw source table: one header row and rows of text cells.
///
/// Cells stay text until ingestion decides how to interpret each column.
#[derive(Debug, Clone)]
pub struct SourceTable {
    /// Where the table came from, used in error messages.
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SourceTable {
    /// Load a source table from a file.  Dispatch by extension.
    ///
    /// Supported formats:
    /// * `.csv`     – header row followed by one measurement per row
    /// * `.parquet` – one column per header, any scalar type
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Self::from_csv_path(path),
            "parquet" | "pq" => Self::from_parquet_path(path),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
        Self::from_csv_reader(path.display().to_string(), file)
    }

    /// Parse CSV text from any reader. Headers are trimmed, cells are kept
    /// verbatim.
    pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            // Short rows are padded so every column lookup succeeds.
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(SourceTable {
            name: name.into(),
            headers,
            rows,
        })
    }

    /// Read a Parquet file; every cell is formatted as text, nulls become
    /// empty cells.
    pub fn from_parquet_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let headers: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().trim().to_string())
            .collect();
        let reader = builder.build()?;

        let options = FormatOptions::default();
        let mut rows = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;
            let formatters = batch
                .columns()
                .iter()
                .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for row in 0..batch.num_rows() {
                let cells = batch
                    .columns()
                    .iter()
                    .zip(&formatters)
                    .map(|(col, fmt)| {
                        if col.is_null(row) {
                            String::new()
                        } else {
                            fmt.value(row).to_string()
                        }
                    })
                    .collect();
                rows.push(cells);
            }
        }

        Ok(SourceTable {
            name: path.display().to_string(),
            headers,
            rows,
        })
    }

    /// Index of a column, if present.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Index of a column that must be present.
    pub fn require(&self, header: &str) -> Result<usize> {
        self.column(header).ok_or_else(|| Error::MissingColumn {
            column: header.to_string(),
            table: self.name.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text at `(row, col)`; out-of-range cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "Field, Name ,keVr\n100,A,1.5\n200,B\n";

    #[test]
    fn csv_headers_are_trimmed_and_short_rows_padded() {
        let t = SourceTable::from_csv_reader("inline", TABLE.as_bytes()).unwrap();
        assert_eq!(t.headers, vec!["Field", "Name", "keVr"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(1, 2), "");
        assert_eq!(t.cell(0, 2), "1.5");
    }

    #[test]
    fn require_reports_missing_column() {
        let t = SourceTable::from_csv_reader("inline", TABLE.as_bytes()).unwrap();
        assert_eq!(t.require("Name").unwrap(), 1);
        let err = t.require("EnergyCorr").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "EnergyCorr"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = SourceTable::load(Path::new("table.xlsx")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref e) if e == "xlsx"));
    }
}
