//! CSV Data Loader Module
//! Handles CSV file loading, schema checks and column extraction using Polars.

use super::schema::{TableSchema, SCHEMA_VERSION};
use log::debug;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Input file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Table {table} in {} has no rows", .path.display())]
    EmptyTable { table: String, path: PathBuf },
    #[error("Table {table} does not match schema v{version}, missing columns: {}", .missing.join(", "))]
    SchemaMismatch {
        table: String,
        version: u32,
        missing: Vec<String>,
    },
    #[error("No data loaded")]
    NoData,
}

/// Handles CSV file loading with Polars.
///
/// Every column is read as text; typed conversion happens per row so a
/// single bad cell never rejects a whole column.
pub struct DataLoader {
    df: Option<DataFrame>,
    separator: Option<u8>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            df: None,
            separator: None,
        }
    }

    /// Use a fixed separator instead of sniffing it from the header.
    pub fn with_separator(mut self, separator: Option<char>) -> Self {
        self.separator = separator.and_then(|c| u8::try_from(c).ok());
        self
    }

    /// Load a CSV file using Polars.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        if !file_path.is_file() {
            return Err(LoaderError::MissingFile(file_path.to_path_buf()));
        }
        let separator = match self.separator {
            Some(separator) => separator,
            None => sniff_separator(file_path)?,
        };
        debug!(
            "Reading {} with separator '{}'",
            file_path.display(),
            separator as char
        );

        let df = LazyCsvReader::new(file_path)
            .with_separator(separator)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        self.df = Some(df);
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Load a CSV file and check it against a table schema.
    ///
    /// Missing required columns and files without data rows are fatal.
    pub fn load_table(
        &mut self,
        file_path: &Path,
        schema: &TableSchema,
    ) -> Result<&DataFrame, LoaderError> {
        self.load_csv(file_path)?;
        let columns = self.get_columns();
        let missing = schema.missing_columns(&columns);
        if !missing.is_empty() {
            return Err(LoaderError::SchemaMismatch {
                table: schema.name.to_string(),
                version: SCHEMA_VERSION,
                missing,
            });
        }
        for column in columns.iter().filter(|c| !schema.is_known(c)) {
            debug!("{}: ignoring unknown column '{column}'", schema.name);
        }
        if self.get_row_count() == 0 {
            return Err(LoaderError::EmptyTable {
                table: schema.name.to_string(),
                path: file_path.to_path_buf(),
            });
        }
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Get list of column names from loaded DataFrame.
    pub fn get_columns(&self) -> Vec<String> {
        self.df
            .as_ref()
            .map(|df| {
                df.get_column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }
}

/// Pick `;` or `,` by counting them in the header line.
fn sniff_separator(path: &Path) -> Result<u8, LoaderError> {
    let io_error = |source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let mut header = String::new();
    BufReader::new(file).read_line(&mut header).map_err(io_error)?;

    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    Ok(if semicolons > commas { b';' } else { b',' })
}

/// Trimmed text cells of a column; blank cells become `None`.
pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, LoaderError> {
    let column = df.column(name)?;
    let values = column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

/// Like [`text_column`], but an absent column yields all-missing cells.
pub fn optional_text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, LoaderError> {
    if df.get_column_names().iter().any(|column| column.as_str() == name) {
        text_column(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{RAINFALL, REGIONS};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_sniffs_semicolon_separator() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "rain.csv", "GRID_NO;DAY;PRECIPITATION\n1;20050821;12,5\n");
        let mut loader = DataLoader::new();
        let df = loader.load_table(&path, &RAINFALL).unwrap();
        assert_eq!(df.height(), 1);
        let grid = text_column(df, "GRID_NO").unwrap();
        assert_eq!(grid, vec![Some("1".to_string())]);
    }

    #[test]
    fn test_reads_all_columns_as_text() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "regions.csv",
            "Code,Name,Coordinates\nCH021,Bern,\"[46.9, 7.4]\"\nCH062,  ,\n",
        );
        let mut loader = DataLoader::new();
        let df = loader.load_table(&path, &REGIONS).unwrap();
        assert_eq!(
            text_column(df, "Coordinates").unwrap(),
            vec![Some("[46.9, 7.4]".to_string()), None]
        );
        assert_eq!(text_column(df, "Name").unwrap()[1], None);
        assert_eq!(optional_text_column(df, "Missing").unwrap(), vec![None, None]);
    }

    #[test]
    fn test_schema_mismatch_names_missing_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "regions.csv", "Code,Label\nCH021,Bern\n");
        let mut loader = DataLoader::new();
        match loader.load_table(&path, &REGIONS) {
            Err(LoaderError::SchemaMismatch { table, version, missing }) => {
                assert_eq!(table, "regions");
                assert_eq!(version, SCHEMA_VERSION);
                assert_eq!(missing, vec!["Name".to_string(), "Coordinates".to_string()]);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_and_empty_files_are_fatal() {
        let dir = TempDir::new().unwrap();
        let mut loader = DataLoader::new();
        assert!(matches!(
            loader.load_table(&dir.path().join("nope.csv"), &REGIONS),
            Err(LoaderError::MissingFile(_))
        ));

        let path = write_file(&dir, "empty.csv", "Code,Name,Coordinates\n");
        assert!(matches!(
            loader.load_table(&path, &REGIONS),
            Err(LoaderError::EmptyTable { .. })
        ));
    }
}
