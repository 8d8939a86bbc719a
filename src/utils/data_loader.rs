//! Data loading utilities

use crate::error::{ChaosError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Supported table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Parquet,
    Json,
    JsonLines,
}

impl TableFormat {
    /// Detect format from a file extension, defaulting to CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "tsv" => Self::Tsv,
            "parquet" | "pq" => Self::Parquet,
            "json" => Self::Json,
            "jsonl" | "ndjson" => Self::JsonLines,
            _ => Self::Csv,
        }
    }
}

/// Data loader for tabular files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for CSV schema inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: 100,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a delimited text file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>, delimiter: u8) -> Result<DataFrame> {
        let file = open(path.as_ref())?;
        let parse_opts = CsvParseOptions::default().with_separator(delimiter);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| ChaosError::DataError(e.to_string()))
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = open(path.as_ref())?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| ChaosError::DataError(e.to_string()))
    }

    /// Load a JSON array of records, or line-delimited records
    pub fn load_json(&self, path: impl AsRef<Path>, lines: bool) -> Result<DataFrame> {
        let file = open(path.as_ref())?;
        let format = if lines {
            JsonFormat::JsonLines
        } else {
            JsonFormat::Json
        };
        JsonReader::new(file)
            .with_json_format(format)
            .finish()
            .map_err(|e| ChaosError::DataError(e.to_string()))
    }

    /// Detect file format from extension and load
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let format = TableFormat::from_path(path);
        debug!(path = %path.display(), ?format, "loading table");

        let df = match format {
            TableFormat::Csv => self.load_csv(path, b',')?,
            TableFormat::Tsv => self.load_csv(path, b'\t')?,
            TableFormat::Parquet => self.load_parquet(path)?,
            TableFormat::Json => self.load_json(path, false)?,
            TableFormat::JsonLines => self.load_json(path, true)?,
        };
        if df.height() == 0 {
            return Err(ChaosError::DataError(format!(
                "{} contains no rows",
                path.display()
            )));
        }
        Ok(df)
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| ChaosError::DataError(format!("{}: {}", path.display(), e)))
}

/// Save DataFrame to various formats
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file)
            .finish(df)
            .map_err(|e| ChaosError::DataError(e.to_string()))
    }

    /// Save to Parquet
    pub fn save_parquet(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        ParquetWriter::new(file)
            .finish(df)
            .map(|_| ())
            .map_err(|e| ChaosError::DataError(e.to_string()))
    }
}
