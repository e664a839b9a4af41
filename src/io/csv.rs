//! Delimited-file reading and writing for count matrices, sample sheets and contrasts

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use crate::data::{Contrast, CountMatrix, SampleSheet};
use crate::error::{DgeError, Result};

/// Gene identifier column of count matrices
pub const GENE_ID_COLUMN: &str = "gene_ID";

/// Value written for undefined numbers
pub const MISSING_VALUE: &str = "NA";

/// Detect delimiter from the header line: tab if present, comma otherwise
fn detect_delimiter(path: &Path) -> Result<u8> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    Ok(if header.contains('\t') { b'\t' } else { b',' })
}

/// A delimited file held as strings, with column lookup by header name
#[derive(Debug, Clone)]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DelimitedTable {
    /// Read a tab- or comma-delimited file with a header row
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let delimiter = detect_delimiter(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Index of a named column
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of a named column, or an error built by `err`
    pub fn require_column<F>(&self, name: &str, err: F) -> Result<usize>
    where
        F: FnOnce(String) -> DgeError,
    {
        self.column(name).ok_or_else(|| {
            err(format!(
                "Missing column '{}' (found: {})",
                name,
                self.headers.join(", ")
            ))
        })
    }

    /// Values of one column
    pub fn column_values(&self, idx: usize) -> Vec<String> {
        self.rows.iter().map(|row| row[idx].clone()).collect()
    }
}

/// Parse a number that may be reported as missing (`NA`, `NaN`, empty)
pub fn parse_optional_f64(value: &str) -> Result<Option<f64>> {
    match value.trim() {
        "" | "NA" | "NaN" | "nan" => Ok(None),
        "Inf" | "inf" => Ok(Some(f64::INFINITY)),
        "-Inf" | "-inf" => Ok(Some(f64::NEG_INFINITY)),
        v => v.parse::<f64>().map(Some).map_err(|_| DgeError::InvalidNumber {
            value: v.to_string(),
        }),
    }
}

/// Format a number, writing undefined values as `NA`
pub fn format_optional_f64(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => MISSING_VALUE.to_string(),
    }
}

/// Read a count matrix
///
/// The gene identifier column is `gene_ID`; when absent the first column is
/// used. Every other column is a sample.
pub fn read_count_matrix<P: AsRef<Path>>(path: P) -> Result<CountMatrix> {
    let matrix = read_matrix(path)?;
    if matrix.counts().iter().any(|&x| x != x.round()) {
        log::warn!("Some count values are not integers; they are rounded before differential testing.");
    }
    Ok(matrix)
}

/// Read a gene x sample matrix of non-negative values (normalized counts included)
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<CountMatrix> {
    let table = DelimitedTable::read(path)?;
    if table.headers.len() < 2 {
        return Err(DgeError::InvalidCountMatrix {
            reason: "Not enough columns in header".to_string(),
        });
    }
    if table.rows.is_empty() {
        return Err(DgeError::EmptyData {
            reason: "No genes found in count matrix".to_string(),
        });
    }

    let gene_col = table.column(GENE_ID_COLUMN).unwrap_or(0);
    let sample_cols: Vec<usize> = (0..table.headers.len()).filter(|&i| i != gene_col).collect();
    let sample_ids: Vec<String> = sample_cols.iter().map(|&i| table.headers[i].clone()).collect();

    let mut counts = Array2::zeros((table.rows.len(), sample_cols.len()));
    let mut gene_ids = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        if row.len() != table.headers.len() {
            return Err(DgeError::InvalidCountMatrix {
                reason: format!(
                    "Row {} has {} columns, expected {}",
                    i + 1,
                    row.len(),
                    table.headers.len()
                ),
            });
        }
        gene_ids.push(row[gene_col].clone());
        for (j, &col) in sample_cols.iter().enumerate() {
            counts[[i, j]] = row[col].parse::<f64>().map_err(|_| DgeError::InvalidCountMatrix {
                reason: format!("Invalid count value '{}' for gene {}", row[col], row[gene_col]),
            })?;
        }
    }

    CountMatrix::new(counts, gene_ids, sample_ids)
}

/// Read a sample sheet with `sampleID` and `groupID` columns
pub fn read_sample_sheet<P: AsRef<Path>>(path: P) -> Result<SampleSheet> {
    let table = DelimitedTable::read(path)?;
    let invalid = |reason| DgeError::InvalidSampleSheet { reason };
    let sample_col = table.require_column("sampleID", invalid)?;
    let group_col = table.require_column("groupID", invalid)?;

    if table.rows.is_empty() {
        return Err(DgeError::EmptyData {
            reason: "No samples found in sample sheet".to_string(),
        });
    }

    SampleSheet::new(table.column_values(sample_col), table.column_values(group_col))
}

/// Read the contrast list; row order is the run order
pub fn read_contrasts<P: AsRef<Path>>(path: P) -> Result<Vec<Contrast>> {
    let table = DelimitedTable::read(path)?;
    let invalid = |reason| DgeError::InvalidContrastList { reason };
    let treatment_col = table.require_column("treatment", invalid)?;
    let control_col = table.require_column("control", invalid)?;

    let contrasts: Vec<Contrast> = table
        .rows
        .iter()
        .map(|row| Contrast::new(row[treatment_col].clone(), row[control_col].clone()))
        .collect();

    if contrasts.is_empty() {
        return Err(DgeError::EmptyData {
            reason: "No contrasts found in contrast list".to_string(),
        });
    }

    Ok(contrasts)
}

/// Write a matrix as TSV with a leading `gene_ID` column
pub fn write_count_matrix<P: AsRef<Path>>(path: P, matrix: &CountMatrix) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;

    let mut header = vec![GENE_ID_COLUMN.to_string()];
    header.extend(matrix.sample_ids().iter().cloned());
    writer.write_record(&header)?;

    for (i, gene_id) in matrix.gene_ids().iter().enumerate() {
        let mut row = vec![gene_id.clone()];
        row.extend(matrix.gene_counts(i).iter().map(|v| v.to_string()));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
