//! Loading the input table and pulling the sample column out of it.

use crate::config::InputConfig;
use crate::error::{ReportError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// A delimited table with a header row, loaded in full.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: PathBuf,
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl Dataset {
    /// Opens `path` and parses it. Files ending in `.gz` are decompressed on the fly.
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Dataset> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReportError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ReportError::Io(e),
        })?;

        let is_gzip = path.extension().map_or(false, |ext| ext == "gz");
        let reader: Box<dyn Read> = if is_gzip {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Dataset::from_reader(reader, delimiter, path)
    }

    /// Parses a table from any reader. `source` is only used in error messages.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8, source: &Path) -> Result<Dataset> {
        let parse_error = |e: csv::Error| ReportError::Parse {
            path: source.to_path_buf(),
            source: e,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(parse_error)?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.is_empty() {
            return Err(ReportError::EmptyTable {
                path: source.to_path_buf(),
            });
        }

        let records = rdr
            .records()
            .collect::<core::result::Result<Vec<_>, _>>()
            .map_err(parse_error)?;

        log::debug!(
            "Loaded {} rows x {} columns from {}",
            records.len(),
            headers.len(),
            source.display()
        );

        Ok(Dataset {
            source: source.to_path_buf(),
            headers,
            records,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks a column up by its exact header name.
    pub fn column(&self, name: &str) -> Result<Column<'_>> {
        match self.headers.iter().position(|h| h == name) {
            Some(index) => Ok(Column {
                dataset: self,
                index,
            }),
            None => Err(ReportError::KeyMissing {
                column: name.to_string(),
                available: self.headers.clone(),
            }),
        }
    }
}

/// A validated handle to one column of a [`Dataset`].
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    dataset: &'a Dataset,
    index: usize,
}

impl<'a> Column<'a> {
    pub fn name(&self) -> &'a str {
        &self.dataset.headers[self.index]
    }

    /// Parses the first `n` values of the column. Rows after the first `n` are
    /// never looked at. A shorter table yields all of its rows.
    pub fn head(&self, n: usize) -> Result<SampleSlice> {
        let mut values = Vec::with_capacity(n.min(self.dataset.len()));
        for (i, record) in self.dataset.records.iter().take(n).enumerate() {
            let raw = record.get(self.index).unwrap_or("");
            match raw.trim().parse::<f64>() {
                Ok(x) if x.is_finite() => values.push(x),
                _ => {
                    return Err(ReportError::InvalidValue {
                        column: self.name().to_string(),
                        row: i + 1,
                        value: raw.to_string(),
                    })
                }
            }
        }

        Ok(SampleSlice {
            column: self.name().to_string(),
            values,
            requested: n,
            available: self.dataset.len(),
        })
    }
}

/// The leading values of the sample column, plus how many were asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSlice {
    column: String,
    values: Vec<f64>,
    requested: usize,
    available: usize,
}

impl SampleSlice {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Rows present in the table the slice was taken from.
    pub fn available(&self) -> usize {
        self.available
    }

    pub fn is_truncated(&self) -> bool {
        self.values.len() < self.requested
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }
}

/// Loads the table named by `input` and takes the configured sample from it.
pub fn load_sample(input: &InputConfig) -> Result<SampleSlice> {
    let delimiter = u8::try_from(input.delimiter).map_err(|_| {
        ReportError::Config(format!("delimiter {:?} is not a single byte", input.delimiter))
    })?;

    log::info!("Reading {}", input.path.display());
    let dataset = Dataset::from_path(&input.path, delimiter)?;
    let sample = dataset.column(&input.column)?.head(input.row_limit)?;

    if sample.is_truncated() {
        if input.strict_row_limit {
            return Err(ReportError::ShortInput {
                requested: sample.requested(),
                available: sample.available(),
            });
        }
        log::warn!(
            "Requested {} rows but {} only has {}; using all of them",
            sample.requested(),
            dataset.source().display(),
            sample.available()
        );
    }

    match (sample.min(), sample.max()) {
        (Some(lo), Some(hi)) => log::info!(
            "Sample '{}': {} values in [{}, {}]",
            sample.column(),
            sample.len(),
            lo,
            hi
        ),
        _ => log::warn!("Sample '{}' is empty", sample.column()),
    }
    log::trace!("Sample values: {:?}", sample.values());

    Ok(sample)
}
