//! Load-time error taxonomy.
//!
//! Every failure that can happen while turning the comparison CSV into the
//! long table is one of these variants. Callers are expected to report the
//! message and carry on without data rather than abort.
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The data file does not exist.
    #[error("data file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The data file exists but could not be read.
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader rejected the input (bad quoting, invalid UTF-8, ...).
    #[error("malformed CSV: {0}")]
    Parse(#[from] csv::Error),

    /// A data row carries more fields than the header declares.
    #[error("malformed CSV: line {line} has {found} fields, header has {expected}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The header lacks columns the reshape needs.
    #[error("unexpected schema, missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

impl LoadError {
    /// Classify an I/O failure on `path`, singling out a missing file.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => LoadError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// `true` for the failures caused by the file's contents rather than its
    /// presence on disk.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            LoadError::Parse(_) | LoadError::MalformedRow { .. } | LoadError::MissingColumns(_)
        )
    }
}
