mod parser;

use crate::domain::RatingRecord;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn(&'static str),
    Row { line: u64, reason: String },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read ratings export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid ratings CSV data: {}", err),
            ImportError::MissingColumn(column) => {
                write!(f, "ratings export is missing the '{}' column", column)
            }
            ImportError::Row { line, reason } => write!(f, "line {}: {}", line, reason),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::MissingColumn(_) | ImportError::Row { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads rating records from a spreadsheet export. Fixed columns come first;
/// every other column is a criterion id and blank cells mean "not scored".
pub struct RatingCsvImporter;

impl RatingCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RatingRecord>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RatingRecord>, ImportError> {
        parser::parse_ratings(reader)
    }
}
