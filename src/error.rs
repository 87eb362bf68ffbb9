use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("no {prefix}* workbook found in {folder}")]
    NoChaseFile { folder: PathBuf, prefix: String },

    #[error("invalid Excel file: {path} ({details})")]
    InvalidExcel { path: PathBuf, details: String },

    #[error("no WK sheet found in {0}")]
    NoWeekSheet(PathBuf),

    #[error("sheet \"{name}\" not found (available: {available})")]
    SheetNotFound { name: String, available: String },

    #[error("no column containing \"{0}\" found")]
    ColumnNotFound(String),

    #[error("column \"{column}\" missing for row {row}")]
    TemplateFieldMissing { column: String, row: usize },

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid config {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("missing required mail setting: {0}")]
    MissingConfig(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::FileNotFound(_) => 1,
            Error::NoChaseFile { .. } => 1,
            Error::InvalidExcel { .. } => 2,
            Error::NoWeekSheet(_) => 3,
            Error::SheetNotFound { .. } => 3,
            Error::ColumnNotFound(_) => 3,
            Error::TemplateFieldMissing { .. } => 3,
            Error::UnsupportedFormat(_) => 3,
            Error::Config { .. } => 3,
            Error::Csv(_) => 2,
            Error::Mail(_) => 4,
            Error::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
