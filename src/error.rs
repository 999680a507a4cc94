use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No input files found in {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Column mismatch in {file}")]
    ShapeMismatch { file: String },

    #[error("Invalid date: {0} (expected {1})")]
    InvalidDate(String, &'static str),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;
