use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Crate-wide error type for dailywork operations.
#[derive(Debug, Error)]
pub enum DailyworkError {
    /// Underlying I/O failure (file read/write, terminal).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Configured template workbook does not exist.
    #[error("Template workbook not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// The workbook has no worksheet with the expected name.
    #[error("Worksheet '{0}' not found in workbook")]
    WorksheetNotFound(String),

    /// The workbook contains no worksheets at all.
    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    /// Structural problem in an xlsx package.
    #[error("Invalid workbook: {0}")]
    InvalidWorkbook(String),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error(transparent)]
    TemplateBuild(#[from] rust_xlsxwriter::XlsxError),

    /// PDF serialization failed.
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Date text that the strict parser could not understand.
    #[error("Unrecognized date '{0}'. Use YYYY-MM-DD, YYYY. M. D. or MM/DD/YYYY.")]
    InvalidDate(String),

    /// Time text that is not `HH:MM`.
    #[error("Invalid time '{0}'. Use HH:MM.")]
    InvalidTime(String),

    /// Adding another task would exceed the task limit.
    #[error("A work log holds at most {0} tasks")]
    TaskLimit(usize),

    /// No task at the given 1-based position.
    #[error("Task {0} not found")]
    TaskNotFound(usize),

    /// No task with the given id.
    #[error("No task with id {0}")]
    UnknownTask(Uuid),

    /// Removing the task would leave the record empty.
    #[error("Cannot remove the only task")]
    LastTask,

    /// No filename block at the given 1-based position.
    #[error("Filename block {0} not found")]
    BlockNotFound(usize),

    /// No common task at the given 1-based position.
    #[error("Common task {0} not found")]
    CommonTaskNotFound(usize),

    /// Fetching or decoding release metadata failed.
    #[error("Update check failed: {0}")]
    UpdateCheck(String),

    /// Configuration file or environment issue.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::events::attributes::AttrError> for DailyworkError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DailyworkError::Xml(quick_xml::Error::from(err))
    }
}

impl From<printpdf::Error> for DailyworkError {
    fn from(err: printpdf::Error) -> Self {
        DailyworkError::Pdf(format!("{err:?}"))
    }
}

impl From<reqwest::Error> for DailyworkError {
    fn from(err: reqwest::Error) -> Self {
        DailyworkError::UpdateCheck(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DailyworkError>;
