//! Daily work log: record a day's tasks and export them as a spreadsheet or PDF.

pub mod commands;
pub mod config;
pub mod dates;
pub mod error;
pub mod filename;
pub mod logging;
pub mod models;
pub mod output;
pub mod pdf;
pub mod record;
pub mod row_height;
pub mod storage;
pub mod tui;
pub mod update;
pub mod xlsx;

pub use error::{DailyworkError, Result};
pub use models::{Attendance, CommonTask, Task, UserPreference, WorkRecord};
