use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of tasks a single work log can hold (the template has eight task rows).
pub const MAX_TASKS: usize = 8;

/// Default working hours used when nothing else is known.
pub const DEFAULT_START_TIME: &str = "09:00";
pub const DEFAULT_END_TIME: &str = "18:00";

/// Special attendance state for the day. Half-day and oasis exclude each other.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    #[default]
    Normal,
    /// 반차
    HalfDay,
    /// 오아시스
    Oasis,
}

impl Attendance {
    /// Suffix appended to the time range in exported documents.
    pub fn suffix(self) -> &'static str {
        match self {
            Attendance::Normal => "",
            Attendance::HalfDay => " (반차)",
            Attendance::Oasis => " (오아시스)",
        }
    }
}

/// A single entry in the day's task list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Opaque identifier, stable across reorders.
    pub id: Uuid,
    /// What was worked on.
    #[serde(default)]
    pub description: String,
    /// Whether the task was finished today.
    #[serde(default)]
    pub completed: bool,
    /// Progress or follow-up notes.
    #[serde(default)]
    pub notes: String,
}

impl Task {
    /// Creates an empty task with a fresh id.
    pub fn new() -> Self {
        Task {
            id: Uuid::new_v4(),
            description: String::new(),
            completed: false,
            notes: String::new(),
        }
    }

    pub fn with_description(description: impl Into<String>) -> Self {
        Task {
            description: description.into(),
            ..Task::new()
        }
    }
}

impl Default for Task {
    fn default() -> Self {
        Task::new()
    }
}

/// The whole daily work log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkRecord {
    /// Day the log is written for.
    pub date: NaiveDate,
    /// Name of the person writing the log.
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub department: String,
    /// Start of the working time range, `HH:MM`.
    pub start_time: String,
    /// End of the working time range, `HH:MM`.
    pub end_time: String,
    #[serde(default)]
    pub attendance: Attendance,
    /// Tasks in display/export order. Never more than [`MAX_TASKS`].
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub special_notes: String,
}

/// Identity defaults remembered between sessions and used to pre-fill a new record.
///
/// Field names match the stored JSON (`name`, `department`, `workTimeRange`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct UserPreference {
    #[serde(rename = "name", default)]
    pub author: String,
    #[serde(default)]
    pub department: String,
    /// Time range as `HH:MM ~ HH:MM`.
    #[serde(rename = "workTimeRange", default)]
    pub work_time_range: String,
}

/// A frequently used task description offered for quick fill.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommonTask {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub category: String,
}
