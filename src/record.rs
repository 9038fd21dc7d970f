use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use uuid::Uuid;

use crate::error::{DailyworkError, Result};
use crate::models::{
    Attendance, Task, UserPreference, WorkRecord, DEFAULT_END_TIME, DEFAULT_START_TIME, MAX_TASKS,
};

static TIME_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}:\d{2})\s*~\s*(\d{2}:\d{2})").expect("valid regex"));
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid regex"));

/// Direction for adjacent task swaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Partial update applied to a task; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub notes: Option<String>,
}

/// Extracts `(start, end)` from text containing `HH:MM ~ HH:MM`.
pub fn parse_time_range(text: &str) -> Option<(String, String)> {
    TIME_RANGE
        .captures(text)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Validates an `HH:MM` time string.
pub fn validate_time(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if TIME.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(DailyworkError::InvalidTime(text.to_string()))
    }
}

impl UserPreference {
    /// Captures the identity fields of a record.
    pub fn from_record(record: &WorkRecord) -> Self {
        UserPreference {
            author: record.author.clone(),
            department: record.department.clone(),
            work_time_range: format!("{} ~ {}", record.start_time, record.end_time),
        }
    }

    /// Start and end time, falling back to the default working hours.
    pub fn time_range(&self) -> (String, String) {
        parse_time_range(&self.work_time_range).unwrap_or_else(|| {
            (DEFAULT_START_TIME.to_string(), DEFAULT_END_TIME.to_string())
        })
    }
}

impl WorkRecord {
    /// A fresh record for `date` with one empty task and default working hours.
    pub fn new(date: NaiveDate) -> Self {
        WorkRecord {
            date,
            author: String::new(),
            department: String::new(),
            start_time: DEFAULT_START_TIME.to_string(),
            end_time: DEFAULT_END_TIME.to_string(),
            attendance: Attendance::Normal,
            tasks: vec![Task::new()],
            special_notes: String::new(),
        }
    }

    /// A fresh record pre-filled from the stored user preference, if any.
    pub fn prefilled(date: NaiveDate, preference: Option<&UserPreference>) -> Self {
        let mut record = WorkRecord::new(date);
        if let Some(pref) = preference {
            let (start, end) = pref.time_range();
            record.author = pref.author.clone();
            record.department = pref.department.clone();
            record.start_time = start;
            record.end_time = end;
        }
        record
    }

    pub fn is_half_day(&self) -> bool {
        self.attendance == Attendance::HalfDay
    }

    pub fn is_oasis(&self) -> bool {
        self.attendance == Attendance::Oasis
    }

    /// Sets the half-day flag; turning it on clears oasis.
    pub fn set_half_day(&mut self, on: bool) {
        if on {
            self.attendance = Attendance::HalfDay;
        } else if self.is_half_day() {
            self.attendance = Attendance::Normal;
        }
    }

    /// Sets the oasis flag; turning it on clears half-day.
    pub fn set_oasis(&mut self, on: bool) {
        if on {
            self.attendance = Attendance::Oasis;
        } else if self.is_oasis() {
            self.attendance = Attendance::Normal;
        }
    }

    /// `HH:MM ~ HH:MM` plus the attendance suffix, as written to the time cell.
    pub fn time_range_label(&self) -> String {
        format!(
            "{} ~ {}{}",
            self.start_time,
            self.end_time,
            self.attendance.suffix()
        )
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Id of the task at a 1-based position.
    pub fn task_id_at(&self, position: usize) -> Result<Uuid> {
        position
            .checked_sub(1)
            .and_then(|i| self.tasks.get(i))
            .map(|t| t.id)
            .ok_or(DailyworkError::TaskNotFound(position))
    }

    /// Appends an empty task. Fails without touching the list when it is full.
    pub fn add_task(&mut self) -> Result<Uuid> {
        self.push_task(Task::new())
    }

    /// Appends the given task. Fails without touching the list when it is full.
    pub fn push_task(&mut self, task: Task) -> Result<Uuid> {
        if self.tasks.len() >= MAX_TASKS {
            return Err(DailyworkError::TaskLimit(MAX_TASKS));
        }
        let id = task.id;
        self.tasks.push(task);
        Ok(id)
    }

    /// Removes a task by id. Returns whether a task was removed.
    pub fn remove_task(&mut self, id: Uuid) -> bool {
        let len_before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != len_before
    }

    /// Swaps a task with its neighbour. Returns false at either end of the list.
    pub fn move_task(&mut self, id: Uuid, direction: Direction) -> bool {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&i| i < self.tasks.len()),
        };
        match target {
            Some(target) => {
                self.tasks.swap(index, target);
                true
            }
            None => false,
        }
    }

    /// Appends a copy of the task with a new id and `completed` reset.
    pub fn duplicate_task(&mut self, id: Uuid) -> Result<Uuid> {
        let source = self.task(id).ok_or(DailyworkError::UnknownTask(id))?;
        let copy = Task {
            id: Uuid::new_v4(),
            completed: false,
            ..source.clone()
        };
        self.push_task(copy)
    }

    /// Applies a partial update to a task.
    pub fn update_task(&mut self, id: Uuid, update: TaskUpdate) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(DailyworkError::UnknownTask(id))?;
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(completed) = update.completed {
            task.completed = completed;
        }
        if let Some(notes) = update.notes {
            task.notes = notes;
        }
        Ok(())
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Completed share of tasks in whole percent, 0 for an empty list.
    pub fn completion_rate(&self) -> u32 {
        if self.tasks.is_empty() {
            return 0;
        }
        ((self.completed_count() as f64 / self.tasks.len() as f64) * 100.0).round() as u32
    }
}
