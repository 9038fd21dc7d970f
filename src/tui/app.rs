use std::path::PathBuf;

use crossterm::event::KeyCode;
use log::{debug, warn};
use ratatui::widgets::TableState;

use crate::commands::{apply_edit, export_pdf, export_xlsx, Context, RecordEdit};
use crate::dates;
use crate::error::{DailyworkError, Result};
use crate::models::{CommonTask, UserPreference, WorkRecord};
use crate::record::{Direction, TaskUpdate};
use crate::storage::{load_common_tasks, save_user_preference};
use crate::update::UpdateStatus;
use crate::xlsx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    ConfirmQuit,
}

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Info,
    Tasks,
    Notes,
}

/// Rows of the info panel, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoField {
    Date,
    Author,
    Department,
    StartTime,
    EndTime,
}

impl InfoField {
    pub const ALL: [InfoField; 5] = [
        InfoField::Date,
        InfoField::Author,
        InfoField::Department,
        InfoField::StartTime,
        InfoField::EndTime,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InfoField::Date => "작성일",
            InfoField::Author => "성명",
            InfoField::Department => "부서",
            InfoField::StartTime => "시작",
            InfoField::EndTime => "종료",
        }
    }

    pub fn value(self, record: &WorkRecord) -> String {
        match self {
            InfoField::Date => dates::to_iso(record.date),
            InfoField::Author => record.author.clone(),
            InfoField::Department => record.department.clone(),
            InfoField::StartTime => record.start_time.clone(),
            InfoField::EndTime => record.end_time.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    Info(InfoField),
    TaskDescription,
    TaskNotes,
    SpecialNotes,
    CommonTask,
    ImportPath,
}

pub struct App {
    pub ctx: Context,
    pub record: WorkRecord,
    pub common_tasks: Vec<CommonTask>,
    pub focus: Focus,
    pub info_state: TableState,
    pub task_state: TableState,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    /// One-line feedback shown above the help bar.
    pub status: Option<String>,
    /// Changed since the last export.
    pub dirty: bool,
    pub update: Option<UpdateStatus>,
    pub should_quit: bool,
}

impl App {
    /// Loads the draft (or a fresh record for today) from the store.
    pub fn new(ctx: Context) -> App {
        let record = ctx.draft();
        let common_tasks = load_common_tasks(ctx.store.as_ref());
        let mut info_state = TableState::default();
        info_state.select(Some(0));
        let mut task_state = TableState::default();
        if !record.tasks.is_empty() {
            task_state.select(Some(0));
        }
        App {
            ctx,
            record,
            common_tasks,
            focus: Focus::Tasks,
            info_state,
            task_state,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            status: None,
            dirty: false,
            update: None,
            should_quit: false,
        }
    }

    /// Dispatches one key press.
    pub fn handle_key(&mut self, code: KeyCode) {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(code),
            InputMode::Editing => match code {
                KeyCode::Enter => self.handle_input(),
                KeyCode::Esc => self.cancel_input(),
                KeyCode::Char(c) => self.input_buffer.push(c),
                KeyCode::Backspace => {
                    self.input_buffer.pop();
                }
                _ => {}
            },
            InputMode::ConfirmQuit => match code {
                KeyCode::Char('e') | KeyCode::Enter => {
                    if self.export_xlsx() {
                        self.should_quit = true;
                    } else {
                        self.input_mode = InputMode::Normal;
                    }
                }
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('c') | KeyCode::Esc => self.input_mode = InputMode::Normal,
                _ => {}
            },
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.request_quit(),
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Enter => self.start_edit_selected(),
            KeyCode::Char('n') => self.start_edit(InputField::TaskNotes),
            KeyCode::Char('N') => self.start_edit(InputField::SpecialNotes),
            KeyCode::Char('a') => self.add_task(),
            KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('y') => self.duplicate_selected(),
            KeyCode::Char('K') => self.move_selected(Direction::Up),
            KeyCode::Char('J') => self.move_selected(Direction::Down),
            KeyCode::Char('c') => self.start_edit(InputField::CommonTask),
            KeyCode::Char('h') => {
                let on = !self.record.is_half_day();
                self.modify(|r| r.set_half_day(on));
            }
            KeyCode::Char('o') => {
                let on = !self.record.is_oasis();
                self.modify(|r| r.set_oasis(on));
            }
            KeyCode::Char('x') => {
                self.export_xlsx();
            }
            KeyCode::Char('p') => self.export_pdf(),
            KeyCode::Char('i') => self.start_edit(InputField::ImportPath),
            KeyCode::Char('s') => self.save_profile(),
            _ => {}
        }
    }

    /// Quits at once, or asks first when there are unexported changes.
    pub fn request_quit(&mut self) {
        if self.dirty {
            self.input_mode = InputMode::ConfirmQuit;
        } else {
            self.should_quit = true;
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Info => Focus::Tasks,
            Focus::Tasks => Focus::Notes,
            Focus::Notes => Focus::Info,
        };
    }

    /// Selects the next row in the focused panel.
    pub fn next(&mut self) {
        let (state, len) = match self.focus {
            Focus::Info => (&mut self.info_state, InfoField::ALL.len()),
            Focus::Tasks => (&mut self.task_state, self.record.tasks.len()),
            Focus::Notes => return,
        };
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous row in the focused panel.
    pub fn previous(&mut self) {
        let (state, len) = match self.focus {
            Focus::Info => (&mut self.info_state, InfoField::ALL.len()),
            Focus::Tasks => (&mut self.task_state, self.record.tasks.len()),
            Focus::Notes => return,
        };
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    fn selected_info(&self) -> InfoField {
        self.info_state
            .selected()
            .and_then(|i| InfoField::ALL.get(i).copied())
            .unwrap_or(InfoField::Date)
    }

    /// 1-based position of the selected task.
    fn selected_position(&self) -> Option<usize> {
        self.task_state
            .selected()
            .filter(|&i| i < self.record.tasks.len())
            .map(|i| i + 1)
    }

    /// Applies a change to the record, saves the draft and marks it dirty.
    fn modify(&mut self, f: impl FnOnce(&mut WorkRecord)) {
        f(&mut self.record);
        self.commit();
    }

    /// Like [`modify`](Self::modify) for fallible changes; errors go to the status line.
    fn try_modify<T>(&mut self, f: impl FnOnce(&mut WorkRecord) -> Result<T>) -> Option<T> {
        let mut record = self.record.clone();
        match f(&mut record) {
            Ok(out) => {
                self.record = record;
                self.commit();
                Some(out)
            }
            Err(e) => {
                self.status = Some(e.to_string());
                None
            }
        }
    }

    fn commit(&mut self) {
        self.dirty = true;
        if let Err(e) = self.ctx.save_draft(&self.record) {
            warn!("Could not save draft: {}", e);
            self.status = Some(format!("Could not save draft: {}", e));
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.record.tasks.len();
        if len == 0 {
            self.task_state.select(None);
        } else if let Some(i) = self.task_state.selected() {
            if i >= len {
                self.task_state.select(Some(len - 1));
            }
        } else {
            self.task_state.select(Some(0));
        }
    }

    pub fn add_task(&mut self) {
        if let Some(len) = self.try_modify(|r| r.add_task().map(|_| r.tasks.len())) {
            self.task_state.select(Some(len - 1));
            self.focus = Focus::Tasks;
            self.start_edit(InputField::TaskDescription);
        }
    }

    pub fn toggle_selected(&mut self) {
        if self.focus != Focus::Tasks {
            return;
        }
        if let Some(position) = self.selected_position() {
            self.try_modify(|r| {
                let id = r.task_id_at(position)?;
                let completed = !r.task(id).is_some_and(|t| t.completed);
                r.update_task(
                    id,
                    TaskUpdate {
                        completed: Some(completed),
                        ..TaskUpdate::default()
                    },
                )
            });
        }
    }

    /// Deletes the selected task. The last task stays.
    pub fn delete_selected(&mut self) {
        if self.focus != Focus::Tasks {
            return;
        }
        let Some(position) = self.selected_position() else {
            return;
        };
        if self.record.tasks.len() <= 1 {
            self.status = Some("At least one task is required".to_string());
            return;
        }
        self.try_modify(|r| r.task_id_at(position).map(|id| r.remove_task(id)));
    }

    pub fn duplicate_selected(&mut self) {
        if self.focus != Focus::Tasks {
            return;
        }
        if let Some(position) = self.selected_position() {
            if self
                .try_modify(|r| r.task_id_at(position).and_then(|id| r.duplicate_task(id)))
                .is_some()
            {
                self.task_state.select(Some(self.record.tasks.len() - 1));
            }
        }
    }

    pub fn move_selected(&mut self, direction: Direction) {
        if self.focus != Focus::Tasks {
            return;
        }
        let Some(position) = self.selected_position() else {
            return;
        };
        let moved = self.try_modify(|r| r.task_id_at(position).map(|id| r.move_task(id, direction)));
        if moved == Some(true) {
            let index = position - 1;
            let target = match direction {
                Direction::Up => index - 1,
                Direction::Down => index + 1,
            };
            self.task_state.select(Some(target));
        }
    }

    /// Opens the editor for whatever is selected in the focused panel.
    pub fn start_edit_selected(&mut self) {
        let field = match self.focus {
            Focus::Info => InputField::Info(self.selected_info()),
            Focus::Tasks => InputField::TaskDescription,
            Focus::Notes => InputField::SpecialNotes,
        };
        self.start_edit(field);
    }

    /// Opens the input popup for `field`, pre-filled with the current value.
    pub fn start_edit(&mut self, field: InputField) {
        let task = self
            .selected_position()
            .and_then(|p| self.record.tasks.get(p - 1));
        let prefill = match field {
            InputField::Info(info) => info.value(&self.record),
            InputField::TaskDescription => match task {
                Some(t) => t.description.clone(),
                None => return,
            },
            InputField::TaskNotes => match task {
                Some(t) => t.notes.clone(),
                None => return,
            },
            InputField::CommonTask => {
                if task.is_none() {
                    return;
                }
                if self.common_tasks.is_empty() {
                    self.status = Some("No common tasks. Add some with `dailywork common add`.".to_string());
                    return;
                }
                String::new()
            }
            InputField::SpecialNotes => self.record.special_notes.clone(),
            InputField::ImportPath => String::new(),
            InputField::None => return,
        };
        self.input_field = field;
        self.input_buffer = prefill;
        self.input_mode = InputMode::Editing;
    }

    fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    /// Applies the popup's text to the field being edited.
    pub fn handle_input(&mut self) {
        let text = std::mem::take(&mut self.input_buffer);
        let field = self.input_field;
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;

        match field {
            InputField::Info(info) => {
                let mut edit = RecordEdit::default();
                match info {
                    InfoField::Date => edit.date = Some(text),
                    InfoField::Author => edit.author = Some(text),
                    InfoField::Department => edit.department = Some(text),
                    InfoField::StartTime => edit.start_time = Some(text),
                    InfoField::EndTime => edit.end_time = Some(text),
                }
                self.try_modify(|r| apply_edit(r, edit));
            }
            InputField::TaskDescription | InputField::TaskNotes => {
                let Some(position) = self.selected_position() else {
                    return;
                };
                let update = if field == InputField::TaskNotes {
                    TaskUpdate {
                        notes: Some(text),
                        ..TaskUpdate::default()
                    }
                } else {
                    TaskUpdate {
                        description: Some(text),
                        ..TaskUpdate::default()
                    }
                };
                self.try_modify(|r| {
                    let id = r.task_id_at(position)?;
                    r.update_task(id, update)
                });
            }
            InputField::CommonTask => self.fill_from_common(&text),
            InputField::SpecialNotes => self.modify(|r| r.special_notes = text),
            InputField::ImportPath => self.import(PathBuf::from(text.trim())),
            InputField::None => {}
        }
    }

    fn fill_from_common(&mut self, text: &str) {
        let picked = text
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.common_tasks.get(i))
            .map(|c| c.description.clone());
        let (Some(description), Some(position)) = (picked, self.selected_position()) else {
            self.status = Some(format!("Common task {} not found", text.trim()));
            return;
        };
        self.try_modify(|r| {
            let id = r.task_id_at(position)?;
            r.update_task(
                id,
                TaskUpdate {
                    description: Some(description),
                    ..TaskUpdate::default()
                },
            )
        });
    }

    /// Exports to xlsx in the working directory. Returns whether it succeeded.
    pub fn export_xlsx(&mut self) -> bool {
        let template = self.ctx.filename_template();
        match export_xlsx(&self.record, &self.ctx.config, &template, None) {
            Ok(path) => {
                self.dirty = false;
                self.status = Some(format!("Saved {}", path.display()));
                true
            }
            Err(e) => {
                self.status = Some(format!("Export failed: {}", e));
                false
            }
        }
    }

    pub fn export_pdf(&mut self) {
        let template = self.ctx.filename_template();
        match export_pdf(&self.record, &self.ctx.config, &template, None, None) {
            Ok(path) => {
                self.dirty = false;
                self.status = Some(format!("Saved {}", path.display()));
            }
            Err(e) => self.status = Some(format!("Export failed: {}", e)),
        }
    }

    /// Replaces the record with an exported workbook's contents.
    pub fn import(&mut self, path: PathBuf) {
        let imported = std::fs::read(&path)
            .map_err(DailyworkError::from)
            .and_then(|bytes| xlsx::import(&bytes));
        match imported {
            Ok(record) => {
                debug!("Imported {}", path.display());
                self.record = record;
                self.task_state.select(None);
                self.commit();
                self.status = Some(format!("Imported {}", path.display()));
            }
            Err(e) => self.status = Some(format!("Import failed: {}", e)),
        }
    }

    pub fn save_profile(&mut self) {
        let preference = UserPreference::from_record(&self.record);
        match save_user_preference(self.ctx.store.as_mut(), &preference) {
            Ok(()) => self.status = Some("Profile saved".to_string()),
            Err(e) => self.status = Some(format!("Could not save profile: {}", e)),
        }
    }

    /// Stores the latest poll result; only newer versions are kept.
    pub fn set_update(&mut self, status: UpdateStatus) {
        if status.has_update {
            self.update = Some(status);
        }
    }
}
