use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use log::{debug, info};
use uuid::Uuid;

use crate::config::{data_dir, Config};
use crate::dates;
use crate::error::{DailyworkError, Result};
use crate::filename::{Block, DateStyle, FilenameTemplate};
use crate::models::{Attendance, CommonTask, Task, UserPreference, WorkRecord};
use crate::output::{resolve_output_path, write_document};
use crate::pdf::{self, FontSet};
use crate::record::{validate_time, Direction, TaskUpdate};
use crate::storage::{
    clear_draft, load_common_tasks, load_draft, load_filename_template, load_user_preference,
    save_common_tasks, save_draft, save_filename_template, save_user_preference, FileStore,
    KeyValueStore,
};
use crate::update::{current_version, UpdateChecker, UpdateStatus};
use crate::xlsx;

/// Everything a command needs: the preference store and the loaded config.
pub struct Context {
    pub store: Box<dyn KeyValueStore>,
    pub config: Config,
}

impl Context {
    pub fn new(store: Box<dyn KeyValueStore>, config: Config) -> Self {
        Context { store, config }
    }

    /// File-backed store in the data directory, plus `config.toml`.
    pub fn open() -> Result<Self> {
        let config = Config::load()?;
        let dir = data_dir();
        debug!("Data directory {}", dir.display());
        Ok(Context::new(Box::new(FileStore::new(dir)), config))
    }

    /// The record being edited, or a fresh one for today pre-filled from the profile.
    pub fn draft(&self) -> WorkRecord {
        load_draft(self.store.as_ref()).unwrap_or_else(|| {
            WorkRecord::prefilled(
                dates::today(),
                load_user_preference(self.store.as_ref()).as_ref(),
            )
        })
    }

    pub fn save_draft(&mut self, record: &WorkRecord) -> Result<()> {
        save_draft(self.store.as_mut(), record)
    }

    /// Loads the draft, applies `f` and saves the result.
    fn edit<T>(&mut self, f: impl FnOnce(&mut WorkRecord) -> Result<T>) -> Result<T> {
        let mut record = self.draft();
        let out = f(&mut record)?;
        self.save_draft(&record)?;
        Ok(out)
    }

    pub fn filename_template(&self) -> FilenameTemplate {
        load_filename_template(self.store.as_ref())
    }

    fn edit_filename_template(
        &mut self,
        f: impl FnOnce(&mut FilenameTemplate) -> Result<()>,
    ) -> Result<FilenameTemplate> {
        let mut template = self.filename_template();
        f(&mut template)?;
        save_filename_template(self.store.as_mut(), &template)?;
        Ok(template)
    }
}

/// Field changes for `set`; `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct RecordEdit {
    pub date: Option<String>,
    pub author: Option<String>,
    pub department: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub special_notes: Option<String>,
}

/// Applies user-entered field changes, validating dates and times strictly.
pub fn apply_edit(record: &mut WorkRecord, edit: RecordEdit) -> Result<()> {
    let date = edit.date.as_deref().map(dates::parse).transpose()?;
    let start = edit.start_time.as_deref().map(validate_time).transpose()?;
    let end = edit.end_time.as_deref().map(validate_time).transpose()?;

    if let Some(date) = date {
        record.date = date;
    }
    if let Some(start) = start {
        record.start_time = start;
    }
    if let Some(end) = end {
        record.end_time = end;
    }
    if let Some(author) = edit.author {
        record.author = author;
    }
    if let Some(department) = edit.department {
        record.department = department;
    }
    if let Some(notes) = edit.special_notes {
        record.special_notes = notes;
    }
    Ok(())
}

/// Starts a new record, replacing the current draft.
///
/// Author, department and working hours come from the saved profile.
pub fn cmd_new(ctx: &mut Context, date: Option<String>, silent: bool) -> Result<WorkRecord> {
    let date = match date {
        Some(d) => dates::parse(&d)?,
        None => dates::today(),
    };
    let preference = load_user_preference(ctx.store.as_ref());
    let record = WorkRecord::prefilled(date, preference.as_ref());
    ctx.save_draft(&record)?;
    if !silent {
        println!("Started a new work log for {}.", dates::to_iso(date));
    }
    Ok(record)
}

/// Prints the current record as tables.
pub fn cmd_show(ctx: &Context) -> Result<()> {
    let record = ctx.draft();

    let mut info = Table::new();
    info.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
    info.add_row(vec!["Date".to_string(), dates::to_iso(record.date)]);
    info.add_row(vec!["Author".to_string(), record.author.clone()]);
    info.add_row(vec!["Department".to_string(), record.department.clone()]);
    info.add_row(vec!["Time".to_string(), record.time_range_label()]);
    info.add_row(vec![
        "Completion".to_string(),
        format!(
            "{}% ({}/{})",
            record.completion_rate(),
            record.completed_count(),
            record.tasks.len()
        ),
    ]);
    println!("{info}");

    let mut tasks = Table::new();
    tasks
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Notes").add_attribute(Attribute::Bold),
        ]);
    for (i, t) in record.tasks.iter().enumerate() {
        let (status, color) = if t.completed {
            ("Done", Color::Green)
        } else {
            ("In progress", Color::Yellow)
        };
        tasks.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&t.description),
            Cell::new(status).fg(color),
            Cell::new(&t.notes),
        ]);
    }
    println!("{tasks}");

    if !record.special_notes.is_empty() {
        println!("Special notes:\n{}", record.special_notes);
    }
    Ok(())
}

/// Updates header fields of the current record.
pub fn cmd_set(ctx: &mut Context, edit: RecordEdit, silent: bool) -> Result<()> {
    ctx.edit(|record| apply_edit(record, edit))?;
    if !silent {
        println!("Work log updated.");
    }
    Ok(())
}

/// Sets the attendance state (normal, half day or oasis).
pub fn cmd_attendance(ctx: &mut Context, attendance: Attendance, silent: bool) -> Result<()> {
    ctx.edit(|record| {
        match attendance {
            Attendance::HalfDay => record.set_half_day(true),
            Attendance::Oasis => record.set_oasis(true),
            Attendance::Normal => record.attendance = Attendance::Normal,
        }
        Ok(())
    })?;
    if !silent {
        println!("Attendance set to {:?}.", attendance);
    }
    Ok(())
}

/// Appends a task. A common task can supply the description.
///
/// Returns the 1-based position of the new task.
pub fn cmd_task_add(
    ctx: &mut Context,
    description: Option<String>,
    notes: Option<String>,
    done: bool,
    common: Option<usize>,
    silent: bool,
) -> Result<usize> {
    let description = match common {
        Some(n) => {
            let common_tasks = load_common_tasks(ctx.store.as_ref());
            let picked = n
                .checked_sub(1)
                .and_then(|i| common_tasks.get(i))
                .ok_or(DailyworkError::CommonTaskNotFound(n))?;
            picked.description.clone()
        }
        None => description.unwrap_or_default(),
    };
    let task = Task {
        description,
        completed: done,
        notes: notes.unwrap_or_default(),
        ..Task::new()
    };
    let position = ctx.edit(|record| {
        record.push_task(task)?;
        Ok(record.tasks.len())
    })?;
    if !silent {
        println!("Task added (#{}).", position);
    }
    Ok(position)
}

/// Edits the description and/or notes of the task at `position`.
pub fn cmd_task_edit(
    ctx: &mut Context,
    position: usize,
    description: Option<String>,
    notes: Option<String>,
    silent: bool,
) -> Result<()> {
    ctx.edit(|record| {
        let id = record.task_id_at(position)?;
        record.update_task(
            id,
            TaskUpdate {
                description,
                notes,
                ..TaskUpdate::default()
            },
        )
    })?;
    if !silent {
        println!("Task {} updated.", position);
    }
    Ok(())
}

/// Flips the completion flag. Returns the new state.
pub fn cmd_task_toggle(ctx: &mut Context, position: usize, silent: bool) -> Result<bool> {
    let completed = ctx.edit(|record| {
        let id = record.task_id_at(position)?;
        let completed = !record.task(id).is_some_and(|t| t.completed);
        record.update_task(
            id,
            TaskUpdate {
                completed: Some(completed),
                ..TaskUpdate::default()
            },
        )?;
        Ok(completed)
    })?;
    if !silent {
        let state = if completed { "done" } else { "in progress" };
        println!("Task {} marked {}.", position, state);
    }
    Ok(completed)
}

/// Removes the task at `position`. The last remaining task cannot be removed.
pub fn cmd_task_remove(ctx: &mut Context, position: usize, silent: bool) -> Result<()> {
    ctx.edit(|record| {
        let id = record.task_id_at(position)?;
        if record.tasks.len() <= 1 {
            return Err(DailyworkError::LastTask);
        }
        record.remove_task(id);
        Ok(())
    })?;
    if !silent {
        println!("Task {} removed.", position);
    }
    Ok(())
}

/// Swaps a task with its neighbour. Returns false when it is already at that end.
pub fn cmd_task_move(
    ctx: &mut Context,
    position: usize,
    direction: Direction,
    silent: bool,
) -> Result<bool> {
    let moved = ctx.edit(|record| {
        let id = record.task_id_at(position)?;
        Ok(record.move_task(id, direction))
    })?;
    if !silent {
        let end = match direction {
            Direction::Up => "top",
            Direction::Down => "bottom",
        };
        if moved {
            println!("Task {} moved {:?}.", position, direction);
        } else {
            println!("Task {} is already at the {}.", position, end);
        }
    }
    Ok(moved)
}

/// Appends a copy of the task at `position`. Returns the copy's position.
pub fn cmd_task_duplicate(ctx: &mut Context, position: usize, silent: bool) -> Result<usize> {
    let copy = ctx.edit(|record| {
        let id = record.task_id_at(position)?;
        record.duplicate_task(id)?;
        Ok(record.tasks.len())
    })?;
    if !silent {
        println!("Task {} duplicated as #{}.", position, copy);
    }
    Ok(copy)
}

/// Exports a record to xlsx next to `out` (see [`resolve_output_path`]).
pub fn export_xlsx(
    record: &WorkRecord,
    config: &Config,
    template: &FilenameTemplate,
    out: Option<&Path>,
) -> Result<PathBuf> {
    let workbook = xlsx::load_template(config)?;
    let bytes = xlsx::export(record, &workbook)?;
    let stem = template.build_for(record.date, &record.author);
    let path = resolve_output_path(out, &stem, "xlsx");
    write_document(&path, &bytes)?;
    info!("Exported xlsx to {}", path.display());
    Ok(path)
}

/// Exports a record to PDF. With `snapshot`, the PDF is built from that PNG
/// capture instead of the laid-out report.
pub fn export_pdf(
    record: &WorkRecord,
    config: &Config,
    template: &FilenameTemplate,
    out: Option<&Path>,
    snapshot: Option<&Path>,
) -> Result<PathBuf> {
    let bytes = match snapshot {
        Some(capture) => pdf::render_snapshot(&image::open(capture)?)?,
        None => {
            let fonts = FontSet::resolve(&config.pdf)?;
            pdf::render_report(record, &fonts, Local::now().naive_local())?
        }
    };
    let stem = template.build_for(record.date, &record.author);
    let path = resolve_output_path(out, &stem, "pdf");
    write_document(&path, &bytes)?;
    info!("Exported pdf to {}", path.display());
    Ok(path)
}

pub fn cmd_export_xlsx(ctx: &Context, out: Option<&Path>, silent: bool) -> Result<PathBuf> {
    let path = export_xlsx(&ctx.draft(), &ctx.config, &ctx.filename_template(), out)?;
    if !silent {
        println!("Saved {}", path.display());
    }
    Ok(path)
}

pub fn cmd_export_pdf(
    ctx: &Context,
    out: Option<&Path>,
    snapshot: Option<&Path>,
    silent: bool,
) -> Result<PathBuf> {
    let path = export_pdf(
        &ctx.draft(),
        &ctx.config,
        &ctx.filename_template(),
        out,
        snapshot,
    )?;
    if !silent {
        println!("Saved {}", path.display());
    }
    Ok(path)
}

/// Replaces the current draft with the contents of an exported workbook.
pub fn cmd_import(ctx: &mut Context, path: &Path, silent: bool) -> Result<WorkRecord> {
    let bytes = std::fs::read(path)?;
    let record = xlsx::import(&bytes)?;
    ctx.save_draft(&record)?;
    if !silent {
        println!(
            "Imported {} ({} task(s)) from {}",
            dates::to_iso(record.date),
            record.tasks.len(),
            path.display()
        );
    }
    Ok(record)
}

/// Remembers author, department and working hours of the current record.
pub fn cmd_profile_save(ctx: &mut Context, silent: bool) -> Result<UserPreference> {
    let preference = UserPreference::from_record(&ctx.draft());
    save_user_preference(ctx.store.as_mut(), &preference)?;
    if !silent {
        println!("Profile saved.");
    }
    Ok(preference)
}

pub fn cmd_profile_show(ctx: &Context) -> Result<()> {
    match load_user_preference(ctx.store.as_ref()) {
        Some(p) => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["Name", "Department", "Working hours"]);
            table.add_row(vec![p.author, p.department, p.work_time_range]);
            println!("{table}");
        }
        None => println!("No profile saved."),
    }
    Ok(())
}

/// Lists the filename blocks and a preview for the current record.
pub fn cmd_filename_show(ctx: &Context) -> Result<()> {
    let template = ctx.filename_template();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Block"]);
    for (i, block) in template.blocks.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), block.label()]);
    }
    println!("{table}");
    println!("Date style: {:?}", template.date_style);
    println!("Preview:    {}", template.preview(&ctx.draft(), "xlsx"));
    Ok(())
}

/// Returns the file name the current record would be exported under.
pub fn cmd_filename_preview(ctx: &Context, extension: &str, silent: bool) -> Result<String> {
    let name = ctx.filename_template().preview(&ctx.draft(), extension);
    if !silent {
        println!("{}", name);
    }
    Ok(name)
}

pub fn cmd_filename_add(ctx: &mut Context, block: Block, silent: bool) -> Result<()> {
    let label = block.label();
    ctx.edit_filename_template(|t| {
        t.push(block);
        Ok(())
    })?;
    if !silent {
        println!("Added {} block.", label);
    }
    Ok(())
}

/// Removes the block at a 1-based position.
pub fn cmd_filename_remove(ctx: &mut Context, position: usize, silent: bool) -> Result<()> {
    ctx.edit_filename_template(|t| {
        let index = position
            .checked_sub(1)
            .ok_or(DailyworkError::BlockNotFound(position))?;
        t.remove(index).map(|_| ())
    })?;
    if !silent {
        println!("Block {} removed.", position);
    }
    Ok(())
}

/// Moves a block between 1-based positions.
pub fn cmd_filename_move(ctx: &mut Context, from: usize, to: usize, silent: bool) -> Result<()> {
    ctx.edit_filename_template(|t| {
        let from_index = from.checked_sub(1).ok_or(DailyworkError::BlockNotFound(from))?;
        let to_index = to.checked_sub(1).ok_or(DailyworkError::BlockNotFound(to))?;
        t.move_block(from_index, to_index)
    })?;
    if !silent {
        println!("Block {} moved to {}.", from, to);
    }
    Ok(())
}

/// Replaces the text of a text block at a 1-based position.
pub fn cmd_filename_edit(ctx: &mut Context, position: usize, text: String, silent: bool) -> Result<()> {
    ctx.edit_filename_template(|t| {
        let index = position
            .checked_sub(1)
            .ok_or(DailyworkError::BlockNotFound(position))?;
        t.set_text(index, text)
    })?;
    if !silent {
        println!("Block {} updated.", position);
    }
    Ok(())
}

pub fn cmd_filename_style(ctx: &mut Context, style: DateStyle, silent: bool) -> Result<()> {
    ctx.edit_filename_template(|t| {
        t.set_date_style(style);
        Ok(())
    })?;
    if !silent {
        println!("Date style set to {:?}.", style);
    }
    Ok(())
}

pub fn cmd_filename_reset(ctx: &mut Context, silent: bool) -> Result<()> {
    ctx.edit_filename_template(|t| {
        t.reset();
        Ok(())
    })?;
    if !silent {
        println!("Filename format reset to default.");
    }
    Ok(())
}

pub fn cmd_common_list(ctx: &Context) -> Result<()> {
    let common = load_common_tasks(ctx.store.as_ref());
    if common.is_empty() {
        println!("No common tasks.");
        return Ok(());
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Description", "Category"]);
    for (i, t) in common.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            t.description.clone(),
            t.category.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_common_add(
    ctx: &mut Context,
    description: String,
    category: Option<String>,
    silent: bool,
) -> Result<usize> {
    let mut common = load_common_tasks(ctx.store.as_ref());
    common.push(CommonTask {
        id: Uuid::new_v4().to_string(),
        description,
        category: category.unwrap_or_default(),
    });
    save_common_tasks(ctx.store.as_mut(), &common)?;
    if !silent {
        println!("Common task added (#{}).", common.len());
    }
    Ok(common.len())
}

pub fn cmd_common_remove(ctx: &mut Context, position: usize, silent: bool) -> Result<()> {
    let mut common = load_common_tasks(ctx.store.as_ref());
    let index = position
        .checked_sub(1)
        .filter(|&i| i < common.len())
        .ok_or(DailyworkError::CommonTaskNotFound(position))?;
    common.remove(index);
    save_common_tasks(ctx.store.as_mut(), &common)?;
    if !silent {
        println!("Common task {} removed.", position);
    }
    Ok(())
}

/// Asks the release feed whether a newer version exists.
pub fn cmd_check_update(ctx: &Context, silent: bool) -> Result<UpdateStatus> {
    let checker = UpdateChecker::new(ctx.config.update.url.clone(), current_version())?;
    let status = checker.check()?;
    if !silent {
        match &status.latest_version {
            Some(latest) if status.has_update => {
                println!("dailywork {} is available (you have {}).", latest, current_version());
                if let Some(url) = &status.release_url {
                    println!("{}", url);
                }
            }
            _ => println!("dailywork {} is up to date.", current_version()),
        }
    }
    Ok(status)
}

/// Throws away the current draft.
pub fn cmd_discard(ctx: &mut Context, force: bool) -> Result<()> {
    if !force {
        print!("Discard the current work log? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    clear_draft(ctx.store.as_mut())?;
    println!("Work log discarded.");
    Ok(())
}
