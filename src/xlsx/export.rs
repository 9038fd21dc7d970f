use log::debug;

use super::layout::{
    task_rows, CellRef, AUTHOR_CELL, COMPLETED_COL, COMPLETED_MARK, DATE_CELL, DEPARTMENT_CELL,
    DESCRIPTION_COL, DESCRIPTION_WIDTH_PX, NOTES_COL, SHEET_NAME, SPECIAL_NOTES_CELL, TIME_CELL,
};
use super::patch::{self, SheetPatch};
use crate::dates;
use crate::error::Result;
use crate::models::{WorkRecord, MAX_TASKS};
use crate::row_height::RowHeightEstimator;

/// Cell values and row heights for a record, per the worksheet cell map.
///
/// The whole task block is cleared before the tasks are written, so rows left
/// over from the template never leak into the output.
pub fn build_patch(record: &WorkRecord) -> SheetPatch {
    let mut patch = SheetPatch::new();
    patch.set(DATE_CELL, dates::to_iso(record.date));
    patch.set(TIME_CELL, record.time_range_label());
    patch.set(DEPARTMENT_CELL, record.department.as_str());
    patch.set(AUTHOR_CELL, record.author.as_str());

    for row in task_rows() {
        patch.clear(CellRef::new(row, DESCRIPTION_COL));
        patch.clear(CellRef::new(row, COMPLETED_COL));
        patch.clear(CellRef::new(row, NOTES_COL));
    }

    if record.tasks.len() > MAX_TASKS {
        debug!(
            "Dropping {} task(s) beyond the {} template rows",
            record.tasks.len() - MAX_TASKS,
            MAX_TASKS
        );
    }

    let estimator = RowHeightEstimator::default();
    for (row, task) in task_rows().zip(record.tasks.iter()) {
        patch.set(CellRef::new(row, DESCRIPTION_COL), task.description.as_str());
        if task.completed {
            patch.set(CellRef::new(row, COMPLETED_COL), COMPLETED_MARK);
        }
        patch.set(CellRef::new(row, NOTES_COL), task.notes.as_str());

        if let Some(height) = estimator.row_height_for(&task.description, DESCRIPTION_WIDTH_PX) {
            patch.set_row_height(row, height);
        }
    }

    patch.set(SPECIAL_NOTES_CELL, record.special_notes.as_str());
    patch
}

/// Writes a record into the template workbook and returns the new workbook bytes.
pub fn export(record: &WorkRecord, template: &[u8]) -> Result<Vec<u8>> {
    let patch = build_patch(record);
    patch::apply(template, SHEET_NAME, &patch)
}
