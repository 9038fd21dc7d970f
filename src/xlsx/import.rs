use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use chrono::NaiveDate;
use log::{debug, warn};

use super::layout::{
    task_rows, CellRef, AUTHOR_CELL, COMPLETED_COL, COMPLETED_MARK, COMPLETED_WORD, DATE_CELL,
    DEPARTMENT_CELL, DESCRIPTION_COL, HALF_DAY_MARKER, NOTES_COL, OASIS_MARKER, SHEET_NAME,
    SPECIAL_NOTES_CELL, TIME_CELL,
};
use crate::dates;
use crate::error::{DailyworkError, Result};
use crate::models::{Attendance, Task, WorkRecord, DEFAULT_END_TIME, DEFAULT_START_TIME};
use crate::record::parse_time_range;

/// A spreadsheet cell value, decoded once at the import boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.trim().to_string()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => CellValue::Date(datetime.date()),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.trim().to_string()),
            Data::Error(e) => {
                debug!("Cell error {:?} read as empty", e);
                CellValue::Empty
            }
        }
    }

    /// Text form of the value; numbers print without a trailing `.0`.
    pub fn text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(d) => dates::to_iso(*d),
        }
    }

    /// Interprets the value as the record date.
    ///
    /// Text is normalized, serial numbers count days from 1899-12-30, and an
    /// empty cell means `fallback`.
    pub fn date_or(&self, fallback: NaiveDate) -> NaiveDate {
        match self {
            CellValue::Empty => fallback,
            CellValue::Text(s) => dates::normalize_or(s, fallback),
            CellValue::Number(serial) => dates::from_serial(*serial).unwrap_or_else(|| {
                warn!("Date serial {} out of range, using {}", serial, fallback);
                fallback
            }),
            CellValue::Date(d) => *d,
        }
    }
}

fn cell(range: &Range<Data>, at: CellRef) -> CellValue {
    range
        .get_value(at.zero_based())
        .map(CellValue::from_data)
        .unwrap_or(CellValue::Empty)
}

fn is_completed_mark(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case(COMPLETED_MARK) || text == COMPLETED_WORD
}

/// Reads a previously exported workbook back into a record.
///
/// Uses the log worksheet when present, otherwise the first sheet.
pub fn import(bytes: &[u8]) -> Result<WorkRecord> {
    import_with_today(bytes, dates::today())
}

/// Like [`import`], with the date used for a blank date cell supplied.
pub fn import_with_today(bytes: &[u8], today: NaiveDate) -> Result<WorkRecord> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names();
    let sheet = if sheet_names.iter().any(|n| n == SHEET_NAME) {
        SHEET_NAME.to_string()
    } else {
        let first = sheet_names
            .first()
            .cloned()
            .ok_or(DailyworkError::EmptyWorkbook)?;
        warn!("Worksheet '{}' not found, reading '{}'", SHEET_NAME, first);
        first
    };
    let range = workbook.worksheet_range(&sheet)?;
    Ok(read_record(&range, today))
}

fn read_record(range: &Range<Data>, today: NaiveDate) -> WorkRecord {
    let date = cell(range, DATE_CELL).date_or(today);
    let mut record = WorkRecord::new(date);

    let time = cell(range, TIME_CELL).text();
    let (start, end) = parse_time_range(&time)
        .unwrap_or_else(|| (DEFAULT_START_TIME.to_string(), DEFAULT_END_TIME.to_string()));
    record.start_time = start;
    record.end_time = end;
    record.attendance = if time.contains(HALF_DAY_MARKER) {
        Attendance::HalfDay
    } else if time.contains(OASIS_MARKER) {
        Attendance::Oasis
    } else {
        Attendance::Normal
    };

    record.department = cell(range, DEPARTMENT_CELL).text();
    record.author = cell(range, AUTHOR_CELL).text();

    let tasks: Vec<Task> = task_rows()
        .filter_map(|row| {
            let description = cell(range, CellRef::new(row, DESCRIPTION_COL)).text();
            if description.is_empty() {
                return None;
            }
            Some(Task {
                description,
                completed: is_completed_mark(&cell(range, CellRef::new(row, COMPLETED_COL)).text()),
                notes: cell(range, CellRef::new(row, NOTES_COL)).text(),
                ..Task::new()
            })
        })
        .collect();
    if !tasks.is_empty() {
        record.tasks = tasks;
    }

    record.special_notes = cell(range, SPECIAL_NOTES_CELL).text();
    debug!(
        "Imported record for {} with {} task(s)",
        record.date,
        record.tasks.len()
    );
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    /// Workbook with one sheet holding the given zero-based text cells.
    fn workbook(sheet_name: &str, cells: &[(u32, u16, &str)]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name).unwrap();
        for &(row, col, text) in cells {
            sheet.write_string(row, col, text).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    #[test]
    fn date_cell_forms_agree() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(CellValue::Text("2024-03-05".into()).date_or(today()), expected);
        assert_eq!(CellValue::Text("2024. 3. 5.".into()).date_or(today()), expected);
        assert_eq!(CellValue::Number(45356.0).date_or(today()), expected);
        assert_eq!(CellValue::Date(expected).date_or(today()), expected);
        assert_eq!(CellValue::Empty.date_or(today()), today());
    }

    #[test]
    fn completion_marks() {
        assert!(is_completed_mark("O"));
        assert!(is_completed_mark(" o "));
        assert!(is_completed_mark("완료"));
        assert!(!is_completed_mark(""));
        assert!(!is_completed_mark("X"));
    }

    #[test]
    fn number_text_has_no_trailing_zero() {
        assert_eq!(CellValue::Number(3.0).text(), "3");
        assert_eq!(CellValue::Number(2.5).text(), "2.5");
    }

    #[test]
    fn falls_back_to_first_sheet() {
        let bytes = workbook(
            "Other",
            &[
                (3, 2, "2024-03-05"),
                (3, 4, "09:00 ~ 13:00 (오아시스)"),
                (4, 2, "Platform"),
                (4, 4, "Kim"),
                (7, 1, "Review"),
                (7, 3, "O"),
                (7, 4, "PR #12"),
            ],
        );
        let record = import_with_today(&bytes, today()).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(record.attendance, Attendance::Oasis);
        assert_eq!((record.start_time.as_str(), record.end_time.as_str()), ("09:00", "13:00"));
        assert_eq!(record.department, "Platform");
        assert_eq!(record.author, "Kim");
        assert_eq!(record.tasks.len(), 1);
        assert_eq!(record.tasks[0].description, "Review");
        assert!(record.tasks[0].completed);
        assert_eq!(record.tasks[0].notes, "PR #12");
    }

    #[test]
    fn empty_task_block_keeps_one_blank_task() {
        let bytes = workbook(SHEET_NAME, &[(3, 4, "10:00 ~ 15:00 (반차)"), (16, 1, "Out at 3")]);
        let record = import_with_today(&bytes, today()).unwrap();
        assert_eq!(record.attendance, Attendance::HalfDay);
        assert_eq!(record.start_time, "10:00");
        assert_eq!(record.end_time, "15:00");
        assert_eq!(record.date, today());
        assert_eq!(record.tasks.len(), 1);
        assert!(record.tasks[0].description.is_empty());
        assert_eq!(record.special_notes, "Out at 3");
    }

    #[test]
    fn huge_date_serial_uses_today() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME).unwrap();
        sheet.write_number(3, 2, 1e18).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();
        let record = import_with_today(&bytes, today()).unwrap();
        assert_eq!(record.date, today());
        assert_eq!(record.attendance, Attendance::Normal);
    }

    #[test]
    fn workbook_without_sheets_is_rejected() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("xl/_rels/workbook.xml.rels", FileOptions::<()>::default())
            .unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#,
        )
        .unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        let err = import_with_today(&bytes, today()).unwrap_err();
        assert!(matches!(err, DailyworkError::EmptyWorkbook), "{err:?}");
    }
}
