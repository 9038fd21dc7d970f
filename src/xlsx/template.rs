//! The workbook exports are written into.
//!
//! Users can point `[xlsx] template` at their own copy of the company form.
//! Without one, an equivalent workbook is generated on the fly.

use std::fs;

use log::debug;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};

use super::layout::{
    AUTHOR_CELL, COMPLETED_COL, DATE_CELL, DEPARTMENT_CELL, DESCRIPTION_COL, NOTES_COL,
    SHEET_NAME, SPECIAL_NOTES_CELL, TASK_FIRST_ROW, TASK_LAST_ROW, TIME_CELL,
};
use crate::config::Config;
use crate::error::{DailyworkError, Result};
use crate::row_height::DEFAULT_ROW_HEIGHT;

const LABEL_FILL: u32 = 0xD9E1F2;

struct TemplateFormats {
    title: Format,
    label: Format,
    value: Format,
    wrapped: Format,
    centered: Format,
}

fn create_formats() -> TemplateFormats {
    let title = Format::new()
        .set_bold()
        .set_font_size(18)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);

    let label = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(LABEL_FILL)
        .set_border(FormatBorder::Thin);

    let value = Format::new()
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let wrapped = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let centered = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    TemplateFormats {
        title,
        label,
        value,
        wrapped,
        centered,
    }
}

/// Builds the built-in template: title, labelled header block, eight
/// bordered task rows and a special-notes box, all value cells blank.
pub fn default_template() -> Result<Vec<u8>> {
    let formats = create_formats();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    // rust_xlsxwriter rows are 0-based; the layout constants are not.
    let r = |row: u32| row - 1;

    sheet.set_column_width(0, 2)?;
    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(2, 14)?;
    sheet.set_column_width(3, 12)?;
    sheet.set_column_width(4, 30)?;

    sheet.set_row_height(r(2), 36)?;
    sheet.merge_range(r(2), 1, r(2), 4, "일일 업무 일지", &formats.title)?;

    sheet.write_string_with_format(r(DATE_CELL.row), 1, "작성일", &formats.label)?;
    sheet.write_blank(r(DATE_CELL.row), DATE_CELL.col, &formats.value)?;
    sheet.write_string_with_format(r(TIME_CELL.row), 3, "근무시간", &formats.label)?;
    sheet.write_blank(r(TIME_CELL.row), TIME_CELL.col, &formats.value)?;
    sheet.write_string_with_format(r(DEPARTMENT_CELL.row), 1, "부서", &formats.label)?;
    sheet.write_blank(r(DEPARTMENT_CELL.row), DEPARTMENT_CELL.col, &formats.value)?;
    sheet.write_string_with_format(r(AUTHOR_CELL.row), 3, "성명", &formats.label)?;
    sheet.write_blank(r(AUTHOR_CELL.row), AUTHOR_CELL.col, &formats.value)?;

    let header = r(TASK_FIRST_ROW - 1);
    sheet.merge_range(
        header,
        DESCRIPTION_COL,
        header,
        DESCRIPTION_COL + 1,
        "업무 내용",
        &formats.label,
    )?;
    sheet.write_string_with_format(header, COMPLETED_COL, "완료", &formats.label)?;
    sheet.write_string_with_format(header, NOTES_COL, "비고", &formats.label)?;

    for row in TASK_FIRST_ROW..=TASK_LAST_ROW {
        sheet.set_row_height(r(row), DEFAULT_ROW_HEIGHT)?;
        sheet.write_blank(r(row), DESCRIPTION_COL, &formats.wrapped)?;
        sheet.write_blank(r(row), DESCRIPTION_COL + 1, &formats.wrapped)?;
        sheet.write_blank(r(row), COMPLETED_COL, &formats.centered)?;
        sheet.write_blank(r(row), NOTES_COL, &formats.wrapped)?;
    }

    let notes = SPECIAL_NOTES_CELL.row;
    sheet.merge_range(r(notes - 1), 1, r(notes - 1), 4, "특이사항", &formats.label)?;
    sheet.set_row_height(r(notes), 80)?;
    sheet.write_blank(r(notes), SPECIAL_NOTES_CELL.col, &formats.wrapped)?;
    for col in (SPECIAL_NOTES_CELL.col + 1)..=NOTES_COL {
        sheet.write_blank(r(notes), col, &formats.wrapped)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Loads the configured template, or builds the default one.
pub fn load_template(config: &Config) -> Result<Vec<u8>> {
    match &config.xlsx.template {
        Some(path) => {
            if !path.exists() {
                return Err(DailyworkError::TemplateNotFound(path.clone()));
            }
            debug!("Using template {}", path.display());
            Ok(fs::read(path)?)
        }
        None => default_template(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    #[test]
    fn default_template_is_a_zip_with_the_log_sheet() {
        let bytes = default_template().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut workbook = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("xl/workbook.xml").unwrap(),
            &mut workbook,
        )
        .unwrap();
        assert!(workbook.contains(SHEET_NAME));
    }

    #[test]
    fn missing_configured_template_is_reported() {
        let mut config = Config::default();
        config.xlsx.template = Some(PathBuf::from("/nonexistent/daily.xlsx"));
        assert!(matches!(
            load_template(&config),
            Err(DailyworkError::TemplateNotFound(_))
        ));
    }
}
