use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use pretty_assertions::assert_eq;

use dailywork::commands::*;
use dailywork::config::Config;
use dailywork::filename::{Block, DateStyle};
use dailywork::models::{Attendance, MAX_TASKS};
use dailywork::record::Direction;
use dailywork::storage::{load_common_tasks, load_user_preference, MemoryStore};
use dailywork::DailyworkError;

fn test_ctx() -> Context {
    Context::new(Box::new(MemoryStore::new()), Config::default())
}

fn edit() -> RecordEdit {
    RecordEdit::default()
}

fn sheet_value(path: &Path, cell: (u32, u32)) -> Data {
    let bytes = std::fs::read(path).unwrap();
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range("일일업무일지").unwrap();
    range.get_value(cell).cloned().unwrap_or(Data::Empty)
}

#[test]
fn test_new_uses_saved_profile() {
    let mut ctx = test_ctx();
    cmd_set(
        &mut ctx,
        RecordEdit {
            author: Some("Kim".into()),
            department: Some("Dev".into()),
            start_time: Some("08:30".into()),
            end_time: Some("17:30".into()),
            ..edit()
        },
        true,
    )
    .unwrap();
    cmd_profile_save(&mut ctx, true).unwrap();

    let pref = load_user_preference(ctx.store.as_ref()).unwrap();
    assert_eq!(pref.work_time_range, "08:30 ~ 17:30");

    let record = cmd_new(&mut ctx, Some("2024-03-06".into()), true).unwrap();
    assert_eq!(record.author, "Kim");
    assert_eq!(record.department, "Dev");
    assert_eq!(record.start_time, "08:30");
    assert_eq!(record.end_time, "17:30");
    assert_eq!(record.tasks.len(), 1);
    assert_eq!(ctx.draft(), record);
}

#[test]
fn test_set_rejects_bad_input_without_partial_writes() {
    let mut ctx = test_ctx();
    cmd_new(&mut ctx, Some("2024-03-05".into()), true).unwrap();

    let err = cmd_set(
        &mut ctx,
        RecordEdit {
            author: Some("Lee".into()),
            end_time: Some("7pm".into()),
            ..edit()
        },
        true,
    )
    .unwrap_err();
    assert!(matches!(err, DailyworkError::InvalidTime(_)));
    assert_eq!(ctx.draft().author, "");

    let err = cmd_set(&mut ctx, RecordEdit { date: Some("yesterday".into()), ..edit() }, true)
        .unwrap_err();
    assert!(matches!(err, DailyworkError::InvalidDate(_)));
}

#[test]
fn test_attendance_flags_are_exclusive() {
    let mut ctx = test_ctx();
    cmd_attendance(&mut ctx, Attendance::HalfDay, true).unwrap();
    assert!(ctx.draft().is_half_day());
    cmd_attendance(&mut ctx, Attendance::Oasis, true).unwrap();
    let record = ctx.draft();
    assert!(record.is_oasis());
    assert!(!record.is_half_day());
    cmd_attendance(&mut ctx, Attendance::Normal, true).unwrap();
    assert_eq!(ctx.draft().attendance, Attendance::Normal);
}

#[test]
fn test_task_limit() {
    let mut ctx = test_ctx();
    for i in 1..MAX_TASKS {
        cmd_task_add(&mut ctx, Some(format!("task {}", i)), None, false, None, true).unwrap();
    }
    assert_eq!(ctx.draft().tasks.len(), MAX_TASKS);

    let err = cmd_task_add(&mut ctx, Some("one too many".into()), None, false, None, true)
        .unwrap_err();
    assert!(matches!(err, DailyworkError::TaskLimit(8)));
    let err = cmd_task_duplicate(&mut ctx, 1, true).unwrap_err();
    assert!(matches!(err, DailyworkError::TaskLimit(8)));
    assert_eq!(ctx.draft().tasks.len(), MAX_TASKS);
}

#[test]
fn test_duplicate_appends_uncompleted_copy() {
    let mut ctx = test_ctx();
    cmd_task_edit(&mut ctx, 1, Some("Review".into()), Some("PR #12".into()), true).unwrap();
    cmd_task_toggle(&mut ctx, 1, true).unwrap();
    cmd_task_add(&mut ctx, Some("Deploy".into()), None, false, None, true).unwrap();

    let position = cmd_task_duplicate(&mut ctx, 1, true).unwrap();
    assert_eq!(position, 3);

    let tasks = ctx.draft().tasks;
    assert_eq!(tasks[2].description, "Review");
    assert_eq!(tasks[2].notes, "PR #12");
    assert!(!tasks[2].completed);
    assert!(tasks[0].completed);
    assert_ne!(tasks[0].id, tasks[2].id);
}

#[test]
fn test_move_and_remove() {
    let mut ctx = test_ctx();
    cmd_task_edit(&mut ctx, 1, Some("first".into()), None, true).unwrap();
    cmd_task_add(&mut ctx, Some("second".into()), None, false, None, true).unwrap();

    assert!(!cmd_task_move(&mut ctx, 1, Direction::Up, true).unwrap());
    assert!(cmd_task_move(&mut ctx, 1, Direction::Down, true).unwrap());
    let names: Vec<String> = ctx.draft().tasks.into_iter().map(|t| t.description).collect();
    assert_eq!(names, vec!["second", "first"]);

    cmd_task_remove(&mut ctx, 1, true).unwrap();
    assert_eq!(ctx.draft().tasks[0].description, "first");

    let err = cmd_task_remove(&mut ctx, 1, true).unwrap_err();
    assert!(matches!(err, DailyworkError::LastTask));
    let err = cmd_task_toggle(&mut ctx, 5, true).unwrap_err();
    assert!(matches!(err, DailyworkError::TaskNotFound(5)));
}

#[test]
fn test_common_tasks_fill_descriptions() {
    let mut ctx = test_ctx();
    cmd_common_add(&mut ctx, "Code review".into(), Some("dev".into()), true).unwrap();
    cmd_common_add(&mut ctx, "Standup".into(), None, true).unwrap();

    cmd_task_add(&mut ctx, None, None, false, Some(2), true).unwrap();
    assert_eq!(ctx.draft().tasks[1].description, "Standup");

    let err = cmd_task_add(&mut ctx, None, None, false, Some(3), true).unwrap_err();
    assert!(matches!(err, DailyworkError::CommonTaskNotFound(3)));

    cmd_common_remove(&mut ctx, 1, true).unwrap();
    let common = load_common_tasks(ctx.store.as_ref());
    assert_eq!(common.len(), 1);
    assert_eq!(common[0].description, "Standup");
    assert!(cmd_common_remove(&mut ctx, 0, true).is_err());
}

#[test]
fn test_filename_editing() {
    let mut ctx = test_ctx();
    cmd_set(
        &mut ctx,
        RecordEdit {
            date: Some("2024-03-05".into()),
            author: Some("Kim".into()),
            ..edit()
        },
        true,
    )
    .unwrap();
    assert_eq!(
        cmd_filename_preview(&ctx, "xlsx", true).unwrap(),
        "20240305 일일업무일지_Kim.xlsx"
    );

    cmd_filename_move(&mut ctx, 3, 1, true).unwrap();
    cmd_filename_edit(&mut ctx, 3, "_".into(), true).unwrap();
    cmd_filename_style(&mut ctx, DateStyle::Hyphenated, true).unwrap();
    assert_eq!(cmd_filename_preview(&ctx, "pdf", true).unwrap(), "Kim2024-03-05_.pdf");

    cmd_filename_remove(&mut ctx, 3, true).unwrap();
    cmd_filename_add(&mut ctx, Block::text("-log"), true).unwrap();
    assert_eq!(cmd_filename_preview(&ctx, "pdf", true).unwrap(), "Kim2024-03-05-log.pdf");

    assert!(matches!(
        cmd_filename_remove(&mut ctx, 0, true),
        Err(DailyworkError::BlockNotFound(0))
    ));
    assert!(cmd_filename_edit(&mut ctx, 1, "x".into(), true).is_err());

    cmd_filename_reset(&mut ctx, true).unwrap();
    assert_eq!(
        cmd_filename_preview(&ctx, "xlsx", true).unwrap(),
        "20240305 일일업무일지_Kim.xlsx"
    );
}

#[test]
fn test_export_writes_expected_cells() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = test_ctx();
    cmd_set(
        &mut ctx,
        RecordEdit {
            date: Some("2024.3.5".into()),
            author: Some("Kim".into()),
            ..edit()
        },
        true,
    )
    .unwrap();
    cmd_task_edit(&mut ctx, 1, Some("Review".into()), None, true).unwrap();
    cmd_task_toggle(&mut ctx, 1, true).unwrap();

    let path = cmd_export_xlsx(&ctx, Some(dir.path()), true).unwrap();
    assert_eq!(path, dir.path().join("20240305 일일업무일지_Kim.xlsx"));

    assert_eq!(sheet_value(&path, (7, 1)), Data::String("Review".into()));
    assert_eq!(sheet_value(&path, (7, 3)), Data::String("O".into()));
    assert_eq!(sheet_value(&path, (7, 4)), Data::Empty);
    assert_eq!(sheet_value(&path, (3, 2)), Data::String("2024-03-05".into()));
    assert_eq!(sheet_value(&path, (4, 4)), Data::String("Kim".into()));
}

#[test]
fn test_export_then_import_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = test_ctx();
    cmd_set(
        &mut ctx,
        RecordEdit {
            date: Some("2024-03-05".into()),
            author: Some("김철수".into()),
            department: Some("개발팀".into()),
            start_time: Some("09:30".into()),
            end_time: Some("14:00".into()),
            special_notes: Some("회의 많음\n내일 배포".into()),
        },
        true,
    )
    .unwrap();
    cmd_attendance(&mut ctx, Attendance::HalfDay, true).unwrap();
    cmd_task_edit(&mut ctx, 1, Some("API 설계 검토".into()), Some("초안 공유".into()), true)
        .unwrap();
    cmd_task_toggle(&mut ctx, 1, true).unwrap();
    cmd_task_add(&mut ctx, Some("Deploy".into()), Some("staging".into()), false, None, true)
        .unwrap();
    let original = ctx.draft();

    let path = cmd_export_xlsx(&ctx, Some(&dir.path().join("log.xlsx")), true).unwrap();

    let mut other = test_ctx();
    let imported = cmd_import(&mut other, &path, true).unwrap();
    assert_eq!(other.draft(), imported);

    let strip = |r: &dailywork::WorkRecord| {
        let tasks: Vec<(String, bool, String)> = r
            .tasks
            .iter()
            .map(|t| (t.description.clone(), t.completed, t.notes.clone()))
            .collect();
        (
            r.date,
            r.author.clone(),
            r.department.clone(),
            r.start_time.clone(),
            r.end_time.clone(),
            r.attendance,
            tasks,
            r.special_notes.clone(),
        )
    };
    assert_eq!(strip(&imported), strip(&original));
}

#[test]
fn test_export_pdf_report_and_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = test_ctx();
    cmd_task_edit(&mut ctx, 1, Some("Review".into()), None, true).unwrap();

    let report = cmd_export_pdf(&ctx, Some(&dir.path().join("report.pdf")), None, true).unwrap();
    assert!(std::fs::read(&report).unwrap().starts_with(b"%PDF"));

    let capture = dir.path().join("capture.png");
    image::DynamicImage::new_rgb8(40, 120).save(&capture).unwrap();
    let snapshot =
        cmd_export_pdf(&ctx, Some(&dir.path().join("snap.pdf")), Some(&capture), true).unwrap();
    assert!(std::fs::read(&snapshot).unwrap().starts_with(b"%PDF"));
}

#[test]
fn test_import_missing_file_fails() {
    let mut ctx = test_ctx();
    let before = ctx.draft();
    assert!(cmd_import(&mut ctx, Path::new("/nonexistent/log.xlsx"), true).is_err());
    assert_eq!(ctx.draft().tasks.len(), before.tasks.len());
}
