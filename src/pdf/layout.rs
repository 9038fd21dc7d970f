//! Page layout for the PDF report, independent of any PDF library.
//!
//! All coordinates are millimetres measured from the top-left corner of the
//! page; text `y` is the baseline.

use chrono::NaiveDateTime;

use crate::dates;
use crate::models::WorkRecord;
use crate::row_height::{text_em, wrap_em};

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
pub const MARGIN_X_MM: f64 = 20.0;
pub const MARGIN_Y_MM: f64 = 15.0;

const CONTENT_WIDTH_MM: f64 = PAGE_WIDTH_MM - 2.0 * MARGIN_X_MM;
const FOOTER_HEIGHT_MM: f64 = 10.0;
const PT_TO_MM: f64 = 0.3528;

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb8(pub u8, pub u8, pub u8);

pub const TEXT: Rgb8 = Rgb8(0x1F, 0x29, 0x37);
pub const MUTED: Rgb8 = Rgb8(0x6B, 0x72, 0x80);
pub const BORDER: Rgb8 = Rgb8(0xD1, 0xD5, 0xDB);
pub const PANEL: Rgb8 = Rgb8(0xF3, 0xF4, 0xF6);
pub const WHITE: Rgb8 = Rgb8(0xFF, 0xFF, 0xFF);
pub const GREEN: Rgb8 = Rgb8(0x16, 0xA3, 0x4A);
pub const AMBER: Rgb8 = Rgb8(0xD9, 0x77, 0x06);
pub const SLATE: Rgb8 = Rgb8(0x64, 0x74, 0x8B);
pub const HIGHLIGHT: Rgb8 = Rgb8(0xFE, 0xF3, 0xC7);

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f64,
        y: f64,
        size: f64,
        bold: bool,
        color: Rgb8,
        text: String,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Rgb8>,
        stroke: Option<Rgb8>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// All text on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Rect { .. } => None,
        })
    }
}

/// Fixed strings of the report. Korean needs a Hangul-capable font.
#[derive(Debug, Clone)]
pub struct Labels {
    pub title: &'static str,
    pub date: &'static str,
    pub author: &'static str,
    pub department: &'static str,
    pub start_time: &'static str,
    pub end_time: &'static str,
    pub completion_rate: &'static str,
    pub tasks: &'static str,
    pub completed_suffix: &'static str,
    pub empty_description: &'static str,
    pub done: &'static str,
    pub in_progress: &'static str,
    pub notes: &'static str,
    pub special_notes: &'static str,
    pub half_day: &'static str,
    pub oasis: &'static str,
}

impl Labels {
    pub fn korean() -> Self {
        Labels {
            title: "일일 업무 일지",
            date: "작성일",
            author: "성명",
            department: "부서",
            start_time: "시작 시간",
            end_time: "종료 시간",
            completion_rate: "완료율",
            tasks: "업무 목록",
            completed_suffix: "완료",
            empty_description: "업무 내용이 입력되지 않았습니다.",
            done: "✓ 완료",
            in_progress: "○ 진행 중",
            notes: "비고",
            special_notes: "특이사항",
            half_day: " (반차)",
            oasis: " (오아시스)",
        }
    }

    /// Used with the built-in PDF fonts, which cannot encode Hangul.
    pub fn english() -> Self {
        Labels {
            title: "Daily Work Log",
            date: "Date",
            author: "Name",
            department: "Department",
            start_time: "Start",
            end_time: "End",
            completion_rate: "Completion",
            tasks: "Tasks",
            completed_suffix: "done",
            empty_description: "No description entered.",
            done: "Done",
            in_progress: "In progress",
            notes: "Notes",
            special_notes: "Special notes",
            half_day: " (half day)",
            oasis: " (oasis)",
        }
    }

    fn attendance_suffix(&self, record: &WorkRecord) -> &'static str {
        if record.is_half_day() {
            self.half_day
        } else if record.is_oasis() {
            self.oasis
        } else {
            ""
        }
    }
}

/// Approximate rendered width of `text` at `size` points, in millimetres.
pub fn text_width_mm(text: &str, size: f64) -> f64 {
    text_em(text) * size * PT_TO_MM
}

fn wrap_mm(text: &str, width_mm: f64, size: f64) -> Vec<String> {
    wrap_em(text, width_mm / (size * PT_TO_MM))
}

fn line_height(size: f64) -> f64 {
    size * PT_TO_MM * 1.5
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

/// Stateful cursor that places blocks and breaks pages.
struct Flow {
    pages: Vec<Page>,
    y: f64,
}

impl Flow {
    fn new() -> Self {
        Flow {
            pages: vec![Page::default()],
            y: MARGIN_Y_MM,
        }
    }

    fn bottom() -> f64 {
        PAGE_HEIGHT_MM - MARGIN_Y_MM - FOOTER_HEIGHT_MM
    }

    /// Usable height of a page.
    fn capacity() -> f64 {
        Self::bottom() - MARGIN_Y_MM
    }

    /// Starts a new page unless a block of `height` still fits.
    fn reserve(&mut self, height: f64) {
        let at_top = self.y <= MARGIN_Y_MM;
        if self.y + height > Self::bottom() && !at_top {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        self.pages.push(Page::default());
        self.y = MARGIN_Y_MM;
    }

    /// Position of the next op on the current page.
    fn mark(&self) -> usize {
        self.pages.last().map_or(0, |page| page.ops.len())
    }

    /// Moves the last op beneath everything pushed since `mark`.
    fn sink(&mut self, mark: usize) {
        if let Some(page) = self.pages.last_mut() {
            if let Some(op) = page.ops.pop() {
                page.ops.insert(mark.min(page.ops.len()), op);
            }
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn text(&mut self, x: f64, y: f64, size: f64, bold: bool, color: Rgb8, text: impl Into<String>) {
        self.push(DrawOp::Text {
            x,
            y,
            size,
            bold,
            color,
            text: text.into(),
        });
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: Option<Rgb8>, stroke: Option<Rgb8>) {
        self.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        });
    }
}

impl ReportLayout {
    pub fn build(record: &WorkRecord, generated_at: NaiveDateTime, labels: &Labels) -> Self {
        let mut flow = Flow::new();

        header(&mut flow, record, labels);
        time_summary(&mut flow, record, labels);

        flow.reserve(12.0);
        flow.y += 6.0;
        let heading = format!(
            "{} ({}/{} {})",
            labels.tasks,
            record.completed_count(),
            record.tasks.len(),
            labels.completed_suffix
        );
        flow.text(MARGIN_X_MM, flow.y, 13.0, true, TEXT, heading);
        flow.y += 5.0;

        for (i, task) in record.tasks.iter().enumerate() {
            task_card(&mut flow, i + 1, task, labels);
        }

        if !record.special_notes.trim().is_empty() {
            special_notes(&mut flow, &record.special_notes, labels);
        }

        let footer = format!(
            "{} {} | dailywork",
            dates::to_korean(generated_at.date()),
            generated_at.format("%H:%M:%S")
        );
        let footer_x = (PAGE_WIDTH_MM - text_width_mm(&footer, 8.0)) / 2.0;
        let footer_y = PAGE_HEIGHT_MM - MARGIN_Y_MM + 4.0;
        for page in &mut flow.pages {
            page.ops.push(DrawOp::Text {
                x: footer_x,
                y: footer_y,
                size: 8.0,
                bold: false,
                color: MUTED,
                text: footer.clone(),
            });
        }

        ReportLayout { pages: flow.pages }
    }
}

fn header(flow: &mut Flow, record: &WorkRecord, labels: &Labels) {
    let title_x = (PAGE_WIDTH_MM - text_width_mm(labels.title, 20.0)) / 2.0;
    flow.y += 8.0;
    flow.text(title_x, flow.y, 20.0, true, TEXT, labels.title);
    flow.y += 6.0;

    let rows = [
        (labels.date, dates::to_korean(record.date)),
        (labels.author, record.author.clone()),
        (labels.department, record.department.clone()),
    ];
    let row_height = 7.0;
    let box_height = rows.len() as f64 * row_height + 4.0;
    flow.rect(MARGIN_X_MM, flow.y, CONTENT_WIDTH_MM, box_height, Some(PANEL), Some(BORDER));
    let mut y = flow.y + 2.0;
    for (label, value) in rows {
        y += row_height;
        flow.text(MARGIN_X_MM + 4.0, y - 2.0, 10.0, true, MUTED, label);
        flow.text(MARGIN_X_MM + 34.0, y - 2.0, 11.0, false, TEXT, value);
    }
    flow.y += box_height + 5.0;
}

fn time_summary(flow: &mut Flow, record: &WorkRecord, labels: &Labels) {
    let columns = [
        (labels.start_time, record.start_time.clone()),
        (
            labels.end_time,
            format!("{}{}", record.end_time, labels.attendance_suffix(record)),
        ),
        (labels.completion_rate, format!("{}%", record.completion_rate())),
    ];
    let height = 16.0;
    let width = CONTENT_WIDTH_MM / columns.len() as f64;
    for (i, (label, value)) in columns.into_iter().enumerate() {
        let x = MARGIN_X_MM + i as f64 * width;
        flow.rect(x, flow.y, width, height, None, Some(BORDER));
        flow.text(x + 4.0, flow.y + 6.0, 9.0, false, MUTED, label);
        flow.text(x + 4.0, flow.y + 12.5, 12.0, true, TEXT, value);
    }
    flow.y += height + 2.0;
}

/// One line-sized piece of a task card.
enum CardRow {
    Description(String),
    Status,
    NotesLabel,
    Note(String),
}

impl CardRow {
    fn height(&self) -> f64 {
        match self {
            CardRow::Description(_) => line_height(11.0),
            CardRow::Status => 5.0,
            CardRow::NotesLabel => 8.0,
            CardRow::Note(_) => line_height(9.0),
        }
    }
}

/// Draws a task card. A card taller than the space left on a page is kept
/// whole when it fits a fresh page; otherwise its rows continue on the
/// following pages, each page getting its own frame.
fn task_card(flow: &mut Flow, number: usize, task: &crate::models::Task, labels: &Labels) {
    const PAD: f64 = 4.0;
    const BADGE: f64 = 7.0;
    let text_x = MARGIN_X_MM + PAD + BADGE + 4.0;
    let text_width = CONTENT_WIDTH_MM - (text_x - MARGIN_X_MM) - PAD;

    let (description, description_color) = if task.description.trim().is_empty() {
        (labels.empty_description, MUTED)
    } else {
        (task.description.as_str(), TEXT)
    };
    let (status, status_color) = if task.completed {
        (labels.done, GREEN)
    } else {
        (labels.in_progress, AMBER)
    };

    let mut rows: Vec<CardRow> = wrap_mm(description, text_width, 11.0)
        .into_iter()
        .map(CardRow::Description)
        .collect();
    rows.push(CardRow::Status);
    let has_notes = !task.notes.trim().is_empty();
    if has_notes {
        rows.push(CardRow::NotesLabel);
        rows.extend(
            wrap_mm(&task.notes, text_width - 4.0, 9.0)
                .into_iter()
                .map(CardRow::Note),
        );
    }
    // Space below the last row, inside the frame.
    let tail = 1.0 + PAD + if has_notes { 2.0 } else { 0.0 };
    let height = PAD + rows.iter().map(CardRow::height).sum::<f64>() + tail;

    flow.reserve(height.min(Flow::capacity()) + 3.0);
    flow.y += 3.0;
    let mut top = flow.y;
    let mut mark = flow.mark();
    // Top and op position of the open notes panel.
    let mut panel: Option<(f64, usize)> = None;

    let badge_color = if task.completed { GREEN } else { SLATE };
    flow.rect(MARGIN_X_MM + PAD, top + PAD, BADGE, BADGE, Some(badge_color), None);
    let number = number.to_string();
    let number_x = MARGIN_X_MM + PAD + (BADGE - text_width_mm(&number, 10.0)) / 2.0;
    flow.text(number_x, top + PAD + 5.0, 10.0, true, WHITE, number);

    let mut y = top + PAD;
    let mut placed = 0;
    for row in rows {
        if placed > 0 && y + row.height() + tail > Flow::bottom() {
            if let Some((panel_top, panel_mark)) = panel {
                flow.rect(text_x, panel_top, text_width, y + 2.0 - panel_top, Some(PANEL), None);
                flow.sink(panel_mark);
            }
            flow.rect(MARGIN_X_MM, top, CONTENT_WIDTH_MM, y + PAD - top, Some(WHITE), Some(BORDER));
            flow.sink(mark);
            flow.break_page();
            top = flow.y;
            mark = flow.mark();
            y = top + PAD;
            placed = 0;
            panel = panel.map(|_| (y, mark));
        }
        let height = row.height();
        match row {
            CardRow::Description(line) => {
                flow.text(text_x, y + height - 1.5, 11.0, false, description_color, line);
            }
            CardRow::Status => {
                flow.text(text_x, y + height, 9.0, true, status_color, status);
            }
            CardRow::NotesLabel => {
                panel = Some((y + 3.0, flow.mark()));
                flow.text(text_x + 2.0, y + 7.0, 8.0, true, MUTED, labels.notes);
            }
            CardRow::Note(line) => {
                flow.text(text_x + 2.0, y + height - 1.0, 9.0, false, TEXT, line);
            }
        }
        y += height;
        placed += 1;
    }

    if let Some((panel_top, panel_mark)) = panel {
        y += 2.0;
        flow.rect(text_x, panel_top, text_width, y - panel_top, Some(PANEL), None);
        flow.sink(panel_mark);
    }
    y += 1.0 + PAD;
    flow.rect(MARGIN_X_MM, top, CONTENT_WIDTH_MM, y - top, Some(WHITE), Some(BORDER));
    flow.sink(mark);
    flow.y = y;
}

fn special_notes(flow: &mut Flow, notes: &str, labels: &Labels) {
    const TAIL: f64 = 5.0;
    let lines = wrap_mm(notes, CONTENT_WIDTH_MM - 8.0, 10.0);
    let height = 9.0 + lines.len() as f64 * line_height(10.0) + TAIL;
    flow.reserve(height.min(Flow::capacity()) + 6.0);
    flow.y += 6.0;
    let mut top = flow.y;
    let mut mark = flow.mark();
    flow.text(MARGIN_X_MM + 4.0, top + 7.0, 11.0, true, TEXT, labels.special_notes);
    let mut y = top + 9.0;
    let mut placed = 0;
    for line in lines {
        if placed > 0 && y + line_height(10.0) + TAIL > Flow::bottom() {
            flow.rect(MARGIN_X_MM, top, CONTENT_WIDTH_MM, y + TAIL - top, Some(HIGHLIGHT), Some(AMBER));
            flow.sink(mark);
            flow.break_page();
            top = flow.y;
            mark = flow.mark();
            y = top + 4.0;
            placed = 0;
        }
        y += line_height(10.0);
        flow.text(MARGIN_X_MM + 4.0, y - 1.0, 10.0, false, TEXT, line);
        placed += 1;
    }
    y += TAIL;
    flow.rect(MARGIN_X_MM, top, CONTENT_WIDTH_MM, y - top, Some(HIGHLIGHT), Some(AMBER));
    flow.sink(mark);
    flow.y = y;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(18, 4, 9)
            .unwrap()
    }

    fn record() -> WorkRecord {
        let mut record = WorkRecord::new(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        record.author = "Kim".to_string();
        record.tasks[0].description = "Review".to_string();
        record.tasks[0].completed = true;
        record.tasks.push(Task::new());
        record
    }

    #[test]
    fn single_page_report_sections() {
        let layout = ReportLayout::build(&record(), generated_at(), &Labels::korean());
        assert_eq!(layout.pages.len(), 1);
        let texts: Vec<&str> = layout.pages[0].texts().collect();
        assert!(texts.contains(&"일일 업무 일지"));
        assert!(texts.contains(&"2024. 3. 5."));
        assert!(texts.contains(&"50%"));
        assert!(texts.contains(&"업무 목록 (1/2 완료)"));
        assert!(texts.contains(&"업무 내용이 입력되지 않았습니다."));
        assert!(texts.contains(&"✓ 완료"));
        assert!(texts.contains(&"○ 진행 중"));
        assert!(!texts.contains(&"특이사항"));
        assert_eq!(texts.last(), Some(&"2024. 3. 5. 18:04:09 | dailywork"));
    }

    #[test]
    fn completed_badge_is_green() {
        let layout = ReportLayout::build(&record(), generated_at(), &Labels::korean());
        let badges: Vec<Rgb8> = layout.pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rect {
                    width, fill: Some(fill), stroke: None, ..
                } if (*width - 7.0).abs() < f64::EPSILON => Some(*fill),
                _ => None,
            })
            .collect();
        assert_eq!(badges, vec![GREEN, SLATE]);
    }

    #[test]
    fn special_notes_only_when_present() {
        let mut record = record();
        record.special_notes = "Server maintenance at 17:00".to_string();
        let layout = ReportLayout::build(&record, generated_at(), &Labels::english());
        let texts: Vec<&str> = layout.pages[0].texts().collect();
        assert!(texts.contains(&"Special notes"));
        assert!(texts.contains(&"Server maintenance at 17:00"));
    }

    #[test]
    fn overflow_starts_new_pages_with_footer() {
        let mut record = record();
        record.tasks = (0..8)
            .map(|i| Task {
                notes: "follow up\n".repeat(6),
                ..Task::with_description(format!("task {i}\n").repeat(5))
            })
            .collect();
        let layout = ReportLayout::build(&record, generated_at(), &Labels::english());
        assert!(layout.pages.len() > 1);
        for page in &layout.pages {
            assert!(page.texts().any(|t| t.ends_with("| dailywork")));
            for op in &page.ops {
                if let DrawOp::Rect { y, height, .. } = op {
                    assert!(y + height <= PAGE_HEIGHT_MM - MARGIN_Y_MM);
                }
            }
        }
    }

    #[test]
    fn tall_card_continues_on_next_pages() {
        let mut record = record();
        let description = (0..120)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        record.tasks = vec![Task {
            notes: "check\n".repeat(40),
            ..Task::with_description(description)
        }];
        record.special_notes = "remark\n".repeat(90);
        let layout = ReportLayout::build(&record, generated_at(), &Labels::english());
        assert!(layout.pages.len() > 2);

        let mut description_lines = 0;
        for page in &layout.pages {
            for op in &page.ops {
                match op {
                    DrawOp::Text { y, text, .. } => {
                        if text.ends_with("| dailywork") {
                            continue;
                        }
                        assert!(*y > MARGIN_Y_MM && *y <= Flow::bottom(), "{text:?} at {y}");
                        if text.starts_with("line ") {
                            description_lines += 1;
                        }
                    }
                    DrawOp::Rect { y, height, .. } => {
                        assert!(*y >= MARGIN_Y_MM && y + height <= Flow::bottom(), "rect at {y}+{height}");
                    }
                }
            }
        }
        assert_eq!(description_lines, 120);
    }
}
