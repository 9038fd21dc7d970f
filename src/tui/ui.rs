use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::app::{App, Focus, InfoField, InputField, InputMode};
use crate::models::Attendance;

fn panel(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title)
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let banner_height = if app.update.is_some() { 1 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner_height), // Update banner
            Constraint::Length(7),             // Info
            Constraint::Min(0),                // Tasks
            Constraint::Length(5),             // Special notes
            Constraint::Length(1),             // Status
            Constraint::Length(3),             // Help
        ])
        .split(f.area());

    if let Some(update) = &app.update {
        let text = format!(
            " New version {} available: {}",
            update.latest_version.as_deref().unwrap_or("?"),
            update.release_url.as_deref().unwrap_or("")
        );
        let banner = Paragraph::new(text).style(Style::default().fg(Color::Black).bg(Color::Green));
        f.render_widget(banner, chunks[0]);
    }

    let record = &app.record;

    let attendance = match record.attendance {
        Attendance::Normal => "",
        Attendance::HalfDay => " [반차]",
        Attendance::Oasis => " [오아시스]",
    };
    let info_rows: Vec<Row> = InfoField::ALL
        .iter()
        .map(|field| {
            let mut value = field.value(record);
            if *field == InfoField::EndTime {
                value.push_str(attendance);
            }
            Row::new(vec![Cell::from(field.label()), Cell::from(value)])
        })
        .collect();
    let info = Table::new(info_rows, [Constraint::Length(8), Constraint::Min(10)])
        .block(panel(
            " dailywork - 일일 업무 일지 ".to_string(),
            app.focus == Focus::Info,
        ))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(info, chunks[1], &mut app.info_state);

    let task_rows: Vec<Row> = record
        .tasks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let (status, style) = if t.completed {
                ("완료", Style::default().fg(Color::Green))
            } else {
                ("진행중", Style::default().fg(Color::Yellow))
            };
            Row::new(vec![
                Cell::from((i + 1).to_string()),
                Cell::from(t.description.clone()),
                Cell::from(status).style(style),
                Cell::from(t.notes.clone()),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(3),
        Constraint::Percentage(50),
        Constraint::Length(8),
        Constraint::Min(10),
    ];
    let title = format!(
        " 업무 목록 ({}/{} 완료, {}%) ",
        record.completed_count(),
        record.tasks.len(),
        record.completion_rate()
    );
    let tasks = Table::new(task_rows, widths)
        .header(
            Row::new(vec!["#", "업무 내용", "상태", "비고"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(panel(title, app.focus == Focus::Tasks))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(tasks, chunks[2], &mut app.task_state);

    let notes = Paragraph::new(record.special_notes.as_str())
        .wrap(Wrap { trim: false })
        .block(panel(" 특이사항 ".to_string(), app.focus == Focus::Notes));
    f.render_widget(notes, chunks[3]);

    let status = match (&app.status, app.dirty) {
        (Some(s), _) => Line::from(format!(" {}", s)),
        (None, true) => Line::from(" Unsaved changes"),
        (None, false) => Line::from(""),
    };
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Magenta)),
        chunks[4],
    );

    let help_text = match app.input_mode {
        InputMode::Normal => match app.focus {
            Focus::Tasks => "q: Quit | Tab: Panel | Enter: Edit | n: Notes | a: Add | Space: Done | d: Del | y: Dup | K/J: Move | c: Common | h/o: Half/Oasis | x/p: Export | i: Import | s: Save profile",
            Focus::Info => "q: Quit | Tab: Panel | Enter: Edit field | h/o: Half/Oasis | x/p: Export | i: Import | s: Save profile",
            Focus::Notes => "q: Quit | Tab: Panel | Enter: Edit notes | x/p: Export | i: Import",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::ConfirmQuit => "e: Export & quit | q: Quit without exporting | c: Cancel",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[5]);

    match app.input_mode {
        InputMode::Editing => {
            let area = centered_rect(60, 3, f.area());
            f.render_widget(Clear, area);

            let common_title;
            let title = match app.input_field {
                InputField::Info(InfoField::Date) => "작성일 (YYYY-MM-DD)",
                InputField::Info(InfoField::Author) => "성명",
                InputField::Info(InfoField::Department) => "부서",
                InputField::Info(InfoField::StartTime) => "시작 시간 (HH:MM)",
                InputField::Info(InfoField::EndTime) => "종료 시간 (HH:MM)",
                InputField::TaskDescription => "업무 내용",
                InputField::TaskNotes => "비고",
                InputField::SpecialNotes => "특이사항",
                InputField::CommonTask => {
                    common_title = app
                        .common_tasks
                        .iter()
                        .enumerate()
                        .map(|(i, c)| format!("{}: {}", i + 1, c.description))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    common_title.as_str()
                }
                InputField::ImportPath => "Import xlsx (path)",
                InputField::None => "Edit",
            };

            let input = Paragraph::new(app.input_buffer.as_str())
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(input, area);
        }
        InputMode::ConfirmQuit => {
            let area = centered_rect(50, 5, f.area());
            f.render_widget(Clear, area);
            let dialog = Paragraph::new(vec![
                Line::from("The work log has not been exported."),
                Line::from(""),
                Line::from("[e] Export & quit   [q] Quit   [c] Cancel"),
            ])
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title("Quit"));
            f.render_widget(dialog, area);
        }
        InputMode::Normal => {}
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Context;
    use crate::config::Config;
    use crate::storage::MemoryStore;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn renders_form_and_quit_dialog() {
        let ctx = Context::new(Box::new(MemoryStore::new()), Config::default());
        let mut app = App::new(ctx);
        app.record.tasks[0].description = "Review".to_string();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();

        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("Review"));

        app.input_mode = InputMode::ConfirmQuit;
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("Export & quit"));
    }
}
