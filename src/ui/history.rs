use quizlock::attempt::AttemptRecord;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::App;

/// Pure presenter for a single attempt row
pub fn present_row(record: &AttemptRecord, quiz_title: &str) -> Row<'static> {
    let percentage = record.percentage();
    let score_color = if percentage >= 80 {
        Color::Green
    } else if percentage >= 50 {
        Color::Yellow
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(quiz_title.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(record.subject.clone()),
        Cell::from(format!("{}/{}", record.score, record.max_score)),
        Cell::from(format!("{percentage}%")).style(Style::default().fg(score_color)),
        Cell::from(record.reason.to_string()),
        Cell::from(record.completed_at.format("%Y-%m-%d %H:%M").to_string()),
    ])
}

/// Render the attempt history screen
pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Attempts table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let subject = app.history.selected_subject().unwrap_or("All");
    let title = Paragraph::new(format!(
        "Attempts by {} (Subject: {subject})",
        app.session.participant_id()
    ))
    .block(Block::default().borders(Borders::ALL).title("History"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let attempts = &app.history.attempts;
    if attempts.is_empty() {
        let no_data = Paragraph::new("No attempts recorded yet.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        // borders + header
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let max_scroll = attempts.len().saturating_sub(table_height);
        let scroll_offset = app.history.scroll_offset.min(max_scroll);

        let header = Row::new(vec![
            Cell::from("Quiz"),
            Cell::from("Subject"),
            Cell::from("Score"),
            Cell::from("%"),
            Cell::from("Submitted by"),
            Cell::from("Completed"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = attempts
            .iter()
            .skip(scroll_offset)
            .take(table_height)
            .map(|record| {
                let title = app
                    .quiz_titles
                    .get(&record.quiz_id)
                    .map(String::as_str)
                    .unwrap_or(&record.quiz_id);
                present_row(record, title)
            })
            .collect();

        let widths = [
            Constraint::Min(20),    // Quiz
            Constraint::Length(20), // Subject
            Constraint::Length(8),  // Score
            Constraint::Length(5),  // %
            Constraint::Length(17), // Reason
            Constraint::Length(16), // Completed
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Attempts"))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);

        app.history.scroll_offset = scroll_offset;
    }

    let instructions = Paragraph::new("(↑/↓) scroll  (tab) subject  (b/backspace) back  (esc) quit")
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_app;
    use crate::AppState;
    use chrono::Local;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use quizlock::session::SubmitReason;
    use ratatui::{backend::TestBackend, Terminal};

    fn record(score: u32, max_score: u32) -> AttemptRecord {
        AttemptRecord {
            id: "attempt_1".into(),
            quiz_id: "demo".into(),
            participant_id: "student-1".into(),
            answers: vec![Some(0), None],
            score,
            max_score,
            completed_at: Local::now(),
            subject: "Testing".into(),
            reason: SubmitReason::Timeout,
        }
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(110, 20)).unwrap();
        terminal.draw(|f| render_history(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn present_row_builds_without_panic() {
        let _ = present_row(&record(1, 2), "Demo Quiz");
        let _ = present_row(&record(0, 0), "Empty");
    }

    #[test]
    fn empty_history_shows_placeholder() {
        let (mut app, _) = test_app();
        app.state = AppState::History;

        let out = draw(&mut app);
        assert!(out.contains("No attempts recorded yet."));
        assert!(out.contains("Subject: All"));
    }

    #[test]
    fn history_lists_recorded_attempt() {
        let (mut app, _) = test_app();
        for code in [KeyCode::Enter, KeyCode::Char('s'), KeyCode::Char('y'), KeyCode::Char('h')] {
            app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
        }
        assert_eq!(app.state, AppState::History);

        let out = draw(&mut app);
        assert!(out.contains("Demo Quiz"));
        assert!(out.contains("0/2"));
        assert!(out.contains("manual"));
    }

    #[test]
    fn scroll_offset_is_clamped() {
        let (mut app, _) = test_app();
        app.state = AppState::History;
        app.history.attempts = vec![record(1, 2), record(2, 2)];
        app.history.scroll_offset = 50;

        draw(&mut app);
        assert_eq!(app.history.scroll_offset, 0);
    }
}
