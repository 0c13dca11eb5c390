pub mod history;
pub mod screen;

use quizlock::{session::SubmitReason, util::format_clock};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Below this many seconds the clock turns red
const LOW_TIME_SECS: u32 = 60;

const DIALOG_WIDTH: u16 = 54;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Intro => render_intro(self, area, buf),
            AppState::Quiz => render_quiz(self, area, buf),
            AppState::ConfirmSubmit => {
                render_quiz(self, area, buf);
                render_confirm(self, area, buf);
            }
            AppState::Results => render_results(self, area, buf),
            // drawn by ui::history
            AppState::History => {}
        }

        if matches!(self.state, AppState::Quiz | AppState::ConfirmSubmit) {
            render_notice(self, area, buf);
        }

        if let Some(status) = &self.status {
            let line = Rect::new(
                area.x,
                area.bottom().saturating_sub(1),
                area.width,
                area.height.min(1),
            );
            Paragraph::new(Span::styled(status.as_str(), Style::default().fg(Color::Red)))
                .alignment(Alignment::Center)
                .render(line, buf);
        }
    }
}

fn bold_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn italic_style() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn dim_style() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn render_intro(app: &App, area: Rect, buf: &mut Buffer) {
    let quiz = app.session.quiz();
    let max_warnings = app.session.max_warnings();

    let mut lines = vec![
        Line::from(Span::styled(quiz.title.clone(), bold_style().fg(Color::Cyan))),
        Line::from(""),
    ];
    if !quiz.description.is_empty() {
        lines.push(Line::from(Span::styled(quiz.description.clone(), italic_style())));
        lines.push(Line::from(""));
    }
    lines.extend([
        Line::from(vec![
            Span::styled("Subject: ", dim_style()),
            Span::raw(quiz.subject.clone()),
            Span::styled("   Department: ", dim_style()),
            Span::raw(quiz.department.clone()),
        ]),
        Line::from(vec![
            Span::styled("Questions: ", dim_style()),
            Span::raw(quiz.question_count().to_string()),
            Span::styled("   Time limit: ", dim_style()),
            Span::raw(format!("{} min", quiz.time_limit_minutes)),
            Span::styled("   Points: ", dim_style()),
            Span::raw(quiz.max_score().to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled("Instructions", bold_style())),
        Line::from("Stay in this terminal window until you submit."),
        Line::from("The quiz is submitted automatically when time runs out."),
        Line::from("Leaving the terminal window counts as a warning."),
        Line::from(format!(
            "After {max_warnings} warnings the quiz is submitted automatically."
        )),
        Line::from(""),
        Line::from(Span::styled(
            "(enter) start / (h)istory / (esc)ape",
            italic_style(),
        )),
    ]);

    let height = (lines.len() as u16).min(area.height);
    let top = area.y + area.height.saturating_sub(height) / 2;
    let body = Rect::new(area.x, top, area.width, height);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(body, buf);
}

fn clock_span(seconds: u32) -> Span<'static> {
    let style = if seconds < LOW_TIME_SECS {
        bold_style().fg(Color::Red)
    } else {
        bold_style()
    };
    Span::styled(format!("Time Left: {}", format_clock(seconds)), style)
}

/// One cell per question; answered questions are green, the current one reversed
fn navigator_line(app: &App) -> Line<'static> {
    let current = app.session.current_index();
    let spans = app
        .session
        .answers()
        .iter()
        .enumerate()
        .map(|(idx, answer)| {
            let mut style = if answer.is_some() {
                Style::default().fg(Color::Green)
            } else {
                dim_style()
            };
            if idx == current {
                style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
            }
            Span::styled(format!(" {} ", idx + 1), style)
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn render_quiz(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let question = session.current_question();

    let text_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1) as usize;
    let question_lines = question.text.width().div_ceil(text_width).clamp(1, 6) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(1),
            Constraint::Length(1), // navigator
            Constraint::Length(1),
            Constraint::Length(1), // question number
            Constraint::Length(question_lines), // question text
            Constraint::Min(0),    // options
            Constraint::Length(1), // progress
            Constraint::Length(1), // legend
        ])
        .split(area);

    let warnings_style = if session.warning_count() > 0 {
        Style::default().fg(Color::Yellow)
    } else {
        dim_style()
    };
    let header = Line::from(vec![
        Span::styled(session.quiz().title.clone(), bold_style().fg(Color::Cyan)),
        Span::raw("  |  "),
        clock_span(session.remaining_seconds()),
        Span::raw("  |  "),
        Span::styled(
            format!(
                "Warnings: {}/{}",
                session.warning_count(),
                session.max_warnings()
            ),
            warnings_style,
        ),
    ]);
    Paragraph::new(header).render(chunks[0], buf);

    Paragraph::new(navigator_line(app)).render(chunks[2], buf);

    Paragraph::new(Span::styled(
        format!(
            "Question {} of {}",
            session.current_index() + 1,
            session.quiz().question_count()
        ),
        dim_style(),
    ))
    .render(chunks[4], buf);

    Paragraph::new(Span::styled(question.text.clone(), bold_style()))
        .wrap(Wrap { trim: true })
        .render(chunks[5], buf);

    let selected = session.current_answer();
    let options = question
        .options
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            let marker = if selected == Some(idx) { "(•)" } else { "( )" };
            let cursor = if app.option_cursor == idx { ">" } else { " " };
            let mut style = if selected == Some(idx) {
                bold_style().fg(Color::Green)
            } else {
                Style::default()
            };
            if app.option_cursor == idx {
                style = style.fg(Color::Magenta);
            }
            Line::from(Span::styled(
                format!("{cursor} {marker} {}. {option}", idx + 1),
                style,
            ))
        })
        .collect::<Vec<_>>();
    Paragraph::new(options)
        .wrap(Wrap { trim: false })
        .render(chunks[6], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} answered, {} unanswered",
            session.answered_count(),
            session.unanswered_count()
        ),
        dim_style(),
    ))
    .render(chunks[7], buf);

    Paragraph::new(Span::styled(
        "(↑/↓) choose  (enter) answer  (←/→) question  (s)ubmit",
        italic_style(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[8], buf);
}

/// Rect of at most `width` x `height`, centered in `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_dialog(
    title: &str,
    lines: Vec<Line<'static>>,
    border: Style,
    area: Rect,
    buf: &mut Buffer,
) {
    let dialog = centered_rect(DIALOG_WIDTH, lines.len() as u16 + 2, area);
    Clear.render(dialog, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(Span::styled(title.to_string(), border.add_modifier(Modifier::BOLD))),
        )
        .render(dialog, buf);
}

fn render_confirm(app: &App, area: Rect, buf: &mut Buffer) {
    let unanswered = app.session.unanswered_count();
    let mut lines = vec![
        Line::from("Submit your answers now?"),
        Line::from(format!(
            "Answered {} of {}",
            app.session.answered_count(),
            app.session.quiz().question_count()
        )),
    ];
    if unanswered > 0 {
        lines.push(Line::from(Span::styled(
            format!("You have {unanswered} unanswered question(s)."),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("(y)es / (n)o", italic_style())));

    render_dialog("Submit", lines, Style::default().fg(Color::Cyan), area, buf);
}

fn render_notice(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(notice) = app.session.notice() else {
        return;
    };
    let lines = vec![
        Line::from(Span::styled(notice.headline(), bold_style())),
        Line::from(""),
        Line::from(notice.message()),
    ];
    render_dialog("Proctor", lines, Style::default().fg(Color::Red), area, buf);
}

fn reason_text(reason: SubmitReason) -> &'static str {
    match reason {
        SubmitReason::Timeout => "Time ran out. Your quiz was submitted automatically.",
        SubmitReason::ProctorViolation => {
            "You have exceeded the maximum warnings. Your quiz has been submitted."
        }
        SubmitReason::Manual => "You submitted the quiz.",
    }
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(2), // score
            Constraint::Length(3), // gauge
            Constraint::Min(0),    // details
            Constraint::Length(1), // legend
        ])
        .split(area);

    let session = &app.session;
    Paragraph::new(Span::styled(
        session.quiz().title.clone(),
        bold_style().fg(Color::Cyan),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let Some(outcome) = session.outcome() else {
        Paragraph::new("No result yet")
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        return;
    };

    let percentage = outcome.score.percentage();
    let score_color = match percentage {
        80.. => Color::Green,
        50.. => Color::Yellow,
        _ => Color::Red,
    };

    Paragraph::new(Line::from(vec![
        Span::styled("Score: ", bold_style()),
        Span::styled(
            format!("{} / {}", outcome.score.score, outcome.score.max_score),
            bold_style().fg(score_color),
        ),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(score_color))
        .percent(percentage.min(100) as u16)
        .label(format!("{percentage}%"))
        .render(chunks[2], buf);

    let mut details = vec![
        Line::from(reason_text(outcome.reason)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Answered: ", dim_style()),
            Span::raw(format!(
                "{} of {}",
                session.answered_count(),
                session.quiz().question_count()
            )),
        ]),
        Line::from(vec![
            Span::styled("Completed: ", dim_style()),
            Span::raw(outcome.completed_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]),
    ];
    if let Some(id) = &outcome.attempt_id {
        details.push(Line::from(vec![
            Span::styled("Saved as: ", dim_style()),
            Span::raw(id.clone()),
        ]));
    }
    Paragraph::new(details)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    Paragraph::new(Span::styled("(h)istory / (esc)ape", italic_style()))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
}
