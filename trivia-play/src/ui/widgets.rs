use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use trivia_client::{AnswerOutcome, Question, SessionRecord};

use crate::session::GameSession;
use crate::timer::QuestionTimer;

/// Trivia title, position, score and the question timer.
pub struct HeaderWidget<'a> {
    pub session: &'a GameSession,
    pub elapsed_seconds: u32,
}

impl Widget for HeaderWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = self.session.trivia_title.as_deref().unwrap_or("Trivia");
        let block = Block::default()
            .title(format!(" {title} "))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let line = Line::from(vec![
            Span::styled(
                format!(
                    "Question {}/{}",
                    self.session.current_question_pointer, self.session.total_questions
                ),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(
                format!("Score {}", self.session.total_score),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw("   "),
            Span::styled(
                QuestionTimer::format_time(Duration::from_secs(u64::from(self.elapsed_seconds))),
                Style::default().fg(Color::DarkGray),
            ),
        ]);

        Paragraph::new(line).block(block).render(area, buf);
    }
}

/// The question text and its numbered options.
///
/// While feedback is shown the correct option is green and a wrong pick is
/// red; otherwise the cursor row is highlighted.
pub struct QuestionWidget<'a> {
    pub question: Option<&'a Question>,
    pub cursor: usize,
    pub selected: Option<&'a str>,
    pub feedback: Option<&'a AnswerOutcome>,
}

impl QuestionWidget<'_> {
    fn option_style(&self, index: usize, option_id: &str) -> Style {
        let picked = self.selected == Some(option_id);
        match self.feedback {
            Some(outcome) => {
                let correct = outcome
                    .correct_option
                    .as_ref()
                    .map_or(picked && outcome.is_correct, |c| c.option_id == option_id);
                if correct {
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD)
                } else if picked {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::DarkGray)
                }
            }
            None if index == self.cursor => Style::default().add_modifier(Modifier::REVERSED),
            None => Style::default(),
        }
    }
}

impl Widget for QuestionWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL);

        let Some(question) = self.question else {
            Paragraph::new(Line::from(Span::styled(
                "Question not loaded.",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block)
            .render(area, buf);
            return;
        };

        let block = block.title(format!(" {} pts ", question.points_value));
        let mut lines = vec![
            Line::from(Span::styled(
                question.text.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        for (i, option) in question.options.iter().enumerate() {
            lines.push(Line::from(Span::styled(
                format!(" {}) {}", i + 1, option.text),
                self.option_style(i, &option.option_id),
            )));
        }

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Feedback, errors and key hints under the question.
pub struct FooterWidget<'a> {
    pub feedback: Option<&'a AnswerOutcome>,
    pub advance_in: Option<Duration>,
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
    pub question_loaded: bool,
    pub stalled: bool,
}

impl Widget for FooterWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines = Vec::new();

        if let Some(outcome) = self.feedback {
            let line = if outcome.is_correct {
                Span::styled(
                    format!("Correct! +{}", outcome.points_earned),
                    Style::default().fg(Color::Green),
                )
            } else {
                let text = match &outcome.correct_option {
                    Some(correct) => format!("Wrong. The answer was: {}", correct.text),
                    None => "Wrong.".to_string(),
                };
                Span::styled(text, Style::default().fg(Color::Red))
            };
            lines.push(Line::from(line));

            if let Some(remaining) = self.advance_in.filter(|d| !d.is_zero()) {
                let label = if outcome.is_last() {
                    "Finishing"
                } else {
                    "Next question"
                };
                lines.push(Line::from(format!(
                    "{label} in {:.1}s",
                    remaining.as_secs_f32()
                )));
            }
        }

        if let Some(error) = self.error {
            lines.push(Line::from(Span::styled(
                format!("! {error}"),
                Style::default().fg(Color::Red),
            )));
        }
        if let Some(notice) = self.notice {
            lines.push(Line::from(Span::styled(
                notice.to_string(),
                Style::default().fg(Color::Yellow),
            )));
        }

        let hints = if self.stalled {
            " Enter: Retry  s: Save and exit  a: Abandon"
        } else if !self.question_loaded && self.feedback.is_none() {
            " r: Retry  s: Save and exit  a: Abandon"
        } else {
            " 1-9/Enter: Answer  \u{2191}\u{2193}: Move  s: Save and exit  a: Abandon"
        };
        lines.push(Line::from(Span::styled(
            hints,
            Style::default().fg(Color::DarkGray),
        )));

        Paragraph::new(lines).render(area, buf);
    }
}

/// Yes/no overlay.
pub struct ConfirmDialog<'a> {
    pub title: &'a str,
    pub message: &'a str,
}

impl Widget for ConfirmDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = (self.message.len() as u16 + 4).max(30).min(area.width);
        let popup_area = centered_rect(width, 5, area);
        Clear.render(popup_area, buf);

        let block = dialog_block(self.title);
        let inner = block.inner(popup_area);
        block.render(popup_area, buf);

        Paragraph::new(vec![
            Line::from(self.message.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                " y: Yes  any other key: No",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .render(inner, buf);
    }
}

/// Offer to continue an unfinished game instead of starting a new one.
pub struct ConflictDialog<'a> {
    pub active: &'a SessionRecord,
}

impl Widget for ConflictDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(50.min(area.width), 7, area);
        Clear.render(popup_area, buf);

        let block = dialog_block(" Unfinished game ");
        let inner = block.inner(popup_area);
        block.render(popup_area, buf);

        let title = self
            .active
            .trivia_title
            .as_deref()
            .unwrap_or(&self.active.trivia_id);
        Paragraph::new(vec![
            Line::from(Span::styled(
                title.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "{}/{} answered, {} pts",
                self.active.answered_count, self.active.total_questions, self.active.total_score
            )),
            Line::from(""),
            Line::from(Span::styled(
                " c: Continue it  n: Start the new one",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .wrap(Wrap { trim: true })
        .render(inner, buf);
    }
}

/// Final result of a finished game.
pub struct SummaryWidget<'a> {
    pub session: &'a GameSession,
}

impl Widget for SummaryWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(44.min(area.width), 8, area);
        Clear.render(popup_area, buf);

        let block = dialog_block(" Game over ");
        let inner = block.inner(popup_area);
        block.render(popup_area, buf);

        let s = self.session;
        Paragraph::new(vec![
            Line::from(format!("Status: {}", s.status.as_str())),
            Line::from(format!(
                "{} of {} correct",
                s.correct_answers, s.total_questions
            )),
            Line::from(Span::styled(
                format!("{} points", s.total_score),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "Time {}",
                QuestionTimer::format_time(Duration::from_secs(u64::from(s.time_spent_seconds)))
            )),
            Line::from(""),
            Line::from(Span::styled(
                " Press any key",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .render(inner, buf);
    }
}

fn dialog_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .style(Style::default().bg(Color::Black))
}

/// Helper to create a centered Rect within an area.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}

/// Rendered text of a buffer, one line per row.
#[cfg(test)]
pub(crate) fn buffer_text(buf: &Buffer) -> String {
    buf.content
        .chunks(usize::from(buf.area.width.max(1)))
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
