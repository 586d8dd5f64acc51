//! Prompts shown outside the play screen.

use std::io::{self, Write};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use futures::{Stream, StreamExt};
use ratatui::{backend::Backend, Terminal};
use trivia_client::SessionRecord;

use super::widgets::ConflictDialog;

/// Read a password without echoing it.
pub fn read_password(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    enable_raw_mode()?;
    let entered = collect_password(std::iter::from_fn(|| Some(event::read())));
    disable_raw_mode()?;
    println!();

    entered?.ok_or_else(|| io::Error::new(io::ErrorKind::Interrupted, "password entry cancelled"))
}

/// Accumulate typed characters until Enter. `None` when the player cancels
/// or input ends.
pub(crate) fn collect_password<I>(events: I) -> io::Result<Option<String>>
where
    I: IntoIterator<Item = io::Result<Event>>,
{
    let mut password = String::new();
    for event in events {
        let Event::Key(key) = event? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(Some(password)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None)
            }
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char(c) => password.push(c),
            _ => {}
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Continue,
    StartNew,
    Cancel,
}

/// Ask whether to continue `active` or start the new game anyway.
pub async fn choose_on_conflict<B, S>(
    terminal: &mut Terminal<B>,
    events: &mut S,
    active: &SessionRecord,
) -> io::Result<ConflictChoice>
where
    B: Backend,
    S: Stream<Item = io::Result<Event>> + Unpin,
{
    terminal.draw(|f| f.render_widget(ConflictDialog { active }, f.area()))?;

    while let Some(event) = events.next().await {
        let Event::Key(key) = event? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('c') | KeyCode::Enter => return Ok(ConflictChoice::Continue),
            KeyCode::Char('n') => return Ok(ConflictChoice::StartNew),
            KeyCode::Esc | KeyCode::Char('q') => return Ok(ConflictChoice::Cancel),
            _ => {}
        }
    }
    Ok(ConflictChoice::Cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::widgets::buffer_text;
    use crossterm::event::KeyEvent;
    use ratatui::backend::TestBackend;
    use trivia_client::SessionStatus;

    fn key(code: KeyCode) -> io::Result<Event> {
        Ok(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    #[test]
    fn test_password_editing() {
        let typed = vec![
            key(KeyCode::Char('s')),
            key(KeyCode::Char('e')),
            key(KeyCode::Char('x')),
            key(KeyCode::Backspace),
            key(KeyCode::Char('c')),
            key(KeyCode::Enter),
            key(KeyCode::Char('z')),
        ];
        assert_eq!(collect_password(typed).unwrap().as_deref(), Some("sec"));
    }

    #[test]
    fn test_password_cancel() {
        assert_eq!(collect_password(vec![key(KeyCode::Char('a')), key(KeyCode::Esc)]).unwrap(), None);
        let ctrl_c = Ok(Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert_eq!(collect_password(vec![ctrl_c]).unwrap(), None);
        assert_eq!(collect_password(Vec::new()).unwrap(), None);
    }

    #[tokio::test]
    async fn test_conflict_choice() {
        let active = SessionRecord {
            session_id: "s1".into(),
            trivia_id: "trivia-A".into(),
            trivia_title: Some("Capitals".into()),
            player_id: None,
            status: SessionStatus::InProgress,
            answered_count: 2,
            total_questions: 3,
            correct_answers: 1,
            total_score: 10,
            time_spent_seconds: 20,
            started_at: None,
            completed_at: None,
        };
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();

        let mut events = futures::stream::iter(vec![key(KeyCode::Char('x')), key(KeyCode::Char('n'))]);
        let choice = choose_on_conflict(&mut terminal, &mut events, &active).await.unwrap();
        assert_eq!(choice, ConflictChoice::StartNew);
        let screen = buffer_text(terminal.backend().buffer());
        assert!(screen.contains("Capitals"));
        assert!(screen.contains("2/3 answered"));

        let mut events = futures::stream::iter(vec![key(KeyCode::Char('c'))]);
        let choice = choose_on_conflict(&mut terminal, &mut events, &active).await.unwrap();
        assert_eq!(choice, ConflictChoice::Continue);

        let mut events = futures::stream::iter(Vec::<io::Result<Event>>::new());
        let choice = choose_on_conflict(&mut terminal, &mut events, &active).await.unwrap();
        assert_eq!(choice, ConflictChoice::Cancel);
    }
}
