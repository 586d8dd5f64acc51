//! Interactive play loop over a [`GameController`].
//!
//! Each pass takes a snapshot, draws it, and waits for a key or a redraw
//! tick. Game errors are shown on screen, never returned; only terminal I/O
//! failures end the loop with an error.

use std::io;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::{Stream, StreamExt};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use trivia_client::{Question, SessionGateway};

use super::widgets::{ConfirmDialog, FooterWidget, HeaderWidget, QuestionWidget, SummaryWidget};
use crate::clock::Clock;
use crate::controller::{AbandonOutcome, GameController, GameSnapshot, PhaseKind};
use crate::session::GameSession;

/// Redraw interval for the timer and countdown.
const TICK: Duration = Duration::from_millis(100);

/// Why the play loop returned.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayExit {
    Completed(GameSession),
    /// Left with the session still open; holds its id.
    Saved(String),
    /// `confirmed` is false when the backend did not acknowledge the
    /// abandon and the session may still be open.
    Abandoned { confirmed: bool },
    /// Input closed, or the controller left the game screens.
    Ended,
}

/// Screen-local state that is not part of the game.
#[derive(Debug, Default)]
struct Screen {
    cursor: usize,
    confirm_abandon: bool,
    /// Advancing past feedback failed; wait for the player before retrying.
    stalled: bool,
    notice: Option<String>,
    question_id: Option<String>,
}

pub async fn play<G, C, B, S>(
    ctl: &mut GameController<G, C>,
    terminal: &mut Terminal<B>,
    events: &mut S,
) -> io::Result<PlayExit>
where
    G: SessionGateway,
    C: Clock,
    B: Backend,
    S: Stream<Item = io::Result<Event>> + Unpin,
{
    let mut screen = Screen::default();

    loop {
        let snap = ctl.snapshot();
        let question_id = snap.question.as_ref().map(|q| q.question_id.clone());
        if question_id != screen.question_id {
            screen.cursor = 0;
            screen.question_id = question_id;
        }

        match snap.phase {
            PhaseKind::Answering | PhaseKind::Feedback => {}
            PhaseKind::Completed => {
                let Some(session) = snap.session else {
                    return Ok(PlayExit::Ended);
                };
                terminal.draw(|f| f.render_widget(SummaryWidget { session: &session }, f.area()))?;
                wait_for_key(events).await?;
                return Ok(PlayExit::Completed(session));
            }
            _ => return Ok(PlayExit::Ended),
        }

        if snap.phase == PhaseKind::Feedback
            && snap.can_advance
            && !screen.stalled
            && !screen.confirm_abandon
        {
            if let Err(e) = ctl.advance().await {
                tracing::debug!(error = %e, "advance failed");
                screen.stalled = true;
            }
            continue;
        }

        terminal.draw(|f| draw(f, &snap, &screen))?;

        let countdown = snap
            .advance_in
            .filter(|d| !d.is_zero() && !screen.confirm_abandon);
        let next = match countdown {
            Some(remaining) => tokio::select! {
                biased;
                _ = ctl.clock().sleep(remaining.min(TICK)) => None,
                event = events.next() => Some(event),
            },
            None => tokio::select! {
                biased;
                event = events.next() => Some(event),
                _ = tokio::time::sleep(TICK) => None,
            },
        };

        let event = match next {
            None => continue,
            Some(None) => return Ok(PlayExit::Ended),
            Some(Some(Err(e))) => return Err(e),
            Some(Some(Ok(event))) => event,
        };
        let Event::Key(key) = event else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if let Some(exit) = handle_key(ctl, &snap, &mut screen, key).await {
            return Ok(exit);
        }
    }
}

fn draw(frame: &mut Frame, snap: &GameSnapshot, screen: &Screen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(frame.area());

    if let Some(session) = &snap.session {
        frame.render_widget(
            HeaderWidget {
                session,
                elapsed_seconds: snap.elapsed_seconds,
            },
            chunks[0],
        );
    }
    frame.render_widget(
        QuestionWidget {
            question: snap.question.as_ref(),
            cursor: screen.cursor,
            selected: snap.selected_option.as_deref(),
            feedback: snap.feedback.as_ref(),
        },
        chunks[1],
    );
    frame.render_widget(
        FooterWidget {
            feedback: snap.feedback.as_ref(),
            advance_in: snap.advance_in,
            error: snap.error.as_deref(),
            notice: screen.notice.as_deref(),
            question_loaded: snap.question.is_some(),
            stalled: screen.stalled,
        },
        chunks[2],
    );

    if screen.confirm_abandon {
        frame.render_widget(
            ConfirmDialog {
                title: " Abandon ",
                message: "Abandon this game? Progress is lost.",
            },
            frame.area(),
        );
    }
}

async fn handle_key<G, C>(
    ctl: &mut GameController<G, C>,
    snap: &GameSnapshot,
    screen: &mut Screen,
    key: KeyEvent,
) -> Option<PlayExit>
where
    G: SessionGateway,
    C: Clock,
{
    screen.notice = None;

    if screen.confirm_abandon {
        screen.confirm_abandon = false;
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            return abandon(ctl).await;
        }
        return None;
    }

    let interrupt =
        key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
    if interrupt || matches!(key.code, KeyCode::Char('s') | KeyCode::Esc) {
        return save(ctl);
    }
    if key.code == KeyCode::Char('a') {
        screen.confirm_abandon = true;
        return None;
    }

    match (snap.phase, &snap.question) {
        (PhaseKind::Feedback, _) => {
            if screen.stalled && key.code == KeyCode::Enter {
                ctl.dismiss_error();
                screen.stalled = false;
            }
        }
        (PhaseKind::Answering, None) => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char('r')) {
                retry(ctl).await;
            }
        }
        (PhaseKind::Answering, Some(question)) => {
            let last = question.options.len().saturating_sub(1);
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => screen.cursor = screen.cursor.saturating_sub(1),
                KeyCode::Down | KeyCode::Char('j') => screen.cursor = (screen.cursor + 1).min(last),
                KeyCode::Enter => answer(ctl, question, screen.cursor, screen).await,
                KeyCode::Char(c) => {
                    let index = c
                        .to_digit(10)
                        .and_then(|d| (d as usize).checked_sub(1))
                        .filter(|i| *i <= last);
                    match index {
                        Some(i) => {
                            screen.cursor = i;
                            answer(ctl, question, i, screen).await;
                        }
                        None => {
                            screen.notice =
                                Some(format!("Press 1-{} to answer.", question.options.len()))
                        }
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }
    None
}

async fn answer<G, C>(
    ctl: &mut GameController<G, C>,
    question: &Question,
    index: usize,
    screen: &mut Screen,
) where
    G: SessionGateway,
    C: Clock,
{
    let Some(option) = question.options.get(index) else {
        return;
    };
    if ctl.select_option(&option.option_id).is_err() {
        return;
    }
    match ctl.submit_answer().await {
        Ok(()) => {}
        Err(e) if e.is_retryable() => screen.notice = Some("Choose again to retry.".to_string()),
        Err(_) => {}
    }
}

/// No question is on screen. Retry the load, or completion once every
/// question has been answered.
async fn retry<G, C>(ctl: &mut GameController<G, C>)
where
    G: SessionGateway,
    C: Clock,
{
    let all_answered = ctl.session().is_some_and(|s| s.all_answered());
    let result = if all_answered {
        ctl.complete_now().await
    } else {
        ctl.reload_question().await
    };
    match result {
        Ok(()) => {}
        Err(e) => tracing::debug!(error = %e, all_answered, "retry failed"),
    }
}

async fn abandon<G, C>(ctl: &mut GameController<G, C>) -> Option<PlayExit>
where
    G: SessionGateway,
    C: Clock,
{
    match ctl.abandon().await {
        Ok(AbandonOutcome::Abandoned | AbandonOutcome::AlreadyFinished) => {
            Some(PlayExit::Abandoned { confirmed: true })
        }
        Ok(AbandonOutcome::Unconfirmed(_)) => Some(PlayExit::Abandoned { confirmed: false }),
        Err(_) => None,
    }
}

fn save<G, C>(ctl: &mut GameController<G, C>) -> Option<PlayExit>
where
    G: SessionGateway,
    C: Clock,
{
    ctl.save_and_exit().ok().map(PlayExit::Saved)
}

async fn wait_for_key<S>(events: &mut S) -> io::Result<()>
where
    S: Stream<Item = io::Result<Event>> + Unpin,
{
    while let Some(event) = events.next().await {
        if let Event::Key(key) = event? {
            if key.kind == KeyEventKind::Press {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::GameConfig;
    use crate::controller::GameType;
    use crate::ui::widgets::buffer_text;
    use ratatui::backend::TestBackend;
    use trivia_client::{
        AnswerSubmission, ClientError, MockCall, MockSessionGateway, ScriptedQuestion,
        SessionRecord, SessionStatus,
    };

    type TestController = GameController<MockSessionGateway, ManualClock>;

    fn keys(codes: &[KeyCode]) -> impl Stream<Item = io::Result<Event>> + Unpin {
        let events: Vec<io::Result<Event>> = codes
            .iter()
            .map(|code| Ok(Event::Key(KeyEvent::new(*code, KeyModifiers::NONE))))
            .collect();
        futures::stream::iter(events)
    }

    fn chars(script: &str) -> Vec<KeyCode> {
        script.chars().map(KeyCode::Char).collect()
    }

    async fn started(mock: &MockSessionGateway) -> TestController {
        let mut ctl = GameController::new(mock.clone(), ManualClock::new(), GameConfig::default());
        ctl.select_game_type(GameType::Own).unwrap();
        ctl.start_game("trivia-A").await.unwrap();
        ctl
    }

    async fn run(ctl: &mut TestController, codes: &[KeyCode]) -> (PlayExit, String) {
        let mut terminal = Terminal::new(TestBackend::new(70, 20)).unwrap();
        let mut events = keys(codes);
        let exit = play(ctl, &mut terminal, &mut events).await.unwrap();
        (exit, buffer_text(terminal.backend().buffer()))
    }

    #[tokio::test]
    async fn test_full_game() {
        let mock = MockSessionGateway::new().with_standard_trivia();
        let mut ctl = started(&mock).await;
        let (exit, screen) = run(&mut ctl, &chars("111")).await;

        let PlayExit::Completed(session) = exit else {
            panic!("expected completion, got {exit:?}");
        };
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.total_score, 60);
        assert!(screen.contains("3 of 3 correct"));
        assert!(screen.contains("60 points"));
    }

    #[tokio::test]
    async fn test_cursor_and_enter_answer() {
        let mock = MockSessionGateway::new().with_standard_trivia();
        let mut ctl = started(&mock).await;
        let (exit, _) = run(
            &mut ctl,
            &[KeyCode::Down, KeyCode::Down, KeyCode::Up, KeyCode::Enter, KeyCode::Char('s')],
        )
        .await;

        assert!(matches!(exit, PlayExit::Saved(_)));
        let sent = mock.get_calls().into_iter().find_map(|c| match c {
            MockCall::SubmitAnswer { submission, .. } => Some(submission),
            _ => None,
        });
        assert_eq!(sent.unwrap().selected_option_id, "q1-o2");
    }

    #[tokio::test]
    async fn test_wrong_answer_shows_correct_option() {
        let mock = MockSessionGateway::new()
            .with_standard_trivia()
            .with_question_response(|n| {
                if n == 1 {
                    let options = ["Paris", "Lyon", "Nice"];
                    Ok(ScriptedQuestion::new(1, "Capital of France?", 10, &options).question)
                } else {
                    Err(ClientError::Server {
                        status: 503,
                        message: "busy".into(),
                    })
                }
            });
        let mut ctl = started(&mock).await;
        let (exit, screen) = run(&mut ctl, &chars("2")).await;

        assert_eq!(exit, PlayExit::Ended);
        assert!(screen.contains("Wrong. The answer was: Paris"));
        assert!(screen.contains("Enter: Retry"));
        let session = ctl.session().unwrap();
        assert_eq!(session.current_question_pointer, 1);
        assert_eq!(session.correct_answers, 0);
    }

    #[tokio::test]
    async fn test_resumed_answered_session_completes_on_retry() {
        let attempts = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = attempts.clone();
        let max_attempts = GameConfig::default().completion.max_attempts;
        let mock = MockSessionGateway::new()
            .with_standard_trivia()
            .with_complete_session_response(move |id| {
                if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < max_attempts {
                    return Err(ClientError::not_all_answered());
                }
                Ok(SessionRecord {
                    session_id: id,
                    trivia_id: "trivia-A".into(),
                    trivia_title: None,
                    player_id: None,
                    status: SessionStatus::Completed,
                    answered_count: 3,
                    total_questions: 3,
                    correct_answers: 3,
                    total_score: 60,
                    time_spent_seconds: 9,
                    started_at: None,
                    completed_at: None,
                })
            });
        let record = mock.create_session("trivia-A").await.unwrap();
        for n in 1..=3 {
            let question = mock.question(&record.session_id, n).await.unwrap();
            let submission = AnswerSubmission {
                question_id: question.question_id.clone(),
                selected_option_id: question.options[0].option_id.clone(),
                time_taken_seconds: 3,
            };
            mock.submit_answer(&record.session_id, &submission).await.unwrap();
        }

        let mut ctl = GameController::new(mock.clone(), ManualClock::new(), GameConfig::default());
        assert!(ctl.resume_session(&record.session_id).await.is_err());
        assert!(ctl.question().is_none());

        let (exit, screen) = run(&mut ctl, &chars("r")).await;
        let PlayExit::Completed(session) = exit else {
            panic!("expected completion, got {exit:?}");
        };
        assert_eq!(session.total_score, 60);
        assert!(screen.contains("3 of 3 correct"));
        assert!(!mock.get_calls().iter().any(|c| matches!(
            c,
            MockCall::Question {
                question_number: 4,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_out_of_range_choice_shows_hint() {
        let mock = MockSessionGateway::new().with_standard_trivia();
        let mut ctl = started(&mock).await;
        let mut terminal = Terminal::new(TestBackend::new(70, 20)).unwrap();
        let mut events = keys(&chars("9"));

        let exit = play(&mut ctl, &mut terminal, &mut events).await.unwrap();
        assert_eq!(exit, PlayExit::Ended);
        assert!(buffer_text(terminal.backend().buffer()).contains("Press 1-3 to answer."));
        assert!(!mock
            .get_calls()
            .iter()
            .any(|c| matches!(c, MockCall::SubmitAnswer { .. })));
    }

    #[tokio::test]
    async fn test_abandon_requires_confirmation() {
        let mock = MockSessionGateway::new().with_standard_trivia();
        let mut ctl = started(&mock).await;
        let (exit, _) = run(&mut ctl, &chars("anay")).await;

        assert_eq!(exit, PlayExit::Abandoned { confirmed: true });
        assert!(mock.in_progress_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandon_failure_still_leaves() {
        let mock = MockSessionGateway::new()
            .with_standard_trivia()
            .with_abandon_session_response(|_| {
                Err(ClientError::Server {
                    status: 502,
                    message: "bad gateway".into(),
                })
            });
        let mut ctl = started(&mock).await;
        let (exit, _) = run(&mut ctl, &chars("ay")).await;
        assert_eq!(exit, PlayExit::Abandoned { confirmed: false });
    }

    #[tokio::test]
    async fn test_ctrl_c_saves() {
        let mock = MockSessionGateway::new().with_standard_trivia();
        let mut ctl = started(&mock).await;
        let session_id = ctl.session().unwrap().session_id.clone();
        let mut terminal = Terminal::new(TestBackend::new(70, 20)).unwrap();
        let mut events = futures::stream::iter(vec![Ok(Event::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )))]);

        let exit = play(&mut ctl, &mut terminal, &mut events).await.unwrap();
        assert_eq!(exit, PlayExit::Saved(session_id));
    }

    #[tokio::test]
    async fn test_failed_completion_offers_completion_retry() {
        let attempts = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = attempts.clone();
        let mock = MockSessionGateway::new()
            .with_standard_trivia()
            .with_complete_session_response(move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err(ClientError::not_all_answered())
            });
        let mut ctl = started(&mock).await;
        let mut script = chars("111");
        script.push(KeyCode::Enter);
        let (exit, screen) = run(&mut ctl, &script).await;

        assert_eq!(exit, PlayExit::Ended);
        assert_eq!(ctl.phase().kind(), PhaseKind::Feedback);
        assert!(screen.contains("Enter: Retry"));
        let max_attempts = GameConfig::default().completion.max_attempts;
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2 * max_attempts);
        assert!(!mock.get_calls().iter().any(|c| matches!(
            c,
            MockCall::Question {
                question_number: 4,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_end_of_input() {
        let mock = MockSessionGateway::new().with_standard_trivia();
        let mut ctl = started(&mock).await;
        let (exit, screen) = run(&mut ctl, &[]).await;
        assert_eq!(exit, PlayExit::Ended);
        assert!(screen.contains("Question 1/3"));
        assert!(screen.contains("Capital of France?"));
    }
}
