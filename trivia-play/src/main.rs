//! `trivia` command-line client.
//!
//! Account commands persist the login under the data directory; `play` and
//! `resume` run the game full screen. Debug logs go to a daily file under
//! the log directory (`RUST_LOG` controls the filter).

use std::io;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::event::EventStream;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trivia_client::{
    CatalogGateway, Difficulty, ExternalQuery, ExternalQuestionKind, HistoryQuery, SessionGateway,
    SessionStatus, TriviaClient,
};
use trivia_play::catalog::MAX_EXTERNAL_QUESTIONS;
use trivia_play::ui::{self, listing, ConflictChoice, PlayExit, Tui};
use trivia_play::{
    AppContext, GameController, GameResult, GameType, PhaseKind, QuestionTimer, Settings,
    TokioClock,
};

#[derive(Parser)]
#[command(name = "trivia", about = "Play trivia games from the terminal")]
struct Cli {
    /// Backend base URL, overriding TRIVIA_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session token.
    Login {
        #[arg(short, long)]
        email: String,
        /// Prompted for when omitted.
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account and log in.
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the saved login.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// Start a new game of a published trivia, or of fresh questions from
    /// the external bank with --external.
    Play {
        #[arg(required_unless_present = "external")]
        trivia_id: Option<String>,
        #[arg(long, conflicts_with = "trivia_id")]
        external: bool,
        /// Number of external questions.
        #[arg(long, default_value_t = 10, requires = "external",
              value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_EXTERNAL_QUESTIONS)))]
        amount: u32,
        #[arg(long, value_enum, default_value_t = DifficultyArg::Medium, requires = "external")]
        difficulty: DifficultyArg,
        /// External bank category id, see `trivia categories`.
        #[arg(long, requires = "external")]
        category: Option<u32>,
        /// True/false questions instead of multiple choice.
        #[arg(long, requires = "external")]
        boolean: bool,
    },
    /// Continue a game. Defaults to the current in-progress session.
    Resume { session_id: Option<String> },
    /// List in-progress sessions.
    Sessions,
    /// List past sessions.
    History {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// List published trivias.
    Trivias,
    /// List trivia categories, including those of the external bank.
    Categories,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    InProgress,
    Completed,
    Abandoned,
}

impl From<StatusArg> for SessionStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::InProgress => SessionStatus::InProgress,
            StatusArg::Completed => SessionStatus::Completed,
            StatusArg::Abandoned => SessionStatus::Abandoned,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

/// What a new game is played on.
enum Start {
    Trivia(String),
    External(ExternalQuery),
}

type Controller = GameController<TriviaClient, TokioClock>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }

    std::fs::create_dir_all(&settings.log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&settings.log_dir, "trivia");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(api_url = %settings.api_url, "trivia client starting");

    let mut ctx = AppContext::from_settings(settings).context("invalid TRIVIA_API_URL")?;
    ctx.initialize().context("could not read saved login")?;

    let result = run(cli.command, &mut ctx).await;
    if let Err(ref e) = result {
        tracing::error!(error = %e, "command failed");
    }
    tracing::info!("trivia client shutting down");
    result
}

async fn run(command: Commands, ctx: &mut AppContext) -> anyhow::Result<()> {
    match command {
        Commands::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let user = ctx.login(&email, &password).await?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let password = password_or_prompt(password)?;
            let user = ctx.register(&name, &email, &password).await?;
            println!("Welcome, {}!", user.name);
        }
        Commands::Logout => {
            ctx.logout()?;
            println!("Logged out.");
        }
        Commands::Whoami => match ctx.refresh_user().await? {
            Some(user) => println!(
                "{} <{}>  total score {}",
                user.name, user.email, user.total_score
            ),
            None => println!("Not logged in."),
        },
        Commands::Play {
            trivia_id,
            external,
            amount,
            difficulty,
            category,
            boolean,
        } => {
            let (game_type, start) = match trivia_id {
                Some(id) if !external => (GameType::Own, Start::Trivia(id)),
                _ => {
                    let query = ExternalQuery {
                        amount,
                        category,
                        difficulty: difficulty.into(),
                        kind: if boolean {
                            ExternalQuestionKind::Boolean
                        } else {
                            ExternalQuestionKind::Multiple
                        },
                        ..ExternalQuery::default()
                    };
                    (GameType::External, Start::External(query))
                }
            };

            let mut ctl = controller(ctx)?;
            ctl.select_game_type(game_type)?;
            let mut events = EventStream::new();
            let mut terminal = ui::enter()?;
            let outcome = play_new(&mut ctl, &mut terminal, &mut events, game_type, &start).await;
            ui::leave(&mut terminal)?;
            report(ctx, outcome?).await?;
        }
        Commands::Resume { session_id } => {
            let mut ctl = controller(ctx)?;
            match session_id {
                Some(id) => {
                    let result = ctl.resume_session(&id).await;
                    playable(&ctl, result)?;
                }
                None => {
                    if !ctl.check_active_session().await? {
                        println!("No game in progress.");
                        return Ok(());
                    }
                    let result = ctl.continue_active_session().await;
                    playable(&ctl, result)?;
                }
            }
            if ctl.phase().kind() == PhaseKind::Completed {
                let exit = ctl.session().cloned().map(PlayExit::Completed);
                return report(ctx, exit).await;
            }

            let mut events = EventStream::new();
            let mut terminal = ui::enter()?;
            let outcome = ui::play(&mut ctl, &mut terminal, &mut events).await;
            ui::leave(&mut terminal)?;
            report(ctx, Some(outcome?)).await?;
        }
        Commands::Sessions => {
            let client = ctx.session_client()?;
            let sessions = client.in_progress_sessions().await?;
            listing::render_sessions(&mut io::stdout(), &sessions)?;
        }
        Commands::History { status, limit } => {
            let client = ctx.session_client()?;
            let query = HistoryQuery {
                limit: Some(limit),
                status: status.map(SessionStatus::from),
                ..HistoryQuery::default()
            };
            let sessions = client.session_history(&query).await?;
            listing::render_sessions(&mut io::stdout(), &sessions)?;
        }
        Commands::Trivias => {
            let client = ctx.session_client()?;
            let trivias = client.published_trivias().await?;
            listing::render_trivias(&mut io::stdout(), &trivias)?;
        }
        Commands::Categories => {
            let client = ctx.session_client()?;
            let own = client.categories().await?;
            let external = client.external_categories().await?;
            listing::render_categories(&mut io::stdout(), &own, &external)?;
        }
    }
    Ok(())
}

fn controller(ctx: &AppContext) -> anyhow::Result<Controller> {
    let client = ctx.session_client()?;
    Ok(GameController::new(client, TokioClock, ctx.settings().game))
}

/// A failed start or resume still leaves a playable screen when the
/// controller is on a question, e.g. one that failed to load.
fn playable(ctl: &Controller, result: GameResult<()>) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(_) if matches!(ctl.phase().kind(), PhaseKind::Answering | PhaseKind::Feedback) => {
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Start a new game, first offering to continue an unfinished one. `None`
/// when the player backed out at that prompt.
async fn play_new(
    ctl: &mut Controller,
    terminal: &mut Tui,
    events: &mut EventStream,
    game_type: GameType,
    start: &Start,
) -> anyhow::Result<Option<PlayExit>> {
    if ctl.check_active_session().await? {
        let choice = match ctl.snapshot().active_session {
            Some(active) => ui::choose_on_conflict(terminal, events, &active).await?,
            None => ConflictChoice::StartNew,
        };
        match choice {
            ConflictChoice::Continue => {
                let result = ctl.continue_active_session().await;
                playable(ctl, result)?;
                return Ok(Some(ui::play(ctl, terminal, events).await?));
            }
            ConflictChoice::StartNew => {
                ctl.dismiss_active_session()?;
                ctl.select_game_type(game_type)?;
            }
            ConflictChoice::Cancel => return Ok(None),
        }
    }

    let result = match start {
        Start::Trivia(trivia_id) => ctl.start_game(trivia_id).await,
        Start::External(query) => ctl.start_external_game(query).await,
    };
    playable(ctl, result)?;
    Ok(Some(ui::play(ctl, terminal, events).await?))
}

async fn report(ctx: &mut AppContext, exit: Option<PlayExit>) -> anyhow::Result<()> {
    match exit {
        Some(PlayExit::Completed(session)) => {
            println!(
                "Game {}: {} of {} correct, {} points in {}",
                session.status.as_str(),
                session.correct_answers,
                session.total_questions,
                session.total_score,
                QuestionTimer::format_time(std::time::Duration::from_secs(u64::from(
                    session.time_spent_seconds
                )))
            );
            if let Some(user) = ctx.refresh_user().await? {
                println!("Total score: {}", user.total_score);
            }
        }
        Some(PlayExit::Saved(session_id)) => {
            println!("Saved. Resume with `trivia resume {session_id}`.")
        }
        Some(PlayExit::Abandoned { confirmed: true }) => println!("Game abandoned."),
        Some(PlayExit::Abandoned { confirmed: false }) => println!(
            "Left the game, but the server did not confirm the abandon; it may still be listed by `trivia sessions`."
        ),
        Some(PlayExit::Ended) | None => {}
    }
    Ok(())
}

fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => ui::read_password("Password: ").context("could not read password"),
    }
}
