//! Terminal front end built on ratatui and crossterm.
//!
//! [`play`] runs a game on any ratatui backend and key stream; [`enter`] and
//! [`leave`] set up and restore the real terminal around it.

pub mod listing;
pub mod play;
pub mod prompt;
pub mod widgets;

use std::io::{self, Stdout};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

pub use play::{play, PlayExit};
pub use prompt::{choose_on_conflict, read_password, ConflictChoice};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Switch to raw mode on the alternate screen.
pub fn enter() -> io::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        disable_raw_mode()?;
        return Err(e);
    }
    Terminal::new(CrosstermBackend::new(stdout))
}

/// Restore the terminal left by [`enter`].
pub fn leave(terminal: &mut Tui) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
