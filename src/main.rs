//! moodchat — chat with an AI in one of five moods from a full-screen TUI.
//!
//! Each mood is backed by its own agent (persona prompt + web search) and its
//! conversation is kept in an Upstash Redis history that is replayed on
//! every view. This binary sets up the terminal, delegates to [`app::App`]
//! for all application logic, and tears the terminal down on exit.

mod agent;
mod app;
mod chat;
mod constants;
mod history;
mod openai;
mod persona;
mod search;
mod session;
mod util;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::ExecutableCommand;
use crossterm::event;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::app::App;

// ── Entry point ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut app = App::new()?;
    let mut terminal = setup_terminal()?;

    let run_result = run_app(&mut terminal, &mut app);

    restore_terminal()?;
    run_result
}

// ── Terminal lifecycle ───────────────────────────────────────────────

/// Enable raw mode, switch to the alternate screen, and create the backend.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state.
fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Main draw → tick → poll → handle loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| app.draw(frame))?;

        if app.should_quit() {
            break;
        }

        // A queued chat is run after the frame showing it has been drawn.
        app.tick();

        if event::poll(Duration::from_millis(50))? {
            let ev = event::read()?;
            app.handle_event(ev)?;
        }
    }

    Ok(())
}
