//! Application core — session hosting, lifecycle, and event dispatch.
//!
//! The [`App`] struct owns the session and is the single entry point for the
//! rest of the binary.  Every user action goes through one explicit handler
//! that produces a fresh [`Transcript`]:
//!
//! | Action            | Handler               |
//! |-------------------|-----------------------|
//! | sidebar selection | `App::select_persona` |
//! | submit input      | `App::submit`         |
//! | clear all data    | `App::reset`          |
//!
//! Heavy concerns are delegated to focused submodules:
//!
//! | Module     | Responsibility                          |
//! |------------|-----------------------------------------|
//! | `chat`     | Submit / reset handlers                 |
//! | `commands` | Slash-command dispatch & handlers       |
//! | `input`    | Text-input editing and persona drafts   |
//! | `logging`  | `LogLevel`, `LogLine`, `mask_key`       |
//! | `ui`       | TUI rendering & status-bar helpers      |

mod chat;
mod commands;
mod input;
mod logging;
mod ui;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tokio::runtime::Runtime;

use crate::agent::AgentToolkit;
use crate::chat::Transcript;
use crate::constants::MAX_LOGS;
use crate::history::upstash::UpstashHistory;
use crate::history::{HistoryStore, MemoryHistory};
use crate::openai::OpenAiClient;
use crate::persona::Persona;
use crate::search::TavilySearch;
use crate::session::SessionState;

use self::logging::{LogLevel, LogLine, mask_key};

// ── Logging ──────────────────────────────────────────────────────────

/// Log a `Warn`/`Error` message, attaching `[file:line]` in debug-logs builds.
///
/// In release (no `debug-logs` feature) this behaves like `self.log()`.
///
/// ```ignore
/// log_src!(self, LogLevel::Warn, format!("something broke: {err:#}"));
/// ```
macro_rules! log_src {
    ($app:expr, $level:expr, $msg:expr) => {{
        #[cfg(feature = "debug-logs")]
        {
            let loc = format!("{}:{}", file!(), line!());
            $app.log_with_src($level, $msg, &loc);
        }
        #[cfg(not(feature = "debug-logs"))]
        {
            $app.log($level, $msg);
        }
    }};
}
pub(crate) use log_src;

// ── Application state ────────────────────────────────────────────────

/// Top-level application state.
///
/// Fields use `pub(crate)` visibility so that the sibling submodules
/// (`commands`, `chat`, `ui`, …) can access them directly while keeping
/// them hidden from the rest of the crate.
pub struct App {
    pub(crate) runtime: Runtime,
    pub(crate) session: SessionState,
    pub(crate) toolkit: AgentToolkit,
    pub(crate) history: Arc<dyn HistoryStore>,
    pub(crate) transcript: Transcript,
    pub(crate) pending: Option<String>,
    pub(crate) input: String,
    pub(crate) cursor: usize,
    pub(crate) drafts: HashMap<Persona, String>,
    pub(crate) logs: Vec<LogLine>,
    pub(crate) openai_key_hint: Option<String>,
    pub(crate) search_ready: bool,
    pub(crate) scroll_offset: u16,
    pub(crate) should_quit: bool,
}

// ── Lifecycle ────────────────────────────────────────────────────────

impl App {
    /// Create and initialise a new application instance from the environment.
    pub fn new() -> Result<Self> {
        let openai = OpenAiClient::new();
        let search = TavilySearch::new();
        let openai_key_hint = openai.key().map(mask_key);
        let search_ready = search.has_key();

        let (history, history_warning): (Arc<dyn HistoryStore>, Option<String>) =
            match UpstashHistory::from_env() {
                Ok(Some(store)) => (Arc::new(store), None),
                Ok(None) => (
                    Arc::new(MemoryHistory::new()),
                    Some("Upstash env not configured; history kept in memory.".to_string()),
                ),
                Err(err) => (
                    Arc::new(MemoryHistory::new()),
                    Some(format!("Upstash disabled ({err:#}); history kept in memory.")),
                ),
            };

        let toolkit = AgentToolkit::new(Arc::new(openai), Arc::new(search), history.clone());
        let mut app = App::with_backends(toolkit, history)?;
        app.openai_key_hint = openai_key_hint;
        app.search_ready = search_ready;

        if let Some(warning) = history_warning {
            log_src!(app, LogLevel::Warn, warning);
        }
        if app.openai_key_hint.is_none() {
            log_src!(
                app,
                LogLevel::Warn,
                "OPENAI_API_KEY not set; chats will fail until it is.".to_string()
            );
        }
        if !app.search_ready {
            log_src!(
                app,
                LogLevel::Warn,
                "TAVILY_API_KEY not set; web search calls will fail.".to_string()
            );
        }

        app.bootstrap();
        Ok(app)
    }

    /// Build an app around explicit backends, with no persona selected yet.
    pub(crate) fn with_backends(
        toolkit: AgentToolkit,
        history: Arc<dyn HistoryStore>,
    ) -> Result<Self> {
        let runtime = Runtime::new().context("create tokio runtime")?;
        Ok(App {
            runtime,
            session: SessionState::new(),
            toolkit,
            history,
            transcript: Transcript::default(),
            pending: None,
            input: String::new(),
            cursor: 0,
            drafts: HashMap::new(),
            logs: Vec::new(),
            openai_key_hint: None,
            search_ready: false,
            scroll_offset: 0,
            should_quit: false,
        })
    }

    /// Create the default agent and show the default persona.
    fn bootstrap(&mut self) {
        self.log(
            LogLevel::Info,
            format!("History store: {}.", self.history.label()),
        );
        self.log(
            LogLevel::Info,
            "Type /help for commands. Tab switches emotion, Ctrl+X clears all data.".to_string(),
        );
        if let Err(err) = self.select_persona(Persona::Default) {
            log_src!(self, LogLevel::Error, format!("Startup failed: {err:#}"));
        }
    }

    /// The persona shown in the sidebar; the default one until a selection is made.
    pub(crate) fn selected(&self) -> Persona {
        self.session.current().unwrap_or_default()
    }

    /// Whether the user has requested to quit.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

// ── Event handling ───────────────────────────────────────────────────

impl App {
    /// Route a terminal event to the appropriate handler.
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        if let Event::Key(key) = event {
            self.handle_key(key)?;
        }
        Ok(())
    }

    /// Run deferred work queued by the previous event (one exchange at most).
    ///
    /// Called after each draw so the "responding" state is on screen while
    /// the agent call blocks.
    pub fn tick(&mut self) {
        let Some(line) = self.pending.take() else {
            return;
        };
        if let Err(err) = self.submit(&line) {
            log_src!(self, LogLevel::Error, format!("Chat failed: {err:#}"));
        }
    }

    /// Dispatch a key press to input editing, commands, or control actions.
    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match key {
            KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.should_quit = true,

            KeyEvent {
                code: KeyCode::Char('l'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.logs.clear(),

            KeyEvent {
                code: KeyCode::Char('x'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.run_reset(),

            KeyEvent { code, .. } => match code {
                KeyCode::Char(ch) => {
                    self.scroll_offset = 0; // snap to bottom on new input
                    self.insert_char(ch);
                }
                KeyCode::Backspace => self.backspace(),
                KeyCode::Delete => self.delete(),
                KeyCode::Left => self.move_cursor_left(),
                KeyCode::Right => self.move_cursor_right(),
                KeyCode::Home => self.move_cursor_home(),
                KeyCode::End => self.move_cursor_end(),
                KeyCode::Up => self.scroll_up(1),
                KeyCode::Down => self.scroll_down(1),
                KeyCode::PageUp => self.scroll_up(10),
                KeyCode::PageDown => self.scroll_down(10),
                KeyCode::Tab => self.run_select(self.selected().next()),
                KeyCode::BackTab => self.run_select(self.selected().prev()),
                KeyCode::Enter => {
                    self.scroll_offset = 0; // snap to bottom on submit
                    self.submit_input()?;
                }
                KeyCode::Esc => self.should_quit = true,
                _ => {}
            },
        }
        Ok(())
    }

    /// Submit the current input line for processing.
    fn submit_input(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Ok(());
        }
        let line = self.take_input();

        if line.trim().is_empty() {
            return Ok(());
        }

        if line.trim_start().starts_with('/') {
            self.handle_command(line.trim())?;
        } else {
            self.log(LogLevel::Info, "AI is responding...".to_string());
            self.pending = Some(line);
        }

        Ok(())
    }

    /// Switch the sidebar selection, logging instead of propagating failures.
    pub(crate) fn run_select(&mut self, persona: Persona) {
        if let Err(err) = self.select_persona(persona) {
            log_src!(
                self,
                LogLevel::Error,
                format!("Switching to {persona} failed: {err:#}")
            );
        }
    }
}

// ── Scrolling ────────────────────────────────────────────────────────

impl App {
    /// Scroll the transcript up by `n` lines.
    pub(crate) fn scroll_up(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(n);
    }

    /// Scroll the transcript down by `n` lines (towards the latest).
    pub(crate) fn scroll_down(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }
}

// ── Activity log ─────────────────────────────────────────────────────

impl App {
    /// Append a message to the activity log.
    pub(crate) fn log(&mut self, level: LogLevel, message: String) {
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        self.logs.push(LogLine {
            timestamp,
            level,
            message,
        });
        if self.logs.len() > MAX_LOGS {
            let overflow = self.logs.len() - MAX_LOGS;
            self.logs.drain(0..overflow);
        }
    }

    /// Append a message with a source location suffix (debug-logs builds only).
    #[cfg(feature = "debug-logs")]
    pub(crate) fn log_with_src(&mut self, level: LogLevel, message: String, src: &str) {
        let tagged = match level {
            LogLevel::Warn | LogLevel::Error => format!("{message}  [{src}]"),
            _ => message,
        };
        self.log(level, tagged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::{ScriptedModel, toolkit};
    use crate::history::Turn;

    fn test_app(model: ScriptedModel) -> (App, Arc<MemoryHistory>) {
        let (kit, history) = toolkit(model);
        let mut app = App::with_backends(kit, history.clone()).unwrap();
        app.bootstrap();
        (app, history)
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_line(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_event(key(KeyCode::Char(ch))).unwrap();
        }
    }

    #[test]
    fn bootstrap_selects_default_persona() {
        let (app, _) = test_app(ScriptedModel::default());
        assert_eq!(app.session.current(), Some(Persona::Default));
        assert_eq!(app.transcript.persona, Persona::Default);
        assert!(app.session.agent(Persona::Default).is_some());
    }

    #[test]
    fn enter_queues_and_tick_runs_one_exchange() {
        let (mut app, history) = test_app(ScriptedModel::default());
        type_line(&mut app, "hello");
        app.handle_event(key(KeyCode::Enter)).unwrap();

        assert_eq!(app.pending.as_deref(), Some("hello"));
        assert!(app.input.is_empty());

        app.tick();
        assert!(app.pending.is_none());
        assert_eq!(
            app.transcript.turns,
            vec![Turn::user("hello"), Turn::assistant("echo: hello")]
        );
        let stored = app
            .runtime
            .block_on(history.fetch(Persona::Default))
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn message_is_sent_as_typed() {
        let (mut app, history) = test_app(ScriptedModel::default());
        type_line(&mut app, "  two  spaces ");
        app.handle_event(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.pending.as_deref(), Some("  two  spaces "));

        app.tick();
        assert_eq!(
            app.transcript.turns,
            vec![
                Turn::user("  two  spaces "),
                Turn::assistant("echo:   two  spaces "),
            ]
        );
        let stored = app
            .runtime
            .block_on(history.fetch(Persona::Default))
            .unwrap();
        assert_eq!(stored[0], Turn::user("  two  spaces "));
    }

    #[test]
    fn blank_lines_and_padded_commands() {
        let (mut app, _) = test_app(ScriptedModel::default());
        type_line(&mut app, "   ");
        app.handle_event(key(KeyCode::Enter)).unwrap();
        assert!(app.pending.is_none());

        type_line(&mut app, " /persona fear");
        app.handle_event(key(KeyCode::Enter)).unwrap();
        assert!(app.pending.is_none());
        assert_eq!(app.selected(), Persona::Fear);
    }

    #[test]
    fn tab_cycles_personas_and_keeps_drafts() {
        let (mut app, _) = test_app(ScriptedModel::default());
        type_line(&mut app, "half typed");
        app.handle_event(key(KeyCode::Tab)).unwrap();

        assert_eq!(app.selected(), Persona::Angry);
        assert!(app.input.is_empty());

        app.handle_event(key(KeyCode::BackTab)).unwrap();
        assert_eq!(app.selected(), Persona::Default);
        assert_eq!(app.input, "half typed");
    }

    #[test]
    fn ctrl_x_resets_everything() {
        let (mut app, history) = test_app(ScriptedModel::default());
        type_line(&mut app, "hello");
        app.handle_event(key(KeyCode::Enter)).unwrap();
        app.tick();

        app.handle_event(Event::Key(KeyEvent::new(
            KeyCode::Char('x'),
            KeyModifiers::CONTROL,
        )))
        .unwrap();

        for persona in Persona::ALL {
            assert!(app.session.conversation(persona).is_empty());
            let stored = app.runtime.block_on(history.fetch(persona)).unwrap();
            assert!(stored.is_empty());
        }
        assert!(app.transcript.turns.is_empty());
        assert_eq!(app.session.current(), Some(Persona::Default));
    }

    #[test]
    fn chat_failure_is_logged_not_raised() {
        let (mut app, _) = test_app(ScriptedModel::failing());
        type_line(&mut app, "hi");
        app.handle_event(key(KeyCode::Enter)).unwrap();
        app.tick();

        let last = app.logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.contains("Chat failed"));
    }
}
