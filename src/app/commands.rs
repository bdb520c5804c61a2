//! Slash-command dispatch and handler implementations.
//!
//! Every `/command` typed by the user is routed through [`App::handle_command`]
//! and dispatched to the appropriate handler method in this module.

use anyhow::Result;

use crate::constants::{APP_NAME, APP_VERSION};
use crate::persona::Persona;

use super::App;
use super::log_src;
use super::logging::LogLevel;

// ── Command dispatch ─────────────────────────────────────────────────

impl App {
    /// Route a slash-command to the matching handler.
    pub(crate) fn handle_command(&mut self, line: &str) -> Result<()> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "/help" => self.show_help(),
            "/quit" | "/exit" => self.should_quit = true,
            "/clear" => self.logs.clear(),
            "/persona" | "/p" => self.handle_persona_command(parts.collect()),
            "/reset" => self.run_reset(),
            "/history" => self.show_history_summary(),
            _ => log_src!(self, LogLevel::Warn, format!("Unknown command: {cmd}")),
        }

        Ok(())
    }
}

// ── Help ─────────────────────────────────────────────────────────────

impl App {
    fn show_help(&mut self) {
        self.log(LogLevel::Info, format!("{APP_NAME} {APP_VERSION}"));
        let lines = [
            "Commands:",
            "(no slash)            Chat with the selected emotion",
            "/persona              List emotions",
            "/persona <id>         Switch emotion (default, angry, happy, sad, fear)",
            "/history              Show turn counts per emotion",
            "/reset                Clear all data (session and stored history)",
            "/clear                Clear activity log",
            "/quit                 Exit",
            "",
            "Keys:",
            "Tab / Shift+Tab       Next / previous emotion",
            "Up / Down, PgUp/PgDn  Scroll the transcript",
            "Ctrl+X                Clear all data",
            "Ctrl+L                Clear activity log",
            "Esc / Ctrl+C          Exit",
        ];
        for line in lines {
            self.log(LogLevel::Info, line.to_string());
        }
    }
}

// ── Persona commands ─────────────────────────────────────────────────

impl App {
    fn handle_persona_command(&mut self, args: Vec<&str>) {
        let Some(target) = args.first() else {
            self.list_personas();
            return;
        };
        match target.parse::<Persona>() {
            Ok(persona) => self.run_select(persona),
            Err(err) => log_src!(self, LogLevel::Warn, format!("{err}")),
        }
    }

    fn list_personas(&mut self) {
        for persona in Persona::ALL {
            let marker = if persona == self.selected() { "▶" } else { " " };
            self.log(
                LogLevel::Info,
                format!("{marker} {:<8} {}", persona.id(), persona.opener()),
            );
        }
    }

    fn show_history_summary(&mut self) {
        let agents = self.session.agent_count();
        self.log(
            LogLevel::Info,
            format!(
                "{} turn(s) shown for {} ({} replayed, {} new). {agents} agent(s) built.",
                self.transcript.turns.len(),
                self.transcript.persona,
                self.transcript.replayed,
                self.transcript.fresh().len(),
            ),
        );
        for persona in Persona::ALL {
            let local = self.session.conversation(persona).len();
            if local > 0 {
                self.log(
                    LogLevel::Info,
                    format!("  {persona}: {local} turn(s) this session"),
                );
            }
        }
    }
}
