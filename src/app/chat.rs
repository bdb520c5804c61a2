//! Per-action handlers — persona selection, submit, and reset.
//!
//! Each handler blocks on the runtime for its remote calls, stores the new
//! transcript for drawing, and returns it.

use anyhow::Result;

use crate::chat::{Transcript, render};
use crate::persona::Persona;
use crate::session::clear_all;

use super::App;
use super::log_src;
use super::logging::LogLevel;

impl App {
    /// Show `persona`, building its agent on first selection.
    pub(crate) fn select_persona(&mut self, persona: Persona) -> Result<Transcript> {
        let prompt = persona.system_prompt();
        let prompt_ignored = self
            .session
            .agent(persona)
            .is_some_and(|existing| existing.system_prompt() != prompt);
        if prompt_ignored {
            log_src!(
                self,
                LogLevel::Warn,
                format!("{persona} agent already exists; keeping its original prompt.")
            );
        }

        self.swap_draft(self.selected(), persona);
        self.scroll_offset = 0;

        self.session.select(&self.toolkit, persona, &prompt)?;
        let transcript = self.runtime.block_on(render(
            &mut self.session,
            self.history.as_ref(),
            persona,
            None,
        ))?;
        self.transcript = transcript.clone();
        Ok(transcript)
    }

    /// Send one line to the selected persona and show the result.
    pub(crate) fn submit(&mut self, line: &str) -> Result<Transcript> {
        let persona = self.selected();
        self.session
            .select(&self.toolkit, persona, &persona.system_prompt())?;
        let transcript = self.runtime.block_on(render(
            &mut self.session,
            self.history.as_ref(),
            persona,
            Some(line),
        ))?;
        self.transcript = transcript.clone();
        Ok(transcript)
    }

    /// Clear the session and every persona's stored history, then show the
    /// selected persona afresh.
    pub(crate) fn reset(&mut self) -> Result<Transcript> {
        let persona = self.selected();
        self.log(LogLevel::Info, "Deleting data...".to_string());

        let mut results = Vec::new();
        let outcome = self.runtime.block_on(clear_all(
            &mut self.session,
            self.history.as_ref(),
            |persona, cleared| results.push((persona, cleared)),
        ));
        if self.session.is_empty() {
            self.log(LogLevel::Info, "Session state cleared.".to_string());
        }
        for (persona, cleared) in results {
            if cleared {
                self.log(LogLevel::Info, format!("Cleared data for {persona}."));
            } else {
                log_src!(
                    self,
                    LogLevel::Warn,
                    format!("Failed to clear data for {persona}.")
                );
            }
        }

        self.pending = None;
        self.drafts.clear();
        self.take_input();

        let reselect = self.select_persona(persona);
        if let Err(clear_err) = outcome {
            if let Err(err) = &reselect {
                log_src!(
                    self,
                    LogLevel::Error,
                    format!("Reloading {persona} failed: {err:#}")
                );
            }
            return Err(clear_err);
        }
        let transcript = reselect?;
        self.log(LogLevel::Info, "All data cleared.".to_string());
        Ok(transcript)
    }

    /// Reset, logging instead of propagating failures.
    pub(crate) fn run_reset(&mut self) {
        if let Err(err) = self.reset() {
            log_src!(self, LogLevel::Error, format!("Clear all data failed: {err:#}"));
        }
    }
}
