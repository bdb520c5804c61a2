//! History-backed chat loop — one replay + request/response cycle per call.

use anyhow::{Context, Result, anyhow};

use crate::history::{HistoryStore, Turn, replay};
use crate::persona::Persona;
use crate::session::SessionState;

/// What the UI shows for one persona after a cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    pub persona: Persona,
    pub turns: Vec<Turn>,
    /// How many leading turns came from the history store.
    pub replayed: usize,
}

impl Transcript {
    /// Turns added during the cycle that produced this transcript.
    pub fn fresh(&self) -> &[Turn] {
        &self.turns[self.replayed.min(self.turns.len())..]
    }
}

/// Replay `persona`'s stored history and, if `input` is given, run one
/// exchange with the persona's agent.
///
/// The user turn is recorded locally before the agent is called. An agent
/// failure aborts the cycle and no assistant turn is recorded.
pub async fn render(
    session: &mut SessionState,
    history: &dyn HistoryStore,
    persona: Persona,
    input: Option<&str>,
) -> Result<Transcript> {
    let stored = history
        .fetch(persona)
        .await
        .with_context(|| format!("fetch {persona} history"))?;
    let mut turns = replay(stored);
    let replayed = turns.len();

    if let Some(input) = input.filter(|text| !text.trim().is_empty()) {
        let agent = session
            .agent(persona)
            .cloned()
            .ok_or_else(|| anyhow!("no agent for {persona}; select it first"))?;

        let user = Turn::user(input);
        session.push_turn(persona, user.clone());
        turns.push(user);

        let reply = agent.invoke(input).await?;

        let assistant = Turn::assistant(reply);
        session.push_turn(persona, assistant.clone());
        turns.push(assistant);
    }

    Ok(Transcript {
        persona,
        turns,
        replayed,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::tests::{ScriptedModel, toolkit};
    use crate::history::{MemoryHistory, Role};

    #[tokio::test]
    async fn angry_hello_ends_with_one_exchange() {
        let (kit, history) = toolkit(ScriptedModel::default());
        history
            .append(Persona::Angry, &Turn::user("before"))
            .await
            .unwrap();
        history
            .append(Persona::Angry, &Turn::assistant("NO"))
            .await
            .unwrap();
        let mut session = SessionState::new();
        session
            .select(&kit, Persona::Angry, &Persona::Angry.system_prompt())
            .unwrap();

        let transcript = render(
            &mut session,
            history.as_ref(),
            Persona::Angry,
            Some("hello"),
        )
        .await
        .unwrap();

        let n = transcript.turns.len();
        assert_eq!(n, 4);
        assert_eq!(transcript.replayed, 2);
        assert_eq!(transcript.turns[n - 2], Turn::user("hello"));
        assert_eq!(transcript.turns[n - 1].role, Role::Assistant);
        assert_eq!(transcript.fresh().len(), 2);
        assert_eq!(session.conversation(Persona::Angry).len(), 2);
    }

    #[tokio::test]
    async fn next_render_replays_the_stored_exchange() {
        let (kit, history) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        session
            .select(&kit, Persona::Happy, &Persona::Happy.system_prompt())
            .unwrap();

        render(&mut session, history.as_ref(), Persona::Happy, Some("yay"))
            .await
            .unwrap();
        let transcript = render(&mut session, history.as_ref(), Persona::Happy, None)
            .await
            .unwrap();

        assert_eq!(transcript.replayed, 2);
        assert_eq!(transcript.turns[0], Turn::user("yay"));
        assert_eq!(transcript.turns[1], Turn::assistant("echo: yay"));
        assert!(transcript.fresh().is_empty());
    }

    #[tokio::test]
    async fn replay_uses_parity_not_stored_role() {
        let history = Arc::new(MemoryHistory::new());
        history
            .append(Persona::Sad, &Turn::assistant("first"))
            .await
            .unwrap();
        history
            .append(Persona::Sad, &Turn::user("second"))
            .await
            .unwrap();
        let mut session = SessionState::new();

        let transcript = render(&mut session, history.as_ref(), Persona::Sad, None)
            .await
            .unwrap();
        assert_eq!(transcript.turns[0].role, Role::User);
        assert_eq!(transcript.turns[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn blank_input_is_not_a_submission() {
        let (_, history) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        let transcript = render(&mut session, history.as_ref(), Persona::Fear, Some("   "))
            .await
            .unwrap();
        assert!(transcript.turns.is_empty());
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn agent_failure_aborts_without_assistant_turn() {
        let (kit, history) = toolkit(ScriptedModel::failing());
        let mut session = SessionState::new();
        session
            .select(&kit, Persona::Default, &Persona::Default.system_prompt())
            .unwrap();

        let result = render(
            &mut session,
            history.as_ref(),
            Persona::Default,
            Some("hi"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(session.conversation(Persona::Default), &[Turn::user("hi")]);
        assert!(history.fetch(Persona::Default).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submitting_without_an_agent_fails() {
        let (_, history) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        let err = render(&mut session, history.as_ref(), Persona::Sad, Some("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no agent"));
    }
}
