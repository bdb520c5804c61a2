//! Per-session state — lazily built persona agents, the selected persona, and
//! the local turn log of each persona.
//!
//! A [`SessionState`] is owned by whoever hosts the session (the TUI app) and
//! handed by reference to the chat loop and the reset operation.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::agent::{AgentToolkit, PersonaAgent};
use crate::history::{HistoryStore, Turn};
use crate::persona::Persona;

/// Agents, selection, and local conversations for one UI session.
pub struct SessionState {
    agents: HashMap<Persona, Arc<PersonaAgent>>,
    current: Option<Persona>,
    active: Option<Arc<PersonaAgent>>,
    conversations: HashMap<Persona, Vec<Turn>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            agents: HashMap::new(),
            current: None,
            active: None,
            conversations: Persona::ALL.iter().map(|p| (*p, Vec::new())).collect(),
        }
    }

    /// Return the persona's agent, building it on first use.
    ///
    /// An existing agent is returned unchanged; `system_prompt` only takes
    /// effect when the agent is first built.
    pub fn resolve_agent(
        &mut self,
        toolkit: &AgentToolkit,
        persona: Persona,
        system_prompt: &str,
    ) -> Result<Arc<PersonaAgent>> {
        if let Some(agent) = self.agents.get(&persona) {
            return Ok(agent.clone());
        }
        let agent = Arc::new(toolkit.build(persona, system_prompt)?);
        self.agents.insert(persona, agent.clone());
        Ok(agent)
    }

    /// Make `persona` the current one and its agent the active agent.
    pub fn select(
        &mut self,
        toolkit: &AgentToolkit,
        persona: Persona,
        system_prompt: &str,
    ) -> Result<Arc<PersonaAgent>> {
        self.current = Some(persona);
        let agent = self.resolve_agent(toolkit, persona, system_prompt)?;
        self.active = Some(agent.clone());
        Ok(agent)
    }

    pub fn current(&self) -> Option<Persona> {
        self.current
    }

    /// The agent of the current persona, if one has been selected.
    pub fn active_agent(&self) -> Option<Arc<PersonaAgent>> {
        self.active.clone()
    }

    pub fn agent(&self, persona: Persona) -> Option<&Arc<PersonaAgent>> {
        self.agents.get(&persona)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Turns appended for `persona` during this session.
    pub fn conversation(&self, persona: Persona) -> &[Turn] {
        self.conversations
            .get(&persona)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn push_turn(&mut self, persona: Persona, turn: Turn) {
        self.conversations.entry(persona).or_default().push(turn);
    }

    /// Whether nothing has been built, selected, or recorded.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
            && self.current.is_none()
            && self.active.is_none()
            && self.conversations.values().all(Vec::is_empty)
    }

    /// Drop every agent, the selection, and all local turns.
    pub fn clear(&mut self) {
        *self = SessionState::new();
    }
}

/// Wipe the session and every persona's remote history.
///
/// Deletion is best-effort: every persona is attempted, `progress` receives
/// each persona with whether its history was cleared, and the personas that
/// failed are named in the returned error.
pub async fn clear_all<F>(
    session: &mut SessionState,
    history: &dyn HistoryStore,
    mut progress: F,
) -> Result<()>
where
    F: FnMut(Persona, bool),
{
    session.clear();

    let mut failed = Vec::new();
    for persona in Persona::ALL {
        let result = history.clear(persona).await;
        progress(persona, result.is_ok());
        if let Err(err) = result {
            failed.push(format!("{persona} ({err:#})"));
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "failed to clear history for {}",
            failed.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::agent::tests::{ScriptedModel, toolkit};
    use crate::history::MemoryHistory;

    #[test]
    fn resolve_returns_the_same_instance() {
        let (kit, _) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        for persona in Persona::ALL {
            let first = session
                .resolve_agent(&kit, persona, &persona.system_prompt())
                .unwrap();
            let second = session
                .resolve_agent(&kit, persona, &persona.system_prompt())
                .unwrap();
            assert!(Arc::ptr_eq(&first, &second));
        }
        assert_eq!(session.agent_count(), Persona::ALL.len());
    }

    #[test]
    fn reuse_ignores_a_changed_prompt() {
        let (kit, _) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        let first = session
            .resolve_agent(&kit, Persona::Happy, "You are a happy ai")
            .unwrap();
        let again = session
            .resolve_agent(&kit, Persona::Happy, "You are a grumpy ai")
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.system_prompt(), "You are a happy ai");
    }

    #[test]
    fn construction_failure_is_not_cached() {
        let (kit, _) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        assert!(session.resolve_agent(&kit, Persona::Sad, "").is_err());
        assert!(session.agent(Persona::Sad).is_none());
    }

    #[test]
    fn select_sets_current_and_active() {
        let (kit, _) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        let agent = session
            .select(&kit, Persona::Fear, &Persona::Fear.system_prompt())
            .unwrap();
        assert_eq!(session.current(), Some(Persona::Fear));
        assert!(Arc::ptr_eq(&agent, &session.active_agent().unwrap()));
    }

    #[test]
    fn switching_persona_keeps_other_conversations() {
        let (kit, _) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        session.push_turn(Persona::Angry, Turn::user("hello"));
        session.push_turn(Persona::Angry, Turn::assistant("WHAT"));
        let before: Vec<Vec<Turn>> = Persona::ALL
            .iter()
            .map(|p| session.conversation(*p).to_vec())
            .collect();

        for persona in [Persona::Happy, Persona::Sad, Persona::Angry, Persona::Default] {
            session
                .select(&kit, persona, &persona.system_prompt())
                .unwrap();
        }

        let after: Vec<Vec<Turn>> = Persona::ALL
            .iter()
            .map(|p| session.conversation(*p).to_vec())
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn clear_all_empties_session_and_remote() {
        let (kit, history) = toolkit(ScriptedModel::default());
        let mut session = SessionState::new();
        for persona in Persona::ALL {
            session
                .select(&kit, persona, &persona.system_prompt())
                .unwrap();
            session.push_turn(persona, Turn::user("hi"));
            history.append(persona, &Turn::user("hi")).await.unwrap();
        }

        let mut seen = Vec::new();
        clear_all(&mut session, history.as_ref(), |p, ok| seen.push((p, ok)))
            .await
            .unwrap();

        assert!(session.is_empty());
        assert_eq!(
            seen,
            Persona::ALL.iter().map(|p| (*p, true)).collect::<Vec<_>>()
        );
        for persona in Persona::ALL {
            assert!(session.conversation(persona).is_empty());
            assert!(history.fetch(persona).await.unwrap().is_empty());
        }
    }

    /// Store whose `clear` fails for one persona.
    struct FlakyClear {
        inner: MemoryHistory,
        broken: Persona,
    }

    #[async_trait]
    impl HistoryStore for FlakyClear {
        async fn append(&self, persona: Persona, turn: &Turn) -> Result<()> {
            self.inner.append(persona, turn).await
        }

        async fn fetch(&self, persona: Persona) -> Result<Vec<Turn>> {
            self.inner.fetch(persona).await
        }

        async fn clear(&self, persona: Persona) -> Result<()> {
            if persona == self.broken {
                return Err(anyhow!("connection reset"));
            }
            self.inner.clear(persona).await
        }

        fn label(&self) -> String {
            "flaky".to_string()
        }
    }

    #[tokio::test]
    async fn clear_all_keeps_going_past_a_failure() {
        let store = FlakyClear {
            inner: MemoryHistory::new(),
            broken: Persona::Happy,
        };
        for persona in Persona::ALL {
            store.append(persona, &Turn::user("hi")).await.unwrap();
        }
        let mut session = SessionState::new();

        let mut failed = Vec::new();
        let err = clear_all(&mut session, &store, |p, ok| {
            if !ok {
                failed.push(p);
            }
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("happy"));
        assert_eq!(failed, vec![Persona::Happy]);

        assert_eq!(store.fetch(Persona::Happy).await.unwrap().len(), 1);
        for persona in [Persona::Default, Persona::Angry, Persona::Sad, Persona::Fear] {
            assert!(store.fetch(persona).await.unwrap().is_empty());
        }
    }
}
