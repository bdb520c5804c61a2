//! Persona definitions — the fixed set of moods a chat can be held in.
//!
//! Every persona carries a description that is folded into the system prompt
//! and an opener that the UI shows as the input placeholder.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};

/// One of the five conversational moods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Persona {
    #[default]
    Default,
    Angry,
    Happy,
    Sad,
    Fear,
}

impl Persona {
    /// All personas in sidebar order.
    pub const ALL: [Persona; 5] = [
        Persona::Default,
        Persona::Angry,
        Persona::Happy,
        Persona::Sad,
        Persona::Fear,
    ];

    /// Stable identifier, also used as the history session id.
    pub fn id(self) -> &'static str {
        match self {
            Persona::Default => "default",
            Persona::Angry => "angry",
            Persona::Happy => "happy",
            Persona::Sad => "sad",
            Persona::Fear => "fear",
        }
    }

    /// Sidebar label.
    pub fn label(self) -> &'static str {
        match self {
            Persona::Default => "Default",
            Persona::Angry => "Angry",
            Persona::Happy => "Happy",
            Persona::Sad => "Sad",
            Persona::Fear => "Fear",
        }
    }

    /// Page title shown above the transcript.
    pub fn title(self) -> &'static str {
        match self {
            Persona::Default => "DEFAULT AI",
            Persona::Angry => "ANGRY AI",
            Persona::Happy => "HAPPY AI",
            Persona::Sad => "SAD AI",
            Persona::Fear => "FEAR AI",
        }
    }

    /// The mood description injected after "You are a".
    pub fn description(self) -> &'static str {
        match self {
            Persona::Default => "ai",
            Persona::Angry => {
                "angry ai. You are always very busy and do not want to help. \
                 You answer every question in a very angry tone. \
                 You try to abuse the user all the time"
            }
            Persona::Happy => {
                "happy ai. You are always very happy and excited. \
                 You answer every question with extream excitement. \
                 You try to make user happy all the time"
            }
            Persona::Sad => {
                "You are a sad AI. You are extreamly depressed all the time \
                 and talk about death and other stuff all the time"
            }
            Persona::Fear => {
                "You are a fearful AI. You are constantly that something bad will happen"
            }
        }
    }

    /// Opening prompt shown to the user in the empty input box.
    pub fn opener(self) -> &'static str {
        match self {
            Persona::Default => "Ask me anything",
            Persona::Angry => "What do you want stupid",
            Persona::Happy => "anything you want...",
            Persona::Sad => "sad things...",
            Persona::Fear => "too scary...",
        }
    }

    /// Full system prompt for the persona's agent.
    pub fn system_prompt(self) -> String {
        format!("You are a {}", self.description())
    }

    /// Position of the persona in [`Persona::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The next persona in sidebar order, wrapping around.
    pub fn next(self) -> Persona {
        Persona::ALL[(self.index() + 1) % Persona::ALL.len()]
    }

    /// The previous persona in sidebar order, wrapping around.
    pub fn prev(self) -> Persona {
        let len = Persona::ALL.len();
        Persona::ALL[(self.index() + len - 1) % len]
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Persona {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let needle = raw.trim();
        Persona::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(needle))
            .ok_or_else(|| anyhow!("unknown persona: {needle}"))
    }
}
