//! Bull and bear analyst personas

use crate::prompts::{BEAR_SYSTEM_PROMPT, BULL_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the debate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaId {
    Bull,
    Bear,
}

impl PersonaId {
    /// The other side
    pub fn opponent(self) -> Self {
        match self {
            Self::Bull => Self::Bear,
            Self::Bear => Self::Bull,
        }
    }

    /// Static persona definition for this side
    pub fn persona(self) -> &'static Persona {
        Persona::for_id(self)
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.persona().display_name)
    }
}

/// Immutable configuration of one debating analyst
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub id: PersonaId,
    pub display_name: &'static str,
    pub system_instructions: &'static str,
    pub max_response_tokens: usize,
    pub temperature: f32,
}

static BULL: Persona = Persona {
    id: PersonaId::Bull,
    display_name: "Bullish Analyst",
    system_instructions: BULL_SYSTEM_PROMPT,
    max_response_tokens: 1000,
    temperature: 0.7,
};

static BEAR: Persona = Persona {
    id: PersonaId::Bear,
    display_name: "Bearish Analyst",
    system_instructions: BEAR_SYSTEM_PROMPT,
    max_response_tokens: 1000,
    temperature: 0.7,
};

impl Persona {
    /// Look up the persona for a side
    pub fn for_id(id: PersonaId) -> &'static Self {
        match id {
            PersonaId::Bull => &BULL,
            PersonaId::Bear => &BEAR,
        }
    }
}
