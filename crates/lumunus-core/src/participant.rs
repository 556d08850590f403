//! Participant display metadata.
//!
//! Names and colors are presentation configuration. Turn logic only ever
//! looks at [`Role`] identity; this table is a read-only lookup for renderers.

use crate::session::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    /// Hex color, e.g. `#3b82f6`.
    pub color: String,
    pub theme: String,
}

impl Participant {
    fn new(name: &str, color: &str, theme: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            theme: theme.to_string(),
        }
    }

    /// Parses `color` into RGB components. Returns `None` for malformed values.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some((channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantTable {
    pub user: Participant,
    pub other: Participant,
    pub ai: Participant,
}

impl ParticipantTable {
    pub fn get(&self, role: Role) -> &Participant {
        match role {
            Role::User => &self.user,
            Role::Other => &self.other,
            Role::Ai => &self.ai,
        }
    }
}

impl Default for ParticipantTable {
    fn default() -> Self {
        Self {
            user: Participant::new("You", "#3b82f6", "blue"),
            other: Participant::new("Mike", "#8b5cf6", "purple"),
            ai: Participant::new("AI", "#14b8a6", "teal"),
        }
    }
}
