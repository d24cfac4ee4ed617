//! Resource kinds synced by the engine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The three collections a tailor's device keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Client,
    Ticket,
    Template,
}

impl ResourceKind {
    /// All kinds, in the order they are pulled.
    pub const ALL: [Self; 3] = [Self::Client, Self::Ticket, Self::Template];

    /// Stable storage key for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Ticket => "ticket",
            Self::Template => "template",
        }
    }

    /// REST collection path on the backend.
    pub const fn collection_path(self) -> &'static str {
        match self {
            Self::Client => "clients",
            Self::Ticket => "tickets",
            Self::Template => "measurement-templates",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "ticket" => Ok(Self::Ticket),
            "template" => Ok(Self::Template),
            other => Err(Error::InvalidInput(format!(
                "unknown resource kind: {other}"
            ))),
        }
    }
}
