//! Broadcast event kinds
//!
//! Names sent in the `type` field of every broadcast envelope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event kinds published by the task backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Task created
    #[serde(rename = "task.created")]
    TaskCreated,
    /// Task fields changed
    #[serde(rename = "task.updated")]
    TaskUpdated,
    /// Task removed
    #[serde(rename = "task.deleted")]
    TaskDeleted,
    /// AI suggestion ready for a task
    #[serde(rename = "ai.suggestion")]
    AiSuggestion,
}

impl EventKind {
    /// Get the wire name of the event kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "task.created",
            Self::TaskUpdated => "task.updated",
            Self::TaskDeleted => "task.deleted",
            Self::AiSuggestion => "ai.suggestion",
        }
    }

    /// Look up a known event kind by wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "task.created" => Some(Self::TaskCreated),
            "task.updated" => Some(Self::TaskUpdated),
            "task.deleted" => Some(Self::TaskDeleted),
            "ai.suggestion" => Some(Self::AiSuggestion),
            _ => None,
        }
    }
}

impl AsRef<str> for EventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
