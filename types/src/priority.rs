//! Task priority hints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduling hint attached to a submitted unit of work.
///
/// tokio has no notion of task priority, so this is recorded on the task handle
/// and in tracing output but never reorders work. Ordering inside a queue is
/// strictly submission order regardless of priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Background,
    Low,
    Utility,
    #[default]
    Medium,
    UserInitiated,
    High,
}

const PRIORITY_PARSE_VALUES: &[&str] = &[
    "background",
    "low",
    "utility",
    "medium",
    "default",
    "user_initiated",
    "high",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task priority '{raw}'; expected one of: {expected:?}")]
pub struct PriorityParseError {
    raw: String,
    expected: &'static [&'static str],
}

impl PriorityParseError {
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 6] = [
        TaskPriority::Background,
        TaskPriority::Low,
        TaskPriority::Utility,
        TaskPriority::Medium,
        TaskPriority::UserInitiated,
        TaskPriority::High,
    ];

    pub fn parse(s: &str) -> Result<Self, PriorityParseError> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().replace('-', "_").as_str() {
            "background" => Ok(Self::Background),
            "low" => Ok(Self::Low),
            "utility" => Ok(Self::Utility),
            "medium" | "default" => Ok(Self::Medium),
            "user_initiated" => Ok(Self::UserInitiated),
            "high" => Ok(Self::High),
            _ => Err(PriorityParseError {
                raw: trimmed.to_string(),
                expected: PRIORITY_PARSE_VALUES,
            }),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Low => "low",
            Self::Utility => "utility",
            Self::Medium => "medium",
            Self::UserInitiated => "user_initiated",
            Self::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
