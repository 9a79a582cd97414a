use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which flow a session belongs to.
///
/// - `Exam`: fixed-size draw over the whole bank, under a deadline.
/// - `Training`: untimed draw over user-selected themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Exam,
    Training,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown session mode: {0}")]
pub struct ParseModeError(pub String);

impl SessionMode {
    /// Storage representation, also used by the result history.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Exam => "exam",
            SessionMode::Training => "training",
        }
    }

    #[must_use]
    pub fn is_timed(self) -> bool {
        matches!(self, SessionMode::Exam)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exam" => Ok(SessionMode::Exam),
            "training" => Ok(SessionMode::Training),
            other => Err(ParseModeError(other.to_owned())),
        }
    }
}
