use std::fmt::Display;

use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::action::ActionKind;

/// Failure produced by an action body.
///
/// For async actions the same value is both recorded in the action's
/// [`AsyncStatus`](crate::AsyncStatus) and returned to the caller.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// Captures an error value, including the messages of its `source` chain.
    pub fn from_error(e: impl std::error::Error) -> Self {
        let mut message = e.to_string();
        let mut source = e.source();
        while let Some(s) = source {
            message.push_str(": ");
            message.push_str(&s.to_string());
            source = s.source();
        }
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
impl std::error::Error for ActionError {}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        Self::from_error(e)
    }
}

/// Failure returned by a listener registered with
/// [`Store::try_subscribe`](crate::Store::try_subscribe).
#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
    pub fn message(&self) -> &str {
        &self.message
    }
}
impl std::error::Error for ListenerError {}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
impl From<serde_json::Error> for ListenerError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e)
    }
}
impl From<std::io::Error> for ListenerError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e)
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Display, PartialEq)]
pub enum StoreError {
    #[display("action `{name}` failed: {source}")]
    Action { name: String, source: ActionError },

    #[display("no action named `{0}`")]
    UnknownAction(String),

    #[display("action `{name}` is {actual}, not {expected}")]
    ActionKind {
        name: String,
        expected: ActionKind,
        actual: ActionKind,
    },

    #[display("state must be an object, found {0}")]
    InvalidState(String),

    #[display("listener failed: {0}")]
    Listener(ListenerError),

    #[display("field `{name}` is not an async status: {message}")]
    AsyncStatus { name: String, message: String },
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Action { source, .. } => Some(source),
            StoreError::Listener(e) => Some(e),
            _ => None,
        }
    }
}
