//! UI-agnostic transcript types
//!
//! These are shared by every front end (the terminal UI, the one-shot `ask`
//! command) and don't depend on any UI framework.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Error => "error",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a transcript entry.
///
/// The endpoint may answer with plain text or with an arbitrary JSON value;
/// the two are kept apart so rendering can dispatch on the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Content {
    Text(String),
    Structured(Value),
}

impl Content {
    /// Classify the `response` field of an endpoint reply.
    ///
    /// Strings are text. Numbers and booleans are shown as their literal
    /// spelling, so they are text too. `null`, arrays and objects are kept
    /// as structured values.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Content::Text(text),
            Value::Number(n) => Content::Text(n.to_string()),
            Value::Bool(b) => Content::Text(b.to_string()),
            other => Content::Structured(other),
        }
    }

    /// Textual form shown in a transcript view
    pub fn display_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Content::Structured(_))
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

/// A single transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: Content,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &Content {
        &self.content
    }
}
