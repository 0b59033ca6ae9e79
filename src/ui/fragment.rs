//! Renderable fragments
//!
//! A closed set of presentation kinds. How each kind looks is up to the
//! renderer; the engine only moves them around.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A labelled value shown on a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardField {
    pub label: String,
    pub value: String,
}

impl CardField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Opaque renderable unit placed into the UI Output Sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    Text {
        text: String,
    },
    /// Placeholder shown while a tool is working
    Loading {
        label: String,
    },
    Card {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,
        #[serde(default)]
        fields: Vec<CardField>,
    },
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Structured tool output for tools that render nothing themselves
    ToolResult {
        tool: String,
        payload: Value,
    },
    Error {
        message: String,
    },
}

impl Fragment {
    pub fn text(&self) -> Option<&str> {
        match self {
            Fragment::Text { text } => Some(text),
            Fragment::Error { message } => Some(message),
            Fragment::Loading { label } => Some(label),
            _ => None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Fragment::Text { text: text.into() }
    }

    pub fn loading(label: impl Into<String>) -> Self {
        Fragment::Loading {
            label: label.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Fragment::Error {
            message: message.into(),
        }
    }

    pub fn card(title: impl Into<String>, fields: Vec<CardField>) -> Self {
        Fragment::Card {
            title: title.into(),
            subtitle: None,
            fields,
        }
    }

    #[must_use]
    pub fn with_subtitle(self, subtitle: impl Into<String>) -> Self {
        match self {
            Fragment::Card { title, fields, .. } => Fragment::Card {
                title,
                subtitle: Some(subtitle.into()),
                fields,
            },
            other => other,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Fragment::Loading { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Fragment::Error { .. })
    }
}
