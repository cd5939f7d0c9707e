use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline,
        }
    }
}

/// Icon bytes handed straight to the output adapter. `file_name` is unique per
/// render so concurrent cards never share an attachment identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thumbnail {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Thumbnail {
    pub fn url(&self) -> String {
        format!("attachment://{}", self.file_name)
    }
}

/// Disabled state of the navigation buttons: next, previous, show players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavState {
    pub next_disabled: bool,
    pub prev_disabled: bool,
    pub players_disabled: bool,
}

impl NavState {
    pub fn all_disabled() -> Self {
        Self {
            next_disabled: true,
            prev_disabled: true,
            players_disabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPayload {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub footer_text: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub thumbnail: Option<Thumbnail>,
    pub fields: Vec<EmbedField>,
    pub nav: NavState,
}

/// Position of a rendered card after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageState {
    pub index: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComposeOutcome {
    Card { payload: RenderPayload, page: PageState },
    /// Nothing matches the pipeline.
    Empty,
    /// The catalog is non-empty but the requested slot could not be loaded.
    Degraded(RenderPayload),
}

/// Navigation affordances, identified by the button's custom id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavAction {
    Next,
    Previous,
    Players,
}

impl NavAction {
    pub fn custom_id(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Players => "players",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Next => "Next",
            Self::Previous => "Previous",
            Self::Players => "Show Players",
        }
    }
}
