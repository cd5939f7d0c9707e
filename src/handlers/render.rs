// Turns a compose outcome into the message the bot posts: an embed, two
// button rows and any attachment the embed refers to.

use crate::config::{ColorPalette, StatusColor};
use crate::models::card::{ComposeOutcome, EmbedField, NavAction, NavState, RenderPayload, Thumbnail};
use base64::Engine;
use serde::Serialize;

const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;
const STYLE_PRIMARY: u8 = 1;

#[derive(Debug, Serialize)]
pub struct RenderedMessage {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    pub embed: Embed,
    pub components: Vec<ActionRow>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
pub struct Footer {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

#[derive(Debug, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: &'static str,
    pub custom_id: &'static str,
    pub disabled: bool,
}

#[derive(Debug, Serialize)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

impl From<Thumbnail> for Attachment {
    fn from(thumbnail: Thumbnail) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(&thumbnail.bytes),
            file_name: thumbnail.file_name,
            content_type: thumbnail.content_type,
        }
    }
}

pub fn render(outcome: ComposeOutcome, palette: &ColorPalette) -> RenderedMessage {
    match outcome {
        ComposeOutcome::Card { payload, page } => {
            let mut message = from_payload("card", payload);
            message.index = Some(page.index);
            message.total = Some(page.total);
            message
        }
        ComposeOutcome::Degraded(payload) => from_payload("degraded", payload),
        ComposeOutcome::Empty => RenderedMessage {
            kind: "empty",
            index: None,
            total: None,
            embed: Embed {
                title: "No results".to_string(),
                description: "No servers match this search".to_string(),
                color: palette.get(StatusColor::Info),
                footer: None,
                timestamp: None,
                thumbnail: None,
                fields: Vec::new(),
            },
            components: buttons(NavState::all_disabled()),
            attachments: Vec::new(),
        },
    }
}

fn from_payload(kind: &'static str, payload: RenderPayload) -> RenderedMessage {
    let thumbnail = payload.thumbnail.as_ref().map(|t| EmbedImage { url: t.url() });
    RenderedMessage {
        kind,
        index: None,
        total: None,
        embed: Embed {
            title: payload.title,
            description: payload.description,
            color: payload.color,
            footer: payload.footer_text.map(|text| Footer { text }),
            timestamp: payload.timestamp.map(|ts| ts.to_rfc3339()),
            thumbnail,
            fields: payload.fields,
        },
        components: buttons(payload.nav),
        attachments: payload.thumbnail.map(Attachment::from).into_iter().collect(),
    }
}

fn button(action: NavAction, disabled: bool) -> Button {
    Button {
        kind: BUTTON,
        style: STYLE_PRIMARY,
        label: action.label(),
        custom_id: action.custom_id(),
        disabled,
    }
}

fn buttons(nav: NavState) -> Vec<ActionRow> {
    vec![
        ActionRow {
            kind: ACTION_ROW,
            components: vec![
                button(NavAction::Next, nav.next_disabled),
                button(NavAction::Previous, nav.prev_disabled),
            ],
        },
        ActionRow {
            kind: ACTION_ROW,
            components: vec![button(NavAction::Players, nav.players_disabled)],
        },
    ]
}
