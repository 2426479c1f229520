//! Structured Slack block documents
//!
//! A [`NotificationMessage`] is what a level carries as its template and what
//! finally gets POSTed to a webhook. The composer folds detail and action
//! blocks into `blocks`, so a composed message serializes as `{"blocks": [...]}`.

use serde::{Deserialize, Serialize};

/// Block type whose markdown text is rendered as a template
pub const SECTION_BLOCK: &str = "section";
/// Text object type rendered as a template inside a section block
pub const MARKDOWN_TEXT: &str = "mrkdwn";

/// Block colors for attachment-style messages
pub const COLOR_INFO: &str = "#00BFFF";
pub const COLOR_SUCCESS: &str = "#00FF00";
pub const COLOR_WARN: &str = "#FFD700";
pub const COLOR_ERROR: &str = "#DC143C";

/// Message template / composed message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Always-present blocks
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Appended when the destination shows details for the active color
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detail_blocks: Vec<Block>,
    /// Appended verbatim when the destination shows actions for the active color
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_blocks: Vec<Block>,
}

impl NotificationMessage {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Default::default()
        }
    }

    pub fn with_detail_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.detail_blocks = blocks;
        self
    }

    pub fn with_action_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.action_blocks = blocks;
        self
    }
}

/// A single Slack layout block
///
/// Fields the composer never inspects (`accessory`, `elements`, `fields`,
/// ...) are carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextObject>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Section block with markdown text
    pub fn section(text: impl Into<String>) -> Self {
        Self::new(SECTION_BLOCK).with_text(TextObject::markdown(text))
    }

    pub fn divider() -> Self {
        Self::new("divider")
    }

    pub fn with_text(mut self, text: TextObject) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether this block's text should go through the template engine
    pub fn is_templated(&self) -> bool {
        self.kind == SECTION_BLOCK
            && self
                .text
                .as_ref()
                .map(|t| t.kind == MARKDOWN_TEXT)
                .unwrap_or(false)
    }
}

/// Slack text composition object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl TextObject {
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            kind: MARKDOWN_TEXT.to_string(),
            text: text.into(),
            emoji: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: "plain_text".to_string(),
            text: text.into(),
            emoji: Some(true),
        }
    }
}
