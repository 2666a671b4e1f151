//! Slack Block Kit subset used by the renderer.

use serde::Serialize;

/// Max characters Slack accepts in a section text object.
pub const SECTION_TEXT_LIMIT: usize = 3000;

/// A rendered message: fallback `text` plus blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    /// Plain text shown in notifications and by clients without block support.
    pub text: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
    Divider,
    Actions { elements: Vec<Element> },
    Context { elements: Vec<TextObject> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Mrkdwn { text: String },
    PlainText { text: String, emoji: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button {
        action_id: String,
        text: TextObject,
        style: ButtonStyle,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
}

impl Block {
    /// Section with mrkdwn text, capped at [`SECTION_TEXT_LIMIT`].
    pub fn section(text: impl Into<String>) -> Self {
        Block::Section {
            text: TextObject::Mrkdwn {
                text: truncate(&text.into(), SECTION_TEXT_LIMIT),
            },
        }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Block::Context {
            elements: vec![TextObject::PlainText {
                text: text.into(),
                emoji: true,
            }],
        }
    }

    /// Text of a section block; `None` for other kinds.
    pub fn section_text(&self) -> Option<&str> {
        match self {
            Block::Section {
                text: TextObject::Mrkdwn { text } | TextObject::PlainText { text, .. },
            } => Some(text),
            _ => None,
        }
    }
}

/// Cuts `s` to at most `max` chars, ending with `…` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Escapes the three characters Slack treats as control sequences in mrkdwn.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blocks_serialize_in_block_kit_shape() {
        let blocks = vec![
            Block::section("hi"),
            Block::Divider,
            Block::Actions {
                elements: vec![Element::Button {
                    action_id: "a".into(),
                    text: TextObject::PlainText {
                        text: "Go".into(),
                        emoji: true,
                    },
                    style: ButtonStyle::Primary,
                    value: "v".into(),
                }],
            },
            Block::context("ctx"),
        ];
        assert_eq!(
            serde_json::to_value(&blocks).unwrap(),
            json!([
                { "type": "section", "text": { "type": "mrkdwn", "text": "hi" } },
                { "type": "divider" },
                { "type": "actions", "elements": [{
                    "type": "button", "action_id": "a",
                    "text": { "type": "plain_text", "text": "Go", "emoji": true },
                    "style": "primary", "value": "v"
                }]},
                { "type": "context", "elements": [
                    { "type": "plain_text", "text": "ctx", "emoji": true }
                ]}
            ])
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("abcd", 3), "ab…");
        assert_eq!(truncate("жжжж", 2), "ж…");
    }

    #[test]
    fn long_section_is_capped() {
        let b = Block::section("x".repeat(SECTION_TEXT_LIMIT + 10));
        assert_eq!(
            b.section_text().unwrap().chars().count(),
            SECTION_TEXT_LIMIT
        );
    }

    #[test]
    fn escape_handles_control_characters() {
        assert_eq!(escape("a<b>&c"), "a&lt;b&gt;&amp;c");
    }
}
