use serde::{Deserialize, Serialize};

/// Form body of an interactivity request; `payload` is JSON.
#[derive(Debug, Deserialize)]
pub struct InteractivityForm {
    pub payload: String,
}

/// Fields of an interaction payload this service reads.
#[derive(Debug, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<InteractionUser>,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Slash command invocation (form-encoded).
#[derive(Debug, Deserialize)]
pub struct SlashCommandForm {
    #[serde(default)]
    pub token: String,
    pub channel_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Reply only the invoking user sees.
#[derive(Debug, Serialize)]
pub struct SlashCommandReply {
    pub response_type: &'static str,
    pub text: String,
}

impl SlashCommandReply {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: "ephemeral",
            text: text.into(),
        }
    }
}
