use serde::{Deserialize, Serialize};

use super::{time, MessageId, RoomId, UserId};

/// Content variant of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    /// Animated image.
    Gif,
}

impl MessageType {
    /// Returns a display label for attachment types, or None for plain text.
    pub fn display_label(self) -> Option<&'static str> {
        match self {
            MessageType::Text => None,
            MessageType::Image => Some("[Image]"),
            MessageType::File => Some("[File]"),
            MessageType::Gif => Some("[GIF]"),
        }
    }
}

/// Message envelope as delivered by the server, immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_nickname: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub created_at: String,
}

impl ChatMessage {
    /// Returns the display content: attachment label plus name/text, or just text.
    pub fn display_content(&self) -> String {
        let text = match self.message_type {
            MessageType::Text => self.content.as_deref(),
            _ => self
                .file_name
                .as_deref()
                .or(self.content.as_deref())
                .or(self.file_url.as_deref()),
        }
        .unwrap_or_default();

        match (self.message_type.display_label(), text.is_empty()) {
            (Some(label), true) => label.to_owned(),
            (Some(label), false) => format!("{label} {text}"),
            (None, _) => text.to_owned(),
        }
    }

    pub fn clock_label(&self) -> String {
        time::format_clock(&self.created_at)
    }

    pub fn is_from(&self, user_id: UserId) -> bool {
        self.sender_id == user_id
    }
}

/// Outbound message body published to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl SendMessageRequest {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Text,
            content: Some(content.into()),
            file_url: None,
            file_name: None,
        }
    }

    pub fn attachment(
        message_type: MessageType,
        file_url: impl Into<String>,
        file_name: Option<String>,
    ) -> Self {
        Self {
            message_type,
            content: None,
            file_url: Some(file_url.into()),
            file_name,
        }
    }
}

/// Body of an outbound read acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadAck {
    pub message_id: MessageId,
}

/// A remote participant's read position, delivered on the read-status topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadStatusUpdate {
    pub user_id: UserId,
    pub message_id: MessageId,
}
