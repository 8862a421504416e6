//! Composing and publishing a chat message to a room.

use crate::{
    domain::{
        message::{MessageType, SendMessageRequest},
        RoomId,
    },
    realtime::{session::ChatSession, transport::Connector},
};

/// A message as typed by the user. For attachment kinds `text` carries the
/// file url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub room_id: RoomId,
    pub kind: MessageType,
    pub text: String,
    pub file_name: Option<String>,
}

impl SendMessageCommand {
    pub fn text(room_id: RoomId, text: impl Into<String>) -> Self {
        Self {
            room_id,
            kind: MessageType::Text,
            text: text.into(),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageSourceError {
    NotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    EmptyMessage,
    /// The realtime link is down; the message was not queued.
    NotConnected,
}

pub trait MessageSender {
    fn publish_message(
        &mut self,
        room_id: RoomId,
        request: &SendMessageRequest,
    ) -> Result<(), SendMessageSourceError>;
}

impl<C: Connector> MessageSender for ChatSession<C> {
    fn publish_message(
        &mut self,
        room_id: RoomId,
        request: &SendMessageRequest,
    ) -> Result<(), SendMessageSourceError> {
        if self.send_message(room_id, request) {
            Ok(())
        } else {
            Err(SendMessageSourceError::NotConnected)
        }
    }
}

/// Validates the command and publishes it. Nothing is retried or queued.
pub fn send_message(
    sender: &mut dyn MessageSender,
    command: SendMessageCommand,
) -> Result<(), SendMessageError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    let request = match command.kind {
        MessageType::Text => SendMessageRequest::text(text),
        kind => SendMessageRequest::attachment(
            kind,
            text,
            command
                .file_name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
        ),
    };

    sender
        .publish_message(command.room_id, &request)
        .map_err(map_source_error)
}

fn map_source_error(error: SendMessageSourceError) -> SendMessageError {
    match error {
        SendMessageSourceError::NotConnected => SendMessageError::NotConnected,
    }
}
