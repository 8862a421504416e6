use std::collections::HashSet;

use super::{message::ChatMessage, MessageId, RoomId};

/// Ordered, in-memory message log of the currently open room.
///
/// The log is append-only once live events start arriving; switching rooms
/// discards it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    room_id: Option<RoomId>,
    messages: Vec<ChatMessage>,
    ids: HashSet<MessageId>,
    loading: bool,
}

impl MessageLog {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn last_message_id(&self) -> Option<MessageId> {
        self.messages.last().map(|message| message.message_id)
    }

    /// Discards the log and binds it to `room_id`.
    pub fn reset(&mut self, room_id: Option<RoomId>) {
        self.room_id = room_id;
        self.messages.clear();
        self.ids.clear();
        self.loading = false;
    }

    /// Replaces the log wholesale. Later duplicates of an id are dropped.
    pub fn set_messages(&mut self, messages: Vec<ChatMessage>) {
        self.messages.clear();
        self.ids.clear();

        for message in messages {
            if self.ids.insert(message.message_id) {
                self.messages.push(message);
            }
        }
    }

    /// Appends one live message.
    ///
    /// Returns false when the id is already present or the message belongs
    /// to another room.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        if self.room_id != Some(message.room_id) || !self.ids.insert(message.message_id) {
            return false;
        }

        self.messages.push(message);
        true
    }

    /// Removes and returns messages with an id greater than `message_id`.
    pub fn take_newer_than(&mut self, message_id: Option<MessageId>) -> Vec<ChatMessage> {
        let split_at = match message_id {
            Some(boundary) => self
                .messages
                .iter()
                .position(|message| message.message_id > boundary)
                .unwrap_or(self.messages.len()),
            None => 0,
        };

        let tail = self.messages.split_off(split_at);
        for message in &tail {
            self.ids.remove(&message.message_id);
        }
        tail
    }

    /// Returns a contiguous slice of at most `height` messages ending
    /// `scroll_back` messages before the newest one.
    pub fn visible_window(&self, scroll_back: usize, height: usize) -> &[ChatMessage] {
        let end = self.messages.len().saturating_sub(scroll_back);
        let start = end.saturating_sub(height);
        &self.messages[start..end]
    }
}

#[cfg(test)]
impl MessageLog {
    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.ids.contains(&message_id)
    }
}
