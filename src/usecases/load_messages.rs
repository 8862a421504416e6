use async_trait::async_trait;

use crate::domain::{message::ChatMessage, MessageId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadMessagesQuery {
    pub room_id: RoomId,
    /// Fetch the page strictly older than this id; `None` loads the newest page.
    pub before_id: Option<MessageId>,
}

impl LoadMessagesQuery {
    pub fn latest(room_id: RoomId) -> Self {
        Self {
            room_id,
            before_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMessagesOutput {
    /// Oldest first.
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagesSourceError {
    Unauthorized,
    Unavailable,
    InvalidData,
    RoomNotFound,
}

#[async_trait]
pub trait MessagesSource: Send + Sync {
    async fn fetch_messages(
        &self,
        room_id: RoomId,
        before_id: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, MessagesSourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMessagesError {
    Unauthorized,
    TemporarilyUnavailable,
    DataContractViolation,
    RoomNotFound,
}

pub async fn load_messages(
    source: &dyn MessagesSource,
    query: LoadMessagesQuery,
) -> Result<LoadMessagesOutput, LoadMessagesError> {
    let mut messages = source
        .fetch_messages(query.room_id, query.before_id)
        .await
        .map_err(map_source_error)?;

    if messages.iter().any(|message| message.room_id != query.room_id) {
        return Err(LoadMessagesError::DataContractViolation);
    }

    messages.sort_by_key(|message| message.message_id);
    messages.dedup_by_key(|message| message.message_id);

    Ok(LoadMessagesOutput { messages })
}

fn map_source_error(error: MessagesSourceError) -> LoadMessagesError {
    match error {
        MessagesSourceError::Unauthorized => LoadMessagesError::Unauthorized,
        MessagesSourceError::Unavailable => LoadMessagesError::TemporarilyUnavailable,
        MessagesSourceError::InvalidData => LoadMessagesError::DataContractViolation,
        MessagesSourceError::RoomNotFound => LoadMessagesError::RoomNotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::MessageType;

    struct StubSource {
        result: Result<Vec<ChatMessage>, MessagesSourceError>,
        captured: std::sync::Mutex<Option<(RoomId, Option<MessageId>)>>,
    }

    impl StubSource {
        fn with_result(result: Result<Vec<ChatMessage>, MessagesSourceError>) -> Self {
            Self {
                result,
                captured: std::sync::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl MessagesSource for StubSource {
        async fn fetch_messages(
            &self,
            room_id: RoomId,
            before_id: Option<MessageId>,
        ) -> Result<Vec<ChatMessage>, MessagesSourceError> {
            *self.captured.lock().expect("captured lock") = Some((room_id, before_id));
            self.result.clone()
        }
    }

    fn message(room_id: RoomId, message_id: MessageId) -> ChatMessage {
        ChatMessage {
            message_id,
            room_id,
            sender_id: 7,
            sender_nickname: "june".to_owned(),
            message_type: MessageType::Text,
            content: Some(format!("m{message_id}")),
            file_url: None,
            file_name: None,
            created_at: "2025-01-01T10:00:00".to_owned(),
        }
    }

    #[tokio::test]
    async fn passes_room_and_cursor_to_source() {
        let source = StubSource::with_result(Ok(vec![]));

        let _ = load_messages(
            &source,
            LoadMessagesQuery {
                room_id: 42,
                before_id: Some(100),
            },
        )
        .await
        .expect("load should succeed");

        assert_eq!(
            *source.captured.lock().expect("captured lock"),
            Some((42, Some(100)))
        );
    }

    #[tokio::test]
    async fn returns_messages_oldest_first_without_duplicates() {
        let source = StubSource::with_result(Ok(vec![
            message(42, 12),
            message(42, 10),
            message(42, 11),
            message(42, 12),
        ]));

        let output = load_messages(&source, LoadMessagesQuery::latest(42))
            .await
            .expect("load should succeed");

        let ids: Vec<MessageId> = output.messages.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn rejects_messages_of_another_room() {
        let source = StubSource::with_result(Ok(vec![message(42, 1), message(7, 2)]));

        let err = load_messages(&source, LoadMessagesQuery::latest(42))
            .await
            .expect_err("must fail");

        assert_eq!(err, LoadMessagesError::DataContractViolation);
    }

    #[tokio::test]
    async fn maps_unauthorized_error() {
        let source = StubSource::with_result(Err(MessagesSourceError::Unauthorized));

        let err = load_messages(&source, LoadMessagesQuery::latest(1))
            .await
            .expect_err("must fail");

        assert_eq!(err, LoadMessagesError::Unauthorized);
    }

    #[tokio::test]
    async fn maps_room_not_found_error() {
        let source = StubSource::with_result(Err(MessagesSourceError::RoomNotFound));

        let err = load_messages(&source, LoadMessagesQuery::latest(1))
            .await
            .expect_err("must fail");

        assert_eq!(err, LoadMessagesError::RoomNotFound);
    }
}
