use std::fmt;

use crate::domain::{
    events::InboundEvent,
    message::{ChatMessage, ReadStatusUpdate},
    room::RoomUpdate,
    RoomId, UserId,
};

/// Inbound subscription targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    UserRooms(UserId),
    RoomMessages(RoomId),
    RoomReadStatus(RoomId),
}

impl Topic {
    pub fn destination(self) -> String {
        match self {
            Self::UserRooms(user_id) => format!("/sub/users/{user_id}/rooms"),
            Self::RoomMessages(room_id) => format!("/sub/chat/rooms/{room_id}"),
            Self::RoomReadStatus(room_id) => format!("/sub/chat/rooms/{room_id}/read"),
        }
    }

    /// Decodes one payload delivered on this topic.
    pub fn decode(self, body: &str) -> Result<InboundEvent, serde_json::Error> {
        match self {
            Self::UserRooms(_) => serde_json::from_str::<RoomUpdate>(body).map(InboundEvent::RoomUpdate),
            Self::RoomMessages(_) => serde_json::from_str::<ChatMessage>(body).map(InboundEvent::Message),
            Self::RoomReadStatus(room_id) => serde_json::from_str::<ReadStatusUpdate>(body)
                .map(|update| InboundEvent::ReadStatus { room_id, update }),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.destination())
    }
}

/// Publish address for chat messages in a room.
pub fn message_destination(room_id: RoomId) -> String {
    format!("/pub/chat/rooms/{room_id}")
}

/// Publish address for read acknowledgements in a room.
pub fn read_destination(room_id: RoomId) -> String {
    format!("/pub/chat/rooms/{room_id}/read")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destinations_follow_server_routes() {
        assert_eq!(Topic::UserRooms(5).destination(), "/sub/users/5/rooms");
        assert_eq!(Topic::RoomMessages(42).destination(), "/sub/chat/rooms/42");
        assert_eq!(Topic::RoomReadStatus(42).destination(), "/sub/chat/rooms/42/read");
        assert_eq!(message_destination(42), "/pub/chat/rooms/42");
        assert_eq!(read_destination(42), "/pub/chat/rooms/42/read");
    }

    #[test]
    fn read_status_payload_carries_topic_room() {
        let event = Topic::RoomReadStatus(42)
            .decode(r#"{"userId":3,"messageId":101}"#)
            .expect("payload must decode");

        assert_eq!(
            event,
            InboundEvent::ReadStatus {
                room_id: 42,
                update: ReadStatusUpdate {
                    user_id: 3,
                    message_id: 101
                }
            }
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(Topic::RoomMessages(42).decode("{not json").is_err());
    }
}
