use super::{
    message::{ChatMessage, ReadStatusUpdate},
    room::RoomUpdate,
    RoomId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// A decoded payload delivered on one of the subscribed topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    RoomUpdate(RoomUpdate),
    Message(ChatMessage),
    ReadStatus {
        room_id: RoomId,
        update: ReadStatusUpdate,
    },
}
