use serde::{Deserialize, Serialize};

use super::{RoomId, UserId};

/// Baseline room entry from the room-list fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomUpdateKind {
    #[serde(rename = "ROOM_UPDATE")]
    RoomUpdate,
}

/// Summary change pushed on the per-user room-update feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    #[serde(rename = "type")]
    pub kind: RoomUpdateKind,
    pub room_id: RoomId,
    pub last_message: String,
    pub last_message_time: String,
    pub last_message_sender_id: UserId,
    pub last_message_sender_nickname: String,
    pub unread_count: u32,
}

/// A room as shown in the live room list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub room_id: RoomId,
    pub name: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<String>,
    pub last_sender: Option<String>,
    pub unread_count: u32,
    pub has_update: bool,
}

impl RoomView {
    pub fn from_summary(summary: &RoomSummary) -> Self {
        Self {
            room_id: summary.id,
            name: summary.name.clone(),
            last_message: summary.last_message.clone(),
            last_message_time: None,
            last_sender: None,
            unread_count: summary.unread_count,
            has_update: false,
        }
    }

    pub fn with_update(summary: &RoomSummary, update: &RoomUpdate) -> Self {
        Self {
            room_id: summary.id,
            name: summary.name.clone(),
            last_message: Some(update.last_message.clone()),
            last_message_time: Some(update.last_message_time.clone()),
            last_sender: Some(update.last_message_sender_nickname.clone()),
            unread_count: update.unread_count,
            has_update: true,
        }
    }
}
