use std::{cmp::Ordering, collections::HashMap};

use super::{
    room::{RoomSummary, RoomUpdate, RoomView},
    time::parse_timestamp,
    RoomId,
};

/// Live room-summary map fed by the per-user room-update topic.
///
/// Updates are idempotent summaries, so the last one received for a room
/// replaces any earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomUpdates {
    updates: HashMap<RoomId, RoomUpdate>,
}

impl RoomUpdates {
    pub fn apply(&mut self, update: RoomUpdate) {
        self.updates.insert(update.room_id, update);
    }

    /// Removes the room's entry; used once its unread state is resolved locally.
    pub fn clear(&mut self, room_id: RoomId) -> bool {
        self.updates.remove(&room_id).is_some()
    }

    pub fn reset(&mut self) {
        self.updates.clear();
    }

    /// Merges the base room list with recorded updates.
    ///
    /// Updated rooms come first, most recent `lastMessageTime` first. Rooms
    /// without an update keep their relative order from `base`. Updates for
    /// rooms missing from `base` are not shown.
    pub fn merged_view(&self, base: &[RoomSummary]) -> Vec<RoomView> {
        let mut merged: Vec<(RoomView, Option<&RoomUpdate>)> = base
            .iter()
            .map(|summary| match self.updates.get(&summary.id) {
                Some(update) => (RoomView::with_update(summary, update), Some(update)),
                None => (RoomView::from_summary(summary), None),
            })
            .collect();

        // sort_by is stable, which keeps the base order among non-updated rooms
        merged.sort_by(|(_, left), (_, right)| match (left, right) {
            (Some(left), Some(right)) => compare_recency(right, left),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        merged.into_iter().map(|(view, _)| view).collect()
    }
}

#[cfg(test)]
impl RoomUpdates {
    pub fn get(&self, room_id: RoomId) -> Option<&RoomUpdate> {
        self.updates.get(&room_id)
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

fn compare_recency(left: &RoomUpdate, right: &RoomUpdate) -> Ordering {
    match (
        parse_timestamp(&left.last_message_time),
        parse_timestamp(&right.last_message_time),
    ) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => left.last_message_time.cmp(&right.last_message_time),
    }
}
