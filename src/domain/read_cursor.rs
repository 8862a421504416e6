//! Read-receipt throttling.
//!
//! Rapid "latest message seen" signals collapse into one acknowledgement per
//! window per room. The state is kept explicit (pending id, flush deadline,
//! last sent id) so it can be driven without a transport or a real clock.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use super::{MessageId, RoomId};

pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(300);

/// Per-room acknowledgement state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadCursor {
    last_sent: Option<MessageId>,
    pending: Option<MessageId>,
    flush_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct ReadReceiptThrottler {
    delay: Duration,
    cursors: HashMap<RoomId, ReadCursor>,
}

impl Default for ReadReceiptThrottler {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_DELAY)
    }
}

impl ReadReceiptThrottler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            cursors: HashMap::new(),
        }
    }

    /// Records `message_id` as the room's pending acknowledgement, replacing
    /// any earlier pending value. Arms the flush deadline only if none is
    /// running; returns true when a new deadline was armed.
    pub fn schedule(&mut self, room_id: RoomId, message_id: MessageId, now: Instant) -> bool {
        let cursor = self.cursors.entry(room_id).or_default();
        cursor.pending = Some(message_id);

        if cursor.flush_at.is_some() {
            return false;
        }

        cursor.flush_at = Some(now + self.delay);
        true
    }

    /// Cancels the room's deadline and decides whether an acknowledgement
    /// must go out now.
    ///
    /// Returns the id to publish and records it as sent. Ids at or below the
    /// last sent id are discarded. While disconnected the pending id is kept
    /// for the flush that follows the next handshake.
    pub fn take_flush(&mut self, room_id: RoomId, connected: bool) -> Option<MessageId> {
        let cursor = self.cursors.get_mut(&room_id)?;
        cursor.flush_at = None;

        let pending = cursor.pending?;
        if cursor.last_sent.is_some_and(|sent| pending <= sent) {
            cursor.pending = None;
            return None;
        }

        if !connected {
            return None;
        }

        cursor.last_sent = Some(pending);
        cursor.pending = None;
        Some(pending)
    }

    /// Earliest armed deadline across rooms.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.cursors.values().filter_map(|cursor| cursor.flush_at).min()
    }

    /// Rooms whose deadline has passed at `now`, in ascending room order.
    pub fn due_rooms(&self, now: Instant) -> Vec<RoomId> {
        let mut due: Vec<RoomId> = self
            .cursors
            .iter()
            .filter(|(_, cursor)| cursor.flush_at.is_some_and(|at| at <= now))
            .map(|(room_id, _)| *room_id)
            .collect();
        due.sort_unstable();
        due
    }

    /// Rooms holding an unsent pending id, in ascending room order.
    pub fn pending_rooms(&self) -> Vec<RoomId> {
        let mut pending: Vec<RoomId> = self
            .cursors
            .iter()
            .filter(|(_, cursor)| cursor.pending.is_some())
            .map(|(room_id, _)| *room_id)
            .collect();
        pending.sort_unstable();
        pending
    }

    /// Cancels every deadline and forgets all cursors.
    pub fn reset(&mut self) {
        self.cursors.clear();
    }
}

#[cfg(test)]
impl ReadCursor {
    pub fn last_sent(&self) -> Option<MessageId> {
        self.last_sent
    }

    pub fn pending(&self) -> Option<MessageId> {
        self.pending
    }

    pub fn flush_at(&self) -> Option<Instant> {
        self.flush_at
    }
}

#[cfg(test)]
impl ReadReceiptThrottler {
    pub fn cursor(&self, room_id: RoomId) -> Option<&ReadCursor> {
        self.cursors.get(&room_id)
    }
}
