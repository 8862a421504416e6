use std::collections::HashMap;

use super::{MessageId, UserId};

/// Read positions of the other participants in the open room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantReads {
    last_read: HashMap<UserId, MessageId>,
}

impl ParticipantReads {
    /// Records a participant's read position. Cursors only move forward, so
    /// a late, older status never rewinds one.
    pub fn record(&mut self, user_id: UserId, message_id: MessageId) -> bool {
        match self.last_read.get(&user_id) {
            Some(current) if *current >= message_id => false,
            _ => {
                self.last_read.insert(user_id, message_id);
                true
            }
        }
    }

    /// Number of participants other than `excluding` that have read `message_id`.
    pub fn read_count(&self, message_id: MessageId, excluding: Option<UserId>) -> usize {
        self.last_read
            .iter()
            .filter(|(user_id, _)| Some(**user_id) != excluding)
            .filter(|(_, last_read)| **last_read >= message_id)
            .count()
    }

    pub fn clear(&mut self) {
        self.last_read.clear();
    }
}

#[cfg(test)]
impl ParticipantReads {
    pub fn last_read(&self, user_id: UserId) -> Option<MessageId> {
        self.last_read.get(&user_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.last_read.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_highest_position() {
        let mut reads = ParticipantReads::default();

        assert!(reads.record(3, 101));
        assert!(!reads.record(3, 100));

        assert_eq!(reads.last_read(3), Some(101));
    }

    #[test]
    fn read_count_excludes_local_user() {
        let mut reads = ParticipantReads::default();
        reads.record(1, 102);
        reads.record(2, 101);
        reads.record(3, 99);

        assert_eq!(reads.read_count(101, None), 2);
        assert_eq!(reads.read_count(101, Some(1)), 1);
    }

    #[test]
    fn clear_forgets_everyone() {
        let mut reads = ParticipantReads::default();
        reads.record(1, 5);

        reads.clear();

        assert!(reads.is_empty());
        assert_eq!(reads.last_read(1), None);
    }
}
