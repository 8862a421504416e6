//! Chat stream formatting.

use chrono::NaiveDate;

use crate::domain::{
    events::ConnectivityStatus, message::ChatMessage, participants::ParticipantReads, time,
    MessageId, UserId,
};

/// One printed row of the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    DateSeparator(String),
    Message {
        time: String,
        sender: String,
        content: String,
        own: bool,
    },
}

impl ChatLine {
    pub fn render(&self) -> String {
        match self {
            Self::DateSeparator(date) => format!("--- {date} ---"),
            Self::Message {
                time, content, own: true, ..
            } => format!("{time} > {content}"),
            Self::Message {
                time,
                sender,
                content,
                own: false,
            } => format!("{sender}: {content} {time}"),
        }
    }
}

/// Builds rows for `messages`, inserting a date separator whenever the day
/// differs from the previous row's. `prev_date` is the day of the last row
/// already printed.
pub fn build_chat_lines(
    messages: &[ChatMessage],
    user_id: Option<UserId>,
    mut prev_date: Option<NaiveDate>,
) -> (Vec<ChatLine>, Option<NaiveDate>) {
    let mut lines = Vec::with_capacity(messages.len());

    for message in messages {
        let date = time::local_date(&message.created_at);
        if let Some(date) = date.filter(|date| prev_date != Some(*date)) {
            lines.push(ChatLine::DateSeparator(date.format("%d %b %Y").to_string()));
            prev_date = Some(date);
        }

        lines.push(ChatLine::Message {
            time: message.clock_label(),
            sender: message.sender_nickname.clone(),
            content: message.display_content(),
            own: user_id.is_some_and(|user_id| message.is_from(user_id)),
        });
    }

    (lines, prev_date)
}

/// Newest message sent by `user_id` and how many others have read it.
pub fn own_read_receipt(
    messages: &[ChatMessage],
    participants: &ParticipantReads,
    user_id: UserId,
) -> Option<(MessageId, usize)> {
    let own = messages.iter().rev().find(|message| message.is_from(user_id))?;
    let count = participants.read_count(own.message_id, Some(user_id));
    (count > 0).then_some((own.message_id, count))
}

pub fn status_label(status: ConnectivityStatus) -> &'static str {
    match status {
        ConnectivityStatus::Connected => "* connected",
        ConnectivityStatus::Connecting => "o connecting...",
        ConnectivityStatus::Disconnected => "o offline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::MessageType;

    fn message(message_id: MessageId, sender_id: UserId, created_at: &str) -> ChatMessage {
        ChatMessage {
            message_id,
            room_id: 42,
            sender_id,
            sender_nickname: format!("user{sender_id}"),
            message_type: MessageType::Text,
            content: Some(format!("m{message_id}")),
            file_url: None,
            file_name: None,
            created_at: created_at.to_owned(),
        }
    }

    #[test]
    fn own_and_other_messages_render_differently() {
        let (lines, _) = build_chat_lines(
            &[
                message(1, 5, "2025-01-01T09:15:00"),
                message(2, 7, "2025-01-01T09:16:00"),
            ],
            Some(5),
            None,
        );

        let rendered: Vec<String> = lines.iter().map(ChatLine::render).collect();
        assert_eq!(
            rendered,
            vec![
                "--- 01 Jan 2025 ---".to_owned(),
                "09:15 > m1".to_owned(),
                "user7: m2 09:16".to_owned(),
            ]
        );
    }

    #[test]
    fn separator_only_when_day_changes() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");

        let (lines, last) = build_chat_lines(
            &[
                message(1, 7, "2025-01-01T23:59:00"),
                message(2, 7, "2025-01-02T00:01:00"),
            ],
            None,
            Some(day),
        );

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], ChatLine::DateSeparator("02 Jan 2025".to_owned()));
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 1, 2));
    }

    #[test]
    fn unparseable_time_gets_placeholder_without_separator() {
        let (lines, _) = build_chat_lines(&[message(1, 7, "yesterday")], None, None);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].render(), "user7: m1 --:--");
    }

    #[test]
    fn receipt_counts_readers_of_newest_own_message() {
        let messages = vec![
            message(1, 5, "2025-01-01T09:15:00"),
            message(2, 7, "2025-01-01T09:16:00"),
            message(3, 5, "2025-01-01T09:17:00"),
        ];
        let mut participants = ParticipantReads::default();
        participants.record(7, 3);
        participants.record(8, 2);
        participants.record(5, 3);

        assert_eq!(own_read_receipt(&messages, &participants, 5), Some((3, 1)));
    }

    #[test]
    fn receipt_absent_until_someone_reads() {
        let messages = vec![message(1, 5, "2025-01-01T09:15:00")];

        assert_eq!(
            own_read_receipt(&messages, &ParticipantReads::default(), 5),
            None
        );
    }
}
