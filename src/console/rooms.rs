use unicode_width::UnicodeWidthChar;

use crate::domain::room::RoomView;

const PREVIEW_WIDTH: usize = 25;
const ELLIPSIS: &str = "...";

/// Shortens `text` to at most `width` display columns, appending `...` when
/// anything was cut. Line breaks are flattened to spaces.
pub fn truncate_preview(text: &str, width: usize) -> String {
    let mut preview = String::new();
    let mut used = 0;

    for ch in text.chars().map(|ch| if ch.is_control() { ' ' } else { ch }) {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            preview.push_str(ELLIPSIS);
            return preview;
        }
        used += ch_width;
        preview.push(ch);
    }

    preview
}

pub fn room_line(index: usize, room: &RoomView) -> String {
    let mut line = format!("{:>3}. {}", index + 1, room.name);

    if room.unread_count > 0 {
        line.push_str(&format!(" ({})", room.unread_count));
    }

    if let Some(last_message) = room.last_message.as_deref().filter(|text| !text.is_empty()) {
        line.push_str(" - ");
        if let Some(sender) = &room.last_sender {
            line.push_str(sender);
            line.push_str(": ");
        }
        line.push_str(&truncate_preview(last_message, PREVIEW_WIDTH));
    }

    line
}

pub fn render_room_list(rooms: &[RoomView], nickname: &str) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!("Welcome, {nickname}!"),
        format!("Chat rooms ({})", rooms.len()),
    ];

    if rooms.is_empty() {
        lines.push("  You are not in any chat room yet.".to_owned());
    } else {
        lines.extend(rooms.iter().enumerate().map(|(index, room)| room_line(index, room)));
    }

    lines.push("number: open | r: refresh | q: log out | /quit: exit".to_owned());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str, last_message: Option<&str>, unread_count: u32) -> RoomView {
        RoomView {
            room_id: 1,
            name: name.to_owned(),
            last_message: last_message.map(str::to_owned),
            last_message_time: None,
            last_sender: None,
            unread_count,
            has_update: false,
        }
    }

    #[test]
    fn short_preview_is_kept() {
        assert_eq!(truncate_preview("hello", 25), "hello");
    }

    #[test]
    fn long_preview_is_cut_at_width() {
        let text = "a".repeat(30);

        assert_eq!(truncate_preview(&text, 25), format!("{}...", "a".repeat(25)));
    }

    #[test]
    fn wide_characters_count_double() {
        assert_eq!(truncate_preview("안녕하세요", 6), "안녕하...");
    }

    #[test]
    fn line_breaks_are_flattened() {
        assert_eq!(truncate_preview("one\ntwo", 25), "one two");
    }

    #[test]
    fn room_line_shows_badge_and_preview() {
        let line = room_line(0, &room("general", Some("see you tomorrow"), 3));

        assert_eq!(line, "  1. general (3) - see you tomorrow");
    }

    #[test]
    fn room_line_hides_zero_badge_and_empty_preview() {
        assert_eq!(room_line(9, &room("quiet", None, 0)), " 10. quiet");
        assert_eq!(room_line(0, &room("quiet", Some(""), 0)), "  1. quiet");
    }

    #[test]
    fn updated_room_shows_sender() {
        let mut view = room("general", Some("hi"), 1);
        view.last_sender = Some("june".to_owned());

        assert_eq!(room_line(0, &view), "  1. general (1) - june: hi");
    }

    #[test]
    fn empty_list_explains_itself() {
        let lines = render_room_list(&[], "mina");

        assert!(lines.iter().any(|line| line.contains("Welcome, mina!")));
        assert!(lines.iter().any(|line| line.contains("not in any chat room")));
    }
}
