use std::io::Write;

use chrono::NaiveDate;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{self, UnboundedReceiver},
};

use crate::{
    domain::{MessageId, RoomId},
    realtime::session::SessionChange,
    usecases::{
        live::{LiveCommand, LiveFrontend, LiveScreen, Notice},
        send_message::SendMessageError,
    },
};

use super::{chat, input, rooms};

const HISTORY_LINES: usize = 20;
const CONSOLE_WRITE_FAILED: &str = "CONSOLE_WRITE_FAILED";

/// Forwards stdin lines until EOF.
pub fn spawn_stdin_lines() -> UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!(error = %error, "stdin read failed");
                    break;
                }
            }
        }
    });

    rx
}

/// Prints the session as an append-only stream: each render writes only
/// what is new since the previous one.
pub struct ConsoleFrontend<W> {
    out: W,
    printed_room: Option<RoomId>,
    last_printed: Option<MessageId>,
    last_date: Option<NaiveDate>,
    last_receipt: Option<(MessageId, usize)>,
}

impl<W: Write + Send> ConsoleFrontend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed_room: None,
            last_printed: None,
            last_date: None,
            last_receipt: None,
        }
    }

    fn emit(&mut self, line: &str) {
        if let Err(error) = writeln!(self.out, "{line}") {
            tracing::debug!(code = CONSOLE_WRITE_FAILED, error = %error, "console write failed");
        }
    }

    fn render_room_list(&mut self, screen: &LiveScreen<'_>) {
        if screen.session.current_room.is_some() {
            return;
        }
        self.printed_room = None;

        for line in rooms::render_room_list(&screen.rooms, screen.nickname) {
            self.emit(&line);
        }
    }

    fn render_messages(&mut self, screen: &LiveScreen<'_>) {
        let Some(room_id) = screen.session.current_room else {
            return;
        };
        let log = screen.session.log;

        if self.printed_room != Some(room_id) {
            self.printed_room = Some(room_id);
            self.last_printed = None;
            self.last_date = None;
            self.last_receipt = None;

            let title = screen
                .room_name(room_id)
                .map_or_else(|| format!("room {room_id}"), str::to_owned);
            self.emit("");
            self.emit(&format!("# {title}  [{}]", chat::status_label(screen.session.status)));
            self.emit("Enter: send | /back: room list | /image, /file, /gif <url>: attach");
        }

        if log.is_loading() {
            if self.last_printed.is_none() {
                self.emit("Loading messages...");
            }
            return;
        }

        if log.is_empty() {
            if self.last_printed.is_none() {
                self.emit("No messages yet. Send the first one!");
            }
            return;
        }

        let fresh = match self.last_printed {
            None => log.visible_window(0, HISTORY_LINES),
            Some(last) => {
                let start = log
                    .messages()
                    .iter()
                    .position(|message| message.message_id > last)
                    .unwrap_or(log.len());
                &log.messages()[start..]
            }
        };

        if fresh.is_empty() {
            return;
        }

        let (lines, last_date) = chat::build_chat_lines(fresh, screen.session.user_id, self.last_date);
        self.last_date = last_date;
        self.last_printed = fresh.last().map(|message| message.message_id);
        for line in lines {
            self.emit(&line.render());
        }
    }

    fn render_receipts(&mut self, screen: &LiveScreen<'_>) {
        let Some(user_id) = screen.session.user_id else {
            return;
        };
        let receipt = chat::own_read_receipt(
            screen.session.log.messages(),
            screen.session.participants,
            user_id,
        );

        if receipt.is_some() && receipt != self.last_receipt {
            self.last_receipt = receipt;
            if let Some((_, count)) = receipt {
                self.emit(&format!("  read by {count}"));
            }
        }
    }
}

impl<W: Write + Send> LiveFrontend for ConsoleFrontend<W> {
    fn interpret(&mut self, line: &str, screen: &LiveScreen<'_>) -> Option<LiveCommand> {
        match input::parse_input(line, screen.session.current_room, &screen.rooms) {
            Ok(command) => command,
            Err(error) => {
                self.emit(&error.to_string());
                None
            }
        }
    }

    fn render(&mut self, screen: &LiveScreen<'_>, change: SessionChange) {
        match change {
            SessionChange::Nothing => {}
            SessionChange::Connection => self.emit(chat::status_label(screen.session.status)),
            SessionChange::RoomList => self.render_room_list(screen),
            SessionChange::Messages => self.render_messages(screen),
            SessionChange::ReadReceipts => self.render_receipts(screen),
        }
    }

    fn notice(&mut self, notice: &Notice) {
        let text = match notice {
            Notice::RoomsUnavailable => "Could not load chat rooms. Press r to retry.",
            Notice::HistoryUnavailable(_) => "Could not load messages for this room.",
            Notice::RoomNotFound(_) => "That room no longer exists. Type /back.",
            Notice::SendFailed(SendMessageError::EmptyMessage) => "Type a message first.",
            Notice::SendFailed(SendMessageError::NotConnected) => {
                "Not connected. The message was not sent."
            }
        };
        self.emit(text);
    }
}
