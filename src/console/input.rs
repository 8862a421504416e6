use thiserror::Error;

use crate::{
    domain::{message::MessageType, room::RoomView, RoomId},
    usecases::{live::LiveCommand, send_message::SendMessageCommand},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command `{0}`; try /back, /quit, /image, /file or /gif")]
    UnknownCommand(String),
    #[error("there is no room number {0}")]
    NoSuchRoom(usize),
    #[error("usage: /{0} <url>")]
    MissingUrl(&'static str),
    #[error("type a room number, r to refresh, q to log out or /quit")]
    UnknownRoomListInput,
}

/// Parses one input line. The room list and an open room accept different
/// inputs; blank lines are ignored in both.
pub fn parse_input(
    line: &str,
    current_room: Option<RoomId>,
    rooms: &[RoomView],
) -> Result<Option<LiveCommand>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "/quit" {
        return Ok(Some(LiveCommand::Quit));
    }

    match current_room {
        Some(room_id) => parse_chat_input(line, room_id).map(Some),
        None => parse_room_list_input(line, rooms).map(Some),
    }
}

fn parse_room_list_input(line: &str, rooms: &[RoomView]) -> Result<LiveCommand, InputError> {
    match line {
        "q" => Ok(LiveCommand::Logout),
        "r" => Ok(LiveCommand::RefreshRooms),
        _ => {
            let number: usize = line.parse().map_err(|_| InputError::UnknownRoomListInput)?;
            number
                .checked_sub(1)
                .and_then(|index| rooms.get(index))
                .map(|room| LiveCommand::OpenRoom(room.room_id))
                .ok_or(InputError::NoSuchRoom(number))
        }
    }
}

fn parse_chat_input(line: &str, room_id: RoomId) -> Result<LiveCommand, InputError> {
    let Some(command) = line.strip_prefix('/') else {
        return Ok(LiveCommand::Send(SendMessageCommand::text(room_id, line)));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let (kind, name) = match name {
        "back" => return Ok(LiveCommand::CloseRoom),
        "image" => (MessageType::Image, "image"),
        "file" => (MessageType::File, "file"),
        "gif" => (MessageType::Gif, "gif"),
        other => return Err(InputError::UnknownCommand(format!("/{other}"))),
    };

    let url = parts.next().ok_or(InputError::MissingUrl(name))?;
    let file_name = {
        let rest: Vec<&str> = parts.collect();
        (!rest.is_empty()).then(|| rest.join(" "))
    };

    Ok(LiveCommand::Send(SendMessageCommand {
        room_id,
        kind,
        text: url.to_owned(),
        file_name,
    }))
}
