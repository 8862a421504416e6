//! STOMP 1.2 frame codec.
//!
//! Frames are `COMMAND EOL *(header EOL) EOL body NUL`. A bare EOL between
//! frames is a heart-beat. Header values are escaped in every frame except
//! `CONNECT` and `CONNECTED`.

use std::time::Duration;

use thiserror::Error;

pub const ACCEPT_VERSION: &str = "1.2";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Send,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        let command = match raw {
            "CONNECT" => Self::Connect,
            "CONNECTED" => Self::Connected,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "SEND" => Self::Send,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            "DISCONNECT" => Self::Disconnect,
            _ => return None,
        };
        Some(command)
    }

    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("unknown STOMP command `{0}`")]
    UnknownCommand(String),
    #[error("malformed header line `{0}`")]
    MalformedHeader(String),
    #[error("invalid escape sequence in header `{0}`")]
    InvalidEscape(String),
    #[error("invalid content-length `{0}`")]
    InvalidContentLength(String),
    #[error("frame body is not terminated by NUL")]
    MissingNul,
    #[error("unterminated frame exceeds 1 MiB; dropped {0} buffered bytes")]
    FrameTooLarge(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first value of `name`; repeated headers keep the first.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn connect(host: &str, token: Option<&str>, heart_beat: HeartBeat) -> Self {
        let frame = Self::new(Command::Connect)
            .with_header("accept-version", ACCEPT_VERSION)
            .with_header("host", host)
            .with_header("heart-beat", heart_beat.header_value());

        match token {
            Some(token) => frame.with_header("Authorization", format!("Bearer {token}")),
            None => frame,
        }
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).with_header("id", id)
    }

    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", JSON_CONTENT_TYPE)
            .with_body(body)
    }

    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    pub fn encode(&self) -> String {
        let escape_headers = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());

        out.push_str(self.command.as_str());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape_headers {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Heart-beat intervals in milliseconds; zero disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartBeat {
    pub outgoing_ms: u64,
    pub incoming_ms: u64,
}

impl HeartBeat {
    pub fn header_value(self) -> String {
        format!("{},{}", self.outgoing_ms, self.incoming_ms)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (outgoing, incoming) = raw.split_once(',')?;
        Some(Self {
            outgoing_ms: outgoing.trim().parse().ok()?,
            incoming_ms: incoming.trim().parse().ok()?,
        })
    }

    /// Negotiates against the server's `heart-beat` header.
    ///
    /// Returns `(send_every, expect_every)`; `None` disables that direction.
    pub fn negotiate(self, server: Option<HeartBeat>) -> (Option<Duration>, Option<Duration>) {
        let Some(server) = server else {
            return (None, None);
        };

        let send = (self.outgoing_ms > 0 && server.incoming_ms > 0)
            .then(|| Duration::from_millis(self.outgoing_ms.max(server.incoming_ms)));
        let expect = (self.incoming_ms > 0 && server.outgoing_ms > 0)
            .then(|| Duration::from_millis(self.incoming_ms.max(server.outgoing_ms)));

        (send, expect)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Frame(Frame),
    HeartBeat,
}

/// Upper bound for one frame, head and body included.
pub const MAX_FRAME_BYTES: usize = 1 << 20;

/// Incremental decoder; frames may span or share WebSocket messages.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: String,
}

impl FrameReader {
    pub fn push(&mut self, chunk: &str) -> Vec<Result<Inbound, FrameError>> {
        self.buffer.push_str(chunk);
        let mut decoded = Vec::new();

        loop {
            let eol_len = leading_eol_len(&self.buffer);
            if eol_len > 0 {
                self.buffer.drain(..eol_len);
                decoded.push(Ok(Inbound::HeartBeat));
                continue;
            }

            if self.buffer.is_empty() {
                break;
            }

            let Some((head_end, body_start)) = find_head_end(&self.buffer) else {
                break;
            };

            let head = parse_head(&self.buffer[..head_end]).and_then(|(command, headers)| {
                content_length(&headers).map(|length| (command, headers, length))
            });

            let (command, headers, length) = match head {
                Ok(head) => head,
                Err(error) => {
                    if !self.skip_through_nul(body_start) {
                        break;
                    }
                    decoded.push(Err(error));
                    continue;
                }
            };

            let body_end = match length {
                Some(length) => {
                    let Some(end) = body_start.checked_add(length) else {
                        if !self.skip_through_nul(body_start) {
                            break;
                        }
                        decoded.push(Err(FrameError::InvalidContentLength(length.to_string())));
                        continue;
                    };
                    if self.buffer.len() <= end {
                        break;
                    }
                    if self.buffer.as_bytes()[end] != 0 {
                        if !self.skip_through_nul(body_start) {
                            break;
                        }
                        decoded.push(Err(FrameError::MissingNul));
                        continue;
                    }
                    end
                }
                None => match self.buffer[body_start..].find('\0') {
                    Some(offset) => body_start + offset,
                    None => break,
                },
            };

            let Some(body) = self.buffer.get(body_start..body_end).map(str::to_owned) else {
                if !self.skip_through_nul(body_start) {
                    break;
                }
                decoded.push(Err(FrameError::MissingNul));
                continue;
            };

            self.buffer.drain(..=body_end);
            decoded.push(Ok(Inbound::Frame(Frame {
                command,
                headers,
                body,
            })));
        }

        if self.buffer.len() > MAX_FRAME_BYTES {
            decoded.push(Err(FrameError::FrameTooLarge(self.buffer.len())));
            self.buffer.clear();
        }

        decoded
    }

    fn skip_through_nul(&mut self, from: usize) -> bool {
        match self.buffer.get(from..).and_then(|rest| rest.find('\0')) {
            Some(offset) => {
                self.buffer.drain(..=from + offset);
                true
            }
            None => false,
        }
    }
}

fn leading_eol_len(buffer: &str) -> usize {
    let bytes = buffer.as_bytes();
    let mut index = 0;

    loop {
        match (bytes.get(index), bytes.get(index + 1)) {
            (Some(b'\n'), _) => index += 1,
            (Some(b'\r'), Some(b'\n')) => index += 2,
            _ => return index,
        }
    }
}

/// Finds the blank line ending the head. Returns `(head_end, body_start)`.
fn find_head_end(buffer: &str) -> Option<(usize, usize)> {
    let bytes = buffer.as_bytes();

    for (position, byte) in bytes.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        match (bytes.get(position + 1), bytes.get(position + 2)) {
            (Some(b'\n'), _) => return Some((position, position + 2)),
            (Some(b'\r'), Some(b'\n')) => return Some((position, position + 3)),
            _ => {}
        }
    }

    None
}

fn parse_head(head: &str) -> Result<(Command, Vec<(String, String)>), FrameError> {
    let mut lines = head
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    let raw_command = lines.next().unwrap_or_default();
    let command = Command::parse(raw_command)
        .ok_or_else(|| FrameError::UnknownCommand(raw_command.to_owned()))?;

    let mut headers = Vec::new();
    for line in lines.filter(|line| !line.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| FrameError::MalformedHeader(line.to_owned()))?;

        if command.escapes_headers() {
            headers.push((unescape(name)?, unescape(value)?));
        } else {
            headers.push((name.to_owned(), value.to_owned()));
        }
    }

    Ok((command, headers))
}

fn content_length(headers: &[(String, String)]) -> Result<Option<usize>, FrameError> {
    headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|length| *length <= MAX_FRAME_BYTES)
                .ok_or_else(|| FrameError::InvalidContentLength(value.clone()))
        })
        .transpose()
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(raw.to_owned())),
        }
    }

    Ok(out)
}
