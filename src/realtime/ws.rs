//! WebSocket halves over `tokio-tungstenite`.
//!
//! [`connect`] performs the handshake and returns a ([`WsWriter`], [`WsReader`])
//! pair ready for a `tokio::select!` loop.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::tungstenite;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("invalid websocket url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),
    #[error("websocket send failed: {0}")]
    Send(#[source] tungstenite::Error),
    #[error("websocket read failed: {0}")]
    Read(#[source] tungstenite::Error),
}

#[derive(Debug)]
pub enum WsMessage {
    Text(String),
    Ping(Vec<u8>),
    Close { code: u16, reason: String },
}

#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    pub async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        self.sink
            .send(tungstenite::Message::Text(text))
            .await
            .map_err(WsError::Send)
    }

    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<(), WsError> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .map_err(WsError::Send)
    }

    pub async fn close(&mut self) -> Result<(), WsError> {
        self.sink.close().await.map_err(WsError::Send)
    }
}

#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Next message, or `None` when the stream ends. Binary, pong and raw
    /// frames carry nothing for STOMP text framing and are skipped.
    pub async fn recv(&mut self) -> Option<Result<WsMessage, WsError>> {
        loop {
            match self.stream.next().await? {
                Ok(tungstenite::Message::Text(text)) => return Some(Ok(WsMessage::Text(text))),
                Ok(tungstenite::Message::Ping(data)) => return Some(Ok(WsMessage::Ping(data))),
                Ok(tungstenite::Message::Close(close_frame)) => {
                    let (code, reason) = close_frame
                        .map(|frame| (frame.code.into(), frame.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return Some(Ok(WsMessage::Close { code, reason }));
                }
                Ok(
                    tungstenite::Message::Binary(_)
                    | tungstenite::Message::Pong(_)
                    | tungstenite::Message::Frame(_),
                ) => continue,
                Err(error) => return Some(Err(WsError::Read(error))),
            }
        }
    }
}

pub async fn connect(url: &str) -> Result<(WsWriter, WsReader), WsError> {
    use tungstenite::client::IntoClientRequest;

    let request = url
        .into_client_request()
        .map_err(|source| WsError::InvalidUrl {
            url: url.to_owned(),
            source,
        })?;

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(WsError::Handshake)?;

    let (sink, stream) = stream.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Converts an HTTP(S) url to the WS(S) scheme; `ws://` and `wss://` pass through.
pub fn http_to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_owned()
    }
}

/// Resolves the raw WebSocket url of an endpoint.
///
/// An `http(s)` url names a SockJS endpoint, whose raw WebSocket lives at
/// `<url>/websocket`. A `ws(s)` url is used as given.
pub fn endpoint_socket_url(endpoint: &str) -> String {
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        return endpoint.to_owned();
    }

    format!(
        "{}/websocket",
        http_to_ws_scheme(endpoint).trim_end_matches('/')
    )
}

/// Host part of a url, used for the STOMP `host` header.
pub fn host_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_becomes_wss() {
        assert_eq!(http_to_ws_scheme("https://api.gptini.org/ws"), "wss://api.gptini.org/ws");
        assert_eq!(http_to_ws_scheme("http://localhost:8080"), "ws://localhost:8080");
        assert_eq!(http_to_ws_scheme("wss://example.com/ws"), "wss://example.com/ws");
    }

    #[test]
    fn sockjs_endpoint_resolves_to_raw_websocket() {
        assert_eq!(
            endpoint_socket_url("https://api.gptini.org/ws"),
            "wss://api.gptini.org/ws/websocket"
        );
        assert_eq!(
            endpoint_socket_url("http://localhost:8080/ws/"),
            "ws://localhost:8080/ws/websocket"
        );
        assert_eq!(
            endpoint_socket_url("ws://localhost:8080/stomp"),
            "ws://localhost:8080/stomp"
        );
    }

    #[test]
    fn host_strips_scheme_and_path() {
        assert_eq!(host_of("wss://api.gptini.org/ws/websocket"), "api.gptini.org");
        assert_eq!(host_of("ws://localhost:8080"), "localhost:8080");
    }

    #[tokio::test]
    async fn connect_rejects_invalid_url() {
        assert!(connect("not-a-url").await.is_err());
    }
}
