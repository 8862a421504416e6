//! Reconnecting STOMP-over-WebSocket transport.
//!
//! [`StompTransport`] is a cheap handle; the socket lives in a background task
//! that connects, performs the STOMP handshake, and routes frames. The task
//! keeps every live subscription across reconnects and re-sends `SUBSCRIBE`
//! after each handshake, so subscription handles stay valid for the lifetime
//! of the transport.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use thiserror::Error;
use tokio::{
    sync::mpsc,
    time::{Instant, Interval},
};

use crate::domain::UserId;

use super::{
    stomp::{Command, Frame, FrameError, FrameReader, HeartBeat, Inbound},
    transport::{
        Connector, CredentialProvider, EventSink, SubscriptionId, Transport, TransportEvent,
    },
    ws::{self, WsError, WsMessage, WsReader, WsWriter},
};

const REALTIME_CONNECT_FAILED: &str = "REALTIME_CONNECT_FAILED";
const REALTIME_CONNECTED: &str = "REALTIME_CONNECTED";
const REALTIME_CONNECTION_LOST: &str = "REALTIME_CONNECTION_LOST";
const REALTIME_HEARTBEAT_TIMEOUT: &str = "REALTIME_HEARTBEAT_TIMEOUT";
const REALTIME_SERVER_ERROR: &str = "REALTIME_SERVER_ERROR";
const REALTIME_FRAME_DECODE_FAILED: &str = "REALTIME_FRAME_DECODE_FAILED";
const REALTIME_PUBLISH_DROPPED: &str = "REALTIME_PUBLISH_DROPPED";
const REALTIME_SHUTDOWN: &str = "REALTIME_SHUTDOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub reconnect_delay: Duration,
    pub heart_beat: HeartBeat,
    pub handshake_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(5000),
            heart_beat: HeartBeat {
                outgoing_ms: 4000,
                incoming_ms: 4000,
            },
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Socket(#[from] WsError),
    #[error("broker rejected the connection: {0}")]
    Rejected(String),
    #[error("stream ended before the STOMP handshake completed")]
    HandshakeClosed,
    #[error("STOMP handshake timed out")]
    HandshakeTimeout,
}

#[derive(Debug)]
enum ConnectionCommand {
    Subscribe {
        id: SubscriptionId,
        destination: String,
    },
    Unsubscribe(SubscriptionId),
    Publish {
        destination: String,
        body: String,
        retain: bool,
    },
    Shutdown,
}

/// Handle to one background connection task.
#[derive(Debug)]
pub struct StompTransport {
    commands: mpsc::UnboundedSender<ConnectionCommand>,
    connected: Arc<AtomicBool>,
    next_subscription: u64,
    closed: bool,
}

impl StompTransport {
    fn send(&self, command: ConnectionCommand) {
        let _ = self.commands.send(command);
    }
}

impl Transport for StompTransport {
    fn is_connected(&self) -> bool {
        !self.closed && self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&mut self, destination: &str) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.send(ConnectionCommand::Subscribe {
            id,
            destination: destination.to_owned(),
        });
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.send(ConnectionCommand::Unsubscribe(subscription));
    }

    fn publish(&mut self, destination: &str, body: String) {
        if !self.is_connected() {
            tracing::debug!(
                code = REALTIME_PUBLISH_DROPPED,
                destination,
                "publish dropped while disconnected"
            );
            return;
        }

        self.send(ConnectionCommand::Publish {
            destination: destination.to_owned(),
            body,
            retain: false,
        });
    }

    fn publish_retained(&mut self, destination: &str, body: String) {
        self.send(ConnectionCommand::Publish {
            destination: destination.to_owned(),
            body,
            retain: true,
        });
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.send(ConnectionCommand::Shutdown);
    }
}

impl Drop for StompTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens [`StompTransport`]s. Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct StompConnector {
    settings: ConnectionSettings,
    credentials: Arc<dyn CredentialProvider>,
}

impl StompConnector {
    pub fn new(settings: ConnectionSettings, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            settings,
            credentials,
        }
    }
}

impl Connector for StompConnector {
    type Transport = StompTransport;

    fn open(&self, user_id: UserId, sink: EventSink) -> StompTransport {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let link = Link {
            user_id,
            settings: self.settings,
            credentials: Arc::clone(&self.credentials),
            connected: Arc::clone(&connected),
            sink,
        };
        tokio::spawn(run_connection_loop(link, command_rx));

        StompTransport {
            commands,
            connected,
            next_subscription: 0,
            closed: false,
        }
    }
}

struct Link {
    user_id: UserId,
    settings: ConnectionSettings,
    credentials: Arc<dyn CredentialProvider>,
    connected: Arc<AtomicBool>,
    sink: EventSink,
}

enum LoopExit {
    Shutdown,
    Dropped,
}

struct Established {
    writer: WsWriter,
    reader: WsReader,
    frames: FrameReader,
    send_every: Option<Duration>,
    expect_every: Option<Duration>,
}

async fn run_connection_loop(
    link: Link,
    mut commands: mpsc::UnboundedReceiver<ConnectionCommand>,
) {
    let mut subscriptions: BTreeMap<SubscriptionId, String> = BTreeMap::new();
    // latest retained body per destination, owed to the next live socket
    let mut retained: BTreeMap<String, String> = BTreeMap::new();

    loop {
        let url = ws::endpoint_socket_url(&link.credentials.endpoint_url());

        match establish(&url, &link).await {
            Ok(established) => {
                link.connected.store(true, Ordering::SeqCst);
                tracing::info!(
                    code = REALTIME_CONNECTED,
                    user_id = link.user_id,
                    url = %url,
                    "realtime connection established"
                );

                let exit = run_session(
                    established,
                    &link,
                    &mut subscriptions,
                    &mut retained,
                    &mut commands,
                )
                .await;
                link.connected.store(false, Ordering::SeqCst);

                let session_alive = link.sink.emit(TransportEvent::Disconnected);
                if matches!(exit, LoopExit::Shutdown) || !session_alive {
                    tracing::info!(
                        code = REALTIME_SHUTDOWN,
                        user_id = link.user_id,
                        "realtime connection shut down"
                    );
                    return;
                }
            }
            Err(error) => {
                tracing::warn!(
                    code = REALTIME_CONNECT_FAILED,
                    user_id = link.user_id,
                    error = %error,
                    retry_in_ms = link.settings.reconnect_delay.as_millis() as u64,
                    "realtime connect attempt failed"
                );
            }
        }

        if let LoopExit::Shutdown =
            wait_for_retry(
                link.settings.reconnect_delay,
                &mut subscriptions,
                &mut retained,
                &mut commands,
            )
            .await
        {
            tracing::info!(
                code = REALTIME_SHUTDOWN,
                user_id = link.user_id,
                "realtime connection shut down while waiting to reconnect"
            );
            return;
        }
    }
}

async fn establish(url: &str, link: &Link) -> Result<Established, ConnectionError> {
    let (mut writer, mut reader) = ws::connect(url).await?;

    let token = link.credentials.bearer_token();
    if token.is_none() {
        tracing::warn!(
            code = REALTIME_CONNECT_FAILED,
            user_id = link.user_id,
            "no access token available; connecting unauthenticated"
        );
    }

    let connect = Frame::connect(ws::host_of(url), token.as_deref(), link.settings.heart_beat);
    writer.send_text(connect.encode()).await?;

    let mut frames = FrameReader::default();
    let connected = tokio::time::timeout(
        link.settings.handshake_timeout,
        await_connected(&mut writer, &mut reader, &mut frames),
    )
    .await
    .map_err(|_| ConnectionError::HandshakeTimeout)??;

    let server_beat = connected.header("heart-beat").and_then(HeartBeat::parse);
    let (send_every, expect_every) = link.settings.heart_beat.negotiate(server_beat);

    Ok(Established {
        writer,
        reader,
        frames,
        send_every,
        expect_every,
    })
}

async fn await_connected(
    writer: &mut WsWriter,
    reader: &mut WsReader,
    frames: &mut FrameReader,
) -> Result<Frame, ConnectionError> {
    while let Some(message) = reader.recv().await {
        match message? {
            WsMessage::Text(text) => {
                for decoded in frames.push(&text) {
                    match decoded {
                        Ok(Inbound::Frame(frame)) if frame.command == Command::Connected => {
                            return Ok(frame);
                        }
                        Ok(Inbound::Frame(frame)) if frame.command == Command::Error => {
                            let reason = frame.header("message").unwrap_or("unknown error");
                            return Err(ConnectionError::Rejected(reason.to_owned()));
                        }
                        Ok(_) => {}
                        Err(error) => log_frame_error(&error),
                    }
                }
            }
            WsMessage::Ping(data) => writer.send_pong(data).await?,
            WsMessage::Close { .. } => return Err(ConnectionError::HandshakeClosed),
        }
    }

    Err(ConnectionError::HandshakeClosed)
}

async fn run_session(
    established: Established,
    link: &Link,
    subscriptions: &mut BTreeMap<SubscriptionId, String>,
    retained: &mut BTreeMap<String, String>,
    commands: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
) -> LoopExit {
    let Established {
        mut writer,
        mut reader,
        mut frames,
        send_every,
        expect_every,
    } = established;

    for (id, destination) in subscriptions.iter() {
        let frame = Frame::subscribe(&id.to_string(), destination);
        if let Err(error) = writer.send_text(frame.encode()).await {
            log_connection_lost(link, &error);
            return LoopExit::Dropped;
        }
    }

    while let Some((destination, body)) = retained.pop_first() {
        let frame = Frame::send(&destination, body.clone());
        if let Err(error) = writer.send_text(frame.encode()).await {
            retained.insert(destination, body);
            log_connection_lost(link, &error);
            return LoopExit::Dropped;
        }
        tracing::debug!(destination = %destination, "retained publish delivered after reconnect");
    }

    if !link.sink.emit(TransportEvent::Connected) {
        let _ = writer.close().await;
        return LoopExit::Shutdown;
    }

    let mut heart_beat = send_every.map(|period| tokio::time::interval_at(Instant::now() + period, period));
    // a silent broker is declared dead after twice the agreed interval
    let watchdog_window = expect_every.map(|period| period * 2);
    let mut last_inbound = Instant::now();

    loop {
        tokio::select! {
            message = reader.recv() => {
                let message = match message {
                    Some(Ok(message)) => message,
                    Some(Err(error)) => {
                        log_connection_lost(link, &error);
                        return LoopExit::Dropped;
                    }
                    None => {
                        log_connection_lost(link, &"stream ended");
                        return LoopExit::Dropped;
                    }
                };

                match message {
                    WsMessage::Text(text) => {
                        last_inbound = Instant::now();
                        for decoded in frames.push(&text) {
                            match decoded {
                                Ok(Inbound::Frame(frame)) => {
                                    if let Some(exit) = route_frame(frame, link, subscriptions) {
                                        let _ = writer.close().await;
                                        return exit;
                                    }
                                }
                                Ok(Inbound::HeartBeat) => {}
                                Err(error) => log_frame_error(&error),
                            }
                        }
                    }
                    WsMessage::Ping(data) => {
                        last_inbound = Instant::now();
                        if let Err(error) = writer.send_pong(data).await {
                            log_connection_lost(link, &error);
                            return LoopExit::Dropped;
                        }
                    }
                    WsMessage::Close { code, reason } => {
                        log_connection_lost(link, &format!("closed by server ({code}) {reason}"));
                        return LoopExit::Dropped;
                    }
                }
            }
            command = commands.recv() => {
                let (frame, retry) = match command {
                    None | Some(ConnectionCommand::Shutdown) => {
                        let _ = writer.send_text(Frame::disconnect().encode()).await;
                        let _ = writer.close().await;
                        return LoopExit::Shutdown;
                    }
                    Some(ConnectionCommand::Subscribe { id, destination }) => {
                        let frame = Frame::subscribe(&id.to_string(), &destination);
                        subscriptions.insert(id, destination);
                        (frame, None)
                    }
                    Some(ConnectionCommand::Unsubscribe(id)) => {
                        if subscriptions.remove(&id).is_none() {
                            continue;
                        }
                        (Frame::unsubscribe(&id.to_string()), None)
                    }
                    Some(ConnectionCommand::Publish { destination, body, retain }) => {
                        let retry = retain.then(|| (destination.clone(), body.clone()));
                        (Frame::send(&destination, body), retry)
                    }
                };

                if let Err(error) = writer.send_text(frame.encode()).await {
                    if let Some((destination, body)) = retry {
                        retained.insert(destination, body);
                    }
                    log_connection_lost(link, &error);
                    return LoopExit::Dropped;
                }
            }
            _ = tick(&mut heart_beat) => {
                if let Err(error) = writer.send_text("\n".to_owned()).await {
                    log_connection_lost(link, &error);
                    return LoopExit::Dropped;
                }
            }
            _ = watchdog(watchdog_window.map(|window| last_inbound + window)) => {
                tracing::warn!(
                    code = REALTIME_HEARTBEAT_TIMEOUT,
                    user_id = link.user_id,
                    "no inbound traffic within the heart-beat window"
                );
                let _ = writer.close().await;
                return LoopExit::Dropped;
            }
        }
    }
}

/// Delivers one inbound frame. Returns an exit when the frame ends the session.
fn route_frame(
    frame: Frame,
    link: &Link,
    subscriptions: &BTreeMap<SubscriptionId, String>,
) -> Option<LoopExit> {
    match frame.command {
        Command::Message => {
            let Some(subscription) = frame.header("subscription").and_then(parse_subscription_id)
            else {
                tracing::debug!("MESSAGE frame without a known subscription header dropped");
                return None;
            };

            // late deliveries for an unsubscribed id are dropped
            if !subscriptions.contains_key(&subscription) {
                return None;
            }

            let delivered = link.sink.emit(TransportEvent::Message {
                subscription,
                body: frame.body,
            });
            (!delivered).then_some(LoopExit::Shutdown)
        }
        Command::Error => {
            tracing::warn!(
                code = REALTIME_SERVER_ERROR,
                user_id = link.user_id,
                message = frame.header("message").unwrap_or_default(),
                "broker sent ERROR frame"
            );
            Some(LoopExit::Dropped)
        }
        other => {
            tracing::debug!(command = other.as_str(), "ignoring inbound STOMP frame");
            None
        }
    }
}

/// Sleeps out the reconnect delay while keeping the subscription set and
/// the retained publishes current.
async fn wait_for_retry(
    delay: Duration,
    subscriptions: &mut BTreeMap<SubscriptionId, String>,
    retained: &mut BTreeMap<String, String>,
    commands: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
) -> LoopExit {
    let retry_at = Instant::now() + delay;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(retry_at) => return LoopExit::Dropped,
            command = commands.recv() => match command {
                None | Some(ConnectionCommand::Shutdown) => return LoopExit::Shutdown,
                Some(ConnectionCommand::Subscribe { id, destination }) => {
                    subscriptions.insert(id, destination);
                }
                Some(ConnectionCommand::Unsubscribe(id)) => {
                    subscriptions.remove(&id);
                }
                Some(ConnectionCommand::Publish { destination, body, retain: true }) => {
                    retained.insert(destination, body);
                }
                Some(ConnectionCommand::Publish { destination, retain: false, .. }) => {
                    tracing::debug!(
                        code = REALTIME_PUBLISH_DROPPED,
                        destination = %destination,
                        "publish dropped while reconnecting"
                    );
                }
            },
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn watchdog(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn parse_subscription_id(raw: &str) -> Option<SubscriptionId> {
    raw.strip_prefix("sub-")?.parse().ok().map(SubscriptionId)
}

fn log_connection_lost(link: &Link, error: &dyn std::fmt::Display) {
    tracing::warn!(
        code = REALTIME_CONNECTION_LOST,
        user_id = link.user_id,
        error = %error,
        retry_in_ms = link.settings.reconnect_delay.as_millis() as u64,
        "realtime connection lost"
    );
}

fn log_frame_error(error: &FrameError) {
    tracing::debug!(
        code = REALTIME_FRAME_DECODE_FAILED,
        error = %error,
        "dropping undecodable STOMP frame"
    );
}
