//! Drives one logged-in session until the user quits.
//!
//! Transport events, fetch results, input lines and the read-flush timer are
//! multiplexed on one task. Each is applied to the [`ChatSession`] in a single
//! synchronous step, so renders never observe a half-applied change.

use std::{future, sync::Arc};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::{self, Instant},
};

use crate::{
    domain::{
        room::{RoomSummary, RoomView},
        RoomId, UserId,
    },
    infra::{config::RealtimeConfig, contracts::CredentialStore},
    realtime::{
        connection::ConnectionSettings,
        session::{ChatSession, HistoryOutcome, HistoryTicket, SessionChange, SessionView},
        stomp::HeartBeat,
        transport::{Connector, CredentialProvider, TaggedTransportEvent},
    },
    usecases::{
        list_rooms::{list_rooms, ListRoomsError, ListRoomsOutput, RoomsSource},
        load_messages::{
            load_messages, LoadMessagesError, LoadMessagesOutput, LoadMessagesQuery,
            MessagesSource,
        },
        send_message::{send_message, SendMessageCommand, SendMessageError},
    },
};

const LIVE_AUTH_EXPIRED: &str = "LIVE_AUTH_EXPIRED";
const LIVE_FETCH_FAILED: &str = "LIVE_FETCH_FAILED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveCommand {
    RefreshRooms,
    OpenRoom(RoomId),
    CloseRoom,
    Send(SendMessageCommand),
    /// Leave and forget the stored account.
    Logout,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveExit {
    Quit,
    LoggedOut,
    /// The server rejected the stored token.
    AuthExpired,
    InputClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RoomsUnavailable,
    HistoryUnavailable(RoomId),
    RoomNotFound(RoomId),
    SendFailed(SendMessageError),
}

/// Everything a front end needs to draw the current screen.
pub struct LiveScreen<'a> {
    pub session: SessionView<'a>,
    pub rooms: Vec<RoomView>,
    pub nickname: &'a str,
}

impl LiveScreen<'_> {
    pub fn room_name(&self, room_id: RoomId) -> Option<&str> {
        self.rooms
            .iter()
            .find(|room| room.room_id == room_id)
            .map(|room| room.name.as_str())
    }
}

pub trait LiveFrontend: Send {
    /// Translates one input line in the context of the current screen.
    fn interpret(&mut self, line: &str, screen: &LiveScreen<'_>) -> Option<LiveCommand>;

    fn render(&mut self, screen: &LiveScreen<'_>, change: SessionChange);

    fn notice(&mut self, notice: &Notice);
}

#[derive(Debug)]
enum Fetched {
    Rooms(Result<ListRoomsOutput, ListRoomsError>),
    History(HistoryTicket, Result<LoadMessagesOutput, LoadMessagesError>),
}

/// Supplies the stored access token and configured endpoint to the
/// connection task on every connect attempt.
pub struct StoredCredentials {
    store: Arc<dyn CredentialStore>,
    ws_url: String,
}

impl StoredCredentials {
    pub fn new(store: Arc<dyn CredentialStore>, ws_url: impl Into<String>) -> Self {
        Self {
            store,
            ws_url: ws_url.into(),
        }
    }
}

impl CredentialProvider for StoredCredentials {
    fn bearer_token(&self) -> Option<String> {
        match self.store.load() {
            Ok(credentials) => credentials.map(|credentials| credentials.access_token),
            Err(error) => {
                tracing::warn!(error = %error, "stored credentials unreadable; connecting without token");
                None
            }
        }
    }

    fn endpoint_url(&self) -> String {
        self.ws_url.clone()
    }
}

pub fn connection_settings(config: &RealtimeConfig) -> ConnectionSettings {
    ConnectionSettings {
        reconnect_delay: config.reconnect_delay(),
        heart_beat: HeartBeat {
            outgoing_ms: config.heartbeat_outgoing_ms,
            incoming_ms: config.heartbeat_incoming_ms,
        },
        ..ConnectionSettings::default()
    }
}

pub struct LiveDriver<C: Connector> {
    session: ChatSession<C>,
    events: UnboundedReceiver<TaggedTransportEvent>,
    rooms: Vec<RoomSummary>,
    rooms_source: Arc<dyn RoomsSource>,
    messages_source: Arc<dyn MessagesSource>,
    fetched_tx: UnboundedSender<Fetched>,
    fetched_rx: UnboundedReceiver<Fetched>,
    nickname: String,
}

impl<C: Connector> LiveDriver<C> {
    pub fn new(
        session: ChatSession<C>,
        events: UnboundedReceiver<TaggedTransportEvent>,
        rooms_source: Arc<dyn RoomsSource>,
        messages_source: Arc<dyn MessagesSource>,
        nickname: impl Into<String>,
    ) -> Self {
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();

        Self {
            session,
            events,
            rooms: Vec::new(),
            rooms_source,
            messages_source,
            fetched_tx,
            fetched_rx,
            nickname: nickname.into(),
        }
    }

    /// Binds the session to `user_id` and starts the first room-list fetch.
    pub fn start(&mut self, user_id: UserId) {
        self.session.connect(user_id);
        self.spawn_rooms_fetch();
    }

    /// Runs until the user leaves, input ends or the token is rejected.
    /// The session is disconnected before returning.
    pub async fn run(
        &mut self,
        mut lines: UnboundedReceiver<String>,
        frontend: &mut dyn LiveFrontend,
    ) -> LiveExit {
        self.render(frontend, SessionChange::Connection);

        let exit = loop {
            let flush_deadline = self.session.next_flush_deadline();
            let flush_timer = async move {
                match flush_deadline {
                    Some(deadline) => time::sleep_until(Instant::from_std(deadline)).await,
                    None => future::pending::<()>().await,
                }
            };

            tokio::select! {
                Some(event) = self.events.recv() => {
                    let change = self.session.handle_transport_event(event, now());
                    self.render(frontend, change);
                }
                Some(fetched) = self.fetched_rx.recv() => {
                    if let Some(exit) = self.apply_fetched(fetched, frontend) {
                        break exit;
                    }
                }
                line = lines.recv() => {
                    let Some(line) = line else {
                        break LiveExit::InputClosed;
                    };
                    let command = {
                        let screen = self.screen();
                        frontend.interpret(&line, &screen)
                    };
                    if let Some(exit) = command.and_then(|command| self.apply_command(command, frontend)) {
                        break exit;
                    }
                }
                _ = flush_timer => {
                    self.session.flush_due(now());
                }
            }
        };

        self.session.disconnect();
        exit
    }

    fn apply_command(
        &mut self,
        command: LiveCommand,
        frontend: &mut dyn LiveFrontend,
    ) -> Option<LiveExit> {
        match command {
            LiveCommand::RefreshRooms => self.spawn_rooms_fetch(),
            LiveCommand::OpenRoom(room_id) => {
                let ticket = self.session.open_room(room_id);
                self.spawn_history_fetch(ticket);
                self.render(frontend, SessionChange::Messages);
            }
            LiveCommand::CloseRoom => {
                self.session.close_room();
                self.spawn_rooms_fetch();
                self.render(frontend, SessionChange::RoomList);
            }
            LiveCommand::Send(command) => {
                if let Err(error) = send_message(&mut self.session, command) {
                    frontend.notice(&Notice::SendFailed(error));
                }
            }
            LiveCommand::Logout => return Some(LiveExit::LoggedOut),
            LiveCommand::Quit => return Some(LiveExit::Quit),
        }
        None
    }

    fn apply_fetched(
        &mut self,
        fetched: Fetched,
        frontend: &mut dyn LiveFrontend,
    ) -> Option<LiveExit> {
        match fetched {
            Fetched::Rooms(Ok(output)) => {
                self.rooms = output.rooms;
                self.render(frontend, SessionChange::RoomList);
            }
            Fetched::Rooms(Err(ListRoomsError::Unauthorized)) => return Some(auth_expired()),
            Fetched::Rooms(Err(error)) => {
                tracing::warn!(code = LIVE_FETCH_FAILED, error = ?error, "room list fetch failed");
                frontend.notice(&Notice::RoomsUnavailable);
            }
            Fetched::History(ticket, result) => {
                let history = result.map(|output| output.messages);
                match self.session.apply_history(ticket, history, now()) {
                    HistoryOutcome::Applied { .. } => self.render(frontend, SessionChange::Messages),
                    HistoryOutcome::Stale => {}
                    HistoryOutcome::Failed(LoadMessagesError::Unauthorized) => {
                        return Some(auth_expired())
                    }
                    HistoryOutcome::Failed(error) => {
                        tracing::warn!(
                            code = LIVE_FETCH_FAILED,
                            room_id = ticket.room_id(),
                            error = ?error,
                            "history fetch failed"
                        );
                        let notice = match error {
                            LoadMessagesError::RoomNotFound => Notice::RoomNotFound(ticket.room_id()),
                            _ => Notice::HistoryUnavailable(ticket.room_id()),
                        };
                        frontend.notice(&notice);
                        self.render(frontend, SessionChange::Messages);
                    }
                }
            }
        }
        None
    }

    fn spawn_rooms_fetch(&self) {
        let source = Arc::clone(&self.rooms_source);
        let tx = self.fetched_tx.clone();

        tokio::spawn(async move {
            let result = list_rooms(source.as_ref()).await;
            let _ = tx.send(Fetched::Rooms(result));
        });
    }

    fn spawn_history_fetch(&self, ticket: HistoryTicket) {
        let source = Arc::clone(&self.messages_source);
        let tx = self.fetched_tx.clone();

        tokio::spawn(async move {
            let query = LoadMessagesQuery::latest(ticket.room_id());
            let result = load_messages(source.as_ref(), query).await;
            let _ = tx.send(Fetched::History(ticket, result));
        });
    }

    fn screen(&self) -> LiveScreen<'_> {
        let session = self.session.view();
        LiveScreen {
            rooms: session.room_updates.merged_view(&self.rooms),
            session,
            nickname: &self.nickname,
        }
    }

    fn render(&self, frontend: &mut dyn LiveFrontend, change: SessionChange) {
        if change != SessionChange::Nothing {
            frontend.render(&self.screen(), change);
        }
    }
}

fn auth_expired() -> LiveExit {
    tracing::warn!(code = LIVE_AUTH_EXPIRED, "server rejected the stored token");
    LiveExit::AuthExpired
}

// Session deadlines are kept on tokio's clock so a paused runtime drives them.
fn now() -> std::time::Instant {
    Instant::now().into_std()
}
