//! The single realtime session of a logged-in user.
//!
//! [`ChatSession`] owns the transport handle and every piece of
//! session-scoped state: subscriptions, room updates, the open room's
//! message log, participant read positions and read cursors. All mutation
//! goes through its methods and each one completes synchronously, so a
//! renderer reading the session between two calls never sees a half-applied
//! event.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::domain::{
    events::{ConnectivityStatus, InboundEvent},
    message::{ChatMessage, ReadAck, SendMessageRequest},
    message_log::MessageLog,
    participants::ParticipantReads,
    read_cursor::ReadReceiptThrottler,
    room_updates::RoomUpdates,
    MessageId, RoomId, UserId,
};

use super::{
    registry::SubscriptionRegistry,
    topics::{message_destination, read_destination, Topic},
    transport::{Connector, EventSink, TaggedTransportEvent, Transport, TransportEvent},
};

const SESSION_CONNECT: &str = "SESSION_CONNECT";
const SESSION_DISCONNECT: &str = "SESSION_DISCONNECT";
const SESSION_READ_ACK_SENT: &str = "SESSION_READ_ACK_SENT";
const SESSION_PUBLISH_DROPPED: &str = "SESSION_PUBLISH_DROPPED";
const SESSION_ENCODE_FAILED: &str = "SESSION_ENCODE_FAILED";
const SESSION_HISTORY_STALE: &str = "SESSION_HISTORY_STALE";

/// What a handled event changed, so the front end knows what to redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Nothing,
    Connection,
    RoomList,
    Messages,
    ReadReceipts,
}

/// Identifies the history fetch started by one `open_room` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryTicket {
    epoch: u64,
    generation: u64,
    room_id: RoomId,
}

impl HistoryTicket {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum HistoryOutcome<E> {
    Applied { count: usize },
    /// The session moved on (other room, other user, teardown) before the result arrived.
    Stale,
    Failed(E),
}

/// Read-only snapshot handed to renderers.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    pub status: ConnectivityStatus,
    pub user_id: Option<UserId>,
    pub current_room: Option<RoomId>,
    pub log: &'a MessageLog,
    pub participants: &'a ParticipantReads,
    pub room_updates: &'a RoomUpdates,
}

pub struct ChatSession<C: Connector> {
    connector: C,
    transport: Option<C::Transport>,
    connected: bool,
    bound_user: Option<UserId>,
    epoch: u64,
    events_tx: UnboundedSender<TaggedTransportEvent>,
    registry: SubscriptionRegistry,
    room_updates: RoomUpdates,
    current_room: Option<RoomId>,
    room_generation: u64,
    log: MessageLog,
    participants: ParticipantReads,
    throttler: ReadReceiptThrottler,
}

impl<C: Connector> ChatSession<C> {
    /// Creates a disconnected session. Transport events for it arrive on the
    /// returned receiver and must be fed back through
    /// [`ChatSession::handle_transport_event`].
    pub fn new(
        connector: C,
        flush_delay: Duration,
    ) -> (Self, UnboundedReceiver<TaggedTransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = Self {
            connector,
            transport: None,
            connected: false,
            bound_user: None,
            epoch: 0,
            events_tx,
            registry: SubscriptionRegistry::default(),
            room_updates: RoomUpdates::default(),
            current_room: None,
            room_generation: 0,
            log: MessageLog::default(),
            participants: ParticipantReads::default(),
            throttler: ReadReceiptThrottler::new(flush_delay),
        };

        (session, events_rx)
    }

    /// Binds the session to `user_id` and opens its transport.
    ///
    /// A no-op when already bound to the same user. Bound to another user,
    /// the old session is torn down first. Returns true when a transport
    /// was opened.
    pub fn connect(&mut self, user_id: UserId) -> bool {
        if self.bound_user == Some(user_id) && self.transport.is_some() {
            tracing::debug!(user_id, "connect ignored; session already bound to user");
            return false;
        }

        if self.transport.is_some() || self.bound_user.is_some() {
            self.disconnect();
        }

        self.epoch += 1;
        let sink = EventSink::new(self.epoch, self.events_tx.clone());
        self.transport = Some(self.connector.open(user_id, sink));
        self.bound_user = Some(user_id);

        tracing::info!(
            code = SESSION_CONNECT,
            user_id,
            epoch = self.epoch,
            "realtime session opened"
        );
        true
    }

    /// Tears the session down to its initial state. Idempotent.
    ///
    /// Pending read positions are flushed while the transport can still
    /// carry them; afterwards every timer is cancelled and every
    /// subscription dropped.
    pub fn disconnect(&mut self) {
        for room_id in self.throttler.pending_rooms() {
            self.flush(room_id);
        }
        self.throttler.reset();

        let transport = self.transport.as_mut().map(|transport| transport as &mut dyn Transport);
        self.registry.unsubscribe_all(transport);

        let had_transport = match self.transport.take() {
            Some(mut transport) => {
                transport.close();
                true
            }
            None => false,
        };

        if had_transport || self.bound_user.is_some() {
            tracing::info!(
                code = SESSION_DISCONNECT,
                user_id = self.bound_user,
                "realtime session closed"
            );
        }

        self.connected = false;
        self.bound_user = None;
        self.epoch += 1;
        self.room_updates.reset();
        self.current_room = None;
        self.room_generation += 1;
        self.log.reset(None);
        self.participants.clear();
    }

    /// Applies one transport event. Events from a superseded transport are ignored.
    pub fn handle_transport_event(
        &mut self,
        tagged: TaggedTransportEvent,
        now: Instant,
    ) -> SessionChange {
        if tagged.epoch != self.epoch || self.transport.is_none() {
            tracing::debug!(
                event_epoch = tagged.epoch,
                epoch = self.epoch,
                "dropping event from superseded transport"
            );
            return SessionChange::Nothing;
        }

        match tagged.event {
            TransportEvent::Connected => {
                self.on_connected();
                SessionChange::Connection
            }
            TransportEvent::Disconnected => {
                self.connected = false;
                SessionChange::Connection
            }
            TransportEvent::Message { subscription, body } => {
                match self.registry.dispatch(subscription, &body) {
                    Some(event) => self.apply_inbound(event, now),
                    None => SessionChange::Nothing,
                }
            }
        }
    }

    fn on_connected(&mut self) {
        self.connected = true;

        if let Some(user_id) = self.bound_user {
            let transport = self.transport.as_mut().map(|transport| transport as &mut dyn Transport);
            self.registry.subscribe_topic(transport, Topic::UserRooms(user_id));
        }

        if let Some(room_id) = self.current_room {
            self.subscribe_room(room_id);
        }

        for room_id in self.throttler.pending_rooms() {
            self.flush(room_id);
        }
    }

    fn apply_inbound(&mut self, event: InboundEvent, now: Instant) -> SessionChange {
        match event {
            InboundEvent::RoomUpdate(update) => {
                self.room_updates.apply(update);
                SessionChange::RoomList
            }
            InboundEvent::Message(message) => {
                if self.current_room != Some(message.room_id) {
                    return SessionChange::Nothing;
                }

                let (room_id, message_id) = (message.room_id, message.message_id);
                if !self.log.append(message) {
                    return SessionChange::Nothing;
                }

                self.schedule_flush(room_id, message_id, now);
                SessionChange::Messages
            }
            InboundEvent::ReadStatus { room_id, update } => {
                if self.current_room != Some(room_id)
                    || !self.participants.record(update.user_id, update.message_id)
                {
                    return SessionChange::Nothing;
                }
                SessionChange::ReadReceipts
            }
        }
    }

    /// Makes `room_id` the open room and returns the ticket its history
    /// fetch must present to [`ChatSession::apply_history`].
    pub fn open_room(&mut self, room_id: RoomId) -> HistoryTicket {
        self.close_room();

        self.room_generation += 1;
        self.current_room = Some(room_id);
        self.room_updates.clear(room_id);
        self.log.reset(Some(room_id));
        self.log.set_loading(true);
        self.participants.clear();
        self.subscribe_room(room_id);

        HistoryTicket {
            epoch: self.epoch,
            generation: self.room_generation,
            room_id,
        }
    }

    /// Leaves the open room: flushes its read position, then drops its topics.
    pub fn close_room(&mut self) {
        let Some(room_id) = self.current_room.take() else {
            return;
        };

        self.flush(room_id);
        self.unsubscribe_room(room_id);
        self.log.reset(None);
        self.room_generation += 1;
    }

    /// Merges a history fetch into the open room's log.
    ///
    /// Live messages that arrived while the fetch was in flight and are newer
    /// than the fetched history stay at the end of the log. The newest id is
    /// then scheduled for acknowledgement.
    pub fn apply_history<E>(
        &mut self,
        ticket: HistoryTicket,
        history: Result<Vec<ChatMessage>, E>,
        now: Instant,
    ) -> HistoryOutcome<E> {
        if !self.is_current(ticket) {
            tracing::debug!(
                code = SESSION_HISTORY_STALE,
                room_id = ticket.room_id,
                "discarding history for a room that is no longer open"
            );
            return HistoryOutcome::Stale;
        }

        self.log.set_loading(false);

        let history = match history {
            Ok(history) => history,
            Err(error) => return HistoryOutcome::Failed(error),
        };

        let newest = history.iter().map(|message| message.message_id).max();
        let live_tail = self.log.take_newer_than(newest);
        let mut merged = history;
        merged.extend(live_tail);
        self.log.set_messages(merged);

        if let Some(last_id) = self.log.last_message_id() {
            self.schedule_flush(ticket.room_id, last_id, now);
        }

        HistoryOutcome::Applied {
            count: self.log.len(),
        }
    }

    pub fn is_current(&self, ticket: HistoryTicket) -> bool {
        ticket.epoch == self.epoch
            && ticket.generation == self.room_generation
            && self.current_room == Some(ticket.room_id)
    }

    /// Drops the room's message and read-status topics along with its
    /// participant read state.
    pub fn unsubscribe_room(&mut self, room_id: RoomId) {
        let transport = self.transport.as_mut().map(|transport| transport as &mut dyn Transport);
        self.registry.unsubscribe_room(transport, room_id);
        self.participants.clear();
    }

    fn subscribe_room(&mut self, room_id: RoomId) {
        for topic in [Topic::RoomMessages(room_id), Topic::RoomReadStatus(room_id)] {
            let transport = self.transport.as_mut().map(|transport| transport as &mut dyn Transport);
            self.registry.subscribe_topic(transport, topic);
        }
    }

    /// Publishes a chat message; dropped when not connected.
    pub fn send_message(&mut self, room_id: RoomId, request: &SendMessageRequest) -> bool {
        self.publish_json(&message_destination(room_id), request, false)
    }

    /// Marks `message_id` as seen in `room_id`; the acknowledgement goes out
    /// when the room's throttle window closes.
    pub fn schedule_flush(&mut self, room_id: RoomId, message_id: MessageId, now: Instant) -> bool {
        self.throttler.schedule(room_id, message_id, now)
    }

    /// Sends the room's pending read position if it advances past the last
    /// acknowledged one. Returns true when an acknowledgement went out.
    ///
    /// The id counts as sent once it is handed to the transport, so the ack
    /// is published retained: should the link drop before the frame is
    /// written, the transport re-sends it after the next handshake.
    pub fn flush(&mut self, room_id: RoomId) -> bool {
        let connected = self.is_connected();
        let Some(message_id) = self.throttler.take_flush(room_id, connected) else {
            return false;
        };

        let sent = self.publish_json(&read_destination(room_id), &ReadAck { message_id }, true);
        if sent {
            tracing::debug!(
                code = SESSION_READ_ACK_SENT,
                room_id,
                message_id,
                "read acknowledgement sent"
            );
        }
        sent
    }

    /// Flushes every room whose throttle window has elapsed at `now`.
    pub fn flush_due(&mut self, now: Instant) -> usize {
        self.throttler
            .due_rooms(now)
            .into_iter()
            .filter(|room_id| self.flush(*room_id))
            .count()
    }

    pub fn next_flush_deadline(&self) -> Option<Instant> {
        self.throttler.next_deadline()
    }

    fn publish_json<T: Serialize>(&mut self, destination: &str, body: &T, retain: bool) -> bool {
        if !self.is_connected() {
            tracing::debug!(
                code = SESSION_PUBLISH_DROPPED,
                destination,
                "publish dropped while disconnected"
            );
            return false;
        }

        let body = match serde_json::to_string(body) {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(
                    code = SESSION_ENCODE_FAILED,
                    destination,
                    error = %error,
                    "failed to encode outbound payload"
                );
                return false;
            }
        };

        match self.transport.as_mut() {
            Some(transport) if retain => {
                transport.publish_retained(destination, body);
                true
            }
            Some(transport) => {
                transport.publish(destination, body);
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
            && self
                .transport
                .as_ref()
                .is_some_and(|transport| transport.is_connected())
    }

    pub fn status(&self) -> ConnectivityStatus {
        match (&self.transport, self.is_connected()) {
            (Some(_), true) => ConnectivityStatus::Connected,
            (Some(_), false) => ConnectivityStatus::Connecting,
            (None, _) => ConnectivityStatus::Disconnected,
        }
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            status: self.status(),
            user_id: self.bound_user,
            current_room: self.current_room,
            log: &self.log,
            participants: &self.participants,
            room_updates: &self.room_updates,
        }
    }
}

#[cfg(test)]
impl<C: Connector> ChatSession<C> {
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn throttler(&self) -> &ReadReceiptThrottler {
        &self.throttler
    }
}
