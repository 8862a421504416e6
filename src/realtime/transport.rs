//! Seam between the chat session and the physical publish/subscribe link.

use std::fmt;

use tokio::sync::mpsc::UnboundedSender;

use crate::domain::UserId;

/// Transport-assigned subscription handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished; fired after every successful (re)connect.
    Connected,
    /// The link dropped or was closed.
    Disconnected,
    Message {
        subscription: SubscriptionId,
        body: String,
    },
}

/// A transport event stamped with the session epoch it was opened under.
///
/// The session bumps its epoch on every connect and disconnect, so events
/// from a torn-down transport are recognisable and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedTransportEvent {
    pub epoch: u64,
    pub event: TransportEvent,
}

#[derive(Debug, Clone)]
pub struct EventSink {
    epoch: u64,
    tx: UnboundedSender<TaggedTransportEvent>,
}

impl EventSink {
    pub fn new(epoch: u64, tx: UnboundedSender<TaggedTransportEvent>) -> Self {
        Self { epoch, tx }
    }

    /// Returns false once the receiving session is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(TaggedTransportEvent {
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }
}

/// One live publish/subscribe session.
///
/// Every call is fire-and-forget; nothing waits for a broker acknowledgement.
pub trait Transport: Send {
    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, destination: &str) -> SubscriptionId;

    fn unsubscribe(&mut self, subscription: SubscriptionId);

    /// Publishes `body` to `destination`; dropped when not connected.
    fn publish(&mut self, destination: &str, body: String);

    /// Publishes `body` to `destination`, holding it across a reconnect.
    ///
    /// When the link is down, or drops before the frame is written, the
    /// latest body per destination goes out right after the next handshake.
    fn publish_retained(&mut self, destination: &str, body: String) {
        self.publish(destination, body);
    }

    fn close(&mut self);
}

/// Opens transports bound to a user. Each opened transport reports through `sink`.
pub trait Connector: Send {
    type Transport: Transport + 'static;

    fn open(&self, user_id: UserId, sink: EventSink) -> Self::Transport;
}

/// Supplies the bearer token and endpoint used on every connect attempt.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;

    fn endpoint_url(&self) -> String;
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn subscription_id_renders_as_stomp_id() {
        assert_eq!(SubscriptionId(3).to_string(), "sub-3");
    }

    #[test]
    fn sink_stamps_events_with_its_epoch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(4, tx);

        assert!(sink.emit(TransportEvent::Connected));

        let tagged = rx.try_recv().expect("event must be queued");
        assert_eq!(tagged.epoch, 4);
        assert_eq!(tagged.event, TransportEvent::Connected);
    }

    #[test]
    fn sink_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(1, tx);
        drop(rx);

        assert!(!sink.emit(TransportEvent::Disconnected));
    }
}
