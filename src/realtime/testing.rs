use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::UserId;

use super::transport::{Connector, EventSink, SubscriptionId, Transport, TransportEvent};

#[derive(Debug, Default)]
pub struct Recorded {
    pub connected: bool,
    pub opened: Vec<UserId>,
    pub sinks: Vec<EventSink>,
    pub subscribed: Vec<(SubscriptionId, String)>,
    pub unsubscribed: Vec<SubscriptionId>,
    pub published: Vec<(String, String)>,
    pub closed: usize,
    next_id: u64,
}

impl Recorded {
    pub fn live_destinations(&self) -> Vec<String> {
        let mut live: Vec<String> = self
            .subscribed
            .iter()
            .filter(|(id, _)| !self.unsubscribed.contains(id))
            .map(|(_, destination)| destination.clone())
            .collect();
        live.sort();
        live
    }

    pub fn subscription_for(&self, destination: &str) -> Option<SubscriptionId> {
        self.subscribed
            .iter()
            .rev()
            .find(|(_, subscribed)| subscribed == destination)
            .map(|(id, _)| *id)
    }
}

/// Connector double whose transports record every call in shared state.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingConnector {
    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().expect("recording lock must not be poisoned")
    }

    pub fn set_connected(&self, connected: bool) {
        self.recorded().connected = connected;
    }

    pub fn transport(&self) -> RecordingTransport {
        RecordingTransport {
            recorded: Arc::clone(&self.recorded),
            closed: false,
        }
    }

    /// Emits `event` through the most recently opened transport's sink.
    pub fn emit(&self, event: TransportEvent) {
        let sink = self
            .recorded()
            .sinks
            .last()
            .cloned()
            .expect("a transport must have been opened");
        sink.emit(event);
    }
}

impl Connector for RecordingConnector {
    type Transport = RecordingTransport;

    fn open(&self, user_id: UserId, sink: EventSink) -> RecordingTransport {
        let mut recorded = self.recorded();
        recorded.opened.push(user_id);
        recorded.sinks.push(sink);
        drop(recorded);
        self.transport()
    }
}

#[derive(Debug)]
pub struct RecordingTransport {
    recorded: Arc<Mutex<Recorded>>,
    closed: bool,
}

impl RecordingTransport {
    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().expect("recording lock must not be poisoned")
    }
}

impl Transport for RecordingTransport {
    fn is_connected(&self) -> bool {
        !self.closed && self.recorded().connected
    }

    fn subscribe(&mut self, destination: &str) -> SubscriptionId {
        let mut recorded = self.recorded();
        let id = SubscriptionId(recorded.next_id);
        recorded.next_id += 1;
        recorded.subscribed.push((id, destination.to_owned()));
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.recorded().unsubscribed.push(subscription);
    }

    fn publish(&mut self, destination: &str, body: String) {
        if !self.is_connected() {
            return;
        }
        self.recorded().published.push((destination.to_owned(), body));
    }

    fn publish_retained(&mut self, destination: &str, body: String) {
        if !self.closed {
            self.recorded().published.push((destination.to_owned(), body));
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.recorded().closed += 1;
        }
    }
}
