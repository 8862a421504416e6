//! Topic subscriptions of one session, keyed by destination.
//!
//! A destination holds at most one live handle. The first subscriber wins:
//! subscribing to a destination that already has a handle leaves the
//! original handler in place.

use std::collections::HashMap;

use crate::domain::{events::InboundEvent, RoomId};

use super::{
    topics::Topic,
    transport::{SubscriptionId, Transport},
};

const REALTIME_PAYLOAD_DROPPED: &str = "REALTIME_PAYLOAD_DROPPED";

/// Decodes one inbound payload of a topic.
pub type TopicHandler = Box<dyn Fn(&str) -> Result<InboundEvent, serde_json::Error> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed(SubscriptionId),
    AlreadySubscribed,
    NotConnected,
}

struct Subscription {
    id: SubscriptionId,
    handler: TopicHandler,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    by_topic: HashMap<String, Subscription>,
    by_id: HashMap<SubscriptionId, String>,
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("topics", &self.topics())
            .finish()
    }
}

impl SubscriptionRegistry {
    /// Registers `handler` for `topic`.
    ///
    /// Silent no-op without a connected transport; the caller retries after
    /// the next handshake.
    pub fn subscribe(
        &mut self,
        transport: Option<&mut (dyn Transport + '_)>,
        topic: &str,
        handler: TopicHandler,
    ) -> SubscribeOutcome {
        let Some(transport) = transport.filter(|transport| transport.is_connected()) else {
            return SubscribeOutcome::NotConnected;
        };

        if self.by_topic.contains_key(topic) {
            return SubscribeOutcome::AlreadySubscribed;
        }

        let id = transport.subscribe(topic);
        self.by_topic.insert(topic.to_owned(), Subscription { id, handler });
        self.by_id.insert(id, topic.to_owned());

        tracing::debug!(topic, subscription = %id, "topic subscribed");
        SubscribeOutcome::Subscribed(id)
    }

    pub fn subscribe_topic(
        &mut self,
        transport: Option<&mut (dyn Transport + '_)>,
        topic: Topic,
    ) -> SubscribeOutcome {
        self.subscribe(
            transport,
            &topic.destination(),
            Box::new(move |body| topic.decode(body)),
        )
    }

    /// Cancels delivery for `topic`. Returns false when it had no handle.
    pub fn unsubscribe(
        &mut self,
        transport: Option<&mut (dyn Transport + '_)>,
        topic: &str,
    ) -> bool {
        let Some(subscription) = self.by_topic.remove(topic) else {
            return false;
        };
        self.by_id.remove(&subscription.id);

        if let Some(transport) = transport {
            transport.unsubscribe(subscription.id);
        }

        tracing::debug!(topic, subscription = %subscription.id, "topic unsubscribed");
        true
    }

    /// Drops the room's message and read-status topics.
    pub fn unsubscribe_room(
        &mut self,
        mut transport: Option<&mut (dyn Transport + '_)>,
        room_id: RoomId,
    ) {
        for topic in [Topic::RoomMessages(room_id), Topic::RoomReadStatus(room_id)] {
            self.unsubscribe(transport.as_deref_mut(), &topic.destination());
        }
    }

    pub fn unsubscribe_all(&mut self, mut transport: Option<&mut (dyn Transport + '_)>) {
        for (topic, subscription) in self.by_topic.drain() {
            if let Some(transport) = transport.as_deref_mut() {
                transport.unsubscribe(subscription.id);
            }
            tracing::debug!(topic = %topic, subscription = %subscription.id, "topic unsubscribed");
        }
        self.by_id.clear();
    }

    /// Runs the handler registered under `subscription`.
    ///
    /// Unknown handles and undecodable payloads yield `None`; the subscription
    /// stays live either way.
    pub fn dispatch(&self, subscription: SubscriptionId, body: &str) -> Option<InboundEvent> {
        let topic = self.by_id.get(&subscription)?;
        let handler = &self.by_topic.get(topic)?.handler;

        match handler(body) {
            Ok(event) => Some(event),
            Err(error) => {
                tracing::debug!(
                    code = REALTIME_PAYLOAD_DROPPED,
                    topic = %topic,
                    error = %error,
                    "dropping malformed payload"
                );
                None
            }
        }
    }

    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.by_topic.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }
}
