//! Pure event routing and handler registration
//!
//! [`route_event`] collapses the transport's event stream into the four
//! outcomes the client reacts to. [`HandlerRegistry`] holds the
//! caller-supplied callbacks and enforces the registration semantics:
//! one message handler per client (the last registration wins, across
//! all topic filters) and an exactly-once connected callback.

use bytes::Bytes;
use rumqttc::{Event, Packet};

/// Inbound message handler.
///
/// One handler is active per client at a time; it receives every message
/// delivered on the connection regardless of which filter matched.
pub trait MessageHandler: Send {
    fn on_message(&mut self, topic: &str, payload: &[u8]);
}

impl<F> MessageHandler for F
where
    F: FnMut(&str, &[u8]) + Send,
{
    fn on_message(&mut self, topic: &str, payload: &[u8]) {
        self(topic, payload)
    }
}

/// Routing outcome for one transport event.
#[derive(Debug, Clone)]
pub enum EventRoute {
    /// Broker acknowledged the connection.
    ConnAckReceived,
    /// Message delivered on a subscribed topic.
    Message { topic: String, payload: Bytes },
    /// Broker acknowledged a subscribe request.
    SubscriptionConfirmed,
    /// Broker closed the connection.
    Disconnected,
    /// Event with no client-visible effect (pings, acks of our QoS 0
    /// traffic, outgoing packets).
    Ignored,
}

/// Map a raw transport event to its route.
pub fn route_event(event: &Event) -> EventRoute {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => EventRoute::ConnAckReceived,
        Event::Incoming(Packet::Publish(publish)) => EventRoute::Message {
            topic: publish.topic.clone(),
            payload: publish.payload.clone(),
        },
        Event::Incoming(Packet::SubAck(_)) => EventRoute::SubscriptionConfirmed,
        Event::Incoming(Packet::Disconnect) => EventRoute::Disconnected,
        Event::Incoming(_) | Event::Outgoing(_) => EventRoute::Ignored,
    }
}

/// Callback storage shared between the client and its event loop.
#[derive(Default)]
pub struct HandlerRegistry {
    on_connected: Option<Box<dyn FnOnce() + Send>>,
    on_message: Option<Box<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the connected callback for the next ConnAck.
    pub fn set_on_connected(&mut self, callback: Box<dyn FnOnce() + Send>) {
        self.on_connected = Some(callback);
    }

    /// Take the connected callback; subsequent calls return `None`, which
    /// is what makes the callback fire exactly once per connect.
    pub fn take_on_connected(&mut self) -> Option<Box<dyn FnOnce() + Send>> {
        self.on_connected.take()
    }

    /// Install the message handler, replacing any previous one.
    pub fn set_message_handler(&mut self, handler: Box<dyn MessageHandler>) {
        self.on_message = Some(handler);
    }

    /// Deliver a message to the active handler, if any.
    pub fn dispatch_message(&mut self, topic: &str, payload: &[u8]) {
        if let Some(handler) = self.on_message.as_mut() {
            handler.on_message(topic, payload);
        } else {
            tracing::debug!(topic, "message received with no handler registered");
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("on_connected_armed", &self.on_connected.is_some())
            .field("on_message_registered", &self.on_message.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, ConnectReturnCode, Outgoing, Publish, QoS, SubAck, SubscribeReasonCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn routes_connack() {
        let event = Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
        }));
        assert!(matches!(route_event(&event), EventRoute::ConnAckReceived));
    }

    #[test]
    fn routes_publish_with_exact_topic_and_payload() {
        let publish = Publish::new("t/1", QoS::AtMostOnce, "hello");
        let event = Event::Incoming(Packet::Publish(publish));

        match route_event(&event) {
            EventRoute::Message { topic, payload } => {
                assert_eq!(topic, "t/1");
                assert_eq!(payload.as_ref(), b"hello");
            }
            other => panic!("expected Message route, got {other:?}"),
        }
    }

    #[test]
    fn routes_suback_and_disconnect() {
        let suback = Event::Incoming(Packet::SubAck(SubAck::new(
            1,
            vec![SubscribeReasonCode::Success(QoS::AtMostOnce)],
        )));
        assert!(matches!(
            route_event(&suback),
            EventRoute::SubscriptionConfirmed
        ));

        let disconnect = Event::Incoming(Packet::Disconnect);
        assert!(matches!(route_event(&disconnect), EventRoute::Disconnected));
    }

    #[test]
    fn pings_and_outgoing_events_are_ignored() {
        assert!(matches!(
            route_event(&Event::Incoming(Packet::PingResp)),
            EventRoute::Ignored
        ));
        assert!(matches!(
            route_event(&Event::Outgoing(Outgoing::PingReq)),
            EventRoute::Ignored
        ));
    }

    #[test]
    fn connected_callback_fires_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();

        let count_clone = count.clone();
        registry.set_on_connected(Box::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        if let Some(cb) = registry.take_on_connected() {
            cb();
        }
        // A second ConnAck on the same registration finds nothing to call.
        assert!(registry.take_on_connected().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn last_registered_message_handler_wins() {
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();

        let first = first_hits.clone();
        registry.set_message_handler(Box::new(move |_: &str, _: &[u8]| {
            first.fetch_add(1, Ordering::SeqCst);
        }));
        let second = second_hits.clone();
        registry.set_message_handler(Box::new(move |_: &str, _: &[u8]| {
            second.fetch_add(1, Ordering::SeqCst);
        }));

        registry.dispatch_message("t/1", b"hello");

        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_without_handler_is_a_no_op() {
        let mut registry = HandlerRegistry::new();
        registry.dispatch_message("t/1", b"dropped");
    }

    #[test]
    fn handler_sees_published_bytes_verbatim() {
        let seen: Arc<std::sync::Mutex<Vec<(String, Vec<u8>)>>> = Arc::default();
        let mut registry = HandlerRegistry::new();

        let sink = seen.clone();
        registry.set_message_handler(Box::new(move |topic: &str, payload: &[u8]| {
            sink.lock().unwrap().push((topic.to_string(), payload.to_vec()));
        }));

        let publish = Publish::new("t/1", QoS::AtMostOnce, "hello");
        if let EventRoute::Message { topic, payload } =
            route_event(&Event::Incoming(Packet::Publish(publish)))
        {
            registry.dispatch_message(&topic, &payload);
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "t/1");
        assert_eq!(seen[0].1, b"hello");
    }
}
