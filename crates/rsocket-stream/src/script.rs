//! Scriptable producer and recording subscriber.
//!
//! Both drive a [`Channel`](crate::channel::Channel) by hand: the `simulate` command replays a
//! scenario through them, and the integration tests use them to pin down exact signal order.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rsocket_frame::Payload;
use rsocket_reactive::{BoxError, Publisher, Subscriber, Subscription};

use crate::error::{ProtocolError, StreamError};

#[derive(Default)]
struct ProducerState {
    subscriber: Mutex<Option<Arc<dyn Subscriber<Payload, StreamError>>>>,
    subscribes: AtomicUsize,
    requested: AtomicU64,
    cancelled: AtomicBool,
}

/// Producer whose signals are emitted on command.
///
/// Credit is recorded, not enforced, so a script can also exercise a misbehaving producer.
#[derive(Clone, Default)]
pub struct ScriptedProducer {
    state: Arc<ProducerState>,
}

impl ScriptedProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the producer was subscribed.
    pub fn subscribe_count(&self) -> usize {
        self.state.subscribes.load(Ordering::SeqCst)
    }

    /// Total credit granted so far.
    pub fn requested(&self) -> u64 {
        self.state.requested.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriber().is_some()
    }

    /// Emit one item. Returns false if nobody is subscribed or the subscriber rejected it.
    pub fn emit_next(&self, payload: Payload) -> bool {
        match self.subscriber() {
            Some(subscriber) => subscriber.on_next(payload).is_ok(),
            None => false,
        }
    }

    pub fn emit_complete(&self) -> bool {
        match self.take_subscriber() {
            Some(subscriber) => {
                subscriber.on_complete();
                true
            }
            None => false,
        }
    }

    pub fn emit_error(&self, error: StreamError) -> bool {
        match self.take_subscriber() {
            Some(subscriber) => {
                subscriber.on_error(error);
                true
            }
            None => false,
        }
    }

    fn subscriber(&self) -> Option<Arc<dyn Subscriber<Payload, StreamError>>> {
        self.slot().clone()
    }

    fn take_subscriber(&self) -> Option<Arc<dyn Subscriber<Payload, StreamError>>> {
        self.slot().take()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<dyn Subscriber<Payload, StreamError>>>> {
        self.state
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Publisher<Payload, StreamError> for ScriptedProducer {
    fn subscribe(
        &self,
        subscriber: Arc<dyn Subscriber<Payload, StreamError>>,
    ) -> Arc<dyn Subscription> {
        self.state.subscribes.fetch_add(1, Ordering::SeqCst);
        *self.slot() = Some(subscriber);
        Arc::new(ScriptedSubscription {
            state: Arc::clone(&self.state),
        })
    }
}

struct ScriptedSubscription {
    state: Arc<ProducerState>,
}

impl Subscription for ScriptedSubscription {
    fn request(&self, n: u32) {
        self.state.requested.fetch_add(u64::from(n), Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }
}

/// A signal seen by a [`RecordingSubscriber`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Next(Payload),
    Complete,
    Error {
        message: String,
        cancellation: bool,
        protocol: Option<ProtocolError>,
    },
}

impl InboundEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InboundEvent::Next(_))
    }
}

/// Subscriber that records every signal it receives.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    events: Mutex<Vec<InboundEvent>>,
    reject_after: Option<usize>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `limit` items, then reject every further one.
    pub fn rejecting_after(limit: usize) -> Self {
        Self {
            reject_after: Some(limit),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<InboundEvent> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<InboundEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Data of the received items, in order.
    pub fn items(&self) -> Vec<Vec<u8>> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                InboundEvent::Next(payload) => Some(payload.data.to_vec()),
                _ => None,
            })
            .collect()
    }

    pub fn terminal(&self) -> Option<InboundEvent> {
        self.lock().iter().find(|e| e.is_terminal()).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InboundEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Subscriber<Payload, StreamError> for RecordingSubscriber {
    fn on_next(&self, item: Payload) -> Result<(), BoxError> {
        let mut events = self.lock();
        if let Some(limit) = self.reject_after {
            let accepted = events
                .iter()
                .filter(|e| matches!(e, InboundEvent::Next(_)))
                .count();
            if accepted >= limit {
                return Err(format!("subscriber accepts at most {limit} items").into());
            }
        }
        events.push(InboundEvent::Next(item));
        Ok(())
    }

    fn on_complete(&self) {
        self.lock().push(InboundEvent::Complete);
    }

    fn on_error(&self, error: StreamError) {
        self.lock().push(InboundEvent::Error {
            message: error.to_string(),
            cancellation: error.is_cancellation(),
            protocol: error.as_protocol().cloned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_records_credit_and_cancel() {
        let producer = ScriptedProducer::new();
        let subscriber = Arc::new(RecordingSubscriber::new());
        let subscription = producer.subscribe(subscriber.clone());

        subscription.request(2);
        subscription.request(3);
        assert_eq!(producer.requested(), 5);
        assert!(producer.emit_next(Payload::new("a")));
        assert!(producer.emit_complete());
        assert!(!producer.emit_next(Payload::new("b")));

        subscription.cancel();
        assert!(producer.is_cancelled());
        assert_eq!(
            subscriber.events(),
            vec![InboundEvent::Next(Payload::new("a")), InboundEvent::Complete]
        );
    }

    #[test]
    fn rejecting_subscriber_stops_at_limit() {
        let subscriber = RecordingSubscriber::rejecting_after(1);
        assert!(subscriber.on_next(Payload::new("a")).is_ok());
        assert!(subscriber.on_next(Payload::new("b")).is_err());
        assert_eq!(subscriber.items(), vec![b"a".to_vec()]);
    }

    #[test]
    fn error_event_keeps_protocol_detail() {
        let subscriber = RecordingSubscriber::new();
        subscriber.on_error(StreamError::Disposed { stream_id: 3 });
        match subscriber.terminal() {
            Some(InboundEvent::Error {
                cancellation,
                protocol,
                ..
            }) => {
                assert!(cancellation);
                assert!(protocol.is_none());
            }
            other => panic!("unexpected terminal: {other:?}"),
        }
    }
}
