//! Stream lifecycle core.
//!
//! A [`Channel`] owns both halves of one stream. The connection feeds it inbound frames, the
//! application's producer feeds it outbound items, and the application's inbound subscriber feeds
//! it credit and cancellation. Each half finishes exactly once no matter which side ends it, and
//! [`Channel::join`] resolves once both have.
//!
//! ```text
//!   connection ──handle_*──▶ Channel ──deliver──▶ inbound subscriber
//!        ▲                     │  ▲                     │
//!        └──── send_* ─────────┘  └─request/cancel──────┘
//!                              ▲
//!   producer ──on_outgoing_*───┘
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use rsocket_frame::error_code::APPLICATION_ERROR;
use rsocket_frame::{CancelFrame, ErrorFrame, Frame, Payload, PayloadFrame, RequestNFrame};
use rsocket_reactive::{BoxError, EmptySubscription, Publisher, Subscriber, Subscription};
use tracing::{debug, trace, warn};

use crate::config::ChannelConfig;
use crate::error::{ProtocolError, StreamError};
use crate::incoming::{InboundSubscriber, Incoming};
use crate::outgoing::{Outgoing, OutgoingSubscription};
use crate::policy::{ChannelPolicy, PayloadPublisher};
use crate::sink::FrameSink;

/// One logical stream on a connection.
pub struct Channel {
    stream_id: u32,
    connection: Arc<dyn FrameSink>,
    policy: Arc<dyn ChannelPolicy>,
    config: ChannelConfig,
    incoming: Incoming,
    outgoing: Outgoing,
    initial_request_granted: AtomicBool,
    disposed: AtomicBool,
    this: Weak<Channel>,
}

impl Channel {
    /// Create the channel for `stream_id`.
    pub fn new(
        stream_id: u32,
        connection: Arc<dyn FrameSink>,
        policy: Arc<dyn ChannelPolicy>,
        config: ChannelConfig,
    ) -> Arc<Self> {
        debug!(stream_id, "channel created");
        Arc::new_cyclic(|this| Self {
            stream_id,
            connection,
            policy,
            config,
            incoming: Incoming::new(stream_id),
            outgoing: Outgoing::new(stream_id),
            initial_request_granted: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn is_incoming_finished(&self) -> bool {
        self.incoming.is_finished()
    }

    pub fn is_outgoing_finished(&self) -> bool {
        self.outgoing.is_finished()
    }

    /// Both halves finished.
    pub fn is_finished(&self) -> bool {
        self.is_incoming_finished() && self.is_outgoing_finished()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// The inbound flow, for the application to subscribe to.
    pub fn incoming(&self) -> IncomingPublisher {
        IncomingPublisher {
            stream_id: self.stream_id,
            channel: self.this.clone(),
        }
    }

    /// The outbound producer, created through the policy on first access.
    pub fn outgoing_publisher(&self) -> Arc<PayloadPublisher> {
        self.outgoing
            .publisher(|| self.policy.create_outgoing(self.stream_id, self.incoming()))
    }

    /// The subscription to the outbound producer, established on first access.
    pub fn outgoing_subscription(&self) -> Arc<OutgoingSubscription> {
        self.outgoing.subscription(
            || self.outgoing_publisher(),
            || {
                Arc::new(OutgoingSubscriber {
                    channel: self.this.clone(),
                }) as Arc<dyn Subscriber<Payload, StreamError>>
            },
        )
    }

    // ---- inbound frames ----

    /// Dispatch one inbound frame.
    pub fn handle_frame(&self, frame: Frame) {
        match frame {
            Frame::Payload(frame) => self.handle_payload(frame),
            Frame::Error(frame) => self.handle_error(&frame),
            Frame::RequestN(frame) => self.handle_request_n(frame),
            Frame::Cancel(frame) => self.handle_cancel(frame),
        }
    }

    /// PAYLOAD: `next` delivers an item, `complete` completes the inbound flow.
    pub fn handle_payload(&self, frame: PayloadFrame) {
        trace!(
            stream_id = self.stream_id,
            next = frame.next,
            complete = frame.complete,
            "payload received"
        );
        self.outgoing_subscription();

        if frame.next {
            let delivered = self.incoming.deliver(frame.payload);
            self.check_delivery(delivered);
        }
        if frame.complete {
            let completed = self.incoming.complete();
            self.check_delivery(completed);
        }
    }

    /// ERROR: terminates both halves and hands the typed error to the inbound subscriber.
    pub fn handle_error(&self, frame: &ErrorFrame) {
        trace!(
            stream_id = self.stream_id,
            code = frame.code_name(),
            "error received"
        );
        self.outgoing_subscription();

        self.outgoing.finish();
        let error = ProtocolError::from_frame(frame);
        debug!(stream_id = self.stream_id, error = %error, "stream terminated by peer");
        let delivered = self.incoming.deliver_error(StreamError::Protocol(error));
        self.check_delivery(delivered);
        self.incoming.finish();
    }

    /// REQUEST_N: grants the producer `n` more items.
    pub fn handle_request_n(&self, frame: RequestNFrame) {
        trace!(stream_id = self.stream_id, n = frame.n, "request-n received");
        self.outgoing_subscription();
        self.grant_outgoing(frame.n);
    }

    /// CANCEL: stops the outbound half only. The peer may still send inbound items.
    pub fn handle_cancel(&self, _frame: CancelFrame) {
        trace!(stream_id = self.stream_id, "cancel received");
        self.outgoing_subscription();
        if self.outgoing.finish() {
            debug!(stream_id = self.stream_id, "outgoing cancelled by peer");
        }
    }

    // ---- outbound producer ----

    /// The producer emitted an item.
    pub fn on_outgoing_next(&self, payload: Payload) {
        let sent = self
            .outgoing
            .emit(|| self.connection.send_payload(self.stream_id, payload, false, true));
        match sent {
            None => trace!(stream_id = self.stream_id, "item after outgoing finish dropped"),
            Some(Ok(())) => {}
            Some(Err(err)) => self.on_outgoing_error(StreamError::Sink(err)),
        }
    }

    /// The producer completed.
    pub fn on_outgoing_completed(&self) {
        let sent = self.outgoing.finish_with(|| {
            self.connection
                .send_payload(self.stream_id, Payload::empty(), true, false)
        });
        if let Some(Err(err)) = sent {
            self.fail_stream(StreamError::Sink(err));
        }
    }

    /// The producer failed.
    ///
    /// A failed producer leaves the stream's credit accounting unusable, so the whole stream
    /// ends: the inbound subscriber gets a cancellation-style error and the peer gets
    /// APPLICATION_ERROR.
    pub fn on_outgoing_error(&self, error: StreamError) {
        if !self.outgoing.finish() {
            trace!(stream_id = self.stream_id, error = %error, "producer error after finish dropped");
            return;
        }
        self.fail_stream(error);
    }

    /// Producer-fault path. The outgoing half must already be finished.
    fn fail_stream(&self, error: StreamError) {
        let message = error.to_string();
        debug!(stream_id = self.stream_id, error = %message, "outbound producer failed");

        let cancelled = StreamError::ProducerFailed {
            stream_id: self.stream_id,
            source: Box::new(error),
        };
        let delivered = self.incoming.deliver_error(cancelled);
        self.check_delivery(delivered);
        self.incoming.finish();

        if let Err(err) = self
            .connection
            .send_error(self.stream_id, APPLICATION_ERROR, &message)
        {
            warn!(stream_id = self.stream_id, error = %err, "failed sending application error");
        }
    }

    // ---- inbound subscriber ----

    /// The inbound subscriber asked for `n` more items; tell the peer.
    pub fn request_incoming(&self, n: u32) {
        if n == 0 || self.incoming.is_finished() {
            trace!(stream_id = self.stream_id, n, "inbound credit dropped");
            return;
        }
        if let Err(err) = self.connection.send_request_n(self.stream_id, n) {
            warn!(stream_id = self.stream_id, n, error = %err, "failed sending request-n");
        }
    }

    /// The inbound subscriber cancelled; finish the inbound half and tell the peer.
    pub fn cancel_incoming(&self) {
        if !self.incoming.finish() {
            return;
        }
        debug!(stream_id = self.stream_id, "incoming cancelled locally");
        if let Err(err) = self.connection.send_cancel(self.stream_id) {
            warn!(stream_id = self.stream_id, error = %err, "failed sending cancel");
        }
    }

    fn subscribe_incoming(&self, subscriber: InboundSubscriber) -> Arc<dyn Subscription> {
        if let Err(err) = self.incoming.attach(Arc::clone(&subscriber)) {
            subscriber.on_error(err);
            return Arc::new(EmptySubscription);
        }
        debug!(stream_id = self.stream_id, "inbound subscriber attached");
        let delivered = self.incoming.drain();
        self.check_delivery(delivered);
        Arc::new(IncomingSubscription {
            channel: self.this.clone(),
        })
    }

    fn check_delivery(&self, delivered: Result<(), BoxError>) {
        if let Err(err) = delivered {
            debug!(stream_id = self.stream_id, error = %err, "inbound subscriber failed");
            self.cancel_incoming();
        }
    }

    fn grant_outgoing(&self, n: u32) {
        if self.outgoing.is_finished() {
            trace!(stream_id = self.stream_id, n, "credit after outgoing finish dropped");
            return;
        }
        self.outgoing_subscription().request(n);
    }

    // ---- lifetime ----

    /// Resolves once both halves are finished.
    ///
    /// The first call grants `initial_outgoing_request` credit to the producer, if configured.
    pub async fn join(&self) {
        let initial = self.config.initial_outgoing_request;
        if initial > 0 && !self.initial_request_granted.swap(true, Ordering::SeqCst) {
            self.grant_outgoing(initial);
        }
        tokio::join!(
            self.incoming.done().cancelled(),
            self.outgoing.done().cancelled()
        );
        debug!(stream_id = self.stream_id, "channel joined");
    }

    /// Tear the stream down. Idempotent and never fails.
    ///
    /// An inbound subscriber that is still open receives [`StreamError::Disposed`] first. Policy
    /// cleanup runs last; its errors and panics are logged and discarded.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(stream_id = self.stream_id, "disposing channel");

        if !self.incoming.is_finished() {
            let delivered = self.incoming.deliver_error(StreamError::Disposed {
                stream_id: self.stream_id,
            });
            self.check_delivery(delivered);
        }
        self.incoming.finish();
        self.outgoing.finish();

        match catch_unwind(AssertUnwindSafe(|| self.policy.on_dispose(self.stream_id))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(stream_id = self.stream_id, error = %err, "channel cleanup failed");
            }
            Err(_) => warn!(stream_id = self.stream_id, "channel cleanup panicked"),
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("stream_id", &self.stream_id)
            .field("incoming_finished", &self.is_incoming_finished())
            .field("outgoing_finished", &self.is_outgoing_finished())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// The inbound flow of a [`Channel`]. Accepts a single subscriber.
#[derive(Clone)]
pub struct IncomingPublisher {
    stream_id: u32,
    channel: Weak<Channel>,
}

impl IncomingPublisher {
    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }
}

impl Publisher<Payload, StreamError> for IncomingPublisher {
    fn subscribe(
        &self,
        subscriber: Arc<dyn Subscriber<Payload, StreamError>>,
    ) -> Arc<dyn Subscription> {
        match self.channel.upgrade() {
            Some(channel) => channel.subscribe_incoming(subscriber),
            None => {
                subscriber.on_error(StreamError::Disposed {
                    stream_id: self.stream_id,
                });
                Arc::new(EmptySubscription)
            }
        }
    }
}

/// Handed to the inbound subscriber: credit goes to the peer as REQUEST_N, cancel as CANCEL.
struct IncomingSubscription {
    channel: Weak<Channel>,
}

impl Subscription for IncomingSubscription {
    fn request(&self, n: u32) {
        if let Some(channel) = self.channel.upgrade() {
            channel.request_incoming(n);
        }
    }

    fn cancel(&self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.cancel_incoming();
        }
    }
}

/// Subscribed to the producer on the channel's behalf.
struct OutgoingSubscriber {
    channel: Weak<Channel>,
}

impl Subscriber<Payload, StreamError> for OutgoingSubscriber {
    fn on_next(&self, item: Payload) -> Result<(), BoxError> {
        match self.channel.upgrade() {
            Some(channel) => {
                channel.on_outgoing_next(item);
                Ok(())
            }
            None => Err("channel dropped".into()),
        }
    }

    fn on_complete(&self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.on_outgoing_completed();
        }
    }

    fn on_error(&self, error: StreamError) {
        if let Some(channel) = self.channel.upgrade() {
            channel.on_outgoing_error(error);
        }
    }
}
