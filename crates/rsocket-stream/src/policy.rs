//! Customization points of a [`Channel`](crate::channel::Channel).

use std::sync::Arc;

use rsocket_frame::Payload;
use rsocket_reactive::{BoxError, Publisher};

use crate::channel::IncomingPublisher;
use crate::error::StreamError;

/// Producer type driven by a stream's outgoing half.
pub type PayloadPublisher = dyn Publisher<Payload, StreamError>;

/// Behavior injected into a channel for the parts that differ between interaction models.
pub trait ChannelPolicy: Send + Sync {
    /// Build the outbound producer. Called at most once per channel.
    ///
    /// `incoming` is the stream's inbound flow, for responders that derive their output from it.
    /// An `Err` is reported through the producer-error path: the peer receives APPLICATION_ERROR
    /// and the inbound subscriber a cancellation-style error.
    fn create_outgoing(
        &self,
        stream_id: u32,
        incoming: IncomingPublisher,
    ) -> Result<Arc<PayloadPublisher>, StreamError>;

    /// Extra cleanup run once during disposal. Failures are logged and discarded.
    fn on_dispose(&self, _stream_id: u32) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Policy backed by a ready-made producer.
pub struct PublisherPolicy {
    publisher: Arc<PayloadPublisher>,
}

impl PublisherPolicy {
    pub fn new(publisher: Arc<PayloadPublisher>) -> Self {
        Self { publisher }
    }
}

impl ChannelPolicy for PublisherPolicy {
    fn create_outgoing(
        &self,
        _stream_id: u32,
        _incoming: IncomingPublisher,
    ) -> Result<Arc<PayloadPublisher>, StreamError> {
        Ok(Arc::clone(&self.publisher))
    }
}

/// Policy backed by a closure, typically a responder's request handler.
pub struct FnPolicy<F> {
    create: F,
}

impl<F> FnPolicy<F>
where
    F: Fn(u32, IncomingPublisher) -> Result<Arc<PayloadPublisher>, StreamError> + Send + Sync,
{
    pub fn new(create: F) -> Self {
        Self { create }
    }
}

impl<F> ChannelPolicy for FnPolicy<F>
where
    F: Fn(u32, IncomingPublisher) -> Result<Arc<PayloadPublisher>, StreamError> + Send + Sync,
{
    fn create_outgoing(
        &self,
        stream_id: u32,
        incoming: IncomingPublisher,
    ) -> Result<Arc<PayloadPublisher>, StreamError> {
        (self.create)(stream_id, incoming)
    }
}
