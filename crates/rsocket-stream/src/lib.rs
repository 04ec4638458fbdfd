//! RSocket stream lifecycle core.
//!
//! One [`Channel`] per logical stream. It owns the stream's two half-streams and guarantees each
//! finishes exactly once, whichever side ends it:
//! - the incoming half republishes the peer's PAYLOAD/ERROR frames to the application
//! - the outgoing half subscribes to the application's producer and turns its items into frames
//! - [`ProtocolError::from_frame`] maps peer ERROR frames into a typed taxonomy
//!
//! The owning connection routes decoded frames in through [`Channel::handle_frame`] and receives
//! outbound frames through a [`FrameSink`]. Interaction-model differences live behind
//! [`ChannelPolicy`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use rsocket_frame::{Frame, Payload, PayloadFrame};
//! use rsocket_reactive::Publisher;
//! use rsocket_stream::{
//!     Channel, ChannelConfig, InboundEvent, PublisherPolicy, RecordingSink, RecordingSubscriber,
//!     ScriptedProducer,
//! };
//!
//! let sink = Arc::new(RecordingSink::new());
//! let producer = ScriptedProducer::new();
//! let policy = Arc::new(PublisherPolicy::new(Arc::new(producer.clone())));
//! let channel = Channel::new(1, sink.clone(), policy, ChannelConfig::default());
//!
//! let subscriber = Arc::new(RecordingSubscriber::new());
//! channel.incoming().subscribe(subscriber.clone());
//!
//! let frame = PayloadFrame::new(1, Payload::new("hello"), true, true).unwrap();
//! channel.handle_frame(Frame::Payload(frame));
//!
//! assert_eq!(subscriber.items(), vec![b"hello".to_vec()]);
//! assert_eq!(subscriber.terminal(), Some(InboundEvent::Complete));
//! assert!(channel.is_incoming_finished());
//! assert_eq!(producer.subscribe_count(), 1);
//! ```

pub mod channel;
pub mod config;
pub mod error;
mod incoming;
mod outgoing;
pub mod policy;
pub mod script;
pub mod sink;

pub use channel::{Channel, IncomingPublisher};
pub use config::ChannelConfig;
pub use error::{ProtocolError, Result, SinkError, StreamError};
pub use outgoing::OutgoingSubscription;
pub use policy::{ChannelPolicy, FnPolicy, PayloadPublisher, PublisherPolicy};
pub use script::{InboundEvent, RecordingSubscriber, ScriptedProducer};
pub use sink::{FrameSink, RecordingSink};
