//! RSocket stream lifecycle core.
//!
//! # Crate Structure
//!
//! - [`reactive`]: publisher/subscriber/subscription capability traits
//! - [`frame`]: structured frame records and protocol error codes
//! - [`stream`]: the per-stream [`Channel`](stream::Channel) and its error taxonomy
//!
//! The `cli` feature builds the `rsocket-lifecycle` binary, which replays JSON scenarios against a
//! channel and prints the frames and signals it produces.

/// Re-export reactive capability types.
pub mod reactive {
    pub use rsocket_reactive::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rsocket_frame::*;
}

/// Re-export stream lifecycle types.
pub mod stream {
    pub use rsocket_stream::*;
}

pub use rsocket_stream::{
    Channel, ChannelConfig, ChannelPolicy, FrameSink, ProtocolError, StreamError,
};
