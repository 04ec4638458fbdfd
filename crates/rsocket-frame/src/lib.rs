//! Structured RSocket frame records.
//!
//! Frames arrive here already decoded. This crate only describes them:
//! - [`Payload`] carries data and optional metadata
//! - [`Frame`] covers the stream-level frames the lifecycle core handles
//!   (PAYLOAD, ERROR, REQUEST_N, CANCEL)
//! - [`error_code`] lists the protocol error codes and their scopes
//!
//! Byte-level encoding belongs to the transport.

pub mod error;
pub mod error_code;
pub mod frame;

pub use error::{FrameError, Result};
pub use error_code::{
    error_code_from_name, error_code_name, is_connection_scoped, is_stream_scoped,
    APPLICATION_ERROR, CANCELED, CONNECTION_CLOSE, CONNECTION_ERROR, INVALID, INVALID_SETUP,
    REJECTED, REJECTED_RESUME, REJECTED_SETUP, UNSUPPORTED_SETUP,
};
pub use frame::{
    CancelFrame, ErrorFrame, Frame, FrameType, Payload, PayloadFrame, RequestNFrame,
    CONNECTION_STREAM_ID, MAX_STREAM_ID,
};
