use rsocket_frame::error_code::{
    APPLICATION_ERROR, CANCELED, CONNECTION_CLOSE, CONNECTION_ERROR, INVALID, INVALID_SETUP,
    REJECTED, REJECTED_RESUME, REJECTED_SETUP, UNSUPPORTED_SETUP,
};
use rsocket_frame::{ErrorFrame, CONNECTION_STREAM_ID};
use rsocket_reactive::BoxError;

/// Typed form of an ERROR frame received from the peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The SETUP frame was invalid.
    #[error("invalid setup: {0}")]
    InvalidSetup(String),

    /// The SETUP parameters are not supported.
    #[error("unsupported setup: {0}")]
    UnsupportedSetup(String),

    /// The SETUP was rejected.
    #[error("rejected setup: {0}")]
    RejectedSetup(String),

    /// The RESUME was rejected.
    #[error("rejected resume: {0}")]
    RejectedResume(String),

    /// The connection is being terminated.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// The connection is being closed.
    #[error("connection closed: {0}")]
    ConnectionClose(String),

    /// The peer's application failed while handling the stream.
    #[error("application error on stream {stream_id}: {message}")]
    ApplicationError { stream_id: u32, message: String },

    /// The peer rejected the request without processing it.
    #[error("stream {stream_id} rejected: {message}")]
    Rejected { stream_id: u32, message: String },

    /// The peer cancelled the stream.
    #[error("stream {stream_id} canceled: {message}")]
    Canceled { stream_id: u32, message: String },

    /// The peer considered the request invalid.
    #[error("stream {stream_id} invalid: {message}")]
    Invalid { stream_id: u32, message: String },

    /// A code that is unknown, or not valid in the scope it arrived in.
    #[error("protocol fault on stream {stream_id} (code {code:#06x}): {message}")]
    Fault {
        stream_id: u32,
        code: u32,
        message: String,
    },
}

impl ProtocolError {
    /// Map an ERROR frame to its typed error.
    ///
    /// Stream 0 selects the connection-scoped codes, any other stream the stream-scoped ones.
    /// Codes outside the selected scope become [`ProtocolError::Fault`]. Never fails.
    pub fn from_frame(frame: &ErrorFrame) -> Self {
        let stream_id = frame.stream_id;
        let message = frame.message.clone();

        if stream_id == CONNECTION_STREAM_ID {
            return match frame.code {
                INVALID_SETUP => ProtocolError::InvalidSetup(message),
                UNSUPPORTED_SETUP => ProtocolError::UnsupportedSetup(message),
                REJECTED_SETUP => ProtocolError::RejectedSetup(message),
                REJECTED_RESUME => ProtocolError::RejectedResume(message),
                CONNECTION_ERROR => ProtocolError::ConnectionError(message),
                CONNECTION_CLOSE => ProtocolError::ConnectionClose(message),
                code => ProtocolError::Fault {
                    stream_id,
                    code,
                    message,
                },
            };
        }

        match frame.code {
            APPLICATION_ERROR => ProtocolError::ApplicationError { stream_id, message },
            REJECTED => ProtocolError::Rejected { stream_id, message },
            CANCELED => ProtocolError::Canceled { stream_id, message },
            INVALID => ProtocolError::Invalid { stream_id, message },
            code => ProtocolError::Fault {
                stream_id,
                code,
                message,
            },
        }
    }

    /// Stream the error belongs to; 0 for connection-scoped errors.
    pub fn stream_id(&self) -> u32 {
        match self {
            ProtocolError::InvalidSetup(_)
            | ProtocolError::UnsupportedSetup(_)
            | ProtocolError::RejectedSetup(_)
            | ProtocolError::RejectedResume(_)
            | ProtocolError::ConnectionError(_)
            | ProtocolError::ConnectionClose(_) => CONNECTION_STREAM_ID,
            ProtocolError::ApplicationError { stream_id, .. }
            | ProtocolError::Rejected { stream_id, .. }
            | ProtocolError::Canceled { stream_id, .. }
            | ProtocolError::Invalid { stream_id, .. }
            | ProtocolError::Fault { stream_id, .. } => *stream_id,
        }
    }

    /// The wire code this error was mapped from.
    pub fn code(&self) -> u32 {
        match self {
            ProtocolError::InvalidSetup(_) => INVALID_SETUP,
            ProtocolError::UnsupportedSetup(_) => UNSUPPORTED_SETUP,
            ProtocolError::RejectedSetup(_) => REJECTED_SETUP,
            ProtocolError::RejectedResume(_) => REJECTED_RESUME,
            ProtocolError::ConnectionError(_) => CONNECTION_ERROR,
            ProtocolError::ConnectionClose(_) => CONNECTION_CLOSE,
            ProtocolError::ApplicationError { .. } => APPLICATION_ERROR,
            ProtocolError::Rejected { .. } => REJECTED,
            ProtocolError::Canceled { .. } => CANCELED,
            ProtocolError::Invalid { .. } => INVALID,
            ProtocolError::Fault { code, .. } => *code,
        }
    }

    /// The error text sent by the peer.
    pub fn message(&self) -> &str {
        match self {
            ProtocolError::InvalidSetup(message)
            | ProtocolError::UnsupportedSetup(message)
            | ProtocolError::RejectedSetup(message)
            | ProtocolError::RejectedResume(message)
            | ProtocolError::ConnectionError(message)
            | ProtocolError::ConnectionClose(message) => message,
            ProtocolError::ApplicationError { message, .. }
            | ProtocolError::Rejected { message, .. }
            | ProtocolError::Canceled { message, .. }
            | ProtocolError::Invalid { message, .. }
            | ProtocolError::Fault { message, .. } => message,
        }
    }

    /// True for the connection-scoped variants.
    pub fn is_connection_error(&self) -> bool {
        self.stream_id() == CONNECTION_STREAM_ID
    }
}

impl From<&ErrorFrame> for ProtocolError {
    fn from(frame: &ErrorFrame) -> Self {
        ProtocolError::from_frame(frame)
    }
}

/// Errors returned by a [`FrameSink`](crate::sink::FrameSink).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The connection no longer accepts frames.
    #[error("connection closed")]
    Closed,

    /// An I/O error occurred while handing the frame to the transport.
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection refused the frame.
    #[error("frame rejected: {0}")]
    Rejected(String),
}

/// Terminal errors observed on a stream's inbound flow.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The peer sent an ERROR frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The local outbound producer failed; the stream was cancelled.
    #[error("stream {stream_id} cancelled: outbound producer failed: {source}")]
    ProducerFailed {
        stream_id: u32,
        #[source]
        source: BoxError,
    },

    /// The stream was disposed while its inbound flow was still open.
    #[error("stream {stream_id} cancelled: disposed")]
    Disposed { stream_id: u32 },

    /// The inbound flow accepts a single subscriber.
    #[error("stream {stream_id} already has an inbound subscriber")]
    AlreadySubscribed { stream_id: u32 },

    /// An error raised by application code.
    #[error("{0}")]
    Application(BoxError),

    /// Handing a frame to the connection failed.
    #[error("frame sink error: {0}")]
    Sink(#[from] SinkError),
}

impl StreamError {
    /// Wrap an application error.
    pub fn application(error: impl Into<BoxError>) -> Self {
        StreamError::Application(error.into())
    }

    /// True for cancellation-style terminations: local producer failure, disposal, or a peer
    /// CANCELED error.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            StreamError::ProducerFailed { .. }
                | StreamError::Disposed { .. }
                | StreamError::Protocol(ProtocolError::Canceled { .. })
        )
    }

    /// The protocol error, if the peer sent one.
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            StreamError::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
