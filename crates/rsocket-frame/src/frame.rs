use std::fmt;

use bytes::Bytes;

use crate::error::{FrameError, Result};
use crate::error_code::error_code_name;

/// Stream id reserved for connection-level frames.
pub const CONNECTION_STREAM_ID: u32 = 0;

/// Largest valid stream id (31 bits).
pub const MAX_STREAM_ID: u32 = 0x7FFF_FFFF;

/// Application data carried by PAYLOAD frames.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload {
    /// The payload data.
    pub data: Bytes,
    /// Optional payload metadata.
    pub metadata: Option<Bytes>,
}

impl Payload {
    /// Create a payload without metadata.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: None,
        }
    }

    /// Create a payload with metadata.
    pub fn with_metadata(data: impl Into<Bytes>, metadata: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: Some(metadata.into()),
        }
    }

    /// An empty payload, as carried by a completion-only PAYLOAD frame.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Data length plus metadata length.
    pub fn len(&self) -> usize {
        self.data.len() + self.metadata.as_ref().map_or(0, Bytes::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Payload");
        match std::str::from_utf8(&self.data) {
            Ok(text) => dbg.field("data", &text),
            Err(_) => dbg.field("data", &format_args!("<binary {} bytes>", self.data.len())),
        };
        if let Some(metadata) = &self.metadata {
            dbg.field("metadata", &format_args!("<{} bytes>", metadata.len()));
        }
        dbg.finish()
    }
}

/// PAYLOAD frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadFrame {
    pub stream_id: u32,
    pub payload: Payload,
    /// The frame carries an item.
    pub next: bool,
    /// The sender's half of the stream is complete.
    pub complete: bool,
}

impl PayloadFrame {
    /// Create a PAYLOAD frame, validating stream id and flags.
    pub fn new(stream_id: u32, payload: Payload, next: bool, complete: bool) -> Result<Self> {
        validate_stream_id(stream_id)?;
        if !next && !complete {
            return Err(FrameError::EmptyPayloadFrame(stream_id));
        }
        Ok(Self {
            stream_id,
            payload,
            next,
            complete,
        })
    }

    /// An item frame (`next` set, `complete` clear).
    pub fn next(stream_id: u32, payload: Payload) -> Result<Self> {
        Self::new(stream_id, payload, true, false)
    }

    /// A completion-only frame (`next` clear, `complete` set).
    pub fn complete(stream_id: u32) -> Result<Self> {
        Self::new(stream_id, Payload::empty(), false, true)
    }
}

/// ERROR frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorFrame {
    /// Zero for connection-scoped errors.
    pub stream_id: u32,
    pub code: u32,
    pub message: String,
}

impl ErrorFrame {
    /// Create an ERROR frame. Stream id 0 is allowed and marks a connection-scoped error.
    pub fn new(stream_id: u32, code: u32, message: impl Into<String>) -> Result<Self> {
        if stream_id > MAX_STREAM_ID {
            return Err(FrameError::InvalidStreamId(stream_id));
        }
        Ok(Self {
            stream_id,
            code,
            message: message.into(),
        })
    }

    /// Name of the carried error code.
    pub fn code_name(&self) -> &'static str {
        error_code_name(self.code)
    }
}

/// REQUEST_N frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestNFrame {
    pub stream_id: u32,
    pub n: u32,
}

impl RequestNFrame {
    pub fn new(stream_id: u32, n: u32) -> Result<Self> {
        validate_stream_id(stream_id)?;
        if n == 0 {
            return Err(FrameError::ZeroRequestN);
        }
        Ok(Self { stream_id, n })
    }
}

/// CANCEL frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelFrame {
    pub stream_id: u32,
}

impl CancelFrame {
    pub fn new(stream_id: u32) -> Result<Self> {
        validate_stream_id(stream_id)?;
        Ok(Self { stream_id })
    }
}

/// Frame type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Payload,
    Error,
    RequestN,
    Cancel,
}

impl FrameType {
    /// Protocol name of the frame type.
    pub fn name(self) -> &'static str {
        match self {
            FrameType::Payload => "PAYLOAD",
            FrameType::Error => "ERROR",
            FrameType::RequestN => "REQUEST_N",
            FrameType::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stream-level frame routed to one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Payload(PayloadFrame),
    Error(ErrorFrame),
    RequestN(RequestNFrame),
    Cancel(CancelFrame),
}

impl Frame {
    /// The stream this frame belongs to.
    pub fn stream_id(&self) -> u32 {
        match self {
            Frame::Payload(frame) => frame.stream_id,
            Frame::Error(frame) => frame.stream_id,
            Frame::RequestN(frame) => frame.stream_id,
            Frame::Cancel(frame) => frame.stream_id,
        }
    }

    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Payload(_) => FrameType::Payload,
            Frame::Error(_) => FrameType::Error,
            Frame::RequestN(_) => FrameType::RequestN,
            Frame::Cancel(_) => FrameType::Cancel,
        }
    }
}

impl From<PayloadFrame> for Frame {
    fn from(frame: PayloadFrame) -> Self {
        Frame::Payload(frame)
    }
}

impl From<ErrorFrame> for Frame {
    fn from(frame: ErrorFrame) -> Self {
        Frame::Error(frame)
    }
}

impl From<RequestNFrame> for Frame {
    fn from(frame: RequestNFrame) -> Self {
        Frame::RequestN(frame)
    }
}

impl From<CancelFrame> for Frame {
    fn from(frame: CancelFrame) -> Self {
        Frame::Cancel(frame)
    }
}

fn validate_stream_id(stream_id: u32) -> Result<()> {
    if stream_id == CONNECTION_STREAM_ID || stream_id > MAX_STREAM_ID {
        return Err(FrameError::InvalidStreamId(stream_id));
    }
    Ok(())
}
