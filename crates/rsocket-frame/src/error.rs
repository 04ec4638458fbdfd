/// Errors raised when building frame records.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Stream-level frames need a stream id in `1..=MAX_STREAM_ID`.
    #[error("invalid stream id {0} (expected 1..=2147483647)")]
    InvalidStreamId(u32),

    /// REQUEST_N must grant at least one item.
    #[error("request-n must be greater than zero")]
    ZeroRequestN,

    /// A PAYLOAD frame must carry `next`, `complete`, or both.
    #[error("payload frame for stream {0} has neither next nor complete set")]
    EmptyPayloadFrame(u32),
}

pub type Result<T> = std::result::Result<T, FrameError>;
