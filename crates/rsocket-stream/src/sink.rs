//! Outbound frame sink provided by the owning connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use rsocket_frame::{CancelFrame, ErrorFrame, Frame, Payload, PayloadFrame, RequestNFrame};

use crate::error::SinkError;

/// The connection's outbound side, as seen by one stream.
///
/// Implementations hand frames to the transport and must return promptly. They must not call back
/// into the sending channel synchronously; queue the frame and route replies on another path.
pub trait FrameSink: Send + Sync {
    fn send_payload(
        &self,
        stream_id: u32,
        payload: Payload,
        complete: bool,
        next: bool,
    ) -> Result<(), SinkError>;

    fn send_error(&self, stream_id: u32, code: u32, message: &str) -> Result<(), SinkError>;

    fn send_request_n(&self, stream_id: u32, n: u32) -> Result<(), SinkError>;

    fn send_cancel(&self, stream_id: u32) -> Result<(), SinkError>;
}

/// Sink that records every frame it is handed.
///
/// Used by tests and by the `simulate` command. [`RecordingSink::close`] makes later sends fail
/// with [`SinkError::Closed`].
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Frame>>,
    closed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the frames recorded so far, in send order.
    pub fn frames(&self) -> Vec<Frame> {
        self.lock().clone()
    }

    /// Remove and return the recorded frames.
    pub fn take(&self) -> Vec<Frame> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Reject all further sends.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn record(&self, frame: Frame) -> Result<(), SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        self.lock().push(frame);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Frame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameSink for RecordingSink {
    fn send_payload(
        &self,
        stream_id: u32,
        payload: Payload,
        complete: bool,
        next: bool,
    ) -> Result<(), SinkError> {
        self.record(Frame::Payload(PayloadFrame {
            stream_id,
            payload,
            next,
            complete,
        }))
    }

    fn send_error(&self, stream_id: u32, code: u32, message: &str) -> Result<(), SinkError> {
        self.record(Frame::Error(ErrorFrame {
            stream_id,
            code,
            message: message.to_string(),
        }))
    }

    fn send_request_n(&self, stream_id: u32, n: u32) -> Result<(), SinkError> {
        self.record(Frame::RequestN(RequestNFrame { stream_id, n }))
    }

    fn send_cancel(&self, stream_id: u32) -> Result<(), SinkError> {
        self.record(Frame::Cancel(CancelFrame { stream_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_send_order() {
        let sink = RecordingSink::new();
        sink.send_request_n(3, 5).unwrap();
        sink.send_payload(3, Payload::new("x"), false, true).unwrap();
        sink.send_cancel(3).unwrap();

        let frames = sink.take();
        assert_eq!(frames.len(), 3);
        assert!(matches!(frames[0], Frame::RequestN(RequestNFrame { n: 5, .. })));
        assert!(matches!(&frames[1], Frame::Payload(f) if f.next && !f.complete));
        assert!(matches!(frames[2], Frame::Cancel(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn closed_sink_rejects_frames() {
        let sink = RecordingSink::new();
        sink.close();
        assert!(matches!(sink.send_cancel(1), Err(SinkError::Closed)));
        assert_eq!(sink.len(), 0);
    }
}
