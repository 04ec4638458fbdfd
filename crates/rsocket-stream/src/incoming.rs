//! Inbound half of a stream.
//!
//! Signals received from the peer are queued and drained to the application's subscriber in
//! receipt order. One caller drains at a time and no lock is held while the subscriber runs, so a
//! subscriber may call back into the channel (cancel, request more) from inside a callback.
//!
//! A finish issued from inside a callback takes effect before the next item. A finish issued from
//! another thread may race one item that the drainer has already taken off the queue; that item
//! can still reach the subscriber after the half reports finished.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rsocket_frame::Payload;
use rsocket_reactive::{BoxError, Subscriber};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::StreamError;

pub(crate) type InboundSubscriber = Arc<dyn Subscriber<Payload, StreamError>>;

enum Signal {
    Next(Payload),
    Complete,
    Error(StreamError),
}

#[derive(Default)]
struct State {
    subscriber: Option<InboundSubscriber>,
    subscribed: bool,
    pending: VecDeque<Signal>,
    draining: bool,
    finished: bool,
}

pub(crate) struct Incoming {
    stream_id: u32,
    state: Mutex<State>,
    done: CancellationToken,
}

impl Incoming {
    pub(crate) fn new(stream_id: u32) -> Self {
        Self {
            stream_id,
            state: Mutex::new(State::default()),
            done: CancellationToken::new(),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Fires once this half is finished.
    pub(crate) fn done(&self) -> &CancellationToken {
        &self.done
    }

    /// Forward one item. No-op once finished.
    pub(crate) fn deliver(&self, payload: Payload) -> Result<(), BoxError> {
        if !self.push(Signal::Next(payload), false) {
            trace!(stream_id = self.stream_id, "inbound item after finish dropped");
            return Ok(());
        }
        self.drain()
    }

    /// Forward completion and finish. No-op once finished.
    pub(crate) fn complete(&self) -> Result<(), BoxError> {
        if self.push(Signal::Complete, true) {
            self.mark_done("completed");
        }
        self.drain()
    }

    /// Forward a terminal error and finish. No-op once finished.
    pub(crate) fn deliver_error(&self, error: StreamError) -> Result<(), BoxError> {
        if !self.push(Signal::Error(error), true) {
            trace!(stream_id = self.stream_id, "inbound error after finish dropped");
            return Ok(());
        }
        self.mark_done("errored");
        self.drain()
    }

    /// Finish without a terminal signal, dropping anything still queued.
    ///
    /// Returns true for the call that performed the transition.
    pub(crate) fn finish(&self) -> bool {
        {
            let mut state = self.lock();
            if state.finished {
                return false;
            }
            state.finished = true;
            state.pending.clear();
            state.subscriber = None;
        }
        self.mark_done("finished");
        true
    }

    /// Attach the application's subscriber. The inbound flow is unicast.
    pub(crate) fn attach(&self, subscriber: InboundSubscriber) -> Result<(), StreamError> {
        let mut state = self.lock();
        if state.subscribed {
            return Err(StreamError::AlreadySubscribed {
                stream_id: self.stream_id,
            });
        }
        state.subscribed = true;
        if state.finished && state.pending.is_empty() {
            // Finished before anyone listened and nothing terminal was kept.
            state.pending.push_back(Signal::Complete);
        }
        state.subscriber = Some(subscriber);
        Ok(())
    }

    /// Deliver queued signals to the subscriber.
    ///
    /// Returns the subscriber's error if it rejected an item; the subscriber and the rest of the
    /// queue are dropped in that case.
    pub(crate) fn drain(&self) -> Result<(), BoxError> {
        {
            let mut state = self.lock();
            if state.draining || state.subscriber.is_none() {
                return Ok(());
            }
            state.draining = true;
        }

        loop {
            let (subscriber, signal) = {
                let mut state = self.lock();
                let next = match state.subscriber.clone() {
                    Some(subscriber) => state.pending.pop_front().map(|sig| (subscriber, sig)),
                    None => None,
                };
                match next {
                    Some(next) => next,
                    None => {
                        state.draining = false;
                        return Ok(());
                    }
                }
            };

            match signal {
                Signal::Next(payload) => {
                    if let Err(err) = subscriber.on_next(payload) {
                        let mut state = self.lock();
                        state.subscriber = None;
                        state.pending.clear();
                        state.draining = false;
                        return Err(err);
                    }
                }
                Signal::Complete => {
                    subscriber.on_complete();
                    self.release();
                }
                Signal::Error(error) => {
                    subscriber.on_error(error);
                    self.release();
                }
            }
        }
    }

    fn push(&self, signal: Signal, terminal: bool) -> bool {
        let mut state = self.lock();
        if state.finished {
            return false;
        }
        state.pending.push_back(signal);
        if terminal {
            state.finished = true;
        }
        true
    }

    fn release(&self) {
        let mut state = self.lock();
        state.subscriber = None;
        state.pending.clear();
    }

    fn mark_done(&self, how: &'static str) {
        self.done.cancel();
        debug!(stream_id = self.stream_id, how, "incoming half finished");
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
