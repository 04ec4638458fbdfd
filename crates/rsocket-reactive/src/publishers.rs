//! Stock publishers.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::traits::{Publisher, Subscriber, Subscription};

/// Constructors for the stock publishers.
pub struct Publishers;

impl Publishers {
    /// A publisher that emits `items` in order under request-N credit, then completes.
    pub fn iter<T, E>(items: impl IntoIterator<Item = T>) -> IterPublisher<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Send + 'static,
    {
        IterPublisher::new(items)
    }

    /// A publisher that completes as soon as it is subscribed.
    pub fn empty<T, E>() -> IterPublisher<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Send + 'static,
    {
        IterPublisher::new(Vec::new())
    }

    /// A publisher that fails its first subscriber with `error`.
    pub fn error<T, E>(error: E) -> ErrorPublisher<T, E>
    where
        E: Send + 'static,
    {
        ErrorPublisher::new(error)
    }
}

/// Subscription that ignores credit and cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySubscription;

impl Subscription for EmptySubscription {
    fn request(&self, _n: u32) {}

    fn cancel(&self) {}
}

/// Publisher that terminates its subscriber with a stored error.
///
/// The error is handed to the first subscriber only. Later subscribers are completed
/// immediately.
pub struct ErrorPublisher<T, E> {
    error: Mutex<Option<E>>,
    _item: PhantomData<fn() -> T>,
}

impl<T, E> ErrorPublisher<T, E> {
    pub fn new(error: E) -> Self {
        Self {
            error: Mutex::new(Some(error)),
            _item: PhantomData,
        }
    }
}

impl<T, E> Publisher<T, E> for ErrorPublisher<T, E>
where
    E: Send + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T, E>>) -> Arc<dyn Subscription> {
        let error = self
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match error {
            Some(error) => subscriber.on_error(error),
            None => subscriber.on_complete(),
        }
        Arc::new(EmptySubscription)
    }
}

/// Publisher over a fixed list of items that honors request-N credit.
pub struct IterPublisher<T, E> {
    items: Vec<T>,
    _error: PhantomData<fn() -> E>,
}

impl<T, E> IterPublisher<T, E> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
            _error: PhantomData,
        }
    }
}

impl<T, E> Publisher<T, E> for IterPublisher<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T, E>>) -> Arc<dyn Subscription> {
        let subscription = Arc::new(IterSubscription {
            state: Mutex::new(IterState {
                items: self.items.iter().cloned().collect(),
                demand: 0,
                emitting: false,
                done: false,
            }),
            subscriber,
        });
        // An empty source completes without waiting for credit.
        subscription.request_inner(0);
        subscription
    }
}

struct IterState<T> {
    items: VecDeque<T>,
    demand: u64,
    emitting: bool,
    done: bool,
}

struct IterSubscription<T, E> {
    state: Mutex<IterState<T>>,
    subscriber: Arc<dyn Subscriber<T, E>>,
}

enum Step<T> {
    Next(T),
    Complete,
    Idle,
}

impl<T, E> IterSubscription<T, E> {
    fn request_inner(&self, n: u32) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.done {
                return;
            }
            state.demand = state.demand.saturating_add(u64::from(n));
            // A request issued from inside `on_next` is picked up by the running loop.
            if state.emitting {
                return;
            }
            state.emitting = true;
        }
        self.drain();
    }

    fn drain(&self) {
        loop {
            let step = {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                if state.done {
                    state.emitting = false;
                    Step::Idle
                } else if state.items.is_empty() {
                    state.done = true;
                    state.emitting = false;
                    Step::Complete
                } else if state.demand == 0 {
                    state.emitting = false;
                    Step::Idle
                } else {
                    state.demand -= 1;
                    match state.items.pop_front() {
                        Some(item) => Step::Next(item),
                        None => Step::Idle,
                    }
                }
            };

            match step {
                Step::Idle => return,
                Step::Complete => {
                    self.subscriber.on_complete();
                    return;
                }
                Step::Next(item) => {
                    if let Err(err) = self.subscriber.on_next(item) {
                        trace!(error = %err, "subscriber rejected item, stopping");
                        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                        state.done = true;
                        state.emitting = false;
                        state.items.clear();
                        return;
                    }
                }
            }
        }
    }
}

impl<T, E> Subscription for IterSubscription<T, E>
where
    T: Send,
{
    fn request(&self, n: u32) {
        self.request_inner(n);
    }

    fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.done = true;
        state.items.clear();
    }
}
