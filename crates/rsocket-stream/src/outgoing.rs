//! Outbound half of a stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use rsocket_frame::Payload;
use rsocket_reactive::{Publishers, Subscriber, Subscription};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::StreamError;
use crate::policy::PayloadPublisher;

/// The channel's handle on the outbound producer's subscription.
///
/// Cancellation is forwarded to the producer once; credit requests after that are dropped.
pub struct OutgoingSubscription {
    inner: Arc<dyn Subscription>,
    cancelled: AtomicBool,
}

impl OutgoingSubscription {
    fn new(inner: Arc<dyn Subscription>) -> Self {
        Self {
            inner,
            cancelled: AtomicBool::new(false),
        }
    }

    /// True once the subscription has been disposed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Subscription for OutgoingSubscription {
    fn request(&self, n: u32) {
        if !self.is_cancelled() {
            self.inner.request(n);
        }
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.cancel();
        }
    }
}

impl std::fmt::Debug for OutgoingSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutgoingSubscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

pub(crate) struct Outgoing {
    stream_id: u32,
    publisher: Mutex<Option<Arc<PayloadPublisher>>>,
    subscribe_lock: Mutex<()>,
    subscription: OnceLock<Arc<OutgoingSubscription>>,
    // Held while checking the finished flag and sending, so no frame follows the finish.
    emit_lock: Mutex<()>,
    finished: AtomicBool,
    done: CancellationToken,
}

impl Outgoing {
    pub(crate) fn new(stream_id: u32) -> Self {
        Self {
            stream_id,
            publisher: Mutex::new(None),
            subscribe_lock: Mutex::new(()),
            subscription: OnceLock::new(),
            emit_lock: Mutex::new(()),
            finished: AtomicBool::new(false),
            done: CancellationToken::new(),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Fires once this half is finished.
    pub(crate) fn done(&self) -> &CancellationToken {
        &self.done
    }

    /// The producer, created on first use.
    ///
    /// A failed creation is memoized as a publisher that fails its subscriber, so the error
    /// travels the same path as a producer failing at runtime.
    pub(crate) fn publisher<F>(&self, create: F) -> Arc<PayloadPublisher>
    where
        F: FnOnce() -> Result<Arc<PayloadPublisher>, StreamError>,
    {
        let mut slot = lock(&self.publisher);
        if let Some(publisher) = slot.as_ref() {
            return Arc::clone(publisher);
        }
        let publisher: Arc<PayloadPublisher> = match create() {
            Ok(publisher) => publisher,
            Err(err) => {
                warn!(
                    stream_id = self.stream_id,
                    error = %err,
                    "outgoing publisher creation failed"
                );
                Arc::new(Publishers::error::<Payload, StreamError>(err))
            }
        };
        *slot = Some(Arc::clone(&publisher));
        publisher
    }

    /// The producer's subscription, established on first use.
    ///
    /// The producer may signal synchronously while being subscribed; those signals must not
    /// re-enter this method.
    pub(crate) fn subscription<P, S>(
        &self,
        publisher: P,
        subscriber: S,
    ) -> Arc<OutgoingSubscription>
    where
        P: FnOnce() -> Arc<PayloadPublisher>,
        S: FnOnce() -> Arc<dyn Subscriber<Payload, StreamError>>,
    {
        if let Some(existing) = self.subscription.get() {
            return Arc::clone(existing);
        }

        let _guard = lock(&self.subscribe_lock);
        if let Some(existing) = self.subscription.get() {
            return Arc::clone(existing);
        }

        let inner = publisher().subscribe(subscriber());
        let subscription = Arc::new(OutgoingSubscription::new(inner));
        let subscription = Arc::clone(self.subscription.get_or_init(|| subscription));
        debug!(stream_id = self.stream_id, "outgoing subscription established");

        // Finished before the subscription existed: nothing may keep it alive.
        if self.is_finished() {
            subscription.cancel();
        }
        subscription
    }

    /// Run `send` unless the half is finished.
    pub(crate) fn emit<R>(&self, send: impl FnOnce() -> R) -> Option<R> {
        let _guard = lock(&self.emit_lock);
        if self.is_finished() {
            return None;
        }
        Some(send())
    }

    /// Finish the half, running `send` as the last emission.
    ///
    /// Returns `None` if the half was already finished, in which case `send` does not run.
    pub(crate) fn finish_with<R>(&self, send: impl FnOnce() -> R) -> Option<R> {
        let result = {
            let _guard = lock(&self.emit_lock);
            if self
                .finished
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return None;
            }
            send()
        };
        self.release();
        Some(result)
    }

    /// Finish the half without a final emission. Returns true for the transitioning call.
    pub(crate) fn finish(&self) -> bool {
        self.finish_with(|| ()).is_some()
    }

    fn release(&self) {
        if let Some(subscription) = self.subscription.get() {
            subscription.cancel();
        }
        self.done.cancel();
        debug!(stream_id = self.stream_id, "outgoing half finished");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use rsocket_reactive::{BoxError, EmptySubscription, Publisher};

    use super::*;

    struct Noop;

    impl Subscriber<Payload, StreamError> for Noop {
        fn on_next(&self, _item: Payload) -> Result<(), BoxError> {
            Ok(())
        }

        fn on_complete(&self) {}

        fn on_error(&self, _error: StreamError) {}
    }

    fn noop() -> Arc<dyn Subscriber<Payload, StreamError>> {
        Arc::new(Noop)
    }

    #[derive(Default)]
    struct Counting {
        subscribes: AtomicUsize,
    }

    impl Publisher<Payload, StreamError> for Counting {
        fn subscribe(
            &self,
            _subscriber: Arc<dyn Subscriber<Payload, StreamError>>,
        ) -> Arc<dyn Subscription> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            Arc::new(EmptySubscription)
        }
    }

    #[test]
    fn emit_stops_after_finish() {
        let outgoing = Outgoing::new(1);
        assert_eq!(outgoing.emit(|| 1), Some(1));
        assert!(outgoing.finish());
        assert_eq!(outgoing.emit(|| 2), None);
        assert!(outgoing.done().is_cancelled());
    }

    #[test]
    fn finish_with_runs_once() {
        let outgoing = Outgoing::new(1);
        let runs = AtomicUsize::new(0);
        for _ in 0..3 {
            outgoing.finish_with(|| runs.fetch_add(1, Ordering::SeqCst));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!outgoing.finish());
    }

    #[test]
    fn publisher_is_memoized() {
        let outgoing = Outgoing::new(1);
        let created = AtomicUsize::new(0);
        let make = || {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Counting::default()) as Arc<PayloadPublisher>)
        };
        let a = outgoing.publisher(make);
        let b = outgoing.publisher(make);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_created_after_finish_is_cancelled() {
        let outgoing = Outgoing::new(1);
        outgoing.finish();

        let publisher: Arc<PayloadPublisher> = Arc::new(Counting::default());
        let sub = outgoing.subscription(|| publisher, noop);
        assert!(sub.is_cancelled());
    }

    #[test]
    fn finish_cancels_existing_subscription() {
        let outgoing = Outgoing::new(1);
        let counting = Arc::new(Counting::default());
        let publisher: Arc<PayloadPublisher> = counting.clone();
        let sub = outgoing.subscription(|| publisher, noop);
        let again = outgoing.subscription(|| unreachable!(), noop);
        assert!(Arc::ptr_eq(&sub, &again));
        assert_eq!(counting.subscribes.load(Ordering::SeqCst), 1);
        assert!(!sub.is_cancelled());

        outgoing.finish();
        assert!(sub.is_cancelled());
    }
}
