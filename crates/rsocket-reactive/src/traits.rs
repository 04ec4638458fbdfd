use std::sync::Arc;

/// Boxed error used at application boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Receiving side of a backpressured flow.
///
/// `E` is the terminal error type. Implementations must tolerate being called from any thread,
/// but a single publisher never calls one subscriber concurrently.
pub trait Subscriber<T, E>: Send + Sync {
    /// Receive one item.
    ///
    /// Returning `Err` tells the publisher the item could not be consumed; the publisher stops
    /// delivering and tears the flow down.
    fn on_next(&self, item: T) -> Result<(), BoxError>;

    /// The flow finished normally. No further calls follow.
    fn on_complete(&self);

    /// The flow finished with an error. No further calls follow.
    fn on_error(&self, error: E);
}

/// Handle returned from [`Publisher::subscribe`].
pub trait Subscription: Send + Sync {
    /// Grant permission to emit up to `n` further items.
    fn request(&self, n: u32);

    /// Stop the flow. Must be idempotent.
    fn cancel(&self);
}

/// Producing side of a backpressured flow.
pub trait Publisher<T, E>: Send + Sync {
    /// Attach a subscriber and return the subscription governing it.
    ///
    /// A publisher may signal the subscriber synchronously from inside this call.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T, E>>) -> Arc<dyn Subscription>;
}
