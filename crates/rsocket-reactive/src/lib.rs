//! Reactive-streams capability set.
//!
//! The lifecycle core both consumes and implements these traits:
//! - a [`Publisher`] hands out a [`Subscription`] when subscribed
//! - a [`Subscriber`] receives items, completion or a terminal error
//! - a [`Subscription`] carries request-N credit and cancellation back upstream
//!
//! This is the lowest layer of the workspace. It carries no protocol knowledge.

pub mod publishers;
pub mod traits;

pub use publishers::{EmptySubscription, ErrorPublisher, IterPublisher, Publishers};
pub use traits::{BoxError, Publisher, Subscriber, Subscription};
