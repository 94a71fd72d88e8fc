//! Stream Implementation
//!
//! A [`Stream`] is a cold, push-based sequence of values. Subscribing runs
//! the stream's producer for that one observer; nothing happens until then.
//! Sharing one producer between many observers is what
//! [`Stream::share_replay`](super::Stream::share_replay) is for.
//!
//! Producers run synchronously on the subscriber's thread. A stream built
//! from a [`Subject`](super::Subject) pushes on whatever thread calls
//! `push`.

use std::fmt::Debug;
use std::sync::Arc;

use super::subscriber::{Event, Observer};
use super::subscription::Subscription;
use crate::error::StreamError;

type Producer<T> = dyn Fn(Observer<T>) -> Subscription + Send + Sync;

/// A cold push stream of `T` values.
///
/// Cloning a stream clones a handle to the same producer.
///
/// # Example
///
/// ```rust
/// use signal_graph_core::reactive::Stream;
///
/// let doubled = Stream::from_iter(vec![1, 2, 3]).map(|x| x * 2);
/// let _subscription = doubled.subscribe(|x| println!("{x}"));
/// ```
pub struct Stream<T> {
    producer: Arc<Producer<T>>,
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a stream from a producer.
    ///
    /// The producer runs once per subscription. It pushes events into the
    /// observer and returns the subscription that undoes its work.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(Observer<T>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
        }
    }

    /// A stream that emits `value` and completes.
    pub fn of(value: T) -> Self {
        Self::new(move |observer| {
            observer.next(value.clone());
            observer.complete();
            Subscription::empty()
        })
    }

    /// A stream that emits every item of `values` in order and completes.
    pub fn from_iter<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let values: Arc<[T]> = values.into_iter().collect();
        Self::new(move |observer| {
            for value in values.iter() {
                if observer.is_closed() {
                    break;
                }
                observer.next(value.clone());
            }
            observer.complete();
            Subscription::empty()
        })
    }

    /// A stream that completes without emitting.
    pub fn empty() -> Self {
        Self::new(|observer| {
            observer.complete();
            Subscription::empty()
        })
    }

    /// A stream that never emits and never completes.
    pub fn never() -> Self {
        Self::new(|_| Subscription::empty())
    }

    /// A stream that fails immediately with `error`.
    pub fn throw(error: StreamError) -> Self {
        Self::new(move |observer| {
            observer.error(error.clone());
            Subscription::empty()
        })
    }

    /// Subscribe with an observer.
    ///
    /// Disposing the returned subscription also closes the observer, so no
    /// event reaches it afterwards even if the producer keeps a copy.
    pub fn subscribe_observer(&self, observer: Observer<T>) -> Subscription {
        let subscription = (self.producer)(observer.clone());
        subscription.add(move || observer.close());
        subscription
    }

    /// Subscribe with a callback that receives every event.
    pub fn subscribe_events<F>(&self, on_event: F) -> Subscription
    where
        F: Fn(Event<T>) + Send + Sync + 'static,
    {
        self.subscribe_observer(Observer::new(on_event))
    }

    /// Subscribe to values only. Errors and completion are dropped.
    pub fn subscribe<F>(&self, on_next: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe_events(move |event| {
            if let Event::Next(value) = event {
                on_next(value);
            }
        })
    }
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
        }
    }
}

impl<T> Debug for Stream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("producer", &Arc::as_ptr(&self.producer))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
