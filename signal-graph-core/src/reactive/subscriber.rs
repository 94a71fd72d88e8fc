//! Subscriber types for the reactive system.
//!
//! An [`Observer`] is the receiving end of a stream: anything that wants to
//! be told about values, errors and completion. Every observer carries a
//! [`SubscriberId`] so that the producers holding it can remove it again.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::StreamError;

/// Unique identifier for a subscriber.
///
/// Each observer gets a unique ID when created. Producers key their observer
/// lists on it so a subscription can remove exactly its own entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A notification delivered to an observer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    /// A new value.
    Next(T),

    /// The stream failed. No further events follow.
    Error(StreamError),

    /// The stream finished. No further events follow.
    Complete,
}

impl<T> Event<T> {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Next(_))
    }
}

/// The receiving end of a stream.
///
/// Cloning an observer shares its callback and its closed flag, so a
/// producer and the subscription that owns the observer agree on whether it
/// is still live. Once a terminal event has been delivered, or the observer
/// has been closed, nothing further reaches the callback.
pub struct Observer<T> {
    id: SubscriberId,

    /// The callback to invoke for each event.
    sink: Arc<dyn Fn(Event<T>) + Send + Sync>,

    closed: Arc<AtomicBool>,
}

impl<T> Observer<T> {
    /// Create an observer from an event callback.
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(Event<T>) + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            sink: Arc::new(sink),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the observer's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Deliver a value.
    pub fn next(&self, value: T) {
        if !self.closed.load(Ordering::SeqCst) {
            (self.sink)(Event::Next(value));
        }
    }

    /// Deliver an error and close the observer.
    pub fn error(&self, error: StreamError) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            (self.sink)(Event::Error(error));
        }
    }

    /// Deliver completion and close the observer.
    pub fn complete(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            (self.sink)(Event::Complete);
        }
    }

    /// Deliver any event.
    pub fn send(&self, event: Event<T>) {
        match event {
            Event::Next(value) => self.next(value),
            Event::Error(error) => self.error(error),
            Event::Complete => self.complete(),
        }
    }

    /// Stop delivery without sending a terminal event.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether this observer still accepts events.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sink: Arc::clone(&self.sink),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<T> Debug for Observer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
