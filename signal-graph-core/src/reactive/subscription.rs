//! Subscription Handles
//!
//! A [`Subscription`] represents one live attachment to a stream. Disposing
//! it runs the teardown logic registered by the producer, exactly once.
//!
//! # Disposal
//!
//! Subscriptions are disposed either explicitly with
//! [`Subscription::unsubscribe`] or implicitly when the handle is dropped.
//! Call [`Subscription::detach`] to keep a subscription running without
//! holding on to its handle.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Teardown = Box<dyn FnOnce() + Send>;

struct SubscriptionInner {
    /// Whether the subscription has been disposed.
    closed: AtomicBool,

    /// Cleanup actions, run in registration order on disposal.
    teardowns: Mutex<Vec<Teardown>>,
}

impl SubscriptionInner {
    fn dispose(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Take the teardowns out first so they run without the lock held;
        // a teardown may well dispose other subscriptions.
        let teardowns = std::mem::take(&mut *self.teardowns.lock());
        for teardown in teardowns {
            teardown();
        }
    }
}

/// Handle to a live stream subscription.
///
/// Dropping this handle disposes the subscription.
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
    dispose_on_drop: bool,
}

impl Subscription {
    /// Create a subscription that runs `teardown` when disposed.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let subscription = Self::empty();
        subscription.add(teardown);
        subscription
    }

    /// Create a subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                closed: AtomicBool::new(false),
                teardowns: Mutex::new(Vec::new()),
            }),
            dispose_on_drop: true,
        }
    }

    /// Register another teardown action.
    ///
    /// If the subscription is already disposed the action runs immediately.
    pub fn add<F>(&self, teardown: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut teardowns = self.inner.teardowns.lock();
            if !self.inner.closed.load(Ordering::SeqCst) {
                teardowns.push(Box::new(teardown));
                return;
            }
        }
        teardown();
    }

    /// Dispose `child` together with this subscription.
    ///
    /// The child is linked through its shared state rather than its handle,
    /// so a detached parent leaves its children running too.
    pub fn add_subscription(&self, mut child: Subscription) {
        child.dispose_on_drop = false;
        let inner = Arc::clone(&child.inner);
        self.add(move || inner.dispose());
    }

    /// Dispose the subscription. Calling this more than once is harmless.
    pub fn unsubscribe(&self) {
        self.inner.dispose();
    }

    /// Check if the subscription has been disposed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Let the subscription run for as long as its source produces values.
    pub fn detach(mut self) {
        self.dispose_on_drop = false;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.dispose_on_drop {
            self.inner.dispose();
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .field("teardowns", &self.inner.teardowns.lock().len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
