//! Stream Operators
//!
//! Combinators that derivation functions use to build one stream out of
//! others. Every operator returns a new cold stream; subscribing to it
//! subscribes to its sources, and disposing it disposes them.
//!
//! Errors from any source are forwarded downstream unchanged and end the
//! resulting stream.

use std::sync::Arc;

use parking_lot::Mutex;

use super::stream::Stream;
use super::subscriber::{Event, Observer};
use super::subscription::Subscription;
use crate::error::StreamError;

/// Hand terminal events straight to `observer` and return values to the caller.
fn pass_through<T, U>(observer: &Observer<U>, event: Event<T>) -> Option<T> {
    match event {
        Event::Next(value) => Some(value),
        Event::Error(error) => {
            observer.error(error);
            None
        }
        Event::Complete => {
            observer.complete();
            None
        }
    }
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Transform every value with `f`.
    pub fn map<U, F>(&self, f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Stream::new(move |observer: Observer<U>| {
            let f = Arc::clone(&f);
            source.subscribe_events(move |event| {
                if let Some(value) = pass_through(&observer, event) {
                    observer.next(f(value));
                }
            })
        })
    }

    /// Transform every value with a fallible `f`. The first `Err` ends the
    /// stream with that error.
    pub fn try_map<U, F>(&self, f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Result<U, StreamError> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Stream::new(move |observer: Observer<U>| {
            let f = Arc::clone(&f);
            source.subscribe_events(move |event| {
                if let Some(value) = pass_through(&observer, event) {
                    match f(value) {
                        Ok(mapped) => observer.next(mapped),
                        Err(error) => observer.error(error),
                    }
                }
            })
        })
    }

    /// Keep only values for which `predicate` holds.
    pub fn filter<F>(&self, predicate: F) -> Stream<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let source = self.clone();
        let predicate = Arc::new(predicate);
        Stream::new(move |observer: Observer<T>| {
            let predicate = Arc::clone(&predicate);
            source.subscribe_events(move |event| {
                if let Some(value) = pass_through(&observer, event) {
                    if predicate(&value) {
                        observer.next(value);
                    }
                }
            })
        })
    }

    /// Emit `value` first, then everything from this stream.
    pub fn start_with(&self, value: T) -> Stream<T> {
        let source = self.clone();
        Stream::new(move |observer: Observer<T>| {
            observer.next(value.clone());
            source.subscribe_observer(observer)
        })
    }

    /// Drop values equal to the one emitted just before.
    pub fn distinct_until_changed(&self) -> Stream<T>
    where
        T: PartialEq,
    {
        let source = self.clone();
        Stream::new(move |observer: Observer<T>| {
            let previous: Mutex<Option<T>> = Mutex::new(None);
            source.subscribe_events(move |event| {
                if let Some(value) = pass_through(&observer, event) {
                    let changed = {
                        let mut previous = previous.lock();
                        if previous.as_ref() == Some(&value) {
                            false
                        } else {
                            *previous = Some(value.clone());
                            true
                        }
                    };
                    if changed {
                        observer.next(value);
                    }
                }
            })
        })
    }

    /// Pair the latest values of this stream and `other`.
    ///
    /// Emits once both sides have produced a value, then on every value from
    /// either side. Completes when both sides have completed, or as soon as
    /// one side completes without ever producing a value.
    pub fn combine_latest<U>(&self, other: &Stream<U>) -> Stream<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        struct Pair<T, U> {
            left: Option<T>,
            right: Option<U>,
            remaining: usize,
        }

        let left = self.clone();
        let right = other.clone();
        Stream::new(move |observer: Observer<(T, U)>| {
            let state = Arc::new(Mutex::new(Pair {
                left: None,
                right: None,
                remaining: 2,
            }));
            let subscription = Subscription::empty();

            let (pair, out) = (Arc::clone(&state), observer.clone());
            subscription.add_subscription(left.subscribe_events(move |event| match event {
                Event::Next(value) => {
                    let combined = {
                        let mut pair = pair.lock();
                        pair.left = Some(value);
                        pair.left.clone().zip(pair.right.clone())
                    };
                    if let Some(combined) = combined {
                        out.next(combined);
                    }
                }
                Event::Error(error) => out.error(error),
                Event::Complete => {
                    let done = {
                        let mut pair = pair.lock();
                        pair.remaining -= 1;
                        pair.remaining == 0 || pair.left.is_none()
                    };
                    if done {
                        out.complete();
                    }
                }
            }));

            let (pair, out) = (state, observer);
            subscription.add_subscription(right.subscribe_events(move |event| match event {
                Event::Next(value) => {
                    let combined = {
                        let mut pair = pair.lock();
                        pair.right = Some(value);
                        pair.left.clone().zip(pair.right.clone())
                    };
                    if let Some(combined) = combined {
                        out.next(combined);
                    }
                }
                Event::Error(error) => out.error(error),
                Event::Complete => {
                    let done = {
                        let mut pair = pair.lock();
                        pair.remaining -= 1;
                        pair.remaining == 0 || pair.right.is_none()
                    };
                    if done {
                        out.complete();
                    }
                }
            }));

            subscription
        })
    }

    /// Combine the latest values of every stream in `streams`, in order.
    ///
    /// An empty list completes immediately.
    pub fn combine_latest_all(streams: Vec<Stream<T>>) -> Stream<Vec<T>> {
        struct Latest<T> {
            values: Vec<Option<T>>,
            remaining: usize,
        }

        let streams: Arc<[Stream<T>]> = streams.into();
        Stream::new(move |observer: Observer<Vec<T>>| {
            if streams.is_empty() {
                observer.complete();
                return Subscription::empty();
            }

            let state = Arc::new(Mutex::new(Latest {
                values: vec![None; streams.len()],
                remaining: streams.len(),
            }));
            let subscription = Subscription::empty();

            for (index, stream) in streams.iter().enumerate() {
                let (latest, out) = (Arc::clone(&state), observer.clone());
                subscription.add_subscription(stream.subscribe_events(move |event| match event {
                    Event::Next(value) => {
                        let combined = {
                            let mut latest = latest.lock();
                            latest.values[index] = Some(value);
                            latest.values.iter().cloned().collect::<Option<Vec<T>>>()
                        };
                        if let Some(combined) = combined {
                            out.next(combined);
                        }
                    }
                    Event::Error(error) => out.error(error),
                    Event::Complete => {
                        let done = {
                            let mut latest = latest.lock();
                            latest.remaining -= 1;
                            latest.remaining == 0 || latest.values[index].is_none()
                        };
                        if done {
                            out.complete();
                        }
                    }
                }));
            }

            subscription
        })
    }

    /// Interleave values from this stream and `other` as they arrive.
    pub fn merge(&self, other: &Stream<T>) -> Stream<T> {
        let sources = [self.clone(), other.clone()];
        Stream::new(move |observer: Observer<T>| {
            let remaining = Arc::new(Mutex::new(sources.len()));
            let subscription = Subscription::empty();

            for source in &sources {
                let (remaining, out) = (Arc::clone(&remaining), observer.clone());
                subscription.add_subscription(source.subscribe_events(move |event| match event {
                    Event::Next(value) => out.next(value),
                    Event::Error(error) => out.error(error),
                    Event::Complete => {
                        let done = {
                            let mut remaining = remaining.lock();
                            *remaining -= 1;
                            *remaining == 0
                        };
                        if done {
                            out.complete();
                        }
                    }
                }));
            }

            subscription
        })
    }

    /// Map each value to a stream and follow only the most recent one.
    ///
    /// A new outer value disposes the previous inner stream. The result
    /// completes once the outer stream and the current inner stream have
    /// both completed.
    pub fn switch_map<U, F>(&self, f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Stream<U> + Send + Sync + 'static,
    {
        struct Switch {
            inner: Option<Subscription>,
            generation: u64,
            inner_active: bool,
            outer_done: bool,
        }

        let source = self.clone();
        let f = Arc::new(f);
        Stream::new(move |observer: Observer<U>| {
            let state = Arc::new(Mutex::new(Switch {
                inner: None,
                generation: 0,
                inner_active: false,
                outer_done: false,
            }));

            let (switch, out, f) = (Arc::clone(&state), observer.clone(), Arc::clone(&f));
            let outer = source.subscribe_events(move |event| match event {
                Event::Next(value) => {
                    let (generation, previous) = {
                        let mut switch = switch.lock();
                        switch.generation += 1;
                        switch.inner_active = true;
                        (switch.generation, switch.inner.take())
                    };
                    drop(previous);

                    let weak = Arc::downgrade(&switch);
                    let inner_out = out.clone();
                    let inner = f(value).subscribe_events(move |event| match event {
                        Event::Next(value) => inner_out.next(value),
                        Event::Error(error) => inner_out.error(error),
                        Event::Complete => {
                            let done = weak.upgrade().is_some_and(|switch| {
                                let mut switch = switch.lock();
                                if switch.generation != generation {
                                    return false;
                                }
                                switch.inner_active = false;
                                switch.outer_done
                            });
                            if done {
                                inner_out.complete();
                            }
                        }
                    });

                    let stale = {
                        let mut switch = switch.lock();
                        if switch.generation == generation {
                            switch.inner.replace(inner)
                        } else {
                            Some(inner)
                        }
                    };
                    drop(stale);
                }
                Event::Error(error) => out.error(error),
                Event::Complete => {
                    let done = {
                        let mut switch = switch.lock();
                        switch.outer_done = true;
                        !switch.inner_active
                    };
                    if done {
                        out.complete();
                    }
                }
            });

            let subscription = Subscription::empty();
            subscription.add_subscription(outer);
            subscription.add(move || {
                let inner = state.lock().inner.take();
                drop(inner);
            });
            subscription
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
