//! Ordered Delivery to Many Observers
//!
//! Both subjects and shared streams hand every event to a list of observers.
//! [`Fanout`] is the part they have in common: the observer list and a queue
//! of events not yet delivered.
//!
//! Only one call drains the queue at a time. An event raised while another
//! is being delivered, by an observer reacting to it or by another thread,
//! is queued and delivered by the call already draining. Every observer
//! therefore sees events in the order they were raised.
//!
//! Each observer remembers the sequence number of the latest value when it
//! joined. A newcomer has already been handed that value as its replay, so
//! queued values up to that number skip it.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::subject::Terminal;
use super::subscriber::{Observer, SubscriberId};

/// State that owns a [`Fanout`] behind a lock.
pub(crate) trait FanoutState {
    type Value;

    fn fanout(&mut self) -> &mut Fanout<Self::Value>;
}

enum Emission<T> {
    Value { sequence: u64, value: T },
    Finish(Terminal),
}

struct Registered<T> {
    since: u64,
    observer: Observer<T>,
}

pub(crate) struct Fanout<T> {
    /// Number of values accepted so far.
    sequence: u64,

    /// Observers in subscription order.
    observers: Vec<Registered<T>>,

    /// Whether some call is draining `pending`.
    emitting: bool,

    pending: VecDeque<Emission<T>>,
}

impl<T> Fanout<T> {
    pub(crate) fn new() -> Self {
        Self {
            sequence: 0,
            observers: Vec::new(),
            emitting: false,
            pending: VecDeque::new(),
        }
    }

    /// Add an observer that has already received everything up to now.
    pub(crate) fn register(&mut self, observer: Observer<T>) {
        self.observers.push(Registered {
            since: self.sequence,
            observer,
        });
    }

    pub(crate) fn remove(&mut self, id: SubscriberId) {
        self.observers.retain(|entry| entry.observer.id() != id);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Observers that still accept events.
    pub(crate) fn live_count(&self) -> usize {
        self.observers
            .iter()
            .filter(|entry| !entry.observer.is_closed())
            .count()
    }

    /// Queue a value. Returns `true` if the caller must [`drain`].
    #[must_use]
    pub(crate) fn push(&mut self, value: T) -> bool {
        self.sequence += 1;
        let sequence = self.sequence;
        self.pending.push_back(Emission::Value { sequence, value });
        self.start()
    }

    /// Queue a terminal event. Observers are released when it is delivered.
    #[must_use]
    pub(crate) fn finish(&mut self, terminal: Terminal) -> bool {
        self.pending.push_back(Emission::Finish(terminal));
        self.start()
    }

    fn start(&mut self) -> bool {
        if self.emitting {
            false
        } else {
            self.emitting = true;
            true
        }
    }

    /// The next queued event and who should receive it. Clears `emitting`
    /// when the queue is empty.
    fn next_emission(&mut self) -> Option<(Emission<T>, Vec<Observer<T>>)> {
        let Some(emission) = self.pending.pop_front() else {
            self.emitting = false;
            return None;
        };
        let observers = match &emission {
            Emission::Value { sequence, .. } => {
                self.observers.retain(|entry| !entry.observer.is_closed());
                self.observers
                    .iter()
                    .filter(|entry| entry.since < *sequence)
                    .map(|entry| entry.observer.clone())
                    .collect()
            }
            Emission::Finish(_) => std::mem::take(&mut self.observers)
                .into_iter()
                .map(|entry| entry.observer)
                .collect(),
        };
        Some((emission, observers))
    }
}

/// Resets the queue if an observer panics mid-delivery, so later events are
/// not stuck behind a drain that will never finish.
struct DrainGuard<'a, S: FanoutState> {
    state: &'a Mutex<S>,
}

impl<S: FanoutState> Drop for DrainGuard<'_, S> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut state = self.state.lock();
            let fanout = state.fanout();
            fanout.emitting = false;
            fanout.pending.clear();
        }
    }
}

/// Deliver queued events until none are left. Call only after `push` or
/// `finish` returned `true`, and without holding the lock.
pub(crate) fn drain<S>(state: &Mutex<S>)
where
    S: FanoutState,
    S::Value: Clone,
{
    let _guard = DrainGuard { state };
    loop {
        let Some((emission, observers)) = state.lock().fanout().next_emission() else {
            return;
        };
        match emission {
            Emission::Value { sequence, value } => {
                tracing::trace!(sequence, observers = observers.len(), "deliver");
                for observer in &observers {
                    observer.next(value.clone());
                }
            }
            Emission::Finish(terminal) => {
                for observer in &observers {
                    terminal.deliver(observer);
                }
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Event;
    use std::sync::Arc;

    struct Harness {
        fanout: Fanout<i32>,
    }

    impl FanoutState for Harness {
        type Value = i32;

        fn fanout(&mut self) -> &mut Fanout<i32> {
            &mut self.fanout
        }
    }

    fn harness() -> Arc<Mutex<Harness>> {
        Arc::new(Mutex::new(Harness {
            fanout: Fanout::new(),
        }))
    }

    fn push(state: &Mutex<Harness>, value: i32) {
        if state.lock().fanout.push(value) {
            drain(state);
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<(char, Event<i32>)>>>, tag: char) -> Observer<i32> {
        let log = log.clone();
        Observer::new(move |event| log.lock().push((tag, event)))
    }

    #[test]
    fn events_raised_while_draining_are_queued() {
        let state = harness();
        let log = Arc::new(Mutex::new(Vec::new()));

        let reentrant = state.clone();
        let first_log = log.clone();
        let first = Observer::new(move |event: Event<i32>| {
            first_log.lock().push(('a', event.clone()));
            if event == Event::Next(1) {
                push(&reentrant, 2);
            }
        });
        state.lock().fanout.register(first);
        state.lock().fanout.register(recorder(&log, 'b'));

        push(&state, 1);

        assert_eq!(
            *log.lock(),
            vec![
                ('a', Event::Next(1)),
                ('b', Event::Next(1)),
                ('a', Event::Next(2)),
                ('b', Event::Next(2)),
            ]
        );
        assert!(!state.lock().fanout.emitting);
    }

    #[test]
    fn observers_joining_mid_drain_skip_older_values() {
        let state = harness();
        let log = Arc::new(Mutex::new(Vec::new()));

        let reentrant = state.clone();
        let late = recorder(&log, 'c');
        let first = Observer::new(move |event: Event<i32>| {
            if event == Event::Next(1) {
                push(&reentrant, 2);
                reentrant.lock().fanout.register(late.clone());
                push(&reentrant, 3);
            }
        });
        state.lock().fanout.register(first);

        push(&state, 1);

        assert_eq!(*log.lock(), vec![('c', Event::Next(3))]);
    }

    #[test]
    fn finish_releases_observers_after_pending_values() {
        let state = harness();
        let log = Arc::new(Mutex::new(Vec::new()));

        let reentrant = state.clone();
        let first = Observer::new(move |event: Event<i32>| {
            if event == Event::Next(1) {
                let start = reentrant.lock().fanout.finish(Terminal::Complete);
                assert!(!start);
            }
        });
        state.lock().fanout.register(first);
        state.lock().fanout.register(recorder(&log, 'b'));

        push(&state, 1);

        assert_eq!(
            *log.lock(),
            vec![('b', Event::Next(1)), ('b', Event::Complete)]
        );
        assert!(state.lock().fanout.is_empty());
    }
}
