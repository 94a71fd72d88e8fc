//! Subject Implementation
//!
//! A Subject is the writable entry point into a stream network. It holds the
//! most recent value and a list of observers, and pushing a value hands it to
//! every observer in subscription order.
//!
//! # How Subjects Work
//!
//! 1. `push` stores the value as the latest one and notifies observers.
//!
//! 2. A new observer immediately receives the latest value, if there is one,
//!    and then every later push.
//!
//! 3. `error` and `complete` end the subject. Observers present at that
//!    point receive the terminal event; later observers receive the latest
//!    value followed by the same terminal event.
//!
//! # Reentrancy
//!
//! Only one call delivers at a time. A push or terminal event that arrives
//! while another is being delivered, from an observer or from another
//! thread, updates the latest value and is queued. The delivering call
//! drains the queue in order, so every observer sees the same sequence.
//!
//! # Thread Safety
//!
//! State sits behind a `parking_lot::Mutex`. The lock is released before any
//! observer runs.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::fanout::{drain, Fanout, FanoutState};
use super::stream::Stream;
use super::subscriber::Observer;
use super::subscription::Subscription;
use crate::error::StreamError;

/// Counter for generating unique subject IDs.
static SUBJECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique subject ID.
fn next_subject_id() -> u64 {
    SUBJECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// How a finished stream ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Terminal {
    Error(StreamError),
    Complete,
}

impl Terminal {
    pub(crate) fn deliver<T>(&self, observer: &Observer<T>) {
        match self {
            Terminal::Error(error) => observer.error(error.clone()),
            Terminal::Complete => observer.complete(),
        }
    }
}

struct SubjectState<T> {
    /// The most recently pushed value.
    latest: Option<T>,

    /// Set once the subject has errored or completed.
    terminal: Option<Terminal>,

    fanout: Fanout<T>,
}

impl<T> FanoutState for SubjectState<T> {
    type Value = T;

    fn fanout(&mut self) -> &mut Fanout<T> {
        &mut self.fanout
    }
}

/// A writable, multicast channel that replays its latest value.
///
/// # Example
///
/// ```rust
/// use signal_graph_core::reactive::Subject;
///
/// let subject = Subject::new();
/// subject.push(1);
///
/// // Late subscribers still see the latest value.
/// let _subscription = subject.stream().subscribe(|value| assert_eq!(value, 1));
/// ```
pub struct Subject<T> {
    /// Unique identifier for this subject.
    id: u64,

    state: Arc<Mutex<SubjectState<T>>>,
}

impl<T> Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty subject.
    pub fn new() -> Self {
        Self {
            id: next_subject_id(),
            state: Arc::new(Mutex::new(SubjectState {
                latest: None,
                terminal: None,
                fanout: Fanout::new(),
            })),
        }
    }

    /// Get the subject's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Push a new value to every observer.
    ///
    /// Pushing into a finished subject does nothing. A push made while
    /// another push is being delivered is queued behind it.
    pub fn push(&self, value: T) {
        let start = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                tracing::warn!(subject = self.id, "push into a finished subject ignored");
                return;
            }
            state.latest = Some(value.clone());
            state.fanout.push(value)
        };

        if start {
            tracing::trace!(subject = self.id, "push");
            drain(&*self.state);
        } else {
            tracing::trace!(subject = self.id, "push queued behind delivery");
        }
    }

    /// Fail the subject. Observers receive `error` and are released.
    pub fn error(&self, error: StreamError) {
        self.finish(Terminal::Error(error));
    }

    /// Complete the subject. Observers are notified and released.
    pub fn complete(&self) {
        self.finish(Terminal::Complete);
    }

    fn finish(&self, terminal: Terminal) {
        let start = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(terminal.clone());
            state.fanout.finish(terminal)
        };

        if start {
            drain(&*self.state);
        }
    }

    /// A stream of this subject's values, starting with the latest one.
    pub fn stream(&self) -> Stream<T> {
        let state = Arc::clone(&self.state);
        Stream::new(move |observer| {
            let (latest, terminal) = {
                let mut guard = state.lock();
                if guard.terminal.is_none() {
                    guard.fanout.register(observer.clone());
                }
                (guard.latest.clone(), guard.terminal.clone())
            };

            if let Some(value) = latest {
                observer.next(value);
            }
            if let Some(terminal) = terminal {
                terminal.deliver(&observer);
                return Subscription::empty();
            }

            let state = Arc::downgrade(&state);
            let id = observer.id();
            Subscription::new(move || {
                if let Some(state) = state.upgrade() {
                    state.lock().fanout.remove(id);
                }
            })
        })
    }

    /// The most recently pushed value.
    pub fn latest(&self) -> Option<T> {
        self.state.lock().latest.clone()
    }

    /// Number of observers currently attached.
    pub fn observer_count(&self) -> usize {
        self.state.lock().fanout.live_count()
    }

    /// Whether the subject has errored or completed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().terminal.is_some()
    }
}

impl<T> Default for Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Debug for Subject<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("id", &self.id)
            .field("latest", &self.latest())
            .field("observer_count", &self.observer_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
