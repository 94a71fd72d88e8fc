//! Shared Streams
//!
//! A shared stream runs one upstream subscription on behalf of any number of
//! subscribers and replays the latest value to each newcomer.
//!
//! # How Sharing Works
//!
//! 1. The first subscriber connects the upstream. Values it produces while
//!    connecting go straight to that subscriber.
//!
//! 2. Later subscribers receive the cached latest value, then live values.
//!
//! 3. When the last subscriber leaves, the upstream is disconnected and the
//!    cache is cleared. The next subscriber reconnects and sees whatever the
//!    upstream replays at that point, never values from before the gap.
//!
//! 4. An optional seed stands in for the latest value until the upstream has
//!    produced anything at all. Once a real value has been seen the seed is
//!    never emitted again, across reconnects included.
//!
//! 5. An upstream error or completion is sticky: it reaches every current
//!    subscriber, and later subscribers get the latest value followed by the
//!    same terminal event.
//!
//! 6. An upstream value produced while another is still being handed out,
//!    because a subscriber pushed into some input, waits until the current
//!    one has reached every subscriber.

use std::sync::Arc;

use parking_lot::Mutex;

use super::fanout::{drain, Fanout, FanoutState};
use super::stream::Stream;
use super::subject::Terminal;
use super::subscriber::{Event, Observer, SubscriberId};
use super::subscription::Subscription;

struct SharedState<T> {
    /// The most recent upstream value while connected.
    latest: Option<T>,

    /// Emitted in place of `latest` until the upstream produces a value.
    seed: Option<T>,

    /// Whether the upstream has ever produced a value.
    seen_value: bool,

    terminal: Option<Terminal>,

    fanout: Fanout<T>,

    /// Live upstream subscription. `None` while disconnected.
    upstream: Option<Subscription>,

    /// Set while the first subscriber is connecting the upstream.
    connecting: bool,
}

impl<T> FanoutState for SharedState<T> {
    type Value = T;

    fn fanout(&mut self) -> &mut Fanout<T> {
        &mut self.fanout
    }
}

/// What a new subscriber should receive, decided under the lock.
enum Attach<T> {
    Finished(Option<T>, Terminal),
    Connect,
    Replay(Option<T>),
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Share one upstream subscription and replay the latest value.
    pub fn share_replay(&self) -> Stream<T> {
        self.share_replay_seeded(None)
    }

    /// Like [`share_replay`](Self::share_replay), with `seed` replayed until
    /// the upstream produces its first value.
    pub fn share_replay_seeded(&self, seed: Option<T>) -> Stream<T> {
        let source = self.clone();
        let state = Arc::new(Mutex::new(SharedState {
            latest: None,
            seed,
            seen_value: false,
            terminal: None,
            fanout: Fanout::new(),
            upstream: None,
            connecting: false,
        }));

        Stream::new(move |observer| attach(&source, &state, observer))
    }
}

fn attach<T>(
    source: &Stream<T>,
    state: &Arc<Mutex<SharedState<T>>>,
    observer: Observer<T>,
) -> Subscription
where
    T: Clone + Send + Sync + 'static,
{
    let plan = {
        let mut shared = state.lock();
        if let Some(terminal) = shared.terminal.clone() {
            Attach::Finished(shared.latest.clone(), terminal)
        } else {
            shared.fanout.register(observer.clone());
            if shared.upstream.is_none() && !shared.connecting {
                shared.connecting = true;
                Attach::Connect
            } else {
                Attach::Replay(replay_value(&shared))
            }
        }
    };

    match plan {
        Attach::Finished(latest, terminal) => {
            if let Some(value) = latest {
                observer.next(value);
            }
            terminal.deliver(&observer);
            return Subscription::empty();
        }
        Attach::Connect => {
            if let Some(seed) = connect(source, state) {
                observer.next(seed);
            }
        }
        Attach::Replay(value) => {
            if let Some(value) = value {
                observer.next(value);
            }
        }
    }

    let state = Arc::clone(state);
    let id = observer.id();
    Subscription::new(move || detach_observer(&state, id))
}

fn replay_value<T: Clone>(shared: &SharedState<T>) -> Option<T> {
    match &shared.latest {
        Some(value) => Some(value.clone()),
        None if !shared.seen_value => shared.seed.clone(),
        None => None,
    }
}

/// Connect the upstream. Returns the seed if the first subscriber should
/// receive it.
fn connect<T>(source: &Stream<T>, state: &Arc<Mutex<SharedState<T>>>) -> Option<T>
where
    T: Clone + Send + Sync + 'static,
{
    tracing::trace!("shared stream connecting upstream");

    let upstream_state = Arc::clone(state);
    let upstream = source.subscribe_events(move |event| on_upstream(&upstream_state, event));

    let (seed, stale) = {
        let mut shared = state.lock();
        shared.connecting = false;
        if shared.terminal.is_some() || shared.fanout.is_empty() {
            (None, Some(upstream))
        } else {
            shared.upstream = Some(upstream);
            let seed = if shared.seen_value {
                None
            } else {
                shared.seed.clone()
            };
            (seed, None)
        }
    };
    drop(stale);
    seed
}

fn on_upstream<T>(state: &Arc<Mutex<SharedState<T>>>, event: Event<T>)
where
    T: Clone + Send + Sync + 'static,
{
    match event {
        Event::Next(value) => {
            let start = {
                let mut shared = state.lock();
                shared.latest = Some(value.clone());
                shared.seen_value = true;
                shared.fanout.push(value)
            };
            if start {
                drain(&**state);
            }
        }
        Event::Error(error) => finish(state, Terminal::Error(error)),
        Event::Complete => finish(state, Terminal::Complete),
    }
}

fn finish<T>(state: &Arc<Mutex<SharedState<T>>>, terminal: Terminal)
where
    T: Clone + Send + Sync + 'static,
{
    let (start, upstream) = {
        let mut shared = state.lock();
        if shared.terminal.is_some() {
            return;
        }
        shared.terminal = Some(terminal.clone());
        let upstream = shared.upstream.take();
        (shared.fanout.finish(terminal), upstream)
    };
    drop(upstream);

    if start {
        drain(&**state);
    }
}

fn detach_observer<T>(state: &Arc<Mutex<SharedState<T>>>, id: SubscriberId) {
    let upstream = {
        let mut shared = state.lock();
        shared.fanout.remove(id);
        if shared.fanout.is_empty() && shared.terminal.is_none() {
            shared.latest = None;
            shared.upstream.take()
        } else {
            None
        }
    };

    if upstream.is_some() {
        tracing::trace!("shared stream disconnecting upstream");
    }
    drop(upstream);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
