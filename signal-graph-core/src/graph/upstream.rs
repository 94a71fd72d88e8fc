//! Resolved Upstreams
//!
//! When a derived signal is built, each populated dependency slot is
//! resolved to either an already built signal or an external dependency.
//! The derivation function receives them as [`Upstreams`], in slot order
//! with empty slots removed.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::definition::{Dependency, MAX_DEPENDENCY_SLOTS};
use crate::error::UpstreamError;
use crate::reactive::Stream;

/// One resolved dependency slot, borrowed from the graph under construction.
pub enum Upstream<'a, V> {
    /// A primary or derived signal of the same graph.
    Signal(&'a Stream<V>),

    /// An external dependency.
    Dependency(&'a Dependency<V>),
}

impl<V> Upstream<'_, V> {
    /// Short description of what this slot holds, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Upstream::Signal(_) => "a signal",
            Upstream::Dependency(dependency) => dependency.kind(),
        }
    }
}

impl<V> Clone for Upstream<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Upstream<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Upstream<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Signal(stream) => f.debug_tuple("Signal").field(stream).finish(),
            Upstream::Dependency(dependency) => {
                f.debug_tuple("Dependency").field(dependency).finish()
            }
        }
    }
}

/// The upstreams handed to a derivation function.
///
/// The typed accessors fail with an [`UpstreamError`] instead of panicking,
/// so a derivation can propagate a mismatch with `?`.
pub struct Upstreams<'a, V> {
    slots: SmallVec<[Upstream<'a, V>; MAX_DEPENDENCY_SLOTS]>,
}

impl<'a, V> Upstreams<'a, V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The upstream in `slot`, counting populated slots only.
    pub fn get(&self, slot: usize) -> Option<Upstream<'a, V>> {
        self.slots.get(slot).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Upstream<'a, V>> + '_ {
        self.slots.iter().copied()
    }

    fn slot(&self, slot: usize) -> Result<Upstream<'a, V>, UpstreamError> {
        self.get(slot).ok_or(UpstreamError::MissingSlot {
            slot,
            len: self.len(),
        })
    }

    /// The upstream in `slot` as a stream.
    ///
    /// Signals and stream dependencies are returned as they are. A value
    /// dependency becomes a stream that emits the value once and completes.
    pub fn stream(&self, slot: usize) -> Result<Stream<V>, UpstreamError> {
        match self.slot(slot)? {
            Upstream::Signal(stream) | Upstream::Dependency(Dependency::Stream(stream)) => {
                Ok(stream.clone())
            }
            Upstream::Dependency(Dependency::Value(value)) => Ok(Stream::of(value.clone())),
            other => Err(UpstreamError::KindMismatch {
                slot,
                expected: "a stream",
                found: other.kind(),
            }),
        }
    }

    /// Every upstream as a stream, in slot order.
    pub fn streams(&self) -> Result<Vec<Stream<V>>, UpstreamError> {
        (0..self.len()).map(|slot| self.stream(slot)).collect()
    }

    /// The constant held by a value dependency.
    pub fn value(&self, slot: usize) -> Result<&'a V, UpstreamError> {
        match self.slot(slot)? {
            Upstream::Dependency(Dependency::Value(value)) => Ok(value),
            other => Err(UpstreamError::KindMismatch {
                slot,
                expected: "a value dependency",
                found: other.kind(),
            }),
        }
    }

    /// The service held by a service dependency, downcast to `S`.
    pub fn service<S: Any + Send + Sync>(&self, slot: usize) -> Result<Arc<S>, UpstreamError> {
        match self.slot(slot)? {
            Upstream::Dependency(Dependency::Service(service)) => Arc::clone(service)
                .downcast::<S>()
                .map_err(|_| UpstreamError::KindMismatch {
                    slot,
                    expected: std::any::type_name::<S>(),
                    found: "a service of another type",
                }),
            other => Err(UpstreamError::KindMismatch {
                slot,
                expected: "a service dependency",
                found: other.kind(),
            }),
        }
    }
}

impl<'a, V> FromIterator<Upstream<'a, V>> for Upstreams<'a, V> {
    fn from_iter<I: IntoIterator<Item = Upstream<'a, V>>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Upstreams<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Subject;
    use parking_lot::Mutex;

    struct Client {
        base_url: &'static str,
    }

    #[test]
    fn streams_resolve_from_every_kind() {
        let subject = Subject::new();
        subject.push(1);
        let signal = subject.stream();
        let constant = Dependency::value(2);
        let external = Dependency::stream(Stream::of(3));

        let upstreams: Upstreams<'_, i32> = [
            Upstream::Signal(&signal),
            Upstream::Dependency(&constant),
            Upstream::Dependency(&external),
        ]
        .into_iter()
        .collect();

        let seen = Arc::new(Mutex::new(Vec::new()));
        for stream in upstreams.streams().unwrap() {
            let seen = seen.clone();
            let _sub = stream.subscribe(move |value| seen.lock().push(value));
        }
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert_eq!(upstreams.value(1), Ok(&2));
    }

    #[test]
    fn missing_slot_is_reported() {
        let upstreams: Upstreams<'_, i32> = std::iter::empty().collect();
        assert_eq!(
            upstreams.stream(0).unwrap_err(),
            UpstreamError::MissingSlot { slot: 0, len: 0 }
        );
    }

    #[test]
    fn services_downcast_to_their_type() {
        let service = Dependency::<i32>::service(Client {
            base_url: "https://example.test",
        });
        let upstreams: Upstreams<'_, i32> = std::iter::once(Upstream::Dependency(&service)).collect();

        let client = upstreams.service::<Client>(0).unwrap();
        assert_eq!(client.base_url, "https://example.test");

        assert!(matches!(
            upstreams.service::<String>(0),
            Err(UpstreamError::KindMismatch { slot: 0, .. })
        ));
        assert_eq!(
            upstreams.stream(0).unwrap_err(),
            UpstreamError::KindMismatch {
                slot: 0,
                expected: "a stream",
                found: "a service dependency",
            }
        );
    }

    #[test]
    fn value_rejects_signals() {
        let signal = Stream::of(1);
        let upstreams: Upstreams<'_, i32> = std::iter::once(Upstream::Signal(&signal)).collect();
        assert_eq!(
            upstreams.value(0),
            Err(UpstreamError::KindMismatch {
                slot: 0,
                expected: "a value dependency",
                found: "a signal",
            })
        );
    }
}
