//! Reactive Primitives
//!
//! This module implements the push-based streams that signal graphs are
//! wired from: subjects, cold streams with operators, and shared replaying
//! streams.
//!
//! # Concepts
//!
//! ## Subjects
//!
//! A Subject is a writable channel. Values pushed into it are delivered to
//! every observer, and the latest value is replayed to observers that arrive
//! later. Every primary signal of a graph is backed by one subject.
//!
//! ## Streams
//!
//! A Stream is a cold description of a value sequence. Nothing runs until a
//! subscriber arrives, and each subscriber gets its own run of the producer.
//! Operators such as `map` and `combine_latest` build new streams from
//! existing ones.
//!
//! ## Shared Streams
//!
//! `share_replay` turns a cold stream into one shared computation. The
//! upstream runs once no matter how many subscribers there are, and each new
//! subscriber gets the latest value replayed.
//!
//! # Implementation Notes
//!
//! Propagation is synchronous: pushing into a subject runs every downstream
//! operator and observer before `push` returns. Locks are never held while
//! observers run, so an observer may push into a subject again. Such a push
//! is queued and delivered once the current value has reached every
//! observer, which keeps all observers seeing the same order.

mod fanout;
mod operators;
mod shared;
mod stream;
mod subject;
mod subscriber;
mod subscription;

pub use stream::Stream;
pub use subject::Subject;
pub use subscriber::{Event, Observer, SubscriberId};
pub use subscription::Subscription;
