//! Per-channel classifiers turning raw samples into keys.
//!
//! Every classifier owns exactly one input and advances only when [KeyEmitter::tick] (or its own
//! `poll`) is called. There are no timers involved: a classifier sees exactly what the caller's
//! poll cadence lets it see, so contact bounce faster than the poll rate shows up as extra edges.
//! Pair the input with external filtering if that matters.

mod button;
mod light;
mod pot;
mod switch;

use std::fmt::Debug;
use crate::{InputResult, Key};
pub use button::*;
pub use light::*;
pub use pot::*;
pub use switch::*;

/// The result of a single poll: the classified value and whether it differs from the previous poll.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition<T> {
    pub value: T,
    /// `true` only on the poll where the value actually changed.
    pub changed: bool,
}

impl<T> Transition<T> {
    pub fn new(value: T, changed: bool) -> Self {
        Transition { value, changed }
    }

    pub fn steady(value: T) -> Self {
        Transition { value, changed: false }
    }
}

/// The common interface the key dispatcher uses to drive any classifier.
pub trait KeyEmitter: Debug {
    /// Samples the channel once and updates the classifier state.
    ///
    /// # Errors
    /// - `InputError::ChannelUnavailable` or any other read error of the underlying input.
    ///   The classifier state is left untouched in that case.
    fn tick(&mut self) -> InputResult<()>;

    /// Gets the key for the last classification, or `None` if nothing has been classified yet.
    fn key(&self) -> Option<Key>;

    /// Whether the last tick produced a transition.
    fn changed(&self) -> bool;

    /// Gets the key to hand to the dispatcher for the last tick, if any.
    fn emitted(&self) -> Option<Key> {
        if self.changed() { self.key() } else { None }
    }
}
