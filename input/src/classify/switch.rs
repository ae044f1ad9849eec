use std::fmt::{Debug, Formatter};
use log::trace;
use crate::classify::{KeyEmitter, Transition};
use crate::{DigitalInput, InputResult, Key};

/// A two-position switch with one key per position.
///
/// The first poll only establishes the baseline position, it never counts as a change.
pub struct ToggleSwitch<S> {
    input: S,
    key_off: Key,
    key_on: Key,
    value: Option<bool>,
    changed: bool,
}

impl<S: DigitalInput> ToggleSwitch<S> {
    /// Creates a switch emitting `key_off` while the input reads `false` and `key_on` while it reads `true`.
    pub fn new(input: S, key_off: Key, key_on: Key) -> Self {
        ToggleSwitch {
            input,
            key_off,
            key_on,
            value: None,
            changed: false,
        }
    }

    /// Reads the input once. Returns the position and whether it flipped since the last poll.
    pub fn poll(&mut self) -> InputResult<Transition<bool>> {
        let value = self.input.read()?;

        self.changed = matches!(self.value, Some(previous) if previous != value);
        self.value = Some(value);

        if self.changed {
            trace!("{:?}: flipped to {}", self, value);
        }

        Ok(Transition::new(value, self.changed))
    }

    /// Gets the position read by the last poll, or `None` before the first one.
    pub fn position(&self) -> Option<bool> {
        self.value
    }

    /// Gets the key for the current position.
    pub fn key(&self) -> Option<Key> {
        self.value.map(|on| if on { self.key_on } else { self.key_off })
    }

    pub fn changed(&self) -> bool {
        self.changed
    }
}

impl<S: Debug> Debug for ToggleSwitch<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ToggleSwitch({:?}, {:?}/{:?})", self.input, self.key_off, self.key_on)
    }
}

impl<S: DigitalInput> KeyEmitter for ToggleSwitch<S> {
    fn tick(&mut self) -> InputResult<()> {
        self.poll().map(|_| ())
    }

    fn key(&self) -> Option<Key> {
        ToggleSwitch::key(self)
    }

    fn changed(&self) -> bool {
        self.changed
    }
}
