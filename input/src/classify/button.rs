use std::fmt::{Debug, Formatter};
use log::trace;
use crate::classify::KeyEmitter;
use crate::{DigitalInput, InputResult, Key};

/// The state of a push-button after a poll.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ButtonState {
    /// Not pressed, and wasn't on the previous edge either.
    #[default] Off,
    /// Just went from not pressed to pressed (rising edge).
    Pressed,
    /// Still pressed.
    On,
    /// Just went from pressed to not pressed (falling edge).
    Released,
}

impl ButtonState {
    /// Whether this state is an edge rather than a steady level.
    pub fn is_edge(self) -> bool {
        matches!(self, ButtonState::Pressed | ButtonState::Released)
    }
}

/// An edge-detecting push-button bound to a single key.
///
/// Each press yields exactly one [ButtonState::Pressed] and each release exactly one
/// [ButtonState::Released], with [ButtonState::On] and [ButtonState::Off] reported while the level
/// is held.
pub struct EdgeButton<S> {
    input: S,
    key: Key,
    /// Last raw sample.
    value: bool,
    /// Level as of the last edge. Only updated on `Pressed` and `Released`.
    previous: bool,
    state: ButtonState,
}

impl<S: DigitalInput> EdgeButton<S> {
    pub fn new(input: S, key: Key) -> Self {
        EdgeButton {
            input,
            key,
            value: false,
            previous: false,
            state: ButtonState::Off,
        }
    }

    /// Reads the input once and computes the new state.
    pub fn poll(&mut self) -> InputResult<ButtonState> {
        self.value = self.input.read()?;

        self.state = match (self.previous, self.value) {
            (false, false) => ButtonState::Off,
            (false, true) => {
                self.previous = true;
                ButtonState::Pressed
            }
            (true, true) => ButtonState::On,
            (true, false) => {
                self.previous = false;
                ButtonState::Released
            }
        };

        if self.state.is_edge() {
            trace!("{:?}: {:?}", self, self.state);
        }

        Ok(self.state)
    }

    /// Gets the state computed by the last poll.
    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn is_off(&self) -> bool {
        self.state == ButtonState::Off
    }

    pub fn is_pressed(&self) -> bool {
        self.state == ButtonState::Pressed
    }

    pub fn is_on(&self) -> bool {
        self.state == ButtonState::On
    }

    pub fn is_released(&self) -> bool {
        self.state == ButtonState::Released
    }

    /// Gets the raw level read by the last poll.
    pub fn level(&self) -> bool {
        self.value
    }

    /// Gets the bound key. Doesn't depend on the state.
    pub fn key(&self) -> Key {
        self.key
    }
}

impl<S: Debug> Debug for EdgeButton<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "EdgeButton({:?}, {:?})", self.input, self.key)
    }
}

impl<S: DigitalInput> KeyEmitter for EdgeButton<S> {
    fn tick(&mut self) -> InputResult<()> {
        self.poll().map(|_| ())
    }

    fn key(&self) -> Option<Key> {
        Some(self.key)
    }

    fn changed(&self) -> bool {
        self.state.is_edge()
    }

    /// Only presses are dispatched, releases are not.
    fn emitted(&self) -> Option<Key> {
        self.is_pressed().then_some(self.key)
    }
}
