pub mod classify;
pub mod gpiod;
pub mod iio;
pub mod linux;
pub mod mock;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum InputError {
    #[error("position {position} is out of range 1..={capacity}")]
    OutOfRange { position: usize, capacity: usize },
    #[error("position table is full ({capacity} entries)")]
    CapacityExceeded { capacity: usize },
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for InputError {
    fn from(err: std::io::Error) -> Self {
        InputError::Io(err.kind())
    }
}

pub type InputResult<T> = Result<T, InputError>;

/// The symbol emitted by a classifier and handed over to the key dispatcher.
pub type Key = char;

/// The kind of sample a channel produces.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SampleKind {
    /// A boolean level, read from a digital pin.
    Digital,
    /// A bounded integer, read from an ADC.
    Analog,
}

/// Identity of a physical input channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Channel {
    pub pin: usize,
    pub kind: SampleKind,
}

impl Channel {
    pub fn digital(pin: usize) -> Self {
        Channel { pin, kind: SampleKind::Digital }
    }

    pub fn analog(pin: usize) -> Self {
        Channel { pin, kind: SampleKind::Analog }
    }
}

/// Specifies the active level of a digital input.
///
/// By default, the active level is high.
/// With [ActiveLevel::Low], a pin pulled to ground reads as `true`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ActiveLevel {
    #[default] High,
    Low,
}

impl ActiveLevel {
    /// Gets the logical value for the given electrical level.
    pub fn get_state(&self, level: bool) -> bool {
        match self {
            ActiveLevel::High => level,
            ActiveLevel::Low => !level,
        }
    }
}

/// Specifies the bias of a digital input.
///
/// You can use this to enable pull-up or pull-down resistors, e.g. for buttons wired to ground.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Bias {
    #[default] None,
    PullUp,
    PullDown,
}

/// Options used when acquiring a pin as a digital input.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DigitalOptions {
    pub active_level: ActiveLevel,
    pub bias: Bias,
}

impl DigitalOptions {
    pub fn with_active_level(mut self, active_level: ActiveLevel) -> Self {
        self.active_level = active_level;
        self
    }

    pub fn with_bias(mut self, bias: Bias) -> Self {
        self.bias = bias;
        self
    }
}

/// A source of samples, able to hand out pins as inputs.
///
/// Acquiring a pin configures it as an input. A pin can only be held by one handle at a time;
/// dropping the handle releases it.
pub trait InputDriver: Debug {
    /// Acquires the pin as a digital input.
    ///
    /// # Errors
    /// - `InputError::AlreadyInUse` if the pin is held by another handle.
    /// - `InputError::NotSupported` if the driver has no digital inputs.
    fn digital_input(
        &self,
        pin: usize,
        options: DigitalOptions,
    ) -> InputResult<Box<dyn DigitalInput + '_>>;

    /// Acquires the pin as an analog input.
    ///
    /// # Errors
    /// - `InputError::AlreadyInUse` if the pin is held by another handle.
    /// - `InputError::NotSupported` if the driver has no analog inputs.
    fn analog_input(&self, pin: usize) -> InputResult<Box<dyn AnalogInput + '_>>;
}

pub trait DigitalInput: Debug {
    /// Reads the logical state of the pin.
    fn read(&self) -> InputResult<bool>;
}

pub trait AnalogInput: Debug {
    /// Reads the raw ADC value of the pin.
    fn read(&self) -> InputResult<u16>;

    /// Gets the highest value the ADC can report, if known.
    fn max_value(&self) -> Option<u16> {
        None
    }
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn read(&self) -> InputResult<bool> {
        (**self).read()
    }
}

impl<T: AnalogInput + ?Sized> AnalogInput for Box<T> {
    fn read(&self) -> InputResult<u16> {
        (**self).read()
    }

    fn max_value(&self) -> Option<u16> {
        (**self).max_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_low_inverts_level() {
        assert!(ActiveLevel::Low.get_state(false));
        assert!(!ActiveLevel::Low.get_state(true));
        assert!(ActiveLevel::High.get_state(true));
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err: InputError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(err, InputError::Io(std::io::ErrorKind::NotFound));
    }

    #[test]
    fn out_of_range_message_names_the_bounds() {
        let err = InputError::OutOfRange { position: 11, capacity: 10 };
        assert_eq!(err.to_string(), "position 11 is out of range 1..=10");
    }
}
