use std::fmt::{Debug, Formatter};
use crate::gpiod::GpiodDriver;
use crate::iio::IioDriver;
use crate::{AnalogInput, DigitalInput, DigitalOptions, InputDriver, InputError, InputResult};

/// Combines a GPIO chip for digital inputs with an optional ADC for analog ones.
pub struct LinuxDriver {
    gpio: GpiodDriver,
    adc: Option<IioDriver>,
}

impl LinuxDriver {
    pub fn new(gpio: GpiodDriver, adc: Option<IioDriver>) -> Self {
        LinuxDriver { gpio, adc }
    }
}

impl Debug for LinuxDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.adc {
            Some(adc) => write!(f, "{:?}+{:?}", self.gpio, adc),
            None => write!(f, "{:?}", self.gpio),
        }
    }
}

impl InputDriver for LinuxDriver {
    fn digital_input(
        &self,
        pin: usize,
        options: DigitalOptions,
    ) -> InputResult<Box<dyn DigitalInput + '_>> {
        self.gpio.digital_input(pin, options)
    }

    fn analog_input(&self, pin: usize) -> InputResult<Box<dyn AnalogInput + '_>> {
        match &self.adc {
            Some(adc) => adc.analog_input(pin),
            None => Err(InputError::ChannelUnavailable(format!(
                "no ADC configured for analog pin {}",
                pin
            ))),
        }
    }
}
