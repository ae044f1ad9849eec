//! Digital inputs through the Linux GPIO character device, using the gpiod library.
use crate::{
    ActiveLevel, AnalogInput, Bias, DigitalInput, DigitalOptions, InputDriver, InputError,
    InputResult,
};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

/// GpiodDriver hands out the lines of one GPIO chip as digital inputs.
///
/// Analog inputs aren't available through the character device, see [crate::iio::IioDriver].
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        let bits = BitVec::repeat(false, n);
        Self {
            chip,
            used_pins: bits,
        }
    }

    /// Opens the chip at the given path, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> InputResult<Self> {
        let chip = gpiod::Chip::new(path.as_ref())?;
        Ok(Self::new(chip))
    }

    pub fn count(&self) -> usize {
        self.chip.num_lines() as usize
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl InputDriver for GpiodDriver {
    fn digital_input(
        &self,
        pin: usize,
        options: DigitalOptions,
    ) -> InputResult<Box<dyn DigitalInput + '_>> {
        if pin >= self.count() {
            return Err(InputError::ChannelUnavailable(format!(
                "{:?} has no line {}",
                self, pin
            )));
        }

        if self.used_pins[pin] {
            return Err(InputError::AlreadyInUse);
        }

        let line = self.chip.request_lines(
            gpiod::Options::input([pin as u32])
                .consumer(env!("CARGO_PKG_NAME"))
                .active(options.active_level.into())
                .bias(options.bias.into()),
        )?;

        self.used_pins.set_aliased(pin, true);
        debug!("{:?}: line {} acquired as input ({:?})", self, pin, options);

        Ok(Box::new(GpiodInput {
            driver: self,
            pin,
            line,
        }))
    }

    fn analog_input(&self, _pin: usize) -> InputResult<Box<dyn AnalogInput + '_>> {
        Err(InputError::NotSupported)
    }
}

impl From<ActiveLevel> for gpiod::Active {
    fn from(level: ActiveLevel) -> Self {
        match level {
            ActiveLevel::High => gpiod::Active::High,
            ActiveLevel::Low => gpiod::Active::Low,
        }
    }
}

impl From<Bias> for gpiod::Bias {
    fn from(bias: Bias) -> Self {
        match bias {
            Bias::None => gpiod::Bias::Disable,
            Bias::PullUp => gpiod::Bias::PullUp,
            Bias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

struct GpiodInput<'a> {
    driver: &'a GpiodDriver,
    pin: usize,
    line: gpiod::Lines<gpiod::Input>,
}

impl Debug for GpiodInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][input]", self.driver, self.pin)
    }
}

impl DigitalInput for GpiodInput<'_> {
    fn read(&self) -> InputResult<bool> {
        let values = self
            .line
            .get_values([false])
            .map_err(|err| InputError::ChannelUnavailable(format!("{:?}: {}", self, err)))?;
        Ok(values[0])
    }
}

impl Drop for GpiodInput<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.pin, false);
    }
}
