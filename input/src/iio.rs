//! Analog inputs through the Linux industrial I/O (IIO) sysfs interface.
use crate::{AnalogInput, DigitalInput, DigitalOptions, InputDriver, InputError, InputResult};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU8;

const IIO_PATH: &str = "/sys/bus/iio/devices";

/// IioDriver hands out the voltage channels of one ADC as analog inputs.
///
/// Pin `n` is read from `in_voltage{n}_raw` of the device.
pub struct IioDriver {
    base_path: PathBuf,
    max_value: Option<u16>,
    used_pins: BitVec<AtomicU8>,
}

impl IioDriver {
    /// Counts the IIO devices present, numbered from `iio:device0` without gaps.
    pub fn count_devices() -> usize {
        count_numbered(Path::new(IIO_PATH), |index| format!("iio:device{}", index))
    }

    /// Uses the `index`th IIO device.
    ///
    /// # Errors
    /// - `InputError::ChannelUnavailable` if there's no such device.
    pub fn get_device(index: usize) -> InputResult<Self> {
        let count = Self::count_devices();
        if index >= count {
            return Err(InputError::ChannelUnavailable(format!(
                "no IIO device {} ({} found)",
                index, count
            )));
        }
        Self::at_path(Path::new(IIO_PATH).join(format!("iio:device{}", index)))
    }

    /// Uses the IIO device at the given sysfs directory.
    pub fn at_path(path: impl Into<PathBuf>) -> InputResult<Self> {
        let base_path = path.into();
        if !base_path.exists() {
            return Err(InputError::ChannelUnavailable(format!(
                "no IIO device at {:?}",
                base_path
            )));
        }

        let n = count_numbered(&base_path, |index| format!("in_voltage{}_raw", index));
        Ok(IioDriver {
            base_path,
            max_value: None,
            used_pins: BitVec::repeat(false, n),
        })
    }

    /// Sets the highest raw value the ADC can produce, e.g. 1023 for a 10-bit converter.
    /// Reads above it are reported as errors.
    pub fn with_max_value(mut self, max_value: u16) -> Self {
        self.max_value = Some(max_value);
        self
    }

    pub fn count(&self) -> usize {
        self.used_pins.len()
    }
}

fn count_numbered(dir: &Path, name: impl Fn(usize) -> String) -> usize {
    (0..).take_while(|&index| dir.join(name(index)).exists()).count()
}

impl Debug for IioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IioDriver({:?})", self.base_path)
    }
}

impl InputDriver for IioDriver {
    fn digital_input(
        &self,
        _pin: usize,
        _options: DigitalOptions,
    ) -> InputResult<Box<dyn DigitalInput + '_>> {
        Err(InputError::NotSupported)
    }

    fn analog_input(&self, pin: usize) -> InputResult<Box<dyn AnalogInput + '_>> {
        if pin >= self.count() {
            return Err(InputError::ChannelUnavailable(format!(
                "{:?} has no channel {}",
                self, pin
            )));
        }

        if self.used_pins[pin] {
            return Err(InputError::AlreadyInUse);
        }
        self.used_pins.set_aliased(pin, true);

        let path = self.base_path.join(format!("in_voltage{}_raw", pin));
        debug!("{:?}: channel {} acquired ({:?})", self, pin, path);

        Ok(Box::new(IioInput {
            driver: self,
            pin,
            path,
        }))
    }
}

struct IioInput<'a> {
    driver: &'a IioDriver,
    pin: usize,
    path: PathBuf,
}

impl Debug for IioInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin)
    }
}

impl AnalogInput for IioInput<'_> {
    fn read(&self) -> InputResult<u16> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|err| InputError::ChannelUnavailable(format!("{:?}: {}", self, err)))?;
        let value: u16 = content
            .trim()
            .parse()
            .map_err(|_| InputError::Other(format!("parsing {:?} failed", self.path)))?;

        match self.driver.max_value {
            Some(max) if value > max => Err(InputError::Other(format!(
                "{:?} read {} above the ADC range 0..={}",
                self, value, max
            ))),
            _ => Ok(value),
        }
    }

    fn max_value(&self) -> Option<u16> {
        self.driver.max_value
    }
}

impl Drop for IioInput<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.pin, false);
    }
}
