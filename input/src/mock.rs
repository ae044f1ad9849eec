//! Scripted inputs, used by the tests and for replaying recorded sessions.
//!
//! A script is a fixed sequence of samples handed out one per read. Once it runs out, reads fail
//! with `InputError::ChannelUnavailable`, the same way an unplugged source would.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;
use bitvec::vec::BitVec;
use log::debug;
use crate::{AnalogInput, DigitalInput, DigitalOptions, InputDriver, InputError, InputResult};

struct Script<T> {
    name: String,
    samples: RefCell<VecDeque<T>>,
}

impl<T: Copy> Script<T> {
    fn new(name: String, samples: impl IntoIterator<Item = T>) -> Self {
        Script {
            name,
            samples: RefCell::new(samples.into_iter().collect()),
        }
    }

    fn next(&self) -> InputResult<T> {
        self.samples
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| InputError::ChannelUnavailable(format!("{} exhausted", self.name)))
    }

    fn remaining(&self) -> usize {
        self.samples.borrow().len()
    }
}

/// A digital input reading from a fixed list of samples.
pub struct ScriptedDigital {
    script: Script<bool>,
}

impl ScriptedDigital {
    pub fn new(samples: impl IntoIterator<Item = bool>) -> Self {
        ScriptedDigital { script: Script::new("digital script".to_string(), samples) }
    }

    /// Gets the number of samples left.
    pub fn remaining(&self) -> usize {
        self.script.remaining()
    }
}

impl Debug for ScriptedDigital {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScriptedDigital({} left)", self.remaining())
    }
}

impl DigitalInput for ScriptedDigital {
    fn read(&self) -> InputResult<bool> {
        self.script.next()
    }
}

/// An analog input reading from a fixed list of samples.
pub struct ScriptedAnalog {
    script: Script<u16>,
}

impl ScriptedAnalog {
    pub fn new(samples: impl IntoIterator<Item = u16>) -> Self {
        ScriptedAnalog { script: Script::new("analog script".to_string(), samples) }
    }

    /// Gets the number of samples left.
    pub fn remaining(&self) -> usize {
        self.script.remaining()
    }
}

impl Debug for ScriptedAnalog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScriptedAnalog({} left)", self.remaining())
    }
}

impl AnalogInput for ScriptedAnalog {
    fn read(&self) -> InputResult<u16> {
        self.script.next()
    }
}

/// A driver handing out scripted inputs, one script per pin.
///
/// Scripts can be given directly or parsed from a replay file with one pin per line:
///
/// ```text
/// # pin samples...
/// 17 0 0 1 1 1 0
/// 0  100 104 480 512
/// ```
///
/// Digital inputs read any non-zero sample as a high level.
pub struct ScriptedDriver {
    scripts: BTreeMap<usize, Vec<u16>>,
    max_value: Option<u16>,
    /// One bit per script, in pin order.
    used_pins: BitVec<AtomicU8>,
}

impl ScriptedDriver {
    pub fn new(scripts: BTreeMap<usize, Vec<u16>>) -> Self {
        let n = scripts.len();
        ScriptedDriver {
            scripts,
            max_value: None,
            used_pins: BitVec::repeat(false, n),
        }
    }

    /// Sets the highest value analog inputs may report. Samples above it are read as errors.
    pub fn with_max_value(mut self, max_value: u16) -> Self {
        self.max_value = Some(max_value);
        self
    }

    /// Parses a replay.
    ///
    /// # Errors
    /// - `InputError::Other` naming the offending line if it can't be parsed.
    pub fn parse(replay: &str) -> InputResult<Self> {
        let mut scripts = BTreeMap::new();

        for (line_no, line) in replay.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let invalid = || InputError::Other(format!("invalid replay line {}: {:?}", line_no + 1, line));

            let mut fields = line.split_whitespace();
            let pin: usize = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(invalid)?;
            let samples = fields
                .map(|s| s.parse::<u16>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;

            scripts.entry(pin).or_insert_with(Vec::new).extend(samples);
        }

        Ok(Self::new(scripts))
    }

    /// Reads and parses a replay file.
    pub fn from_file(path: impl AsRef<Path>) -> InputResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Marks the pin as used, returning its slot in `used_pins` and its samples.
    fn claim(&self, pin: usize) -> InputResult<(usize, &[u16])> {
        let (slot, script) = self
            .scripts
            .iter()
            .enumerate()
            .find_map(|(slot, (&p, script))| (p == pin).then_some((slot, script)))
            .ok_or_else(|| InputError::ChannelUnavailable(format!("no script for pin {}", pin)))?;

        if self.used_pins[slot] {
            return Err(InputError::AlreadyInUse);
        }
        self.used_pins.set_aliased(slot, true);

        debug!("{:?}: pin {} claimed, {} samples", self, pin, script.len());
        Ok((slot, script.as_slice()))
    }
}

impl Debug for ScriptedDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScriptedDriver({:?})", self.scripts.keys().collect::<Vec<_>>())
    }
}

impl InputDriver for ScriptedDriver {
    fn digital_input(
        &self,
        pin: usize,
        options: DigitalOptions,
    ) -> InputResult<Box<dyn DigitalInput + '_>> {
        let (slot, script) = self.claim(pin)?;
        let samples = script
            .iter()
            .map(|&sample| options.active_level.get_state(sample != 0));
        Ok(Box::new(ScriptedPin {
            driver: self,
            pin,
            slot,
            script: Script::new(format!("pin {} script", pin), samples),
        }))
    }

    fn analog_input(&self, pin: usize) -> InputResult<Box<dyn AnalogInput + '_>> {
        let (slot, script) = self.claim(pin)?;
        Ok(Box::new(ScriptedPin {
            driver: self,
            pin,
            slot,
            script: Script::new(format!("pin {} script", pin), script.iter().copied()),
        }))
    }
}

struct ScriptedPin<'a, T> {
    driver: &'a ScriptedDriver,
    pin: usize,
    slot: usize,
    script: Script<T>,
}

impl<T> Debug for ScriptedPin<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin)
    }
}

impl<T> Drop for ScriptedPin<'_, T> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.slot, false);
    }
}

impl DigitalInput for ScriptedPin<'_, bool> {
    fn read(&self) -> InputResult<bool> {
        self.script.next()
    }
}

impl AnalogInput for ScriptedPin<'_, u16> {
    fn read(&self) -> InputResult<u16> {
        let value = self.script.next()?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActiveLevel;

    const REPLAY: &str = "
        # button on 17, pot on 0
        17 0 1 1 0
        0  100 480   # trailing comment
        0  512
    ";

    #[test]
    fn parses_replay() {
        let driver = ScriptedDriver::parse(REPLAY).unwrap();

        let button = driver.digital_input(17, DigitalOptions::default()).unwrap();
        let levels: Vec<bool> = (0..4).map(|_| button.read().unwrap()).collect();
        assert_eq!(levels, [false, true, true, false]);

        let pot = driver.analog_input(0).unwrap();
        let values: Vec<u16> = (0..3).map(|_| pot.read().unwrap()).collect();
        assert_eq!(values, [100, 480, 512]);
    }

    #[test]
    fn exhausted_script_is_unavailable() {
        let input = ScriptedAnalog::new([1]);
        assert_eq!(input.read(), Ok(1));
        assert!(matches!(input.read(), Err(InputError::ChannelUnavailable(_))));
    }

    #[test]
    fn unknown_pin_is_unavailable() {
        let driver = ScriptedDriver::parse(REPLAY).unwrap();
        assert!(matches!(
            driver.analog_input(5),
            Err(InputError::ChannelUnavailable(_)),
        ));
    }

    #[test]
    fn pins_are_exclusive_until_dropped() {
        let driver = ScriptedDriver::parse(REPLAY).unwrap();

        let first = driver.digital_input(17, DigitalOptions::default()).unwrap();
        assert_eq!(
            driver.digital_input(17, DigitalOptions::default()).unwrap_err(),
            InputError::AlreadyInUse,
        );

        drop(first);
        assert!(driver.digital_input(17, DigitalOptions::default()).is_ok());
    }

    #[test]
    fn active_low_is_applied() {
        let driver = ScriptedDriver::parse("3 0 1").unwrap();
        let options = DigitalOptions::default().with_active_level(ActiveLevel::Low);
        let input = driver.digital_input(3, options).unwrap();
        assert_eq!(input.read(), Ok(true));
        assert_eq!(input.read(), Ok(false));
    }

    #[test]
    fn invalid_line_is_reported() {
        let err = ScriptedDriver::parse("1 0 1\nx 2").unwrap_err();
        assert!(matches!(err, InputError::Other(msg) if msg.contains("line 2")));
    }

    #[test]
    fn large_pin_numbers_are_accepted() {
        let replay = format!("{} 0 1\n1000000000000 7", usize::MAX);
        let driver = ScriptedDriver::parse(&replay).unwrap();

        let input = driver.digital_input(usize::MAX, DigitalOptions::default()).unwrap();
        assert_eq!(input.read(), Ok(false));
        assert_eq!(input.read(), Ok(true));
        assert_eq!(
            driver.digital_input(usize::MAX, DigitalOptions::default()).unwrap_err(),
            InputError::AlreadyInUse,
        );

        let pot = driver.analog_input(1_000_000_000_000).unwrap();
        assert_eq!(pot.read(), Ok(7));
    }

    #[test]
    fn pin_numbers_beyond_usize_are_invalid() {
        let err = ScriptedDriver::parse("18446744073709551616 0 1").unwrap_err();
        assert!(matches!(err, InputError::Other(msg) if msg.contains("line 1")));
    }

    #[test]
    fn samples_above_max_value_are_errors() {
        let driver = ScriptedDriver::parse("0 1023 1024").unwrap().with_max_value(1023);
        let input = driver.analog_input(0).unwrap();

        assert_eq!(input.max_value(), Some(1023));
        assert_eq!(input.read(), Ok(1023));
        assert!(matches!(input.read(), Err(InputError::Other(_))));
    }
}
