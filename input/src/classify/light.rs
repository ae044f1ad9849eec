use std::fmt::{Debug, Formatter};
use log::trace;
use crate::classify::{KeyEmitter, Transition};
use crate::{AnalogInput, InputResult, Key};

/// Which side of the threshold a sensor was last classified on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    Above,
    Below,
}

/// Threshold, dead-zone and keys of a [ThresholdSensor].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ThresholdConfig {
    pub threshold: u16,
    /// Half the width of the dead-zone around the threshold.
    pub spread: u16,
    pub key_above: Key,
    pub key_below: Key,
}

impl ThresholdConfig {
    /// Classifies a sample. `None` means the sample is inside the dead-zone.
    pub fn classify(&self, sample: u16) -> Option<Level> {
        if sample > self.threshold.saturating_add(self.spread) {
            Some(Level::Above)
        } else if sample < self.threshold.saturating_sub(self.spread) {
            Some(Level::Below)
        } else {
            None
        }
    }

    pub fn key_for(&self, level: Level) -> Key {
        match level {
            Level::Above => self.key_above,
            Level::Below => self.key_below,
        }
    }
}

/// A two-level sensor (e.g. ambient light) with hysteresis around a single threshold.
///
/// Samples within `threshold ± spread` keep the previous level, so noise around the threshold
/// doesn't make the output chatter. Until the first sample leaves the dead-zone, no key is emitted.
pub struct ThresholdSensor<S> {
    input: S,
    config: ThresholdConfig,
    value: Option<u16>,
    level: Option<Level>,
    changed: bool,
}

impl<S: AnalogInput> ThresholdSensor<S> {
    pub fn new(input: S, config: ThresholdConfig) -> Self {
        ThresholdSensor {
            input,
            config,
            value: None,
            level: None,
            changed: false,
        }
    }

    /// Reads the input once. Returns the emitted key and whether it flipped in this poll.
    pub fn poll(&mut self) -> InputResult<Transition<Option<Key>>> {
        let sample = self.input.read()?;
        self.value = Some(sample);

        self.changed = match self.config.classify(sample) {
            Some(level) if self.level != Some(level) => {
                self.level = Some(level);
                true
            }
            _ => false,
        };

        if self.changed {
            trace!("{:?}: {} -> {:?}", self, sample, self.level);
        }

        Ok(Transition::new(self.key(), self.changed))
    }

    /// Gets the raw sample read by the last poll.
    pub fn value(&self) -> Option<u16> {
        self.value
    }

    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn key(&self) -> Option<Key> {
        self.level.map(|level| self.config.key_for(level))
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }
}

impl<S: Debug> Debug for ThresholdSensor<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ThresholdSensor({:?}, {}±{})", self.input, self.config.threshold, self.config.spread)
    }
}

impl<S: AnalogInput> KeyEmitter for ThresholdSensor<S> {
    fn tick(&mut self) -> InputResult<()> {
        self.poll().map(|_| ())
    }

    fn key(&self) -> Option<Key> {
        ThresholdSensor::key(self)
    }

    fn changed(&self) -> bool {
        self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InputError;
    use crate::mock::ScriptedAnalog;

    const CONFIG: ThresholdConfig = ThresholdConfig {
        threshold: 500,
        spread: 50,
        key_above: 'L',
        key_below: 'D',
    };

    fn sensor(samples: &[u16]) -> ThresholdSensor<ScriptedAnalog> {
        ThresholdSensor::new(ScriptedAnalog::new(samples.iter().copied()), CONFIG)
    }

    fn poll_all(sensor: &mut ThresholdSensor<ScriptedAnalog>, n: usize) -> Vec<Transition<Option<Key>>> {
        (0..n).map(|_| sensor.poll().unwrap()).collect()
    }

    #[test]
    fn hysteresis_cycle() {
        let mut sensor = sensor(&[400, 420, 460, 549, 550, 551, 500, 449]);
        let transitions = poll_all(&mut sensor, 8);

        assert_eq!(transitions, [
            Transition::new(Some('D'), true),
            Transition::steady(Some('D')),
            Transition::steady(Some('D')),
            Transition::steady(Some('D')),
            Transition::steady(Some('D')),
            Transition::new(Some('L'), true),
            Transition::steady(Some('L')),
            Transition::new(Some('D'), true),
        ]);
    }

    #[test]
    fn dead_zone_before_first_crossing_emits_nothing() {
        let mut sensor = sensor(&[450, 500, 550, 551]);
        let transitions = poll_all(&mut sensor, 4);

        assert!(transitions[..3].iter().all(|t| *t == Transition::steady(None)));
        assert_eq!(transitions[3], Transition::new(Some('L'), true));
        assert_eq!(sensor.level(), Some(Level::Above));
    }

    #[test]
    fn first_classification_always_changes() {
        for (sample, key) in [(0, 'D'), (1023, 'L')] {
            let mut sensor = sensor(&[sample]);
            assert_eq!(sensor.poll().unwrap(), Transition::new(Some(key), true));
        }
    }

    #[test]
    fn dead_zone_saturates_at_range_ends() {
        let config = ThresholdConfig { threshold: 10, spread: 50, ..CONFIG };
        assert_eq!(config.classify(0), None);
        assert_eq!(config.classify(61), Some(Level::Above));

        let config = ThresholdConfig { threshold: u16::MAX - 10, spread: 50, ..CONFIG };
        assert_eq!(config.classify(u16::MAX), None);
    }

    #[test]
    fn key_is_stable_between_polls() {
        let mut sensor = sensor(&[600]);
        sensor.poll().unwrap();
        for _ in 0..3 {
            assert_eq!(sensor.key(), Some('L'));
            assert_eq!(sensor.value(), Some(600));
        }
    }

    #[test]
    fn read_failure_propagates_and_keeps_state() {
        let mut sensor = sensor(&[400, 480]);
        poll_all(&mut sensor, 2);

        let err = sensor.poll().unwrap_err();
        assert!(matches!(err, InputError::ChannelUnavailable(_)));
        assert_eq!(sensor.value(), Some(480));
        assert_eq!(sensor.level(), Some(Level::Below));
        assert_eq!(sensor.key(), Some('D'));
        assert!(!sensor.changed());
    }
}
