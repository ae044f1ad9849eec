//! The module for the channel wiring and the poll loop.

use log::{debug, info, trace, warn};
use protokeys_input::classify::{
    BandedPot, EdgeButton, KeyEmitter, ThresholdConfig, ThresholdSensor, ToggleSwitch,
};
use protokeys_input::{AnalogInput, Channel, InputDriver, InputResult};
use crate::config::ChannelConfig;
use crate::sink::KeySink;

/// A configured channel and the classifier owning it.
#[derive(Debug)]
struct Binding<'a> {
    channel: Channel,
    emitter: Box<dyn KeyEmitter + 'a>,
}

/// The main app state struct.
#[derive(Debug)]
pub struct App<'a> {
    bindings: Vec<Binding<'a>>,
    /// Where the emitted keys go.
    sink: Box<dyn KeySink>,
    ticks: u64,
}

impl<'a> App<'a> {
    /// Acquires every configured channel from the driver and builds its classifier.
    pub fn new(
        driver: &'a dyn InputDriver,
        channels: &[ChannelConfig],
        sink: Box<dyn KeySink>,
    ) -> InputResult<App<'a>> {
        let bindings = channels
            .iter()
            .map(|config| bind(driver, config))
            .collect::<InputResult<Vec<_>>>()?;

        Ok(App {
            bindings,
            sink,
            ticks: 0,
        })
    }

    /// Polls every channel once, in configuration order, and sends the emitted keys to the sink.
    ///
    /// Returns the number of keys sent.
    pub fn update(&mut self) -> eyre::Result<usize> {
        self.ticks += 1;
        let mut sent = 0;

        for binding in &mut self.bindings {
            binding.emitter.tick()?;

            if let Some(key) = binding.emitter.emitted() {
                trace!("Tick {}: pin {} emitted {:?}", self.ticks, binding.channel.pin, key);
                self.sink.send(key)?;
                sent += 1;
            }
        }

        Ok(sent)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

fn bind<'a>(driver: &'a dyn InputDriver, config: &ChannelConfig) -> InputResult<Binding<'a>> {
    let channel = config.channel();
    debug!("Binding {:?}...", channel);

    let emitter: Box<dyn KeyEmitter + 'a> = match *config {
        ChannelConfig::Button { pin, key, .. } => {
            let input = driver.digital_input(pin, config.digital_options().unwrap_or_default())?;
            Box::new(EdgeButton::new(input, key))
        }
        ChannelConfig::Switch { pin, key_off, key_on, .. } => {
            let input = driver.digital_input(pin, config.digital_options().unwrap_or_default())?;
            Box::new(ToggleSwitch::new(input, key_off, key_on))
        }
        ChannelConfig::Pot { pin, capacity, spread, ref positions } => {
            let input = driver.analog_input(pin)?;
            count_unreachable(channel, input.max_value(), positions.iter().map(|p| p.value));
            let mut pot = BandedPot::new(input, capacity, spread);
            for position in positions {
                match position.position {
                    Some(number) => pot.add_band(number, position.value, position.key)?,
                    None => {
                        pot.push_band(position.value, position.key)?;
                    }
                }
            }
            Box::new(pot)
        }
        ChannelConfig::Light { pin, threshold, spread, key_above, key_below } => {
            let input = driver.analog_input(pin)?;
            count_unreachable(channel, input.max_value(), [threshold]);
            let config = ThresholdConfig { threshold, spread, key_above, key_below };
            Box::new(ThresholdSensor::new(input, config))
        }
    };

    info!("{:?} bound to {:?}", channel, emitter);
    Ok(Binding { channel, emitter })
}

/// Warns about configured values above the ADC maximum, which no sample can ever reach.
fn count_unreachable(channel: Channel, max: Option<u16>, values: impl IntoIterator<Item = u16>) -> usize {
    let Some(max) = max else {
        return 0;
    };

    values
        .into_iter()
        .filter(|&value| value > max)
        .inspect(|value| warn!("{:?}: {} is above the ADC maximum {}", channel, value, max))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, PositionConfig};
    use protokeys_input::mock::ScriptedDriver;
    use protokeys_input::InputError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<char>>>);

    impl KeySink for Recorder {
        fn send(&mut self, key: char) -> std::io::Result<()> {
            self.0.borrow_mut().push(key);
            Ok(())
        }
    }

    const CONFIG: &str = r#"{
        "backend": { "kind": "replay", "path": "unused" },
        "channels": [
            { "type": "button", "pin": 17, "key": "a" },
            { "type": "switch", "pin": 27, "key_off": "x", "key_on": "y" },
            { "type": "pot", "pin": 0, "spread": 20, "positions": [
                { "position": 1, "value": 100, "key": "1" },
                { "value": 500, "key": "2" }
            ] },
            { "type": "light", "pin": 1, "threshold": 500, "spread": 50, "key_above": "L", "key_below": "D" }
        ]
    }"#;

    const REPLAY: &str = "
        17 0 1 1 0 1
        27 0 0 1 1 0
        0  300 105 110 495 300
        1  500 400 500 600 600
    ";

    #[test]
    fn dispatches_keys_in_channel_order() {
        let config = Config::parse(CONFIG).unwrap();
        let driver = ScriptedDriver::parse(REPLAY).unwrap();
        let recorder = Recorder::default();
        let mut app = App::new(&driver, &config.channels, Box::new(recorder.clone())).unwrap();

        let sent: Vec<usize> = (0..5).map(|_| app.update().unwrap()).collect();

        assert_eq!(sent, [0, 3, 1, 2, 2]);
        assert_eq!(
            *recorder.0.borrow(),
            ['a', '1', 'D', 'y', '2', 'L', 'a', 'x'],
        );
        assert_eq!(app.ticks(), 5);
    }

    #[test]
    fn exhausted_replay_ends_with_channel_unavailable() {
        let config = Config::parse(CONFIG).unwrap();
        let driver = ScriptedDriver::parse(REPLAY).unwrap();
        let mut app = App::new(&driver, &config.channels, Box::new(Recorder::default())).unwrap();

        for _ in 0..5 {
            app.update().unwrap();
        }

        let err = app.update().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::ChannelUnavailable(_)),
        ));
    }

    #[test]
    fn invalid_position_fails_binding() {
        let driver = ScriptedDriver::parse("0 100").unwrap();
        let channels = [ChannelConfig::Pot {
            pin: 0,
            capacity: 2,
            spread: 10,
            positions: vec![PositionConfig { position: Some(3), value: 100, key: 'a' }],
        }];

        let err = App::new(&driver, &channels, Box::new(Recorder::default())).unwrap_err();
        assert_eq!(err, InputError::OutOfRange { position: 3, capacity: 2 });
    }

    #[test]
    fn pins_cannot_be_bound_twice() {
        let driver = ScriptedDriver::parse("4 0 1").unwrap();
        let channels = [
            ChannelConfig::Button { pin: 4, key: 'a', active_level: Default::default(), bias: Default::default() },
            ChannelConfig::Button { pin: 4, key: 'b', active_level: Default::default(), bias: Default::default() },
        ];

        let err = App::new(&driver, &channels, Box::new(Recorder::default())).unwrap_err();
        assert_eq!(err, InputError::AlreadyInUse);
    }

    #[test]
    fn values_above_adc_maximum_are_counted() {
        let channel = Channel::analog(0);
        assert_eq!(count_unreachable(channel, Some(1023), [100, 2000, 1023, 4095]), 2);
        assert_eq!(count_unreachable(channel, None, [100, 2000]), 0);
    }

    #[test]
    fn unreachable_band_still_binds() {
        let driver = ScriptedDriver::parse("0 100 2000").unwrap().with_max_value(1023);
        let channels = [ChannelConfig::Pot {
            pin: 0,
            capacity: 2,
            spread: 10,
            positions: vec![
                PositionConfig { position: None, value: 100, key: 'a' },
                PositionConfig { position: None, value: 2000, key: 'b' },
            ],
        }];
        let recorder = Recorder::default();
        let mut app = App::new(&driver, &channels, Box::new(recorder.clone())).unwrap();

        assert_eq!(app.update().unwrap(), 1);
        assert!(app.update().is_err());
        assert_eq!(*recorder.0.borrow(), ['a']);
    }
}
