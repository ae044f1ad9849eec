use std::env::var_os;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use protokeys_input::{ActiveLevel, Bias, Channel, DigitalOptions, Key};

const DEFAULT_CONFIG_FILE: &str = "protokeys.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {0:?} failed: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("config {0:?} is invalid: {1}")]
    Invalid(PathBuf, serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    pub backend: Backend,
    /// Time between two ticks of the poll loop.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub sink: SinkKind,
    pub channels: Vec<ChannelConfig>,
}

fn default_poll_interval() -> u64 {
    10
}

/// Where the samples come from.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backend {
    /// GPIO character device for digital pins, plus an optional IIO ADC for analog ones.
    Gpiod {
        chip: PathBuf,
        #[serde(default)]
        iio_device: Option<usize>,
        #[serde(default)]
        adc_max: Option<u16>,
    },
    /// Samples recorded in a replay file.
    Replay { path: PathBuf },
}

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Log,
    Stdout,
}

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ActiveLevelConfig {
    #[default]
    High,
    Low,
}

impl From<ActiveLevelConfig> for ActiveLevel {
    fn from(level: ActiveLevelConfig) -> Self {
        match level {
            ActiveLevelConfig::High => ActiveLevel::High,
            ActiveLevelConfig::Low => ActiveLevel::Low,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum BiasConfig {
    #[default]
    None,
    PullUp,
    PullDown,
}

impl From<BiasConfig> for Bias {
    fn from(bias: BiasConfig) -> Self {
        match bias {
            BiasConfig::None => Bias::None,
            BiasConfig::PullUp => Bias::PullUp,
            BiasConfig::PullDown => Bias::PullDown,
        }
    }
}

/// A potentiometer position. Without a `position`, it goes after the last one registered.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct PositionConfig {
    #[serde(default)]
    pub position: Option<usize>,
    pub value: u16,
    pub key: Key,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    Button {
        pin: usize,
        key: Key,
        #[serde(default)]
        active_level: ActiveLevelConfig,
        #[serde(default)]
        bias: BiasConfig,
    },
    Switch {
        pin: usize,
        key_off: Key,
        key_on: Key,
        #[serde(default)]
        active_level: ActiveLevelConfig,
        #[serde(default)]
        bias: BiasConfig,
    },
    Pot {
        pin: usize,
        #[serde(default = "default_capacity")]
        capacity: usize,
        spread: u16,
        positions: Vec<PositionConfig>,
    },
    Light {
        pin: usize,
        threshold: u16,
        spread: u16,
        key_above: Key,
        key_below: Key,
    },
}

fn default_capacity() -> usize {
    10
}

impl ChannelConfig {
    pub fn channel(&self) -> Channel {
        match *self {
            ChannelConfig::Button { pin, .. } | ChannelConfig::Switch { pin, .. } => Channel::digital(pin),
            ChannelConfig::Pot { pin, .. } | ChannelConfig::Light { pin, .. } => Channel::analog(pin),
        }
    }

    /// Gets the options for digital channels, `None` for analog ones.
    pub fn digital_options(&self) -> Option<DigitalOptions> {
        match *self {
            ChannelConfig::Button { active_level, bias, .. }
            | ChannelConfig::Switch { active_level, bias, .. } => Some(
                DigitalOptions::default()
                    .with_active_level(active_level.into())
                    .with_bias(bias.into()),
            ),
            ChannelConfig::Pot { .. } | ChannelConfig::Light { .. } => None,
        }
    }
}

impl Config {
    /// Gets the config file path, from `PROTOKEYS_CONFIG` or the default.
    pub fn path() -> PathBuf {
        let config_str = var_os("PROTOKEYS_CONFIG");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new(DEFAULT_CONFIG_FILE));
        PathBuf::from(config_str)
    }

    /// Loads the config. If the file doesn't exist, the default config is saved there and used.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("Config {:?} not found. Using default", path);
            let config = Config::default();
            config.save(path)?;
            info!("Default config saved.");
            Ok(config)
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
        Self::parse(&content).map_err(|e| ConfigError::Invalid(path.to_owned(), e))
    }

    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| ConfigError::Invalid(path.to_owned(), e))?;
        writer.flush().map_err(|e| ConfigError::Io(path.to_owned(), e))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: Backend::Gpiod {
                chip: PathBuf::from("/dev/gpiochip0"),
                iio_device: None,
                adc_max: None,
            },
            poll_interval_ms: default_poll_interval(),
            sink: SinkKind::default(),
            channels: vec![ChannelConfig::Button {
                pin: 17,
                key: 'a',
                active_level: ActiveLevelConfig::Low,
                bias: BiasConfig::PullUp,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protokeys_input::SampleKind;

    const CONFIG: &str = r#"{
        "backend": { "kind": "replay", "path": "session.txt" },
        "sink": "stdout",
        "channels": [
            { "type": "button", "pin": 17, "key": "a", "active_level": "low", "bias": "pull_up" },
            { "type": "switch", "pin": 27, "key_off": "x", "key_on": "y" },
            { "type": "pot", "pin": 0, "spread": 20, "positions": [
                { "position": 1, "value": 100, "key": "1" },
                { "value": 500, "key": "2" }
            ] },
            { "type": "light", "pin": 1, "threshold": 500, "spread": 50, "key_above": "L", "key_below": "D" }
        ]
    }"#;

    #[test]
    fn parses_all_channel_types() {
        let config = Config::parse(CONFIG).unwrap();

        assert!(matches!(config.backend, Backend::Replay { .. }));
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.sink, SinkKind::Stdout);
        assert_eq!(config.channels.len(), 4);

        let kinds: Vec<SampleKind> = config.channels.iter().map(|c| c.channel().kind).collect();
        assert_eq!(kinds, [SampleKind::Digital, SampleKind::Digital, SampleKind::Analog, SampleKind::Analog]);

        let options = config.channels[0].digital_options().unwrap();
        assert_eq!(options.active_level, ActiveLevel::Low);
        assert_eq!(options.bias, Bias::PullUp);
        assert_eq!(config.channels[1].digital_options(), Some(DigitalOptions::default()));
        assert_eq!(config.channels[2].digital_options(), None);

        match &config.channels[2] {
            ChannelConfig::Pot { capacity, positions, .. } => {
                assert_eq!(*capacity, 10);
                assert_eq!(positions[0].position, Some(1));
                assert_eq!(positions[1].position, None);
            }
            other => panic!("expected a pot, got {:?}", other),
        }
    }

    #[test]
    fn keys_must_be_single_characters() {
        let json = r#"{
            "backend": { "kind": "replay", "path": "x" },
            "channels": [ { "type": "button", "pin": 1, "key": "ab" } ]
        }"#;
        assert!(Config::parse(json).is_err());
    }

    #[test]
    fn default_config_survives_save_and_load() {
        let path = std::env::temp_dir().join(format!("protokeys-config-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let created = Config::load_or_init(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.channels.len(), created.channels.len());
        assert_eq!(loaded.channels[0].channel(), Channel::digital(17));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn invalid_file_names_the_path() {
        let path = std::env::temp_dir().join(format!("protokeys-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("protokeys-bad-"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn failed_save_is_reported() {
        // Every write to /dev/full fails with ENOSPC.
        let path = Path::new("/dev/full");
        if !path.exists() {
            return;
        }

        let err = Config::default().save(path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(ref p, _) if p == path));
    }
}
