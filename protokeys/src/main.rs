mod app;
mod config;
mod sink;

use std::thread;
use std::time::Duration;
use dotenv::dotenv;
use log::{debug, info};
use sysinfo::System;
use protokeys_input::gpiod::GpiodDriver;
use protokeys_input::iio::IioDriver;
use protokeys_input::linux::LinuxDriver;
use protokeys_input::mock::ScriptedDriver;
use protokeys_input::{InputDriver, InputError};
use crate::app::App;
use crate::config::{Backend, Config};

fn open_driver(backend: &Backend) -> eyre::Result<Box<dyn InputDriver>> {
    let driver: Box<dyn InputDriver> = match backend {
        Backend::Gpiod { chip, iio_device, adc_max } => {
            let gpio = GpiodDriver::open(chip)?;
            let adc = match iio_device {
                Some(index) => {
                    let adc = IioDriver::get_device(*index)?;
                    Some(match adc_max {
                        Some(max) => adc.with_max_value(*max),
                        None => adc,
                    })
                }
                None => None,
            };
            Box::new(LinuxDriver::new(gpio, adc))
        }
        Backend::Replay { path } => Box::new(ScriptedDriver::from_file(path)?),
    };
    Ok(driver)
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("protokeys v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Host {} ({}, kernel {}, {})",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    let config_path = Config::path();
    debug!("Trying to load config from {:?}...", config_path);
    let config = Config::load_or_init(&config_path)?;
    info!("Config loaded, {} channels.", config.channels.len());

    debug!("Initializing input driver...");
    let driver = open_driver(&config.backend)?;
    debug!("{:?} initialized.", driver);

    let replay = matches!(config.backend, Backend::Replay { .. });
    let sink = sink::from_kind(config.sink);
    let mut app = App::new(&*driver, &config.channels, sink)?;

    let interval = Duration::from_millis(config.poll_interval_ms);
    info!("Starting poll loop, every {:?}...", interval);

    loop {
        if let Err(err) = app.update() {
            // A replay ends when its first script runs out.
            if let (true, Some(InputError::ChannelUnavailable(reason))) =
                (replay, err.downcast_ref::<InputError>())
            {
                info!("Replay finished after {} ticks ({}).", app.ticks(), reason);
                return Ok(());
            }
            return Err(err);
        }

        thread::sleep(interval);
    }
}
