//! # pi-temp-display
//!
//! A small home-automation display for a Raspberry Pi. It reads a DS18B20
//! 1-Wire temperature probe and a weather forecast, and shows one of them
//! on an 8-LED bank driven through a 74HC595 shift register, together with
//! rain, source and alert indicators. A pushbutton cycles the display
//! between off, probe and forecast.
//!
//! ## LED layout
//!
//! | Bits | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0-4  | Temperature in whole °C, clamped to 0-31  |
//! | 5    | Rain likely (≥ 50% today)                 |
//! | 6    | Showing the forecast temperature          |
//! | 7    | Weather alert active                      |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pi_temp_display::{
//!     Config, Controller, GpioLines, ModeSelector, PirateWeatherClient, Result,
//!     TemperatureSource, W1Probe,
//! };
//! use pi_temp_display::hw::ButtonMonitor;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let lines = GpioLines::open(&config.pins)?;
//!     let probe = W1Probe::discover(&config.probe_base)?;
//!     let client = PirateWeatherClient::new(
//!         config.api_key.clone(),
//!         config.latitude,
//!         config.longitude,
//!         config.daily_api_budget,
//!     )?;
//!
//!     let selector = Arc::new(ModeSelector::new(config.default_mode, config.debounce));
//!     let mut button = ButtonMonitor::new(lines.button, config.button_strategy, selector.clone());
//!     let source = TemperatureSource::new(probe, Box::new(client), &config);
//!
//!     let mut controller = Controller::new(lines.leds, selector, source, &config);
//!     controller
//!         .run(&mut button, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### 1-Wire
//! Enable the `w1-gpio` overlay (`dtoverlay=w1-gpio` in `config.txt`). The
//! probe then appears under `/sys/bus/w1/devices/28-*`.
//!
//! ### GPIO
//! The user running the daemon needs read/write access to
//! `/dev/gpiochip0`, usually via the `gpio` group.
//!
//! ### Weather
//! Forecasts come from a Dark Sky-compatible API. Set `PI_TEMP_API_KEY`;
//! the default schedule (4 calls/hour) stays well inside a 1000 calls/day
//! budget.

pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod hw;
pub mod probe;
pub mod temperature_source;
pub mod weather;

// Re-exports for convenience
pub use config::Config;
pub use controller::{Controller, ForecastSchedule};
pub use error::{Error, Result};
pub use probe::{ProbeReading, W1Probe};
pub use temperature_source::TemperatureSource;

// Re-export commonly used types from submodules
pub use data::{DisplayFrame, ForecastSnapshot, Mode, StatusFlags, WeatherAlert};
pub use hw::{ButtonStrategy, GpioLines, LedBank, ModeSelector, ShiftRegister};
pub use weather::{ForecastProvider, PirateWeatherClient};
