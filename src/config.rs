//! Daemon configuration.
//!
//! The hardware wiring and thresholds are fixed constants. Only the
//! weather API credentials and location come from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::data::Mode;
use crate::error::{Error, Result};
use crate::hw::ButtonStrategy;

/// Environment variable holding the weather API key.
pub const ENV_API_KEY: &str = "PI_TEMP_API_KEY";
/// Environment variable overriding the latitude.
pub const ENV_LATITUDE: &str = "PI_TEMP_LATITUDE";
/// Environment variable overriding the longitude.
pub const ENV_LONGITUDE: &str = "PI_TEMP_LONGITUDE";
/// Environment variable selecting the button strategy (`edge` or `polled`).
pub const ENV_BUTTON: &str = "PI_TEMP_BUTTON";
/// Environment variable overriding the 1-Wire device directory.
pub const ENV_PROBE_BASE: &str = "PI_TEMP_PROBE_BASE";

/// GPIO line assignment (BCM numbering).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinConfig {
    /// GPIO character device.
    pub chip: PathBuf,
    /// Shift register serial data (SDI).
    pub data: u32,
    /// Shift register storage clock (RCLK).
    pub latch: u32,
    /// Shift register shift clock (SRCLK).
    pub clock: u32,
    /// Mode pushbutton, active low.
    pub button: u32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            chip: PathBuf::from("/dev/gpiochip0"),
            data: 17,
            latch: 18,
            clock: 27,
            button: 25,
        }
    }
}

/// Full daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// GPIO lines.
    pub pins: PinConfig,
    /// Directory holding 1-Wire devices.
    pub probe_base: PathBuf,
    /// Interval between probe status re-reads while waiting for `YES`.
    pub probe_poll: Duration,
    /// Give up waiting for a ready probe after this long.
    pub probe_ready_timeout: Duration,
    /// Weather API key.
    pub api_key: String,
    /// Forecast latitude.
    pub latitude: f64,
    /// Forecast longitude.
    pub longitude: f64,
    /// Precipitation probability at or above which the rain LED lights.
    pub precip_threshold: f64,
    /// Daily weather API call budget.
    pub daily_api_budget: u32,
    /// Minutes past the hour at which the forecast is refreshed.
    pub forecast_minutes: Vec<u32>,
    /// Display refresh interval.
    pub fast_tick: Duration,
    /// Button level-check interval for the polled strategy.
    pub button_poll: Duration,
    /// Presses closer together than this are treated as bounce.
    pub debounce: Duration,
    /// How presses are detected.
    pub button_strategy: ButtonStrategy,
    /// Mode at startup.
    pub default_mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            probe_base: PathBuf::from("/sys/bus/w1/devices"),
            probe_poll: Duration::from_millis(200),
            probe_ready_timeout: Duration::from_secs(5),
            api_key: String::new(),
            latitude: 52.449851,
            longitude: -1.930616,
            precip_threshold: 0.5,
            daily_api_budget: 1000,
            forecast_minutes: vec![0, 15, 30, 45],
            fast_tick: Duration::from_secs(1),
            button_poll: Duration::from_millis(200),
            debounce: Duration::from_millis(300),
            button_strategy: ButtonStrategy::Edge,
            default_mode: Mode::ProbeTemperature,
        }
    }
}

impl Config {
    /// Minimum accepted debounce window.
    pub const MIN_DEBOUNCE: Duration = Duration::from_millis(200);

    /// Build a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] when no API key is set and
    /// [`Error::InvalidParameter`] for unparseable overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.api_key = lookup(ENV_API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::MissingConfig {
                name: ENV_API_KEY.to_string(),
            })?;

        if let Some(value) = lookup(ENV_LATITUDE) {
            config.latitude = parse_coordinate(ENV_LATITUDE, &value, 90.0)?;
        }
        if let Some(value) = lookup(ENV_LONGITUDE) {
            config.longitude = parse_coordinate(ENV_LONGITUDE, &value, 180.0)?;
        }
        if let Some(value) = lookup(ENV_BUTTON) {
            config.button_strategy = value.parse()?;
        }
        if let Some(value) = lookup(ENV_PROBE_BASE) {
            config.probe_base = PathBuf::from(value);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the fixed thresholds for consistency.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.precip_threshold) {
            return Err(invalid("precip_threshold", self.precip_threshold));
        }
        if self.debounce < Self::MIN_DEBOUNCE {
            return Err(invalid("debounce", format!("{:?}", self.debounce)));
        }
        if self.forecast_minutes.is_empty() || self.forecast_minutes.iter().any(|&m| m >= 60) {
            return Err(invalid("forecast_minutes", format!("{:?}", self.forecast_minutes)));
        }
        if self.daily_api_budget == 0 {
            return Err(invalid("daily_api_budget", self.daily_api_budget));
        }

        let pins = &self.pins;
        let lines = [pins.data, pins.latch, pins.clock, pins.button];
        for (i, line) in lines.iter().enumerate() {
            if lines[i + 1..].contains(line) {
                return Err(invalid("pins", format!("line {} assigned twice", line)));
            }
        }

        Ok(())
    }

    /// Forecast calls per day implied by the refresh schedule.
    pub fn scheduled_calls_per_day(&self) -> u32 {
        self.forecast_minutes.len() as u32 * 24
    }
}

fn parse_coordinate(name: &str, value: &str, limit: f64) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.abs() <= limit)
        .ok_or_else(|| invalid(name, value))
}

fn invalid(name: &str, value: impl ToString) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    }
}
