//! LED frame encoding.
//!
//! The 8 LEDs are driven from a single byte:
//!
//! | Bits | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0-4  | Temperature in whole °C, clamped to 0-31  |
//! | 5    | Precipitation likely                      |
//! | 6    | Forecast is the displayed source          |
//! | 7    | Weather alert active                      |

use super::Mode;

/// Status LEDs shown next to the temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusFlags {
    /// Precipitation probability at or above the threshold.
    pub precipitation: bool,
    /// The displayed temperature comes from the forecast.
    pub forecast_source: bool,
    /// At least one weather alert is active.
    pub alert: bool,
}

impl StatusFlags {
    /// Create a new set of flags.
    pub fn new(precipitation: bool, forecast_source: bool, alert: bool) -> Self {
        Self {
            precipitation,
            forecast_source,
            alert,
        }
    }
}

/// One byte pushed to the shift register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisplayFrame(pub u8);

impl DisplayFrame {
    /// Every LED dark.
    pub const BLANK: Self = Self(0);

    /// Highest temperature the 5-bit field can show.
    pub const MAX_TEMPERATURE: u8 = 31;

    /// Mask of the temperature field.
    pub const TEMPERATURE_MASK: u8 = 0b0001_1111;
    /// Precipitation LED.
    pub const PRECIPITATION_BIT: u8 = 1 << 5;
    /// Forecast-source LED.
    pub const FORECAST_BIT: u8 = 1 << 6;
    /// Alert LED.
    pub const ALERT_BIT: u8 = 1 << 7;

    /// Truncate toward zero and clamp into the 5-bit field.
    ///
    /// NaN maps to 0.
    pub fn clamp_temperature(celsius: f64) -> u8 {
        // `as` saturates and maps NaN to 0
        let whole = celsius.trunc() as i64;
        whole.clamp(0, Self::MAX_TEMPERATURE as i64) as u8
    }

    /// Encode a temperature and status flags.
    ///
    /// Out-of-range temperatures are clamped, never rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use pi_temp_display::data::{DisplayFrame, StatusFlags};
    ///
    /// let frame = DisplayFrame::encode(21.875, StatusFlags::new(true, false, false));
    /// assert_eq!(frame.bits(), 0b0011_0101);
    /// ```
    pub fn encode(celsius: f64, flags: StatusFlags) -> Self {
        let mut bits = Self::clamp_temperature(celsius);
        if flags.precipitation {
            bits |= Self::PRECIPITATION_BIT;
        }
        if flags.forecast_source {
            bits |= Self::FORECAST_BIT;
        }
        if flags.alert {
            bits |= Self::ALERT_BIT;
        }
        Self(bits)
    }

    /// Encode for the given mode.
    ///
    /// `Off` blanks the bank regardless of the other inputs, as does a mode
    /// with no reading available yet.
    pub fn for_mode(mode: Mode, reading: Option<f64>, flags: StatusFlags) -> Self {
        if mode.is_off() {
            return Self::BLANK;
        }
        match reading {
            Some(celsius) => Self::encode(celsius, flags),
            None => Self::BLANK,
        }
    }

    /// The raw byte.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// The temperature field.
    pub fn temperature(&self) -> u8 {
        self.0 & Self::TEMPERATURE_MASK
    }

    /// Decode the status flags.
    pub fn flags(&self) -> StatusFlags {
        StatusFlags {
            precipitation: self.0 & Self::PRECIPITATION_BIT != 0,
            forecast_source: self.0 & Self::FORECAST_BIT != 0,
            alert: self.0 & Self::ALERT_BIT != 0,
        }
    }
}

impl std::fmt::Display for DisplayFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010b}", self.0)
    }
}
