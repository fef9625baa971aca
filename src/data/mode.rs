//! Display mode selected by the pushbutton.

/// Which temperature the LED bank shows.
///
/// Each accepted button press advances to the next variant, wrapping
/// `ForecastTemperature` back to `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Mode {
    /// All LEDs dark.
    Off = 0,
    /// Temperature measured by the local 1-Wire probe.
    #[default]
    ProbeTemperature = 1,
    /// Apparent temperature from the weather forecast.
    ForecastTemperature = 2,
}

impl Mode {
    /// Number of modes in the cycle.
    pub const COUNT: u8 = 3;

    /// Create from raw value, taken modulo [`Mode::COUNT`].
    pub fn from_raw(value: u8) -> Self {
        match value % Self::COUNT {
            0 => Self::Off,
            1 => Self::ProbeTemperature,
            _ => Self::ForecastTemperature,
        }
    }

    /// The mode selected by the next button press.
    pub fn next(self) -> Self {
        Self::from_raw(self as u8 + 1)
    }

    /// Check if the display is switched off.
    pub fn is_off(&self) -> bool {
        matches!(self, Self::Off)
    }

    /// Check if the forecast is the displayed source.
    pub fn is_forecast(&self) -> bool {
        matches!(self, Self::ForecastTemperature)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::ProbeTemperature => write!(f, "Probe"),
            Self::ForecastTemperature => write!(f, "Forecast"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "probe" => Ok(Self::ProbeTemperature),
            "forecast" => Ok(Self::ForecastTemperature),
            other => Err(crate::Error::InvalidParameter {
                name: "mode".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
