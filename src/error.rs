//! Error types for the pi-temp-display crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem or device I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No 1-Wire temperature probe could be located.
    #[error("Temperature probe not found under {}", .base.display())]
    ProbeNotFound {
        /// The directory that was searched.
        base: PathBuf,
    },

    /// The probe never reported a fresh reading.
    #[error("Probe not ready after {waited:?}")]
    ProbeNotReady {
        /// How long the reader waited before giving up.
        waited: Duration,
    },

    /// Invalid data was read from a collaborator.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// A GPIO line could not be claimed, read or driven.
    #[error("GPIO error: {reason}")]
    Gpio {
        /// Description of the failure.
        reason: String,
    },

    /// HTTP transport error from the weather client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The weather API answered with a non-success status.
    #[error("Weather API returned status {status}")]
    WeatherApi {
        /// The HTTP status code.
        status: u16,
    },

    /// The daily weather API budget has been spent.
    #[error("Weather API quota of {limit} calls/day exhausted")]
    QuotaExhausted {
        /// The configured daily limit.
        limit: u32,
    },

    /// JSON decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required configuration value is absent.
    #[error("Missing configuration: {name}")]
    MissingConfig {
        /// The name of the missing setting.
        name: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },
}

impl Error {
    /// Wrap a GPIO driver error.
    pub(crate) fn gpio(err: impl std::fmt::Debug) -> Self {
        Self::Gpio {
            reason: format!("{:?}", err),
        }
    }

    /// Whether the daemon can keep running after this error.
    ///
    /// Hardware and probe discovery failures are fatal; everything coming
    /// from the weather collaborator or a slow probe is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProbeNotReady { .. }
                | Self::InvalidData { .. }
                | Self::Http(_)
                | Self::WeatherApi { .. }
                | Self::QuotaExhausted { .. }
                | Self::Json(_)
        )
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
