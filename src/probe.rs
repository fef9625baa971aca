//! DS18B20 1-Wire temperature probe.
//!
//! The kernel `w1_therm` driver exposes each probe as a directory named
//! `28-<serial>` containing a two-line `w1_slave` status file:
//!
//! ```text
//! 5e 01 4b 46 7f ff 0c 10 a4 : crc=a4 YES
//! 5e 01 4b 46 7f ff 0c 10 a4 t=21875
//! ```
//!
//! Line 1 ends with `YES` once the CRC of a fresh conversion checked out;
//! line 2 carries the temperature in millidegrees Celsius.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Family code prefix of DS18B20 device directories.
const FAMILY_PREFIX: &str = "28";

/// Name of the status file inside a device directory.
const STATUS_FILE: &str = "w1_slave";

/// Marker at the end of line 1 for a valid reading.
const READY_MARKER: &str = "YES";

/// One temperature sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReading {
    /// Temperature in degrees Celsius.
    pub celsius: f64,
    /// When the sample was taken.
    pub taken_at: DateTime<Utc>,
}

impl ProbeReading {
    /// Create a reading taken now.
    pub fn new(celsius: f64) -> Self {
        Self {
            celsius,
            taken_at: Utc::now(),
        }
    }
}

/// Parse the contents of a `w1_slave` file.
///
/// Returns `Ok(None)` while the probe has not flagged the reading as ready.
///
/// # Example
///
/// ```
/// use pi_temp_display::probe::parse_w1_slave;
///
/// let text = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=21875\n";
/// assert_eq!(parse_w1_slave(text).unwrap(), Some(21.875));
/// ```
pub fn parse_w1_slave(text: &str) -> Result<Option<f64>> {
    let mut lines = text.lines();

    let status = lines.next().ok_or_else(|| Error::InvalidData {
        context: "empty w1_slave file".to_string(),
    })?;
    if !status.trim_end().ends_with(READY_MARKER) {
        return Ok(None);
    }

    let data = lines.next().ok_or_else(|| Error::InvalidData {
        context: "w1_slave is missing the temperature line".to_string(),
    })?;
    let pos = data.find("t=").ok_or_else(|| Error::InvalidData {
        context: format!("no t= token in {:?}", data),
    })?;

    let raw = data[pos + 2..].trim();
    let millidegrees: i64 = raw.parse().map_err(|_| Error::InvalidData {
        context: format!("non-numeric temperature {:?}", raw),
    })?;

    Ok(Some(millidegrees as f64 / 1000.0))
}

/// A probe attached to the 1-Wire bus.
#[derive(Debug, Clone)]
pub struct W1Probe {
    device_file: PathBuf,
}

impl W1Probe {
    /// Use a known status file directly.
    pub fn new(device_file: impl Into<PathBuf>) -> Self {
        Self {
            device_file: device_file.into(),
        }
    }

    /// Locate the first `28*` device below `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProbeNotFound`] if `base` cannot be listed, holds no
    /// DS18B20 device, or the device has no readable status file.
    pub fn discover(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let not_found = || Error::ProbeNotFound {
            base: base.to_path_buf(),
        };

        let mut devices: Vec<PathBuf> = std::fs::read_dir(base)
            .map_err(|_| not_found())?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(FAMILY_PREFIX))
            .map(|entry| entry.path())
            .collect();
        devices.sort();

        let device_file = devices
            .first()
            .map(|dir| dir.join(STATUS_FILE))
            .ok_or_else(not_found)?;

        // Opening it once surfaces permission problems at startup.
        std::fs::File::open(&device_file).map_err(|_| not_found())?;

        debug!("Using temperature probe at {}", device_file.display());
        Ok(Self { device_file })
    }

    /// Path of the status file.
    pub fn device_file(&self) -> &Path {
        &self.device_file
    }

    /// Read the status file once.
    pub async fn read_raw(&self) -> Result<String> {
        Ok(tokio::fs::read_to_string(&self.device_file).await?)
    }

    /// Wait for a ready reading and return it.
    ///
    /// Re-reads the status file every `poll` until line 1 ends in `YES`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProbeNotReady`] once `timeout` has elapsed without a
    /// ready line, or an I/O error if the file disappears.
    pub async fn read(&self, poll: Duration, timeout: Duration) -> Result<ProbeReading> {
        let started = Instant::now();

        loop {
            let text = self.read_raw().await?;
            if let Some(celsius) = parse_w1_slave(&text)? {
                trace!("Probe read {:.3}°C", celsius);
                return Ok(ProbeReading::new(celsius));
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(Error::ProbeNotReady { waited });
            }
            tokio::time::sleep(poll.min(timeout - waited)).await;
        }
    }
}
