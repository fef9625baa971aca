//! Dark Sky-compatible forecast response.
//!
//! Only the fields the display uses are modelled; everything else in the
//! payload is ignored.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::data::{ForecastSnapshot, WeatherAlert};
use crate::error::{Error, Result};

/// Top-level forecast document.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    /// Conditions right now.
    pub currently: Option<DataPoint>,
    /// Day-by-day outlook, today first.
    pub daily: Option<DataBlock>,
    /// Active alerts. Absent when there are none.
    #[serde(default)]
    pub alerts: Vec<AlertEntry>,
}

/// A block of data points.
#[derive(Debug, Clone, Deserialize)]
pub struct DataBlock {
    /// Data points, oldest first.
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

/// Conditions at one point in time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// UNIX time of the point.
    pub time: Option<i64>,
    /// Apparent ("feels like") temperature.
    pub apparent_temperature: Option<f64>,
    /// Probability of precipitation (0-1).
    pub precip_probability: Option<f64>,
}

/// One alert entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertEntry {
    /// Headline.
    pub title: String,
    /// "advisory", "watch" or "warning".
    pub severity: Option<String>,
    /// UNIX time the alert expires.
    pub expires: Option<i64>,
}

impl ForecastResponse {
    /// Parse a JSON body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Reduce to the snapshot the display needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if there is no current apparent
    /// temperature. A missing daily block counts as 0% precipitation.
    pub fn into_snapshot(self) -> Result<ForecastSnapshot> {
        let apparent_temperature = self
            .currently
            .as_ref()
            .and_then(|c| c.apparent_temperature)
            .ok_or_else(|| Error::InvalidData {
                context: "forecast has no currently.apparentTemperature".to_string(),
            })?;

        let precip_probability = self
            .daily
            .as_ref()
            .and_then(|d| d.data.first())
            .and_then(|today| today.precip_probability)
            .unwrap_or(0.0);

        let alerts = self
            .alerts
            .into_iter()
            .map(|a| WeatherAlert {
                title: a.title,
                severity: a.severity,
                expires: a.expires.and_then(unix_time),
            })
            .collect();

        Ok(ForecastSnapshot::new(
            apparent_temperature,
            precip_probability,
            alerts,
        ))
    }
}

fn unix_time(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
