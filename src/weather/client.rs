//! HTTP client for the Pirate Weather API.
//!
//! Pirate Weather serves the Dark Sky forecast format, so the response is
//! decoded with [`ForecastResponse`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::quota::DailyQuota;
use super::response::ForecastResponse;
use super::ForecastProvider;
use crate::data::ForecastSnapshot;
use crate::error::{Error, Result};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.pirateweather.net";

/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Forecast client for a fixed location.
pub struct PirateWeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
    quota: DailyQuota,
}

impl PirateWeatherClient {
    /// Create a client for the given key and location.
    pub fn new(api_key: impl Into<String>, latitude: f64, longitude: f64, daily_limit: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            latitude,
            longitude,
            quota: DailyQuota::new(daily_limit),
        })
    }

    /// Point the client at a different server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The call budget.
    pub fn quota(&self) -> &DailyQuota {
        &self.quota
    }

    /// Request URL, without the key. Used for logging.
    fn redacted_url(&self) -> String {
        format!(
            "{}/forecast/***/{},{}",
            self.base_url, self.latitude, self.longitude
        )
    }

    fn url(&self) -> String {
        format!(
            "{}/forecast/{}/{},{}",
            self.base_url, self.api_key, self.latitude, self.longitude
        )
    }
}

#[async_trait]
impl ForecastProvider for PirateWeatherClient {
    async fn fetch(&self) -> Result<ForecastSnapshot> {
        let remaining = self.quota.try_acquire()?;
        debug!("GET {} ({} calls left today)", self.redacted_url(), remaining);

        let response = self
            .http
            .get(self.url())
            .query(&[("units", "si"), ("exclude", "minutely,hourly")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::WeatherApi {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let snapshot = ForecastResponse::from_json(&body)?.into_snapshot()?;

        info!(
            "Forecast: feels like {:.1}°C, {:.0}% rain, {} alert(s)",
            snapshot.apparent_temperature,
            snapshot.precip_probability * 100.0,
            snapshot.alerts.len()
        );
        Ok(snapshot)
    }
}
