//! Probe and forecast readings behind a single source.
//!
//! The fast tick refreshes the probe, the slow schedule refreshes the
//! forecast, and the display asks for the reading that matches its mode.
//! A failed refresh never discards what was there before: the previous
//! value stays and is marked stale.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::data::{ForecastSnapshot, Mode, StatusFlags};
use crate::error::Result;
use crate::probe::{ProbeReading, W1Probe};
use crate::weather::ForecastProvider;

/// Owns the latest probe reading and forecast snapshot.
pub struct TemperatureSource {
    probe: W1Probe,
    forecaster: Box<dyn ForecastProvider>,
    probe_reading: Option<ProbeReading>,
    probe_stale: bool,
    forecast: Option<ForecastSnapshot>,
    forecast_stale: bool,
    precip_threshold: f64,
    probe_poll: Duration,
    probe_ready_timeout: Duration,
}

impl TemperatureSource {
    /// Create a source with nothing read yet.
    pub fn new(probe: W1Probe, forecaster: Box<dyn ForecastProvider>, config: &Config) -> Self {
        Self {
            probe,
            forecaster,
            probe_reading: None,
            probe_stale: true,
            forecast: None,
            forecast_stale: true,
            precip_threshold: config.precip_threshold,
            probe_poll: config.probe_poll,
            probe_ready_timeout: config.probe_ready_timeout,
        }
    }

    /// Read the probe, waiting for a ready sample.
    ///
    /// On failure the previous reading is kept and marked stale.
    pub async fn refresh_probe(&mut self) -> Result<f64> {
        match self.probe.read(self.probe_poll, self.probe_ready_timeout).await {
            Ok(reading) => {
                debug!("Probe reading {:.3}°C", reading.celsius);
                self.probe_reading = Some(reading);
                self.probe_stale = false;
                Ok(reading.celsius)
            }
            Err(e) => {
                self.probe_stale = true;
                Err(e)
            }
        }
    }

    /// Fetch a new forecast.
    ///
    /// Call this on the slow schedule only; each call spends a
    /// rate-limited API request. On failure the previous snapshot is kept
    /// and marked stale.
    pub async fn refresh_forecast(&mut self) -> Result<()> {
        match self.forecaster.fetch().await {
            Ok(snapshot) => {
                self.set_forecast(snapshot);
                Ok(())
            }
            Err(e) => {
                self.mark_forecast_stale();
                Err(e)
            }
        }
    }

    /// Replace the forecast snapshot.
    pub fn set_forecast(&mut self, snapshot: ForecastSnapshot) {
        self.forecast = Some(snapshot);
        self.forecast_stale = false;
    }

    /// Flag the current snapshot as out of date.
    pub fn mark_forecast_stale(&mut self) {
        if self.forecast.is_some() && !self.forecast_stale {
            warn!("Keeping last forecast, now stale");
        }
        self.forecast_stale = true;
    }

    /// Whether the last forecast refresh failed or none has succeeded.
    pub fn is_forecast_stale(&self) -> bool {
        self.forecast_stale
    }

    /// Whether the last probe refresh failed or none has succeeded.
    pub fn is_probe_stale(&self) -> bool {
        self.probe_stale
    }

    /// The last probe reading.
    pub fn probe_reading(&self) -> Option<ProbeReading> {
        self.probe_reading
    }

    /// The last forecast snapshot.
    pub fn forecast(&self) -> Option<&ForecastSnapshot> {
        self.forecast.as_ref()
    }

    /// The temperature to show in `mode`.
    ///
    /// `None` for [`Mode::Off`] and for a source that has not produced a
    /// value yet.
    pub fn current_reading(&self, mode: Mode) -> Option<f64> {
        match mode {
            Mode::Off => None,
            Mode::ProbeTemperature => self.probe_reading.map(|r| r.celsius),
            Mode::ForecastTemperature => self.forecast.as_ref().map(|f| f.apparent_temperature),
        }
    }

    /// Today's precipitation probability is at or above the threshold.
    pub fn precipitation_flag(&self) -> bool {
        self.forecast
            .as_ref()
            .is_some_and(|f| f.is_rain_likely(self.precip_threshold))
    }

    /// At least one weather alert is active.
    pub fn alert_flag(&self) -> bool {
        self.forecast.as_ref().is_some_and(|f| f.has_alerts())
    }

    /// Status LEDs for `mode`.
    pub fn status_flags(&self, mode: Mode) -> StatusFlags {
        StatusFlags::new(self.precipitation_flag(), mode.is_forecast(), self.alert_flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WeatherAlert;
    use crate::error::Error;
    use crate::probe::tests::{fake_device, scratch_dir, NOT_READY, READY};
    use crate::weather::MockForecastProvider;

    fn config() -> Config {
        Config {
            probe_poll: Duration::from_millis(5),
            probe_ready_timeout: Duration::from_millis(20),
            ..Config::default()
        }
    }

    fn source(contents: &str, forecaster: MockForecastProvider) -> TemperatureSource {
        let base = scratch_dir("source");
        let file = fake_device(&base, "28-0000075c1a2b", contents);
        TemperatureSource::new(W1Probe::new(file), Box::new(forecaster), &config())
    }

    fn snapshot(apparent: f64, precip: f64, alerts: usize) -> ForecastSnapshot {
        let alerts = (0..alerts)
            .map(|i| WeatherAlert {
                title: format!("alert {}", i),
                severity: None,
                expires: None,
            })
            .collect();
        ForecastSnapshot::new(apparent, precip, alerts)
    }

    #[tokio::test]
    async fn test_probe_refresh() {
        let mut source = source(READY, MockForecastProvider::new());
        assert!(source.is_probe_stale());
        assert_eq!(source.current_reading(Mode::ProbeTemperature), None);

        assert_eq!(source.refresh_probe().await.unwrap(), 21.875);
        assert!(!source.is_probe_stale());
        assert_eq!(source.current_reading(Mode::ProbeTemperature), Some(21.875));
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_reading() {
        let base = scratch_dir("source-flaky");
        let file = fake_device(&base, "28-01", READY);
        let mut source = TemperatureSource::new(
            W1Probe::new(file.clone()),
            Box::new(MockForecastProvider::new()),
            &config(),
        );
        source.refresh_probe().await.unwrap();

        std::fs::write(&file, NOT_READY).unwrap();
        let err = source.refresh_probe().await.unwrap_err();
        assert!(matches!(err, Error::ProbeNotReady { .. }));
        assert!(source.is_probe_stale());
        assert_eq!(source.current_reading(Mode::ProbeTemperature), Some(21.875));
    }

    #[tokio::test]
    async fn test_forecast_refresh_and_flags() {
        let mut forecaster = MockForecastProvider::new();
        forecaster
            .expect_fetch()
            .times(1)
            .returning(|| Ok(snapshot(7.5, 0.5, 1)));

        let mut source = source(READY, forecaster);
        assert!(!source.precipitation_flag());
        assert!(!source.alert_flag());

        source.refresh_forecast().await.unwrap();
        assert!(!source.is_forecast_stale());
        assert_eq!(source.current_reading(Mode::ForecastTemperature), Some(7.5));
        assert!(source.precipitation_flag());
        assert!(source.alert_flag());
        assert_eq!(
            source.status_flags(Mode::ForecastTemperature),
            StatusFlags::new(true, true, true)
        );
        assert_eq!(
            source.status_flags(Mode::ProbeTemperature),
            StatusFlags::new(true, false, true)
        );
    }

    #[tokio::test]
    async fn test_forecast_failure_keeps_snapshot() {
        let mut forecaster = MockForecastProvider::new();
        let mut calls = 0;
        forecaster.expect_fetch().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(snapshot(3.0, 0.2, 0))
            } else {
                Err(Error::WeatherApi { status: 503 })
            }
        });

        let mut source = source(READY, forecaster);
        source.refresh_forecast().await.unwrap();
        let err = source.refresh_forecast().await.unwrap_err();

        assert!(err.is_recoverable());
        assert!(source.is_forecast_stale());
        assert_eq!(source.current_reading(Mode::ForecastTemperature), Some(3.0));
    }

    #[test]
    fn test_off_has_no_reading() {
        let mut source = source(READY, MockForecastProvider::new());
        source.set_forecast(snapshot(10.0, 0.9, 0));
        assert_eq!(source.current_reading(Mode::Off), None);
    }

    #[test]
    fn test_precipitation_threshold_inclusive() {
        let mut source = source(READY, MockForecastProvider::new());
        source.set_forecast(snapshot(10.0, 0.5, 0));
        assert!(source.precipitation_flag());

        source.set_forecast(snapshot(10.0, 0.4999, 0));
        assert!(!source.precipitation_flag());
    }

    #[test]
    fn test_expired_alert_leaves_flag_off() {
        let mut source = source(READY, MockForecastProvider::new());
        let mut forecast = snapshot(10.0, 0.1, 0);
        forecast.alerts.push(WeatherAlert {
            title: "Wind".to_string(),
            severity: Some("advisory".to_string()),
            expires: Some(chrono::Utc::now() - chrono::Duration::minutes(30)),
        });
        source.set_forecast(forecast);
        assert!(!source.alert_flag());
        assert!(!source.status_flags(Mode::ForecastTemperature).alert);
    }
}
