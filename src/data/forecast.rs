//! Weather forecast data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An active weather alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherAlert {
    /// Short headline of the alert.
    pub title: String,
    /// Severity as reported by the provider ("advisory", "watch", "warning").
    pub severity: Option<String>,
    /// When the alert stops being active.
    pub expires: Option<DateTime<Utc>>,
}

impl WeatherAlert {
    /// Whether the alert is still in force at `now`.
    ///
    /// Alerts without an expiry stay active until the next fetch drops them.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.map_or(true, |expires| expires > now)
    }
}

/// The part of a forecast the display cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    /// "Feels-like" temperature right now, in Celsius.
    pub apparent_temperature: f64,
    /// Probability of precipitation today (0.0 - 1.0).
    pub precip_probability: f64,
    /// Alerts that are currently active. May be empty.
    pub alerts: Vec<WeatherAlert>,
    /// When the snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl ForecastSnapshot {
    /// Create a snapshot fetched now.
    pub fn new(apparent_temperature: f64, precip_probability: f64, alerts: Vec<WeatherAlert>) -> Self {
        Self {
            apparent_temperature,
            precip_probability: precip_probability.clamp(0.0, 1.0),
            alerts,
            fetched_at: Utc::now(),
        }
    }

    /// Whether rain is likely enough to light the precipitation LED.
    ///
    /// The threshold is inclusive: a probability equal to it counts.
    pub fn is_rain_likely(&self, threshold: f64) -> bool {
        self.precip_probability >= threshold
    }

    /// Whether any alert is active right now.
    pub fn has_alerts(&self) -> bool {
        self.has_alerts_at(Utc::now())
    }

    /// Whether any alert is active at `now`. Expired alerts are ignored.
    pub fn has_alerts_at(&self, now: DateTime<Utc>) -> bool {
        self.alerts.iter().any(|alert| alert.is_active_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rain_threshold_is_inclusive() {
        let snapshot = ForecastSnapshot::new(12.0, 0.5, Vec::new());
        assert!(snapshot.is_rain_likely(0.5));

        let snapshot = ForecastSnapshot::new(12.0, 0.49, Vec::new());
        assert!(!snapshot.is_rain_likely(0.5));
    }

    #[test]
    fn test_probability_clamped() {
        assert_eq!(ForecastSnapshot::new(0.0, 1.7, Vec::new()).precip_probability, 1.0);
        assert_eq!(ForecastSnapshot::new(0.0, -0.2, Vec::new()).precip_probability, 0.0);
    }

    #[test]
    fn test_alerts() {
        let mut snapshot = ForecastSnapshot::new(3.0, 0.1, Vec::new());
        assert!(!snapshot.has_alerts());

        snapshot.alerts.push(WeatherAlert {
            title: "Yellow warning of ice".to_string(),
            severity: Some("warning".to_string()),
            expires: None,
        });
        assert!(snapshot.has_alerts());
    }

    #[test]
    fn test_expired_alerts_are_inactive() {
        let now = Utc::now();
        let alert = |expires| WeatherAlert {
            title: "Frost".to_string(),
            severity: Some("advisory".to_string()),
            expires,
        };

        let mut snapshot = ForecastSnapshot::new(-1.0, 0.0, vec![alert(Some(now - chrono::Duration::hours(2)))]);
        assert!(!snapshot.has_alerts_at(now));
        assert!(!snapshot.has_alerts());

        // Expiry is exclusive
        snapshot.alerts.push(alert(Some(now)));
        assert!(!snapshot.has_alerts_at(now));

        snapshot.alerts.push(alert(Some(now + chrono::Duration::hours(6))));
        assert!(snapshot.has_alerts_at(now));
        assert!(snapshot.has_alerts());
    }
}
