//! Weather forecast collaborator.
//!
//! The display only needs three things from a forecast: the apparent
//! temperature, today's precipitation probability and the active alerts.
//! [`ForecastProvider`] abstracts where they come from.

pub mod client;
pub mod quota;
pub mod response;

use async_trait::async_trait;

use crate::data::ForecastSnapshot;
use crate::error::Result;

pub use client::PirateWeatherClient;
pub use quota::DailyQuota;

/// Source of forecast snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetch a fresh snapshot.
    ///
    /// Every call may spend a rate-limited API request.
    async fn fetch(&self) -> Result<ForecastSnapshot>;
}
