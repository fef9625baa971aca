//! Daily API call budget.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::warn;

use crate::error::{Error, Result};

/// Counts API calls per UTC day and refuses calls over the limit.
pub struct DailyQuota {
    limit: u32,
    used: Mutex<(NaiveDate, u32)>,
}

impl DailyQuota {
    /// Create a quota allowing `limit` calls per UTC day.
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            used: Mutex::new((Utc::now().date_naive(), 0)),
        }
    }

    /// The daily limit.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Spend one call now.
    pub fn try_acquire(&self) -> Result<u32> {
        self.try_acquire_at(Utc::now())
    }

    /// Spend one call at `now`.
    ///
    /// Returns the calls left today.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QuotaExhausted`] if today's budget is spent.
    pub fn try_acquire_at(&self, now: DateTime<Utc>) -> Result<u32> {
        let mut used = self.used.lock();
        let today = now.date_naive();

        if used.0 != today {
            *used = (today, 0);
        }

        if used.1 >= self.limit {
            warn!("Weather API budget of {} calls for {} spent", self.limit, today);
            return Err(Error::QuotaExhausted { limit: self.limit });
        }

        used.1 += 1;
        Ok(self.limit - used.1)
    }

    /// Calls spent on the current day.
    pub fn used_today(&self) -> u32 {
        let used = self.used.lock();
        if used.0 == Utc::now().date_naive() {
            used.1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_quota_exhausts() {
        let quota = DailyQuota::new(2);
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        assert_eq!(quota.try_acquire_at(now).unwrap(), 1);
        assert_eq!(quota.try_acquire_at(now).unwrap(), 0);
        assert!(matches!(
            quota.try_acquire_at(now),
            Err(Error::QuotaExhausted { limit: 2 })
        ));
    }

    #[test]
    fn test_quota_resets_at_midnight() {
        let quota = DailyQuota::new(1);
        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 0).unwrap();
        let morning = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 1).unwrap();

        assert!(quota.try_acquire_at(evening).is_ok());
        assert!(quota.try_acquire_at(evening).is_err());
        assert_eq!(quota.try_acquire_at(morning).unwrap(), 0);
    }
}
