//! Display driver loop.
//!
//! A single task runs every job in turn, so the mode selector and the
//! temperature source are never touched by two jobs at once:
//!
//! - **Fast tick** (every second): refresh the probe, encode the frame for
//!   the current mode and latch it onto the LEDs.
//! - **Forecast refresh** (fixed minutes past the hour): fetch a new
//!   forecast snapshot.
//! - **Button**: watched next to the jobs; a press re-renders straight
//!   away.
//! - **Shutdown**: blank the LEDs and drive the lines low.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Timelike};
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::data::DisplayFrame;
use crate::error::Result;
use crate::hw::{ButtonMonitor, LedBank, ModeSelector};
use crate::temperature_source::TemperatureSource;

/// Wall-clock schedule firing at fixed minutes past each hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastSchedule {
    minutes: Vec<u32>,
}

impl ForecastSchedule {
    /// Create a schedule. Minutes outside 0-59 are dropped.
    pub fn new(minutes: &[u32]) -> Self {
        let mut minutes: Vec<u32> = minutes.iter().copied().filter(|&m| m < 60).collect();
        minutes.sort_unstable();
        minutes.dedup();
        if minutes.is_empty() {
            minutes.push(0);
        }
        Self { minutes }
    }

    /// The configured minutes, ascending.
    pub fn minutes(&self) -> &[u32] {
        &self.minutes
    }

    /// The first scheduled instant strictly after `now`.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let into_hour = chrono::Duration::minutes(i64::from(now.minute()))
            + chrono::Duration::seconds(i64::from(now.second()))
            + chrono::Duration::nanoseconds(i64::from(now.nanosecond()));
        let hour_start = now.clone() - into_hour;

        (0..2)
            .flat_map(|hour| {
                self.minutes.iter().map(move |&m| {
                    chrono::Duration::hours(hour) + chrono::Duration::minutes(i64::from(m))
                })
            })
            .map(|offset| hour_start.clone() + offset)
            .find(|at| at > now)
            .unwrap_or_else(|| hour_start.clone() + chrono::Duration::hours(1))
    }

    /// Time from `now` until the next scheduled instant.
    pub fn until_next<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        (self.next_after(now) - now.clone())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Owns the hardware and readings and runs the jobs.
pub struct Controller<L: LedBank> {
    leds: L,
    selector: Arc<ModeSelector>,
    source: TemperatureSource,
    schedule: ForecastSchedule,
    fast_tick: Duration,
    button_poll: Duration,
    last_frame: Option<DisplayFrame>,
}

impl<L: LedBank> Controller<L> {
    /// Assemble a controller.
    pub fn new(leds: L, selector: Arc<ModeSelector>, source: TemperatureSource, config: &Config) -> Self {
        Self {
            leds,
            selector,
            source,
            schedule: ForecastSchedule::new(&config.forecast_minutes),
            fast_tick: config.fast_tick,
            button_poll: config.button_poll,
            last_frame: None,
        }
    }

    /// The LED bank.
    pub fn leds(&self) -> &L {
        &self.leds
    }

    /// The mode selector.
    pub fn selector(&self) -> &Arc<ModeSelector> {
        &self.selector
    }

    /// The temperature source.
    pub fn source(&self) -> &TemperatureSource {
        &self.source
    }

    /// The temperature source, mutably.
    pub fn source_mut(&mut self) -> &mut TemperatureSource {
        &mut self.source
    }

    /// The last frame written to the LEDs.
    pub fn last_frame(&self) -> Option<DisplayFrame> {
        self.last_frame
    }

    /// Encode the current state and latch it onto the LEDs.
    pub fn render(&mut self) -> Result<DisplayFrame> {
        let mode = self.selector.current_mode();
        let reading = self.source.current_reading(mode);
        let flags = self.source.status_flags(mode);
        let frame = DisplayFrame::for_mode(mode, reading, flags);

        self.leds.show(frame)?;

        if self.last_frame != Some(frame) {
            debug!("Display {} (mode {}, reading {:?})", frame, mode, reading);
        }
        self.last_frame = Some(frame);
        Ok(frame)
    }

    /// Refresh the probe and redraw.
    ///
    /// A probe that fails to answer keeps its previous reading; only a
    /// failure to drive the LEDs is returned.
    pub async fn fast_tick(&mut self) -> Result<DisplayFrame> {
        if let Err(e) = self.source.refresh_probe().await {
            warn!("Probe refresh failed: {}", e);
        }
        self.render()
    }

    /// Refresh the forecast. Failures are logged and the last snapshot kept.
    pub async fn slow_tick(&mut self) {
        if let Err(e) = self.source.refresh_forecast().await {
            warn!("Forecast refresh failed: {}", e);
        }
    }

    /// Run until `shutdown` completes or the hardware fails.
    ///
    /// The button is watched alongside the display jobs, so presses are
    /// seen while a tick is busy reading the probe. The forecast is fetched
    /// once before the first tick; `shutdown` can interrupt that fetch. The
    /// LEDs are released on every exit path.
    pub async fn run<P, S>(&mut self, button: &mut ButtonMonitor<P>, shutdown: S) -> Result<()>
    where
        P: InputPin + Wait,
        S: Future<Output = ()>,
    {
        info!(
            "Starting display loop (tick {:?}, forecast at minutes {:?}, button {})",
            self.fast_tick,
            self.schedule.minutes(),
            button.strategy()
        );

        let poll = self.button_poll;
        let result = {
            let presses = button.run(poll);
            let display = self.display_loop();
            tokio::pin!(shutdown, presses, display);

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    Ok(())
                }
                res = &mut presses => res,
                res = &mut display => res,
            }
        };

        match (result, self.shutdown()) {
            (Err(e), Err(release)) => {
                warn!("Display loop stopped: {}", e);
                warn!("Failed to release LEDs: {}", release);
                Err(e)
            }
            (Err(e), Ok(())) => {
                warn!("Display loop stopped: {}", e);
                Err(e)
            }
            (Ok(()), release) => release,
        }
    }

    /// The display jobs. Only returns when the LEDs cannot be driven.
    async fn display_loop(&mut self) -> Result<()> {
        self.slow_tick().await;

        let selector = self.selector.clone();
        let mut fast = tokio::time::interval(self.fast_tick);
        fast.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let (mut due, mut deadline) = self.next_forecast(Local::now());

        loop {
            tokio::select! {
                biased;

                _ = selector.changed() => {
                    self.render()?;
                }

                _ = tokio::time::sleep_until(deadline) => {
                    self.slow_tick().await;
                    (due, deadline) = self.next_forecast(due);
                }

                _ = fast.tick() => {
                    self.fast_tick().await?;
                }
            }
        }
    }

    /// The next scheduled fetch strictly after `after` (or now, if later),
    /// as a wall-clock time and a runtime deadline.
    fn next_forecast(&self, after: DateTime<Local>) -> (DateTime<Local>, Instant) {
        let now = Local::now();
        let due = self.schedule.next_after(&after.max(now));
        let wait = (due - now).to_std().unwrap_or(Duration::ZERO);
        debug!("Next forecast refresh at {} (in {:?})", due.format("%H:%M"), wait);
        (due, Instant::now() + wait)
    }

    /// Blank the LEDs and release the lines. Safe to call repeatedly.
    pub fn shutdown(&mut self) -> Result<()> {
        self.leds.release()?;
        self.last_frame = Some(DisplayFrame::BLANK);
        Ok(())
    }
}
