//! Mode pushbutton.
//!
//! The button is wired active low. A press advances the display [`Mode`];
//! presses arriving within the debounce window of the last accepted press
//! are dropped as switch bounce.
//!
//! Two detection strategies exist, and a process uses exactly one:
//!
//! - [`ButtonStrategy::Edge`] waits for a falling edge on the line.
//! - [`ButtonStrategy::Polled`] samples the level on a fixed interval and
//!   sleeps for the debounce window after a low sample.
//!
//! Both report through [`ModeSelector::on_edge_detected`], whose monotonic
//! guard is the single place presses are counted. [`ButtonMonitor::run`]
//! watches the line for as long as it is polled, independently of the
//! display ticks; accepted presses wake [`ModeSelector::changed`].

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::data::Mode;
use crate::error::{Error, Result};

/// How button presses are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ButtonStrategy {
    /// Wait for a falling edge.
    #[default]
    Edge,
    /// Sample the level every poll interval.
    Polled,
}

impl std::fmt::Display for ButtonStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edge => write!(f, "edge"),
            Self::Polled => write!(f, "polled"),
        }
    }
}

impl std::str::FromStr for ButtonStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edge" => Ok(Self::Edge),
            "polled" | "poll" => Ok(Self::Polled),
            other => Err(Error::InvalidParameter {
                name: "button_strategy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

struct SelectorState {
    mode: Mode,
    last_press: Option<Instant>,
    presses: u64,
}

/// Tracks the display mode and debounces presses.
pub struct ModeSelector {
    state: Mutex<SelectorState>,
    changed: Notify,
    debounce: Duration,
}

impl ModeSelector {
    /// Create a selector starting at `initial`.
    pub fn new(initial: Mode, debounce: Duration) -> Self {
        Self {
            state: Mutex::new(SelectorState {
                mode: initial,
                last_press: None,
                presses: 0,
            }),
            changed: Notify::new(),
            debounce,
        }
    }

    /// The currently selected mode.
    pub fn current_mode(&self) -> Mode {
        self.state.lock().mode
    }

    /// Override the mode without counting a press.
    pub fn set_mode(&self, mode: Mode) {
        self.state.lock().mode = mode;
        self.changed.notify_one();
    }

    /// Completes once the mode has changed since the last call.
    ///
    /// A change made while nobody is waiting is remembered, so the next
    /// call returns immediately.
    pub async fn changed(&self) {
        self.changed.notified().await
    }

    /// Number of presses accepted so far.
    pub fn presses(&self) -> u64 {
        self.state.lock().presses
    }

    /// The debounce window.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Register a press detected now.
    ///
    /// Returns `true` if the press was accepted and the mode advanced.
    pub fn on_edge_detected(&self) -> bool {
        self.on_edge_detected_at(Instant::now())
    }

    /// Register a press detected at `now`.
    ///
    /// The check and the update happen under one lock, so concurrent callers
    /// cannot both slip through the same window.
    pub fn on_edge_detected_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();

        if let Some(last) = state.last_press {
            let since = now.saturating_duration_since(last);
            if since < self.debounce {
                debug!("Ignoring bounce {:?} after last press", since);
                return false;
            }
        }

        state.last_press = Some(now);
        state.presses += 1;
        state.mode = state.mode.next();

        info!("Display mode changed to {}", state.mode);
        drop(state);
        self.changed.notify_one();
        true
    }
}

/// Watches the button line and feeds presses into a [`ModeSelector`].
pub struct ButtonMonitor<P> {
    pin: P,
    strategy: ButtonStrategy,
    selector: Arc<ModeSelector>,
}

impl<P> ButtonMonitor<P> {
    /// Create a monitor for `pin`.
    pub fn new(pin: P, strategy: ButtonStrategy, selector: Arc<ModeSelector>) -> Self {
        Self {
            pin,
            strategy,
            selector,
        }
    }

    /// The active detection strategy.
    pub fn strategy(&self) -> ButtonStrategy {
        self.strategy
    }

    /// The selector presses are reported to.
    pub fn selector(&self) -> &Arc<ModeSelector> {
        &self.selector
    }
}

impl<P: InputPin> ButtonMonitor<P> {
    /// Sample the line once (polled strategy).
    ///
    /// A low level counts as a press; after one, this blocks for the
    /// debounce window so the same press is not sampled again.
    pub async fn poll_once(&mut self) -> Result<bool> {
        if !self.pin.is_low().map_err(Error::gpio)? {
            return Ok(false);
        }

        let accepted = self.selector.on_edge_detected();
        tokio::time::sleep(self.selector.debounce()).await;
        Ok(accepted)
    }
}

impl<P: InputPin + Wait> ButtonMonitor<P> {
    /// Wait for the next falling edge (edge strategy).
    ///
    /// Returns whether the edge was accepted as a press.
    pub async fn wait_for_press(&mut self) -> Result<bool> {
        self.pin.wait_for_falling_edge().await.map_err(Error::gpio)?;
        Ok(self.selector.on_edge_detected())
    }

    /// Watch the line with the configured strategy until it fails.
    ///
    /// `poll` is the sampling interval for [`ButtonStrategy::Polled`]. Only
    /// returns on a GPIO error.
    pub async fn run(&mut self, poll: Duration) -> Result<()> {
        match self.strategy {
            ButtonStrategy::Edge => loop {
                self.wait_for_press().await?;
            },
            ButtonStrategy::Polled => {
                let mut ticker = tokio::time::interval(poll);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    self.poll_once().await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Edge, Mock as PinMock, State, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::MockError;
    use std::io::ErrorKind;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    #[test]
    fn test_strategy_parse() {
        assert_eq!("edge".parse::<ButtonStrategy>().unwrap(), ButtonStrategy::Edge);
        assert_eq!("Polled".parse::<ButtonStrategy>().unwrap(), ButtonStrategy::Polled);
        assert!("both".parse::<ButtonStrategy>().is_err());
        assert_eq!(ButtonStrategy::Polled.to_string(), "polled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_advances_mode() {
        let selector = ModeSelector::new(Mode::Off, DEBOUNCE);
        assert!(selector.on_edge_detected());
        assert_eq!(selector.current_mode(), Mode::ProbeTemperature);
        assert_eq!(selector.presses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounce_is_suppressed() {
        let selector = ModeSelector::new(Mode::ProbeTemperature, DEBOUNCE);
        let t0 = Instant::now();

        assert!(selector.on_edge_detected_at(t0));
        assert!(!selector.on_edge_detected_at(t0 + Duration::from_millis(5)));
        assert!(!selector.on_edge_detected_at(t0 + Duration::from_millis(299)));
        assert_eq!(selector.current_mode(), Mode::ForecastTemperature);

        assert!(selector.on_edge_detected_at(t0 + DEBOUNCE));
        assert_eq!(selector.current_mode(), Mode::Off);
        assert_eq!(selector.presses(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_spaced_presses_cycle() {
        for start in [Mode::Off, Mode::ProbeTemperature, Mode::ForecastTemperature] {
            let selector = ModeSelector::new(start, DEBOUNCE);
            let t0 = Instant::now();
            for i in 0..3u32 {
                assert!(selector.on_edge_detected_at(t0 + DEBOUNCE * (i + 1)));
            }
            assert_eq!(selector.current_mode(), start);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_timestamp_is_bounce() {
        let selector = ModeSelector::new(Mode::Off, DEBOUNCE);
        let t0 = Instant::now() + Duration::from_secs(1);
        assert!(selector.on_edge_detected_at(t0));
        assert!(!selector.on_edge_detected_at(t0 - Duration::from_millis(100)));
    }

    #[test]
    fn test_set_mode_does_not_count() {
        let selector = ModeSelector::new(Mode::ProbeTemperature, DEBOUNCE);
        selector.set_mode(Mode::Off);
        assert_eq!(selector.current_mode(), Mode::Off);
        assert_eq!(selector.presses(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_once() {
        let expectations = [
            PinTransaction::get(State::High),
            PinTransaction::get(State::Low),
            PinTransaction::get(State::Low),
        ];
        let mut pin = PinMock::new(&expectations);
        let selector = Arc::new(ModeSelector::new(Mode::Off, DEBOUNCE));
        let mut monitor = ButtonMonitor::new(pin.clone(), ButtonStrategy::Polled, selector.clone());

        assert!(!monitor.poll_once().await.unwrap());
        assert_eq!(selector.current_mode(), Mode::Off);

        let started = Instant::now();
        assert!(monitor.poll_once().await.unwrap());
        assert!(started.elapsed() >= DEBOUNCE);
        assert_eq!(selector.current_mode(), Mode::ProbeTemperature);

        // Held down past the debounce sleep counts as a new press
        assert!(monitor.poll_once().await.unwrap());
        assert_eq!(selector.current_mode(), Mode::ForecastTemperature);

        pin.done();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_press() {
        let expectations = [
            PinTransaction::wait_for_edge(Edge::Falling),
            PinTransaction::wait_for_edge(Edge::Falling),
        ];
        let mut pin = PinMock::new(&expectations);
        let selector = Arc::new(ModeSelector::new(Mode::ProbeTemperature, DEBOUNCE));
        let mut monitor = ButtonMonitor::new(pin.clone(), ButtonStrategy::Edge, selector.clone());

        assert!(monitor.wait_for_press().await.unwrap());
        // Second edge arrives immediately: bounce
        assert!(!monitor.wait_for_press().await.unwrap());
        assert_eq!(selector.current_mode(), Mode::ForecastTemperature);

        pin.done();
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_wakes_on_accepted_press() {
        let selector = ModeSelector::new(Mode::Off, DEBOUNCE);
        let t0 = Instant::now();

        assert!(selector.on_edge_detected_at(t0));
        tokio::time::timeout(Duration::from_millis(1), selector.changed())
            .await
            .unwrap();

        // Bounce does not count as a change
        assert!(!selector.on_edge_detected_at(t0 + Duration::from_millis(10)));
        assert!(tokio::time::timeout(Duration::from_millis(1), selector.changed())
            .await
            .is_err());

        selector.set_mode(Mode::ForecastTemperature);
        tokio::time::timeout(Duration::from_millis(1), selector.changed())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reports_edges_until_line_fails() {
        let expectations = [
            PinTransaction::wait_for_edge(Edge::Falling),
            PinTransaction::wait_for_edge(Edge::Falling).with_error(MockError::Io(ErrorKind::BrokenPipe)),
        ];
        let mut pin = PinMock::new(&expectations);
        let selector = Arc::new(ModeSelector::new(Mode::Off, DEBOUNCE));
        let mut monitor = ButtonMonitor::new(pin.clone(), ButtonStrategy::Edge, selector.clone());

        let result = monitor.run(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::Gpio { .. })));
        assert_eq!(selector.current_mode(), Mode::ProbeTemperature);
        assert_eq!(selector.presses(), 1);

        pin.done();
    }
}
