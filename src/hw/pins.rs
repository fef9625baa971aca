//! GPIO lines on a Raspberry Pi via the Linux character device.
//!
//! Lines are requested from `/dev/gpiochip0` and held for the life of the
//! process. Dropping a handle returns the line to the kernel.

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};
use embedded_hal_async::digital::Wait;
use futures::StreamExt;
use linux_embedded_hal::gpio_cdev::{
    self, AsyncLineEventHandle, Chip, EventRequestFlags, EventType, LineEvent, LineRequestFlags,
};
use linux_embedded_hal::{CdevPin, Delay};
use tracing::{info, trace};

use super::shift_register::ShiftRegister;
use crate::config::PinConfig;
use crate::error::{Error, Result};

/// Consumer label shown by `gpioinfo` for claimed lines.
const CONSUMER: &str = "pi-temp-display";

/// Shift register wired to character-device lines.
pub type LinuxShiftRegister = ShiftRegister<CdevPin, CdevPin, CdevPin, Delay>;

/// All lines claimed by the daemon.
pub struct GpioLines {
    /// The LED bank.
    pub leds: LinuxShiftRegister,
    /// The mode button input.
    pub button: CdevButton,
}

impl GpioLines {
    /// Claim the shift-register outputs (idle low) and the button input.
    ///
    /// Must be called from inside a Tokio runtime: the button's edge events
    /// are registered with the runtime's reactor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gpio`] if the chip cannot be opened or any line is
    /// already in use.
    pub fn open(pins: &PinConfig) -> Result<Self> {
        let mut chip = Chip::new(&pins.chip).map_err(Error::gpio)?;

        let data = request_output(&mut chip, pins.data)?;
        let clock = request_output(&mut chip, pins.clock)?;
        let latch = request_output(&mut chip, pins.latch)?;
        let button = CdevButton::request(&mut chip, pins.button)?;

        info!(
            "Claimed GPIO lines data={} clock={} latch={} button={} on {}",
            pins.data,
            pins.clock,
            pins.latch,
            pins.button,
            pins.chip.display()
        );

        Ok(Self {
            leds: ShiftRegister::new(data, clock, latch, Delay),
            button,
        })
    }
}

fn request_output(chip: &mut Chip, offset: u32) -> Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(LineRequestFlags::OUTPUT, 0, CONSUMER))
        .map_err(Error::gpio)?;
    CdevPin::new(handle).map_err(Error::gpio)
}

/// Failure reading the button line.
#[derive(Debug)]
pub enum ButtonLineError {
    /// The kernel rejected a read.
    Cdev(gpio_cdev::errors::Error),
    /// The event stream ended.
    Closed,
}

impl embedded_hal::digital::Error for ButtonLineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// The button line, requested with edge events on both edges.
///
/// The kernel queues edges as they happen, so a press made while the
/// daemon is busy with a tick is delivered on the next wait instead of
/// being missed.
pub struct CdevButton {
    events: AsyncLineEventHandle,
}

impl CdevButton {
    /// Request `offset` as an input reporting rising and falling edges.
    pub fn request(chip: &mut Chip, offset: u32) -> Result<Self> {
        let handle = chip
            .get_line(offset)
            .and_then(|line| {
                line.events(
                    LineRequestFlags::INPUT,
                    EventRequestFlags::BOTH_EDGES,
                    CONSUMER,
                )
            })
            .map_err(Error::gpio)?;
        let events = AsyncLineEventHandle::new(handle).map_err(Error::gpio)?;
        Ok(Self { events })
    }

    async fn next_event(&mut self) -> std::result::Result<LineEvent, ButtonLineError> {
        let event = self
            .events
            .next()
            .await
            .ok_or(ButtonLineError::Closed)?
            .map_err(ButtonLineError::Cdev)?;
        trace!("Button edge {:?} at {}ns", event.event_type(), event.timestamp());
        Ok(event)
    }

    async fn wait_for(&mut self, rising: bool) -> std::result::Result<(), ButtonLineError> {
        loop {
            let event = self.next_event().await?;
            if matches!(event.event_type(), EventType::RisingEdge) == rising {
                return Ok(());
            }
        }
    }

    fn level(&self) -> std::result::Result<u8, ButtonLineError> {
        self.events.as_ref().get_value().map_err(ButtonLineError::Cdev)
    }
}

impl ErrorType for CdevButton {
    type Error = ButtonLineError;
}

impl InputPin for CdevButton {
    fn is_high(&mut self) -> std::result::Result<bool, Self::Error> {
        Ok(self.level()? != 0)
    }

    fn is_low(&mut self) -> std::result::Result<bool, Self::Error> {
        Ok(self.level()? == 0)
    }
}

impl Wait for CdevButton {
    async fn wait_for_high(&mut self) -> std::result::Result<(), Self::Error> {
        if self.level()? != 0 {
            return Ok(());
        }
        self.wait_for(true).await
    }

    async fn wait_for_low(&mut self) -> std::result::Result<(), Self::Error> {
        if self.level()? == 0 {
            return Ok(());
        }
        self.wait_for(false).await
    }

    async fn wait_for_rising_edge(&mut self) -> std::result::Result<(), Self::Error> {
        self.wait_for(true).await
    }

    async fn wait_for_falling_edge(&mut self) -> std::result::Result<(), Self::Error> {
        self.wait_for(false).await
    }

    async fn wait_for_any_edge(&mut self) -> std::result::Result<(), Self::Error> {
        self.next_event().await.map(|_| ())
    }
}
