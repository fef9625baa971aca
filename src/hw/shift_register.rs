//! 74HC595 shift register driving the LED bank.
//!
//! Three lines control the chip: serial data (SDI), shift clock (SRCLK)
//! and storage clock (RCLK). Each bit is presented on SDI and clocked in
//! with an SRCLK pulse; an RCLK pulse then copies all 8 bits to the
//! outputs at once, so the LEDs never show a half-shifted byte.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use tracing::{debug, warn};

use crate::data::DisplayFrame;
use crate::error::{Error, Result};

/// Settle time after each clock edge, in microseconds.
pub const SETTLE_US: u32 = 10;

/// Data-line levels for `byte`, in the order they are shifted out.
///
/// At step `n` the data line carries `0x80 & (byte << n)`, i.e. most
/// significant bit first. The LED wiring relies on this order.
pub fn bit_levels(byte: u8) -> [bool; 8] {
    let mut levels = [false; 8];
    for (bit, level) in levels.iter_mut().enumerate() {
        *level = (u16::from(byte) << bit) & 0x80 != 0;
    }
    levels
}

/// Something that can show a [`DisplayFrame`].
pub trait LedBank {
    /// Show a frame on the LEDs.
    fn show(&mut self, frame: DisplayFrame) -> Result<()>;

    /// Blank the LEDs and drive every control line low.
    ///
    /// Must be safe to call more than once.
    fn release(&mut self) -> Result<()>;
}

/// Bit-banged 74HC595 driver.
pub struct ShiftRegister<DS, SH, ST, D>
where
    DS: OutputPin,
    SH: OutputPin,
    ST: OutputPin,
    D: DelayNs,
{
    /// Serial data (SDI).
    data: DS,
    /// Shift clock (SRCLK).
    clock: SH,
    /// Storage clock (RCLK).
    latch: ST,
    delay: D,
    /// Last frame latched to the outputs.
    current: DisplayFrame,
    released: bool,
}

impl<DS, SH, ST, D> ShiftRegister<DS, SH, ST, D>
where
    DS: OutputPin,
    SH: OutputPin,
    ST: OutputPin,
    D: DelayNs,
{
    /// Create a driver. The lines should already be configured as outputs
    /// and idle low.
    pub fn new(data: DS, clock: SH, latch: ST, delay: D) -> Self {
        Self {
            data,
            clock,
            latch,
            delay,
            current: DisplayFrame::BLANK,
            released: false,
        }
    }

    /// The frame currently latched to the outputs.
    pub fn current(&self) -> DisplayFrame {
        self.current
    }

    /// Shift a byte in and latch it.
    ///
    /// Bits go out in [`bit_levels`] order.
    pub fn write(&mut self, byte: u8) -> Result<()> {
        for level in bit_levels(byte) {
            self.data
                .set_state(PinState::from(level))
                .map_err(Error::gpio)?;
            self.pulse_clock()?;
        }
        self.pulse_latch()?;

        self.current = DisplayFrame(byte);
        self.released = false;
        Ok(())
    }

    fn pulse_clock(&mut self) -> Result<()> {
        self.clock.set_high().map_err(Error::gpio)?;
        self.delay.delay_us(SETTLE_US);
        self.clock.set_low().map_err(Error::gpio)
    }

    fn pulse_latch(&mut self) -> Result<()> {
        self.latch.set_high().map_err(Error::gpio)?;
        self.delay.delay_us(SETTLE_US);
        self.latch.set_low().map_err(Error::gpio)
    }
}

impl<DS, SH, ST, D> LedBank for ShiftRegister<DS, SH, ST, D>
where
    DS: OutputPin,
    SH: OutputPin,
    ST: OutputPin,
    D: DelayNs,
{
    fn show(&mut self, frame: DisplayFrame) -> Result<()> {
        self.write(frame.bits())
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }

        self.write(DisplayFrame::BLANK.bits())?;
        self.data.set_low().map_err(Error::gpio)?;
        self.clock.set_low().map_err(Error::gpio)?;
        self.latch.set_low().map_err(Error::gpio)?;
        self.released = true;

        debug!("LED bank released");
        Ok(())
    }
}

impl<DS, SH, ST, D> Drop for ShiftRegister<DS, SH, ST, D>
where
    DS: OutputPin,
    SH: OutputPin,
    ST: OutputPin,
    D: DelayNs,
{
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release LED bank on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    /// Data-line transactions for one byte, in shift order.
    fn data_bits(byte: u8) -> Vec<PinTransaction> {
        bit_levels(byte)
            .iter()
            .map(|&high| PinTransaction::set(if high { State::High } else { State::Low }))
            .collect()
    }

    fn pulses(count: usize) -> Vec<PinTransaction> {
        (0..count)
            .flat_map(|_| [PinTransaction::set(State::High), PinTransaction::set(State::Low)])
            .collect()
    }

    struct Lines {
        data: PinMock,
        clock: PinMock,
        latch: PinMock,
    }

    impl Lines {
        /// Expect each byte in turn, followed by a release.
        fn expecting(bytes: &[u8]) -> Self {
            let mut data = Vec::new();
            let mut clock = Vec::new();
            let mut latch = Vec::new();

            for &byte in bytes.iter().chain(std::iter::once(&0u8)) {
                data.extend(data_bits(byte));
                clock.extend(pulses(8));
                latch.extend(pulses(1));
            }
            data.push(PinTransaction::set(State::Low));
            clock.push(PinTransaction::set(State::Low));
            latch.push(PinTransaction::set(State::Low));

            Self {
                data: PinMock::new(&data),
                clock: PinMock::new(&clock),
                latch: PinMock::new(&latch),
            }
        }

        fn register(&self) -> ShiftRegister<PinMock, PinMock, PinMock, NoopDelay> {
            ShiftRegister::new(
                self.data.clone(),
                self.clock.clone(),
                self.latch.clone(),
                NoopDelay::new(),
            )
        }

        fn done(mut self) {
            self.data.done();
            self.clock.done();
            self.latch.done();
        }
    }

    #[test]
    fn test_bit_order_is_msb_first() {
        assert_eq!(
            bit_levels(0b1010_0001),
            [true, false, true, false, false, false, false, true]
        );
        assert_eq!(bit_levels(0x80), [true, false, false, false, false, false, false, false]);
        assert_eq!(bit_levels(0x01), [false, false, false, false, false, false, false, true]);
        assert_eq!(bit_levels(0), [false; 8]);
    }

    #[test]
    fn test_write_shifts_and_latches() {
        let lines = Lines::expecting(&[53]);
        let mut register = lines.register();

        register.write(53).unwrap();
        assert_eq!(register.current(), DisplayFrame(53));

        register.release().unwrap();
        assert_eq!(register.current(), DisplayFrame::BLANK);
        drop(register);
        lines.done();
    }

    #[test]
    fn test_show_multiple_frames() {
        let lines = Lines::expecting(&[0xFF, 0x80, 0x01]);
        let mut register = lines.register();

        register.show(DisplayFrame(0xFF)).unwrap();
        register.show(DisplayFrame(0x80)).unwrap();
        register.show(DisplayFrame(0x01)).unwrap();
        register.release().unwrap();
        drop(register);
        lines.done();
    }

    #[test]
    fn test_release_is_idempotent() {
        let lines = Lines::expecting(&[]);
        let mut register = lines.register();

        register.release().unwrap();
        register.release().unwrap();
        // Drop must not touch the lines again
        drop(register);
        lines.done();
    }

    #[test]
    fn test_drop_releases() {
        let lines = Lines::expecting(&[0x2A]);
        {
            let mut register = lines.register();
            register.write(0x2A).unwrap();
        }
        lines.done();
    }
}
