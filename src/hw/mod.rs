//! Hardware access.
//!
//! This module provides the shift-register LED driver, the mode button
//! and the Linux GPIO wiring that backs both on a Raspberry Pi.

pub mod button;
pub mod pins;
pub mod shift_register;

pub use button::{ButtonMonitor, ButtonStrategy, ModeSelector};
pub use pins::{ButtonLineError, CdevButton, GpioLines, LinuxShiftRegister};
pub use shift_register::{LedBank, ShiftRegister};
