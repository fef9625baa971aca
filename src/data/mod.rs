//! Data structures shared across the display pipeline.
//!
//! This module contains the display mode, the forecast snapshot and the
//! encoded LED frame.

pub mod forecast;
pub mod frame;
pub mod mode;

pub use forecast::{ForecastSnapshot, WeatherAlert};
pub use frame::{DisplayFrame, StatusFlags};
pub use mode::Mode;
