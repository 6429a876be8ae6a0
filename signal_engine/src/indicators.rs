//! Stateless windowed indicator primitives.
//!
//! All functions take slices of per-bar values and return a vector of the
//! same length, `None` at positions where the window is not yet full.

pub mod bands;
pub mod moving_average;
pub mod oscillators;
pub mod volume;

pub use bands::{bollinger, keltner};
pub use moving_average::{ema, rolling_std, sma, vwma};
pub use oscillators::{macd, rsi, stochastic};
pub use volume::obv;
