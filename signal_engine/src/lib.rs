//! Technical-analysis engine over daily OHLCV bars.
//!
//! Layers, bottom up:
//! - [`indicators`]: stateless windowed primitives (SMA, EMA, VWMA, RSI,
//!   MACD, Bollinger, Keltner, OBV, Stochastic).
//! - [`patterns`]: stateful analyzers built on the primitives — the
//!   Volume Price Confirmation Indicator, 4-stage trend-cycle
//!   classification, and the consolidation-box tracker.
//! - [`levels`]: Fibonacci retracements and confluence-zone clustering.
//! - [`signals`]: the weighted breakout checklist and divergence scanner.
//!
//! Every windowed computation degrades to `None` where its window is not
//! yet full; insufficient data is never an error at this layer.

pub mod aggregate;
pub mod indicator;
pub mod indicators;
pub mod levels;
pub mod patterns;
pub mod signals;
