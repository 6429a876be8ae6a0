//! Price-level analysis: Fibonacci retracements and confluence zones.

pub mod confluence;
pub mod fibonacci;

pub use confluence::{ConfluenceZone, LevelKind, PriceLevel, find_confluence_zones};
pub use fibonacci::{FibonacciAnalyzer, FibonacciLevels, TrendDirection};
