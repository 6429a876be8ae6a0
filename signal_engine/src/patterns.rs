//! Stateful pattern analyzers built on the windowed primitives.

pub mod boxes;
pub mod stage;
pub mod vpci;

pub use boxes::{BoxStatus, BoxTracker, ConsolidationBox};
pub use stage::{SlopeClass, Stage, StageAnalyzer, StageResult};
pub use vpci::{Vpci, VpciSeries, VpciSignal};
