//! Orchestration layer: progressive bar loading over an injected record
//! store, plus assembly of the full analysis report.

pub mod errors;
pub mod loader;
pub mod report;
pub mod storage;

pub use errors::ServiceError;
pub use loader::{LoaderConfig, ProgressiveLoader};
pub use report::AnalysisReport;
