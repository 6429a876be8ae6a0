//! The capability seam shared by the composite analyzers.

use indexmap::IndexMap;
use market_data_client::models::bar::BarSeries;

/// A named, parameterized computation over a bar series.
///
/// Implemented by the composite analyzers (VPCI, stage classification,
/// box tracking) as independent types rather than a hierarchy; the
/// windowed primitives stay free functions.
pub trait Indicator {
    /// The analyzer's full per-bar output.
    type Output;

    fn calculate(&self, series: &BarSeries) -> Self::Output;

    /// Stable identifier used in report payloads and logs.
    fn name(&self) -> &'static str;

    /// The tuning constants this instance was built with.
    fn parameters(&self) -> IndexMap<&'static str, f64>;
}
