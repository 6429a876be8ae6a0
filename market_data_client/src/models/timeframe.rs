use serde::{Deserialize, Serialize};

/// Granularity of a bar series.
///
/// Daily bars come straight from the provider; weekly bars are derived by
/// Monday-bucketed aggregation and persisted alongside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    Daily,
    Weekly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "DAILY",
            Timeframe::Weekly => "WEEKLY",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
