use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parameters for a daily-bars request.
///
/// Missing dates default provider-side: `end` to today, `start` to one year
/// before `end`. `bypass_cache` forces a fresh upstream fetch and skips the
/// response-cache write-back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBarsRequest {
    pub ticker: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub bypass_cache: bool,
}

impl DailyBarsRequest {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            start: None,
            end: None,
            bypass_cache: false,
        }
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn bypassing_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }
}
