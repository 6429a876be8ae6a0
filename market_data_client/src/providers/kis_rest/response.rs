//! Normalization of KIS quotation responses.
//!
//! The provider ships every figure as a string (`"72500"`, `"1,234"`), so
//! rows are deserialized individually and malformed ones are skipped with a
//! warning instead of aborting the batch.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use shared_utils::num::{lenient_f64, lenient_volume};
use tracing::warn;

use crate::models::{bar::Bar, quote::Quote};

/// Common envelope of KIS quotation responses. `rt_cd == "0"` means success;
/// `output` carries either a row array (daily bars) or a single object
/// (current price).
#[derive(Debug, Deserialize)]
pub struct KisEnvelope {
    #[serde(default)]
    pub rt_cd: Option<String>,
    #[serde(default)]
    pub msg1: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
}

impl KisEnvelope {
    pub fn is_success(&self) -> bool {
        match &self.rt_cd {
            Some(code) => code == "0",
            // Some endpoints omit rt_cd entirely; presence of output decides.
            None => self.output.is_some(),
        }
    }

    pub fn message(&self) -> String {
        self.msg1.clone().unwrap_or_else(|| "unknown API error".into())
    }
}

#[derive(Debug, Deserialize)]
struct KisDailyRow {
    stck_bsop_date: String,
    stck_oprc: String,
    stck_hgpr: String,
    stck_lwpr: String,
    stck_clpr: String,
    #[serde(alias = "stck_vol")]
    acml_vol: String,
}

impl KisDailyRow {
    fn into_bar(self) -> Option<Bar> {
        let date = NaiveDate::parse_from_str(&self.stck_bsop_date, "%Y%m%d").ok()?;
        Some(Bar {
            date,
            open: lenient_f64(&self.stck_oprc)?,
            high: lenient_f64(&self.stck_hgpr)?,
            low: lenient_f64(&self.stck_lwpr)?,
            close: lenient_f64(&self.stck_clpr)?,
            volume: lenient_volume(&self.acml_vol)?,
        })
    }
}

/// Parses one page of daily rows into bars, skipping malformed rows.
///
/// Returns bars in provider order; the caller sorts the concatenated pages.
pub fn parse_daily_rows(output: &Value) -> Vec<Bar> {
    let rows = match output.as_array() {
        Some(rows) => rows,
        None => {
            warn!("daily-price output is not an array, treating as empty");
            return Vec::new();
        }
    };

    rows.iter()
        .filter_map(|row| {
            let parsed = serde_json::from_value::<KisDailyRow>(row.clone())
                .ok()
                .and_then(KisDailyRow::into_bar);
            if parsed.is_none() {
                warn!(%row, "skipping malformed daily-price row");
            }
            parsed
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct KisQuoteRow {
    #[serde(default)]
    stck_shrn_iscd: String,
    #[serde(default)]
    hts_kor_isnm: String,
    #[serde(default)]
    stck_prpr: String,
    #[serde(default)]
    stck_oprc: String,
    #[serde(default)]
    stck_hgpr: String,
    #[serde(default)]
    stck_lwpr: String,
    #[serde(default, alias = "stck_vol")]
    acml_vol: String,
    #[serde(default)]
    prdy_vrss: String,
    #[serde(default)]
    prdy_vrss_sign: String,
    #[serde(default)]
    prdy_ctrt: String,
    #[serde(default)]
    mrkt_clss: String,
}

/// Parses the current-price output into a [`Quote`].
///
/// The provider returns `output` as a single object or a one-element array;
/// both shapes are accepted.
pub fn parse_quote(output: &Value) -> Option<Quote> {
    let object = match output {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let row: KisQuoteRow = serde_json::from_value(object.clone()).ok()?;

    Some(Quote {
        ticker: row.stck_shrn_iscd,
        name: row.hts_kor_isnm,
        current_price: lenient_f64(&row.stck_prpr).unwrap_or(0.0),
        open: lenient_f64(&row.stck_oprc).unwrap_or(0.0),
        high: lenient_f64(&row.stck_hgpr).unwrap_or(0.0),
        low: lenient_f64(&row.stck_lwpr).unwrap_or(0.0),
        volume: lenient_volume(&row.acml_vol).unwrap_or(0.0),
        change: lenient_f64(&row.prdy_vrss).unwrap_or(0.0),
        change_sign: row.prdy_vrss_sign,
        change_rate: lenient_f64(&row.prdy_ctrt).unwrap_or(0.0),
        market: row.mrkt_clss,
    })
}
