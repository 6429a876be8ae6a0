use chrono::NaiveDate;

/// Daily-bars quotation endpoint.
pub const DAILY_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-price";
pub const DAILY_PRICE_TR_ID: &str = "FHKST01010400";

/// Current-price quotation endpoint.
pub const CURRENT_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-price";
pub const CURRENT_PRICE_TR_ID: &str = "FHKST01010100";

/// OAuth client-credentials token endpoint.
pub const TOKEN_PATH: &str = "/oauth2/tokenP";

/// Market division code: `J` selects the whole domestic market.
pub const MARKET_DIV_CODE: &str = "J";

/// Cache key for the bearer token.
pub const TOKEN_CACHE_KEY: &str = "kis:access_token";

/// Token validity is 24 h; cache one hour less so a refresh always happens
/// before the provider starts rejecting it.
pub const TOKEN_CACHE_TTL_SECS: u64 = 82_800;

pub fn daily_price_cache_key(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!("kis:daily_price:{ticker}:{start}:{end}")
}

pub fn quote_cache_key(ticker: &str) -> String {
    format!("kis:quote:{ticker}")
}

fn kis_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Query parameters for the daily-bars endpoint.
///
/// `FID_PERIOD_DIV_CODE=D` requests daily bars; `FID_ORG_ADJ_PRC=1` requests
/// unadjusted prices.
pub fn daily_price_query(ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<(String, String)> {
    vec![
        ("FID_COND_MRKT_DIV_CODE".into(), MARKET_DIV_CODE.into()),
        ("FID_INPUT_ISCD".into(), ticker.to_string()),
        ("FID_INPUT_DATE_1".into(), kis_date(start)),
        ("FID_INPUT_DATE_2".into(), kis_date(end)),
        ("FID_PERIOD_DIV_CODE".into(), "D".into()),
        ("FID_ORG_ADJ_PRC".into(), "1".into()),
    ]
}

/// Query parameters for the current-price endpoint.
pub fn quote_query(ticker: &str) -> Vec<(String, String)> {
    vec![
        ("FID_COND_MRKT_DIV_CODE".into(), MARKET_DIV_CODE.into()),
        ("FID_INPUT_ISCD".into(), ticker.to_string()),
    ]
}

/// Interprets a `tr_cont` response-header value: `F` and `M` mean further
/// pages exist and the value must be echoed back on the follow-up request.
pub fn continuation_token(value: Option<&str>) -> Option<String> {
    match value {
        Some(v @ ("F" | "M")) => Some(v.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_query_formats_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let query = daily_price_query("005930", start, end);
        assert!(query.contains(&("FID_INPUT_DATE_1".into(), "20240102".into())));
        assert!(query.contains(&("FID_INPUT_DATE_2".into(), "20240304".into())));
        assert!(query.contains(&("FID_INPUT_ISCD".into(), "005930".into())));
    }

    #[test]
    fn continuation_only_on_more_markers() {
        assert_eq!(continuation_token(Some("F")), Some("F".into()));
        assert_eq!(continuation_token(Some("M")), Some("M".into()));
        assert_eq!(continuation_token(Some("D")), None);
        assert_eq!(continuation_token(Some("E")), None);
        assert_eq!(continuation_token(Some("")), None);
        assert_eq!(continuation_token(None), None);
    }

    #[test]
    fn cache_keys_embed_identity() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            daily_price_cache_key("005930", start, end),
            "kis:daily_price:005930:2024-01-02:2024-03-04"
        );
        assert_eq!(quote_cache_key("005930"), "kis:quote:005930");
    }
}
