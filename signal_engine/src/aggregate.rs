//! Daily-to-weekly bar aggregation.

use chrono::{Datelike, Duration, NaiveDate};
use market_data_client::models::bar::Bar;

/// The Monday of the calendar week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Collapses daily bars into weekly bars, one per calendar week, dated at
/// the week's Monday. Within a week: open from the first bar, close from
/// the last, high = max, low = min, volume = sum. Input must be sorted
/// ascending by date; output is too.
pub fn to_weekly(daily: &[Bar]) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();

    for bar in daily {
        let monday = week_start(bar.date);
        match out.last_mut() {
            Some(week) if week.date == monday => {
                week.high = week.high.max(bar.high);
                week.low = week.low.min(bar.low);
                week.close = bar.close;
                week.volume += bar.volume;
            }
            _ => out.push(Bar {
                date: monday,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            }),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        Bar {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn five_weekday_bars_collapse_to_one_week() {
        // 2024-01-08 is a Monday.
        let daily = vec![
            bar(day(2024, 1, 8), 100.0, 105.0, 99.0, 104.0, 10.0),
            bar(day(2024, 1, 9), 104.0, 110.0, 103.0, 108.0, 20.0),
            bar(day(2024, 1, 10), 108.0, 109.0, 101.0, 102.0, 30.0),
            bar(day(2024, 1, 11), 102.0, 106.0, 100.0, 105.0, 40.0),
            bar(day(2024, 1, 12), 105.0, 107.0, 104.0, 106.0, 50.0),
        ];
        let weekly = to_weekly(&daily);
        assert_eq!(weekly.len(), 1);
        let week = &weekly[0];
        assert_eq!(week.date, day(2024, 1, 8));
        assert_eq!(week.open, 100.0);
        assert_eq!(week.close, 106.0);
        assert_eq!(week.high, 110.0);
        assert_eq!(week.low, 99.0);
        assert_eq!(week.volume, 150.0);
    }

    #[test]
    fn bars_across_a_weekend_split_into_two_weeks() {
        let daily = vec![
            bar(day(2024, 1, 12), 100.0, 101.0, 99.0, 100.5, 10.0), // Friday
            bar(day(2024, 1, 15), 101.0, 102.0, 100.0, 101.5, 20.0), // Monday
        ];
        let weekly = to_weekly(&daily);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].date, day(2024, 1, 8));
        assert_eq!(weekly[1].date, day(2024, 1, 15));
    }

    #[test]
    fn week_start_is_monday_for_every_weekday() {
        let monday = day(2024, 1, 8);
        for offset in 0..7 {
            assert_eq!(week_start(monday + Duration::days(offset)), monday);
        }
    }
}
