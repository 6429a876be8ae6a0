//! Assembly of the full analysis payload for one instrument.

use chrono::NaiveDate;
use indexmap::IndexMap;
use market_data_client::models::bar::BarSeries;
use serde::Serialize;

use signal_engine::indicator::Indicator;
use signal_engine::indicators::moving_average::sma;
use signal_engine::indicators::oscillators::{
    self, MACD_FAST, MACD_SIGNAL, MACD_SLOW, RSI_PERIOD,
};
use signal_engine::indicators::bands::{self, BOLLINGER_K, BOLLINGER_PERIOD};
use signal_engine::levels::confluence::{self, ConfluenceZone, DEFAULT_TOLERANCE};
use signal_engine::levels::fibonacci::{FibonacciAnalyzer, FibonacciLevels, TrendDirection};
use signal_engine::patterns::boxes::{BoxTracker, ConsolidationBox};
use signal_engine::patterns::vpci::{Vpci, VpciSignal};
use signal_engine::signals::{Signal, SignalDetector};

/// SMA periods surfaced in the report payload.
pub const REPORT_SMA_PERIODS: [usize; 5] = [5, 10, 20, 60, 120];
/// Report signal lists are capped at this many entries, newest first.
pub const MAX_REPORT_SIGNALS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MacdPoint {
    pub date: NaiveDate,
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BollingerPoint {
    pub date: NaiveDate,
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VpciPoint {
    pub date: NaiveDate,
    pub vpci: f64,
    pub vpc: f64,
    pub signal: VpciSignal,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorBundle {
    /// Period to dated values, only where the window is full.
    pub sma: IndexMap<usize, Vec<DatedValue>>,
    pub macd: Vec<MacdPoint>,
    pub rsi: Vec<DatedValue>,
    pub bollinger: Vec<BollingerPoint>,
    pub vpci: Vec<VpciPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub ticker: String,
    pub indicators: IndicatorBundle,
    pub boxes: Vec<ConsolidationBox>,
    pub fibonacci: Option<FibonacciLevels>,
    pub confluence_zones: Vec<ConfluenceZone>,
    pub signals: Vec<Signal>,
}

/// Builds the report over a daily and weekly series. Indicators with
/// unfilled windows simply contribute fewer (or no) entries.
pub fn build_report(daily: &BarSeries, weekly: &BarSeries) -> AnalysisReport {
    let dates = daily.dates();
    let closes = daily.closes();

    let mut sma_map = IndexMap::new();
    for period in REPORT_SMA_PERIODS {
        let values = sma(&closes, period);
        sma_map.insert(period, collect_dated(&dates, &values));
    }

    let macd_series = oscillators::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let macd_points = dates
        .iter()
        .enumerate()
        .skip(MACD_SLOW - 1)
        .map(|(i, &date)| MacdPoint {
            date,
            macd: macd_series.macd[i],
            signal: macd_series.signal[i],
            histogram: macd_series.histogram[i],
        })
        .collect();

    let rsi = collect_dated(&dates, &oscillators::rsi(&closes, RSI_PERIOD));

    let bollinger_series = bands::bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_K);
    let bollinger = dates
        .iter()
        .enumerate()
        .filter_map(|(i, &date)| {
            Some(BollingerPoint {
                date,
                middle: bollinger_series.middle[i]?,
                upper: bollinger_series.upper[i]?,
                lower: bollinger_series.lower[i]?,
            })
        })
        .collect();

    let vpci_engine = Vpci::default();
    let vpci_series = vpci_engine.calculate(daily);
    let vpci = dates
        .iter()
        .enumerate()
        .filter_map(|(i, &date)| {
            Some(VpciPoint {
                date,
                vpci: vpci_series.vpci[i]?,
                vpc: vpci_series.vpc[i]?,
                signal: vpci_series.signal[i],
            })
        })
        .collect();

    let boxes = BoxTracker.track(&daily.bars).boxes;

    let fibonacci = FibonacciAnalyzer::default().auto_detect(&daily.bars, trend_direction(&closes));
    let latest_mas: Vec<f64> = REPORT_SMA_PERIODS
        .iter()
        .filter_map(|&p| sma(&closes, p).last().copied().flatten())
        .collect();
    let pooled = confluence::pool_levels(fibonacci.as_ref(), &latest_mas, &boxes);
    let confluence_zones = confluence::find_confluence_zones(&pooled, DEFAULT_TOLERANCE);

    AnalysisReport {
        ticker: daily.ticker.clone(),
        indicators: IndicatorBundle {
            sma: sma_map,
            macd: macd_points,
            rsi,
            bollinger,
            vpci,
        },
        boxes,
        fibonacci,
        confluence_zones,
        signals: collect_signals(daily, weekly),
    }
}

/// Trend direction over the Fibonacci lookback, by simple price change.
fn trend_direction(closes: &[f64]) -> TrendDirection {
    let lookback = FibonacciAnalyzer::default().lookback.min(closes.len());
    if lookback < 2 {
        return TrendDirection::Up;
    }
    let then = closes[closes.len() - lookback];
    let now = closes[closes.len() - 1];
    if now >= then {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    }
}

fn collect_dated(dates: &[NaiveDate], values: &[Option<f64>]) -> Vec<DatedValue> {
    dates
        .iter()
        .zip(values)
        .filter_map(|(&date, value)| value.map(|value| DatedValue { date, value }))
        .collect()
}

/// The breakout score on the latest bar plus the divergence scan,
/// newest first, capped at [`MAX_REPORT_SIGNALS`].
fn collect_signals(daily: &BarSeries, weekly: &BarSeries) -> Vec<Signal> {
    let Some(last) = daily.bars.last() else {
        return Vec::new();
    };
    let detector = SignalDetector::default();

    let breakout = detector.analyze_breakout(daily, weekly, last.date, None);
    let mut signals = vec![Signal::from_breakout(last.date, &breakout)];
    signals.extend(
        detector
            .detect_divergences(daily, weekly)
            .iter()
            .map(Signal::from_divergence),
    );

    signals.sort_by(|a, b| b.signal_date.cmp(&a.signal_date));
    signals.truncate(MAX_REPORT_SIGNALS);
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use market_data_client::models::bar::Bar;
    use market_data_client::models::timeframe::Timeframe;
    use signal_engine::aggregate::to_weekly;

    fn series(n: usize) -> (BarSeries, BarSeries) {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars: Vec<Bar> = (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.4).sin() * 10.0 + i as f64 * 0.1;
                Bar {
                    date: start + Duration::days((i / 5 * 7 + i % 5) as i64),
                    open: close,
                    high: close + 2.0,
                    low: close - 2.0,
                    close,
                    volume: 1000.0 + (i % 7) as f64 * 100.0,
                }
            })
            .collect();
        let weekly = BarSeries::new("005930", Timeframe::Weekly, to_weekly(&bars));
        (BarSeries::new("005930", Timeframe::Daily, bars), weekly)
    }

    #[test]
    fn report_entries_only_where_windows_fill() {
        let (daily, weekly) = series(200);
        let report = build_report(&daily, &weekly);

        assert_eq!(report.indicators.sma[&5].len(), 200 - 4);
        assert_eq!(report.indicators.sma[&120].len(), 200 - 119);
        assert_eq!(report.indicators.rsi.len(), 200 - 14);
        assert_eq!(report.indicators.bollinger.len(), 200 - 19);
        assert_eq!(report.indicators.macd.len(), 200 - 25);
        assert!(!report.indicators.vpci.is_empty());
        assert!(report.fibonacci.is_some());
    }

    #[test]
    fn short_history_degrades_without_error() {
        let (daily, weekly) = series(10);
        let report = build_report(&daily, &weekly);

        assert!(report.indicators.sma[&120].is_empty());
        assert!(report.indicators.rsi.is_empty());
        assert!(report.fibonacci.is_none());
        assert!(!report.signals.is_empty());
    }

    #[test]
    fn signals_are_newest_first_and_capped() {
        let (daily, weekly) = series(400);
        let report = build_report(&daily, &weekly);

        assert!(report.signals.len() <= MAX_REPORT_SIGNALS);
        assert!(
            report
                .signals
                .windows(2)
                .all(|w| w[0].signal_date >= w[1].signal_date)
        );
    }

    #[test]
    fn empty_series_yields_an_empty_report() {
        let daily = BarSeries::new("005930", Timeframe::Daily, Vec::new());
        let weekly = BarSeries::new("005930", Timeframe::Weekly, Vec::new());
        let report = build_report(&daily, &weekly);
        assert!(report.signals.is_empty());
        assert!(report.boxes.is_empty());
        assert!(report.indicators.sma[&5].is_empty());
    }
}
