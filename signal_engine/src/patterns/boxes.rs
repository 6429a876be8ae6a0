//! Consolidation-box tracking (Darvas-style 3-bar confirmation).
//!
//! A provisional top is reset to every new high and confirmed once 3
//! consecutive bars fail to exceed it; the provisional bottom works
//! symmetrically. A box pairs a confirmed top with the current bottom
//! candidate, then activates when the bottom confirms too. An active box
//! terminates the first time a bar trades outside either bound, and a
//! new formation cycle starts on that same bar.

use chrono::NaiveDate;
use indexmap::IndexMap;
use market_data_client::models::bar::{Bar, BarSeries};
use serde::Serialize;

use crate::indicator::Indicator;

pub const CONFIRMATION_BARS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoxStatus {
    Forming,
    Active,
    BrokenUp,
    BrokenDown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationBox {
    pub start_date: NaiveDate,
    /// `None` while the box is still open at the end of the series.
    pub end_date: Option<NaiveDate>,
    pub top: f64,
    pub bottom: f64,
    pub status: BoxStatus,
}

/// Per-bar status trace plus the emitted box history.
#[derive(Debug, Clone)]
pub struct BoxHistory {
    pub boxes: Vec<ConsolidationBox>,
    pub status: Vec<BoxStatus>,
}

impl BoxHistory {
    /// The most recent box, open or closed.
    pub fn latest(&self) -> Option<&ConsolidationBox> {
        self.boxes.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Watching for a top to survive its confirmation count.
    Seeking,
    /// Top confirmed; waiting on the bottom.
    TopConfirmed,
    /// Both bounds confirmed; watching for a break.
    Active,
}

/// Fold accumulator carried across bars.
struct TrackerState {
    phase: Phase,
    provisional_top: f64,
    provisional_bottom: f64,
    top_count: u32,
    bottom_count: u32,
    box_start: Option<NaiveDate>,
    box_top: f64,
}

impl TrackerState {
    fn seed(bar: &Bar) -> Self {
        Self {
            phase: Phase::Seeking,
            provisional_top: bar.high,
            provisional_bottom: bar.low,
            top_count: 0,
            bottom_count: 0,
            box_start: None,
            box_top: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoxTracker;

impl BoxTracker {
    pub fn track(&self, bars: &[Bar]) -> BoxHistory {
        let mut boxes = Vec::new();
        let mut status = Vec::with_capacity(bars.len());

        let Some(first) = bars.first() else {
            return BoxHistory { boxes, status };
        };
        let mut state = TrackerState::seed(first);
        status.push(BoxStatus::Forming);

        for bar in &bars[1..] {
            let bar_status = step(&mut state, bar, &mut boxes);
            status.push(bar_status);
        }

        // Surface whatever is still open at the end of the series.
        match state.phase {
            Phase::Active => boxes.push(ConsolidationBox {
                start_date: state.box_start.unwrap_or(first.date),
                end_date: None,
                top: state.box_top,
                bottom: state.provisional_bottom,
                status: BoxStatus::Active,
            }),
            Phase::TopConfirmed => boxes.push(ConsolidationBox {
                start_date: state.box_start.unwrap_or(first.date),
                end_date: None,
                top: state.box_top,
                bottom: state.provisional_bottom,
                status: BoxStatus::Forming,
            }),
            Phase::Seeking => {}
        }

        BoxHistory { boxes, status }
    }
}

fn step(state: &mut TrackerState, bar: &Bar, boxes: &mut Vec<ConsolidationBox>) -> BoxStatus {
    match state.phase {
        Phase::Active => {
            if bar.high > state.box_top {
                close_box(state, bar, boxes, BoxStatus::BrokenUp);
                return BoxStatus::BrokenUp;
            }
            if bar.low < state.provisional_bottom {
                close_box(state, bar, boxes, BoxStatus::BrokenDown);
                return BoxStatus::BrokenDown;
            }
            BoxStatus::Active
        }

        Phase::TopConfirmed => {
            if bar.high > state.box_top {
                // The confirmed top fell before the bottom did: restart
                // the formation cycle at the new high.
                state.phase = Phase::Seeking;
                state.provisional_top = bar.high;
                state.top_count = 0;
                state.box_start = None;
                track_bottom(state, bar);
                return BoxStatus::Forming;
            }
            track_bottom(state, bar);
            if state.bottom_count >= CONFIRMATION_BARS {
                state.phase = Phase::Active;
                return BoxStatus::Active;
            }
            BoxStatus::Forming
        }

        Phase::Seeking => {
            track_top(state, bar);
            track_bottom(state, bar);
            if state.top_count >= CONFIRMATION_BARS {
                state.phase = Phase::TopConfirmed;
                state.box_top = state.provisional_top;
                state.box_start = Some(bar.date);
                if state.bottom_count >= CONFIRMATION_BARS {
                    state.phase = Phase::Active;
                    return BoxStatus::Active;
                }
            }
            BoxStatus::Forming
        }
    }
}

fn track_top(state: &mut TrackerState, bar: &Bar) {
    if bar.high > state.provisional_top {
        state.provisional_top = bar.high;
        state.top_count = 0;
    } else {
        state.top_count += 1;
    }
}

fn track_bottom(state: &mut TrackerState, bar: &Bar) {
    if bar.low < state.provisional_bottom {
        state.provisional_bottom = bar.low;
        state.bottom_count = 0;
    } else {
        state.bottom_count += 1;
    }
}

fn close_box(
    state: &mut TrackerState,
    bar: &Bar,
    boxes: &mut Vec<ConsolidationBox>,
    status: BoxStatus,
) {
    boxes.push(ConsolidationBox {
        start_date: state.box_start.unwrap_or(bar.date),
        end_date: Some(bar.date),
        top: state.box_top,
        bottom: state.provisional_bottom,
        status,
    });
    // New cycle seeds from the breaking bar.
    *state = TrackerState::seed(bar);
}

impl Indicator for BoxTracker {
    type Output = BoxHistory;

    fn calculate(&self, series: &BarSeries) -> BoxHistory {
        self.track(&series.bars)
    }

    fn name(&self) -> &'static str {
        "consolidation_box"
    }

    fn parameters(&self) -> IndexMap<&'static str, f64> {
        IndexMap::from([("confirmation_bars", CONFIRMATION_BARS as f64)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bars(rows: &[(f64, f64)]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low))| Bar {
                date: start + Duration::days(i as i64),
                open: (high + low) / 2.0,
                high,
                low,
                close: (high + low) / 2.0,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn forming_to_active_to_broken_up_at_exact_bars() {
        let data = bars(&[
            (110.0, 100.0), // 0: provisional top 110, bottom 100
            (108.0, 101.0), // 1: top x1, bottom x1
            (107.0, 102.0), // 2: top x2, bottom x2
            (106.0, 99.0),  // 3: top confirmed; new low resets bottom
            (105.0, 100.0), // 4: bottom x1
            (104.0, 100.0), // 5: bottom x2
            (105.0, 101.0), // 6: bottom confirmed -> ACTIVE
            (111.0, 104.0), // 7: breaks above 110 -> BROKEN_UP
        ]);
        let history = BoxTracker.track(&data);

        assert_eq!(history.status[5], BoxStatus::Forming);
        assert_eq!(history.status[6], BoxStatus::Active);
        assert_eq!(history.status[7], BoxStatus::BrokenUp);

        assert_eq!(history.boxes.len(), 1);
        let broken = &history.boxes[0];
        assert_eq!(broken.top, 110.0);
        assert_eq!(broken.bottom, 99.0);
        assert_eq!(broken.status, BoxStatus::BrokenUp);
        assert_eq!(broken.start_date, data[3].date);
        assert_eq!(broken.end_date, Some(data[7].date));
    }

    #[test]
    fn break_below_bottom_is_broken_down() {
        let data = bars(&[
            (110.0, 100.0),
            (108.0, 101.0),
            (107.0, 102.0),
            (106.0, 103.0), // both bounds confirm here
            (105.0, 98.0),  // breaks below 100
        ]);
        let history = BoxTracker.track(&data);
        assert_eq!(history.status[3], BoxStatus::Active);
        assert_eq!(history.status[4], BoxStatus::BrokenDown);
        assert_eq!(history.boxes[0].status, BoxStatus::BrokenDown);
    }

    #[test]
    fn new_high_during_formation_restarts_the_cycle() {
        let data = bars(&[
            (110.0, 100.0),
            (108.0, 101.0),
            (107.0, 102.0),
            (106.0, 99.0), // top confirmed
            (115.0, 100.0), // exceeds the confirmed top before activation
        ]);
        let history = BoxTracker.track(&data);
        assert_eq!(history.status[4], BoxStatus::Forming);
        assert!(history.boxes.is_empty());
    }

    #[test]
    fn open_active_box_is_emitted_without_end_date() {
        let data = bars(&[
            (110.0, 100.0),
            (108.0, 101.0),
            (107.0, 102.0),
            (106.0, 103.0),
            (105.0, 104.0),
        ]);
        let history = BoxTracker.track(&data);
        let last = history.latest().unwrap();
        assert_eq!(last.status, BoxStatus::Active);
        assert_eq!(last.end_date, None);
        assert_eq!(last.top, 110.0);
        assert_eq!(last.bottom, 100.0);
    }

    #[test]
    fn a_new_box_forms_after_a_break() {
        let mut rows = vec![
            (110.0, 100.0),
            (108.0, 101.0),
            (107.0, 102.0),
            (106.0, 103.0), // ACTIVE
            (112.0, 105.0), // BROKEN_UP, reseeds at (112, 105)
        ];
        // Consolidate under the new top long enough to activate again.
        rows.extend([(111.0, 106.0), (110.0, 106.0), (109.0, 106.0)]);
        let history = BoxTracker.track(&bars(&rows));

        assert_eq!(history.boxes.len(), 2);
        assert_eq!(history.boxes[0].status, BoxStatus::BrokenUp);
        let second = &history.boxes[1];
        assert_eq!(second.status, BoxStatus::Active);
        assert_eq!(second.top, 112.0);
        assert_eq!(second.bottom, 105.0);
    }

    #[test]
    fn empty_series_yields_nothing() {
        let history = BoxTracker.track(&[]);
        assert!(history.boxes.is_empty());
        assert!(history.status.is_empty());
    }
}
