//! Report aggregation.
//!
//! Pure read side: every report is recomputed from the full ledger at
//! read time. Nothing is cached or maintained incrementally.

use super::ledger::HistoryLedger;
use super::types::{CategoryShare, DayTotal, HistoryRecord, Report, CATEGORY_PREFIXES};
use crate::clock::Clock;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Minutes in a full productive day, the 100% mark for utilization.
pub const DEFAULT_REFERENCE_MINUTES_PER_DAY: u64 = 600;

/// Supported report windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportWindow {
    #[default]
    Week,
    Month,
}

impl ReportWindow {
    /// Number of calendar days covered, today included.
    pub fn days(self) -> u32 {
        match self {
            ReportWindow::Week => 7,
            ReportWindow::Month => 30,
        }
    }
}

impl FromStr for ReportWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" | "7" => Ok(ReportWindow::Week),
            "month" | "30" => Ok(ReportWindow::Month),
            other => Err(format!("Unsupported report range: {}", other)),
        }
    }
}

/// Builds reports from the shared ledger.
pub struct ReportAggregator {
    ledger: Arc<HistoryLedger>,
    clock: Arc<dyn Clock>,
    reference_minutes_per_day: u64,
}

impl ReportAggregator {
    pub fn new(ledger: Arc<HistoryLedger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            reference_minutes_per_day: DEFAULT_REFERENCE_MINUTES_PER_DAY,
        }
    }

    pub fn with_reference_minutes(mut self, minutes: u64) -> Self {
        self.reference_minutes_per_day = minutes;
        self
    }

    /// Builds the report for the window ending today.
    pub fn build_report(&self, window: ReportWindow) -> Report {
        let today = self.clock.today();
        let records = self.ledger.records();

        compute_report(&records, today, window.days(), self.reference_minutes_per_day)
    }
}

/// Computes a report over `window_days` calendar days ending at `today`.
///
/// Day totals only count records inside the window. Category totals cover
/// every record, with shares taken against the window total.
pub fn compute_report(
    records: &[HistoryRecord],
    today: NaiveDate,
    window_days: u32,
    reference_minutes_per_day: u64,
) -> Report {
    let dates = window_dates(today, window_days);
    let Some(&start) = dates.first() else {
        return Report::default();
    };

    let in_window: Vec<&HistoryRecord> = records
        .iter()
        .filter(|r| r.date >= start && r.date <= today)
        .collect();

    let mut seconds_by_date: HashMap<NaiveDate, u64> = HashMap::new();
    for record in &in_window {
        let total = seconds_by_date.entry(record.date).or_insert(0);
        *total = total.saturating_add(record.duration_seconds);
    }

    let days: Vec<DayTotal> = dates
        .iter()
        .map(|&date| DayTotal {
            date,
            total_minutes: seconds_by_date.get(&date).copied().unwrap_or(0) / 60,
        })
        .collect();

    let total_minutes = days
        .iter()
        .fold(0u64, |acc, d| acc.saturating_add(d.total_minutes));
    let average_daily_minutes = round_ratio(total_minutes, u64::from(window_days));
    let utilization_rate = round_ratio(
        average_daily_minutes.saturating_mul(100),
        reference_minutes_per_day,
    );
    let chart_max_minutes = days
        .iter()
        .map(|d| d.total_minutes)
        .max()
        .unwrap_or(0)
        .max(60);

    let all: Vec<&HistoryRecord> = records.iter().collect();
    let categories = category_breakdown(&all, total_minutes);

    Report {
        window_days,
        days,
        total_minutes,
        average_daily_minutes,
        utilization_rate,
        chart_max_minutes,
        categories,
    }
}

/// Per-category minutes and share of `total_minutes`. Empty categories are omitted.
pub fn category_breakdown(records: &[&HistoryRecord], total_minutes: u64) -> Vec<CategoryShare> {
    CATEGORY_PREFIXES
        .iter()
        .filter_map(|&prefix| {
            let seconds = records
                .iter()
                .filter(|r| r.in_category(prefix))
                .fold(0u64, |acc, r| acc.saturating_add(r.duration_seconds));
            let minutes = seconds / 60;
            if minutes == 0 {
                return None;
            }

            Some(CategoryShare {
                category: prefix.to_string(),
                total_minutes: minutes,
                share: round_ratio(minutes.saturating_mul(100), total_minutes),
            })
        })
        .collect()
}

/// Calendar dates `[today - days + 1, today]`, oldest first.
pub fn window_dates(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(chrono::Days::new(u64::from(offset))))
        .collect()
}

/// `round(numerator / denominator)` with halves rounded up, in integers.
///
/// A zero denominator yields 0 rather than dividing by zero. Computed in
/// `u128` so no `u64` input can overflow.
pub fn round_ratio(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let (n, d) = (u128::from(numerator), u128::from(denominator));
    u64::try_from((2 * n + d) / (2 * d)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn record(date: NaiveDate, id: &str, secs: u64) -> HistoryRecord {
        HistoryRecord::new(date, id, secs)
    }

    #[test]
    fn test_round_ratio() {
        assert_eq!(round_ratio(0, 7), 0);
        assert_eq!(round_ratio(3, 7), 0);
        assert_eq!(round_ratio(4, 7), 1);
        assert_eq!(round_ratio(7, 2), 4); // 3.5 rounds up
        assert_eq!(round_ratio(5, 0), 0);
        assert_eq!(round_ratio(u64::MAX, 1), u64::MAX);
        assert_eq!(round_ratio(u64::MAX, u64::MAX), 1);
    }

    #[test]
    fn test_window_dates_cross_month() {
        let dates = window_dates(date(3, 2), 7);
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], date(2, 25));
        assert_eq!(dates[6], date(3, 2));
    }

    #[test]
    fn test_empty_ledger_report() {
        let report = compute_report(&[], date(5, 10), 7, 600);

        assert_eq!(report.days.len(), 7);
        assert!(report.days.iter().all(|d| d.total_minutes == 0));
        assert_eq!(report.total_minutes, 0);
        assert_eq!(report.average_daily_minutes, 0);
        assert_eq!(report.utilization_rate, 0);
        assert_eq!(report.chart_max_minutes, 60);
        assert!(report.categories.is_empty());
    }

    #[test]
    fn test_single_session_scenario() {
        let today = date(5, 10);
        let records = vec![
            record(today, "stopwatch_deep_work", 30),
            record(today, "stopwatch_deep_work", 30),
            record(today, "stopwatch_deep_work", 5),
        ];

        let report = compute_report(&records, today, 7, 600);

        assert_eq!(report.days.last().unwrap().date, today);
        assert_eq!(report.days.last().unwrap().total_minutes, 1);
        assert_eq!(report.total_minutes, 1);
        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.categories[0].category, "stopwatch");
        assert_eq!(report.categories[0].total_minutes, 1);
        assert_eq!(report.categories[0].share, 100);
    }

    #[test]
    fn test_day_totals_match_window_records() {
        let today = date(5, 10);
        let records = vec![
            record(date(5, 4), "learning_ds", 1800),
            record(date(5, 6), "market_analysis", 600),
            record(date(5, 6), "rehab_phase_1", 1200),
            record(date(5, 10), "stopwatch_reading", 3600),
            // Outside the window
            record(date(5, 3), "learning_ds", 6000),
            record(date(5, 11), "learning_ds", 6000),
        ];

        let report = compute_report(&records, today, 7, 600);

        let in_window: u64 = records
            .iter()
            .filter(|r| r.date >= date(5, 4) && r.date <= today)
            .map(|r| r.duration_seconds)
            .sum();
        let day_sum: u64 = report.days.iter().map(|d| d.total_minutes).sum();

        assert_eq!(day_sum, in_window / 60);
        assert_eq!(report.total_minutes, 120);
        // round(120 / 7) = round(17.14) = 17
        assert_eq!(report.average_daily_minutes, 17);
        // round(17 / 600 * 100) = round(2.83) = 3
        assert_eq!(report.utilization_rate, 3);
        assert_eq!(report.chart_max_minutes, 60);
    }

    #[test]
    fn test_category_breakdown_shares() {
        let today = date(5, 10);
        let records = vec![
            record(today, "learning_ds", 60 * 60),
            record(today, "market_analysis", 30 * 60),
            record(today, "rehab_phase_2", 30 * 60),
        ];

        let report = compute_report(&records, today, 7, 600);

        let names: Vec<_> = report.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["learning", "market", "rehab"]);
        assert_eq!(report.categories[0].share, 50);
        assert_eq!(report.categories[1].share, 25);
        assert_eq!(report.categories[2].share, 25);
        assert_eq!(report.chart_max_minutes, 120);
    }

    #[test]
    fn test_category_breakdown_covers_whole_ledger() {
        let today = date(5, 10);
        let records = vec![
            record(today, "learning_ds", 60 * 60),
            // Older than the window: counts for its category only
            record(date(4, 1), "learning_ds", 60 * 60),
            record(date(4, 1), "market_analysis", 30 * 60),
        ];

        let report = compute_report(&records, today, 7, 600);

        assert_eq!(report.total_minutes, 60);
        let names: Vec<_> = report.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["learning", "market"]);
        assert_eq!(report.categories[0].total_minutes, 120);
        assert_eq!(report.categories[0].share, 200);
        assert_eq!(report.categories[1].total_minutes, 30);
        assert_eq!(report.categories[1].share, 50);
    }

    #[test]
    fn test_categories_without_window_time_have_zero_share() {
        let today = date(5, 10);
        let records = vec![record(date(3, 1), "rehab_phase_1", 600)];

        let report = compute_report(&records, today, 7, 600);
        assert_eq!(report.total_minutes, 0);
        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.categories[0].total_minutes, 10);
        assert_eq!(report.categories[0].share, 0);
    }

    #[test]
    fn test_large_totals_saturate() {
        let today = date(5, 10);
        let records: Vec<_> = (0..4)
            .map(|_| record(today, "learning_ds", u64::MAX / 2))
            .collect();

        let report = compute_report(&records, today, 7, 600);
        assert_eq!(report.days.last().unwrap().total_minutes, u64::MAX / 60);
        assert_eq!(report.categories[0].total_minutes, u64::MAX / 60);
        assert!(report.utilization_rate > 100);
    }

    #[test]
    fn test_report_after_oversized_import() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(HistoryLedger::new(store));
        let clock = Arc::new(FixedClock::new(date(5, 10)));
        let aggregator = ReportAggregator::new(ledger.clone(), clock);

        let huge = r#"[
            {"date":"2024-05-10","activityId":"learning_ds","durationSeconds":18446744073709551615},
            {"date":"2024-05-10","activityId":"learning_ds","durationSeconds":1}
        ]"#;
        assert!(ledger.import_json(huge).is_err());

        let report = aggregator.build_report(ReportWindow::Week);
        assert_eq!(report.total_minutes, 0);
        assert!(report.categories.is_empty());
    }

    #[test]
    fn test_full_days_reach_full_utilization() {
        let today = date(5, 10);
        let records: Vec<_> = window_dates(today, 7)
            .into_iter()
            .map(|d| record(d, "learning_frm", 600 * 60))
            .collect();

        let report = compute_report(&records, today, 7, 600);
        assert_eq!(report.average_daily_minutes, 600);
        assert_eq!(report.utilization_rate, 100);
    }

    #[test]
    fn test_aggregator_reads_ledger_each_time() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(HistoryLedger::new(store));
        let clock = Arc::new(FixedClock::new(date(5, 10)));
        let aggregator = ReportAggregator::new(ledger.clone(), clock.clone());

        assert_eq!(aggregator.build_report(ReportWindow::Week).total_minutes, 0);

        ledger.append(record(date(5, 10), "market_analysis", 120)).unwrap();
        let report = aggregator.build_report(ReportWindow::Month);
        assert_eq!(report.window_days, 30);
        assert_eq!(report.days.len(), 30);
        assert_eq!(report.total_minutes, 2);

        // Eight days later the record has left the weekly window
        clock.advance_days(8);
        assert_eq!(aggregator.build_report(ReportWindow::Week).total_minutes, 0);
        assert_eq!(aggregator.build_report(ReportWindow::Month).total_minutes, 2);
    }

    #[test]
    fn test_report_window_parse() {
        assert_eq!("week".parse::<ReportWindow>(), Ok(ReportWindow::Week));
        assert_eq!("Month".parse::<ReportWindow>(), Ok(ReportWindow::Month));
        assert_eq!("30".parse::<ReportWindow>(), Ok(ReportWindow::Month));
        assert!("year".parse::<ReportWindow>().is_err());
    }
}
