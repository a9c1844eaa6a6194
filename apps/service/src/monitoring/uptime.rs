//! Rolling availability computed from halt incidents.
//!
//! Always recomputed from the full set of incidents overlapping the window, so
//! late or reordered incident data never skews the result.

use serde::Serialize;

use crate::database::models::HaltEvent;
use crate::monitoring::types::HaltSeverity;

pub const DAY_SECONDS: i64 = 24 * 60 * 60;
pub const WEEK_SECONDS: i64 = 7 * DAY_SECONDS;
pub const MONTH_SECONDS: i64 = 30 * DAY_SECONDS;

/// Uptime percentages for the published windows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UptimeWindows {
    pub last_24h: f64,
    pub last_7d: f64,
    pub last_30d: f64,
}

impl UptimeWindows {
    /// Evaluate every window against the same `now`.
    ///
    /// `events` must include everything overlapping the widest window.
    pub fn compute(events: &[HaltEvent], now: i64) -> Self {
        Self {
            last_24h: window_uptime(events, DAY_SECONDS, now),
            last_7d: window_uptime(events, WEEK_SECONDS, now),
            last_30d: window_uptime(events, MONTH_SECONDS, now),
        }
    }
}

/// Seconds of `[now - window, now)` covered by halted incidents.
///
/// Open incidents count up to `now`. Incidents of other severities are ignored.
pub fn downtime_seconds(events: &[HaltEvent], window_seconds: i64, now: i64) -> i64 {
    let window_start = now - window_seconds;

    events
        .iter()
        .filter(|event| event.severity == HaltSeverity::Halted)
        .map(|event| {
            let end = event.ended_at.unwrap_or(now).min(now);
            let start = event.started_at.max(window_start);
            (end - start).max(0)
        })
        .sum()
}

/// Availability in percent, clamped to `[0, 100]` and rounded to two decimals.
pub fn uptime_percent(window_seconds: i64, downtime_seconds: i64) -> f64 {
    if window_seconds <= 0 {
        return 100.0;
    }

    let uptime = (window_seconds - downtime_seconds) as f64 / window_seconds as f64 * 100.0;
    ((uptime * 100.0).round() / 100.0).clamp(0.0, 100.0)
}

pub fn window_uptime(events: &[HaltEvent], window_seconds: i64, now: i64) -> f64 {
    uptime_percent(window_seconds, downtime_seconds(events, window_seconds, now))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn event(started_at: i64, ended_at: Option<i64>, severity: HaltSeverity) -> HaltEvent {
        HaltEvent {
            id: 1,
            network_id: "bitcoin".to_string(),
            severity,
            started_at,
            ended_at,
            duration_seconds: ended_at.map(|end| end - started_at),
        }
    }

    #[test]
    fn test_one_hour_halt_in_a_day() {
        let events = vec![event(NOW - 7_200, Some(NOW - 3_600), HaltSeverity::Halted)];
        assert_eq!(downtime_seconds(&events, DAY_SECONDS, NOW), 3_600);
        assert_eq!(window_uptime(&events, DAY_SECONDS, NOW), 95.83);
    }

    #[test]
    fn test_open_event_counts_until_now() {
        let events = vec![event(NOW - 1_800, None, HaltSeverity::Halted)];
        assert_eq!(downtime_seconds(&events, DAY_SECONDS, NOW), 1_800);
        assert_eq!(window_uptime(&events, DAY_SECONDS, NOW), 97.92);
    }

    #[test]
    fn test_event_is_clipped_to_the_window() {
        // Started two days ago, ended 12h ago: only 12h fall inside the last day.
        let events =
            vec![event(NOW - 2 * DAY_SECONDS, Some(NOW - DAY_SECONDS / 2), HaltSeverity::Halted)];
        assert_eq!(downtime_seconds(&events, DAY_SECONDS, NOW), DAY_SECONDS / 2);
        assert_eq!(window_uptime(&events, DAY_SECONDS, NOW), 50.0);
    }

    #[test]
    fn test_events_outside_the_window_do_not_count() {
        let events = vec![event(NOW - 3 * DAY_SECONDS, Some(NOW - 2 * DAY_SECONDS), HaltSeverity::Halted)];
        assert_eq!(window_uptime(&events, DAY_SECONDS, NOW), 100.0);
        assert!(window_uptime(&events, WEEK_SECONDS, NOW) < 100.0);
    }

    #[test]
    fn test_slow_events_are_not_downtime() {
        let events = vec![event(NOW - 3_600, None, HaltSeverity::Slow)];
        assert_eq!(window_uptime(&events, DAY_SECONDS, NOW), 100.0);
    }

    #[test]
    fn test_uptime_is_clamped() {
        assert_eq!(uptime_percent(DAY_SECONDS, 2 * DAY_SECONDS), 0.0);
        assert_eq!(uptime_percent(DAY_SECONDS, -10), 100.0);
        assert_eq!(uptime_percent(0, 10), 100.0);
    }

    #[test]
    fn test_windows_share_one_event_list() {
        let events = vec![event(NOW - 2 * DAY_SECONDS, Some(NOW - 2 * DAY_SECONDS + 8_640), HaltSeverity::Halted)];
        let windows = UptimeWindows::compute(&events, NOW);
        assert_eq!(windows.last_24h, 100.0);
        assert_eq!(windows.last_7d, 98.57);
        assert_eq!(windows.last_30d, 99.67);
    }
}
