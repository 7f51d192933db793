//! Time trigger engine — pure calendar math for announcements and ticks.
//!
//! Everything here is a function of a caller-supplied "now"; nothing reads
//! the wall clock or performs IO, so the scheduling rules are testable at
//! fixed instants.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::Regex;
use std::sync::OnceLock;

use muster_core::error::{MusterError, Result};

/// Matches "HHMM" (exactly four digits) or "HH:MM", with hour 00-23 and
/// minute 00-59.
fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[01][0-9]|2[0-3]):?[0-5][0-9]$").expect("time regex compiles")
    })
}

/// Check a session-time string against the accepted shapes.
pub fn is_valid_time(time: &str) -> bool {
    time_re().is_match(time)
}

/// Normalize "2000" to "20:00". Already-canonical strings pass through,
/// so the function is idempotent.
pub fn format_time(time: &str) -> String {
    if time.len() == 4 && time.chars().all(|c| c.is_ascii_digit()) {
        format!("{}:{}", &time[..2], &time[2..])
    } else {
        time.to_string()
    }
}

/// Validate and canonicalize a session-time string.
pub fn normalize_time(time: &str) -> Result<String> {
    if is_valid_time(time) {
        Ok(format_time(time))
    } else {
        Err(MusterError::InvalidTime(time.to_string()))
    }
}

/// Parse a canonical "HH:MM" string.
pub fn parse_hhmm(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time, "%H:%M").ok()
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Default time-of-day when no explicit override is given: weekend
/// afternoons (before 17:00) run at 15:00, everything else at 20:00.
pub fn default_session_time(now: NaiveDateTime) -> &'static str {
    if is_weekend(now.weekday()) && now.time().hour() < 17 {
        "15:00"
    } else {
        "20:00"
    }
}

/// Next instant strictly after `now` that falls on one of `days` at `at`.
/// Days wrap weekly; with an empty filter the candidate a week out is
/// returned as a safe fallback.
pub fn next_occurrence(days: &[Weekday], at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    for offset in 0..=7 {
        let date = now.date() + Duration::days(offset);
        let candidate = date.and_time(at);
        if candidate > now && days.contains(&date.weekday()) {
            return candidate;
        }
    }
    (now.date() + Duration::days(7)).and_time(at)
}

/// Delay until a one-off target instant. `None` when the target is not
/// strictly in the future: the action is silently not armed.
pub fn delay_until(target: NaiveDateTime, now: NaiveDateTime) -> Option<std::time::Duration> {
    (target - now)
        .to_std()
        .ok()
        .filter(|d| !d.is_zero())
}

pub const EVERY_DAY: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

/// What a standing rule does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Start-of-day reset and reannounce at the default time.
    MorningReset,
    /// Weekend-only reannounce for the 15:00 slot.
    AfternoonReannounce,
    /// 20:00 reminder fan-out; weekends also reannounce the evening slot.
    EveningReminder,
}

/// A recurring day-filtered rule. Immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct TriggerRule {
    pub name: &'static str,
    pub days: &'static [Weekday],
    pub at: NaiveTime,
    pub tick: Tick,
}

impl TriggerRule {
    /// Next fire instant strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        next_occurrence(self.days, self.at, now)
    }
}

/// The standing rules configured at startup.
pub fn standing_rules() -> Vec<TriggerRule> {
    let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).expect("valid rule time");
    vec![
        TriggerRule {
            name: "daily-reset",
            days: &EVERY_DAY,
            at: hm(0, 0),
            tick: Tick::MorningReset,
        },
        TriggerRule {
            name: "weekend-afternoon",
            days: &WEEKEND,
            at: hm(15, 0),
            tick: Tick::AfternoonReannounce,
        },
        TriggerRule {
            name: "evening-reminder",
            days: &EVERY_DAY,
            at: hm(20, 0),
            tick: Tick::EveningReminder,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_valid_shapes() {
        for ok in ["2000", "20:00", "0000", "00:00", "2359", "23:59", "09:30"] {
            assert!(is_valid_time(ok), "{ok} should be valid");
        }
    }

    #[test]
    fn test_invalid_shapes() {
        for bad in [
            "2400", "24:00", "2060", "20:60", "930", "9:30", "20:0", "20 00", "abcd", "", "20::00",
        ] {
            assert!(!is_valid_time(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_format_time_idempotent() {
        for valid in ["2000", "20:00", "0915", "23:59"] {
            let once = format_time(valid);
            assert_eq!(format_time(&once), once);
            assert!(once.contains(':'));
        }
    }

    #[test]
    fn test_normalize_rejects() {
        assert!(normalize_time("25:00").is_err());
        assert_eq!(normalize_time("0915").unwrap(), "09:15");
    }

    #[test]
    fn test_default_time_saturday_morning() {
        // 2026-08-22 is a Saturday
        assert_eq!(default_session_time(at(2026, 8, 22, 10, 0)), "15:00");
    }

    #[test]
    fn test_default_time_saturday_evening() {
        assert_eq!(default_session_time(at(2026, 8, 22, 18, 0)), "20:00");
    }

    #[test]
    fn test_default_time_weekday() {
        // 2026-08-25 is a Tuesday
        assert_eq!(default_session_time(at(2026, 8, 25, 9, 0)), "20:00");
    }

    #[test]
    fn test_next_occurrence_same_day() {
        let now = at(2026, 8, 25, 9, 0);
        let next = next_occurrence(&EVERY_DAY, NaiveTime::from_hms_opt(20, 0, 0).unwrap(), now);
        assert_eq!(next, at(2026, 8, 25, 20, 0));
    }

    #[test]
    fn test_next_occurrence_rolls_past_today() {
        let now = at(2026, 8, 25, 21, 0);
        let next = next_occurrence(&EVERY_DAY, NaiveTime::from_hms_opt(20, 0, 0).unwrap(), now);
        assert_eq!(next, at(2026, 8, 26, 20, 0));
    }

    #[test]
    fn test_next_occurrence_weekend_filter_wraps() {
        // Sunday 16:00 -> next weekend 15:00 slot is Saturday
        let now = at(2026, 8, 23, 16, 0);
        let next = next_occurrence(&WEEKEND, NaiveTime::from_hms_opt(15, 0, 0).unwrap(), now);
        assert_eq!(next, at(2026, 8, 29, 15, 0));
        assert_eq!(next.weekday(), Weekday::Sat);
    }

    #[test]
    fn test_delay_until_past_is_none() {
        let now = at(2026, 8, 25, 21, 0);
        assert!(delay_until(at(2026, 8, 25, 20, 0), now).is_none());
        assert!(delay_until(now, now).is_none());
    }

    #[test]
    fn test_delay_until_future() {
        let now = at(2026, 8, 25, 19, 0);
        let delay = delay_until(at(2026, 8, 25, 20, 0), now).unwrap();
        assert_eq!(delay.as_secs(), 3600);
    }

    #[test]
    fn test_standing_rules_fire_in_order() {
        // Saturday just after midnight: reset already passed, afternoon next
        let now = at(2026, 8, 22, 0, 1);
        let rules = standing_rules();
        let afternoon = rules.iter().find(|r| r.tick == Tick::AfternoonReannounce).unwrap();
        let evening = rules.iter().find(|r| r.tick == Tick::EveningReminder).unwrap();
        assert_eq!(afternoon.next_after(now), at(2026, 8, 22, 15, 0));
        assert_eq!(evening.next_after(now), at(2026, 8, 22, 20, 0));
    }
}
