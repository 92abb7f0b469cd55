//! Rotation decision logic
//!
//! Pure functions of (size, now, config); the rotator owns the clock and the I/O.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use tidelog_core::{Frequency, RotationConfig};

/// Decides when a stream rotates
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    config: RotationConfig,
    next_rotation: Option<DateTime<Utc>>,
}

impl RotationPolicy {
    /// Create a policy with its first scheduled rotation computed from `now`
    pub fn new(config: RotationConfig, now: DateTime<Utc>) -> Self {
        let next_rotation = next_rotation_after(&config, now);
        Self {
            config,
            next_rotation,
        }
    }

    /// Whether rotation is due, advancing the schedule when the time trigger fires.
    ///
    /// Calling this again before the next period returns false for the time
    /// trigger, so one deadline causes at most one rotation.
    pub fn should_rotate(&mut self, current_size: u64, now: DateTime<Utc>) -> bool {
        let size_due = self.size_due(current_size);
        let time_due = self.time_due(now);
        if time_due {
            self.next_rotation = next_rotation_after(&self.config, now);
        }
        size_due || time_due
    }

    /// Same decision as [`should_rotate`](Self::should_rotate) without touching the schedule
    pub fn is_due(&self, current_size: u64, now: DateTime<Utc>) -> bool {
        self.size_due(current_size) || self.time_due(now)
    }

    /// Next scheduled time-based rotation, `None` for size-only policies
    pub fn next_rotation(&self) -> Option<DateTime<Utc>> {
        self.next_rotation
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    fn size_due(&self, current_size: u64) -> bool {
        current_size >= self.config.max_size
    }

    fn time_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.next_rotation, Some(next) if now >= next)
    }
}

/// First rotation instant strictly after `now` for the configured frequency
pub fn next_rotation_after(config: &RotationConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(config.rotate_hour, config.rotate_minute, 0)?;
    let today = now.date_naive();

    match config.frequency {
        Frequency::None => None,
        Frequency::Daily => {
            let candidate = at(today, time);
            if candidate > now {
                Some(candidate)
            } else {
                Some(candidate + Duration::days(1))
            }
        }
        Frequency::Weekly => {
            let current = today.weekday().num_days_from_sunday() as i64;
            let target = config.rotate_day_of_week as i64;
            let days_ahead = (target - current).rem_euclid(7);
            let candidate = at(today + Duration::days(days_ahead), time);
            if candidate > now {
                Some(candidate)
            } else {
                Some(candidate + Duration::days(7))
            }
        }
        Frequency::Monthly => {
            let this_month = month_day(today.year(), today.month(), config.rotate_day_of_month)?;
            let candidate = at(this_month, time);
            if candidate > now {
                return Some(candidate);
            }
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let next_month = month_day(year, month, config.rotate_day_of_month)?;
            Some(at(next_month, time))
        }
    }
}

fn at(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}

/// `day` of the given month, clamped to the month's last day
fn month_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last))
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}
