use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::Notification;
use crate::error::{AppError, AppResult};

/// Daily time of day, validated to hour 0-23 and minute 0-59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleTime {
    hour: u32,
    minute: u32,
}

impl ScheduleTime {
    pub fn new(hour: i64, minute: i64) -> AppResult<Self> {
        if !(0..=23).contains(&hour) || !(0..=59).contains(&minute) {
            return Err(AppError::InvalidTime { hour, minute });
        }

        Ok(Self {
            hour: hour as u32,
            minute: minute as u32,
        })
    }

    /// Parse an `HH:MM` string. A malformed string is an input error, a
    /// well-formed one with out-of-range parts is a time error.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let invalid = || AppError::InvalidInput("Invalid schedule time format.".to_string());

        let (hour, minute) = raw.trim().split_once(':').ok_or_else(invalid)?;
        let hour: i64 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: i64 = minute.trim().parse().map_err(|_| invalid())?;

        Self::new(hour, minute)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn cron_expression(&self) -> String {
        format!("{} {} * * *", self.minute, self.hour)
    }

    fn naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default()
    }

    /// First instant strictly after `after` whose local wall clock reads
    /// `hour:minute`. Days where that wall time does not exist are skipped.
    pub fn next_occurrence<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let time = self.naive_time();
        let mut date = after.date_naive();

        loop {
            if let Some(candidate) = tz.from_local_datetime(&date.and_time(time)).earliest() {
                if candidate > *after {
                    return Some(candidate);
                }
            }
            date = date.succ_opt()?;
        }
    }
}

/// A recurring daily trigger bound to a fixed payload.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub time: ScheduleTime,
    pub cron: String,
    pub notification: Notification,
    pub fire_count: u64,
    pub created_at: DateTime<Utc>,
}

impl ScheduleEntry {
    pub fn new(time: ScheduleTime, notification: Notification) -> Self {
        Self {
            id: Uuid::new_v4(),
            cron: time.cron_expression(),
            time,
            notification,
            fire_count: 0,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_zero_padded_time() {
        let time = ScheduleTime::parse("09:30").unwrap();
        assert_eq!((time.hour(), time.minute()), (9, 30));
        assert_eq!(time.cron_expression(), "30 9 * * *");
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            ScheduleTime::new(24, 0),
            Err(AppError::InvalidTime { hour: 24, minute: 0 })
        ));
        assert!(matches!(
            ScheduleTime::new(12, 60),
            Err(AppError::InvalidTime { .. })
        ));
        assert!(matches!(
            ScheduleTime::new(-1, 10),
            Err(AppError::InvalidTime { .. })
        ));
        assert!(matches!(
            ScheduleTime::parse("25:00"),
            Err(AppError::InvalidTime { .. })
        ));
    }

    #[test]
    fn rejects_malformed_strings() {
        for raw in ["", "0930", "ab:cd", "9:", "9.5:10"] {
            assert!(
                matches!(ScheduleTime::parse(raw), Err(AppError::InvalidInput(_))),
                "{raw:?} should be a format error"
            );
        }
    }

    #[test]
    fn next_occurrence_later_today() {
        let time = ScheduleTime::new(9, 30).unwrap();
        let next = time.next_occurrence(&at("2024-03-10T08:00:00Z")).unwrap();
        assert_eq!(next, at("2024-03-10T09:30:00Z"));
    }

    #[test]
    fn next_occurrence_is_strictly_after() {
        let time = ScheduleTime::new(9, 30).unwrap();

        let next = time.next_occurrence(&at("2024-03-10T09:30:00Z")).unwrap();
        assert_eq!(next, at("2024-03-11T09:30:00Z"));

        let next = time.next_occurrence(&at("2024-03-10T23:59:00Z")).unwrap();
        assert_eq!(next, at("2024-03-11T09:30:00Z"));
    }

    #[test]
    fn next_occurrence_uses_local_wall_clock() {
        let offset = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let after = at("2024-03-10T06:00:00Z").with_timezone(&offset);
        let time = ScheduleTime::new(9, 0).unwrap();

        let next = time.next_occurrence(&after).unwrap();
        assert_eq!(next.with_timezone(&Utc), at("2024-03-10T07:00:00Z"));
    }

    #[test]
    fn new_entry_carries_cron_expression() {
        let entry = ScheduleEntry::new(
            ScheduleTime::new(7, 5).unwrap(),
            Notification::new("Morning", "Coffee"),
        );
        assert_eq!(entry.cron, "5 7 * * *");
        assert_eq!(entry.fire_count, 0);
    }
}
