use std::fmt;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/// Calendar breakdown of the simulation time, as stamped into raw packets
/// and log rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub microsecond: i32,
}

/// Absolute-time cursor for the simulation.
///
/// Advanced only by the outermost tick loop; everything else reads it,
/// optionally offset by a number of seconds into the future.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    date_time: DateTime<Utc>,
    last_increment_s: u64,
    elapsed_s: u64,
    ticks: u64,
}

impl SimulationClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            date_time: start,
            last_increment_s: 0,
            elapsed_s: 0,
            ticks: 0,
        }
    }

    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
            .map(Self::new)
    }

    /// Advances the clock by `seconds` and counts one tick.
    pub fn tick(&mut self, seconds: u64) {
        self.last_increment_s = seconds;
        self.elapsed_s += seconds;
        self.date_time = self.date_time + Duration::seconds(seconds as i64);
        self.ticks += 1;
    }

    /// Absolute time at `offset_s` seconds past the cursor.
    pub fn date_time(&self, offset_s: u64) -> DateTime<Utc> {
        self.date_time + Duration::seconds(offset_s as i64)
    }

    pub fn elapsed_s(&self) -> u64 {
        self.elapsed_s
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_increment_s(&self) -> u64 {
        self.last_increment_s
    }

    pub fn calendar(&self) -> Calendar {
        let t = self.date_time;
        Calendar {
            year: t.year(),
            month: t.month() as i32,
            day: t.day() as i32,
            hour: t.hour() as i32,
            minute: t.minute() as i32,
            second: t.second() as i32,
            microsecond: t.timestamp_subsec_micros() as i32,
        }
    }

    /// Julian date at `offset_s` seconds past the cursor.
    pub fn julian_date(&self, offset_s: u64) -> f64 {
        let unix_s = self.date_time(offset_s).timestamp() as f64;
        2440587.5 + unix_s / 86400.0
    }
}

impl fmt::Display for SimulationClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date_time.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_cursor_and_counters() {
        let mut clock = SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap();
        clock.tick(10);
        clock.tick(10);
        assert_eq!(clock.elapsed_s(), 20);
        assert_eq!(clock.ticks(), 2);
        assert_eq!(clock.last_increment_s(), 10);
        assert_eq!(clock.calendar().second, 20);
    }

    #[test]
    fn calendar_rolls_over_midnight() {
        let mut clock = SimulationClock::from_ymd_hms(2020, 7, 12, 23, 59, 50).unwrap();
        clock.tick(20);
        let cal = clock.calendar();
        assert_eq!(cal.day, 13);
        assert_eq!(cal.hour, 0);
        assert_eq!(cal.minute, 0);
        assert_eq!(cal.second, 10);
    }

    #[test]
    fn julian_date_of_unix_epoch() {
        let clock = SimulationClock::from_ymd_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert!((clock.julian_date(0) - 2440587.5).abs() < 1e-9);
    }
}
