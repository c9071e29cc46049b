//! Per-day time axis for gridded output.
//!
//! A [`TimeAxis`] is built fresh for every output day and never mutated,
//! so nothing about one day's time steps can leak into the next.

use crate::config::AveragingPeriod;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};

/// Start, step length and step count of one output day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAxis {
    start: DateTime<Utc>,
    step_hours: u32,
    n_steps: usize,
}

impl TimeAxis {
    /// Axis covering `date` from 00:00 UTC in steps of the averaging period
    pub fn for_day(date: NaiveDate, averaging: AveragingPeriod) -> Self {
        Self {
            start: date.and_time(NaiveTime::MIN).and_utc(),
            step_hours: averaging.hours(),
            n_steps: averaging.steps_per_day(),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn step_duration(&self) -> Duration {
        Duration::hours(self.step_hours as i64)
    }

    /// IOAPI start date, `YYYYJJJ`
    pub fn sdate(&self) -> i32 {
        ioapi_date(self.start)
    }

    /// IOAPI start time, `HHMMSS`
    pub fn stime(&self) -> i32 {
        ioapi_time(self.start)
    }

    /// IOAPI time step, `HHMMSS`
    pub fn tstep(&self) -> i32 {
        self.step_hours as i32 * 10000
    }

    /// Time-step index of each timestamp
    ///
    /// Indices are whole steps elapsed since the axis start (floored), so
    /// timestamps before the start are negative and timestamps past the
    /// last step are `>= n_steps`.
    pub fn time_to_step(&self, timestamps: &[DateTime<Utc>]) -> Vec<f64> {
        let step_seconds = self.step_duration().num_seconds() as f64;
        timestamps
            .iter()
            .map(|t| {
                let elapsed = t.signed_duration_since(self.start);
                let seconds = elapsed.num_seconds() as f64
                    + elapsed.subsec_nanos() as f64 / 1_000_000_000.0;
                (seconds / step_seconds).floor()
            })
            .collect()
    }

    /// IOAPI `(YYYYJJJ, HHMMSS)` flag for every step
    pub fn tflags(&self) -> Vec<(i32, i32)> {
        (0..self.n_steps)
            .map(|step| {
                let t = self.start + self.step_duration() * step as i32;
                (ioapi_date(t), ioapi_time(t))
            })
            .collect()
    }
}

fn ioapi_date(t: DateTime<Utc>) -> i32 {
    t.year() * 1000 + t.ordinal() as i32
}

fn ioapi_time(t: DateTime<Utc>) -> i32 {
    (t.hour() * 10000 + t.minute() * 100 + t.second()) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_hourly_axis_metadata() {
        let axis = TimeAxis::for_day(day(2020, 2, 1), AveragingPeriod::OneHour);

        assert_eq!(axis.n_steps(), 24);
        assert_eq!(axis.sdate(), 2020032);
        assert_eq!(axis.stime(), 0);
        assert_eq!(axis.tstep(), 10000);
    }

    #[test]
    fn test_daily_axis_metadata() {
        let axis = TimeAxis::for_day(day(2020, 12, 31), AveragingPeriod::TwentyFourHours);

        assert_eq!(axis.n_steps(), 1);
        assert_eq!(axis.sdate(), 2020366);
        assert_eq!(axis.tstep(), 240000);
        assert_eq!(axis.tflags(), vec![(2020366, 0)]);
    }

    #[test]
    fn test_time_to_step() {
        let axis = TimeAxis::for_day(day(2020, 1, 1), AveragingPeriod::OneHour);
        let times = vec![
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 13, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 13, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2019, 12, 31, 23, 0, 0).unwrap(),
        ];

        assert_eq!(
            axis.time_to_step(&times),
            vec![0.0, 13.0, 13.0, 23.0, 24.0, -1.0]
        );
    }

    #[test]
    fn test_tflags_cover_day() {
        let axis = TimeAxis::for_day(day(2020, 1, 1), AveragingPeriod::OneHour);
        let flags = axis.tflags();

        assert_eq!(flags.len(), 24);
        assert_eq!(flags[0], (2020001, 0));
        assert_eq!(flags[1], (2020001, 10000));
        assert_eq!(flags[23], (2020001, 230000));
    }

    #[test]
    fn test_axes_for_different_days_are_independent() {
        let first = TimeAxis::for_day(day(2020, 1, 1), AveragingPeriod::OneHour);
        let second = TimeAxis::for_day(day(2020, 1, 2), AveragingPeriod::OneHour);

        assert_eq!(first.sdate(), 2020001);
        assert_eq!(second.sdate(), 2020002);
        assert_ne!(first, second);
    }
}
