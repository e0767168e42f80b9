use crate::SnowpackError;
use chrono::{Datelike, NaiveDate, NaiveTime};

/// Month and day a hydrological year starts on.
pub const HYDROLOGICAL_YEAR_START: (u32, u32) = (10, 1);

/// A half-open range of calendar days, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DayRange {
    /// Returns a range over `[start, end)`, failing unless `end` is
    /// after `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SnowpackError> {
        if end <= start {
            return Err(SnowpackError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day of the range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Day after the last day of the range.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns the number of days in this range.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        usize::try_from((self.end - self.start).num_days()).unwrap_or_default()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    /// Returns every day of this range in chronological order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.len())
    }

    /// Returns the hydrological years starting in `[year(start),
    /// year(end))`, each running from October 1 to the following
    /// October 1.
    pub fn hydrological_years(&self) -> Result<Vec<(i32, DayRange)>, SnowpackError> {
        let (month, day) = HYDROLOGICAL_YEAR_START;
        let invalid = || SnowpackError::InvalidRange {
            start: self.start,
            end: self.end,
        };
        let years = (self.start.year()..self.end.year())
            .map(|year| {
                let start = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
                let end = NaiveDate::from_ymd_opt(year + 1, month, day).ok_or_else(invalid)?;
                Ok((year, DayRange::new(start, end)?))
            })
            .collect::<Result<Vec<_>, SnowpackError>>()?;
        if years.is_empty() {
            return Err(invalid());
        }
        Ok(years)
    }

    /// Returns `<yyyymmdd>to<yyyymmdd>`, used in product names.
    pub fn label(&self) -> String {
        format!(
            "{}to{}",
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

/// Returns the `yyyy_MM_dd` index of `day`.
pub fn day_index(day: NaiveDate) -> String {
    day.format("%Y_%m_%d").to_string()
}

/// Returns the start of `day` in milliseconds since the Unix epoch.
pub fn time_start(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
