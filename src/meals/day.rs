use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

use crate::error::ApiError;

const DAY_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// A calendar day in UTC. Every timestamp buckets into exactly one
/// `DayKey`; bucketing never consults a client timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(Date);

impl DayKey {
    /// The day a timestamp falls on, in UTC.
    pub fn bucket(ts: OffsetDateTime) -> Self {
        Self(ts.to_offset(time::UtcOffset::UTC).date())
    }

    pub fn today() -> Self {
        Self::bucket(OffsetDateTime::now_utc())
    }

    /// Half-open UTC bounds `[start, end)` covering this day. A timestamp
    /// belongs to the day iff `start <= ts < end`, so midnight lands on
    /// the day it starts, never the day before. On the last representable
    /// day the end saturates at the maximum supported instant.
    pub fn bounds(&self) -> (OffsetDateTime, OffsetDateTime) {
        let start = PrimitiveDateTime::new(self.0, Time::MIDNIGHT).assume_utc();
        let end = start
            .checked_add(Duration::days(1))
            .unwrap_or(PrimitiveDateTime::MAX.assume_utc());
        (start, end)
    }

    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        let (start, end) = self.bounds();
        ts >= start && ts < end
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .0
            .format(&DAY_FORMAT)
            .map_err(|_| fmt::Error)?;
        f.write_str(&formatted)
    }
}

impl FromStr for DayKey {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Date::parse(s, &DAY_FORMAT)
            .map(DayKey)
            .map_err(|_| ApiError::validation(format!("invalid date: {s}")))
    }
}

impl Serialize for DayKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
