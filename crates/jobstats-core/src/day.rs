//! Day-bucket key derivation.
//!
//! Every execution timestamp is folded into a `DayKey`: the calendar day it
//! falls on in UTC. UTC is pinned cluster-wide so two nodes in different local
//! zones never attribute the same completion to different buckets.
//!
//! Wire form is the RFC 3339 instant of the day's midnight
//! (`2026-10-19T00:00:00Z`). Parsing also accepts a bare `YYYY-MM-DD`.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical identifier of a UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Derive the day bucket for a timestamp in any zone.
    ///
    /// Time-of-day and the source offset are discarded after converting to UTC.
    pub fn from_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> Self {
        Self(ts.with_timezone(&Utc).date_naive())
    }

    /// Build from calendar components. Returns `None` for an invalid date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Midnight UTC at the start of this day.
    pub fn start(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    /// The day `n` days before this one.
    pub fn days_before(&self, n: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(n)).map(Self)
    }

    /// The day `n` days after this one.
    pub fn days_after(&self, n: u64) -> Option<Self> {
        self.0.checked_add_days(Days::new(n)).map(Self)
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Error returned when a string is neither `YYYY-MM-DD` nor RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid day key: {0}")]
pub struct ParseDayKeyError(String);

impl FromStr for DayKey {
    type Err = ParseDayKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self(date));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|ts| Self::from_timestamp(&ts))
            .map_err(|_| ParseDayKeyError(s.to_string()))
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.start().to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
