//! Duration conversion between human units and milliseconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Time units understood by step options and display breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in milliseconds.
    pub const fn as_millis(self) -> u64 {
        match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ms" | "millisecond" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" | "secs" | "second" | "seconds" => Ok(TimeUnit::Seconds),
            "m" | "min" | "mins" | "minute" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Ok(TimeUnit::Hours),
            "d" | "day" | "days" => Ok(TimeUnit::Days),
            _ => Err(ConvertError::InvalidUnit(s.to_string())),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert `value` expressed in `unit` to whole milliseconds.
///
/// The result is rounded to the nearest millisecond. Negative values are
/// converted as-is; rejecting them is up to the caller.
pub fn convert(value: f64, unit: &str) -> Result<i64, ConvertError> {
    let unit: TimeUnit = unit.parse()?;
    convert_in(value, unit)
}

/// Same as [`convert`] for an already parsed unit.
pub fn convert_in(value: f64, unit: TimeUnit) -> Result<i64, ConvertError> {
    if !value.is_finite() {
        return Err(ConvertError::InvalidValue(value));
    }

    let ms = (value * unit.as_millis() as f64).round();
    if ms < i64::MIN as f64 || ms >= i64::MAX as f64 {
        return Err(ConvertError::InvalidValue(value));
    }
    Ok(ms as i64)
}

/// A millisecond count split across a set of display units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBreakdown {
    parts: Vec<(TimeUnit, u64)>,
}

impl TimeBreakdown {
    /// Greedy split, largest unit first. Whatever is left below the smallest
    /// unit is dropped.
    pub fn from_millis(ms: u64, units: &[TimeUnit]) -> Self {
        let mut sorted: Vec<TimeUnit> = units.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        let mut rest = ms;
        let parts = sorted
            .into_iter()
            .map(|unit| {
                let count = rest / unit.as_millis();
                rest %= unit.as_millis();
                (unit, count)
            })
            .collect();

        TimeBreakdown { parts }
    }

    /// Count for `unit`, or `None` if the unit is not part of the breakdown.
    pub fn get(&self, unit: TimeUnit) -> Option<u64> {
        self.parts
            .iter()
            .find(|(u, _)| *u == unit)
            .map(|(_, count)| *count)
    }

    pub fn parts(&self) -> &[(TimeUnit, u64)] {
        &self.parts
    }
}

impl fmt::Display for TimeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (unit, count)) in self.parts.iter().enumerate() {
            if i == 0 {
                write!(f, "{}{}", count, unit.suffix())?;
            } else if *unit == TimeUnit::Milliseconds {
                write!(f, " {:03}{}", count, unit.suffix())?;
            } else {
                write!(f, " {:02}{}", count, unit.suffix())?;
            }
        }
        Ok(())
    }
}
