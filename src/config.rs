//! Construction options and their validation.
//!
//! Options are deliberately loose (strings and floats, every field optional)
//! so they can come straight from JSON or a settings file. [`TimerOptions::resolve`]
//! turns them into [`TimerSettings`] and never fails: a malformed field is
//! logged and replaced by its default.

use serde::{Deserialize, Serialize};

use crate::state::Direction;
use crate::units::{self, TimeUnit};

pub const DEFAULT_SESSION_MS: u64 = 25 * 60 * 1_000;
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_COUNT_UNITS: [TimeUnit; 3] = [TimeUnit::Hours, TimeUnit::Minutes, TimeUnit::Seconds];

/// A step value as supplied by the caller, e.g. `{ "value": 25, "units": "minutes" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOption {
    pub value: f64,
    pub units: String,
}

impl StepOption {
    pub fn new(value: f64, units: impl Into<String>) -> Self {
        StepOption {
            value,
            units: units.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsOptions {
    pub session: Option<StepOption>,
    pub interval: Option<StepOption>,
}

/// Raw timer construction options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerOptions {
    pub steps: StepsOptions,
    pub direction: Option<String>,
    pub count_units: Option<Vec<String>>,
}

impl TimerOptions {
    pub fn session(mut self, value: f64, units: impl Into<String>) -> Self {
        self.steps.session = Some(StepOption::new(value, units));
        self
    }

    pub fn interval(mut self, value: f64, units: impl Into<String>) -> Self {
        self.steps.interval = Some(StepOption::new(value, units));
        self
    }

    pub fn direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    pub fn count_units<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.count_units = Some(units.into_iter().map(Into::into).collect());
        self
    }

    /// Validate every field, falling back to defaults with a warning.
    pub fn resolve(&self) -> TimerSettings {
        let mut settings = TimerSettings::default();

        if let Some(session) = &self.steps.session {
            match step_millis(session) {
                Ok(ms) => settings.session_ms = ms,
                Err(reason) => log::warn!(
                    "Ignoring session option {:?}: {}, using {}ms",
                    session,
                    reason,
                    DEFAULT_SESSION_MS
                ),
            }
        }

        if let Some(interval) = &self.steps.interval {
            match step_millis(interval) {
                Ok(0) => log::warn!(
                    "Ignoring interval option {:?}: must be greater than zero, using {}ms",
                    interval,
                    DEFAULT_INTERVAL_MS
                ),
                Ok(ms) => settings.interval_ms = ms,
                Err(reason) => log::warn!(
                    "Ignoring interval option {:?}: {}, using {}ms",
                    interval,
                    reason,
                    DEFAULT_INTERVAL_MS
                ),
            }
        }

        if let Some(direction) = &self.direction {
            match direction.parse::<Direction>() {
                Ok(d) => settings.direction = d,
                Err(reason) => log::warn!(
                    "Ignoring direction option: {}, counting {}",
                    reason,
                    settings.direction.as_str()
                ),
            }
        }

        if let Some(names) = &self.count_units {
            let mut parsed = Vec::with_capacity(names.len());
            for name in names {
                match name.parse::<TimeUnit>() {
                    Ok(unit) => parsed.push(unit),
                    Err(e) => log::warn!("Ignoring count unit: {}", e),
                }
            }
            if parsed.is_empty() {
                log::warn!("No usable count units given, using hours/minutes/seconds");
            } else {
                settings.count_units = parsed;
            }
        }

        settings
    }
}

fn step_millis(step: &StepOption) -> Result<u64, String> {
    let ms = units::convert(step.value, &step.units).map_err(|e| e.to_string())?;
    u64::try_from(ms).map_err(|_| format!("{}ms is negative", ms))
}

/// Validated construction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    pub session_ms: u64,
    pub interval_ms: u64,
    pub direction: Direction,
    pub count_units: Vec<TimeUnit>,
}

impl Default for TimerSettings {
    fn default() -> Self {
        TimerSettings {
            session_ms: DEFAULT_SESSION_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
            direction: Direction::Down,
            count_units: DEFAULT_COUNT_UNITS.to_vec(),
        }
    }
}
