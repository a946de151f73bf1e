//! Elapsed-time bookkeeping for a single timer.
//!
//! Elapsed time is kept as a banked total from finished run segments plus the
//! live delta of the current segment. Pausing banks the delta and freezes
//! progress; resuming opens a new segment without touching what was banked,
//! so paused time never leaks into the elapsed total.
//!
//! `TimerState` never reads a clock. Every transition takes the sampled time
//! as `now`, which keeps the accounting deterministic under test.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StepValueError, TimerError};
use crate::units;

/// Which way the displayed time moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Run state of a timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Stopped => "stopped",
        }
    }

    /// Running or paused: a session is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Running | RunState::Paused)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable step values of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Session,
    Interval,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Session => "session",
            Step::Interval => "interval",
        }
    }
}

impl FromStr for Step {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(Step::Session),
            "interval" => Ok(Step::Interval),
            other => Err(TimerError::InvalidStepTarget(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    session_ms: u64,
    interval_ms: u64,
    direction: Direction,
    start_epoch_ms: Option<u64>,
    accumulated_ms: u64,
    now_epoch_ms: u64,
    run_state: RunState,
}

impl TimerState {
    /// Create an idle state. `interval_ms` is raised to 1 if zero.
    pub fn new(session_ms: u64, interval_ms: u64, direction: Direction, now: u64) -> Self {
        TimerState {
            session_ms,
            interval_ms: interval_ms.max(1),
            direction,
            start_epoch_ms: None,
            accumulated_ms: 0,
            now_epoch_ms: now,
            run_state: RunState::Idle,
        }
    }

    /// Convert `raw_value` in `unit` and commit it to `step`.
    pub fn set_step(&mut self, step: Step, raw_value: f64, unit: &str) -> Result<(), TimerError> {
        let ms = units::convert(raw_value, unit).map_err(|e| TimerError::InvalidStepValue {
            step: step.as_str(),
            reason: e.into(),
        })?;
        self.set_step_ms(step, ms)
    }

    /// Validate and commit an already converted step value.
    pub fn set_step_ms(&mut self, step: Step, ms: i64) -> Result<(), TimerError> {
        if ms < 0 {
            return Err(TimerError::InvalidStepValue {
                step: step.as_str(),
                reason: StepValueError::Negative(ms),
            });
        }

        match step {
            Step::Session => self.session_ms = ms as u64,
            Step::Interval => {
                if ms == 0 {
                    return Err(TimerError::InvalidStepValue {
                        step: step.as_str(),
                        reason: StepValueError::Zero,
                    });
                }
                self.interval_ms = ms as u64;
            }
        }
        Ok(())
    }

    pub fn step_ms(&self, step: Step) -> u64 {
        match step {
            Step::Session => self.session_ms,
            Step::Interval => self.interval_ms,
        }
    }

    /// Record the latest clock sample. Samples older than the current one
    /// are ignored.
    pub fn sample(&mut self, now: u64) {
        self.now_epoch_ms = self.now_epoch_ms.max(now);
    }

    /// Open a new run segment at `now`.
    pub fn mark_running(&mut self, now: u64) {
        self.sample(now);
        self.start_epoch_ms = Some(self.now_epoch_ms);
        self.run_state = RunState::Running;
    }

    /// Bank the live segment and freeze progress. Returns false if the timer
    /// was not running.
    pub fn mark_paused(&mut self, now: u64) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }
        self.sample(now);
        self.bank_live_segment();
        self.run_state = RunState::Paused;
        true
    }

    /// End the session, clamping the banked time to the session length.
    /// Returns false unless the timer was running or paused.
    pub fn mark_stopped(&mut self, now: u64) -> bool {
        match self.run_state {
            RunState::Running => {
                self.sample(now);
                self.bank_live_segment();
            }
            RunState::Paused => self.sample(now),
            RunState::Idle | RunState::Stopped => return false,
        }
        self.accumulated_ms = self.accumulated_ms.min(self.session_ms);
        self.run_state = RunState::Stopped;
        true
    }

    /// Zero the elapsed time without touching the run state.
    pub fn reset_times(&mut self, now: u64) {
        self.sample(now);
        self.accumulated_ms = 0;
        self.start_epoch_ms = Some(self.now_epoch_ms);
    }

    fn live_delta(&self) -> u64 {
        match (self.run_state, self.start_epoch_ms) {
            (RunState::Running, Some(start)) => self.now_epoch_ms.saturating_sub(start),
            _ => 0,
        }
    }

    fn bank_live_segment(&mut self) {
        self.accumulated_ms = self.accumulated_ms.saturating_add(self.live_delta());
        self.start_epoch_ms = None;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.accumulated_ms
            .saturating_add(self.live_delta())
            .min(self.session_ms)
    }

    pub fn remaining_ms(&self) -> u64 {
        self.session_ms - self.elapsed_ms()
    }

    pub fn is_session_complete(&self) -> bool {
        self.elapsed_ms() >= self.session_ms
    }

    /// Time shown to the user: remaining when counting down, elapsed when
    /// counting up.
    pub fn current_ms(&self) -> u64 {
        match self.direction {
            Direction::Down => self.remaining_ms(),
            Direction::Up => self.elapsed_ms(),
        }
    }

    pub fn session_ms(&self) -> u64 {
        self.session_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn now_epoch_ms(&self) -> u64 {
        self.now_epoch_ms
    }
}
