use std::cell::{Ref, RefCell};
use std::fmt;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use tokio::time::Duration;

use crate::clock::{Clock, MonotonicClock};
use crate::config::TimerOptions;
use crate::error::TimerError;
use crate::events::{EventBus, Subscription, TimerEventKind, TimerSnapshot};
use crate::schedule::TickRegistration;
use crate::state::{Direction, RunState, Step, TimerState};
use crate::units::{self, TimeBreakdown, TimeUnit};

/// Request to change a step value, see [`Timer::change_step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepChange {
    /// Step name, `"session"` or `"interval"`
    pub step: String,
    /// Amount, `0` when absent
    pub value: Option<f64>,
    /// Unit of `value`, milliseconds when absent
    pub unit: Option<String>,
    /// `1` or `-1`, anything else counts as `1`
    pub sign: i32,
    /// `1` adds to the current value, `0` replaces it; anything else counts as `0`
    pub increment: i32,
}

impl StepChange {
    pub fn new(step: impl Into<String>) -> Self {
        StepChange {
            step: step.into(),
            value: None,
            unit: None,
            sign: 1,
            increment: 0,
        }
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn sign(mut self, sign: i32) -> Self {
        self.sign = sign;
        self
    }

    pub fn increment(mut self, increment: i32) -> Self {
        self.increment = increment;
        self
    }
}

/// Operations [`Timer::toggle`] can try before falling back to `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToggleAction {
    #[default]
    Stop,
    Pause,
    Start,
}

impl FromStr for ToggleAction {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(ToggleAction::Stop),
            "pause" => Ok(ToggleAction::Pause),
            "start" => Ok(ToggleAction::Start),
            other => Err(TimerError::InvalidToggleAction(other.to_string())),
        }
    }
}

struct TimerInner {
    /// Instance name for logging
    name: String,

    state: RefCell<TimerState>,

    clock: Rc<dyn Clock>,

    events: EventBus,

    /// Active tick registration, present only while running
    ticker: RefCell<Option<TickRegistration>>,

    /// Units used by the `*_parts` accessors
    count_units: Vec<TimeUnit>,
}

/// Countdown/count-up session timer.
///
/// `Timer` is a handle: clones share the same timer. It is single-threaded
/// and schedules its ticks with `spawn_local`, so [`Timer::start`] must be
/// called from within a `tokio::task::LocalSet`.
///
/// Dropping the last handle cancels any pending ticks. A listener that drives
/// the timer from inside an event should capture a [`WeakTimer`] from
/// [`Timer::downgrade`]; a strong clone stored in a listener keeps the timer
/// alive for as long as the listener stays subscribed.
#[derive(Clone)]
pub struct Timer {
    inner: Rc<TimerInner>,
}

/// Non-owning handle to a [`Timer`].
#[derive(Debug, Clone)]
pub struct WeakTimer {
    inner: Weak<TimerInner>,
}

impl WeakTimer {
    /// The timer, if any strong handle is still alive.
    pub fn upgrade(&self) -> Option<Timer> {
        self.inner.upgrade().map(|inner| Timer { inner })
    }
}

impl Timer {
    /// Create an idle timer driven by a [`MonotonicClock`].
    ///
    /// Malformed options are logged and replaced by defaults.
    pub fn new(name: impl Into<String>, options: &TimerOptions) -> Self {
        Self::with_clock(name, options, MonotonicClock::new())
    }

    /// Create an idle timer sampling `clock`.
    pub fn with_clock<C>(name: impl Into<String>, options: &TimerOptions, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        let name = name.into();
        let settings = options.resolve();
        let now = clock.now_ms();

        log::debug!(
            "Timer '{}' created: session {}ms, interval {}ms, counting {}",
            name,
            settings.session_ms,
            settings.interval_ms,
            settings.direction.as_str()
        );

        Timer {
            inner: Rc::new(TimerInner {
                name,
                state: RefCell::new(TimerState::new(
                    settings.session_ms,
                    settings.interval_ms,
                    settings.direction,
                    now,
                )),
                clock: Rc::new(clock),
                events: EventBus::new(),
                ticker: RefCell::new(None),
                count_units: settings.count_units,
            }),
        }
    }

    /// Start a new session, or resume a paused one.
    ///
    /// Returns false, without publishing anything, if the timer is already
    /// running.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio::task::LocalSet`.
    pub fn start(&self) -> bool {
        let (run_state, interval_ms) = {
            let state = self.inner.state.borrow();
            (state.run_state(), state.interval_ms())
        };
        if run_state == RunState::Running {
            log::debug!("Timer '{}' is already running", self.inner.name);
            return false;
        }

        // Register first: nothing is mutated if spawning fails.
        self.schedule_ticks(interval_ms);

        let now = self.inner.clock.now_ms();
        {
            let mut state = self.inner.state.borrow_mut();
            if run_state != RunState::Paused {
                state.reset_times(now);
            }
            state.mark_running(now);
        }

        log::info!("Timer '{}' started", self.inner.name);
        self.publish(TimerEventKind::SessionStarted);
        true
    }

    /// Stop the session. Returns false unless running or paused.
    pub fn stop(&self) -> bool {
        let now = self.inner.clock.now_ms();
        if !self.inner.state.borrow().run_state().is_active() {
            return false;
        }

        self.cancel_ticks();
        self.inner.state.borrow_mut().mark_stopped(now);

        log::info!("Timer '{}' stopped", self.inner.name);
        self.publish(TimerEventKind::SessionStopped);
        true
    }

    /// Pause the session. Returns false unless running.
    pub fn pause(&self) -> bool {
        let now = self.inner.clock.now_ms();
        if self.inner.state.borrow().run_state() != RunState::Running {
            return false;
        }

        self.cancel_ticks();
        self.inner.state.borrow_mut().mark_paused(now);

        log::info!("Timer '{}' paused", self.inner.name);
        self.publish(TimerEventKind::SessionPaused);
        true
    }

    /// Zero the elapsed time. The run state and any pending ticks are kept.
    pub fn reset(&self) {
        let now = self.inner.clock.now_ms();
        self.inner.state.borrow_mut().reset_times(now);

        log::debug!("Timer '{}' reset", self.inner.name);
        self.publish(TimerEventKind::TimerReset);
    }

    /// Set or adjust a step value.
    ///
    /// Returns `Ok(false)` when a session change is dropped because the new
    /// length would not exceed the time already elapsed in the active
    /// session. Interval changes take effect on the next `start`.
    ///
    /// # Errors
    ///
    /// [`TimerError::InvalidStepTarget`] for an unknown step name and
    /// [`TimerError::InvalidStepValue`] when the value cannot be converted or
    /// is not valid for the step.
    pub fn change_step(&self, change: StepChange) -> Result<bool, TimerError> {
        let step: Step = change.step.parse()?;

        let sign: i64 = match change.sign {
            1 => 1,
            -1 => -1,
            other => {
                log::debug!("Timer '{}': sign {} normalized to 1", self.inner.name, other);
                1
            }
        };
        let increment = match change.increment {
            0 => false,
            1 => true,
            other => {
                log::debug!(
                    "Timer '{}': increment {} normalized to 0",
                    self.inner.name,
                    other
                );
                false
            }
        };

        let unit = change.unit.as_deref().unwrap_or(TimeUnit::Milliseconds.as_str());
        let delta = units::convert(change.value.unwrap_or(0.0), unit)
            .map_err(|e| TimerError::InvalidStepValue {
                step: step.as_str(),
                reason: e.into(),
            })?
            .saturating_mul(sign);

        let now = self.inner.clock.now_ms();
        {
            let mut state = self.inner.state.borrow_mut();
            state.sample(now);

            let current = i64::try_from(state.step_ms(step)).unwrap_or(i64::MAX);
            let new_value = if increment {
                current.saturating_add(delta)
            } else {
                delta
            }
            .max(0);

            if step == Step::Session
                && state.run_state().is_active()
                && (new_value as u64) <= state.elapsed_ms()
            {
                log::debug!(
                    "Timer '{}': session of {}ms would not exceed elapsed {}ms, change dropped",
                    self.inner.name,
                    new_value,
                    state.elapsed_ms()
                );
                return Ok(false);
            }

            state.set_step_ms(step, new_value)?;
        }

        log::debug!(
            "Timer '{}': {} changed to {}ms",
            self.inner.name,
            step.as_str(),
            self.inner.state.borrow().step_ms(step)
        );
        self.publish(TimerEventKind::SessionChanged);
        self.publish(TimerEventKind::CurrentTime);
        Ok(true)
    }

    /// Try `action`; if it does nothing, start the timer instead.
    pub fn toggle(&self, action: ToggleAction) {
        let acted = match action {
            ToggleAction::Stop => self.stop(),
            ToggleAction::Pause => self.pause(),
            ToggleAction::Start => self.start(),
        };

        if !acted {
            log::debug!(
                "Timer '{}': {:?} had no effect, starting instead",
                self.inner.name,
                action
            );
            self.start();
        }
    }

    /// [`Timer::toggle`] by action name. Unknown names are reported and fall
    /// back to `start`.
    pub fn toggle_named(&self, action: &str) {
        match action.parse::<ToggleAction>() {
            Ok(action) => self.toggle(action),
            Err(e) => {
                log::warn!("Timer '{}': {}, starting instead", self.inner.name, e);
                self.start();
            }
        }
    }

    /// Register `listener` for `kind`. Listeners run synchronously inside the
    /// operation or tick that published the event.
    pub fn subscribe<F>(&self, kind: TimerEventKind, listener: F) -> Subscription
    where
        F: Fn(&TimerSnapshot) + 'static,
    {
        self.inner.events.subscribe(kind, listener)
    }

    pub fn downgrade(&self) -> WeakTimer {
        WeakTimer {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn status(&self) -> RunState {
        self.inner.state.borrow().run_state()
    }

    pub fn session(&self) -> u64 {
        self.inner.state.borrow().session_ms()
    }

    pub fn interval(&self) -> u64 {
        self.inner.state.borrow().interval_ms()
    }

    pub fn direction(&self) -> Direction {
        self.inner.state.borrow().direction()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.sampled().elapsed_ms()
    }

    pub fn remaining_ms(&self) -> u64 {
        self.sampled().remaining_ms()
    }

    /// Remaining time when counting down, elapsed time when counting up.
    pub fn current_ms(&self) -> u64 {
        self.sampled().current_ms()
    }

    pub fn is_session_complete(&self) -> bool {
        self.sampled().is_session_complete()
    }

    pub fn elapsed_parts(&self) -> TimeBreakdown {
        TimeBreakdown::from_millis(self.elapsed_ms(), &self.inner.count_units)
    }

    pub fn remaining_parts(&self) -> TimeBreakdown {
        TimeBreakdown::from_millis(self.remaining_ms(), &self.inner.count_units)
    }

    pub fn current_parts(&self) -> TimeBreakdown {
        TimeBreakdown::from_millis(self.current_ms(), &self.inner.count_units)
    }

    /// Whether a tick registration is currently live.
    pub fn is_ticking(&self) -> bool {
        self.inner
            .ticker
            .borrow()
            .as_ref()
            .is_some_and(|reg| !reg.is_finished())
    }

    fn sampled(&self) -> Ref<'_, TimerState> {
        let now = self.inner.clock.now_ms();
        self.inner.state.borrow_mut().sample(now);
        self.inner.state.borrow()
    }

    /// Current state, sampled now. Carries `CurrentTime` as its event, the
    /// payload a tick would publish at this instant.
    pub fn snapshot(&self) -> TimerSnapshot {
        let now = self.inner.clock.now_ms();
        self.inner.state.borrow_mut().sample(now);
        self.event_snapshot(TimerEventKind::CurrentTime)
    }

    fn event_snapshot(&self, event: TimerEventKind) -> TimerSnapshot {
        let state = self.inner.state.borrow();
        TimerSnapshot {
            event,
            status: state.run_state(),
            direction: state.direction(),
            session_ms: state.session_ms(),
            elapsed_ms: state.elapsed_ms(),
            remaining_ms: state.remaining_ms(),
            current_ms: state.current_ms(),
        }
    }

    fn publish(&self, kind: TimerEventKind) {
        let snapshot = self.event_snapshot(kind);
        self.inner.events.publish(kind, &snapshot);
    }

    fn schedule_ticks(&self, interval_ms: u64) {
        let weak = self.downgrade();
        let registration = TickRegistration::spawn(
            self.inner.name.clone(),
            Duration::from_millis(interval_ms),
            move || match weak.upgrade() {
                Some(timer) => timer.on_tick(),
                None => ControlFlow::Break(()),
            },
        );

        if let Some(previous) = self.inner.ticker.replace(Some(registration)) {
            previous.cancel();
        }
    }

    fn cancel_ticks(&self) {
        if let Some(registration) = self.inner.ticker.take() {
            registration.cancel();
        }
    }

    fn on_tick(&self) -> ControlFlow<()> {
        let now = self.inner.clock.now_ms();
        let complete = {
            let mut state = self.inner.state.borrow_mut();
            state.sample(now);
            state.is_session_complete()
        };

        if complete {
            log::info!("Timer '{}' session complete", self.inner.name);
            self.stop();
            return ControlFlow::Break(());
        }

        log::debug!(
            "Timer '{}' tick: {}ms",
            self.inner.name,
            self.inner.state.borrow().current_ms()
        );
        self.publish(TimerEventKind::CurrentTime);
        ControlFlow::Continue(())
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Timer")
            .field("name", &self.inner.name)
            .field("state", &*state)
            .field("events", &self.inner.events)
            .finish()
    }
}
