//! # Session Timer
//!
//! A countdown/count-up timer for Rust built on top of Tokio.
//!
//! The timer keeps elapsed time as banked time from finished run segments plus
//! the live delta of the current one, so pausing freezes progress exactly and
//! resuming never counts the paused stretch. State changes are published
//! synchronously to subscribed listeners.
//!
//! ## Features
//!
//! - **Pause-safe accounting**: start, pause, resume, stop and reset without
//!   losing or double-counting time
//! - **Count up or down**: `currentTime` reports remaining or elapsed time
//! - **Step mutation**: grow or shrink the session while running, never below
//!   the time already spent
//! - **Events**: `sessionStarted`, `sessionStopped`, `sessionPaused`,
//!   `currentTime`, `sessionChanged` and `timerReset`
//! - **Forgiving options**: malformed options are logged and replaced by
//!   defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use session_timer::{Timer, TimerEventKind, TimerOptions};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let local = tokio::task::LocalSet::new();
//!     local
//!         .run_until(async {
//!             let options = TimerOptions::default()
//!                 .session(3.0, "seconds")
//!                 .interval(1.0, "second");
//!             let timer = Timer::new("tea", &options);
//!
//!             timer.subscribe(TimerEventKind::CurrentTime, |s| {
//!                 println!("{}ms left", s.current_ms);
//!             });
//!             timer.subscribe(TimerEventKind::SessionStopped, |_| println!("done"));
//!
//!             timer.start();
//!             tokio::time::sleep(Duration::from_millis(3_500)).await;
//!         })
//!         .await;
//! }
//! ```

mod clock;
mod config;
mod error;
mod events;
mod schedule;
mod state;
mod timer;
mod units;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{StepOption, StepsOptions, TimerOptions, TimerSettings};
pub use error::{ConvertError, StepValueError, TimerError};
pub use events::{EventBus, Subscription, TimerEventKind, TimerSnapshot};
pub use state::{Direction, RunState, Step, TimerState};
pub use timer::{StepChange, Timer, ToggleAction, WeakTimer};
pub use units::{convert, convert_in, TimeBreakdown, TimeUnit};

// Re-export commonly used types for convenience
pub use std::time::Duration;
