//! Basic usage example for the session timer

use session_timer::{Duration, StepChange, Timer, TimerEventKind, TimerOptions, ToggleAction};
use tokio::task::LocalSet;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let local = LocalSet::new();
    local
        .run_until(async {
            let options = TimerOptions::default()
                .session(5.0, "seconds")
                .interval(1.0, "second")
                .direction("down")
                .count_units(["minutes", "seconds"]);
            let timer = Timer::new("example_timer", &options);

            let display = timer.downgrade();
            timer.subscribe(TimerEventKind::CurrentTime, move |_| {
                if let Some(timer) = display.upgrade() {
                    println!("{} left", timer.current_parts());
                }
            });
            timer.subscribe(TimerEventKind::SessionPaused, |s| {
                println!("Paused with {}ms elapsed", s.elapsed_ms);
            });
            timer.subscribe(TimerEventKind::SessionChanged, |s| {
                println!("Session is now {}ms", s.session_ms);
            });
            timer.subscribe(TimerEventKind::SessionStopped, |s| {
                println!("Session stopped after {}ms", s.elapsed_ms);
            });

            timer.start();
            tokio::time::sleep(Duration::from_millis(2_200)).await;

            // Pause, then resume through toggle
            timer.toggle(ToggleAction::Pause);
            tokio::time::sleep(Duration::from_secs(1)).await;
            timer.toggle(ToggleAction::Pause);

            // Two more seconds for this session
            timer.change_step(
                StepChange::new("session")
                    .value(2.0)
                    .unit("seconds")
                    .increment(1),
            )?;

            while timer.is_ticking() {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }

            println!("Timer finished: {}", timer.status());
            Ok::<(), Box<dyn std::error::Error>>(())
        })
        .await
}
