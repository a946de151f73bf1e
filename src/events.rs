//! Synchronous publish/subscribe channel for timer state changes.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::Serialize;

use crate::state::{Direction, RunState};

/// Kinds of state change a timer publishes. `as_str` gives the event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimerEventKind {
    SessionStarted,
    SessionStopped,
    SessionPaused,
    CurrentTime,
    SessionChanged,
    TimerReset,
}

impl TimerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerEventKind::SessionStarted => "sessionStarted",
            TimerEventKind::SessionStopped => "sessionStopped",
            TimerEventKind::SessionPaused => "sessionPaused",
            TimerEventKind::CurrentTime => "currentTime",
            TimerEventKind::SessionChanged => "sessionChanged",
            TimerEventKind::TimerReset => "timerReset",
        }
    }
}

impl fmt::Display for TimerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sessionStarted" => Ok(TimerEventKind::SessionStarted),
            "sessionStopped" => Ok(TimerEventKind::SessionStopped),
            "sessionPaused" => Ok(TimerEventKind::SessionPaused),
            "currentTime" => Ok(TimerEventKind::CurrentTime),
            "sessionChanged" => Ok(TimerEventKind::SessionChanged),
            "timerReset" => Ok(TimerEventKind::TimerReset),
            other => Err(format!("unknown timer event '{}'", other)),
        }
    }
}

/// Timer state as seen by listeners at the moment an event is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub event: TimerEventKind,
    pub status: RunState,
    pub direction: Direction,
    pub session_ms: u64,
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub current_ms: u64,
}

type Listener = Rc<dyn Fn(&TimerSnapshot)>;

struct Entry {
    id: u64,
    kind: TimerEventKind,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Registry {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }
}

/// Listener registry keyed by event kind.
///
/// Delivery happens on the publishing caller, in registration order. The
/// registry is not borrowed while a listener runs, so listeners may
/// subscribe, remove subscriptions or publish again, including re-entrant
/// publishes that reach the running listener itself. Listeners are `Fn`;
/// keep mutable listener state in a `Cell` or `RefCell`.
#[derive(Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind`.
    pub fn subscribe<F>(&self, kind: TimerEventKind, listener: F) -> Subscription
    where
        F: Fn(&TimerSnapshot) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry {
            id,
            kind,
            listener: Rc::new(listener),
        });

        Subscription {
            id,
            kind,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Deliver `snapshot` to every listener of `kind`. Returns how many
    /// listeners were invoked.
    pub fn publish(&self, kind: TimerEventKind, snapshot: &TimerSnapshot) -> usize {
        let targets: Vec<(u64, Listener)> = self
            .registry
            .borrow()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| (e.id, Rc::clone(&e.listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in targets {
            // Removed by an earlier listener of this same delivery.
            if !self.registry.borrow().contains(id) {
                continue;
            }

            (*listener)(snapshot);
            delivered += 1;
        }
        delivered
    }

    /// Number of live registrations for `kind`.
    pub fn listener_count(&self, kind: TimerEventKind) -> usize {
        self.registry
            .borrow()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("listeners", &registry.entries.len())
            .finish()
    }
}

/// Handle to one registration. Dropping it keeps the listener registered;
/// call [`Subscription::remove`] to unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    kind: TimerEventKind,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Delete this registration. Returns false if it was already removed or
    /// the owning bus is gone.
    pub fn remove(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.borrow_mut();
        let before = registry.entries.len();
        registry.entries.retain(|e| e.id != self.id);
        registry.entries.len() != before
    }

    pub fn kind(&self) -> TimerEventKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn snapshot(event: TimerEventKind) -> TimerSnapshot {
        TimerSnapshot {
            event,
            status: RunState::Running,
            direction: Direction::Down,
            session_ms: 5_000,
            elapsed_ms: 1_000,
            remaining_ms: 4_000,
            current_ms: 4_000,
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = Rc::clone(&seen);
            bus.subscribe(TimerEventKind::CurrentTime, move |s| {
                seen.borrow_mut().push((tag, s.current_ms));
            });
        }
        bus.subscribe(TimerEventKind::TimerReset, |_| panic!("wrong event"));

        let delivered = bus.publish(
            TimerEventKind::CurrentTime,
            &snapshot(TimerEventKind::CurrentTime),
        );

        assert_eq!(delivered, 3);
        assert_eq!(
            *seen.borrow(),
            vec![("a", 4_000), ("b", 4_000), ("c", 4_000)]
        );
    }

    #[test]
    fn test_removed_listener_is_never_invoked() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        let sub = bus.subscribe(TimerEventKind::CurrentTime, move |_| {
            counter.set(counter.get() + 1)
        });

        assert!(sub.remove());
        assert!(!sub.remove());
        assert_eq!(bus.listener_count(TimerEventKind::CurrentTime), 0);

        bus.publish(
            TimerEventKind::CurrentTime,
            &snapshot(TimerEventKind::CurrentTime),
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_removal_during_delivery_skips_later_listener() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));
        let second: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let victim = Rc::clone(&second);
        bus.subscribe(TimerEventKind::SessionStopped, move |_| {
            if let Some(sub) = victim.borrow().as_ref() {
                sub.remove();
            }
        });

        let counter = Rc::clone(&calls);
        let sub = bus.subscribe(TimerEventKind::SessionStopped, move |_| {
            counter.set(counter.get() + 1)
        });
        *second.borrow_mut() = Some(sub);

        let delivered = bus.publish(
            TimerEventKind::SessionStopped,
            &snapshot(TimerEventKind::SessionStopped),
        );
        assert_eq!(delivered, 1);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_listener_added_during_delivery_waits_for_next_publish() {
        let bus = Rc::new(EventBus::new());
        let calls = Rc::new(Cell::new(0));

        let inner_bus = Rc::clone(&bus);
        let counter = Rc::clone(&calls);
        bus.subscribe(TimerEventKind::SessionStarted, move |_| {
            let counter = Rc::clone(&counter);
            inner_bus.subscribe(TimerEventKind::SessionStarted, move |_| {
                counter.set(counter.get() + 1)
            });
        });

        let started = snapshot(TimerEventKind::SessionStarted);
        assert_eq!(bus.publish(TimerEventKind::SessionStarted, &started), 1);
        assert_eq!(calls.get(), 0);

        assert_eq!(bus.publish(TimerEventKind::SessionStarted, &started), 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_reentrant_publish_reaches_running_listener() {
        let bus = Rc::new(EventBus::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = Rc::clone(&bus);
        let sink = Rc::clone(&seen);
        bus.subscribe(TimerEventKind::CurrentTime, move |s| {
            sink.borrow_mut().push(s.session_ms);
            if s.session_ms == 5_000 {
                let mut grown = *s;
                grown.session_ms = 15_000;
                inner_bus.publish(TimerEventKind::CurrentTime, &grown);
            }
        });

        let delivered = bus.publish(
            TimerEventKind::CurrentTime,
            &snapshot(TimerEventKind::CurrentTime),
        );

        assert_eq!(delivered, 1);
        assert_eq!(*seen.borrow(), vec![5_000, 15_000]);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus = EventBus::new();
        let sub = bus.subscribe(TimerEventKind::TimerReset, |_| {});
        drop(bus);
        assert!(!sub.remove());
    }

    #[test]
    fn test_event_names() {
        for kind in [
            TimerEventKind::SessionStarted,
            TimerEventKind::SessionStopped,
            TimerEventKind::SessionPaused,
            TimerEventKind::CurrentTime,
            TimerEventKind::SessionChanged,
            TimerEventKind::TimerReset,
        ] {
            assert_eq!(kind.as_str().parse::<TimerEventKind>(), Ok(kind));
        }
        assert!("tick".parse::<TimerEventKind>().is_err());
    }
}
