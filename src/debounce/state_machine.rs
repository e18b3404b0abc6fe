//! Pure state machine behind [`Debounce`](super::Debounce).
//!
//! Kept free of tasks and clocks so the "exactly one waiter" property can
//! be checked by feeding it instants directly.

use std::time::Duration;

use tokio::time::Instant;

/// Debounce state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State<T> {
    Idle,
    Debouncing {
        value: T,
        due: Instant,
        arrived_during_sleep: bool,
    },
}

/// Outcome of [`StateMachine::new_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// The machine was idle; the caller must start the single waiter.
    StartWaiter(Instant),
    /// A waiter is already sleeping; only the due time moved.
    Extended(Instant),
}

/// Outcome of [`StateMachine::sleep_is_over`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SleepIsOver<T> {
    /// New values arrived while sleeping; sleep again until this instant.
    Continue(Instant),
    /// Quiet period elapsed; run the action with this value.
    Finish(T),
}

#[derive(Debug)]
pub struct StateMachine<T> {
    state: State<T>,
    duration: Duration,
}

impl<T> StateMachine<T> {
    pub fn new(duration: Duration) -> Self {
        Self {
            state: State::Idle,
            duration,
        }
    }

    pub fn state(&self) -> &State<T> {
        &self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Record a new value arriving at `now`.
    pub fn new_value(&mut self, value: T, now: Instant) -> Emit {
        let candidate = now + self.duration;
        match &mut self.state {
            State::Idle => {
                self.state = State::Debouncing {
                    value,
                    due: candidate,
                    arrived_during_sleep: false,
                };
                Emit::StartWaiter(candidate)
            }
            State::Debouncing {
                value: stored,
                due,
                arrived_during_sleep,
            } => {
                *stored = value;
                // due never moves backward, even if `now` is stale
                *due = (*due).max(candidate);
                *arrived_during_sleep = true;
                Emit::Extended(*due)
            }
        }
    }

    /// Called by the waiter when its sleep ends. `None` when idle.
    pub fn sleep_is_over(&mut self) -> Option<SleepIsOver<T>> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => None,
            State::Debouncing {
                value,
                due,
                arrived_during_sleep: true,
            } => {
                self.state = State::Debouncing {
                    value,
                    due,
                    arrived_during_sleep: false,
                };
                Some(SleepIsOver::Continue(due))
            }
            State::Debouncing {
                value,
                arrived_during_sleep: false,
                ..
            } => Some(SleepIsOver::Finish(value)),
        }
    }

    /// Drop any pending value.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}
