//! Cancellable periodic timers.
//!
//! A [`TimerGuard`] owns the task driving one timer and aborts it when
//! dropped, so storing the guard inside the state it protects cancels the
//! timer on every path that leaves that state.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::warn;

#[derive(Debug)]
pub struct TimerGuard {
    task: JoinHandle<()>,
}

impl TimerGuard {
    /// Call `tick` every `period`, first after one full period, until it
    /// returns `Break` or the guard is dropped.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn repeating<F>(period: Duration, mut tick: F) -> Option<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            warn!("timer: no tokio runtime, timer not started");
            return None;
        };

        let task = handle.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick().is_break() {
                    break;
                }
            }
        });
        Some(Self { task })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn ticks_until_dropped() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let guard = TimerGuard::repeating(Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
        .unwrap();

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        drop(guard);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn break_stops_timer() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let guard = TimerGuard::repeating(Duration::from_millis(100), move || {
            if c.fetch_add(1, Ordering::SeqCst) == 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

        sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(guard.is_finished());
    }

    #[test]
    fn no_runtime_no_timer() {
        assert!(TimerGuard::repeating(Duration::from_secs(1), || ControlFlow::Continue(())).is_none());
    }
}
