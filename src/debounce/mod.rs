//! Coalescing scheduler.
//!
//! Collapses a burst of values into one delayed async action call with
//! the most recent value. A single background waiter sleeps until the
//! due time; values arriving meanwhile only push the due time forward.
//! Dropping the [`Debounce`] aborts a pending waiter without running the
//! action.

pub mod state_machine;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::warn;

pub use state_machine::{Emit, SleepIsOver, State, StateMachine};

type Action<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

pub struct Debounce<T> {
    machine: Arc<Mutex<StateMachine<T>>>,
    action: Action<T>,
    waiter: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debounce<T> {
    pub fn new<F, Fut>(duration: Duration, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            machine: Arc::new(Mutex::new(StateMachine::new(duration))),
            action: Arc::new(move |value| action(value).boxed()),
            waiter: Mutex::new(None),
        }
    }

    /// Submit a value. Returns `true` when this call started the waiter.
    ///
    /// Safe to call concurrently; never blocks on the action.
    pub fn emit(&self, value: T) -> bool {
        let now = Instant::now();
        let emit = self
            .machine
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .new_value(value, now);

        let due = match emit {
            Emit::Extended(_) => return false,
            Emit::StartWaiter(due) => due,
        };

        let Ok(handle) = Handle::try_current() else {
            warn!("debounce: emit outside a tokio runtime, value dropped");
            self.machine
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .reset();
            return false;
        };

        let task = handle.spawn(wait(self.machine.clone(), self.action.clone(), due));
        *self.waiter.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
        true
    }

    /// True while a value is waiting for the quiet period to end.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.machine
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .state(),
            State::Debouncing { .. }
        )
    }
}

impl<T> Drop for Debounce<T> {
    fn drop(&mut self) {
        let waiter = self.waiter.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = waiter.take() {
            task.abort();
        }
    }
}

async fn wait<T>(machine: Arc<Mutex<StateMachine<T>>>, action: Action<T>, mut due: Instant) {
    loop {
        sleep_until(due).await;
        let step = machine
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sleep_is_over();
        match step {
            Some(SleepIsOver::Continue(next)) => due = next,
            Some(SleepIsOver::Finish(value)) => {
                action(value).await;
                return;
            }
            None => return,
        }
    }
}
