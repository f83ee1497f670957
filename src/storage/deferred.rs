//! Cancellable deferred task with replace-pending semantics.
//!
//! A single background thread holds at most one pending value. Scheduling a
//! new value replaces the pending one and restarts the delay, so a burst of
//! calls results in one run with the last value. The owner can take the
//! pending value back at any time to run it synchronously.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct Pending<T> {
    value: T,
    due: Instant,
}

struct DeferredState<T> {
    pending: Option<Pending<T>>,
    /// The worker has taken a value and is still running it.
    running: bool,
    shutdown: bool,
}

struct DeferredInner<T> {
    state: Mutex<DeferredState<T>>,
    wake: Condvar,
}

impl<T> DeferredInner<T> {
    // The state is plain data, so a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, DeferredState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait<'a>(
        &self,
        state: MutexGuard<'a, DeferredState<T>>,
    ) -> MutexGuard<'a, DeferredState<T>> {
        self.wake
            .wait(state)
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the running flag when a run ends, even by unwinding.
struct RunGuard<'a, T> {
    inner: &'a DeferredInner<T>,
}

impl<T> Drop for RunGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.lock().running = false;
        self.inner.wake.notify_all();
    }
}

/// A timer thread that runs `T` values through a callback after a quiet period.
pub struct DeferredTask<T: Send + 'static> {
    inner: Arc<DeferredInner<T>>,
    delay: Duration,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> DeferredTask<T> {
    /// Spawn the timer thread. `run` is called on that thread with each value
    /// whose delay elapsed without being replaced or taken.
    pub fn spawn<F>(delay: Duration, run: F) -> Self
    where
        F: Fn(T) + Send + 'static,
    {
        let inner = Arc::new(DeferredInner {
            state: Mutex::new(DeferredState {
                pending: None,
                running: false,
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let handle = thread::spawn({
            let inner = inner.clone();
            move || Self::run_worker(&inner, run)
        });

        Self {
            inner,
            delay,
            handle: Some(handle),
        }
    }

    fn run_worker<F>(inner: &DeferredInner<T>, run: F)
    where
        F: Fn(T),
    {
        loop {
            let value = {
                let mut state = inner.lock();
                loop {
                    if state.shutdown {
                        return;
                    }
                    match state.pending.as_ref().map(|p| p.due) {
                        None => state = inner.wait(state),
                        Some(due) => {
                            let now = Instant::now();
                            if now >= due {
                                break;
                            }
                            state = inner
                                .wake
                                .wait_timeout(state, due - now)
                                .map(|(guard, _)| guard)
                                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
                        }
                    }
                }
                let value = state.pending.take().map(|p| p.value);
                state.running = value.is_some();
                value
            };

            if let Some(value) = value {
                let _guard = RunGuard { inner };
                run(value);
            }
        }
    }

    /// Schedule `value` to run after the delay, replacing any pending value.
    /// Returns true if a pending value was superseded.
    pub fn schedule(&self, value: T) -> bool {
        let mut state = self.inner.lock();
        let superseded = state
            .pending
            .replace(Pending {
                value,
                due: Instant::now() + self.delay,
            })
            .is_some();
        self.inner.wake.notify_all();
        superseded
    }

    /// Cancel the pending run and hand its value back to the caller.
    ///
    /// If the worker is already running an earlier value, this blocks until
    /// that run has finished.
    pub fn take(&self) -> Option<T> {
        let mut state = self.inner.lock();
        let value = state.pending.take().map(|p| p.value);
        self.inner.wake.notify_all();
        while state.running {
            state = self.inner.wait(state);
        }
        value
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    fn stop_and_join(&mut self) {
        {
            let mut state = self.inner.lock();
            state.shutdown = true;
            self.inner.wake.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl<T: Send + 'static> Drop for DeferredTask<T> {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
