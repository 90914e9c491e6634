// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TMS_RETRY

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;
use syncscan::SyncError;

/// Attempt limits and backoff for calls to the test management system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Budget for a single attempt.
    pub timeout: Duration,
}

pub trait BackoffPolicy {
    /// Delay before retrying after failed attempt number `attempt` (1-based).
    fn delay_for_attempt(&self, attempt: u32) -> Duration;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy for RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts, or `cancel` fires during a backoff wait. The last error is
    /// returned on failure.
    pub fn run<T, F>(&self, cancel: &Cancellation, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut(u32) -> Result<T, SyncError>,
    {
        let mut attempt = 1;
        loop {
            let err = match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= self.max_attempts {
                return Err(err.with_context("attempts", attempt.to_string()));
            }
            let delay = self.delay_for_attempt(attempt);
            log::warn!(
                "Attempt {}/{} failed, retrying in {}ms: {}",
                attempt,
                self.max_attempts,
                delay.as_millis(),
                err.render()
            );
            if cancel.wait(delay) {
                return Err(err
                    .with_context("attempts", attempt.to_string())
                    .with_context("cancelled", "true"));
            }
            attempt += 1;
        }
    }

    /// [`run`](Self::run) with every attempt bounded by [`timeout`](Self::timeout).
    pub fn run_with_timeouts<T, F>(&self, cancel: &Cancellation, op: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: Fn(u32) -> Result<T, SyncError> + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        self.run(cancel, |attempt| {
            let op = Arc::clone(&op);
            run_with_timeout(self.timeout, move || (*op)(attempt))
        })
    }
}

/// Shared flag that interrupts backoff waits.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(|e| e.into_inner()) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleeps up to `timeout`; returns true as soon as cancellation is requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

/// Runs `f` on a worker thread and gives up after `timeout`. A timed out
/// worker is detached; its eventual result is dropped.
pub fn run_with_timeout<T, F>(timeout: Duration, f: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SyncError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(SyncError::timeout(timeout.as_millis() as u64)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(SyncError::network(
            None,
            "Worker exited without producing a result",
        )),
    }
}
