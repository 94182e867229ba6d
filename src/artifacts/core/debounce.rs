//! Debouncing
//!
//! A [`Debouncer`] owns a delay and a side effect. Every `trigger` re-arms a
//! one-shot timer, so a burst of triggers fires the effect once, `delay` after
//! the last of them. Each arm carries a token; a timer whose token is no longer
//! current never runs the effect, even if it already woke up.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Effect = Arc<dyn Fn() + Send + Sync>;

pub struct Debouncer {
    delay: Duration,
    effect: Effect,
    runtime: Handle,
    token: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(runtime: Handle, delay: Duration, effect: impl Fn() + Send + Sync + 'static) -> Self {
        Debouncer {
            delay,
            effect: Arc::new(effect),
            runtime,
            token: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer, replacing any pending fire
    pub fn trigger(&self) {
        let mut pending = self.pending.lock();
        if let Some(task) = pending.take() {
            task.abort();
        }

        let token = self.token.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.token.clone();
        let effect = self.effect.clone();
        let delay = self.delay;

        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == token {
                effect();
            }
        }));
    }

    /// Cancel the pending fire, if any
    pub fn stop(&self) {
        let mut pending = self.pending.lock();
        self.token.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = pending.take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lazily create the debouncer stored in `slot`
///
/// Only the first call installs `effect`; later calls return the existing
/// debouncer untouched.
pub fn ensure<'s>(
    slot: &'s OnceLock<Debouncer>,
    runtime: &Handle,
    delay: Duration,
    effect: impl Fn() + Send + Sync + 'static,
) -> &'s Debouncer {
    slot.get_or_init(|| Debouncer::new(runtime.clone(), delay, effect))
}
