//! Caller context: cancellation, deadlines and requested projection.

use crate::storage::Projection;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cloneable cancellation signal.
///
/// Cancelling any clone cancels all of them. Dropping every clone also counts
/// as cancellation: the underlying signal channel disconnects either way.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug)]
struct CancelInner {
    /// Never sent on; dropping it disconnects every waiter.
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                trigger: Mutex::new(Some(trigger)),
                signal,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Cancel this token and every clone of it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.trigger.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// A receiver that disconnects once the token is cancelled or dropped.
    ///
    /// `recv()` on it blocks until then and never yields a value.
    pub fn signal(&self) -> Receiver<()> {
        self.inner.signal.clone()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Deadline scoped to a single storage call.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    expires_at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
            budget,
        }
    }

    /// Tighten to `outer` if the caller's own deadline is earlier.
    pub fn bounded_by(self, outer: Option<Instant>) -> Self {
        match outer {
            Some(outer) if outer < self.expires_at => Self {
                expires_at: outer,
                budget: outer.saturating_duration_since(Instant::now()),
            },
            _ => self,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// The budget this deadline was granted.
    pub fn budget(&self) -> Duration {
        self.budget
    }
}

/// Per-request context handed to every gateway operation.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub cancel: CancelToken,
    /// The caller's own deadline, if any. Storage calls never outlive it.
    pub deadline: Option<Instant>,
    /// Fields the caller needs; empty means every field.
    pub projection: Projection,
}

impl RequestContext {
    /// A context with no deadline, no projection and a fresh token.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The deadline for one storage call granted `budget`.
    pub fn deadline_for(&self, budget: Duration) -> Deadline {
        Deadline::after(budget).bounded_by(self.deadline)
    }
}
