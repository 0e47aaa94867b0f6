//! Subscription types for live catalog updates.

use crate::types::Recipe;
use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The full recipe slice at one point in time.
pub type Snapshot = Arc<[Recipe]>;

/// Unique identifier for a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receive side of a subscription.
///
/// Holds at most one pending snapshot; a slow reader only ever sees the
/// latest. The stream ends (`recv` fails) once the subscription's cancel
/// token fires and the broker deregisters it.
pub struct Subscription {
    pub id: SubscriberId,
    pub(crate) receiver: Receiver<Snapshot>,
}

impl Subscription {
    /// Receive the next snapshot (blocking).
    pub fn recv(&self) -> Result<Snapshot, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a snapshot (non-blocking).
    pub fn try_recv(&self) -> Result<Snapshot, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Snapshot, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Blocking iterator over snapshots; ends when the subscription is closed.
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, Snapshot> {
        self.receiver.iter()
    }
}

impl IntoIterator for Subscription {
    type Item = Snapshot;
    type IntoIter = crossbeam_channel::IntoIter<Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.receiver.into_iter()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.receiver.len())
            .finish()
    }
}
