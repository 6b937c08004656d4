//! Change notifications for the token table

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use uuid::Uuid;

/// What happened to the token table
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChangeKind {
    /// A token was created
    Insert,
    /// A token changed status
    Update,
}

/// A single committed change
///
/// Subscribers should treat this as "something changed" and re-fetch; the
/// token id is informational.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Change {
    /// Feed version after this change
    pub version: u64,
    /// Insert or update
    pub kind: ChangeKind,
    /// The token that changed
    pub token: Uuid,
}

struct FeedInner {
    /// Number of changes published so far
    version: AtomicU64,
    next_subscriber: AtomicU64,
    subscribers: Mutex<Vec<(u64, Sender<Change>)>>,
}

/// Fan-out of token table changes to any number of subscribers
#[derive(Clone)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    /// Create a new [`ChangeFeed`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                version: AtomicU64::new(0),
                next_subscriber: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Current version, i.e., the number of changes published so far
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Subscribe to all changes published from now on
    ///
    /// The subscription ends when the returned [`Subscription`] is dropped.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = unbounded();
        self.inner.subscribers.lock().push((id, sender));
        Subscription {
            id,
            receiver,
            feed: self.inner.clone(),
        }
    }

    /// Publish a change to every subscriber and return the new version
    pub fn publish(&self, kind: ChangeKind, token: Uuid) -> u64 {
        let mut subscribers = self.inner.subscribers.lock();
        // bumped under the lock so subscribers see versions in order
        let version = self.inner.version.fetch_add(1, Ordering::AcqRel) + 1;
        let change = Change {
            version,
            kind,
            token,
        };
        subscribers.retain(|(_, sender)| sender.send(change).is_ok());
        version
    }
}

/// A live subscription to a [`ChangeFeed`]
pub struct Subscription {
    id: u64,
    receiver: Receiver<Change>,
    feed: Arc<FeedInner>,
}

impl Subscription {
    /// Receiver to use in `select!`
    pub fn receiver(&self) -> &Receiver<Change> {
        &self.receiver
    }

    /// Wait for the next change
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Change> {
        match self.receiver.recv_timeout(timeout) {
            Ok(change) => Some(change),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take every change that is already queued and return the latest one
    pub fn drain(&self) -> Option<Change> {
        self.receiver.try_iter().last()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.feed
            .subscribers
            .lock()
            .retain(|(id, _)| *id != self.id);
    }
}
