//! Implementation of self-refreshing views over the database

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Sender};
use crossbeam::select;
use parking_lot::{Condvar, Mutex};
use queue_token_core::QueueError;

use crate::database::Database;
use crate::feed::Subscription;

/// A projected value and the feed version it reflects
#[derive(Clone, Debug)]
pub struct Snapshot<T> {
    /// Feed version the value was fetched at (or after)
    pub version: u64,
    /// The projected value
    pub value: T,
}

struct ViewState<T> {
    snapshot: Mutex<Snapshot<T>>,
    refreshed: Condvar,
}

/// A view that re-fetches and re-projects whenever the token table changes
///
/// The view owns a thread subscribed to the database's change feed. Bursts of
/// changes are coalesced into one re-fetch. If a re-fetch fails, the previous
/// snapshot stays in place.
pub struct LiveView<T> {
    name: String,
    state: Arc<ViewState<T>>,
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

type Fetch<T> = Box<dyn Fn(&Database) -> Result<T, QueueError> + Send>;
type OnRefresh<T> = Box<dyn Fn(&Snapshot<T>, &Snapshot<T>) + Send>;

impl<T: Clone + Send + 'static> LiveView<T> {
    /// Fetch the initial value and start following changes
    pub fn spawn<F>(name: &str, database: Arc<Database>, fetch: F) -> Result<Self, QueueError>
    where
        F: Fn(&Database) -> Result<T, QueueError> + Send + 'static,
    {
        Self::spawn_with(name, database, fetch, |_, _| {})
    }

    /// Like [`LiveView::spawn()`], calling `on_refresh(old, new)` after every
    /// successful refresh
    pub fn spawn_with<F, R>(
        name: &str,
        database: Arc<Database>,
        fetch: F,
        on_refresh: R,
    ) -> Result<Self, QueueError>
    where
        F: Fn(&Database) -> Result<T, QueueError> + Send + 'static,
        R: Fn(&Snapshot<T>, &Snapshot<T>) + Send + 'static,
    {
        // subscribe before the first fetch so no change falls in between
        let subscription = database.subscribe();
        let version = database.feed().version();
        let value = fetch(&database)?;

        let state = Arc::new(ViewState {
            snapshot: Mutex::new(Snapshot { version, value }),
            refreshed: Condvar::new(),
        });
        let (shutdown, shutdown_receiver) = bounded(1);

        let worker = Refresher {
            name: name.to_owned(),
            database,
            subscription,
            fetch: Box::new(fetch),
            on_refresh: Box::new(on_refresh),
            state: state.clone(),
        };
        let thread = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || loop {
                select! {
                    recv(worker.subscription.receiver()) -> msg => match msg {
                        Ok(change) => {
                            let latest = worker.subscription.drain().unwrap_or(change);
                            worker.refresh(latest.version);
                        }
                        Err(_) => break,
                    },
                    recv(shutdown_receiver) -> _ => break,
                }
            })
            .map_err(|err| QueueError::Internal(err.to_string()))?;

        Ok(Self {
            name: name.to_owned(),
            state,
            shutdown,
            thread,
        })
    }

    /// The latest snapshot
    pub fn snapshot(&self) -> Snapshot<T> {
        self.state.snapshot.lock().clone()
    }

    /// Wait until the view reflects at least `version`
    ///
    /// Returns [`None`] if that did not happen within `timeout`.
    pub fn wait_for(&self, version: u64, timeout: Duration) -> Option<Snapshot<T>> {
        let deadline = Instant::now() + timeout;
        let mut snapshot = self.state.snapshot.lock();
        while snapshot.version < version {
            if self
                .state
                .refreshed
                .wait_until(&mut snapshot, deadline)
                .timed_out()
            {
                return (snapshot.version >= version).then(|| snapshot.clone());
            }
        }
        Some(snapshot.clone())
    }

    /// Stop following changes and join the view's thread
    pub fn shutdown(self) {
        let _ = self.shutdown.send(());
        if self.thread.join().is_err() {
            tracing::error!(view = %self.name, "view thread panicked");
        }
    }
}

/// State owned by a view's thread
struct Refresher<T> {
    name: String,
    database: Arc<Database>,
    subscription: Subscription,
    fetch: Fetch<T>,
    on_refresh: OnRefresh<T>,
    state: Arc<ViewState<T>>,
}

impl<T: Clone> Refresher<T> {
    fn refresh(&self, version: u64) {
        match (self.fetch)(&self.database) {
            Ok(value) => {
                let fresh = Snapshot { version, value };
                let old = {
                    let mut snapshot = self.state.snapshot.lock();
                    std::mem::replace(&mut *snapshot, fresh.clone())
                };
                self.state.refreshed.notify_all();
                tracing::debug!(view = %self.name, version, "view refreshed");
                (self.on_refresh)(&old, &fresh);
            }
            Err(err) => {
                tracing::warn!(view = %self.name, version, %err, "refresh failed, keeping previous snapshot");
            }
        }
    }
}
