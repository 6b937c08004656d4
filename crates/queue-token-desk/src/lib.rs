//! The queue token desk: services, token numbering, the token lifecycle and
//! live views over the queue.
//!
//! The components are the [database], the per-service [numbering], the
//! change [feed], the [projection]s, self-refreshing [view]s, and the [desk]
//! that answers requests.

#![allow(rustdoc::private_intra_doc_links)]
use std::sync::Arc;
use std::time::Duration;

use queue_token_core::{Config, QueueError};

mod database;
mod desk;
mod feed;
mod numbering;
pub mod projection;
mod view;

pub use database::Database;
pub use desk::Desk;
pub use feed::{Change, ChangeFeed, ChangeKind, Subscription};
pub use numbering::TokenCounter;
pub use view::{LiveView, Snapshot};

/// Entrypoint of the desk
///
/// Seeds the database with the configured services, starts the queue monitor
/// and returns the [`Desk`] which is served requests by the surrounding
/// infrastructure.
pub fn launch(config: &Config) -> Result<Desk, QueueError> {
    let database = Arc::new(Database::new());
    for seed in &config.services {
        let service = database.insert_service(seed.clone());
        tracing::info!(service = %service.id, name = %service.name, active = service.is_active, "service seeded");
    }

    let queue_monitor = LiveView::spawn_with(
        "queue-monitor",
        database.clone(),
        |db| Ok(db.queue_tokens()),
        |old, new| {
            if old.value.len() != new.value.len() {
                tracing::info!(
                    version = new.version,
                    active = new.value.len(),
                    "queue size changed"
                );
            }
        },
    )?;

    Ok(Desk::new(
        database,
        config.staff_key.clone(),
        Duration::from_secs(config.change_timeout.into()),
        queue_monitor,
    ))
}
