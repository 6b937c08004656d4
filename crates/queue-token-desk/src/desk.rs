//! Implementation of the request handler in front of the database
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use queue_token_core::{
    Dashboard, IssueToken, NewToken, NumberRequest, QueueError, Request, RequestHandler,
    RequestKind, StatusUpdate, TokenView,
};

use crate::database::Database;
use crate::projection;
use crate::view::LiveView;

/// The queue token desk
///
/// ⚠️ This struct implements the [`RequestHandler`] trait and is exposed from
/// the crate root, to be served requests by the HTTP server and the tester.
pub struct Desk {
    database: Arc<Database>,
    staff_key: Option<String>,
    change_timeout: Duration,
    /// live queue, kept for logging and debugging
    queue_monitor: LiveView<Vec<TokenView>>,
}

impl Desk {
    /// Create a new [`Desk`]
    pub fn new(
        database: Arc<Database>,
        staff_key: Option<String>,
        change_timeout: Duration,
        queue_monitor: LiveView<Vec<TokenView>>,
    ) -> Self {
        Self {
            database,
            staff_key,
            change_timeout,
            queue_monitor,
        }
    }

    /// The database behind this desk
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// The desk's own live queue view
    pub fn queue_monitor(&self) -> &LiveView<Vec<TokenView>> {
        &self.queue_monitor
    }

    /// Reject staff requests that do not carry the configured key
    fn authorize(&self, rq: &Request) -> Result<(), QueueError> {
        match &self.staff_key {
            Some(key) if rq.staff_key() != Some(key.as_str()) => Err(QueueError::Unauthorized),
            _ => Ok(()),
        }
    }

    fn dashboard(&self) -> Dashboard {
        let tokens = self
            .database
            .tokens_since(projection::local_midnight(Local::now()));
        Dashboard {
            stats: projection::dashboard_stats(&tokens),
            tokens,
        }
    }

    /// Block until the feed moved past `seen` or the change timeout ran out
    ///
    /// A `seen` ahead of the feed (e.g., from before a restart) waits out the
    /// whole window unless enough changes arrive.
    fn wait_for_change(&self, seen: u64) -> u64 {
        let feed = self.database.feed();
        let subscription = feed.subscribe();
        let deadline = Instant::now() + self.change_timeout;
        loop {
            let version = feed.version();
            let left = deadline.saturating_duration_since(Instant::now());
            if version > seen || left.is_zero() {
                return version;
            }
            subscription.recv_timeout(left);
        }
    }
}

impl RequestHandler for Desk {
    fn handle(&self, mut rq: Request) {
        let kind = *rq.kind();
        tracing::debug!(?kind, method = ?rq.method(), url = rq.url(), "handling request");

        match kind {
            RequestKind::ListServices => {
                rq.respond_with_json(&self.database.active_services());
            }
            RequestKind::NextTokenNumber => {
                match rq
                    .read_json::<NumberRequest>()
                    .and_then(|body| self.database.next_token_number(body.service_id))
                {
                    Ok(number) => rq.respond_with_int(number.into()),
                    Err(err) => reject(rq, kind, err),
                }
            }
            RequestKind::CreateToken => {
                match rq
                    .read_json::<NewToken>()
                    .and_then(|new| self.database.create_token(new))
                {
                    Ok(token) => {
                        tracing::info!(
                            token = %token.id,
                            service = %token.service_id,
                            number = token.token_number,
                            "token created"
                        );
                        rq.respond_with_json(&token);
                    }
                    Err(err) => reject(rq, kind, err),
                }
            }
            RequestKind::IssueToken => {
                match rq
                    .read_json::<IssueToken>()
                    .and_then(|issue| self.database.issue_token(issue))
                {
                    Ok(token) => {
                        tracing::info!(
                            token = %token.id,
                            service = %token.service_id,
                            number = token.token_number,
                            "token issued"
                        );
                        rq.respond_with_json(&token);
                    }
                    Err(err) => reject(rq, kind, err),
                }
            }
            RequestKind::QueueTokens => {
                rq.respond_with_json(&self.database.queue_tokens());
            }
            RequestKind::DashboardTokens => match self.authorize(&rq) {
                Ok(()) => rq.respond_with_json(&self.dashboard()),
                Err(err) => reject(rq, kind, err),
            },
            RequestKind::UpdateTokenStatus => {
                match self.authorize(&rq).and_then(|()| {
                    let update = rq.read_json::<StatusUpdate>()?;
                    self.database
                        .update_status(update.token_id, update.status, Utc::now())
                }) {
                    Ok(token) => {
                        tracing::info!(token = %token.id, status = %token.status, "token moved");
                        rq.respond_with_json(&token);
                    }
                    Err(err) => reject(rq, kind, err),
                }
            }
            RequestKind::WaitForChange => match rq.read_u64() {
                Some(seen) => {
                    let version = self.wait_for_change(seen);
                    rq.respond_with_int(version);
                }
                None => reject(
                    rq,
                    kind,
                    QueueError::BadRequest("no change version provided".into()),
                ),
            },
            RequestKind::Debug => {
                let (services, tokens) = self.database.counts();
                let queue = self.queue_monitor.snapshot();
                rq.respond_with_string(format!(
                    "services: {services}, tokens: {tokens}, in queue: {} (change {})",
                    queue.value.len(),
                    queue.version,
                ));
            }
        }
    }

    fn shutdown(self) {
        self.queue_monitor.shutdown();
    }
}

/// Answer `rq` with `err`
fn reject(rq: Request, kind: RequestKind, err: QueueError) {
    tracing::warn!(?kind, %err, "request rejected");
    rq.respond_with_err(&err);
}
