//! Pure projections over token snapshots
//!
//! Views never update incrementally. They re-fetch a snapshot and run one of
//! these functions over it.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveTime, TimeZone, Utc};
use queue_token_core::{DashboardStats, TokenStatus, TokenView};

/// Tokens still in line, oldest first
///
/// Tokens created at the same instant keep their relative order.
pub fn queue_view(mut tokens: Vec<TokenView>) -> Vec<TokenView> {
    tokens.retain(|view| view.token.status.is_active());
    tokens.sort_by_key(|view| view.token.created_at);
    tokens
}

/// Newest first, for the dashboard
///
/// Expects `tokens` in insertion order; ties put the later insert first.
pub fn newest_first(mut tokens: Vec<TokenView>) -> Vec<TokenView> {
    tokens.reverse();
    tokens.sort_by(|a, b| b.token.created_at.cmp(&a.token.created_at));
    tokens
}

/// Count tokens per dashboard bucket
pub fn dashboard_stats(tokens: &[TokenView]) -> DashboardStats {
    let mut stats = DashboardStats::default();
    for view in tokens {
        match view.token.status {
            TokenStatus::Waiting => stats.waiting += 1,
            TokenStatus::Serving => stats.serving += 1,
            TokenStatus::Completed => stats.completed += 1,
            TokenStatus::Called | TokenStatus::Cancelled => {}
        }
        stats.total += 1;
    }
    stats
}

/// Start of the local day containing `now`, as UTC
pub fn local_midnight(now: DateTime<Local>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // midnight skipped by a DST change; the day starts an hour later
        LocalResult::None => Local
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map_or_else(|| now.with_timezone(&Utc), |t| t.with_timezone(&Utc)),
    }
}
